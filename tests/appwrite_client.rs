// Appwrite directory client against a mock server

use chrono::NaiveDate;
use matrimony_match::error::StoreError;
use matrimony_match::models::{CandidateCriteria, Gender, SubscriptionTier};
use matrimony_match::services::{
    AppwriteClient, AppwriteCollections, AppwriteError, ProfileDirectory, UserDirectory,
};
use mockito::Matcher;

const PROFILES_PATH: &str = "/databases/test_db/collections/profiles/documents";

fn client(base_url: &str) -> AppwriteClient {
    AppwriteClient::new(
        base_url.to_string(),
        "test_key".to_string(),
        "test_project".to_string(),
        "test_db".to_string(),
        AppwriteCollections {
            profiles: "profiles".to_string(),
            users: "users".to_string(),
        },
    )
    .unwrap()
}

fn profile_document(id: &str, user_id: &str) -> serde_json::Value {
    serde_json::json!({
        "$id": id,
        "$collectionId": "profiles",
        "userId": user_id,
        "gender": "Female",
        "dateOfBirth": "1996-04-12",
        "education": "Graduate",
        "jobLocation": "Pune",
        "isVerified": true,
        "isComplete": true
    })
}

#[tokio::test]
async fn test_find_profile_by_user_id() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", PROFILES_PATH)
        .match_header("X-Appwrite-Key", "test_key")
        .match_header("X-Appwrite-Project", "test_project")
        .match_query(Matcher::UrlEncoded(
            "queries[]".into(),
            "equal(\"userId\", [\"user-7\"])".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "total": 1,
                "documents": [profile_document("profile-7", "user-7")]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let profile = client(&server.url())
        .find_by_user_id("user-7")
        .await
        .unwrap()
        .unwrap();

    mock.assert_async().await;
    assert_eq!(profile.id, "profile-7");
    assert_eq!(profile.gender, Gender::Female);
    assert_eq!(profile.date_of_birth, NaiveDate::from_ymd_opt(1996, 4, 12));
}

#[tokio::test]
async fn test_missing_profile_is_none() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", PROFILES_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"total": 0, "documents": []}"#)
        .create_async()
        .await;

    let profile = client(&server.url()).find_by_user_id("ghost").await.unwrap();

    assert!(profile.is_none());
}

#[tokio::test]
async fn test_candidate_query_pushes_filters_and_drops_requester() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", PROFILES_PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("queries[]".into(), "equal(\"gender\", [\"Female\"])".into()),
            Matcher::UrlEncoded("queries[]".into(), "equal(\"isVerified\", true)".into()),
            Matcher::UrlEncoded(
                "queries[]".into(),
                "lessThanEqual(\"dateOfBirth\", \"1999-06-01\")".into(),
            ),
            Matcher::UrlEncoded("queries[]".into(), "limit(25)".into()),
        ]))
        .with_status(200)
        .with_body(
            serde_json::json!({
                "total": 3,
                "documents": [
                    profile_document("profile-1", "user-1"),
                    profile_document("profile-2", "requester"),
                    { "$id": "broken" }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let criteria = CandidateCriteria {
        gender: Gender::Female,
        exclude_user_id: "requester".to_string(),
        require_complete: true,
        require_verified: true,
        min_birth_date: None,
        max_birth_date: NaiveDate::from_ymd_opt(1999, 6, 1),
        locations: vec![],
    };

    let profiles = client(&server.url()).query(&criteria, 25, 0).await.unwrap();

    mock.assert_async().await;
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].user_id, "user-1");
}

#[tokio::test]
async fn test_user_lookup() {
    let mut server = mockito::Server::new_async().await;
    let _found = server
        .mock("GET", "/databases/test_db/collections/users/documents/user-1")
        .with_status(200)
        .with_body(
            serde_json::json!({
                "$id": "user-1",
                "subscriptionPlan": "premium",
                "subscriptionExpiresAt": "2999-01-01T00:00:00Z"
            })
            .to_string(),
        )
        .create_async()
        .await;
    let _missing = server
        .mock("GET", "/databases/test_db/collections/users/documents/user-2")
        .with_status(404)
        .with_body(r#"{"message": "Document not found"}"#)
        .create_async()
        .await;

    let appwrite = client(&server.url());
    let user = appwrite.find_by_id("user-1").await.unwrap().unwrap();

    assert_eq!(user.subscription_plan, Some(SubscriptionTier::Premium));
    assert!(appwrite.find_by_id("user-2").await.unwrap().is_none());
}

#[tokio::test]
async fn test_unauthorized_is_an_infrastructure_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", PROFILES_PATH)
        .match_query(Matcher::Any)
        .with_status(401)
        .create_async()
        .await;

    let err = client(&server.url())
        .find_by_user_id("user-1")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StoreError::Directory(AppwriteError::Unauthorized)
    ));
}
