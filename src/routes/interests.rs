use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{ListInterestsQuery, PageRequest, RespondInterestRequest, SendInterestRequest};
use crate::routes::{auth::CallerId, validated, AppState, MAX_PAGE_SIZE};

/// Configure all interest-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/interests", web::post().to(send_interest))
        .route("/interests/received", web::get().to(list_received))
        .route("/interests/sent", web::get().to(list_sent))
        .route("/interests/stats", web::get().to(interest_stats))
        .route("/interests/{id}/respond", web::put().to(respond))
        .route("/interests/{id}/withdraw", web::put().to(withdraw))
        .route("/interests/{id}/read", web::put().to(mark_read));
}

/// Send an interest from the caller
///
/// POST /api/v1/interests
///
/// Request body:
/// ```json
/// {
///   "receiverId": "string",
///   "message": "string"
/// }
/// ```
async fn send_interest(
    state: web::Data<AppState>,
    caller: CallerId,
    body: web::Json<SendInterestRequest>,
) -> AppResult<HttpResponse> {
    validated(&*body)?;

    let sent = state
        .interests
        .send(caller.as_str(), &body.receiver_id, body.message.as_deref())
        .await?;

    Ok(HttpResponse::Created().json(sent))
}

async fn list_received(
    state: web::Data<AppState>,
    caller: CallerId,
    query: web::Query<ListInterestsQuery>,
) -> AppResult<HttpResponse> {
    validated(&*query)?;

    let page = PageRequest::new(query.page, query.limit, MAX_PAGE_SIZE);
    let interests = state
        .interests
        .list_received(caller.as_str(), query.status.as_deref(), page)
        .await?;

    Ok(HttpResponse::Ok().json(interests))
}

async fn list_sent(
    state: web::Data<AppState>,
    caller: CallerId,
    query: web::Query<ListInterestsQuery>,
) -> AppResult<HttpResponse> {
    validated(&*query)?;

    let page = PageRequest::new(query.page, query.limit, MAX_PAGE_SIZE);
    let interests = state
        .interests
        .list_sent(caller.as_str(), query.status.as_deref(), page)
        .await?;

    Ok(HttpResponse::Ok().json(interests))
}

async fn interest_stats(state: web::Data<AppState>, caller: CallerId) -> AppResult<HttpResponse> {
    let stats = state.interests.stats(caller.as_str()).await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// Accept or decline an interest addressed to the caller
///
/// PUT /api/v1/interests/{id}/respond
///
/// Request body:
/// ```json
/// {
///   "status": "accepted|declined",
///   "responseMessage": "string"
/// }
/// ```
async fn respond(
    state: web::Data<AppState>,
    caller: CallerId,
    path: web::Path<Uuid>,
    body: web::Json<RespondInterestRequest>,
) -> AppResult<HttpResponse> {
    validated(&*body)?;

    let interest = state
        .interests
        .respond(
            path.into_inner(),
            caller.as_str(),
            &body.status,
            body.response_message.as_deref(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(interest))
}

async fn withdraw(
    state: web::Data<AppState>,
    caller: CallerId,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let interest = state
        .interests
        .withdraw(path.into_inner(), caller.as_str())
        .await?;

    Ok(HttpResponse::Ok().json(interest))
}

async fn mark_read(
    state: web::Data<AppState>,
    caller: CallerId,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let interest = state
        .interests
        .mark_read(path.into_inner(), caller.as_str())
        .await?;

    Ok(HttpResponse::Ok().json(interest))
}
