use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    GenerateMatchesRequest, HealthResponse, ListMatchesQuery, PageRequest, UpdateMatchRequest,
};
use crate::routes::{auth::CallerId, validated, AppState, MAX_PAGE_SIZE};

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/matches", web::get().to(list_matches))
        .route("/matches/generate", web::post().to(generate_matches))
        .route("/matches/{id}", web::get().to(get_match))
        .route("/matches/{id}", web::put().to(update_match));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let healthy = match state.matches.ledger().health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            tracing::error!("Storage health check failed: {}", e);
            false
        }
    };

    let status = if healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// List the caller's active matches
///
/// GET /api/v1/matches?page=1&limit=20&minScore=60
async fn list_matches(
    state: web::Data<AppState>,
    caller: CallerId,
    query: web::Query<ListMatchesQuery>,
) -> AppResult<HttpResponse> {
    validated(&*query)?;

    let page = PageRequest::new(query.page, query.limit, MAX_PAGE_SIZE);
    let matches = state
        .matches
        .list_matches(caller.as_str(), query.min_score, page)
        .await?;

    tracing::debug!(
        "Returning {} of {} matches for {}",
        matches.items.len(),
        matches.total,
        caller.as_str()
    );

    Ok(HttpResponse::Ok().json(matches))
}

/// Generate matches for the caller
///
/// POST /api/v1/matches/generate
///
/// Request body (optional):
/// ```json
/// {
///   "limit": 50,
///   "refreshExisting": false
/// }
/// ```
async fn generate_matches(
    state: web::Data<AppState>,
    caller: CallerId,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    let request = parse_generate_request(&body)?;
    validated(&request)?;

    let summary = state
        .matches
        .generate_matches(
            caller.as_str(),
            request.limit.map(|l| l as usize),
            request.refresh_existing,
        )
        .await?;

    Ok(HttpResponse::Ok().json(summary))
}

/// An empty body means defaults; anything else must be a valid request
fn parse_generate_request(body: &[u8]) -> AppResult<GenerateMatchesRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(GenerateMatchesRequest::default());
    }

    serde_json::from_slice(body)
        .map_err(|e| AppError::invalid(format!("Invalid JSON body: {}", e)))
}

/// Read one match and record the view
async fn get_match(
    state: web::Data<AppState>,
    caller: CallerId,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let detail = state
        .matches
        .match_detail(path.into_inner(), caller.as_str())
        .await?;

    Ok(HttpResponse::Ok().json(detail))
}

/// Change a match's status
///
/// PUT /api/v1/matches/{id}
///
/// Request body:
/// ```json
/// {
///   "status": "active|contacted|blocked|hidden",
///   "notes": "string"
/// }
/// ```
async fn update_match(
    state: web::Data<AppState>,
    caller: CallerId,
    path: web::Path<Uuid>,
    body: web::Json<UpdateMatchRequest>,
) -> AppResult<HttpResponse> {
    validated(&*body)?;

    let updated = state
        .matches
        .update_match(
            path.into_inner(),
            caller.as_str(),
            &body.status,
            body.notes.as_deref(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(updated))
}
