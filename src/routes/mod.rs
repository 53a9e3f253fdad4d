// Route exports
pub mod auth;
pub mod interests;
pub mod matches;

use actix_web::{error, web, HttpRequest};
use std::sync::Arc;
use validator::Validate;

use crate::core::{InterestWorkflow, MatchService};
use crate::error::{AppError, AppResult};

pub use auth::{CallerId, Claims, JwtVerifier};

/// Largest page a listing endpoint will return
pub const MAX_PAGE_SIZE: u32 = 100;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub matches: Arc<MatchService>,
    pub interests: Arc<InterestWorkflow>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(matches::configure)
            .configure(interests::configure),
    );
}

/// Extractor configs rendering payload errors with the shared error body
pub fn configure_extractors(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::PathConfig::default().error_handler(path_error));
}

fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::invalid(format!("Invalid JSON body: {}", err)).into()
}

fn query_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::invalid(format!("Invalid query string: {}", err)).into()
}

fn path_error(err: error::PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::invalid(format!("Invalid path parameter: {}", err)).into()
}

pub(crate) fn validated<T: Validate>(value: &T) -> AppResult<()> {
    value.validate().map_err(|errors| {
        tracing::info!("Request validation failed: {}", errors);
        AppError::invalid(errors.to_string())
    })
}
