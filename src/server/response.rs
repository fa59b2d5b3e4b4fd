use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{debug, error};

use crate::error::SongError;

pub const INTERNAL_ERROR_MESSAGE: &str = "Sorry, something went wrong, we are already solving the problem";
pub const BAD_REQUEST_PREFIX: &str = "Invalid data";

/// Body of every failed request.
pub fn error_body(err: &SongError) -> serde_json::Value {
    if err.is_client_error() {
        json!({ "errors": format!("{}: {}", BAD_REQUEST_PREFIX, err) })
    } else {
        json!({ "errors": INTERNAL_ERROR_MESSAGE })
    }
}

impl IntoResponse for SongError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // backend details stay in the log, clients get a generic message
        if status.is_server_error() {
            error!("{}", self);
        } else {
            debug!("Rejected request: {}", self);
        }

        (status, Json(error_body(&self))).into_response()
    }
}
