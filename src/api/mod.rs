//! REST API module.
//!
//! Contains the catalog and admin routes. Every response carries the store
//! revision and, for actions, the notification to show.

mod admin;
mod catalog;
mod datastore;

pub use admin::*;
pub use catalog::*;
pub use datastore::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::db::Storage;
use crate::errors::{AppError, AppErrorWithRevision};
use crate::notify::{Notification, Surface};
use crate::render::Rendered;

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub revision_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, revision_id: i64) -> Self {
        Self {
            success: true,
            data,
            revision_id,
            notification: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppErrorWithRevision>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T, revision_id: i64) -> ApiResult<T> {
    Ok(ApiResponse::new(data, revision_id))
}

/// Create an error API response.
pub fn error<T: Serialize>(err: AppError, revision_id: i64, surface: Surface) -> ApiResult<T> {
    Err(AppErrorWithRevision {
        error: err,
        revision_id,
        surface,
    })
}

/// Turn the outcome of a renderer action into a response. Success responses
/// report the revision after the action.
async fn respond<T: Serialize>(
    storage: &Storage,
    revision_id: i64,
    surface: Surface,
    result: Result<Rendered<T>, AppError>,
) -> ApiResult<T> {
    match result {
        Ok(rendered) => {
            let new_revision = storage.get_revision_id().await.unwrap_or(revision_id);
            Ok(ApiResponse {
                success: true,
                data: rendered.view,
                revision_id: new_revision,
                notification: rendered.notification,
            })
        }
        Err(e) => error(e, revision_id, surface),
    }
}
