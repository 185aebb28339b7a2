//! Datastore API endpoints.

use axum::{extract::State, Json};

use super::{error, success, ApiResult};
use crate::errors::AppErrorWithRevision;
use crate::models::{ContentSnapshot, ImportSummary, LegacyImportRequest, RevisionInfo};
use crate::notify::Surface;
use crate::AppState;

/// GET /api/admin/datastore - All shared content.
pub async fn get_datastore(State(state): State<AppState>) -> ApiResult<ContentSnapshot> {
    let snapshot = state
        .storage
        .snapshot()
        .await
        .map_err(|e| AppErrorWithRevision {
            error: e,
            revision_id: 0,
            surface: Surface::Admin,
        })?;

    let revision_id = snapshot.revision_id;
    success(snapshot, revision_id)
}

/// GET /api/admin/revision - Get the current revision info.
pub async fn get_revision(State(state): State<AppState>) -> ApiResult<RevisionInfo> {
    let revision_info = state
        .storage
        .get_revision_info()
        .await
        .map_err(|e| AppErrorWithRevision {
            error: e,
            revision_id: 0,
            surface: Surface::Admin,
        })?;

    let revision_id = revision_info.revision_id;
    success(revision_info, revision_id)
}

/// POST /api/admin/import - Import a browser storage dump.
pub async fn import_legacy(
    State(state): State<AppState>,
    Json(request): Json<LegacyImportRequest>,
) -> ApiResult<ImportSummary> {
    let revision_id = state.storage.get_revision_id().await.unwrap_or(0);

    match state.storage.import_legacy(&request).await {
        Ok(summary) => {
            let new_revision = state.storage.get_revision_id().await.unwrap_or(revision_id);
            success(summary, new_revision)
        }
        Err(e) => error(e, revision_id, Surface::Admin),
    }
}
