//! Admin panel endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{error, respond, success, ApiResult};
use crate::models::{
    CreateAnnouncementRequest, CreateGameRequest, CreateNewsRequest, SaveTokenRequest,
    UpdateAnnouncementRequest,
};
use crate::notify::Surface;
use crate::render::admin::{AdminView, TokenForm};
use crate::render::ConfirmQuery;
use crate::AppState;

/// GET /api/admin - Render the admin panel.
pub async fn get_admin_view(State(state): State<AppState>) -> ApiResult<AdminView> {
    let revision_id = state.storage.get_revision_id().await.unwrap_or(0);

    match state.admin().render().await {
        Ok(view) => success(view, revision_id),
        Err(e) => error(e, revision_id, Surface::Admin),
    }
}

/// POST /api/admin/announcements - Publish an announcement.
pub async fn create_announcement(
    State(state): State<AppState>,
    Json(request): Json<CreateAnnouncementRequest>,
) -> ApiResult<AdminView> {
    let revision_id = state.storage.get_revision_id().await.unwrap_or(0);
    let result = state.admin().create_announcement(&request).await;
    respond(&state.storage, revision_id, Surface::Admin, result).await
}

/// PATCH /api/admin/announcements/:id - Set or toggle the active flag.
pub async fn update_announcement(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateAnnouncementRequest>,
) -> ApiResult<AdminView> {
    let revision_id = state.storage.get_revision_id().await.unwrap_or(0);
    let result = state.admin().update_announcement(&id, &request).await;
    respond(&state.storage, revision_id, Surface::Admin, result).await
}

/// DELETE /api/admin/announcements/:id?confirm=true - Delete an announcement.
pub async fn delete_announcement(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(confirm): Query<ConfirmQuery>,
) -> ApiResult<AdminView> {
    let revision_id = state.storage.get_revision_id().await.unwrap_or(0);
    let result = state
        .admin()
        .delete_announcement(&id, confirm.into())
        .await;
    respond(&state.storage, revision_id, Surface::Admin, result).await
}

/// POST /api/admin/news - Publish a news item.
pub async fn create_news(
    State(state): State<AppState>,
    Json(request): Json<CreateNewsRequest>,
) -> ApiResult<AdminView> {
    let revision_id = state.storage.get_revision_id().await.unwrap_or(0);
    let result = state.admin().create_news(&request).await;
    respond(&state.storage, revision_id, Surface::Admin, result).await
}

/// DELETE /api/admin/news/:id?confirm=true - Delete a news item.
pub async fn delete_news(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(confirm): Query<ConfirmQuery>,
) -> ApiResult<AdminView> {
    let revision_id = state.storage.get_revision_id().await.unwrap_or(0);
    let result = state.admin().delete_news(&id, confirm.into()).await;
    respond(&state.storage, revision_id, Surface::Admin, result).await
}

/// POST /api/admin/games - Add a custom game.
pub async fn create_game(
    State(state): State<AppState>,
    Json(request): Json<CreateGameRequest>,
) -> ApiResult<AdminView> {
    let revision_id = state.storage.get_revision_id().await.unwrap_or(0);
    let result = state.admin().create_game(&request).await;
    respond(&state.storage, revision_id, Surface::Admin, result).await
}

/// DELETE /api/admin/games/:id?confirm=true - Delete a custom game.
pub async fn delete_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(confirm): Query<ConfirmQuery>,
) -> ApiResult<AdminView> {
    let revision_id = state.storage.get_revision_id().await.unwrap_or(0);
    let result = state.admin().delete_game(&id, confirm.into()).await;
    respond(&state.storage, revision_id, Surface::Admin, result).await
}

/// PUT /api/admin/token - Save the token snapshot.
pub async fn save_token(
    State(state): State<AppState>,
    Json(request): Json<SaveTokenRequest>,
) -> ApiResult<AdminView> {
    let revision_id = state.storage.get_revision_id().await.unwrap_or(0);
    let result = state.admin().save_token(&request).await;
    respond(&state.storage, revision_id, Surface::Admin, result).await
}

/// POST /api/admin/token/quote - Fill the token form from the price source.
pub async fn fetch_token_quote(State(state): State<AppState>) -> ApiResult<TokenForm> {
    let revision_id = state.storage.get_revision_id().await.unwrap_or(0);
    let result = state.admin().fetch_quote(state.prices.as_ref()).await;
    respond(&state.storage, revision_id, Surface::Admin, result).await
}
