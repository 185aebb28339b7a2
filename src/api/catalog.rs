//! Catalog endpoints used by the mini-app.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};

use super::{error, respond, success, ApiResult};
use crate::identity::Viewer;
use crate::models::{RateGameRequest, ReviewFeedQuery, SetThemeRequest, SubmitReviewRequest};
use crate::notify::Surface;
use crate::render::catalog::{CatalogRenderer, CatalogView, PlayLink, ReviewCard};
use crate::AppState;

fn viewer(state: &AppState, headers: &HeaderMap) -> Viewer {
    Viewer::from_headers(headers, state.config.bot_token.as_deref())
}

/// GET /api/catalog - Render the catalog for the caller.
pub async fn get_catalog(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<CatalogView> {
    let revision_id = state.storage.get_revision_id().await.unwrap_or(0);
    let viewer = viewer(&state, &headers);

    match CatalogRenderer::new(&state.storage, &viewer).render().await {
        Ok(view) => success(view, revision_id),
        Err(e) => error(e, revision_id, Surface::Catalog),
    }
}

/// GET /api/catalog/reviews?gameId= - The newest reviews.
pub async fn list_reviews(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ReviewFeedQuery>,
) -> ApiResult<Vec<ReviewCard>> {
    let revision_id = state.storage.get_revision_id().await.unwrap_or(0);
    let viewer = viewer(&state, &headers);

    match CatalogRenderer::new(&state.storage, &viewer)
        .reviews(query.game_id.as_deref())
        .await
    {
        Ok(reviews) => success(reviews, revision_id),
        Err(e) => error(e, revision_id, Surface::Catalog),
    }
}

/// PUT /api/catalog/games/:id/rating - Rate a game.
pub async fn rate_game(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<RateGameRequest>,
) -> ApiResult<CatalogView> {
    let revision_id = state.storage.get_revision_id().await.unwrap_or(0);
    let viewer = viewer(&state, &headers);
    let result = CatalogRenderer::new(&state.storage, &viewer)
        .rate_game(&id, request.rating)
        .await;
    respond(&state.storage, revision_id, Surface::Catalog, result).await
}

/// POST /api/catalog/games/:id/play - Record a play and return the game link.
pub async fn play_game(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<PlayLink> {
    let revision_id = state.storage.get_revision_id().await.unwrap_or(0);
    let viewer = viewer(&state, &headers);
    let result = CatalogRenderer::new(&state.storage, &viewer)
        .play_game(&id)
        .await;
    respond(&state.storage, revision_id, Surface::Catalog, result).await
}

/// POST /api/catalog/reviews - Submit a review.
pub async fn submit_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SubmitReviewRequest>,
) -> ApiResult<CatalogView> {
    let revision_id = state.storage.get_revision_id().await.unwrap_or(0);
    let viewer = viewer(&state, &headers);
    let result = CatalogRenderer::new(&state.storage, &viewer)
        .submit_review(&request)
        .await;
    respond(&state.storage, revision_id, Surface::Catalog, result).await
}

/// POST /api/catalog/announcement/dismiss - Close the announcement banner.
pub async fn dismiss_announcement(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<CatalogView> {
    let revision_id = state.storage.get_revision_id().await.unwrap_or(0);
    let viewer = viewer(&state, &headers);
    let result = CatalogRenderer::new(&state.storage, &viewer)
        .dismiss_announcement()
        .await;
    respond(&state.storage, revision_id, Surface::Catalog, result).await
}

/// PUT /api/catalog/theme - Switch between light and dark.
pub async fn set_theme(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SetThemeRequest>,
) -> ApiResult<CatalogView> {
    let revision_id = state.storage.get_revision_id().await.unwrap_or(0);
    let viewer = viewer(&state, &headers);
    let result = CatalogRenderer::new(&state.storage, &viewer)
        .set_theme(request.theme)
        .await;
    respond(&state.storage, revision_id, Surface::Catalog, result).await
}
