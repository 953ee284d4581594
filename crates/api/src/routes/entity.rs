//! Route definitions for linked entities.

use axum::routing::get;
use axum::Router;

use crate::handlers::entity;
use crate::state::AppState;

/// Entity routes mounted at `/entities`.
///
/// ```text
/// GET    /{type}            -> list_entities
/// GET    /{type}/{id}       -> get_entity
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{entity_type}", get(entity::list_entities))
        .route("/{entity_type}/{id}", get(entity::get_entity))
}
