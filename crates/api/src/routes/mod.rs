pub mod drawing;
pub mod entity;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /drawings                         list, save (single or batch), clear
/// /drawings/bounds                  map bounds over visible drawings
/// /drawings/approval                review queue (GET), review decision (POST)
/// /drawings/{id}                    get, update, delete
/// /drawings/{id}/geojson            GeoJSON feature export
/// /drawings/{id}/issue              report (POST), resolve (DELETE)
///
/// /entities/{type}                  linked entities of one type
/// /entities/{type}/{id}             one linked entity
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Drawings, approval queue and issues.
        .nest("/drawings", drawing::router())
        // Linked reference entities.
        .nest("/entities", entity::router())
}
