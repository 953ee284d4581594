//! Route definitions for drawings.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{approval, drawing};
use crate::state::AppState;

/// Drawing routes mounted at `/drawings`.
///
/// ```text
/// GET    /                  -> list_drawings
/// POST   /                  -> save_drawings
/// DELETE /                  -> clear_drawings
/// GET    /bounds            -> drawing_bounds
/// GET    /approval          -> approval_queue
/// POST   /approval          -> review_drawing
/// GET    /{id}              -> get_drawing
/// PUT    /{id}              -> update_drawing
/// DELETE /{id}              -> delete_drawing
/// GET    /{id}/geojson      -> export_geojson
/// POST   /{id}/issue        -> report_issue
/// DELETE /{id}/issue        -> resolve_issue
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(drawing::list_drawings)
                .post(drawing::save_drawings)
                .delete(drawing::clear_drawings),
        )
        .route("/bounds", get(drawing::drawing_bounds))
        .route(
            "/approval",
            get(approval::approval_queue).post(approval::review_drawing),
        )
        .route(
            "/{id}",
            get(drawing::get_drawing)
                .put(drawing::update_drawing)
                .delete(drawing::delete_drawing),
        )
        .route("/{id}/geojson", get(drawing::export_geojson))
        .route(
            "/{id}/issue",
            post(drawing::report_issue).delete(drawing::resolve_issue),
        )
}
