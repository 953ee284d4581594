//! Handlers for the drawing collection, single drawings and their issue.
//!
//! Reads are filtered to what the acting user may see and have contact
//! fields redacted per `contactPrivacy`. A drawing the actor may not see is
//! reported as missing.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fieldmark_core::centroid::{self, MapBounds};
use fieldmark_core::dates;
use fieldmark_core::drawing::{Drawing, DrawingInput, DrawingPatch, IssueInput};
use fieldmark_core::error::CoreError;
use fieldmark_core::geometry;
use fieldmark_core::privacy;
use fieldmark_db::repositories::DrawingRepo;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::middleware::actor::Actor;
use crate::query::DrawingListParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// `POST /drawings` body: one drawing or a batch.
#[derive(Debug, Deserialize)]
pub struct SaveDrawingsRequest {
    pub drawing: Option<DrawingInput>,
    pub drawings: Option<Vec<DrawingInput>>,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub deleted: u64,
}

/// Load a drawing the actor may see, or 404.
pub(crate) async fn find_visible(
    state: &AppState,
    actor: &Actor,
    id: &str,
) -> AppResult<Drawing> {
    DrawingRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|d| d.visible_to(&actor.viewer))
        .ok_or_else(|| AppError::Core(CoreError::drawing_not_found(id)))
}

/* ---- Collection ---- */

/// GET /api/v1/drawings
///
/// List drawings visible to the actor, optionally narrowed by `?role=`
/// (privacy grant) and `?status=` (approval state).
pub async fn list_drawings(
    actor: Actor,
    State(state): State<AppState>,
    Query(params): Query<DrawingListParams>,
) -> AppResult<impl IntoResponse> {
    let role = params.role()?;
    let status = params.status()?;

    let drawings = match status {
        Some(status) => DrawingRepo::list_by_approval(&state.pool, status).await?,
        None => DrawingRepo::list_all(&state.pool).await?,
    };

    let data: Vec<Drawing> = drawings
        .into_iter()
        .filter(|d| role.map_or(true, |r| privacy::can_access(d.privacy.as_ref(), r)))
        .filter(|d| d.visible_to(&actor.viewer))
        .map(|d| d.redacted_for(&actor.viewer))
        .collect();

    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/drawings
///
/// Upsert `{ "drawing": {...} }` or `{ "drawings": [...] }`. A single drawing
/// is returned as stored; a batch returns the normalized drawings.
pub async fn save_drawings(
    actor: Actor,
    State(state): State<AppState>,
    Json(input): Json<SaveDrawingsRequest>,
) -> AppResult<Response> {
    let now = dates::now();

    match (input.drawing, input.drawings) {
        (Some(one), None) => {
            let drawing = one.into_drawing(&actor.viewer, now)?;
            let saved = DrawingRepo::upsert(&state.pool, &drawing).await?;

            tracing::info!(
                drawing_id = %saved.id,
                user_id = %actor.id(),
                approval = %saved.approval_status,
                "Drawing saved",
            );

            Ok((StatusCode::CREATED, Json(DataResponse { data: saved })).into_response())
        }
        (None, Some(many)) => {
            let drawings = many
                .into_iter()
                .map(|d| d.into_drawing(&actor.viewer, now))
                .collect::<Result<Vec<_>, _>>()?;
            let count = DrawingRepo::save_many(&state.pool, &drawings).await?;

            tracing::info!(count, user_id = %actor.id(), "Drawings saved");

            Ok((StatusCode::CREATED, Json(DataResponse { data: drawings })).into_response())
        }
        (Some(_), Some(_)) => Err(AppError::BadRequest(
            "Send either `drawing` or `drawings`, not both".into(),
        )),
        (None, None) => Err(AppError::BadRequest(
            "Request body must contain `drawing` or `drawings`".into(),
        )),
    }
}

/// DELETE /api/v1/drawings
///
/// Remove every drawing. Returns the number deleted.
pub async fn clear_drawings(
    actor: Actor,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let deleted = DrawingRepo::delete_all(&state.pool).await?;

    tracing::warn!(deleted, user_id = %actor.id(), "All drawings cleared");

    Ok(Json(DataResponse {
        data: ClearResponse { deleted },
    }))
}

/// GET /api/v1/drawings/bounds
///
/// Padded bounding box over every drawing the actor can see, or the default
/// map center when there are none.
pub async fn drawing_bounds(
    actor: Actor,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let drawings = DrawingRepo::list_all(&state.pool).await?;
    let bounds = MapBounds::from_drawings(drawings.iter().filter(|d| d.visible_to(&actor.viewer)));

    Ok(Json(DataResponse { data: bounds }))
}

/* ---- Single drawing ---- */

/// GET /api/v1/drawings/{id}
pub async fn get_drawing(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let drawing = find_visible(&state, &actor, &id).await?;

    Ok(Json(DataResponse {
        data: drawing.redacted_for(&actor.viewer),
    }))
}

/// PUT /api/v1/drawings/{id}
///
/// Merge the given fields into the stored drawing.
pub async fn update_drawing(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<DrawingPatch>,
) -> AppResult<impl IntoResponse> {
    let mut drawing = find_visible(&state, &actor, &id).await?;
    patch.apply(&mut drawing, dates::now())?;

    let updated = DrawingRepo::update(&state.pool, &drawing)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::drawing_not_found(&id)))?;

    tracing::info!(drawing_id = %id, user_id = %actor.id(), "Drawing updated");

    Ok(Json(DataResponse {
        data: updated.redacted_for(&actor.viewer),
    }))
}

/// DELETE /api/v1/drawings/{id}
pub async fn delete_drawing(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    find_visible(&state, &actor, &id).await?;
    let deleted = DrawingRepo::delete(&state.pool, &id).await?;

    if !deleted {
        return Err(AppError::Core(CoreError::drawing_not_found(id)));
    }

    tracing::info!(drawing_id = %id, user_id = %actor.id(), "Drawing deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/drawings/{id}/geojson
///
/// The drawing as a GeoJSON `Feature` (`[lng, lat]` order).
pub async fn export_geojson(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let drawing = find_visible(&state, &actor, &id).await?;

    Ok(Json(DataResponse {
        data: geojson_feature(&drawing),
    }))
}

fn geojson_feature(drawing: &Drawing) -> Value {
    let anchor = drawing.anchor();
    let label_anchor = (!centroid::is_sentinel(anchor)).then(|| geometry::swap_axes(anchor));

    json!({
        "type": "Feature",
        "id": drawing.id,
        "geometry": geometry::to_geojson_geometry(drawing.kind, &drawing.coordinates),
        "properties": {
            "name": drawing.name,
            "color": drawing.color,
            "elementType": drawing.element_type,
            "approvalStatus": drawing.approval_status,
            "privacy": privacy::privacy_display(drawing.privacy.as_ref()),
            "labelAnchor": label_anchor,
        },
    })
}

/* ---- Issue ---- */

/// POST /api/v1/drawings/{id}/issue
///
/// Open an issue on the drawing, replacing any existing one.
pub async fn report_issue(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<IssueInput>,
) -> AppResult<impl IntoResponse> {
    find_visible(&state, &actor, &id).await?;

    let now = dates::now();
    let issue = input.into_issue(&actor.viewer, now)?;

    let updated = DrawingRepo::set_issue(&state.pool, &id, &issue, now)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::drawing_not_found(&id)))?;

    tracing::info!(drawing_id = %id, issue_id = %issue.id, user_id = %actor.id(), "Issue reported");

    Ok(Json(DataResponse {
        data: updated.redacted_for(&actor.viewer),
    }))
}

/// DELETE /api/v1/drawings/{id}/issue
///
/// Resolve the drawing's issue. Resolving a drawing without one is a no-op.
pub async fn resolve_issue(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    find_visible(&state, &actor, &id).await?;

    let updated = DrawingRepo::clear_issue(&state.pool, &id, dates::now())
        .await?
        .ok_or_else(|| AppError::Core(CoreError::drawing_not_found(&id)))?;

    tracing::info!(drawing_id = %id, user_id = %actor.id(), "Issue resolved");

    Ok(Json(DataResponse {
        data: updated.redacted_for(&actor.viewer),
    }))
}
