//! Handlers for linked reference entities (canals, rides, headgates, ...).

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use fieldmark_core::drawing::ElementType;
use fieldmark_core::error::CoreError;
use fieldmark_db::repositories::LinkedEntityRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/entities/{type}
///
/// Entities of one type ordered by name. Types that never carry records
/// (hazard, maintenance, custom) return an empty list.
pub async fn list_entities(
    State(state): State<AppState>,
    Path(entity_type): Path<String>,
) -> AppResult<impl IntoResponse> {
    let entity_type: ElementType = entity_type.parse()?;
    let entities = LinkedEntityRepo::list_by_type(&state.pool, entity_type).await?;

    Ok(Json(DataResponse { data: entities }))
}

/// GET /api/v1/entities/{type}/{id}
pub async fn get_entity(
    State(state): State<AppState>,
    Path((entity_type, id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let entity_type: ElementType = entity_type.parse()?;
    let entity = LinkedEntityRepo::find_by_id(&state.pool, entity_type, &id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "LinkedEntity",
                id: id.clone(),
            })
        })?;

    Ok(Json(DataResponse { data: entity }))
}
