//! Handlers for the review queue.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use fieldmark_core::approval::{ApprovalStatus, ReviewAction};
use fieldmark_core::dates;
use fieldmark_core::drawing::Drawing;
use fieldmark_core::error::CoreError;
use fieldmark_db::repositories::DrawingRepo;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::drawing::find_visible;
use crate::middleware::actor::Actor;
use crate::query::{ApprovalQuery, ApprovalView};
use crate::response::DataResponse;
use crate::state::AppState;

/// `POST /drawings/approval` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub element_id: String,
    pub action: ReviewAction,
    /// Defaults to the acting user.
    pub reviewed_by: Option<String>,
    pub review_notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PendingCount {
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct PendingSummary {
    pub count: usize,
    pub drawings: Vec<Drawing>,
}

/// GET /api/v1/drawings/approval
///
/// `?action=count` returns the number of pending drawings the actor can see,
/// `?action=pending` those drawings themselves, anything else both.
pub async fn approval_queue(
    actor: Actor,
    State(state): State<AppState>,
    Query(params): Query<ApprovalQuery>,
) -> AppResult<impl IntoResponse> {
    let response = match params.view() {
        Some(ApprovalView::Count) => {
            let count = pending_for(&state, &actor).await?.len();
            Json(DataResponse {
                data: PendingCount { count },
            })
            .into_response()
        }
        Some(ApprovalView::Pending) => {
            let drawings = pending_for(&state, &actor).await?;
            Json(DataResponse { data: drawings }).into_response()
        }
        None => {
            let drawings = pending_for(&state, &actor).await?;
            let count = drawings.len();
            Json(DataResponse {
                data: PendingSummary { count, drawings },
            })
            .into_response()
        }
    };

    Ok(response)
}

async fn pending_for(state: &AppState, actor: &Actor) -> AppResult<Vec<Drawing>> {
    let pending = DrawingRepo::list_by_approval(&state.pool, ApprovalStatus::Pending).await?;
    Ok(pending
        .into_iter()
        .filter(|d| d.visible_to(&actor.viewer))
        .map(|d| d.redacted_for(&actor.viewer))
        .collect())
}

/// POST /api/v1/drawings/approval
///
/// Approve, reject or reopen a drawing. Any state may move to any other.
pub async fn review_drawing(
    actor: Actor,
    State(state): State<AppState>,
    Json(input): Json<ReviewRequest>,
) -> AppResult<impl IntoResponse> {
    if input.element_id.trim().is_empty() {
        return Err(AppError::BadRequest("elementId must not be empty".into()));
    }

    find_visible(&state, &actor, &input.element_id).await?;

    let status = input.action.target_status();
    let reviewer = input
        .reviewed_by
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| actor.id().to_string());

    let updated = DrawingRepo::set_approval(
        &state.pool,
        &input.element_id,
        status,
        &reviewer,
        input.review_notes.as_deref(),
        dates::now(),
    )
    .await?
    .ok_or_else(|| AppError::Core(CoreError::drawing_not_found(&input.element_id)))?;

    tracing::info!(
        drawing_id = %updated.id,
        status = %status,
        reviewed_by = %reviewer,
        "Drawing reviewed",
    );

    Ok(Json(DataResponse {
        data: updated.redacted_for(&actor.viewer),
    }))
}
