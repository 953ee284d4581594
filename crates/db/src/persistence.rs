//! Postgres-backed [`DrawingPersistence`] for debounced sessions.

use async_trait::async_trait;
use fieldmark_core::drawing::Drawing;
use fieldmark_core::error::CoreError;
use fieldmark_core::session::DrawingPersistence;

use crate::repositories::DrawingRepo;
use crate::DbPool;

/// Writes session flushes through [`DrawingRepo`].
#[derive(Clone)]
pub struct PgDrawingPersistence {
    pool: DbPool,
}

impl PgDrawingPersistence {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn storage_error(e: sqlx::Error) -> CoreError {
    CoreError::Internal(format!("Database error: {e}"))
}

#[async_trait]
impl DrawingPersistence for PgDrawingPersistence {
    async fn save_drawings(&self, drawings: &[Drawing]) -> Result<(), CoreError> {
        let saved = DrawingRepo::save_many(&self.pool, drawings)
            .await
            .map_err(storage_error)?;
        tracing::debug!(count = saved, "Persisted drawings");
        Ok(())
    }

    async fn delete_drawing(&self, id: &str) -> Result<bool, CoreError> {
        DrawingRepo::delete(&self.pool, id)
            .await
            .map_err(storage_error)
    }
}
