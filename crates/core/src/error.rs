#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a missing drawing.
    pub fn drawing_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Drawing",
            id: id.into(),
        }
    }
}
