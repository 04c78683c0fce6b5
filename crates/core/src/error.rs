use crate::status::GfxStatus;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid transition for {code}: cannot apply {action} while {from}")]
    InvalidTransition {
        code: String,
        from: GfxStatus,
        action: &'static str,
    },

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl CoreError {
    /// Shorthand for a missing language entry.
    pub fn language_not_found(code: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "language",
            id: code.into(),
        }
    }

    /// Shorthand for a missing review card.
    pub fn card_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "card",
            id: id.into(),
        }
    }
}
