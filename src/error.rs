// Error types for the workspace pipeline
//
// Malformed request input never lands here: the resolver normalizes it to a
// default. What remains is "the record is not there" and "the warehouse failed".

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// A detail record requested by id is absent from the warehouse.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// No entry in the dispatch table carries this name.
    #[error("unknown workspace: {0}")]
    UnknownWorkspace(String),

    /// The warehouse query failed. Passed through unmodified.
    #[error("warehouse query failed: {0}")]
    Query(#[from] rusqlite::Error),

    /// The warehouse handle could not be acquired.
    #[error("warehouse unavailable: {0}")]
    Unavailable(String),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

impl WorkspaceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        WorkspaceError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// True for conditions the web layer renders as a 404.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            WorkspaceError::NotFound { .. } | WorkspaceError::UnknownWorkspace(_)
        )
    }
}

pub type Result<T, E = WorkspaceError> = std::result::Result<T, E>;
