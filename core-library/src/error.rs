use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LibraryError {
    #[error("Cache miss: {entity_type} with id {id}")]
    CacheMiss { entity_type: String, id: String },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },
}

impl LibraryError {
    /// Shorthand for a cache miss on a content record.
    pub fn content_miss(id: i64) -> Self {
        LibraryError::CacheMiss {
            entity_type: "Content".to_string(),
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
