//! Error types and result types for query building operations.
//!
//! Building a query never fails: empty or malformed filter values degrade to
//! "remove the condition". Errors only surface when restoring serialized state
//! or parsing a condition from arbitrary JSON. Use [`QueryResult<T>`] as the
//! return type for those fallible operations.

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur while restoring or parsing query state.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Serialization/deserialization error when converting to or from JSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The value could not be interpreted as a filter condition.
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),
    /// A serialized filter, paginator or query snapshot has an unexpected shape.
    #[error("Invalid serialized state: {0}")]
    InvalidSerializedState(String),
}

/// A specialized `Result` type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

impl From<SerdeJsonError> for QueryError {
    fn from(err: SerdeJsonError) -> Self {
        QueryError::Serialization(err.to_string())
    }
}
