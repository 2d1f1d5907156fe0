use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current UTC instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Source of fresh unique identifiers for sessions, tokens and rows.
pub trait IdGenerator: Send + Sync {
    /// Returns a new unique identifier.
    fn next_id(&self) -> Uuid;
}
