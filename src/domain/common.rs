use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

/// Identifies entities that expose a stable unique identifier.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// Supplies a presentation-ready label for UI or logs.
pub trait Displayable {
    fn display_label(&self) -> String;
}

/// Binds a stored entity to its document collection and its create payload.
///
/// The payload is the strict shape handed to the store; the entity is the
/// payload plus the store-assigned `id` field.
pub trait Persisted: Identifiable + Serialize + DeserializeOwned + Clone + Send + Sync {
    const COLLECTION: &'static str;
    /// Human-readable singular used in commit errors and notices.
    const NOUN: &'static str;
    type Payload: Serialize + Send + Sync;
}

// Re-export common dependencies so consumers can rely on this module as a façade.
pub use chrono;
pub use serde;
pub use uuid;
