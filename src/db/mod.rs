use uuid::Uuid;

use crate::{
    domain::{Endpoint, Event, NewEvent},
    errors::StoreError,
};

pub mod memory;

/// Endpoint and event storage with expiry-aware visibility.
///
/// Operations are synchronous and short; none of them may be held across a
/// network call.
pub trait EntityStore: Send + Sync {
    fn create_endpoint(&self, name: String, ttl_seconds: Option<i64>) -> Endpoint;
    fn get_endpoint(&self, id: Uuid) -> Result<Endpoint, StoreError>;
    /// Records an event and bumps the endpoint's counter as one unit.
    fn save_event(&self, endpoint_id: Uuid, event: NewEvent) -> Result<Event, StoreError>;
    fn get_event(&self, id: Uuid) -> Result<Event, StoreError>;
    /// Events in capture order. Not gated on endpoint expiry.
    fn list_events(&self, endpoint_id: Uuid) -> Result<Vec<Event>, StoreError>;
    fn increment_replay_count(&self, event_id: Uuid) -> Result<(), StoreError>;
}
