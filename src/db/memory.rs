use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::{
    clock::{is_expired, Clock, SystemClock, TtlPolicy},
    db::EntityStore,
    domain::{Endpoint, Event, NewEvent},
    errors::StoreError,
};

/// The three collections that must change together. Only ever touched
/// through `MemoryStore::state`.
#[derive(Default)]
struct State {
    endpoints: HashMap<Uuid, Endpoint>,
    events: HashMap<Uuid, Event>,
    events_by_endpoint: HashMap<Uuid, Vec<Uuid>>,
}

impl State {
    fn live_endpoint(&self, id: Uuid, now: DateTime<Utc>) -> Result<&Endpoint, StoreError> {
        let endpoint = self
            .endpoints
            .get(&id)
            .ok_or(StoreError::EndpointNotFound)?;
        if is_expired(now, endpoint.expires_at) {
            return Err(StoreError::EndpointExpired);
        }
        Ok(endpoint)
    }
}

/// In-process store. Cloning yields another handle to the same state.
///
/// Expired endpoints and their events are never reclaimed.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
    clock: Arc<dyn Clock>,
    ttl: TtlPolicy,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>, ttl: TtlPolicy) -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            clock,
            ttl,
        }
    }

    pub fn ttl_policy(&self) -> TtlPolicy {
        self.ttl
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), TtlPolicy::default())
    }
}

impl EntityStore for MemoryStore {
    fn create_endpoint(&self, name: String, ttl_seconds: Option<i64>) -> Endpoint {
        let mut state = self.state.write();
        let now = self.clock.now();

        let endpoint = Endpoint {
            id: Uuid::new_v4(),
            name,
            created_at: now,
            expires_at: self.ttl.expires_at(now, ttl_seconds),
            event_count: 0,
        };
        state.endpoints.insert(endpoint.id, endpoint.clone());
        state.events_by_endpoint.insert(endpoint.id, Vec::new());

        tracing::debug!(
            endpoint_id = %endpoint.id,
            expires_at = %endpoint.expires_at,
            "endpoint created"
        );
        endpoint
    }

    fn get_endpoint(&self, id: Uuid) -> Result<Endpoint, StoreError> {
        let state = self.state.read();
        state.live_endpoint(id, self.clock.now()).cloned()
    }

    fn save_event(&self, endpoint_id: Uuid, event: NewEvent) -> Result<Event, StoreError> {
        let mut state = self.state.write();
        let now = self.clock.now();
        state.live_endpoint(endpoint_id, now)?;

        let stored = Event {
            id: Uuid::new_v4(),
            endpoint_id,
            received_at: now,
            method: event.method,
            headers: event.headers,
            query_params: event.query_params,
            body: event.body,
            replay_count: 0,
        };

        state.events.insert(stored.id, stored.clone());
        state
            .events_by_endpoint
            .entry(endpoint_id)
            .or_default()
            .push(stored.id);
        if let Some(endpoint) = state.endpoints.get_mut(&endpoint_id) {
            endpoint.event_count += 1;
        }

        tracing::debug!(
            %endpoint_id,
            event_id = %stored.id,
            method = %stored.method,
            "event captured"
        );
        Ok(stored)
    }

    fn get_event(&self, id: Uuid) -> Result<Event, StoreError> {
        self.state
            .read()
            .events
            .get(&id)
            .cloned()
            .ok_or(StoreError::EventNotFound)
    }

    fn list_events(&self, endpoint_id: Uuid) -> Result<Vec<Event>, StoreError> {
        let state = self.state.read();
        if !state.endpoints.contains_key(&endpoint_id) {
            return Err(StoreError::EndpointNotFound);
        }

        let events = state
            .events_by_endpoint
            .get(&endpoint_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.events.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default();
        Ok(events)
    }

    fn increment_replay_count(&self, event_id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.write();
        let event = state
            .events
            .get_mut(&event_id)
            .ok_or(StoreError::EventNotFound)?;
        event.replay_count += 1;
        Ok(())
    }
}
