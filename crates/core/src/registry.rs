//! In-flight call registry
//!
//! Concurrency-safe table of [`CallState`] records keyed by [`CallId`].
//! The registry is the only shared mutable structure in the system:
//! updates to one call are serialized through exclusive per-key access,
//! while calls with different keys proceed independently (sharded map,
//! no global lock). Terminal records stay queryable for a retention
//! window, then an eviction sweep removes them.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{Result, ScreenError};
use crate::types::{CallId, CallSnapshot, CallState, IncomingCallEvent};

/// Registry of in-flight and recently finished calls
#[derive(Debug, Default)]
pub struct CallRegistry {
    calls: DashMap<CallId, CallState>,
}

impl CallRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            calls: DashMap::new(),
        }
    }

    /// Accept a call-arrival event and create its record.
    ///
    /// Fails with `AlreadyExists` when the call ID is already present.
    pub fn create(
        &self,
        event: &IncomingCallEvent,
        owner_user_id: Option<String>,
    ) -> Result<CallSnapshot> {
        let state = CallState::from_event(event, owner_user_id);
        let call_id = state.call_id.clone();

        match self.calls.entry(call_id.clone()) {
            Entry::Occupied(_) => Err(ScreenError::already_exists(format!(
                "call {} is already registered",
                call_id
            ))),
            Entry::Vacant(vacant) => {
                let snapshot = state.snapshot();
                vacant.insert(state);
                tracing::debug!("Registered call {}", call_id);
                Ok(snapshot)
            }
        }
    }

    /// Get a snapshot of a call record
    pub fn get(&self, call_id: &CallId) -> Result<CallSnapshot> {
        self.calls
            .get(call_id)
            .map(|entry| entry.value().snapshot())
            .ok_or_else(|| ScreenError::not_found(format!("call {}", call_id)))
    }

    /// Apply a single atomic mutation to a call record.
    ///
    /// Mutations to the same call are serialized; the mutator runs while
    /// holding exclusive access to the entry. A mutator error leaves the
    /// record as the mutator left it and is returned to the caller.
    pub fn update<F>(&self, call_id: &CallId, mutator: F) -> Result<CallSnapshot>
    where
        F: FnOnce(&mut CallState) -> Result<()>,
    {
        let mut entry = self
            .calls
            .get_mut(call_id)
            .ok_or_else(|| ScreenError::not_found(format!("call {}", call_id)))?;

        mutator(entry.value_mut())?;
        entry.value_mut().updated_at = Utc::now();
        Ok(entry.value().snapshot())
    }

    /// Mark a call for cooperative cancellation (external hangup observed)
    pub fn request_hangup(&self, call_id: &CallId) -> Result<CallSnapshot> {
        self.update(call_id, |call| {
            call.hangup_requested = true;
            Ok(())
        })
    }

    /// Whether a call should abort at its next suspension point.
    ///
    /// A missing record (already evicted) also reads as cancelled so a
    /// straggling pipeline stops instead of resurrecting state.
    pub fn hangup_requested(&self, call_id: &CallId) -> bool {
        self.calls
            .get(call_id)
            .map(|entry| entry.value().hangup_requested)
            .unwrap_or(true)
    }

    /// Remove terminal records older than the retention window.
    ///
    /// Returns the number of evicted records.
    pub fn evict_expired(&self, now: DateTime<Utc>, retention: Duration) -> usize {
        let retention = chrono::Duration::from_std(retention)
            .unwrap_or_else(|_| chrono::Duration::seconds(300));

        let before = self.calls.len();
        self.calls
            .retain(|_, call| !(call.status.is_terminal() && now - call.updated_at > retention));
        before - self.calls.len()
    }

    /// Total number of tracked records (including retained terminal ones)
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Number of calls still moving through the pipeline
    pub fn active_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|entry| !entry.value().status.is_terminal())
            .count()
    }

    /// Whether a call record is present
    pub fn contains(&self, call_id: &CallId) -> bool {
        self.calls.contains_key(call_id)
    }
}
