//! Live call registry
//!
//! Tracks the set of currently active calls inferred from the signaling
//! stream. Entries appear on new-call-setup events and disappear on
//! release or when the maintenance sweep finds them inactive.

use std::collections::HashMap;

use callstream_core::{CallId, CallKind, EpochSecs, FeederId};

use crate::broker::Subscription;

/// One active call and its interception state
pub struct LiveCall {
    pub id: CallId,
    pub kind: CallKind,
    pub last_activity: EpochSecs,
    /// Feeder held while the call is intercepted. The feeder arena stays
    /// authoritative for the free flag.
    pub feeder: Option<FeederId>,
    /// Voice subscription held while the call is intercepted
    pub subscription: Option<Subscription>,
    /// Most recent A-side half frame of a duplex call
    pub cache_a: Option<Vec<u8>>,
    /// B-side half frame, only ever set momentarily before a merge
    pub cache_b: Option<Vec<u8>>,
}

impl LiveCall {
    fn new(id: CallId, kind: CallKind, now: EpochSecs) -> Self {
        Self {
            id,
            kind,
            last_activity: now,
            feeder: None,
            subscription: None,
            cache_a: None,
            cache_b: None,
        }
    }

    pub fn is_intercepted(&self) -> bool {
        self.feeder.is_some()
    }
}

#[derive(Default)]
pub struct Registry {
    calls: HashMap<CallId, LiveCall>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call seen in a new-call-setup event. A repeated setup for
    /// a known call only refreshes its activity.
    pub fn insert(&mut self, id: CallId, kind: CallKind, now: EpochSecs) {
        match self.calls.entry(id) {
            std::collections::hash_map::Entry::Occupied(mut entry) => {
                tracing::warn!("call <{}> already registered, refreshing", id);
                entry.get_mut().last_activity = now;
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                tracing::info!("call <{}> registered, type {}", id, kind);
                entry.insert(LiveCall::new(id, kind, now));
            }
        }
    }

    /// Take a call out of the registry. The caller is responsible for
    /// returning its feeder and dropping its subscription.
    pub fn remove(&mut self, id: CallId) -> Option<LiveCall> {
        let removed = self.calls.remove(&id);
        if removed.is_some() {
            tracing::info!("call <{}> removed", id);
        }
        removed
    }

    pub fn get(&self, id: CallId) -> Option<&LiveCall> {
        self.calls.get(&id)
    }

    pub fn get_mut(&mut self, id: CallId) -> Option<&mut LiveCall> {
        self.calls.get_mut(&id)
    }

    pub fn refresh(&mut self, id: CallId, now: EpochSecs) {
        if let Some(call) = self.calls.get_mut(&id) {
            call.last_activity = now;
        }
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Ids of all active calls, sorted for stable replies
    pub fn ids(&self) -> Vec<CallId> {
        let mut ids: Vec<CallId> = self.calls.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Ids of the calls currently holding a voice subscription
    pub fn intercepted_ids(&self) -> Vec<CallId> {
        self.calls
            .values()
            .filter(|call| call.subscription.is_some())
            .map(|call| call.id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LiveCall> {
        self.calls.values()
    }

    /// Calls whose last activity is older than the inactivity period.
    /// Keys are collected first; removal happens through the same path as
    /// an explicit release.
    pub fn expired_ids(&self, now: EpochSecs, inactivity_period: u64) -> Vec<CallId> {
        self.calls
            .values()
            .filter(|call| now.saturating_sub(call.last_activity) > inactivity_period)
            .map(|call| call.id)
            .collect()
    }
}
