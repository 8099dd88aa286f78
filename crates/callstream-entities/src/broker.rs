//! In-process topic-filtered pub/sub
//!
//! Subscribers register a set of topic prefixes and receive every published
//! event whose topic starts with any of them. Each subscriber has its own
//! unbounded queue, so a slow subscriber delays nobody and a single
//! subscriber sees events in publish order.

use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender, unbounded};

use callstream_core::EpochSecs;
use callstream_logapi::{LogApiMessage, VoiceHeader};

/// Message part of a published event
#[derive(Debug, Clone)]
pub enum EventContent {
    Signaling(Arc<LogApiMessage>),
    /// A voice frame; `alaw` carries exactly one 480-byte G.711 frame
    Voice { header: VoiceHeader, alaw: Arc<[u8]> },
}

/// One event as carried by the broker
#[derive(Debug, Clone)]
pub struct Event {
    pub topic: String,
    pub timestamp: EpochSecs,
    pub content: EventContent,
}

impl Event {
    pub fn signaling(timestamp: EpochSecs, msg: LogApiMessage) -> Self {
        Self {
            topic: msg.topic(),
            timestamp,
            content: EventContent::Signaling(Arc::new(msg)),
        }
    }

    pub fn voice(timestamp: EpochSecs, header: VoiceHeader, alaw: Vec<u8>) -> Self {
        Self {
            topic: header.topic(),
            timestamp,
            content: EventContent::Voice {
                header,
                alaw: alaw.into(),
            },
        }
    }
}

type SubscriptionId = u64;

struct SubscriberEntry {
    id: SubscriptionId,
    prefixes: Vec<String>,
    sender: Sender<Event>,
}

#[derive(Default)]
struct BrokerInner {
    next_id: SubscriptionId,
    subscribers: Vec<SubscriberEntry>,
}

/// Handle yielding the events matching a subscription, in publish order
pub struct Subscription {
    id: SubscriptionId,
    pub receiver: Receiver<Event>,
}

/// Cloneable broker handle. The topic table is internally synchronized;
/// publishers and subscribers may live on different threads.
#[derive(Clone, Default)]
pub struct Broker {
    inner: Arc<Mutex<BrokerInner>>,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in every topic starting with any of `prefixes`.
    /// The empty prefix matches all topics.
    pub fn subscribe(&self, prefixes: Vec<String>) -> Subscription {
        let (sender, receiver) = unbounded();
        let mut inner = self.inner.lock().expect("broker lock poisoned");
        inner.next_id += 1;
        let id = inner.next_id;
        inner.subscribers.push(SubscriberEntry { id, prefixes, sender });
        tracing::debug!("subscription {} registered", id);
        Subscription { id, receiver }
    }

    /// Stop delivery to the given subscription. Events already queued
    /// remain readable on the handle until it is dropped.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        let mut inner = self.inner.lock().expect("broker lock poisoned");
        inner.subscribers.retain(|entry| entry.id != subscription.id);
        tracing::debug!("subscription {} removed", subscription.id);
    }

    /// Deliver `event` to every matching subscriber. Non-blocking;
    /// subscribers whose handle was dropped are pruned on the way.
    pub fn publish(&self, event: Event) {
        let mut inner = self.inner.lock().expect("broker lock poisoned");
        inner.subscribers.retain(|entry| {
            let matches = entry.prefixes.iter().any(|prefix| event.topic.starts_with(prefix.as_str()));
            if !matches {
                return true;
            }
            match entry.sender.send(event.clone()) {
                Ok(()) => true,
                Err(_) => {
                    tracing::debug!("subscription {} disconnected, pruning", entry.id);
                    false
                }
            }
        });
    }

    /// Number of registered subscriptions, for diagnostics
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().expect("broker lock poisoned").subscribers.len()
    }
}
