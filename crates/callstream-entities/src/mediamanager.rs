//! Media manager
//!
//! Routes the voice streams of intercepted live calls to preconfigured
//! media server feeders and answers the control API. The manager owns the
//! call registry and the feeder arena; it learns about calls from the
//! signaling subscription and receives voice through one dedicated
//! subscription per intercepted call.

use std::io;
use std::time::Duration;

use crossbeam_channel::{Receiver, Select, tick};

use callstream_config::SharedConfig;
use callstream_core::{CallId, CallKind, EpochSecs, FeederId, epoch_now};
use callstream_logapi::messages::{
    GROUPCALL_NEWCALLSETUP, INDI_NEWCALLSETUP, LogApiBody, group_release_cause_name, indi_release_cause_name,
};
use callstream_logapi::voice::{STREAM_ORG_A_SUB, STREAM_ORG_B_SUB, stream_originator_name};

use crate::broker::{Broker, Event, EventContent, Subscription};
use crate::control::{ControlHandover, ControlReply, ControlRequest};
use crate::feeders::FeederPool;
use crate::playback::PlaybackManager;
use crate::registry::Registry;

/// Build one interleaved stereo frame from two equal-length mono frames:
/// A[0], B[0], A[1], B[1], ... The A side maps to the left channel.
pub fn interleave_stereo(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    for (&left, &right) in a.iter().zip(b.iter()) {
        merged.push(left);
        merged.push(right);
    }
    merged
}

pub struct MediaManager {
    config: SharedConfig,
    broker: Broker,
    registry: Registry,
    feeders: FeederPool,
    playback: PlaybackManager,
    /// Call setup/release events, subscribed per configuration
    signaling_sub: Subscription,
    /// Requests handed over by the control listener
    request_receiver: Receiver<ControlHandover>,
}

impl MediaManager {
    pub fn new(config: SharedConfig, broker: Broker, request_receiver: Receiver<ControlHandover>) -> io::Result<Self> {
        let cfg = config.config();
        let feeders = FeederPool::from_config(&cfg.media_manager.feeders)?;
        let signaling_sub = broker.subscribe(cfg.media_manager.subscriptions.clone());
        let playback = PlaybackManager::new(cfg.media_manager.player.clone());

        Ok(Self {
            config,
            broker,
            registry: Registry::new(),
            feeders,
            playback,
            signaling_sub,
            request_receiver,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn feeders(&self) -> &FeederPool {
        &self.feeders
    }

    fn log_startup_state(&self) {
        let cfg = self.config.config();
        tracing::info!("media manager starting");
        tracing::info!("  media server endpoint: {}", cfg.media_manager.media_server_endpoint);
        tracing::info!("  call inactivity period: {}s", cfg.media_manager.call_inactivity_period);
        tracing::info!("  maintenance frequency: {}s", cfg.media_manager.maintenance_frequency);
        tracing::info!("  subscriptions: {:?}", cfg.media_manager.subscriptions);
        if self.feeders.is_empty() {
            tracing::warn!("  no feeders configured, interception will always fail");
        }
    }

    /// Event loop: blocks until any input is ready, then drains all of
    /// them. Exits on the $TERM sentinel or when the control channel goes
    /// away.
    pub fn run(&mut self) {
        self.log_startup_state();
        let cfg = self.config.config();
        let ticker = tick(Duration::from_secs(cfg.media_manager.maintenance_frequency));

        loop {
            // Readiness wait over a dynamic input set: the per-call voice
            // subscriptions come and go with interceptions. The timeout
            // bounds how long a freshly added subscription goes unwatched.
            {
                let mut sel = Select::new();
                sel.recv(&self.request_receiver);
                sel.recv(&self.signaling_sub.receiver);
                sel.recv(&ticker);
                let voice_subs: Vec<&Subscription> = self
                    .registry
                    .iter()
                    .filter_map(|call| call.subscription.as_ref())
                    .collect();
                for sub in &voice_subs {
                    sel.recv(&sub.receiver);
                }
                let _ = sel.ready_timeout(Duration::from_millis(500));
            }

            let now = epoch_now();
            if ticker.try_recv().is_ok() {
                self.maintenance(now);
            }
            if self.process_pending(now) {
                break;
            }
        }

        tracing::info!("media manager stopped");
    }

    /// Drain every pending input without blocking. Returns true when the
    /// loop should exit.
    pub fn process_pending(&mut self, now: EpochSecs) -> bool {
        // Control requests first, so a stop is not raced by queued frames
        loop {
            match self.request_receiver.try_recv() {
                Ok((ControlRequest::Term, reply_sender)) => {
                    tracing::info!("$TERM received, shutting down");
                    let _ = reply_sender.send(ControlReply::from_parts(vec!["OK".to_string(), "OK".to_string()]));
                    return true;
                }
                Ok((request, reply_sender)) => {
                    let reply = self.handle_request(request);
                    let _ = reply_sender.send(reply);
                }
                Err(crossbeam_channel::TryRecvError::Empty) => break,
                Err(crossbeam_channel::TryRecvError::Disconnected) => {
                    tracing::info!("control channel closed, shutting down");
                    return true;
                }
            }
        }

        while let Ok(event) = self.signaling_sub.receiver.try_recv() {
            self.handle_subscription_event(event, now);
        }

        for call_id in self.registry.intercepted_ids() {
            loop {
                let next = match self.registry.get(call_id).and_then(|call| call.subscription.as_ref()) {
                    Some(sub) => sub.receiver.try_recv(),
                    None => break,
                };
                match next {
                    Ok(event) => self.handle_call_voice(call_id, event, now),
                    Err(_) => break,
                }
            }
        }

        false
    }

    /// Events arriving on the manager's own subscription: signaling drives
    /// the registry, voice only refreshes call activity (forwarding runs
    /// over the per-call subscriptions).
    pub fn handle_subscription_event(&mut self, event: Event, now: EpochSecs) {
        match event.content {
            EventContent::Signaling(msg) => self.handle_signaling(&msg.body, now),
            EventContent::Voice { header, .. } => {
                if self.registry.get(header.call_id).is_some() {
                    self.registry.refresh(header.call_id, now);
                } else {
                    tracing::trace!("voice frame for unknown call <{}>", header.call_id);
                }
            }
        }
    }

    fn handle_signaling(&mut self, body: &LogApiBody, now: EpochSecs) {
        match body {
            LogApiBody::DuplexCallChange(change) if change.action == INDI_NEWCALLSETUP => {
                self.registry.insert(change.call_id, CallKind::Duplex, now);
            }
            LogApiBody::SimplexCallStartChange(change) if change.action == INDI_NEWCALLSETUP => {
                self.registry.insert(change.call_id, CallKind::Simplex, now);
            }
            LogApiBody::GroupCallStartChange(change) if change.action == GROUPCALL_NEWCALLSETUP => {
                self.registry.insert(change.call_id, CallKind::Group, now);
            }
            LogApiBody::DuplexCallRelease(release) | LogApiBody::SimplexCallRelease(release) => {
                tracing::info!(
                    "call <{}> released ({})",
                    release.call_id,
                    indi_release_cause_name(release.release_cause)
                );
                self.release_call(release.call_id);
            }
            LogApiBody::GroupCallRelease(release) => {
                tracing::info!(
                    "group call <{}> released ({})",
                    release.call_id,
                    group_release_cause_name(release.release_cause)
                );
                self.release_call(release.call_id);
            }
            _ => {
                // Keep-alives, PTT transitions and SDS have no registry effect
            }
        }
    }

    /// One voice frame delivered on an intercepted call's subscription
    pub fn handle_call_voice(&mut self, call_id: CallId, event: Event, now: EpochSecs) {
        let EventContent::Voice { header, alaw } = event.content else {
            tracing::warn!("non-voice event on voice subscription of call <{}>", call_id);
            return;
        };

        let Some(call) = self.registry.get_mut(call_id) else {
            tracing::error!("No call found for id <{}>", call_id);
            return;
        };
        call.last_activity = now;

        let Some(feeder_id) = call.feeder else {
            tracing::error!("No feeder found for call <{}>", call_id);
            return;
        };
        let Some(feeder) = self.feeders.get(feeder_id) else {
            tracing::error!("call <{}> references unknown feeder index {}", call_id, feeder_id);
            return;
        };
        if feeder.free {
            callstream_core::assert_warn!(
                !feeder.free,
                "call <{}> references feeder '{}', frame dropped",
                call_id,
                feeder.stream_name
            );
            return;
        }

        if call.kind == CallKind::Duplex {
            // Merge the two timeline-asynchronous mono streams. Every A
            // frame replaces the cached one (stale B half-frames go with
            // it); a B frame only pairs with an already cached A.
            match header.originator {
                STREAM_ORG_A_SUB => {
                    call.cache_a = Some(alaw.to_vec());
                    call.cache_b = None;
                }
                STREAM_ORG_B_SUB if call.cache_a.is_some() => {
                    call.cache_b = Some(alaw.to_vec());
                    if let (Some(a), Some(b)) = (&call.cache_a, &call.cache_b) {
                        if a.len() == b.len() {
                            let merged = interleave_stereo(a, b);
                            tracing::debug!(
                                "Sending duplex data voice with call id <{}> to feeder <{}>",
                                call_id,
                                feeder.stream_name
                            );
                            if let Err(e) = feeder.send(&merged) {
                                tracing::warn!("send to feeder '{}' failed: {}", feeder.stream_name, e);
                            }
                        } else {
                            tracing::warn!(
                                "half-frame length mismatch on call <{}>: {} vs {}",
                                call_id,
                                a.len(),
                                b.len()
                            );
                        }
                    }
                    call.cache_a = None;
                    call.cache_b = None;
                }
                STREAM_ORG_B_SUB => {
                    tracing::debug!("B-side frame without cached A-side on call <{}>, dropped", call_id);
                }
                other => {
                    tracing::warn!(
                        "unexpected originator {} ({}) on duplex call <{}>",
                        other,
                        stream_originator_name(other),
                        call_id
                    );
                }
            }
        } else {
            tracing::debug!(
                "Sending data voice with call id <{}> to feeder <{}>",
                call_id,
                feeder.stream_name
            );
            if let Err(e) = feeder.send(&alaw) {
                tracing::warn!("send to feeder '{}' failed: {}", feeder.stream_name, e);
            }
        }
    }

    /// Answer one control request (the $TERM sentinel is intercepted in
    /// the event loop before it gets here)
    pub fn handle_request(&mut self, request: ControlRequest) -> ControlReply {
        match request {
            ControlRequest::Ping(echo) => ControlReply::from_parts(vec![echo]),
            ControlRequest::GetActiveCalls => self.get_active_calls(),
            ControlRequest::StartCallInterception { call_id, format } => self.start_interception(call_id, &format),
            ControlRequest::StopCallInterception { call_id } => self.stop_interception(call_id),
            ControlRequest::StartPlayCall(play) => self.playback.start_play(&play),
            ControlRequest::StopPlayCall(play) => self.playback.stop_play(&play),
            ControlRequest::Term => ControlReply::from_parts(vec!["OK".to_string(), "OK".to_string()]),
        }
    }

    /// Snapshot of the registry: count followed by the call ids
    fn get_active_calls(&self) -> ControlReply {
        let mut parts = vec![self.registry.len().to_string()];
        parts.extend(self.registry.ids().iter().map(|id| id.to_string()));
        ControlReply::from_parts(parts)
    }

    fn stream_url(&self, stream_name: &str, format: &str) -> String {
        format!(
            "{}/{}.{}",
            self.config.config().media_manager.media_server_endpoint,
            stream_name,
            format
        )
    }

    /// Allocate a matching feeder and subscribe to the call's voice topic.
    /// Re-requesting an already intercepted call returns the existing
    /// stream URL.
    pub fn start_interception(&mut self, call_id: CallId, format: &str) -> ControlReply {
        let (kind, held) = match self.registry.get(call_id) {
            Some(call) => (call.kind, call.feeder),
            None => {
                tracing::error!("Call with id <{}> not found", call_id);
                return ControlReply::nok(format!("Call <{}> not found", call_id));
            }
        };

        if let Some(feeder_id) = held {
            if let Some(feeder) = self.feeders.get(feeder_id) {
                if !feeder.free {
                    let name = feeder.stream_name.clone();
                    return ControlReply::ok(self.stream_url(&name, format));
                }
                // A held feeder flagged free means the link invariant broke;
                // drop the stale link and subscription before reallocating
                callstream_core::assert_warn!(
                    !feeder.free,
                    "call <{}> references feeder '{}', reallocating",
                    call_id,
                    feeder.stream_name
                );
                if let Some(call) = self.registry.get_mut(call_id) {
                    call.feeder = None;
                    if let Some(stale) = call.subscription.take() {
                        self.broker.unsubscribe(&stale);
                    }
                }
            }
        }

        let Some(feeder_id) = self.feeders.allocate(kind) else {
            tracing::error!("No available feeder resource found for call with id <{}>", call_id);
            return ControlReply::nok("Feeder not available");
        };

        let subscription = self.broker.subscribe(vec![format!("V_{}", call_id)]);
        let stream_name = self
            .feeders
            .get(feeder_id)
            .expect("allocated feeder exists")
            .stream_name
            .clone();

        if let Some(call) = self.registry.get_mut(call_id) {
            call.feeder = Some(feeder_id);
            call.subscription = Some(subscription);
        }

        tracing::info!("interception of call <{}> started on feeder '{}'", call_id, stream_name);
        ControlReply::ok(self.stream_url(&stream_name, format))
    }

    /// Return the feeder, drop the voice subscription and the half-frame
    /// caches. Not-intercepted and not-found are distinct errors.
    pub fn stop_interception(&mut self, call_id: CallId) -> ControlReply {
        let Some(call) = self.registry.get_mut(call_id) else {
            tracing::error!("Call with id <{}> not found", call_id);
            return ControlReply::nok(format!("Call <{}> not found", call_id));
        };

        let held = call.feeder.filter(|&id| self.feeders.get(id).is_some_and(|f| !f.free));
        let Some(feeder_id) = held else {
            tracing::error!("Call with id <{}> not intercepted", call_id);
            return ControlReply::nok(format!("Call <{}> not intercepted", call_id));
        };

        call.feeder = None;
        let subscription = call.subscription.take();
        call.cache_a = None;
        call.cache_b = None;

        self.feeders.release(feeder_id);
        if let Some(subscription) = subscription {
            self.broker.unsubscribe(&subscription);
        }

        tracing::info!("interception of call <{}> stopped", call_id);
        ControlReply::from_parts(vec!["OK".to_string(), "OK".to_string()])
    }

    /// Common teardown for explicit release and the inactivity sweep
    pub fn release_call(&mut self, call_id: CallId) {
        match self.registry.remove(call_id) {
            Some(call) => {
                if let Some(feeder_id) = call.feeder {
                    self.feeders.release(feeder_id);
                }
                if let Some(subscription) = call.subscription {
                    self.broker.unsubscribe(&subscription);
                }
            }
            None => {
                tracing::warn!("Call with id <{}> not found", call_id);
            }
        }
    }

    /// Periodic sweep: remove calls whose last activity is older than the
    /// inactivity period, through the same path as an explicit release
    pub fn maintenance(&mut self, now: EpochSecs) {
        let inactivity_period = self.config.config().media_manager.call_inactivity_period;
        for call_id in self.registry.expired_ids(now, inactivity_period) {
            tracing::info!("call <{}> inactive, sweeping", call_id);
            self.release_call(call_id);
        }
        self.playback.reap_finished();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleave_stereo() {
        let a = [1u8, 3, 5];
        let b = [2u8, 4, 6];
        assert_eq!(interleave_stereo(&a, &b), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_interleave_full_frames() {
        let a = [0xAAu8; 480];
        let b = [0xBBu8; 480];
        let merged = interleave_stereo(&a, &b);
        assert_eq!(merged.len(), 960);
        assert!(merged.chunks(2).all(|pair| pair == [0xAA, 0xBB]));
    }
}
