//! Call stream collector
//!
//! Receives the log server UDP feed, reassembles it across datagram
//! boundaries and publishes every recovered message on the broker. Junk
//! between messages is discarded by the decoder; fragmented messages are
//! completed by retaining the unconsumed suffix between datagrams.

use std::io;
use std::net::UdpSocket;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use callstream_config::SharedConfig;
use callstream_core::{EpochSecs, epoch_now};
use callstream_logapi::decoder::{LogEvent, decode};

use crate::broker::{Broker, Event};

/// Largest chunk read from the socket in one go
pub const MAX_DATAGRAM: usize = 4096;

pub struct Collector {
    config: SharedConfig,
    broker: Broker,
    /// Unparsed suffix of the stream, bounded by one datagram plus one
    /// incomplete message
    buffer: Vec<u8>,
}

impl Collector {
    pub fn new(config: SharedConfig, broker: Broker) -> Self {
        Self {
            config,
            broker,
            buffer: Vec::with_capacity(MAX_DATAGRAM),
        }
    }

    /// Append one received chunk, decode and publish every complete message
    pub fn ingest(&mut self, chunk: &[u8], now: EpochSecs) {
        self.buffer.extend_from_slice(chunk);

        let (events, consumed) = decode(&self.buffer);
        for event in events {
            self.publish_event(event, now);
        }
        self.buffer.drain(..consumed);

        tracing::trace!("{} bytes retained for reassembly", self.buffer.len());
    }

    fn publish_event(&self, event: LogEvent, now: EpochSecs) {
        match event {
            LogEvent::Signaling { msg } => {
                tracing::debug!("publishing {} seq={}", msg.topic(), msg.header.sequence);
                self.broker.publish(Event::signaling(now, msg));
            }
            LogEvent::Voice { header, alaw: Some(alaw) } => {
                tracing::trace!("publishing V_{} seq={}", header.call_id, header.packet_seq);
                self.broker.publish(Event::voice(now, header, alaw));
            }
            LogEvent::Voice { header, alaw: None } => {
                // TETRA-encoded payloads are not carried through
                tracing::debug!(
                    "voice frame for call {} with payload kind {} discarded",
                    header.call_id,
                    header.payload1_kind
                );
            }
        }
    }

    /// Bytes currently held for reassembly
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Bind the configured UDP endpoint and pump the feed until `running`
    /// goes false. Transient receive errors are logged and do not end the
    /// loop; a failing bind is a startup error and does.
    pub fn run(&mut self, running: Arc<AtomicBool>) -> io::Result<()> {
        let endpoint = self.config.config().collector.log_server_endpoint;
        let socket = UdpSocket::bind(endpoint)?;
        socket.set_read_timeout(Some(Duration::from_millis(250)))?;
        tracing::info!("collector listening on udp://{}", endpoint);

        let mut chunk = [0u8; MAX_DATAGRAM];
        while running.load(Ordering::SeqCst) {
            match socket.recv(&mut chunk) {
                Ok(0) => {
                    tracing::warn!("empty datagram received");
                }
                Ok(n) => {
                    tracing::trace!("received {} bytes", n);
                    self.ingest(&chunk[..n], epoch_now());
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => {
                    // Timeout so the running flag is rechecked
                }
                Err(e) => {
                    tracing::error!("recv failed: {}", e);
                }
            }
        }

        tracing::info!("collector stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callstream_logapi::messages::{GROUPCALL_NEWCALLSETUP, GroupCallChange, LogApiBody, LogApiMessage, MAX_MESSAGE_SIZE};
    use callstream_logapi::voice::{PAYLOAD_INFO_G711, VoiceHeader};

    fn collector_with_firehose() -> (Collector, crate::broker::Subscription) {
        let broker = Broker::new();
        let sub = broker.subscribe(vec![String::new()]);
        let config = SharedConfig::from_config(Default::default());
        (Collector::new(config, broker), sub)
    }

    fn group_setup(call_id: u32) -> Vec<u8> {
        LogApiMessage::new(
            1,
            LogApiBody::GroupCallStartChange(GroupCallChange {
                call_id,
                action: GROUPCALL_NEWCALLSETUP,
                ..GroupCallChange::default()
            }),
        )
        .encode()
    }

    fn voice_bytes(call_id: u32) -> Vec<u8> {
        let mut bytes = VoiceHeader {
            call_id,
            payload1_kind: PAYLOAD_INFO_G711,
            ..VoiceHeader::default()
        }
        .encode();
        bytes.extend_from_slice(&[0u8; 480]);
        bytes
    }

    #[test]
    fn test_message_split_across_datagrams() {
        let (mut collector, sub) = collector_with_firehose();
        let msg = group_setup(9001);

        collector.ingest(&msg[..50], 1000);
        assert_eq!(sub.receiver.try_iter().count(), 0);
        assert_eq!(collector.pending_len(), 50);

        collector.ingest(&msg[50..], 1001);
        let events: Vec<Event> = sub.receiver.try_iter().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].topic, "S_48");
        assert_eq!(events[0].timestamp, 1001);
        assert_eq!(collector.pending_len(), 0);
    }

    #[test]
    fn test_multiple_messages_in_one_datagram() {
        let (mut collector, sub) = collector_with_firehose();
        let mut datagram = group_setup(1);
        datagram.extend_from_slice(&voice_bytes(1));
        datagram.extend_from_slice(&group_setup(2));

        collector.ingest(&datagram, 1000);
        let topics: Vec<String> = sub.receiver.try_iter().map(|e| e.topic).collect();
        assert_eq!(topics, vec!["S_48", "V_1", "S_48"]);
    }

    #[test]
    fn test_non_g711_voice_not_published() {
        let (mut collector, sub) = collector_with_firehose();
        let mut bytes = VoiceHeader {
            call_id: 3,
            payload1_kind: 2, // TCH/S
            ..VoiceHeader::default()
        }
        .encode();
        bytes.extend_from_slice(&[0u8; 480]);

        collector.ingest(&bytes, 1000);
        assert_eq!(sub.receiver.try_iter().count(), 0);
        assert_eq!(collector.pending_len(), 0);
    }

    #[test]
    fn test_reassembly_buffer_stays_bounded() {
        let (mut collector, _sub) = collector_with_firehose();

        // Garbage-only chunks are consumed down to at most 3 trailing bytes
        for _ in 0..100 {
            collector.ingest(&[0x5Au8; 1024], 1000);
            assert!(collector.pending_len() < 4);
        }

        // A partial message is the only thing that accumulates
        let msg = group_setup(1);
        collector.ingest(&msg[..msg.len() - 1], 1000);
        assert!(collector.pending_len() <= MAX_DATAGRAM + MAX_MESSAGE_SIZE);
    }
}
