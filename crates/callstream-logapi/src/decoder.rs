//! Stateless stream decoder
//!
//! The log server does not length-prefix messages within a datagram, one
//! datagram may carry several messages, and one message may span several
//! datagrams. The decoder scans for the two protocol signatures and
//! recovers from garbage by advancing a single byte at a time; the caller
//! keeps the unconsumed suffix and feeds it back with the next chunk.

use crate::messages::{HEADER_SIZE, LogApiMessage, wire_size_for};
use crate::voice::{PAYLOAD_INFO_G711, VOICE_HEADER_SIZE, VoiceHeader, payload_size};
use crate::wire::read_u32_le;
use crate::{ALAW_FRAME_SIZE, LOG_API_PROTOCOL_SIGNATURE, VOICE_PROTOCOL_SIGNATURE};

/// One decoded unit of the byte stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// A complete signaling message
    Signaling { msg: LogApiMessage },
    /// A voice frame. `alaw` holds the 480-byte G.711 payload for kind 7
    /// frames and is None for the TETRA-encoded kinds, which are parsed
    /// for their header fields and dropped.
    Voice { header: VoiceHeader, alaw: Option<Vec<u8>> },
}

impl LogEvent {
    /// Broker topic: `S_<msg_id>` for signaling, `V_<call_id>` for voice
    pub fn topic(&self) -> String {
        match self {
            LogEvent::Signaling { msg } => msg.topic(),
            LogEvent::Voice { header, .. } => header.topic(),
        }
    }
}

/// Decode as many complete messages as `buf` holds.
///
/// Returns the decoded events and the number of leading bytes consumed.
/// Bytes `[consumed..]` are either an incomplete message or trailing
/// garbage shorter than a signature; the caller must retain them and
/// prepend the next received chunk.
pub fn decode(buf: &[u8]) -> (Vec<LogEvent>, usize) {
    let mut events = Vec::new();
    let mut pos = 0;

    while buf.len() - pos >= 4 {
        let signature = read_u32_le(buf, pos);

        if signature == LOG_API_PROTOCOL_SIGNATURE {
            // Need the full header to learn the message id
            if buf.len() - pos < HEADER_SIZE {
                break;
            }
            let msg_id = buf[pos + 7];
            match wire_size_for(msg_id) {
                Some(size) => {
                    if buf.len() - pos < size {
                        break;
                    }
                    match LogApiMessage::parse(&buf[pos..pos + size]) {
                        Ok(msg) => {
                            events.push(LogEvent::Signaling { msg });
                            pos += size;
                        }
                        Err(e) => {
                            // Cannot happen after the size gate; resync anyway
                            tracing::warn!("signaling parse failed after size gate: {}", e);
                            pos += 1;
                        }
                    }
                }
                None => {
                    tracing::debug!("unknown message id 0x{:02x}, resyncing", msg_id);
                    pos += 1;
                }
            }
        } else if signature == VOICE_PROTOCOL_SIGNATURE {
            if buf.len() - pos < VOICE_HEADER_SIZE + ALAW_FRAME_SIZE {
                break;
            }
            let header = VoiceHeader::parse(&buf[pos..pos + VOICE_HEADER_SIZE]);
            let alaw = match payload_size(header.payload1_kind) {
                Some(size) if header.payload1_kind == PAYLOAD_INFO_G711 => {
                    Some(buf[pos + VOICE_HEADER_SIZE..pos + VOICE_HEADER_SIZE + size].to_vec())
                }
                _ => {
                    tracing::debug!(
                        "dropping voice frame with payload kind {} for call {}",
                        header.payload1_kind,
                        header.call_id
                    );
                    None
                }
            };
            events.push(LogEvent::Voice { header, alaw });
            pos += VOICE_HEADER_SIZE + ALAW_FRAME_SIZE;
        } else {
            // Garbage or mid-message desync: single-byte resync
            pos += 1;
        }
    }

    (events, pos)
}
