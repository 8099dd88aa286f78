//! Voice frame definitions ("LOG2" signature)

use crate::wire::{read_u16_le, read_u32_le, write_u16_le, write_u32_le};
use crate::{ALAW_FRAME_SIZE, VOICE_PROTOCOL_SIGNATURE};

// Stream originator values
pub const STREAM_ORG_GROUPCALL: u8 = 0;
pub const STREAM_ORG_A_SUB: u8 = 1;
pub const STREAM_ORG_B_SUB: u8 = 2;

pub fn stream_originator_name(originator: u8) -> &'static str {
    match originator {
        STREAM_ORG_GROUPCALL => "GroupCall",
        STREAM_ORG_A_SUB => "ASub",
        STREAM_ORG_B_SUB => "BSub",
        _ => "Unknown",
    }
}

// Payload kind values
pub const PAYLOAD_INFO_NONE: u8 = 0;
pub const PAYLOAD_INFO_TETRA_STCH_U: u8 = 1;
pub const PAYLOAD_INFO_TETRA_TCH_S: u8 = 2;
pub const PAYLOAD_INFO_TETRA_TCH7_2: u8 = 3;
pub const PAYLOAD_INFO_TETRA_TCH4_8: u8 = 4;
pub const PAYLOAD_INFO_TETRA_TCH2_4: u8 = 5;
pub const PAYLOAD_INFO_G711: u8 = 7;

/// Payload region size in bytes for a payload kind, None for unknown kinds
pub fn payload_size(kind: u8) -> Option<usize> {
    match kind {
        PAYLOAD_INFO_NONE => Some(0),
        PAYLOAD_INFO_TETRA_STCH_U => Some(16),
        PAYLOAD_INFO_TETRA_TCH_S => Some(18),
        PAYLOAD_INFO_TETRA_TCH7_2 => Some(27),
        PAYLOAD_INFO_TETRA_TCH4_8 => Some(18),
        PAYLOAD_INFO_TETRA_TCH2_4 => Some(9),
        PAYLOAD_INFO_G711 => Some(ALAW_FRAME_SIZE),
        _ => None,
    }
}

/// Size of the voice frame header in bytes
pub const VOICE_HEADER_SIZE: usize = 20;

/// Header of a voice frame. Only the G.711 A-law payload (kind 7) is
/// carried further; the header is parsed for every frame regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoiceHeader {
    pub version: u8,
    /// 0: group call, 1: A-sub, 2: B-sub (see the originator table)
    pub originator: u8,
    /// Originating node number 1..999
    pub node: u16,
    pub call_id: u32,
    /// B14..11: source kind, B10..0: source index
    pub source_and_index: u16,
    /// Random id generated by the source; changes on stream switch
    pub stream_random_id: u16,
    /// B7: 0 = first 128 packets, B6..0: cyclic sequence number
    pub packet_seq: u8,
    pub payload1_kind: u8,
    pub payload2_kind: u8,
}

impl VoiceHeader {
    /// Parse a voice header from the start of `data` (at least
    /// VOICE_HEADER_SIZE bytes; the signature is the caller's concern)
    pub(crate) fn parse(data: &[u8]) -> Self {
        Self {
            version: data[4],
            originator: data[5],
            node: read_u16_le(data, 6),
            call_id: read_u32_le(data, 8),
            source_and_index: read_u16_le(data, 12),
            stream_random_id: read_u16_le(data, 14),
            packet_seq: data[16],
            // 17: spare
            payload1_kind: data[18],
            payload2_kind: data[19],
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(VOICE_HEADER_SIZE);
        write_u32_le(&mut buf, VOICE_PROTOCOL_SIGNATURE);
        buf.push(self.version);
        buf.push(self.originator);
        write_u16_le(&mut buf, self.node);
        write_u32_le(&mut buf, self.call_id);
        write_u16_le(&mut buf, self.source_and_index);
        write_u16_le(&mut buf, self.stream_random_id);
        buf.push(self.packet_seq);
        buf.push(0);
        buf.push(self.payload1_kind);
        buf.push(self.payload2_kind);
        buf
    }

    /// The broker topic of this frame: `V_<call_id decimal>`
    pub fn topic(&self) -> String {
        format!("V_{}", self.call_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_header_roundtrip() {
        let header = VoiceHeader {
            version: 1,
            originator: STREAM_ORG_A_SUB,
            node: 12,
            call_id: 4242,
            source_and_index: 0x0801,
            stream_random_id: 0xbeef,
            packet_seq: 5,
            payload1_kind: PAYLOAD_INFO_G711,
            payload2_kind: PAYLOAD_INFO_NONE,
        };
        let encoded = header.encode();
        assert_eq!(encoded.len(), VOICE_HEADER_SIZE);
        assert_eq!(VoiceHeader::parse(&encoded), header);
        assert_eq!(header.topic(), "V_4242");
    }

    #[test]
    fn test_payload_size_table() {
        assert_eq!(payload_size(PAYLOAD_INFO_NONE), Some(0));
        assert_eq!(payload_size(PAYLOAD_INFO_TETRA_STCH_U), Some(16));
        assert_eq!(payload_size(PAYLOAD_INFO_TETRA_TCH_S), Some(18));
        assert_eq!(payload_size(PAYLOAD_INFO_TETRA_TCH7_2), Some(27));
        assert_eq!(payload_size(PAYLOAD_INFO_TETRA_TCH4_8), Some(18));
        assert_eq!(payload_size(PAYLOAD_INFO_TETRA_TCH2_4), Some(9));
        assert_eq!(payload_size(PAYLOAD_INFO_G711), Some(480));
        assert_eq!(payload_size(6), None);
    }
}
