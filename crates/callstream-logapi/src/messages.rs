//! Signaling message definitions ("LOG1" signature)
//!
//! All twelve variants have a fixed wire size known from the message id in
//! the common header, so the decoder can gate on length before copy-out and
//! body parsing never fails.

use crate::LOG_API_PROTOCOL_SIGNATURE;
use crate::fields::{DESCR_SIZE, Number, Tsi};
use crate::wire::{read_bytes, read_u16_le, read_u32_le, write_u16_le, write_u32_le};

// ─── Message ids ──────────────────────────────────────────────────

pub const LOG_API_ALIVE: u8 = 0x01;

// Individual duplex call messages
pub const LOG_API_DUPLEX_CALL_CHANGE: u8 = 0x10;
pub const LOG_API_DUPLEX_CALL_RELEASE: u8 = 0x19;

// Individual simplex call messages
pub const LOG_API_SIMPLEX_CALL_CHANGE: u8 = 0x20;
pub const LOG_API_SIMPLEX_CALL_PTT_CHANGE: u8 = 0x21;
pub const LOG_API_SIMPLEX_CALL_RELEASE: u8 = 0x29;

// Group call messages
pub const LOG_API_GROUP_CALL_CHANGE: u8 = 0x30;
pub const LOG_API_GROUP_CALL_PTT_ACTIVE: u8 = 0x31;
pub const LOG_API_GROUP_CALL_PTT_IDLE: u8 = 0x32;
pub const LOG_API_GROUP_CALL_RELEASE: u8 = 0x39;

// SDS messages
pub const LOG_API_SDS_STATUS: u8 = 0x40;
pub const LOG_API_SDS_TEXT: u8 = 0x41;

// ─── Enum value tables ────────────────────────────────────────────
//
// Enum-typed wire fields are carried as raw u8 so that unknown values pass
// through unchanged; the tables below give names to the known values.

pub const INDI_KEEPALIVEONLY: u8 = 0;
pub const INDI_NEWCALLSETUP: u8 = 1;
pub const INDI_CALLTHROUGHCONNECT: u8 = 2;
pub const INDI_CHANGEOFAORBUSER: u8 = 3;

pub const GROUPCALL_KEEPALIVEONLY: u8 = 0;
pub const GROUPCALL_NEWCALLSETUP: u8 = 1;

pub const TALKING_PARTY_NONE: u8 = 0;
pub const TALKING_PARTY_A_SUB: u8 = 1;
pub const TALKING_PARTY_B_SUB: u8 = 2;

pub const INDI_RELEASE_CAUSE_UNKNOWN: u8 = 0;
pub const INDI_CAUSE_A_SUB_RELEASE: u8 = 1;
pub const INDI_CAUSE_B_SUB_RELEASE: u8 = 2;

pub const GROUPCALL_RELEASE_CAUSE_UNKNOWN: u8 = 0;
pub const GROUPCALL_PTT_INACTIVITY_TIMEOUT: u8 = 1;

pub fn indi_action_name(action: u8) -> &'static str {
    match action {
        INDI_KEEPALIVEONLY => "KeepAliveOnly",
        INDI_NEWCALLSETUP => "NewCallSetup",
        INDI_CALLTHROUGHCONNECT => "CallThroughConnect",
        INDI_CHANGEOFAORBUSER => "ChangeOfAOrBUser",
        _ => "Unknown",
    }
}

pub fn group_action_name(action: u8) -> &'static str {
    match action {
        GROUPCALL_KEEPALIVEONLY => "KeepAliveOnly",
        GROUPCALL_NEWCALLSETUP => "NewCallSetup",
        _ => "Unknown",
    }
}

pub fn talking_party_name(party: u8) -> &'static str {
    match party {
        TALKING_PARTY_NONE => "None",
        TALKING_PARTY_A_SUB => "A",
        TALKING_PARTY_B_SUB => "B",
        _ => "Unknown",
    }
}

pub fn indi_release_cause_name(cause: u8) -> &'static str {
    match cause {
        INDI_RELEASE_CAUSE_UNKNOWN => "Unknown",
        INDI_CAUSE_A_SUB_RELEASE => "ASubRelease",
        INDI_CAUSE_B_SUB_RELEASE => "BSubRelease",
        _ => "Unknown",
    }
}

pub fn group_release_cause_name(cause: u8) -> &'static str {
    match cause {
        GROUPCALL_RELEASE_CAUSE_UNKNOWN => "Unknown",
        GROUPCALL_PTT_INACTIVITY_TIMEOUT => "PttInactivityTimeout",
        _ => "Unknown",
    }
}

// ─── Common header ────────────────────────────────────────────────

/// Common header at the start of every signaling message.
/// The protocol signature is checked on parse and not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogApiHeader {
    /// Increments by 1 for each new information message
    pub sequence: u16,
    pub version: u8,
    pub msg_id: u8,
}

/// Size of the common header in bytes
pub const HEADER_SIZE: usize = 8;

impl LogApiHeader {
    pub(crate) fn parse(data: &[u8]) -> Self {
        Self {
            sequence: read_u16_le(data, 4),
            version: data[6],
            msg_id: data[7],
        }
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        write_u32_le(buf, LOG_API_PROTOCOL_SIGNATURE);
        write_u16_le(buf, self.sequence);
        buf.push(self.version);
        buf.push(self.msg_id);
    }
}

// ─── Message bodies ───────────────────────────────────────────────

/// Keep-alive from the log server (0x01)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    pub server_no: u8,
    pub timeout: u8,
    pub sw_ver: [u8; 4],
    pub sw_ver_string: [u8; 20],
    pub descr: [u8; DESCR_SIZE],
}

impl KeepAlive {
    pub const WIRE_SIZE: usize = HEADER_SIZE + 96;

    fn parse(data: &[u8]) -> Self {
        Self {
            server_no: data[8],
            timeout: data[9],
            // 10..15: spare
            sw_ver: read_bytes(data, 16),
            sw_ver_string: read_bytes(data, 20),
            descr: read_bytes(data, 40),
        }
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(self.server_no);
        buf.push(self.timeout);
        buf.extend_from_slice(&[0u8; 6]);
        buf.extend_from_slice(&self.sw_ver);
        buf.extend_from_slice(&self.sw_ver_string);
        buf.extend_from_slice(&self.descr);
    }
}

impl Default for KeepAlive {
    fn default() -> Self {
        Self {
            server_no: 0,
            timeout: 0,
            sw_ver: [0; 4],
            sw_ver_string: [0; 20],
            descr: [0; DESCR_SIZE],
        }
    }
}

/// Individual call setup/change body, shared by duplex (0x10) and
/// simplex (0x20) which have an identical layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndiCallChange {
    pub call_id: u32,
    pub action: u8,
    pub timeout: u8,
    pub a_tsi: Tsi,
    pub a_number: Number,
    pub a_descr: [u8; DESCR_SIZE],
    pub b_tsi: Tsi,
    pub b_number: Number,
    pub b_descr: [u8; DESCR_SIZE],
}

impl IndiCallChange {
    pub const WIRE_SIZE: usize = HEADER_SIZE + 8 + 2 * (Tsi::WIRE_SIZE + Number::WIRE_SIZE + DESCR_SIZE);

    fn parse(data: &[u8]) -> Self {
        Self {
            call_id: read_u32_le(data, 8),
            action: data[12],
            timeout: data[13],
            // 14..15: spare
            a_tsi: Tsi::parse(data, 16),
            a_number: Number::parse(data, 24),
            a_descr: read_bytes(data, 40),
            b_tsi: Tsi::parse(data, 104),
            b_number: Number::parse(data, 112),
            b_descr: read_bytes(data, 128),
        }
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        write_u32_le(buf, self.call_id);
        buf.push(self.action);
        buf.push(self.timeout);
        buf.extend_from_slice(&[0u8; 2]);
        self.a_tsi.encode(buf);
        self.a_number.encode(buf);
        buf.extend_from_slice(&self.a_descr);
        self.b_tsi.encode(buf);
        self.b_number.encode(buf);
        buf.extend_from_slice(&self.b_descr);
    }
}

impl Default for IndiCallChange {
    fn default() -> Self {
        Self {
            call_id: 0,
            action: INDI_KEEPALIVEONLY,
            timeout: 0,
            a_tsi: Tsi::default(),
            a_number: Number::default(),
            a_descr: [0; DESCR_SIZE],
            b_tsi: Tsi::default(),
            b_number: Number::default(),
            b_descr: [0; DESCR_SIZE],
        }
    }
}

/// Call release body, shared by duplex (0x19), simplex (0x29) and
/// group (0x39) releases; the cause value table differs per family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallRelease {
    pub call_id: u32,
    pub release_cause: u8,
}

impl CallRelease {
    pub const WIRE_SIZE: usize = HEADER_SIZE + 8;

    fn parse(data: &[u8]) -> Self {
        Self {
            call_id: read_u32_le(data, 8),
            release_cause: data[12],
        }
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        write_u32_le(buf, self.call_id);
        buf.push(self.release_cause);
        buf.extend_from_slice(&[0u8; 3]);
    }
}

/// Simplex PTT state transition (0x21)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimplexPttChange {
    pub call_id: u32,
    pub talking_party: u8,
}

impl SimplexPttChange {
    pub const WIRE_SIZE: usize = HEADER_SIZE + 8;

    fn parse(data: &[u8]) -> Self {
        Self {
            call_id: read_u32_le(data, 8),
            talking_party: data[12],
        }
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        write_u32_le(buf, self.call_id);
        buf.push(self.talking_party);
        buf.extend_from_slice(&[0u8; 3]);
    }
}

/// Group call setup/change (0x30)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupCallChange {
    pub call_id: u32,
    pub action: u8,
    pub timeout: u8,
    pub group_tsi: Tsi,
    pub group_number: Number,
    pub group_descr: [u8; DESCR_SIZE],
}

impl GroupCallChange {
    pub const WIRE_SIZE: usize = HEADER_SIZE + 8 + Tsi::WIRE_SIZE + Number::WIRE_SIZE + DESCR_SIZE;

    fn parse(data: &[u8]) -> Self {
        Self {
            call_id: read_u32_le(data, 8),
            action: data[12],
            timeout: data[13],
            // 14..15: spare
            group_tsi: Tsi::parse(data, 16),
            group_number: Number::parse(data, 24),
            group_descr: read_bytes(data, 40),
        }
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        write_u32_le(buf, self.call_id);
        buf.push(self.action);
        buf.push(self.timeout);
        buf.extend_from_slice(&[0u8; 2]);
        self.group_tsi.encode(buf);
        self.group_number.encode(buf);
        buf.extend_from_slice(&self.group_descr);
    }
}

impl Default for GroupCallChange {
    fn default() -> Self {
        Self {
            call_id: 0,
            action: GROUPCALL_KEEPALIVEONLY,
            timeout: 0,
            group_tsi: Tsi::default(),
            group_number: Number::default(),
            group_descr: [0; DESCR_SIZE],
        }
    }
}

/// Group call PTT active: a talking party took the floor (0x31)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupPttActive {
    pub call_id: u32,
    pub tp_tsi: Tsi,
    pub tp_number: Number,
    pub tp_descr: [u8; DESCR_SIZE],
}

impl GroupPttActive {
    pub const WIRE_SIZE: usize = HEADER_SIZE + 8 + Tsi::WIRE_SIZE + Number::WIRE_SIZE + DESCR_SIZE;

    fn parse(data: &[u8]) -> Self {
        Self {
            call_id: read_u32_le(data, 8),
            // 12..15: spare
            tp_tsi: Tsi::parse(data, 16),
            tp_number: Number::parse(data, 24),
            tp_descr: read_bytes(data, 40),
        }
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        write_u32_le(buf, self.call_id);
        buf.extend_from_slice(&[0u8; 4]);
        self.tp_tsi.encode(buf);
        self.tp_number.encode(buf);
        buf.extend_from_slice(&self.tp_descr);
    }
}

impl Default for GroupPttActive {
    fn default() -> Self {
        Self {
            call_id: 0,
            tp_tsi: Tsi::default(),
            tp_number: Number::default(),
            tp_descr: [0; DESCR_SIZE],
        }
    }
}

/// Group call PTT idle: the floor was released (0x32)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroupPttIdle {
    pub call_id: u32,
}

impl GroupPttIdle {
    pub const WIRE_SIZE: usize = HEADER_SIZE + 8;

    fn parse(data: &[u8]) -> Self {
        Self {
            call_id: read_u32_le(data, 8),
        }
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        write_u32_le(buf, self.call_id);
        buf.extend_from_slice(&[0u8; 4]);
    }
}

/// A and B party block shared by the two SDS variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdsParties {
    pub a_tsi: Tsi,
    pub a_number: Number,
    pub a_descr: [u8; DESCR_SIZE],
    pub b_tsi: Tsi,
    pub b_number: Number,
    pub b_descr: [u8; DESCR_SIZE],
}

impl SdsParties {
    pub const WIRE_SIZE: usize = 2 * (Tsi::WIRE_SIZE + Number::WIRE_SIZE + DESCR_SIZE);

    fn parse(data: &[u8], offset: usize) -> Self {
        Self {
            a_tsi: Tsi::parse(data, offset),
            a_number: Number::parse(data, offset + 8),
            a_descr: read_bytes(data, offset + 24),
            b_tsi: Tsi::parse(data, offset + 88),
            b_number: Number::parse(data, offset + 96),
            b_descr: read_bytes(data, offset + 112),
        }
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        self.a_tsi.encode(buf);
        self.a_number.encode(buf);
        buf.extend_from_slice(&self.a_descr);
        self.b_tsi.encode(buf);
        self.b_number.encode(buf);
        buf.extend_from_slice(&self.b_descr);
    }
}

impl Default for SdsParties {
    fn default() -> Self {
        Self {
            a_tsi: Tsi::default(),
            a_number: Number::default(),
            a_descr: [0; DESCR_SIZE],
            b_tsi: Tsi::default(),
            b_number: Number::default(),
            b_descr: [0; DESCR_SIZE],
        }
    }
}

/// Pre-coded status SDS (0x40)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusSds {
    pub parties: SdsParties,
    pub precoded_status: u16,
}

impl StatusSds {
    pub const WIRE_SIZE: usize = HEADER_SIZE + SdsParties::WIRE_SIZE + 2;

    fn parse(data: &[u8]) -> Self {
        Self {
            parties: SdsParties::parse(data, 8),
            precoded_status: read_u16_le(data, 8 + SdsParties::WIRE_SIZE),
        }
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        self.parties.encode(buf);
        write_u16_le(buf, self.precoded_status);
    }
}

/// Length of the text region in a text SDS
pub const SDS_TEXT_SIZE: usize = 512;

/// Text SDS (0x41)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSds {
    pub parties: SdsParties,
    pub text: [u8; SDS_TEXT_SIZE],
}

impl TextSds {
    pub const WIRE_SIZE: usize = HEADER_SIZE + SdsParties::WIRE_SIZE + SDS_TEXT_SIZE;

    fn parse(data: &[u8]) -> Self {
        Self {
            parties: SdsParties::parse(data, 8),
            text: read_bytes(data, 8 + SdsParties::WIRE_SIZE),
        }
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        self.parties.encode(buf);
        buf.extend_from_slice(&self.text);
    }
}

impl Default for TextSds {
    fn default() -> Self {
        Self {
            parties: SdsParties::default(),
            text: [0; SDS_TEXT_SIZE],
        }
    }
}

// ─── Tagged message ───────────────────────────────────────────────

/// Body of a signaling message, tagged by the message id in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogApiBody {
    KeepAlive(KeepAlive),
    DuplexCallChange(IndiCallChange),
    DuplexCallRelease(CallRelease),
    SimplexCallStartChange(IndiCallChange),
    SimplexCallPttChange(SimplexPttChange),
    SimplexCallRelease(CallRelease),
    GroupCallStartChange(GroupCallChange),
    GroupCallPttActive(GroupPttActive),
    GroupCallPttIdle(GroupPttIdle),
    GroupCallRelease(CallRelease),
    StatusSds(StatusSds),
    TextSds(TextSds),
}

/// Parse error for signaling messages
#[derive(Debug, PartialEq, Eq)]
pub enum LogApiParseErr {
    BadSignature { found: u32 },
    UnknownMsgId { found: u8 },
    TooShort { needed: usize, found: usize },
}

impl std::fmt::Display for LogApiParseErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadSignature { found } => write!(f, "bad protocol signature: 0x{:08x}", found),
            Self::UnknownMsgId { found } => write!(f, "unknown message id: 0x{:02x}", found),
            Self::TooShort { needed, found } => write!(f, "message too short: need {} bytes, have {}", needed, found),
        }
    }
}

/// Wire size of the message with the given id, None for unknown ids
pub fn wire_size_for(msg_id: u8) -> Option<usize> {
    match msg_id {
        LOG_API_ALIVE => Some(KeepAlive::WIRE_SIZE),
        LOG_API_DUPLEX_CALL_CHANGE => Some(IndiCallChange::WIRE_SIZE),
        LOG_API_DUPLEX_CALL_RELEASE => Some(CallRelease::WIRE_SIZE),
        LOG_API_SIMPLEX_CALL_CHANGE => Some(IndiCallChange::WIRE_SIZE),
        LOG_API_SIMPLEX_CALL_PTT_CHANGE => Some(SimplexPttChange::WIRE_SIZE),
        LOG_API_SIMPLEX_CALL_RELEASE => Some(CallRelease::WIRE_SIZE),
        LOG_API_GROUP_CALL_CHANGE => Some(GroupCallChange::WIRE_SIZE),
        LOG_API_GROUP_CALL_PTT_ACTIVE => Some(GroupPttActive::WIRE_SIZE),
        LOG_API_GROUP_CALL_PTT_IDLE => Some(GroupPttIdle::WIRE_SIZE),
        LOG_API_GROUP_CALL_RELEASE => Some(CallRelease::WIRE_SIZE),
        LOG_API_SDS_STATUS => Some(StatusSds::WIRE_SIZE),
        LOG_API_SDS_TEXT => Some(TextSds::WIRE_SIZE),
        _ => None,
    }
}

/// Largest signaling message on the wire (the text SDS)
pub const MAX_MESSAGE_SIZE: usize = TextSds::WIRE_SIZE;

/// A complete signaling message: common header plus tagged body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogApiMessage {
    pub header: LogApiHeader,
    pub body: LogApiBody,
}

impl LogApiMessage {
    /// Parse one message from the start of `data`. The slice must hold the
    /// full wire size of the message; the stream decoder guarantees this.
    pub fn parse(data: &[u8]) -> Result<Self, LogApiParseErr> {
        if data.len() < HEADER_SIZE {
            return Err(LogApiParseErr::TooShort {
                needed: HEADER_SIZE,
                found: data.len(),
            });
        }
        let signature = read_u32_le(data, 0);
        if signature != LOG_API_PROTOCOL_SIGNATURE {
            return Err(LogApiParseErr::BadSignature { found: signature });
        }

        let header = LogApiHeader::parse(data);
        let size = wire_size_for(header.msg_id).ok_or(LogApiParseErr::UnknownMsgId { found: header.msg_id })?;
        if data.len() < size {
            return Err(LogApiParseErr::TooShort {
                needed: size,
                found: data.len(),
            });
        }

        let body = match header.msg_id {
            LOG_API_ALIVE => LogApiBody::KeepAlive(KeepAlive::parse(data)),
            LOG_API_DUPLEX_CALL_CHANGE => LogApiBody::DuplexCallChange(IndiCallChange::parse(data)),
            LOG_API_DUPLEX_CALL_RELEASE => LogApiBody::DuplexCallRelease(CallRelease::parse(data)),
            LOG_API_SIMPLEX_CALL_CHANGE => LogApiBody::SimplexCallStartChange(IndiCallChange::parse(data)),
            LOG_API_SIMPLEX_CALL_PTT_CHANGE => LogApiBody::SimplexCallPttChange(SimplexPttChange::parse(data)),
            LOG_API_SIMPLEX_CALL_RELEASE => LogApiBody::SimplexCallRelease(CallRelease::parse(data)),
            LOG_API_GROUP_CALL_CHANGE => LogApiBody::GroupCallStartChange(GroupCallChange::parse(data)),
            LOG_API_GROUP_CALL_PTT_ACTIVE => LogApiBody::GroupCallPttActive(GroupPttActive::parse(data)),
            LOG_API_GROUP_CALL_PTT_IDLE => LogApiBody::GroupCallPttIdle(GroupPttIdle::parse(data)),
            LOG_API_GROUP_CALL_RELEASE => LogApiBody::GroupCallRelease(CallRelease::parse(data)),
            LOG_API_SDS_STATUS => LogApiBody::StatusSds(StatusSds::parse(data)),
            LOG_API_SDS_TEXT => LogApiBody::TextSds(TextSds::parse(data)),
            _ => unreachable!("wire_size_for covers exactly the known ids"),
        };

        Ok(Self { header, body })
    }

    /// Serialize back to the wire layout
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.wire_size());
        self.header.encode(&mut buf);
        match &self.body {
            LogApiBody::KeepAlive(m) => m.encode(&mut buf),
            LogApiBody::DuplexCallChange(m) => m.encode(&mut buf),
            LogApiBody::DuplexCallRelease(m) => m.encode(&mut buf),
            LogApiBody::SimplexCallStartChange(m) => m.encode(&mut buf),
            LogApiBody::SimplexCallPttChange(m) => m.encode(&mut buf),
            LogApiBody::SimplexCallRelease(m) => m.encode(&mut buf),
            LogApiBody::GroupCallStartChange(m) => m.encode(&mut buf),
            LogApiBody::GroupCallPttActive(m) => m.encode(&mut buf),
            LogApiBody::GroupCallPttIdle(m) => m.encode(&mut buf),
            LogApiBody::GroupCallRelease(m) => m.encode(&mut buf),
            LogApiBody::StatusSds(m) => m.encode(&mut buf),
            LogApiBody::TextSds(m) => m.encode(&mut buf),
        }
        buf
    }

    /// Convenience constructor wrapping a body with a matching header
    pub fn new(sequence: u16, body: LogApiBody) -> Self {
        let msg_id = match &body {
            LogApiBody::KeepAlive(_) => LOG_API_ALIVE,
            LogApiBody::DuplexCallChange(_) => LOG_API_DUPLEX_CALL_CHANGE,
            LogApiBody::DuplexCallRelease(_) => LOG_API_DUPLEX_CALL_RELEASE,
            LogApiBody::SimplexCallStartChange(_) => LOG_API_SIMPLEX_CALL_CHANGE,
            LogApiBody::SimplexCallPttChange(_) => LOG_API_SIMPLEX_CALL_PTT_CHANGE,
            LogApiBody::SimplexCallRelease(_) => LOG_API_SIMPLEX_CALL_RELEASE,
            LogApiBody::GroupCallStartChange(_) => LOG_API_GROUP_CALL_CHANGE,
            LogApiBody::GroupCallPttActive(_) => LOG_API_GROUP_CALL_PTT_ACTIVE,
            LogApiBody::GroupCallPttIdle(_) => LOG_API_GROUP_CALL_PTT_IDLE,
            LogApiBody::GroupCallRelease(_) => LOG_API_GROUP_CALL_RELEASE,
            LogApiBody::StatusSds(_) => LOG_API_SDS_STATUS,
            LogApiBody::TextSds(_) => LOG_API_SDS_TEXT,
        };
        Self {
            header: LogApiHeader {
                sequence,
                version: crate::LOG_API_VERSION,
                msg_id,
            },
            body,
        }
    }

    pub fn msg_id(&self) -> u8 {
        self.header.msg_id
    }

    pub fn wire_size(&self) -> usize {
        wire_size_for(self.header.msg_id).expect("constructed message has a known id")
    }

    /// The broker topic of this message: `S_<msg_id decimal>`
    pub fn topic(&self) -> String {
        format!("S_{}", self.header.msg_id)
    }

    /// Call identifier for the call-related variants
    pub fn call_id(&self) -> Option<u32> {
        match &self.body {
            LogApiBody::KeepAlive(_) | LogApiBody::StatusSds(_) | LogApiBody::TextSds(_) => None,
            LogApiBody::DuplexCallChange(m) | LogApiBody::SimplexCallStartChange(m) => Some(m.call_id),
            LogApiBody::DuplexCallRelease(m) | LogApiBody::SimplexCallRelease(m) | LogApiBody::GroupCallRelease(m) => {
                Some(m.call_id)
            }
            LogApiBody::SimplexCallPttChange(m) => Some(m.call_id),
            LogApiBody::GroupCallStartChange(m) => Some(m.call_id),
            LogApiBody::GroupCallPttActive(m) => Some(m.call_id),
            LogApiBody::GroupCallPttIdle(m) => Some(m.call_id),
        }
    }
}
