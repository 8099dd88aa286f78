//! TetraFlex LogApi wire format
//!
//! The log server emits a single UDP byte stream interleaving signaling
//! messages ("LOG1" signature) and voice frames ("LOG2" signature), all
//! little-endian and tightly packed. This crate holds the typed message
//! definitions and the stateless stream decoder that recovers discrete
//! messages from the (possibly fragmented or corrupted) byte stream.

pub mod decoder;
pub mod fields;
pub mod messages;
pub mod voice;

mod wire;

pub use decoder::{LogEvent, decode};
pub use messages::{LogApiHeader, LogApiMessage};
pub use voice::VoiceHeader;

/// Signature of a signaling message ("LOG1")
pub const LOG_API_PROTOCOL_SIGNATURE: u32 = 0x31474F4C;
/// Signature of a voice frame ("LOG2")
pub const VOICE_PROTOCOL_SIGNATURE: u32 = 0x32474F4C;

/// Protocol version carried in the common header
pub const LOG_API_VERSION: u8 = 1;

/// Size of one G.711 A-law voice payload in bytes (60 ms at 8 kHz)
pub const ALAW_FRAME_SIZE: usize = 480;
