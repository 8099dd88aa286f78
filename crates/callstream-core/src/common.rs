use serde::Deserialize;

/// The kind of a live call, as inferred from the signaling stream.
/// Duplex calls carry two voice channels, simplex and group calls one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Duplex,
    Simplex,
    Group,
}

impl core::fmt::Display for CallKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CallKind::Duplex => write!(f, "D"),
            CallKind::Simplex => write!(f, "S"),
            CallKind::Group => write!(f, "G"),
        }
    }
}

/// The channel layout a feeder expects on its UDP sink.
/// Duplex calls match Stereo feeders only, simplex and group calls Mono only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum FeederKind {
    /// One A-law channel, 480 bytes per datagram
    #[serde(rename = "M")]
    Mono,
    /// Two interleaved A-law channels, 960 bytes per datagram
    #[serde(rename = "S")]
    Stereo,
}

impl FeederKind {
    pub fn matches(&self, call_kind: CallKind) -> bool {
        match self {
            FeederKind::Stereo => call_kind == CallKind::Duplex,
            FeederKind::Mono => call_kind == CallKind::Simplex || call_kind == CallKind::Group,
        }
    }
}

impl core::fmt::Display for FeederKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FeederKind::Mono => write!(f, "M"),
            FeederKind::Stereo => write!(f, "S"),
        }
    }
}

/// Seconds since the UNIX epoch, as carried in published events
pub type EpochSecs = u64;

/// Current wall clock as epoch seconds
pub fn epoch_now() -> EpochSecs {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feeder_kind_matching() {
        assert!(FeederKind::Stereo.matches(CallKind::Duplex));
        assert!(!FeederKind::Stereo.matches(CallKind::Simplex));
        assert!(!FeederKind::Stereo.matches(CallKind::Group));
        assert!(FeederKind::Mono.matches(CallKind::Simplex));
        assert!(FeederKind::Mono.matches(CallKind::Group));
        assert!(!FeederKind::Mono.matches(CallKind::Duplex));
    }
}
