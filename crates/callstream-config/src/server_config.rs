use std::net::SocketAddr;
use std::sync::Arc;

use callstream_core::FeederKind;

/// Collector configuration: where the log server feed arrives
#[derive(Debug, Clone)]
pub struct CfgCollector {
    /// UDP bind address for the log server feed
    pub log_server_endpoint: SocketAddr,
}

impl Default for CfgCollector {
    fn default() -> Self {
        Self {
            log_server_endpoint: default_log_server_endpoint(),
        }
    }
}

fn default_log_server_endpoint() -> SocketAddr {
    "127.0.0.1:4321".parse().expect("valid default endpoint")
}

/// One preconfigured media server feeder. Feeders are created at startup
/// and never at runtime; exactly one active call may hold a feeder.
#[derive(Debug, Clone)]
pub struct CfgFeeder {
    /// Stream name under the media server endpoint
    pub stream: String,
    /// UDP destination of the feeder
    pub ip: String,
    pub port: u16,
    /// M for mono (simplex/group), S for stereo (duplex)
    pub kind: FeederKind,
}

/// Recorded call playback configuration
#[derive(Debug, Clone, Default)]
pub struct CfgPlayer {
    /// Command line started for each playback; the recording path is
    /// appended as the last argument. Empty disables the player process.
    pub command_template: String,
    /// Directory the persistence collaborator materializes recordings into
    pub voicerec_repo: String,
    /// URL path prefix under which the repo is served
    pub voicerec_url: String,
}

/// Media manager configuration
#[derive(Debug, Clone)]
pub struct CfgMediaManager {
    /// Base URL of the external media server, e.g. "http://streamer:8000"
    pub media_server_endpoint: String,
    /// TCP bind address of the control API
    pub command_listener_endpoint: SocketAddr,
    /// Broker topic prefixes the manager subscribes to at start
    pub subscriptions: Vec<String>,
    /// Seconds without activity after which a call is swept
    pub call_inactivity_period: u64,
    /// Seconds between maintenance sweeps
    pub maintenance_frequency: u64,
    pub feeders: Vec<CfgFeeder>,
    pub player: CfgPlayer,
}

impl Default for CfgMediaManager {
    fn default() -> Self {
        Self {
            media_server_endpoint: String::new(),
            command_listener_endpoint: "127.0.0.1:5550".parse().expect("valid default endpoint"),
            subscriptions: vec!["S_".to_string(), "V_".to_string()],
            call_inactivity_period: 300,
            maintenance_frequency: 60,
            feeders: Vec::new(),
            player: CfgPlayer::default(),
        }
    }
}

/// Tracer configuration: structured JSON event trace
#[derive(Debug, Clone, Default)]
pub struct CfgTracer {
    /// Path of the JSON lines trace file. None disables the tracer.
    pub trace_file: Option<String>,
    /// Publish only every n-th voice trace line (0 = every frame)
    pub publish_one_json_voice_msg_every: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub debug_log: Option<String>,
    pub collector: CfgCollector,
    pub media_manager: CfgMediaManager,
    pub tracer: CfgTracer,
}

impl ServerConfig {
    /// Validate that all required configuration fields are properly set.
    /// Configuration errors are fatal at startup only.
    pub fn validate(&self) -> Result<(), String> {
        for (i, feeder) in self.media_manager.feeders.iter().enumerate() {
            if feeder.stream.is_empty() {
                return Err(format!("feeder {} has an empty stream name", i + 1));
            }
            if feeder.port == 0 {
                return Err(format!("feeder '{}' has port 0", feeder.stream));
            }
            if feeder.ip.parse::<std::net::IpAddr>().is_err() {
                return Err(format!("feeder '{}' has an invalid ip '{}'", feeder.stream, feeder.ip));
            }
        }

        let duplicate = self
            .media_manager
            .feeders
            .iter()
            .enumerate()
            .find(|(i, f)| self.media_manager.feeders[..*i].iter().any(|g| g.stream == f.stream));
        if let Some((_, feeder)) = duplicate {
            return Err(format!("duplicate feeder stream name '{}'", feeder.stream));
        }

        if self.media_manager.maintenance_frequency == 0 {
            return Err("maintenance_frequency must be at least 1 second".to_string());
        }

        Ok(())
    }
}

/// Global shared configuration, immutable after construction.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    cfg: Arc<ServerConfig>,
}

impl SharedConfig {
    pub fn from_config(cfg: ServerConfig) -> Self {
        // Check config for validity before returning the SharedConfig object
        if let Err(e) = cfg.validate() {
            panic!("Invalid server configuration: {}", e);
        }
        Self { cfg: Arc::new(cfg) }
    }

    /// Access immutable config.
    pub fn config(&self) -> Arc<ServerConfig> {
        Arc::clone(&self.cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_feeder_validation() {
        let mut cfg = ServerConfig::default();
        cfg.media_manager.feeders.push(CfgFeeder {
            stream: "live1".to_string(),
            ip: "not-an-ip".to_string(),
            port: 9000,
            kind: FeederKind::Mono,
        });
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_duplicate_stream_names_rejected() {
        let mut cfg = ServerConfig::default();
        for _ in 0..2 {
            cfg.media_manager.feeders.push(CfgFeeder {
                stream: "live1".to_string(),
                ip: "127.0.0.1".to_string(),
                port: 9000,
                kind: FeederKind::Mono,
            });
        }
        assert!(cfg.validate().is_err());
    }
}
