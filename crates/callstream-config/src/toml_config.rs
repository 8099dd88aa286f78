use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use callstream_core::FeederKind;
use serde::Deserialize;
use toml::Value;

use super::server_config::{
    CfgCollector, CfgFeeder, CfgMediaManager, CfgPlayer, CfgTracer, ServerConfig, SharedConfig,
};

/// Build `SharedConfig` from a TOML configuration string
pub fn from_toml_str(toml_str: &str) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let root: TomlConfigRoot = toml::from_str(toml_str)?;

    // Various sanity checks
    let expected_config_version = "1.0";
    if !root.config_version.eq(expected_config_version) {
        return Err(format!(
            "Unrecognized config_version: {}, expect {}",
            root.config_version, expected_config_version
        )
        .into());
    }
    if !root.extra.is_empty() {
        return Err(format!("Unrecognized top-level fields: {:?}", sorted_keys(&root.extra)).into());
    }
    if let Some(ref collector) = root.collector {
        if !collector.extra.is_empty() {
            return Err(format!("Unrecognized fields: collector::{:?}", sorted_keys(&collector.extra)).into());
        }
    }
    if let Some(ref mm) = root.media_manager {
        if !mm.extra.is_empty() {
            return Err(format!("Unrecognized fields: media_manager::{:?}", sorted_keys(&mm.extra)).into());
        }
        for feeder in &mm.feeders {
            if !feeder.extra.is_empty() {
                return Err(format!(
                    "Unrecognized fields: media_manager.feeders::{:?}",
                    sorted_keys(&feeder.extra)
                )
                .into());
            }
        }
        if let Some(ref player) = mm.player {
            if !player.extra.is_empty() {
                return Err(format!(
                    "Unrecognized fields: media_manager.player::{:?}",
                    sorted_keys(&player.extra)
                )
                .into());
            }
        }
    }
    if let Some(ref tracer) = root.tracer {
        if !tracer.extra.is_empty() {
            return Err(format!("Unrecognized fields: tracer::{:?}", sorted_keys(&tracer.extra)).into());
        }
    }

    // Build config from required and optional values
    let mut cfg = ServerConfig {
        debug_log: root.debug_log,
        collector: CfgCollector::default(),
        media_manager: CfgMediaManager::default(),
        tracer: CfgTracer::default(),
    };

    if let Some(collector) = root.collector {
        apply_collector_patch(&mut cfg.collector, collector)?;
    }
    if let Some(mm) = root.media_manager {
        apply_media_manager_patch(&mut cfg.media_manager, mm)?;
    }
    if let Some(tracer) = root.tracer {
        cfg.tracer.trace_file = tracer.trace_file;
        if let Some(v) = tracer.publish_one_json_voice_msg_every {
            cfg.tracer.publish_one_json_voice_msg_every = v;
        }
    }

    cfg.validate()?;

    Ok(SharedConfig::from_config(cfg))
}

/// Build `SharedConfig` from any reader.
pub fn from_reader<R: Read>(reader: R) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let mut contents = String::new();
    let mut reader = BufReader::new(reader);
    reader.read_to_string(&mut contents)?;
    from_toml_str(&contents)
}

/// Build `SharedConfig` from a file path.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let f = File::open(path)?;
    let r = BufReader::new(f);
    let cfg = from_reader(r)?;
    Ok(cfg)
}

fn apply_collector_patch(dst: &mut CfgCollector, src: CollectorDto) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(endpoint) = src.log_server_endpoint {
        dst.log_server_endpoint = endpoint.to_socket_addr()?;
    }
    Ok(())
}

fn apply_media_manager_patch(dst: &mut CfgMediaManager, src: MediaManagerDto) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(v) = src.media_server_endpoint {
        dst.media_server_endpoint = v;
    }
    if let Some(endpoint) = src.command_listener_endpoint {
        dst.command_listener_endpoint = endpoint.to_socket_addr()?;
    }
    if let Some(v) = src.subscriptions {
        dst.subscriptions = v;
    }
    if let Some(v) = src.call_inactivity_period {
        dst.call_inactivity_period = v;
    }
    if let Some(v) = src.maintenance_frequency {
        dst.maintenance_frequency = v;
    }

    dst.feeders = src
        .feeders
        .into_iter()
        .map(|f| CfgFeeder {
            stream: f.stream,
            ip: f.ip,
            port: f.port,
            kind: f.kind,
        })
        .collect();

    if let Some(player) = src.player {
        dst.player = CfgPlayer {
            command_template: player.command_template.unwrap_or_default(),
            voicerec_repo: player.voicerec_repo.unwrap_or_default(),
            voicerec_url: player.voicerec_url.unwrap_or_default(),
        };
    }

    Ok(())
}

fn sorted_keys(map: &HashMap<String, Value>) -> Vec<&str> {
    let mut v: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
    v.sort_unstable();
    v
}

/// ----------------------- DTOs for input shape -----------------------

#[derive(Deserialize)]
struct TomlConfigRoot {
    config_version: String,
    debug_log: Option<String>,

    #[serde(default)]
    collector: Option<CollectorDto>,

    #[serde(default)]
    media_manager: Option<MediaManagerDto>,

    #[serde(default)]
    tracer: Option<TracerDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct EndpointDto {
    ip: String,
    port: u16,
}

impl EndpointDto {
    fn to_socket_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        let ip: IpAddr = self
            .ip
            .parse()
            .map_err(|_| format!("invalid endpoint ip '{}'", self.ip))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Deserialize)]
struct CollectorDto {
    #[serde(default)]
    log_server_endpoint: Option<EndpointDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct MediaManagerDto {
    media_server_endpoint: Option<String>,
    command_listener_endpoint: Option<EndpointDto>,
    subscriptions: Option<Vec<String>>,
    call_inactivity_period: Option<u64>,
    maintenance_frequency: Option<u64>,

    #[serde(default)]
    feeders: Vec<FeederDto>,

    #[serde(default)]
    player: Option<PlayerDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct FeederDto {
    stream: String,
    ip: String,
    port: u16,
    kind: FeederKind,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct PlayerDto {
    command_template: Option<String>,
    voicerec_repo: Option<String>,
    voicerec_url: Option<String>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct TracerDto {
    trace_file: Option<String>,
    publish_one_json_voice_msg_every: Option<u32>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_CONFIG: &str = r#"
        config_version = "1.0"
        debug_log = "/tmp/csserver-debug.log"

        [collector]
        log_server_endpoint = { ip = "0.0.0.0", port = 4321 }

        [media_manager]
        media_server_endpoint = "http://streamer:8000"
        command_listener_endpoint = { ip = "127.0.0.1", port = 5550 }
        subscriptions = ["S_", "V_"]
        call_inactivity_period = 120
        maintenance_frequency = 30

        [[media_manager.feeders]]
        stream = "live1"
        ip = "127.0.0.1"
        port = 9001
        kind = "M"

        [[media_manager.feeders]]
        stream = "live2"
        ip = "127.0.0.1"
        port = 9002
        kind = "S"

        [media_manager.player]
        command_template = "mplayer -really-quiet"
        voicerec_repo = "/var/lib/csserver/voicerec"
        voicerec_url = "voicerec"

        [tracer]
        trace_file = "/var/log/csserver/events.json"
        publish_one_json_voice_msg_every = 50
    "#;

    #[test]
    fn test_full_config() {
        let shared = from_toml_str(FULL_CONFIG).unwrap();
        let cfg = shared.config();
        assert_eq!(cfg.collector.log_server_endpoint.port(), 4321);
        assert_eq!(cfg.media_manager.call_inactivity_period, 120);
        assert_eq!(cfg.media_manager.maintenance_frequency, 30);
        assert_eq!(cfg.media_manager.feeders.len(), 2);
        assert_eq!(cfg.media_manager.feeders[0].kind, FeederKind::Mono);
        assert_eq!(cfg.media_manager.feeders[1].kind, FeederKind::Stereo);
        assert_eq!(cfg.media_manager.player.voicerec_url, "voicerec");
        assert_eq!(cfg.tracer.publish_one_json_voice_msg_every, 50);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let shared = from_toml_str("config_version = \"1.0\"").unwrap();
        let cfg = shared.config();
        assert_eq!(cfg.collector.log_server_endpoint.to_string(), "127.0.0.1:4321");
        assert_eq!(cfg.media_manager.call_inactivity_period, 300);
        assert_eq!(cfg.media_manager.maintenance_frequency, 60);
        assert!(cfg.media_manager.feeders.is_empty());
        assert!(cfg.tracer.trace_file.is_none());
    }

    #[test]
    fn test_wrong_config_version_rejected() {
        assert!(from_toml_str("config_version = \"0.9\"").is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let toml = r#"
            config_version = "1.0"
            [collector]
            log_sever_endpoint = { ip = "1.2.3.4", port = 1 }
        "#;
        let err = from_toml_str(toml).unwrap_err().to_string();
        assert!(err.contains("log_sever_endpoint"), "got: {}", err);
    }

    #[test]
    fn test_invalid_feeder_kind_rejected() {
        let toml = r#"
            config_version = "1.0"
            [[media_manager.feeders]]
            stream = "live1"
            ip = "127.0.0.1"
            port = 9001
            kind = "X"
        "#;
        assert!(from_toml_str(toml).is_err());
    }

    #[test]
    fn test_invalid_endpoint_ip_rejected() {
        let toml = r#"
            config_version = "1.0"
            [collector]
            log_server_endpoint = { ip = "localhost", port = 4321 }
        "#;
        assert!(from_toml_str(toml).is_err());
    }
}
