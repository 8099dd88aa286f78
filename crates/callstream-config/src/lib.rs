pub mod server_config;
pub mod toml_config;

pub use server_config::{
    CfgCollector, CfgFeeder, CfgMediaManager, CfgPlayer, CfgTracer, ServerConfig, SharedConfig,
};
