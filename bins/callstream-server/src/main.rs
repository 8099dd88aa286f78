use clap::Parser;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use callstream_config::{SharedConfig, toml_config};
use callstream_core::debug;
use callstream_entities::control::ControlListener;
use callstream_entities::{Broker, Collector, ControlReply, ControlRequest, MediaManager, Tracer};

/// Load configuration file
fn load_config_from_toml(cfg_path: &str) -> SharedConfig {
    match toml_config::from_file(cfg_path) {
        Ok(c) => c,
        Err(e) => {
            println!("Failed to load configuration from {}: {}", cfg_path, e);
            std::process::exit(1);
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "TetraFlex call stream server",
    long_about = "Receives the TetraFlex LogApi UDP feed and serves live call interception using the provided TOML configuration file"
)]
struct Args {
    /// Config file (required)
    #[arg(help = "TOML config with collector/media manager parameters")]
    config: String,
}

fn main() {
    eprintln!("callstream-server {}", callstream_core::SERVER_VERSION);

    let args = Args::parse();
    let cfg = load_config_from_toml(&args.config);
    let _log_guard = debug::setup_logging_default(cfg.config().debug_log.clone());

    let broker = Broker::new();
    let running = Arc::new(AtomicBool::new(true));

    // Collector thread: UDP feed in, broker events out
    let collector_handle = {
        let mut collector = Collector::new(cfg.clone(), broker.clone());
        let running = running.clone();
        thread::Builder::new()
            .name("collector".to_string())
            .spawn(move || {
                if let Err(e) = collector.run(running) {
                    tracing::error!("collector failed: {}", e);
                }
            })
            .expect("failed to spawn collector thread")
    };

    // Tracer thread, when a trace file is configured
    let tracer_handle = match Tracer::from_config(&broker, &cfg.config().tracer) {
        Ok(Some(mut tracer)) => {
            let running = running.clone();
            Some(
                thread::Builder::new()
                    .name("tracer".to_string())
                    .spawn(move || tracer.run(running))
                    .expect("failed to spawn tracer thread"),
            )
        }
        Ok(None) => None,
        Err(e) => {
            tracing::error!("tracer setup failed: {}", e);
            std::process::exit(1);
        }
    };

    // Control listener thread feeding the media manager
    let (request_sender, request_receiver) = crossbeam_channel::unbounded();
    let listener_handle = {
        let listener = match ControlListener::bind(
            cfg.config().media_manager.command_listener_endpoint,
            request_sender.clone(),
        ) {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!("control listener bind failed: {}", e);
                std::process::exit(1);
            }
        };
        let running = running.clone();
        thread::Builder::new()
            .name("control".to_string())
            .spawn(move || {
                if let Err(e) = listener.run(running) {
                    tracing::error!("control listener failed: {}", e);
                }
            })
            .expect("failed to spawn control thread")
    };

    // Ctrl+C: stop the worker loops and terminate the media manager
    {
        let running = running.clone();
        let request_sender = request_sender.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
            let (reply_sender, _reply_receiver) = crossbeam_channel::bounded::<ControlReply>(1);
            let _ = request_sender.send((ControlRequest::Term, reply_sender));
        })
        .expect("failed to set Ctrl+C handler");
    }

    // Media manager runs on the main thread until $TERM
    match MediaManager::new(cfg.clone(), broker.clone(), request_receiver) {
        Ok(mut manager) => manager.run(),
        Err(e) => {
            tracing::error!("media manager setup failed: {}", e);
            std::process::exit(1);
        }
    }

    running.store(false, Ordering::SeqCst);
    let _ = collector_handle.join();
    let _ = listener_handle.join();
    if let Some(handle) = tracer_handle {
        let _ = handle.join();
    }

    tracing::info!("callstream-server stopped");
}
