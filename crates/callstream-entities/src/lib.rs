//! Server components: broker, collector, call registry, media manager,
//! control API, playback and tracer

pub mod broker;
pub mod collector;
pub mod control;
pub mod feeders;
pub mod mediamanager;
pub mod playback;
pub mod registry;
pub mod tracer;

pub use broker::{Broker, Event, EventContent, Subscription};
pub use collector::Collector;
pub use control::{ControlListener, ControlReply, ControlRequest};
pub use mediamanager::MediaManager;
pub use registry::{LiveCall, Registry};
pub use tracer::Tracer;
