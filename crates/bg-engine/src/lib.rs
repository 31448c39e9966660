//! Synthesis and playback engine for the beatgrid step sequencer.
//!
//! Builds each triggered voice as a short-lived fragment of a unit graph,
//! recycles units through a pool, routes voices through per-track buses
//! and a fixed master chain, and schedules steps ahead of the audio clock.
//! The same graph renders in realtime ([`Engine`]) and offline
//! ([`export`]).

pub mod caches;
pub mod config;
mod effects;
mod engine;
mod error;
mod frame;
pub mod graph;
mod master_bus;
mod mixer;
mod offline;
pub mod pool;
mod release_queue;
mod synth;
mod track_bus;
pub mod transport;
pub mod voices;

pub use caches::SynthCaches;
pub use config::{
    CompressorSettings, EngineConfig, ExportConfig, MasterConfig, MetronomeConfig, TransportConfig,
    VoiceMakeup,
};
pub use effects::EffectChain;
pub use engine::Engine;
pub use error::EngineError;
pub use frame::Frame;
pub use master_bus::MasterBus;
pub use mixer::Mixer;
pub use offline::export;
pub use pool::{PoolStats, ResourcePool, POOL_SIZE};
pub use release_queue::{PendingRelease, ReleaseQueue};
pub use synth::SynthContext;
pub use track_bus::TrackBus;
pub use transport::{Playhead, StepEvent, Transport};
pub use voices::{trigger, Scheduled};
