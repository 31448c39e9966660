//! Core data model for the beatgrid step sequencer.
//!
//! This crate holds the plain records the rest of the workspace reads:
//! the arrangement and the edits applied to it, per-generator voice
//! parameters and presets, effect settings, and the planar sample buffer
//! shared by the engine and the file formats. Nothing here touches the audio graph.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod arrangement;
mod audio_buffer;
mod edit;
mod effect;
mod params;
pub mod presets;
mod timing;
mod track;
mod voice;

pub use arrangement::{
    Arrangement, DEFAULT_BPM, DEFAULT_MASTER_VOLUME, DEFAULT_STEP_COUNT, MAX_BPM, MAX_STEP_COUNT,
    MIN_BPM,
};
pub use audio_buffer::{AudioBuffer, MAX_CHANNELS, RENDER_QUANTUM};
pub use edit::{Edit, PresetName};
pub use effect::{Effect, EffectKind};
pub use params::{clamp, NoiseColor, Waveform};
pub use presets::Preset;
pub use timing::{format_time, semitones_to_ratio, song_length, step_duration, BEATS_PER_BAR};
pub use track::{Track, TrackId, TrackName, MAX_TRACK_VOLUME};
pub use voice::{
    BassParams, ClapParams, GeneratorKind, HiHatParams, KickParams, NoisePadParams, SampleParams,
    SnareParams, ToneParams, VoiceParams,
};
