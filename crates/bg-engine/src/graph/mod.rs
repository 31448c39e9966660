//! Audio unit graph.
//!
//! A small browser-style audio backend: units with automatable
//! parameters, connected into an acyclic graph and rendered in fixed
//! 128-frame quanta against a sample clock. Voices, buses and the master
//! chain are all built from these units.

mod context;
mod dsp;
mod param;
mod unit;

pub use context::{AudioContext, Meter};
pub use dsp::{FilterType, Oversample, ANALYSER_WINDOW};
pub use param::{AudioParam, ParamId};
pub use unit::{Target, UnitKey, UnitKind, MAX_PARAMS};
