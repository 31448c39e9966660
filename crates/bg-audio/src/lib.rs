//! Audio output backends for the beatgrid step sequencer.

mod cpal_backend;
mod memory;
mod traits;

pub use cpal_backend::CpalOutput;
pub use memory::{Captured, MemoryOutput};
pub use traits::{AudioError, AudioOutput};
