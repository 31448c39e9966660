//! Voice builders, one per generator kind.
//!
//! Each trigger assembles a short-lived graph fragment (sources, envelope
//! gains, shaping, filters, a compressor and a level gain), connects it to
//! the context's voice output and schedules everything up front. Sources
//! start and stop on their own; pooled units are queued to go back to the
//! pool shortly after their last automation point.
//!
//! The same builders serve live playback and offline export; only the
//! [`SynthContext`] they are handed differs.

mod bass;
mod clap;
pub mod envelope;
mod hihat;
mod kick;
mod noise_pad;
mod sampler;
mod snare;
mod tone;

use arrayvec::ArrayVec;
use bg_ir::VoiceParams;

use crate::error::EngineError;
use crate::graph::UnitKey;
use crate::synth::SynthContext;

pub use clap::MAX_CLAP_LAYERS;
pub use sampler::sample_makeup;

/// Seconds past a voice's gate before its pooled units are returned.
pub const CLEANUP_MARGIN: f64 = 0.1;

/// What a trigger scheduled.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scheduled {
    /// Start time of each layer
    pub onsets: ArrayVec<f64, MAX_CLAP_LAYERS>,
    /// When the last pooled unit goes back
    pub release_at: f64,
}

impl Scheduled {
    fn single(onset: f64, release_at: f64) -> Self {
        let mut onsets = ArrayVec::new();
        onsets.push(onset);
        Self { onsets, release_at }
    }

    /// Nothing to play (e.g. a sample track with no sample).
    pub fn is_empty(&self) -> bool {
        self.onsets.is_empty()
    }
}

/// Build and schedule one voice of `params` starting at `when`.
///
/// `duration` is the gate length; `None` (or a non-positive value) uses
/// the generator's own default length.
pub fn trigger(
    params: &VoiceParams,
    synth: &mut SynthContext<'_>,
    when: f64,
    duration: Option<f64>,
) -> Result<Scheduled, EngineError> {
    let when = if when.is_finite() { when.max(0.0) } else { 0.0 };
    let duration = duration.filter(|d| d.is_finite() && *d > 0.0);
    let result = match params {
        VoiceParams::Tone(p) => tone::trigger(p, synth, when, duration),
        VoiceParams::Bass(p) => bass::trigger(p, synth, when, duration),
        VoiceParams::Kick(p) => kick::trigger(p, synth, when, duration),
        VoiceParams::Snare(p) => snare::trigger(p, synth, when, duration),
        VoiceParams::HiHat(p) => hihat::trigger(p, synth, when, duration),
        VoiceParams::Clap(p) => clap::trigger(p, synth, when, duration),
        VoiceParams::NoisePad(p) => noise_pad::trigger(p, synth, when, duration),
        VoiceParams::Sample(p) => sampler::trigger(p, synth, when, duration),
    };
    if result.is_err() {
        discard_unstarted(synth);
    }
    result
}

/// Drop the sources a failed voice created but never scheduled. Its
/// pooled units are already queued for release.
pub(crate) fn discard_unstarted(synth: &mut SynthContext<'_>) {
    let dropped = synth.ctx.discard_unstarted();
    if dropped > 0 {
        log::debug!("dropped {} unstarted sources of a failed voice", dropped);
    }
}

/// Connect `units` in series and the last into the voice output.
fn route(synth: &mut SynthContext<'_>, units: &[UnitKey]) -> Result<(), EngineError> {
    if let Some(last) = synth.chain(units)? {
        let out = synth.output;
        synth.connect(last, out)?;
    }
    Ok(())
}

/// Treat zero and NaN as "unset", like the parameter forms do.
fn or_default(value: f64, default: f64) -> f64 {
    if value == 0.0 || value.is_nan() {
        default
    } else {
        value
    }
}
