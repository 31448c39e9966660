//! Clap voice: several filtered noise bursts a few milliseconds apart.

use arrayvec::ArrayVec;
use bg_ir::{clamp, ClapParams};

use super::envelope::{Adsr, Curve};
use super::tone::tone_compressor;
use super::{or_default, route, Scheduled, CLEANUP_MARGIN};
use crate::error::EngineError;
use crate::graph::{FilterType, UnitKey};
use crate::synth::SynthContext;

/// Most layers a clap builds.
pub const MAX_CLAP_LAYERS: usize = 8;

/// Length of the noise burst behind each layer, seconds.
const BURST: f64 = 0.2;
const SOURCE_TAIL: f64 = 0.02;

pub(super) fn trigger(
    p: &ClapParams,
    synth: &mut SynthContext<'_>,
    when: f64,
    duration: Option<f64>,
) -> Result<Scheduled, EngineError> {
    let layers = (p.layers as usize).clamp(1, MAX_CLAP_LAYERS);
    let spread = clamp(p.layer_spread, 0.0, 0.1);
    let decay = clamp(p.decay, 0.0, 2.0);
    let release = clamp(p.release, 0.0, 2.0);
    let gate = duration.unwrap_or(decay + release + 0.02);
    let resonance = clamp(or_default(p.resonance, 1.0), 0.0, 30.0);
    let level = clamp(or_default(p.level, 1.0), 0.0, 2.0) * synth.makeup.clap;

    let mut scheduled = Scheduled::default();
    for layer in 0..layers {
        let onset = when + layer as f64 * spread;
        let peak = if layer == 0 { 1.0 } else { clamp(p.layer_level, 0.0, 1.5) };
        let cleanup = onset + gate + CLEANUP_MARGIN;

        let noise = synth.noise(p.noise_color, BURST);
        let (env, gain) = synth.envelope(cleanup)?;
        Adsr {
            attack: p.attack,
            decay,
            sustain: p.sustain,
            release,
            peak,
            curve: Curve::Exponential,
        }
        .apply(gain, onset, gate);
        synth.connect(noise, env)?;

        let mut chain: ArrayVec<UnitKey, 6> = ArrayVec::new();
        chain.push(env);
        chain.push(synth.filter(FilterType::Highpass, or_default(p.hp_freq, 100.0).max(20.0), resonance, cleanup)?);
        chain.push(synth.filter(FilterType::Lowpass, or_default(p.lp_freq, 8000.0).max(200.0), resonance, cleanup)?);
        if p.saturation > 0.001 {
            let curve = synth.caches.soft_clip_curve(p.saturation);
            chain.push(synth.shaper(curve, cleanup)?);
        }
        chain.push(synth.compressor(tone_compressor(or_default(p.comp_threshold, -24.0), 0.2), cleanup)?);
        chain.push(synth.gain(level, cleanup)?);
        route(synth, &chain)?;

        synth.play(noise, onset, onset + gate + SOURCE_TAIL)?;
        scheduled.onsets.push(onset);
        scheduled.release_at = cleanup;
    }
    Ok(scheduled)
}
