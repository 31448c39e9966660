//! Hi-hat voice: noise plus four square partials at inharmonic ratios.

use arrayvec::ArrayVec;
use bg_ir::{clamp, HiHatParams, Waveform};

use super::envelope::{Adsr, Curve, FLOOR};
use super::{route, Scheduled, CLEANUP_MARGIN};
use crate::config::CompressorSettings;
use crate::error::EngineError;
use crate::graph::{FilterType, UnitKey};
use crate::synth::SynthContext;

/// Partial frequencies relative to the metal base frequency.
pub const PARTIAL_RATIOS: [f64; 4] = [1.0, 1.447, 1.95, 2.63];

const SOURCE_TAIL: f64 = 0.05;
const EDGE_Q: f64 = 0.707;

/// Frequency of partial `index`, spread geometrically by `spread`.
pub fn partial_frequency(base: f64, spread: f64, index: usize) -> f64 {
    clamp(
        base * spread.powi(index as i32) * PARTIAL_RATIOS[index],
        1000.0,
        20_000.0,
    )
}

pub(super) fn trigger(
    p: &HiHatParams,
    synth: &mut SynthContext<'_>,
    when: f64,
    duration: Option<f64>,
) -> Result<Scheduled, EngineError> {
    let attack = clamp(p.attack, 0.0, 0.02);
    let decay = clamp(p.decay, 0.01, 1.0);
    let sustain = clamp(p.sustain, 0.0, 1.0);
    let release = clamp(p.release, 0.01, 1.0);
    let noise_decay = clamp(or_nan(p.noise_decay, decay), 0.01, 1.0);
    let metal_decay = clamp(or_nan(p.metal_decay, decay), 0.01, 1.0);
    let gate = duration.unwrap_or(noise_decay.max(metal_decay) + release + 0.05);
    let cleanup = when + gate + CLEANUP_MARGIN;
    let stop = when + gate + SOURCE_TAIL;
    let noise_level = clamp(p.noise_level, 0.0, 2.0);
    let metal_level = clamp(p.metal_level, 0.0, 1.5);
    let shape = Adsr {
        attack,
        decay: noise_decay,
        sustain,
        release,
        peak: noise_level,
        curve: Curve::Exponential,
    };

    let noise = synth.noise(p.noise_color, gate + 0.05);
    let (noise_env, gain) = synth.envelope(cleanup)?;
    shape.apply(gain, when, gate);
    synth.connect(noise, noise_env)?;

    let (metal_env, gain) = synth.envelope(cleanup)?;
    Adsr {
        decay: metal_decay,
        peak: metal_level,
        ..shape
    }
    .apply(gain, when, gate);

    let base = clamp(p.metal_freq, 2000.0, 18_000.0);
    let spread = clamp(p.metal_spread, 1.0, 2.5);
    let per_partial = metal_level.max(FLOOR) / PARTIAL_RATIOS.len() as f64;
    let mut partials: ArrayVec<UnitKey, 4> = ArrayVec::new();
    for index in 0..PARTIAL_RATIOS.len() {
        let osc = synth.oscillator(Waveform::Square, partial_frequency(base, spread, index))?;
        let g = synth.gain(per_partial, cleanup)?;
        synth.connect(osc, g)?;
        synth.connect(g, metal_env)?;
        partials.push(osc);
    }

    let mix = synth.gain(1.0, cleanup)?;
    synth.connect(noise_env, mix)?;
    synth.connect(metal_env, mix)?;

    let mut chain: ArrayVec<UnitKey, 7> = ArrayVec::new();
    chain.push(mix);
    let saturation = clamp(p.saturation, 0.0, 1.0);
    if saturation > FLOOR {
        let curve = synth.caches.saturation_curve(saturation);
        chain.push(synth.shaper(curve, cleanup)?);
    }
    chain.push(synth.filter(FilterType::Highpass, clamp(p.hp_freq, 500.0, 8000.0), EDGE_Q, cleanup)?);
    chain.push(synth.filter(
        FilterType::Bandpass,
        clamp(p.bp_freq, 1000.0, 16_000.0),
        clamp(p.bp_resonance, 0.1, 20.0),
        cleanup,
    )?);
    chain.push(synth.filter(FilterType::Lowpass, clamp(p.lp_freq, 2000.0, 20_000.0), EDGE_Q, cleanup)?);
    chain.push(synth.compressor(
        CompressorSettings::new(clamp(p.comp_threshold, -60.0, 0.0), 10.0, 3.0, 0.002, 0.15),
        cleanup,
    )?);
    let level = clamp(p.level, 0.0, 2.0) * synth.makeup.hihat;
    chain.push(synth.gain(level, cleanup)?);
    route(synth, &chain)?;

    synth.play(noise, when, stop)?;
    for osc in partials {
        synth.play(osc, when, stop)?;
    }
    Ok(Scheduled::single(when, cleanup))
}

fn or_nan(value: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value
    }
}
