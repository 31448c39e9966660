//! Pitched oscillator voice.

use arrayvec::ArrayVec;
use bg_ir::{clamp, semitones_to_ratio, ToneParams, Waveform};

use super::envelope::{Adsr, Curve};
use super::{or_default, route, Scheduled, CLEANUP_MARGIN};
use crate::config::CompressorSettings;
use crate::error::EngineError;
use crate::graph::{FilterType, ParamId, UnitKey};
use crate::synth::SynthContext;

/// Seconds sources run past the gate.
const SOURCE_TAIL: f64 = 0.05;

/// Seconds the vibrato LFO runs past the gate.
const VIBRATO_TAIL: f64 = 0.1;

/// Threshold is per voice; the rest is fixed.
pub(super) fn tone_compressor(threshold: f64, release: f64) -> CompressorSettings {
    CompressorSettings::new(clamp(threshold, -60.0, 0.0), 10.0, 3.0, 0.003, release)
}

/// Sine LFO adding `depth` semitones (as Hz around `frequency`) to the
/// frequency of every oscillator in `targets`.
#[allow(clippy::too_many_arguments)]
pub(super) fn vibrato(
    synth: &mut SynthContext<'_>,
    targets: &[UnitKey],
    frequency: f64,
    rate: f64,
    depth: f64,
    when: f64,
    stop: f64,
    release_at: f64,
) -> Result<(), EngineError> {
    if !(rate > 0.0 && depth > 0.0) {
        return Ok(());
    }
    let lfo = synth.oscillator(Waveform::Sine, clamp(rate, 0.0, 50.0))?;
    let depth_hz = frequency * (semitones_to_ratio(clamp(depth, 0.0, 24.0)) - 1.0);
    let amount = synth.gain(depth_hz, release_at)?;
    synth.connect(lfo, amount)?;
    for &osc in targets {
        synth.ctx.connect_param(amount, osc, ParamId::Frequency)?;
    }
    synth.play(lfo, when, stop)
}

pub(super) fn trigger(
    p: &ToneParams,
    synth: &mut SynthContext<'_>,
    when: f64,
    duration: Option<f64>,
) -> Result<Scheduled, EngineError> {
    let gate = duration.unwrap_or_else(|| clamp(p.duration, 0.01, 10.0));
    let cleanup = when + gate + CLEANUP_MARGIN;
    let frequency = clamp(p.frequency, 1.0, 20_000.0) * semitones_to_ratio(clamp(p.detune, -48.0, 48.0));

    let osc = synth.oscillator(p.waveform, frequency)?;
    let (env, gain) = synth.envelope(cleanup)?;
    Adsr {
        attack: p.attack,
        decay: p.decay,
        sustain: p.sustain,
        release: p.release,
        peak: 1.0,
        curve: Curve::Linear,
    }
    .apply(gain, when, gate);
    synth.connect(osc, env)?;

    vibrato(
        synth,
        &[osc],
        frequency,
        p.vibrato_rate,
        p.vibrato_depth,
        when,
        when + gate + VIBRATO_TAIL,
        cleanup,
    )?;

    let mut chain: ArrayVec<UnitKey, 6> = ArrayVec::new();
    chain.push(env);
    if p.saturation > 0.001 {
        let curve = synth.caches.soft_clip_curve(p.saturation);
        chain.push(synth.shaper(curve, cleanup)?);
    }
    chain.push(synth.filter(FilterType::Highpass, or_default(p.hp_freq, 10.0).max(10.0), 1.0, cleanup)?);
    chain.push(synth.filter(FilterType::Lowpass, or_default(p.lp_freq, 20_000.0).max(200.0), 1.0, cleanup)?);
    chain.push(synth.compressor(tone_compressor(or_default(p.comp_threshold, -24.0), 0.25), cleanup)?);
    let level = clamp(or_default(p.level, 1.0), 0.0, 2.0) * synth.makeup.tone;
    chain.push(synth.gain(level, cleanup)?);
    route(synth, &chain)?;

    synth.play(osc, when, when + gate + SOURCE_TAIL)?;
    Ok(Scheduled::single(when, cleanup))
}
