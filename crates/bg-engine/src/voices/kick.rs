//! Kick voice: swept sine body with a square click.

use arrayvec::ArrayVec;
use bg_ir::{clamp, semitones_to_ratio, KickParams, Waveform};

use super::envelope::{Adsr, Curve, FLOOR};
use super::tone::tone_compressor;
use super::{or_default, route, Scheduled, CLEANUP_MARGIN};
use crate::error::EngineError;
use crate::graph::{FilterType, ParamId, UnitKey};
use crate::synth::SynthContext;

const BODY_TAIL: f64 = 0.02;
const CLICK_FREQUENCY: f64 = 8000.0;
const CLICK_DECAY: f64 = 0.01;
const CLICK_LENGTH: f64 = 0.02;

pub(super) fn trigger(
    p: &KickParams,
    synth: &mut SynthContext<'_>,
    when: f64,
    duration: Option<f64>,
) -> Result<Scheduled, EngineError> {
    let decay = clamp(p.decay, 0.0, 5.0);
    let release = clamp(p.release, 0.0, 5.0);
    let gate = duration.unwrap_or(decay + release + 0.05);
    let cleanup = when + gate + CLEANUP_MARGIN;
    let frequency = clamp(p.frequency, 20.0, 2000.0) * semitones_to_ratio(clamp(p.pitch_offset, -24.0, 24.0));

    // Body sweeps down from an octave above.
    let osc = synth.oscillator(Waveform::Sine, frequency * 2.0)?;
    let pitch = synth.param(osc, ParamId::Frequency)?;
    pitch.set_value_at(frequency * 2.0, when);
    pitch.exponential_ramp_to(frequency, when + (decay * 0.1).max(0.01));

    let (env, gain) = synth.envelope(cleanup)?;
    Adsr {
        attack: p.attack,
        decay,
        sustain: p.sustain,
        release,
        peak: 1.0,
        curve: Curve::Exponential,
    }
    .apply(gain, when, gate);
    synth.connect(osc, env)?;

    let mut chain: ArrayVec<UnitKey, 5> = ArrayVec::new();
    chain.push(env);
    if p.saturation > 0.001 {
        let curve = synth.caches.soft_clip_curve(p.saturation);
        chain.push(synth.shaper(curve, cleanup)?);
    }
    let hp = synth.filter(FilterType::Highpass, or_default(p.hp_freq, 20.0).max(10.0), 1.0, cleanup)?;
    chain.push(hp);
    chain.push(synth.compressor(tone_compressor(or_default(p.comp_threshold, -24.0), 0.2), cleanup)?);
    let level = clamp(or_default(p.level, 1.0), 0.0, 2.0) * synth.makeup.kick;
    chain.push(synth.gain(level, cleanup)?);
    route(synth, &chain)?;

    let click_level = clamp(p.click_level, 0.0, 1.0);
    if click_level > FLOOR {
        let click = synth.oscillator(Waveform::Square, CLICK_FREQUENCY)?;
        let (click_env, gain) = synth.envelope(cleanup)?;
        gain.set_value_at(click_level, when);
        gain.exponential_ramp_to(FLOOR, when + CLICK_DECAY);
        synth.connect(click, click_env)?;
        synth.connect(click_env, hp)?;
        synth.play(click, when, when + CLICK_LENGTH)?;
    }

    synth.play(osc, when, when + gate + BODY_TAIL)?;
    Ok(Scheduled::single(when, cleanup))
}
