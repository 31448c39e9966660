//! Bass voice: oscillator plus an optional sine an octave below.

use arrayvec::ArrayVec;
use bg_ir::{clamp, semitones_to_ratio, BassParams, Waveform};

use super::envelope::{Adsr, Curve};
use super::tone::{tone_compressor, vibrato};
use super::{or_default, route, Scheduled, CLEANUP_MARGIN};
use crate::error::EngineError;
use crate::graph::{FilterType, UnitKey};
use crate::synth::SynthContext;

const SOURCE_TAIL: f64 = 0.05;
const VIBRATO_TAIL: f64 = 0.1;

pub(super) fn trigger(
    p: &BassParams,
    synth: &mut SynthContext<'_>,
    when: f64,
    duration: Option<f64>,
) -> Result<Scheduled, EngineError> {
    let gate = duration.unwrap_or_else(|| clamp(p.duration, 0.01, 10.0));
    let cleanup = when + gate + CLEANUP_MARGIN;
    let frequency = clamp(p.frequency, 1.0, 20_000.0) * semitones_to_ratio(clamp(p.detune, -48.0, 48.0));
    let shape = Adsr {
        attack: p.attack,
        decay: p.decay,
        sustain: p.sustain,
        release: p.release,
        peak: 1.0,
        curve: Curve::Linear,
    };

    let osc = synth.oscillator(p.waveform, frequency)?;
    let (env, gain) = synth.envelope(cleanup)?;
    shape.apply(gain, when, gate);
    synth.connect(osc, env)?;

    let sub = if p.sub_osc {
        let sub_osc = synth.oscillator(Waveform::Sine, frequency / 2.0)?;
        let (sub_env, gain) = synth.envelope(cleanup)?;
        Adsr {
            peak: clamp(p.sub_level, 0.0, 2.0),
            ..shape
        }
        .apply(gain, when, gate);
        synth.connect(sub_osc, sub_env)?;
        Some((sub_osc, sub_env))
    } else {
        None
    };

    let mut oscillators: ArrayVec<UnitKey, 2> = ArrayVec::new();
    oscillators.push(osc);
    if let Some((sub_osc, _)) = sub {
        oscillators.push(sub_osc);
    }
    vibrato(
        synth,
        &oscillators,
        frequency,
        p.vibrato_rate,
        p.vibrato_depth,
        when,
        when + gate + VIBRATO_TAIL,
        cleanup,
    )?;

    let resonance = clamp(p.resonance, 0.0, 30.0);
    let mut chain: ArrayVec<UnitKey, 6> = ArrayVec::new();
    chain.push(env);
    if p.saturation > 0.001 {
        let curve = synth.caches.soft_clip_curve(p.saturation);
        chain.push(synth.shaper(curve, cleanup)?);
    }
    chain.push(synth.filter(FilterType::Highpass, or_default(p.hp_freq, 20.0).max(10.0), resonance, cleanup)?);
    // The sub joins after the main envelope, at the first shaping stage.
    if let Some((_, sub_env)) = sub {
        synth.connect(sub_env, chain[1])?;
    }
    chain.push(synth.filter(FilterType::Lowpass, or_default(p.lp_freq, 8000.0).max(200.0), resonance, cleanup)?);
    chain.push(synth.compressor(tone_compressor(or_default(p.comp_threshold, -18.0), 0.25), cleanup)?);
    let level = clamp(or_default(p.level, 1.0), 0.0, 2.0) * synth.makeup.bass;
    chain.push(synth.gain(level, cleanup)?);
    route(synth, &chain)?;

    for &source in &oscillators {
        synth.play(source, when, when + gate + SOURCE_TAIL)?;
    }
    Ok(Scheduled::single(when, cleanup))
}
