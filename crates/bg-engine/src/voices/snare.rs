//! Snare voice: pitched body, noise and a short snap.

use arrayvec::ArrayVec;
use bg_ir::{clamp, semitones_to_ratio, NoiseColor, SnareParams};

use super::envelope::{Adsr, Curve, FLOOR};
use super::{route, Scheduled, CLEANUP_MARGIN};
use crate::config::CompressorSettings;
use crate::error::EngineError;
use crate::graph::{FilterType, ParamId, UnitKey};
use crate::synth::SynthContext;

const SOURCE_TAIL: f64 = 0.05;
const SNAP_DECAY: f64 = 0.03;
const SNAP_LENGTH: f64 = 0.05;
/// Q of the outer highpass and lowpass.
const EDGE_Q: f64 = 0.707;

pub(super) fn trigger(
    p: &SnareParams,
    synth: &mut SynthContext<'_>,
    when: f64,
    duration: Option<f64>,
) -> Result<Scheduled, EngineError> {
    let attack = clamp(p.attack, 0.0, 0.02);
    let tone_decay = clamp(p.tone_decay, 0.01, 1.5);
    let noise_decay = clamp(p.noise_decay, 0.01, 1.5);
    let release = clamp(p.release, 0.01, 1.5);
    let sustain = clamp(p.sustain, 0.0, 1.0);
    let gate = duration.unwrap_or(tone_decay.max(noise_decay) + release + 0.05);
    let cleanup = when + gate + CLEANUP_MARGIN;
    let stop = when + gate + SOURCE_TAIL;

    // Body
    let base = clamp(p.tone_frequency, 60.0, 4000.0);
    let sweep = clamp(p.tone_sweep, -24.0, 24.0);
    let start_freq = clamp(base * semitones_to_ratio(sweep), 40.0, 8000.0);
    let tone = synth.oscillator(p.tone_waveform, start_freq)?;
    let pitch = synth.param(tone, ParamId::Frequency)?;
    pitch.set_value_at(start_freq, when);
    pitch.exponential_ramp_to(base, when + (tone_decay * 0.6).max(0.01));
    let (tone_env, gain) = synth.envelope(cleanup)?;
    Adsr {
        attack,
        decay: tone_decay,
        sustain,
        release,
        peak: clamp(p.tone_level, 0.0, 1.5),
        curve: Curve::Exponential,
    }
    .apply(gain, when, gate);
    synth.connect(tone, tone_env)?;

    // Noise
    let noise = synth.noise(p.noise_color, gate + 0.05);
    let (noise_env, gain) = synth.envelope(cleanup)?;
    Adsr {
        attack,
        decay: noise_decay,
        sustain,
        release,
        peak: clamp(p.noise_level, 0.0, 2.0),
        curve: Curve::Exponential,
    }
    .apply(gain, when, gate);
    synth.connect(noise, noise_env)?;

    let mix = synth.gain(1.0, cleanup)?;
    synth.connect(tone_env, mix)?;
    synth.connect(noise_env, mix)?;

    // Snap
    let snap_level = clamp(p.snap_level, 0.0, 1.0);
    let snap = if snap_level > FLOOR {
        let source = synth.noise(NoiseColor::White, SNAP_LENGTH);
        let (snap_env, gain) = synth.envelope(cleanup)?;
        gain.set_value_at(snap_level, when);
        gain.exponential_ramp_to(FLOOR, when + SNAP_DECAY);
        synth.connect(source, snap_env)?;
        synth.connect(snap_env, mix)?;
        Some(source)
    } else {
        None
    };

    let mut chain: ArrayVec<UnitKey, 7> = ArrayVec::new();
    chain.push(mix);
    let saturation = clamp(p.saturation, 0.0, 1.0);
    if saturation > FLOOR {
        let curve = synth.caches.saturation_curve(saturation);
        chain.push(synth.shaper(curve, cleanup)?);
    }
    chain.push(synth.filter(
        FilterType::Bandpass,
        clamp(p.body_freq, 200.0, 10_000.0),
        clamp(p.body_resonance, 0.1, 20.0),
        cleanup,
    )?);
    chain.push(synth.filter(FilterType::Highpass, clamp(p.hp_freq, 40.0, 4000.0), EDGE_Q, cleanup)?);
    chain.push(synth.filter(FilterType::Lowpass, clamp(p.lp_freq, 1000.0, 20_000.0), EDGE_Q, cleanup)?);
    chain.push(synth.compressor(
        CompressorSettings::new(clamp(p.comp_threshold, -60.0, 0.0), 12.0, 4.0, 0.004, 0.18),
        cleanup,
    )?);
    let level = clamp(p.level, 0.0, 2.0) * synth.makeup.snare;
    chain.push(synth.gain(level, cleanup)?);
    route(synth, &chain)?;

    synth.play(tone, when, stop)?;
    synth.play(noise, when, stop)?;
    if let Some(source) = snap {
        synth.play(source, when, when + SNAP_LENGTH)?;
    }
    Ok(Scheduled::single(when, cleanup))
}
