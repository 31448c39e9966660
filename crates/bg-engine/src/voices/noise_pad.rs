//! Noise pad voice: sustained noise with a hold stage and a peaking band.

use arrayvec::ArrayVec;
use bg_ir::{clamp, NoisePadParams};

use super::envelope::{write_points, Curve, Point, FLOOR};
use super::{route, Scheduled, CLEANUP_MARGIN};
use crate::config::CompressorSettings;
use crate::error::EngineError;
use crate::graph::{FilterType, ParamId, UnitKey, UnitKind};
use crate::synth::SynthContext;

const SOURCE_TAIL: f64 = 0.05;
const NUDGE: f64 = 0.0001;

/// Attack to 1, decay to sustain, hold, then release. The gate does not
/// shorten the shape; it only bounds how long the noise runs.
pub fn pad_points(
    when: f64,
    attack: f64,
    decay: f64,
    sustain: f64,
    hold: f64,
    release: f64,
) -> ArrayVec<Point, 5> {
    let sustain = sustain.max(FLOOR);
    let peak_time = when + attack;
    let decay_end = peak_time + decay;
    let hold_end = decay_end + hold;
    let mut points = ArrayVec::new();
    points.push(Point::Set { time: when, value: FLOOR });
    points.push(Point::Ramp { time: peak_time + NUDGE, value: 1.0 });
    points.push(Point::Ramp { time: decay_end + NUDGE, value: sustain });
    if hold > NUDGE {
        points.push(Point::Set { time: hold_end, value: sustain });
    }
    points.push(Point::Ramp { time: hold_end + release + NUDGE, value: FLOOR });
    points
}

pub(super) fn trigger(
    p: &NoisePadParams,
    synth: &mut SynthContext<'_>,
    when: f64,
    duration: Option<f64>,
) -> Result<Scheduled, EngineError> {
    let attack = clamp(p.attack, 0.0, 10.0);
    let decay = clamp(p.decay, 0.001, 10.0);
    let sustain = clamp(p.sustain, 0.0, 1.0);
    let hold = clamp(p.hold, 0.0, 10.0);
    let release = clamp(p.release, 0.001, 10.0);
    let gate = duration.unwrap_or(attack + decay + hold + release + 0.05);
    let points = pad_points(when, attack, decay, sustain, hold, release);
    let shape_end = points.last().map_or(when, Point::time);
    let cleanup = (when + gate).max(shape_end) + CLEANUP_MARGIN;
    let nyquist = synth.sample_rate() as f64 * 0.5;

    let noise = synth.noise(p.noise_color, gate + 0.1);
    let (env, gain) = synth.envelope(cleanup)?;
    write_points(gain, &points, Curve::Exponential);
    synth.connect(noise, env)?;

    let mut chain: ArrayVec<UnitKey, 7> = ArrayVec::new();
    chain.push(env);
    let saturation = clamp(p.saturation, 0.0, 1.0);
    if saturation > FLOOR {
        let curve = synth.caches.saturation_curve(saturation);
        chain.push(synth.shaper(curve, cleanup)?);
    }
    chain.push(synth.filter(
        FilterType::Highpass,
        clamp(p.hp_freq, 20.0, nyquist),
        clamp(p.hp_q, 0.1, 12.0),
        cleanup,
    )?);
    let band_gain = clamp(p.band_gain, -24.0, 24.0);
    if band_gain.abs() > 0.01 {
        let band = synth.pooled(UnitKind::BiquadFilter, cleanup);
        synth.ctx.set_filter_type(band, FilterType::Peaking)?;
        synth.ctx.set_param(band, ParamId::Frequency, clamp(p.band_freq, 20.0, nyquist))?;
        synth.ctx.set_param(band, ParamId::FilterGain, band_gain)?;
        synth.ctx.set_param(band, ParamId::Q, clamp(p.band_q, 0.1, 18.0))?;
        chain.push(band);
    }
    chain.push(synth.filter(
        FilterType::Lowpass,
        clamp(p.lp_freq, 200.0, nyquist),
        clamp(p.lp_q, 0.1, 12.0),
        cleanup,
    )?);
    chain.push(synth.compressor(
        CompressorSettings::new(clamp(p.comp_threshold, -60.0, 0.0), 8.0, 2.5, 0.005, 0.25),
        cleanup,
    )?);
    let level = clamp(p.level, 0.0, 2.0) * synth.makeup.noise_pad;
    chain.push(synth.gain(level, cleanup)?);
    route(synth, &chain)?;

    synth.play(noise, when, when + gate + SOURCE_TAIL)?;
    Ok(Scheduled::single(when, cleanup))
}
