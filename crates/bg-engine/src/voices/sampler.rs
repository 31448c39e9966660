//! Sample playback voice.

use bg_ir::{clamp, AudioBuffer, SampleParams};

use super::{Scheduled, CLEANUP_MARGIN};
use crate::error::EngineError;
use crate::synth::SynthContext;

/// Fade in and out, seconds.
const FADE: f64 = 0.003;
const TARGET_RMS: f64 = 0.3;
const MAX_MAKEUP: f64 = 2.5;
/// Samples below this RMS are left alone.
const MIN_RMS: f32 = 0.01;
/// Frames inspected when measuring a sample.
const ANALYSIS_FRAMES: usize = 44100;

/// Gain bringing the first second of `buffer` toward a common RMS.
pub fn sample_makeup(buffer: &AudioBuffer) -> f64 {
    let rms = buffer.rms(0, ANALYSIS_FRAMES);
    if rms > MIN_RMS {
        (TARGET_RMS / rms as f64).min(MAX_MAKEUP)
    } else {
        1.0
    }
}

pub(super) fn trigger(
    p: &SampleParams,
    synth: &mut SynthContext<'_>,
    when: f64,
    duration: Option<f64>,
) -> Result<Scheduled, EngineError> {
    let Some(buffer) = p.sample.clone() else {
        return Ok(Scheduled::default());
    };
    let makeup = if p.normalize { sample_makeup(&buffer) } else { 1.0 };
    let peak = makeup * clamp(p.level, 0.0, 2.0) * synth.makeup.sample;
    let length = duration.unwrap_or_else(|| buffer.duration());
    let cleanup = when + length + CLEANUP_MARGIN;

    let source = synth.buffer_source(buffer);
    let (env, gain) = synth.envelope(cleanup)?;
    gain.set_value_at(0.0, when);
    gain.linear_ramp_to(peak, when + FADE);
    let fade_out = (when + length - FADE).max(when + FADE);
    gain.set_value_at(peak, fade_out);
    gain.linear_ramp_to(0.0, when + length);
    synth.connect(source, env)?;
    let out = synth.output;
    synth.connect(env, out)?;

    match duration {
        Some(d) => synth.play(source, when, when + d)?,
        None => synth.play_to_end(source, when)?,
    }
    Ok(Scheduled::single(when, cleanup))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_samples_get_boosted_up_to_limit() {
        let quiet = AudioBuffer::from_planes(vec![vec![0.05; 1000]], 44100);
        assert_eq!(sample_makeup(&quiet), MAX_MAKEUP);
        let loud = AudioBuffer::from_planes(vec![vec![0.6; 1000]], 44100);
        assert!((sample_makeup(&loud) - 0.5).abs() < 1e-5);
        let silent = AudioBuffer::from_planes(vec![vec![0.0; 1000]], 44100);
        assert_eq!(sample_makeup(&silent), 1.0);
    }
}
