//! Per-generator voice parameter records.
//!
//! Each record is a flat set of numbers and enums read once per trigger.
//! Values are stored as the user set them; the engine clamps them into
//! safe ranges when it builds a voice.

use alloc::sync::Arc;

use crate::audio_buffer::AudioBuffer;
use crate::params::{NoiseColor, Waveform};

/// Which voice builder a track uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeneratorKind {
    Tone,
    Bass,
    Kick,
    Snare,
    HiHat,
    Clap,
    NoisePad,
    Sample,
}

impl GeneratorKind {
    pub const ALL: [GeneratorKind; 8] = [
        GeneratorKind::Tone,
        GeneratorKind::Bass,
        GeneratorKind::Kick,
        GeneratorKind::Snare,
        GeneratorKind::HiHat,
        GeneratorKind::Clap,
        GeneratorKind::NoisePad,
        GeneratorKind::Sample,
    ];

    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            GeneratorKind::Tone => "Tone Generator",
            GeneratorKind::Bass => "Bass Generator",
            GeneratorKind::Kick => "Kick Generator",
            GeneratorKind::Snare => "Snare Generator",
            GeneratorKind::HiHat => "Hi-Hat Generator",
            GeneratorKind::Clap => "Clap Generator",
            GeneratorKind::NoisePad => "Noise Generator",
            GeneratorKind::Sample => "Sample Player",
        }
    }

    /// Default parameter record for this generator.
    pub fn default_params(self) -> VoiceParams {
        match self {
            GeneratorKind::Tone => VoiceParams::Tone(ToneParams::default()),
            GeneratorKind::Bass => VoiceParams::Bass(BassParams::default()),
            GeneratorKind::Kick => VoiceParams::Kick(KickParams::default()),
            GeneratorKind::Snare => VoiceParams::Snare(SnareParams::default()),
            GeneratorKind::HiHat => VoiceParams::HiHat(HiHatParams::default()),
            GeneratorKind::Clap => VoiceParams::Clap(ClapParams::default()),
            GeneratorKind::NoisePad => VoiceParams::NoisePad(NoisePadParams::default()),
            GeneratorKind::Sample => VoiceParams::Sample(SampleParams::default()),
        }
    }
}

/// Parameter record of one generator instance, tagged by builder.
#[derive(Clone, Debug, PartialEq)]
pub enum VoiceParams {
    Tone(ToneParams),
    Bass(BassParams),
    Kick(KickParams),
    Snare(SnareParams),
    HiHat(HiHatParams),
    Clap(ClapParams),
    NoisePad(NoisePadParams),
    Sample(SampleParams),
}

impl VoiceParams {
    pub fn kind(&self) -> GeneratorKind {
        match self {
            VoiceParams::Tone(_) => GeneratorKind::Tone,
            VoiceParams::Bass(_) => GeneratorKind::Bass,
            VoiceParams::Kick(_) => GeneratorKind::Kick,
            VoiceParams::Snare(_) => GeneratorKind::Snare,
            VoiceParams::HiHat(_) => GeneratorKind::HiHat,
            VoiceParams::Clap(_) => GeneratorKind::Clap,
            VoiceParams::NoisePad(_) => GeneratorKind::NoisePad,
            VoiceParams::Sample(_) => GeneratorKind::Sample,
        }
    }
}

/// Pitched oscillator with ADSR, optional vibrato and a tone-shaping chain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToneParams {
    pub frequency: f64,
    pub waveform: Waveform,
    /// Gate length in seconds when the trigger gives none.
    pub duration: f64,
    pub level: f64,
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
    /// Pitch offset in semitones.
    pub detune: f64,
    pub vibrato_rate: f64,
    /// Vibrato depth in semitones.
    pub vibrato_depth: f64,
    pub hp_freq: f64,
    pub lp_freq: f64,
    pub saturation: f64,
    pub comp_threshold: f64,
}

impl Default for ToneParams {
    fn default() -> Self {
        Self {
            frequency: 440.0,
            waveform: Waveform::Sine,
            duration: 0.1,
            level: 1.0,
            attack: 0.01,
            decay: 0.1,
            sustain: 0.8,
            release: 0.1,
            detune: 0.0,
            vibrato_rate: 0.0,
            vibrato_depth: 0.0,
            hp_freq: 10.0,
            lp_freq: 20000.0,
            saturation: 0.0,
            comp_threshold: -24.0,
        }
    }
}

/// Low oscillator with an optional sine an octave below.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BassParams {
    pub frequency: f64,
    pub waveform: Waveform,
    pub duration: f64,
    pub level: f64,
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
    pub detune: f64,
    pub sub_osc: bool,
    pub sub_level: f64,
    pub vibrato_rate: f64,
    pub vibrato_depth: f64,
    pub hp_freq: f64,
    pub lp_freq: f64,
    /// Filter resonance in dB, shared by the highpass and lowpass.
    pub resonance: f64,
    pub saturation: f64,
    pub comp_threshold: f64,
}

impl Default for BassParams {
    fn default() -> Self {
        Self {
            frequency: 80.0,
            waveform: Waveform::Sine,
            duration: 0.3,
            level: 1.0,
            attack: 0.01,
            decay: 0.2,
            sustain: 0.7,
            release: 0.3,
            detune: 0.0,
            sub_osc: false,
            sub_level: 0.5,
            vibrato_rate: 0.0,
            vibrato_depth: 0.0,
            hp_freq: 20.0,
            lp_freq: 8000.0,
            resonance: 0.0,
            saturation: 0.0,
            comp_threshold: -18.0,
        }
    }
}

/// Swept sine body with a short square click.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KickParams {
    pub frequency: f64,
    /// Pitch offset in semitones.
    pub pitch_offset: f64,
    pub level: f64,
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
    pub click_level: f64,
    pub hp_freq: f64,
    pub saturation: f64,
    pub comp_threshold: f64,
}

impl Default for KickParams {
    fn default() -> Self {
        Self {
            frequency: 60.0,
            pitch_offset: 0.0,
            level: 1.0,
            attack: 0.001,
            decay: 0.2,
            sustain: 0.0,
            release: 0.05,
            click_level: 0.02,
            hp_freq: 20.0,
            saturation: 0.0,
            comp_threshold: -24.0,
        }
    }
}

/// Tonal body plus filtered noise plus an optional snap transient.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnareParams {
    pub tone_frequency: f64,
    /// Start of the pitch sweep, in semitones above `tone_frequency`.
    pub tone_sweep: f64,
    pub tone_decay: f64,
    pub tone_level: f64,
    pub tone_waveform: Waveform,
    pub noise_decay: f64,
    pub noise_level: f64,
    pub noise_color: NoiseColor,
    pub attack: f64,
    pub sustain: f64,
    pub release: f64,
    pub body_freq: f64,
    pub body_resonance: f64,
    pub hp_freq: f64,
    pub lp_freq: f64,
    pub saturation: f64,
    pub comp_threshold: f64,
    pub snap_level: f64,
    pub level: f64,
}

impl SnareParams {
    /// Values used when no preset is chosen.
    pub const DEFAULT: Self = Self {
        tone_frequency: 205.0,
        tone_sweep: 8.0,
        tone_decay: 0.2,
        tone_level: 0.68,
        tone_waveform: Waveform::Triangle,
        noise_decay: 0.25,
        noise_level: 1.0,
        noise_color: NoiseColor::White,
        attack: 0.001,
        sustain: 0.0,
        release: 0.14,
        body_freq: 2100.0,
        body_resonance: 3.8,
        hp_freq: 180.0,
        lp_freq: 9500.0,
        saturation: 0.16,
        comp_threshold: -16.0,
        snap_level: 0.15,
        level: 1.0,
    };
}

impl Default for SnareParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Noise plus four square partials at fixed inharmonic ratios.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HiHatParams {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
    pub noise_color: NoiseColor,
    pub noise_level: f64,
    pub noise_decay: f64,
    pub metal_level: f64,
    pub metal_decay: f64,
    pub metal_freq: f64,
    pub metal_spread: f64,
    pub hp_freq: f64,
    pub bp_freq: f64,
    pub bp_resonance: f64,
    pub lp_freq: f64,
    pub saturation: f64,
    pub comp_threshold: f64,
    pub level: f64,
}

impl HiHatParams {
    /// Values used when no preset is chosen.
    pub const DEFAULT: Self = Self {
        attack: 0.0008,
        decay: 0.1,
        sustain: 0.0,
        release: 0.08,
        noise_color: NoiseColor::White,
        noise_level: 0.95,
        noise_decay: 0.09,
        metal_level: 0.8,
        metal_decay: 0.08,
        metal_freq: 8200.0,
        metal_spread: 1.5,
        hp_freq: 3000.0,
        bp_freq: 7800.0,
        bp_resonance: 6.0,
        lp_freq: 15000.0,
        saturation: 0.12,
        comp_threshold: -17.0,
        level: 0.9,
    };
}

impl Default for HiHatParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Several short noise bursts a few milliseconds apart.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClapParams {
    pub level: f64,
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
    pub noise_color: NoiseColor,
    pub hp_freq: f64,
    pub lp_freq: f64,
    pub resonance: f64,
    pub layers: u32,
    /// Offset between consecutive layers in seconds.
    pub layer_spread: f64,
    /// Peak of every layer after the first.
    pub layer_level: f64,
    pub saturation: f64,
    pub comp_threshold: f64,
}

impl Default for ClapParams {
    fn default() -> Self {
        Self {
            level: 0.8,
            attack: 0.001,
            decay: 0.08,
            sustain: 0.0,
            release: 0.05,
            noise_color: NoiseColor::White,
            hp_freq: 200.0,
            lp_freq: 8000.0,
            resonance: 2.0,
            layers: 3,
            layer_spread: 0.005,
            layer_level: 0.7,
            saturation: 0.08,
            comp_threshold: -18.0,
        }
    }
}

/// Sustained shaped noise with a hold stage and a peaking band.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoisePadParams {
    pub level: f64,
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub hold: f64,
    pub release: f64,
    pub noise_color: NoiseColor,
    pub hp_freq: f64,
    pub hp_q: f64,
    pub lp_freq: f64,
    pub lp_q: f64,
    pub band_freq: f64,
    /// Peaking band gain in dB. Near zero skips the band filter.
    pub band_gain: f64,
    pub band_q: f64,
    pub saturation: f64,
    pub comp_threshold: f64,
}

impl NoisePadParams {
    /// Values used when no preset is chosen.
    pub const DEFAULT: Self = Self {
        level: 0.8,
        attack: 0.02,
        decay: 0.25,
        sustain: 0.8,
        hold: 1.0,
        release: 0.5,
        noise_color: NoiseColor::White,
        hp_freq: 200.0,
        hp_q: 0.8,
        lp_freq: 16000.0,
        lp_q: 1.0,
        band_freq: 4000.0,
        band_gain: 0.0,
        band_q: 1.5,
        saturation: 0.08,
        comp_threshold: -24.0,
    };
}

impl Default for NoisePadParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Playback of a loaded sample buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleParams {
    /// Decoded audio; a track without one stays silent.
    pub sample: Option<Arc<AudioBuffer>>,
    pub level: f64,
    /// Scale quiet or loud samples toward a common RMS.
    pub normalize: bool,
}

impl Default for SampleParams {
    fn default() -> Self {
        Self {
            sample: None,
            level: 1.0,
            normalize: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_match_kind() {
        for kind in GeneratorKind::ALL {
            assert_eq!(kind.default_params().kind(), kind);
        }
    }

    #[test]
    fn clap_defaults() {
        let clap = ClapParams::default();
        assert_eq!(clap.layers, 3);
        assert_eq!(clap.layer_spread, 0.005);
    }

    #[test]
    fn sample_defaults_have_no_buffer() {
        assert!(SampleParams::default().sample.is_none());
    }
}
