//! Engine settings.
//!
//! Plain structs with `Default`; callers build and pass them in.

use bg_ir::{GeneratorKind, DEFAULT_MASTER_VOLUME};

/// Look-ahead scheduling timing, in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransportConfig {
    /// Period of the scheduling tick
    pub tick_interval: f64,
    /// How far past the current time steps are scheduled
    pub schedule_ahead: f64,
    /// Delay between a start command and step 0
    pub start_offset: f64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tick_interval: 0.05,
            schedule_ahead: 0.2,
            start_offset: 0.05,
        }
    }
}

/// Fixed settings of a dynamics compressor stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompressorSettings {
    /// dB
    pub threshold: f64,
    /// dB
    pub knee: f64,
    pub ratio: f64,
    /// Seconds
    pub attack: f64,
    /// Seconds
    pub release: f64,
}

impl CompressorSettings {
    pub const fn new(threshold: f64, knee: f64, ratio: f64, attack: f64, release: f64) -> Self {
        Self {
            threshold,
            knee,
            ratio,
            attack,
            release,
        }
    }
}

/// Master bus chain constants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MasterConfig {
    /// Initial input gain
    pub volume: f64,
    /// Highpass cutoff removing DC and sub rumble, Hz
    pub dc_cutoff: f64,
    pub compressor: CompressorSettings,
    /// Gain after the compressor
    pub makeup: f64,
    pub limiter: CompressorSettings,
    /// Length of volume change ramps, seconds
    pub volume_ramp: f64,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            volume: DEFAULT_MASTER_VOLUME,
            dc_cutoff: 25.0,
            compressor: CompressorSettings::new(-18.0, 12.0, 3.0, 0.01, 0.2),
            makeup: 1.2,
            limiter: CompressorSettings::new(-1.0, 0.0, 20.0, 0.001, 0.05),
            volume_ramp: 0.03,
        }
    }
}

/// Fixed output multipliers per instrument family, applied on top of each
/// voice's level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoiceMakeup {
    pub tone: f64,
    pub bass: f64,
    pub kick: f64,
    pub snare: f64,
    pub hihat: f64,
    pub clap: f64,
    pub noise_pad: f64,
    pub sample: f64,
}

impl Default for VoiceMakeup {
    fn default() -> Self {
        Self {
            tone: 1.0,
            bass: 1.0,
            kick: 1.0,
            snare: 1.25,
            hihat: 1.1,
            clap: 1.2,
            noise_pad: 1.0,
            sample: 1.0,
        }
    }
}

impl VoiceMakeup {
    pub fn for_kind(&self, kind: GeneratorKind) -> f64 {
        match kind {
            GeneratorKind::Tone => self.tone,
            GeneratorKind::Bass => self.bass,
            GeneratorKind::Kick => self.kick,
            GeneratorKind::Snare => self.snare,
            GeneratorKind::HiHat => self.hihat,
            GeneratorKind::Clap => self.clap,
            GeneratorKind::NoisePad => self.noise_pad,
            GeneratorKind::Sample => self.sample,
        }
    }
}

/// Click played on every step while the metronome is on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetronomeConfig {
    pub frequency: f64,
    /// Gain on the first step of the grid
    pub accent_gain: f64,
    pub gain: f64,
    /// Seconds
    pub length: f64,
}

impl Default for MetronomeConfig {
    fn default() -> Self {
        Self {
            frequency: 440.0,
            accent_gain: 0.02,
            gain: 0.01,
            length: 0.06,
        }
    }
}

/// Settings for a live engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: u32,
    pub transport: TransportConfig,
    pub master: MasterConfig,
    pub makeup: VoiceMakeup,
    pub metronome: MetronomeConfig,
    /// Seed for generated noise
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            transport: TransportConfig::default(),
            master: MasterConfig::default(),
            makeup: VoiceMakeup::default(),
            metronome: MetronomeConfig::default(),
            seed: 0x5eed,
        }
    }
}

/// Settings for an offline mixdown.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExportConfig {
    pub bars: u32,
    pub sample_rate: u32,
    pub channels: u16,
    pub master: MasterConfig,
    pub makeup: VoiceMakeup,
    pub seed: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            bars: 4,
            sample_rate: 44100,
            channels: 2,
            master: MasterConfig::default(),
            makeup: VoiceMakeup::default(),
            seed: 0x5eed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn makeup_defaults() {
        let m = VoiceMakeup::default();
        assert_eq!(m.for_kind(GeneratorKind::Snare), 1.25);
        assert_eq!(m.for_kind(GeneratorKind::Clap), 1.2);
        assert_eq!(m.for_kind(GeneratorKind::HiHat), 1.1);
        assert_eq!(m.for_kind(GeneratorKind::Kick), 1.0);
    }

    #[test]
    fn export_defaults() {
        let e = ExportConfig::default();
        assert_eq!((e.bars, e.sample_rate, e.channels), (4, 44100, 2));
    }
}
