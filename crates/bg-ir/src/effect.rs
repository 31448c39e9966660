//! Per-track insert effect settings.
//!
//! An [`Effect`] holds only control values. The processing units that
//! realise it are created by the engine the first time the track's bus is
//! built and live until the effect or the track is removed.

/// Tag for each effect variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Gain,
    Delay,
    Reverb,
    Chorus,
    Flanger,
    Phaser,
    Distortion,
    Eq3,
}

impl EffectKind {
    pub const ALL: [EffectKind; 8] = [
        EffectKind::Gain,
        EffectKind::Delay,
        EffectKind::Reverb,
        EffectKind::Chorus,
        EffectKind::Flanger,
        EffectKind::Phaser,
        EffectKind::Distortion,
        EffectKind::Eq3,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EffectKind::Gain => "Gain",
            EffectKind::Delay => "Delay",
            EffectKind::Reverb => "Reverb",
            EffectKind::Chorus => "Chorus",
            EffectKind::Flanger => "Flanger",
            EffectKind::Phaser => "Phaser",
            EffectKind::Distortion => "Distortion",
            EffectKind::Eq3 => "3-Band EQ",
        }
    }

    /// Effect record with default settings for this kind.
    pub fn default_effect(self) -> Effect {
        match self {
            EffectKind::Gain => Effect::Gain { gain: 1.0 },
            EffectKind::Delay => Effect::Delay {
                time: 0.25,
                feedback: 0.35,
                mix: 0.3,
            },
            EffectKind::Reverb => Effect::Reverb {
                room_size: 0.7,
                damping: 0.4,
                mix: 0.25,
            },
            EffectKind::Chorus => Effect::Chorus {
                rate: 1.5,
                depth: 0.5,
                mix: 0.4,
            },
            EffectKind::Flanger => Effect::Flanger {
                rate: 0.25,
                depth: 0.6,
                feedback: 0.5,
                mix: 0.5,
            },
            EffectKind::Phaser => Effect::Phaser {
                rate: 0.5,
                depth: 0.7,
                mix: 0.5,
            },
            EffectKind::Distortion => Effect::Distortion {
                amount: 0.4,
                tone: 6000.0,
                output: 0.7,
            },
            EffectKind::Eq3 => Effect::Eq3 {
                low: 0.0,
                mid: 0.0,
                high: 0.0,
            },
        }
    }
}

/// Control values of one insert effect.
///
/// Mix amounts are wet fractions in `[0, 1]`, rates are LFO frequencies in
/// Hz, depths are fractions of the effect's modulation range and EQ gains
/// are in dB.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Effect {
    Gain { gain: f64 },
    Delay { time: f64, feedback: f64, mix: f64 },
    Reverb { room_size: f64, damping: f64, mix: f64 },
    Chorus { rate: f64, depth: f64, mix: f64 },
    Flanger { rate: f64, depth: f64, feedback: f64, mix: f64 },
    Phaser { rate: f64, depth: f64, mix: f64 },
    Distortion { amount: f64, tone: f64, output: f64 },
    Eq3 { low: f64, mid: f64, high: f64 },
}

impl Effect {
    pub fn kind(&self) -> EffectKind {
        match self {
            Effect::Gain { .. } => EffectKind::Gain,
            Effect::Delay { .. } => EffectKind::Delay,
            Effect::Reverb { .. } => EffectKind::Reverb,
            Effect::Chorus { .. } => EffectKind::Chorus,
            Effect::Flanger { .. } => EffectKind::Flanger,
            Effect::Phaser { .. } => EffectKind::Phaser,
            Effect::Distortion { .. } => EffectKind::Distortion,
            Effect::Eq3 { .. } => EffectKind::Eq3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_to_their_kind() {
        for kind in EffectKind::ALL {
            assert_eq!(kind.default_effect().kind(), kind);
        }
    }

    #[test]
    fn flat_eq_by_default() {
        assert_eq!(
            EffectKind::Eq3.default_effect(),
            Effect::Eq3 { low: 0.0, mid: 0.0, high: 0.0 }
        );
    }
}
