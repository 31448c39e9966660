//! Named, immutable parameter templates.

use crate::params::{NoiseColor, Waveform};
use crate::voice::{GeneratorKind, HiHatParams, NoisePadParams, SnareParams, VoiceParams};

/// A named parameter record.
#[derive(Clone, Copy, Debug)]
pub struct Preset<P: 'static> {
    pub name: &'static str,
    pub params: P,
}

const fn snare(name: &'static str, params: SnareParams) -> Preset<SnareParams> {
    Preset { name, params }
}

const fn hat(name: &'static str, params: HiHatParams) -> Preset<HiHatParams> {
    Preset { name, params }
}

const fn pad(name: &'static str, params: NoisePadParams) -> Preset<NoisePadParams> {
    Preset { name, params }
}

const S: SnareParams = SnareParams::DEFAULT;
const H: HiHatParams = HiHatParams::DEFAULT;
const P: NoisePadParams = NoisePadParams::DEFAULT;

pub static SNARE_PRESETS: &[Preset<SnareParams>] = &[
    snare("Tight Snare", SnareParams {
        tone_frequency: 210.0, tone_sweep: 7.0, tone_decay: 0.18, tone_level: 0.7,
        noise_decay: 0.22, noise_level: 0.95, release: 0.12, body_freq: 1900.0,
        body_resonance: 3.5, hp_freq: 160.0, lp_freq: 8500.0, saturation: 0.12,
        comp_threshold: -16.0, snap_level: 0.12, level: 0.9, ..S
    }),
    snare("Vintage Snare", SnareParams {
        tone_frequency: 180.0, tone_sweep: 9.0, tone_decay: 0.22, tone_level: 0.6,
        tone_waveform: Waveform::Sine, noise_decay: 0.28, noise_level: 0.85,
        noise_color: NoiseColor::Pink, release: 0.16, body_freq: 1600.0, body_resonance: 2.8,
        hp_freq: 140.0, lp_freq: 7000.0, saturation: 0.18, comp_threshold: -18.0,
        snap_level: 0.08, level: 0.95, ..S
    }),
    snare("Crack Snare", SnareParams {
        tone_frequency: 240.0, tone_sweep: 6.0, tone_decay: 0.14, tone_level: 0.75,
        noise_decay: 0.2, noise_level: 1.05, attack: 0.0008, release: 0.1, body_freq: 2300.0,
        body_resonance: 4.5, hp_freq: 220.0, lp_freq: 10000.0, saturation: 0.1,
        comp_threshold: -14.0, snap_level: 0.16, level: 1.0, ..S
    }),
    snare("Trap Snare", SnareParams {
        tone_frequency: 260.0, tone_sweep: 12.0, tone_decay: 0.3, tone_level: 0.6,
        noise_decay: 0.32, noise_level: 1.1, release: 0.2, body_freq: 2600.0,
        body_resonance: 5.5, hp_freq: 200.0, lp_freq: 12000.0, saturation: 0.22,
        comp_threshold: -12.0, snap_level: 0.2, level: 1.1, ..S
    }),
    snare("Lo-Fi Snare", SnareParams {
        tone_frequency: 165.0, tone_sweep: 4.0, tone_decay: 0.25, tone_level: 0.55,
        tone_waveform: Waveform::Sine, noise_decay: 0.35, noise_level: 0.8,
        noise_color: NoiseColor::Brown, attack: 0.0015, release: 0.18, body_freq: 1500.0,
        body_resonance: 2.1, hp_freq: 130.0, lp_freq: 6000.0, saturation: 0.28,
        comp_threshold: -20.0, snap_level: 0.05, level: 0.85, ..S
    }),
    snare("808 Snare", SnareParams {
        tone_decay: 0.24, noise_decay: 0.3, release: 0.16, hp_freq: 150.0, lp_freq: 9000.0,
        comp_threshold: -15.0, snap_level: 0.14, ..S
    }),
    snare("Rim Snare", SnareParams {
        tone_frequency: 320.0, tone_sweep: 3.0, tone_decay: 0.12, tone_level: 0.5,
        tone_waveform: Waveform::Sine, noise_decay: 0.18, noise_level: 0.6, release: 0.1,
        body_freq: 3400.0, body_resonance: 1.9, hp_freq: 260.0, lp_freq: 9500.0,
        saturation: 0.12, comp_threshold: -18.0, snap_level: 0.2, level: 0.85, ..S
    }),
    snare("Crunch Snare", SnareParams {
        tone_frequency: 190.0, tone_sweep: 5.0, tone_level: 0.65, noise_decay: 0.24,
        noise_level: 1.15, attack: 0.0008, release: 0.12, body_resonance: 4.1,
        lp_freq: 10000.0, saturation: 0.24, comp_threshold: -13.0, snap_level: 0.18,
        level: 1.05, ..S
    }),
    snare("Brush Snare", SnareParams {
        tone_frequency: 150.0, tone_sweep: 2.0, tone_decay: 0.3, tone_level: 0.4,
        tone_waveform: Waveform::Sine, noise_decay: 0.38, noise_level: 0.7,
        noise_color: NoiseColor::Pink, release: 0.22, body_freq: 1400.0, body_resonance: 1.5,
        hp_freq: 120.0, lp_freq: 6500.0, saturation: 0.08, comp_threshold: -22.0,
        snap_level: 0.04, level: 0.8, ..S
    }),
    snare("Huge Snare", SnareParams {
        tone_frequency: 230.0, tone_sweep: 12.0, tone_decay: 0.32, tone_level: 0.75,
        noise_decay: 0.42, noise_level: 1.2, release: 0.24, body_freq: 2400.0,
        body_resonance: 5.0, lp_freq: 11500.0, saturation: 0.2, comp_threshold: -12.0,
        snap_level: 0.22, level: 1.15, ..S
    }),
];

pub static HIHAT_PRESETS: &[Preset<HiHatParams>] = &[
    hat("Closed Hat", HiHatParams {
        decay: 0.08, release: 0.06, noise_level: 0.9, noise_decay: 0.07, metal_level: 0.7,
        metal_decay: 0.06, bp_freq: 8000.0, saturation: 0.08, comp_threshold: -18.0,
        level: 0.85, ..H
    }),
    hat("Open Hat", HiHatParams {
        attack: 0.001, decay: 0.25, release: 0.22, noise_level: 1.0, noise_decay: 0.24,
        metal_level: 0.85, metal_decay: 0.22, metal_freq: 7600.0, metal_spread: 1.4,
        hp_freq: 2500.0, bp_freq: 7500.0, bp_resonance: 5.0, lp_freq: 14000.0,
        comp_threshold: -16.0, level: 0.95, ..H
    }),
    hat("Trap Hat", HiHatParams {
        attack: 0.0006, decay: 0.06, release: 0.05, noise_level: 1.1, noise_decay: 0.05,
        metal_level: 0.5, metal_decay: 0.04, metal_freq: 9000.0, metal_spread: 1.65,
        hp_freq: 3200.0, bp_freq: 8800.0, bp_resonance: 7.0, lp_freq: 16000.0,
        saturation: 0.16, comp_threshold: -14.0, ..H
    }),
    hat("Analog Hat", HiHatParams {
        attack: 0.001, decay: 0.12, noise_color: NoiseColor::Pink, noise_level: 0.85,
        noise_decay: 0.1, metal_level: 0.75, metal_decay: 0.09, metal_freq: 7200.0,
        metal_spread: 1.45, hp_freq: 2600.0, bp_freq: 7200.0, bp_resonance: 5.5,
        lp_freq: 13000.0, saturation: 0.18, comp_threshold: -18.0, level: 0.88, ..H
    }),
    hat("Lo-Fi Hat", HiHatParams {
        attack: 0.0015, decay: 0.15, release: 0.12, noise_color: NoiseColor::Pink,
        noise_level: 0.7, noise_decay: 0.12, metal_level: 0.4, metal_decay: 0.1,
        metal_freq: 6400.0, metal_spread: 1.3, hp_freq: 2200.0, bp_freq: 6400.0,
        bp_resonance: 4.0, lp_freq: 10000.0, saturation: 0.22, comp_threshold: -20.0,
        level: 0.8, ..H
    }),
    hat("Bright Hat", HiHatParams {
        decay: 0.11, release: 0.09, noise_level: 1.05, metal_level: 0.85, metal_freq: 8800.0,
        metal_spread: 1.55, bp_freq: 8200.0, bp_resonance: 6.5, lp_freq: 17000.0,
        comp_threshold: -15.0, level: 0.95, ..H
    }),
    hat("808 Hat", HiHatParams {
        attack: 0.0007, decay: 0.09, release: 0.07, noise_decay: 0.08, metal_level: 0.7,
        metal_decay: 0.07, metal_freq: 7800.0, metal_spread: 1.48, hp_freq: 3200.0,
        saturation: 0.14, ..H
    }),
    hat("909 Hat", HiHatParams {
        attack: 0.001, decay: 0.14, release: 0.1, noise_level: 1.0, noise_decay: 0.12,
        metal_level: 0.9, metal_decay: 0.11, metal_freq: 8400.0, metal_spread: 1.52,
        hp_freq: 3100.0, bp_freq: 8400.0, bp_resonance: 6.2, lp_freq: 15500.0,
        saturation: 0.18, comp_threshold: -16.0, level: 0.98, ..H
    }),
    hat("Shimmer Hat", HiHatParams {
        attack: 0.0012, decay: 0.2, release: 0.18, noise_level: 0.8, noise_decay: 0.18,
        metal_level: 0.95, metal_decay: 0.17, metal_freq: 8900.0, metal_spread: 1.3,
        hp_freq: 2600.0, bp_freq: 9000.0, bp_resonance: 4.5, lp_freq: 17000.0,
        saturation: 0.1, comp_threshold: -18.0, level: 0.92, ..H
    }),
    hat("Chopped Hat", HiHatParams {
        attack: 0.0005, decay: 0.05, release: 0.04, noise_level: 1.1, noise_decay: 0.045,
        metal_level: 0.55, metal_decay: 0.04, metal_freq: 9200.0, metal_spread: 1.7,
        hp_freq: 3500.0, bp_freq: 9000.0, bp_resonance: 7.0, lp_freq: 18000.0,
        saturation: 0.2, comp_threshold: -14.0, level: 0.88, ..H
    }),
];

pub static NOISE_PAD_PRESETS: &[Preset<NoisePadParams>] = &[
    pad("Pure White", NoisePadParams {
        attack: 0.01, decay: 0.2, sustain: 0.7, hold: 0.5, release: 0.3, hp_q: 0.7,
        lp_q: 0.9, band_q: 1.4, saturation: 0.05, comp_threshold: -28.0, ..P
    }),
    pad("Air Wash", NoisePadParams {
        level: 0.9, hold: 1.2, release: 0.6, hp_freq: 1200.0, hp_q: 0.9, lp_freq: 19000.0,
        lp_q: 0.8, band_freq: 9000.0, band_gain: 4.0, band_q: 1.2, ..P
    }),
    pad("Dark Rumble", NoisePadParams {
        level: 0.75, attack: 0.03, decay: 0.3, sustain: 0.6, hold: 1.5, release: 0.7,
        noise_color: NoiseColor::Brown, hp_freq: 40.0, hp_q: 0.7, lp_freq: 4000.0, lp_q: 1.5,
        band_freq: 220.0, band_gain: 6.0, band_q: 3.5, saturation: 0.12,
        comp_threshold: -20.0, ..P
    }),
    pad("Pink Pad", NoisePadParams {
        level: 0.85, attack: 0.05, decay: 0.4, sustain: 0.9, hold: 2.0, release: 1.1,
        noise_color: NoiseColor::Pink, hp_freq: 150.0, lp_freq: 14000.0, band_freq: 2500.0,
        band_gain: 3.0, band_q: 1.8, saturation: 0.1, comp_threshold: -26.0, ..P
    }),
    pad("Perc Burst", NoisePadParams {
        level: 0.9, attack: 0.005, decay: 0.08, sustain: 0.2, hold: 0.08, release: 0.12,
        hp_freq: 800.0, hp_q: 1.5, lp_freq: 11000.0, lp_q: 0.9, band_freq: 6000.0,
        band_gain: 5.0, band_q: 2.8, saturation: 0.2, comp_threshold: -18.0, ..P
    }),
    pad("Lo-Fi Static", NoisePadParams {
        level: 0.7, attack: 0.015, decay: 0.18, sustain: 0.5, hold: 0.6, release: 0.25,
        noise_color: NoiseColor::Pink, hp_freq: 300.0, hp_q: 0.7, lp_freq: 8000.0, lp_q: 1.6,
        band_freq: 3200.0, band_gain: -3.0, band_q: 2.0, saturation: 0.18,
        comp_threshold: -30.0, ..P
    }),
];

/// Preset names available for a generator, in display order.
pub fn preset_names(kind: GeneratorKind) -> impl Iterator<Item = &'static str> {
    let (snares, hats, pads): (&[_], &[_], &[_]) = match kind {
        GeneratorKind::Snare => (SNARE_PRESETS, &[], &[]),
        GeneratorKind::HiHat => (&[], HIHAT_PRESETS, &[]),
        GeneratorKind::NoisePad => (&[], &[], NOISE_PAD_PRESETS),
        _ => (&[], &[], &[]),
    };
    snares
        .iter()
        .map(|p| p.name)
        .chain(hats.iter().map(|p| p.name))
        .chain(pads.iter().map(|p| p.name))
}

/// Look up a preset by generator and name.
pub fn find_preset(kind: GeneratorKind, name: &str) -> Option<VoiceParams> {
    match kind {
        GeneratorKind::Snare => SNARE_PRESETS
            .iter()
            .find(|p| p.name == name)
            .map(|p| VoiceParams::Snare(p.params)),
        GeneratorKind::HiHat => HIHAT_PRESETS
            .iter()
            .find(|p| p.name == name)
            .map(|p| VoiceParams::HiHat(p.params)),
        GeneratorKind::NoisePad => NOISE_PAD_PRESETS
            .iter()
            .find(|p| p.name == name)
            .map(|p| VoiceParams::NoisePad(p.params)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn every_library_has_ten_or_more_entries() {
        assert_eq!(SNARE_PRESETS.len(), 10);
        assert_eq!(HIHAT_PRESETS.len(), 10);
        assert_eq!(NOISE_PAD_PRESETS.len(), 6);
    }

    #[test]
    fn lookup_by_name() {
        let Some(VoiceParams::Snare(p)) = find_preset(GeneratorKind::Snare, "Lo-Fi Snare") else {
            panic!("missing preset");
        };
        assert_eq!(p.noise_color, NoiseColor::Brown);
        assert_eq!(p.tone_frequency, 165.0);
        // Fields the preset leaves alone keep the generator defaults.
        assert_eq!(p.sustain, 0.0);
    }

    #[test]
    fn unknown_name_or_kind() {
        assert!(find_preset(GeneratorKind::HiHat, "Nope").is_none());
        assert!(find_preset(GeneratorKind::Tone, "Tight Snare").is_none());
    }

    #[test]
    fn names_are_unique_per_kind() {
        for kind in [GeneratorKind::Snare, GeneratorKind::HiHat, GeneratorKind::NoisePad] {
            let mut names: Vec<_> = preset_names(kind).collect();
            let before = names.len();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), before);
        }
    }

    #[test]
    fn tone_has_no_presets() {
        assert_eq!(preset_names(GeneratorKind::Tone).count(), 0);
    }
}
