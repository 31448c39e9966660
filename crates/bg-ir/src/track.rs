//! Sequencer tracks.

use alloc::vec;
use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::effect::Effect;
use crate::params::clamp;
use crate::presets::find_preset;
use crate::voice::{GeneratorKind, VoiceParams};

/// Stable identity of a track within an arrangement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub u32);

/// Fixed-capacity display name.
pub type TrackName = ArrayString<32>;

/// Maximum track volume (linear gain).
pub const MAX_TRACK_VOLUME: f64 = 2.0;

/// One row of the step grid plus its generator and mixer settings.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub name: TrackName,
    /// Generator parameters; the variant selects the voice builder.
    pub voice: VoiceParams,
    /// Name of the preset last applied, if any.
    pub preset: Option<&'static str>,
    /// One flag per grid step.
    pub steps: Vec<bool>,
    pub muted: bool,
    pub solo: bool,
    /// Linear gain (0..=2)
    pub volume: f64,
    /// Stereo position (-1 = left, 1 = right)
    pub pan: f64,
    /// Insert effects, in processing order.
    pub effects: Vec<Effect>,
}

impl Track {
    /// Create a track with the default voice for `kind` and an empty grid.
    pub fn new(id: TrackId, name: &str, kind: GeneratorKind, step_count: usize) -> Self {
        let mut track_name = TrackName::new();
        for ch in name.chars() {
            if track_name.try_push(ch).is_err() {
                break;
            }
        }
        Self {
            id,
            name: track_name,
            voice: kind.default_params(),
            preset: None,
            steps: vec![false; step_count],
            muted: false,
            solo: false,
            volume: 1.0,
            pan: 0.0,
            effects: Vec::new(),
        }
    }

    pub fn kind(&self) -> GeneratorKind {
        self.voice.kind()
    }

    /// Switch generator. The voice record is replaced with the new kind's
    /// defaults; grid, mixer settings and effects are kept.
    pub fn set_kind(&mut self, kind: GeneratorKind) {
        if self.kind() == kind {
            return;
        }
        self.voice = kind.default_params();
        self.preset = None;
    }

    /// Replace the voice record with a named preset. Returns false when the
    /// current generator has no preset by that name.
    pub fn apply_preset(&mut self, name: &str) -> bool {
        let Some(params) = find_preset(self.kind(), name) else {
            return false;
        };
        self.preset = crate::presets::preset_names(self.kind()).find(|n| *n == name);
        self.voice = params;
        true
    }

    /// Flip one step. Returns the new state, or `None` if out of range.
    pub fn toggle_step(&mut self, index: usize) -> Option<bool> {
        let step = self.steps.get_mut(index)?;
        *step = !*step;
        Some(*step)
    }

    /// True if the grid marks `index` active.
    #[inline]
    pub fn is_active(&self, index: usize) -> bool {
        self.steps.get(index).copied().unwrap_or(false)
    }

    /// Truncate or pad the grid to `step_count` steps.
    pub fn resize(&mut self, step_count: usize) {
        self.steps.resize(step_count, false);
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.volume = clamp(volume, 0.0, MAX_TRACK_VOLUME);
    }

    pub fn set_pan(&mut self, pan: f64) {
        self.pan = clamp(pan, -1.0, 1.0);
    }
}
