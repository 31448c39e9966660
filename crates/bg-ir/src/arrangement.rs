//! The whole editable session: tempo, grid size, tracks and master settings.

use alloc::format;
use alloc::vec::Vec;

use crate::params::clamp;
use crate::timing::step_duration;
use crate::track::{Track, TrackId};
use crate::voice::GeneratorKind;

pub const DEFAULT_BPM: f64 = 120.0;
pub const DEFAULT_STEP_COUNT: usize = 16;
pub const MAX_STEP_COUNT: usize = 64;
pub const DEFAULT_MASTER_VOLUME: f64 = 0.9;

/// Tempo bounds. Out-of-range input is clamped; non-finite input falls back
/// to [`DEFAULT_BPM`].
pub const MIN_BPM: f64 = 20.0;
pub const MAX_BPM: f64 = 400.0;

/// Tracks, tempo and grid size.
///
/// Every track's grid is kept at exactly `step_count` steps.
#[derive(Clone, Debug, PartialEq)]
pub struct Arrangement {
    bpm: f64,
    step_count: usize,
    pub tracks: Vec<Track>,
    /// Master input gain (0..=1.5)
    master_volume: f64,
    pub metronome: bool,
    next_id: u32,
}

impl Default for Arrangement {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            step_count: DEFAULT_STEP_COUNT,
            tracks: Vec::new(),
            master_volume: DEFAULT_MASTER_VOLUME,
            metronome: false,
            next_id: 1,
        }
    }
}

impl Arrangement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = if bpm.is_finite() && bpm > 0.0 {
            clamp(bpm, MIN_BPM, MAX_BPM)
        } else {
            DEFAULT_BPM
        };
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Resize the grid. Every track is truncated or padded in lockstep.
    /// Zero falls back to [`DEFAULT_STEP_COUNT`].
    pub fn set_step_count(&mut self, count: usize) {
        let count = if count == 0 {
            DEFAULT_STEP_COUNT
        } else {
            count.min(MAX_STEP_COUNT)
        };
        self.step_count = count;
        for track in &mut self.tracks {
            track.resize(count);
        }
    }

    /// Seconds per grid step at the current tempo.
    pub fn step_duration(&self) -> f64 {
        step_duration(self.bpm, self.step_count)
    }

    pub fn master_volume(&self) -> f64 {
        self.master_volume
    }

    pub fn set_master_volume(&mut self, volume: f64) {
        self.master_volume = clamp(volume, 0.0, 1.5);
    }

    /// Append a track with the default voice for `kind`.
    ///
    /// Without a name the track is called after its generator and the
    /// number of tracks of that kind, e.g. "Snare Generator 2".
    pub fn add_track(&mut self, kind: GeneratorKind, name: Option<&str>) -> TrackId {
        let id = TrackId(self.next_id);
        self.next_id += 1;
        let track = match name {
            Some(name) => Track::new(id, name, kind, self.step_count),
            None => {
                let n = self.tracks.iter().filter(|t| t.kind() == kind).count() + 1;
                let name = format!("{} {}", kind.label(), n);
                Track::new(id, &name, kind, self.step_count)
            }
        };
        self.tracks.push(track);
        id
    }

    /// Remove a track, returning it.
    pub fn remove_track(&mut self, id: TrackId) -> Option<Track> {
        let index = self.tracks.iter().position(|t| t.id == id)?;
        Some(self.tracks.remove(index))
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    pub fn toggle_step(&mut self, id: TrackId, index: usize) -> Option<bool> {
        self.track_mut(id)?.toggle_step(index)
    }

    /// True if any track has its solo flag set.
    pub fn any_solo(&self) -> bool {
        self.tracks.iter().any(|t| t.solo)
    }

    /// Whether `track` should sound right now: not muted, and either no
    /// track is soloed or this one is.
    pub fn is_audible(&self, track: &Track) -> bool {
        !(track.muted || (self.any_solo() && !track.solo))
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let arr = Arrangement::new();
        assert_eq!(arr.bpm(), 120.0);
        assert_eq!(arr.step_count(), 16);
        assert_eq!(arr.master_volume(), 0.9);
        assert!(arr.is_empty());
        assert_eq!(arr.step_duration(), 0.125);
    }

    #[test]
    fn invalid_bpm_falls_back() {
        let mut arr = Arrangement::new();
        arr.set_bpm(f64::NAN);
        assert_eq!(arr.bpm(), DEFAULT_BPM);
        arr.set_bpm(-10.0);
        assert_eq!(arr.bpm(), DEFAULT_BPM);
        arr.set_bpm(1000.0);
        assert_eq!(arr.bpm(), MAX_BPM);
    }

    #[test]
    fn step_count_resizes_every_track() {
        let mut arr = Arrangement::new();
        let a = arr.add_track(GeneratorKind::Kick, None);
        let b = arr.add_track(GeneratorKind::Snare, None);
        arr.toggle_step(a, 15);
        arr.set_step_count(8);
        assert!(arr.tracks.iter().all(|t| t.steps.len() == 8));
        arr.set_step_count(32);
        assert!(arr.tracks.iter().all(|t| t.steps.len() == 32));
        // Truncated steps come back empty.
        assert!(!arr.track(a).unwrap().is_active(15));
        assert!(!arr.track(b).unwrap().is_active(31));
        arr.set_step_count(0);
        assert_eq!(arr.step_count(), DEFAULT_STEP_COUNT);
        arr.set_step_count(1000);
        assert_eq!(arr.step_count(), MAX_STEP_COUNT);
    }

    #[test]
    fn new_tracks_match_current_grid() {
        let mut arr = Arrangement::new();
        arr.set_step_count(12);
        let id = arr.add_track(GeneratorKind::Tone, None);
        assert_eq!(arr.track(id).unwrap().steps.len(), 12);
    }

    #[test]
    fn default_names_count_per_kind() {
        let mut arr = Arrangement::new();
        arr.add_track(GeneratorKind::Snare, None);
        arr.add_track(GeneratorKind::Kick, None);
        let id = arr.add_track(GeneratorKind::Snare, None);
        assert_eq!(arr.track(id).unwrap().name.as_str(), "Snare Generator 2");
    }

    #[test]
    fn ids_are_not_reused() {
        let mut arr = Arrangement::new();
        let a = arr.add_track(GeneratorKind::Kick, Some("A"));
        arr.remove_track(a);
        let b = arr.add_track(GeneratorKind::Kick, Some("B"));
        assert_ne!(a, b);
        assert!(arr.remove_track(a).is_none());
    }

    #[test]
    fn solo_silences_others() {
        let mut arr = Arrangement::new();
        let a = arr.add_track(GeneratorKind::Kick, None);
        let b = arr.add_track(GeneratorKind::Snare, None);
        arr.track_mut(b).unwrap().solo = true;
        assert!(!arr.is_audible(arr.track(a).unwrap()));
        assert!(arr.is_audible(arr.track(b).unwrap()));
        arr.track_mut(b).unwrap().muted = true;
        assert!(!arr.is_audible(arr.track(b).unwrap()));
    }
}
