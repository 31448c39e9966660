//! Edit commands for mutating an arrangement during playback.
//!
//! The controller applies each edit to its own copy and sends the same
//! value to the audio thread, so both copies stay identical (track ids
//! included, since they are handed out in order).

use arrayvec::ArrayString;

use crate::arrangement::Arrangement;
use crate::effect::Effect;
use crate::track::{TrackId, TrackName};
use crate::voice::{GeneratorKind, VoiceParams};

/// Fixed-capacity preset name.
pub type PresetName = ArrayString<32>;

/// An edit command that mutates arrangement data.
#[derive(Clone, Debug, PartialEq)]
pub enum Edit {
    /// Append a track with the default voice for `kind`.
    AddTrack {
        kind: GeneratorKind,
        name: Option<TrackName>,
    },
    RemoveTrack(TrackId),
    /// Switch generator; grid, mixer settings and effects are kept.
    SetKind(TrackId, GeneratorKind),
    /// Replace the voice record. Ignored if it is for another generator.
    SetVoice(TrackId, VoiceParams),
    ApplyPreset(TrackId, PresetName),
    SetStep {
        track: TrackId,
        index: usize,
        active: bool,
    },
    ToggleStep {
        track: TrackId,
        index: usize,
    },
    SetMute(TrackId, bool),
    SetSolo(TrackId, bool),
    SetVolume(TrackId, f64),
    SetPan(TrackId, f64),
    AddEffect(TrackId, Effect),
    RemoveEffect(TrackId, usize),
    /// Replace the effect in a slot.
    SetEffect(TrackId, usize, Effect),
    SetBpm(f64),
    SetStepCount(usize),
    SetMasterVolume(f64),
    SetMetronome(bool),
}

impl Edit {
    /// The existing track this edit touches, if any.
    pub fn track(&self) -> Option<TrackId> {
        match *self {
            Edit::RemoveTrack(id)
            | Edit::SetKind(id, _)
            | Edit::SetVoice(id, _)
            | Edit::ApplyPreset(id, _)
            | Edit::SetStep { track: id, .. }
            | Edit::ToggleStep { track: id, .. }
            | Edit::SetMute(id, _)
            | Edit::SetSolo(id, _)
            | Edit::SetVolume(id, _)
            | Edit::SetPan(id, _)
            | Edit::AddEffect(id, _)
            | Edit::RemoveEffect(id, _)
            | Edit::SetEffect(id, _, _) => Some(id),
            Edit::AddTrack { .. }
            | Edit::SetBpm(_)
            | Edit::SetStepCount(_)
            | Edit::SetMasterVolume(_)
            | Edit::SetMetronome(_) => None,
        }
    }

    /// Apply to `arrangement`.
    ///
    /// Returns false, leaving the arrangement untouched, when the edit
    /// names a track, step, effect slot or preset that does not exist.
    /// Out-of-range values are clamped, not refused.
    pub fn apply(&self, arrangement: &mut Arrangement) -> bool {
        match self {
            Edit::AddTrack { kind, name } => {
                arrangement.add_track(*kind, name.as_ref().map(|n| n.as_str()));
                true
            }
            Edit::RemoveTrack(id) => arrangement.remove_track(*id).is_some(),
            Edit::SetBpm(bpm) => {
                arrangement.set_bpm(*bpm);
                true
            }
            Edit::SetStepCount(count) => {
                arrangement.set_step_count(*count);
                true
            }
            Edit::SetMasterVolume(volume) => {
                arrangement.set_master_volume(*volume);
                true
            }
            Edit::SetMetronome(on) => {
                arrangement.metronome = *on;
                true
            }
            _ => {
                let Some(track) = self.track().and_then(|id| arrangement.track_mut(id)) else {
                    return false;
                };
                match self {
                    Edit::SetKind(_, kind) => track.set_kind(*kind),
                    Edit::SetVoice(_, voice) => {
                        if voice.kind() != track.kind() {
                            return false;
                        }
                        track.voice = voice.clone();
                        track.preset = None;
                    }
                    Edit::ApplyPreset(_, name) => return track.apply_preset(name),
                    Edit::SetStep { index, active, .. } => match track.steps.get_mut(*index) {
                        Some(step) => *step = *active,
                        None => return false,
                    },
                    Edit::ToggleStep { index, .. } => return track.toggle_step(*index).is_some(),
                    Edit::SetMute(_, muted) => track.muted = *muted,
                    Edit::SetSolo(_, solo) => track.solo = *solo,
                    Edit::SetVolume(_, volume) => track.set_volume(*volume),
                    Edit::SetPan(_, pan) => track.set_pan(*pan),
                    Edit::AddEffect(_, effect) => track.effects.push(*effect),
                    Edit::RemoveEffect(_, slot) => {
                        if *slot >= track.effects.len() {
                            return false;
                        }
                        track.effects.remove(*slot);
                    }
                    Edit::SetEffect(_, slot, effect) => match track.effects.get_mut(*slot) {
                        Some(e) => *e = *effect,
                        None => return false,
                    },
                    _ => {}
                }
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::EffectKind;

    fn arrangement() -> (Arrangement, TrackId) {
        let mut arr = Arrangement::new();
        let id = arr.add_track(GeneratorKind::Snare, None);
        (arr, id)
    }

    #[test]
    fn track_edits_apply() {
        let (mut arr, id) = arrangement();
        assert!(Edit::SetStep { track: id, index: 4, active: true }.apply(&mut arr));
        assert!(Edit::ToggleStep { track: id, index: 0 }.apply(&mut arr));
        assert!(Edit::SetVolume(id, 5.0).apply(&mut arr));
        assert!(Edit::AddEffect(id, EffectKind::Delay.default_effect()).apply(&mut arr));
        let t = arr.track(id).unwrap();
        assert!(t.steps[0] && t.steps[4]);
        assert_eq!(t.volume, 2.0);
        assert_eq!(t.effects.len(), 1);
    }

    #[test]
    fn unknown_targets_are_refused() {
        let (mut arr, id) = arrangement();
        let before = arr.clone();
        assert!(!Edit::SetMute(TrackId(99), true).apply(&mut arr));
        assert!(!Edit::SetStep { track: id, index: 64, active: true }.apply(&mut arr));
        assert!(!Edit::RemoveEffect(id, 0).apply(&mut arr));
        assert!(!Edit::ApplyPreset(id, PresetName::from("No Such").unwrap()).apply(&mut arr));
        assert!(!Edit::SetVoice(id, GeneratorKind::Kick.default_params()).apply(&mut arr));
        assert_eq!(arr, before);
    }

    #[test]
    fn replayed_edits_keep_copies_identical() {
        let edits = [
            Edit::AddTrack { kind: GeneratorKind::Kick, name: None },
            Edit::AddTrack { kind: GeneratorKind::HiHat, name: TrackName::from("Hats").ok() },
            Edit::SetBpm(140.0),
            Edit::SetStepCount(32),
            Edit::RemoveTrack(TrackId(1)),
        ];
        let mut a = Arrangement::new();
        let mut b = Arrangement::new();
        for edit in &edits {
            assert!(edit.apply(&mut a));
            edit.apply(&mut b);
        }
        assert_eq!(a, b);
        assert_eq!(a.tracks.len(), 1);
        assert_eq!(a.tracks[0].name.as_str(), "Hats");
        assert_eq!(a.tracks[0].steps.len(), 32);
    }
}
