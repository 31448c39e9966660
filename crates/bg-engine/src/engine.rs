//! Live playback engine.
//!
//! Owned by the audio thread. Frames are pulled with
//! [`render_frame`](Engine::render_frame); every `tick_interval` of audio
//! clock the transport hands out the steps inside its look-ahead window and
//! the mixer builds their voices ahead of time.

use bg_ir::{Arrangement, Edit, TrackId, RENDER_QUANTUM};

use crate::config::{EngineConfig, MasterConfig};
use crate::error::EngineError;
use crate::frame::Frame;
use crate::graph::Meter;
use crate::mixer::Mixer;
use crate::transport::{Playhead, StepEvent, Transport};
use crate::voices::Scheduled;

/// Steps a single tick can hand out without growing its buffer.
const DUE_CAPACITY: usize = 64;

/// The live engine.
pub struct Engine {
    config: EngineConfig,
    arrangement: Arrangement,
    mixer: Mixer,
    transport: Transport,
    /// Steps handed out by the current tick
    due: Vec<StepEvent>,
    /// Clock time of the next scheduling tick
    next_tick: f64,
    /// Next frame to read from the last rendered quantum
    cursor: usize,
}

impl Engine {
    /// Create a stopped engine for `arrangement`.
    pub fn new(config: EngineConfig, arrangement: Arrangement) -> Result<Self, EngineError> {
        let master = MasterConfig {
            volume: arrangement.master_volume(),
            ..config.master
        };
        let mixer = Mixer::new(config.sample_rate, &master, config.makeup, config.metronome, config.seed)?;
        Ok(Self {
            transport: Transport::new(config.transport),
            config,
            arrangement,
            mixer,
            due: Vec::with_capacity(DUE_CAPACITY),
            next_tick: 0.0,
            cursor: RENDER_QUANTUM,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.mixer.context().sample_rate()
    }

    pub fn arrangement(&self) -> &Arrangement {
        &self.arrangement
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    /// Audio clock, seconds.
    pub fn current_time(&self) -> f64 {
        self.mixer.current_time()
    }

    // === Transport ===

    /// Start the transport. Step 0 sounds a short offset from now.
    pub fn play(&mut self) {
        let now = self.current_time();
        self.transport.start(now, self.arrangement.step_duration());
        self.next_tick = now;
    }

    /// Stop scheduling. Voices already built play out.
    pub fn stop(&mut self) {
        self.transport.stop();
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_running()
    }

    pub fn playhead(&self) -> Playhead {
        self.transport.playhead(self.current_time(), self.arrangement.step_count())
    }

    /// Run the scheduler against the current clock: return finished
    /// voices' units to the pool, then build the voices (and metronome
    /// clicks) of every step in the look-ahead window. Returns the number
    /// of voices built.
    pub fn tick(&mut self) -> usize {
        self.mixer.drain_releases();
        let now = self.current_time();
        let mut due = std::mem::take(&mut self.due);
        due.clear();
        self.transport.tick(
            now,
            self.arrangement.step_duration(),
            self.arrangement.step_count(),
            |event| due.push(event),
        );
        let mut voices = 0;
        for event in &due {
            // A step handed out late plays now, envelope and all.
            let when = event.time.max(now);
            voices += self.mixer.schedule_step(&self.arrangement, event.step, when);
            if self.arrangement.metronome {
                if let Err(e) = self.mixer.click(when, event.step == 0) {
                    log::warn!("metronome click at {:.3}s skipped: {}", when, e);
                }
            }
        }
        self.due = due;
        voices
    }

    // === Editing ===

    /// Apply `edit` to the arrangement and update the graph to match.
    /// Returns false when the edit named something that does not exist.
    pub fn apply(&mut self, edit: &Edit) -> bool {
        if !edit.apply(&mut self.arrangement) {
            log::debug!("ignored edit {:?}", edit);
            return false;
        }
        match edit {
            Edit::RemoveTrack(id) => {
                self.mixer.remove_bus(*id);
            }
            Edit::SetMasterVolume(_) => {
                if let Err(e) = self.mixer.set_master_volume(self.arrangement.master_volume()) {
                    log::warn!("master volume change failed: {}", e);
                }
            }
            _ => {
                if let Some(track) = edit.track().and_then(|id| self.arrangement.track(id)) {
                    if let Err(e) = self.mixer.sync_track(track) {
                        log::warn!("track {:?}: bus update failed: {}", track.id, e);
                    }
                }
            }
        }
        true
    }

    /// Replace the whole arrangement, keeping buses of tracks that remain.
    pub fn set_arrangement(&mut self, arrangement: Arrangement) {
        self.arrangement = arrangement;
        self.mixer.retain_buses(&self.arrangement);
        for track in &self.arrangement.tracks {
            if let Err(e) = self.mixer.sync_track(track) {
                log::warn!("track {:?}: bus update failed: {}", track.id, e);
            }
        }
        if let Err(e) = self.mixer.set_master_volume(self.arrangement.master_volume()) {
            log::warn!("master volume change failed: {}", e);
        }
    }

    /// Play a track's voice now, outside the grid. Mute and solo are
    /// ignored.
    pub fn preview(&mut self, id: TrackId) -> Result<Scheduled, EngineError> {
        let track = self.arrangement.track(id).ok_or(EngineError::UnknownTrack)?;
        let now = self.mixer.current_time();
        self.mixer.trigger(track, now, None)
    }

    // === Output ===

    /// Render one quantum, ticking the scheduler first when a tick is due.
    fn render_quantum(&mut self) {
        let now = self.current_time();
        if now >= self.next_tick {
            self.tick();
            self.next_tick = now + self.config.transport.tick_interval;
        }
        self.mixer.render_quantum();
        self.cursor = 0;
    }

    /// Generate one frame of audio.
    pub fn render_frame(&mut self) -> Frame {
        if self.cursor >= RENDER_QUANTUM {
            self.render_quantum();
        }
        let out = self.mixer.output();
        let frame = Frame {
            left: out.sample(0, self.cursor),
            right: out.sample(1, self.cursor),
        };
        self.cursor += 1;
        frame
    }

    /// Fill `out` with consecutive frames.
    pub fn render_into(&mut self, out: &mut [Frame]) {
        for frame in out {
            *frame = self.render_frame();
        }
    }

    /// Render `count` frames into a new vector.
    pub fn render_frames(&mut self, count: usize) -> Vec<Frame> {
        let mut frames = vec![Frame::silence(); count];
        self.render_into(&mut frames);
        frames
    }

    pub fn track_meter(&self, id: TrackId) -> Option<Meter> {
        self.mixer.track_meter(id)
    }

    pub fn master_meter(&self) -> Meter {
        self.mixer.master_meter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bg_ir::{EffectKind, GeneratorKind};

    fn engine_with(kind: GeneratorKind, steps: &[usize]) -> (Engine, TrackId) {
        let mut arr = Arrangement::new();
        let id = arr.add_track(kind, None);
        for &s in steps {
            arr.toggle_step(id, s);
        }
        (Engine::new(EngineConfig::default(), arr).unwrap(), id)
    }

    fn peak(frames: &[Frame]) -> f32 {
        frames.iter().map(|f| f.left.abs().max(f.right.abs())).fold(0.0, f32::max)
    }

    #[test]
    fn stopped_engine_is_silent() {
        let (mut engine, _) = engine_with(GeneratorKind::Kick, &[0]);
        let frames = engine.render_frames(4800);
        assert_eq!(peak(&frames), 0.0);
        assert_eq!(engine.playhead(), Playhead::stopped());
    }

    #[test]
    fn playing_renders_the_grid() {
        let (mut engine, id) = engine_with(GeneratorKind::Kick, &[0]);
        engine.play();
        let frames = engine.render_frames(24000);
        assert!(peak(&frames) > 0.01);
        assert!(engine.track_meter(id).is_some());
        assert!(engine.playhead().step.is_some());
    }

    #[test]
    fn stop_lets_voices_ring_out() {
        let (mut engine, _) = engine_with(GeneratorKind::NoisePad, &[0]);
        engine.play();
        engine.render_frames(4800 + 2400);
        engine.stop();
        let tail = engine.render_frames(2400);
        assert!(peak(&tail) > 0.0);
        assert!(!engine.is_playing());
    }

    #[test]
    fn preview_sounds_without_transport() {
        let (mut engine, id) = engine_with(GeneratorKind::Snare, &[]);
        let scheduled = engine.preview(id).unwrap();
        assert_eq!(scheduled.onsets.len(), 1);
        let frames = engine.render_frames(4800);
        assert!(peak(&frames) > 0.01);
        assert_eq!(engine.preview(TrackId(42)), Err(EngineError::UnknownTrack));
    }

    #[test]
    fn edits_reach_the_bus() {
        let (mut engine, id) = engine_with(GeneratorKind::Tone, &[0]);
        engine.preview(id).unwrap();
        assert!(engine.apply(&Edit::AddEffect(id, EffectKind::Reverb.default_effect())));
        assert!(engine.apply(&Edit::SetVolume(id, 0.5)));
        assert!(!engine.apply(&Edit::SetMute(TrackId(9), true)));
        assert!(engine.apply(&Edit::RemoveTrack(id)));
        assert!(!engine.mixer().has_bus(id));
    }

    #[test]
    fn metronome_clicks_without_tracks() {
        let mut engine = Engine::new(EngineConfig::default(), Arrangement::new()).unwrap();
        engine.apply(&Edit::SetMetronome(true));
        engine.play();
        let frames = engine.render_frames(9600);
        assert!(peak(&frames) > 0.001);
    }
}
