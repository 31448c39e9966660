//! Headless session controller for the beatgrid step sequencer.
//!
//! A [`Controller`] owns the arrangement every editor reads, mirrors each
//! edit to the audio thread, and renders mixdowns offline. The audio
//! thread is started on first use and keeps running until the controller
//! is dropped or [`Controller::close_output`] is called.

mod error;
mod playback;

use std::path::Path;
use std::sync::Arc;

use bg_audio::{AudioError, AudioOutput, CpalOutput};
use bg_ir::{SampleParams, TrackName};

use playback::{Command, Playback};

// Re-export common types so callers don't need bg-ir/bg-engine directly.
pub use bg_engine::graph::Meter;
pub use bg_engine::{EngineConfig, EngineError, ExportConfig, Frame, Playhead};
pub use bg_formats::FormatError;
pub use bg_ir::{
    Arrangement, AudioBuffer, Edit, Effect, EffectKind, GeneratorKind, Track, TrackId, VoiceParams,
};
pub use error::MasterError;

/// Headless step-sequencer controller: owns an arrangement and manages
/// playback.
pub struct Controller {
    config: EngineConfig,
    arrangement: Arrangement,
    playback: Option<Playback>,
}

impl Controller {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// `config.sample_rate` is replaced by the output's rate when playback
    /// starts.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            arrangement: Arrangement::new(),
            playback: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- Arrangement ---

    pub fn arrangement(&self) -> &Arrangement {
        &self.arrangement
    }

    /// Replace the arrangement wholesale.
    pub fn load_arrangement(&mut self, arrangement: Arrangement) {
        self.arrangement = arrangement.clone();
        self.send(Command::Load(Box::new(arrangement)));
    }

    /// Apply an edit here and on the audio thread. Returns false, and
    /// sends nothing, when the edit names a missing track or slot.
    pub fn apply(&mut self, edit: Edit) -> bool {
        if !edit.apply(&mut self.arrangement) {
            return false;
        }
        self.send(Command::Edit(edit));
        true
    }

    /// Append a track with the default voice for `kind`. Long names are
    /// truncated.
    pub fn add_track(&mut self, kind: GeneratorKind, name: Option<&str>) -> TrackId {
        let name = name.map(track_name);
        let id = self
            .arrangement
            .add_track(kind, name.as_ref().map(|n| n.as_str()));
        self.send(Command::Edit(Edit::AddTrack { kind, name }));
        id
    }

    pub fn remove_track(&mut self, id: TrackId) -> bool {
        self.apply(Edit::RemoveTrack(id))
    }

    pub fn toggle_step(&mut self, track: TrackId, index: usize) -> bool {
        self.apply(Edit::ToggleStep { track, index })
    }

    pub fn set_mute(&mut self, id: TrackId, muted: bool) -> bool {
        self.apply(Edit::SetMute(id, muted))
    }

    pub fn set_solo(&mut self, id: TrackId, solo: bool) -> bool {
        self.apply(Edit::SetSolo(id, solo))
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        self.apply(Edit::SetBpm(bpm));
    }

    pub fn set_master_volume(&mut self, volume: f64) {
        self.apply(Edit::SetMasterVolume(volume));
    }

    /// Decode a WAV file and make it the voice of `id`, switching the
    /// track to the sample generator if needed. Level and normalisation
    /// of an existing sample voice are kept.
    pub fn load_sample(&mut self, id: TrackId, path: impl AsRef<Path>) -> Result<(), MasterError> {
        let track = self.arrangement.track(id).ok_or(EngineError::UnknownTrack)?;
        let buffer = bg_formats::load_wav_file(path)?;
        log::debug!(
            "loaded sample: {} frames, {} channels at {} Hz",
            buffer.frames(),
            buffer.channels(),
            buffer.sample_rate()
        );
        let mut params = match &track.voice {
            VoiceParams::Sample(p) => p.clone(),
            _ => SampleParams::default(),
        };
        params.sample = Some(Arc::new(buffer));
        if track.kind() != GeneratorKind::Sample {
            self.apply(Edit::SetKind(id, GeneratorKind::Sample));
        }
        self.apply(Edit::SetVoice(id, VoiceParams::Sample(params)));
        Ok(())
    }

    // --- Real-time playback ---

    /// Open the default output device if it is not open yet.
    pub fn open_output(&mut self) -> Result<(), MasterError> {
        self.open_output_with(CpalOutput::open)
    }

    /// Start the audio thread on an output built by `open`, which runs on
    /// that thread. Does nothing if an output is already running.
    pub fn open_output_with<F, O>(&mut self, open: F) -> Result<(), MasterError>
    where
        F: FnOnce() -> Result<O, AudioError> + Send + 'static,
        O: AudioOutput,
    {
        if self.playback.as_ref().is_some_and(|p| p.is_alive()) {
            return Ok(());
        }
        // Drop (and join) a thread that died on an output error.
        self.playback = None;
        let playback = Playback::spawn(open, self.config, self.arrangement.clone())?;
        self.playback = Some(playback);
        Ok(())
    }

    pub fn is_output_open(&self) -> bool {
        self.playback.as_ref().is_some_and(|p| p.is_alive())
    }

    /// Stop the audio thread and release the device.
    pub fn close_output(&mut self) {
        if let Some(mut playback) = self.playback.take() {
            playback.shutdown();
        }
    }

    /// Start the transport on the default device. Fails when the device
    /// cannot be opened; nothing plays in that case.
    pub fn play(&mut self) -> Result<(), MasterError> {
        self.open_output()?;
        self.send_checked(Command::Play)
    }

    /// Start the transport on an already open output, or on one built by
    /// `open`.
    pub fn play_with<F, O>(&mut self, open: F) -> Result<(), MasterError>
    where
        F: FnOnce() -> Result<O, AudioError> + Send + 'static,
        O: AudioOutput,
    {
        self.open_output_with(open)?;
        self.send_checked(Command::Play)
    }

    /// Stop scheduling new steps. Sounding voices ring out.
    pub fn stop(&mut self) {
        self.send(Command::Stop);
    }

    pub fn is_playing(&self) -> bool {
        self.playback.as_ref().is_some_and(|p| p.is_playing())
    }

    /// Current step and elapsed time; stopped while no output is open.
    pub fn playhead(&self) -> Playhead {
        self.playback
            .as_ref()
            .map_or_else(Playhead::stopped, |p| p.playhead())
    }

    pub fn master_meter(&self) -> Meter {
        self.playback
            .as_ref()
            .map_or_else(Meter::default, |p| p.master_meter())
    }

    /// Play a track's voice now, outside the grid. Opens the default
    /// device if needed.
    pub fn preview(&mut self, id: TrackId) -> Result<(), MasterError> {
        if self.arrangement.track(id).is_none() {
            return Err(EngineError::UnknownTrack.into());
        }
        self.open_output()?;
        self.send_checked(Command::Preview(id))
    }

    fn send(&mut self, command: Command) {
        let Some(playback) = &self.playback else {
            return;
        };
        if let Err(e) = playback.send(command) {
            log::warn!("dropping playback: {}", e);
            self.playback = None;
        }
    }

    fn send_checked(&mut self, command: Command) -> Result<(), MasterError> {
        let playback = self.playback.as_ref().ok_or(AudioError::ThreadGone)?;
        if let Err(e) = playback.send(command) {
            self.playback = None;
            return Err(e.into());
        }
        Ok(())
    }

    // --- Offline rendering ---

    /// Render the arrangement offline.
    pub fn export(&self, config: &ExportConfig) -> Result<AudioBuffer, EngineError> {
        bg_engine::export(&self.arrangement, config)
    }

    /// Render the arrangement offline and encode it as 16-bit PCM WAV.
    pub fn export_wav(&self, config: &ExportConfig) -> Result<Vec<u8>, MasterError> {
        let buffer = self.export(config)?;
        Ok(bg_formats::buffer_to_wav(&buffer)?)
    }

    /// Render the arrangement offline and write it to `path`.
    pub fn save_wav(&self, path: impl AsRef<Path>, config: &ExportConfig) -> Result<(), MasterError> {
        let buffer = self.export(config)?;
        bg_formats::save_wav_file(path, &buffer)?;
        Ok(())
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

fn track_name(name: &str) -> TrackName {
    let mut out = TrackName::new();
    for c in name.chars() {
        if out.try_push(c).is_err() {
            break;
        }
    }
    out
}
