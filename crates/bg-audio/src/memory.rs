//! Device-free output for headless sessions and tests.

use bg_engine::Frame;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::traits::{AudioError, AudioOutput};

/// Frames captured by a [`MemoryOutput`].
pub type Captured = Arc<Mutex<Vec<Frame>>>;

/// Records written frames and sleeps for their duration, so the render
/// loop runs at roughly device speed.
pub struct MemoryOutput {
    sample_rate: u32,
    captured: Captured,
    limit: usize,
    running: bool,
}

impl MemoryOutput {
    /// Keeps at most `seconds` of audio; later frames are paced but dropped.
    pub fn new(sample_rate: u32, seconds: u32) -> (Self, Captured) {
        let captured: Captured = Arc::default();
        let output = Self {
            sample_rate: sample_rate.max(1),
            captured: captured.clone(),
            limit: sample_rate as usize * seconds as usize,
            running: false,
        };
        (output, captured)
    }
}

impl AudioOutput for MemoryOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn write(&mut self, frames: &[Frame]) -> Result<(), AudioError> {
        if !self.running {
            return Ok(());
        }
        {
            let mut captured = self
                .captured
                .lock()
                .map_err(|_| AudioError::Playback("capture buffer poisoned".into()))?;
            let room = self.limit.saturating_sub(captured.len());
            captured.extend_from_slice(&frames[..frames.len().min(room)]);
        }
        let seconds = frames.len() as f64 / self.sample_rate as f64;
        std::thread::sleep(Duration::from_secs_f64(seconds));
        Ok(())
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_only_while_running() {
        let (mut out, captured) = MemoryOutput::new(48000, 1);
        out.write(&[Frame::mono(0.5); 4]).unwrap();
        assert!(captured.lock().unwrap().is_empty());

        out.start().unwrap();
        out.write(&[Frame::mono(0.5); 4]).unwrap();
        out.stop().unwrap();
        out.write(&[Frame::mono(0.5); 4]).unwrap();
        assert_eq!(captured.lock().unwrap().len(), 4);
    }

    #[test]
    fn capture_is_bounded() {
        let (mut out, captured) = MemoryOutput::new(100, 1);
        out.start().unwrap();
        out.write(&[Frame::silence(); 64]).unwrap();
        out.write(&[Frame::silence(); 64]).unwrap();
        assert_eq!(captured.lock().unwrap().len(), 100);
    }

    #[test]
    fn errors_display() {
        assert_eq!(AudioError::NoDevice.to_string(), "No audio device available");
        assert_eq!(
            AudioError::StreamCreate("busy".into()).to_string(),
            "Stream create error: busy"
        );
    }
}
