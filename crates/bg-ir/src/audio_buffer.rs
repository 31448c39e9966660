//! Multichannel f32 audio buffer with planar layout.

use alloc::vec;
use alloc::vec::Vec;

/// Maximum number of audio channels per buffer.
pub const MAX_CHANNELS: u16 = 8;

/// Frames processed per graph pass.
pub const RENDER_QUANTUM: usize = 128;

/// A multichannel f32 audio buffer in planar layout.
///
/// Data is stored as `channels` contiguous planes of `frames` samples each.
/// `data[ch * frames + frame]` gives the sample for channel `ch` at `frame`.
/// The buffer carries the sample rate it was produced at so that a
/// rendered mixdown can be handed to a serializer on its own.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    data: Vec<f32>,
    channels: u16,
    frames: usize,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Create a new silent buffer with the given dimensions.
    pub fn new(channels: u16, frames: usize, sample_rate: u32) -> Self {
        let channels = channels.clamp(1, MAX_CHANNELS);
        Self {
            data: vec![0.0; channels as usize * frames],
            channels,
            frames,
            sample_rate,
        }
    }

    /// Build a buffer from per-channel sample vectors.
    ///
    /// Shorter planes are zero-padded to the longest one.
    pub fn from_planes(planes: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        let frames = planes.iter().map(Vec::len).max().unwrap_or(0);
        let mut buf = Self::new(planes.len() as u16, frames, sample_rate);
        for (ch, plane) in planes.iter().enumerate().take(buf.channels as usize) {
            buf.channel_mut(ch as u16)[..plane.len()].copy_from_slice(plane);
        }
        buf
    }

    /// Fill all samples with zero.
    pub fn silence(&mut self) {
        self.data.fill(0.0);
    }

    /// Number of channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Sample rate the buffer was produced at.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }

    /// Read-only access to one channel's sample data.
    pub fn channel(&self, ch: u16) -> &[f32] {
        let start = ch as usize * self.frames;
        &self.data[start..start + self.frames]
    }

    /// Mutable access to one channel's sample data.
    pub fn channel_mut(&mut self, ch: u16) -> &mut [f32] {
        let start = ch as usize * self.frames;
        let len = self.frames;
        &mut self.data[start..start + len]
    }

    /// Sample at `frame` for channel `ch`, folding extra output channels
    /// onto the last available plane (mono buffers feed both sides).
    #[inline]
    pub fn sample(&self, ch: u16, frame: usize) -> f32 {
        let ch = ch.min(self.channels - 1);
        self.data[ch as usize * self.frames + frame]
    }

    /// Sum overlapping channels from `source` into this buffer.
    pub fn mix_from(&mut self, source: &AudioBuffer) {
        self.mix_from_scaled(source, 1.0);
    }

    /// Sum overlapping channels from `source` into this buffer with gain.
    ///
    /// A mono source is spread to every channel of the destination.
    pub fn mix_from_scaled(&mut self, source: &AudioBuffer, gain: f32) {
        let frs = self.frames.min(source.frames);
        for ch in 0..self.channels {
            if ch >= source.channels && source.channels != 1 {
                break;
            }
            let src_ch = ch.min(source.channels - 1);
            let src_start = src_ch as usize * source.frames;
            let dst_start = ch as usize * self.frames;
            for i in 0..frs {
                self.data[dst_start + i] += source.data[src_start + i] * gain;
            }
        }
    }

    /// Copy `source` into this buffer starting at `offset` frames.
    ///
    /// Frames that would land past the end are dropped.
    pub fn write_at(&mut self, offset: usize, source: &AudioBuffer) {
        if offset >= self.frames {
            return;
        }
        let frs = (self.frames - offset).min(source.frames);
        for ch in 0..self.channels.min(source.channels) {
            let dst = &mut self.channel_mut(ch)[offset..offset + frs];
            dst.copy_from_slice(&source.channel(ch)[..frs]);
        }
    }

    /// Scale all samples by `gain`.
    pub fn apply_gain(&mut self, gain: f32) {
        for s in &mut self.data {
            *s *= gain;
        }
    }

    /// Largest absolute sample value across all channels.
    pub fn peak(&self) -> f32 {
        self.data.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// RMS of one channel over at most `max_frames` leading frames.
    pub fn rms(&self, ch: u16, max_frames: usize) -> f32 {
        let n = self.frames.min(max_frames);
        if n == 0 {
            return 0.0;
        }
        // Accumulate in f64; long f32 sums drift.
        let sum: f64 = self.channel(ch)[..n].iter().map(|&s| s as f64 * s as f64).sum();
        libm::sqrt(sum / n as f64) as f32
    }

    /// True if every sample is exactly zero.
    pub fn is_silent(&self) -> bool {
        self.data.iter().all(|&s| s == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_silent() {
        let buf = AudioBuffer::new(2, 4, 44100);
        assert_eq!(buf.channels(), 2);
        assert_eq!(buf.frames(), 4);
        assert!(buf.is_silent());
    }

    #[test]
    fn duration_uses_sample_rate() {
        let buf = AudioBuffer::new(2, 88200, 44100);
        assert!((buf.duration() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn channel_mut_writes_correctly() {
        let mut buf = AudioBuffer::new(2, 2, 48000);
        buf.channel_mut(0)[0] = 1.0;
        buf.channel_mut(1)[1] = -0.5;
        assert_eq!(buf.channel(0), &[1.0, 0.0]);
        assert_eq!(buf.channel(1), &[0.0, -0.5]);
    }

    #[test]
    fn from_planes_pads_short_channels() {
        let buf = AudioBuffer::from_planes(vec![vec![1.0, 2.0, 3.0], vec![4.0]], 44100);
        assert_eq!(buf.frames(), 3);
        assert_eq!(buf.channel(1), &[4.0, 0.0, 0.0]);
    }

    #[test]
    fn mono_source_spreads_to_stereo() {
        let mut dst = AudioBuffer::new(2, 2, 44100);
        let mut src = AudioBuffer::new(1, 2, 44100);
        src.channel_mut(0)[0] = 0.25;
        dst.mix_from_scaled(&src, 2.0);
        assert!((dst.channel(0)[0] - 0.5).abs() < 1e-6);
        assert!((dst.channel(1)[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn mix_from_mismatched_sizes_uses_minimum() {
        let mut dst = AudioBuffer::new(2, 4, 44100);
        let mut src = AudioBuffer::new(2, 2, 44100);
        src.channel_mut(0)[0] = 1.0;
        src.channel_mut(0)[1] = 2.0;

        dst.mix_from(&src);
        assert!((dst.channel(0)[1] - 2.0).abs() < 1e-6);
        assert_eq!(dst.channel(0)[2], 0.0);
    }

    #[test]
    fn write_at_truncates_past_end() {
        let mut dst = AudioBuffer::new(1, 4, 44100);
        let src = AudioBuffer::from_planes(vec![vec![1.0, 1.0, 1.0]], 44100);
        dst.write_at(2, &src);
        assert_eq!(dst.channel(0), &[0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn rms_of_constant_signal() {
        let buf = AudioBuffer::from_planes(vec![vec![0.5; 100]], 44100);
        assert!((buf.rms(0, 1000) - 0.5).abs() < 1e-6);
        assert_eq!(AudioBuffer::new(1, 0, 44100).rms(0, 10), 0.0);
        let long = AudioBuffer::from_planes(vec![vec![0.6; 100_000]], 44100);
        assert!((long.rms(0, 100_000) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn peak_and_gain() {
        let mut buf = AudioBuffer::from_planes(vec![vec![0.1, -0.4], vec![0.2, 0.3]], 44100);
        assert!((buf.peak() - 0.4).abs() < 1e-6);
        buf.apply_gain(2.0);
        assert!((buf.peak() - 0.8).abs() < 1e-6);
    }
}
