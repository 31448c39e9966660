//! Transfer curves and noise buffers shared by all voices of a context.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use bg_ir::{clamp, AudioBuffer, NoiseColor};

/// Points in a tanh saturation curve.
pub const SATURATION_CURVE_SAMPLES: usize = 2048;

/// Points in a soft-clip curve.
pub const SOFT_CLIP_SAMPLES: usize = 1024;

/// Shortest noise buffer handed out, seconds.
pub const MIN_NOISE_DURATION: f64 = 0.02;

/// Noise buffers kept at once; the oldest goes first.
pub const MAX_NOISE_BUFFERS: usize = 32;

/// Amounts at or below this give the identity curve.
const MIN_DRIVE: f64 = 0.0001;

/// Curves are cached per amount rounded to this step.
const CURVE_RESOLUTION: f64 = 1000.0;

pub struct SynthCaches {
    sample_rate: u32,
    linear: Arc<[f32]>,
    saturation: HashMap<u32, Arc<[f32]>>,
    soft_clip: HashMap<u32, Arc<[f32]>>,
    /// Keyed by color and whole milliseconds.
    noise: HashMap<(NoiseColor, u32), Arc<AudioBuffer>>,
    /// Noise keys, oldest first.
    noise_order: VecDeque<(NoiseColor, u32)>,
    rng: fastrand::Rng,
}

impl SynthCaches {
    pub fn new(sample_rate: u32, seed: u64) -> Self {
        let linear = (0..SATURATION_CURVE_SAMPLES)
            .map(|i| curve_x(i, SATURATION_CURVE_SAMPLES - 1))
            .collect();
        Self {
            sample_rate,
            linear,
            saturation: HashMap::new(),
            soft_clip: HashMap::new(),
            noise: HashMap::new(),
            noise_order: VecDeque::with_capacity(MAX_NOISE_BUFFERS),
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// `tanh(drive * x)` with drive `1 + 55 * amount`, amount in `[0, 1]`.
    pub fn saturation_curve(&mut self, amount: f64) -> Arc<[f32]> {
        let amount = clamp(amount, 0.0, 1.0);
        if amount <= MIN_DRIVE {
            return self.linear.clone();
        }
        let key = (amount * CURVE_RESOLUTION).round() as u32;
        self.saturation
            .entry(key)
            .or_insert_with(|| {
                let drive = 1.0 + key as f64 / CURVE_RESOLUTION * 55.0;
                (0..SATURATION_CURVE_SAMPLES)
                    .map(|i| (drive * curve_x(i, SATURATION_CURVE_SAMPLES - 1) as f64).tanh() as f32)
                    .collect()
            })
            .clone()
    }

    /// `(1 + k) x / (1 + k |x|)` with `k = 50 * amount`, amount in `[0, 1]`.
    pub fn soft_clip_curve(&mut self, amount: f64) -> Arc<[f32]> {
        let amount = clamp(amount, 0.0, 1.0);
        if amount <= MIN_DRIVE {
            return self.linear.clone();
        }
        let key = (amount * CURVE_RESOLUTION).round() as u32;
        self.soft_clip
            .entry(key)
            .or_insert_with(|| {
                let k = key as f64 / CURVE_RESOLUTION * 50.0;
                (0..SOFT_CLIP_SAMPLES)
                    .map(|i| {
                        let x = curve_x(i, SOFT_CLIP_SAMPLES) as f64;
                        ((1.0 + k) * x / (1.0 + k * x.abs())) as f32
                    })
                    .collect()
            })
            .clone()
    }

    /// A mono noise buffer of at least `duration` seconds (to the
    /// millisecond), generated once per color and length. At most
    /// [`MAX_NOISE_BUFFERS`] are kept; voices still playing an evicted
    /// buffer hold their own reference.
    pub fn noise(&mut self, color: NoiseColor, duration: f64) -> Arc<AudioBuffer> {
        let duration = clamp(duration, MIN_NOISE_DURATION, 60.0);
        let ms = (duration * 1000.0).round() as u32;
        let key = (color, ms);
        if let Some(buffer) = self.noise.get(&key) {
            return buffer.clone();
        }
        if self.noise_order.len() >= MAX_NOISE_BUFFERS {
            if let Some(oldest) = self.noise_order.pop_front() {
                self.noise.remove(&oldest);
            }
        }
        let frames = ((self.sample_rate as f64 * ms as f64 / 1000.0).ceil() as usize).max(1);
        let mut data = vec![0.0f32; frames];
        fill_noise(color, &mut self.rng, &mut data);
        log::debug!("generated {} noise, {} ms", color.label(), ms);
        let buffer = Arc::new(AudioBuffer::from_planes(vec![data], self.sample_rate));
        self.noise.insert(key, buffer.clone());
        self.noise_order.push_back(key);
        buffer
    }

    /// Number of cached noise buffers.
    pub fn noise_buffers(&self) -> usize {
        self.noise.len()
    }

    /// Number of cached non-identity curves.
    pub fn curves(&self) -> usize {
        self.saturation.len() + self.soft_clip.len()
    }
}

/// Position `i` of `steps` mapped onto `[-1, 1]`.
fn curve_x(i: usize, steps: usize) -> f32 {
    (i as f64 * 2.0 / steps as f64 - 1.0) as f32
}

/// Fill `out` with noise of the given color.
///
/// Pink uses Paul Kellet's filter bank scaled by 0.11; brown is a leaky
/// integrator of white noise scaled by 3.5.
pub fn fill_noise(color: NoiseColor, rng: &mut fastrand::Rng, out: &mut [f32]) {
    let mut white = || rng.f32() * 2.0 - 1.0;
    match color {
        NoiseColor::White => {
            for s in out.iter_mut() {
                *s = white();
            }
        }
        NoiseColor::Pink => {
            let mut b = [0.0f32; 7];
            for s in out.iter_mut() {
                let w = white();
                b[0] = 0.99886 * b[0] + w * 0.0555179;
                b[1] = 0.99332 * b[1] + w * 0.0750759;
                b[2] = 0.969 * b[2] + w * 0.153852;
                b[3] = 0.8665 * b[3] + w * 0.3104856;
                b[4] = 0.55 * b[4] + w * 0.5329522;
                b[5] = -0.7616 * b[5] - w * 0.016898;
                *s = (b[0] + b[1] + b[2] + b[3] + b[4] + b[5] + b[6] + w * 0.5362) * 0.11;
                b[6] = w * 0.115926;
            }
        }
        NoiseColor::Brown => {
            let mut last = 0.0f32;
            for s in out.iter_mut() {
                last = (last + 0.02 * white()) / 1.02;
                *s = last * 3.5;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_drive_is_identity() {
        let mut c = SynthCaches::new(44100, 1);
        let curve = c.saturation_curve(0.0);
        assert_eq!(curve.len(), SATURATION_CURVE_SAMPLES);
        assert_eq!(curve[0], -1.0);
        assert_eq!(curve[SATURATION_CURVE_SAMPLES - 1], 1.0);
        assert_eq!(c.curves(), 0);
    }

    #[test]
    fn curves_are_shared_per_rounded_amount() {
        let mut c = SynthCaches::new(44100, 1);
        let a = c.saturation_curve(0.3);
        let b = c.saturation_curve(0.3002);
        assert!(Arc::ptr_eq(&a, &b));
        let d = c.saturation_curve(0.31);
        assert!(!Arc::ptr_eq(&a, &d));
        assert_eq!(c.curves(), 2);
    }

    #[test]
    fn saturation_is_odd_and_bounded() {
        let mut c = SynthCaches::new(44100, 1);
        let curve = c.saturation_curve(1.0);
        let n = curve.len();
        assert!((curve[0] + curve[n - 1]).abs() < 1e-6);
        assert!(curve.iter().all(|v| v.abs() <= 1.0));
    }

    #[test]
    fn soft_clip_shape() {
        let mut c = SynthCaches::new(44100, 1);
        let curve = c.soft_clip_curve(0.5);
        assert_eq!(curve.len(), SOFT_CLIP_SAMPLES);
        assert_eq!(curve[0], -1.0);
        assert_eq!(curve[SOFT_CLIP_SAMPLES / 2], 0.0);
    }

    #[test]
    fn noise_is_cached_by_color_and_length() {
        let mut c = SynthCaches::new(44100, 7);
        let a = c.noise(NoiseColor::White, 0.2);
        let b = c.noise(NoiseColor::White, 0.2);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.frames(), 8820);
        c.noise(NoiseColor::Pink, 0.2);
        c.noise(NoiseColor::White, 0.3);
        assert_eq!(c.noise_buffers(), 3);
    }

    #[test]
    fn noise_cache_is_bounded() {
        let mut c = SynthCaches::new(8000, 7);
        let first = c.noise(NoiseColor::White, 0.1);
        for i in 0..200 {
            c.noise(NoiseColor::White, 0.1 + i as f64 * 0.013);
            assert!(c.noise_buffers() <= MAX_NOISE_BUFFERS);
        }
        assert_eq!(c.noise_buffers(), MAX_NOISE_BUFFERS);
        // The first buffer was evicted but stays valid for its holder.
        assert_eq!(first.frames(), 800);
        assert!(!Arc::ptr_eq(&first, &c.noise(NoiseColor::White, 0.1)));
        let latest = c.noise(NoiseColor::White, 0.1 + 199.0 * 0.013);
        assert!(Arc::ptr_eq(&latest, &c.noise(NoiseColor::White, 0.1 + 199.0 * 0.013)));
    }

    #[test]
    fn short_noise_is_padded() {
        let mut c = SynthCaches::new(48000, 7);
        assert_eq!(c.noise(NoiseColor::Brown, 0.0).frames(), 960);
    }

    #[test]
    fn noise_stays_in_range() {
        let mut rng = fastrand::Rng::with_seed(3);
        for color in [NoiseColor::White, NoiseColor::Pink, NoiseColor::Brown] {
            let mut buf = vec![0.0f32; 44100];
            fill_noise(color, &mut rng, &mut buf);
            assert!(buf.iter().all(|s| s.abs() <= 1.5), "{:?}", color);
            assert!(buf.iter().any(|s| *s != 0.0));
        }
    }

    #[test]
    fn same_seed_same_noise() {
        let mut a = SynthCaches::new(44100, 42);
        let mut b = SynthCaches::new(44100, 42);
        assert_eq!(
            a.noise(NoiseColor::Pink, 0.05).channel(0),
            b.noise(NoiseColor::Pink, 0.05).channel(0)
        );
    }
}
