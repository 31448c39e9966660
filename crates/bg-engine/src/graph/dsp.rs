//! Per-kind sample processors.
//!
//! Every processor works on one stereo render quantum at a time. Parameter
//! values arrive as per-frame arrays already resolved from automation and
//! modulation.

use std::f64::consts::PI;
use std::ops::Range;
use std::sync::Arc;

use bg_ir::{AudioBuffer, Waveform, RENDER_QUANTUM};

pub(crate) type Block = [f32; RENDER_QUANTUM];

// === Biquad ===

/// Response shape of a biquad filter unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterType {
    #[default]
    Lowpass,
    Highpass,
    Bandpass,
    Notch,
    Peaking,
    Lowshelf,
    Highshelf,
    Allpass,
}

/// Second-order IIR filter, Direct Form II Transposed, one state per
/// channel.
///
/// Coefficients follow the Audio EQ Cookbook with browser conventions:
/// lowpass and highpass read Q as resonance in dB, the other shapes read it
/// as a linear quality factor, and shelves use a fixed slope of 1.
#[derive(Clone, Debug, Default)]
pub(crate) struct Biquad {
    pub filter_type: FilterType,
    coeffs: [f64; 5],
    key: Option<(FilterType, f32, f32, f32)>,
    z: [[f64; 2]; 2],
}

impl Biquad {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[allow(clippy::too_many_arguments)]
    pub fn process(
        &mut self,
        sample_rate: f64,
        input: &AudioBuffer,
        frequency: &Block,
        detune: &Block,
        q: &Block,
        gain: &Block,
        output: &mut AudioBuffer,
    ) {
        let mut detune_ratio = (f32::NAN, 1.0f32);
        for i in 0..RENDER_QUANTUM {
            if detune[i] != detune_ratio.0 {
                detune_ratio = (detune[i], 2f32.powf(detune[i] / 1200.0));
            }
            let f = frequency[i] * detune_ratio.1;
            let key = (self.filter_type, f, q[i], gain[i]);
            if self.key != Some(key) {
                self.coeffs = coefficients(self.filter_type, sample_rate, f as f64, q[i] as f64, gain[i] as f64);
                self.key = Some(key);
            }
            let [b0, b1, b2, a1, a2] = self.coeffs;
            for ch in 0..2u16 {
                let x = input.sample(ch, i) as f64;
                let z = &mut self.z[ch as usize];
                let y = b0 * x + z[0];
                z[0] = b1 * x - a1 * y + z[1];
                z[1] = b2 * x - a2 * y;
                output.channel_mut(ch)[i] = y as f32;
            }
        }
    }
}

/// Normalised `[b0, b1, b2, a1, a2]`.
pub(crate) fn coefficients(
    filter_type: FilterType,
    sample_rate: f64,
    frequency: f64,
    q: f64,
    gain_db: f64,
) -> [f64; 5] {
    let nyquist = sample_rate / 2.0;
    let freq = frequency.clamp(1.0, nyquist * 0.999);
    let w0 = 2.0 * PI * freq / sample_rate;
    let (sin_w0, cos_w0) = w0.sin_cos();
    let a = 10f64.powf(gain_db / 40.0);

    let (b0, b1, b2, a0, a1, a2) = match filter_type {
        FilterType::Lowpass => {
            let alpha = sin_w0 / (2.0 * 10f64.powf(q / 20.0));
            let b1 = 1.0 - cos_w0;
            (b1 / 2.0, b1, b1 / 2.0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
        }
        FilterType::Highpass => {
            let alpha = sin_w0 / (2.0 * 10f64.powf(q / 20.0));
            let b0 = (1.0 + cos_w0) / 2.0;
            (b0, -(1.0 + cos_w0), b0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
        }
        FilterType::Bandpass => {
            let alpha = sin_w0 / (2.0 * q.max(1e-4));
            (alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
        }
        FilterType::Notch => {
            let alpha = sin_w0 / (2.0 * q.max(1e-4));
            (1.0, -2.0 * cos_w0, 1.0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
        }
        FilterType::Allpass => {
            let alpha = sin_w0 / (2.0 * q.max(1e-4));
            (
                1.0 - alpha,
                -2.0 * cos_w0,
                1.0 + alpha,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            )
        }
        FilterType::Peaking => {
            let alpha = sin_w0 / (2.0 * q.max(1e-4));
            (
                1.0 + alpha * a,
                -2.0 * cos_w0,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w0,
                1.0 - alpha / a,
            )
        }
        FilterType::Lowshelf => {
            let k = 2.0 * a.sqrt() * sin_w0 / 2.0 * std::f64::consts::SQRT_2;
            (
                a * ((a + 1.0) - (a - 1.0) * cos_w0 + k),
                2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                a * ((a + 1.0) - (a - 1.0) * cos_w0 - k),
                (a + 1.0) + (a - 1.0) * cos_w0 + k,
                -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                (a + 1.0) + (a - 1.0) * cos_w0 - k,
            )
        }
        FilterType::Highshelf => {
            let k = 2.0 * a.sqrt() * sin_w0 / 2.0 * std::f64::consts::SQRT_2;
            (
                a * ((a + 1.0) + (a - 1.0) * cos_w0 + k),
                -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                a * ((a + 1.0) + (a - 1.0) * cos_w0 - k),
                (a + 1.0) - (a - 1.0) * cos_w0 + k,
                2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                (a + 1.0) - (a - 1.0) * cos_w0 - k,
            )
        }
    };

    [b0 / a0, b1 / a0, b2 / a0, a1 / a0, a2 / a0]
}

// === Wave shaper ===

/// Oversampling applied around a wave shaper curve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Oversample {
    #[default]
    None,
    X2,
    X4,
}

impl Oversample {
    fn factor(self) -> usize {
        match self {
            Oversample::None => 1,
            Oversample::X2 => 2,
            Oversample::X4 => 4,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct WaveShaper {
    pub curve: Option<Arc<[f32]>>,
    pub oversample: Oversample,
    last: [f32; 2],
}

impl WaveShaper {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn process(&mut self, input: &AudioBuffer, output: &mut AudioBuffer) {
        let Some(curve) = self.curve.as_deref() else {
            output.write_at(0, input);
            return;
        };
        let n = self.oversample.factor();
        for ch in 0..2u16 {
            let mut last = self.last[ch as usize];
            for i in 0..RENDER_QUANTUM {
                let x = input.sample(ch, i);
                let y = if n == 1 {
                    shape(curve, x)
                } else {
                    let mut acc = 0.0;
                    for k in 1..=n {
                        acc += shape(curve, last + (x - last) * k as f32 / n as f32);
                    }
                    acc / n as f32
                };
                last = x;
                output.channel_mut(ch)[i] = y;
            }
            self.last[ch as usize] = last;
        }
    }
}

/// Map `x` in `[-1, 1]` through `curve` with linear interpolation; inputs
/// outside the range take the end values.
pub(crate) fn shape(curve: &[f32], x: f32) -> f32 {
    let len = curve.len();
    if len == 0 {
        return x;
    }
    if len == 1 {
        return curve[0];
    }
    let v = (len - 1) as f32 * 0.5 * (x + 1.0);
    if !(v > 0.0) {
        return curve[0];
    }
    let k = v as usize;
    if k >= len - 1 {
        return curve[len - 1];
    }
    let f = v - k as f32;
    (1.0 - f) * curve[k] + f * curve[k + 1]
}

// === Compressor ===

/// Feed-forward stereo-linked compressor with a soft knee.
#[derive(Clone, Debug, Default)]
pub(crate) struct Compressor {
    envelope: f64,
    coef_key: (f32, f32),
    coefs: (f64, f64),
    /// Gain reduction of the last frame, in dB (non-positive).
    pub reduction_db: f64,
}

impl Compressor {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[allow(clippy::too_many_arguments)]
    pub fn process(
        &mut self,
        sample_rate: f64,
        input: &AudioBuffer,
        threshold: &Block,
        knee: &Block,
        ratio: &Block,
        attack: &Block,
        release: &Block,
        output: &mut AudioBuffer,
    ) {
        for i in 0..RENDER_QUANTUM {
            if self.coef_key != (attack[i], release[i]) || self.coefs == (0.0, 0.0) {
                self.coef_key = (attack[i], release[i]);
                self.coefs = (
                    (-1.0 / (attack[i].max(1e-4) as f64 * sample_rate)).exp(),
                    (-1.0 / (release[i].max(1e-3) as f64 * sample_rate)).exp(),
                );
            }
            let l = input.sample(0, i);
            let r = input.sample(1, i);
            let level = l.abs().max(r.abs()) as f64;
            let coef = if level > self.envelope { self.coefs.0 } else { self.coefs.1 };
            self.envelope = coef * self.envelope + (1.0 - coef) * level;

            let env_db = linear_to_db(self.envelope);
            self.reduction_db = gain_reduction(env_db, threshold[i] as f64, knee[i] as f64, ratio[i] as f64);
            let gain = db_to_linear(self.reduction_db) as f32;
            output.channel_mut(0)[i] = l * gain;
            output.channel_mut(1)[i] = r * gain;
        }
    }
}

#[inline]
pub(crate) fn linear_to_db(linear: f64) -> f64 {
    if linear <= 1e-6 {
        -120.0
    } else {
        20.0 * linear.log10()
    }
}

#[inline]
pub(crate) fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Static gain curve: dB of reduction for an input level in dB.
pub(crate) fn gain_reduction(input_db: f64, threshold: f64, knee: f64, ratio: f64) -> f64 {
    let slope = 1.0 - 1.0 / ratio.max(1.0);
    if knee <= 0.0 {
        return if input_db <= threshold {
            0.0
        } else {
            (threshold - input_db) * slope
        };
    }
    let half = knee / 2.0;
    if input_db <= threshold - half {
        0.0
    } else if input_db >= threshold + half {
        (threshold - input_db) * slope
    } else {
        let x = input_db - (threshold - half);
        -slope * x * x / (2.0 * knee)
    }
}

// === Delay ===

/// Stereo delay line with an internal feedback path. Output is the wet
/// signal only.
#[derive(Clone, Debug)]
pub(crate) struct DelayLine {
    buffers: [Vec<f32>; 2],
    write: usize,
}

impl DelayLine {
    pub fn new(max_frames: usize) -> Self {
        let len = max_frames.max(1) + 2;
        Self {
            buffers: [vec![0.0; len], vec![0.0; len]],
            write: 0,
        }
    }

    pub fn max_frames(&self) -> usize {
        self.buffers[0].len() - 2
    }

    pub fn reset(&mut self) {
        for b in &mut self.buffers {
            b.fill(0.0);
        }
        self.write = 0;
    }

    pub fn process(
        &mut self,
        sample_rate: f64,
        input: &AudioBuffer,
        delay_time: &Block,
        feedback: &Block,
        output: &mut AudioBuffer,
    ) {
        let len = self.buffers[0].len();
        let max = self.max_frames() as f64;
        for i in 0..RENDER_QUANTUM {
            let d = (delay_time[i] as f64 * sample_rate).clamp(1.0, max);
            let read = (self.write as f64 - d).rem_euclid(len as f64);
            let i0 = read as usize % len;
            let i1 = (i0 + 1) % len;
            let frac = (read - read.floor()) as f32;
            let fb = feedback[i].clamp(0.0, 0.98);
            for ch in 0..2 {
                let buf = &mut self.buffers[ch];
                let delayed = buf[i0] + (buf[i1] - buf[i0]) * frac;
                buf[self.write] = input.sample(ch as u16, i) + delayed * fb;
                output.channel_mut(ch as u16)[i] = delayed;
            }
            self.write = (self.write + 1) % len;
        }
    }
}

// === Reverb ===

const COMB_TUNING: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_TUNING: [usize; 4] = [556, 441, 341, 225];
const STEREO_SPREAD: usize = 23;
const REVERB_INPUT_GAIN: f32 = 0.015;

#[derive(Clone, Debug)]
struct Comb {
    buffer: Vec<f32>,
    index: usize,
    store: f32,
}

impl Comb {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
            store: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32, damp: f32) -> f32 {
        let out = self.buffer[self.index];
        self.store = out * (1.0 - damp) + self.store * damp;
        self.buffer[self.index] = input + self.store * feedback;
        self.index = (self.index + 1) % self.buffer.len();
        out
    }
}

#[derive(Clone, Debug)]
struct Allpass {
    buffer: Vec<f32>,
    index: usize,
}

impl Allpass {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let buffered = self.buffer[self.index];
        self.buffer[self.index] = input + buffered * 0.5;
        self.index = (self.index + 1) % self.buffer.len();
        buffered - input
    }
}

/// Freeverb-style comb/allpass network. Output is the wet signal only.
#[derive(Clone, Debug)]
pub(crate) struct Reverb {
    combs: [Vec<Comb>; 2],
    allpasses: [Vec<Allpass>; 2],
}

impl Reverb {
    pub fn new(sample_rate: f64) -> Self {
        let scale = sample_rate / 44100.0;
        let sized = |t: usize, spread: usize| (t as f64 * scale) as usize + spread;
        let combs = |spread| COMB_TUNING.iter().map(|&t| Comb::new(sized(t, spread))).collect();
        let allpasses = |spread| ALLPASS_TUNING.iter().map(|&t| Allpass::new(sized(t, spread))).collect();
        Self {
            combs: [combs(0), combs(STEREO_SPREAD)],
            allpasses: [allpasses(0), allpasses(STEREO_SPREAD)],
        }
    }

    pub fn reset(&mut self) {
        for side in &mut self.combs {
            for c in side {
                c.buffer.fill(0.0);
                c.store = 0.0;
            }
        }
        for side in &mut self.allpasses {
            for a in side {
                a.buffer.fill(0.0);
            }
        }
    }

    /// Room size and damping are read once per quantum.
    pub fn process(&mut self, input: &AudioBuffer, room_size: &Block, damping: &Block, output: &mut AudioBuffer) {
        let feedback = room_size[0].clamp(0.0, 1.0) * 0.28 + 0.7;
        let damp = damping[0].clamp(0.0, 1.0) * 0.4;
        for i in 0..RENDER_QUANTUM {
            let x = (input.sample(0, i) + input.sample(1, i)) * REVERB_INPUT_GAIN;
            for ch in 0..2 {
                let mut acc = 0.0;
                for comb in &mut self.combs[ch] {
                    acc += comb.process(x, feedback, damp);
                }
                for ap in &mut self.allpasses[ch] {
                    acc = ap.process(acc);
                }
                output.channel_mut(ch as u16)[i] = acc;
            }
        }
    }
}

// === Stereo panner ===

/// Equal-power stereo panning of a stereo input.
pub(crate) fn pan(input: &AudioBuffer, pan: &Block, output: &mut AudioBuffer) {
    for i in 0..RENDER_QUANTUM {
        let p = pan[i].clamp(-1.0, 1.0);
        let l = input.sample(0, i);
        let r = input.sample(1, i);
        let (out_l, out_r) = if p <= 0.0 {
            let x = (p + 1.0) * std::f32::consts::FRAC_PI_2;
            (l + r * x.cos(), r * x.sin())
        } else {
            let x = p * std::f32::consts::FRAC_PI_2;
            (l * x.cos(), r + l * x.sin())
        };
        output.channel_mut(0)[i] = out_l;
        output.channel_mut(1)[i] = out_r;
    }
}

// === Analyser ===

/// Length of the analyser's time-domain history.
pub const ANALYSER_WINDOW: usize = 2048;

/// Pass-through tap that records levels and a short mono history.
#[derive(Clone, Debug)]
pub(crate) struct Analyser {
    pub peak: f32,
    pub rms: f32,
    ring: Vec<f32>,
    write: usize,
}

impl Analyser {
    pub fn new() -> Self {
        Self {
            peak: 0.0,
            rms: 0.0,
            ring: vec![0.0; ANALYSER_WINDOW],
            write: 0,
        }
    }

    pub fn reset(&mut self) {
        self.peak = 0.0;
        self.rms = 0.0;
        self.ring.fill(0.0);
        self.write = 0;
    }

    pub fn process(&mut self, input: &AudioBuffer, output: &mut AudioBuffer) {
        let mut peak = 0.0f32;
        let mut sum = 0.0f32;
        for i in 0..RENDER_QUANTUM {
            let l = input.sample(0, i);
            let r = input.sample(1, i);
            output.channel_mut(0)[i] = l;
            output.channel_mut(1)[i] = r;
            let m = 0.5 * (l + r);
            peak = peak.max(l.abs()).max(r.abs());
            sum += m * m;
            self.ring[self.write] = m;
            self.write = (self.write + 1) % ANALYSER_WINDOW;
        }
        self.peak = peak;
        self.rms = (sum / RENDER_QUANTUM as f32).sqrt();
    }

    /// Copy the history, oldest first, into `out`.
    pub fn time_domain(&self, out: &mut [f32]) {
        let n = out.len().min(ANALYSER_WINDOW);
        let start = (self.write + ANALYSER_WINDOW - n) % ANALYSER_WINDOW;
        for (k, s) in out.iter_mut().take(n).enumerate() {
            *s = self.ring[(start + k) % ANALYSER_WINDOW];
        }
    }
}

// === Sources ===

/// Periodic oscillator with PolyBLEP-corrected edges.
#[derive(Clone, Debug, Default)]
pub(crate) struct Oscillator {
    pub waveform: Waveform,
    phase: f64,
}

impl Oscillator {
    pub fn process(
        &mut self,
        sample_rate: f64,
        active: Range<usize>,
        frequency: &Block,
        detune: &Block,
        output: &mut AudioBuffer,
    ) {
        let mut detune_ratio = (f32::NAN, 1.0f64);
        for i in active {
            if detune[i] != detune_ratio.0 {
                detune_ratio = (detune[i], 2f64.powf(detune[i] as f64 / 1200.0));
            }
            let inc = (frequency[i] as f64 * detune_ratio.1 / sample_rate).clamp(-0.5, 0.5);
            let s = self.sample(inc.abs()) as f32;
            output.channel_mut(0)[i] = s;
            output.channel_mut(1)[i] = s;
            self.phase = (self.phase + inc).rem_euclid(1.0);
        }
    }

    fn sample(&self, inc: f64) -> f64 {
        let t = self.phase;
        match self.waveform {
            Waveform::Sine => (2.0 * PI * t).sin(),
            Waveform::Sawtooth => 2.0 * t - 1.0 - poly_blep(t, inc),
            Waveform::Square => {
                let naive = if t < 0.5 { 1.0 } else { -1.0 };
                naive + poly_blep(t, inc) - poly_blep((t + 0.5) % 1.0, inc)
            }
            Waveform::Triangle => {
                if t < 0.5 {
                    4.0 * t - 1.0
                } else {
                    3.0 - 4.0 * t
                }
            }
        }
    }
}

fn poly_blep(t: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        0.0
    } else if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}

/// One-shot playback of a shared buffer.
#[derive(Clone, Debug, Default)]
pub(crate) struct BufferPlayer {
    pub buffer: Option<Arc<AudioBuffer>>,
    position: f64,
    pub ended: bool,
}

impl BufferPlayer {
    pub fn process(&mut self, sample_rate: f64, active: Range<usize>, rate: &Block, output: &mut AudioBuffer) {
        let Some(buf) = self.buffer.as_deref() else {
            self.ended = true;
            return;
        };
        let frames = buf.frames();
        let ratio = buf.sample_rate() as f64 / sample_rate;
        for i in active {
            if self.position >= frames as f64 || self.position < 0.0 {
                self.ended = true;
                break;
            }
            let i0 = self.position as usize;
            let i1 = (i0 + 1).min(frames - 1);
            let frac = (self.position - i0 as f64) as f32;
            for ch in 0..2u16 {
                let a = buf.sample(ch, i0);
                let b = buf.sample(ch, i1);
                output.channel_mut(ch)[i] = a + (b - a) * frac;
            }
            self.position += rate[i].max(0.0) as f64 * ratio;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(v: f32) -> Block {
        [v; RENDER_QUANTUM]
    }

    fn dc(v: f32) -> AudioBuffer {
        let mut b = AudioBuffer::new(2, RENDER_QUANTUM, 44100);
        b.channel_mut(0).fill(v);
        b.channel_mut(1).fill(v);
        b
    }

    #[test]
    fn lowpass_passes_dc() {
        let mut f = Biquad::default();
        let mut out = AudioBuffer::new(2, RENDER_QUANTUM, 44100);
        for _ in 0..20 {
            f.process(44100.0, &dc(1.0), &block(5000.0), &block(0.0), &block(0.0), &block(0.0), &mut out);
        }
        assert!((out.channel(0)[RENDER_QUANTUM - 1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut f = Biquad {
            filter_type: FilterType::Highpass,
            ..Default::default()
        };
        let mut out = AudioBuffer::new(2, RENDER_QUANTUM, 44100);
        for _ in 0..20 {
            f.process(44100.0, &dc(1.0), &block(1000.0), &block(0.0), &block(0.0), &block(0.0), &mut out);
        }
        assert!(out.channel(1)[RENDER_QUANTUM - 1].abs() < 1e-3);
    }

    #[test]
    fn shelves_are_unity_at_zero_gain() {
        for ft in [FilterType::Lowshelf, FilterType::Highshelf, FilterType::Peaking] {
            let [b0, b1, b2, a1, a2] = coefficients(ft, 44100.0, 1000.0, 1.0, 0.0);
            assert!((b0 - 1.0).abs() < 1e-9, "{:?}", ft);
            assert!((b1 - a1).abs() < 1e-9);
            assert!((b2 - a2).abs() < 1e-9);
        }
    }

    #[test]
    fn shaper_identity_curve() {
        let curve = [-1.0, 0.0, 1.0];
        assert_eq!(shape(&curve, 0.5), 0.5);
        assert_eq!(shape(&curve, -2.0), -1.0);
        assert_eq!(shape(&curve, 3.0), 1.0);
    }

    #[test]
    fn soft_knee_is_continuous() {
        let below = gain_reduction(-30.0, -24.0, 12.0, 4.0);
        assert_eq!(below, 0.0);
        let edge = gain_reduction(-18.0, -24.0, 12.0, 4.0);
        let just_above = gain_reduction(-17.999, -24.0, 12.0, 4.0);
        assert!((edge - just_above).abs() < 1e-2);
        assert!((gain_reduction(0.0, -20.0, 0.0, 4.0) + 15.0).abs() < 1e-9);
    }

    #[test]
    fn compressor_reduces_loud_signal() {
        let mut c = Compressor::default();
        let mut out = AudioBuffer::new(2, RENDER_QUANTUM, 44100);
        for _ in 0..50 {
            c.process(
                44100.0,
                &dc(1.0),
                &block(-24.0),
                &block(0.0),
                &block(12.0),
                &block(0.003),
                &block(0.25),
                &mut out,
            );
        }
        assert!(out.channel(0)[0] < 0.2);
        assert!(c.reduction_db < -18.0);
    }

    #[test]
    fn delay_outputs_after_delay_time() {
        let mut d = DelayLine::new(1000);
        let mut impulse = AudioBuffer::new(2, RENDER_QUANTUM, 1000);
        impulse.channel_mut(0)[0] = 1.0;
        let mut out = AudioBuffer::new(2, RENDER_QUANTUM, 1000);
        d.process(1000.0, &impulse, &block(0.01), &block(0.0), &mut out);
        assert!((out.channel(0)[10] - 1.0).abs() < 1e-6);
        assert!(out.channel(0)[9].abs() < 1e-6);
        assert_eq!(out.channel(1)[10], 0.0);
    }

    #[test]
    fn delay_feedback_repeats() {
        let mut d = DelayLine::new(1000);
        let mut impulse = AudioBuffer::new(2, RENDER_QUANTUM, 1000);
        impulse.channel_mut(0)[0] = 1.0;
        let mut out = AudioBuffer::new(2, RENDER_QUANTUM, 1000);
        d.process(1000.0, &impulse, &block(0.01), &block(0.5), &mut out);
        assert!((out.channel(0)[20] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn centre_pan_is_transparent() {
        let mut out = AudioBuffer::new(2, RENDER_QUANTUM, 44100);
        pan(&dc(0.5), &block(0.0), &mut out);
        assert!((out.channel(0)[0] - 0.5).abs() < 1e-6);
        assert!((out.channel(1)[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn hard_left_pan() {
        let mut out = AudioBuffer::new(2, RENDER_QUANTUM, 44100);
        pan(&dc(0.5), &block(-1.0), &mut out);
        assert!((out.channel(0)[0] - 1.0).abs() < 1e-6);
        assert!(out.channel(1)[0].abs() < 1e-6);
    }

    #[test]
    fn analyser_measures_and_passes_through() {
        let mut a = Analyser::new();
        let mut out = AudioBuffer::new(2, RENDER_QUANTUM, 44100);
        a.process(&dc(0.25), &mut out);
        assert_eq!(out.channel(0)[5], 0.25);
        assert!((a.peak - 0.25).abs() < 1e-6);
        assert!((a.rms - 0.25).abs() < 1e-6);
        let mut hist = [0.0f32; 4];
        a.time_domain(&mut hist);
        assert_eq!(hist, [0.25; 4]);
    }

    #[test]
    fn sine_starts_at_zero_and_stays_in_range() {
        let mut osc = Oscillator::default();
        let mut out = AudioBuffer::new(2, RENDER_QUANTUM, 44100);
        osc.process(44100.0, 0..RENDER_QUANTUM, &block(440.0), &block(0.0), &mut out);
        assert!(out.channel(0)[0].abs() < 1e-6);
        assert!(out.channel(0).iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn oscillator_writes_only_active_range() {
        let mut osc = Oscillator {
            waveform: Waveform::Square,
            ..Default::default()
        };
        let mut out = AudioBuffer::new(2, RENDER_QUANTUM, 44100);
        osc.process(44100.0, 64..RENDER_QUANTUM, &block(100.0), &block(0.0), &mut out);
        assert!(out.channel(0)[..64].iter().all(|&s| s == 0.0));
        assert!(out.channel(0)[70] > 0.5);
    }

    #[test]
    fn buffer_player_ends() {
        let buf = Arc::new(AudioBuffer::from_planes(vec![vec![0.5; 10]], 44100));
        let mut p = BufferPlayer {
            buffer: Some(buf),
            ..Default::default()
        };
        let mut out = AudioBuffer::new(2, RENDER_QUANTUM, 44100);
        p.process(44100.0, 0..RENDER_QUANTUM, &block(1.0), &mut out);
        assert!(p.ended);
        assert_eq!(out.channel(1)[9], 0.5);
        assert_eq!(out.channel(0)[10], 0.0);
    }
}
