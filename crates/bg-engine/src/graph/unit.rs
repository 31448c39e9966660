//! Graph units: kind tags, parameter tables and per-quantum processing.

use std::ops::Range;

use arrayvec::ArrayVec;
use bg_ir::{AudioBuffer, RENDER_QUANTUM};

use super::dsp::{
    self, Analyser, Biquad, Block, BufferPlayer, Compressor, DelayLine, Oscillator, Reverb,
    WaveShaper,
};
use super::param::{AudioParam, ParamId};

slotmap::new_key_type! {
    /// Generational handle to a unit in an [`AudioContext`](super::AudioContext).
    pub struct UnitKey;
}

/// Most parameters any unit kind carries (the compressor).
pub const MAX_PARAMS: usize = 5;

/// Output below this peak counts as silence when deciding whether a unit
/// with a tail still needs processing.
const SILENCE: f32 = 1e-6;

/// Processing unit types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnitKind {
    Gain,
    BiquadFilter,
    WaveShaper,
    DynamicsCompressor,
    StereoPanner,
    Analyser,
    Delay,
    Reverb,
    Oscillator,
    BufferSource,
    Destination,
}

type ParamSpec = (ParamId, f64, f64, f64);

impl UnitKind {
    /// Scheduled sources start once, stop once and are never reused.
    pub fn is_source(self) -> bool {
        matches!(self, UnitKind::Oscillator | UnitKind::BufferSource)
    }

    /// `(id, default, min, max)` for every parameter, in processing order.
    fn param_specs(self) -> &'static [ParamSpec] {
        match self {
            UnitKind::Gain => &[(ParamId::Gain, 1.0, -1.0e4, 1.0e4)],
            UnitKind::BiquadFilter => &[
                (ParamId::Frequency, 350.0, 0.0, 96_000.0),
                (ParamId::Detune, 0.0, -153_600.0, 153_600.0),
                (ParamId::Q, 1.0, -770.0, 770.0),
                (ParamId::FilterGain, 0.0, -40.0, 40.0),
            ],
            UnitKind::DynamicsCompressor => &[
                (ParamId::Threshold, -24.0, -100.0, 0.0),
                (ParamId::Knee, 30.0, 0.0, 40.0),
                (ParamId::Ratio, 12.0, 1.0, 20.0),
                (ParamId::Attack, 0.003, 0.0, 1.0),
                (ParamId::Release, 0.25, 0.0, 1.0),
            ],
            UnitKind::StereoPanner => &[(ParamId::Pan, 0.0, -1.0, 1.0)],
            UnitKind::Delay => &[
                (ParamId::DelayTime, 0.0, 0.0, 10.0),
                (ParamId::Feedback, 0.0, 0.0, 0.98),
            ],
            UnitKind::Reverb => &[
                (ParamId::RoomSize, 0.5, 0.0, 1.0),
                (ParamId::Damping, 0.5, 0.0, 1.0),
            ],
            UnitKind::Oscillator => &[
                (ParamId::Frequency, 440.0, -96_000.0, 96_000.0),
                (ParamId::Detune, 0.0, -153_600.0, 153_600.0),
            ],
            UnitKind::BufferSource => &[(ParamId::PlaybackRate, 1.0, 0.0, 16.0)],
            UnitKind::WaveShaper | UnitKind::Analyser | UnitKind::Destination => &[],
        }
    }
}

/// Where a unit's output goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    Unit(UnitKey),
    Param(UnitKey, ParamId),
}

pub(crate) enum Processor {
    Gain,
    Biquad(Biquad),
    WaveShaper(WaveShaper),
    Compressor(Compressor),
    Panner,
    Analyser(Analyser),
    Delay(DelayLine),
    Reverb(Reverb),
    Oscillator(Oscillator),
    BufferSource(BufferPlayer),
    Destination,
}

/// Start/stop frames of a scheduled source.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Schedule {
    pub start: Option<u64>,
    pub stop: Option<u64>,
}

impl Schedule {
    /// Frames of the quantum starting at `frame0` during which the source
    /// plays.
    pub fn active_range(&self, frame0: u64) -> Range<usize> {
        let Some(start) = self.start else {
            return 0..0;
        };
        let end = frame0 + RENDER_QUANTUM as u64;
        let stop = self.stop.unwrap_or(u64::MAX);
        let from = start.max(frame0);
        let to = stop.min(end);
        if from >= to {
            return 0..0;
        }
        (from - frame0) as usize..(to - frame0) as usize
    }
}

/// Timing of the quantum being rendered.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Quantum {
    pub sample_rate: f64,
    pub frame0: u64,
}

pub(crate) struct Unit {
    pub kind: UnitKind,
    pub params: ArrayVec<(ParamId, AudioParam), MAX_PARAMS>,
    pub inputs: Vec<UnitKey>,
    pub param_inputs: Vec<(ParamId, UnitKey)>,
    pub outputs: Vec<Target>,
    pub processor: Processor,
    pub output: AudioBuffer,
    pub schedule: Schedule,
    /// Processed (and possibly non-silent) during the last quantum.
    pub active: bool,
    tail: usize,
    /// Kahn's algorithm scratch.
    pub pending: u32,
}

impl Unit {
    pub fn new(kind: UnitKind, sample_rate: u32) -> Self {
        let processor = match kind {
            UnitKind::Gain => Processor::Gain,
            UnitKind::BiquadFilter => Processor::Biquad(Biquad::default()),
            UnitKind::WaveShaper => Processor::WaveShaper(WaveShaper::default()),
            UnitKind::DynamicsCompressor => Processor::Compressor(Compressor::default()),
            UnitKind::StereoPanner => Processor::Panner,
            UnitKind::Analyser => Processor::Analyser(Analyser::new()),
            UnitKind::Delay => Processor::Delay(DelayLine::new(2 * sample_rate as usize)),
            UnitKind::Reverb => Processor::Reverb(Reverb::new(sample_rate as f64)),
            UnitKind::Oscillator => Processor::Oscillator(Oscillator::default()),
            UnitKind::BufferSource => Processor::BufferSource(BufferPlayer::default()),
            UnitKind::Destination => Processor::Destination,
        };
        Self {
            kind,
            params: kind
                .param_specs()
                .iter()
                .map(|&(id, default, min, max)| (id, AudioParam::new(default, min, max)))
                .collect(),
            inputs: Vec::new(),
            param_inputs: Vec::new(),
            outputs: Vec::new(),
            processor,
            output: AudioBuffer::new(2, RENDER_QUANTUM, sample_rate),
            schedule: Schedule::default(),
            active: false,
            tail: 0,
            pending: 0,
        }
    }

    pub fn param(&self, id: ParamId) -> Option<&AudioParam> {
        self.params.iter().find(|(p, _)| *p == id).map(|(_, p)| p)
    }

    pub fn param_mut(&mut self, id: ParamId) -> Option<&mut AudioParam> {
        self.params.iter_mut().find(|(p, _)| *p == id).map(|(_, p)| p)
    }

    pub fn param_index(&self, id: ParamId) -> Option<usize> {
        self.params.iter().position(|(p, _)| *p == id)
    }

    /// Restore default parameter values and clear internal state.
    pub fn reset(&mut self) {
        for (_, p) in &mut self.params {
            p.reset();
        }
        match &mut self.processor {
            Processor::Biquad(b) => b.reset(),
            Processor::WaveShaper(w) => w.reset(),
            Processor::Compressor(c) => c.reset(),
            Processor::Analyser(a) => a.reset(),
            Processor::Delay(d) => d.reset(),
            Processor::Reverb(r) => r.reset(),
            _ => {}
        }
        self.output.silence();
        self.active = false;
        self.tail = 0;
    }

    /// True once a source can make no more sound.
    pub fn is_finished(&self, frame: u64) -> bool {
        if !self.kind.is_source() {
            return false;
        }
        if let Processor::BufferSource(p) = &self.processor {
            if p.ended {
                return true;
            }
        }
        matches!(self.schedule.stop, Some(stop) if stop <= frame)
    }

    fn tail_frames(&self, sample_rate: f64) -> usize {
        match &self.processor {
            Processor::Biquad(_) => RENDER_QUANTUM,
            Processor::Delay(d) => d.max_frames(),
            Processor::Reverb(_) => (sample_rate * 0.25) as usize,
            _ => 0,
        }
    }

    /// Render one quantum. `input` is the mix of all audio inputs and
    /// `params` the resolved parameter values in [`UnitKind`] declaration order.
    pub fn process(
        &mut self,
        q: Quantum,
        input: &AudioBuffer,
        params: &[Block; MAX_PARAMS],
        input_active: bool,
    ) {
        let sr = q.sample_rate;

        if self.kind.is_source() {
            let range = self.schedule.active_range(q.frame0);
            self.output.silence();
            self.active = !range.is_empty();
            if !self.active {
                return;
            }
            match &mut self.processor {
                Processor::Oscillator(osc) => {
                    osc.process(sr, range, &params[0], &params[1], &mut self.output)
                }
                Processor::BufferSource(player) => {
                    player.process(sr, range, &params[0], &mut self.output)
                }
                _ => {}
            }
            return;
        }

        let run = input_active || self.tail > 0 || self.kind == UnitKind::Destination;
        if !run {
            if self.active {
                self.output.silence();
                if let Processor::Analyser(a) = &mut self.processor {
                    a.peak = 0.0;
                    a.rms = 0.0;
                }
                self.active = false;
            }
            return;
        }

        let out = &mut self.output;
        match &mut self.processor {
            Processor::Gain => {
                for ch in 0..2u16 {
                    let dst = out.channel_mut(ch);
                    for (i, s) in dst.iter_mut().enumerate() {
                        *s = input.sample(ch, i) * params[0][i];
                    }
                }
            }
            Processor::Biquad(b) => {
                b.process(sr, input, &params[0], &params[1], &params[2], &params[3], out)
            }
            Processor::WaveShaper(w) => w.process(input, out),
            Processor::Compressor(c) => c.process(
                sr, input, &params[0], &params[1], &params[2], &params[3], &params[4], out,
            ),
            Processor::Panner => dsp::pan(input, &params[0], out),
            Processor::Analyser(a) => a.process(input, out),
            Processor::Delay(d) => d.process(sr, input, &params[0], &params[1], out),
            Processor::Reverb(r) => r.process(input, &params[0], &params[1], out),
            Processor::Destination => out.write_at(0, input),
            Processor::Oscillator(_) | Processor::BufferSource(_) => {}
        }

        let tail = self.tail_frames(sr);
        if input_active {
            self.tail = tail;
        } else {
            self.tail = self.tail.saturating_sub(RENDER_QUANTUM);
            if tail > 0 && self.tail == 0 && self.output.peak() > SILENCE {
                self.tail = RENDER_QUANTUM;
            }
        }
        self.active = true;
    }
}
