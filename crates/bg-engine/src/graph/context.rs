//! The unit graph and its render loop.

use std::sync::Arc;

use bg_ir::{AudioBuffer, Waveform, RENDER_QUANTUM};
use slotmap::SlotMap;

use super::dsp::{Block, FilterType, Oversample};
use super::param::{AudioParam, ParamId};
use super::unit::{Processor, Quantum, Target, Unit, UnitKey, UnitKind, MAX_PARAMS};
use crate::error::EngineError;

/// Level readout of an analyser unit over the last quantum.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Meter {
    pub peak: f32,
    pub rms: f32,
}

/// A graph of processing units rendered in fixed quanta against a frame
/// clock.
///
/// The same type serves realtime playback (one quantum at a time, pulled by
/// the device) and offline export ([`render`](Self::render)).
pub struct AudioContext {
    sample_rate: u32,
    /// Frames rendered so far; the clock.
    frame: u64,
    units: SlotMap<UnitKey, Unit>,
    destination: UnitKey,
    /// Cached topological order (sources first, destination last).
    order: Vec<UnitKey>,
    ready: Vec<UnitKey>,
    order_dirty: bool,
    /// Input mix of the unit being processed.
    mix: AudioBuffer,
    params: [Block; MAX_PARAMS],
    finished: Vec<UnitKey>,
}

impl AudioContext {
    pub fn new(sample_rate: u32) -> Self {
        let sample_rate = sample_rate.max(1);
        let mut units = SlotMap::with_key();
        let destination = units.insert(Unit::new(UnitKind::Destination, sample_rate));
        Self {
            sample_rate,
            frame: 0,
            units,
            destination,
            order: Vec::with_capacity(256),
            ready: Vec::with_capacity(256),
            order_dirty: true,
            mix: AudioBuffer::new(2, RENDER_QUANTUM, sample_rate),
            params: [[0.0; RENDER_QUANTUM]; MAX_PARAMS],
            finished: Vec::with_capacity(64),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Seconds of audio rendered so far.
    pub fn current_time(&self) -> f64 {
        self.frame as f64 / self.sample_rate as f64
    }

    pub fn current_frame(&self) -> u64 {
        self.frame
    }

    pub fn destination(&self) -> UnitKey {
        self.destination
    }

    /// Number of live units, including the destination.
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn contains(&self, key: UnitKey) -> bool {
        self.units.contains_key(key)
    }

    pub fn kind(&self, key: UnitKey) -> Result<UnitKind, EngineError> {
        Ok(self.unit(key)?.kind)
    }

    // === Construction ===

    /// Create a unit with default settings.
    pub fn create(&mut self, kind: UnitKind) -> UnitKey {
        self.order_dirty = true;
        self.units.insert(Unit::new(kind, self.sample_rate))
    }

    pub fn create_oscillator(&mut self, waveform: Waveform) -> UnitKey {
        let key = self.create(UnitKind::Oscillator);
        if let Some(Unit {
            processor: Processor::Oscillator(osc),
            ..
        }) = self.units.get_mut(key)
        {
            osc.waveform = waveform;
        }
        key
    }

    pub fn create_buffer_source(&mut self, buffer: Arc<AudioBuffer>) -> UnitKey {
        let key = self.create(UnitKind::BufferSource);
        if let Some(Unit {
            processor: Processor::BufferSource(player),
            ..
        }) = self.units.get_mut(key)
        {
            player.buffer = Some(buffer);
        }
        key
    }

    /// Disconnect and drop a unit. The destination is never removed.
    pub fn remove(&mut self, key: UnitKey) -> Result<(), EngineError> {
        if key == self.destination {
            log::debug!("refusing to remove the destination");
            return Ok(());
        }
        self.disconnect(key)?;
        let Some(unit) = self.units.remove(key) else {
            return Err(EngineError::UnknownUnit);
        };
        for src in unit.inputs {
            if let Some(u) = self.units.get_mut(src) {
                remove_first(&mut u.outputs, &Target::Unit(key));
            }
        }
        for (param, src) in unit.param_inputs {
            if let Some(u) = self.units.get_mut(src) {
                remove_first(&mut u.outputs, &Target::Param(key, param));
            }
        }
        self.order_dirty = true;
        Ok(())
    }

    /// Restore a unit's default parameters and clear its internal state.
    /// Connections are left alone.
    pub fn reset_unit(&mut self, key: UnitKey) -> Result<(), EngineError> {
        self.unit_mut(key)?.reset();
        Ok(())
    }

    // === Connections ===

    /// Route `from`'s output into `to`'s input. Repeated connections are
    /// ignored.
    pub fn connect(&mut self, from: UnitKey, to: UnitKey) -> Result<(), EngineError> {
        self.unit(to)?;
        if self.unit(from)?.outputs.contains(&Target::Unit(to)) {
            return Ok(());
        }
        if from == to || self.reaches(to, from) {
            return Err(EngineError::WouldCycle);
        }
        self.unit_mut(from)?.outputs.push(Target::Unit(to));
        self.unit_mut(to)?.inputs.push(from);
        self.order_dirty = true;
        Ok(())
    }

    /// Add `from`'s output (mixed to mono) to parameter `param` of `to`.
    pub fn connect_param(&mut self, from: UnitKey, to: UnitKey, param: ParamId) -> Result<(), EngineError> {
        let target = self.unit(to)?;
        if target.param(param).is_none() {
            return Err(EngineError::ParamNotFound {
                kind: target.kind,
                param,
            });
        }
        if self.unit(from)?.outputs.contains(&Target::Param(to, param)) {
            return Ok(());
        }
        if from == to || self.reaches(to, from) {
            return Err(EngineError::WouldCycle);
        }
        self.unit_mut(from)?.outputs.push(Target::Param(to, param));
        self.unit_mut(to)?.param_inputs.push((param, from));
        self.order_dirty = true;
        Ok(())
    }

    /// Remove every outgoing connection of `from`.
    pub fn disconnect(&mut self, from: UnitKey) -> Result<(), EngineError> {
        let outputs = std::mem::take(&mut self.unit_mut(from)?.outputs);
        for target in &outputs {
            match *target {
                Target::Unit(to) => {
                    if let Some(u) = self.units.get_mut(to) {
                        remove_first(&mut u.inputs, &from);
                    }
                }
                Target::Param(to, param) => {
                    if let Some(u) = self.units.get_mut(to) {
                        remove_first(&mut u.param_inputs, &(param, from));
                    }
                }
            }
        }
        if !outputs.is_empty() {
            self.order_dirty = true;
        }
        // Keep the allocation for the next connections.
        let mut outputs = outputs;
        outputs.clear();
        self.unit_mut(from)?.outputs = outputs;
        Ok(())
    }

    /// Drop every connection into and out of `key`.
    pub fn isolate(&mut self, key: UnitKey) -> Result<(), EngineError> {
        self.disconnect(key)?;
        let unit = self.unit_mut(key)?;
        let mut inputs = std::mem::take(&mut unit.inputs);
        let mut param_inputs = std::mem::take(&mut unit.param_inputs);
        if inputs.is_empty() && param_inputs.is_empty() {
            return Ok(());
        }
        for &src in &inputs {
            if let Some(u) = self.units.get_mut(src) {
                remove_first(&mut u.outputs, &Target::Unit(key));
            }
        }
        for &(param, src) in &param_inputs {
            if let Some(u) = self.units.get_mut(src) {
                remove_first(&mut u.outputs, &Target::Param(key, param));
            }
        }
        inputs.clear();
        param_inputs.clear();
        let unit = self.unit_mut(key)?;
        unit.inputs = inputs;
        unit.param_inputs = param_inputs;
        self.order_dirty = true;
        Ok(())
    }

    /// Audio inputs currently feeding `key`.
    pub fn inputs(&self, key: UnitKey) -> Result<&[UnitKey], EngineError> {
        Ok(&self.unit(key)?.inputs)
    }

    /// Where `key`'s output currently goes.
    pub fn outputs(&self, key: UnitKey) -> Result<&[Target], EngineError> {
        Ok(&self.unit(key)?.outputs)
    }

    /// Depth-first search along outputs.
    fn reaches(&self, from: UnitKey, to: UnitKey) -> bool {
        let mut stack = vec![from];
        let mut seen = Vec::new();
        while let Some(key) = stack.pop() {
            if key == to {
                return true;
            }
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            if let Some(u) = self.units.get(key) {
                for t in &u.outputs {
                    let (Target::Unit(next) | Target::Param(next, _)) = *t;
                    stack.push(next);
                }
            }
        }
        false
    }

    // === Parameters and settings ===

    pub fn param(&self, key: UnitKey, id: ParamId) -> Result<&AudioParam, EngineError> {
        let unit = self.unit(key)?;
        unit.param(id).ok_or(EngineError::ParamNotFound {
            kind: unit.kind,
            param: id,
        })
    }

    pub fn param_mut(&mut self, key: UnitKey, id: ParamId) -> Result<&mut AudioParam, EngineError> {
        let unit = self.unit_mut(key)?;
        let kind = unit.kind;
        unit.param_mut(id)
            .ok_or(EngineError::ParamNotFound { kind, param: id })
    }

    /// Shorthand for `param_mut(key, id)?.set_value(value)`.
    pub fn set_param(&mut self, key: UnitKey, id: ParamId, value: f64) -> Result<(), EngineError> {
        self.param_mut(key, id)?.set_value(value);
        Ok(())
    }

    pub fn set_filter_type(&mut self, key: UnitKey, filter_type: FilterType) -> Result<(), EngineError> {
        match &mut self.unit_mut(key)?.processor {
            Processor::Biquad(b) => {
                b.filter_type = filter_type;
                Ok(())
            }
            _ => Err(self.mismatch(key, UnitKind::BiquadFilter)),
        }
    }

    pub fn filter_type(&self, key: UnitKey) -> Result<FilterType, EngineError> {
        match &self.unit(key)?.processor {
            Processor::Biquad(b) => Ok(b.filter_type),
            _ => Err(self.mismatch(key, UnitKind::BiquadFilter)),
        }
    }

    pub fn set_waveform(&mut self, key: UnitKey, waveform: Waveform) -> Result<(), EngineError> {
        match &mut self.unit_mut(key)?.processor {
            Processor::Oscillator(osc) => {
                osc.waveform = waveform;
                Ok(())
            }
            _ => Err(self.mismatch(key, UnitKind::Oscillator)),
        }
    }

    /// Set or clear a wave shaper's transfer curve.
    pub fn set_curve(&mut self, key: UnitKey, curve: Option<Arc<[f32]>>) -> Result<(), EngineError> {
        match &mut self.unit_mut(key)?.processor {
            Processor::WaveShaper(w) => {
                w.curve = curve;
                Ok(())
            }
            _ => Err(self.mismatch(key, UnitKind::WaveShaper)),
        }
    }

    pub fn curve(&self, key: UnitKey) -> Result<Option<Arc<[f32]>>, EngineError> {
        match &self.unit(key)?.processor {
            Processor::WaveShaper(w) => Ok(w.curve.clone()),
            _ => Err(self.mismatch(key, UnitKind::WaveShaper)),
        }
    }

    pub fn set_oversample(&mut self, key: UnitKey, oversample: Oversample) -> Result<(), EngineError> {
        match &mut self.unit_mut(key)?.processor {
            Processor::WaveShaper(w) => {
                w.oversample = oversample;
                Ok(())
            }
            _ => Err(self.mismatch(key, UnitKind::WaveShaper)),
        }
    }

    pub fn oversample(&self, key: UnitKey) -> Result<Oversample, EngineError> {
        match &self.unit(key)?.processor {
            Processor::WaveShaper(w) => Ok(w.oversample),
            _ => Err(self.mismatch(key, UnitKind::WaveShaper)),
        }
    }

    /// Latest levels of an analyser unit.
    pub fn meter(&self, key: UnitKey) -> Result<Meter, EngineError> {
        match &self.unit(key)?.processor {
            Processor::Analyser(a) => Ok(Meter {
                peak: a.peak,
                rms: a.rms,
            }),
            _ => Err(self.mismatch(key, UnitKind::Analyser)),
        }
    }

    /// Copy an analyser's recent mono history into `out`.
    pub fn time_domain(&self, key: UnitKey, out: &mut [f32]) -> Result<(), EngineError> {
        match &self.unit(key)?.processor {
            Processor::Analyser(a) => {
                a.time_domain(out);
                Ok(())
            }
            _ => Err(self.mismatch(key, UnitKind::Analyser)),
        }
    }

    // === Scheduled sources ===

    /// Schedule a source to start at `when` seconds. A time in the past
    /// starts it at the next rendered frame.
    pub fn start(&mut self, key: UnitKey, when: f64) -> Result<(), EngineError> {
        let now = self.frame;
        let sr = self.sample_rate as f64;
        let unit = self.unit_mut(key)?;
        if !unit.kind.is_source() {
            return Err(EngineError::NotASource);
        }
        if unit.schedule.start.is_some() {
            return Err(EngineError::SourceAlreadyStarted);
        }
        unit.schedule.start = Some(seconds_to_frame(when, sr).max(now));
        Ok(())
    }

    /// Schedule a started source to stop at `when` seconds. A later call
    /// replaces the earlier stop time.
    pub fn stop(&mut self, key: UnitKey, when: f64) -> Result<(), EngineError> {
        let sr = self.sample_rate as f64;
        let unit = self.unit_mut(key)?;
        if !unit.kind.is_source() {
            return Err(EngineError::NotASource);
        }
        let Some(start) = unit.schedule.start else {
            return Err(EngineError::SourceNotStarted);
        };
        unit.schedule.stop = Some(seconds_to_frame(when, sr).max(start));
        Ok(())
    }

    // === Rendering ===

    /// The destination's output for the last rendered quantum.
    pub fn output(&self) -> &AudioBuffer {
        &self.units[self.destination].output
    }

    /// Render one quantum, advance the clock and drop finished sources.
    pub fn render_quantum(&mut self) {
        if self.order_dirty {
            self.rebuild_order();
        }
        let sr = self.sample_rate as f64;
        let inv_rate = 1.0 / sr;
        let q = Quantum {
            sample_rate: sr,
            frame0: self.frame,
        };
        let t0 = self.current_time();

        let Self {
            units,
            order,
            mix,
            params,
            ..
        } = self;

        for &key in order.iter() {
            let Some(unit) = units.get_mut(key) else {
                continue;
            };
            for (j, (_, p)) in unit.params.iter_mut().enumerate() {
                p.render(t0, inv_rate, &mut params[j]);
            }

            let Some(unit) = units.get(key) else {
                continue;
            };
            mix.silence();
            let mut input_active = false;
            for &src in &unit.inputs {
                if let Some(s) = units.get(src) {
                    if s.active {
                        mix.mix_from(&s.output);
                        input_active = true;
                    }
                }
            }
            for &(param, src) in &unit.param_inputs {
                let (Some(j), Some(s)) = (unit.param_index(param), units.get(src)) else {
                    continue;
                };
                if !s.active {
                    continue;
                }
                let p = &unit.params[j].1;
                let (l, r) = (s.output.channel(0), s.output.channel(1));
                for i in 0..RENDER_QUANTUM {
                    let v = params[j][i] as f64 + 0.5 * (l[i] + r[i]) as f64;
                    params[j][i] = p.clamp(v) as f32;
                }
            }

            if let Some(unit) = units.get_mut(key) {
                unit.process(q, mix, params, input_active);
            }
        }

        self.frame += RENDER_QUANTUM as u64;
        self.reap_finished();
    }

    /// Render `frames` frames into a new stereo buffer.
    pub fn render(&mut self, frames: usize) -> AudioBuffer {
        let mut out = AudioBuffer::new(2, frames, self.sample_rate);
        let mut offset = 0;
        while offset < frames {
            self.render_quantum();
            out.write_at(offset, self.output());
            offset += RENDER_QUANTUM;
        }
        out
    }

    /// Remove sources whose stop time has passed. Returns how many went.
    pub fn reap_finished(&mut self) -> usize {
        self.finished.clear();
        let frame = self.frame;
        for (key, unit) in &self.units {
            if unit.is_finished(frame) {
                self.finished.push(key);
            }
        }
        self.remove_collected()
    }

    /// Remove sources that were created but never started. Nothing else
    /// would ever reap them.
    pub fn discard_unstarted(&mut self) -> usize {
        self.finished.clear();
        for (key, unit) in &self.units {
            if unit.kind.is_source() && unit.schedule.start.is_none() {
                self.finished.push(key);
            }
        }
        self.remove_collected()
    }

    fn remove_collected(&mut self) -> usize {
        let count = self.finished.len();
        for i in 0..count {
            let key = self.finished[i];
            if let Err(e) = self.remove(key) {
                log::debug!("removing source failed: {}", e);
            }
        }
        count
    }

    fn rebuild_order(&mut self) {
        self.order.clear();
        self.ready.clear();
        for (key, unit) in self.units.iter_mut() {
            unit.pending = (unit.inputs.len() + unit.param_inputs.len()) as u32;
            if unit.pending == 0 {
                self.ready.push(key);
            }
        }
        while let Some(key) = self.ready.pop() {
            self.order.push(key);
            let fanout = self.units.get(key).map_or(0, |u| u.outputs.len());
            for i in 0..fanout {
                let (Target::Unit(next) | Target::Param(next, _)) = self.units[key].outputs[i];
                if let Some(u) = self.units.get_mut(next) {
                    u.pending = u.pending.saturating_sub(1);
                    if u.pending == 0 {
                        self.ready.push(next);
                    }
                }
            }
        }
        self.order_dirty = false;
    }

    fn unit(&self, key: UnitKey) -> Result<&Unit, EngineError> {
        self.units.get(key).ok_or(EngineError::UnknownUnit)
    }

    fn unit_mut(&mut self, key: UnitKey) -> Result<&mut Unit, EngineError> {
        self.units.get_mut(key).ok_or(EngineError::UnknownUnit)
    }

    fn mismatch(&self, key: UnitKey, expected: UnitKind) -> EngineError {
        match self.units.get(key) {
            Some(u) => EngineError::KindMismatch {
                expected,
                found: u.kind,
            },
            None => EngineError::UnknownUnit,
        }
    }
}

fn seconds_to_frame(seconds: f64, sample_rate: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * sample_rate).round() as u64
    } else {
        0
    }
}

fn remove_first<T: PartialEq>(items: &mut Vec<T>, item: &T) {
    if let Some(pos) = items.iter().position(|x| x == item) {
        items.swap_remove(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 48000;

    fn osc_into_destination(ctx: &mut AudioContext) -> (UnitKey, UnitKey) {
        let osc = ctx.create_oscillator(Waveform::Square);
        let gain = ctx.create(UnitKind::Gain);
        ctx.connect(osc, gain).unwrap();
        ctx.connect(gain, ctx.destination()).unwrap();
        (osc, gain)
    }

    // === Clock ===

    #[test]
    fn clock_advances_per_quantum() {
        let mut ctx = AudioContext::new(SR);
        assert_eq!(ctx.current_time(), 0.0);
        ctx.render_quantum();
        assert_eq!(ctx.current_frame(), RENDER_QUANTUM as u64);
        assert!((ctx.current_time() - RENDER_QUANTUM as f64 / SR as f64).abs() < 1e-12);
    }

    #[test]
    fn render_length_is_exact() {
        let mut ctx = AudioContext::new(SR);
        let out = ctx.render(1000);
        assert_eq!(out.frames(), 1000);
        assert!(out.is_silent());
    }

    // === Connections ===

    #[test]
    fn cycles_are_rejected() {
        let mut ctx = AudioContext::new(SR);
        let a = ctx.create(UnitKind::Gain);
        let b = ctx.create(UnitKind::Gain);
        ctx.connect(a, b).unwrap();
        assert_eq!(ctx.connect(b, a), Err(EngineError::WouldCycle));
        assert_eq!(ctx.connect(a, a), Err(EngineError::WouldCycle));
        assert_eq!(ctx.connect_param(b, a, ParamId::Gain), Err(EngineError::WouldCycle));
    }

    #[test]
    fn duplicate_connection_is_ignored() {
        let mut ctx = AudioContext::new(SR);
        let a = ctx.create(UnitKind::Gain);
        let b = ctx.create(UnitKind::Gain);
        ctx.connect(a, b).unwrap();
        ctx.connect(a, b).unwrap();
        assert_eq!(ctx.inputs(b).unwrap().len(), 1);
    }

    #[test]
    fn missing_param_is_an_error() {
        let mut ctx = AudioContext::new(SR);
        let lfo = ctx.create_oscillator(Waveform::Sine);
        let g = ctx.create(UnitKind::Gain);
        assert_eq!(
            ctx.connect_param(lfo, g, ParamId::Frequency),
            Err(EngineError::ParamNotFound {
                kind: UnitKind::Gain,
                param: ParamId::Frequency
            })
        );
    }

    #[test]
    fn disconnect_clears_both_sides() {
        let mut ctx = AudioContext::new(SR);
        let (osc, gain) = osc_into_destination(&mut ctx);
        ctx.disconnect(gain).unwrap();
        assert!(ctx.outputs(gain).unwrap().is_empty());
        assert!(ctx.inputs(ctx.destination()).unwrap().is_empty());
        assert_eq!(ctx.inputs(gain).unwrap(), &[osc]);
    }

    #[test]
    fn stale_handles_error() {
        let mut ctx = AudioContext::new(SR);
        let g = ctx.create(UnitKind::Gain);
        ctx.remove(g).unwrap();
        assert_eq!(ctx.remove(g), Err(EngineError::UnknownUnit));
        assert_eq!(ctx.set_param(g, ParamId::Gain, 0.5), Err(EngineError::UnknownUnit));
        assert!(ctx.connect(g, ctx.destination()).is_err());
    }

    #[test]
    fn typed_setters_check_kind() {
        let mut ctx = AudioContext::new(SR);
        let g = ctx.create(UnitKind::Gain);
        assert_eq!(
            ctx.set_filter_type(g, FilterType::Highpass),
            Err(EngineError::KindMismatch {
                expected: UnitKind::BiquadFilter,
                found: UnitKind::Gain
            })
        );
    }

    // === Sources ===

    #[test]
    fn second_start_fails() {
        let mut ctx = AudioContext::new(SR);
        let osc = ctx.create_oscillator(Waveform::Sine);
        ctx.start(osc, 0.0).unwrap();
        assert_eq!(ctx.start(osc, 0.1), Err(EngineError::SourceAlreadyStarted));
    }

    #[test]
    fn stop_before_start_fails() {
        let mut ctx = AudioContext::new(SR);
        let osc = ctx.create_oscillator(Waveform::Sine);
        assert_eq!(ctx.stop(osc, 1.0), Err(EngineError::SourceNotStarted));
        let g = ctx.create(UnitKind::Gain);
        assert_eq!(ctx.start(g, 0.0), Err(EngineError::NotASource));
    }

    #[test]
    fn source_sounds_only_between_start_and_stop() {
        let mut ctx = AudioContext::new(SR);
        let (osc, _) = osc_into_destination(&mut ctx);
        let q = RENDER_QUANTUM as f64 / SR as f64;
        ctx.start(osc, 2.0 * q).unwrap();
        ctx.stop(osc, 4.0 * q).unwrap();
        let out = ctx.render(6 * RENDER_QUANTUM);
        let quantum_peak = |n: usize| {
            out.channel(0)[n * RENDER_QUANTUM..(n + 1) * RENDER_QUANTUM]
                .iter()
                .fold(0.0f32, |m, s| m.max(s.abs()))
        };
        assert_eq!(quantum_peak(0), 0.0);
        assert_eq!(quantum_peak(1), 0.0);
        assert!(quantum_peak(2) > 0.5);
        assert!(quantum_peak(3) > 0.5);
        assert_eq!(quantum_peak(4), 0.0);
    }

    #[test]
    fn finished_sources_are_reaped() {
        let mut ctx = AudioContext::new(SR);
        let (osc, gain) = osc_into_destination(&mut ctx);
        ctx.start(osc, 0.0).unwrap();
        ctx.stop(osc, 0.001).unwrap();
        let before = ctx.unit_count();
        ctx.render(RENDER_QUANTUM * 2);
        assert!(!ctx.contains(osc));
        assert_eq!(ctx.unit_count(), before - 1);
        assert!(ctx.inputs(gain).unwrap().is_empty());
    }

    #[test]
    fn unstarted_sources_are_discarded() {
        let mut ctx = AudioContext::new(SR);
        let (started, _) = osc_into_destination(&mut ctx);
        ctx.start(started, 0.0).unwrap();
        let (idle, gain) = osc_into_destination(&mut ctx);
        let before = ctx.unit_count();
        assert_eq!(ctx.discard_unstarted(), 1);
        assert!(!ctx.contains(idle));
        assert!(ctx.contains(started));
        assert!(ctx.contains(gain));
        assert_eq!(ctx.unit_count(), before - 1);
        assert_eq!(ctx.discard_unstarted(), 0);
    }

    #[test]
    fn past_start_plays_immediately() {
        let mut ctx = AudioContext::new(SR);
        ctx.render(RENDER_QUANTUM * 4);
        let (osc, _) = osc_into_destination(&mut ctx);
        ctx.start(osc, 0.0).unwrap();
        ctx.render_quantum();
        assert!(ctx.output().peak() > 0.5);
    }

    // === Processing ===

    #[test]
    fn gain_automation_applies() {
        let mut ctx = AudioContext::new(SR);
        let (osc, gain) = osc_into_destination(&mut ctx);
        ctx.start(osc, 0.0).unwrap();
        ctx.set_param(gain, ParamId::Gain, 0.25).unwrap();
        ctx.render_quantum();
        let peak = ctx.output().peak();
        assert!(peak > 0.2 && peak <= 0.26, "peak {}", peak);
    }

    #[test]
    fn param_modulation_adds_to_value() {
        let mut ctx = AudioContext::new(SR);
        let src = ctx.create_buffer_source(Arc::new(AudioBuffer::from_planes(
            vec![vec![0.5; 4 * RENDER_QUANTUM]],
            SR,
        )));
        let carrier = ctx.create_buffer_source(Arc::new(AudioBuffer::from_planes(
            vec![vec![1.0; 4 * RENDER_QUANTUM]],
            SR,
        )));
        let vca = ctx.create(UnitKind::Gain);
        ctx.set_param(vca, ParamId::Gain, 0.0).unwrap();
        ctx.connect(carrier, vca).unwrap();
        ctx.connect_param(src, vca, ParamId::Gain).unwrap();
        ctx.connect(vca, ctx.destination()).unwrap();
        ctx.start(src, 0.0).unwrap();
        ctx.start(carrier, 0.0).unwrap();
        ctx.render_quantum();
        assert!((ctx.output().channel(0)[10] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn idle_units_output_silence() {
        let mut ctx = AudioContext::new(SR);
        let (osc, gain) = osc_into_destination(&mut ctx);
        let filter = ctx.create(UnitKind::BiquadFilter);
        ctx.disconnect(gain).unwrap();
        ctx.connect(gain, filter).unwrap();
        ctx.connect(filter, ctx.destination()).unwrap();
        ctx.start(osc, 0.0).unwrap();
        ctx.stop(osc, 0.01).unwrap();
        ctx.render(SR as usize / 10);
        assert!(ctx.output().is_silent());
    }

    #[test]
    fn analyser_meters_signal() {
        let mut ctx = AudioContext::new(SR);
        let (osc, gain) = osc_into_destination(&mut ctx);
        let tap = ctx.create(UnitKind::Analyser);
        ctx.connect(gain, tap).unwrap();
        ctx.start(osc, 0.0).unwrap();
        ctx.render_quantum();
        let m = ctx.meter(tap).unwrap();
        assert!(m.peak > 0.5);
        assert!(m.rms > 0.5);
    }
}
