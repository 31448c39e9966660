//! Per-track insert effects built from graph units.
//!
//! Each [`EffectChain`] realises one [`Effect`] record as a small, persistent
//! sub-graph with a single input and a single output. Units are taken from
//! the pool when the chain is built and returned when it is torn down;
//! modulation oscillators are removed outright.

use arrayvec::ArrayVec;
use bg_ir::{clamp, Effect, Waveform};

use crate::caches::SynthCaches;
use crate::error::EngineError;
use crate::graph::{AudioContext, FilterType, ParamId, UnitKey, UnitKind};
use crate::pool::ResourcePool;

/// Centre delay of the chorus, seconds.
pub const CHORUS_DELAY: f64 = 0.025;
/// Delay swing of the chorus at full depth, seconds.
pub const CHORUS_RANGE: f64 = 0.005;
pub const FLANGER_DELAY: f64 = 0.005;
pub const FLANGER_RANGE: f64 = 0.004;
/// Allpass centre frequency of the phaser, Hz.
pub const PHASER_CENTER: f64 = 1000.0;
/// Allpass frequency swing of the phaser at full depth, Hz.
pub const PHASER_RANGE: f64 = 800.0;
pub const PHASER_STAGES: usize = 4;
const PHASER_Q: f64 = 0.7;
pub const EQ_LOW_FREQ: f64 = 250.0;
pub const EQ_MID_FREQ: f64 = 1000.0;
pub const EQ_HIGH_FREQ: f64 = 4000.0;

const MAX_UNITS: usize = 10;

/// Dry and wet gains around a processing core.
#[derive(Clone, Copy, Debug)]
struct Blend {
    dry: UnitKey,
    wet: UnitKey,
}

/// Units of one built effect.
pub struct EffectChain {
    effect: Effect,
    input: UnitKey,
    output: UnitKey,
    /// Every pooled or created unit, for teardown.
    units: ArrayVec<UnitKey, MAX_UNITS>,
    /// Delay, reverb, filters or shaper, in signal order.
    core: ArrayVec<UnitKey, PHASER_STAGES>,
    blend: Option<Blend>,
    lfo: Option<UnitKey>,
    /// Scales the LFO into the modulated parameter.
    depth: Option<UnitKey>,
}

impl EffectChain {
    /// Build the units for `effect`. On error, everything acquired so far
    /// is handed back before returning.
    pub fn build(
        ctx: &mut AudioContext,
        pool: &mut ResourcePool,
        caches: &mut SynthCaches,
        effect: &Effect,
    ) -> Result<Self, EngineError> {
        let mut chain = Self {
            effect: *effect,
            input: ctx.destination(),
            output: ctx.destination(),
            units: ArrayVec::new(),
            core: ArrayVec::new(),
            blend: None,
            lfo: None,
            depth: None,
        };
        if let Err(e) = chain.assemble(ctx, pool, caches) {
            chain.teardown(ctx, pool);
            return Err(e);
        }
        Ok(chain)
    }

    fn take(&mut self, ctx: &mut AudioContext, pool: &mut ResourcePool, kind: UnitKind) -> UnitKey {
        let key = pool.acquire(ctx, kind);
        self.units.push(key);
        key
    }

    fn filter(
        &mut self,
        ctx: &mut AudioContext,
        pool: &mut ResourcePool,
        filter_type: FilterType,
        frequency: f64,
    ) -> Result<UnitKey, EngineError> {
        let key = self.take(ctx, pool, UnitKind::BiquadFilter);
        ctx.set_filter_type(key, filter_type)?;
        ctx.set_param(key, ParamId::Frequency, frequency)?;
        self.core.push(key);
        Ok(key)
    }

    /// input -> dry -> output, and wet -> output. The caller routes the
    /// core from input into wet.
    fn blend(&mut self, ctx: &mut AudioContext, pool: &mut ResourcePool) -> Result<Blend, EngineError> {
        self.input = self.take(ctx, pool, UnitKind::Gain);
        self.output = self.take(ctx, pool, UnitKind::Gain);
        let dry = self.take(ctx, pool, UnitKind::Gain);
        let wet = self.take(ctx, pool, UnitKind::Gain);
        ctx.connect(self.input, dry)?;
        ctx.connect(dry, self.output)?;
        ctx.connect(wet, self.output)?;
        let blend = Blend { dry, wet };
        self.blend = Some(blend);
        Ok(blend)
    }

    /// Sine LFO whose scaled output modulates `param` on every target.
    fn modulate(
        &mut self,
        ctx: &mut AudioContext,
        pool: &mut ResourcePool,
        targets: &[UnitKey],
        param: ParamId,
    ) -> Result<(), EngineError> {
        let lfo = ctx.create_oscillator(Waveform::Sine);
        self.lfo = Some(lfo);
        let depth = self.take(ctx, pool, UnitKind::Gain);
        self.depth = Some(depth);
        ctx.connect(lfo, depth)?;
        for &target in targets {
            ctx.connect_param(depth, target, param)?;
        }
        ctx.start(lfo, ctx.current_time())
    }

    fn assemble(
        &mut self,
        ctx: &mut AudioContext,
        pool: &mut ResourcePool,
        caches: &mut SynthCaches,
    ) -> Result<(), EngineError> {
        match self.effect {
            Effect::Gain { .. } => {
                let g = self.take(ctx, pool, UnitKind::Gain);
                self.input = g;
                self.output = g;
            }
            Effect::Delay { .. } | Effect::Chorus { .. } | Effect::Flanger { .. } => {
                let blend = self.blend(ctx, pool)?;
                let delay = self.take(ctx, pool, UnitKind::Delay);
                self.core.push(delay);
                ctx.connect(self.input, delay)?;
                ctx.connect(delay, blend.wet)?;
                if !matches!(self.effect, Effect::Delay { .. }) {
                    self.modulate(ctx, pool, &[delay], ParamId::DelayTime)?;
                }
            }
            Effect::Reverb { .. } => {
                let blend = self.blend(ctx, pool)?;
                let reverb = self.take(ctx, pool, UnitKind::Reverb);
                self.core.push(reverb);
                ctx.connect(self.input, reverb)?;
                ctx.connect(reverb, blend.wet)?;
            }
            Effect::Phaser { .. } => {
                let blend = self.blend(ctx, pool)?;
                let mut prev = self.input;
                for _ in 0..PHASER_STAGES {
                    let stage = self.filter(ctx, pool, FilterType::Allpass, PHASER_CENTER)?;
                    ctx.set_param(stage, ParamId::Q, PHASER_Q)?;
                    ctx.connect(prev, stage)?;
                    prev = stage;
                }
                ctx.connect(prev, blend.wet)?;
                let stages = self.core.clone();
                self.modulate(ctx, pool, &stages, ParamId::Frequency)?;
            }
            Effect::Distortion { .. } => {
                let shaper = self.take(ctx, pool, UnitKind::WaveShaper);
                self.core.push(shaper);
                let tone = self.filter(ctx, pool, FilterType::Lowpass, 6000.0)?;
                let out = self.take(ctx, pool, UnitKind::Gain);
                ctx.connect(shaper, tone)?;
                ctx.connect(tone, out)?;
                self.input = shaper;
                self.output = out;
            }
            Effect::Eq3 { .. } => {
                let low = self.filter(ctx, pool, FilterType::Lowshelf, EQ_LOW_FREQ)?;
                let mid = self.filter(ctx, pool, FilterType::Peaking, EQ_MID_FREQ)?;
                let high = self.filter(ctx, pool, FilterType::Highshelf, EQ_HIGH_FREQ)?;
                ctx.connect(low, mid)?;
                ctx.connect(mid, high)?;
                self.input = low;
                self.output = high;
            }
        }
        let effect = self.effect;
        self.apply(ctx, caches, &effect)
    }

    /// Push the control values of `effect` into the units.
    fn apply(&mut self, ctx: &mut AudioContext, caches: &mut SynthCaches, effect: &Effect) -> Result<(), EngineError> {
        let mix = |ctx: &mut AudioContext, blend: Option<Blend>, mix: f64| -> Result<(), EngineError> {
            if let Some(b) = blend {
                let mix = clamp(mix, 0.0, 1.0);
                ctx.set_param(b.dry, ParamId::Gain, 1.0 - mix)?;
                ctx.set_param(b.wet, ParamId::Gain, mix)?;
            }
            Ok(())
        };
        match *effect {
            Effect::Gain { gain } => ctx.set_param(self.input, ParamId::Gain, clamp(gain, 0.0, 4.0))?,
            Effect::Delay { time, feedback, mix: m } => {
                let delay = self.core[0];
                ctx.set_param(delay, ParamId::DelayTime, clamp(time, 0.01, 2.0))?;
                ctx.set_param(delay, ParamId::Feedback, clamp(feedback, 0.0, 0.95))?;
                mix(ctx, self.blend, m)?;
            }
            Effect::Reverb { room_size, damping, mix: m } => {
                let reverb = self.core[0];
                ctx.set_param(reverb, ParamId::RoomSize, clamp(room_size, 0.0, 1.0))?;
                ctx.set_param(reverb, ParamId::Damping, clamp(damping, 0.0, 1.0))?;
                mix(ctx, self.blend, m)?;
            }
            Effect::Chorus { rate, depth, mix: m } => {
                self.set_modulation(ctx, CHORUS_DELAY, CHORUS_RANGE, rate, depth)?;
                mix(ctx, self.blend, m)?;
            }
            Effect::Flanger { rate, depth, feedback, mix: m } => {
                self.set_modulation(ctx, FLANGER_DELAY, FLANGER_RANGE, rate, depth)?;
                ctx.set_param(self.core[0], ParamId::Feedback, clamp(feedback, 0.0, 0.95))?;
                mix(ctx, self.blend, m)?;
            }
            Effect::Phaser { rate, depth, mix: m } => {
                self.set_lfo(ctx, rate, clamp(depth, 0.0, 1.0) * PHASER_RANGE)?;
                mix(ctx, self.blend, m)?;
            }
            Effect::Distortion { amount, tone, output } => {
                let curve = caches.saturation_curve(clamp(amount, 0.0, 1.0));
                ctx.set_curve(self.input, Some(curve))?;
                ctx.set_param(self.core[1], ParamId::Frequency, clamp(tone, 200.0, 20_000.0))?;
                ctx.set_param(self.output, ParamId::Gain, clamp(output, 0.0, 2.0))?;
            }
            Effect::Eq3 { low, mid, high } => {
                for (&band, gain) in self.core.iter().zip([low, mid, high]) {
                    ctx.set_param(band, ParamId::FilterGain, clamp(gain, -24.0, 24.0))?;
                }
            }
        }
        self.effect = *effect;
        Ok(())
    }

    fn set_modulation(
        &mut self,
        ctx: &mut AudioContext,
        centre: f64,
        range: f64,
        rate: f64,
        depth: f64,
    ) -> Result<(), EngineError> {
        ctx.set_param(self.core[0], ParamId::DelayTime, centre)?;
        self.set_lfo(ctx, rate, clamp(depth, 0.0, 1.0) * range)
    }

    fn set_lfo(&mut self, ctx: &mut AudioContext, rate: f64, amount: f64) -> Result<(), EngineError> {
        if let (Some(lfo), Some(depth)) = (self.lfo, self.depth) {
            ctx.set_param(lfo, ParamId::Frequency, clamp(rate, 0.05, 10.0))?;
            ctx.set_param(depth, ParamId::Gain, amount)?;
        }
        Ok(())
    }

    /// Update control values in place. Returns `false` when `effect` is a
    /// different kind and the chain must be rebuilt.
    pub fn update(
        &mut self,
        ctx: &mut AudioContext,
        caches: &mut SynthCaches,
        effect: &Effect,
    ) -> Result<bool, EngineError> {
        if effect.kind() != self.effect.kind() {
            return Ok(false);
        }
        if *effect != self.effect {
            self.apply(ctx, caches, effect)?;
        }
        Ok(true)
    }

    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    pub fn input(&self) -> UnitKey {
        self.input
    }

    pub fn output(&self) -> UnitKey {
        self.output
    }

    /// Units held by the chain, LFO excluded.
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Return every unit to the pool and remove the LFO.
    pub fn teardown(self, ctx: &mut AudioContext, pool: &mut ResourcePool) {
        if let Some(lfo) = self.lfo {
            if let Err(e) = ctx.remove(lfo) {
                log::debug!("removing effect LFO failed: {}", e);
            }
        }
        for key in self.units {
            pool.release(ctx, key);
        }
    }
}
