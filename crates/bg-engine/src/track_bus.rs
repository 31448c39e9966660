//! Persistent per-track signal path.
//!
//! ```text
//! voices -> volume -> effect 1 -> ... -> effect N -> panner -> meter -> master
//! ```

use bg_ir::{clamp, Track, TrackId, MAX_TRACK_VOLUME};

use crate::caches::SynthCaches;
use crate::effects::EffectChain;
use crate::error::EngineError;
use crate::graph::{AudioContext, Meter, ParamId, UnitKey, UnitKind};
use crate::pool::ResourcePool;

/// Mixer strip for one track. Voices connect into [`input`](Self::input).
pub struct TrackBus {
    id: TrackId,
    input: UnitKey,
    panner: UnitKey,
    meter: UnitKey,
    effects: Vec<EffectChain>,
    volume: f64,
    pan: f64,
}

impl TrackBus {
    /// Build the strip for `track` and connect it into `output`. Volume
    /// and pan are set without smoothing.
    ///
    /// Effects that fail to build are left out with a warning.
    pub fn build(
        ctx: &mut AudioContext,
        pool: &mut ResourcePool,
        caches: &mut SynthCaches,
        track: &Track,
        output: UnitKey,
    ) -> Result<Self, EngineError> {
        let input = pool.acquire(ctx, UnitKind::Gain);
        let panner = pool.acquire(ctx, UnitKind::StereoPanner);
        let meter = pool.acquire(ctx, UnitKind::Analyser);
        let mut bus = Self {
            id: track.id,
            input,
            panner,
            meter,
            effects: Vec::with_capacity(track.effects.len()),
            volume: clamp(track.volume, 0.0, MAX_TRACK_VOLUME),
            pan: clamp(track.pan, -1.0, 1.0),
        };
        if let Err(e) = bus.wire_outlet(ctx, output) {
            bus.teardown(ctx, pool);
            return Err(e);
        }
        for effect in &track.effects {
            match EffectChain::build(ctx, pool, caches, effect) {
                Ok(chain) => bus.effects.push(chain),
                Err(e) => log::warn!("track {:?}: skipping {:?} effect: {}", track.id, effect.kind(), e),
            }
        }
        if let Err(e) = bus.rewire(ctx) {
            bus.teardown(ctx, pool);
            return Err(e);
        }
        Ok(bus)
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    /// Where voices connect.
    pub fn input(&self) -> UnitKey {
        self.input
    }

    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    fn wire_outlet(&self, ctx: &mut AudioContext, output: UnitKey) -> Result<(), EngineError> {
        ctx.set_param(self.input, ParamId::Gain, self.volume)?;
        ctx.set_param(self.panner, ParamId::Pan, self.pan)?;
        ctx.connect(self.panner, self.meter)?;
        ctx.connect(self.meter, output)
    }

    /// Chain input -> effects -> panner.
    fn rewire(&mut self, ctx: &mut AudioContext) -> Result<(), EngineError> {
        ctx.disconnect(self.input)?;
        let mut prev = self.input;
        for chain in &self.effects {
            ctx.disconnect(chain.output())?;
            ctx.connect(prev, chain.input())?;
            prev = chain.output();
        }
        ctx.connect(prev, self.panner)
    }

    /// Move the volume to `volume` over `smoothing` seconds.
    pub fn set_volume(&mut self, ctx: &mut AudioContext, volume: f64, smoothing: f64) -> Result<(), EngineError> {
        let volume = clamp(volume, 0.0, MAX_TRACK_VOLUME);
        let now = ctx.current_time();
        ctx.param_mut(self.input, ParamId::Gain)?.ramp_to(volume, now, smoothing);
        self.volume = volume;
        Ok(())
    }

    pub fn set_pan(&mut self, ctx: &mut AudioContext, pan: f64, smoothing: f64) -> Result<(), EngineError> {
        let pan = clamp(pan, -1.0, 1.0);
        let now = ctx.current_time();
        ctx.param_mut(self.panner, ParamId::Pan)?.ramp_to(pan, now, smoothing);
        self.pan = pan;
        Ok(())
    }

    /// Bring volume, pan and effects in line with `track`.
    ///
    /// Effects of the same kind in the same slot are updated in place;
    /// anything else in that slot is torn down and rebuilt.
    pub fn sync(
        &mut self,
        ctx: &mut AudioContext,
        pool: &mut ResourcePool,
        caches: &mut SynthCaches,
        track: &Track,
        smoothing: f64,
    ) -> Result<(), EngineError> {
        if track.volume != self.volume {
            self.set_volume(ctx, track.volume, smoothing)?;
        }
        if track.pan != self.pan {
            self.set_pan(ctx, track.pan, smoothing)?;
        }

        let mut rewire = false;
        while self.effects.len() > track.effects.len() {
            if let Some(chain) = self.effects.pop() {
                chain.teardown(ctx, pool);
            }
            rewire = true;
        }
        for (i, effect) in track.effects.iter().enumerate() {
            if let Some(chain) = self.effects.get_mut(i) {
                if chain.update(ctx, caches, effect)? {
                    continue;
                }
            }
            let built = match EffectChain::build(ctx, pool, caches, effect) {
                Ok(chain) => chain,
                Err(e) => {
                    log::warn!("track {:?}: skipping {:?} effect: {}", self.id, effect.kind(), e);
                    continue;
                }
            };
            if i < self.effects.len() {
                let old = std::mem::replace(&mut self.effects[i], built);
                old.teardown(ctx, pool);
            } else {
                self.effects.push(built);
            }
            rewire = true;
        }
        if rewire {
            self.rewire(ctx)?;
        }
        Ok(())
    }

    /// Post-fader level over the last rendered quantum.
    pub fn meter(&self, ctx: &AudioContext) -> Meter {
        ctx.meter(self.meter).unwrap_or_default()
    }

    /// Return every unit to the pool.
    pub fn teardown(self, ctx: &mut AudioContext, pool: &mut ResourcePool) {
        for chain in self.effects {
            chain.teardown(ctx, pool);
        }
        pool.release(ctx, self.input);
        pool.release(ctx, self.panner);
        pool.release(ctx, self.meter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bg_ir::{AudioBuffer, Effect, EffectKind, GeneratorKind};
    use std::sync::Arc;

    const SR: u32 = 48000;

    struct Rig {
        ctx: AudioContext,
        pool: ResourcePool,
        caches: SynthCaches,
    }

    fn rig() -> Rig {
        Rig {
            ctx: AudioContext::new(SR),
            pool: ResourcePool::new(),
            caches: SynthCaches::new(SR, 7),
        }
    }

    fn track() -> Track {
        Track::new(TrackId(1), "Bass", GeneratorKind::Bass, 16)
    }

    fn build(r: &mut Rig, track: &Track) -> TrackBus {
        let dest = r.ctx.destination();
        TrackBus::build(&mut r.ctx, &mut r.pool, &mut r.caches, track, dest).unwrap()
    }

    fn feed(r: &mut Rig, bus: &TrackBus, level: f32, frames: usize) {
        let dc = Arc::new(AudioBuffer::from_planes(vec![vec![level; frames]], SR));
        let src = r.ctx.create_buffer_source(dc);
        r.ctx.connect(src, bus.input()).unwrap();
        r.ctx.start(src, 0.0).unwrap();
    }

    #[test]
    fn volume_scales_and_meter_reads() {
        let mut r = rig();
        let mut t = track();
        t.volume = 0.5;
        let bus = build(&mut r, &t);
        feed(&mut r, &bus, 0.8, 512);
        let out = r.ctx.render(256);
        // Centre pan of identical channels: each side keeps its own signal.
        assert!((out.sample(0, 200) - 0.4).abs() < 1e-3);
        let m = bus.meter(&r.ctx);
        assert!(m.peak > 0.35);
    }

    #[test]
    fn hard_pan_moves_signal() {
        let mut r = rig();
        let mut t = track();
        t.pan = 1.0;
        let bus = build(&mut r, &t);
        feed(&mut r, &bus, 0.5, 512);
        let out = r.ctx.render(256);
        assert!(out.sample(0, 100).abs() < 1e-4);
        assert!(out.sample(1, 100) > 0.9);
    }

    #[test]
    fn sync_rebuilds_only_changed_slots() {
        let mut r = rig();
        let mut t = track();
        t.effects.push(EffectKind::Delay.default_effect());
        t.effects.push(EffectKind::Eq3.default_effect());
        let mut bus = build(&mut r, &t);
        assert_eq!(bus.effect_count(), 2);
        let delay_input = bus.effects[0].input();

        t.effects[0] = Effect::Delay { time: 0.5, feedback: 0.1, mix: 0.2 };
        t.effects[1] = EffectKind::Reverb.default_effect();
        bus.sync(&mut r.ctx, &mut r.pool, &mut r.caches, &t, 0.0).unwrap();
        assert_eq!(bus.effects[0].input(), delay_input);
        assert_eq!(bus.effects[1].effect().kind(), EffectKind::Reverb);

        t.effects.clear();
        bus.sync(&mut r.ctx, &mut r.pool, &mut r.caches, &t, 0.0).unwrap();
        assert_eq!(bus.effect_count(), 0);
        assert_eq!(r.ctx.outputs(bus.input()).unwrap().len(), 1);
    }

    #[test]
    fn teardown_returns_units() {
        let mut r = rig();
        let mut t = track();
        t.effects.push(EffectKind::Phaser.default_effect());
        let bus = build(&mut r, &t);
        bus.teardown(&mut r.ctx, &mut r.pool);
        assert_eq!(r.ctx.unit_count(), 1 + r.pool.total_idle());
        assert!(r.pool.idle(UnitKind::StereoPanner) >= 1);
    }
}
