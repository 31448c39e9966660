//! Everything a voice builder needs to assemble a graph fragment.

use std::sync::Arc;

use bg_ir::{AudioBuffer, NoiseColor, Waveform};

use crate::caches::SynthCaches;
use crate::config::{CompressorSettings, VoiceMakeup};
use crate::error::EngineError;
use crate::graph::{AudioContext, AudioParam, FilterType, Oversample, ParamId, UnitKey, UnitKind};
use crate::pool::ResourcePool;
use crate::release_queue::ReleaseQueue;

/// Borrowed view of one context's graph, pool, release queue and caches,
/// plus the bus input voices connect into.
///
/// Every pooled unit is taken together with the time it goes back, so a
/// voice that fails halfway still returns what it acquired.
pub struct SynthContext<'a> {
    pub ctx: &'a mut AudioContext,
    pub pool: &'a mut ResourcePool,
    pub releases: &'a mut ReleaseQueue,
    pub caches: &'a mut SynthCaches,
    pub makeup: &'a VoiceMakeup,
    /// Where finished voices connect.
    pub output: UnitKey,
}

impl SynthContext<'_> {
    pub fn sample_rate(&self) -> u32 {
        self.ctx.sample_rate()
    }

    /// Acquire a pooled unit due back at `release_at`.
    pub fn pooled(&mut self, kind: UnitKind, release_at: f64) -> UnitKey {
        let key = self.pool.acquire(self.ctx, kind);
        self.releases.push(release_at, key);
        key
    }

    /// Gain unit with a static value.
    pub fn gain(&mut self, value: f64, release_at: f64) -> Result<UnitKey, EngineError> {
        let key = self.pooled(UnitKind::Gain, release_at);
        self.ctx.set_param(key, ParamId::Gain, value)?;
        Ok(key)
    }

    /// Gain unit whose value is automated by the caller.
    pub fn envelope(&mut self, release_at: f64) -> Result<(UnitKey, &mut AudioParam), EngineError> {
        let key = self.pooled(UnitKind::Gain, release_at);
        let param = self.ctx.param_mut(key, ParamId::Gain)?;
        Ok((key, param))
    }

    pub fn filter(
        &mut self,
        filter_type: FilterType,
        frequency: f64,
        q: f64,
        release_at: f64,
    ) -> Result<UnitKey, EngineError> {
        let key = self.pooled(UnitKind::BiquadFilter, release_at);
        self.ctx.set_filter_type(key, filter_type)?;
        self.ctx.set_param(key, ParamId::Frequency, frequency)?;
        self.ctx.set_param(key, ParamId::Q, q)?;
        Ok(key)
    }

    pub fn compressor(&mut self, settings: CompressorSettings, release_at: f64) -> Result<UnitKey, EngineError> {
        let key = self.pooled(UnitKind::DynamicsCompressor, release_at);
        self.ctx.set_param(key, ParamId::Threshold, settings.threshold)?;
        self.ctx.set_param(key, ParamId::Knee, settings.knee)?;
        self.ctx.set_param(key, ParamId::Ratio, settings.ratio)?;
        self.ctx.set_param(key, ParamId::Attack, settings.attack)?;
        self.ctx.set_param(key, ParamId::Release, settings.release)?;
        Ok(key)
    }

    /// Wave shaper with 4x oversampling.
    pub fn shaper(&mut self, curve: Arc<[f32]>, release_at: f64) -> Result<UnitKey, EngineError> {
        let key = self.pooled(UnitKind::WaveShaper, release_at);
        self.ctx.set_curve(key, Some(curve))?;
        self.ctx.set_oversample(key, Oversample::X4)?;
        Ok(key)
    }

    /// Fresh oscillator. Sources are never pooled.
    pub fn oscillator(&mut self, waveform: Waveform, frequency: f64) -> Result<UnitKey, EngineError> {
        let key = self.ctx.create_oscillator(waveform);
        self.ctx.set_param(key, ParamId::Frequency, frequency)?;
        Ok(key)
    }

    pub fn buffer_source(&mut self, buffer: Arc<AudioBuffer>) -> UnitKey {
        self.ctx.create_buffer_source(buffer)
    }

    /// Buffer source over cached noise at least `duration` seconds long.
    pub fn noise(&mut self, color: NoiseColor, duration: f64) -> UnitKey {
        let buffer = self.caches.noise(color, duration);
        self.ctx.create_buffer_source(buffer)
    }

    pub fn param(&mut self, key: UnitKey, id: ParamId) -> Result<&mut AudioParam, EngineError> {
        self.ctx.param_mut(key, id)
    }

    pub fn connect(&mut self, from: UnitKey, to: UnitKey) -> Result<(), EngineError> {
        self.ctx.connect(from, to)
    }

    /// Connect `units` in series; returns the last one.
    pub fn chain(&mut self, units: &[UnitKey]) -> Result<Option<UnitKey>, EngineError> {
        for pair in units.windows(2) {
            self.ctx.connect(pair[0], pair[1])?;
        }
        Ok(units.last().copied())
    }

    /// Schedule a source to play over `[start, stop)`.
    ///
    /// A source that was already started is refused with a warning and the
    /// error is returned so the voice can abort.
    pub fn play(&mut self, source: UnitKey, start: f64, stop: f64) -> Result<(), EngineError> {
        if let Err(e) = self.ctx.start(source, start) {
            if e == EngineError::SourceAlreadyStarted {
                log::warn!("refusing to restart a scheduled source");
            }
            return Err(e);
        }
        self.ctx.stop(source, stop)
    }

    /// Play a source with no stop time; it ends with its buffer.
    pub fn play_to_end(&mut self, source: UnitKey, start: f64) -> Result<(), EngineError> {
        if let Err(e) = self.ctx.start(source, start) {
            if e == EngineError::SourceAlreadyStarted {
                log::warn!("refusing to restart a scheduled source");
            }
            return Err(e);
        }
        Ok(())
    }
}
