//! The master chain every track and the metronome feed into.
//!
//! ```text
//! volume -> DC highpass -> compressor -> makeup -> limiter -> meter -> destination
//! ```
//!
//! Live playback and export build it from the same [`MasterConfig`].

use arrayvec::ArrayVec;

use crate::config::{CompressorSettings, MasterConfig};
use crate::error::EngineError;
use crate::graph::{AudioContext, FilterType, Meter, ParamId, UnitKey, UnitKind};

/// Q of the DC-removal highpass.
const DC_Q: f64 = 0.707;

pub struct MasterBus {
    input: UnitKey,
    meter: UnitKey,
    /// Every unit, input first.
    chain: ArrayVec<UnitKey, 6>,
    volume: f64,
    ramp: f64,
}

impl MasterBus {
    /// Build the chain into the context's destination.
    pub fn new(ctx: &mut AudioContext, config: &MasterConfig) -> Result<Self, EngineError> {
        let input = ctx.create(UnitKind::Gain);
        ctx.set_param(input, ParamId::Gain, config.volume.max(0.0))?;

        let dc = ctx.create(UnitKind::BiquadFilter);
        ctx.set_filter_type(dc, FilterType::Highpass)?;
        ctx.set_param(dc, ParamId::Frequency, config.dc_cutoff)?;
        ctx.set_param(dc, ParamId::Q, DC_Q)?;

        let comp = compressor(ctx, &config.compressor)?;
        let makeup = ctx.create(UnitKind::Gain);
        ctx.set_param(makeup, ParamId::Gain, config.makeup)?;
        let limiter = compressor(ctx, &config.limiter)?;
        let meter = ctx.create(UnitKind::Analyser);

        let chain: ArrayVec<UnitKey, 6> = [input, dc, comp, makeup, limiter, meter].into();
        for pair in chain.windows(2) {
            ctx.connect(pair[0], pair[1])?;
        }
        let dest = ctx.destination();
        ctx.connect(meter, dest)?;
        log::debug!("master bus built at {} Hz", ctx.sample_rate());

        Ok(Self {
            input,
            meter,
            chain,
            volume: config.volume.max(0.0),
            ramp: config.volume_ramp,
        })
    }

    /// Where track buses and the metronome connect.
    pub fn input(&self) -> UnitKey {
        self.input
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Ramp the input gain to `volume`. Never stepped.
    pub fn set_volume(&mut self, ctx: &mut AudioContext, volume: f64) -> Result<(), EngineError> {
        let volume = volume.max(0.0);
        let now = ctx.current_time();
        ctx.param_mut(self.input, ParamId::Gain)?.ramp_to(volume, now, self.ramp);
        self.volume = volume;
        Ok(())
    }

    /// Output level over the last rendered quantum.
    pub fn meter(&self, ctx: &AudioContext) -> Meter {
        ctx.meter(self.meter).unwrap_or_default()
    }

    /// Units in signal order.
    pub fn units(&self) -> &[UnitKey] {
        &self.chain
    }
}

fn compressor(ctx: &mut AudioContext, s: &CompressorSettings) -> Result<UnitKey, EngineError> {
    let key = ctx.create(UnitKind::DynamicsCompressor);
    ctx.set_param(key, ParamId::Threshold, s.threshold)?;
    ctx.set_param(key, ParamId::Knee, s.knee)?;
    ctx.set_param(key, ParamId::Ratio, s.ratio)?;
    ctx.set_param(key, ParamId::Attack, s.attack)?;
    ctx.set_param(key, ParamId::Release, s.release)?;
    Ok(key)
}
