//! Graph, pool and buses shared by live playback and export.
//!
//! A [`Mixer`] owns one [`AudioContext`] with its master bus, a lazily
//! built [`TrackBus`] per track, the unit pool, the release queue and the
//! synthesis caches. The live [`Engine`](crate::Engine) drives it from the
//! transport; [`export`](crate::export) drives it from a fixed step walk.
//! Both therefore build the same topology.

use bg_ir::{Arrangement, AudioBuffer, Track, TrackId, Waveform};

use crate::caches::SynthCaches;
use crate::config::{MasterConfig, MetronomeConfig, VoiceMakeup};
use crate::error::EngineError;
use crate::graph::{AudioContext, Meter, UnitKey};
use crate::master_bus::MasterBus;
use crate::pool::ResourcePool;
use crate::release_queue::ReleaseQueue;
use crate::synth::SynthContext;
use crate::track_bus::TrackBus;
use crate::voices::{self, Scheduled, CLEANUP_MARGIN};

pub struct Mixer {
    ctx: AudioContext,
    pool: ResourcePool,
    releases: ReleaseQueue,
    caches: SynthCaches,
    makeup: VoiceMakeup,
    metronome: MetronomeConfig,
    master: MasterBus,
    buses: Vec<TrackBus>,
    /// Ramp length for track volume and pan changes, seconds
    smoothing: f64,
}

impl Mixer {
    pub fn new(
        sample_rate: u32,
        master: &MasterConfig,
        makeup: VoiceMakeup,
        metronome: MetronomeConfig,
        seed: u64,
    ) -> Result<Self, EngineError> {
        let mut ctx = AudioContext::new(sample_rate);
        let master_bus = MasterBus::new(&mut ctx, master)?;
        Ok(Self {
            caches: SynthCaches::new(ctx.sample_rate(), seed),
            ctx,
            pool: ResourcePool::new(),
            releases: ReleaseQueue::with_capacity(1024),
            makeup,
            metronome,
            master: master_bus,
            buses: Vec::new(),
            smoothing: master.volume_ramp,
        })
    }

    pub fn context(&self) -> &AudioContext {
        &self.ctx
    }

    pub fn current_time(&self) -> f64 {
        self.ctx.current_time()
    }

    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    /// Pooled units still owned by scheduled voices.
    pub fn pending_releases(&self) -> usize {
        self.releases.len()
    }

    pub fn master(&self) -> &MasterBus {
        &self.master
    }

    pub fn bus_count(&self) -> usize {
        self.buses.len()
    }

    pub fn has_bus(&self, id: TrackId) -> bool {
        self.buses.iter().any(|b| b.id() == id)
    }

    // === Track buses ===

    /// Input of `track`'s bus, building the bus on first use.
    pub fn bus_input(&mut self, track: &Track) -> Result<UnitKey, EngineError> {
        if let Some(bus) = self.buses.iter().find(|b| b.id() == track.id) {
            return Ok(bus.input());
        }
        let bus = TrackBus::build(
            &mut self.ctx,
            &mut self.pool,
            &mut self.caches,
            track,
            self.master.input(),
        )?;
        let input = bus.input();
        log::debug!("built bus for track {:?} with {} effects", track.id, bus.effect_count());
        self.buses.push(bus);
        Ok(input)
    }

    /// Bring `track`'s bus in line with its record. Tracks without a bus
    /// yet are left alone; theirs is built from the record when first used.
    pub fn sync_track(&mut self, track: &Track) -> Result<(), EngineError> {
        let Some(bus) = self.buses.iter_mut().find(|b| b.id() == track.id) else {
            return Ok(());
        };
        bus.sync(&mut self.ctx, &mut self.pool, &mut self.caches, track, self.smoothing)
    }

    /// Tear down the bus of a deleted track. Voices still sounding into it
    /// are cut off.
    pub fn remove_bus(&mut self, id: TrackId) -> bool {
        let Some(index) = self.buses.iter().position(|b| b.id() == id) else {
            return false;
        };
        let bus = self.buses.swap_remove(index);
        bus.teardown(&mut self.ctx, &mut self.pool);
        log::debug!("removed bus for track {:?}", id);
        true
    }

    /// Drop the buses of tracks no longer in `arrangement`.
    pub fn retain_buses(&mut self, arrangement: &Arrangement) {
        let mut i = 0;
        while i < self.buses.len() {
            let id = self.buses[i].id();
            if arrangement.track(id).is_some() {
                i += 1;
            } else {
                self.remove_bus(id);
            }
        }
    }

    pub fn track_meter(&self, id: TrackId) -> Option<Meter> {
        self.buses.iter().find(|b| b.id() == id).map(|b| b.meter(&self.ctx))
    }

    // === Triggering ===

    /// Schedule one voice of `track` at `when` into its bus.
    pub fn trigger(&mut self, track: &Track, when: f64, duration: Option<f64>) -> Result<Scheduled, EngineError> {
        let output = self.bus_input(track)?;
        let mut synth = SynthContext {
            ctx: &mut self.ctx,
            pool: &mut self.pool,
            releases: &mut self.releases,
            caches: &mut self.caches,
            makeup: &self.makeup,
            output,
        };
        voices::trigger(&track.voice, &mut synth, when, duration)
    }

    /// Trigger every track that is active on grid `step` and audible.
    /// Audibility is read per track at this step, so a solo toggled
    /// mid-bar applies from the next step.
    ///
    /// A voice that fails to build is logged and skipped. Returns the
    /// number of voices scheduled.
    pub fn schedule_step(&mut self, arrangement: &Arrangement, step: usize, time: f64) -> usize {
        let mut scheduled = 0;
        for track in &arrangement.tracks {
            if !track.is_active(step) || !arrangement.is_audible(track) {
                continue;
            }
            match self.trigger(track, time, None) {
                Ok(s) if !s.is_empty() => scheduled += 1,
                Ok(_) => {}
                Err(e) => log::warn!("track {:?}: skipped voice at {:.3}s: {}", track.id, time, e),
            }
        }
        scheduled
    }

    /// Square-wave click into the master input, louder when `accent`.
    pub fn click(&mut self, when: f64, accent: bool) -> Result<(), EngineError> {
        let m = self.metronome;
        let stop = when + m.length;
        let output = self.master.input();
        let mut synth = SynthContext {
            ctx: &mut self.ctx,
            pool: &mut self.pool,
            releases: &mut self.releases,
            caches: &mut self.caches,
            makeup: &self.makeup,
            output,
        };
        let result = click_voice(&mut synth, &m, when, stop, accent);
        if result.is_err() {
            voices::discard_unstarted(&mut synth);
        }
        result
    }

    // === Rendering ===

    /// Return pooled units whose voices have finished.
    pub fn drain_releases(&mut self) -> usize {
        let due = self.releases.drain_until(self.ctx.current_time());
        let count = due.len();
        for i in due {
            if let Some(entry) = self.releases.get(i).copied() {
                self.pool.release(&mut self.ctx, entry.unit);
            }
        }
        self.releases.compact();
        count
    }

    /// Render one quantum into [`output`](Self::output).
    pub fn render_quantum(&mut self) {
        self.drain_releases();
        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| self.ctx.render_quantum());
        #[cfg(not(feature = "alloc_check"))]
        self.ctx.render_quantum();
    }

    /// Master output of the last rendered quantum.
    pub fn output(&self) -> &AudioBuffer {
        self.ctx.output()
    }

    pub fn set_master_volume(&mut self, volume: f64) -> Result<(), EngineError> {
        self.master.set_volume(&mut self.ctx, volume)
    }

    pub fn master_meter(&self) -> Meter {
        self.master.meter(&self.ctx)
    }
}

fn click_voice(
    synth: &mut SynthContext<'_>,
    m: &MetronomeConfig,
    when: f64,
    stop: f64,
    accent: bool,
) -> Result<(), EngineError> {
    let output = synth.output;
    let osc = synth.oscillator(Waveform::Square, m.frequency)?;
    let gain = synth.gain(if accent { m.accent_gain } else { m.gain }, stop + CLEANUP_MARGIN)?;
    synth.chain(&[osc, gain, output])?;
    synth.play(osc, when, stop)
}
