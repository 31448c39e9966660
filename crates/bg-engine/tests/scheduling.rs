//! Integration tests: transport timing, audibility, export length, voice
//! layering and the pool/source contracts the voices rely on.

use bg_engine::graph::{AudioContext, FilterType, ParamId, UnitKind};
use bg_engine::voices::envelope::{Adsr, Curve, Point};
use bg_engine::{
    export, trigger, EngineError, ExportConfig, MasterConfig, MetronomeConfig, Mixer,
    ReleaseQueue, ResourcePool, SynthCaches, SynthContext, Transport, VoiceMakeup, POOL_SIZE,
};
use bg_ir::{
    step_duration, Arrangement, AudioBuffer, BassParams, ClapParams, GeneratorKind, HiHatParams,
    KickParams, NoisePadParams, SnareParams, ToneParams, VoiceParams, Waveform,
};
use std::sync::Arc;

const SR: u32 = 44100;

fn mixer() -> Mixer {
    Mixer::new(
        SR,
        &MasterConfig::default(),
        VoiceMakeup::default(),
        MetronomeConfig::default(),
        3,
    )
    .unwrap()
}

// --- transport ---

#[test]
fn step_duration_is_exact() {
    for bpm in [60.0, 90.0, 120.0, 137.5, 300.0] {
        for steps in [4, 8, 12, 16, 32, 64] {
            assert_eq!(step_duration(bpm, steps), 240.0 / (bpm * steps as f64));
        }
    }
}

#[test]
fn every_step_scheduled_once_under_jitter() {
    let sd = step_duration(120.0, 16);
    let mut transport = Transport::default();
    transport.start(0.0, sd);
    let mut rng = fastrand::Rng::with_seed(11);
    let mut now = 0.0;
    let mut seen = Vec::new();
    while now < 20.0 {
        now += 0.01 + rng.f64() * 0.08;
        transport.tick(now, sd, 16, |e| seen.push(e.index));
    }
    let expected: Vec<u64> = (0..seen.len() as u64).collect();
    assert_eq!(seen, expected);
    assert!(seen.len() > 150);
}

#[test]
fn steps_zero_and_four_sound_half_a_second_apart() {
    let mut arr = Arrangement::new();
    let id = arr.add_track(GeneratorKind::Kick, None);
    arr.toggle_step(id, 0);
    arr.toggle_step(id, 4);
    let track = arr.track(id).unwrap().clone();

    let mut transport = Transport::default();
    transport.start(0.0, arr.step_duration());
    let origin = transport.step_time(0).unwrap();
    let mut hits = Vec::new();
    let mut now = 0.0;
    while now < 1.9 {
        transport.tick(now, arr.step_duration(), arr.step_count(), |e| {
            if e.index < 16 && track.is_active(e.step) && arr.is_audible(&track) {
                hits.push(e.time - origin);
            }
        });
        now += 0.05;
    }
    assert_eq!(hits.len(), 2);
    assert!(hits[0].abs() < 1e-12);
    assert!((hits[1] - 0.5).abs() < 1e-12);
}

// --- audibility ---

#[test]
fn solo_elsewhere_silences_unmuted_track() {
    let mut arr = Arrangement::new();
    let a = arr.add_track(GeneratorKind::Snare, None);
    let b = arr.add_track(GeneratorKind::HiHat, None);
    arr.toggle_step(a, 0);
    arr.toggle_step(b, 0);
    arr.track_mut(b).unwrap().solo = true;
    assert!(!arr.track(a).unwrap().muted);

    let mut m = mixer();
    assert_eq!(m.schedule_step(&arr, 0, 0.0), 1);
    assert!(!m.has_bus(a));
    assert!(m.has_bus(b));

    arr.track_mut(b).unwrap().solo = false;
    assert_eq!(m.schedule_step(&arr, 0, 0.5), 2);
}

#[test]
fn soloed_out_track_is_silent_in_export() {
    let mut arr = Arrangement::new();
    let a = arr.add_track(GeneratorKind::Kick, None);
    let b = arr.add_track(GeneratorKind::Kick, None);
    arr.toggle_step(a, 0);
    arr.track_mut(b).unwrap().solo = true;
    let config = ExportConfig { bars: 1, ..ExportConfig::default() };
    assert!(export(&arr, &config).unwrap().is_silent());
}

// --- export ---

#[test]
fn four_bars_at_120_is_eight_seconds() {
    let mut arr = Arrangement::new();
    let id = arr.add_track(GeneratorKind::Kick, None);
    arr.toggle_step(id, 0);
    let buf = export(&arr, &ExportConfig::default()).unwrap();
    assert_eq!(buf.sample_rate(), 44100);
    assert_eq!(buf.channels(), 2);
    assert_eq!(buf.frames(), 8 * 44100);
    assert_eq!(buf.duration(), 8.0);
}

#[test]
fn export_refuses_empty_arrangement() {
    let result = export(&Arrangement::new(), &ExportConfig::default());
    assert_eq!(result, Err(EngineError::EmptyArrangement));
}

// --- voices ---

#[test]
fn clap_layers_are_spread() {
    let mut ctx = AudioContext::new(SR);
    let mut pool = ResourcePool::new();
    let mut releases = ReleaseQueue::new();
    let mut caches = SynthCaches::new(SR, 1);
    let makeup = VoiceMakeup::default();
    let output = ctx.destination();
    let mut synth = SynthContext {
        ctx: &mut ctx,
        pool: &mut pool,
        releases: &mut releases,
        caches: &mut caches,
        makeup: &makeup,
        output,
    };
    let params = VoiceParams::Clap(ClapParams {
        layers: 3,
        layer_spread: 0.005,
        ..ClapParams::default()
    });
    let t = 1.25;
    let scheduled = trigger(&params, &mut synth, t, None).unwrap();
    assert_eq!(scheduled.onsets.len(), 3);
    for (onset, expected) in scheduled.onsets.iter().zip([t, t + 0.005, t + 0.010]) {
        assert!((onset - expected).abs() < 1e-12, "{} vs {}", onset, expected);
    }
}

#[test]
fn failed_voice_leaves_no_unstarted_sources() {
    let mut ctx = AudioContext::new(SR);
    let gone = ctx.create(UnitKind::Gain);
    ctx.remove(gone).unwrap();
    let mut pool = ResourcePool::new();
    let mut releases = ReleaseQueue::new();
    let mut caches = SynthCaches::new(SR, 1);
    let makeup = VoiceMakeup::default();
    let mut synth = SynthContext {
        ctx: &mut ctx,
        pool: &mut pool,
        releases: &mut releases,
        caches: &mut caches,
        makeup: &makeup,
        output: gone,
    };
    let voices = [
        VoiceParams::Tone(ToneParams::default()),
        VoiceParams::Bass(BassParams::default()),
        VoiceParams::Kick(KickParams::default()),
        VoiceParams::Snare(SnareParams::default()),
        VoiceParams::HiHat(HiHatParams::default()),
        VoiceParams::Clap(ClapParams::default()),
        VoiceParams::NoisePad(NoisePadParams::default()),
    ];
    for params in &voices {
        assert_eq!(trigger(params, &mut synth, 0.5, None), Err(EngineError::UnknownUnit));
        assert_eq!(synth.ctx.discard_unstarted(), 0, "{:?}", params.kind());
    }
}

#[test]
fn short_noise_pad_is_released_after_its_envelope() {
    let mut ctx = AudioContext::new(SR);
    let mut pool = ResourcePool::new();
    let mut releases = ReleaseQueue::new();
    let mut caches = SynthCaches::new(SR, 1);
    let makeup = VoiceMakeup::default();
    let output = ctx.destination();
    let mut synth = SynthContext {
        ctx: &mut ctx,
        pool: &mut pool,
        releases: &mut releases,
        caches: &mut caches,
        makeup: &makeup,
        output,
    };
    let pad = NoisePadParams {
        attack: 0.1,
        decay: 0.2,
        hold: 0.5,
        release: 0.4,
        ..NoisePadParams::default()
    };
    let scheduled = trigger(&VoiceParams::NoisePad(pad), &mut synth, 1.0, Some(0.05)).unwrap();
    assert!(scheduled.release_at > 1.0 + 0.1 + 0.2 + 0.5 + 0.4);
}

#[test]
fn envelope_collapses_when_release_overlaps_decay() {
    for curve in [Curve::Linear, Curve::Exponential] {
        let env = Adsr {
            attack: 0.05,
            decay: 0.3,
            sustain: 0.5,
            release: 0.4,
            peak: 1.0,
            curve,
        };
        let points = env.points(2.0, 0.5);
        assert_eq!(points.len(), 4);
        for w in points.windows(2) {
            assert!(w[1].time() >= w[0].time());
        }
        let last = points[points.len() - 1];
        assert!(matches!(last, Point::Ramp { .. }));
        assert!((last.time() - 2.5).abs() < 1e-3);
    }
}

#[test]
fn release_starts_after_decay_when_room_allows() {
    let env = Adsr {
        attack: 0.01,
        decay: 0.1,
        sustain: 0.6,
        release: 0.2,
        peak: 1.0,
        curve: Curve::Linear,
    };
    let points = env.points(0.0, 1.0);
    assert_eq!(points.len(), 5);
    assert!(points[3].time() >= points[2].time());
    assert_eq!(points[3], Point::Set { time: 0.8, value: 0.6 });
    assert_eq!(points[4].time(), 1.0);
}

// --- pool and sources ---

#[test]
fn pool_never_exceeds_capacity() {
    let mut ctx = AudioContext::new(SR);
    let mut pool = ResourcePool::new();
    let mut held = Vec::new();
    for _ in 0..POOL_SIZE + 20 {
        held.push(pool.acquire(&mut ctx, UnitKind::Gain));
    }
    for key in held {
        pool.release(&mut ctx, key);
    }
    assert_eq!(pool.idle(UnitKind::Gain), POOL_SIZE);

    for _ in 0..500 {
        let key = pool.acquire(&mut ctx, UnitKind::BiquadFilter);
        pool.release(&mut ctx, key);
        assert!(pool.idle(UnitKind::BiquadFilter) <= POOL_SIZE);
    }
    assert_eq!(pool.idle(UnitKind::BiquadFilter), 1);
}

#[test]
fn sources_are_never_pooled() {
    let mut ctx = AudioContext::new(SR);
    let mut pool = ResourcePool::new();
    let osc = pool.acquire(&mut ctx, UnitKind::Oscillator);
    pool.release(&mut ctx, osc);
    assert_eq!(pool.total_idle(), 0);
    let again = pool.acquire(&mut ctx, UnitKind::Oscillator);
    assert_ne!(osc, again);
}

#[test]
fn released_filter_comes_back_with_defaults() {
    let mut ctx = AudioContext::new(SR);
    let mut pool = ResourcePool::new();
    let f = pool.acquire(&mut ctx, UnitKind::BiquadFilter);
    ctx.set_filter_type(f, FilterType::Highpass).unwrap();
    ctx.set_param(f, ParamId::Frequency, 6000.0).unwrap();
    ctx.set_param(f, ParamId::Q, 9.0).unwrap();
    let dest = ctx.destination();
    ctx.connect(f, dest).unwrap();
    pool.release(&mut ctx, f);

    let again = pool.acquire(&mut ctx, UnitKind::BiquadFilter);
    assert_eq!(again, f);
    assert_eq!(ctx.filter_type(again), Ok(FilterType::Lowpass));
    assert_eq!(ctx.param(again, ParamId::Frequency).unwrap().value(), 1000.0);
    assert_eq!(ctx.param(again, ParamId::Q).unwrap().value(), 1.0);
    assert!(ctx.outputs(again).unwrap().is_empty());
}

#[test]
fn second_start_is_refused() {
    let mut ctx = AudioContext::new(SR);
    let osc = ctx.create_oscillator(Waveform::Sine);
    ctx.start(osc, 0.1).unwrap();
    assert_eq!(ctx.start(osc, 0.2), Err(EngineError::SourceAlreadyStarted));

    let buf = Arc::new(AudioBuffer::new(1, 64, SR));
    let src = ctx.create_buffer_source(buf);
    assert_eq!(ctx.stop(src, 1.0), Err(EngineError::SourceNotStarted));
}
