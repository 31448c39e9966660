//! Allocation-free render path tests.
//!
//! Voices are built (which allocates) before the checked section; the
//! tests then verify that rendering the built graph, reaping finished
//! sources and returning pooled units do not touch the heap.
//!
//! Runs under plain `cargo test`; no feature flags needed.

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use bg_engine::{Engine, EngineConfig, MasterConfig, MetronomeConfig, Mixer, VoiceMakeup};
use bg_ir::{Arrangement, EffectKind, GeneratorKind, TrackId, RENDER_QUANTUM};

const SR: u32 = 44100;

fn kit() -> (Arrangement, Vec<TrackId>) {
    let mut arr = Arrangement::new();
    let ids: Vec<TrackId> = GeneratorKind::ALL
        .iter()
        .filter(|k| **k != GeneratorKind::Sample)
        .map(|&k| arr.add_track(k, None))
        .collect();
    for &id in &ids {
        arr.toggle_step(id, 0);
    }
    (arr, ids)
}

/// Render `quanta` quanta of `mixer`, aborting on any heap allocation.
fn assert_render_alloc_free(mixer: &mut Mixer, quanta: usize) {
    assert_no_alloc(|| {
        for _ in 0..quanta {
            mixer.render_quantum();
        }
    });
}

fn mixer() -> Mixer {
    Mixer::new(
        SR,
        &MasterConfig::default(),
        VoiceMakeup::default(),
        MetronomeConfig::default(),
        5,
    )
    .unwrap()
}

#[test]
fn every_voice_renders_alloc_free() {
    let (arr, _) = kit();
    let mut m = mixer();
    m.schedule_step(&arr, 0, 0.0);
    m.schedule_step(&arr, 0, 0.25);
    // Long enough for every voice to finish and be returned.
    assert_render_alloc_free(&mut m, SR as usize * 3 / RENDER_QUANTUM);
    assert_eq!(m.pending_releases(), 0);
}

#[test]
fn effect_chains_render_alloc_free() {
    let (mut arr, ids) = kit();
    let track = arr.track_mut(ids[0]).unwrap();
    for kind in EffectKind::ALL {
        track.effects.push(kind.default_effect());
    }
    let mut m = mixer();
    m.schedule_step(&arr, 0, 0.0);
    assert_render_alloc_free(&mut m, SR as usize * 2 / RENDER_QUANTUM);
}

#[test]
fn stopped_engine_renders_alloc_free() {
    let (arr, ids) = kit();
    let config = EngineConfig {
        sample_rate: SR,
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(config, arr).unwrap();
    for &id in &ids {
        engine.preview(id).unwrap();
    }
    assert_no_alloc(|| {
        for _ in 0..SR * 2 {
            engine.render_frame();
        }
    });
}
