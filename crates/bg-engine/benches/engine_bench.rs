//! Benchmarks for voice building and rendering.
//!
//! Run with: cargo bench -p bg-engine
//!
//! Reference timing at 44.1kHz: one 128-frame quantum is a 2.9ms deadline.
//!
//! Benchmark groups:
//!   - engine/trigger  Building one voice of each generator
//!   - engine/quantum  Rendering a quantum with a full kit sounding
//!   - export/*        Offline mixdown of a one-bar arrangement

use std::hint::black_box;

use bg_engine::{export, ExportConfig, MasterConfig, MetronomeConfig, Mixer, VoiceMakeup};
use bg_ir::{Arrangement, EffectKind, GeneratorKind};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

const SR: u32 = 44100;

fn mixer() -> Mixer {
    Mixer::new(
        SR,
        &MasterConfig::default(),
        VoiceMakeup::default(),
        MetronomeConfig::default(),
        1,
    )
    .expect("master bus")
}

/// Four-on-the-floor kit: kick, snare, hats, clap and a bass line.
fn kit(effects: bool) -> Arrangement {
    let mut arr = Arrangement::new();
    let pattern: [(GeneratorKind, &[usize]); 5] = [
        (GeneratorKind::Kick, &[0, 4, 8, 12]),
        (GeneratorKind::Snare, &[4, 12]),
        (GeneratorKind::HiHat, &[0, 2, 4, 6, 8, 10, 12, 14]),
        (GeneratorKind::Clap, &[12]),
        (GeneratorKind::Bass, &[0, 3, 6, 10]),
    ];
    for (kind, steps) in pattern {
        let id = arr.add_track(kind, None);
        for &s in steps {
            arr.toggle_step(id, s);
        }
        if effects {
            if let Some(track) = arr.track_mut(id) {
                track.effects.push(EffectKind::Eq3.default_effect());
                track.effects.push(EffectKind::Delay.default_effect());
            }
        }
    }
    arr
}

fn bench_trigger(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/trigger");
    for kind in GeneratorKind::ALL {
        if kind == GeneratorKind::Sample {
            continue;
        }
        let mut arr = Arrangement::new();
        let id = arr.add_track(kind, None);
        arr.toggle_step(id, 0);
        group.bench_function(BenchmarkId::from_parameter(kind.label()), |b| {
            let mut m = mixer();
            b.iter(|| {
                black_box(m.schedule_step(&arr, 0, 0.0));
                // Keep the graph from growing without bound.
                m.render_quantum();
            });
        });
    }
    group.finish();
}

fn bench_quantum(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/quantum");
    for effects in [false, true] {
        let arr = kit(effects);
        let mut m = mixer();
        for step in 0..4 {
            m.schedule_step(&arr, step * 4, 0.0);
        }
        let label = if effects { "kit_with_effects" } else { "kit" };
        group.bench_function(label, |b| {
            b.iter(|| {
                m.render_quantum();
                black_box(m.output().peak());
            });
        });
    }
    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");
    group.sample_size(10);
    let config = ExportConfig {
        bars: 1,
        ..ExportConfig::default()
    };
    for effects in [false, true] {
        let arr = kit(effects);
        group.bench_with_input(BenchmarkId::new("one_bar", effects), &arr, |b, arr| {
            b.iter(|| black_box(export(arr, &config).map(|buf| buf.frames())));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_trigger, bench_quantum, bench_export);
criterion_main!(benches);
