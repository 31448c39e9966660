//! Live playback against a device-free output: commands reach the audio
//! thread and the playhead comes back through the controller.

use std::thread::sleep;
use std::time::Duration;

use bg_audio::{AudioError, Captured, MemoryOutput};
use bg_master::{Controller, GeneratorKind, MasterError, Playhead};

const SR: u32 = 48000;

fn peak(captured: &Captured) -> f32 {
    captured
        .lock()
        .unwrap()
        .iter()
        .map(|f| f.left.abs().max(f.right.abs()))
        .fold(0.0, f32::max)
}

#[test]
fn failed_output_refuses_play() {
    let mut c = Controller::new();
    let result = c.play_with(|| Err::<MemoryOutput, _>(AudioError::NoDevice));
    assert_eq!(result, Err(MasterError::Audio(AudioError::NoDevice)));
    assert!(!c.is_output_open());
    assert!(!c.is_playing());
}

#[test]
fn transport_runs_on_the_audio_thread() {
    let mut c = Controller::new();
    let kick = c.add_track(GeneratorKind::Kick, None);
    for step in 0..16 {
        c.toggle_step(kick, step);
    }
    let (output, captured) = MemoryOutput::new(SR, 10);
    c.play_with(move || Ok(output)).unwrap();
    sleep(Duration::from_millis(400));

    assert!(c.is_output_open());
    assert!(c.is_playing());
    assert!(c.playhead().step.is_some());
    assert!(peak(&captured) > 0.01);

    c.stop();
    sleep(Duration::from_millis(100));
    assert!(!c.is_playing());
    assert_eq!(c.playhead(), Playhead::stopped());

    c.close_output();
    assert!(!c.is_output_open());
}

#[test]
fn edits_reach_a_running_engine() {
    let mut c = Controller::new();
    let kick = c.add_track(GeneratorKind::Kick, None);
    for step in 0..16 {
        c.toggle_step(kick, step);
    }
    c.set_mute(kick, true);
    let (output, captured) = MemoryOutput::new(SR, 10);
    c.play_with(move || Ok(output)).unwrap();
    sleep(Duration::from_millis(300));
    assert_eq!(peak(&captured), 0.0);

    c.set_mute(kick, false);
    sleep(Duration::from_millis(500));
    assert!(peak(&captured) > 0.01);
}
