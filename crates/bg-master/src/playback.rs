//! The audio thread and the controller's handle to it.
//!
//! The thread owns the live [`Engine`]. Commands arrive over a bounded
//! channel and are drained before every block; transport position and the
//! master meter go back through atomics.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use bg_audio::{AudioError, AudioOutput};
use bg_engine::graph::Meter;
use bg_engine::{Engine, EngineConfig, Frame, Playhead};
use bg_ir::{format_time, Arrangement, Edit, TrackId, RENDER_QUANTUM};
use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::error::MasterError;

const COMMAND_QUEUE: usize = 1024;
const NO_STEP: usize = usize::MAX;

/// Messages from the controller to the audio thread.
#[derive(Debug)]
pub(crate) enum Command {
    Play,
    Stop,
    Edit(Edit),
    Load(Box<Arrangement>),
    Preview(TrackId),
    Shutdown,
}

/// Values the audio thread publishes after every block.
struct Shared {
    alive: AtomicBool,
    playing: AtomicBool,
    step: AtomicUsize,
    elapsed: AtomicU64,
    master_peak: AtomicU32,
    master_rms: AtomicU32,
}

impl Shared {
    fn new() -> Self {
        Self {
            alive: AtomicBool::new(false),
            playing: AtomicBool::new(false),
            step: AtomicUsize::new(NO_STEP),
            elapsed: AtomicU64::new(0),
            master_peak: AtomicU32::new(0),
            master_rms: AtomicU32::new(0),
        }
    }

    fn publish(&self, engine: &Engine) {
        let playhead = engine.playhead();
        self.playing.store(engine.is_playing(), Ordering::Relaxed);
        self.step.store(playhead.step.unwrap_or(NO_STEP), Ordering::Relaxed);
        self.elapsed.store(playhead.elapsed.to_bits(), Ordering::Relaxed);
        let meter = engine.master_meter();
        self.master_peak.store(meter.peak.to_bits(), Ordering::Relaxed);
        self.master_rms.store(meter.rms.to_bits(), Ordering::Relaxed);
    }
}

pub(crate) struct Playback {
    commands: Sender<Command>,
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl Playback {
    /// Spawn the audio thread, open the output on it and build the engine
    /// at the output's sample rate. Returns once the output is running or
    /// has failed.
    pub(crate) fn spawn<F, O>(
        open: F,
        config: EngineConfig,
        arrangement: Arrangement,
    ) -> Result<Self, MasterError>
    where
        F: FnOnce() -> Result<O, AudioError> + Send + 'static,
        O: AudioOutput,
    {
        let (commands, rx) = crossbeam_channel::bounded::<Command>(COMMAND_QUEUE);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), MasterError>>(1);
        let shared = Arc::new(Shared::new());
        let thread_shared = shared.clone();

        let thread = std::thread::Builder::new()
            .name("beatgrid-audio".into())
            .spawn(move || {
                let setup = open().map_err(MasterError::from).and_then(|mut output| {
                    let config = EngineConfig {
                        sample_rate: output.sample_rate(),
                        ..config
                    };
                    let engine = Engine::new(config, arrangement)?;
                    output.start()?;
                    Ok((output, engine))
                });
                match setup {
                    Ok((output, engine)) => {
                        thread_shared.alive.store(true, Ordering::Relaxed);
                        let _ = ready_tx.send(Ok(()));
                        run(output, engine, rx, &thread_shared);
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                commands,
                shared,
                thread: Some(thread),
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(AudioError::ThreadGone.into())
            }
        }
    }

    pub(crate) fn send(&self, command: Command) -> Result<(), AudioError> {
        self.commands.send(command).map_err(|_| AudioError::ThreadGone)
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::Relaxed)
    }

    pub(crate) fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::Relaxed)
    }

    pub(crate) fn playhead(&self) -> Playhead {
        if !self.is_playing() {
            return Playhead::stopped();
        }
        let step = self.shared.step.load(Ordering::Relaxed);
        let elapsed = f64::from_bits(self.shared.elapsed.load(Ordering::Relaxed));
        Playhead {
            step: (step != NO_STEP).then_some(step),
            elapsed,
            display: format_time(elapsed),
        }
    }

    pub(crate) fn master_meter(&self) -> Meter {
        Meter {
            peak: f32::from_bits(self.shared.master_peak.load(Ordering::Relaxed)),
            rms: f32::from_bits(self.shared.master_rms.load(Ordering::Relaxed)),
        }
    }

    /// Stop the thread and wait for it.
    pub(crate) fn shutdown(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run<O: AudioOutput>(mut output: O, mut engine: Engine, commands: Receiver<Command>, shared: &Shared) {
    log::debug!("audio thread running at {} Hz", engine.sample_rate());
    let mut block = [Frame::silence(); RENDER_QUANTUM];
    'render: loop {
        loop {
            match commands.try_recv() {
                Ok(Command::Shutdown) | Err(TryRecvError::Disconnected) => break 'render,
                Ok(command) => handle(&mut engine, command),
                Err(TryRecvError::Empty) => break,
            }
        }
        engine.render_into(&mut block);
        shared.publish(&engine);
        if let Err(e) = output.write(&block) {
            log::error!("audio output failed: {}", e);
            break;
        }
    }
    if let Err(e) = output.stop() {
        log::warn!("stopping output failed: {}", e);
    }
    shared.playing.store(false, Ordering::Relaxed);
    shared.alive.store(false, Ordering::Relaxed);
    log::debug!("audio thread finished");
}

fn handle(engine: &mut Engine, command: Command) {
    match command {
        Command::Play => engine.play(),
        Command::Stop => engine.stop(),
        Command::Edit(edit) => {
            engine.apply(&edit);
        }
        Command::Load(arrangement) => engine.set_arrangement(*arrangement),
        Command::Preview(id) => {
            if let Err(e) = engine.preview(id) {
                log::warn!("preview of track {:?} failed: {}", id, e);
            }
        }
        Command::Shutdown => {}
    }
}
