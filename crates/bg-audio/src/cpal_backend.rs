//! CPAL-based audio output backend.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use bg_engine::Frame;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::traits::{AudioError, AudioOutput};

/// CPAL-based audio output fed through a lock-free SPSC ring.
///
/// Not `Send` on every platform: open it on the thread that renders.
pub struct CpalOutput {
    config: StreamConfig,
    stream: Stream,
    producer: HeapProd<Frame>,
    running: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
}

impl CpalOutput {
    /// Open the default output device and build a paused stereo stream.
    pub fn open() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        let mut config: StreamConfig = config.into();
        // The callback writes a stereo pair and zero-fills any extra channels.
        config.channels = 2;

        // About 100ms of audio between the render thread and the device.
        let buffer_size = config.sample_rate.0 as usize / 10;
        let rb = HeapRb::<Frame>::new(buffer_size.max(1));
        let (producer, consumer) = rb.split();

        let running = Arc::new(AtomicBool::new(false));
        let failed = Arc::new(AtomicBool::new(false));
        let stream = build_stream(&device, &config, consumer, running.clone(), failed.clone())?;
        log::debug!(
            "opened output: {} Hz, {} channels",
            config.sample_rate.0,
            config.channels
        );

        Ok(Self {
            config,
            stream,
            producer,
            running,
            failed,
        })
    }
}

fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut consumer: HeapCons<Frame>,
    running: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
) -> Result<Stream, AudioError> {
    let channels = config.channels as usize;
    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if !running.load(Ordering::Relaxed) {
                    data.fill(0.0);
                    return;
                }
                for chunk in data.chunks_mut(channels) {
                    let frame = consumer.try_pop().unwrap_or_default().clamped();
                    for (i, sample) in chunk.iter_mut().enumerate() {
                        *sample = match i {
                            0 => frame.left,
                            1 => frame.right,
                            _ => 0.0,
                        };
                    }
                }
            },
            move |err| {
                log::error!("audio stream error: {}", err);
                failed.store(true, Ordering::Relaxed);
            },
            None,
        )
        .map_err(|e| AudioError::StreamCreate(e.to_string()))
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn write(&mut self, frames: &[Frame]) -> Result<(), AudioError> {
        let mut rest = frames;
        while !rest.is_empty() {
            if self.failed.load(Ordering::Relaxed) {
                return Err(AudioError::Playback("output stream failed".into()));
            }
            if !self.running.load(Ordering::Relaxed) {
                return Ok(());
            }
            let pushed = self.producer.push_slice(rest);
            rest = &rest[pushed..];
            if !rest.is_empty() {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        self.stream
            .play()
            .map_err(|e| AudioError::Playback(e.to_string()))
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        self.stream
            .pause()
            .map_err(|e| AudioError::Playback(e.to_string()))
    }
}
