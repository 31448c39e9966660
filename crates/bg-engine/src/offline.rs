//! Offline mixdown of an arrangement.

use bg_ir::{song_length, Arrangement, AudioBuffer, RENDER_QUANTUM};

use crate::config::{ExportConfig, MasterConfig, MetronomeConfig, TransportConfig};
use crate::error::EngineError;
use crate::mixer::Mixer;

/// Render `config.bars` bars of `arrangement` into a new buffer.
///
/// The grid repeats once per bar. Step times are relative to the start of
/// the render, and voices are built a look-ahead window before they sound,
/// as in live playback, so pooled units are recycled across the song. The
/// metronome is never rendered.
///
/// The result holds exactly `round(song_length * sample_rate)` frames, in
/// stereo, or mono when `config.channels` is 1.
pub fn export(arrangement: &Arrangement, config: &ExportConfig) -> Result<AudioBuffer, EngineError> {
    if arrangement.is_empty() {
        return Err(EngineError::EmptyArrangement);
    }
    let bars = config.bars.max(1);
    let master = MasterConfig {
        volume: arrangement.master_volume(),
        ..config.master
    };
    let mut mixer = Mixer::new(
        config.sample_rate,
        &master,
        config.makeup,
        MetronomeConfig::default(),
        config.seed,
    )?;
    let sample_rate = mixer.context().sample_rate();
    for track in &arrangement.tracks {
        mixer.bus_input(track)?;
    }

    let length = song_length(bars, arrangement.bpm());
    let frames = (length * sample_rate as f64).round() as usize;
    let step_duration = arrangement.step_duration();
    let step_count = arrangement.step_count();
    let total_steps = bars as usize * step_count;
    let ahead = TransportConfig::default().schedule_ahead;

    let mut out = AudioBuffer::new(2, frames, sample_rate);
    let mut next = 0;
    let mut voices = 0;
    let mut offset = 0;
    while offset < frames {
        let horizon = mixer.current_time() + ahead;
        while next < total_steps {
            let time = next as f64 * step_duration;
            if time > horizon {
                break;
            }
            voices += mixer.schedule_step(arrangement, next % step_count, time);
            next += 1;
        }
        mixer.render_quantum();
        out.write_at(offset, mixer.output());
        offset += RENDER_QUANTUM;
    }
    log::debug!(
        "exported {} bars ({:.2}s, {} voices) at {} Hz",
        bars,
        length,
        voices,
        sample_rate
    );

    Ok(if config.channels == 1 { downmix(&out) } else { out })
}

fn downmix(stereo: &AudioBuffer) -> AudioBuffer {
    let mut mono = AudioBuffer::new(1, stereo.frames(), stereo.sample_rate());
    let (l, r) = (stereo.channel(0), stereo.channel(1));
    for (i, s) in mono.channel_mut(0).iter_mut().enumerate() {
        *s = 0.5 * (l[i] + r[i]);
    }
    mono
}
