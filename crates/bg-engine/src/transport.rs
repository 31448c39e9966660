//! Look-ahead step scheduling.
//!
//! The transport turns a clock reading into absolute step timestamps. It
//! keeps a monotonic watermark (the next absolute step not yet scheduled),
//! so each step is handed out exactly once however irregular the ticks are.
//! It knows nothing about tracks or voices; callers decide what a step
//! triggers.

use arrayvec::ArrayString;
use bg_ir::format_time;

use crate::config::TransportConfig;

/// One grid step due to be scheduled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepEvent {
    /// Steps since the transport started
    pub index: u64,
    /// Position in the grid (`index % step_count`)
    pub step: usize,
    /// Absolute context time of the step, seconds
    pub time: f64,
}

/// Transport position for display.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Playhead {
    /// Grid step currently sounding, `None` while stopped or before step 0
    pub step: Option<usize>,
    /// Seconds since step 0
    pub elapsed: f64,
    /// `m:ss`
    pub display: ArrayString<16>,
}

impl Playhead {
    pub fn stopped() -> Self {
        Self {
            step: None,
            elapsed: 0.0,
            display: format_time(0.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum State {
    Stopped,
    Running {
        /// Time of absolute step 0.
        origin: f64,
        /// Step length the origin was computed for.
        step_duration: f64,
    },
}

/// Stopped/Running state machine with a step watermark.
#[derive(Clone, Debug)]
pub struct Transport {
    config: TransportConfig,
    state: State,
    /// Next absolute step index to schedule.
    watermark: u64,
}

impl Transport {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            state: State::Stopped,
            watermark: 0,
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running { .. })
    }

    /// Next absolute step that has not been scheduled.
    pub fn watermark(&self) -> u64 {
        self.watermark
    }

    /// Start with step 0 a short offset after `now`. Ignored while running.
    pub fn start(&mut self, now: f64, step_duration: f64) {
        if self.is_running() {
            return;
        }
        let origin = now + self.config.start_offset;
        self.state = State::Running {
            origin,
            step_duration: sanitize(step_duration),
        };
        self.watermark = 0;
        log::debug!("transport started, step 0 at {:.3}s", origin);
    }

    /// Stop scheduling. Voices already scheduled play out.
    pub fn stop(&mut self) {
        if self.is_running() {
            log::debug!("transport stopped after {} steps", self.watermark);
        }
        self.state = State::Stopped;
        self.watermark = 0;
    }

    /// Time of absolute step `index`, if running.
    pub fn step_time(&self, index: u64) -> Option<f64> {
        match self.state {
            State::Stopped => None,
            State::Running { origin, step_duration } => Some(origin + index as f64 * step_duration),
        }
    }

    /// Hand every step that falls within the look-ahead window to `f`, in
    /// order, and advance the watermark past them.
    ///
    /// A tempo or grid change between ticks re-anchors the timeline at the
    /// watermark, so the next step keeps its time and later steps follow
    /// the new length. Every index is handed out exactly once: steps that
    /// slipped into the past during a stalled tick still come out, with
    /// their grid times, and the caller starts them late.
    pub fn tick<F>(&mut self, now: f64, step_duration: f64, step_count: usize, mut f: F) -> usize
    where
        F: FnMut(StepEvent),
    {
        let State::Running { origin, step_duration: old } = self.state else {
            return 0;
        };
        let step_count = step_count.max(1);
        let sd = sanitize(step_duration);
        let origin = if sd != old {
            let next = origin + self.watermark as f64 * old;
            let rebased = next - self.watermark as f64 * sd;
            self.state = State::Running {
                origin: rebased,
                step_duration: sd,
            };
            rebased
        } else {
            origin
        };

        let behind = now - (origin + self.watermark as f64 * sd);
        if behind > sd {
            log::warn!("transport fell behind by {:.3}s, late steps start now", behind);
        }

        let horizon = now + self.config.schedule_ahead;
        let mut scheduled = 0;
        loop {
            let index = self.watermark;
            let time = origin + index as f64 * sd;
            if time > horizon {
                break;
            }
            f(StepEvent {
                index,
                step: (index % step_count as u64) as usize,
                time,
            });
            self.watermark += 1;
            scheduled += 1;
        }
        scheduled
    }

    /// Where the transport is at `now`.
    pub fn playhead(&self, now: f64, step_count: usize) -> Playhead {
        let State::Running { origin, step_duration } = self.state else {
            return Playhead::stopped();
        };
        let elapsed = (now - origin).max(0.0);
        let step = if now >= origin {
            Some(((elapsed / step_duration).floor() as u64 % step_count.max(1) as u64) as usize)
        } else {
            None
        };
        Playhead {
            step,
            elapsed,
            display: format_time(elapsed),
        }
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

fn sanitize(step_duration: f64) -> f64 {
    if step_duration.is_finite() && step_duration > 0.0 {
        step_duration
    } else {
        bg_ir::step_duration(bg_ir::DEFAULT_BPM, bg_ir::DEFAULT_STEP_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SD: f64 = 0.125;

    fn collect(t: &mut Transport, now: f64, sd: f64, steps: usize) -> Vec<StepEvent> {
        let mut out = Vec::new();
        t.tick(now, sd, steps, |e| out.push(e));
        out
    }

    #[test]
    fn stopped_schedules_nothing() {
        let mut t = Transport::default();
        assert!(collect(&mut t, 1.0, SD, 16).is_empty());
        assert_eq!(t.playhead(1.0, 16), Playhead::stopped());
    }

    #[test]
    fn first_tick_fills_the_window() {
        let mut t = Transport::default();
        t.start(0.0, SD);
        let events = collect(&mut t, 0.0, SD, 16);
        // Step 0 at 0.05, step 1 at 0.175; the window ends at 0.2.
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].time, 0.05);
        assert_eq!(events[1].step, 1);
        assert_eq!(t.watermark(), 2);
    }

    #[test]
    fn jittery_ticks_schedule_each_step_once() {
        let mut t = Transport::default();
        t.start(0.0, SD);
        let mut seen = Vec::new();
        let mut now = 0.0;
        for jitter in [0.05, 0.01, 0.09, 0.0, 0.03, 0.12, 0.05, 0.002, 0.07, 0.05] {
            now += jitter;
            t.tick(now, SD, 16, |e| seen.push(e.index));
            t.tick(now, SD, 16, |e| seen.push(e.index));
        }
        let expected: Vec<u64> = (0..seen.len() as u64).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn grid_position_wraps() {
        let mut t = Transport::default();
        t.start(0.0, SD);
        let events = collect(&mut t, 0.05 + 17.0 * SD, SD, 16);
        assert!(events.iter().all(|e| e.step == (e.index % 16) as usize));
        assert!(events.iter().any(|e| e.step == 1 && e.index == 17));
    }

    #[test]
    fn stall_hands_out_every_missed_step() {
        let mut t = Transport::default();
        t.start(0.0, SD);
        let mut seen: Vec<u64> = collect(&mut t, 0.0, SD, 16).iter().map(|e| e.index).collect();
        let late = collect(&mut t, 2.0, SD, 16);
        seen.extend(late.iter().map(|e| e.index));
        let expected: Vec<u64> = (0..seen.len() as u64).collect();
        assert_eq!(seen, expected);
        // Missed steps keep their grid times; the window still ends at now + lookahead.
        assert!((late[0].time - t.step_time(late[0].index).unwrap()).abs() < 1e-12);
        assert!(late[0].time < 2.0);
        assert!(late[late.len() - 1].time <= 2.0 + 0.2);
        assert!(t.step_time(t.watermark()).unwrap() > 2.0 + 0.2);
    }

    #[test]
    fn tempo_change_keeps_next_step_time() {
        let mut t = Transport::default();
        t.start(0.0, SD);
        collect(&mut t, 0.0, SD, 16);
        let next = t.step_time(t.watermark()).unwrap();
        let events = collect(&mut t, 0.2, SD / 2.0, 16);
        assert!((events[0].time - next).abs() < 1e-12);
        assert!((events[1].time - events[0].time - SD / 2.0).abs() < 1e-12);
    }

    #[test]
    fn stop_resets_watermark() {
        let mut t = Transport::default();
        t.start(0.0, SD);
        collect(&mut t, 0.5, SD, 16);
        t.stop();
        assert_eq!(t.watermark(), 0);
        assert!(!t.is_running());
        t.start(10.0, SD);
        assert_eq!(collect(&mut t, 10.0, SD, 16)[0].index, 0);
    }

    #[test]
    fn playhead_tracks_step_and_time() {
        let mut t = Transport::default();
        t.start(0.0, SD);
        assert_eq!(t.playhead(0.01, 16).step, None);
        let p = t.playhead(0.05 + 5.0 * SD + 0.01, 16);
        assert_eq!(p.step, Some(5));
        let late = t.playhead(0.05 + 61.5, 16);
        assert_eq!(late.display.as_str(), "1:01");
    }
}
