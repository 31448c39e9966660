//! Automatable unit parameters.

use bg_ir::RENDER_QUANTUM;

/// Names of every automatable parameter across unit kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamId {
    Gain,
    Frequency,
    Detune,
    Q,
    /// Shelf/peaking gain of a biquad, in dB.
    FilterGain,
    Pan,
    DelayTime,
    Feedback,
    Threshold,
    Knee,
    Ratio,
    Attack,
    Release,
    PlaybackRate,
    RoomSize,
    Damping,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Curve {
    Set,
    Linear,
    Exponential,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct ParamEvent {
    time: f64,
    value: f64,
    curve: Curve,
}

/// A value with a timeline of scheduled changes.
///
/// Events are kept sorted by time. Between events the value follows the
/// curve of the *later* event: a ramp interpolates from the previous
/// event's value and time, a set holds the previous value until its time.
#[derive(Clone, Debug)]
pub struct AudioParam {
    default: f64,
    min: f64,
    max: f64,
    value: f64,
    events: Vec<ParamEvent>,
}

impl AudioParam {
    pub fn new(default: f64, min: f64, max: f64) -> Self {
        Self {
            default,
            min,
            max,
            value: default,
            events: Vec::new(),
        }
    }

    pub fn default_value(&self) -> f64 {
        self.default
    }

    /// The value used when no automation applies.
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn has_automation(&self) -> bool {
        !self.events.is_empty()
    }

    /// Set the value now, dropping all scheduled automation.
    pub fn set_value(&mut self, value: f64) {
        self.events.clear();
        self.value = self.clamp(value);
    }

    /// Restore the default value and clear automation.
    pub fn reset(&mut self) {
        self.events.clear();
        self.value = self.default;
    }

    pub fn set_value_at(&mut self, value: f64, time: f64) {
        self.insert(ParamEvent {
            time,
            value: self.clamp(value),
            curve: Curve::Set,
        });
    }

    pub fn linear_ramp_to(&mut self, value: f64, end_time: f64) {
        self.insert(ParamEvent {
            time: end_time,
            value: self.clamp(value),
            curve: Curve::Linear,
        });
    }

    /// Exponential ramp. A non-positive target is ignored and the previous
    /// value holds.
    pub fn exponential_ramp_to(&mut self, value: f64, end_time: f64) {
        if !(value > 0.0) {
            log::debug!("ignoring exponential ramp to non-positive {}", value);
            return;
        }
        self.insert(ParamEvent {
            time: end_time,
            value: self.clamp(value),
            curve: Curve::Exponential,
        });
    }

    /// Remove every event at or after `time`.
    pub fn cancel_after(&mut self, time: f64) {
        let keep = self.events.partition_point(|e| e.time < time);
        self.events.truncate(keep);
    }

    /// Smoothly move to `value` over `duration` seconds starting at `now`,
    /// replacing any later automation.
    pub fn ramp_to(&mut self, value: f64, now: f64, duration: f64) {
        let current = self.value_at(now);
        self.cancel_after(now);
        self.set_value_at(current, now);
        self.linear_ramp_to(value, now + duration.max(0.0));
    }

    /// Automation value at time `t`.
    pub fn value_at(&self, t: f64) -> f64 {
        // Index of the first event strictly after t.
        let next = self.events.partition_point(|e| e.time <= t);
        let (prev_time, prev_value) = if next == 0 {
            (0.0, self.value)
        } else {
            let e = &self.events[next - 1];
            (e.time, e.value)
        };
        let Some(e) = self.events.get(next) else {
            return prev_value;
        };
        let span = e.time - prev_time;
        if span <= 0.0 {
            return prev_value;
        }
        let pos = ((t - prev_time) / span).clamp(0.0, 1.0);
        match e.curve {
            Curve::Set => prev_value,
            Curve::Linear => prev_value + (e.value - prev_value) * pos,
            Curve::Exponential => {
                if prev_value <= 0.0 {
                    prev_value
                } else {
                    prev_value * (e.value / prev_value).powf(pos)
                }
            }
        }
    }

    /// Fill `out` with values for one render quantum starting at `t0`.
    ///
    /// Events that can no longer affect output are dropped, so the
    /// timeline stays short while a unit lives.
    pub(crate) fn render(&mut self, t0: f64, inv_rate: f64, out: &mut [f32; RENDER_QUANTUM]) {
        self.prune(t0);
        let t_end = t0 + RENDER_QUANTUM as f64 * inv_rate;
        let constant = match self.events.first() {
            None => Some(self.value),
            Some(first) if self.events.len() == 1 && first.time <= t0 => Some(first.value),
            Some(first) if first.time > t_end && first.curve == Curve::Set => Some(self.value),
            _ => None,
        };
        if let Some(v) = constant {
            out.fill(v as f32);
            return;
        }
        for (i, s) in out.iter_mut().enumerate() {
            *s = self.value_at(t0 + i as f64 * inv_rate) as f32;
        }
    }

    /// Clamp a value (including modulation) into the nominal range.
    #[inline]
    pub(crate) fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.default;
        }
        value.clamp(self.min, self.max)
    }

    fn insert(&mut self, event: ParamEvent) {
        if !event.time.is_finite() {
            return;
        }
        let pos = self.events.partition_point(|e| e.time <= event.time);
        self.events.insert(pos, event);
    }

    /// Drop events that end before the last one at or before `t`.
    fn prune(&mut self, t: f64) {
        let at_or_before = self.events.partition_point(|e| e.time <= t);
        if at_or_before > 1 {
            self.events.drain(..at_or_before - 1);
        }
        // A lone past event is now just the value.
        if self.events.len() == 1 && self.events[0].time <= t {
            self.value = self.events[0].value;
            self.events.clear();
        }
    }
}
