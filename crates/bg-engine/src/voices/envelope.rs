//! ADSR gain envelopes as parameter automation.

use arrayvec::ArrayVec;

use crate::graph::AudioParam;

/// Level envelopes start from and fall back to.
pub const FLOOR: f64 = 0.0001;

/// Offset added to exponential breakpoints so ramps never share a time
/// with the point before them.
const EXP_NUDGE: f64 = 0.0001;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Curve {
    Linear,
    Exponential,
}

/// One automation point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Point {
    /// Jump to `value` at `time`.
    Set { time: f64, value: f64 },
    /// Ramp from the previous point to `value`, arriving at `time`.
    Ramp { time: f64, value: f64 },
}

impl Point {
    pub fn time(&self) -> f64 {
        match *self {
            Point::Set { time, .. } | Point::Ramp { time, .. } => time,
        }
    }

    pub fn value(&self) -> f64 {
        match *self {
            Point::Set { value, .. } | Point::Ramp { value, .. } => value,
        }
    }
}

/// Attack to `peak`, decay to `peak * sustain`, hold, release to the floor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Adsr {
    pub attack: f64,
    pub decay: f64,
    /// Fraction of `peak`
    pub sustain: f64,
    pub release: f64,
    pub peak: f64,
    pub curve: Curve,
}

impl Adsr {
    /// Breakpoints for a note at `start` lasting `duration` seconds.
    ///
    /// The release begins at `start + duration - release`. If that falls
    /// before the decay ends, the release collapses into one ramp to the
    /// floor ending at `start + duration`. A gate that ends inside the decay
    /// drops the decay; one that ends inside the attack rises for the first
    /// half of the gate and falls for the second. The last point is never
    /// later than the gate end.
    pub fn points(&self, start: f64, duration: f64) -> ArrayVec<Point, 5> {
        let a = self.attack.max(0.0);
        let d = self.decay.max(0.0);
        let r = self.release.max(0.0);
        let dur = duration.max(0.0);
        let (nudge, floor) = match self.curve {
            Curve::Linear => (0.0, 0.0),
            Curve::Exponential => (EXP_NUDGE, FLOOR),
        };
        let peak = self.peak.max(floor);
        let held = (self.peak * self.sustain.max(0.0)).max(floor);
        let attack_end = start + a;
        let decay_end = attack_end + d;
        let gate_end = start + dur;
        let release_start = gate_end - r;

        let mut points = ArrayVec::new();
        points.push(Point::Set { time: start, value: FLOOR });
        if gate_end < attack_end {
            let mid = start + dur / 2.0;
            let reached = self.attack_level(peak, (mid - start) / a);
            points.push(Point::Ramp { time: mid + nudge, value: reached });
            points.push(Point::Ramp { time: gate_end + nudge, value: FLOOR });
            return points;
        }
        points.push(Point::Ramp { time: attack_end + nudge, value: peak });
        if gate_end < decay_end {
            points.push(Point::Ramp { time: gate_end + nudge, value: FLOOR });
            return points;
        }
        points.push(Point::Ramp { time: decay_end + nudge, value: held });
        if release_start > decay_end {
            points.push(Point::Set { time: release_start, value: held });
            points.push(Point::Ramp { time: release_start + r + nudge, value: FLOOR });
        } else {
            points.push(Point::Ramp { time: gate_end + nudge, value: FLOOR });
        }
        points
    }

    /// Level the attack ramp has reached after `fraction` of its length.
    fn attack_level(&self, peak: f64, fraction: f64) -> f64 {
        let fraction = fraction.clamp(0.0, 1.0);
        match self.curve {
            Curve::Linear => FLOOR + (peak - FLOOR) * fraction,
            Curve::Exponential => FLOOR * (peak / FLOOR).powf(fraction),
        }
    }

    /// Write the envelope onto `param`; returns the time of the last point.
    pub fn apply(&self, param: &mut AudioParam, start: f64, duration: f64) -> f64 {
        let points = self.points(start, duration);
        write_points(param, &points, self.curve)
    }
}

/// Write `points` onto `param` with ramps of the given curve.
pub fn write_points(param: &mut AudioParam, points: &[Point], curve: Curve) -> f64 {
    let mut end = 0.0f64;
    for p in points {
        match (*p, curve) {
            (Point::Set { time, value }, _) => param.set_value_at(value, time),
            (Point::Ramp { time, value }, Curve::Linear) => param.linear_ramp_to(value, time),
            (Point::Ramp { time, value }, Curve::Exponential) => param.exponential_ramp_to(value, time),
        }
        end = end.max(p.time());
    }
    end
}
