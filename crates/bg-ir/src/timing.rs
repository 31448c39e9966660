//! Musical time to seconds.

use arrayvec::ArrayString;
use core::fmt::Write;

/// Quarter notes per bar. The grid always spans one 4/4 bar.
pub const BEATS_PER_BAR: u32 = 4;

/// Seconds per grid step: one bar of four quarter notes split into
/// `steps_per_bar` slots, i.e. `240 / (bpm * steps)`.
pub fn step_duration(bpm: f64, steps_per_bar: usize) -> f64 {
    (60.0 * BEATS_PER_BAR as f64) / (bpm * steps_per_bar as f64)
}

/// Length in seconds of `bars` whole bars at `bpm`.
pub fn song_length(bars: u32, bpm: f64) -> f64 {
    bars as f64 * BEATS_PER_BAR as f64 * (60.0 / bpm)
}

/// Frequency ratio for a pitch offset in semitones.
pub fn semitones_to_ratio(semitones: f64) -> f64 {
    libm::pow(2.0, semitones / 12.0)
}

/// Format elapsed seconds as `m:ss` for the transport display.
///
/// Negative and non-finite inputs read as `0:00`.
pub fn format_time(seconds: f64) -> ArrayString<16> {
    let total = if seconds.is_finite() && seconds > 0.0 {
        libm::floor(seconds) as u64
    } else {
        0
    };
    let mut out = ArrayString::new();
    let _ = write!(out, "{}:{:02}", total / 60, total % 60);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixteen_steps_at_120() {
        assert_eq!(step_duration(120.0, 16), 0.125);
    }

    #[test]
    fn step_duration_matches_formula() {
        for &(bpm, steps) in &[(90.0, 8usize), (133.0, 12), (174.5, 32)] {
            let expected = 240.0 / (bpm * steps as f64);
            assert!((step_duration(bpm, steps) - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn four_bars_at_120_is_eight_seconds() {
        assert_eq!(song_length(4, 120.0), 8.0);
    }

    #[test]
    fn octave_ratio() {
        assert!((semitones_to_ratio(12.0) - 2.0).abs() < 1e-12);
        assert!((semitones_to_ratio(-12.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn format_time_pads_seconds() {
        assert_eq!(format_time(0.0).as_str(), "0:00");
        assert_eq!(format_time(7.9).as_str(), "0:07");
        assert_eq!(format_time(65.2).as_str(), "1:05");
        assert_eq!(format_time(-3.0).as_str(), "0:00");
        assert_eq!(format_time(f64::NAN).as_str(), "0:00");
    }
}
