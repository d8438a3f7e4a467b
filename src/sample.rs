//! Sine-wave sample generation and payload encoding.

use std::f64::consts::TAU;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A synthetic sine signal: `amplitude * sin(2π * frequency * t)`.
///
/// Stateless between samples; `t` is supplied by the caller as elapsed time
/// since the transmitter started.
#[derive(Debug, Clone, Copy)]
pub struct SineWave {
    amplitude: f64,
    frequency_hz: f64,
}

impl SineWave {
    /// Creates a wave with the given amplitude and frequency.
    #[must_use]
    pub const fn new(amplitude: f64, frequency_hz: f64) -> Self {
        Self {
            amplitude,
            frequency_hz,
        }
    }

    /// Evaluates the wave at the given elapsed time.
    #[must_use]
    pub fn sample(&self, elapsed: Duration) -> f64 {
        self.amplitude * (TAU * self.frequency_hz * elapsed.as_secs_f64()).sin()
    }
}

/// One generated sample: wall-clock timestamp plus signal value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Wall-clock milliseconds since the Unix epoch.
    pub ts_ms: u64,
    /// Signal value at generation time.
    pub value: f64,
}

impl Sample {
    /// Encodes the two-line datagram payload for this sample:
    ///
    /// ```text
    /// >{var}:{ts_ms}:{value}|g\n{value}\n
    /// ```
    ///
    /// The `|g` suffix is a Graphite-style gauge tag. The line terminator
    /// is the literal two-character sequence `\n`, not a real newline; the
    /// downstream plotting tool splits on the escaped form and expects the
    /// bare value repeated on the second line.
    #[must_use]
    pub fn encode(&self, var_name: &str) -> String {
        let Self { ts_ms, value } = self;
        format!(">{var_name}:{ts_ms}:{value}|g\\n{value}\\n")
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_starts_at_zero() {
        let wave = SineWave::new(1.0, 1.0);
        assert!(wave.sample(Duration::ZERO).abs() < 1e-12);
    }

    #[test]
    fn sine_peaks_at_quarter_period() {
        // 2 Hz wave peaks at t = 125 ms.
        let wave = SineWave::new(3.5, 2.0);
        let peak = wave.sample(Duration::from_millis(125));
        assert!((peak - 3.5).abs() < 1e-9, "got {peak}");
    }

    #[test]
    fn sine_respects_amplitude_bound() {
        let wave = SineWave::new(0.25, 7.3);
        for ms in (0..2000).step_by(17) {
            let v = wave.sample(Duration::from_millis(ms));
            assert!(v.abs() <= 0.25 + 1e-12);
        }
    }

    #[test]
    fn payload_uses_literal_escapes() {
        let sample = Sample {
            ts_ms: 1700000000123,
            value: 0.5,
        };
        assert_eq!(sample.encode("sin"), ">sin:1700000000123:0.5|g\\n0.5\\n");
        // No actual newline anywhere in the payload.
        assert!(!sample.encode("sin").contains('\n'));
    }

    #[test]
    fn wall_clock_is_plausible() {
        // 2023-01-01 in ms; anything earlier means the clock read failed.
        assert!(wall_clock_ms() > 1_672_531_200_000);
    }
}
