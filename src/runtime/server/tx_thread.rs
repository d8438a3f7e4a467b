//! TX thread runtime.
//!
//! Responsibilities:
//! - Hold the configured send rate with a fixed-period sleep loop.
//! - Generate one sine sample per tick while a target is set; stay idle
//!   (and generate nothing) while the slot is empty.
//! - Best-effort sends: a failed send is logged and the sample dropped.
//! - Once per second, log target, observed rate, and last timestamp.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::net::UdpSocket;
use crate::sample::{Sample, SineWave, wall_clock_ms};
use crate::sync::TargetSlot;

/// Re-check interval while no client is connected.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Pause after a failed send before the next attempt.
const SEND_ERROR_PAUSE: Duration = Duration::from_millis(200);

/// Fixed slack subtracted from each period sleep.
const PERIOD_SLACK: Duration = Duration::from_millis(1);

/// Interval between transmit health log lines.
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(1);

/// Sample send rate in Hz.
///
/// Invariant: always within [`Self::MIN_HZ`, `Self::MAX_HZ`]; out-of-range
/// (or non-finite) requests are clamped rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SendRate(f64);

impl SendRate {
    pub const MIN_HZ: f64 = 1.0;
    pub const MAX_HZ: f64 = 200.0;

    /// Creates a rate, clamping into the valid range.
    #[must_use]
    pub fn clamped(hz: f64) -> Self {
        if hz.is_finite() {
            Self(hz.clamp(Self::MIN_HZ, Self::MAX_HZ))
        } else {
            Self(Self::MIN_HZ)
        }
    }

    /// The rate in Hz.
    #[must_use]
    pub const fn as_hz(self) -> f64 {
        self.0
    }

    /// The tick period this rate corresponds to.
    #[must_use]
    pub fn period(self) -> Duration {
        Duration::from_secs_f64(1.0 / self.0)
    }
}

/// TX thread state and transmit loop.
pub struct TxThread {
    /// UDP socket for sending (shared with the control thread).
    socket: Arc<UdpSocket>,
    target: TargetSlot,
    wave: SineWave,
    var_name: String,
    rate: SendRate,
    stop_flag: Arc<AtomicBool>,
}

impl TxThread {
    pub fn new(
        socket: Arc<UdpSocket>,
        target: TargetSlot,
        wave: SineWave,
        var_name: String,
        rate: SendRate,
        stop_flag: Arc<AtomicBool>,
    ) -> Self {
        Self {
            socket,
            target,
            wave,
            var_name,
            rate,
            stop_flag,
        }
    }

    /// Runs the transmit loop until the stop flag is set.
    ///
    /// Elapsed time for the sine argument is measured from loop entry; the
    /// sleep does not correct for drift across iterations.
    pub fn run(&mut self) {
        let period = self.rate.period();
        let start = Instant::now();

        let mut sent_in_window: u32 = 0;
        let mut window_start = Instant::now();
        let mut last_ts_ms: u64 = 0;

        debug!(rate_hz = self.rate.as_hz(), period_ms = period.as_millis() as u64, "TX loop running");

        while !self.stop_flag.load(Ordering::Relaxed) {
            let Some(target) = self.target.get() else {
                std::thread::sleep(IDLE_POLL);
                continue;
            };

            let sample = Sample {
                ts_ms: wall_clock_ms(),
                value: self.wave.sample(start.elapsed()),
            };
            last_ts_ms = sample.ts_ms;

            let payload = sample.encode(&self.var_name);
            match self.socket.try_send_to(payload.as_bytes(), target) {
                Ok(Some(_)) => sent_in_window += 1,
                Ok(None) => {
                    warn!(client = %target, "data socket not ready, sample dropped");
                    std::thread::sleep(SEND_ERROR_PAUSE);
                }
                Err(e) => {
                    warn!(client = %target, error = %e, "sample send failed");
                    std::thread::sleep(SEND_ERROR_PAUSE);
                }
            }

            let now = Instant::now();
            let window = now.duration_since(window_start);
            if window >= HEALTH_LOG_INTERVAL {
                info!(
                    client = %target,
                    rate_hz = f64::from(sent_in_window) / window.as_secs_f64(),
                    last_ts_ms,
                    "transmit health"
                );
                sent_in_window = 0;
                window_start = now;
            }

            std::thread::sleep(period.saturating_sub(PERIOD_SLACK));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_passes_through_in_range() {
        assert_eq!(SendRate::clamped(30.0).as_hz(), 30.0);
    }

    #[test]
    fn rate_clamps_out_of_range() {
        assert_eq!(SendRate::clamped(0.2).as_hz(), SendRate::MIN_HZ);
        assert_eq!(SendRate::clamped(10_000.0).as_hz(), SendRate::MAX_HZ);
        assert_eq!(SendRate::clamped(f64::NAN).as_hz(), SendRate::MIN_HZ);
    }

    #[test]
    fn rate_derives_period() {
        assert_eq!(SendRate::clamped(200.0).period(), Duration::from_millis(5));
        assert_eq!(SendRate::clamped(1.0).period(), Duration::from_secs(1));
    }
}
