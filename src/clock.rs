//! Monotonic interval timing for backend calls
//!
//! Latency is measured with [`std::time::Instant`], never by wall-clock
//! subtraction, so a system clock adjustment mid-call cannot produce a
//! negative or skewed duration. Each timer handle is an independent value;
//! concurrent calls never share timer state.

use std::time::Instant;

/// A started interval timer for a single backend call.
///
/// Obtained from [`CallTimer::start`]; consumed by [`CallTimer::stop`], which
/// returns the elapsed time in seconds. The result is always finite and
/// non-negative (zero is valid for an instantaneous call).
#[derive(Debug, Clone, Copy)]
pub struct CallTimer {
    started: Instant,
}

impl CallTimer {
    /// Starts timing now.
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Stops the timer and returns the elapsed seconds.
    pub fn stop(self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}
