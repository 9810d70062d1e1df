// src/hardware/mod.rs - Platform implementations for the stepper core
pub mod simulated;

pub use simulated::{PinEvent, SimClock, SimulatedGpio};

use pistep_shared::TimeInterface;
use std::time::{Duration, Instant};

/// Wall-clock time source backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    start: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeInterface for StdClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}
