// Trait-based platform abstraction for digital outputs and delays (shared)

use crate::types::Level;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpioError {
    #[error("failed to configure GPIO {pin} as output")]
    ConfigureFailed { pin: u8 },
    #[error("failed to drive GPIO {pin} {level}")]
    WriteFailed { pin: u8, level: Level },
}

/// Digital output lines addressed by BCM GPIO number.
///
/// `configure_output` must be idempotent. A failed write is fatal for the
/// caller's current operation and is never retried at this layer.
pub trait OutputPins: Send {
    fn configure_output(&mut self, pin: u8) -> Result<(), GpioError>;
    fn write_output(&mut self, pin: u8, level: Level) -> Result<(), GpioError>;
}

/// Monotonic time source with a blocking delay.
pub trait TimeInterface: Send + Sync {
    /// Time elapsed since the clock was created.
    fn elapsed(&self) -> Duration;
    fn sleep(&self, duration: Duration);
}

impl<P: OutputPins + ?Sized> OutputPins for Box<P> {
    fn configure_output(&mut self, pin: u8) -> Result<(), GpioError> {
        (**self).configure_output(pin)
    }

    fn write_output(&mut self, pin: u8, level: Level) -> Result<(), GpioError> {
        (**self).write_output(pin, level)
    }
}

impl<T: TimeInterface + ?Sized> TimeInterface for Arc<T> {
    fn elapsed(&self) -> Duration {
        (**self).elapsed()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}
