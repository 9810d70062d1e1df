//! Simulated GPIO platform and virtual clock.
//!
//! Both types are cheap handles over shared state so a test (or the CLI)
//! can keep a clone and inspect what the stepper core did after handing the
//! original over.

use pistep_shared::{GpioError, Level, OutputPins, TimeInterface};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A single output transition recorded by [`SimulatedGpio`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinEvent {
    pub at: Duration,
    pub pin: u8,
    pub level: Level,
}

#[derive(Debug, Default)]
struct GpioState {
    configured: BTreeSet<u8>,
    levels: BTreeMap<u8, Level>,
    events: Vec<PinEvent>,
    writes: usize,
    fail_after: Option<usize>,
    fail_configure: BTreeSet<u8>,
    fail_writes: BTreeSet<u8>,
    recording_off: bool,
}

/// In-memory output lines that record every write.
#[derive(Clone, Default)]
pub struct SimulatedGpio {
    state: Arc<Mutex<GpioState>>,
    clock: Option<Arc<dyn TimeInterface>>,
}

impl std::fmt::Debug for SimulatedGpio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("SimulatedGpio")
            .field("configured", &state.configured)
            .field("levels", &state.levels)
            .field("writes", &state.writes)
            .finish()
    }
}

impl SimulatedGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp recorded events with `clock`.
    pub fn with_clock(clock: Arc<dyn TimeInterface>) -> Self {
        Self {
            state: Arc::default(),
            clock: Some(clock),
        }
    }

    /// Make every write after the first `writes` successful ones fail.
    pub fn fail_after(&self, writes: usize) {
        lock(&self.state).fail_after = Some(writes);
    }

    pub fn fail_configure(&self, pin: u8) {
        lock(&self.state).fail_configure.insert(pin);
    }

    /// Make every write to `pin` fail.
    pub fn fail_writes_to(&self, pin: u8) {
        lock(&self.state).fail_writes.insert(pin);
    }

    /// Stop or resume appending to the event log. Levels and write counts
    /// are tracked either way.
    pub fn set_recording(&self, enabled: bool) {
        lock(&self.state).recording_off = !enabled;
    }

    pub fn is_configured(&self, pin: u8) -> bool {
        lock(&self.state).configured.contains(&pin)
    }

    pub fn level(&self, pin: u8) -> Option<Level> {
        lock(&self.state).levels.get(&pin).copied()
    }

    pub fn events(&self) -> Vec<PinEvent> {
        lock(&self.state).events.clone()
    }

    /// Recorded events for a single pin.
    pub fn events_for(&self, pin: u8) -> Vec<PinEvent> {
        lock(&self.state).events.iter().filter(|e| e.pin == pin).copied().collect()
    }

    /// Number of rising edges seen on `pin`.
    pub fn rising_edges(&self, pin: u8) -> usize {
        let mut previous = None;
        let mut edges = 0;
        for event in self.events_for(pin) {
            if event.level == Level::High && previous != Some(Level::High) {
                edges += 1;
            }
            previous = Some(event.level);
        }
        edges
    }

    pub fn clear_events(&self) {
        lock(&self.state).events.clear();
    }
}

impl OutputPins for SimulatedGpio {
    fn configure_output(&mut self, pin: u8) -> Result<(), GpioError> {
        let mut state = lock(&self.state);
        if state.fail_configure.contains(&pin) {
            return Err(GpioError::ConfigureFailed { pin });
        }
        if state.configured.insert(pin) {
            tracing::trace!(pin, "configured output");
        }
        Ok(())
    }

    fn write_output(&mut self, pin: u8, level: Level) -> Result<(), GpioError> {
        let at = self.clock.as_ref().map(|c| c.elapsed()).unwrap_or_default();
        let mut state = lock(&self.state);
        if !state.configured.contains(&pin) {
            return Err(GpioError::WriteFailed { pin, level });
        }
        if state.fail_writes.contains(&pin) || state.fail_after.is_some_and(|limit| state.writes >= limit) {
            return Err(GpioError::WriteFailed { pin, level });
        }
        state.writes += 1;
        state.levels.insert(pin, level);
        if !state.recording_off {
            state.events.push(PinEvent { at, pin, level });
        }
        tracing::trace!(pin, %level, ?at, "output");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ClockState {
    now: Duration,
    sleeps: Vec<Duration>,
}

/// Clock whose `sleep` advances virtual time instantly.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    state: Arc<Mutex<ClockState>>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delay requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        lock(&self.state).sleeps.clone()
    }
}

impl TimeInterface for SimClock {
    fn elapsed(&self) -> Duration {
        lock(&self.state).now
    }

    fn sleep(&self, duration: Duration) {
        let mut state = lock(&self.state);
        state.now += duration;
        state.sleeps.push(duration);
    }
}
