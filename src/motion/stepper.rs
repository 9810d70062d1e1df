// src/motion/stepper.rs - Step/direction pulse sequencer for A4988-style drivers
use pistep_shared::board_config::PinNumbering;
use pistep_shared::config::{ConfigError, StepperConfig};
use pistep_shared::{Direction, GpioError, Level, OutputPins, Resolution, TimeInterface};
use std::time::Duration;
use thiserror::Error;

/// Step pulse width used when none is configured.
pub const DEFAULT_PULSE_HIGH: Duration = Duration::from_micros(100);

#[derive(Debug, Error)]
pub enum StepperError {
    #[error("step rate {rate} steps/s leaves no low time after a {pulse_high:?} pulse")]
    InvalidStepRate { rate: f64, pulse_high: Duration },
    #[error("stepper must be initialized before running")]
    NotInitialized,
    #[error("no enable pin configured")]
    MissingEnablePin,
    #[error("Hardware error: {0}")]
    Hardware(#[from] GpioError),
}

/// BCM GPIO lines owned by one stepper driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepperPins {
    pub step: u8,
    pub dir: u8,
    /// MS1, MS2, MS3.
    pub mode: [u8; 3],
    pub enable: Option<u8>,
}

impl StepperPins {
    pub fn from_config(config: &StepperConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let resolve = |pin: u8| resolve_pin(config.numbering, pin);
        Ok(Self {
            step: resolve(config.step_pin)?,
            dir: resolve(config.dir_pin)?,
            mode: [
                resolve(config.ms1_pin)?,
                resolve(config.ms2_pin)?,
                resolve(config.ms3_pin)?,
            ],
            enable: config.enable_pin.map(resolve).transpose()?,
        })
    }

    /// Every owned line: step, dir, MS1..MS3, then enable if present.
    pub fn lines(&self) -> impl Iterator<Item = u8> + '_ {
        [self.step, self.dir]
            .into_iter()
            .chain(self.mode)
            .chain(self.enable)
    }
}

fn resolve_pin(numbering: PinNumbering, pin: u8) -> Result<u8, ConfigError> {
    numbering
        .to_gpio(pin)
        .ok_or_else(|| ConfigError::Invalid(format!("pin {} is not a GPIO in {:?} numbering", pin, numbering)))
}

/// Pin roles plus the fixed pulse shape for one driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepperSettings {
    pub pins: StepperPins,
    pub pulse_high: Duration,
    /// Level that starts a step; the opposite level is idle.
    pub step_active: Level,
}

impl StepperSettings {
    pub fn new(pins: StepperPins) -> Self {
        Self {
            pins,
            pulse_high: DEFAULT_PULSE_HIGH,
            step_active: Level::High,
        }
    }

    pub fn from_config(config: &StepperConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            pins: StepperPins::from_config(config)?,
            pulse_high: Duration::from_micros(config.pulse_high_us),
            step_active: if config.step_active_low { Level::Low } else { Level::High },
        })
    }
}

/// High and low phase of one step pulse at a given rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseTiming {
    pub high: Duration,
    pub low: Duration,
}

impl PulseTiming {
    /// Fails unless `1 / step_rate >= pulse_high`.
    pub fn new(step_rate: f64, pulse_high: Duration) -> Result<Self, StepperError> {
        let invalid = || StepperError::InvalidStepRate { rate: step_rate, pulse_high };
        if !step_rate.is_finite() || step_rate <= 0.0 {
            return Err(invalid());
        }
        let low = 1.0 / step_rate - pulse_high.as_secs_f64();
        if low < 0.0 {
            return Err(invalid());
        }
        Ok(Self {
            high: pulse_high,
            low: Duration::try_from_secs_f64(low).map_err(|_| invalid())?,
        })
    }

    pub fn period(&self) -> Duration {
        self.high + self.low
    }
}

/// Step rate in pulses per second that turns the shaft at `rpm`.
pub fn step_rate_for_rpm(rpm: f64, full_steps_per_rotation: u32, resolution: Resolution) -> f64 {
    rpm / 60.0 * f64::from(full_steps_per_rotation) * f64::from(resolution.microsteps())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Uninitialized,
    Idle,
    Pulsing,
}

/// Result of a completed [`PulseSequencer::run`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub steps: u64,
    pub timing: PulseTiming,
    pub elapsed: Duration,
}

/// Drives one step/direction driver through blocking, strictly ordered pulses.
pub struct PulseSequencer<P: OutputPins, T: TimeInterface> {
    settings: StepperSettings,
    platform: P,
    clock: T,
    state: SequencerState,
    direction: Option<Direction>,
    resolution: Option<Resolution>,
    enabled: bool,
}

impl<P: OutputPins, T: TimeInterface> PulseSequencer<P, T> {
    /// Configures every line as an output and parks it: DIR high, mode lines
    /// at full step, step line idle, driver disabled.
    pub fn new(settings: StepperSettings, mut platform: P, clock: T) -> Result<Self, StepperError> {
        let pins = settings.pins;
        for pin in pins.lines() {
            platform.configure_output(pin)?;
        }
        platform.write_output(pins.dir, Level::High)?;
        for (pin, level) in pins.mode.into_iter().zip(Resolution::Full.mode_levels()) {
            platform.write_output(pin, level)?;
        }
        platform.write_output(pins.step, !settings.step_active)?;
        if let Some(enable) = pins.enable {
            platform.write_output(enable, Level::Low)?;
        }
        tracing::info!(
            step = pins.step,
            dir = pins.dir,
            pulse_high_us = settings.pulse_high.as_micros() as u64,
            "stepper lines configured"
        );
        Ok(Self {
            settings,
            platform,
            clock,
            state: SequencerState::Uninitialized,
            direction: None,
            resolution: None,
            enabled: false,
        })
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn settings(&self) -> &StepperSettings {
        &self.settings
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Set DIR and MS1..MS3 for the next motion. Touches no other line.
    pub fn initialize(&mut self, direction: Direction, resolution: Resolution) -> Result<(), StepperError> {
        // a partial write leaves the lines unknown, so no run until this completes
        self.state = SequencerState::Uninitialized;
        self.direction = None;
        self.resolution = None;
        let pins = self.settings.pins;
        self.platform.write_output(pins.dir, direction.level())?;
        for (pin, level) in pins.mode.into_iter().zip(resolution.mode_levels()) {
            self.platform.write_output(pin, level)?;
        }
        self.direction = Some(direction);
        self.resolution = Some(resolution);
        self.state = SequencerState::Idle;
        tracing::info!(%direction, %resolution, "stepper initialized");
        Ok(())
    }

    /// Emit exactly `steps` pulses at `step_rate` steps per second.
    ///
    /// The timing is derived once up front, so an impossible rate fails before
    /// any line moves. A write failure aborts immediately and may leave the
    /// step line active; the owner of the lines is expected to call
    /// [`release`](Self::release).
    pub fn run(&mut self, step_rate: f64, steps: u64) -> Result<RunSummary, StepperError> {
        if self.state == SequencerState::Uninitialized {
            return Err(StepperError::NotInitialized);
        }
        let timing = PulseTiming::new(step_rate, self.settings.pulse_high)?;
        tracing::info!(step_rate, steps, low = ?timing.low, "run start");

        let started = self.clock.elapsed();
        self.state = SequencerState::Pulsing;
        let result = self.pulse(timing, steps);
        self.state = SequencerState::Idle;
        result?;

        let elapsed = self.clock.elapsed().saturating_sub(started);
        tracing::info!(steps, ?elapsed, "run complete");
        Ok(RunSummary { steps, timing, elapsed })
    }

    fn pulse(&mut self, timing: PulseTiming, steps: u64) -> Result<(), GpioError> {
        let step = self.settings.pins.step;
        let active = self.settings.step_active;
        let mut remaining = steps;
        while remaining > 0 {
            self.platform.write_output(step, active)?;
            self.clock.sleep(timing.high);
            self.platform.write_output(step, !active)?;
            self.clock.sleep(timing.low);
            remaining -= 1;
        }
        Ok(())
    }

    pub fn enable(&mut self) -> Result<(), StepperError> {
        let pin = self.settings.pins.enable.ok_or(StepperError::MissingEnablePin)?;
        self.platform.write_output(pin, Level::High)?;
        self.enabled = true;
        tracing::debug!(pin, "driver enabled");
        Ok(())
    }

    pub fn disable(&mut self) -> Result<(), StepperError> {
        let pin = self.settings.pins.enable.ok_or(StepperError::MissingEnablePin)?;
        self.platform.write_output(pin, Level::Low)?;
        self.enabled = false;
        tracing::debug!(pin, "driver disabled");
        Ok(())
    }

    /// Park the step line at its idle level, drive every other owned line
    /// low and return to `Uninitialized`.
    ///
    /// Every line is attempted even if an earlier write fails; the first
    /// failure is returned.
    pub fn release(&mut self) -> Result<(), StepperError> {
        let mut first_error = None;
        let pins = self.settings.pins;
        let idle = !self.settings.step_active;
        // enable goes first so the driver is off before its inputs drop
        let writes = pins
            .enable
            .map(|pin| (pin, Level::Low))
            .into_iter()
            .chain([(pins.step, idle), (pins.dir, Level::Low)])
            .chain(pins.mode.map(|pin| (pin, Level::Low)));
        for (pin, level) in writes {
            if let Err(e) = self.platform.write_output(pin, level) {
                tracing::warn!(pin, "release failed: {}", e);
                first_error.get_or_insert(e);
            }
        }
        self.enabled = false;
        self.direction = None;
        self.resolution = None;
        self.state = SequencerState::Uninitialized;
        tracing::info!("stepper lines released");
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    pub fn into_parts(self) -> (P, T) {
        (self.platform, self.clock)
    }
}
