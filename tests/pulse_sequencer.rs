// Integration tests for the step/direction pulse sequencer

#[cfg(test)]
mod tests {
    use pistep::hardware::{PinEvent, SimClock, SimulatedGpio, StdClock};
    use pistep::motion::{PulseSequencer, SequencerState, StepperError, StepperPins, StepperSettings};
    use pistep::{Direction, GpioError, Level, Resolution, TimeInterface};
    use std::sync::Arc;
    use std::time::Duration;

    const STEP: u8 = 25;
    const DIR: u8 = 5;
    const MODE: [u8; 3] = [27, 23, 24];
    const ENABLE: u8 = 4;

    fn pins(enable: Option<u8>) -> StepperPins {
        StepperPins { step: STEP, dir: DIR, mode: MODE, enable }
    }

    fn sim_sequencer(settings: StepperSettings) -> (PulseSequencer<SimulatedGpio, SimClock>, SimulatedGpio, SimClock) {
        let clock = SimClock::new();
        let gpio = SimulatedGpio::with_clock(Arc::new(clock.clone()));
        let sequencer = PulseSequencer::new(settings, gpio.clone(), clock.clone()).unwrap();
        (sequencer, gpio, clock)
    }

    #[test]
    fn new_configures_and_parks_lines() {
        let (sequencer, gpio, _) = sim_sequencer(StepperSettings::new(pins(Some(ENABLE))));
        for pin in [STEP, DIR, MODE[0], MODE[1], MODE[2], ENABLE] {
            assert!(gpio.is_configured(pin), "GPIO {} not configured", pin);
        }
        assert_eq!(gpio.level(DIR), Some(Level::High));
        assert_eq!(gpio.level(STEP), Some(Level::Low));
        assert_eq!(gpio.level(ENABLE), Some(Level::Low));
        for pin in MODE {
            assert_eq!(gpio.level(pin), Some(Level::Low));
        }
        assert_eq!(sequencer.state(), SequencerState::Uninitialized);
    }

    #[test]
    fn initialize_sets_mode_lines_for_every_resolution() {
        for resolution in Resolution::ALL {
            let (mut sequencer, gpio, _) = sim_sequencer(StepperSettings::new(pins(Some(ENABLE))));
            gpio.clear_events();
            sequencer.initialize(Direction::Clockwise, resolution).unwrap();

            let levels: Vec<Level> = MODE.iter().map(|pin| gpio.level(*pin).unwrap()).collect();
            assert_eq!(levels, resolution.mode_levels().to_vec(), "{}", resolution);

            let touched: Vec<u8> = gpio.events().iter().map(|e| e.pin).collect();
            assert_eq!(touched, vec![DIR, MODE[0], MODE[1], MODE[2]]);
            assert_eq!(sequencer.state(), SequencerState::Idle);
            assert_eq!(sequencer.resolution(), Some(resolution));
        }
    }

    #[test]
    fn failed_initialize_blocks_run() {
        let (mut sequencer, gpio, _) = sim_sequencer(StepperSettings::new(pins(None)));
        sequencer.initialize(Direction::Clockwise, Resolution::Full).unwrap();
        // setup and the first initialize used 9 writes; the second fails on MS2
        gpio.fail_after(9 + 2);
        let err = sequencer.initialize(Direction::CounterClockwise, Resolution::Sixteenth).unwrap_err();
        assert!(matches!(
            err,
            StepperError::Hardware(GpioError::WriteFailed { pin, level: Level::High }) if pin == MODE[1]
        ));
        assert_eq!(sequencer.state(), SequencerState::Uninitialized);
        assert_eq!(sequencer.direction(), None);
        assert_eq!(sequencer.resolution(), None);

        gpio.clear_events();
        assert!(matches!(sequencer.run(200.0, 3), Err(StepperError::NotInitialized)));
        assert!(gpio.events().is_empty());
    }

    #[test]
    fn directions_drive_distinct_levels() {
        let (mut sequencer, gpio, _) = sim_sequencer(StepperSettings::new(pins(None)));
        sequencer.initialize(Direction::Clockwise, Resolution::Full).unwrap();
        let cw = gpio.level(DIR).unwrap();
        sequencer.initialize(Direction::CounterClockwise, Resolution::Full).unwrap();
        let ccw = gpio.level(DIR).unwrap();
        assert_eq!(cw, Level::High);
        assert_eq!(ccw, Level::Low);
        assert_eq!(sequencer.direction(), Some(Direction::CounterClockwise));
    }

    #[test]
    fn run_emits_exact_pulse_train() {
        let (mut sequencer, gpio, clock) = sim_sequencer(StepperSettings::new(pins(None)));
        sequencer.initialize(Direction::Clockwise, Resolution::Half).unwrap();
        gpio.clear_events();
        let start = clock.sleeps().len();

        let summary = sequencer.run(200.0, 5).unwrap();
        assert_eq!(summary.steps, 5);
        assert_eq!(summary.timing.low, Duration::from_micros(4900));
        assert_eq!(summary.elapsed, Duration::from_millis(25));

        let events = gpio.events();
        assert_eq!(events.len(), 10);
        assert!(events.iter().all(|e| e.pin == STEP));
        for (n, pair) in events.chunks(2).enumerate() {
            let period_start = Duration::from_millis(5) * n as u32;
            assert_eq!(pair[0].level, Level::High);
            assert_eq!(pair[1].level, Level::Low);
            assert_eq!(pair[1].at - pair[0].at, Duration::from_micros(100));
            assert_eq!(pair[0].at - events[0].at, period_start);
        }

        let sleeps = &clock.sleeps()[start..];
        assert_eq!(sleeps.len(), 10);
        for pair in sleeps.chunks(2) {
            assert_eq!(pair, [Duration::from_micros(100), Duration::from_micros(4900)]);
        }
        assert_eq!(sequencer.state(), SequencerState::Idle);
    }

    #[test]
    fn zero_steps_is_a_no_op() {
        let (mut sequencer, gpio, clock) = sim_sequencer(StepperSettings::new(pins(None)));
        sequencer.initialize(Direction::Clockwise, Resolution::Full).unwrap();
        gpio.clear_events();
        let summary = sequencer.run(200.0, 0).unwrap();
        assert_eq!(summary.steps, 0);
        assert!(gpio.events().is_empty());
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn run_counts_match_for_many_step_counts() {
        for steps in [1u64, 2, 7, 64, 1000] {
            let (mut sequencer, gpio, _) = sim_sequencer(StepperSettings::new(pins(None)));
            sequencer.initialize(Direction::CounterClockwise, Resolution::Sixteenth).unwrap();
            gpio.clear_events();
            sequencer.run(3200.0, steps).unwrap();
            assert_eq!(gpio.rising_edges(STEP) as u64, steps);
            assert_eq!(gpio.events_for(STEP).len() as u64, 2 * steps);
        }
    }

    #[test]
    fn excessive_rate_fails_before_any_transition() {
        let (mut sequencer, gpio, clock) = sim_sequencer(StepperSettings::new(pins(None)));
        sequencer.initialize(Direction::Clockwise, Resolution::Full).unwrap();
        gpio.clear_events();
        let err = sequencer.run(20_000.0, 10).unwrap_err();
        assert!(matches!(err, StepperError::InvalidStepRate { .. }));
        assert!(gpio.events().is_empty());
        assert!(clock.sleeps().is_empty());
        assert_eq!(sequencer.state(), SequencerState::Idle);
    }

    #[test]
    fn rate_at_pulse_limit_succeeds() {
        let (mut sequencer, gpio, _) = sim_sequencer(StepperSettings::new(pins(None)));
        sequencer.initialize(Direction::Clockwise, Resolution::Full).unwrap();
        gpio.clear_events();
        let summary = sequencer.run(10_000.0, 3).unwrap();
        assert_eq!(summary.timing.low, Duration::ZERO);
        assert_eq!(gpio.rising_edges(STEP), 3);
    }

    #[test]
    fn run_requires_initialize() {
        let (mut sequencer, gpio, _) = sim_sequencer(StepperSettings::new(pins(None)));
        gpio.clear_events();
        assert!(matches!(sequencer.run(200.0, 1), Err(StepperError::NotInitialized)));
        assert!(gpio.events().is_empty());
    }

    #[test]
    fn write_failure_aborts_mid_sequence() {
        let (mut sequencer, gpio, _) = sim_sequencer(StepperSettings::new(pins(None)));
        sequencer.initialize(Direction::Clockwise, Resolution::Full).unwrap();
        gpio.clear_events();
        // initialize and setup used 9 writes; allow one full pulse plus a rising edge
        gpio.fail_after(9 + 3);
        let err = sequencer.run(200.0, 10).unwrap_err();
        assert!(matches!(
            err,
            StepperError::Hardware(GpioError::WriteFailed { pin: STEP, level: Level::Low })
        ));
        assert_eq!(gpio.events().len(), 3);
        assert_eq!(gpio.level(STEP), Some(Level::High));
        assert_eq!(sequencer.state(), SequencerState::Idle);
    }

    #[test]
    fn active_low_step_inverts_pulse() {
        let mut settings = StepperSettings::new(pins(None));
        settings.step_active = Level::Low;
        let (mut sequencer, gpio, _) = sim_sequencer(settings);
        assert_eq!(gpio.level(STEP), Some(Level::High));
        sequencer.initialize(Direction::Clockwise, Resolution::Full).unwrap();
        gpio.clear_events();
        sequencer.run(1000.0, 2).unwrap();
        let levels: Vec<Level> = gpio.events_for(STEP).iter().map(|e: &PinEvent| e.level).collect();
        assert_eq!(levels, vec![Level::Low, Level::High, Level::Low, Level::High]);

        sequencer.release().unwrap();
        let active_edges = gpio.events_for(STEP).iter().filter(|e| e.level == Level::Low).count();
        assert_eq!(active_edges, 2);
        assert_eq!(gpio.level(STEP), Some(Level::High));
        assert_eq!(gpio.level(DIR), Some(Level::Low));
    }

    #[test]
    fn enable_and_release() {
        let (mut sequencer, gpio, _) = sim_sequencer(StepperSettings::new(pins(Some(ENABLE))));
        sequencer.enable().unwrap();
        assert!(sequencer.is_enabled());
        assert_eq!(gpio.level(ENABLE), Some(Level::High));

        sequencer.initialize(Direction::Clockwise, Resolution::Sixteenth).unwrap();
        sequencer.run(500.0, 4).unwrap();
        gpio.clear_events();

        sequencer.release().unwrap();
        assert_eq!(gpio.events()[0].pin, ENABLE);
        for pin in [STEP, DIR, MODE[0], MODE[1], MODE[2], ENABLE] {
            assert_eq!(gpio.level(pin), Some(Level::Low));
        }
        assert!(!sequencer.is_enabled());
        assert_eq!(sequencer.state(), SequencerState::Uninitialized);
    }

    #[test]
    fn release_attempts_every_line_after_a_failure() {
        let (mut sequencer, gpio, _) = sim_sequencer(StepperSettings::new(pins(Some(ENABLE))));
        sequencer.enable().unwrap();
        sequencer.initialize(Direction::Clockwise, Resolution::Sixteenth).unwrap();
        gpio.clear_events();
        gpio.fail_writes_to(STEP);

        let err = sequencer.release().unwrap_err();
        assert!(matches!(
            err,
            StepperError::Hardware(GpioError::WriteFailed { pin: STEP, level: Level::Low })
        ));
        let written: Vec<u8> = gpio.events().iter().map(|e| e.pin).collect();
        assert_eq!(written, vec![ENABLE, DIR, MODE[0], MODE[1], MODE[2]]);
        for pin in [ENABLE, DIR, MODE[0], MODE[1], MODE[2]] {
            assert_eq!(gpio.level(pin), Some(Level::Low));
        }
        assert_eq!(sequencer.state(), SequencerState::Uninitialized);
    }

    #[test]
    fn into_parts_returns_platform_and_clock() {
        let (mut sequencer, _, _) = sim_sequencer(StepperSettings::new(pins(None)));
        sequencer.initialize(Direction::Clockwise, Resolution::Full).unwrap();
        sequencer.run(100.0, 2).unwrap();
        let (gpio, clock) = sequencer.into_parts();
        assert_eq!(gpio.rising_edges(STEP), 2);
        assert_eq!(clock.elapsed(), Duration::from_millis(20));
    }

    #[test]
    fn enable_without_pin_is_an_error() {
        let (mut sequencer, _, _) = sim_sequencer(StepperSettings::new(pins(None)));
        assert!(matches!(sequencer.enable(), Err(StepperError::MissingEnablePin)));
        assert!(matches!(sequencer.disable(), Err(StepperError::MissingEnablePin)));
    }

    #[test]
    fn configure_failure_is_reported() {
        let gpio = SimulatedGpio::new();
        gpio.fail_configure(DIR);
        let result = PulseSequencer::new(StepperSettings::new(pins(None)), gpio, SimClock::new());
        assert!(matches!(
            result,
            Err(StepperError::Hardware(GpioError::ConfigureFailed { pin: DIR }))
        ));
    }

    #[test]
    fn real_clock_holds_each_phase() {
        let clock = StdClock::new();
        let gpio = SimulatedGpio::with_clock(Arc::new(clock));
        let mut sequencer = PulseSequencer::new(StepperSettings::new(pins(None)), gpio.clone(), clock).unwrap();
        sequencer.initialize(Direction::Clockwise, Resolution::Full).unwrap();
        gpio.clear_events();

        let summary = sequencer.run(500.0, 5).unwrap();
        assert!(summary.elapsed >= Duration::from_millis(10));

        let events = gpio.events();
        for pair in events.chunks(2) {
            assert!(pair[1].at - pair[0].at >= Duration::from_micros(100));
        }
        for window in events.windows(2) {
            assert!(window[1].at >= window[0].at);
        }
    }
}
