// src/main.rs - Command line front end: run a stepper move or print hal_pi_gpio masks
use clap::{ArgAction, Parser, Subcommand};
use pistep::hardware::{SimClock, SimulatedGpio, StdClock};
use pistep::motion::{step_rate_for_rpm, PulseSequencer, RunSummary, StepperError, StepperSettings};
use pistep::{Config, Direction, MaskCalculator, OutputPins, Resolution, TimeInterface};
use std::path::PathBuf;
use std::sync::Arc;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Parser)]
#[command(name = "pistep", version, about = "A4988 stepper pulses and hal_pi_gpio masks for the Raspberry Pi")]
struct Cli {
    /// TOML configuration file; built-in defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Pulse the stepper on the simulated GPIO platform
    Run {
        #[arg(long, default_value = "cw")]
        direction: Direction,
        /// Step rate in pulses per second
        #[arg(long, conflicts_with = "rpm", required_unless_present = "rpm")]
        rate: Option<f64>,
        /// Shaft speed; converted using the configured full steps per rotation
        #[arg(long)]
        rpm: Option<f64>,
        #[arg(long, default_value_t = 1000)]
        steps: u64,
        #[arg(long, default_value = "full")]
        resolution: Resolution,
        /// Advance a virtual clock instead of sleeping
        #[arg(long)]
        virtual_time: bool,
    },
    /// Print dir/exclude masks and HAL pin names for a set of BCM GPIO outputs
    Masks {
        /// BCM GPIO numbers; defaults to [hal].outputs from the config
        #[arg(allow_negative_numbers = true)]
        pins: Vec<i64>,
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = match &cli.config {
        Some(path) => {
            let path = path.to_string_lossy();
            tracing::info!("Loading configuration from: {}", path);
            pistep::load_config(&path).map_err(|e| {
                tracing::error!("Failed to load config from '{}': {}", path, e);
                Box::new(e) as BoxError
            })?
        }
        None => Config::default(),
    };

    match cli.command {
        Command::Run {
            direction,
            rate,
            rpm,
            steps,
            resolution,
            virtual_time,
        } => {
            let step_rate = match (rate, rpm) {
                (Some(rate), _) => rate,
                (None, Some(rpm)) => step_rate_for_rpm(rpm, config.stepper.full_steps_per_rotation, resolution),
                (None, None) => return Err("either --rate or --rpm is required".into()),
            };
            if virtual_time {
                run_move(&config, SimClock::new(), direction, resolution, step_rate, steps)
            } else {
                run_move(&config, StdClock::new(), direction, resolution, step_rate, steps)
            }
        }
        Command::Masks { pins, json } => {
            let selection = if pins.is_empty() {
                config.hal.outputs.iter().map(|&gpio| i64::from(gpio)).collect()
            } else {
                pins
            };
            tracing::info!("GPIO outputs: {:?}", selection);
            let calculator = MaskCalculator::new(config.hal.prefix.clone());
            let result = calculator.compute_masks(selection).map_err(|e| {
                tracing::error!("{}", e);
                Box::new(e) as BoxError
            })?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result);
            }
            Ok(())
        }
        Command::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn run_move<T>(
    config: &Config,
    clock: T,
    direction: Direction,
    resolution: Resolution,
    step_rate: f64,
    steps: u64,
) -> Result<(), BoxError>
where
    T: TimeInterface + Clone + 'static,
{
    let settings = StepperSettings::from_config(&config.stepper)?;
    tracing::info!(
        "STEP: GPIO {}, DIR: GPIO {}, pulse: {} us",
        settings.pins.step,
        settings.pins.dir,
        settings.pulse_high.as_micros()
    );

    let gpio = SimulatedGpio::with_clock(Arc::new(clock.clone()));
    // only line levels matter here; a long move would otherwise log every edge
    gpio.set_recording(false);
    let mut sequencer = PulseSequencer::new(settings, gpio, clock)?;

    let outcome = execute(&mut sequencer, direction, resolution, step_rate, steps);

    // lines are returned to a safe state whether or not the move finished
    if let Err(e) = sequencer.release() {
        tracing::warn!("Failed to release stepper lines: {}", e);
    }

    match outcome {
        Ok(summary) => {
            tracing::info!(
                "{} steps {} at {} steps/s ({:?} high, {:?} low) in {:?}",
                summary.steps,
                direction,
                step_rate,
                summary.timing.high,
                summary.timing.low,
                summary.elapsed
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Move aborted: {}", e);
            Err(e.into())
        }
    }
}

fn execute<P, T>(
    sequencer: &mut PulseSequencer<P, T>,
    direction: Direction,
    resolution: Resolution,
    step_rate: f64,
    steps: u64,
) -> Result<RunSummary, StepperError>
where
    P: OutputPins,
    T: TimeInterface,
{
    if sequencer.settings().pins.enable.is_some() {
        sequencer.enable()?;
    }
    sequencer.initialize(direction, resolution)?;
    sequencer.run(step_rate, steps)
}
