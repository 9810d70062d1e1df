// src/motion/mod.rs - Stepper motion core
pub mod stepper;

pub use stepper::{
    step_rate_for_rpm, PulseSequencer, PulseTiming, RunSummary, SequencerState, StepperError,
    StepperPins, StepperSettings, DEFAULT_PULSE_HIGH,
};
