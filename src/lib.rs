//! Step/direction stepper driving and hal_pi_gpio mask generation for the
//! Raspberry Pi.

pub mod config;
pub mod hal;
pub mod hardware;
pub mod motion;

pub use config::{load_config, Config, ConfigError};
pub use hal::{MaskCalculator, MaskError, MaskResult};
pub use hardware::{SimClock, SimulatedGpio, StdClock};
pub use motion::{PulseSequencer, StepperError, StepperSettings};
pub use pistep_shared::{board_config, Direction, GpioError, Level, OutputPins, Resolution, TimeInterface};
