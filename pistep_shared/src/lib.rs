// pistep_shared: configuration, pin table and platform traits shared by the host and tests

pub mod board_config;
pub mod config;
pub mod hardware_traits;
pub mod types;

pub use hardware_traits::{GpioError, OutputPins, TimeInterface};
pub use types::{Direction, Level, Resolution};
