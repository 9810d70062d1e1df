// src/hal/mod.rs - Pin setup arguments for the hal_pi_gpio driver
pub mod mask;

pub use mask::{HalPin, MaskCalculator, MaskError, MaskResult};
