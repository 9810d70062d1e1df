//! `dir` and `exclude` masks for the hal_pi_gpio driver.
//!
//! The driver addresses pins by BCM GPIO number with bit `gpio - 2`, but
//! names its HAL pins after the header position, e.g. GPIO 17 on header
//! pin 11 becomes `hal_pi_gpio.pin-11-out`.

use pistep_shared::board_config::{self, GPIO_BASE_OFFSET};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

pub const DEFAULT_PREFIX: &str = "hal_pi_gpio.pin";
const OUTPUT_SUFFIX: &str = "out";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaskError {
    #[error("{0:?} are not valid GPIO numbers")]
    InvalidPins(BTreeSet<i64>),
}

/// One selected output and its HAL pin name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HalPin {
    pub gpio: u8,
    pub header: u8,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaskResult {
    pub dir_mask: u32,
    pub exclude_mask: u32,
    /// Selected outputs ordered by GPIO number.
    pub pins: Vec<HalPin>,
}

impl MaskResult {
    pub fn pin_names(&self) -> Vec<&str> {
        self.pins.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn dir_hex(&self) -> String {
        format!("0X{:X}", self.dir_mask)
    }

    pub fn exclude_hex(&self) -> String {
        format!("0X{:X}", self.exclude_mask)
    }
}

impl fmt::Display for MaskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dir={} exclude={}", self.dir_hex(), self.exclude_hex())?;
        for pin in &self.pins {
            write!(f, "\n{} # GPIO {}", pin.name, pin.gpio)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MaskCalculator {
    prefix: String,
}

impl Default for MaskCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl MaskCalculator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// Split the GPIO universe into `selection` and the rest.
    ///
    /// Duplicates in `selection` are ignored. Any number outside the GPIO
    /// universe, including ones that do not fit a pin number at all, fails
    /// the whole call.
    pub fn compute_masks<I>(&self, selection: I) -> Result<MaskResult, MaskError>
    where
        I: IntoIterator,
        I::Item: Into<i64>,
    {
        let requested: BTreeSet<i64> = selection.into_iter().map(Into::into).collect();
        let (selected, invalid): (BTreeSet<i64>, BTreeSet<i64>) = requested
            .into_iter()
            .partition(|&n| u8::try_from(n).is_ok_and(board_config::is_valid_gpio));
        if !invalid.is_empty() {
            tracing::debug!(?invalid, "rejected GPIO selection");
            return Err(MaskError::InvalidPins(invalid));
        }
        let selected: BTreeSet<u8> = selected.into_iter().filter_map(|n| u8::try_from(n).ok()).collect();

        let mut dir_mask = 0u32;
        let mut exclude_mask = 0u32;
        for gpio in board_config::gpio_universe() {
            let bit = 1u32 << (gpio - GPIO_BASE_OFFSET);
            if selected.contains(&gpio) {
                dir_mask |= bit;
            } else {
                exclude_mask |= bit;
            }
        }

        let pins = selected
            .iter()
            .filter_map(|&gpio| {
                board_config::header_for_gpio(gpio).map(|header| HalPin {
                    gpio,
                    header,
                    name: self.pin_name(header),
                })
            })
            .collect();

        tracing::debug!(dir = dir_mask, exclude = exclude_mask, "computed hal masks");
        Ok(MaskResult {
            dir_mask,
            exclude_mask,
            pins,
        })
    }

    /// HAL output pin name for a header position.
    pub fn pin_name(&self, header: u8) -> String {
        format!("{}-{:02}-{}", self.prefix, header, OUTPUT_SUFFIX)
    }
}
