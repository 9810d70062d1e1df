//! Raspberry Pi 40-pin header mapping (shared)
//!
//! GPIO numbers are the BCM numbers used for addressing and mask bits.
//! Header numbers are the physical positions on the connector. Mask bit
//! positions are `gpio - GPIO_BASE_OFFSET` because GPIO 0 and 1 are reserved
//! for the ID EEPROM and are never addressable.

use serde::{Deserialize, Serialize};

pub const GPIO_BASE_OFFSET: u8 = 2;

/// (BCM GPIO, header pin) for every addressable GPIO, ordered by GPIO.
pub static GPIO_TO_HEADER: [(u8, u8); 26] = [
    (2, 3),
    (3, 5),
    (4, 7),
    (5, 29),
    (6, 31),
    (7, 26),
    (8, 24),
    (9, 21),
    (10, 19),
    (11, 23),
    (12, 32),
    (13, 33),
    (14, 8),
    (15, 10),
    (16, 36),
    (17, 11),
    (18, 12),
    (19, 35),
    (20, 38),
    (21, 40),
    (22, 15),
    (23, 16),
    (24, 18),
    (25, 22),
    (26, 37),
    (27, 13),
];

pub fn header_for_gpio(gpio: u8) -> Option<u8> {
    GPIO_TO_HEADER.iter().find(|(g, _)| *g == gpio).map(|(_, h)| *h)
}

pub fn gpio_for_header(header: u8) -> Option<u8> {
    GPIO_TO_HEADER.iter().find(|(_, h)| *h == header).map(|(g, _)| *g)
}

pub fn is_valid_gpio(gpio: u8) -> bool {
    header_for_gpio(gpio).is_some()
}

/// Mask bit position for a GPIO, or `None` if it is not addressable.
pub fn bit_for_gpio(gpio: u8) -> Option<u32> {
    is_valid_gpio(gpio).then(|| u32::from(gpio - GPIO_BASE_OFFSET))
}

/// Every addressable GPIO number, ascending.
pub fn gpio_universe() -> impl Iterator<Item = u8> {
    GPIO_TO_HEADER.iter().map(|(g, _)| *g)
}

/// Mask with one bit set for every addressable GPIO.
pub fn universe_mask() -> u32 {
    gpio_universe().fold(0, |mask, gpio| mask | 1 << (gpio - GPIO_BASE_OFFSET))
}

/// How pin numbers in configuration are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinNumbering {
    /// Physical header positions.
    #[default]
    Board,
    /// BCM GPIO numbers.
    Bcm,
}

impl PinNumbering {
    /// Resolve a configured pin number to its BCM GPIO.
    pub fn to_gpio(self, pin: u8) -> Option<u8> {
        match self {
            PinNumbering::Board => gpio_for_header(pin),
            PinNumbering::Bcm => is_valid_gpio(pin).then_some(pin),
        }
    }
}
