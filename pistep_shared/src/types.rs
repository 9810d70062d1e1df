//! Value types shared by the stepper core, the mask calculator and the CLI.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Binary logic level of a digital output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    High,
}

impl std::ops::Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => write!(f, "LOW"),
            Level::High => write!(f, "HIGH"),
        }
    }
}

/// Rotational direction as seen from the motor shaft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[serde(alias = "cw")]
    Clockwise,
    #[serde(alias = "ccw")]
    CounterClockwise,
}

impl Direction {
    /// Level the driver's DIR input expects for this direction.
    pub fn level(self) -> Level {
        match self {
            Direction::Clockwise => Level::High,
            Direction::CounterClockwise => Level::Low,
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cw" | "clockwise" => Ok(Direction::Clockwise),
            "ccw" | "counterclockwise" | "counter-clockwise" => Ok(Direction::CounterClockwise),
            other => Err(format!("unknown direction '{}', expected cw or ccw", other)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Clockwise => write!(f, "CW"),
            Direction::CounterClockwise => write!(f, "CCW"),
        }
    }
}

/// Microstepping mode of an A4988-style driver, selected through MS1..MS3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Full,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
}

use Level::{High as H, Low as L};

/// (MS1, MS2, MS3) per resolution, indexed by `Resolution as usize`.
const MODE_LEVELS: [[Level; 3]; 5] = [
    [L, L, L],
    [H, L, L],
    [L, H, L],
    [H, H, L],
    [H, H, H],
];

impl Resolution {
    pub const ALL: [Resolution; 5] = [
        Resolution::Full,
        Resolution::Half,
        Resolution::Quarter,
        Resolution::Eighth,
        Resolution::Sixteenth,
    ];

    /// Levels for the MS1, MS2 and MS3 lines, in that order.
    pub fn mode_levels(self) -> [Level; 3] {
        MODE_LEVELS[self as usize]
    }

    /// Number of driver pulses per full mechanical step.
    pub fn microsteps(self) -> u32 {
        1 << (self as u32)
    }

    pub fn from_microsteps(microsteps: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.microsteps() == microsteps)
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" | "1" => Ok(Resolution::Full),
            "half" | "2" => Ok(Resolution::Half),
            "quarter" | "4" => Ok(Resolution::Quarter),
            "eighth" | "8" => Ok(Resolution::Eighth),
            "sixteenth" | "16" => Ok(Resolution::Sixteenth),
            other => Err(format!("unknown resolution '{}'", other)),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resolution::Full => "full",
            Resolution::Half => "half",
            Resolution::Quarter => "quarter",
            Resolution::Eighth => "eighth",
            Resolution::Sixteenth => "sixteenth",
        };
        write!(f, "{}", name)
    }
}
