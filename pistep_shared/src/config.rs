//! Shared configuration logic for the stepper host, the CLI and tests.
//!
//! ```toml
//! [stepper]
//! numbering = "board"
//! step_pin = 22
//! dir_pin = 29
//! ms1_pin = 13
//! ms2_pin = 16
//! ms3_pin = 18
//! pulse_high_us = 100
//!
//! [hal]
//! outputs = [17, 22, 23]
//! ```

use crate::board_config::PinNumbering;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub stepper: StepperConfig,
    #[serde(default)]
    pub hal: HalConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StepperConfig {
    #[serde(default)]
    pub numbering: PinNumbering,
    #[serde(default = "default_step_pin")]
    pub step_pin: u8,
    #[serde(default = "default_dir_pin")]
    pub dir_pin: u8,
    #[serde(default = "default_ms1_pin")]
    pub ms1_pin: u8,
    #[serde(default = "default_ms2_pin")]
    pub ms2_pin: u8,
    #[serde(default = "default_ms3_pin")]
    pub ms3_pin: u8,
    #[serde(default)]
    pub enable_pin: Option<u8>,
    #[serde(default = "default_pulse_high_us")]
    pub pulse_high_us: u64,
    #[serde(default)]
    pub step_active_low: bool,
    #[serde(default = "default_full_steps_per_rotation")]
    pub full_steps_per_rotation: u32,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            numbering: PinNumbering::default(),
            step_pin: default_step_pin(),
            dir_pin: default_dir_pin(),
            ms1_pin: default_ms1_pin(),
            ms2_pin: default_ms2_pin(),
            ms3_pin: default_ms3_pin(),
            enable_pin: None,
            pulse_high_us: default_pulse_high_us(),
            step_active_low: false,
            full_steps_per_rotation: default_full_steps_per_rotation(),
        }
    }
}

impl StepperConfig {
    /// Configured pins by role name, as written in the file.
    pub fn roles(&self) -> Vec<(&'static str, u8)> {
        let mut roles = vec![
            ("step", self.step_pin),
            ("dir", self.dir_pin),
            ("ms1", self.ms1_pin),
            ("ms2", self.ms2_pin),
            ("ms3", self.ms3_pin),
        ];
        if let Some(pin) = self.enable_pin {
            roles.push(("enable", pin));
        }
        roles
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pulse_high_us == 0 {
            return Err(ConfigError::Invalid("stepper.pulse_high_us must be > 0".to_string()));
        }
        if self.full_steps_per_rotation == 0 {
            return Err(ConfigError::Invalid(
                "stepper.full_steps_per_rotation must be > 0".to_string(),
            ));
        }
        let mut owners: HashMap<u8, &str> = HashMap::new();
        for (role, pin) in self.roles() {
            let gpio = self.numbering.to_gpio(pin).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "stepper.{}_pin {} is not a GPIO in {:?} numbering",
                    role, pin, self.numbering
                ))
            })?;
            if let Some(other) = owners.insert(gpio, role) {
                return Err(ConfigError::Invalid(format!(
                    "stepper.{}_pin and stepper.{}_pin both map to GPIO {}",
                    other, role, gpio
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HalConfig {
    #[serde(default = "default_hal_prefix")]
    pub prefix: String,
    /// BCM GPIO numbers to configure as outputs.
    #[serde(default)]
    pub outputs: Vec<u8>,
}

impl Default for HalConfig {
    fn default() -> Self {
        Self {
            prefix: default_hal_prefix(),
            outputs: Vec::new(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.stepper.validate()?;
        if self.hal.prefix.is_empty() {
            return Err(ConfigError::Invalid("hal.prefix must not be empty".to_string()));
        }
        Ok(())
    }
}

fn default_step_pin() -> u8 { 22 }
fn default_dir_pin() -> u8 { 29 }
fn default_ms1_pin() -> u8 { 13 }
fn default_ms2_pin() -> u8 { 16 }
fn default_ms3_pin() -> u8 { 18 }
fn default_pulse_high_us() -> u64 { 100 }
fn default_full_steps_per_rotation() -> u32 { 200 }
fn default_hal_prefix() -> String { "hal_pi_gpio.pin".to_string() }

pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            return Err(ConfigError::Io(e));
        }
    };
    let config: Config = match toml::from_str(&contents) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to parse config TOML: {}", e);
            return Err(ConfigError::Toml(e));
        }
    };
    config.validate()?;
    Ok(config)
}
