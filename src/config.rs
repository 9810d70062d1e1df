// src/config.rs - Single configuration file
pub use pistep_shared::config::*;
