//! Engine configuration management
//!
//! This crate provides configuration loading and parsing for the inference engine:
//! - TOML configuration file parsing
//! - Engine configuration structures, with the empirical tracking constants as defaults

pub mod engine_config;
pub mod toml_config;

pub use engine_config::*;
pub use toml_config::*;
