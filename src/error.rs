//! Error types for clock configuration.
//!
//! Scheduling and ticking never fail; only building a clock or runner from
//! a bad configuration does.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("history window must hold at least one sample")]
    EmptyHistoryWindow,

    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("max subdivisions must be at least 2, got {0}")]
    NoSubdivisions(u32),

    #[error("fps limit must be finite and positive, got {0}")]
    InvalidFpsLimit(f64),
}

pub type ConfigResult<T = ()> = Result<T, ConfigError>;
