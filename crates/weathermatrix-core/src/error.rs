//! Error types for the WeatherMatrix application.
//!
//! Provider failures come from `weathermatrix-weather`; this module wraps
//! them with configuration and I/O failures and maps each to a short
//! message suitable for the status line.

use thiserror::Error;
use weathermatrix_weather::ProviderError;

/// Top-level application error type.
///
/// Use `user_message()` to get a message for display.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Weather provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Short message suitable for the status line.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Provider(e) => provider_user_message(e),
            AppError::Config(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed.",
        }
    }
}

/// Status line text for a provider failure.
fn provider_user_message(error: &ProviderError) -> &'static str {
    match error.status() {
        Some(401) => "WEATHER API KEY INVALID",
        Some(404) => "WEATHER LOCATION NOT FOUND",
        _ => "WEATHER API ERROR",
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "CONFIG NOT FOUND",
            ConfigError::Invalid(_) => "INVALID CONFIG",
            ConfigError::MissingSetting(_) => "MISSING SETTING",
        }
    }
}
