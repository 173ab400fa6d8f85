//! Weather data for WeatherMatrix
//!
//! Fetches current conditions from OpenWeather and keeps them behind a TTL
//! cache with bounded retries and stale-data fallback.

pub mod cache;
pub mod error;
pub mod openweather;
pub mod provider;
pub mod retry;
pub mod service;
pub mod shared;
pub mod types;

pub use cache::CacheEntry;
pub use error::ProviderError;
pub use openweather::{OpenWeatherConfig, OpenWeatherProvider};
pub use provider::WeatherProvider;
pub use retry::{RetryConfig, RetryDecision};
pub use service::{ServiceConfig, WeatherService};
pub use shared::SharedWeatherService;
pub use types::*;
