use std::sync::Arc;

use crate::error::ProviderError;
use crate::types::WeatherData;

/// Source of current-conditions snapshots.
///
/// Implementations block for the duration of the request and report every
/// failure (network, timeout, malformed payload, non-2xx status) as a
/// `ProviderError`.
pub trait WeatherProvider: Send + Sync {
    fn get_current(&self) -> Result<WeatherData, ProviderError>;
}

impl<P: WeatherProvider + ?Sized> WeatherProvider for &P {
    fn get_current(&self) -> Result<WeatherData, ProviderError> {
        (**self).get_current()
    }
}

impl<P: WeatherProvider + ?Sized> WeatherProvider for Box<P> {
    fn get_current(&self) -> Result<WeatherData, ProviderError> {
        (**self).get_current()
    }
}

impl<P: WeatherProvider + ?Sized> WeatherProvider for Arc<P> {
    fn get_current(&self) -> Result<WeatherData, ProviderError> {
        (**self).get_current()
    }
}
