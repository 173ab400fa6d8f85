use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::ProviderError;
use crate::provider::WeatherProvider;
use crate::service::WeatherService;
use crate::types::WeatherData;

/// Cloneable handle for callers on more than one thread.
///
/// The lock is held for the whole check-then-refresh sequence, so callers
/// arriving during a cache miss wait for the in-flight fetch and then read
/// its result from the cache instead of issuing their own request.
pub struct SharedWeatherService<P> {
    inner: Arc<Mutex<WeatherService<P>>>,
}

impl<P: WeatherProvider> SharedWeatherService<P> {
    pub fn new(service: WeatherService<P>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    /// # Errors
    /// Same as [`WeatherService::get_latest`].
    pub fn get_latest(&self) -> Result<WeatherData, ProviderError> {
        self.inner.lock().get_latest()
    }

    pub fn cached(&self) -> Option<WeatherData> {
        self.inner.lock().cached().cloned()
    }
}

impl<P> Clone for SharedWeatherService<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::service::ServiceConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct SlowProvider {
        calls: AtomicUsize,
    }

    impl WeatherProvider for SlowProvider {
        fn get_current(&self) -> Result<WeatherData, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            Ok(WeatherData {
                temp: 4.0,
                feels_like: 1.0,
                humidity: 80.0,
                wind_speed: 6.5,
                condition_main: "Snow".to_string(),
                condition_description: "light snow".to_string(),
                has_precip: true,
                precip_1h: 0.2,
                timestamp: 1_700_000_000,
                timezone_offset: 0,
                pressure: None,
                visibility: Some(4000),
                cloudiness: Some(100),
            })
        }
    }

    #[test]
    fn test_concurrent_callers_share_one_fetch() {
        let provider = Arc::new(SlowProvider {
            calls: AtomicUsize::new(0),
        });
        let service = SharedWeatherService::new(WeatherService::new(
            Arc::clone(&provider),
            ServiceConfig::default(),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                std::thread::spawn(move || service.get_latest())
            })
            .collect();

        for handle in handles {
            let data = handle.join().unwrap().unwrap();
            assert_eq!(data.condition_main, "Snow");
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(service.cached().is_some());
    }
}
