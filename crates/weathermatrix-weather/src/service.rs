//! Weather service: TTL cache, bounded retries and stale fallback around a provider.

use std::fmt;
use std::time::{Duration, Instant};

use crate::cache::CacheEntry;
use crate::error::ProviderError;
use crate::provider::WeatherProvider;
use crate::retry::{classify, RetryConfig, RetryDecision};
use crate::types::WeatherData;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;

type Sleeper = Box<dyn Fn(Duration) + Send + Sync>;

/// Service construction parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Freshness window for the cached snapshot
    pub cache_ttl: Duration,
    pub retry: RetryConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            retry: RetryConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn from_seconds(cache_ttl_secs: u64, max_retries: u32, retry_delay_secs: f64) -> Self {
        Self {
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            retry: RetryConfig::from_secs_f64(max_retries, retry_delay_secs),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry.retry_delay = delay;
        self
    }
}

/// Wraps a provider with a single-entry cache.
///
/// `get_latest` returns the cached snapshot while it is younger than the
/// TTL. Otherwise it refreshes through the provider with up to
/// `max_retries` attempts, and if every attempt fails it hands back the last
/// snapshot it has, however old. It only errors when nothing was ever
/// fetched.
pub struct WeatherService<P> {
    provider: P,
    config: ServiceConfig,
    cache: Option<CacheEntry>,
    sleep: Sleeper,
}

impl<P: WeatherProvider> WeatherService<P> {
    pub fn new(provider: P, config: ServiceConfig) -> Self {
        Self {
            provider,
            config,
            cache: None,
            sleep: Box::new(std::thread::sleep),
        }
    }

    /// Replace the backoff wait (tests record delays instead of sleeping)
    pub fn with_sleeper(mut self, sleep: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Cached snapshot without triggering a refresh
    pub fn cached(&self) -> Option<&WeatherData> {
        self.cache.as_ref().map(CacheEntry::data)
    }

    pub fn cache_age(&self) -> Option<Duration> {
        let now = Instant::now();
        self.cache.as_ref().map(|entry| entry.age_at(now))
    }

    /// Latest snapshot, fetching only when the cache is missing or expired.
    ///
    /// # Errors
    /// Returns `ProviderError` when the refresh fails and there is no earlier
    /// snapshot to fall back to.
    pub fn get_latest(&mut self) -> Result<WeatherData, ProviderError> {
        let now = Instant::now();
        let ttl = self.config.cache_ttl;

        if let Some(entry) = &self.cache {
            let age = entry.age_at(now);
            if entry.is_fresh_at(now, ttl) {
                tracing::debug!(
                    "Using cached weather data (age: {:.1}s, TTL: {}s)",
                    age.as_secs_f64(),
                    ttl.as_secs()
                );
                return Ok(entry.data().clone());
            }
            tracing::info!(
                "Cache expired (age: {:.1}s > TTL: {}s), fetching new data",
                age.as_secs_f64(),
                ttl.as_secs()
            );
        }

        let last_error = match self.refresh(now) {
            Ok(data) => return Ok(data),
            Err(e) => e,
        };

        if let Some(entry) = &self.cache {
            tracing::warn!(
                "All retries failed, using stale cache (age: {:.1}s)",
                entry.age_at(now).as_secs_f64()
            );
            return Ok(entry.data().clone());
        }

        let max_retries = self.config.retry.max_retries;
        tracing::error!(
            "Failed to fetch weather after {} attempts, no cache available",
            max_retries
        );
        let cause = last_error.map_or_else(|| "no attempts made".to_string(), |e| e.to_string());
        Err(ProviderError::new(format!(
            "Failed to fetch weather after {} attempts: {}",
            max_retries, cause
        )))
    }

    /// Drive the provider through the retry loop.
    /// On success the cache is overwritten and stamped with `now`; on failure
    /// the last provider error (if any attempt ran) is returned.
    fn refresh(&mut self, now: Instant) -> Result<WeatherData, Option<ProviderError>> {
        tracing::info!("Fetching weather data from provider...");
        let retry = &self.config.retry;
        let mut last_error = None;

        for attempt in 0..retry.max_retries {
            tracing::debug!("Weather fetch attempt {}/{}", attempt + 1, retry.max_retries);

            match self.provider.get_current() {
                Ok(data) => {
                    tracing::info!(
                        "Weather fetch successful: {}, {}",
                        data.temp,
                        data.condition_main
                    );
                    self.cache = Some(CacheEntry::new(data.clone(), now));
                    return Ok(data);
                }
                Err(e) => {
                    tracing::warn!("Weather fetch attempt {} failed: {}", attempt + 1, e);
                    let decision = classify(&e);
                    last_error = Some(e);

                    if decision == RetryDecision::NoRetry {
                        tracing::error!("Non-retryable error (4xx), stopping retries");
                        break;
                    }

                    if retry.has_attempts_after(attempt) {
                        let delay = retry.delay_for_attempt(attempt);
                        tracing::info!("Retrying in {:.1}s...", delay.as_secs_f64());
                        (self.sleep)(delay);
                    }
                }
            }
        }

        Err(last_error)
    }
}

impl<P: fmt::Debug> fmt::Debug for WeatherService<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherService")
            .field("provider", &self.provider)
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn sample_weather() -> WeatherData {
        WeatherData {
            temp: 20.0,
            feels_like: 19.0,
            humidity: 60.0,
            wind_speed: 5.0,
            condition_main: "Clear".to_string(),
            condition_description: "clear sky".to_string(),
            has_precip: false,
            precip_1h: 0.0,
            timestamp: chrono::Utc::now().timestamp(),
            timezone_offset: 0,
            pressure: None,
            visibility: None,
            cloudiness: None,
        }
    }

    /// Provider that replays scripted results, repeating the last one forever
    #[derive(Debug)]
    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<WeatherData, ProviderError>>>,
        fallback: Mutex<Result<WeatherData, ProviderError>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn always(result: Result<WeatherData, ProviderError>) -> Self {
            Self::scripted(Vec::new(), result)
        }

        fn scripted(
            script: Vec<Result<WeatherData, ProviderError>>,
            then: Result<WeatherData, ProviderError>,
        ) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback: Mutex::new(then),
                calls: AtomicUsize::new(0),
            }
        }

        fn set_fallback(&self, result: Result<WeatherData, ProviderError>) {
            *self.fallback.lock() = result;
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl WeatherProvider for ScriptedProvider {
        fn get_current(&self) -> Result<WeatherData, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script.lock().pop_front() {
                Some(result) => result,
                None => self.fallback.lock().clone(),
            }
        }
    }

    fn no_sleep(_: Duration) {}

    #[test]
    fn test_caches_within_ttl() {
        let provider = ScriptedProvider::always(Ok(sample_weather()));
        let config = ServiceConfig::default().with_cache_ttl(Duration::from_secs(60));
        let mut service = WeatherService::new(&provider, config);

        let first = service.get_latest().unwrap();
        assert_eq!(provider.calls(), 1);
        assert_eq!(first.temp, 20.0);

        for _ in 0..5 {
            let again = service.get_latest().unwrap();
            assert_eq!(again, first);
        }
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_refetches_after_expiry() {
        let provider = ScriptedProvider::always(Ok(sample_weather()));
        let config = ServiceConfig::default().with_cache_ttl(Duration::from_secs(1));
        let mut service = WeatherService::new(&provider, config);

        service.get_latest().unwrap();
        assert_eq!(provider.calls(), 1);

        std::thread::sleep(Duration::from_millis(1100));

        service.get_latest().unwrap();
        assert_eq!(provider.calls(), 2);
    }

    #[test]
    fn test_retries_until_success() {
        let provider = ScriptedProvider::scripted(
            vec![
                Err(ProviderError::new("Network error")),
                Err(ProviderError::new("Network error")),
            ],
            Ok(sample_weather()),
        );
        let config = ServiceConfig::default().with_max_retries(3);
        let mut service = WeatherService::new(&provider, config).with_sleeper(no_sleep);

        let data = service.get_latest().unwrap();
        assert_eq!(data.temp, 20.0);
        assert_eq!(provider.calls(), 3);
        assert!(service.cached().is_some());
    }

    #[test]
    fn test_retries_with_real_sleep() {
        let provider = ScriptedProvider::scripted(
            vec![Err(ProviderError::new("Network error"))],
            Ok(sample_weather()),
        );
        let config = ServiceConfig::from_seconds(600, 3, 0.05);
        let mut service = WeatherService::new(&provider, config);

        let started = Instant::now();
        service.get_latest().unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert_eq!(provider.calls(), 2);
    }

    #[test]
    fn test_linear_backoff_between_attempts() {
        let delays = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&delays);

        let provider = ScriptedProvider::always(Err(ProviderError::new("HTTP 503: unavailable")));
        let config = ServiceConfig::default()
            .with_max_retries(4)
            .with_retry_delay(Duration::from_millis(100));
        let mut service = WeatherService::new(&provider, config)
            .with_sleeper(move |d| recorded.lock().push(d));

        assert!(service.get_latest().is_err());
        assert_eq!(provider.calls(), 4);
        // No wait after the final attempt
        assert_eq!(
            *delays.lock(),
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(300),
            ]
        );
    }

    #[test]
    fn test_no_retry_on_client_error() {
        let provider = ScriptedProvider::always(Err(ProviderError::new("401 Unauthorized")));
        let config = ServiceConfig::default().with_max_retries(5);
        let mut service = WeatherService::new(&provider, config).with_sleeper(no_sleep);

        let err = service.get_latest().unwrap_err();
        assert_eq!(provider.calls(), 1);
        assert!(err.to_string().contains("401 Unauthorized"));
    }

    #[test]
    fn test_structured_404_stops_retries() {
        let provider = ScriptedProvider::always(Err(ProviderError::Http {
            status: 404,
            message: "OpenWeather API error 404: city not found".into(),
        }));
        let mut service =
            WeatherService::new(&provider, ServiceConfig::default()).with_sleeper(no_sleep);

        assert!(service.get_latest().is_err());
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_forbidden_and_rate_limit_are_retried() {
        for message in ["403 Forbidden", "429 Too Many Requests"] {
            let provider = ScriptedProvider::always(Err(ProviderError::new(message)));
            let mut service =
                WeatherService::new(&provider, ServiceConfig::default()).with_sleeper(no_sleep);

            assert!(service.get_latest().is_err());
            assert_eq!(provider.calls(), 3, "{} should be retried", message);
        }
    }

    #[test]
    fn test_falls_back_to_stale_cache() {
        let provider = ScriptedProvider::always(Ok(sample_weather()));
        let config = ServiceConfig::default().with_cache_ttl(Duration::from_secs(1));
        let mut service = WeatherService::new(&provider, config).with_sleeper(no_sleep);

        let first = service.get_latest().unwrap();

        provider.set_fallback(Err(ProviderError::new("Network error")));
        std::thread::sleep(Duration::from_millis(1100));

        let second = service.get_latest().unwrap();
        assert_eq!(second, first);
        assert_eq!(provider.calls(), 1 + 3);
    }

    #[test]
    fn test_stale_fallback_after_client_error() {
        let provider = ScriptedProvider::always(Ok(sample_weather()));
        let config = ServiceConfig::default().with_cache_ttl(Duration::ZERO);
        let mut service = WeatherService::new(&provider, config).with_sleeper(no_sleep);

        let first = service.get_latest().unwrap();
        provider.set_fallback(Err(ProviderError::new("401 Unauthorized")));

        assert_eq!(service.get_latest().unwrap(), first);
        assert_eq!(provider.calls(), 2);
    }

    #[test]
    fn test_error_without_cache_mentions_attempts() {
        let provider = ScriptedProvider::always(Err(ProviderError::new("Network error")));
        let config = ServiceConfig::default().with_max_retries(1);
        let mut service = WeatherService::new(&provider, config).with_sleeper(no_sleep);

        let err = service.get_latest().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to fetch weather after 1 attempts: Network error"
        );
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_error_message_contains_max_retries() {
        let provider = ScriptedProvider::always(Err(ProviderError::new("Network error")));
        let config = ServiceConfig::default().with_max_retries(7);
        let mut service = WeatherService::new(&provider, config).with_sleeper(no_sleep);

        let err = service.get_latest().unwrap_err();
        assert!(err.to_string().contains('7'));
        assert_eq!(provider.calls(), 7);
    }

    #[test]
    fn test_zero_retries_skips_provider() {
        let provider = ScriptedProvider::always(Ok(sample_weather()));
        let config = ServiceConfig::default().with_max_retries(0);
        let mut service = WeatherService::new(&provider, config);

        let err = service.get_latest().unwrap_err();
        assert_eq!(provider.calls(), 0);
        assert!(err.to_string().contains("after 0 attempts"));
    }

    #[test]
    fn test_cache_replaced_on_success() {
        let mut newer = sample_weather();
        newer.temp = 25.0;
        let provider = ScriptedProvider::scripted(vec![Ok(sample_weather())], Ok(newer));
        let config = ServiceConfig::default().with_cache_ttl(Duration::ZERO);
        let mut service = WeatherService::new(&provider, config);

        assert_eq!(service.get_latest().unwrap().temp, 20.0);
        assert_eq!(service.get_latest().unwrap().temp, 25.0);
        assert_eq!(service.cached().map(|d| d.temp), Some(25.0));
        assert!(service.cache_age().is_some());
    }
}
