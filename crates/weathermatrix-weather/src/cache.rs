use std::time::{Duration, Instant};

use crate::types::WeatherData;

/// Last successfully fetched snapshot and when it was stored.
///
/// Entries are only ever replaced by a newer successful fetch; freshness is
/// decided by comparing the age against a TTL at read time.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    data: WeatherData,
    stored_at: Instant,
}

impl CacheEntry {
    pub fn new(data: WeatherData, stored_at: Instant) -> Self {
        Self { data, stored_at }
    }

    pub fn data(&self) -> &WeatherData {
        &self.data
    }

    /// Age relative to `now`; zero if `now` precedes the store time
    pub fn age_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.stored_at)
    }

    pub fn is_fresh_at(&self, now: Instant, ttl: Duration) -> bool {
        self.age_at(now) < ttl
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn sample() -> WeatherData {
        WeatherData {
            temp: 12.0,
            feels_like: 11.0,
            humidity: 70.0,
            wind_speed: 3.0,
            condition_main: "Rain".to_string(),
            condition_description: "light rain".to_string(),
            has_precip: true,
            precip_1h: 0.4,
            timestamp: 1_700_000_000,
            timezone_offset: 3600,
            pressure: Some(1008.0),
            visibility: None,
            cloudiness: Some(90),
        }
    }

    #[test]
    fn test_fresh_until_ttl_elapses() {
        let stored = Instant::now();
        let entry = CacheEntry::new(sample(), stored);
        let ttl = Duration::from_secs(600);

        assert!(entry.is_fresh_at(stored, ttl));
        assert!(entry.is_fresh_at(stored + Duration::from_secs(599), ttl));
        assert!(!entry.is_fresh_at(stored + Duration::from_secs(600), ttl));
    }

    #[test]
    fn test_zero_ttl_is_never_fresh() {
        let stored = Instant::now();
        let entry = CacheEntry::new(sample(), stored);
        assert!(!entry.is_fresh_at(stored, Duration::ZERO));
    }

    #[test]
    fn test_age_saturates() {
        let stored = Instant::now() + Duration::from_secs(5);
        let entry = CacheEntry::new(sample(), stored);
        assert_eq!(entry.age_at(Instant::now()), Duration::ZERO);
        assert_eq!(entry.data().condition_main, "Rain");
    }
}
