use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Default age after which an observation is considered stale
pub const DEFAULT_STALE_AFTER_SECS: i64 = 900;

/// Measurement units requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    /// Query string value understood by the OpenWeather API
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
            Self::Standard => "standard",
        }
    }
}

impl std::str::FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metric" => Ok(Self::Metric),
            "imperial" => Ok(Self::Imperial),
            "standard" => Ok(Self::Standard),
            other => Err(format!("unknown units '{}'", other)),
        }
    }
}

/// Weather condition categories mapped from the provider's `main` group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Thunderstorm,
    Snow,
    Mist,
    Fog,
    Haze,
    Other,
}

impl WeatherCondition {
    /// Map a condition group such as "Clouds" or "rain" (case-insensitive)
    pub fn from_main(main: &str) -> Self {
        match main.trim().to_ascii_lowercase().as_str() {
            "clear" => Self::Clear,
            "clouds" => Self::Clouds,
            "rain" => Self::Rain,
            "drizzle" => Self::Drizzle,
            "thunderstorm" => Self::Thunderstorm,
            "snow" => Self::Snow,
            "mist" => Self::Mist,
            "fog" => Self::Fog,
            "haze" => Self::Haze,
            _ => Self::Other,
        }
    }

    /// Short label that fits on the matrix, `None` for unmapped groups
    pub fn short_label(&self) -> Option<&'static str> {
        match self {
            Self::Clear => Some("Clear"),
            Self::Clouds => Some("Cloudy"),
            Self::Rain => Some("Rain"),
            Self::Drizzle => Some("Drizzle"),
            Self::Thunderstorm => Some("Storm"),
            Self::Snow => Some("Snow"),
            Self::Mist => Some("Mist"),
            Self::Fog => Some("Fog"),
            Self::Haze => Some("Haze"),
            Self::Other => None,
        }
    }
}

/// Geographic location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Build a location, rejecting coordinates outside the valid ranges
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, String> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(format!("latitude {} out of range (-90 to 90)", latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(format!("longitude {} out of range (-180 to 180)", longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// One current-conditions observation, independent of any specific API.
///
/// `timestamp` is the provider's reported observation time (UNIX seconds,
/// UTC), not the time the snapshot was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherData {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    /// Condition group, e.g. "Clouds", "Rain", "Clear"
    pub condition_main: String,
    /// Free text, e.g. "broken clouds"
    pub condition_description: String,
    pub has_precip: bool,
    /// Millimetres of precipitation in the last hour (0 if none)
    pub precip_1h: f64,
    pub timestamp: i64,
    /// Offset from UTC in seconds
    pub timezone_offset: i32,

    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub visibility: Option<u32>,
    /// Cloud cover percentage
    #[serde(default)]
    pub cloudiness: Option<u8>,
}

impl WeatherData {
    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_main(&self.condition_main)
    }

    /// Whether the observation is older than `max_age_secs` right now
    pub fn is_stale(&self, max_age_secs: i64) -> bool {
        self.is_stale_at(Utc::now().timestamp(), max_age_secs)
    }

    pub fn is_stale_at(&self, now: i64, max_age_secs: i64) -> bool {
        now - self.timestamp > max_age_secs
    }

    /// Observation time in the location's local offset.
    /// Falls back to UTC if the reported offset is out of range.
    pub fn observed_at(&self) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(self.timezone_offset)
            .or_else(|| FixedOffset::east_opt(0))?;
        offset.timestamp_opt(self.timestamp, 0).single()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn sample() -> WeatherData {
        WeatherData {
            temp: 20.0,
            feels_like: 19.0,
            humidity: 60.0,
            wind_speed: 5.0,
            condition_main: "Clear".to_string(),
            condition_description: "clear sky".to_string(),
            has_precip: false,
            precip_1h: 0.0,
            timestamp: 1_609_459_200,
            timezone_offset: 0,
            pressure: None,
            visibility: None,
            cloudiness: None,
        }
    }

    #[test]
    fn test_condition_from_main() {
        assert_eq!(WeatherCondition::from_main("Clouds"), WeatherCondition::Clouds);
        assert_eq!(WeatherCondition::from_main("THUNDERSTORM"), WeatherCondition::Thunderstorm);
        assert_eq!(WeatherCondition::from_main("Tornado"), WeatherCondition::Other);
    }

    #[test]
    fn test_condition_short_label() {
        assert_eq!(WeatherCondition::Clouds.short_label(), Some("Cloudy"));
        assert_eq!(WeatherCondition::Thunderstorm.short_label(), Some("Storm"));
        assert_eq!(WeatherCondition::Other.short_label(), None);
    }

    #[test]
    fn test_units_parse() {
        assert_eq!("Imperial".parse::<Units>(), Ok(Units::Imperial));
        assert_eq!(Units::default().as_str(), "metric");
        assert!("kelvin".parse::<Units>().is_err());
    }

    #[test]
    fn test_location_ranges() {
        assert!(Location::new(33.44, -94.04).is_ok());
        assert!(Location::new(91.0, 0.0).is_err());
        assert!(Location::new(0.0, -180.5).is_err());
        assert!(Location::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_is_stale_at() {
        let data = sample();
        assert!(!data.is_stale_at(data.timestamp + 900, DEFAULT_STALE_AFTER_SECS));
        assert!(data.is_stale_at(data.timestamp + 901, DEFAULT_STALE_AFTER_SECS));
    }

    #[test]
    fn test_fresh_observation_is_not_stale() {
        let mut data = sample();
        data.timestamp = Utc::now().timestamp();
        assert!(!data.is_stale(DEFAULT_STALE_AFTER_SECS));
    }

    #[test]
    fn test_observed_at_applies_offset() {
        let mut data = sample();
        data.timezone_offset = -18_000;
        let local = data.observed_at().unwrap();
        assert_eq!(local.format("%H:%M").to_string(), "19:00");
    }

    #[test]
    fn test_optional_fields_default_when_missing() {
        let json = serde_json::json!({
            "temp": 1.0, "feels_like": 0.0, "humidity": 50.0, "wind_speed": 2.0,
            "condition_main": "Snow", "condition_description": "light snow",
            "has_precip": true, "precip_1h": 0.3, "timestamp": 0, "timezone_offset": 0
        });
        let data: WeatherData = serde_json::from_value(json).unwrap();
        assert_eq!(data.pressure, None);
        assert_eq!(data.condition(), WeatherCondition::Snow);
    }
}
