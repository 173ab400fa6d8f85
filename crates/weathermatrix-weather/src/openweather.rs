//! OpenWeather Current Weather API client.
//! Uses the free `data/2.5/weather` endpoint, which needs no One Call subscription.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use url::Url;

use crate::error::ProviderError;
use crate::provider::WeatherProvider;
use crate::types::{Location, Units, WeatherData};

pub const OPENWEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    #[serde(default)]
    weather: Vec<ConditionEntry>,
    main: Option<MainBlock>,
    rain: Option<PrecipBlock>,
    snow: Option<PrecipBlock>,
    wind: Option<WindBlock>,
    clouds: Option<CloudsBlock>,
    visibility: Option<u32>,
    dt: Option<i64>,
    timezone: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct ConditionEntry {
    main: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: Option<f64>,
    feels_like: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PrecipBlock {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WindBlock {
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CloudsBlock {
    all: Option<u8>,
}

/// Error document returned with non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    cod: Option<serde_json::Value>,
    message: Option<String>,
    #[serde(default)]
    parameters: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct OpenWeatherConfig {
    pub api_key: String,
    pub location: Location,
    pub units: Units,
    /// Language code for condition descriptions, e.g. "en", "de"
    pub lang: String,
    pub timeout: Duration,
}

impl OpenWeatherConfig {
    pub fn new(api_key: impl Into<String>, location: Location) -> Self {
        Self {
            api_key: api_key.into(),
            location,
            units: Units::default(),
            lang: "en".to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    client: Client,
    config: OpenWeatherConfig,
    base_url: Url,
}

impl OpenWeatherProvider {
    pub fn new(config: OpenWeatherConfig) -> Result<Self, ProviderError> {
        let base_url =
            Url::parse(OPENWEATHER_URL).map_err(|e| ProviderError::new(e.to_string()))?;
        Self::with_base_url(config, base_url)
    }

    /// Point the client at a different endpoint (used by tests)
    pub fn with_base_url(config: OpenWeatherConfig, base_url: Url) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    pub fn config(&self) -> &OpenWeatherConfig {
        &self.config
    }

    fn request_url(&self) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("lat", &self.config.location.latitude.to_string())
            .append_pair("lon", &self.config.location.longitude.to_string())
            .append_pair("appid", &self.config.api_key)
            .append_pair("units", self.config.units.as_str())
            .append_pair("lang", &self.config.lang);
        url
    }
}

impl WeatherProvider for OpenWeatherProvider {
    fn get_current(&self) -> Result<WeatherData, ProviderError> {
        tracing::info!("Making OpenWeather API request: {}", self.base_url);
        tracing::debug!(
            "Request parameters: lat={}, lon={}, units={}, lang={}",
            self.config.location.latitude,
            self.config.location.longitude,
            self.config.units.as_str(),
            self.config.lang
        );

        let response = self.client.get(self.request_url()).send()?;
        let status = response.status();
        tracing::info!("API response status: {}", status.as_u16());

        let body = response.text()?;

        if !status.is_success() {
            tracing::error!("API request failed with status {}", status.as_u16());
            return Err(error_from_response(status.as_u16(), &body));
        }

        let data = parse_current(&body)?;
        tracing::info!(
            "Successfully parsed weather data: {}, {}",
            data.temp,
            data.condition_main
        );
        Ok(data)
    }
}

/// Map a Current Weather API body onto `WeatherData`
pub fn parse_current(body: &str) -> Result<WeatherData, ProviderError> {
    let raw: CurrentResponse = serde_json::from_str(body)?;

    let condition = raw.weather.into_iter().next().ok_or_else(|| {
        tracing::error!("Response missing 'weather' array");
        ProviderError::Parse("Response missing 'weather' array".to_string())
    })?;
    tracing::debug!(
        "Weather condition: {:?} - {:?}",
        condition.main,
        condition.description
    );

    let main = raw
        .main
        .ok_or_else(|| ProviderError::Parse("Response missing 'main' block".to_string()))?;

    // Rain takes precedence over snow; a block without "1h" still counts.
    let (has_precip, precip_1h) = match (raw.rain, raw.snow) {
        (Some(rain), _) => (true, rain.one_hour.unwrap_or(0.0)),
        (None, Some(snow)) => (true, snow.one_hour.unwrap_or(0.0)),
        (None, None) => (false, 0.0),
    };

    Ok(WeatherData {
        temp: main.temp.unwrap_or(0.0),
        feels_like: main.feels_like.unwrap_or(0.0),
        humidity: main.humidity.unwrap_or(0.0),
        wind_speed: raw.wind.and_then(|w| w.speed).unwrap_or(0.0),
        condition_main: condition.main.unwrap_or_else(|| "Unknown".to_string()),
        condition_description: condition.description.unwrap_or_default(),
        has_precip,
        precip_1h,
        timestamp: raw.dt.unwrap_or(0),
        timezone_offset: raw.timezone.unwrap_or(0),
        pressure: main.pressure,
        visibility: raw.visibility,
        cloudiness: raw.clouds.and_then(|c| c.all),
    })
}

/// Build the error for a non-2xx response, preferring the API's own message
fn error_from_response(status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => {
            tracing::error!("OpenWeather API error response: {}", body);
            let cod = match err.cod {
                Some(serde_json::Value::String(s)) => s,
                Some(serde_json::Value::Number(n)) => n.to_string(),
                _ => status.to_string(),
            };
            let mut message = format!(
                "OpenWeather API error {}: {}",
                cod,
                err.message.as_deref().unwrap_or("Unknown error")
            );
            if !err.parameters.is_empty() {
                message.push_str(&format!(" (parameters: {})", err.parameters.join(", ")));
            }
            ProviderError::Http { status, message }
        }
        Err(_) => {
            let snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            tracing::error!("Non-JSON error response: HTTP {}, body: {}", status, snippet);
            ProviderError::Http {
                status,
                message: format!("HTTP {}: {}", status, snippet),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn sample_body() -> serde_json::Value {
        serde_json::json!({
            "coord": {"lon": -94.04, "lat": 33.44},
            "weather": [{"id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d"}],
            "base": "stations",
            "main": {"temp": 292.55, "feels_like": 292.87, "pressure": 1014, "humidity": 89},
            "visibility": 10000,
            "wind": {"speed": 3.13, "deg": 93},
            "rain": {"1h": 2.93},
            "clouds": {"all": 53},
            "dt": 1684929490,
            "sys": {"country": "US"},
            "timezone": -18000,
            "name": "Testville",
            "id": 123
        })
    }

    #[test]
    fn test_parse_full_response() {
        let data = parse_current(&sample_body().to_string()).unwrap();
        assert_eq!(data.temp, 292.55);
        assert_eq!(data.feels_like, 292.87);
        assert_eq!(data.humidity, 89.0);
        assert_eq!(data.wind_speed, 3.13);
        assert_eq!(data.condition_main, "Clouds");
        assert_eq!(data.condition_description, "broken clouds");
        assert!(data.has_precip);
        assert_eq!(data.precip_1h, 2.93);
        assert_eq!(data.timestamp, 1684929490);
        assert_eq!(data.timezone_offset, -18000);
        assert_eq!(data.pressure, Some(1014.0));
        assert_eq!(data.visibility, Some(10000));
        assert_eq!(data.cloudiness, Some(53));
    }

    #[test]
    fn test_parse_without_precipitation() {
        let body = serde_json::json!({
            "weather": [{"main": "Clear", "description": "clear sky"}],
            "main": {"temp": 20.5, "feels_like": 19.8, "humidity": 65},
            "dt": 1684929490,
            "timezone": 0
        });
        let data = parse_current(&body.to_string()).unwrap();
        assert!(!data.has_precip);
        assert_eq!(data.precip_1h, 0.0);
        assert_eq!(data.wind_speed, 0.0);
        assert_eq!(data.cloudiness, None);
    }

    #[test]
    fn test_parse_snow_when_no_rain() {
        let mut body = sample_body();
        body.as_object_mut().unwrap().remove("rain");
        body["snow"] = serde_json::json!({"1h": 0.4});
        let data = parse_current(&body.to_string()).unwrap();
        assert!(data.has_precip);
        assert_eq!(data.precip_1h, 0.4);
    }

    #[test]
    fn test_parse_missing_weather_array() {
        let mut body = sample_body();
        body["weather"] = serde_json::json!([]);
        let err = parse_current(&body.to_string()).unwrap_err();
        assert!(err.to_string().contains("missing 'weather' array"));
    }

    #[test]
    fn test_parse_missing_main_block() {
        let mut body = sample_body();
        body.as_object_mut().unwrap().remove("main");
        let err = parse_current(&body.to_string()).unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = parse_current("not json").unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
    }

    #[test]
    fn test_error_from_json_body() {
        let body = r#"{"cod": 401, "message": "Invalid API key"}"#;
        let err = error_from_response(401, body);
        assert_eq!(err.to_string(), "OpenWeather API error 401: Invalid API key");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_error_lists_parameters() {
        let body = r#"{"cod": "400", "message": "wrong latitude", "parameters": ["lat"]}"#;
        let err = error_from_response(400, body);
        assert_eq!(
            err.to_string(),
            "OpenWeather API error 400: wrong latitude (parameters: lat)"
        );
    }

    #[test]
    fn test_error_from_plain_body_is_truncated() {
        let body = "x".repeat(500);
        let err = error_from_response(502, &body);
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.to_string(), format!("HTTP 502: {}", "x".repeat(200)));
        assert!(err.is_retryable());
    }
}
