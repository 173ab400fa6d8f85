use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use weathermatrix_display::canvas::DEFAULT_PREVIEW_SCALE;
use weathermatrix_weather::{Location, OpenWeatherConfig, ServiceConfig, Units};

use crate::error::ConfigError;

/// Environment variables recognised on top of the config file
pub const ENV_API_KEY: &str = "WEATHER_API_KEY";
pub const ENV_LAT: &str = "WEATHER_LAT";
pub const ENV_LON: &str = "WEATHER_LON";
pub const ENV_LANG: &str = "WEATHER_LANG";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// All errors joined into one line
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Provider settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Cache and retry policy
    #[serde(default)]
    pub service: ServiceSettings,

    /// Panel geometry and refresh cadence
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeather API key (usually supplied via WEATHER_API_KEY)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Usually supplied via WEATHER_LAT / WEATHER_LON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    #[serde(default)]
    pub units: Units,

    /// Language code for condition descriptions
    #[serde(default = "default_lang")]
    pub lang: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            latitude: None,
            longitude: None,
            units: Units::default(),
            lang: default_lang(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl WeatherConfig {
    /// Both coordinates, range-checked
    pub fn location(&self) -> Result<Location, ConfigError> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Location::new(lat, lon).map_err(ConfigError::Invalid),
            _ => Err(ConfigError::MissingSetting(format!("{}/{}", ENV_LAT, ENV_LON))),
        }
    }

    /// Provider settings, or an error if the key or coordinates are unusable
    pub fn provider_config(&self) -> Result<OpenWeatherConfig, ConfigError> {
        let api_key = self
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingSetting(ENV_API_KEY.to_string()))?;
        let location = self.location()?;

        let mut config = OpenWeatherConfig::new(api_key, location);
        config.units = self.units;
        config.lang = self.lang.clone();
        config.timeout = Duration::from_secs(self.timeout_seconds);
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Freshness window for cached weather
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,

    /// Fetch attempts per refresh
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff base unit in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: f64,
}

fn default_cache_ttl() -> u64 {
    600
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> f64 {
    1.0
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: default_cache_ttl(),
            max_retries: default_max_retries(),
            retry_delay_seconds: default_retry_delay(),
        }
    }
}

impl ServiceSettings {
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig::from_seconds(
            self.cache_ttl_seconds,
            self.max_retries,
            self.retry_delay_seconds,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// Seconds between display refreshes
    #[serde(default = "default_refresh")]
    pub refresh_seconds: f64,

    /// Log a frame report and pixel diff after every frame
    #[serde(default)]
    pub diagnostics: bool,

    /// Write each frame to this PNG file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_path: Option<PathBuf>,

    /// Upscale factor for the PNG preview
    #[serde(default = "default_preview_scale")]
    pub preview_scale: u32,
}

fn default_width() -> u32 {
    64
}

fn default_height() -> u32 {
    32
}

fn default_refresh() -> f64 {
    30.0
}

fn default_preview_scale() -> u32 {
    DEFAULT_PREVIEW_SCALE
}

/// Refresh cadence never drops below one second
pub const MIN_REFRESH_SECS: f64 = 1.0;

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            refresh_seconds: default_refresh(),
            diagnostics: false,
            preview_path: None,
            preview_scale: default_preview_scale(),
        }
    }
}

impl DisplayConfig {
    /// Interval between frames, floored at one second
    pub fn refresh_interval(&self) -> Duration {
        let secs = if self.refresh_seconds.is_finite() {
            self.refresh_seconds.max(MIN_REFRESH_SECS)
        } else {
            MIN_REFRESH_SECS
        };
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location when
    /// `None`. The default file is created with defaults if missing; an
    /// explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.display().to_string()).into());
                }
                p.to_path_buf()
            }
            None => {
                let default_path = Self::config_path()?;
                if !default_path.exists() {
                    let config = Self::default();
                    config.save(&default_path)?;
                    return Ok(config);
                }
                default_path
            }
        };

        let contents = std::fs::read_to_string(&config_path).with_context(|| {
            format!("Failed to read config file {}", config_path.display())
        })?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        tracing::debug!("Loaded config from {}", config_path.display());
        Ok(config)
    }

    /// Load the file, then apply `.env` and the process environment.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::load(path)?;

        if let Ok(env_file) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", env_file.display());
        }
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Validate and log warnings.
    ///
    /// Returns an error if validation fails with critical errors.
    pub fn ensure_valid(&self) -> Result<ValidationResult> {
        let validation = self.validate();
        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        if let Ok(location) = self.weather.location() {
            tracing::info!(
                "Configuration loaded: lat={} lon={} units={}",
                location.latitude,
                location.longitude,
                self.weather.units.as_str()
            );
        }
        Ok(validation)
    }

    /// Override file values with environment variables.
    /// Empty variables are ignored; unparseable coordinates are an error.
    pub fn apply_env<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = var(ENV_API_KEY) {
            self.weather.api_key = Some(key.trim().to_string());
        }
        if let Some(lat) = var(ENV_LAT) {
            self.weather.latitude = Some(parse_coordinate(&lat, ENV_LAT)?);
        }
        if let Some(lon) = var(ENV_LON) {
            self.weather.longitude = Some(parse_coordinate(&lon, ENV_LON)?);
        }
        if let Some(lang) = var(ENV_LANG) {
            self.weather.lang = lang.trim().to_string();
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        // Provider
        if self
            .weather
            .api_key
            .as_deref()
            .map_or(true, |k| k.trim().is_empty())
        {
            result.add_error("weather.api_key", format!("Missing {} in environment", ENV_API_KEY));
        }
        match self.weather.location() {
            Ok(_) => {}
            Err(ConfigError::MissingSetting(names)) => {
                result.add_error("weather.location", format!("Missing {} in environment", names));
            }
            Err(e) => result.add_error("weather.location", e.to_string()),
        }
        if self.weather.timeout_seconds == 0 {
            result.add_error("weather.timeout_seconds", "Timeout must be greater than 0");
        }

        // Retry policy
        let delay = self.service.retry_delay_seconds;
        if !delay.is_finite() || delay < 0.0 {
            result.add_error(
                "service.retry_delay_seconds",
                "Retry delay must be a non-negative number",
            );
        }
        if self.service.max_retries == 0 {
            result.add_warning(
                "service.max_retries",
                "No fetch attempts allowed (0 retries); weather will never load",
            );
        }
        if self.service.cache_ttl_seconds < 60 {
            result.add_warning(
                "service.cache_ttl_seconds",
                "Cache TTL under 60s may exceed the API rate limit",
            );
        }

        // Display
        if self.display.width == 0 {
            result.add_error("display.width", "Display width must be greater than 0");
        }
        if self.display.height == 0 {
            result.add_error("display.height", "Display height must be greater than 0");
        }
        if self.display.preview_path.is_some() && self.display.preview_scale == 0 {
            result.add_error("display.preview_scale", "Preview scale must be greater than 0");
        }
        if self.display.refresh_seconds < MIN_REFRESH_SECS {
            result.add_warning(
                "display.refresh_seconds",
                format!("Refresh below {}s is raised to {}s", MIN_REFRESH_SECS, MIN_REFRESH_SECS),
            );
        }

        result
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the default configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("weathermatrix");

        Ok(config_dir.join("config.toml"))
    }
}

fn parse_coordinate(raw: &str, env_name: &str) -> Result<f64, ConfigError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| ConfigError::Invalid(format!("Invalid coordinates: {} ({})", e, env_name)))
}
