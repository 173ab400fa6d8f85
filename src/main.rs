use anyhow::Result;
use clap::Parser;
use std::io;
use std::path::PathBuf;

use weathermatrix_core::{spawn_ctrl_c_handler, App, Config};

/// Current weather on an RGB LED matrix
#[derive(Parser, Debug)]
#[command(name = "weathermatrix", version, about)]
struct Cli {
    /// Config file (default: <config dir>/weathermatrix/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also append logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Matrix width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Matrix height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// metric, imperial or standard
    #[arg(long)]
    units: Option<String>,

    /// Seconds between display refreshes (minimum 1)
    #[arg(long)]
    refresh: Option<f64>,

    /// Seconds before cached weather is refetched
    #[arg(long)]
    cache_ttl: Option<u64>,

    /// Fetch attempts per refresh
    #[arg(long)]
    max_retries: Option<u32>,

    /// Base backoff delay in seconds
    #[arg(long)]
    retry_delay: Option<f64>,

    /// HTTP timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Save every frame to this PNG file
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Log a frame report and pixel diff after every frame
    #[arg(long)]
    diagnostics: bool,

    /// Render a single frame and exit
    #[arg(long)]
    once: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(width) = self.width {
            config.display.width = width;
        }
        if let Some(height) = self.height {
            config.display.height = height;
        }
        if let Some(units) = &self.units {
            config.weather.units = units.parse().map_err(anyhow::Error::msg)?;
        }
        if let Some(refresh) = self.refresh {
            config.display.refresh_seconds = refresh;
        }
        if let Some(ttl) = self.cache_ttl {
            config.service.cache_ttl_seconds = ttl;
        }
        if let Some(max_retries) = self.max_retries {
            config.service.max_retries = max_retries;
        }
        if let Some(delay) = self.retry_delay {
            config.service.retry_delay_seconds = delay;
        }
        if let Some(timeout) = self.timeout {
            config.weather.timeout_seconds = timeout;
        }
        if let Some(preview) = &self.preview {
            config.display.preview_path = Some(preview.clone());
        }
        if self.diagnostics {
            config.display.diagnostics = true;
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    weathermatrix_core::init(cli.verbose, cli.log_file.as_deref())?;

    let mut config = Config::load_with_env(cli.config.as_deref())?;
    cli.apply(&mut config)?;
    config.ensure_valid()?;

    let shutdown = spawn_ctrl_c_handler()?;
    let mut app = App::from_config(&config, io::stdout())?;

    tracing::info!("WeatherMatrix started");
    app.run(&shutdown, cli.once)?;
    tracing::info!("WeatherMatrix stopped");

    Ok(())
}
