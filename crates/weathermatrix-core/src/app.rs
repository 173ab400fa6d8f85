use anyhow::Context;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use weathermatrix_display::canvas::ASCII_RAMP;
use weathermatrix_display::render::{ERROR_COLOR, STARTING_COLOR};
use weathermatrix_display::{
    draw_status, render_weather, summary_lines, Canvas, DiagnosticCanvas, FrameSnapshot,
    MemoryCanvas,
};
use weathermatrix_weather::{OpenWeatherProvider, WeatherData, WeatherProvider, WeatherService};

use crate::error::AppError;
use crate::Config;

const STARTING_MESSAGE: &str = "Starting weather display";
/// Granularity of the shutdown check while waiting between frames
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Outcome of a single display cycle
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Weather(WeatherData),
    /// `redrawn` is false when the same error was already on screen
    Error { message: String, redrawn: bool },
}

/// Display loop: fetch, render, present, wait.
pub struct App<P, W> {
    service: WeatherService<P>,
    canvas: DiagnosticCanvas<MemoryCanvas>,
    out: W,
    refresh: Duration,
    last_error: Option<String>,
    frames: u64,
    /// Log a frame report and diff after each presented frame
    diagnostics: bool,
    last_snapshot: Option<FrameSnapshot>,
    preview: Option<(PathBuf, u32)>,
}

impl<W: Write> App<OpenWeatherProvider, W> {
    /// Wire the OpenWeather provider, service and canvas from config
    pub fn from_config(config: &Config, out: W) -> Result<Self, AppError> {
        let provider = OpenWeatherProvider::new(config.weather.provider_config()?)?;
        let service = WeatherService::new(provider, config.service.service_config());
        let canvas = MemoryCanvas::new(config.display.width, config.display.height);
        let mut app = Self::new(service, canvas, config.display.refresh_interval(), out)
            .with_diagnostics(config.display.diagnostics);
        if let Some(path) = &config.display.preview_path {
            app = app.with_preview(path.clone(), config.display.preview_scale);
        }
        Ok(app)
    }
}

impl<P: WeatherProvider, W: Write> App<P, W> {
    pub fn new(service: WeatherService<P>, canvas: MemoryCanvas, refresh: Duration, out: W) -> Self {
        Self {
            service,
            canvas: DiagnosticCanvas::new(canvas),
            out,
            refresh,
            last_error: None,
            frames: 0,
            diagnostics: false,
            last_snapshot: None,
            preview: None,
        }
    }

    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    /// Save every presented frame as a PNG at `path`
    pub fn with_preview(mut self, path: PathBuf, scale: u32) -> Self {
        self.preview = Some((path, scale));
        self
    }

    pub fn canvas(&self) -> &MemoryCanvas {
        self.canvas.inner()
    }

    pub fn diagnostics(&self) -> &DiagnosticCanvas<MemoryCanvas> {
        &self.canvas
    }

    /// Frames presented so far, status screens included
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn service(&self) -> &WeatherService<P> {
        &self.service
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Show the start-up status screen
    pub fn start(&mut self) -> Result<(), AppError> {
        tracing::info!(
            "Weather display started ({}x{}, refresh {}s)",
            self.canvas.width(),
            self.canvas.height(),
            self.refresh.as_secs_f64()
        );
        draw_status(&mut self.canvas, STARTING_MESSAGE, Some(STARTING_COLOR));
        self.present(None)
    }

    /// Run one cycle. Provider failures are reported on screen, never
    /// returned; only presentation errors propagate.
    pub fn tick(&mut self) -> Result<Frame, AppError> {
        match self.service.get_latest() {
            Ok(weather) => {
                render_weather(&mut self.canvas, &weather);
                self.last_error = None;
                self.present(Some(&weather))?;
                Ok(Frame::Weather(weather))
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!("Weather update failed: {}", message);

                let redrawn = self.last_error.as_deref() != Some(message.as_str());
                if redrawn {
                    let status = AppError::from(e).user_message();
                    draw_status(&mut self.canvas, status, Some(ERROR_COLOR));
                    self.present(None)?;
                    self.last_error = Some(message.clone());
                }
                Ok(Frame::Error { message, redrawn })
            }
        }
    }

    /// Loop until `shutdown` is set, or for a single frame when `once`.
    /// The canvas is cleared on the way out.
    pub fn run(&mut self, shutdown: &AtomicBool, once: bool) -> Result<(), AppError> {
        self.start()?;

        let result = loop {
            if let Err(e) = self.tick() {
                break Err(e);
            }
            if once || wait_or_shutdown(shutdown, self.refresh) {
                break Ok(());
            }
        };

        self.stop();
        result
    }

    fn stop(&mut self) {
        tracing::info!("Weather display stopped");
        self.canvas.clear();
    }

    fn present(&mut self, weather: Option<&WeatherData>) -> Result<(), AppError> {
        let frame = self.canvas.inner();
        writeln!(self.out, "{}", frame.to_ascii(ASCII_RAMP))?;
        if let Some(weather) = weather {
            for line in summary_lines(weather) {
                writeln!(self.out, "{}", line)?;
            }
        }
        writeln!(self.out, "{}", "-".repeat(frame.width() as usize))?;
        self.out.flush()?;
        self.frames += 1;

        if let Some((path, scale)) = &self.preview {
            if let Err(e) = frame.save_png(path, *scale) {
                tracing::warn!("Failed to save preview {}: {}", path.display(), e);
            }
        }

        if self.diagnostics {
            let snapshot = FrameSnapshot::capture(frame);
            tracing::info!(
                "\n{}",
                snapshot.report(self.frames, self.canvas.operation_count())
            );
            if let Some(previous) = &self.last_snapshot {
                tracing::info!("Frame diff: {}", previous.diff(&snapshot).summary());
            }
            self.last_snapshot = Some(snapshot);
        }
        Ok(())
    }
}

/// Sleep for `duration` in short slices. Returns true as soon as the
/// shutdown flag is observed. A duration past the clock's range waits for
/// shutdown only.
pub fn wait_or_shutdown(shutdown: &AtomicBool, duration: Duration) -> bool {
    let deadline = Instant::now().checked_add(duration);
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return true;
        }
        let slice = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return false;
                }
                remaining.min(SHUTDOWN_POLL)
            }
            None => SHUTDOWN_POLL,
        };
        thread::sleep(slice);
    }
}

/// Flag set once Ctrl-C is received, watched from a helper thread.
pub fn spawn_ctrl_c_handler() -> anyhow::Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build signal runtime")?;

    let handler_flag = Arc::clone(&flag);
    thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::info!("Interrupt received, shutting down");
                        handler_flag.store(true, Ordering::SeqCst);
                    }
                    Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
                }
            });
        })
        .context("Failed to spawn signal thread")?;

    Ok(flag)
}
