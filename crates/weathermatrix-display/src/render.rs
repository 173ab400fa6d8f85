use weathermatrix_weather::WeatherData;

use crate::canvas::{Canvas, Rgb};
use crate::layout::{calculate_layout, format_weather_lines, DrawOp};

pub const STATUS_COLOR: Rgb = Rgb::new(255, 165, 0);
pub const STARTING_COLOR: Rgb = Rgb::new(0, 255, 0);
pub const ERROR_COLOR: Rgb = Rgb::new(255, 0, 0);
const MAX_STATUS_CHARS: usize = 32;

/// Clear the canvas and draw the weather screen
pub fn render_weather(canvas: &mut dyn Canvas, weather: &WeatherData) {
    canvas.clear();

    for op in calculate_layout(weather, canvas.width(), canvas.height()) {
        match op {
            DrawOp::Text { text, x, y, color } => {
                tracing::debug!("DrawText '{}' x={} y={}", text, x, y);
                canvas.draw_text(x, y, &text, color);
            }
        }
    }
}

/// Clear the canvas and show a one-line status message
pub fn draw_status(canvas: &mut dyn Canvas, message: &str, color: Option<Rgb>) {
    canvas.clear();
    let message: String = message.chars().take(MAX_STATUS_CHARS).collect();
    tracing::info!("DrawStatus '{}'", message);
    canvas.draw_text(2, 0, &message, color.unwrap_or(STATUS_COLOR));
}

/// Three-line text summary: temperature and condition, details, update time
pub fn summary_lines(weather: &WeatherData) -> [String; 3] {
    let (temp, condition, info) = format_weather_lines(weather);
    let updated = weather
        .observed_at()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());
    [
        format!("{} {}", temp, condition),
        info,
        format!("Updated {}", updated),
    ]
}
