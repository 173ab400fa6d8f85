//! Matrix rendering for WeatherMatrix
//!
//! Turns weather snapshots into draw operations on a pixel canvas.

pub mod canvas;
pub mod diagnostics;
pub mod layout;
pub mod render;

pub use canvas::{Canvas, MemoryCanvas, Rgb};
pub use diagnostics::{DiagnosticCanvas, FrameDiff, FrameSnapshot, PixelSummary};
pub use layout::{calculate_layout, condition_text, format_weather_lines, temperature_color, DrawOp};
pub use render::{draw_status, render_weather, summary_lines};
