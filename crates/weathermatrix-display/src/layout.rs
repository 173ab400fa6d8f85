//! Layout calculation for the weather screen.
//!
//! Everything here is a pure function of the snapshot so it can be tested
//! without a canvas.

use weathermatrix_weather::WeatherData;

use crate::canvas::{Rgb, CHAR_WIDTH};

pub const CONDITION_COLOR: Rgb = Rgb::new(200, 200, 200);
/// Top of the second text line on a 32-row panel
pub const SECOND_LINE_Y: i32 = 14;
const MAX_CONDITION_CHARS: usize = 18;

/// One drawing step produced by [`calculate_layout`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOp {
    Text {
        text: String,
        x: i32,
        y: i32,
        color: Rgb,
    },
}

/// Colour for a temperature in Celsius.
///
/// Below 0 is blue, then blue to cyan up to 15, cyan to yellow up to 25,
/// yellow to orange up to 35, and orange to red above.
pub fn temperature_color(temp_c: f64) -> Rgb {
    // Channel values truncate toward zero
    let channel = |v: f64| v.clamp(0.0, 255.0) as u8;

    if temp_c < 0.0 {
        Rgb::new(0, 0, 255)
    } else if temp_c < 15.0 {
        let ratio = temp_c / 15.0;
        Rgb::new(0, channel(255.0 * ratio), 255)
    } else if temp_c < 25.0 {
        let ratio = (temp_c - 15.0) / 10.0;
        Rgb::new(channel(255.0 * ratio), 255, channel(255.0 * (1.0 - ratio)))
    } else if temp_c < 35.0 {
        let ratio = (temp_c - 25.0) / 10.0;
        Rgb::new(255, channel(255.0 * (1.0 - ratio * 0.5)), 0)
    } else {
        let ratio = ((temp_c - 35.0) / 10.0).min(1.0);
        Rgb::new(255, channel(255.0 * (1.0 - ratio)), 0)
    }
}

/// Short condition label, e.g. "Cloudy" for "Clouds".
/// Unmapped groups are shown capitalized.
pub fn condition_text(weather: &WeatherData) -> String {
    match weather.condition().short_label() {
        Some(label) => label.to_string(),
        None => capitalize(&weather.condition_main),
    }
}

/// Two centred lines: temperature on top, condition below
pub fn calculate_layout(weather: &WeatherData, width: u32, _height: u32) -> Vec<DrawOp> {
    let width = i32::try_from(width).unwrap_or(i32::MAX);
    let centred_x = |text: &str| {
        let estimate = i32::try_from(text.chars().count())
            .unwrap_or(i32::MAX)
            .saturating_mul(CHAR_WIDTH);
        (width.saturating_sub(estimate) / 2).max(0)
    };

    let temp_text = format!("{}°", weather.temp.trunc() as i64);
    let condition = condition_text(weather);

    vec![
        DrawOp::Text {
            x: centred_x(&temp_text),
            y: 0,
            color: temperature_color(weather.temp),
            text: temp_text,
        },
        DrawOp::Text {
            x: centred_x(&condition),
            y: SECOND_LINE_Y,
            color: CONDITION_COLOR,
            text: condition,
        },
    ]
}

/// Temperature, condition and details lines for a text summary.
///
/// Temperatures round half to even and always carry a sign, e.g. "+20°".
pub fn format_weather_lines(weather: &WeatherData) -> (String, String, String) {
    let temp = format!("{:+}°", weather.temp.round_ties_even() as i64);
    let condition: String = title_case(&weather.condition_main)
        .chars()
        .take(MAX_CONDITION_CHARS)
        .collect();
    let feels = format!("Feels {:+}°", weather.feels_like.round_ties_even() as i64);
    let humidity = format!("Hum {}%", weather.humidity.trunc() as i64);
    let wind = format!("Wind {:.1}m/s", weather.wind_speed);
    (temp, condition, format!("{}  {}  {}", feels, humidity, wind))
}

/// First character upper-cased, the rest lower-cased
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Upper-case the first letter of every run of letters
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}
