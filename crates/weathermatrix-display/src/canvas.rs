//! Pixel canvas abstraction for the LED matrix.

use std::path::Path;

/// 8-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Perceived brightness, 0..=255
    pub fn luminance(&self) -> f64 {
        0.299 * f64::from(self.r) + 0.587 * f64::from(self.g) + 0.114 * f64::from(self.b)
    }
}

/// Drawing surface the renderer targets.
///
/// Coordinates outside the surface are ignored rather than rejected.
pub trait Canvas {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Set every pixel to black
    fn clear(&mut self);
    fn set_pixel(&mut self, x: i32, y: i32, color: Rgb);
    fn fill(&mut self, color: Rgb);
    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Rgb);
}

/// Glyph cell used by the block text renderer
pub const CHAR_WIDTH: i32 = 6;
pub const CHAR_HEIGHT: i32 = 8;

pub const DEFAULT_WIDTH: u32 = 64;
pub const DEFAULT_HEIGHT: u32 = 32;

pub const ASCII_RAMP: &str = " .:-=+*#%@";
/// Upscale factor for PNG previews
pub const DEFAULT_PREVIEW_SCALE: u32 = 10;

/// Text run recorded by [`MemoryCanvas::draw_text`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub x: i32,
    pub y: i32,
    pub text: String,
    pub color: Rgb,
}

/// In-memory canvas, for tests and for running without matrix hardware
#[derive(Debug, Clone)]
pub struct MemoryCanvas {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
    texts: Vec<TextRun>,
}

impl MemoryCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb::BLACK; (width as usize) * (height as usize)],
            texts: Vec::new(),
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        if x < self.width && y < self.height {
            Some((y as usize) * (self.width as usize) + x as usize)
        } else {
            None
        }
    }

    /// Colour at the given position, black when out of range
    pub fn get_pixel(&self, x: i32, y: i32) -> Rgb {
        self.index(x, y)
            .map_or(Rgb::BLACK, |i| self.pixels[i])
    }

    /// Text drawn since the last clear, in drawing order
    pub fn texts(&self) -> &[TextRun] {
        &self.texts
    }

    /// Render the pixels as ASCII art, one line per row.
    /// Brighter pixels map to later characters of `ramp`.
    pub fn to_ascii(&self, ramp: &str) -> String {
        let chars: Vec<char> = ramp.chars().collect();
        if chars.is_empty() {
            return String::new();
        }

        let mut out = String::with_capacity((self.width as usize + 1) * self.height as usize);
        for (row_index, row) in self.pixels.chunks(self.width.max(1) as usize).enumerate() {
            if row_index > 0 {
                out.push('\n');
            }
            for pixel in row {
                let scaled = (pixel.luminance() / 256.0 * chars.len() as f64) as usize;
                out.push(chars[scaled.min(chars.len() - 1)]);
            }
        }
        out
    }

    /// Copy of the frame scaled up by `scale` with nearest-neighbour
    /// sampling, so each panel pixel becomes a `scale`×`scale` square.
    pub fn to_image(&self, scale: u32) -> image::RgbImage {
        let scale = scale.max(1);
        image::RgbImage::from_fn(
            self.width.saturating_mul(scale),
            self.height.saturating_mul(scale),
            |x, y| {
                let px = i32::try_from(x / scale).unwrap_or(i32::MAX);
                let py = i32::try_from(y / scale).unwrap_or(i32::MAX);
                let c = self.get_pixel(px, py);
                image::Rgb([c.r, c.g, c.b])
            },
        )
    }

    /// Write the frame to `path` as a PNG preview
    pub fn save_png(&self, path: &Path, scale: u32) -> Result<(), image::ImageError> {
        self.to_image(scale)
            .save_with_format(path, image::ImageFormat::Png)?;
        tracing::debug!("Saved preview {}", path.display());
        Ok(())
    }
}

impl Default for MemoryCanvas {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl Canvas for MemoryCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear(&mut self) {
        self.pixels.fill(Rgb::BLACK);
        self.texts.clear();
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Rgb) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    fn fill(&mut self, color: Rgb) {
        self.pixels.fill(color);
    }

    /// Draws each character as a solid block inside its glyph cell; there is
    /// no bitmap font here, so this only shows where text lands.
    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Rgb) {
        for (i, _) in text.chars().enumerate() {
            let cell_x = x + (i as i32) * CHAR_WIDTH;
            for py in 0..CHAR_HEIGHT - 1 {
                for px in 0..CHAR_WIDTH - 1 {
                    self.set_pixel(cell_x + px, y + py, color);
                }
            }
        }
        self.texts.push(TextRun {
            x,
            y,
            text: text.to_string(),
            color,
        });
    }
}
