//! Canvas instrumentation for debugging a panel you cannot see.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt::Write as _;

use crate::canvas::{Canvas, MemoryCanvas, Rgb};

/// Pixel writes kept for [`DiagnosticCanvas::recent_pixels`]
const RECENT_PIXELS: usize = 256;
/// Operations kept for [`DiagnosticCanvas::operations`]
const RECENT_OPERATIONS: usize = 256;
/// Log a pixel write once every this many
const PIXEL_LOG_EVERY: u64 = 100;
/// Positions listed in reports and diffs
const SAMPLE_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanvasOp {
    Clear,
    Fill(Rgb),
    Text { x: i32, y: i32, text: String, color: Rgb },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWrite {
    pub x: i32,
    pub y: i32,
    pub color: Rgb,
}

/// Inclusive min/max per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorRange {
    pub r: (u8, u8),
    pub g: (u8, u8),
    pub b: (u8, u8),
}

impl ColorRange {
    fn single(c: Rgb) -> Self {
        Self {
            r: (c.r, c.r),
            g: (c.g, c.g),
            b: (c.b, c.b),
        }
    }

    fn include(&mut self, c: Rgb) {
        let widen = |(lo, hi): (u8, u8), v: u8| (lo.min(v), hi.max(v));
        self.r = widen(self.r, c.r);
        self.g = widen(self.g, c.g);
        self.b = widen(self.b, c.b);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PixelSummary {
    pub total: u64,
    pub unique_positions: usize,
    pub color_range: Option<ColorRange>,
}

/// Wraps a canvas and records every operation passed through it.
///
/// Only direct `set_pixel` calls are counted as pixel writes; text drawn by
/// the wrapped canvas is recorded as one operation.
#[derive(Debug)]
pub struct DiagnosticCanvas<C> {
    inner: C,
    operations: VecDeque<CanvasOp>,
    operation_total: usize,
    recent: VecDeque<PixelWrite>,
    pixel_total: u64,
    positions: HashSet<(i32, i32)>,
    color_range: Option<ColorRange>,
}

impl<C: Canvas> DiagnosticCanvas<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            operations: VecDeque::with_capacity(RECENT_OPERATIONS),
            operation_total: 0,
            recent: VecDeque::with_capacity(RECENT_PIXELS),
            pixel_total: 0,
            positions: HashSet::new(),
            color_range: None,
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    /// Most recent operations, oldest first
    pub fn operations(&self) -> &VecDeque<CanvasOp> {
        &self.operations
    }

    /// Operations seen since creation
    pub fn operation_count(&self) -> usize {
        self.operation_total
    }

    fn record(&mut self, op: CanvasOp) {
        self.operation_total += 1;
        if self.operations.len() == RECENT_OPERATIONS {
            self.operations.pop_front();
        }
        self.operations.push_back(op);
    }

    pub fn pixel_count(&self) -> u64 {
        self.pixel_total
    }

    /// Up to `count` of the latest pixel writes, oldest first
    pub fn recent_pixels(&self, count: usize) -> Vec<PixelWrite> {
        let skip = self.recent.len().saturating_sub(count);
        self.recent.iter().skip(skip).copied().collect()
    }

    pub fn pixel_summary(&self) -> PixelSummary {
        PixelSummary {
            total: self.pixel_total,
            unique_positions: self.positions.len(),
            color_range: self.color_range,
        }
    }
}

impl<C: Canvas> Canvas for DiagnosticCanvas<C> {
    fn width(&self) -> u32 {
        self.inner.width()
    }

    fn height(&self) -> u32 {
        self.inner.height()
    }

    fn clear(&mut self) {
        tracing::debug!("DiagnosticCanvas: clear");
        self.record(CanvasOp::Clear);
        self.inner.clear();
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Rgb) {
        self.pixel_total += 1;
        if self.recent.len() == RECENT_PIXELS {
            self.recent.pop_front();
        }
        self.recent.push_back(PixelWrite { x, y, color });
        self.positions.insert((x, y));
        match &mut self.color_range {
            Some(range) => range.include(color),
            None => self.color_range = Some(ColorRange::single(color)),
        }

        if self.pixel_total % PIXEL_LOG_EVERY == 0 {
            tracing::debug!(
                "DiagnosticCanvas: set_pixel({}, {}, {:?}), {} pixels set",
                x,
                y,
                color,
                self.pixel_total
            );
        }
        self.inner.set_pixel(x, y, color);
    }

    fn fill(&mut self, color: Rgb) {
        tracing::info!("DiagnosticCanvas: fill({}, {}, {})", color.r, color.g, color.b);
        self.record(CanvasOp::Fill(color));
        self.inner.fill(color);
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Rgb) {
        tracing::debug!("DiagnosticCanvas: draw_text('{}', {}, {})", text, x, y);
        self.record(CanvasOp::Text {
            x,
            y,
            text: text.to_string(),
            color,
        });
        self.inner.draw_text(x, y, text, color);
    }
}

/// Non-black pixels of a frame, keyed by (x, y)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSnapshot {
    pub width: u32,
    pub height: u32,
    pub pixels: BTreeMap<(i32, i32), Rgb>,
}

impl FrameSnapshot {
    pub fn capture(canvas: &MemoryCanvas) -> Self {
        let mut pixels = BTreeMap::new();
        for y in 0..i32::try_from(canvas.height()).unwrap_or(i32::MAX) {
            for x in 0..i32::try_from(canvas.width()).unwrap_or(i32::MAX) {
                let color = canvas.get_pixel(x, y);
                if color != Rgb::BLACK {
                    pixels.insert((x, y), color);
                }
            }
        }
        Self {
            width: canvas.width(),
            height: canvas.height(),
            pixels,
        }
    }

    pub fn total_pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn non_black_pixels(&self) -> usize {
        self.pixels.len()
    }

    pub fn fill_percentage(&self) -> f64 {
        match self.total_pixels() {
            0 => 0.0,
            total => self.pixels.len() as f64 / total as f64 * 100.0,
        }
    }

    /// What changed going from `self` to `after`
    pub fn diff(&self, after: &FrameSnapshot) -> FrameDiff {
        let mut diff = FrameDiff::default();
        for (pos, color) in &after.pixels {
            match self.pixels.get(pos) {
                None => diff.added.push(*pos),
                Some(before) if before != color => diff.changed.push(*pos),
                Some(_) => {}
            }
        }
        diff.removed = self
            .pixels
            .keys()
            .filter(|pos| !after.pixels.contains_key(pos))
            .copied()
            .collect();
        diff
    }

    /// Human-readable frame report
    pub fn report(&self, frame: u64, operations: usize) -> String {
        let rule = "=".repeat(60);
        let mut out = String::new();
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "Diagnostic Report - Frame {}", frame);
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "Canvas: {}x{}", self.width, self.height);
        let _ = writeln!(out, "Total operations: {}", operations);
        let _ = writeln!(
            out,
            "Non-black pixels: {}/{}",
            self.non_black_pixels(),
            self.total_pixels()
        );
        let _ = writeln!(out, "Fill percentage: {:.2}%", self.fill_percentage());
        if !self.pixels.is_empty() {
            let _ = writeln!(out, "Sample non-black pixels:");
            for ((x, y), c) in self.pixels.iter().take(10) {
                let _ = writeln!(out, "  {},{}: RGB({}, {}, {})", x, y, c.r, c.g, c.b);
            }
        }
        out.push_str(&rule);
        out
    }
}

/// Pixel positions that differ between two snapshots
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameDiff {
    pub added: Vec<(i32, i32)>,
    pub removed: Vec<(i32, i32)>,
    pub changed: Vec<(i32, i32)>,
}

impl FrameDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// One-line summary listing at most a few positions per kind
    pub fn summary(&self) -> String {
        let sample = |v: &[(i32, i32)]| {
            v.iter()
                .take(SAMPLE_LIMIT)
                .map(|(x, y)| format!("{},{}", x, y))
                .collect::<Vec<_>>()
                .join(" ")
        };
        format!(
            "added={} removed={} changed={} [+{}] [-{}] [~{}]",
            self.added.len(),
            self.removed.len(),
            self.changed.len(),
            sample(&self.added),
            sample(&self.removed),
            sample(&self.changed)
        )
    }
}
