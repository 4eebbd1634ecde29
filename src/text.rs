//! Label measurement and word wrapping.

use crate::constants::LINE_HEIGHT_EM;
use eframe::egui;

/// Measures the rendered width of a single line of text.
pub trait TextMeasure {
    /// Width of `text` laid out on one line at `font_size`, in diagram units.
    fn line_width(&self, text: &str, font_size: f32) -> f32;
}

/// Font-independent measurer based on average glyph advances.
///
/// Used when no font system is available (headless export, tests).
#[derive(Debug, Clone, Copy)]
pub struct ApproxMeasure {
    /// Average advance of a glyph, in em
    pub char_width_factor: f32,
}

impl Default for ApproxMeasure {
    fn default() -> Self {
        Self {
            char_width_factor: 0.6,
        }
    }
}

impl TextMeasure for ApproxMeasure {
    fn line_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * self.char_width_factor * font_size
    }
}

/// Measures with the egui font atlas, so wrapping matches what the canvas draws.
pub struct EguiMeasure<'a> {
    ctx: &'a egui::Context,
}

impl<'a> EguiMeasure<'a> {
    /// Wraps an egui context.
    pub fn new(ctx: &'a egui::Context) -> Self {
        Self { ctx }
    }
}

impl TextMeasure for EguiMeasure<'_> {
    fn line_width(&self, text: &str, font_size: f32) -> f32 {
        let font_id = egui::FontId::proportional(font_size);
        self.ctx.fonts_mut(|f| {
            f.layout_no_wrap(text.to_owned(), font_id, egui::Color32::BLACK)
                .size()
                .x
        })
    }
}

/// Greedily packs whitespace-delimited words onto lines no wider than `max_width`.
///
/// A single word wider than `max_width` gets a line of its own; no word is ever
/// split or dropped.
pub fn wrap_words(
    text: &str,
    max_width: f32,
    font_size: f32,
    measure: &dyn TextMeasure,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.is_empty() {
            current_line.push_str(word);
            continue;
        }
        let test_line = format!("{} {}", current_line, word);
        if measure.line_width(&test_line, font_size) <= max_width {
            current_line = test_line;
        } else {
            lines.push(std::mem::replace(&mut current_line, word.to_string()));
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// One laid-out line of a text block.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    /// The line's text
    pub text: String,
    /// Vertical center of the line, in diagram units
    pub y: f32,
    /// Measured width of the line
    pub width: f32,
}

/// A centered multi-line label.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    /// Horizontal center of every line
    pub x: f32,
    /// Lines from top to bottom
    pub lines: Vec<TextLine>,
    /// Font size the lines were measured with
    pub font_size: f32,
    /// Distance between consecutive line centers
    pub line_height: f32,
}

impl TextBlock {
    /// Wraps `text` to `max_width` and centers the result on `center`.
    ///
    /// Lines are first laid out top-down starting at `center.y`, then the whole
    /// block is shifted up by half its measured height.
    pub fn wrapped(
        text: &str,
        center: egui::Pos2,
        max_width: f32,
        font_size: f32,
        measure: &dyn TextMeasure,
    ) -> Self {
        let line_height = font_size * LINE_HEIGHT_EM;
        let mut lines: Vec<TextLine> = wrap_words(text, max_width, font_size, measure)
            .into_iter()
            .enumerate()
            .map(|(i, line)| TextLine {
                width: measure.line_width(&line, font_size),
                y: center.y + (i as f32 + 0.5) * line_height,
                text: line,
            })
            .collect();

        let shift = lines.len() as f32 * line_height / 2.0;
        for line in &mut lines {
            line.y -= shift;
        }

        Self {
            x: center.x,
            lines,
            font_size,
            line_height,
        }
    }

    /// A single unwrapped line centered on `center`.
    pub fn single_line(text: &str, center: egui::Pos2, font_size: f32, measure: &dyn TextMeasure) -> Self {
        Self {
            x: center.x,
            lines: vec![TextLine {
                text: text.to_string(),
                y: center.y,
                width: measure.line_width(text, font_size),
            }],
            font_size,
            line_height: font_size * LINE_HEIGHT_EM,
        }
    }

    /// Measured height of the block.
    pub fn height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height
    }

    /// Bounding box of the block.
    pub fn bounds(&self) -> egui::Rect {
        let half_h = self.line_height / 2.0;
        let mut rect = egui::Rect::NOTHING;
        for line in &self.lines {
            let half_w = line.width / 2.0;
            rect = rect.union(egui::Rect::from_min_max(
                egui::pos2(self.x - half_w, line.y - half_h),
                egui::pos2(self.x + half_w, line.y + half_h),
            ));
        }
        rect
    }

    /// Moves the block by `delta`.
    pub fn translate(&mut self, delta: egui::Vec2) {
        self.x += delta.x;
        for line in &mut self.lines {
            line.y += delta.y;
        }
    }
}
