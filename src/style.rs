//! Per-node-type visual style.
//!
//! The [`StyleSet`] is process-lifetime state owned by the application controller.
//! It starts out as the built-in defaults, is mutated one field at a time by the
//! style editor, and can be reset to the defaults atomically.

use crate::constants::{MAX_FONT_SIZE, MIN_FONT_SIZE};
use crate::types::NodeKind;
use eframe::egui::Color32;

/// Visual style of one node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStyle {
    /// Gradient stop at the top of the shape
    pub fill_top: Color32,
    /// Gradient stop at the bottom of the shape
    pub fill_bottom: Color32,
    /// Outline color
    pub stroke: Color32,
    /// Label color
    pub text: Color32,
    /// Label font size, within `MIN_FONT_SIZE..=MAX_FONT_SIZE`
    pub font_size: u32,
}

/// The color-valued fields of a [`NodeStyle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorField {
    /// First gradient stop
    FillTop,
    /// Second gradient stop
    FillBottom,
    /// Outline
    Stroke,
    /// Label
    Text,
}

impl ColorField {
    /// All color fields, in editor order.
    pub const ALL: [ColorField; 4] = [
        ColorField::FillTop,
        ColorField::FillBottom,
        ColorField::Stroke,
        ColorField::Text,
    ];

    /// Label shown next to the color picker.
    pub fn label(&self) -> &'static str {
        match self {
            ColorField::FillTop => "Gradient top",
            ColorField::FillBottom => "Gradient bottom",
            ColorField::Stroke => "Stroke",
            ColorField::Text => "Text",
        }
    }
}

/// A single-field edit of one node type's style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleChange {
    /// Replace one color
    Color(ColorField, Color32),
    /// Replace the font size (clamped to the accepted range)
    FontSize(u32),
}

impl NodeStyle {
    /// Reads one color field.
    pub fn color(&self, field: ColorField) -> Color32 {
        match field {
            ColorField::FillTop => self.fill_top,
            ColorField::FillBottom => self.fill_bottom,
            ColorField::Stroke => self.stroke,
            ColorField::Text => self.text,
        }
    }

    fn color_mut(&mut self, field: ColorField) -> &mut Color32 {
        match field {
            ColorField::FillTop => &mut self.fill_top,
            ColorField::FillBottom => &mut self.fill_bottom,
            ColorField::Stroke => &mut self.stroke,
            ColorField::Text => &mut self.text,
        }
    }
}

/// Style for every node type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSet {
    start: NodeStyle,
    process: NodeStyle,
    decision: NodeStyle,
    end: NodeStyle,
}

impl Default for StyleSet {
    fn default() -> Self {
        Self {
            start: NodeStyle {
                fill_top: Color32::from_rgb(134, 239, 172),
                fill_bottom: Color32::from_rgb(22, 163, 74),
                stroke: Color32::from_rgb(20, 83, 45),
                text: Color32::from_rgb(255, 255, 255),
                font_size: 14,
            },
            process: NodeStyle {
                fill_top: Color32::from_rgb(147, 197, 253),
                fill_bottom: Color32::from_rgb(37, 99, 235),
                stroke: Color32::from_rgb(30, 58, 138),
                text: Color32::from_rgb(255, 255, 255),
                font_size: 14,
            },
            decision: NodeStyle {
                fill_top: Color32::from_rgb(253, 230, 138),
                fill_bottom: Color32::from_rgb(245, 158, 11),
                stroke: Color32::from_rgb(146, 64, 14),
                text: Color32::from_rgb(31, 41, 55),
                font_size: 13,
            },
            end: NodeStyle {
                fill_top: Color32::from_rgb(252, 165, 165),
                fill_bottom: Color32::from_rgb(220, 38, 38),
                stroke: Color32::from_rgb(127, 29, 29),
                text: Color32::from_rgb(255, 255, 255),
                font_size: 14,
            },
        }
    }
}

impl StyleSet {
    /// The built-in defaults.
    pub fn defaults() -> Self {
        Self::default()
    }

    /// Style of the given node type.
    pub fn get(&self, kind: NodeKind) -> &NodeStyle {
        match kind {
            NodeKind::Start => &self.start,
            NodeKind::Process => &self.process,
            NodeKind::Decision => &self.decision,
            NodeKind::End => &self.end,
        }
    }

    fn get_mut(&mut self, kind: NodeKind) -> &mut NodeStyle {
        match kind {
            NodeKind::Start => &mut self.start,
            NodeKind::Process => &mut self.process,
            NodeKind::Decision => &mut self.decision,
            NodeKind::End => &mut self.end,
        }
    }

    /// Applies one field edit to one type. Returns whether anything changed,
    /// which callers use to decide on a repaint.
    pub fn apply(&mut self, kind: NodeKind, change: StyleChange) -> bool {
        let style = self.get_mut(kind);
        match change {
            StyleChange::Color(field, color) => {
                let slot = style.color_mut(field);
                let changed = *slot != color;
                *slot = color;
                changed
            }
            StyleChange::FontSize(size) => {
                let size = size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
                let changed = style.font_size != size;
                style.font_size = size;
                changed
            }
        }
    }

    /// Replaces the whole set with the built-in defaults.
    pub fn reset(&mut self) {
        *self = Self::defaults();
    }

    /// Whether the set currently equals the defaults.
    pub fn is_default(&self) -> bool {
        *self == Self::defaults()
    }
}

/// Formats the straight (unmultiplied) channels of a color as `#rrggbb`, dropping alpha.
pub fn to_hex(color: Color32) -> String {
    let [r, g, b, _] = color.to_srgba_unmultiplied();
    format!("#{r:02x}{g:02x}{b:02x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_restores_defaults_after_mutations() {
        let mut styles = StyleSet::defaults();
        for kind in NodeKind::ALL {
            for field in ColorField::ALL {
                styles.apply(kind, StyleChange::Color(field, Color32::from_rgb(1, 2, 3)));
            }
            styles.apply(kind, StyleChange::FontSize(22));
        }
        assert!(!styles.is_default());

        styles.reset();
        assert_eq!(styles, StyleSet::defaults());
        assert!(styles.is_default());
    }

    #[test]
    fn change_touches_only_one_field_of_one_type() {
        let mut styles = StyleSet::defaults();
        let before = styles.clone();
        let red = Color32::from_rgb(255, 0, 0);

        assert!(styles.apply(NodeKind::Decision, StyleChange::Color(ColorField::Stroke, red)));

        assert_eq!(styles.get(NodeKind::Decision).stroke, red);
        assert_eq!(
            styles.get(NodeKind::Decision).fill_top,
            before.get(NodeKind::Decision).fill_top
        );
        for kind in [NodeKind::Start, NodeKind::Process, NodeKind::End] {
            assert_eq!(styles.get(kind), before.get(kind));
        }
    }

    #[test]
    fn font_size_is_clamped() {
        let mut styles = StyleSet::defaults();
        styles.apply(NodeKind::Start, StyleChange::FontSize(2));
        assert_eq!(styles.get(NodeKind::Start).font_size, MIN_FONT_SIZE);
        styles.apply(NodeKind::Start, StyleChange::FontSize(99));
        assert_eq!(styles.get(NodeKind::Start).font_size, MAX_FONT_SIZE);
    }

    #[test]
    fn unchanged_value_reports_no_change() {
        let mut styles = StyleSet::defaults();
        let size = styles.get(NodeKind::End).font_size;
        assert!(!styles.apply(NodeKind::End, StyleChange::FontSize(size)));
    }

    #[test]
    fn hex_formatting() {
        assert_eq!(to_hex(Color32::from_rgb(255, 16, 0)), "#ff1000");
        assert_eq!(
            to_hex(Color32::from_rgba_unmultiplied(255, 0, 0, 128)),
            "#ff0000"
        );
    }
}
