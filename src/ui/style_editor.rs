//! Style editor panel: per node type colors and font size.

use super::state::FlowchartApp;
use crate::constants::{MAX_FONT_SIZE, MIN_FONT_SIZE};
use crate::style::{ColorField, StyleChange};
use crate::text::EguiMeasure;
use crate::types::NodeKind;
use eframe::egui;

impl FlowchartApp {
    /// Draws the style panel. Every edit changes one field of one type and
    /// repaints immediately; Reset restores all defaults at once.
    pub fn draw_style_editor(&mut self, ui: &mut egui::Ui) {
        ui.heading("Node styles");
        ui.separator();

        let mut changes: Vec<(NodeKind, StyleChange)> = Vec::new();
        egui::ScrollArea::vertical().show(ui, |ui| {
            for kind in NodeKind::ALL {
                let style = *self.styles.get(kind);
                egui::CollapsingHeader::new(kind.display_name())
                    .id_salt(("style", kind.as_str()))
                    .default_open(true)
                    .show(ui, |ui| {
                        egui::Grid::new(("style_grid", kind.as_str()))
                            .num_columns(2)
                            .show(ui, |ui| {
                                for field in ColorField::ALL {
                                    ui.label(field.label());
                                    let mut color = style.color(field);
                                    if ui.color_edit_button_srgba(&mut color).changed() {
                                        changes.push((kind, StyleChange::Color(field, color)));
                                    }
                                    ui.end_row();
                                }
                                ui.label("Font size");
                                let mut size = style.font_size;
                                let response = ui.add(
                                    egui::DragValue::new(&mut size)
                                        .range(MIN_FONT_SIZE..=MAX_FONT_SIZE)
                                        .suffix(" px"),
                                );
                                if response.changed() {
                                    changes.push((kind, StyleChange::FontSize(size)));
                                }
                                ui.end_row();
                            });
                    });
            }

            ui.add_space(8.0);
            let reset_clicked = ui
                .add_enabled(!self.styles.is_default(), egui::Button::new("Reset to defaults"))
                .clicked();
            if reset_clicked {
                let measure = EguiMeasure::new(ui.ctx());
                self.reset_styles(&measure);
            }
        });

        if !changes.is_empty() {
            let measure = EguiMeasure::new(ui.ctx());
            for (kind, change) in changes {
                self.apply_style_change(kind, change, &measure);
            }
        }
    }
}
