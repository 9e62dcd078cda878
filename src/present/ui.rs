use bevy_egui::egui::{self, Color32, RichText};

use crate::types::{AnalysisResult, Cell, ObservationTable};

const ANALYSIS_HEIGHT: f32 = 320.0;
const TABLE_HEIGHT: f32 = 260.0;

/// Striped grid of the newest `rows` rows.
pub fn table_preview(ui: &mut egui::Ui, table: &ObservationTable, rows: usize) {
    let shown = super::preview(table, rows);
    ui.label(
        RichText::new(format!(
            "Showing {} of {} rows, most recent first",
            shown.len(),
            table.len()
        ))
        .color(Color32::GRAY),
    );

    egui::ScrollArea::both()
        .id_salt("table_preview_scroll")
        .max_height(TABLE_HEIGHT)
        .show(ui, |ui| {
            egui::Grid::new("table_preview_grid")
                .striped(true)
                .min_col_width(60.0)
                .show(ui, |ui| {
                    for column in shown.columns() {
                        ui.label(RichText::new(column).strong());
                    }
                    ui.end_row();

                    for row in shown.rows() {
                        for cell in row {
                            match cell {
                                Cell::Number(_) => {
                                    ui.with_layout(
                                        egui::Layout::right_to_left(egui::Align::Center),
                                        |ui| ui.monospace(cell.to_string()),
                                    );
                                }
                                Cell::Null => {
                                    ui.label(RichText::new("NaN").color(Color32::DARK_GRAY));
                                }
                                Cell::Text(text) => {
                                    ui.label(text);
                                }
                            }
                        }
                        ui.end_row();
                    }
                });
        });
}

pub fn analysis_panel(ui: &mut egui::Ui, result: &AnalysisResult) {
    ui.heading("AI Analysis Result");
    egui::Frame::new()
        .fill(Color32::from_rgba_premultiplied(20, 20, 20, 255))
        .corner_radius(6.0)
        .inner_margin(8.0)
        .show(ui, |ui| {
            egui::ScrollArea::vertical()
                .id_salt("analysis_scroll")
                .auto_shrink([false, true])
                .max_height(ANALYSIS_HEIGHT)
                .show(ui, |ui| match result {
                    AnalysisResult::Narrative(text) => {
                        ui.label(text);
                    }
                    AnalysisResult::Failed(message) => {
                        ui.label(RichText::new(message).color(Color32::from_rgb(230, 110, 110)));
                    }
                });
        });
}
