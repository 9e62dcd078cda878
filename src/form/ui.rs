use bevy::prelude::*;
use bevy_egui::{
    EguiContexts,
    egui::{self, Color32, RichText},
};

use super::jobs::JobKind;
use super::session::{FormSession, JobRequest, Stage};
use super::worker::JobWorker;
use super::FormState;
use crate::present::{analysis_panel, table_preview};
use crate::settings::Settings;

const PANEL_FILL: Color32 = Color32::from_rgba_premultiplied(30, 30, 30, 255);
const NOTICE_COLOR: Color32 = Color32::from_rgb(240, 190, 90);

fn panel_frame() -> egui::Frame {
    egui::Frame::new()
        .fill(PANEL_FILL)
        .corner_radius(10.0)
        .inner_margin(10.0)
        .shadow(egui::epaint::Shadow {
            color: Color32::from_black_alpha(60),
            offset: [5, 5],
            blur: 10,
            spread: 5,
        })
}

pub fn form_ui(
    mut contexts: EguiContexts,
    mut form: ResMut<FormState>,
    worker: Res<JobWorker>,
    settings: Res<Settings>,
) {
    let ctx = contexts.ctx_mut();
    let screen_rect = ctx.screen_rect();
    let controls_width = 320.0;
    let controls_height = screen_rect.height() - 20.0;

    let FormState {
        session,
        preview_rows,
    } = &mut *form;
    let mut queued: Vec<JobRequest> = Vec::new();

    egui::Area::new("form_controls".into())
        .fixed_pos(egui::pos2(10.0, 10.0))
        .show(ctx, |ui| {
            panel_frame().show(ui, |ui| {
                ui.set_width(controls_width);
                ui.set_height(controls_height);
                ui.spacing_mut().item_spacing = egui::vec2(8.0, 10.0);

                ui.heading("Energy Cost Advisor");
                if !settings.is_ready() {
                    ui.label(RichText::new("Waiting for API credentials.").color(Color32::GRAY));
                    return;
                }

                egui::ScrollArea::vertical().show(ui, |ui| {
                    route_controls(ui, session, &mut queued);
                    if session.route.is_some() {
                        ui.separator();
                        filter_controls(ui, session, &mut queued);
                        ui.separator();
                        action_controls(ui, session, &mut queued);
                    }
                    if let Some(notice) = &session.notice {
                        ui.label(RichText::new(notice).color(NOTICE_COLOR));
                    }
                });
            });
        });

    if session.table.is_some() || session.analysis.is_some() {
        let results_width = (screen_rect.width() - controls_width - 60.0).max(240.0);
        egui::Area::new("form_results".into())
            .fixed_pos(egui::pos2(controls_width + 40.0, 10.0))
            .show(ctx, |ui| {
                panel_frame().show(ui, |ui| {
                    ui.set_width(results_width);
                    if let Some(table) = &session.table {
                        ui.heading("Data Preview");
                        table_preview(ui, table, *preview_rows);
                    }
                    if let Some(result) = &session.analysis {
                        ui.add_space(10.0);
                        analysis_panel(ui, result);
                    }
                });
            });
    }

    for request in queued {
        worker.queue(request);
    }
}

fn route_controls(ui: &mut egui::Ui, session: &mut FormSession, queued: &mut Vec<JobRequest>) {
    if session.routes.is_empty() {
        if session.is_busy(JobKind::Routes) {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(RichText::new("Loading data routes...").color(Color32::GRAY));
            });
        } else if ui.button("Reload routes").clicked() {
            queued.push(session.load_routes());
        }
        return;
    }

    let current = session
        .route
        .as_ref()
        .map(|r| r.name.clone())
        .unwrap_or_else(|| "Select a data route".to_string());
    let mut chosen = None;
    ui.label("Data route");
    egui::ComboBox::from_id_salt("route_selector")
        .selected_text(RichText::new(current))
        .width(ui.available_width())
        .show_ui(ui, |ui| {
            for route in &session.routes {
                let selected = session.route.as_ref().is_some_and(|r| r.id == route.id);
                if ui
                    .selectable_label(selected, &route.name)
                    .on_hover_text(&route.description)
                    .clicked()
                {
                    chosen = Some(route.id.clone());
                }
            }
        });
    if let Some(route_id) = chosen {
        queued.push(session.choose_route(&route_id));
    }

    if session.is_busy(JobKind::Configure) {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label(RichText::new("Reading route details...").color(Color32::GRAY));
        });
    } else if let Some(route) = &session.route {
        if !route.description.is_empty() {
            ui.label(RichText::new(&route.description).small().color(Color32::LIGHT_GRAY));
        }
    }
}

fn filter_controls(ui: &mut egui::Ui, session: &mut FormSession, queued: &mut Vec<JobRequest>) {
    // Frequency
    let frequencies = session.frequencies().to_vec();
    let current = frequencies
        .iter()
        .find(|f| session.frequency.as_deref() == Some(f.id.as_str()))
        .map(|f| f.label())
        .unwrap_or_default();
    let mut chosen = None;
    ui.label("Frequency");
    ui.add_enabled_ui(session.frequency_enabled(), |ui| {
        egui::ComboBox::from_id_salt("frequency_selector")
            .selected_text(current)
            .show_ui(ui, |ui| {
                for frequency in &frequencies {
                    let selected = session.frequency.as_deref() == Some(frequency.id.as_str());
                    if ui.selectable_label(selected, frequency.label()).clicked() {
                        chosen = Some(frequency.id.clone());
                    }
                }
            });
    });
    if let Some(frequency) = chosen {
        queued.extend(session.change_frequency(&frequency));
    }

    // Facets
    let controls = session.facets.clone();
    for control in &controls {
        let mut chosen = None;
        ui.label(&control.facet.description);
        egui::ComboBox::from_id_salt(format!("facet_{}", control.facet.id))
            .selected_text(control.selected_label())
            .width(ui.available_width())
            .show_ui(ui, |ui| {
                egui::ScrollArea::vertical().max_height(240.0).show(ui, |ui| {
                    for option in &control.options {
                        if ui
                            .selectable_label(option.value == control.selected, &option.label)
                            .clicked()
                        {
                            chosen = Some(option.value.clone());
                        }
                    }
                });
            });
        if let Some(value) = chosen {
            queued.extend(session.change_facet(&control.facet.id, &value));
        }
    }
    for facet_id in &session.skipped_facets {
        ui.label(
            RichText::new(format!("No options listed for `{facet_id}`; not filtering on it."))
                .small()
                .color(Color32::GRAY),
        );
    }

    // Data fields
    ui.label("Data fields");
    for toggle in session.fields.iter_mut() {
        let label = match &toggle.field.units {
            Some(units) => format!("{} ({units})", toggle.field.label),
            None => toggle.field.label.clone(),
        };
        ui.checkbox(&mut toggle.selected, label);
    }

    // Date range
    if session.is_busy(JobKind::Periods) {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label(RichText::new("Finding available dates...").color(Color32::GRAY));
        });
    } else if !session.periods.is_empty() {
        ui.horizontal(|ui| {
            period_selector(ui, "Start Date", &session.periods, &mut session.start);
            period_selector(ui, "End Date", &session.periods, &mut session.end);
        });
    }
}

fn period_selector(
    ui: &mut egui::Ui,
    label: &str,
    periods: &[crate::types::Period],
    value: &mut Option<crate::types::Period>,
) {
    ui.vertical(|ui| {
        ui.label(label);
        let current = value.as_ref().map(|p| p.to_string()).unwrap_or_default();
        egui::ComboBox::from_id_salt(label)
            .selected_text(current)
            .show_ui(ui, |ui| {
                egui::ScrollArea::vertical().max_height(240.0).show(ui, |ui| {
                    for period in periods.iter().rev() {
                        ui.selectable_value(value, Some(period.clone()), period.as_str());
                    }
                });
            });
    });
}

fn action_controls(ui: &mut egui::Ui, session: &mut FormSession, queued: &mut Vec<JobRequest>) {
    let fetching = session.is_busy(JobKind::Fetch);
    let analyzing = session.is_busy(JobKind::Analyze);

    ui.horizontal(|ui| {
        if ui
            .add_enabled(!fetching && !analyzing, egui::Button::new("Fetch Data"))
            .clicked()
        {
            // A rejected selection leaves its message in the notice.
            if let Ok(request) = session.request_fetch() {
                queued.push(request);
            }
        }

        let can_analyze = matches!(session.stage, Stage::DataLoaded | Stage::AnalysisComplete);
        if ui
            .add_enabled(can_analyze && !analyzing, egui::Button::new("Run Analysis"))
            .clicked()
        {
            if let Ok(request) = session.request_analysis() {
                queued.push(request);
            }
        }

        if analyzing && ui.button("Cancel").clicked() {
            session.cancel_analysis();
        }
    });

    if fetching || analyzing {
        ui.horizontal(|ui| {
            ui.spinner();
            let what = if analyzing {
                "Analyzing (a loading model can take a minute)..."
            } else {
                "Fetching data..."
            };
            ui.label(RichText::new(what).color(Color32::GRAY));
        });
    }
}
