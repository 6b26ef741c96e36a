//! Part toggle panel of the configurator

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};
use rigbuilder_core::{Cents, PartKey};
use rigbuilder_scene::{ModelLoad, ModelStatus};

use super::format_price;
use crate::app::{ActiveView, AppSettings, Catalog, Selection, UiLayout};
use crate::capture::CaptureState;
use crate::notices::Notices;

pub(super) fn configurator_ui(
    mut contexts: EguiContexts,
    view: Res<ActiveView>,
    catalog: Res<Catalog>,
    mut selection: ResMut<Selection>,
    mut capture: ResMut<CaptureState>,
    settings: Res<AppSettings>,
    time: Res<Time>,
    model_load: Res<ModelLoad>,
    ui_layout: Res<UiLayout>,
    mut notices: ResMut<Notices>,
) {
    if *view != ActiveView::Configurator || (ui_layout.is_mobile && !ui_layout.show_panel) {
        return;
    }
    let ui_scale = ui_layout.ui_scale;
    let Ok(ctx) = contexts.ctx_mut() else { return };

    let mut toggled: Option<PartKey> = None;
    let mut add_to_cart = false;

    egui::SidePanel::right("components_panel")
        .default_width(ui_layout.panel_width())
        .resizable(!ui_layout.is_mobile)
        .show(ctx, |ui| {
            ui.heading("Components");

            match &model_load.status {
                ModelStatus::Loading => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Loading 3D model...");
                    });
                }
                ModelStatus::Failed(reason) => {
                    ui.colored_label(egui::Color32::RED, format!("Model failed: {}", reason));
                }
                ModelStatus::Ready => {}
            }
            ui.separator();

            egui::ScrollArea::vertical()
                .max_height(ui.available_height() - 90.0 * ui_scale)
                .show(ui, |ui| {
                    for (key, detail) in catalog.config.configurable_parts() {
                        let selected = selection.0.is_selected(key.as_str());
                        let frame = egui::Frame::group(ui.style()).fill(if selected {
                            ui.visuals().selection.bg_fill.linear_multiply(0.25)
                        } else {
                            ui.visuals().faint_bg_color
                        });
                        let response = frame
                            .show(ui, |ui| {
                                ui.set_width(ui.available_width());
                                ui.horizontal(|ui| {
                                    ui.label(
                                        egui::RichText::new(detail.resolved_icon().glyph())
                                            .size(22.0 * ui_scale),
                                    );
                                    ui.vertical(|ui| {
                                        ui.strong(&detail.name);
                                        ui.label(format_price(detail.cents()));
                                    });
                                    ui.with_layout(
                                        egui::Layout::right_to_left(egui::Align::Center),
                                        |ui| {
                                            if selected {
                                                ui.colored_label(egui::Color32::GREEN, "✔");
                                            }
                                        },
                                    );
                                });
                            })
                            .response
                            .interact(egui::Sense::click());
                        let response = if detail.description.is_empty() {
                            response
                        } else {
                            response.on_hover_text(&detail.description)
                        };
                        if response.clicked() {
                            toggled = Some(key.clone());
                        }
                    }
                });

            ui.separator();
            let total: Cents = selection.0.total(&catalog.config);
            ui.horizontal(|ui| {
                ui.strong("Total");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.strong(
                        egui::RichText::new(format_price(total)).size(18.0 * ui_scale),
                    );
                });
            });

            let label = if capture.is_busy() {
                "Capturing..."
            } else {
                "🛒 Add to cart"
            };
            let button = egui::Button::new(egui::RichText::new(label).size(16.0 * ui_scale))
                .min_size(egui::vec2(ui.available_width(), 32.0 * ui_scale));
            if ui.add_enabled(!capture.is_busy(), button).clicked() {
                add_to_cart = true;
            }
        });

    if let Some(key) = toggled {
        if let Err(e) = selection.0.toggle(&key, &catalog.config) {
            notices.warn(e.to_string());
        }
    }

    if add_to_cart {
        if selection.0.selected().is_empty() {
            notices.warn("Select at least one component first");
        } else {
            capture.schedule(time.elapsed_secs_f64(), settings.0.capture.settle_delay_ms);
        }
    }
}
