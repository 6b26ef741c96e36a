//! UI overlays using bevy_egui

mod admin;
mod cart;
mod configurator;

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};

use crate::app::{ActiveView, Carts, UiLayout};

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<cart::CheckoutState>()
            .add_systems(Update, (update_ui_layout, cart::finish_checkout))
            // Panels must be laid out top bar first, then side panels, then the central panel
            .add_systems(
                EguiPrimaryContextPass,
                (
                    top_bar_ui,
                    configurator::configurator_ui,
                    admin::admin_ui,
                    cart::cart_ui,
                )
                    .chain(),
            );
    }
}

/// Update UI layout based on window size
fn update_ui_layout(windows: Query<&Window>, mut ui_layout: ResMut<UiLayout>) {
    if let Ok(window) = windows.single() {
        let width = window.width();
        let height = window.height();

        // Only update if dimensions changed significantly
        if (ui_layout.screen_width - width).abs() > 1.0
            || (ui_layout.screen_height - height).abs() > 1.0
        {
            ui_layout.update_for_screen(width, height);
        }
    }
}

fn top_bar_ui(
    mut contexts: EguiContexts,
    mut view: ResMut<ActiveView>,
    carts: Res<Carts>,
    mut ui_layout: ResMut<UiLayout>,
) {
    let ui_scale = ui_layout.ui_scale;
    let Ok(ctx) = contexts.ctx_mut() else { return };

    // Set up style for mobile - larger text and touch targets
    if ui_layout.is_mobile {
        let mut style = (*ctx.style()).clone();
        style.spacing.button_padding = egui::vec2(12.0, 8.0);
        style.spacing.item_spacing = egui::vec2(8.0, 6.0);
        ctx.set_style(style);
    }

    egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.heading(egui::RichText::new("🖥 Rigbuilder").size(18.0 * ui_scale));
            ui.separator();

            if ui
                .selectable_label(*view == ActiveView::Configurator, "Builder")
                .clicked()
            {
                *view = ActiveView::Configurator;
            }
            let cart_label = match &carts.current {
                Some(snapshot) => format!("🛒 Cart ({})", snapshot.components.len()),
                None => "🛒 Cart".to_string(),
            };
            if ui
                .selectable_label(*view == ActiveView::Cart, cart_label)
                .clicked()
            {
                *view = ActiveView::Cart;
            }
            if *view == ActiveView::Admin {
                ui.colored_label(egui::Color32::from_rgb(255, 170, 40), "Admin");
            }

            // Mobile: the side panel can be folded away to see the model
            if ui_layout.is_mobile && *view != ActiveView::Cart {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let text = if ui_layout.show_panel { "☰ ✕" } else { "☰" };
                    if ui.button(egui::RichText::new(text).size(16.0 * ui_scale)).clicked() {
                        ui_layout.show_panel = !ui_layout.show_panel;
                    }
                });
            }
        });
    });
}

/// Price with two decimals and a currency sign
pub(crate) fn format_price(price: impl std::fmt::Display) -> String {
    format!("${}", price)
}
