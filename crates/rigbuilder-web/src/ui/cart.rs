//! Cart view: the stored snapshot, order summary, and checkout

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use super::format_price;
use crate::app::{ActiveView, Carts, UiLayout};
use crate::capture::CartPreview;
use crate::notices::Notices;

/// Seconds the confirmation stays up before returning to the builder
const CHECKOUT_RETURN_DELAY: f64 = 2.0;

/// Set while the post-checkout confirmation is showing
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct CheckoutState {
    pub return_at: Option<f64>,
}

pub(super) fn finish_checkout(
    mut checkout: ResMut<CheckoutState>,
    mut view: ResMut<ActiveView>,
    time: Res<Time>,
) {
    let Some(return_at) = checkout.return_at else {
        return;
    };
    if time.elapsed_secs_f64() >= return_at {
        checkout.return_at = None;
        if *view == ActiveView::Cart {
            *view = ActiveView::Configurator;
        }
    }
}

pub(super) fn cart_ui(
    mut contexts: EguiContexts,
    mut view: ResMut<ActiveView>,
    mut carts: ResMut<Carts>,
    preview: Res<CartPreview>,
    mut checkout: ResMut<CheckoutState>,
    time: Res<Time>,
    ui_layout: Res<UiLayout>,
    mut notices: ResMut<Notices>,
) {
    if *view != ActiveView::Cart {
        return;
    }

    // Texture ids have to be resolved before borrowing the context
    let preview_texture = preview.image.as_ref().map(|handle| {
        contexts.image_id(handle).unwrap_or_else(|| {
            contexts.add_image(bevy_egui::EguiTextureHandle::Strong(handle.clone()))
        })
    });

    let ui_scale = ui_layout.ui_scale;
    let Ok(ctx) = contexts.ctx_mut() else { return };

    let mut go_back = false;
    let mut do_checkout = false;

    egui::CentralPanel::default().show(ctx, |ui| {
        let Some(snapshot) = &carts.current else {
            ui.vertical_centered(|ui| {
                ui.add_space(60.0);
                if checkout.return_at.is_some() {
                    ui.heading("✔ Thank you for your order!");
                    ui.label("Returning to the builder...");
                    return;
                }
                ui.heading(egui::RichText::new("🛒").size(40.0 * ui_scale));
                ui.heading("Your cart is empty");
                ui.label("Add some components to get started!");
                ui.add_space(12.0);
                if ui.button("⬅ Continue Shopping").clicked() {
                    go_back = true;
                }
            });
            return;
        };

        ui.horizontal(|ui| {
            if ui.button("⬅ Back to Builder").clicked() {
                go_back = true;
            }
            ui.heading("Your Cart");
        });
        ui.separator();

        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.heading("Your Custom PC Build");
            ui.weak(format!(
                "Saved {}",
                snapshot.created_at.format("%Y-%m-%d %H:%M UTC")
            ));

            match preview_texture {
                Some(texture) => {
                    let size = preview.size.as_vec2();
                    let scale = (ui.available_width() / size.x.max(1.0)).min(1.0);
                    ui.image(egui::load::SizedTexture::new(
                        texture,
                        egui::vec2(size.x * scale, size.y * scale),
                    ));
                }
                None => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Loading preview...");
                    });
                }
            }
            ui.add_space(8.0);

            for item in &snapshot.components {
                ui.horizontal(|ui| {
                    ui.vertical(|ui| {
                        ui.strong(&item.name);
                        if !item.description.is_empty() {
                            ui.weak(&item.description);
                        }
                    });
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(format_price(rigbuilder_core::Cents::from_price(item.price)));
                    });
                });
                ui.separator();
            }

            ui.add_space(8.0);
            ui.heading("Order Summary");
            egui::Grid::new("order_summary")
                .num_columns(2)
                .spacing([40.0, 4.0])
                .show(ui, |ui| {
                    ui.label("Subtotal");
                    ui.label(format_price(snapshot.total()));
                    ui.end_row();
                    ui.label("Shipping");
                    ui.label("Free");
                    ui.end_row();
                    ui.strong("Total");
                    ui.strong(format_price(snapshot.total()));
                    ui.end_row();
                });

            ui.add_space(12.0);
            let button = egui::Button::new(egui::RichText::new("💳 Checkout").size(16.0 * ui_scale))
                .min_size(egui::vec2(200.0, 32.0 * ui_scale));
            if ui.add(button).clicked() {
                do_checkout = true;
            }
        });
    });

    if do_checkout {
        match carts.repo.clear() {
            Ok(()) => {
                tracing::info!("Checked out");
                carts.current = None;
                checkout.return_at = Some(time.elapsed_secs_f64() + CHECKOUT_RETURN_DELAY);
                notices.info("Order placed");
            }
            Err(e) => notices.error(format!("Checkout failed: {}", e)),
        }
    }
    if go_back {
        *view = ActiveView::Configurator;
    }
}
