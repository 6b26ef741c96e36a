//! Admin view: part catalog, mesh assignment, raw JSON
//!
//! Every successful edit is saved through the repository before it is
//! adopted, so a failed save leaves both storage and the screen unchanged.

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};
use rigbuilder_core::{
    AssignmentSession, ConfigData, MeshId, MeshStatus, PartDetail, PartIcon, PartKey,
};
use rigbuilder_scene::MeshRegistry;

use super::format_price;
use crate::app::{ActiveView, AdminState, Catalog, PartForm, UiLayout};
use crate::notices::Notices;
use crate::sync::CatalogUpdated;

impl PartForm {
    pub fn from_detail(key: &PartKey, detail: &PartDetail) -> Self {
        Self {
            key: key.to_string(),
            name: detail.name.clone(),
            price: format!("{:.2}", detail.price),
            description: detail.description.clone(),
            is_configurable: detail.is_configurable,
            icon: detail.icon.clone().unwrap_or_default(),
        }
    }

    /// Parse the form. Range checks are left to the catalog edit.
    pub fn to_detail(&self) -> Result<PartDetail, String> {
        let price: f64 = self
            .price
            .trim()
            .parse()
            .map_err(|_| format!("Price {:?} is not a number", self.price.trim()))?;
        let icon = self.icon.trim();
        Ok(PartDetail {
            name: self.name.trim().to_string(),
            price,
            description: self.description.trim().to_string(),
            is_configurable: self.is_configurable,
            icon: (!icon.is_empty()).then(|| icon.to_string()),
        })
    }
}

/// What the admin asked for this frame, applied after the panels are drawn
enum AdminAction {
    SelectPart(PartKey),
    AddPart(String),
    SaveDetails,
    RenamePart(String),
    RemovePart(PartKey),
    ToggleMesh(MeshId),
    CommitMeshes,
    DiscardMeshes,
    ApplyJson,
    ReloadJson,
    Exit,
}

pub(super) fn admin_ui(
    mut contexts: EguiContexts,
    mut view: ResMut<ActiveView>,
    mut catalog: ResMut<Catalog>,
    mut admin: ResMut<AdminState>,
    registry: Res<MeshRegistry>,
    ui_layout: Res<UiLayout>,
    mut notices: ResMut<Notices>,
    mut updated: MessageWriter<CatalogUpdated>,
) {
    if *view != ActiveView::Admin {
        return;
    }
    let Ok(ctx) = contexts.ctx_mut() else { return };

    let mut actions: Vec<AdminAction> = Vec::new();
    let config = &catalog.config;
    let admin_state = &mut *admin;

    if !ui_layout.is_mobile || ui_layout.show_panel {
        egui::SidePanel::left("parts_panel")
            .default_width(ui_layout.panel_width())
            .resizable(!ui_layout.is_mobile)
            .show(ctx, |ui| {
                parts_panel(ui, config, admin_state, &mut actions);
            });

        egui::SidePanel::right("assignment_panel")
            .default_width(ui_layout.panel_width())
            .resizable(!ui_layout.is_mobile)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    details_panel(ui, config, admin_state, &mut actions);
                    ui.separator();
                    assignment_panel(ui, config, admin_state, &registry, &mut actions);
                });
            });
    }

    if admin_state.show_json {
        egui::Window::new("Configuration JSON")
            .default_size([520.0, 480.0])
            .open(&mut admin_state.show_json)
            .show(ctx, |ui| {
                json_panel(ui, &mut admin_state.editor, &mut actions);
            });
    }

    for action in actions {
        apply_action(
            action,
            &mut view,
            &mut catalog,
            &mut admin,
            &mut notices,
            &mut updated,
        );
    }
}

fn parts_panel(
    ui: &mut egui::Ui,
    config: &ConfigData,
    admin: &mut AdminState,
    actions: &mut Vec<AdminAction>,
) {
    ui.horizontal(|ui| {
        ui.heading("Parts");
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("Exit admin").clicked() {
                actions.push(AdminAction::Exit);
            }
        });
    });
    ui.separator();

    let current = admin.session.as_ref().map(|s| s.part().clone());
    egui::ScrollArea::vertical()
        .max_height(ui.available_height() - 120.0)
        .show(ui, |ui| {
            for (key, detail) in &config.part_details {
                let mesh_count = config.meshes_of(key.as_str()).count();
                let mut text = format!(
                    "{} {}  ·  {}  ·  {} meshes",
                    detail.resolved_icon().glyph(),
                    detail.name,
                    format_price(detail.cents()),
                    mesh_count
                );
                if !detail.is_configurable {
                    text.push_str("  (fixed)");
                }
                let selected = current.as_ref() == Some(key);
                if ui.selectable_label(selected, text).clicked() && !selected {
                    actions.push(AdminAction::SelectPart(key.clone()));
                }
            }
        });

    ui.separator();
    ui.label("New part key");
    ui.horizontal(|ui| {
        ui.text_edit_singleline(&mut admin.new_part_key);
        if ui.button("➕ Add").clicked() {
            actions.push(AdminAction::AddPart(admin.new_part_key.clone()));
        }
    });
    if ui.button("{ } Edit JSON").clicked() {
        admin.show_json = true;
    }
}

fn details_panel(
    ui: &mut egui::Ui,
    config: &ConfigData,
    admin: &mut AdminState,
    actions: &mut Vec<AdminAction>,
) {
    ui.heading("Part details");
    let Some(part) = admin.session.as_ref().map(|s| s.part().clone()) else {
        ui.weak("Select a part on the left to edit it.");
        return;
    };

    let form = &mut admin.form;
    egui::Grid::new("part_details")
        .num_columns(2)
        .spacing([8.0, 6.0])
        .show(ui, |ui| {
            ui.label("Key");
            ui.monospace(part.as_str());
            ui.end_row();

            ui.label("Name");
            ui.text_edit_singleline(&mut form.name);
            ui.end_row();

            ui.label("Price");
            ui.text_edit_singleline(&mut form.price);
            ui.end_row();

            ui.label("Description");
            ui.text_edit_multiline(&mut form.description);
            ui.end_row();

            ui.label("Configurable");
            ui.checkbox(&mut form.is_configurable, "");
            ui.end_row();

            ui.label("Icon");
            let shown = PartIcon::from_key(&form.icon);
            egui::ComboBox::from_id_salt("part_icon")
                .selected_text(format!("{} {}", shown.glyph(), shown.key()))
                .show_ui(ui, |ui| {
                    for icon in PartIcon::ALL {
                        let label = format!("{} {}", icon.glyph(), icon.key());
                        if ui.selectable_label(shown == icon, label).clicked() {
                            form.icon = icon.key().to_string();
                        }
                    }
                });
            ui.end_row();
        });

    let changed = config
        .detail(part.as_str())
        .is_none_or(|detail| PartForm::from_detail(&part, detail) != *form);
    if ui
        .add_enabled(changed, egui::Button::new("💾 Save details"))
        .clicked()
    {
        actions.push(AdminAction::SaveDetails);
    }

    ui.add_space(6.0);
    ui.horizontal(|ui| {
        ui.text_edit_singleline(&mut admin.rename_to);
        if ui.button("Rename").clicked() {
            actions.push(AdminAction::RenamePart(admin.rename_to.clone()));
        }
    });
    if ui
        .button(egui::RichText::new("🗑 Remove part").color(egui::Color32::from_rgb(240, 90, 90)))
        .clicked()
    {
        actions.push(AdminAction::RemovePart(part));
    }
}

fn status_color(status: MeshStatus) -> egui::Color32 {
    match status {
        MeshStatus::Assigned => egui::Color32::from_rgb(0x00, 0x66, 0xff),
        MeshStatus::Pending => egui::Color32::from_rgb(0xff, 0x66, 0x00),
        MeshStatus::Unassigned => egui::Color32::from_rgb(0x99, 0x99, 0x99),
    }
}

fn assignment_panel(
    ui: &mut egui::Ui,
    config: &ConfigData,
    admin: &mut AdminState,
    registry: &MeshRegistry,
    actions: &mut Vec<AdminAction>,
) {
    ui.heading("Meshes");
    let Some(session) = admin.session.as_ref() else {
        return;
    };
    if registry.is_empty() {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label("Waiting for the model...");
        });
        return;
    }

    ui.weak("Right click a mesh in the view to stage it.");
    ui.horizontal(|ui| {
        ui.label("Filter");
        ui.text_edit_singleline(&mut admin.mesh_filter);
    });

    let filter = admin.mesh_filter.trim().to_lowercase();
    let available = session.available_meshes(registry.mesh_ids(), config);
    egui::ScrollArea::vertical()
        .id_salt("mesh_list")
        .max_height(320.0)
        .show(ui, |ui| {
            for mesh in available
                .iter()
                .filter(|mesh| filter.is_empty() || mesh.as_str().to_lowercase().contains(&filter))
            {
                let status = session.status(mesh);
                let mut staged = session.pending().contains(mesh);
                ui.horizontal(|ui| {
                    if ui.checkbox(&mut staged, mesh.as_str()).changed() {
                        actions.push(AdminAction::ToggleMesh(mesh.clone()));
                    }
                    ui.colored_label(status_color(status), "●");
                    if !registry.contains(mesh.as_str()) {
                        ui.weak("(not in model)");
                    }
                });
            }
        });

    ui.separator();
    ui.horizontal(|ui| {
        let dirty = session.is_dirty();
        if ui
            .add_enabled(dirty, egui::Button::new("💾 Save meshes"))
            .clicked()
        {
            actions.push(AdminAction::CommitMeshes);
        }
        if ui
            .add_enabled(dirty, egui::Button::new("Discard"))
            .clicked()
        {
            actions.push(AdminAction::DiscardMeshes);
        }
        ui.label(format!("{} staged", session.pending().len()));
    });
}

fn json_panel(
    ui: &mut egui::Ui,
    editor: &mut rigbuilder_core::JsonEditor,
    actions: &mut Vec<AdminAction>,
) {
    ui.horizontal(|ui| {
        if ui.button("✔ Apply").clicked() {
            actions.push(AdminAction::ApplyJson);
        }
        if ui.button("⟲ Reload").clicked() {
            actions.push(AdminAction::ReloadJson);
        }
    });
    if let Some(error) = editor.error() {
        ui.colored_label(egui::Color32::from_rgb(240, 70, 70), error);
    }
    egui::ScrollArea::vertical().show(ui, |ui| {
        ui.add(
            egui::TextEdit::multiline(&mut editor.text)
                .code_editor()
                .desired_width(f32::INFINITY)
                .desired_rows(24),
        );
    });
}

/// Save an edited configuration and announce it
fn commit_config(
    catalog: &mut Catalog,
    config: ConfigData,
    notices: &mut Notices,
    updated: &mut MessageWriter<CatalogUpdated>,
) -> bool {
    match catalog.commit(config) {
        Ok(()) => {
            updated.write(CatalogUpdated { external: false });
            true
        }
        Err(e) => {
            tracing::error!("Failed to save configuration: {}", e);
            notices.error(format!("Save failed: {}", e));
            false
        }
    }
}

/// Start editing a part: open an assignment session and fill the form
fn select_part(admin: &mut AdminState, config: &ConfigData, key: PartKey) -> Result<(), String> {
    let detail = config
        .detail(key.as_str())
        .ok_or_else(|| format!("Unknown part `{}`", key))?;
    admin.form = PartForm::from_detail(&key, detail);
    admin.rename_to = key.to_string();
    admin.session = Some(AssignmentSession::begin(key, config).map_err(|e| e.to_string())?);
    Ok(())
}

fn apply_action(
    action: AdminAction,
    view: &mut ActiveView,
    catalog: &mut Catalog,
    admin: &mut AdminState,
    notices: &mut Notices,
    updated: &mut MessageWriter<CatalogUpdated>,
) {
    match action {
        AdminAction::Exit => *view = ActiveView::Configurator,
        AdminAction::SelectPart(key) => {
            if admin.session.as_ref().is_some_and(|s| s.is_dirty()) {
                notices.warn("Staged meshes were discarded");
            }
            if let Err(e) = select_part(admin, &catalog.config, key) {
                notices.error(e);
            }
        }
        AdminAction::AddPart(raw) => {
            let key = match PartKey::parse(&raw) {
                Ok(key) => key,
                Err(e) => return notices.error(e.to_string()),
            };
            let detail = PartDetail::new(key.as_str(), 0.0, "");
            match catalog.config.add_part(key.as_str(), detail) {
                Ok(config) => {
                    if commit_config(catalog, config, notices, updated) {
                        admin.new_part_key.clear();
                        if let Err(e) = select_part(admin, &catalog.config, key.clone()) {
                            notices.error(e);
                        }
                        notices.info(format!("Added part `{}`", key));
                    }
                }
                Err(e) => notices.error(e.to_string()),
            }
        }
        AdminAction::SaveDetails => {
            let Some(part) = admin.session.as_ref().map(|s| s.part().clone()) else {
                return;
            };
            let detail = match admin.form.to_detail() {
                Ok(detail) => detail,
                Err(e) => return notices.error(e),
            };
            match catalog.config.update_part(part.as_str(), detail) {
                Ok(config) => {
                    if commit_config(catalog, config, notices, updated) {
                        notices.info(format!("Saved `{}`", part));
                    }
                }
                Err(e) => notices.error(e.to_string()),
            }
        }
        AdminAction::RenamePart(new) => {
            let Some(old) = admin.session.as_ref().map(|s| s.part().clone()) else {
                return;
            };
            match catalog.config.rename_part(old.as_str(), &new) {
                Ok(config) => {
                    if commit_config(catalog, config, notices, updated) {
                        // The session follows the part under its new key
                        match PartKey::parse(&new) {
                            Ok(key) => {
                                if let Err(e) = select_part(admin, &catalog.config, key) {
                                    notices.error(e);
                                }
                            }
                            Err(e) => notices.error(e.to_string()),
                        }
                    }
                }
                Err(e) => notices.error(e.to_string()),
            }
        }
        AdminAction::RemovePart(key) => match catalog.config.remove_part(key.as_str()) {
            Ok(config) => {
                if commit_config(catalog, config, notices, updated) {
                    admin.session = None;
                    admin.form = PartForm::default();
                    notices.info(format!("Removed part `{}`", key));
                }
            }
            Err(e) => notices.error(e.to_string()),
        },
        AdminAction::ToggleMesh(mesh) => {
            if let Some(session) = admin.session.as_mut() {
                if let Err(conflict) = session.toggle(&mesh, &catalog.config) {
                    notices.warn(conflict.to_string());
                }
            }
        }
        AdminAction::CommitMeshes => {
            let Some(session) = admin.session.as_ref() else {
                return;
            };
            // Work on copies so a failed save leaves the session staged
            let mut staged = session.clone();
            let mut config = catalog.config.clone();
            if let Err(e) = staged.commit(&mut config) {
                return notices.error(e.to_string());
            }
            if commit_config(catalog, config, notices, updated) {
                notices.info(format!(
                    "Saved {} meshes for `{}`",
                    staged.pending().len(),
                    staged.part()
                ));
                admin.session = Some(staged);
            }
        }
        AdminAction::DiscardMeshes => {
            if let Some(session) = admin.session.as_mut() {
                session.discard();
            }
        }
        AdminAction::ApplyJson => match admin.editor.apply() {
            Ok(config) => {
                if commit_config(catalog, config, notices, updated) {
                    notices.info("Configuration replaced");
                }
            }
            Err(e) => notices.error(format!("Invalid configuration: {}", e)),
        },
        AdminAction::ReloadJson => admin.editor.load(&catalog.config),
    }
}
