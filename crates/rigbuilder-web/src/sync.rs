//! Keeps the scene and the admin state in step with the configuration
//!
//! Visibility and highlighting are recomputed from scratch from the current
//! configuration and selection; nothing is patched incrementally. Writes made
//! by other tabs arrive as storage changes and go through the repository's
//! validation before anything is adopted.

use bevy::prelude::*;
use bevy_picking::pointer::PointerButton;
use rigbuilder_core::{MeshId, Shortcut, StagedChange};
use rigbuilder_scene::{
    MeshHighlight, MeshPicked, MeshRegistry, MeshesDiscovered, ModelLoad, ModelStatus,
    TargetVisibility,
};
use std::collections::{BTreeMap, BTreeSet};

use crate::app::{
    ActiveView, AdminState, AppSettings, Carts, Catalog, ExternalUpdates, Selection,
};
use crate::notices::Notices;
use crate::storage::PendingStorageChanges;

pub struct SyncPlugin;

impl Plugin for SyncPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<CatalogUpdated>().add_systems(
            Update,
            (
                drain_storage_changes,
                apply_external_updates,
                reconcile_catalog,
                handle_mesh_picks,
                report_model_status,
                check_discovered_meshes,
                handle_admin_shortcut,
                update_visibility_target,
                update_highlight,
            )
                .chain(),
        );
    }
}

/// The in-memory configuration was replaced
#[derive(Message, Debug, Clone, Copy)]
pub struct CatalogUpdated {
    /// Written by another tab rather than by this one
    pub external: bool,
}

/// Forward other tabs' storage writes to the repositories
fn drain_storage_changes(
    pending: Res<PendingStorageChanges>,
    mut catalog: ResMut<Catalog>,
    mut carts: ResMut<Carts>,
    settings: Res<AppSettings>,
) {
    for change in pending.take() {
        let config_key = catalog.repo.key().to_string();
        // A cleared storage reports no key and affects everything
        let key = change.key.as_deref().unwrap_or(&config_key);
        catalog
            .repo
            .notify_external_change(key, change.new_value.as_deref());

        if change
            .key
            .as_deref()
            .is_none_or(|key| key == settings.0.storage.cart_key)
        {
            carts.reload();
        }
    }
}

fn apply_external_updates(
    updates: Res<ExternalUpdates>,
    mut catalog: ResMut<Catalog>,
    mut notices: ResMut<Notices>,
    mut updated: MessageWriter<CatalogUpdated>,
) {
    match updates.take() {
        Some(Ok(config)) => {
            catalog.config = config;
            updated.write(CatalogUpdated { external: true });
            notices.info("Configuration updated in another tab");
        }
        Some(Err(e)) => {
            notices.error(format!("Ignored invalid configuration from another tab: {}", e));
        }
        None => {}
    }
}

/// Bring selection and admin state in line with a replaced configuration
fn reconcile_catalog(
    mut updates: MessageReader<CatalogUpdated>,
    catalog: Res<Catalog>,
    mut selection: ResMut<Selection>,
    mut admin: ResMut<AdminState>,
    mut notices: ResMut<Notices>,
) {
    let mut any = false;
    let mut external = false;
    for update in updates.read() {
        any = true;
        external |= update.external;
    }
    if !any {
        return;
    }

    selection.0.reconcile(&catalog.config);
    admin.editor.load(&catalog.config);

    let admin = &mut *admin;
    let Some(session) = admin.session.as_mut() else {
        return;
    };
    let part = session.part().clone();

    if catalog.config.detail(part.as_str()).is_none() {
        notices.warn(format!("Part `{}` no longer exists", part));
        admin.session = None;
        return;
    }

    // Local part edits keep staged meshes. Another tab's save, or a local
    // edit that moved this part's meshes, starts over.
    if external || session.is_stale(&catalog.config) {
        if session.is_dirty() {
            notices.warn(format!("Staged meshes for `{}` were discarded", part));
        }
        if let Err(e) = session.rebase(&catalog.config) {
            tracing::warn!("Closing assignment session: {}", e);
            admin.session = None;
        }
    }
}

/// Right click on a mesh in the admin view stages or unstages it
fn handle_mesh_picks(
    mut picks: MessageReader<MeshPicked>,
    view: Res<ActiveView>,
    catalog: Res<Catalog>,
    mut admin: ResMut<AdminState>,
    mut notices: ResMut<Notices>,
) {
    for pick in picks.read() {
        if *view != ActiveView::Admin || pick.button != PointerButton::Secondary {
            continue;
        }
        let Some(session) = admin.session.as_mut() else {
            notices.info("Select a part before assigning meshes");
            continue;
        };
        match session.toggle(&pick.mesh, &catalog.config) {
            Ok(StagedChange::Staged) => {
                tracing::debug!("Staged {} for {}", pick.mesh, session.part());
            }
            Ok(StagedChange::Unstaged) => {
                tracing::debug!("Unstaged {} for {}", pick.mesh, session.part());
            }
            Err(conflict) => notices.warn(conflict.to_string()),
        }
    }
}

fn report_model_status(model_load: Res<ModelLoad>, mut notices: ResMut<Notices>) {
    if !model_load.is_changed() {
        return;
    }
    if let ModelStatus::Failed(reason) = &model_load.status {
        notices.error(format!("3D model failed to load: {}", reason));
    }
}

/// Warn about configured meshes the model does not have
fn check_discovered_meshes(
    mut discovered: MessageReader<MeshesDiscovered>,
    catalog: Res<Catalog>,
    mut notices: ResMut<Notices>,
) {
    for MeshesDiscovered(meshes) in discovered.read() {
        let known: BTreeSet<&MeshId> = meshes.iter().collect();
        let missing: Vec<&MeshId> = catalog
            .config
            .assigned_meshes()
            .into_iter()
            .filter(|mesh| !known.contains(mesh))
            .collect();
        if !missing.is_empty() {
            tracing::warn!("Configured meshes not found in the model: {:?}", missing);
            notices.warn(format!(
                "{} configured meshes are not in the model",
                missing.len()
            ));
        }
    }
}

/// Key code for the letter or digit of a shortcut
pub fn key_code_for(key: char) -> Option<KeyCode> {
    let code = match key.to_ascii_uppercase() {
        'A' => KeyCode::KeyA,
        'B' => KeyCode::KeyB,
        'C' => KeyCode::KeyC,
        'D' => KeyCode::KeyD,
        'E' => KeyCode::KeyE,
        'F' => KeyCode::KeyF,
        'G' => KeyCode::KeyG,
        'H' => KeyCode::KeyH,
        'I' => KeyCode::KeyI,
        'J' => KeyCode::KeyJ,
        'K' => KeyCode::KeyK,
        'L' => KeyCode::KeyL,
        'M' => KeyCode::KeyM,
        'N' => KeyCode::KeyN,
        'O' => KeyCode::KeyO,
        'P' => KeyCode::KeyP,
        'Q' => KeyCode::KeyQ,
        'R' => KeyCode::KeyR,
        'S' => KeyCode::KeyS,
        'T' => KeyCode::KeyT,
        'U' => KeyCode::KeyU,
        'V' => KeyCode::KeyV,
        'W' => KeyCode::KeyW,
        'X' => KeyCode::KeyX,
        'Y' => KeyCode::KeyY,
        'Z' => KeyCode::KeyZ,
        '0' => KeyCode::Digit0,
        '1' => KeyCode::Digit1,
        '2' => KeyCode::Digit2,
        '3' => KeyCode::Digit3,
        '4' => KeyCode::Digit4,
        '5' => KeyCode::Digit5,
        '6' => KeyCode::Digit6,
        '7' => KeyCode::Digit7,
        '8' => KeyCode::Digit8,
        '9' => KeyCode::Digit9,
        _ => return None,
    };
    Some(code)
}

/// The shortcut's key went down this frame with exactly its modifiers held.
/// Cmd counts as Ctrl.
pub fn shortcut_just_pressed(shortcut: &Shortcut, keys: &ButtonInput<KeyCode>) -> bool {
    let Some(code) = key_code_for(shortcut.key) else {
        return false;
    };
    let ctrl = keys.any_pressed([
        KeyCode::ControlLeft,
        KeyCode::ControlRight,
        KeyCode::SuperLeft,
        KeyCode::SuperRight,
    ]);
    let shift = keys.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]);
    let alt = keys.any_pressed([KeyCode::AltLeft, KeyCode::AltRight]);

    keys.just_pressed(code) && ctrl == shortcut.ctrl && shift == shortcut.shift && alt == shortcut.alt
}

/// Toggle between the admin view and the configurator
fn handle_admin_shortcut(
    keys: Res<ButtonInput<KeyCode>>,
    settings: Res<AppSettings>,
    mut view: ResMut<ActiveView>,
) {
    if !shortcut_just_pressed(&settings.0.admin.shortcut, &keys) {
        return;
    }
    let next = if *view == ActiveView::Admin {
        ActiveView::Configurator
    } else {
        ActiveView::Admin
    };
    tracing::info!("Switching to {:?}", next);
    *view = next;
}

/// Recompute which meshes should be visible. The admin sees the whole model
/// so every mesh can be picked.
fn update_visibility_target(
    view: Res<ActiveView>,
    catalog: Res<Catalog>,
    selection: Res<Selection>,
    registry: Res<MeshRegistry>,
    mut target: ResMut<TargetVisibility>,
) {
    if !(view.is_changed()
        || catalog.is_changed()
        || selection.is_changed()
        || registry.is_changed())
    {
        return;
    }

    let visible = match *view {
        ActiveView::Admin => registry.mesh_ids().cloned().collect(),
        ActiveView::Configurator | ActiveView::Cart => {
            selection.0.visible_meshes(&catalog.config)
        }
    };
    if target.visible != visible {
        target.visible = visible;
    }
}

fn update_highlight(
    view: Res<ActiveView>,
    admin: Res<AdminState>,
    registry: Res<MeshRegistry>,
    mut highlight: ResMut<MeshHighlight>,
) {
    let wanted = match (*view, admin.session.as_ref()) {
        (ActiveView::Admin, Some(session)) => Some(
            registry
                .mesh_ids()
                .map(|mesh| (mesh.clone(), session.status(mesh)))
                .collect::<BTreeMap<_, _>>(),
        ),
        _ => None,
    };
    if highlight.0 != wanted {
        highlight.0 = wanted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Catalog;
    use bevy::ecs::system::RunSystemOnce;
    use rigbuilder_core::{
        AssignmentSession, ConfigData, FileStore, MeshStatus, PartKey, SelectionState,
    };
    use tempfile::TempDir;

    fn test_world(dir: &TempDir) -> World {
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        let mut notices = Notices::default();
        let catalog = Catalog::open(store.clone(), "pcConfig", &mut notices);

        let mut world = World::new();
        world.insert_resource(Selection(SelectionState::all_configurable(&catalog.config)));
        world.insert_resource(catalog);
        world.insert_resource(Carts::open(store, "pcCart"));
        world.insert_resource(notices);
        world.insert_resource(AdminState::default());
        world.insert_resource(AppSettings::default());
        world.insert_resource(ActiveView::default());
        world.insert_resource(ExternalUpdates::default());
        world.insert_resource(PendingStorageChanges::default());
        world.init_resource::<Messages<CatalogUpdated>>();
        world.init_resource::<MeshRegistry>();
        world.init_resource::<TargetVisibility>();
        world.init_resource::<MeshHighlight>();
        world
    }

    fn catalog_with_meshes() -> ConfigData {
        let mut config = ConfigData::builtin();
        let pc = PartKey::parse("pc").unwrap();
        config
            .mesh_map
            .insert(pc, ["pc_case".into(), "pc_fan".into()].into_iter().collect());
        config
    }

    #[test]
    fn test_key_codes_cover_letters_and_digits() {
        assert_eq!(key_code_for('a'), Some(KeyCode::KeyA));
        assert_eq!(key_code_for('Z'), Some(KeyCode::KeyZ));
        assert_eq!(key_code_for('7'), Some(KeyCode::Digit7));
        assert_eq!(key_code_for('-'), None);
    }

    #[test]
    fn test_shortcut_requires_exact_modifiers() {
        let shortcut = Shortcut::parse("Ctrl+Shift+A").unwrap();
        let mut keys = ButtonInput::<KeyCode>::default();

        keys.press(KeyCode::ControlLeft);
        keys.press(KeyCode::KeyA);
        assert!(!shortcut_just_pressed(&shortcut, &keys));

        keys.press(KeyCode::ShiftRight);
        assert!(shortcut_just_pressed(&shortcut, &keys));

        keys.press(KeyCode::AltLeft);
        assert!(!shortcut_just_pressed(&shortcut, &keys));
    }

    #[test]
    fn test_configurator_target_follows_selection() {
        let dir = TempDir::new().unwrap();
        let mut world = test_world(&dir);
        let config = catalog_with_meshes();
        world.resource_mut::<Catalog>().config = config.clone();
        world.resource_mut::<Selection>().0 = SelectionState::all_configurable(&config);

        world.run_system_once(update_visibility_target).unwrap();
        let visible = world.resource::<TargetVisibility>().visible.clone();
        assert!(visible.contains("pc_case"));
        assert!(visible.contains("pc_fan"));

        let pc = PartKey::parse("pc").unwrap();
        world
            .resource_mut::<Selection>()
            .0
            .toggle(&pc, &config)
            .unwrap();
        world.run_system_once(update_visibility_target).unwrap();
        assert!(world.resource::<TargetVisibility>().visible.is_empty());
    }

    #[test]
    fn test_external_update_is_adopted_and_reconciled() {
        let dir = TempDir::new().unwrap();
        let mut world = test_world(&dir);

        let changed = ConfigData::builtin()
            .add_part("rgb_strip", rigbuilder_core::PartDetail::new("RGB strip", 19.99, ""))
            .unwrap();
        let raw = serde_json::to_string(&changed).unwrap();

        // Wire the subscriber the way the app does
        let slot = world.resource::<ExternalUpdates>().0.clone();
        world
            .resource_mut::<Catalog>()
            .repo
            .on_external_change(move |change| {
                let update = match change {
                    rigbuilder_core::ExternalChange::Updated(c) => Ok(c.clone()),
                    rigbuilder_core::ExternalChange::Rejected(e) => Err(e.to_string()),
                };
                *slot.lock().unwrap() = Some(update);
            });

        world
            .resource::<PendingStorageChanges>()
            .0
            .lock()
            .unwrap()
            .push(crate::storage::StorageChange {
                key: Some("pcConfig".to_string()),
                new_value: Some(raw),
            });

        world.run_system_once(drain_storage_changes).unwrap();
        world.run_system_once(apply_external_updates).unwrap();
        world.run_system_once(reconcile_catalog).unwrap();

        assert!(world.resource::<Catalog>().config.detail("rgb_strip").is_some());
        // Newly added configurable parts start selected
        assert!(world.resource::<Selection>().0.is_selected("rgb_strip"));
        assert!(world.resource::<AdminState>().editor.text.contains("rgb_strip"));
    }

    #[test]
    fn test_invalid_external_update_keeps_config() {
        let dir = TempDir::new().unwrap();
        let mut world = test_world(&dir);
        let before = world.resource::<Catalog>().config.clone();

        let slot = world.resource::<ExternalUpdates>().0.clone();
        *slot.lock().unwrap() = Some(Err("missing field `meshMap`".to_string()));

        world.run_system_once(apply_external_updates).unwrap();

        assert_eq!(world.resource::<Catalog>().config, before);
        assert_eq!(world.resource::<Notices>().len(), 1);
    }

    #[test]
    fn test_session_closed_when_part_disappears() {
        let dir = TempDir::new().unwrap();
        let mut world = test_world(&dir);
        let config = world.resource::<Catalog>().config.clone();
        let pc = PartKey::parse("pc").unwrap();
        world.resource_mut::<AdminState>().session =
            Some(AssignmentSession::begin(pc, &config).unwrap());

        let without_pc = config.remove_part("pc").unwrap();
        world.resource_mut::<Catalog>().config = without_pc;
        world
            .resource_mut::<Messages<CatalogUpdated>>()
            .write(CatalogUpdated { external: false });

        world.run_system_once(reconcile_catalog).unwrap();
        assert!(world.resource::<AdminState>().session.is_none());
    }

    #[test]
    fn test_session_rebased_when_local_edit_moves_its_meshes() {
        let dir = TempDir::new().unwrap();
        let mut world = test_world(&dir);
        let config = catalog_with_meshes();
        world.resource_mut::<Catalog>().config = config.clone();
        let pc = PartKey::parse("pc").unwrap();
        world.resource_mut::<AdminState>().session =
            Some(AssignmentSession::begin(pc.clone(), &config).unwrap());

        // A JSON import hands pc_case to the monitor
        let mut moved = config.clone();
        let monitor = PartKey::parse("monitor").unwrap();
        moved
            .mesh_map
            .insert(pc.clone(), ["pc_fan".into()].into_iter().collect());
        moved
            .mesh_map
            .insert(monitor.clone(), ["pc_case".into()].into_iter().collect());
        world.resource_mut::<Catalog>().config = moved.clone();
        world
            .resource_mut::<Messages<CatalogUpdated>>()
            .write(CatalogUpdated { external: false });
        world.run_system_once(reconcile_catalog).unwrap();

        let case = MeshId::from("pc_case");
        let mut admin = world.resource_mut::<AdminState>();
        let session = admin.session.as_mut().unwrap();
        assert_eq!(session.status(&case), MeshStatus::Unassigned);

        // Taking the mesh back is now refused and a commit leaves it alone
        assert!(session.toggle(&case, &moved).is_err());
        let mut committed = moved.clone();
        session.commit(&mut committed).unwrap();
        assert_eq!(committed.owner_of("pc_case"), Some(&monitor));
    }

    #[test]
    fn test_highlight_only_in_admin_with_session() {
        let dir = TempDir::new().unwrap();
        let mut world = test_world(&dir);
        let config = catalog_with_meshes();
        world.resource_mut::<Catalog>().config = config.clone();

        let body = world.spawn_empty().id();
        let fan = world.spawn_empty().id();
        {
            let mut registry = world.resource_mut::<MeshRegistry>();
            registry.insert("pc_case".into(), body, vec![body]);
            registry.insert("pc_fan".into(), fan, vec![fan]);
        }

        let pc = PartKey::parse("pc").unwrap();
        world.resource_mut::<AdminState>().session =
            Some(AssignmentSession::begin(pc, &config).unwrap());

        world.run_system_once(update_highlight).unwrap();
        assert!(world.resource::<MeshHighlight>().0.is_none());

        *world.resource_mut::<ActiveView>() = ActiveView::Admin;
        world.run_system_once(update_highlight).unwrap();
        let statuses = world.resource::<MeshHighlight>().0.clone().unwrap();
        assert_eq!(statuses.get("pc_case"), Some(&MeshStatus::Assigned));
    }
}
