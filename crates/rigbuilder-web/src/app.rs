//! Bevy application setup

use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_picking::{prelude::MeshPickingPlugin, DefaultPickingPlugins};
use rigbuilder_core::{
    AssignmentSession, CartRepository, CartSnapshot, ConfigData, ConfigRepository,
    ExternalChange, JsonEditor, RepositoryError, SelectionState, Settings,
};
use rigbuilder_scene::{ModelSource, RigScenePlugin};
use std::sync::{Arc, Mutex};

use crate::capture::CapturePlugin;
use crate::notices::{Notices, NoticesPlugin};
use crate::storage::{self, AppStore, StorageSyncPlugin};
use crate::sync::SyncPlugin;
use crate::ui::UiPlugin;

/// Settings compiled into the bundle
const SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Resource, Debug, Clone, Default)]
pub struct AppSettings(pub Settings);

/// The configuration document and the repository it is saved through
#[derive(Resource)]
pub struct Catalog {
    pub repo: ConfigRepository<AppStore>,
    pub config: ConfigData,
}

impl Catalog {
    /// Load the stored document. A document that fails validation is left in
    /// storage untouched and the built-in catalog is used in memory.
    pub fn open(store: AppStore, key: &str, notices: &mut Notices) -> Self {
        let repo = ConfigRepository::new(store, key);
        let config = match repo.load() {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Failed to load configuration: {}", e);
                notices.error(format!("Saved configuration could not be loaded: {}", e));
                ConfigData::builtin()
            }
        };
        Self { repo, config }
    }

    /// Save a new configuration, then adopt it. Nothing changes if the
    /// save fails.
    pub fn commit(&mut self, config: ConfigData) -> Result<(), RepositoryError> {
        self.repo.save(&config)?;
        self.config = config;
        Ok(())
    }
}

/// Cart storage plus the snapshot last read from it
#[derive(Resource)]
pub struct Carts {
    pub repo: CartRepository<AppStore>,
    pub current: Option<CartSnapshot>,
}

impl Carts {
    pub fn open(store: AppStore, key: &str) -> Self {
        let mut carts = Self {
            repo: CartRepository::new(store, key),
            current: None,
        };
        carts.reload();
        carts
    }

    /// Re-read the stored snapshot; an unreadable one counts as an empty cart
    pub fn reload(&mut self) {
        self.current = match self.repo.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Ignoring stored cart: {}", e);
                None
            }
        };
    }
}

/// Parts currently chosen in the configurator
#[derive(Resource, Debug, Clone)]
pub struct Selection(pub SelectionState);

/// Which screen is shown. There is no URL routing; the app is one page.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveView {
    #[default]
    Configurator,
    Admin,
    Cart,
}

/// Editable fields of the part details form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartForm {
    pub key: String,
    pub name: String,
    pub price: String,
    pub description: String,
    pub is_configurable: bool,
    pub icon: String,
}

/// Admin screen state
#[derive(Resource, Debug, Default)]
pub struct AdminState {
    /// Part whose details and meshes are being edited
    pub session: Option<AssignmentSession>,
    pub form: PartForm,
    pub new_part_key: String,
    pub rename_to: String,
    pub editor: JsonEditor,
    pub show_json: bool,
    pub mesh_filter: String,
}

/// External configuration changes handed over by the repository subscriber.
/// Only the newest one is kept.
#[derive(Resource, Default, Clone)]
pub struct ExternalUpdates(pub Arc<Mutex<Option<Result<ConfigData, String>>>>);

impl ExternalUpdates {
    pub fn take(&self) -> Option<Result<ConfigData, String>> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// UI layout state for responsive design
#[derive(Debug, Clone, Resource)]
pub struct UiLayout {
    pub show_panel: bool,
    pub screen_width: f32,
    pub screen_height: f32,
    pub is_mobile: bool,
    pub ui_scale: f32,
}

impl Default for UiLayout {
    fn default() -> Self {
        Self {
            show_panel: true,
            screen_width: 1920.0,
            screen_height: 1080.0,
            is_mobile: false,
            ui_scale: 1.0,
        }
    }
}

impl UiLayout {
    /// Update layout based on screen dimensions
    pub fn update_for_screen(&mut self, width: f32, height: f32) {
        self.screen_width = width;
        self.screen_height = height;

        // Consider mobile if width < 800 or if it's a portrait orientation with width < 600
        self.is_mobile = width < 800.0 || (width < height && width < 600.0);

        // Scale up UI elements on mobile for better touch targets
        self.ui_scale = if self.is_mobile { 1.3 } else { 1.0 };
    }

    /// Get the width for side panels
    pub fn panel_width(&self) -> f32 {
        if self.is_mobile {
            (self.screen_width * 0.85).min(350.0)
        } else {
            320.0
        }
    }
}

/// Run the Bevy application
pub fn run() {
    let settings = Settings::from_toml_or_default(SETTINGS_TOML);

    let store = match storage::open_store() {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Storage unavailable, not starting: {}", e);
            return;
        }
    };

    let mut notices = Notices::default();
    let mut catalog = Catalog::open(store.clone(), &settings.storage.config_key, &mut notices);
    let carts = Carts::open(store, &settings.storage.cart_key);
    let selection = Selection(SelectionState::all_configurable(&catalog.config));
    let admin = AdminState {
        editor: JsonEditor::new(&catalog.config),
        ..default()
    };

    // Other tabs' writes arrive through the repository's subscribers
    let external = ExternalUpdates::default();
    let slot = external.0.clone();
    catalog.repo.on_external_change(move |change| {
        let update = match change {
            ExternalChange::Updated(config) => Ok(config.clone()),
            ExternalChange::Rejected(e) => Err(e.to_string()),
        };
        if let Ok(mut pending) = slot.lock() {
            *pending = Some(update);
        }
    });

    App::new()
        .insert_resource(ClearColor(Color::srgb(0.08, 0.08, 0.11)))
        .add_plugins(DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Rigbuilder - PC Configurator".to_string(),
                    canvas: Some("#rigbuilder-canvas".to_string()),
                    fit_canvas_to_parent: true,
                    prevent_default_event_handling: false,
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                // The model is served next to the page
                file_path: "".to_string(),
                // Static hosting has no .meta files
                meta_check: bevy::asset::AssetMetaCheck::Never,
                ..default()
            })
        )
        // Picking must be added BEFORE EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(MeshPickingPlugin)
        .add_plugins(EguiPlugin::default())
        .insert_resource(ModelSource {
            path: settings.model.path.clone(),
        })
        .insert_resource(AppSettings(settings))
        .insert_resource(notices)
        .insert_resource(catalog)
        .insert_resource(carts)
        .insert_resource(selection)
        .insert_resource(admin)
        .insert_resource(external)
        .init_resource::<ActiveView>()
        .init_resource::<UiLayout>()
        .add_plugins(RigScenePlugin)
        .add_plugins(NoticesPlugin)
        .add_plugins(StorageSyncPlugin)
        .add_plugins(SyncPlugin)
        .add_plugins(CapturePlugin)
        .add_plugins(UiPlugin)
        .run();
}
