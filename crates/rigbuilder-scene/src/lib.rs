//! Rigbuilder Scene - Bevy adapter for the product model
//!
//! Loads the glTF model, names its meshes, and applies what the core logic
//! decides: which meshes are visible and, in the admin view, how each mesh is
//! highlighted. Pointer clicks come back out as mesh names.

pub mod camera;
pub mod highlight;
pub mod model;
pub mod picking;
pub mod scene;
pub mod visibility;

use bevy::prelude::*;

/// Plugin that sets up the 3D scene and its mesh plumbing
pub struct RigScenePlugin;

impl Plugin for RigScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(camera::CameraPlugin)
            .add_plugins(scene::SceneSetupPlugin)
            .add_plugins(model::ModelPlugin)
            .add_plugins(visibility::VisibilityPlugin)
            .add_plugins(highlight::HighlightPlugin)
            .add_plugins(picking::PickPlugin);
    }
}

// Re-export commonly used types
pub use camera::{CameraSettings, MainCamera};
pub use highlight::MeshHighlight;
pub use model::{MeshRegistry, MeshesDiscovered, ModelLoad, ModelSource, ModelStatus};
pub use picking::MeshPicked;
pub use visibility::TargetVisibility;
