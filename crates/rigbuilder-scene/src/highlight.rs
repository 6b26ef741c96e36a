//! Assignment highlighting for the admin view
//!
//! While [`MeshHighlight`] holds a status map, each registered primitive is
//! drawn with a flat palette material for its status. Clearing the map puts
//! the model's own materials back.

use bevy::prelude::*;
use rigbuilder_core::{MeshId, MeshStatus};
use std::collections::{BTreeMap, HashMap};

use crate::model::{MeshRegistry, ModelSystems};

pub struct HighlightPlugin;

impl Plugin for HighlightPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MeshHighlight>()
            .init_resource::<HighlightPalette>()
            .add_systems(Update, update_mesh_highlight.after(ModelSystems));
    }
}

/// Per-mesh assignment status to display, or `None` for normal rendering
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct MeshHighlight(pub Option<BTreeMap<MeshId, MeshStatus>>);

/// Shared materials for highlighted meshes
#[derive(Resource, Debug, Clone)]
pub struct HighlightPalette {
    pub assigned: Handle<StandardMaterial>,
    pub pending: Handle<StandardMaterial>,
    pub unassigned: Handle<StandardMaterial>,
}

impl HighlightPalette {
    pub fn for_status(&self, status: MeshStatus) -> &Handle<StandardMaterial> {
        match status {
            MeshStatus::Assigned => &self.assigned,
            MeshStatus::Pending => &self.pending,
            MeshStatus::Unassigned => &self.unassigned,
        }
    }
}

fn flat_material(color: Color) -> StandardMaterial {
    StandardMaterial {
        base_color: color,
        alpha_mode: AlphaMode::Blend,
        perceptual_roughness: 0.8,
        ..default()
    }
}

impl FromWorld for HighlightPalette {
    fn from_world(world: &mut World) -> Self {
        let mut materials = world.resource_mut::<Assets<StandardMaterial>>();
        Self {
            // Blue: saved for the part being edited
            assigned: materials.add(flat_material(Color::srgba_u8(0x00, 0x66, 0xff, 204))),
            // Orange: staged
            pending: materials.add(flat_material(Color::srgba_u8(0xff, 0x66, 0x00, 204))),
            // Grey: free
            unassigned: materials.add(flat_material(Color::srgba_u8(0x99, 0x99, 0x99, 153))),
        }
    }
}

/// Swap primitive materials to match the highlight state.
///
/// The original handle is remembered the first time a primitive is swapped
/// and restored when highlighting ends.
fn update_mesh_highlight(
    mut commands: Commands,
    highlight: Res<MeshHighlight>,
    registry: Res<MeshRegistry>,
    palette: Res<HighlightPalette>,
    material_query: Query<&MeshMaterial3d<StandardMaterial>>,
    mut originals: Local<HashMap<Entity, Handle<StandardMaterial>>>,
) {
    if !highlight.is_changed() && !registry.is_changed() {
        return;
    }

    match &highlight.0 {
        Some(statuses) => {
            for (mesh, primitives) in registry.primitives() {
                let status = statuses
                    .get(mesh)
                    .copied()
                    .unwrap_or(MeshStatus::Unassigned);
                let wanted = palette.for_status(status);

                for &entity in primitives {
                    let Ok(current) = material_query.get(entity) else {
                        continue;
                    };
                    originals
                        .entry(entity)
                        .or_insert_with(|| current.0.clone());
                    if current.0 != *wanted {
                        commands.entity(entity).insert(MeshMaterial3d(wanted.clone()));
                    }
                }
            }
        }
        None => {
            let restored = originals.len();
            for (entity, original) in originals.drain() {
                commands.entity(entity).try_insert(MeshMaterial3d(original));
            }
            if restored > 0 {
                tracing::debug!("Restored materials on {} primitives", restored);
            }
        }
    }
}
