//! Mesh visibility applied to the ECS
//!
//! Callers decide *which* meshes are visible by writing [`TargetVisibility`];
//! this module pushes that set onto the registered node entities whenever the
//! target or the registry changes.

use bevy::prelude::*;
use rigbuilder_core::{apply_visibility, MeshId, MeshVisibilitySink};
use std::collections::BTreeSet;

use crate::model::{MeshRegistry, ModelSystems};

pub struct VisibilityPlugin;

impl Plugin for VisibilityPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TargetVisibility>()
            .add_systems(Update, apply_target_visibility.after(ModelSystems));
    }
}

/// Meshes that should be visible; every other registered mesh is hidden
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetVisibility {
    pub visible: BTreeSet<MeshId>,
}

/// [`MeshVisibilitySink`] writing `Visibility` on registered node entities
pub struct EcsVisibilitySink<'a, 'w, 's> {
    registry: &'a MeshRegistry,
    visibility: &'a mut Query<'w, 's, &'static mut Visibility>,
}

impl<'a, 'w, 's> EcsVisibilitySink<'a, 'w, 's> {
    pub fn new(
        registry: &'a MeshRegistry,
        visibility: &'a mut Query<'w, 's, &'static mut Visibility>,
    ) -> Self {
        Self {
            registry,
            visibility,
        }
    }
}

impl MeshVisibilitySink for EcsVisibilitySink<'_, '_, '_> {
    fn set_mesh_visible(&mut self, mesh: &MeshId, visible: bool) {
        let next = if visible {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
        for &entity in self.registry.nodes(mesh) {
            if let Ok(mut current) = self.visibility.get_mut(entity) {
                if current.set_if_neq(next) {
                    tracing::debug!("Mesh {} -> {:?}", mesh, next);
                }
            }
        }
    }
}

pub(crate) fn apply_target_visibility(
    target: Res<TargetVisibility>,
    registry: Res<MeshRegistry>,
    mut visibility: Query<&'static mut Visibility>,
) {
    if !target.is_changed() && !registry.is_changed() {
        return;
    }
    if registry.is_empty() {
        return;
    }

    let mut sink = EcsVisibilitySink::new(&registry, &mut visibility);
    let report = apply_visibility(registry.mesh_ids(), &target.visible, &mut sink);
    tracing::debug!(
        shown = report.shown,
        hidden = report.hidden,
        "Applied mesh visibility"
    );
}
