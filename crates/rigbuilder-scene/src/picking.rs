//! Mesh picking
//!
//! Pointer clicks on registered primitives are turned into [`MeshPicked`]
//! messages carrying the mesh name, so consumers never deal with entities.

use bevy::prelude::*;
use bevy_picking::events::{Click, Pointer};
use bevy_picking::pointer::PointerButton;
use rigbuilder_core::MeshId;

use crate::model::MeshRegistry;

pub struct PickPlugin;

impl Plugin for PickPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<MeshPicked>().add_observer(on_mesh_click);
    }
}

#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct MeshPicked {
    pub mesh: MeshId,
    pub button: PointerButton,
}

fn on_mesh_click(
    mut click: On<Pointer<Click>>,
    registry: Res<MeshRegistry>,
    mut picked: MessageWriter<MeshPicked>,
) {
    let Some(mesh) = registry.mesh_for_entity(click.entity) else {
        return;
    };
    click.propagate(false);
    tracing::debug!("Picked mesh {} with {:?}", mesh, click.button);
    picked.write(MeshPicked {
        mesh: mesh.clone(),
        button: click.button,
    });
}
