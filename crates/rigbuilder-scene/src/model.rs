//! glTF model loading and mesh discovery
//!
//! The product model is a single glTF asset. Once its scene is spawned, every
//! named node that carries mesh primitives is recorded in [`MeshRegistry`]
//! under its node name, which is the name `meshMap` refers to.

use bevy::asset::LoadState;
use bevy::gltf::Gltf;
use bevy::prelude::*;
use rigbuilder_core::MeshId;
use std::collections::{BTreeMap, HashMap};

pub struct ModelPlugin;

impl Plugin for ModelPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ModelSource>()
            .init_resource::<ModelLoad>()
            .init_resource::<MeshRegistry>()
            .add_message::<MeshesDiscovered>()
            .add_systems(Startup, start_model_load)
            .add_systems(
                Update,
                (poll_model_load, ApplyDeferred, register_meshes)
                    .chain()
                    .in_set(ModelSystems),
            );
    }
}

/// Model loading and mesh registration
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelSystems;

/// Asset path of the product model
#[derive(Resource, Debug, Clone)]
pub struct ModelSource {
    pub path: String,
}

impl Default for ModelSource {
    fn default() -> Self {
        Self {
            path: "models/PC.glb".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ModelStatus {
    #[default]
    Loading,
    Ready,
    Failed(String),
}

/// Load progress of the product model
#[derive(Resource, Debug, Default)]
pub struct ModelLoad {
    handle: Option<Handle<Gltf>>,
    root: Option<Entity>,
    pub status: ModelStatus,
}

impl ModelLoad {
    pub fn root(&self) -> Option<Entity> {
        self.root
    }
}

/// Marker for the spawned scene root of the product model
#[derive(Component)]
pub struct ModelRoot;

/// Sent once, when the model's meshes have been registered
#[derive(Message, Debug, Clone)]
pub struct MeshesDiscovered(pub Vec<MeshId>);

/// Mesh names of the loaded model and the entities behind them.
///
/// A name can map to several nodes when the asset reuses a node name; all of
/// them are toggled together.
#[derive(Resource, Debug, Default)]
pub struct MeshRegistry {
    nodes: BTreeMap<MeshId, Vec<Entity>>,
    primitives: BTreeMap<MeshId, Vec<Entity>>,
    owners: HashMap<Entity, MeshId>,
}

impl MeshRegistry {
    /// Record a named node and the primitive entities drawn for it
    pub fn insert(&mut self, mesh: MeshId, node: Entity, primitives: Vec<Entity>) {
        for &primitive in &primitives {
            self.owners.insert(primitive, mesh.clone());
        }
        self.nodes.entry(mesh.clone()).or_default().push(node);
        self.primitives.entry(mesh).or_default().extend(primitives);
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, mesh: &str) -> bool {
        self.nodes.contains_key(mesh)
    }

    /// Every registered mesh name, sorted
    pub fn mesh_ids(&self) -> impl Iterator<Item = &MeshId> {
        self.nodes.keys()
    }

    /// Node entities whose visibility stands for this mesh
    pub fn nodes(&self, mesh: &MeshId) -> &[Entity] {
        self.nodes.get(mesh).map(Vec::as_slice).unwrap_or_default()
    }

    /// Entities with the actual `Mesh3d` + material for this mesh
    pub fn primitives(&self) -> impl Iterator<Item = (&MeshId, &[Entity])> {
        self.primitives.iter().map(|(mesh, e)| (mesh, e.as_slice()))
    }

    /// Mesh name of a pickable primitive entity
    pub fn mesh_for_entity(&self, entity: Entity) -> Option<&MeshId> {
        self.owners.get(&entity)
    }
}

fn start_model_load(
    mut load: ResMut<ModelLoad>,
    source: Res<ModelSource>,
    asset_server: Res<AssetServer>,
) {
    tracing::info!("Loading model: {}", source.path);
    load.handle = Some(asset_server.load(source.path.clone()));
    load.status = ModelStatus::Loading;
}

/// Spawn the model scene once the glTF asset is available
fn poll_model_load(
    mut commands: Commands,
    mut load: ResMut<ModelLoad>,
    asset_server: Res<AssetServer>,
    gltf_assets: Res<Assets<Gltf>>,
) {
    if load.status != ModelStatus::Loading {
        return;
    }
    let Some(handle) = load.handle.clone() else {
        return;
    };

    match asset_server.get_load_state(handle.id()) {
        Some(LoadState::Loaded) => {
            let Some(gltf) = gltf_assets.get(&handle) else {
                return;
            };
            let scene = gltf
                .default_scene
                .clone()
                .or_else(|| gltf.scenes.first().cloned());
            match scene {
                Some(scene) => {
                    let root = commands.spawn((SceneRoot(scene), ModelRoot)).id();
                    load.root = Some(root);
                    load.status = ModelStatus::Ready;
                    tracing::info!("Model ready");
                }
                None => {
                    tracing::error!("Model has no scenes");
                    load.status = ModelStatus::Failed("Model has no scenes".to_string());
                }
            }
        }
        Some(LoadState::Failed(err)) => {
            tracing::error!("Failed to load model: {}", err);
            load.status = ModelStatus::Failed(err.to_string());
        }
        _ => {
            // Still loading
        }
    }
}

/// Walk the spawned scene and register mesh nodes by name.
///
/// A glTF node spawns as a named entity whose children carry the primitives
/// (`Mesh3d` + material). Primitives are named too, so they are only
/// registered on their own when their parent has no name.
fn register_meshes(
    load: Res<ModelLoad>,
    mut registry: ResMut<MeshRegistry>,
    children_query: Query<&Children>,
    parent_query: Query<&ChildOf>,
    name_query: Query<&Name>,
    mesh_query: Query<(), With<Mesh3d>>,
    mut discovered: MessageWriter<MeshesDiscovered>,
) {
    if !registry.is_empty() {
        return;
    }
    let Some(root) = load.root() else {
        return;
    };

    let mut found = MeshRegistry::default();
    for entity in children_query.iter_descendants(root) {
        let Ok(name) = name_query.get(entity) else {
            continue;
        };

        let primitives: Vec<Entity> = if mesh_query.contains(entity) {
            let parent_named = parent_query
                .get(entity)
                .is_ok_and(|child_of| name_query.contains(child_of.parent()));
            if parent_named {
                continue;
            }
            vec![entity]
        } else {
            children_query
                .get(entity)
                .map(|children| {
                    children
                        .iter()
                        .filter(|child| mesh_query.contains(*child))
                        .collect()
                })
                .unwrap_or_default()
        };

        if !primitives.is_empty() {
            found.insert(MeshId::new(name.as_str()), entity, primitives);
        }
    }

    // Scene not instantiated yet
    if found.is_empty() {
        return;
    }

    let ids: Vec<MeshId> = found.mesh_ids().cloned().collect();
    tracing::info!("Registered {} meshes from model", ids.len());
    *registry = found;
    discovered.write(MeshesDiscovered(ids));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let mut world = World::new();
        let node = world.spawn_empty().id();
        let prim_a = world.spawn_empty().id();
        let prim_b = world.spawn_empty().id();
        let other = world.spawn_empty().id();

        let mut registry = MeshRegistry::default();
        assert!(registry.is_empty());
        registry.insert(MeshId::from("Monitor_Screen"), node, vec![prim_a, prim_b]);

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("Monitor_Screen"));
        assert!(!registry.contains("monitor_screen"));
        assert_eq!(registry.nodes(&MeshId::from("Monitor_Screen")), &[node]);
        assert_eq!(
            registry.mesh_for_entity(prim_b),
            Some(&MeshId::from("Monitor_Screen"))
        );
        assert_eq!(registry.mesh_for_entity(other), None);
        assert!(registry.nodes(&MeshId::from("missing")).is_empty());
    }

    #[test]
    fn test_duplicate_names_share_an_entry() {
        let mut world = World::new();
        let first = world.spawn_empty().id();
        let second = world.spawn_empty().id();

        let mut registry = MeshRegistry::default();
        registry.insert(MeshId::from("Fan"), first, vec![first]);
        registry.insert(MeshId::from("Fan"), second, vec![second]);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.nodes(&MeshId::from("Fan")), &[first, second]);
    }
}
