//! Camera controls and orbit navigation

use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll, MouseScrollUnit};
use bevy::camera::primitives::MeshAabb;
use bevy::prelude::*;

use crate::model::{MeshRegistry, ModelSystems};

/// Camera controller settings
#[derive(Debug, Clone, Resource)]
pub struct CameraSettings {
    pub distance: f32,
    pub target_distance: f32,
    pub azimuth: f32,
    pub elevation: f32,
    pub target: Vec3,
    pub target_focus: Vec3,
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub smooth_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            distance: 3.0,
            target_distance: 3.0,
            azimuth: 0.6,
            elevation: 0.35,
            target: Vec3::new(0.0, 0.5, 0.0),
            target_focus: Vec3::new(0.0, 0.5, 0.0),
            sensitivity: 0.005,
            zoom_speed: 0.1,
            smooth_factor: 0.15,
            min_distance: 0.5,
            max_distance: 20.0,
        }
    }
}

impl CameraSettings {
    /// Camera position for the current orbit (Y up)
    pub fn eye(&self) -> Vec3 {
        let horizontal = self.distance * self.elevation.cos();
        self.target
            + Vec3::new(
                horizontal * self.azimuth.sin(),
                self.distance * self.elevation.sin(),
                horizontal * self.azimuth.cos(),
            )
    }

    /// Aim at the centre of a world-space box, far enough back to see all of it
    pub fn frame_bounds(&mut self, min: Vec3, max: Vec3) {
        let radius = (max - min).length() * 0.5;
        self.target_focus = (min + max) * 0.5;
        self.max_distance = self.max_distance.max(radius * 6.0);
        self.target_distance = (radius * 2.5).clamp(self.min_distance, self.max_distance);
    }
}

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Plugin for camera controls
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraSettings>().add_systems(
            Update,
            (
                frame_model.after(ModelSystems).before(update_camera),
                update_camera,
            ),
        );
    }
}

/// Point the camera at the model once its meshes are registered.
/// Runs until every primitive's mesh data is available, then never again.
fn frame_model(
    mut framed: Local<bool>,
    registry: Res<MeshRegistry>,
    primitives: Query<(&Mesh3d, &GlobalTransform)>,
    meshes: Res<Assets<Mesh>>,
    mut settings: ResMut<CameraSettings>,
) {
    if *framed || registry.is_empty() {
        return;
    }

    let mut bounds: Option<(Vec3, Vec3)> = None;
    for (_, entities) in registry.primitives() {
        for &entity in entities {
            let Ok((mesh3d, transform)) = primitives.get(entity) else {
                continue;
            };
            let Some(mesh) = meshes.get(&mesh3d.0) else {
                return;
            };
            let Some(aabb) = mesh.compute_aabb() else {
                continue;
            };
            let (lo, hi) = (Vec3::from(aabb.min()), Vec3::from(aabb.max()));
            for corner in box_corners(lo, hi) {
                let point = transform.transform_point(corner);
                bounds = Some(match bounds {
                    Some((min, max)) => (min.min(point), max.max(point)),
                    None => (point, point),
                });
            }
        }
    }

    *framed = true;
    if let Some((min, max)) = bounds {
        settings.frame_bounds(min, max);
        tracing::info!("Framed model bounds {:?}..{:?}", min, max);
    }
}

fn box_corners(min: Vec3, max: Vec3) -> [Vec3; 8] {
    [
        Vec3::new(min.x, min.y, min.z),
        Vec3::new(max.x, min.y, min.z),
        Vec3::new(min.x, max.y, min.z),
        Vec3::new(max.x, max.y, min.z),
        Vec3::new(min.x, min.y, max.z),
        Vec3::new(max.x, min.y, max.z),
        Vec3::new(min.x, max.y, max.z),
        Vec3::new(max.x, max.y, max.z),
    ]
}

/// Orbit with left drag, pan with middle drag, zoom with the wheel or a pinch.
/// Right button is left free for mesh picking.
fn update_camera(
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
    mut settings: ResMut<CameraSettings>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    mouse_scroll: Res<AccumulatedMouseScroll>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    time: Res<Time>,
    mut contexts: bevy_egui::EguiContexts,
) {
    // Don't steer the camera while the pointer is over a panel
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input() || ctx.is_pointer_over_area())
        .unwrap_or(false);

    let motion = mouse_motion.delta;

    if mouse_button.pressed(MouseButton::Left) && !egui_wants_pointer {
        settings.azimuth -= motion.x * settings.sensitivity;
        settings.elevation =
            (settings.elevation + motion.y * settings.sensitivity).clamp(-1.4, 1.4);
    }

    if mouse_button.pressed(MouseButton::Middle) && !egui_wants_pointer {
        let right = Vec3::new(settings.azimuth.cos(), 0.0, -settings.azimuth.sin());
        let pan_speed = settings.distance * 0.002;
        settings.target_focus -= right * motion.x * pan_speed;
        settings.target_focus += Vec3::Y * motion.y * pan_speed;
    }

    if !egui_wants_pointer && mouse_scroll.delta.y != 0.0 {
        let lines = match mouse_scroll.unit {
            MouseScrollUnit::Line => mouse_scroll.delta.y,
            MouseScrollUnit::Pixel => mouse_scroll.delta.y / 100.0,
        };
        let zoom_factor = 1.0 - lines * settings.zoom_speed;
        settings.target_distance = (settings.target_distance * zoom_factor)
            .clamp(settings.min_distance, settings.max_distance);
    }

    // Touch support for mobile
    if touch_input.iter().count() == 1 && !egui_wants_pointer {
        for touch in touch_input.iter() {
            let delta = touch.delta();
            if delta != Vec2::ZERO {
                settings.azimuth -= delta.x * settings.sensitivity;
                settings.elevation =
                    (settings.elevation + delta.y * settings.sensitivity).clamp(-1.4, 1.4);
            }
        }
    }

    // Pinch to zoom
    if touch_input.iter().count() == 2 {
        let touches: Vec<_> = touch_input.iter().collect();
        if let (Some(t1), Some(t2)) = (touches.first(), touches.get(1)) {
            let curr_dist = t1.position().distance(t2.position());
            let prev_dist = (t1.position() - t1.delta()).distance(t2.position() - t2.delta());
            let zoom_factor = prev_dist / curr_dist.max(1.0);
            settings.target_distance = (settings.target_distance * zoom_factor)
                .clamp(settings.min_distance, settings.max_distance);
        }
    }

    // Smooth interpolation for zoom and target
    let dt = time.delta_secs();
    let lerp_factor = 1.0 - (-settings.smooth_factor * 60.0 * dt).exp();
    settings.distance += (settings.target_distance - settings.distance) * lerp_factor;
    let target = settings.target;
    settings.target = target + (settings.target_focus - target) * lerp_factor;

    if let Ok(mut transform) = camera_query.single_mut() {
        transform.translation = settings.eye();
        transform.look_at(settings.target, Vec3::Y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eye_orbits_target() {
        let mut settings = CameraSettings {
            azimuth: 0.0,
            elevation: 0.0,
            distance: 2.0,
            target: Vec3::ZERO,
            ..default()
        };
        assert!(settings.eye().abs_diff_eq(Vec3::new(0.0, 0.0, 2.0), 1e-5));

        settings.elevation = std::f32::consts::FRAC_PI_2;
        assert!(settings.eye().abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), 1e-5));

        settings.elevation = 0.0;
        settings.azimuth = std::f32::consts::FRAC_PI_2;
        settings.target = Vec3::ONE;
        assert!(settings.eye().abs_diff_eq(Vec3::new(3.0, 1.0, 1.0), 1e-5));
    }

    #[test]
    fn test_frame_bounds_centres_and_backs_off() {
        let mut settings = CameraSettings::default();
        settings.frame_bounds(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(3.0, 2.0, 1.0));
        assert!(settings.target_focus.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-5));
        assert!(settings.target_distance > 2.0);

        // Large models raise the zoom limit instead of being clipped by it
        settings.frame_bounds(Vec3::splat(-50.0), Vec3::splat(50.0));
        assert!(settings.max_distance >= settings.target_distance);
        assert!(settings.target_distance > 100.0);
    }

    #[test]
    fn test_camera_framed_on_registered_meshes() {
        use bevy::ecs::system::RunSystemOnce;
        use rigbuilder_core::MeshId;

        let mut world = World::new();
        world.init_resource::<CameraSettings>();
        world.init_resource::<Assets<Mesh>>();
        let handle = world
            .resource_mut::<Assets<Mesh>>()
            .add(Mesh::from(Cuboid::new(2.0, 2.0, 2.0)));
        let primitive = world
            .spawn((
                Mesh3d(handle),
                GlobalTransform::from_translation(Vec3::new(5.0, 1.0, 0.0)),
            ))
            .id();
        let mut registry = MeshRegistry::default();
        registry.insert(MeshId::from("Case"), primitive, vec![primitive]);
        world.insert_resource(registry);

        world.run_system_once(frame_model).unwrap();
        let settings = world.resource::<CameraSettings>();
        assert!(settings.target_focus.abs_diff_eq(Vec3::new(5.0, 1.0, 0.0), 1e-4));
    }
}
