//! Scene setup - camera and lights

use bevy::prelude::*;

use crate::camera::{CameraSettings, MainCamera};

/// Marker component for the main directional light
#[derive(Component)]
pub struct MainDirectionalLight;

/// Plugin for scene setup
pub struct SceneSetupPlugin;

impl Plugin for SceneSetupPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_scene);
    }
}

fn setup_scene(mut commands: Commands, camera_settings: Res<CameraSettings>) {
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            near: 0.01,
            far: 500.0,
            ..default()
        }),
        Transform::from_translation(camera_settings.eye())
            .looking_at(camera_settings.target, Vec3::Y),
        MainCamera,
    ));

    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 400.0,
        ..default()
    });

    // Key light from above and in front
    commands.spawn((
        DirectionalLight {
            illuminance: 6000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(5.0, 5.0, 5.0).looking_at(Vec3::ZERO, Vec3::Y),
        MainDirectionalLight,
    ));

    // Warm fill from the opposite side
    commands.spawn((
        PointLight {
            intensity: 200000.0,
            shadows_enabled: false,
            color: Color::srgb(1.0, 0.95, 0.9),
            ..default()
        },
        Transform::from_xyz(-3.0, 2.0, -2.0),
    ));
}
