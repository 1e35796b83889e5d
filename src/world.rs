//! Scene lighting and a spinning marker cube near the spawn point.

use bevy::prelude::*;

use crate::origin::{GeoAnchor, WorldOrigin};
use crate::player::PlayerConfig;

/// Sky/ground fill light pair, a key light, and the marker cube.
pub struct WorldPlugin;

impl Plugin for WorldPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<Marker>()
            .add_systems(Startup, (setup_lights, spawn_marker))
            .add_systems(Update, spin_marker);
    }
}

/// Scale reference floating in front of the spawn point.
#[derive(Component, Reflect)]
pub struct Marker;

/// Radians per frame on X and Y.
const MARKER_SPIN: f32 = 0.01;

/// Hemisphere-style fill (sky from above, ground bounce from below) plus a
/// white key light shining from `(1, 1, 1)`.
pub fn setup_lights(mut commands: Commands) {
    commands.insert_resource(ClearColor(Color::srgb(0.62, 0.78, 0.93)));

    commands.spawn((
        Name::new("SkyLight"),
        DirectionalLight {
            color: Color::srgb(1.0, 1.0, 0.93),
            illuminance: 2_500.0,
            ..default()
        },
        Transform::from_xyz(0.0, 1.0, 0.0).looking_at(Vec3::ZERO, Vec3::Z),
    ));
    commands.spawn((
        Name::new("GroundLight"),
        DirectionalLight {
            color: Color::srgb(0.5, 0.5, 0.5),
            illuminance: 800.0,
            ..default()
        },
        Transform::from_xyz(0.0, -1.0, 0.0).looking_at(Vec3::ZERO, Vec3::Z),
    ));
    commands.spawn((
        Name::new("KeyLight"),
        DirectionalLight {
            color: Color::WHITE,
            illuminance: 6_000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(1.0, 1.0, 1.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

/// Spawns a 20 cm cube 2 m in front of the spawn point at eye height.
pub fn spawn_marker(
    mut commands: Commands,
    cfg: Res<PlayerConfig>,
    origin: Res<WorldOrigin>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let anchor = GeoAnchor::new(
        cfg.spawn.x,
        cfg.spawn.y as f32 + cfg.eye_height,
        cfg.spawn.z - 2.0,
    );
    commands.spawn((
        Name::new("Marker"),
        Marker,
        Mesh3d(meshes.add(Cuboid::from_length(0.2))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.27, 0.53, 0.67),
            ..default()
        })),
        Transform::from_translation(origin.to_local(&anchor)),
        anchor,
    ));
}

/// Spins every marker by a fixed step each frame.
pub fn spin_marker(mut markers: Query<&mut Transform, With<Marker>>) {
    for mut tf in &mut markers {
        tf.rotate_local_x(MARKER_SPIN);
        tf.rotate_local_y(MARKER_SPIN);
    }
}
