//! The player rig: a root transform carrying the camera and both controllers.
//!
//! Movement follows the first controller's thumbstick in the direction that
//! controller points; the second controller's thumbstick steers yaw.

mod entities;
pub mod locomotion;
mod systems;

pub use entities::{Player, PlayerCamera};

use bevy::math::DVec3;
use bevy::prelude::*;

use crate::GameState;
use crate::controller::ControllerSet;
use crate::origin::{self, WorldOrigin};

/// Ordering of player systems within a frame.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlayerSet {
    /// Applies controller input to the player transform.
    Movement,
    /// Moves the [`WorldOrigin`] under a rig that wandered too far from zero.
    Rebase,
}

/// Player rig configuration.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct PlayerConfig {
    /// Spawn position in projected coordinates (easting, height, northing).
    pub spawn: DVec3,
    /// Camera height above the rig origin.
    pub eye_height: f32,
    /// Translation speed in m/s.
    pub walk_speed: f32,
    /// Translation speed in m/s while grip is held.
    pub sprint_speed: f32,
    /// Controller rest positions relative to the rig, slot 0 then slot 1.
    pub hand_offsets: [Vec3; 2],
    /// Horizontal distance from world zero at which the origin is moved to
    /// the rig.
    pub rebase_distance: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            spawn: DVec3::new(107_627.0, 0.0, 479_962.0),
            eye_height: 1.8,
            walk_speed: 10.0,
            sprint_speed: 50.0,
            hand_offsets: [Vec3::new(0.25, 1.2, -0.3), Vec3::new(-0.25, 1.2, -0.3)],
            rebase_distance: 1_000.0,
        }
    }
}

/// Spawns the player rig and moves it from controller input.
///
/// Also owns the [`WorldOrigin`], which starts at the spawn point.
pub struct PlayerPlugin(pub PlayerConfig);

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<Player>()
            .register_type::<PlayerCamera>()
            .register_type::<PlayerConfig>()
            .register_type::<WorldOrigin>()
            .register_type::<origin::GeoAnchor>()
            .insert_resource(self.0.clone())
            .insert_resource(WorldOrigin::new(self.0.spawn.x, self.0.spawn.z))
            .configure_sets(
                Update,
                (PlayerSet::Movement, PlayerSet::Rebase)
                    .chain()
                    .after(ControllerSet::Input),
            )
            .add_systems(Startup, systems::spawn_player)
            .add_systems(
                Update,
                systems::move_player
                    .in_set(PlayerSet::Movement)
                    .run_if(in_state(GameState::Running)),
            )
            .add_systems(
                Update,
                (systems::rebase_origin, origin::place_anchored)
                    .chain()
                    .in_set(PlayerSet::Rebase),
            );
    }
}
