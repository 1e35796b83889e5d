use bevy::prelude::*;

/// Marker component for the player rig root.
#[derive(Component, Reflect)]
pub struct Player;

/// Marker for the camera parented to the rig.
#[derive(Component, Reflect)]
pub struct PlayerCamera;
