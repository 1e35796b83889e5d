#![warn(missing_docs)]
//! Walkable VR terrain streamed from Dutch elevation and aerial photo services.
//!
//! A 3×3 block of height-mapped tiles follows the player; two controller slots
//! drive movement (thumbstick translation along the pointing direction, grip
//! to sprint) and yaw steering.

pub mod controller;
pub mod math;
pub mod origin;
pub mod player;
pub mod terrain;
pub mod world;

use bevy::prelude::*;

/// Application-wide game state, used for system scheduling.
#[derive(States, Default, Debug, Clone, PartialEq, Eq, Hash, Reflect)]
pub enum GameState {
    /// Normal play: controller movement and terrain streaming.
    #[default]
    Running,
    /// Debug overlay active (Tab to toggle).
    Debugging,
}
