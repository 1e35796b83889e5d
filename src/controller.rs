//! Motion controller slots.
//!
//! Two [`Controller`] records live for the whole session. Gamepads connecting
//! and disconnecting only bind or unbind a device and its visuals; every frame
//! the bound device is sampled into XR-style axes and buttons and turned into
//! edge-triggered button state.

mod entities;
mod systems;

pub use entities::{
    BUTTON_TABLE, ButtonName, ButtonStates, Controller, ControllerInput, ControllerLink,
    ControllerLinkChanged, ControllerVisual, GamepadSample,
};

use bevy::prelude::*;

/// Ordering of controller systems within a frame.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ControllerSet {
    /// Connect/disconnect handling.
    Link,
    /// Device sampling and button edge detection.
    Input,
}

/// Controller visuals and device mapping.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct ControllerConfig {
    /// Length of the pointer ray along the controller's local -Z.
    pub pointer_length: f32,
    /// Grip block dimensions.
    pub grip_size: Vec3,
    /// Grip block color.
    pub grip_color: Color,
    /// Pointer ray color.
    pub pointer_color: Color,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            pointer_length: 1.0,
            grip_size: Vec3::new(0.04, 0.04, 0.12),
            grip_color: Color::srgb(0.2, 0.2, 0.22),
            pointer_color: Color::WHITE,
        }
    }
}

/// Binds gamepads to controller slots and keeps their input state current.
pub struct ControllerPlugin(pub ControllerConfig);

impl Plugin for ControllerPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<ControllerConfig>()
            .register_type::<Controller>()
            .insert_resource(self.0.clone())
            .add_message::<ControllerLinkChanged>()
            .configure_sets(Update, (ControllerSet::Link, ControllerSet::Input).chain())
            .add_systems(
                Update,
                (systems::bridge_gamepad_connections, systems::apply_link_changes)
                    .chain()
                    .in_set(ControllerSet::Link),
            )
            .add_systems(
                Update,
                (systems::sample_gamepads, systems::update_controller_input)
                    .chain()
                    .in_set(ControllerSet::Input),
            );
    }
}
