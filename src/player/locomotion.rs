//! Pure movement math for the player rig.

use bevy::prelude::*;

use crate::controller::GamepadSample;

/// Walk and sprint speeds in m/s.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Speeds {
    /// Speed without grip.
    pub walk: f32,
    /// Speed with grip held.
    pub sprint: f32,
}

/// World-space displacement for one frame of thumbstick input.
///
/// The stick vector `(axes[2], 0, axes[3])` is scaled by speed and `dt`,
/// rotated into the controller's frame and then into the player's.
pub fn translation_delta(
    sample: &GamepadSample,
    grip: bool,
    dt: f32,
    controller_rotation: Quat,
    player_rotation: Quat,
    speeds: Speeds,
) -> Vec3 {
    let speed = if grip { speeds.sprint } else { speeds.walk };
    let local = Vec3::new(sample.axis(2) * dt * speed, 0.0, sample.axis(3) * dt * speed);
    player_rotation * (controller_rotation * local)
}

/// Yaw change in radians about world up for one frame of steering input.
pub fn yaw_delta(sample: &GamepadSample, dt: f32) -> f32 {
    -sample.axis(2) * dt
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const SPEEDS: Speeds = Speeds {
        walk: 10.0,
        sprint: 50.0,
    };

    fn stick(x: f32, y: f32) -> GamepadSample {
        GamepadSample {
            axes: [0.0, 0.0, x, y],
            buttons: vec![],
        }
    }

    #[test]
    fn walk_one_tenth_second_moves_one_meter() {
        let d = translation_delta(&stick(1.0, 0.0), false, 0.1, Quat::IDENTITY, Quat::IDENTITY, SPEEDS);
        assert!((d - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn grip_selects_sprint_speed() {
        let d = translation_delta(&stick(0.0, -1.0), true, 0.1, Quat::IDENTITY, Quat::IDENTITY, SPEEDS);
        assert!((d - Vec3::new(0.0, 0.0, -5.0)).length() < 1e-5);
    }

    #[test]
    fn controller_then_player_rotation_applied() {
        let quarter = Quat::from_rotation_y(FRAC_PI_2);
        // Stick right; controller turned a quarter left, player another quarter.
        let d = translation_delta(&stick(1.0, 0.0), false, 0.1, quarter, quarter, SPEEDS);
        assert!((d - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5);

        let only_controller = translation_delta(&stick(1.0, 0.0), false, 0.1, quarter, Quat::IDENTITY, SPEEDS);
        assert!((only_controller - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn pitched_controller_moves_out_of_plane() {
        let pitch = Quat::from_rotation_x(FRAC_PI_2);
        let d = translation_delta(&stick(0.0, -1.0), false, 1.0, pitch, Quat::IDENTITY, SPEEDS);
        assert!((d - Vec3::new(0.0, 10.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn yaw_turns_against_stick() {
        assert_eq!(yaw_delta(&stick(1.0, 0.0), 0.5), -0.5);
        assert_eq!(yaw_delta(&stick(-0.2, 0.9), 1.0), 0.2);
    }
}
