use bevy::prelude::*;

use super::PlayerConfig;
use super::entities::{Player, PlayerCamera};
use super::locomotion::{self, Speeds};
use crate::controller::{ButtonName, Controller};
use crate::origin::WorldOrigin;

/// Spawns the rig at world zero (the spawn point's horizontal position is the
/// initial [`WorldOrigin`]) with the camera at eye height and both controller
/// slots as children.
pub fn spawn_player(mut commands: Commands, cfg: Res<PlayerConfig>) {
    commands
        .spawn((
            Name::new("Player"),
            Player,
            Transform::from_xyz(0.0, cfg.spawn.y as f32, 0.0),
            Visibility::default(),
        ))
        .with_children(|rig| {
            rig.spawn((
                Name::new("PlayerCamera"),
                PlayerCamera,
                Camera3d::default(),
                Projection::Perspective(PerspectiveProjection {
                    near: 0.01,
                    far: 2000.0,
                    ..default()
                }),
                Transform::from_xyz(0.0, cfg.eye_height, 0.0),
            ));
            for (slot, offset) in cfg.hand_offsets.iter().enumerate() {
                rig.spawn((
                    Name::new(format!("Controller{slot}")),
                    Controller::new(slot),
                    Transform::from_translation(*offset),
                    Visibility::default(),
                ));
            }
        });
}

/// Slot 0 translates the rig along where it points, slot 1 steers yaw.
/// A slot without a gamepad sample contributes nothing.
///
/// The translation uses the rig's orientation from before this frame's yaw,
/// whatever order the query yields the controllers in.
pub fn move_player(
    time: Res<Time>,
    cfg: Res<PlayerConfig>,
    mut players: Query<&mut Transform, With<Player>>,
    controllers: Query<(&Controller, &Transform), Without<Player>>,
) {
    let Ok(mut player) = players.single_mut() else {
        return;
    };
    let dt = time.delta_secs();
    let speeds = Speeds {
        walk: cfg.walk_speed,
        sprint: cfg.sprint_speed,
    };

    let sampled = |slot: usize| {
        controllers
            .iter()
            .find(|(c, _)| c.slot() == slot)
            .and_then(|(c, pose)| c.gamepad.as_ref().map(|sample| (c, sample, pose)))
    };

    if let Some((controller, sample, pose)) = sampled(0) {
        let delta = locomotion::translation_delta(
            sample,
            controller.input.pressed[ButtonName::Grip],
            dt,
            pose.rotation,
            player.rotation,
            speeds,
        );
        player.translation += delta;
    }
    if let Some((_, sample, _)) = sampled(1) {
        player.rotate_y(locomotion::yaw_delta(sample, dt));
    }
}

/// Moves the [`WorldOrigin`] under the rig once it is `rebase_distance` from
/// world zero, keeping the rig's projected position exact.
pub fn rebase_origin(
    cfg: Res<PlayerConfig>,
    mut origin: ResMut<WorldOrigin>,
    mut players: Query<&mut Transform, With<Player>>,
) {
    let Ok(mut player) = players.single_mut() else {
        return;
    };
    let offset = Vec2::new(player.translation.x, player.translation.z);
    if offset.length() < cfg.rebase_distance {
        return;
    }
    origin.shift(offset);
    player.translation.x = 0.0;
    player.translation.z = 0.0;
    debug!("world origin moved to ({:.2}, {:.2})", origin.0.x, origin.0.y);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use std::f32::consts::FRAC_PI_2;

    use bevy::time::TimeUpdateStrategy;

    use super::*;
    use crate::controller::{ControllerVisual, GamepadSample};

    fn app() -> App {
        app_at(Duration::from_millis(100))
    }

    fn app_at(step: Duration) -> App {
        let cfg = PlayerConfig::default();
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(TimeUpdateStrategy::ManualDuration(step))
            .insert_resource(WorldOrigin::new(cfg.spawn.x, cfg.spawn.z))
            .insert_resource(cfg)
            .add_systems(Startup, spawn_player)
            .add_systems(Update, (move_player, rebase_origin).chain());
        // First frame has zero delta.
        app.update();
        app
    }

    fn controller_entity(app: &mut App, slot: usize) -> Entity {
        let world = app.world_mut();
        world
            .query::<(Entity, &Controller)>()
            .iter(world)
            .find(|(_, c)| c.slot() == slot)
            .map(|(e, _)| e)
            .unwrap()
    }

    fn set_rig_rotation(app: &mut App, rotation: Quat) {
        let world = app.world_mut();
        let mut q = world.query_filtered::<&mut Transform, With<Player>>();
        q.single_mut(world).unwrap().rotation = rotation;
    }

    fn player_transform(app: &mut App) -> Transform {
        let world = app.world_mut();
        *world
            .query_filtered::<&Transform, With<Player>>()
            .single(world)
            .unwrap()
    }

    fn set_sample(app: &mut App, slot: usize, sample: GamepadSample, grip: bool) {
        let world = app.world_mut();
        let mut q = world.query::<&mut Controller>();
        for mut c in q.iter_mut(world) {
            if c.slot() == slot {
                c.gamepad = Some(sample.clone());
                if grip {
                    c.refresh_input();
                }
            }
        }
    }

    fn stick(x: f32, y: f32, grip: bool) -> GamepadSample {
        GamepadSample {
            axes: [0.0, 0.0, x, y],
            buttons: vec![false, grip],
        }
    }

    #[test]
    fn spawns_rig_with_camera_and_two_controllers() {
        let mut app = app();
        let world = app.world_mut();
        assert_eq!(world.query::<&PlayerCamera>().iter(world).count(), 1);
        let mut slots: Vec<usize> = world
            .query::<&Controller>()
            .iter(world)
            .map(|c| c.slot())
            .collect();
        slots.sort();
        assert_eq!(slots, vec![0, 1]);
        let rig = player_transform(&mut app);
        assert_eq!(rig.translation, Vec3::ZERO);
    }

    #[test]
    fn no_samples_no_movement() {
        let mut app = app();
        let before = player_transform(&mut app);
        app.update();
        app.update();
        assert_eq!(player_transform(&mut app), before);
    }

    #[test]
    fn slot_zero_walks_one_meter_per_tenth_second() {
        let mut app = app();
        let before = player_transform(&mut app).translation;
        set_sample(&mut app, 0, stick(1.0, 0.0, false), false);
        app.update();
        let after = player_transform(&mut app).translation;
        assert!((after.x - before.x - 1.0).abs() < 1e-3);
        assert_eq!(after.z, before.z);
    }

    #[test]
    fn grip_on_slot_zero_sprints() {
        let mut app = app();
        let before = player_transform(&mut app).translation;
        set_sample(&mut app, 0, stick(0.0, -1.0, true), true);
        app.update();
        let after = player_transform(&mut app).translation;
        assert!((before.z - after.z - 5.0).abs() < 1e-3);
    }

    #[test]
    fn slot_one_turns_without_moving() {
        let mut app = app();
        let before = player_transform(&mut app);
        set_sample(&mut app, 1, stick(1.0, -1.0, false), false);
        app.update();
        let after = player_transform(&mut app);
        assert_eq!(after.translation, before.translation);
        let (yaw, _, _) = after.rotation.to_euler(EulerRot::YXZ);
        assert!((yaw + 0.1).abs() < 1e-4);
    }

    // ── combined slots ─────────────────────────────────────────────

    fn walk_and_turn_together(initial_yaw: f32) -> (Vec3, f32) {
        let mut app = app();
        set_rig_rotation(&mut app, Quat::from_rotation_y(initial_yaw));
        // Attaching a child moves slot 0 into a newer archetype than slot 1.
        let slot0 = controller_entity(&mut app, 0);
        app.world_mut()
            .spawn((ControllerVisual, Transform::default(), ChildOf(slot0)));
        let before = player_transform(&mut app).translation;

        set_sample(&mut app, 0, stick(1.0, 0.0, false), false);
        set_sample(&mut app, 1, stick(1.0, 0.0, false), false);
        app.update();

        let after = player_transform(&mut app);
        let (yaw, _, _) = after.rotation.to_euler(EulerRot::YXZ);
        (after.translation - before, yaw)
    }

    #[test]
    fn both_slots_translate_before_turning() {
        let (delta, yaw) = walk_and_turn_together(0.0);
        assert!(delta.abs_diff_eq(Vec3::X, 1e-5), "{delta}");
        assert!((yaw + 0.1).abs() < 1e-4);
    }

    #[test]
    fn both_slots_use_previous_yaw_when_already_turned() {
        let (delta, yaw) = walk_and_turn_together(FRAC_PI_2);
        assert!(delta.abs_diff_eq(Vec3::NEG_Z, 1e-5), "{delta}");
        assert!((yaw - (FRAC_PI_2 - 0.1)).abs() < 1e-4);
    }

    // ── origin ─────────────────────────────────────────────────────

    #[test]
    fn slow_walk_accumulates_at_spawn() {
        let mut app = app_at(Duration::from_millis(10));
        set_sample(&mut app, 0, stick(0.0, -0.1, false), false);
        for _ in 0..100 {
            app.update();
        }
        let z = player_transform(&mut app).translation.z;
        assert!((z + 1.0).abs() < 1e-3, "moved {z}");
        let projected = app
            .world()
            .resource::<WorldOrigin>()
            .to_projected(Vec3::new(0.0, 0.0, z));
        assert!((projected.y - (PlayerConfig::default().spawn.z - 1.0)).abs() < 1e-3);
    }

    #[test]
    fn far_rig_is_rebased_to_zero() {
        let mut app = app();
        {
            let world = app.world_mut();
            let mut q = world.query_filtered::<&mut Transform, With<Player>>();
            q.single_mut(world).unwrap().translation = Vec3::new(1_500.0, 0.0, -200.0);
        }
        app.update();

        assert_eq!(player_transform(&mut app).translation, Vec3::ZERO);
        let spawn = PlayerConfig::default().spawn;
        assert_eq!(
            *app.world().resource::<WorldOrigin>(),
            WorldOrigin::new(spawn.x + 1_500.0, spawn.z - 200.0)
        );
    }

    #[test]
    fn near_rig_keeps_origin() {
        let mut app = app();
        set_sample(&mut app, 0, stick(1.0, 0.0, false), false);
        app.update();
        let spawn = PlayerConfig::default().spawn;
        assert_eq!(
            *app.world().resource::<WorldOrigin>(),
            WorldOrigin::new(spawn.x, spawn.z)
        );
        assert!(player_transform(&mut app).translation.x > 0.0);
    }
}
