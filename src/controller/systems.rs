use bevy::input::gamepad::{
    Gamepad, GamepadAxis, GamepadButton, GamepadConnection, GamepadConnectionEvent,
};
use bevy::prelude::*;

use super::ControllerConfig;
use super::entities::{
    Controller, ControllerLink, ControllerLinkChanged, ControllerVisual, GamepadSample,
};

/// Forwards gamepad connection events as [`ControllerLinkChanged`].
pub fn bridge_gamepad_connections(
    mut events: MessageReader<GamepadConnectionEvent>,
    mut links: MessageWriter<ControllerLinkChanged>,
) {
    for ev in events.read() {
        let change = match &ev.connection {
            GamepadConnection::Connected { .. } => ControllerLinkChanged::Connected(ev.gamepad),
            GamepadConnection::Disconnected => ControllerLinkChanged::Disconnected(ev.gamepad),
        };
        links.write(change);
    }
}

/// Binds new devices to the lowest free slot and unbinds departed ones,
/// spawning and releasing the grip/pointer visuals with the binding.
pub fn apply_link_changes(
    mut commands: Commands,
    mut changes: MessageReader<ControllerLinkChanged>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    cfg: Res<ControllerConfig>,
    mut controllers: Query<(Entity, &mut Controller)>,
) {
    for change in changes.read() {
        match *change {
            ControllerLinkChanged::Connected(pad) => {
                let bound = ControllerLink::Connected(pad);
                if controllers.iter().any(|(_, c)| c.link() == bound) {
                    continue;
                }
                let Some((entity, mut controller)) = controllers
                    .iter_mut()
                    .filter(|(_, c)| c.link() == ControllerLink::Disconnected)
                    .min_by_key(|(_, c)| c.slot())
                else {
                    warn!("gamepad {pad} connected but both controller slots are taken");
                    continue;
                };
                if !controller.connect(pad) {
                    continue;
                }
                let root = spawn_visuals(&mut commands, entity, &cfg, &mut meshes, &mut materials);
                controller.attach_visuals(root);
                info!("controller {} connected to gamepad {pad}", controller.slot());
            }
            ControllerLinkChanged::Disconnected(pad) => {
                let bound = ControllerLink::Connected(pad);
                for (_, mut controller) in &mut controllers {
                    if controller.link() != bound {
                        continue;
                    }
                    if let Some(root) = controller.disconnect() {
                        commands.entity(root).despawn();
                    }
                    info!("controller {} disconnected", controller.slot());
                }
            }
        }
    }
}

fn spawn_visuals(
    commands: &mut Commands,
    controller: Entity,
    cfg: &ControllerConfig,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
) -> Entity {
    let grip_mesh = meshes.add(Cuboid::from_size(cfg.grip_size));
    let grip_material = materials.add(StandardMaterial {
        base_color: cfg.grip_color,
        ..default()
    });
    let pointer_mesh = meshes.add(Cuboid::new(0.004, 0.004, cfg.pointer_length));
    let pointer_material = materials.add(StandardMaterial {
        base_color: cfg.pointer_color,
        unlit: true,
        ..default()
    });

    commands
        .spawn((
            Name::new("ControllerVisual"),
            ControllerVisual,
            Transform::default(),
            Visibility::default(),
            ChildOf(controller),
        ))
        .with_children(|visual| {
            visual.spawn((
                Name::new("Grip"),
                Mesh3d(grip_mesh),
                MeshMaterial3d(grip_material),
            ));
            visual.spawn((
                Name::new("Pointer"),
                Mesh3d(pointer_mesh),
                MeshMaterial3d(pointer_material),
                Transform::from_xyz(0.0, 0.0, -cfg.pointer_length / 2.0),
            ));
        })
        .id()
}

/// Copies each bound gamepad's state into its controller's sample.
pub fn sample_gamepads(gamepads: Query<&Gamepad>, mut controllers: Query<&mut Controller>) {
    for mut controller in &mut controllers {
        let ControllerLink::Connected(pad) = controller.link() else {
            continue;
        };
        let Ok(gamepad) = gamepads.get(pad) else {
            continue;
        };
        controller.gamepad = Some(xr_sample(gamepad));
    }
}

/// Left stick → thumbstick axes 2/3 (up is negative), RT/LT → trigger/grip,
/// South/East → primary/secondary.
fn xr_sample(gamepad: &Gamepad) -> GamepadSample {
    let stick_x = gamepad.get(GamepadAxis::LeftStickX).unwrap_or(0.0);
    let stick_y = gamepad.get(GamepadAxis::LeftStickY).unwrap_or(0.0);
    GamepadSample {
        axes: [0.0, 0.0, stick_x, -stick_y],
        buttons: vec![
            gamepad.pressed(GamepadButton::RightTrigger2),
            gamepad.pressed(GamepadButton::LeftTrigger2),
            false,
            false,
            gamepad.pressed(GamepadButton::South),
            gamepad.pressed(GamepadButton::East),
        ],
    }
}

/// Runs edge detection for every controller with a sample. Controllers
/// without one keep last frame's state.
pub fn update_controller_input(mut controllers: Query<&mut Controller>) {
    for mut controller in &mut controllers {
        controller.refresh_input();
    }
}

#[cfg(test)]
mod tests {
    use bevy::asset::AssetPlugin;

    use super::*;
    use crate::controller::ButtonName;

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default()))
            .init_asset::<Mesh>()
            .init_asset::<StandardMaterial>()
            .insert_resource(ControllerConfig::default())
            .add_message::<ControllerLinkChanged>()
            .add_systems(Update, (apply_link_changes, update_controller_input).chain());
        app
    }

    fn spawn_controllers(app: &mut App) -> [Entity; 2] {
        let world = app.world_mut();
        [
            world.spawn(Controller::new(0)).id(),
            world.spawn(Controller::new(1)).id(),
        ]
    }

    fn pad(app: &mut App) -> Entity {
        app.world_mut().spawn_empty().id()
    }

    fn controller(app: &App, entity: Entity) -> &Controller {
        app.world().get::<Controller>(entity).unwrap()
    }

    fn visual_count(app: &mut App) -> usize {
        let world = app.world_mut();
        world.query::<&ControllerVisual>().iter(world).count()
    }

    #[test]
    fn devices_fill_lowest_free_slot() {
        let mut app = app();
        let [first, second] = spawn_controllers(&mut app);
        let (a, b, c) = (pad(&mut app), pad(&mut app), pad(&mut app));

        app.world_mut().write_message(ControllerLinkChanged::Connected(a));
        app.update();
        assert_eq!(controller(&app, first).link(), ControllerLink::Connected(a));
        assert_eq!(controller(&app, second).link(), ControllerLink::Disconnected);

        app.world_mut().write_message(ControllerLinkChanged::Connected(b));
        app.world_mut().write_message(ControllerLinkChanged::Connected(c));
        app.update();
        assert_eq!(controller(&app, second).link(), ControllerLink::Connected(b));
        assert_eq!(visual_count(&mut app), 2);
    }

    #[test]
    fn repeated_connect_spawns_visuals_once() {
        let mut app = app();
        let [first, _] = spawn_controllers(&mut app);
        let a = pad(&mut app);
        for _ in 0..3 {
            app.world_mut().write_message(ControllerLinkChanged::Connected(a));
            app.update();
        }
        assert_eq!(visual_count(&mut app), 1);
        let root = controller(&app, first).visuals().unwrap();
        assert_eq!(app.world().get::<ChildOf>(root).map(|c| c.parent()), Some(first));
    }

    #[test]
    fn disconnect_releases_visuals_and_reconnect_restores_them() {
        let mut app = app();
        let [first, _] = spawn_controllers(&mut app);
        let a = pad(&mut app);

        app.world_mut().write_message(ControllerLinkChanged::Connected(a));
        app.update();
        let root = controller(&app, first).visuals().unwrap();

        app.world_mut().write_message(ControllerLinkChanged::Disconnected(a));
        app.update();
        assert!(app.world().get_entity(root).is_err());
        assert_eq!(visual_count(&mut app), 0);
        let c = controller(&app, first);
        assert!(c.is_initialized());
        assert!(c.gamepad.is_none());

        app.world_mut().write_message(ControllerLinkChanged::Connected(a));
        app.update();
        assert_eq!(visual_count(&mut app), 1);
    }

    #[test]
    fn disconnected_controller_keeps_last_button_state() {
        let mut app = app();
        let [first, _] = spawn_controllers(&mut app);
        let a = pad(&mut app);
        app.world_mut().write_message(ControllerLinkChanged::Connected(a));
        app.update();

        app.world_mut()
            .get_mut::<Controller>(first)
            .unwrap()
            .gamepad = Some(GamepadSample {
            axes: [0.0, 0.0, 0.0, -1.0],
            buttons: vec![false, true],
        });
        app.update();
        let held = controller(&app, first).input.clone();
        assert!(held.down[ButtonName::Forwards]);
        assert!(held.pressed[ButtonName::Grip]);

        app.world_mut().write_message(ControllerLinkChanged::Disconnected(a));
        app.update();
        app.update();
        assert_eq!(controller(&app, first).input, held);
    }

    #[test]
    fn edges_last_exactly_one_frame() {
        let mut app = app();
        let [first, _] = spawn_controllers(&mut app);
        let a = pad(&mut app);
        app.world_mut().write_message(ControllerLinkChanged::Connected(a));
        app.update();

        app.world_mut()
            .get_mut::<Controller>(first)
            .unwrap()
            .gamepad = Some(GamepadSample {
            axes: [0.0; 4],
            buttons: vec![true],
        });
        app.update();
        assert!(controller(&app, first).input.down[ButtonName::Trigger]);
        app.update();
        let c = controller(&app, first);
        assert!(!c.input.down[ButtonName::Trigger]);
        assert!(c.input.pressed[ButtonName::Trigger]);
    }
}
