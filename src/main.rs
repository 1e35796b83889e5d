use bevy::app::AppExit;
use bevy::prelude::*;
#[cfg(feature = "native")]
use bevy::remote::{RemotePlugin, http::RemoteHttpPlugin};
use bevy_inspector_egui::quick::WorldInspectorPlugin;
#[cfg(feature = "native")]
use clap::Parser;

use vr_terrain::GameState;
use vr_terrain::controller::{ControllerConfig, ControllerPlugin};
use vr_terrain::player::{PlayerConfig, PlayerPlugin};
use vr_terrain::terrain::{TerrainConfig, TerrainPlugin};
use vr_terrain::world::WorldPlugin;

/// Walk the Dutch elevation model with two controllers.
#[cfg(feature = "native")]
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Spawn easting in RD New meters.
    #[arg(long)]
    x: Option<f64>,
    /// Spawn northing in RD New meters.
    #[arg(long)]
    z: Option<f64>,
    /// Grid cell edge length in meters.
    #[arg(long)]
    tile_size: Option<f64>,
    /// Generate terrain locally instead of querying the map services.
    #[arg(long)]
    offline: bool,
}

#[cfg(feature = "native")]
impl Cli {
    fn apply(&self, terrain: &mut TerrainConfig, player: &mut PlayerConfig) {
        if let Some(x) = self.x {
            player.spawn.x = x;
        }
        if let Some(z) = self.z {
            player.spawn.z = z;
        }
        if let Some(size) = self.tile_size {
            terrain.tile_size = size;
        }
        terrain.source.offline |= self.offline;
    }
}

#[cfg(feature = "native")]
fn configs() -> (TerrainConfig, PlayerConfig) {
    let mut terrain = TerrainConfig::default();
    let mut player = PlayerConfig::default();
    Cli::parse().apply(&mut terrain, &mut player);
    (terrain, player)
}

#[cfg(not(feature = "native"))]
fn configs() -> (TerrainConfig, PlayerConfig) {
    (TerrainConfig::default(), PlayerConfig::default())
}

fn main() {
    let (terrain_cfg, player_cfg) = configs();
    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "VR Terrain".into(),
            ..default()
        }),
        ..default()
    }))
    .register_type::<GameState>()
    .init_state::<GameState>()
    .add_plugins(bevy_egui::EguiPlugin::default())
    .add_plugins(ControllerPlugin(ControllerConfig::default()))
    .add_plugins(PlayerPlugin(player_cfg))
    .add_plugins(TerrainPlugin(terrain_cfg))
    .add_plugins(WorldPlugin)
    .add_systems(Update, exit_on_esc)
    .add_systems(Update, toggle_inspector)
    .add_plugins(WorldInspectorPlugin::new().run_if(in_state(GameState::Debugging)));

    #[cfg(feature = "native")]
    app.add_plugins(RemotePlugin::default())
        .add_plugins(RemoteHttpPlugin::default());

    app.run();
}

fn toggle_inspector(
    keys: Res<ButtonInput<KeyCode>>,
    state: Res<State<GameState>>,
    mut next: ResMut<NextState<GameState>>,
) {
    if keys.just_pressed(KeyCode::Tab) {
        next.set(match state.get() {
            GameState::Running => GameState::Debugging,
            GameState::Debugging => GameState::Running,
        });
    }
}

fn exit_on_esc(keys: Res<ButtonInput<KeyCode>>, mut exit: MessageWriter<AppExit>) {
    if keys.just_pressed(KeyCode::Escape) {
        exit.write(AppExit::Success);
    }
}
