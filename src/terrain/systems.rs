use bevy::platform::collections::HashMap;
use bevy::prelude::*;
use bevy::tasks::{IoTaskPool, block_on, futures_lite::future};

use super::TerrainConfig;
use super::cell_grid::{self, CellKey};
use super::entities::{
    GridEntry, HeightFetch, ImageryFetch, TerrainSourceHandle, Tile, TileGrid,
};
use super::source::decode_imagery;
use super::tile_mesh::{HeightPatch, HeightState, TileLayout};
use crate::origin::WorldOrigin;
use crate::player::Player;

// ── Grid ───────────────────────────────────────────────────────────

/// Keeps the 3×3 block of tiles centred on the player's cell.
///
/// Only does work when the player changes cell or the neighbor delay runs
/// out. Cells outside the block, or whose tier no longer matches the
/// [`super::TierPolicy`], are despawned; missing cells get a fresh [`Tile`].
pub fn sync_tile_grid(
    mut commands: Commands,
    time: Res<Time>,
    cfg: Res<TerrainConfig>,
    mut grid: ResMut<TileGrid>,
    origin: Res<WorldOrigin>,
    player_q: Query<&Transform, With<Player>>,
) {
    let Ok(player) = player_q.single() else {
        return;
    };
    let pos = origin.to_projected(player.translation);
    let center = CellKey::containing(pos.x, pos.y, cfg.tile_size);
    let neighbors_due = time.elapsed_secs() >= cfg.neighbor_delay;

    if grid.center == Some(center) && grid.neighbors_loaded == neighbors_due {
        return;
    }

    let required: HashMap<CellKey, _> = cell_grid::required_cells(center)
        .map(|cell| (cell, cell.ring(center)))
        .filter(|&(_, ring)| ring == 0 || neighbors_due)
        .map(|(cell, ring)| (cell, cfg.tiers.tier_for(ring)))
        .collect();

    grid.cells.retain(|cell, entry| {
        let keep = required.get(cell) == Some(&entry.tier);
        if !keep {
            info!("evicting tile ({}, {})", cell.x, cell.z);
            commands.entity(entry.entity).despawn();
        }
        keep
    });

    for (&cell, &tier) in &required {
        if grid.cells.contains_key(&cell) {
            continue;
        }
        let bounds = match cell.bounds(cfg.tile_size) {
            Ok(bounds) => bounds,
            Err(err) => {
                error!("cannot create tile ({}, {}): {err}", cell.x, cell.z);
                continue;
            }
        };
        let layout = TileLayout::new(bounds, tier);
        let anchor = layout.anchor();
        info!(
            "creating tile ({}, {}) {:?} {}x{} vertices",
            cell.x,
            cell.z,
            tier,
            layout.w_verts(),
            layout.h_verts()
        );
        let entity = commands
            .spawn((
                Name::new(format!("Tile({},{})", cell.x, cell.z)),
                Transform::from_translation(origin.to_local(&anchor)),
                anchor,
                Visibility::default(),
                Tile::new(cell, layout),
            ))
            .id();
        grid.cells.insert(cell, GridEntry { entity, tier });
    }

    grid.center = Some(center);
    grid.neighbors_loaded = neighbors_due;
}

// ── Fetch ──────────────────────────────────────────────────────────

/// Gives each new tile its flat placeholder mesh and starts its one height
/// fetch and one imagery fetch.
pub fn start_tile_fetches(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    source: Res<TerrainSourceHandle>,
    cfg: Res<TerrainConfig>,
    new_tiles: Query<(Entity, &Tile), Added<Tile>>,
) {
    let pool = IoTaskPool::get();

    for (entity, tile) in &new_tiles {
        let mesh = meshes.add(tile.layout.placeholder_mesh());
        let material = materials.add(StandardMaterial {
            base_color: cfg.ground_color,
            perceptual_roughness: 0.95,
            ..default()
        });

        let height_task = {
            let source = source.0.clone();
            let layout = tile.layout.clone();
            let limit = cfg.sentinel_limit;
            pool.spawn(async move {
                let raster = source.heights(&layout.height_request())?;
                HeightPatch::build(&layout, raster, limit)
            })
        };

        let imagery_task = {
            let source = source.0.clone();
            let request = tile
                .layout
                .imagery_request(cfg.source.imagery_pixels_per_meter);
            pool.spawn(async move {
                source
                    .imagery(&request)?
                    .map(|bytes| decode_imagery(&bytes))
                    .transpose()
            })
        };

        commands.entity(entity).insert((
            Mesh3d(mesh),
            MeshMaterial3d(material),
            HeightFetch(height_task),
            ImageryFetch(imagery_task),
        ));
    }
}

// ── Publish ────────────────────────────────────────────────────────

/// Polls height fetches without blocking and swaps finished patches into the
/// tile mesh. Failures leave the tile flat with [`HeightState::Empty`].
pub fn publish_height_patches(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut tiles: Query<(Entity, &mut Tile, &Mesh3d, &mut HeightFetch)>,
) {
    for (entity, mut tile, mesh3d, mut fetch) in &mut tiles {
        let Some(result) = block_on(future::poll_once(&mut fetch.0)) else {
            continue;
        };
        commands.entity(entity).remove::<HeightFetch>();
        let cell = tile.cell;

        match result {
            Ok(patch) => {
                if patch.replaced > 0 || patch.missing > 0 {
                    warn!(
                        "tile ({}, {}): {} no-data samples replaced, {} vertices without a sample",
                        cell.x, cell.z, patch.replaced, patch.missing
                    );
                }
                let Some(mesh) = meshes.get_mut(&mesh3d.0) else {
                    warn!("tile ({}, {}) lost its mesh before heights arrived", cell.x, cell.z);
                    continue;
                };
                let (min, max) = (patch.min_height(), patch.max_height());
                tile.heights = patch.publish(mesh);
                info!("tile ({}, {}) heights {min:.1}..{max:.1} m", cell.x, cell.z);
            }
            Err(err) => {
                error!("tile ({}, {}) height fetch failed: {err}", cell.x, cell.z);
                tile.heights = HeightState::Empty;
            }
        }
    }
}

/// Polls imagery fetches and sets the decoded photo as the tile's texture.
pub fn publish_imagery(
    mut commands: Commands,
    mut images: ResMut<Assets<Image>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut tiles: Query<(
        Entity,
        &Tile,
        &MeshMaterial3d<StandardMaterial>,
        &mut ImageryFetch,
    )>,
) {
    for (entity, tile, material, mut fetch) in &mut tiles {
        let Some(result) = block_on(future::poll_once(&mut fetch.0)) else {
            continue;
        };
        commands.entity(entity).remove::<ImageryFetch>();

        match result {
            Ok(Some(image)) => {
                let texture = images.add(image);
                if let Some(mat) = materials.get_mut(&material.0) {
                    mat.base_color = Color::WHITE;
                    mat.base_color_texture = Some(texture);
                }
            }
            Ok(None) => {}
            Err(err) => {
                error!(
                    "tile ({}, {}) imagery fetch failed: {err}",
                    tile.cell.x, tile.cell.z
                );
            }
        }
    }
}
