//! Streamed terrain: a 3×3 block of height-mapped tiles that follows the player.
//!
//! Each tile starts flat, fetches its height raster and imagery on the I/O
//! task pool, and swaps in the finished geometry once. Cells that leave
//! the block are despawned together with any fetch still in flight.

pub mod cell_grid;
mod entities;
pub mod geo;
pub mod source;
mod systems;
pub mod tile_mesh;

pub use entities::{HeightFetch, ImageryFetch, TerrainSourceHandle, Tile, TileGrid};

use std::sync::Arc;

use bevy::prelude::*;

use crate::player::PlayerSet;
use geo::ResolutionTier;
use source::{NoiseSource, WcsSource};

/// Pipeline ordering for terrain update systems.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum TerrainSet {
    /// Spawns/evicts tiles and starts their fetches.
    Grid,
    /// Publishes finished fetches into tile meshes and materials.
    Publish,
}

/// Configuration for the terrain subsystem.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct TerrainConfig {
    /// Edge length of one grid cell in meters.
    pub tile_size: f64,
    /// Which resolution tier each ring of the 3×3 block uses.
    pub tiers: TierPolicy,
    /// Seconds after startup before the 8 neighbor cells are created.
    pub neighbor_delay: f32,
    /// Samples with a larger magnitude are treated as no-data.
    pub sentinel_limit: f32,
    /// Where heights and imagery come from.
    pub source: SourceSettings,
    /// Base color of tiles without imagery.
    pub ground_color: Color,
}

/// Resolution by distance from the player's cell.
///
/// Ring 0 is the player's own cell; ring 1 the 8 surrounding cells.
#[derive(Clone, Debug, Reflect)]
pub struct TierPolicy {
    /// Tier of the player's cell.
    pub center: ResolutionTier,
    /// Tier of every other cell.
    pub neighbors: ResolutionTier,
}

impl TierPolicy {
    /// Tier for a cell `ring` cells away from the player's.
    pub fn tier_for(&self, ring: u32) -> ResolutionTier {
        if ring == 0 {
            self.center
        } else {
            self.neighbors
        }
    }
}

/// Endpoints and parameters of the height/imagery providers.
#[derive(Clone, Debug, Reflect)]
pub struct SourceSettings {
    /// Use procedural noise instead of the remote services.
    pub offline: bool,
    /// WCS endpoint serving AHN elevation coverages.
    pub height_endpoint: String,
    /// WMS endpoint serving aerial photos.
    pub imagery_endpoint: String,
    /// WMS layer name.
    pub imagery_layer: String,
    /// Coordinate reference system of bounds and responses.
    pub crs: String,
    /// Imagery resolution (the ortho layer has a pixel every 0.25 m).
    pub imagery_pixels_per_meter: f64,
    /// Per-request HTTP timeout.
    pub timeout_secs: f32,
    /// Offline noise seed.
    pub noise_seed: u32,
    /// Offline noise octaves.
    pub noise_octaves: usize,
    /// Offline noise horizontal scale in meters.
    pub noise_scale: f64,
    /// Offline noise peak height in meters.
    pub noise_amplitude: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            tile_size: 250.0,
            tiers: TierPolicy {
                center: ResolutionTier::Fine,
                neighbors: ResolutionTier::Fine,
            },
            neighbor_delay: 5.0,
            sentinel_limit: 1000.0,
            source: SourceSettings {
                offline: false,
                height_endpoint: "https://geodata.nationaalgeoregister.nl/ahn3/wcs".into(),
                imagery_endpoint: "https://geodata.nationaalgeoregister.nl/luchtfoto/infrarood/wms"
                    .into(),
                imagery_layer: "2019_ortho25".into(),
                crs: "EPSG:28992".into(),
                imagery_pixels_per_meter: 4.0,
                timeout_secs: 30.0,
                noise_seed: 42,
                noise_octaves: 4,
                noise_scale: 400.0,
                noise_amplitude: 30.0,
            },
            ground_color: Color::srgb(0.45, 0.52, 0.38),
        }
    }
}

/// Terrain plugin: tile grid management and asynchronous tile loading.
///
/// Uses an already inserted [`TerrainSourceHandle`] if there is one, otherwise
/// picks the WCS or noise source from [`SourceSettings::offline`].
pub struct TerrainPlugin(pub TerrainConfig);

impl Plugin for TerrainPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<TerrainSourceHandle>() {
            app.insert_resource(default_source(&self.0.source));
        }

        app.register_type::<TerrainConfig>()
            .register_type::<cell_grid::CellKey>()
            .insert_resource(self.0.clone())
            .init_resource::<TileGrid>()
            .configure_sets(
                Update,
                (TerrainSet::Grid, TerrainSet::Publish)
                    .chain()
                    .after(PlayerSet::Rebase),
            )
            .add_systems(
                Update,
                (systems::sync_tile_grid, systems::start_tile_fetches)
                    .chain()
                    .in_set(TerrainSet::Grid),
            )
            .add_systems(
                Update,
                (systems::publish_height_patches, systems::publish_imagery)
                    .in_set(TerrainSet::Publish),
            );
    }
}

fn default_source(settings: &SourceSettings) -> TerrainSourceHandle {
    if settings.offline {
        info!("terrain source: offline noise");
        return TerrainSourceHandle(Arc::new(NoiseSource::new(settings)));
    }
    match WcsSource::new(settings.clone()) {
        Ok(wcs) => {
            info!("terrain source: {}", settings.height_endpoint);
            TerrainSourceHandle(Arc::new(wcs))
        }
        Err(err) => {
            error!("HTTP client unavailable ({err}), falling back to offline noise");
            TerrainSourceHandle(Arc::new(NoiseSource::new(settings)))
        }
    }
}
