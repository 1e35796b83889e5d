use std::sync::Arc;

use bevy::platform::collections::HashMap;
use bevy::prelude::*;
use bevy::tasks::Task;

use super::cell_grid::CellKey;
use super::geo::ResolutionTier;
use super::source::{FetchError, TerrainSource};
use super::tile_mesh::{HeightPatch, HeightState, TileLayout};

/// One terrain patch. Lives on an entity whose `Transform` sits at the
/// bounds' center; the mesh is in tile-local coordinates.
#[derive(Component, Debug)]
pub struct Tile {
    /// Grid cell this tile fills.
    pub cell: CellKey,
    /// Bounds, tier and vertex grid.
    pub layout: TileLayout,
    /// Written once, when the height fetch resolves.
    pub heights: HeightState,
}

impl Tile {
    /// A tile whose height fetch has not resolved yet.
    pub fn new(cell: CellKey, layout: TileLayout) -> Self {
        Self {
            cell,
            layout,
            heights: HeightState::Pending,
        }
    }
}

/// The tile's single in-flight height fetch. Removed when it resolves;
/// dropping it (tile evicted) cancels the task.
#[derive(Component)]
pub struct HeightFetch(pub(super) Task<Result<HeightPatch, FetchError>>);

/// The tile's single in-flight imagery fetch.
#[derive(Component)]
pub struct ImageryFetch(pub(super) Task<Result<Option<Image>, FetchError>>);

/// Shared provider used by every tile fetch.
#[derive(Resource, Clone)]
pub struct TerrainSourceHandle(pub Arc<dyn TerrainSource>);

/// Entry for one occupied grid cell.
#[derive(Clone, Copy, Debug)]
pub(super) struct GridEntry {
    pub(super) entity: Entity,
    pub(super) tier: ResolutionTier,
}

/// Maps grid cells to their tile entities.
#[derive(Resource, Default, Debug)]
pub struct TileGrid {
    pub(super) cells: HashMap<CellKey, GridEntry>,
    /// Cell the player occupied on the last sync.
    pub(super) center: Option<CellKey>,
    /// Whether the last sync already included the neighbor ring.
    pub(super) neighbors_loaded: bool,
}

impl TileGrid {
    /// Tile entity for `cell`, if one exists.
    pub fn get(&self, cell: &CellKey) -> Option<Entity> {
        self.cells.get(cell).map(|e| e.entity)
    }

    /// Number of live tiles.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// `true` when no tiles exist.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell the player occupied on the last sync.
    pub fn center(&self) -> Option<CellKey> {
        self.center
    }
}
