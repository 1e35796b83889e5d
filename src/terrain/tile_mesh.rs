//! Tile vertex grid and the height-to-geometry conversion.
//!
//! Vertex `(i, j)` sits at column `i` from the western edge and row `j` from
//! the northern edge, stored at index `j * w_verts + i`. That is the same
//! row-major order height rasters arrive in, so sample `j * w_verts + i`
//! lands on vertex `(i, j)`.

use bevy::asset::RenderAssetUsages;
use bevy::mesh::Indices;
use bevy::prelude::*;
use bevy::render::render_resource::PrimitiveTopology;

use super::geo::{GeoBounds, ResolutionTier};
use super::source::{FetchError, HeightRaster, RasterRequest};
use crate::math;
use crate::origin::GeoAnchor;

/// Vertex grid dimensions and placement for one tile.
#[derive(Clone, Debug, PartialEq)]
pub struct TileLayout {
    bounds: GeoBounds,
    tier: ResolutionTier,
    w_verts: u32,
    h_verts: u32,
}

impl TileLayout {
    /// `⌈extent / tier⌉` vertices per axis, never fewer than 2.
    pub fn new(bounds: GeoBounds, tier: ResolutionTier) -> Self {
        let along = |extent: f64| ((extent / tier.meters()).ceil() as u32).max(2);
        Self {
            bounds,
            tier,
            w_verts: along(bounds.width()),
            h_verts: along(bounds.height()),
        }
    }

    /// Projected area covered.
    pub fn bounds(&self) -> &GeoBounds {
        &self.bounds
    }

    /// Sample spacing tier.
    pub fn tier(&self) -> ResolutionTier {
        self.tier
    }

    /// Vertices per row.
    pub fn w_verts(&self) -> u32 {
        self.w_verts
    }

    /// Vertices per column.
    pub fn h_verts(&self) -> u32 {
        self.h_verts
    }

    /// Total vertex count.
    pub fn vertex_count(&self) -> usize {
        self.w_verts as usize * self.h_verts as usize
    }

    /// Where the tile entity sits: the bounds' center at height 0.
    pub fn anchor(&self) -> GeoAnchor {
        let (cx, cy) = self.bounds.center();
        GeoAnchor::new(cx, 0.0, cy)
    }

    /// Tile-local `(x, z)` of vertex `(i, j)`. North (row 0) is +Z.
    fn local_xz(&self, i: u32, j: u32) -> (f32, f32) {
        let w = self.bounds.width() as f32;
        let h = self.bounds.height() as f32;
        let dx = w / (self.w_verts - 1) as f32;
        let dz = h / (self.h_verts - 1) as f32;
        (-w / 2.0 + i as f32 * dx, h / 2.0 - j as f32 * dz)
    }

    /// Flat vertex positions at elevation 0.
    pub fn placeholder_positions(&self) -> Vec<[f32; 3]> {
        (0..self.h_verts)
            .flat_map(|j| (0..self.w_verts).map(move |i| (i, j)))
            .map(|(i, j)| {
                let (x, z) = self.local_xz(i, j);
                [x, 0.0, z]
            })
            .collect()
    }

    /// Two counter-clockwise (seen from above) triangles per grid cell.
    pub fn indices(&self) -> Vec<u32> {
        let w = self.w_verts;
        let mut indices = Vec::with_capacity(((w - 1) * (self.h_verts - 1) * 6) as usize);
        for j in 0..self.h_verts - 1 {
            for i in 0..w - 1 {
                let a = j * w + i;
                let b = a + 1;
                let c = a + w;
                let d = c + 1;
                indices.extend_from_slice(&[a, b, c, b, d, c]);
            }
        }
        indices
    }

    /// Texture coordinates; `v` grows southwards like image rows.
    pub fn uvs(&self) -> Vec<[f32; 2]> {
        let (w, h) = ((self.w_verts - 1) as f32, (self.h_verts - 1) as f32);
        (0..self.h_verts)
            .flat_map(|j| (0..self.w_verts).map(move |i| [i as f32 / w, j as f32 / h]))
            .collect()
    }

    /// Flat mesh shown until heights arrive. Kept in the main world so the
    /// height patch can rewrite it.
    pub fn placeholder_mesh(&self) -> Mesh {
        Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
        )
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, self.placeholder_positions())
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, vec![[0.0, 1.0, 0.0]; self.vertex_count()])
        .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, self.uvs())
        .with_inserted_indices(Indices::U32(self.indices()))
    }

    /// Height raster matching the vertex grid one sample per vertex.
    pub fn height_request(&self) -> RasterRequest {
        RasterRequest {
            bounds: self.bounds,
            tier: self.tier,
            width: self.w_verts,
            height: self.h_verts,
        }
    }

    /// Imagery at `pixels_per_meter`.
    pub fn imagery_request(&self, pixels_per_meter: f64) -> RasterRequest {
        let px = |extent: f64| ((extent * pixels_per_meter).round() as u32).max(1);
        RasterRequest {
            bounds: self.bounds,
            tier: self.tier,
            width: px(self.bounds.width()),
            height: px(self.bounds.height()),
        }
    }
}

/// Height state of a tile.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum HeightState {
    /// Fetch in flight.
    #[default]
    Pending,
    /// Raw samples and the plausible range found in them.
    Loaded {
        /// Samples as received, sentinels included.
        samples: Vec<f32>,
        /// Lowest plausible sample.
        min_height: f32,
        /// Highest plausible sample.
        max_height: f32,
    },
    /// Fetch failed; the tile stays flat for its lifetime.
    Empty,
}

/// Finished geometry for one tile, built off the frame thread and published
/// to the mesh in one step.
#[derive(Debug)]
pub struct HeightPatch {
    samples: Vec<f32>,
    min_height: f32,
    max_height: f32,
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    /// Samples rejected as implausible and replaced with `min_height`.
    pub replaced: usize,
    /// Vertices with no sample at all (short raster), also set to `min_height`.
    pub missing: usize,
}

impl HeightPatch {
    /// Sanitizes `raster` onto `layout`'s vertex grid and recomputes normals.
    ///
    /// Samples failing [`math::is_plausible_height`] take the batch minimum.
    /// Writes are bounded by the layout's vertex count, and rows are walked
    /// with the raster's own stride, so a raster of the wrong size cannot
    /// shift rows into neighboring vertices.
    pub fn build(
        layout: &TileLayout,
        raster: HeightRaster,
        sentinel_limit: f32,
    ) -> Result<Self, FetchError> {
        if raster.samples.is_empty() {
            return Err(FetchError::EmptyRaster);
        }
        let (min_height, max_height) =
            math::height_range(&raster.samples, sentinel_limit).unwrap_or((0.0, 0.0));

        let mut positions = layout.placeholder_positions();
        let (mut replaced, mut missing) = (0, 0);
        let stride = raster.width as usize;

        for j in 0..layout.h_verts as usize {
            for i in 0..layout.w_verts as usize {
                let sample = (i < stride && j < raster.height as usize)
                    .then(|| raster.samples.get(j * stride + i).copied())
                    .flatten();
                let elevation = match sample {
                    Some(s) if math::is_plausible_height(s, sentinel_limit) => s,
                    Some(_) => {
                        replaced += 1;
                        min_height
                    }
                    None => {
                        missing += 1;
                        min_height
                    }
                };
                positions[j * layout.w_verts as usize + i][1] = elevation;
            }
        }

        let as_vec: Vec<Vec3> = positions.iter().map(|&p| Vec3::from_array(p)).collect();
        let normals = math::vertex_normals(&as_vec, &layout.indices(), Vec3::Y)
            .into_iter()
            .map(|n| n.to_array())
            .collect();

        Ok(Self {
            samples: raster.samples,
            min_height,
            max_height,
            positions,
            normals,
            replaced,
            missing,
        })
    }

    /// Lowest plausible sample.
    pub fn min_height(&self) -> f32 {
        self.min_height
    }

    /// Highest plausible sample.
    pub fn max_height(&self) -> f32 {
        self.max_height
    }

    /// Final elevation of vertex `index`.
    pub fn elevation(&self, index: usize) -> Option<f32> {
        self.positions.get(index).map(|p| p[1])
    }

    /// Swaps positions and normals into `mesh` together and returns the
    /// tile's new height state.
    pub fn publish(self, mesh: &mut Mesh) -> HeightState {
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, self.positions);
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, self.normals);
        HeightState::Loaded {
            samples: self.samples,
            min_height: self.min_height,
            max_height: self.max_height,
        }
    }
}
