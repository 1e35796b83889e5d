//! Remote and procedural providers of height rasters and imagery.
//!
//! Everything here is blocking and runs on the I/O task pool, never on
//! the frame thread.

use std::io::Cursor;
use std::time::Duration;

use bevy::asset::RenderAssetUsages;
use bevy::image::{CompressedImageFormats, ImageSampler, ImageType};
use bevy::prelude::*;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use thiserror::Error;
use tiff::decoder::{Decoder, DecodingResult};

use super::SourceSettings;
use super::geo::{GeoBounds, ResolutionTier};

/// Why a height or imagery fetch produced nothing usable.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure or non-success HTTP status.
    #[error("terrain service request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Payload was not a readable TIFF.
    #[error("height raster decode failed: {0}")]
    Tiff(#[from] tiff::TiffError),
    /// TIFF decoded to a sample type we do not treat as elevation.
    #[error("unsupported height raster sample format")]
    UnsupportedSampleFormat,
    /// Raster decoded but held zero samples.
    #[error("height raster contained no samples")]
    EmptyRaster,
    /// Imagery bytes could not be turned into a texture.
    #[error("imagery decode failed: {0}")]
    Imagery(String),
    /// Request timeout is not a positive, finite number of seconds.
    #[error("invalid request timeout: {0} s")]
    InvalidTimeout(f32),
}

/// One raster request: an area, the tier that selects the coverage, and the
/// output pixel dimensions.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterRequest {
    /// Area covered by the raster.
    pub bounds: GeoBounds,
    /// Selects the height coverage.
    pub tier: ResolutionTier,
    /// Output columns.
    pub width: u32,
    /// Output rows.
    pub height: u32,
}

/// Single-band elevation grid, row-major, row 0 along the northern edge.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeightRaster {
    /// Columns.
    pub width: u32,
    /// Rows.
    pub height: u32,
    /// `width * height` samples in meters.
    pub samples: Vec<f32>,
}

/// Provider of height rasters and (optionally) aerial imagery for tiles.
pub trait TerrainSource: Send + Sync + 'static {
    /// Fetches the elevation raster for `request`. May block.
    fn heights(&self, request: &RasterRequest) -> Result<HeightRaster, FetchError>;

    /// Fetches encoded imagery for `request`, or `None` when the source has none.
    fn imagery(&self, request: &RasterRequest) -> Result<Option<Vec<u8>>, FetchError>;
}

// ── WCS / WMS ──────────────────────────────────────────────────────

/// Height from an OGC WCS 1.0.0 endpoint, imagery from a WMS 1.3.0 endpoint.
pub struct WcsSource {
    client: reqwest::blocking::Client,
    settings: SourceSettings,
}

impl WcsSource {
    /// Builds the shared HTTP client.
    ///
    /// Fails with [`FetchError::InvalidTimeout`] unless `timeout_secs` is
    /// finite and above zero.
    pub fn new(settings: SourceSettings) -> Result<Self, FetchError> {
        let timeout = Duration::try_from_secs_f32(settings.timeout_secs)
            .ok()
            .filter(|t| !t.is_zero())
            .ok_or(FetchError::InvalidTimeout(settings.timeout_secs))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { client, settings })
    }

    /// `GetCoverage` URL returning a float32 GeoTIFF.
    pub fn height_url(&self, request: &RasterRequest) -> String {
        format!(
            "{}?SERVICE=WCS&VERSION=1.0.0&REQUEST=GetCoverage&FORMAT=GEOTIFF_FLOAT32&COVERAGE={}{}",
            self.settings.height_endpoint,
            request.tier.coverage(),
            self.area_params(request),
        )
    }

    /// `GetMap` URL returning a JPEG.
    pub fn imagery_url(&self, request: &RasterRequest) -> String {
        format!(
            "{}?REQUEST=GetMap&SERVICE=WMS&VERSION=1.3.0&LAYERS={}&FORMAT=image/jpeg&STYLES={}",
            self.settings.imagery_endpoint,
            self.settings.imagery_layer,
            self.area_params(request),
        )
    }

    fn area_params(&self, request: &RasterRequest) -> String {
        let b = &request.bounds;
        let crs = &self.settings.crs;
        format!(
            "&BBOX={},{},{},{}&CRS={crs}&RESPONSE_CRS={crs}&WIDTH={}&HEIGHT={}",
            b.min_x(),
            b.min_y(),
            b.max_x(),
            b.max_y(),
            request.width,
            request.height,
        )
    }

    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}

impl TerrainSource for WcsSource {
    fn heights(&self, request: &RasterRequest) -> Result<HeightRaster, FetchError> {
        let url = self.height_url(request);
        debug!("fetching heights: {url}");
        decode_height_tiff(&self.get(&url)?)
    }

    fn imagery(&self, request: &RasterRequest) -> Result<Option<Vec<u8>>, FetchError> {
        let url = self.imagery_url(request);
        debug!("fetching imagery: {url}");
        self.get(&url).map(Some)
    }
}

/// Decodes the first band of a TIFF into elevation samples.
pub fn decode_height_tiff(bytes: &[u8]) -> Result<HeightRaster, FetchError> {
    let mut decoder = Decoder::new(Cursor::new(bytes))?;
    let (width, height) = decoder.dimensions()?;
    let data: Vec<f32> = match decoder.read_image()? {
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.iter().map(|&v| v as f32).collect(),
        DecodingResult::I16(data) => data.iter().map(|&v| v as f32).collect(),
        DecodingResult::U16(data) => data.iter().map(|&v| v as f32).collect(),
        DecodingResult::I32(data) => data.iter().map(|&v| v as f32).collect(),
        _ => return Err(FetchError::UnsupportedSampleFormat),
    };

    let pixels = width as usize * height as usize;
    if pixels == 0 || data.is_empty() {
        return Err(FetchError::EmptyRaster);
    }
    // Interleaved multi-band data: keep band 0.
    let stride = (data.len() / pixels).max(1);
    let samples = data.into_iter().step_by(stride).collect();

    Ok(HeightRaster {
        width,
        height,
        samples,
    })
}

/// Decodes JPEG imagery into a texture.
pub fn decode_imagery(bytes: &[u8]) -> Result<Image, FetchError> {
    Image::from_buffer(
        bytes,
        ImageType::MimeType("image/jpeg"),
        CompressedImageFormats::NONE,
        true,
        ImageSampler::Default,
        RenderAssetUsages::RENDER_WORLD,
    )
    .map_err(|e| FetchError::Imagery(e.to_string()))
}

// ── Offline noise ──────────────────────────────────────────────────

/// Procedural fBm terrain sampled at projected coordinates, so neighboring
/// tiles line up. Has no imagery.
#[derive(Clone, Debug)]
pub struct NoiseSource {
    seed: u32,
    octaves: usize,
    scale: f64,
    amplitude: f32,
}

impl NoiseSource {
    /// Builds a source from the offline noise parameters.
    pub fn new(settings: &SourceSettings) -> Self {
        Self {
            seed: settings.noise_seed,
            octaves: settings.noise_octaves,
            scale: settings.noise_scale,
            amplitude: settings.noise_amplitude,
        }
    }
}

impl TerrainSource for NoiseSource {
    fn heights(&self, request: &RasterRequest) -> Result<HeightRaster, FetchError> {
        if request.width == 0 || request.height == 0 {
            return Err(FetchError::EmptyRaster);
        }
        let fbm: Fbm<Perlin> = Fbm::new(self.seed).set_octaves(self.octaves);
        let b = &request.bounds;
        let dx = b.width() / (request.width.max(2) - 1) as f64;
        let dy = b.height() / (request.height.max(2) - 1) as f64;

        let mut samples = Vec::with_capacity(request.width as usize * request.height as usize);
        for j in 0..request.height {
            let y = b.max_y() - j as f64 * dy;
            for i in 0..request.width {
                let x = b.min_x() + i as f64 * dx;
                let n = fbm.get([x / self.scale, y / self.scale]);
                samples.push(((n as f32 + 1.0) / 2.0).clamp(0.0, 1.0) * self.amplitude);
            }
        }

        Ok(HeightRaster {
            width: request.width,
            height: request.height,
            samples,
        })
    }

    fn imagery(&self, _request: &RasterRequest) -> Result<Option<Vec<u8>>, FetchError> {
        Ok(None)
    }
}
