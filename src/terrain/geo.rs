//! Projected bounds and resolution tiers for terrain tiles.

use bevy::prelude::*;
use thiserror::Error;

/// Rejected tile bounds. Indicates a bug in whatever computed them.
#[derive(Debug, Error, PartialEq)]
pub enum BoundsError {
    /// `max_x <= min_x`, or a non-finite coordinate.
    #[error("tile bounds have non-positive width: min_x {min_x}, max_x {max_x}")]
    Width {
        /// Western edge.
        min_x: f64,
        /// Eastern edge.
        max_x: f64,
    },
    /// `max_y <= min_y`, or a non-finite coordinate.
    #[error("tile bounds have non-positive height: min_y {min_y}, max_y {max_y}")]
    Height {
        /// Southern edge.
        min_y: f64,
        /// Northern edge.
        max_y: f64,
    },
}

/// Axis-aligned rectangle in a projected CRS (meters).
///
/// `x` is easting and maps to world X, `y` is northing and maps to world Z.
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct GeoBounds {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl GeoBounds {
    /// Validates and builds bounds. Width and height must be strictly positive.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, BoundsError> {
        // NaN fails every comparison, so it lands in the error branches.
        let width_ok = max_x - min_x > 0.0 && min_x.is_finite() && max_x.is_finite();
        if !width_ok {
            return Err(BoundsError::Width { min_x, max_x });
        }
        let height_ok = max_y - min_y > 0.0 && min_y.is_finite() && max_y.is_finite();
        if !height_ok {
            return Err(BoundsError::Height { min_y, max_y });
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    /// Western edge.
    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    /// Southern edge.
    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    /// Eastern edge.
    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    /// Northern edge.
    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    /// East-west extent in meters.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// North-south extent in meters.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Center point as `(x, y)`.
    pub fn center(&self) -> (f64, f64) {
        (
            self.min_x + self.width() / 2.0,
            self.min_y + self.height() / 2.0,
        )
    }
}

/// Height sample spacing a tile requests and renders at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Reflect)]
pub enum ResolutionTier {
    /// One sample every 0.5 m.
    #[default]
    Fine,
    /// One sample every 5 m.
    Coarse,
}

impl ResolutionTier {
    /// Meters between neighboring samples.
    pub fn meters(self) -> f64 {
        match self {
            Self::Fine => 0.5,
            Self::Coarse => 5.0,
        }
    }

    /// Inverse of [`Self::meters`].
    pub fn samples_per_meter(self) -> f64 {
        1.0 / self.meters()
    }

    /// WCS coverage serving this tier's native density.
    pub fn coverage(self) -> &'static str {
        match self {
            Self::Fine => "ahn3_05m_dsm",
            Self::Coarse => "ahn3_5m_dsm",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_bounds_report_extent_and_center() {
        let b = GeoBounds::new(100.0, 200.0, 350.0, 450.0).unwrap();
        assert_eq!(b.width(), 250.0);
        assert_eq!(b.height(), 250.0);
        assert_eq!(b.center(), (225.0, 325.0));
    }

    #[test]
    fn zero_width_is_rejected() {
        assert_eq!(
            GeoBounds::new(10.0, 0.0, 10.0, 5.0),
            Err(BoundsError::Width {
                min_x: 10.0,
                max_x: 10.0
            })
        );
    }

    #[test]
    fn negative_height_is_rejected() {
        assert!(matches!(
            GeoBounds::new(0.0, 5.0, 10.0, 1.0),
            Err(BoundsError::Height { .. })
        ));
    }

    #[test]
    fn nan_and_infinite_edges_are_rejected() {
        assert!(GeoBounds::new(f64::NAN, 0.0, 1.0, 1.0).is_err());
        assert!(GeoBounds::new(0.0, 0.0, f64::INFINITY, 1.0).is_err());
        assert!(GeoBounds::new(0.0, 0.0, 1.0, f64::NAN).is_err());
    }

    #[test]
    fn tiers_pick_matching_coverage() {
        assert_eq!(ResolutionTier::Fine.samples_per_meter(), 2.0);
        assert_eq!(ResolutionTier::Coarse.samples_per_meter(), 0.2);
        assert_eq!(ResolutionTier::Fine.coverage(), "ahn3_05m_dsm");
        assert_eq!(ResolutionTier::Coarse.coverage(), "ahn3_5m_dsm");
    }
}
