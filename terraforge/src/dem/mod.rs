//! Elevation raster decoding and sampling.
//!
//! DEM tiles arrive as single-band GeoTIFFs georeferenced in either a
//! geographic CRS (degrees) or a projected CRS (State Plane, usually US
//! survey feet). This module decodes the band and its georeferencing tags,
//! builds a forward geographic→projected transform when needed, and
//! resamples onto the pipeline's output grid.
//!
//! # Known limitations
//!
//! Two behaviors are deliberate replications of the system this was built
//! against, not oversights:
//!
//! - Only the **first** decoded tile is sampled; multi-tile mosaicking is
//!   not implemented. With sub-kilometer polygons and ~1 km tiles the
//!   reference tile covers the request in the common case.
//! - The projected transform is selected **empirically** between two
//!   candidate ellipsoid parameterizations by checking which one lands a
//!   probe point closer to the tile's own reported bounds, because the
//!   tiles' CRS metadata is not authoritative enough to trust outright.

mod geotiff;
mod projection;
mod sampler;

pub use geotiff::decode_geotiff;
pub use projection::{Ellipsoid, LambertConicConformal, GRS80, WGS84};
pub use sampler::{sample_elevation, FEET_TO_METERS, NODATA_SENTINEL};

use thiserror::Error;

/// Errors raised while decoding or sampling elevation rasters.
#[derive(Debug, Error)]
pub enum DemError {
    /// The TIFF container could not be decoded.
    #[error("failed to decode DEM tile: {0}")]
    Decode(String),

    /// The tile carries no usable georeferencing tags.
    #[error("DEM tile has no georeferencing (missing pixel scale or tiepoint)")]
    MissingGeoreference,

    /// The elevation band uses a sample format this pipeline cannot read.
    #[error("unsupported elevation sample format")]
    UnsupportedSampleFormat,

    /// No tile decoded successfully; the job cannot continue.
    #[error("no elevation data could be decoded for this area")]
    NoData,
}

impl From<tiff::TiffError> for DemError {
    fn from(e: tiff::TiffError) -> Self {
        DemError::Decode(e.to_string())
    }
}

/// Coordinate-system kind of a raster tile.
///
/// Detected heuristically by magnitude: bound values beyond ±180/±90 cannot
/// be degrees, so the tile must be projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrsKind {
    /// Longitude/latitude degrees.
    Geographic,
    /// Planar coordinates in a projected CRS.
    Projected,
}

/// Length unit for projected coordinates and elevation values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
    Meters,
    /// US survey feet (the common unit of State Plane DEM products).
    Feet,
}

/// Native-CRS bounding box of a raster tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl RasterBounds {
    /// Returns true if the point lies within the bounds (inclusive).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Distance from the point to the bounds; zero when inside.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        let dx = (self.min_x - x).max(0.0).max(x - self.max_x);
        let dy = (self.min_y - y).max(0.0).max(y - self.max_y);
        (dx * dx + dy * dy).sqrt()
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// A decoded single-band elevation raster.
///
/// Data is row-major and north-up: row 0 spans the tile's `max_y` edge.
/// Owned by the sampler for the duration of one job and discarded after
/// sampling.
#[derive(Debug, Clone)]
pub struct RasterTile {
    /// Elevation samples, row-major, `width * height` long.
    pub data: Vec<f32>,
    pub width: u32,
    pub height: u32,
    /// Georeferenced extent in the tile's native CRS.
    pub bounds: RasterBounds,
    /// Geographic or projected, by magnitude heuristic.
    pub crs: CrsKind,
    /// Unit of the projected coordinates (meaningless when geographic).
    pub linear_unit: LengthUnit,
    /// Unit of the elevation samples.
    pub elevation_unit: LengthUnit,
    /// Nodata sentinel declared by the tile, if any.
    pub nodata: Option<f32>,
}
