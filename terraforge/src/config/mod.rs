//! Service configuration for the terrain pipeline.
//!
//! This module defines [`ServiceConfig`], which combines all configuration
//! needed to run the pipeline: service-region bounds, remote endpoints for
//! imagery and elevation tiles, output grid dimensions, and artifact
//! locations. It provides a unified configuration surface so all components
//! are configured consistently.

use std::path::PathBuf;

use crate::geo::ServiceRegion;

/// Default maximum polygon area in acres.
pub const DEFAULT_MAX_AREA_ACRES: f64 = 1000.0;

/// Default WMS GetMap endpoint for aerial imagery.
pub const DEFAULT_IMAGERY_ENDPOINT: &str = "https://imagery.geographic.texas.gov/server/services/StratMap/StratMap21_NCCIR_CapArea_Brazos_Kerr/ImageServer/WMSServer";

/// Default WMS layer name.
pub const DEFAULT_IMAGERY_LAYERS: &str = "StratMap21_NCCIR_CapArea_Brazos_Kerr";

/// Default object-store base URL for DEM tiles.
pub const DEFAULT_TILE_BASE_URL: &str = "https://tnris-data-warehouse.s3.us-east-1.amazonaws.com/LCD/collection/stratmap-2021-28cm-50cm-bexar-travis/dem/";

/// Default object-store listing endpoint (S3 ListObjectsV2).
pub const DEFAULT_TILE_LISTING_URL: &str = "https://tnris-data-warehouse.s3.us-east-1.amazonaws.com/?list-type=2&prefix=LCD/collection/stratmap-2021-28cm-50cm-bexar-travis/dem/";

/// Imagery request configuration.
///
/// The ground resolution is fixed rather than derived from the user's
/// bounding box; 0.35 m/px suits 15–30 cm source imagery.
#[derive(Clone, Debug)]
pub struct ImageryConfig {
    /// WMS GetMap endpoint.
    pub endpoint: String,
    /// WMS layer name.
    pub layers: String,
    /// Requested image width in pixels.
    pub width: u32,
    /// Requested image height in pixels.
    pub height: u32,
    /// Fixed ground resolution in meters per pixel.
    pub meters_per_pixel: f64,
}

impl Default for ImageryConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_IMAGERY_ENDPOINT.to_string(),
            layers: DEFAULT_IMAGERY_LAYERS.to_string(),
            width: 1024,
            height: 1024,
            meters_per_pixel: 0.35,
        }
    }
}

/// Elevation tile catalog configuration.
#[derive(Clone, Debug)]
pub struct CatalogConfig {
    /// Object-store listing endpoint returning XML keys.
    pub listing_url: String,
    /// Directory page scraped for tile links when the listing fails.
    pub directory_url: String,
    /// Base URL for per-tile GETs; tile keys are appended directly.
    pub tile_base_url: String,
    /// Maximum number of tiles to download per job.
    pub max_tiles: usize,
    /// Number of concurrent downloads per batch.
    pub batch_size: usize,
    /// Margin added to the grid-number range filter, in 1e-5 degree units.
    pub grid_margin: i64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_TILE_LISTING_URL.to_string(),
            directory_url: DEFAULT_TILE_BASE_URL.to_string(),
            tile_base_url: DEFAULT_TILE_BASE_URL.to_string(),
            max_tiles: 5,
            batch_size: 3,
            grid_margin: 500,
        }
    }
}

/// Vertex-grid scale factors applied during mesh synthesis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshScale {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for MeshScale {
    fn default() -> Self {
        Self {
            x: 1.0,
            y: 1.0,
            z: 1.0,
        }
    }
}

/// Top-level configuration for the terrain pipeline.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Coverage area; submissions outside it are rejected.
    pub region: ServiceRegion,
    /// Maximum polygon area in acres.
    pub max_area_acres: f64,
    /// Imagery request settings.
    pub imagery: ImageryConfig,
    /// Elevation tile catalog settings.
    pub catalog: CatalogConfig,
    /// Output elevation grid width in samples.
    pub grid_width: u32,
    /// Output elevation grid height in samples.
    pub grid_height: u32,
    /// Mesh scale factors.
    pub scale: MeshScale,
    /// When true, vertices outside the input polygon are flattened to the
    /// baseline, producing a skirt around the selected shape. Off by default
    /// because it introduces visible discontinuities at polygon edges.
    pub mask_to_polygon: bool,
    /// Directory that receives one subdirectory of artifacts per job.
    pub output_dir: PathBuf,
    /// URI prefix under which artifacts are served to the viewer.
    pub public_base: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            region: ServiceRegion::default(),
            max_area_acres: DEFAULT_MAX_AREA_ACRES,
            imagery: ImageryConfig::default(),
            catalog: CatalogConfig::default(),
            grid_width: 128,
            grid_height: 128,
            scale: MeshScale::default(),
            mask_to_polygon: false,
            output_dir: PathBuf::from("terrain"),
            public_base: "/terrain".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the maximum allowed polygon area.
    pub fn with_max_area_acres(mut self, acres: f64) -> Self {
        self.max_area_acres = acres;
        self
    }

    /// Set the output elevation grid dimensions.
    pub fn with_grid_size(mut self, width: u32, height: u32) -> Self {
        self.grid_width = width;
        self.grid_height = height;
        self
    }

    /// Enable or disable polygon masking.
    pub fn with_polygon_mask(mut self, enabled: bool) -> Self {
        self.mask_to_polygon = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_service_limits() {
        let config = ServiceConfig::default();
        assert_eq!(config.max_area_acres, 1000.0);
        assert_eq!(config.catalog.max_tiles, 5);
        assert_eq!(config.catalog.batch_size, 3);
        assert_eq!(config.grid_width, 128);
        assert!(!config.mask_to_polygon);
    }

    #[test]
    fn test_builder_methods() {
        let config = ServiceConfig::default()
            .with_output_dir("/tmp/terrain")
            .with_max_area_acres(50.0)
            .with_grid_size(64, 64)
            .with_polygon_mask(true);

        assert_eq!(config.output_dir, PathBuf::from("/tmp/terrain"));
        assert_eq!(config.max_area_acres, 50.0);
        assert_eq!(config.grid_width, 64);
        assert!(config.mask_to_polygon);
    }
}
