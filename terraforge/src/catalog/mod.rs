//! Elevation tile discovery and download.
//!
//! DEM tiles live in an object store with no authoritative spatial index.
//! Discovery is a prefix listing (S3 ListObjectsV2 XML); when that fails the
//! catalog falls back to scraping an HTML directory page, and when both fail
//! it reports an empty list; the caller must treat "empty" as no coverage,
//! not as success.
//!
//! Spatial filtering is heuristic: tile filenames embed their corner
//! coordinates as `n<lat*1e5>_w<|lng|*1e5>` substrings (for example
//! `stratmap21-28cm_n3027975_w09777745_dem.tif` sits near 30.27975°N,
//! 97.77745°W). The filter keeps tiles whose grid numbers fall inside the
//! bounding-box range plus a margin, falls back to the first N tiles when
//! nothing matches, and hard-caps the result for bounded download cost.
//!
//! Downloads run in fixed-size concurrent batches. A missing tile (404) is
//! logged and skipped; only the total absence of usable tiles is fatal.

use futures::future::join_all;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::CatalogConfig;
use crate::geo::BoundingBox;
use crate::http::{AsyncHttpClient, FetchError};

/// Errors raised by tile discovery and download.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No tile could be downloaded for the requested area.
    #[error("no DEM tiles found for this area; the selected location may be outside the coverage area")]
    NoData,

    /// Transport failure outside the per-tile tolerance policy.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Grid numbers inferred from a tile filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCoord {
    /// Northing substring: latitude in 1e-5 degree units.
    pub northing: i64,
    /// Westing substring: absolute longitude in 1e-5 degree units.
    pub westing: i64,
}

/// An elevation tile known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileDescriptor {
    /// Object key relative to the tile base URL.
    pub key: String,
    /// Grid numbers parsed from the key, when the name follows convention.
    pub grid: Option<GridCoord>,
}

impl TileDescriptor {
    /// Creates a descriptor, parsing grid numbers from the key.
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        let grid = parse_grid_coord(&key);
        Self { key, grid }
    }
}

/// Parses `n<digits>_w<digits>` grid numbers from a tile key.
fn parse_grid_coord(key: &str) -> Option<GridCoord> {
    // Compiled per call; tile keys number in the hundreds at most.
    let re = Regex::new(r"n(\d{6,8})_w(\d{7,9})").expect("grid coordinate pattern");
    let caps = re.captures(key)?;

    Some(GridCoord {
        northing: caps[1].parse().ok()?,
        westing: caps[2].parse().ok()?,
    })
}

/// Raw bytes of one downloaded tile, tagged with its descriptor.
#[derive(Debug, Clone)]
pub struct TileBytes {
    pub descriptor: TileDescriptor,
    pub bytes: Vec<u8>,
}

/// Catalog of remote DEM tiles.
pub struct TileCatalog<C: AsyncHttpClient> {
    http_client: C,
    config: CatalogConfig,
}

impl<C: AsyncHttpClient> TileCatalog<C> {
    /// Creates a new catalog client.
    pub fn new(http_client: C, config: CatalogConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    /// Lists candidate tiles from the object store.
    ///
    /// Tries the XML listing endpoint first, then the HTML directory page.
    /// Both failing yields an empty list; the caller decides whether that is
    /// fatal.
    pub async fn list_candidate_tiles(&self) -> Vec<TileDescriptor> {
        match self.list_from_xml().await {
            Ok(tiles) if !tiles.is_empty() => {
                info!(count = tiles.len(), "listed DEM tiles from object store");
                return tiles;
            }
            Ok(_) => warn!("object-store listing returned no tiles, trying directory scrape"),
            Err(e) => warn!(error = %e, "object-store listing failed, trying directory scrape"),
        }

        match self.list_from_directory().await {
            Ok(tiles) => {
                info!(count = tiles.len(), "listed DEM tiles from directory page");
                tiles
            }
            Err(e) => {
                warn!(error = %e, "directory scrape failed; no tile listing available");
                Vec::new()
            }
        }
    }

    /// Parses `<Key>` elements out of an S3 ListObjectsV2 response.
    async fn list_from_xml(&self) -> Result<Vec<TileDescriptor>, FetchError> {
        let response = self.http_client.get(&self.config.listing_url).await?;
        if !response.is_success() {
            return Err(FetchError::Transport {
                url: self.config.listing_url.clone(),
                reason: format!("listing returned HTTP {}", response.status),
            });
        }

        let body = String::from_utf8_lossy(&response.body);
        let re = Regex::new(r"<Key>([^<]+?\.tif)</Key>").expect("listing key pattern");

        Ok(re
            .captures_iter(&body)
            .map(|caps| {
                // Keys are bucket-relative; keep only the filename.
                let key = caps[1].rsplit('/').next().unwrap_or(&caps[1]).to_string();
                TileDescriptor::new(key)
            })
            .collect())
    }

    /// Scrapes `href` links to `.tif` files from an HTML directory page.
    async fn list_from_directory(&self) -> Result<Vec<TileDescriptor>, FetchError> {
        let response = self.http_client.get(&self.config.directory_url).await?;
        if !response.is_success() {
            return Err(FetchError::Transport {
                url: self.config.directory_url.clone(),
                reason: format!("directory page returned HTTP {}", response.status),
            });
        }

        let body = String::from_utf8_lossy(&response.body);
        let re = Regex::new(r#"href="([^"]+?\.tif)""#).expect("directory link pattern");

        Ok(re
            .captures_iter(&body)
            .map(|caps| {
                let key = caps[1].rsplit('/').next().unwrap_or(&caps[1]).to_string();
                TileDescriptor::new(key)
            })
            .collect())
    }

    /// Filters tiles to those plausibly overlapping the bounding box.
    ///
    /// Grid-number range filter with a configured margin. Falls back to the
    /// first N tiles when the heuristic matches nothing, and never returns
    /// more than `max_tiles`. Tiles without parseable grid numbers are only
    /// reachable through the fallback.
    pub fn filter_tiles_by_region(
        &self,
        tiles: &[TileDescriptor],
        bbox: &BoundingBox,
    ) -> Vec<TileDescriptor> {
        let margin = self.config.grid_margin;

        let min_northing = (bbox.min_lat * 1e5) as i64 - margin;
        let max_northing = (bbox.max_lat * 1e5) as i64 + margin;
        // Westing is the absolute value of a negative longitude, so the
        // bbox's max_lng (eastern edge) gives the smaller westing.
        let min_westing = (bbox.max_lng.abs() * 1e5) as i64 - margin;
        let max_westing = (bbox.min_lng.abs() * 1e5) as i64 + margin;

        let mut matched: Vec<TileDescriptor> = tiles
            .iter()
            .filter(|tile| {
                tile.grid.is_some_and(|grid| {
                    grid.northing >= min_northing
                        && grid.northing <= max_northing
                        && grid.westing >= min_westing
                        && grid.westing <= max_westing
                })
            })
            .cloned()
            .collect();

        if matched.is_empty() && !tiles.is_empty() {
            warn!("grid-number filter matched no tiles, falling back to first {}", self.config.max_tiles);
            matched = tiles.iter().take(self.config.max_tiles).cloned().collect();
        }

        matched.truncate(self.config.max_tiles);
        debug!(count = matched.len(), "selected candidate tiles");
        matched
    }

    /// Downloads tiles in fixed-size concurrent batches.
    ///
    /// Batches run sequentially; downloads within a batch run concurrently.
    /// A missing or failing tile is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NoData`] when every requested tile fails.
    pub async fn download_tiles(
        &self,
        tiles: &[TileDescriptor],
    ) -> Result<Vec<TileBytes>, CatalogError> {
        if tiles.is_empty() {
            return Err(CatalogError::NoData);
        }

        let batch_size = self.config.batch_size.max(1);
        let mut downloaded = Vec::new();

        for batch in tiles.chunks(batch_size) {
            let fetches = batch.iter().map(|tile| self.download_one(tile));

            for (tile, result) in batch.iter().zip(join_all(fetches).await) {
                match result {
                    Ok(bytes) => downloaded.push(TileBytes {
                        descriptor: tile.clone(),
                        bytes,
                    }),
                    Err(reason) => warn!(tile = %tile.key, %reason, "skipping DEM tile"),
                }
            }
        }

        if downloaded.is_empty() {
            return Err(CatalogError::NoData);
        }

        info!(
            requested = tiles.len(),
            downloaded = downloaded.len(),
            "downloaded DEM tiles"
        );
        Ok(downloaded)
    }

    /// Downloads a single tile, mapping any failure to a skip reason.
    async fn download_one(&self, tile: &TileDescriptor) -> Result<Vec<u8>, String> {
        let url = format!("{}{}", self.config.tile_base_url, tile.key);

        match self.http_client.get(&url).await {
            Ok(response) if response.is_success() => Ok(response.body),
            Ok(response) => Err(format!("HTTP {}", response.status)),
            Err(e) => Err(e.to_string()),
        }
    }
}
