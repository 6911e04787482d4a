//! Resampling decoded rasters onto the output elevation grid.
//!
//! Output values are raw meters; baseline normalization is the mesh
//! synthesizer's job. See the module docs in [`crate::dem`] for the
//! single-reference-tile limitation.

use tracing::{debug, warn};

use super::projection::select_transform;
use super::{CrsKind, DemError, LengthUnit, RasterTile};
use crate::geo::BoundingBox;

/// Common nodata sentinel in elevation products.
pub const NODATA_SENTINEL: f32 = -9999.0;

/// Conversion factor from feet to meters.
pub const FEET_TO_METERS: f32 = 0.3048;

/// Fraction of the reference tile used as the representative sub-window
/// when geographic alignment cannot be established.
const WINDOW_FRACTION: f64 = 0.5;

/// Samples elevation for the bounding box onto a dense output grid.
///
/// The returned vector is row-major, `out_width * out_height` long, row 0 at
/// the box's southern edge. Sentinel nodata samples become 0 and foot-based
/// tiles are converted to meters.
///
/// # Errors
///
/// Returns [`DemError::NoData`] when no tiles are available.
pub fn sample_elevation(
    tiles: &[RasterTile],
    bbox: &BoundingBox,
    out_width: u32,
    out_height: u32,
) -> Result<Vec<f32>, DemError> {
    let reference = tiles.first().ok_or(DemError::NoData)?;

    // Mosaicking across tiles is not implemented; sample the first tile.
    if tiles.len() > 1 {
        debug!(
            tiles = tiles.len(),
            "multiple tiles decoded; sampling the first only"
        );
    }

    let center = bbox.center();
    let lookup = match reference.crs {
        CrsKind::Projected => {
            let transform = select_transform(reference, &center);
            let (cx, cy) = transform.forward_in_unit(&center, reference.linear_unit);
            if reference.bounds.contains(cx, cy) {
                Lookup::Projected(transform)
            } else {
                warn!(
                    "projected transform lands outside tile bounds; \
                     sampling central sub-window instead"
                );
                Lookup::Window
            }
        }
        CrsKind::Geographic => {
            if reference.bounds.contains(center.lng, center.lat) {
                Lookup::Geographic
            } else {
                warn!("bbox center outside tile extent; sampling central sub-window instead");
                Lookup::Window
            }
        }
    };

    let mut grid = vec![0.0f32; out_width as usize * out_height as usize];

    for gy in 0..out_height {
        // Row 0 is the southern edge; raster row 0 is the northern edge.
        let ynorm = if out_height > 1 {
            gy as f64 / (out_height - 1) as f64
        } else {
            0.5
        };

        for gx in 0..out_width {
            let xnorm = if out_width > 1 {
                gx as f64 / (out_width - 1) as f64
            } else {
                0.5
            };

            let (px, py) = match &lookup {
                Lookup::Projected(transform) => {
                    let coord = crate::geo::Coordinate::new(
                        bbox.min_lat + ynorm * bbox.height_deg(),
                        bbox.min_lng + xnorm * bbox.width_deg(),
                    );
                    let (x, y) = transform.forward_in_unit(&coord, reference.linear_unit);
                    native_to_pixel(reference, x, y)
                }
                Lookup::Geographic => {
                    let lng = bbox.min_lng + xnorm * bbox.width_deg();
                    let lat = bbox.min_lat + ynorm * bbox.height_deg();
                    native_to_pixel(reference, lng, lat)
                }
                Lookup::Window => window_pixel(reference, xnorm, ynorm),
            };

            let raw = read_pixel(reference, px, py);
            grid[(gy * out_width + gx) as usize] = normalize_sample(reference, raw);
        }
    }

    Ok(grid)
}

/// Pixel-lookup strategy for one sampling pass.
enum Lookup {
    /// Forward-project each output cell into the tile's planar CRS.
    Projected(super::LambertConicConformal),
    /// Tile is in degrees; interpolate directly.
    Geographic,
    /// Alignment unavailable; use the central sub-window as representative.
    Window,
}

/// Maps native CRS coordinates to fractional pixel indices (north-up).
fn native_to_pixel(tile: &RasterTile, x: f64, y: f64) -> (f64, f64) {
    let px = (x - tile.bounds.min_x) / tile.bounds.width() * (tile.width - 1) as f64;
    let py = (tile.bounds.max_y - y) / tile.bounds.height() * (tile.height - 1) as f64;
    (px, py)
}

/// Maps normalized output coordinates into the tile's central sub-window.
fn window_pixel(tile: &RasterTile, xnorm: f64, ynorm: f64) -> (f64, f64) {
    let margin = (1.0 - WINDOW_FRACTION) / 2.0;
    let px = (margin + xnorm * WINDOW_FRACTION) * (tile.width - 1) as f64;
    // Output row 0 is south; raster rows count from the north.
    let py = (margin + (1.0 - ynorm) * WINDOW_FRACTION) * (tile.height - 1) as f64;
    (px, py)
}

/// Reads the nearest pixel, clamping to the tile edges.
fn read_pixel(tile: &RasterTile, px: f64, py: f64) -> f32 {
    let x = (px.round().max(0.0) as u32).min(tile.width - 1);
    let y = (py.round().max(0.0) as u32).min(tile.height - 1);
    tile.data[(y * tile.width + x) as usize]
}

/// Applies nodata replacement and unit conversion to one raw sample.
fn normalize_sample(tile: &RasterTile, raw: f32) -> f32 {
    if raw.is_nan() || raw == NODATA_SENTINEL {
        return 0.0;
    }
    if let Some(nodata) = tile.nodata {
        if (raw - nodata).abs() < f32::EPSILON {
            return 0.0;
        }
    }

    match tile.elevation_unit {
        LengthUnit::Meters => raw,
        LengthUnit::Feet => raw * FEET_TO_METERS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dem::RasterBounds;

    fn geographic_tile(data: Vec<f32>, width: u32, height: u32) -> RasterTile {
        RasterTile {
            data,
            width,
            height,
            bounds: RasterBounds {
                min_x: -97.80,
                min_y: 30.20,
                max_x: -97.70,
                max_y: 30.30,
            },
            crs: CrsKind::Geographic,
            linear_unit: LengthUnit::Meters,
            elevation_unit: LengthUnit::Meters,
            nodata: Some(NODATA_SENTINEL),
        }
    }

    fn inner_bbox() -> BoundingBox {
        BoundingBox {
            min_lat: 30.24,
            max_lat: 30.26,
            min_lng: -97.76,
            max_lng: -97.74,
        }
    }

    #[test]
    fn test_sample_no_tiles_is_no_data() {
        let result = sample_elevation(&[], &inner_bbox(), 4, 4);
        assert!(matches!(result, Err(DemError::NoData)));
    }

    #[test]
    fn test_sample_maps_sentinel_to_zero() {
        let mut data = vec![100.0f32; 16];
        data[5] = NODATA_SENTINEL;
        let tile = geographic_tile(data, 4, 4);

        let grid = sample_elevation(&[tile], &inner_bbox(), 8, 8).unwrap();
        assert!(grid.iter().any(|&v| v == 0.0));
        assert!(grid.iter().all(|&v| v == 0.0 || v == 100.0));
        assert!(!grid.iter().any(|&v| v == NODATA_SENTINEL));
    }

    #[test]
    fn test_sample_converts_feet_to_meters() {
        let mut tile = geographic_tile(vec![100.0f32; 16], 4, 4);
        tile.elevation_unit = LengthUnit::Feet;

        let grid = sample_elevation(&[tile], &inner_bbox(), 4, 4).unwrap();
        assert!(grid.iter().all(|&v| (v - 30.48).abs() < 1e-4));
    }

    #[test]
    fn test_sample_geographic_alignment_reads_correct_region() {
        // Tile covering 0.1 degree; constant per-row values so row mapping
        // is observable: northern rows high, southern rows low.
        let width = 10u32;
        let height = 10u32;
        let mut data = Vec::new();
        for row in 0..height {
            for _ in 0..width {
                data.push((height - row) as f32);
            }
        }
        let tile = geographic_tile(data, width, height);

        let grid = sample_elevation(&[tile], &inner_bbox(), 4, 4).unwrap();

        // Output row 0 is the southern edge, so values must not decrease
        // from row 0 to row 3.
        let south = grid[0];
        let north = grid[12];
        assert!(north > south, "north {} should exceed south {}", north, south);
    }

    #[test]
    fn test_sample_window_fallback_outside_tile() {
        // Bbox entirely outside the tile extent forces the sub-window path.
        let tile = geographic_tile(vec![42.0f32; 16], 4, 4);
        let far_bbox = BoundingBox {
            min_lat: 31.0,
            max_lat: 31.1,
            min_lng: -96.0,
            max_lng: -95.9,
        };

        let grid = sample_elevation(&[tile], &far_bbox, 4, 4).unwrap();
        assert!(grid.iter().all(|&v| v == 42.0));
    }

    #[test]
    fn test_sample_output_length() {
        let tile = geographic_tile(vec![1.0f32; 16], 4, 4);
        let grid = sample_elevation(&[tile], &inner_bbox(), 7, 5).unwrap();
        assert_eq!(grid.len(), 35);
    }
}
