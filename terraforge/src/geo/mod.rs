//! Geographic math for polygon footprints.
//!
//! Provides the pure, deterministic helpers the pipeline builds on: bounding
//! boxes from coordinate extrema, geodesic polygon area in acres, and the
//! fixed service-region membership check. Nothing here performs I/O.

// Leading `::` disambiguates the geo crate from this module.
use ::geo::{GeodesicArea, LineString, Polygon};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Square meters per acre, used for area conversion.
const SQUARE_METERS_PER_ACRE: f64 = 4046.86;

/// A geographic coordinate in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lng: f64,
}

impl Coordinate {
    /// Creates a new coordinate.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Formats a coordinate for display with six decimal places.
pub fn format_coordinate(coord: &Coordinate) -> String {
    format!("{:.6}°, {:.6}°", coord.lat, coord.lng)
}

/// Axis-aligned geographic bounding box.
///
/// Invariant: `min_lat <= max_lat` and `min_lng <= max_lng`. Boxes produced
/// by [`bounding_box`] always satisfy this.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Returns the center point of the box.
    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// Width of the box in degrees of longitude.
    pub fn width_deg(&self) -> f64 {
        self.max_lng - self.min_lng
    }

    /// Height of the box in degrees of latitude.
    pub fn height_deg(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Returns true if the coordinate lies within the box (inclusive).
    pub fn contains(&self, coord: &Coordinate) -> bool {
        coord.lat >= self.min_lat
            && coord.lat <= self.max_lat
            && coord.lng >= self.min_lng
            && coord.lng <= self.max_lng
    }
}

/// Errors raised when a submitted polygon fails validation.
///
/// These are reported to the caller immediately; no job is created.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The polygon has fewer than three vertices.
    #[error("at least 3 coordinates required, got {0}")]
    TooFewPoints(usize),

    /// The polygon's area exceeds the configured maximum.
    #[error("area of {area:.1} acres exceeds maximum of {max:.0} acres")]
    AreaTooLarge { area: f64, max: f64 },

    /// A vertex lies outside the fixed service region.
    #[error("coordinate {0} is outside the service region")]
    OutsideServiceRegion(String),
}

/// Computes the bounding box of a polygon from its coordinate extrema.
///
/// # Errors
///
/// Returns [`ValidationError::TooFewPoints`] if the polygon has fewer than
/// three vertices.
pub fn bounding_box(polygon: &[Coordinate]) -> Result<BoundingBox, ValidationError> {
    if polygon.len() < 3 {
        return Err(ValidationError::TooFewPoints(polygon.len()));
    }

    let mut bbox = BoundingBox {
        min_lat: f64::INFINITY,
        max_lat: f64::NEG_INFINITY,
        min_lng: f64::INFINITY,
        max_lng: f64::NEG_INFINITY,
    };

    for coord in polygon {
        bbox.min_lat = bbox.min_lat.min(coord.lat);
        bbox.max_lat = bbox.max_lat.max(coord.lat);
        bbox.min_lng = bbox.min_lng.min(coord.lng);
        bbox.max_lng = bbox.max_lng.max(coord.lng);
    }

    Ok(bbox)
}

/// Computes the geodesic area of a polygon in acres.
///
/// The ring is closed automatically if the caller did not repeat the first
/// vertex. Polygons with fewer than three vertices have zero area.
pub fn area_acres(polygon: &[Coordinate]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }

    to_geo_polygon(polygon).geodesic_area_unsigned() / SQUARE_METERS_PER_ACRE
}

/// Converts a coordinate slice to a closed `geo` polygon in (lng, lat) order.
pub(crate) fn to_geo_polygon(polygon: &[Coordinate]) -> Polygon<f64> {
    let mut ring: Vec<(f64, f64)> = polygon.iter().map(|c| (c.lng, c.lat)).collect();
    if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
        if first != last {
            ring.push(first);
        }
    }
    Polygon::new(LineString::from(ring), vec![])
}

/// Rectangular latitude/longitude bounds of the supported coverage area.
///
/// The default region is the Austin coverage area of the imagery and
/// elevation services: 30.0–30.6°N, −98.2–−97.5°E.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServiceRegion {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl ServiceRegion {
    /// Creates a region from explicit bounds.
    pub const fn new(min_lat: f64, max_lat: f64, min_lng: f64, max_lng: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }

    /// Returns true if the coordinate lies within the region.
    pub fn contains(&self, coord: &Coordinate) -> bool {
        coord.lat >= self.min_lat
            && coord.lat <= self.max_lat
            && coord.lng >= self.min_lng
            && coord.lng <= self.max_lng
    }

    /// Returns true if every coordinate lies within the region.
    pub fn contains_all(&self, polygon: &[Coordinate]) -> bool {
        polygon.iter().all(|c| self.contains(c))
    }
}

impl Default for ServiceRegion {
    fn default() -> Self {
        Self::new(30.0, 30.6, -98.2, -97.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn square(lat: f64, lng: f64, half_deg: f64) -> Vec<Coordinate> {
        vec![
            Coordinate::new(lat - half_deg, lng - half_deg),
            Coordinate::new(lat - half_deg, lng + half_deg),
            Coordinate::new(lat + half_deg, lng + half_deg),
            Coordinate::new(lat + half_deg, lng - half_deg),
        ]
    }

    #[test]
    fn test_bounding_box_extrema() {
        let polygon = vec![
            Coordinate::new(30.2, -97.8),
            Coordinate::new(30.3, -97.7),
            Coordinate::new(30.25, -97.9),
        ];

        let bbox = bounding_box(&polygon).unwrap();
        assert_eq!(bbox.min_lat, 30.2);
        assert_eq!(bbox.max_lat, 30.3);
        assert_eq!(bbox.min_lng, -97.9);
        assert_eq!(bbox.max_lng, -97.7);
    }

    #[test]
    fn test_bounding_box_rejects_degenerate_polygon() {
        let two_points = vec![Coordinate::new(30.2, -97.8), Coordinate::new(30.3, -97.7)];
        assert_eq!(
            bounding_box(&two_points),
            Err(ValidationError::TooFewPoints(2))
        );
    }

    #[test]
    fn test_area_zero_for_degenerate_polygon() {
        let two_points = vec![Coordinate::new(30.2, -97.8), Coordinate::new(30.3, -97.7)];
        assert_eq!(area_acres(&two_points), 0.0);
    }

    #[test]
    fn test_area_of_two_acre_square() {
        // ~90m on a side is close to 2 acres (8094 m²).
        let polygon = square(30.27, -97.74, 0.000405);
        let area = area_acres(&polygon);
        assert!(area > 1.5 && area < 2.5, "unexpected area: {} acres", area);
    }

    #[test]
    fn test_area_invariant_under_closure() {
        let open = square(30.27, -97.74, 0.001);
        let mut closed = open.clone();
        closed.push(open[0]);

        let a = area_acres(&open);
        let b = area_acres(&closed);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_area_invariant_under_rotation() {
        let polygon = square(30.27, -97.74, 0.001);
        let area = area_acres(&polygon);

        for shift in 1..polygon.len() {
            let mut rotated = polygon.clone();
            rotated.rotate_left(shift);
            assert!((area_acres(&rotated) - area).abs() < 1e-9);
        }
    }

    #[test]
    fn test_service_region_default_bounds() {
        let region = ServiceRegion::default();
        assert!(region.contains(&Coordinate::new(30.27, -97.74)));
        assert!(!region.contains(&Coordinate::new(29.5, -97.74)));
        assert!(!region.contains(&Coordinate::new(30.27, -96.0)));
    }

    #[test]
    fn test_service_region_contains_all() {
        let region = ServiceRegion::default();
        let inside = square(30.27, -97.74, 0.001);
        let straddling = vec![
            Coordinate::new(30.27, -97.74),
            Coordinate::new(30.59, -97.74),
            Coordinate::new(30.7, -97.74),
        ];

        assert!(region.contains_all(&inside));
        assert!(!region.contains_all(&straddling));
    }

    #[test]
    fn test_format_coordinate() {
        let coord = Coordinate::new(30.2745, -97.7403);
        assert_eq!(format_coordinate(&coord), "30.274500°, -97.740300°");
    }

    proptest! {
        #[test]
        fn prop_bounding_box_contains_all_vertices(
            lats in proptest::collection::vec(29.0f64..31.0, 3..12),
            lngs in proptest::collection::vec(-99.0f64..-97.0, 3..12),
        ) {
            let n = lats.len().min(lngs.len());
            let polygon: Vec<Coordinate> = lats
                .iter()
                .zip(lngs.iter())
                .take(n)
                .map(|(&lat, &lng)| Coordinate::new(lat, lng))
                .collect();

            let bbox = bounding_box(&polygon).unwrap();
            prop_assert!(bbox.min_lat <= bbox.max_lat);
            prop_assert!(bbox.min_lng <= bbox.max_lng);
            for coord in &polygon {
                prop_assert!(bbox.contains(coord));
            }
        }
    }
}
