//! Forward geographic→projected coordinate transforms.
//!
//! The DEM tiles this pipeline consumes are georeferenced in the Texas
//! State Plane Central zone, a Lambert Conformal Conic projection in US
//! survey feet. The forward transform here follows the standard two-parallel
//! formulation and is exercised with two candidate ellipsoid
//! parameterizations; [`select_transform`] picks whichever lands a probe
//! point closer to a tile's own reported bounds.

use std::f64::consts::FRAC_PI_4;

use tracing::debug;

use super::{LengthUnit, RasterTile};
use crate::geo::Coordinate;

/// Meters per US survey foot.
const METERS_PER_US_FOOT: f64 = 0.304_800_609_601_219_2;

/// Reference ellipsoid parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis in meters.
    pub a: f64,
    /// Inverse flattening.
    pub inv_flattening: f64,
    /// Short display name.
    pub name: &'static str,
}

/// GRS 1980, the ellipsoid of the NAD83 geodetic datum.
pub const GRS80: Ellipsoid = Ellipsoid {
    a: 6_378_137.0,
    inv_flattening: 298.257_222_101,
    name: "GRS80",
};

/// WGS 84 reference ellipsoid.
pub const WGS84: Ellipsoid = Ellipsoid {
    a: 6_378_137.0,
    inv_flattening: 298.257_223_563,
    name: "WGS84",
};

/// Lambert Conformal Conic (two standard parallels) forward transform.
#[derive(Debug, Clone, Copy)]
pub struct LambertConicConformal {
    ellipsoid: Ellipsoid,
    e: f64,
    n: f64,
    big_f: f64,
    rho0: f64,
    lam0: f64,
    false_easting_m: f64,
    false_northing_m: f64,
}

impl LambertConicConformal {
    /// Builds a transform from zone parameters, all angles in degrees.
    pub fn new(
        ellipsoid: Ellipsoid,
        phi1_deg: f64,
        phi2_deg: f64,
        phi0_deg: f64,
        lam0_deg: f64,
        false_easting_m: f64,
        false_northing_m: f64,
    ) -> Self {
        let f = 1.0 / ellipsoid.inv_flattening;
        let e = (f * (2.0 - f)).sqrt();

        let phi1 = phi1_deg.to_radians();
        let phi2 = phi2_deg.to_radians();
        let phi0 = phi0_deg.to_radians();

        let m1 = m(phi1, e);
        let m2 = m(phi2, e);
        let t0 = t(phi0, e);
        let t1 = t(phi1, e);
        let t2 = t(phi2, e);

        let n = (m1.ln() - m2.ln()) / (t1.ln() - t2.ln());
        let big_f = m1 / (n * t1.powf(n));
        let rho0 = ellipsoid.a * big_f * t0.powf(n);

        Self {
            ellipsoid,
            e,
            n,
            big_f,
            rho0,
            lam0: lam0_deg.to_radians(),
            false_easting_m,
            false_northing_m,
        }
    }

    /// Texas State Plane Central zone (4203) on the given ellipsoid.
    ///
    /// Standard parallels 31°53′ and 30°07′, origin 29°40′N 100°20′W,
    /// false origin 700 000 m east / 3 000 000 m north.
    pub fn texas_central(ellipsoid: Ellipsoid) -> Self {
        Self::new(
            ellipsoid,
            31.0 + 53.0 / 60.0,
            30.0 + 7.0 / 60.0,
            29.0 + 40.0 / 60.0,
            -(100.0 + 20.0 / 60.0),
            700_000.0,
            3_000_000.0,
        )
    }

    /// Ellipsoid this transform was parameterized with.
    pub fn ellipsoid(&self) -> Ellipsoid {
        self.ellipsoid
    }

    /// Forward-projects a geographic coordinate to planar meters.
    pub fn forward(&self, coord: &Coordinate) -> (f64, f64) {
        let phi = coord.lat.to_radians();
        let lam = coord.lng.to_radians();

        let rho = self.ellipsoid.a * self.big_f * t(phi, self.e).powf(self.n);
        let theta = self.n * (lam - self.lam0);

        let x = self.false_easting_m + rho * theta.sin();
        let y = self.false_northing_m + self.rho0 - rho * theta.cos();
        (x, y)
    }

    /// Forward-projects into the units of the given tile.
    pub fn forward_in_unit(&self, coord: &Coordinate, unit: LengthUnit) -> (f64, f64) {
        let (x, y) = self.forward(coord);
        match unit {
            LengthUnit::Meters => (x, y),
            LengthUnit::Feet => (x / METERS_PER_US_FOOT, y / METERS_PER_US_FOOT),
        }
    }
}

/// Snyder's m: cos φ / sqrt(1 − e² sin² φ).
fn m(phi: f64, e: f64) -> f64 {
    phi.cos() / (1.0 - e * e * phi.sin() * phi.sin()).sqrt()
}

/// Snyder's t: tan(π/4 − φ/2) / [(1 − e sin φ)/(1 + e sin φ)]^(e/2).
fn t(phi: f64, e: f64) -> f64 {
    let es = e * phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}

/// Selects the transform candidate that best reproduces a tile's bounds.
///
/// Both candidate parameterizations (geodetic-datum ellipsoid and reference
/// ellipsoid) are tried; the probe coordinate is forward-projected with each
/// and the candidate landing closer to the tile's reported bounding box
/// wins. There is no authoritative CRS metadata to consult, so closeness is
/// the only available arbiter.
pub fn select_transform(tile: &RasterTile, probe: &Coordinate) -> LambertConicConformal {
    let candidates = [
        LambertConicConformal::texas_central(GRS80),
        LambertConicConformal::texas_central(WGS84),
    ];

    let mut best = candidates[0];
    let mut best_distance = f64::INFINITY;

    for candidate in candidates {
        let (x, y) = candidate.forward_in_unit(probe, tile.linear_unit);
        let distance = tile.bounds.distance_to(x, y);
        if distance < best_distance {
            best_distance = distance;
            best = candidate;
        }
    }

    debug!(
        ellipsoid = best.ellipsoid().name,
        distance = best_distance,
        "selected projection candidate"
    );
    best
}
