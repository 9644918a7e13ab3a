//! Web Mercator math
//!
//! World pixel space at zoom `z` is a square of `tile_size * 2^z` pixels
//! with the origin at the north-west corner (lon -180, lat ~85.05).

use itinera_core::GeoPoint;
use std::f64::consts::PI;

/// Latitude limit of the square Web Mercator world
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// A point in viewport pixels, origin top-left, y down
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &ScreenPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

pub fn world_size(tile_size: f64, zoom: f64) -> f64 {
    tile_size * zoom.exp2()
}

pub fn clamp_lat(lat: f64) -> f64 {
    lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT)
}

/// Geographic point to world pixels
pub fn to_world(p: GeoPoint, world: f64) -> (f64, f64) {
    let x = (p.lon + 180.0) / 360.0 * world;
    let phi = clamp_lat(p.lat).to_radians();
    let y = (1.0 - (phi.tan() + 1.0 / phi.cos()).ln() / PI) * 0.5 * world;
    (x, y)
}

/// World pixels back to a geographic point
pub fn from_world(x: f64, y: f64, world: f64) -> GeoPoint {
    let lon = x / world * 360.0 - 180.0;
    let n = PI * (1.0 - 2.0 * y / world);
    let lat = n.sinh().atan().to_degrees();
    GeoPoint::new(lon, lat)
}
