//! Geographic primitives
//!
//! Longitude/latitude points, bounding boxes and great-circle helpers.
//! Every angle at the public surface is in degrees; conversions to radians
//! happen internally.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine distance
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// A geographic coordinate in degrees
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Check that both components are finite and inside the valid ranges
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }

    /// Great-circle distance to `other` in kilometres
    pub fn haversine_km(&self, other: &GeoPoint) -> f64 {
        haversine_km(*self, *other)
    }

    /// Unit vector on the sphere (x toward lon=0/lat=0, z toward the north pole)
    pub fn to_unit_vector(&self) -> [f64; 3] {
        let lon = self.lon.to_radians();
        let lat = self.lat.to_radians();
        let cos_lat = lat.cos();
        [cos_lat * lon.cos(), cos_lat * lon.sin(), lat.sin()]
    }

    /// Inverse of [`GeoPoint::to_unit_vector`]. The input does not need to be normalized.
    pub fn from_vector(v: [f64; 3]) -> Self {
        let [x, y, z] = v;
        let hyp = (x * x + y * y).sqrt();
        Self {
            lon: y.atan2(x).to_degrees(),
            lat: z.atan2(hyp).to_degrees(),
        }
    }
}

/// Great-circle distance between two points in kilometres
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat * 0.5).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon * 0.5).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Central angle between two points in radians
pub fn central_angle(a: GeoPoint, b: GeoPoint) -> f64 {
    haversine_km(a, b) / EARTH_RADIUS_KM
}

/// Axis-aligned geographic bounding box
///
/// Boxes never wrap the antimeridian; `west <= east` and `south <= north`
/// always hold for boxes built through the constructors below.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoBounds {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west: west.min(east),
            south: south.min(north),
            east: west.max(east),
            north: south.max(north),
        }
    }

    /// A zero-area box around a single point
    pub fn from_point(p: GeoPoint) -> Self {
        Self {
            west: p.lon,
            south: p.lat,
            east: p.lon,
            north: p.lat,
        }
    }

    /// Smallest box containing every point, `None` for an empty iterator
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = GeoPoint>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self::from_point(first), |acc, p| acc.include(p)))
    }

    /// Grow the box to contain `p`
    pub fn include(mut self, p: GeoPoint) -> Self {
        self.west = self.west.min(p.lon);
        self.east = self.east.max(p.lon);
        self.south = self.south.min(p.lat);
        self.north = self.north.max(p.lat);
        self
    }

    pub fn union(&self, other: &GeoBounds) -> Self {
        Self {
            west: self.west.min(other.west),
            south: self.south.min(other.south),
            east: self.east.max(other.east),
            north: self.north.max(other.north),
        }
    }

    /// Expand each side by `ratio` of the box's span, clamped to the globe
    pub fn expand(&self, ratio: f64) -> Self {
        let dx = self.width() * ratio * 0.5;
        let dy = self.height() * ratio * 0.5;
        Self {
            west: (self.west - dx).max(-180.0),
            south: (self.south - dy).max(-90.0),
            east: (self.east + dx).min(180.0),
            north: (self.north + dy).min(90.0),
        }
    }

    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new((self.west + self.east) * 0.5, (self.south + self.north) * 0.5)
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        (self.west..=self.east).contains(&p.lon) && (self.south..=self.north).contains(&p.lat)
    }
}
