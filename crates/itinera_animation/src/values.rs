//! Animatable value types
//!
//! Provides traits and implementations for values that can be animated:
//! linear interpolation for scalars and colors, spherical (great-circle)
//! interpolation for geographic points.

use itinera_core::{central_angle, Color, GeoPoint};

/// Trait for values that can be linearly interpolated
pub trait Interpolate: Clone {
    /// Linearly interpolate between self and other by factor t (0.0 to 1.0)
    fn lerp(&self, other: &Self, t: f64) -> Self;

    /// Check if two values are approximately equal (for settling detection)
    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool;
}

/// Trait for values that use spherical interpolation
pub trait SphericalInterpolate: Clone {
    /// Spherically interpolate between self and other by factor t (0.0 to 1.0)
    fn slerp(&self, other: &Self, t: f64) -> Self;

    /// Check if two values are approximately equal
    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool;
}

// ============================================================================
// Scalar Implementations
// ============================================================================

impl Interpolate for f64 {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        self + (other - self) * t
    }

    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        (self - other).abs() < epsilon
    }
}

impl Interpolate for f32 {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        self + (other - self) * t as f32
    }

    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        ((self - other).abs() as f64) < epsilon
    }
}

// ============================================================================
// Color Implementation
// ============================================================================

impl Interpolate for Color {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        Color::lerp(self, other, t as f32)
    }

    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        let eps = epsilon as f32;
        (self.r - other.r).abs() < eps
            && (self.g - other.g).abs() < eps
            && (self.b - other.b).abs() < eps
            && (self.a - other.a).abs() < eps
    }
}

// ============================================================================
// GeoPoint Implementations
// ============================================================================

/// Planar lon/lat interpolation, useful for short hops on a flat projection
impl Interpolate for GeoPoint {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        GeoPoint::new(self.lon.lerp(&other.lon, t), self.lat.lerp(&other.lat, t))
    }

    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        (self.lon - other.lon).abs() < epsilon && (self.lat - other.lat).abs() < epsilon
    }
}

/// Great-circle interpolation
impl SphericalInterpolate for GeoPoint {
    fn slerp(&self, other: &Self, t: f64) -> Self {
        let omega = central_angle(*self, *other);
        if omega < 1e-12 {
            return *self;
        }

        let t = t.clamp(0.0, 1.0);
        if t <= 0.0 {
            return *self;
        }
        if t >= 1.0 {
            return *other;
        }

        let a = self.to_unit_vector();
        let b = other.to_unit_vector();
        let sin_omega = omega.sin();

        // Antipodal points have no unique great circle; fall back to planar
        if sin_omega.abs() < 1e-9 {
            return Interpolate::lerp(self, other, t);
        }

        let wa = ((1.0 - t) * omega).sin() / sin_omega;
        let wb = (t * omega).sin() / sin_omega;
        GeoPoint::from_vector([
            wa * a[0] + wb * b[0],
            wa * a[1] + wb * b[1],
            wa * a[2] + wb * b[2],
        ])
    }

    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        Interpolate::approx_eq(self, other, epsilon)
    }
}
