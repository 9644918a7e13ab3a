//! Camera controller
//!
//! Owns the single [`CameraState`] and is its only writer. Fly-to targets
//! come from [`CameraController::calculate_smart_fly_to`]; manual deltas
//! come from the interaction handler once it is unlocked.

use crate::input::CameraInput;
use crate::projection::{clamp_lat, from_world, to_world, world_size, ScreenPoint};
use crate::state::{CameraConfig, CameraState, CameraUpdate, FlyTo};
use itinera_core::{Entity, GeoBounds, GeoPoint, SubscriptionHandle, Subscribers};

/// Extents smaller than this many world pixels at zoom 0 count as a point
const DEGENERATE_EXTENT_PX: f64 = 1e-9;

pub struct CameraController {
    config: CameraConfig,
    state: CameraState,
    subscribers: Subscribers<CameraUpdate>,
}

impl CameraController {
    pub fn new(config: CameraConfig) -> Self {
        let state = CameraState {
            center: GeoPoint::new(0.0, 0.0),
            zoom: config.clamp_zoom(config.min_zoom),
            viewport_width: config.viewport_width.max(1.0),
            viewport_height: config.viewport_height.max(1.0),
            padding: config.padding.max(0.0),
        };
        Self {
            config,
            state,
            subscribers: Subscribers::new(),
        }
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: FnMut(&CameraUpdate) + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    // ========================================================================
    // Framing
    // ========================================================================

    /// Zoom at which `bbox * (1 + padding_ratio)` fits the padded viewport
    ///
    /// Point-like boxes clamp to `max_zoom`, world-spanning ones to `min_zoom`.
    pub fn fit_zoom(&self, bbox: &GeoBounds, padding_ratio: f64) -> f64 {
        let tile = self.config.tile_size;
        let (x0, y0) = to_world(GeoPoint::new(bbox.west, bbox.north), tile);
        let (x1, y1) = to_world(GeoPoint::new(bbox.east, bbox.south), tile);
        let grow = 1.0 + padding_ratio.max(0.0);
        let dx = (x1 - x0).abs() * grow;
        let dy = (y1 - y0).abs() * grow;
        let (avail_w, avail_h) = self.state.usable_size();

        let scale_x = if dx > DEGENERATE_EXTENT_PX { avail_w / dx } else { f64::INFINITY };
        let scale_y = if dy > DEGENERATE_EXTENT_PX { avail_h / dy } else { f64::INFINITY };
        let raw = scale_x.min(scale_y).log2();
        let zoom = self.config.clamp_zoom(raw);
        if zoom != raw {
            tracing::debug!(requested = raw, clamped = zoom, "fit zoom clamped");
        }
        zoom
    }

    /// Midpoint of `bbox` in world pixels, so Mercator stretch is split evenly
    fn world_center(&self, bbox: &GeoBounds) -> GeoPoint {
        let tile = self.config.tile_size;
        let (x0, y0) = to_world(GeoPoint::new(bbox.west, bbox.north), tile);
        let (x1, y1) = to_world(GeoPoint::new(bbox.east, bbox.south), tile);
        let mid = from_world((x0 + x1) * 0.5, (y0 + y1) * 0.5, tile);
        GeoPoint::new(mid.lon, clamp_lat(mid.lat))
    }

    /// Center, zoom and timing that frame `bbox`
    pub fn calculate_smart_fly_to(
        &self,
        bbox: &GeoBounds,
        padding_ratio: f64,
        duration_ms: f64,
    ) -> FlyTo {
        let fly = FlyTo {
            center: self.world_center(bbox),
            zoom: self.fit_zoom(bbox, padding_ratio),
            duration_ms: duration_ms.max(0.0),
            easing: self.config.fly_easing,
        };
        tracing::debug!(
            lon = fly.center.lon,
            lat = fly.center.lat,
            zoom = fly.zoom,
            duration_ms = fly.duration_ms,
            "smart fly-to"
        );
        fly
    }

    /// Union of every route endpoint across every work, expanded by the buffer ratio
    pub fn calculate_author_bbox(&self, entity: &Entity) -> Option<GeoBounds> {
        let points = entity
            .works
            .iter()
            .flat_map(|work| work.routes.iter())
            .flat_map(|route| [route.from.as_ref(), route.to.as_ref()])
            .flatten()
            .map(|waypoint| waypoint.coord());
        GeoBounds::from_points(points).map(|b| b.expand(self.config.bbox_buffer_ratio))
    }

    /// Fly to frame `bbox` with the configured duration
    pub fn fly_to_bounds(&mut self, bbox: &GeoBounds, padding_ratio: f64) -> FlyTo {
        let fly = self.calculate_smart_fly_to(bbox, padding_ratio, self.config.fly_duration_ms);
        self.apply(&fly);
        fly
    }

    /// Fly to frame an entity's whole itinerary
    pub fn fly_to_entity(&mut self, entity: &Entity) -> Option<FlyTo> {
        let bbox = self.calculate_author_bbox(entity)?;
        Some(self.fly_to_bounds(&bbox, 0.0))
    }

    /// Fly to frame a single route, used to follow playback
    pub fn fly_to_route(&mut self, from: GeoPoint, to: GeoPoint) -> FlyTo {
        let bbox = GeoBounds::from_point(from).include(to);
        self.fly_to_bounds(&bbox, self.config.follow_padding_ratio)
    }

    /// Adopt a fly-to's final view and notify subscribers
    pub fn apply(&mut self, fly: &FlyTo) {
        self.state.center = GeoPoint::new(fly.center.lon, clamp_lat(fly.center.lat));
        self.state.zoom = self.config.clamp_zoom(fly.zoom);
        self.notify(Some(*fly));
    }

    // ========================================================================
    // Projection
    // ========================================================================

    fn world(&self) -> f64 {
        world_size(self.config.tile_size, self.state.zoom)
    }

    /// Geographic point to viewport pixels
    pub fn project(&self, p: GeoPoint) -> ScreenPoint {
        let world = self.world();
        let (x, y) = to_world(p, world);
        let (cx, cy) = to_world(self.state.center, world);
        ScreenPoint::new(
            x - cx + self.state.viewport_width * 0.5,
            y - cy + self.state.viewport_height * 0.5,
        )
    }

    /// Viewport pixels to a geographic point
    pub fn unproject(&self, s: ScreenPoint) -> GeoPoint {
        let world = self.world();
        let (cx, cy) = to_world(self.state.center, world);
        from_world(
            s.x - self.state.viewport_width * 0.5 + cx,
            s.y - self.state.viewport_height * 0.5 + cy,
            world,
        )
    }

    // ========================================================================
    // Manual deltas
    // ========================================================================

    /// Drag the map by `(dx, dy)` pixels; content follows the pointer
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        if !(dx.is_finite() && dy.is_finite()) || (dx == 0.0 && dy == 0.0) {
            return;
        }
        let world = self.world();
        let (cx, cy) = to_world(self.state.center, world);
        self.set_center_world(cx - dx, cy - dy, world);
        self.notify(None);
    }

    /// Zoom by `delta` levels keeping `anchor` (default: viewport center) fixed on screen
    pub fn zoom_by(&mut self, delta: f64, anchor: Option<ScreenPoint>) {
        if !delta.is_finite() {
            return;
        }
        let requested = self.state.zoom + delta;
        let zoom = self.config.clamp_zoom(requested);
        if zoom != requested {
            tracing::debug!(requested, clamped = zoom, "zoom clamped");
        }
        if zoom == self.state.zoom {
            return;
        }

        let anchor = anchor.unwrap_or(ScreenPoint::new(
            self.state.viewport_width * 0.5,
            self.state.viewport_height * 0.5,
        ));
        let pinned = self.unproject(anchor);
        self.state.zoom = zoom;

        let world = self.world();
        let (ax, ay) = to_world(pinned, world);
        self.set_center_world(
            ax - (anchor.x - self.state.viewport_width * 0.5),
            ay - (anchor.y - self.state.viewport_height * 0.5),
            world,
        );
        self.notify(None);
    }

    /// Apply one frame of manual input
    pub fn apply_input(&mut self, input: &CameraInput) {
        let (dx, dy) = input.drag_delta;
        self.pan_by(dx, dy);
        if input.scroll_delta != 0.0 {
            self.zoom_by(input.scroll_delta * self.config.wheel_zoom_step, input.anchor);
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        if !(width.is_finite() && height.is_finite()) {
            return;
        }
        self.state.viewport_width = width.max(1.0);
        self.state.viewport_height = height.max(1.0);
        self.notify(None);
    }

    fn set_center_world(&mut self, x: f64, y: f64, world: f64) {
        let center = from_world(x.clamp(0.0, world), y.clamp(0.0, world), world);
        self.state.center = GeoPoint::new(center.lon, clamp_lat(center.lat));
    }

    fn notify(&self, fly_to: Option<FlyTo>) {
        self.subscribers.notify(&CameraUpdate {
            state: self.state,
            fly_to,
        });
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}
