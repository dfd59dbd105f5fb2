//! # Camera — 2D View Transform and Coordinate Conversion
//!
//! The camera owns the 2D view state (position, zoom, rotation in degrees)
//! and produces the combined projection-view matrix every batcher uploads as
//! its `projection` uniform. The view transform pivots around the viewport
//! center:
//!
//! ```text
//! V = T(w/2, h/2) · R(θ) · S(zoom) · T(−x − w/2, −y − h/2)
//! P = ortho(0..w, h..0, −1..1)          (top-left origin, Y down)
//! matrix = P · V                        (expanded to a closed form below)
//! ```
//!
//! ## Call-order precondition
//!
//! [`Camera::matrix`] caches the viewport dimensions it was handed, and
//! [`Camera::screen_to_world`] / [`Camera::world_to_screen`] read that cache.
//! Calling a conversion before the first `matrix` call of a session uses a
//! zero-sized viewport and yields meaningless coordinates. The renderer
//! computes the matrix at `begin`, so any conversion made inside a frame is
//! well-defined; standalone users must call `matrix` themselves first.
//!
//! The inverse mapping exploits that the rotation block is orthonormal
//! (inverse = transpose), so no general 4×4 inverse is ever computed.

use glam::{Mat4, Vec2};

/// 2D camera: position, zoom, rotation, and the last-seen viewport.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec2,
    zoom: f32,
    rotation: f32,
    viewport: Vec2,
}

impl Camera {
    /// Identity view: origin position, zoom 1, no rotation.
    pub fn new() -> Self {
        Self {
            position: Vec2::ZERO,
            zoom: 1.0,
            rotation: 0.0,
            viewport: Vec2::ZERO,
        }
    }

    /// Restore the identity view. The cached viewport is left untouched so
    /// coordinate conversions keep working after a mid-session reset.
    pub fn reset(&mut self) {
        self.position = Vec2::ZERO;
        self.zoom = 1.0;
        self.rotation = 0.0;
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.position = Vec2::new(x, y);
    }

    /// Move the camera relative to its current position.
    pub fn move_by(&mut self, dx: f32, dy: f32) {
        self.position += Vec2::new(dx, dy);
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Set the zoom factor. Non-positive values are ignored and the prior
    /// zoom is retained.
    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom > 0.0 {
            self.zoom = zoom;
        }
    }

    /// Rotation in degrees.
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Set the rotation in degrees. Any value is accepted; nothing wraps.
    pub fn set_rotation(&mut self, degrees: f32) {
        self.rotation = degrees;
    }

    /// Center the view on a world point for the given viewport.
    pub fn look_at(&mut self, x: f32, y: f32, viewport_w: f32, viewport_h: f32) {
        self.position = Vec2::new(x - viewport_w * 0.5, y - viewport_h * 0.5);
    }

    /// Compute the combined projection-view matrix for a viewport, caching
    /// the viewport dimensions for later coordinate conversions.
    pub fn matrix(&mut self, viewport_w: f32, viewport_h: f32) -> Mat4 {
        self.viewport = Vec2::new(viewport_w, viewport_h);

        let (sw, sh) = (viewport_w, viewport_h);
        let z = self.zoom;
        let (s, c) = self.rotation.to_radians().sin_cos();
        let (cx, cy) = (self.position.x, self.position.y);

        // View translation, combining the camera offset and the centering
        // pivot, folded through rotation and zoom.
        let tx = z * (s * (cy + sh * 0.5) - c * (cx + sw * 0.5));
        let ty = z * (-s * (cx + sw * 0.5) - c * (cy + sh * 0.5));

        Mat4::from_cols_array(&[
            2.0 * z * c / sw,
            -2.0 * z * s / sh,
            0.0,
            0.0,
            -2.0 * z * s / sw,
            -2.0 * z * c / sh,
            0.0,
            0.0,
            0.0,
            0.0,
            -1.0,
            0.0,
            2.0 * tx / sw,
            -2.0 * ty / sh,
            0.0,
            1.0,
        ])
    }

    /// Map a screen-space point to world space using the viewport cached by
    /// the last [`Camera::matrix`] call.
    pub fn screen_to_world(&self, sx: f32, sy: f32) -> Vec2 {
        let (sw, sh) = (self.viewport.x, self.viewport.y);
        let z = self.zoom;
        let (s, c) = self.rotation.to_radians().sin_cos();

        // Undo the centering translation.
        let dx = sx - sw * 0.5;
        let dy = sy - sh * 0.5;

        // Undo rotation (transpose) and zoom.
        let ux = (dx * c + dy * s) / z;
        let uy = (-dx * s + dy * c) / z;

        Vec2::new(
            ux + sw * 0.5 + self.position.x,
            uy + sh * 0.5 + self.position.y,
        )
    }

    /// Map a world-space point to screen space using the viewport cached by
    /// the last [`Camera::matrix`] call.
    pub fn world_to_screen(&self, wx: f32, wy: f32) -> Vec2 {
        let (sw, sh) = (self.viewport.x, self.viewport.y);
        let z = self.zoom;
        let (s, c) = self.rotation.to_radians().sin_cos();

        let ux = (wx - self.position.x - sw * 0.5) * z;
        let uy = (wy - self.position.y - sh * 0.5) * z;

        Vec2::new(ux * c - uy * s + sw * 0.5, ux * s + uy * c + sh * 0.5)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_matrix_is_the_plain_orthographic_projection() {
        let mut camera = Camera::new();
        camera.set_position(31.0, -7.0);
        camera.set_zoom(2.0);
        camera.set_rotation(45.0);
        camera.reset();

        let m = camera.matrix(800.0, 600.0);
        let ortho = Mat4::orthographic_rh_gl(0.0, 800.0, 600.0, 0.0, -1.0, 1.0);
        assert!(m.abs_diff_eq(ortho, 1e-5), "{m} != {ortho}");
    }

    #[test]
    fn screen_world_round_trip() {
        let mut camera = Camera::new();
        camera.set_position(120.0, -45.0);
        camera.set_zoom(2.5);
        camera.set_rotation(33.0);
        camera.matrix(800.0, 600.0);

        for &(wx, wy) in &[(0.0, 0.0), (400.0, 300.0), (-512.3, 17.75), (1e4, -1e4)] {
            let screen = camera.world_to_screen(wx, wy);
            let world = camera.screen_to_world(screen.x, screen.y);
            assert!((world.x - wx).abs() < 1e-2, "x: {} vs {wx}", world.x);
            assert!((world.y - wy).abs() < 1e-2, "y: {} vs {wy}", world.y);
        }
    }

    #[test]
    fn non_positive_zoom_is_ignored() {
        let mut camera = Camera::new();
        camera.set_zoom(3.0);
        camera.set_zoom(0.0);
        camera.set_zoom(-1.5);
        assert_eq!(camera.zoom(), 3.0);
    }

    #[test]
    fn look_at_centers_the_target() {
        let mut camera = Camera::new();
        camera.look_at(500.0, 300.0, 800.0, 600.0);
        assert_eq!(camera.position(), Vec2::new(100.0, 0.0));

        camera.matrix(800.0, 600.0);
        let screen = camera.world_to_screen(500.0, 300.0);
        assert!((screen.x - 400.0).abs() < 1e-4);
        assert!((screen.y - 300.0).abs() < 1e-4);
    }

    #[test]
    fn move_by_is_relative() {
        let mut camera = Camera::new();
        camera.set_position(10.0, 20.0);
        camera.move_by(-4.0, 6.0);
        assert_eq!(camera.position(), Vec2::new(6.0, 26.0));
    }

    #[test]
    fn matrix_applies_zoom_about_viewport_center() {
        let mut camera = Camera::new();
        camera.set_zoom(2.0);
        camera.matrix(800.0, 600.0);

        // The viewport center is the zoom pivot and must stay fixed.
        let center = camera.world_to_screen(400.0, 300.0);
        assert!((center.x - 400.0).abs() < 1e-4);
        assert!((center.y - 300.0).abs() < 1e-4);

        // A point 100px right of center lands 200px right of center at 2x.
        let p = camera.world_to_screen(500.0, 300.0);
        assert!((p.x - 600.0).abs() < 1e-3);
    }
}
