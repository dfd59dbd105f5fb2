//! # Render2d — Batched Immediate-Mode Drawing
//!
//! Immediate-mode draw calls are buffered CPU-side and submitted to the GPU
//! in batches. Every frame follows the same pipeline:
//!
//! ```text
//!   begin(w, h) ── camera computes projection-view ──┐
//!                                                    ▼
//!   pixel/line/rect/circle/…   ─►  PrimitiveBatcher  (key: topology)
//!   draw_texture*              ─►  QuadBatcher       (key: texture)
//!   draw_text                  ─►  QuadBatcher       (key: glyph atlas)
//!                                                    │
//!   key change / capacity / flush / end  ───────────►│ upload live range,
//!                                                    │ one draw call per run
//!                                                    ▼
//!   end() drains every batcher and unbinds the pipeline
//! ```
//!
//! Batching never reorders *within a batcher*: a pending run is always
//! drained before the draw state changes, so primitives reach the GPU in
//! submission order. The three batchers are independent streams, exactly as
//! immediate-mode engines in the Love2D tradition treat them.
//!
//! ## The Render Context
//!
//! All state lives in an explicit [`Renderer2d`] object — the camera, the
//! batch buffers, and the GL context it owns. Nothing is global, so multiple
//! contexts can coexist. Window creation and the event loop are the caller's
//! job; hand [`Renderer2d::new`] a ready [`glow::Context`].
//!
//! ```no_run
//! # fn gl_context() -> teikna::glow::Context { unimplemented!() }
//! use teikna::{Color, Renderer2d};
//!
//! let mut renderer = Renderer2d::new(gl_context())?;
//! renderer.begin(800, 600);
//! renderer.clear(Color::BLACK);
//! renderer.circle_filled(400.0, 300.0, 80.0, Color::ORANGE);
//! renderer.end();
//! # Ok::<(), teikna::RenderError>(())
//! ```

pub(crate) mod batch;
pub mod camera;
pub mod font;
pub(crate) mod primitives;
pub mod shader;
pub mod texture;
pub(crate) mod vertex;

pub use camera::Camera;
pub use font::Font;
pub use shader::ShaderProgram;
pub use texture::Texture;

use glow::HasContext;

use crate::error::RenderError;

use font::GlyphCursor;
use primitives::PrimitiveBatcher;
use texture::{QuadBatcher, quad, region_uvs, rotated_quad};

/// An RGBA color with floating-point components, conventionally in [0, 1].
/// Values are taken as-is; nothing clamps on write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const RED: Self = Self::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Self = Self::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Self = Self::rgb(0.0, 0.0, 1.0);
    pub const YELLOW: Self = Self::rgb(1.0, 1.0, 0.0);
    pub const CYAN: Self = Self::rgb(0.0, 1.0, 1.0);
    pub const MAGENTA: Self = Self::rgb(1.0, 0.0, 1.0);
    pub const ORANGE: Self = Self::rgb(1.0, 0.5, 0.0);
    pub const PURPLE: Self = Self::rgb(0.5, 0.0, 0.5);

    /// Create a color from RGB components (alpha = 1).
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create a color from RGBA components.
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color from 8-bit RGB components (alpha = 1).
    pub fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Create a color from 8-bit RGBA components.
    pub fn rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::rgba(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// Create an opaque color from a `0xRRGGBB` value.
    pub fn hex(rgb: u32) -> Self {
        Self::rgb8((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    pub(crate) fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// GL implementation strings, for diagnostics.
#[derive(Debug, Clone)]
pub struct RendererInfo {
    pub version: String,
    pub renderer: String,
    pub vendor: String,
    pub shading_language: String,
}

/// The render context: owns the GL context, the camera, and the three batch
/// pipelines. See the module docs for the frame flow.
pub struct Renderer2d {
    gl: glow::Context,
    camera: Camera,
    primitives: PrimitiveBatcher,
    sprites: QuadBatcher,
    text: QuadBatcher,
}

impl Renderer2d {
    /// Compile the built-in programs, allocate the batch buffers (reused for
    /// the renderer's lifetime), and set up blend/point state.
    pub fn new(gl: glow::Context) -> Result<Self, RenderError> {
        let primitives = PrimitiveBatcher::new(&gl)?;
        let sprites = QuadBatcher::new(
            &gl,
            texture::TEXTURE_VERTEX_SRC,
            texture::TEXTURE_FRAGMENT_SRC,
            "textureSampler",
        )?;
        let text = QuadBatcher::new(
            &gl,
            texture::TEXTURE_VERTEX_SRC,
            font::TEXT_FRAGMENT_SRC,
            "fontAtlas",
        )?;

        unsafe {
            gl.enable(glow::DEPTH_TEST);
            gl.depth_func(glow::LESS);
            gl.enable(glow::BLEND);
            gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
            gl.enable(glow::PROGRAM_POINT_SIZE);
        }

        log::debug!("renderer initialized (batched 2D pipeline)");
        Ok(Self {
            gl,
            camera: Camera::new(),
            primitives,
            sprites,
            text,
        })
    }

    /// The underlying GL context, for resource constructors and advanced use.
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// GL implementation strings, for logging and bug reports.
    pub fn info(&self) -> RendererInfo {
        unsafe {
            RendererInfo {
                version: self.gl.get_parameter_string(glow::VERSION),
                renderer: self.gl.get_parameter_string(glow::RENDERER),
                vendor: self.gl.get_parameter_string(glow::VENDOR),
                shading_language: self.gl.get_parameter_string(glow::SHADING_LANGUAGE_VERSION),
            }
        }
    }

    /// Clear the color and depth buffers.
    pub fn clear(&self, color: Color) {
        unsafe {
            self.gl.clear_color(color.r, color.g, color.b, color.a);
            self.gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
    }

    pub fn set_viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) };
    }

    // ── Frame lifecycle ─────────────────────────────────────────────────

    /// Start a frame: reset every batch and compute the camera projection
    /// for this viewport.
    pub fn begin(&mut self, width: u32, height: u32) {
        let (w, h) = (width as f32, height as f32);
        self.primitives.begin(&self.gl, &mut self.camera, w, h);
        self.sprites.begin(w, h);
        self.text.begin(w, h);
    }

    /// Drain every pending batch: primitives, then sprites, then text.
    pub fn flush(&mut self) {
        self.primitives.flush(&self.gl);
        self.sprites.flush(&self.gl, &mut self.camera);
        self.text.flush(&self.gl, &mut self.camera);
    }

    /// Flush everything and unbind the pipeline.
    pub fn end(&mut self) {
        self.primitives.end(&self.gl);
        self.sprites.flush(&self.gl, &mut self.camera);
        self.text.flush(&self.gl, &mut self.camera);
    }

    /// Suspend the camera projection for the primitive batch and draw in
    /// screen space (UI overlays). World-space geometry is flushed first.
    pub fn begin_overlay(&mut self) {
        self.primitives.begin_overlay(&self.gl);
    }

    /// Flush overlay geometry and restore the camera projection.
    pub fn end_overlay(&mut self) {
        self.primitives.end_overlay(&self.gl, &mut self.camera);
    }

    // ── Primitives ──────────────────────────────────────────────────────

    pub fn pixel(&mut self, x: f32, y: f32, color: Color) {
        self.primitives.pixel(&self.gl, x, y, color);
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, color: Color) {
        self.primitives.line(&self.gl, x1, y1, x2, y2, color);
    }

    pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.primitives.rect(&self.gl, x, y, width, height, color);
    }

    pub fn rect_filled(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.primitives.rect_filled(&self.gl, x, y, width, height, color);
    }

    /// Filled rectangle fading from `top` to `bottom`.
    pub fn rect_gradient(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        top: Color,
        bottom: Color,
    ) {
        self.primitives
            .rect_gradient(&self.gl, x, y, width, height, top, bottom);
    }

    pub fn circle(&mut self, cx: f32, cy: f32, radius: f32, color: Color) {
        self.primitives.circle(&self.gl, cx, cy, radius, color);
    }

    pub fn circle_filled(&mut self, cx: f32, cy: f32, radius: f32, color: Color) {
        self.primitives.circle_filled(&self.gl, cx, cy, radius, color);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn triangle(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x3: f32, y3: f32, color: Color) {
        self.primitives.triangle(&self.gl, x1, y1, x2, y2, x3, y3, color);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn triangle_filled(
        &mut self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        x3: f32,
        y3: f32,
        color: Color,
    ) {
        self.primitives
            .triangle_filled(&self.gl, x1, y1, x2, y2, x3, y3, color);
    }

    /// Point size for subsequent `pixel` draws, in pixels.
    pub fn set_point_size(&self, size: f32) {
        self.primitives.set_point_size(&self.gl, size);
    }

    /// Line width for subsequent line-topology draws, in pixels.
    pub fn set_line_width(&self, width: f32) {
        self.primitives.set_line_width(&self.gl, width);
    }

    // ── Textured quads ──────────────────────────────────────────────────

    pub fn draw_texture(&mut self, texture: &Texture, x: f32, y: f32, width: f32, height: f32) {
        self.draw_texture_tinted(texture, x, y, width, height, Color::WHITE);
    }

    /// Draw a quad with a per-quad RGBA multiply.
    pub fn draw_texture_tinted(
        &mut self,
        texture: &Texture,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        tint: Color,
    ) {
        let vertices = quad(x, y, width, height, (0.0, 0.0), (1.0, 1.0), tint);
        self.sprites
            .submit(&self.gl, &mut self.camera, texture.raw(), &vertices);
    }

    /// Draw a quad rotated about its center. Angle in degrees.
    pub fn draw_texture_rotated(
        &mut self,
        texture: &Texture,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        angle: f32,
    ) {
        self.draw_texture_ex(texture, x, y, width, height, angle, (0.5, 0.5), Color::WHITE);
    }

    /// Draw a quad rotated about a normalized origin within the quad, with a
    /// tint. Angle in degrees; origin (0.5, 0.5) is the center.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_texture_ex(
        &mut self,
        texture: &Texture,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        angle: f32,
        origin: (f32, f32),
        tint: Color,
    ) {
        let vertices = rotated_quad(
            x,
            y,
            width,
            height,
            angle,
            origin,
            (0.0, 0.0),
            (1.0, 1.0),
            tint,
        );
        self.sprites
            .submit(&self.gl, &mut self.camera, texture.raw(), &vertices);
    }

    /// Draw a pixel-space sub-region of a texture (sprite-sheet slicing).
    #[allow(clippy::too_many_arguments)]
    pub fn draw_texture_region(
        &mut self,
        texture: &Texture,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        src_x: f32,
        src_y: f32,
        src_width: f32,
        src_height: f32,
    ) {
        self.draw_texture_region_ex(
            texture,
            x,
            y,
            width,
            height,
            src_x,
            src_y,
            src_width,
            src_height,
            0.0,
            (0.5, 0.5),
            Color::WHITE,
        );
    }

    /// Sub-region draw with rotation and tint.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_texture_region_ex(
        &mut self,
        texture: &Texture,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        src_x: f32,
        src_y: f32,
        src_width: f32,
        src_height: f32,
        angle: f32,
        origin: (f32, f32),
        tint: Color,
    ) {
        let (uv_min, uv_max) = region_uvs(
            texture.width() as f32,
            texture.height() as f32,
            src_x,
            src_y,
            src_width,
            src_height,
        );
        let vertices = if angle == 0.0 {
            quad(x, y, width, height, uv_min, uv_max, tint)
        } else {
            rotated_quad(x, y, width, height, angle, origin, uv_min, uv_max, tint)
        };
        self.sprites
            .submit(&self.gl, &mut self.camera, texture.raw(), &vertices);
    }

    // ── Text ────────────────────────────────────────────────────────────

    /// Draw a string with `(x, y)` as the top-left of the first line. Glyph
    /// quads flow through a texture batch keyed on the font's atlas.
    pub fn draw_text(&mut self, font: &Font, text: &str, x: f32, y: f32, color: Color) {
        let mut cursor = GlyphCursor::new(font, x, y);
        for c in text.chars() {
            if let Some((glyph, gx, gy)) = cursor.advance(c) {
                let vertices = quad(gx, gy, glyph.width, glyph.height, glyph.uv_min, glyph.uv_max, color);
                self.text
                    .submit(&self.gl, &mut self.camera, font.texture(), &vertices);
            }
        }
    }

    /// Release the built-in GL programs and buffers. Resources created by
    /// the caller (textures, fonts, shader programs) have their own
    /// `destroy` and are not touched.
    pub fn destroy(self) {
        let Self {
            gl,
            camera: _,
            primitives,
            sprites,
            text,
        } = self;
        primitives.destroy(&gl);
        sprites.destroy(&gl);
        text.destroy(&gl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_constructors_normalize_8_bit_values() {
        let c = Color::rgba8(255, 128, 0, 255);
        assert_eq!(c.r, 1.0);
        assert!((c.g - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(c.b, 0.0);
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn hex_unpacks_rgb_channels() {
        let c = Color::hex(0xFF8000);
        assert_eq!(c.r, 1.0);
        assert!((c.g - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(c.b, 0.0);
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn default_color_is_opaque_white() {
        assert_eq!(Color::default(), Color::WHITE);
    }
}
