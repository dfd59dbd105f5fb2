//! # Texture — Image Data on the GPU, Batched Quad Submission
//!
//! [`Texture`] wraps a GL texture object plus its dimensions. Files are
//! decoded with the `image` crate and uploaded as RGBA8; nearest filtering
//! and clamp-to-edge keep pixel art crisp.
//!
//! [`QuadBatcher`] is the textured counterpart of the primitive batcher: the
//! batch key is the *bound texture* instead of the topology, so consecutive
//! quads sampling the same texture merge into one draw call and binding a
//! different texture drains the pending run first. The text renderer reuses
//! the same batcher type with its own shader — glyph quads are just textured
//! quads whose fragment program reads a coverage channel.
//!
//! Unlike the primitive batcher, the camera projection is computed and
//! uploaded at *flush* time: a run may be drained long after `begin`, and it
//! must see the camera as it is when the draw actually happens.

use glow::HasContext;

use crate::error::RenderError;

use super::Color;
use super::batch::BatchBuffer;
use super::camera::Camera;
use super::vertex::TexturedVertex;

/// Vertex capacity of the CPU-side batch, allocated once at init.
const MAX_VERTICES: usize = 65_536;

pub(crate) const TEXTURE_VERTEX_SRC: &str = include_str!("shaders/texture.vert");
pub(crate) const TEXTURE_FRAGMENT_SRC: &str = include_str!("shaders/texture.frag");

/// An immutable GPU texture. Destroy explicitly with [`Texture::destroy`];
/// the consuming signature makes use-after-destroy a compile error.
#[derive(Debug)]
pub struct Texture {
    raw: glow::Texture,
    width: u32,
    height: u32,
    channels: u32,
}

impl Texture {
    /// Decode an image file and upload it as an RGBA8 texture.
    pub fn load(gl: &glow::Context, path: &str) -> Result<Self, RenderError> {
        let img = image::open(path).map_err(|e| RenderError::resource_load(path, e))?;
        let channels = u32::from(img.color().channel_count());
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let mut texture = Self::from_pixels(gl, width, height, &rgba.into_raw())?;
        texture.channels = channels;
        log::info!("loaded texture '{path}' ({width}x{height}, {channels} channels)");
        Ok(texture)
    }

    /// Upload raw RGBA8 pixels as a texture.
    pub fn from_pixels(
        gl: &glow::Context,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<Self, RenderError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(RenderError::allocation(format!(
                "texture pixels: {width}x{height} RGBA needs {expected} bytes, got {}",
                pixels.len()
            )));
        }

        let raw = unsafe { gl.create_texture() }
            .map_err(|e| RenderError::allocation(format!("texture object: {e}")))?;

        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(raw));
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::NEAREST as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::NEAREST as i32,
            );
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(pixels)),
            );
            gl.bind_texture(glow::TEXTURE_2D, None);
        }

        Ok(Self {
            raw,
            width,
            height,
            channels: 4,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channel count of the source image (uploads are always RGBA8).
    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub(crate) fn raw(&self) -> glow::Texture {
        self.raw
    }

    /// Release the GL texture object.
    pub fn destroy(self, gl: &glow::Context) {
        unsafe { gl.delete_texture(self.raw) };
    }
}

/// Batches textured quads keyed by the bound texture. Shared between the
/// sprite surface and the text renderer (different shaders, same mechanics).
pub(crate) struct QuadBatcher {
    program: glow::Program,
    projection_loc: Option<glow::UniformLocation>,
    sampler_loc: Option<glow::UniformLocation>,
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    buffer: BatchBuffer<glow::Texture, TexturedVertex>,
    viewport: (f32, f32),
}

impl QuadBatcher {
    pub fn new(
        gl: &glow::Context,
        vertex_src: &str,
        fragment_src: &str,
        sampler_name: &str,
    ) -> Result<Self, RenderError> {
        let program = super::shader::compile_program(gl, vertex_src, fragment_src)?;
        let (projection_loc, sampler_loc) = unsafe {
            (
                gl.get_uniform_location(program, "projection"),
                gl.get_uniform_location(program, sampler_name),
            )
        };

        let vao = unsafe { gl.create_vertex_array() }
            .map_err(|e| RenderError::allocation(format!("quad vertex array: {e}")))?;
        let vbo = unsafe { gl.create_buffer() }
            .map_err(|e| RenderError::allocation(format!("quad vertex buffer: {e}")))?;

        unsafe {
            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_size(
                glow::ARRAY_BUFFER,
                (MAX_VERTICES * size_of::<TexturedVertex>()) as i32,
                glow::DYNAMIC_DRAW,
            );
            TexturedVertex::configure_attributes(gl);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            gl.bind_vertex_array(None);
        }

        Ok(Self {
            program,
            projection_loc,
            sampler_loc,
            vao,
            vbo,
            buffer: BatchBuffer::new(MAX_VERTICES),
            viewport: (0.0, 0.0),
        })
    }

    /// Start a frame: remember the viewport and reset the batch.
    pub fn begin(&mut self, width: f32, height: f32) {
        self.viewport = (width, height);
        self.buffer.reset();
    }

    /// Append quad vertices under a texture key, draining the pending run if
    /// the texture changes or capacity would overflow.
    pub fn submit(
        &mut self,
        gl: &glow::Context,
        camera: &mut Camera,
        texture: glow::Texture,
        vertices: &[TexturedVertex],
    ) {
        let projection = camera.matrix(self.viewport.0, self.viewport.1);
        let state = self.draw_state();
        self.buffer.push(texture, vertices, |run_texture, run| {
            draw_run(gl, &state, &projection, run_texture, run);
        });
    }

    /// Drain the pending run into a single draw call.
    pub fn flush(&mut self, gl: &glow::Context, camera: &mut Camera) {
        let projection = camera.matrix(self.viewport.0, self.viewport.1);
        let state = self.draw_state();
        self.buffer.drain(|run_texture, run| {
            draw_run(gl, &state, &projection, run_texture, run);
        });
    }

    /// Release GL resources (shutdown path).
    pub fn destroy(self, gl: &glow::Context) {
        unsafe {
            gl.delete_vertex_array(self.vao);
            gl.delete_buffer(self.vbo);
            gl.delete_program(self.program);
        }
    }

    fn draw_state(&self) -> DrawState {
        DrawState {
            program: self.program,
            // Cloned rather than copied: uniform locations are not `Copy` on
            // every glow backend.
            projection_loc: self.projection_loc.clone(),
            sampler_loc: self.sampler_loc.clone(),
            vao: self.vao,
            vbo: self.vbo,
        }
    }
}

/// Copyable GL handles needed inside a flush callback.
struct DrawState {
    program: glow::Program,
    projection_loc: Option<glow::UniformLocation>,
    sampler_loc: Option<glow::UniformLocation>,
    vao: glow::VertexArray,
    vbo: glow::Buffer,
}

fn draw_run(
    gl: &glow::Context,
    state: &DrawState,
    projection: &glam::Mat4,
    texture: glow::Texture,
    vertices: &[TexturedVertex],
) {
    unsafe {
        gl.enable(glow::BLEND);
        gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);

        gl.use_program(Some(state.program));
        gl.uniform_matrix_4_f32_slice(
            state.projection_loc.as_ref(),
            false,
            &projection.to_cols_array(),
        );
        gl.uniform_1_i32(state.sampler_loc.as_ref(), 0);

        gl.active_texture(glow::TEXTURE0);
        gl.bind_texture(glow::TEXTURE_2D, Some(texture));

        gl.bind_vertex_array(Some(state.vao));
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(state.vbo));
        gl.buffer_sub_data_u8_slice(glow::ARRAY_BUFFER, 0, bytemuck::cast_slice(vertices));
        gl.draw_arrays(glow::TRIANGLES, 0, vertices.len() as i32);

        gl.bind_buffer(glow::ARRAY_BUFFER, None);
        gl.bind_vertex_array(None);
        gl.use_program(None);
    }
}

/// Six vertices for an axis-aligned quad with the given UV box.
pub(crate) fn quad(
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    uv_min: (f32, f32),
    uv_max: (f32, f32),
    color: Color,
) -> [TexturedVertex; 6] {
    let c = color.to_array();
    let (u0, v0) = uv_min;
    let (u1, v1) = uv_max;
    let tl = TexturedVertex { position: [x, y], uv: [u0, v0], color: c };
    let tr = TexturedVertex { position: [x + w, y], uv: [u1, v0], color: c };
    let br = TexturedVertex { position: [x + w, y + h], uv: [u1, v1], color: c };
    let bl = TexturedVertex { position: [x, y + h], uv: [u0, v1], color: c };
    [tl, tr, br, tl, br, bl]
}

/// Six vertices for a quad rotated by `angle_deg` about a normalized origin
/// ((0.5, 0.5) = center) within the quad.
pub(crate) fn rotated_quad(
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    angle_deg: f32,
    origin: (f32, f32),
    uv_min: (f32, f32),
    uv_max: (f32, f32),
    color: Color,
) -> [TexturedVertex; 6] {
    let c = color.to_array();
    let (u0, v0) = uv_min;
    let (u1, v1) = uv_max;

    let ox = w * origin.0;
    let oy = h * origin.1;
    let (sin, cos) = angle_deg.to_radians().sin_cos();

    // Corners relative to the rotation origin: TL, TR, BR, BL.
    let corners = [(-ox, -oy), (w - ox, -oy), (w - ox, h - oy), (-ox, h - oy)];
    let uvs = [[u0, v0], [u1, v0], [u1, v1], [u0, v1]];

    let mut rotated = [TexturedVertex { position: [0.0; 2], uv: [0.0; 2], color: c }; 4];
    for (i, &(rx, ry)) in corners.iter().enumerate() {
        rotated[i] = TexturedVertex {
            position: [x + ox + rx * cos - ry * sin, y + oy + rx * sin + ry * cos],
            uv: uvs[i],
            color: c,
        };
    }

    [rotated[0], rotated[1], rotated[2], rotated[0], rotated[2], rotated[3]]
}

/// UV box for a pixel-space source rectangle within a texture of the given
/// dimensions. Degenerate or inverted source rectangles yield a degenerate/
/// inverted UV box; the rasterizer resolves those to zero coverage.
pub(crate) fn region_uvs(
    tex_w: f32,
    tex_h: f32,
    src_x: f32,
    src_y: f32,
    src_w: f32,
    src_h: f32,
) -> ((f32, f32), (f32, f32)) {
    (
        (src_x / tex_w, src_y / tex_h),
        ((src_x + src_w) / tex_w, (src_y + src_h) / tex_h),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_covers_full_uv_box() {
        let v = quad(10.0, 20.0, 30.0, 40.0, (0.0, 0.0), (1.0, 1.0), Color::WHITE);
        assert_eq!(v.len(), 6);
        assert_eq!(v[0].position, [10.0, 20.0]);
        assert_eq!(v[0].uv, [0.0, 0.0]);
        assert_eq!(v[2].position, [40.0, 60.0]);
        assert_eq!(v[2].uv, [1.0, 1.0]);
        // Shared diagonal: both triangles reuse TL and BR.
        assert_eq!(v[0].position, v[3].position);
        assert_eq!(v[2].position, v[4].position);
    }

    #[test]
    fn zero_angle_rotation_matches_plain_quad() {
        let plain = quad(5.0, 6.0, 20.0, 10.0, (0.0, 0.0), (1.0, 1.0), Color::WHITE);
        let spun = rotated_quad(
            5.0,
            6.0,
            20.0,
            10.0,
            0.0,
            (0.5, 0.5),
            (0.0, 0.0),
            (1.0, 1.0),
            Color::WHITE,
        );
        for (a, b) in plain.iter().zip(spun.iter()) {
            assert!((a.position[0] - b.position[0]).abs() < 1e-4);
            assert!((a.position[1] - b.position[1]).abs() < 1e-4);
            assert_eq!(a.uv, b.uv);
        }
    }

    #[test]
    fn rotation_pivots_about_the_origin_point() {
        // 180° about the center maps the top-left corner to the bottom-right.
        let v = rotated_quad(
            0.0,
            0.0,
            10.0,
            10.0,
            180.0,
            (0.5, 0.5),
            (0.0, 0.0),
            (1.0, 1.0),
            Color::WHITE,
        );
        assert!((v[0].position[0] - 10.0).abs() < 1e-4);
        assert!((v[0].position[1] - 10.0).abs() < 1e-4);
    }

    #[test]
    fn region_uvs_map_pixels_to_normalized_space() {
        let (uv_min, uv_max) = region_uvs(256.0, 128.0, 64.0, 32.0, 64.0, 32.0);
        assert_eq!(uv_min, (0.25, 0.25));
        assert_eq!(uv_max, (0.5, 0.5));
    }

    #[test]
    fn degenerate_sizes_build_without_panicking() {
        let zero = quad(0.0, 0.0, 0.0, 0.0, (0.0, 0.0), (1.0, 1.0), Color::WHITE);
        assert_eq!(zero[0].position, zero[2].position);

        let inverted = rotated_quad(
            0.0,
            0.0,
            -8.0,
            -4.0,
            45.0,
            (0.5, 0.5),
            (0.0, 0.0),
            (1.0, 1.0),
            Color::WHITE,
        );
        assert_eq!(inverted.len(), 6);
    }
}
