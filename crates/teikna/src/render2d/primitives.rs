//! # Primitives — Colored Point/Line/Triangle Batching
//!
//! Accumulates position+color vertices and submits one `glDrawArrays` per
//! contiguous topology run. Shapes decompose on the CPU:
//!
//! - `pixel` → one point (offset by +0.5 to hit the pixel center)
//! - `line`, `rect`, `circle`, `triangle` → line segments
//! - `*_filled`, `rect_gradient` → triangles
//!
//! Drawing a point after a run of lines (or any other topology switch)
//! drains the pending run first, so submission order is preserved. Circle
//! tessellation is a fixed function of the radius — the segment table must
//! stay exact for visual parity across ports of the same scenes.
//!
//! ## Overlay Mode
//!
//! `begin_overlay` drains the world-space batch and swaps the projection
//! uniform for a plain viewport orthographic matrix, so UI geometry can be
//! drawn in screen space; `end_overlay` drains again and restores the camera
//! projection. Only this batcher participates — sprite and text batches
//! compute their projection at flush time from the camera.

use glow::HasContext;

use crate::error::RenderError;

use super::Color;
use super::batch::BatchBuffer;
use super::camera::Camera;
use super::vertex::PrimitiveVertex;

/// Vertex capacity of the CPU-side batch, allocated once at init.
const MAX_VERTICES: usize = 65_536;

const VERTEX_SRC: &str = include_str!("shaders/primitive.vert");
const FRAGMENT_SRC: &str = include_str!("shaders/primitive.frag");

/// GL draw mode for the pending run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Topology {
    Points,
    Lines,
    Triangles,
}

impl Topology {
    fn gl_mode(self) -> u32 {
        match self {
            Topology::Points => glow::POINTS,
            Topology::Lines => glow::LINES,
            Topology::Triangles => glow::TRIANGLES,
        }
    }
}

/// Segment count for circle tessellation, as a step function of the radius.
pub(crate) fn circle_segments(radius: f32) -> u32 {
    if radius < 10.0 {
        16
    } else if radius < 50.0 {
        32
    } else {
        64
    }
}

pub(crate) struct PrimitiveBatcher {
    program: glow::Program,
    projection_loc: Option<glow::UniformLocation>,
    point_size_loc: Option<glow::UniformLocation>,
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    buffer: BatchBuffer<Topology, PrimitiveVertex>,
    viewport: (f32, f32),
}

impl PrimitiveBatcher {
    pub fn new(gl: &glow::Context) -> Result<Self, RenderError> {
        let program = super::shader::compile_program(gl, VERTEX_SRC, FRAGMENT_SRC)?;
        let (projection_loc, point_size_loc) = unsafe {
            (
                gl.get_uniform_location(program, "projection"),
                gl.get_uniform_location(program, "pointSize"),
            )
        };

        let vao = unsafe { gl.create_vertex_array() }
            .map_err(|e| RenderError::allocation(format!("primitive vertex array: {e}")))?;
        let vbo = unsafe { gl.create_buffer() }
            .map_err(|e| RenderError::allocation(format!("primitive vertex buffer: {e}")))?;

        unsafe {
            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_size(
                glow::ARRAY_BUFFER,
                (MAX_VERTICES * size_of::<PrimitiveVertex>()) as i32,
                glow::DYNAMIC_DRAW,
            );
            PrimitiveVertex::configure_attributes(gl);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            gl.bind_vertex_array(None);

            // Default point size; callers override through set_point_size.
            gl.use_program(Some(program));
            gl.uniform_1_f32(point_size_loc.as_ref(), 1.0);
            gl.use_program(None);
        }

        Ok(Self {
            program,
            projection_loc,
            point_size_loc,
            vao,
            vbo,
            buffer: BatchBuffer::new(MAX_VERTICES),
            viewport: (0.0, 0.0),
        })
    }

    /// Start a frame: reset the batch and upload the camera projection.
    pub fn begin(&mut self, gl: &glow::Context, camera: &mut Camera, width: f32, height: f32) {
        self.viewport = (width, height);
        self.buffer.reset();
        self.upload_projection(gl, &camera.matrix(width, height));
    }

    /// Drain the pending run into a single draw call.
    pub fn flush(&mut self, gl: &glow::Context) {
        let (program, vao, vbo) = (self.program, self.vao, self.vbo);
        self.buffer
            .drain(|topology, vertices| draw_run(gl, program, vao, vbo, topology, vertices));
    }

    /// Flush and unbind the pipeline.
    pub fn end(&mut self, gl: &glow::Context) {
        self.flush(gl);
        unsafe { gl.use_program(None) };
    }

    /// Switch to a fixed screen-space projection for UI geometry, draining
    /// any pending world-space run first.
    pub fn begin_overlay(&mut self, gl: &glow::Context) {
        self.flush(gl);
        let (w, h) = self.viewport;
        self.upload_projection(gl, &glam::Mat4::orthographic_rh_gl(0.0, w, h, 0.0, -1.0, 1.0));
    }

    /// Drain the UI run and restore the camera projection.
    pub fn end_overlay(&mut self, gl: &glow::Context, camera: &mut Camera) {
        self.flush(gl);
        let (w, h) = self.viewport;
        self.upload_projection(gl, &camera.matrix(w, h));
    }

    pub fn set_point_size(&self, gl: &glow::Context, size: f32) {
        unsafe {
            gl.use_program(Some(self.program));
            gl.uniform_1_f32(self.point_size_loc.as_ref(), size);
        }
    }

    pub fn set_line_width(&self, gl: &glow::Context, width: f32) {
        unsafe { gl.line_width(width) };
    }

    pub fn pixel(&mut self, gl: &glow::Context, x: f32, y: f32, color: Color) {
        let v = [vertex(x + 0.5, y + 0.5, color)];
        self.submit(gl, Topology::Points, &v);
    }

    pub fn line(&mut self, gl: &glow::Context, x1: f32, y1: f32, x2: f32, y2: f32, color: Color) {
        let v = [vertex(x1, y1, color), vertex(x2, y2, color)];
        self.submit(gl, Topology::Lines, &v);
    }

    pub fn rect(&mut self, gl: &glow::Context, x: f32, y: f32, w: f32, h: f32, color: Color) {
        let v = rect_outline_vertices(x, y, w, h, color);
        self.submit(gl, Topology::Lines, &v);
    }

    pub fn rect_filled(
        &mut self,
        gl: &glow::Context,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Color,
    ) {
        let v = rect_fill_vertices(x, y, w, h, color, color);
        self.submit(gl, Topology::Triangles, &v);
    }

    /// Filled rectangle interpolating from a top color to a bottom color.
    pub fn rect_gradient(
        &mut self,
        gl: &glow::Context,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        top: Color,
        bottom: Color,
    ) {
        let v = rect_fill_vertices(x, y, w, h, top, bottom);
        self.submit(gl, Topology::Triangles, &v);
    }

    pub fn circle(&mut self, gl: &glow::Context, cx: f32, cy: f32, radius: f32, color: Color) {
        let v = circle_outline_vertices(cx, cy, radius, color);
        self.submit(gl, Topology::Lines, &v);
    }

    pub fn circle_filled(
        &mut self,
        gl: &glow::Context,
        cx: f32,
        cy: f32,
        radius: f32,
        color: Color,
    ) {
        let v = circle_fill_vertices(cx, cy, radius, color);
        self.submit(gl, Topology::Triangles, &v);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn triangle(
        &mut self,
        gl: &glow::Context,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        x3: f32,
        y3: f32,
        color: Color,
    ) {
        let v = [
            vertex(x1, y1, color),
            vertex(x2, y2, color),
            vertex(x2, y2, color),
            vertex(x3, y3, color),
            vertex(x3, y3, color),
            vertex(x1, y1, color),
        ];
        self.submit(gl, Topology::Lines, &v);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn triangle_filled(
        &mut self,
        gl: &glow::Context,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        x3: f32,
        y3: f32,
        color: Color,
    ) {
        let v = [vertex(x1, y1, color), vertex(x2, y2, color), vertex(x3, y3, color)];
        self.submit(gl, Topology::Triangles, &v);
    }

    /// Release GL resources (shutdown path).
    pub fn destroy(self, gl: &glow::Context) {
        unsafe {
            gl.delete_vertex_array(self.vao);
            gl.delete_buffer(self.vbo);
            gl.delete_program(self.program);
        }
    }

    fn submit(&mut self, gl: &glow::Context, topology: Topology, vertices: &[PrimitiveVertex]) {
        let (program, vao, vbo) = (self.program, self.vao, self.vbo);
        self.buffer.push(topology, vertices, |run_topology, run| {
            draw_run(gl, program, vao, vbo, run_topology, run);
        });
    }

    fn upload_projection(&self, gl: &glow::Context, matrix: &glam::Mat4) {
        unsafe {
            gl.use_program(Some(self.program));
            gl.uniform_matrix_4_f32_slice(
                self.projection_loc.as_ref(),
                false,
                &matrix.to_cols_array(),
            );
        }
    }
}

fn draw_run(
    gl: &glow::Context,
    program: glow::Program,
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    topology: Topology,
    vertices: &[PrimitiveVertex],
) {
    unsafe {
        gl.use_program(Some(program));
        gl.bind_vertex_array(Some(vao));
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
        gl.buffer_sub_data_u8_slice(glow::ARRAY_BUFFER, 0, bytemuck::cast_slice(vertices));
        gl.draw_arrays(topology.gl_mode(), 0, vertices.len() as i32);
        gl.bind_buffer(glow::ARRAY_BUFFER, None);
        gl.bind_vertex_array(None);
    }
}

fn vertex(x: f32, y: f32, color: Color) -> PrimitiveVertex {
    PrimitiveVertex {
        position: [x, y],
        color: color.to_array(),
    }
}

/// Four edges as line segments: top, right, bottom, left.
fn rect_outline_vertices(x: f32, y: f32, w: f32, h: f32, color: Color) -> [PrimitiveVertex; 8] {
    [
        vertex(x, y, color),
        vertex(x + w, y, color),
        vertex(x + w, y, color),
        vertex(x + w, y + h, color),
        vertex(x + w, y + h, color),
        vertex(x, y + h, color),
        vertex(x, y + h, color),
        vertex(x, y, color),
    ]
}

/// Two triangles; the top edge takes `top`, the bottom edge `bottom`.
fn rect_fill_vertices(
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    top: Color,
    bottom: Color,
) -> [PrimitiveVertex; 6] {
    [
        vertex(x, y, top),
        vertex(x + w, y, top),
        vertex(x + w, y + h, bottom),
        vertex(x, y, top),
        vertex(x + w, y + h, bottom),
        vertex(x, y + h, bottom),
    ]
}

fn circle_outline_vertices(cx: f32, cy: f32, radius: f32, color: Color) -> Vec<PrimitiveVertex> {
    let segments = circle_segments(radius);
    let step = std::f32::consts::TAU / segments as f32;

    let mut vertices = Vec::with_capacity(segments as usize * 2);
    for i in 0..segments {
        let a1 = i as f32 * step;
        let a2 = (i + 1) as f32 * step;
        vertices.push(vertex(cx + a1.cos() * radius, cy + a1.sin() * radius, color));
        vertices.push(vertex(cx + a2.cos() * radius, cy + a2.sin() * radius, color));
    }
    vertices
}

fn circle_fill_vertices(cx: f32, cy: f32, radius: f32, color: Color) -> Vec<PrimitiveVertex> {
    let segments = circle_segments(radius);
    let step = std::f32::consts::TAU / segments as f32;

    let mut vertices = Vec::with_capacity(segments as usize * 3);
    for i in 0..segments {
        let a1 = i as f32 * step;
        let a2 = (i + 1) as f32 * step;
        vertices.push(vertex(cx, cy, color));
        vertices.push(vertex(cx + a1.cos() * radius, cy + a1.sin() * radius, color));
        vertices.push(vertex(cx + a2.cos() * radius, cy + a2.sin() * radius, color));
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_table_is_exact() {
        assert_eq!(circle_segments(5.0), 16);
        assert_eq!(circle_segments(9.9), 16);
        assert_eq!(circle_segments(10.0), 32);
        assert_eq!(circle_segments(30.0), 32);
        assert_eq!(circle_segments(49.9), 32);
        assert_eq!(circle_segments(50.0), 64);
        assert_eq!(circle_segments(80.0), 64);
    }

    #[test]
    fn circle_outline_emits_two_vertices_per_segment() {
        assert_eq!(circle_outline_vertices(0.0, 0.0, 5.0, Color::WHITE).len(), 32);
        assert_eq!(circle_outline_vertices(0.0, 0.0, 30.0, Color::WHITE).len(), 64);
        assert_eq!(circle_outline_vertices(0.0, 0.0, 80.0, Color::WHITE).len(), 128);
    }

    #[test]
    fn circle_fill_emits_one_triangle_per_segment() {
        let fan = circle_fill_vertices(10.0, 20.0, 30.0, Color::RED);
        assert_eq!(fan.len(), 96);
        // Every triangle starts at the center.
        for tri in fan.chunks(3) {
            assert_eq!(tri[0].position, [10.0, 20.0]);
        }
    }

    #[test]
    fn circle_outline_segments_share_endpoints() {
        let v = circle_outline_vertices(0.0, 0.0, 30.0, Color::WHITE);
        for pair in v.chunks(2).collect::<Vec<_>>().windows(2) {
            let end = pair[0][1].position;
            let start = pair[1][0].position;
            assert!((end[0] - start[0]).abs() < 1e-4);
            assert!((end[1] - start[1]).abs() < 1e-4);
        }
    }

    #[test]
    fn rect_outline_closes_the_loop() {
        let v = rect_outline_vertices(1.0, 2.0, 10.0, 20.0, Color::WHITE);
        assert_eq!(v.len(), 8);
        assert_eq!(v[0].position, v[7].position);
    }

    #[test]
    fn gradient_rect_splits_colors_by_edge() {
        let top = Color::rgba(1.0, 0.0, 0.0, 1.0);
        let bottom = Color::rgba(0.0, 0.0, 1.0, 1.0);
        let v = rect_fill_vertices(0.0, 0.0, 4.0, 4.0, top, bottom);

        for vert in &v {
            let expected = if vert.position[1] == 0.0 { top } else { bottom };
            assert_eq!(vert.color, expected.to_array());
        }
    }
}
