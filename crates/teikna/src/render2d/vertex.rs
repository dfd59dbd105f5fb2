//! # Vertex — Per-Corner Data Sent to the GPU
//!
//! Two vertex formats flow through the batchers:
//!
//! ```text
//! PrimitiveVertex (24 bytes)              TexturedVertex (32 bytes)
//! ┌──────────────┬────────────────┐       ┌──────────────┬──────────┬────────────────┐
//! │ position     │ color          │       │ position     │ uv       │ color          │
//! │ [f32; 2]     │ [f32; 4]       │       │ [f32; 2]     │ [f32; 2] │ [f32; 4]       │
//! │ offset 0     │ offset 8       │       │ offset 0     │ offset 8 │ offset 16      │
//! │ location(0)  │ location(1)    │       │ location(0)  │ loc(1)   │ location(2)    │
//! └──────────────┴────────────────┘       └──────────────┴──────────┴────────────────┘
//! ```
//!
//! `#[repr(C)]` pins the layout, and the `bytemuck` `Pod`/`Zeroable` traits
//! let a `&[Vertex]` be cast to `&[u8]` for `glBufferSubData` without copies.
//! Positions are in world space; the shader only applies the camera's
//! projection-view matrix, so draws with different transforms can share one
//! draw call as long as they share the batch key.

use bytemuck::{Pod, Zeroable};
use glow::HasContext;

/// Position + color vertex used by the primitive batcher.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct PrimitiveVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl PrimitiveVertex {
    pub const STRIDE: i32 = size_of::<Self>() as i32;

    /// Configure the vertex attribute pointers for the currently bound VAO/VBO.
    pub fn configure_attributes(gl: &glow::Context) {
        unsafe {
            gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, Self::STRIDE, 0);
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(1, 4, glow::FLOAT, false, Self::STRIDE, 8);
            gl.enable_vertex_attrib_array(1);
        }
    }
}

/// Position + UV + color vertex used by the texture and text batchers.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct TexturedVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl TexturedVertex {
    pub const STRIDE: i32 = size_of::<Self>() as i32;

    /// Configure the vertex attribute pointers for the currently bound VAO/VBO.
    pub fn configure_attributes(gl: &glow::Context) {
        unsafe {
            gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, Self::STRIDE, 0);
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(1, 2, glow::FLOAT, false, Self::STRIDE, 8);
            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_f32(2, 4, glow::FLOAT, false, Self::STRIDE, 16);
            gl.enable_vertex_attrib_array(2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strides_match_gl_layout() {
        assert_eq!(PrimitiveVertex::STRIDE, 24);
        assert_eq!(TexturedVertex::STRIDE, 32);
    }
}
