//! # Teikna — Batched Immediate-Mode 2D Rendering
//!
//! A small 2D drawing library that turns immediate-mode calls (points, lines,
//! shapes, textured sprites, text) into batched OpenGL draw calls under a
//! shared camera transform.
//!
//! Windowing, the event loop, and GL context creation are the caller's job:
//! build a [`glow::Context`] with your windowing library of choice and hand
//! it to [`Renderer2d::new`](render2d::Renderer2d::new).

pub mod error;
pub mod render2d;

pub use error::RenderError;
pub use render2d::{Camera, Color, Font, Renderer2d, ShaderProgram, Texture};

// Re-exported so callers don't need to pin a matching glow version themselves.
pub use glow;
