//! # ShaderProgram — Compile, Link, and Feed Uniforms by Name
//!
//! Wraps a GL program object built from a vertex + fragment source pair.
//! The built-in batcher programs go through [`compile_program`] too; the
//! public [`ShaderProgram`] type exists for caller-supplied effects.
//!
//! ## Failure Semantics
//!
//! A compile or link failure returns the driver's info log in the error and
//! deletes every GL object created along the way — there is no such thing as
//! a partially linked program, and nothing leaks. Failures never abort the
//! process; the caller decides what to do with the diagnostic.
//!
//! ## Uniform Lookup
//!
//! Every setter resolves the uniform location by name on each call. That is
//! a deliberate simplicity-over-throughput tradeoff: uniform updates on user
//! programs are rare (a handful per frame), and skipping a location cache
//! keeps the program object stateless. Setting a name the program does not
//! have is a silent no-op, matching GL's `-1` location convention.

use glam::Mat4;
use glow::HasContext;

use crate::error::RenderError;

/// A linked GL shader program with named-uniform setters.
///
/// Destruction is explicit and consuming: [`ShaderProgram::destroy`] takes
/// the program by value, so use-after-destroy is a compile error rather than
/// a runtime guard.
#[derive(Debug)]
pub struct ShaderProgram {
    program: glow::Program,
}

impl ShaderProgram {
    /// Compile and link a program from vertex and fragment GLSL sources.
    pub fn create(
        gl: &glow::Context,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<Self, RenderError> {
        let program = compile_program(gl, vertex_src, fragment_src)?;
        Ok(Self { program })
    }

    /// Read both source files fully, then delegate to [`ShaderProgram::create`].
    pub fn load(
        gl: &glow::Context,
        vertex_path: &str,
        fragment_path: &str,
    ) -> Result<Self, RenderError> {
        let vertex_src = read_source(vertex_path)?;
        let fragment_src = read_source(fragment_path)?;
        Self::create(gl, &vertex_src, &fragment_src)
    }

    /// Make this program current.
    pub fn bind(&self, gl: &glow::Context) {
        unsafe { gl.use_program(Some(self.program)) };
    }

    /// Restore the no-program state.
    pub fn unbind(gl: &glow::Context) {
        unsafe { gl.use_program(None) };
    }

    pub fn set_i32(&self, gl: &glow::Context, name: &str, value: i32) {
        self.bind(gl);
        if let Some(loc) = self.location(gl, name) {
            unsafe { gl.uniform_1_i32(Some(&loc), value) };
        }
    }

    pub fn set_f32(&self, gl: &glow::Context, name: &str, value: f32) {
        self.bind(gl);
        if let Some(loc) = self.location(gl, name) {
            unsafe { gl.uniform_1_f32(Some(&loc), value) };
        }
    }

    pub fn set_vec2(&self, gl: &glow::Context, name: &str, x: f32, y: f32) {
        self.bind(gl);
        if let Some(loc) = self.location(gl, name) {
            unsafe { gl.uniform_2_f32(Some(&loc), x, y) };
        }
    }

    pub fn set_vec3(&self, gl: &glow::Context, name: &str, x: f32, y: f32, z: f32) {
        self.bind(gl);
        if let Some(loc) = self.location(gl, name) {
            unsafe { gl.uniform_3_f32(Some(&loc), x, y, z) };
        }
    }

    pub fn set_vec4(&self, gl: &glow::Context, name: &str, x: f32, y: f32, z: f32, w: f32) {
        self.bind(gl);
        if let Some(loc) = self.location(gl, name) {
            unsafe { gl.uniform_4_f32(Some(&loc), x, y, z, w) };
        }
    }

    pub fn set_mat4(&self, gl: &glow::Context, name: &str, matrix: &Mat4) {
        self.bind(gl);
        if let Some(loc) = self.location(gl, name) {
            unsafe {
                gl.uniform_matrix_4_f32_slice(Some(&loc), false, &matrix.to_cols_array());
            }
        }
    }

    /// Release the GL program object.
    pub fn destroy(self, gl: &glow::Context) {
        unsafe { gl.delete_program(self.program) };
    }

    // Looked up per call; see the module docs for the tradeoff.
    fn location(&self, gl: &glow::Context, name: &str) -> Option<glow::UniformLocation> {
        unsafe { gl.get_uniform_location(self.program, name) }
    }
}

/// Compile both stages and link them. Used by the built-in batcher programs
/// as well as [`ShaderProgram::create`].
pub(crate) fn compile_program(
    gl: &glow::Context,
    vertex_src: &str,
    fragment_src: &str,
) -> Result<glow::Program, RenderError> {
    let vertex = compile_stage(gl, glow::VERTEX_SHADER, "vertex", vertex_src)?;
    let fragment = match compile_stage(gl, glow::FRAGMENT_SHADER, "fragment", fragment_src) {
        Ok(shader) => shader,
        Err(err) => {
            unsafe { gl.delete_shader(vertex) };
            return Err(err);
        }
    };

    let program = match unsafe { gl.create_program() } {
        Ok(program) => program,
        Err(reason) => {
            unsafe {
                gl.delete_shader(vertex);
                gl.delete_shader(fragment);
            }
            return Err(RenderError::allocation(format!("shader program: {reason}")));
        }
    };

    unsafe {
        gl.attach_shader(program, vertex);
        gl.attach_shader(program, fragment);
        gl.link_program(program);
    }

    let linked = unsafe { gl.get_program_link_status(program) };
    let log = if linked {
        None
    } else {
        Some(unsafe { gl.get_program_info_log(program) })
    };

    // Stage objects are no longer needed once the program exists (or failed).
    unsafe {
        gl.delete_shader(vertex);
        gl.delete_shader(fragment);
    }

    if let Some(log) = log {
        unsafe { gl.delete_program(program) };
        log::warn!("shader program link failed: {log}");
        return Err(RenderError::ShaderLink { log });
    }

    Ok(program)
}

fn compile_stage(
    gl: &glow::Context,
    kind: u32,
    stage: &'static str,
    source: &str,
) -> Result<glow::Shader, RenderError> {
    let shader = unsafe { gl.create_shader(kind) }
        .map_err(|reason| RenderError::allocation(format!("{stage} shader: {reason}")))?;

    unsafe {
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
    }

    if !unsafe { gl.get_shader_compile_status(shader) } {
        let log = unsafe { gl.get_shader_info_log(shader) };
        unsafe { gl.delete_shader(shader) };
        log::warn!("{stage} shader compilation failed: {log}");
        return Err(RenderError::ShaderCompile { stage, log });
    }

    Ok(shader)
}

fn read_source(path: &str) -> Result<String, RenderError> {
    let source =
        std::fs::read_to_string(path).map_err(|e| RenderError::resource_load(path, e))?;
    if source.is_empty() {
        return Err(RenderError::resource_load(path, "file is empty"));
    }
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_source_file_reports_the_path() {
        let err = read_source("/no/such/shader.vert").unwrap_err();
        match err {
            RenderError::ResourceLoad { path, .. } => {
                assert_eq!(path, "/no/such/shader.vert");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_source_file_is_rejected() {
        let dir = std::env::temp_dir().join("teikna-shader-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("empty.frag");
        std::fs::write(&path, "").unwrap();

        let err = read_source(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, RenderError::ResourceLoad { .. }));
    }
}
