//! Error categories for the rendering library.
//!
//! Every fallible operation returns `Result<_, RenderError>` to its immediate
//! caller. Failures are synchronous and local: nothing is retried, nothing
//! aborts the process, and no operation leaves a half-constructed resource
//! behind.

/// Errors surfaced by resource creation and loading.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    /// A file was missing, unreadable, empty, or could not be decoded.
    #[error("failed to load '{path}': {reason}")]
    ResourceLoad { path: String, reason: String },

    /// A shader stage failed to compile. Carries the driver's info log.
    #[error("{stage} shader compilation failed: {log}")]
    ShaderCompile { stage: &'static str, log: String },

    /// Shader program linking failed. Carries the driver's info log.
    #[error("shader program linking failed: {log}")]
    ShaderLink { log: String },

    /// The retained font bytes were rejected by the font parser.
    #[error("failed to parse font: {reason}")]
    FontParse { reason: String },

    /// A GL object (buffer, vertex array, texture, program) could not be
    /// created.
    #[error("failed to allocate {what}")]
    Allocation { what: String },
}

impl RenderError {
    pub(crate) fn resource_load(path: &str, reason: impl ToString) -> Self {
        Self::ResourceLoad {
            path: path.to_owned(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn allocation(what: impl ToString) -> Self {
        Self::Allocation {
            what: what.to_string(),
        }
    }
}
