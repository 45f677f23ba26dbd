use std::path::PathBuf;

use super::program::UniformType;

/// Errors raised by the render object model (shader loading, reflection, vars, passes).
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to read shader `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("shader `{label}` failed to parse:\n{message}")]
    ShaderParse { label: String, message: String },

    #[error("shader `{label}` failed validation:\n{message}")]
    ShaderValidation { label: String, message: String },

    #[error("shader `{label}` has no {stage} entry point `{name}`")]
    MissingEntryPoint {
        label: String,
        stage: &'static str,
        name: String,
    },

    #[error("shader `{label}`: binding `{name}` has an unsupported type")]
    UnsupportedBinding { label: String, name: String },

    #[error("uniform block `{block}`: field `{field}` has an unsupported type")]
    UnsupportedUniform { block: String, field: String },

    #[error("no resource `{0}` in parameter block")]
    UnknownResource(String),

    #[error("uniform block `{block}` has no field `{field}`")]
    UnknownField { block: String, field: String },

    #[error("field `{field}` is declared {expected:?} but was written as {actual:?}")]
    TypeMismatch {
        field: String,
        expected: UniformType,
        actual: UniformType,
    },

    #[error("resource `{0}` has no value bound")]
    UnboundResource(String),

    #[error("graphics vars were created for a different program")]
    ProgramMismatch,

    #[error("invalid sampler: {0}")]
    InvalidSampler(String),

    #[error("depth-stencil state requires a depth attachment but the target has none")]
    MissingDepthTarget,
}

pub type RenderResult<T> = Result<T, RenderError>;
