//! GPU rendering object model.
//!
//! - `state` / `sampler`: fixed-function state objects built from descriptors
//! - `program`: WGSL loading and naga-based reflection
//! - `vars`: named uniform writes staged on the CPU, uploaded at bind time
//! - `pass`: the full-screen pass that ties a program to a draw

mod ctx;
mod error;
pub mod pass;
pub mod program;
pub mod sampler;
pub mod state;
pub mod vars;

pub use ctx::{DepthTarget, RenderCtx, RenderTarget};
pub use error::{RenderError, RenderResult};
pub use pass::FullScreenPass;
pub use program::{BindLocation, Program, ProgramReflection, ResourceKind, UniformType};
pub use sampler::{AddressMode, Filter, Sampler, SamplerDesc};
pub use state::{
    BlendDesc, BlendState, CullMode, DepthStencilDesc, DepthStencilState, GraphicsState,
    RasterizerDesc, RasterizerState,
};
pub use vars::{ConstantBufferVar, GraphicsVars, ParameterBlock, UniformValue};
