use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::program::{Program, ProgramReflection, shader_capabilities};
use super::state::{BlendDesc, DepthStencilDesc, GraphicsState, RasterizerDesc};
use super::vars::GraphicsVars;
use super::{RenderCtx, RenderError, RenderResult, RenderTarget};

const VERTEX_STAGE: &str = include_str!("shaders/fullscreen.wgsl");

/// Vertex entry point provided by the pass.
pub const VERTEX_ENTRY: &str = "full_screen_vs";

/// Fragment entry point every full-screen source must define.
pub const FRAGMENT_ENTRY: &str = "fs_main";

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
struct PipelineKey {
    color_format: wgpu::TextureFormat,
    depth_format: Option<wgpu::TextureFormat>,
    rasterizer: RasterizerDesc,
    depth_stencil: DepthStencilDesc,
    blend: BlendDesc,
}

/// A pixel shader run once per target pixel.
///
/// The pass owns the vertex stage (a single oversized triangle, no vertex
/// buffers). Pipelines are created on first use for each combination of target
/// formats and fixed-function state, then reused.
pub struct FullScreenPass {
    program: Program,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl FullScreenPass {
    /// Loads a WGSL fragment source from disk.
    pub fn create(device: &wgpu::Device, path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "full-screen pass".to_string());

        Self::from_source(device, &label, &source)
    }

    pub fn from_source(device: &wgpu::Device, label: &str, fragment: &str) -> RenderResult<Self> {
        let source = compose_source(fragment);
        let capabilities = shader_capabilities(device.features());
        let reflection = Arc::new(reflect_composed(label, &source, capabilities)?);
        let program = Program::with_reflection(device, label, &source, reflection);

        Ok(Self {
            program,
            pipelines: HashMap::new(),
        })
    }

    /// Reflects a fragment source the way `from_source` would, without a device.
    ///
    /// Validates against the baseline capabilities only.
    pub fn reflect(label: &str, fragment: &str) -> RenderResult<ProgramReflection> {
        let capabilities = naga::valid::Capabilities::default();
        reflect_composed(label, &compose_source(fragment), capabilities)
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Binds `vars` and draws the pass into `target` with `state`.
    pub fn execute(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        state: &GraphicsState,
        vars: &mut GraphicsVars,
    ) -> RenderResult<()> {
        let depth_stencil = state.depth_stencil.desc();
        let depth = if depth_stencil.needs_attachment() {
            Some(target.depth.ok_or(RenderError::MissingDepthTarget)?)
        } else {
            None
        };

        vars.prepare(ctx.device, ctx.queue, &self.program)?;

        let key = PipelineKey {
            color_format: target.format,
            depth_format: depth.map(|d| d.format),
            rasterizer: state.rasterizer.desc(),
            depth_stencil,
            blend: state.blend.desc(),
        };

        let program = &self.program;
        let pipeline = self
            .pipelines
            .entry(key)
            .or_insert_with(|| create_pipeline(ctx.device, program, &key));

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lumen full-screen pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: depth.map(|d| wgpu::RenderPassDepthStencilAttachment {
                view: d.view,
                depth_ops: d.format.has_depth_aspect().then_some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: d.format.has_stencil_aspect().then_some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        for (group, bind_group) in vars.bind_groups() {
            rpass.set_bind_group(group, bind_group, &[]);
        }
        rpass.draw(0..3, 0..1);

        Ok(())
    }
}

fn compose_source(fragment: &str) -> String {
    format!("{VERTEX_STAGE}\n{fragment}")
}

fn reflect_composed(
    label: &str,
    source: &str,
    capabilities: naga::valid::Capabilities,
) -> RenderResult<ProgramReflection> {
    let reflection = ProgramReflection::from_wgsl_with(label, source, capabilities)?;
    reflection.require_entry_point(VERTEX_ENTRY, naga::ShaderStage::Vertex)?;
    reflection.require_entry_point(FRAGMENT_ENTRY, naga::ShaderStage::Fragment)?;
    Ok(reflection)
}

fn create_pipeline(
    device: &wgpu::Device,
    program: &Program,
    key: &PipelineKey,
) -> wgpu::RenderPipeline {
    log::debug!("creating full-screen pipeline for `{}`: {key:?}", program.label());

    let (blend, write_mask) = key.blend.to_wgpu();

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&format!("{} pipeline", program.label())),
        layout: Some(program.pipeline_layout()),

        vertex: wgpu::VertexState {
            module: program.module(),
            entry_point: Some(VERTEX_ENTRY),
            compilation_options: Default::default(),
            buffers: &[],
        },

        fragment: Some(wgpu::FragmentState {
            module: program.module(),
            entry_point: Some(FRAGMENT_ENTRY),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: key.color_format,
                blend,
                write_mask,
            })],
        }),

        primitive: key.rasterizer.to_wgpu(),
        depth_stencil: key
            .depth_format
            .and_then(|format| key.depth_stencil.to_wgpu(format)),
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::program::UniformType;

    const GRADIENT: &str = r#"
struct Frame {
    tint: vec4<f32>,
}
@group(0) @binding(0) var<uniform> frame: Frame;

@fragment
fn fs_main(in: FullScreenVarying) -> @location(0) vec4<f32> {
    return vec4<f32>(in.uv, 0.0, 1.0) * frame.tint;
}
"#;

    #[test]
    fn fragment_sees_vertex_stage_declarations() {
        let r = FullScreenPass::reflect("gradient", GRADIENT).expect("valid pass");
        let block = r.default_parameter_block();
        let loc = block.resource_binding("frame").unwrap();
        assert_eq!(
            block.uniform_block(loc).and_then(|b| b.field("tint")).map(|f| f.ty),
            Some(UniformType::Float4)
        );
    }

    #[test]
    fn missing_fragment_entry_is_rejected() {
        let src = r#"
@fragment
fn main(in: FullScreenVarying) -> @location(0) vec4<f32> { return vec4<f32>(in.uv, 0.0, 1.0); }
"#;
        let err = FullScreenPass::reflect("unnamed", src).unwrap_err();
        assert!(matches!(err, RenderError::MissingEntryPoint { ref name, .. } if name == FRAGMENT_ENTRY));
    }

    #[test]
    fn source_without_uniforms_has_empty_default_block() {
        let src = r#"
@fragment
fn fs_main(in: FullScreenVarying) -> @location(0) vec4<f32> { return vec4<f32>(in.uv, 1.0, 1.0); }
"#;
        let r = FullScreenPass::reflect("plain", src).unwrap();
        assert!(r.default_parameter_block().resources().is_empty());
    }

    #[test]
    fn f64_fragment_is_rejected_without_the_feature() {
        let src = r#"
@fragment
fn fs_main(in: FullScreenVarying) -> @location(0) vec4<f32> {
    let x: f64 = 1.0lf;
    return vec4<f32>(in.uv, f32(x), 1.0);
}
"#;
        let err = FullScreenPass::reflect("f64", src).unwrap_err();
        assert!(matches!(err, RenderError::ShaderValidation { .. }));
    }
}
