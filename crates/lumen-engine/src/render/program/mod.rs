//! Shader programs and their reflection.

mod reflection;

use std::sync::Arc;

pub use reflection::{
    BindLocation, EntryPointReflection, ParameterBlockReflection, ProgramReflection,
    ResourceKind, ResourceReflection, UniformBlockReflection, UniformField, UniformType,
    shader_capabilities,
};

use super::RenderResult;

/// A compiled WGSL module with its reflection and binding layouts.
pub struct Program {
    label: String,
    reflection: Arc<ProgramReflection>,
    module: wgpu::ShaderModule,
    bind_group_layouts: Vec<wgpu::BindGroupLayout>,
    pipeline_layout: wgpu::PipelineLayout,
}

impl Program {
    /// Reflects `source` and creates the GPU objects for it.
    ///
    /// Reflection runs first, validated against the device's features, so
    /// shader errors surface as `RenderError`s instead of wgpu validation panics.
    pub fn from_wgsl(device: &wgpu::Device, label: &str, source: &str) -> RenderResult<Self> {
        let capabilities = shader_capabilities(device.features());
        let reflection = Arc::new(ProgramReflection::from_wgsl_with(label, source, capabilities)?);
        Ok(Self::with_reflection(device, label, source, reflection))
    }

    /// Creates the GPU objects for a source that was already reflected.
    pub(crate) fn with_reflection(
        device: &wgpu::Device,
        label: &str,
        source: &str,
        reflection: Arc<ProgramReflection>,
    ) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let bind_group_layouts: Vec<_> = reflection
            .parameter_blocks()
            .iter()
            .map(|block| {
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(&format!("{label} bgl {}", block.group())),
                    entries: &block.layout_entries(),
                })
            })
            .collect();

        let layout_refs: Vec<&wgpu::BindGroupLayout> = bind_group_layouts.iter().collect();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{label} pipeline layout")),
            bind_group_layouts: &layout_refs,
            immediate_size: 0,
        });

        log::info!("loaded program `{label}`");

        Self {
            label: label.to_string(),
            reflection,
            module,
            bind_group_layouts,
            pipeline_layout,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn reflector(&self) -> &Arc<ProgramReflection> {
        &self.reflection
    }

    pub fn bind_group_layout(&self, group: u32) -> Option<&wgpu::BindGroupLayout> {
        self.bind_group_layouts.get(group as usize)
    }

    pub(crate) fn module(&self) -> &wgpu::ShaderModule {
        &self.module
    }

    pub(crate) fn pipeline_layout(&self) -> &wgpu::PipelineLayout {
        &self.pipeline_layout
    }
}
