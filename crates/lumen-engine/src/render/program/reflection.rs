//! Shader reflection built from the naga IR.
//!
//! Only what the binding model needs is recorded: bound globals grouped by bind
//! group ("parameter blocks"), uniform block layouts, and entry points.

use crate::render::{RenderError, RenderResult};

/// Shader capabilities a device with `features` can run.
pub fn shader_capabilities(features: wgpu::Features) -> naga::valid::Capabilities {
    use naga::valid::Capabilities as C;

    let mut caps = C::default();
    for (feature, cap) in [
        (wgpu::Features::SHADER_F64, C::FLOAT64),
        (wgpu::Features::SHADER_F16, C::SHADER_FLOAT16),
        (wgpu::Features::SHADER_INT64, C::SHADER_INT64),
        (wgpu::Features::SHADER_PRIMITIVE_INDEX, C::PRIMITIVE_INDEX),
        (wgpu::Features::CLIP_DISTANCES, C::CLIP_DISTANCE),
    ] {
        if features.contains(feature) {
            caps |= cap;
        }
    }
    caps
}

/// Type of a reflected uniform field.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UniformType {
    Float,
    Float2,
    Float3,
    Float4,
    Int,
    Int2,
    Int3,
    Int4,
    UInt,
    UInt2,
    UInt3,
    UInt4,
    Float4x4,
}

impl UniformType {
    /// Byte size of the value (not including trailing alignment padding).
    pub fn size(self) -> u32 {
        match self {
            Self::Float | Self::Int | Self::UInt => 4,
            Self::Float2 | Self::Int2 | Self::UInt2 => 8,
            Self::Float3 | Self::Int3 | Self::UInt3 => 12,
            Self::Float4 | Self::Int4 | Self::UInt4 => 16,
            Self::Float4x4 => 64,
        }
    }

    fn from_naga(inner: &naga::TypeInner) -> Option<Self> {
        use naga::{ScalarKind, TypeInner, VectorSize};

        match *inner {
            TypeInner::Scalar(s) if s.width == 4 => match s.kind {
                ScalarKind::Float => Some(Self::Float),
                ScalarKind::Sint => Some(Self::Int),
                ScalarKind::Uint => Some(Self::UInt),
                _ => None,
            },
            TypeInner::Vector { size, scalar } if scalar.width == 4 => {
                match (scalar.kind, size) {
                    (ScalarKind::Float, VectorSize::Bi) => Some(Self::Float2),
                    (ScalarKind::Float, VectorSize::Tri) => Some(Self::Float3),
                    (ScalarKind::Float, VectorSize::Quad) => Some(Self::Float4),
                    (ScalarKind::Sint, VectorSize::Bi) => Some(Self::Int2),
                    (ScalarKind::Sint, VectorSize::Tri) => Some(Self::Int3),
                    (ScalarKind::Sint, VectorSize::Quad) => Some(Self::Int4),
                    (ScalarKind::Uint, VectorSize::Bi) => Some(Self::UInt2),
                    (ScalarKind::Uint, VectorSize::Tri) => Some(Self::UInt3),
                    (ScalarKind::Uint, VectorSize::Quad) => Some(Self::UInt4),
                    _ => None,
                }
            }
            TypeInner::Matrix {
                columns: VectorSize::Quad,
                rows: VectorSize::Quad,
                scalar,
            } if scalar.kind == ScalarKind::Float && scalar.width == 4 => Some(Self::Float4x4),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformField {
    pub name: String,
    pub offset: u32,
    pub ty: UniformType,
}

/// Layout of a uniform (constant) buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlockReflection {
    /// Name of the bound variable.
    pub name: String,
    /// Byte size including the struct's trailing padding.
    pub size: u32,
    pub fields: Vec<UniformField>,
}

impl UniformBlockReflection {
    pub fn field(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Position of a resource in the binding model.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BindLocation {
    pub group: u32,
    pub binding: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceKind {
    UniformBuffer(UniformBlockReflection),
    Sampler { comparison: bool },
    Texture2D,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceReflection {
    pub name: String,
    pub location: BindLocation,
    pub kind: ResourceKind,
}

/// All resources of one bind group.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBlockReflection {
    group: u32,
    resources: Vec<ResourceReflection>,
}

impl ParameterBlockReflection {
    fn new(group: u32) -> Self {
        Self {
            group,
            resources: Vec::new(),
        }
    }

    pub fn group(&self) -> u32 {
        self.group
    }

    pub fn resources(&self) -> &[ResourceReflection] {
        &self.resources
    }

    pub fn resource(&self, name: &str) -> Option<&ResourceReflection> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Finds where a named resource is bound.
    pub fn resource_binding(&self, name: &str) -> Option<BindLocation> {
        self.resource(name).map(|r| r.location)
    }

    pub fn uniform_block(&self, location: BindLocation) -> Option<&UniformBlockReflection> {
        self.resources
            .iter()
            .find(|r| r.location == location)
            .and_then(|r| match &r.kind {
                ResourceKind::UniformBuffer(block) => Some(block),
                _ => None,
            })
    }

    pub(crate) fn layout_entries(&self) -> Vec<wgpu::BindGroupLayoutEntry> {
        self.resources
            .iter()
            .map(|r| wgpu::BindGroupLayoutEntry {
                binding: r.location.binding,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: match &r.kind {
                    ResourceKind::UniformBuffer(block) => wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: std::num::NonZeroU64::new(u64::from(block.size)),
                    },
                    ResourceKind::Sampler { comparison: true } => {
                        wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison)
                    }
                    ResourceKind::Sampler { comparison: false } => {
                        wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
                    }
                    ResourceKind::Texture2D => wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                },
                count: None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryPointReflection {
    pub name: String,
    pub stage: naga::ShaderStage,
}

/// Reflection data of a whole program.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramReflection {
    label: String,
    /// Indexed by group; always holds at least group 0.
    blocks: Vec<ParameterBlockReflection>,
    entry_points: Vec<EntryPointReflection>,
}

impl ProgramReflection {
    /// Parses, validates and reflects a WGSL source against the baseline
    /// capabilities every device has.
    pub fn from_wgsl(label: &str, source: &str) -> RenderResult<Self> {
        Self::from_wgsl_with(label, source, naga::valid::Capabilities::default())
    }

    /// Like [`from_wgsl`](Self::from_wgsl), validating against `capabilities`.
    pub fn from_wgsl_with(
        label: &str,
        source: &str,
        capabilities: naga::valid::Capabilities,
    ) -> RenderResult<Self> {
        let module = naga::front::wgsl::parse_str(source).map_err(|e| RenderError::ShaderParse {
            label: label.to_string(),
            message: e.emit_to_string(source),
        })?;

        naga::valid::Validator::new(naga::valid::ValidationFlags::all(), capabilities)
            .validate(&module)
            .map_err(|e| RenderError::ShaderValidation {
                label: label.to_string(),
                message: e.emit_to_string(source),
            })?;

        Self::from_module(label, &module)
    }

    pub fn from_module(label: &str, module: &naga::Module) -> RenderResult<Self> {
        let mut blocks = vec![ParameterBlockReflection::new(0)];

        for (_, var) in module.global_variables.iter() {
            let Some(binding) = &var.binding else { continue };
            let name = var.name.clone().unwrap_or_default();
            let location = BindLocation {
                group: binding.group,
                binding: binding.binding,
            };
            let ty = &module.types[var.ty];

            let kind = match (var.space, &ty.inner) {
                (naga::AddressSpace::Uniform, naga::TypeInner::Struct { members, span }) => {
                    let fields = members
                        .iter()
                        .map(|m| {
                            let field = m.name.clone().unwrap_or_default();
                            match UniformType::from_naga(&module.types[m.ty].inner) {
                                Some(ty) => Ok(UniformField {
                                    name: field,
                                    offset: m.offset,
                                    ty,
                                }),
                                None => Err(RenderError::UnsupportedUniform {
                                    block: name.clone(),
                                    field,
                                }),
                            }
                        })
                        .collect::<RenderResult<Vec<_>>>()?;

                    ResourceKind::UniformBuffer(UniformBlockReflection {
                        name: name.clone(),
                        size: *span,
                        fields,
                    })
                }

                // `var<uniform> x: vec4<f32>` is a block with one field named after the variable.
                (naga::AddressSpace::Uniform, inner) => {
                    let ty = UniformType::from_naga(inner).ok_or_else(|| {
                        RenderError::UnsupportedUniform {
                            block: name.clone(),
                            field: name.clone(),
                        }
                    })?;
                    ResourceKind::UniformBuffer(UniformBlockReflection {
                        name: name.clone(),
                        size: ty.size().next_multiple_of(16),
                        fields: vec![UniformField {
                            name: name.clone(),
                            offset: 0,
                            ty,
                        }],
                    })
                }

                (naga::AddressSpace::Handle, naga::TypeInner::Sampler { comparison }) => {
                    ResourceKind::Sampler {
                        comparison: *comparison,
                    }
                }

                (
                    naga::AddressSpace::Handle,
                    naga::TypeInner::Image {
                        dim: naga::ImageDimension::D2,
                        arrayed: false,
                        class:
                            naga::ImageClass::Sampled {
                                kind: naga::ScalarKind::Float,
                                multi: false,
                            },
                    },
                ) => ResourceKind::Texture2D,

                _ => {
                    return Err(RenderError::UnsupportedBinding {
                        label: label.to_string(),
                        name,
                    });
                }
            };

            let group = location.group as usize;
            while blocks.len() <= group {
                let next = blocks.len() as u32;
                blocks.push(ParameterBlockReflection::new(next));
            }
            blocks[group].resources.push(ResourceReflection {
                name,
                location,
                kind,
            });
        }

        for block in &mut blocks {
            block.resources.sort_by_key(|r| r.location.binding);
        }

        let entry_points = module
            .entry_points
            .iter()
            .map(|ep| EntryPointReflection {
                name: ep.name.clone(),
                stage: ep.stage,
            })
            .collect();

        log::debug!(
            "reflected `{label}`: {} parameter block(s), {} entry point(s)",
            blocks.len(),
            module.entry_points.len()
        );

        Ok(Self {
            label: label.to_string(),
            blocks,
            entry_points,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Group 0.
    pub fn default_parameter_block(&self) -> &ParameterBlockReflection {
        &self.blocks[0]
    }

    pub fn parameter_block(&self, group: u32) -> Option<&ParameterBlockReflection> {
        self.blocks.get(group as usize)
    }

    pub fn parameter_blocks(&self) -> &[ParameterBlockReflection] {
        &self.blocks
    }

    pub fn entry_points(&self) -> &[EntryPointReflection] {
        &self.entry_points
    }

    pub fn require_entry_point(&self, name: &str, stage: naga::ShaderStage) -> RenderResult<()> {
        if self
            .entry_points
            .iter()
            .any(|ep| ep.name == name && ep.stage == stage)
        {
            return Ok(());
        }

        Err(RenderError::MissingEntryPoint {
            label: self.label.clone(),
            stage: match stage {
                naga::ShaderStage::Vertex => "vertex",
                naga::ShaderStage::Fragment => "fragment",
                naga::ShaderStage::Compute => "compute",
                _ => "mesh pipeline",
            },
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHADER: &str = r#"
struct Globals {
    tint: vec4<f32>,
    resolution: vec2<f32>,
    time: f32,
    frame: u32,
    view: mat4x4<f32>,
}

@group(0) @binding(0) var<uniform> globals: Globals;
@group(0) @binding(2) var linear_sampler: sampler;
@group(0) @binding(1) var noise: texture_2d<f32>;
@group(1) @binding(0) var<uniform> exposure: f32;

@vertex
fn vs_main(@builtin(vertex_index) i: u32) -> @builtin(position) vec4<f32> {
    return globals.view * vec4<f32>(f32(i), 0.0, 0.0, 1.0);
}

@fragment
fn fs_main(@builtin(position) p: vec4<f32>) -> @location(0) vec4<f32> {
    let uv = p.xy / globals.resolution;
    let n = textureSample(noise, linear_sampler, uv);
    return n * globals.tint * exposure * globals.time + f32(globals.frame);
}
"#;

    fn reflect() -> ProgramReflection {
        ProgramReflection::from_wgsl("test", SHADER).expect("valid shader")
    }

    #[test]
    fn uniform_block_layout() {
        let r = reflect();
        let block0 = r.default_parameter_block();
        let loc = block0.resource_binding("globals").expect("globals bound");
        assert_eq!(loc, BindLocation { group: 0, binding: 0 });

        let block = block0.uniform_block(loc).expect("uniform block");
        assert_eq!(block.field("tint").map(|f| (f.offset, f.ty)), Some((0, UniformType::Float4)));
        assert_eq!(block.field("resolution").map(|f| (f.offset, f.ty)), Some((16, UniformType::Float2)));
        assert_eq!(block.field("time").map(|f| (f.offset, f.ty)), Some((24, UniformType::Float)));
        assert_eq!(block.field("frame").map(|f| (f.offset, f.ty)), Some((28, UniformType::UInt)));
        assert_eq!(block.field("view").map(|f| (f.offset, f.ty)), Some((32, UniformType::Float4x4)));
        assert_eq!(block.size, 96);
        assert!(block.field("missing").is_none());
    }

    #[test]
    fn resources_are_sorted_by_binding() {
        let r = reflect();
        let names: Vec<_> = r
            .default_parameter_block()
            .resources()
            .iter()
            .map(|res| res.name.as_str())
            .collect();
        assert_eq!(names, ["globals", "noise", "linear_sampler"]);
    }

    #[test]
    fn handles_are_reflected() {
        let r = reflect();
        let block = r.default_parameter_block();
        assert_eq!(
            block.resource("linear_sampler").map(|res| &res.kind),
            Some(&ResourceKind::Sampler { comparison: false })
        );
        assert_eq!(block.resource("noise").map(|res| &res.kind), Some(&ResourceKind::Texture2D));
    }

    #[test]
    fn bare_uniform_becomes_single_field_block() {
        let r = reflect();
        let block1 = r.parameter_block(1).expect("group 1");
        let loc = block1.resource_binding("exposure").expect("exposure bound");
        let block = block1.uniform_block(loc).expect("uniform block");
        assert_eq!(block.fields.len(), 1);
        assert_eq!(block.fields[0].ty, UniformType::Float);
        assert_eq!(block.size, 16);
    }

    #[test]
    fn layout_entries_cover_every_binding() {
        let r = reflect();
        let entries = r.default_parameter_block().layout_entries();
        let bindings: Vec<_> = entries.iter().map(|e| e.binding).collect();
        assert_eq!(bindings, [0, 1, 2]);
    }

    #[test]
    fn entry_points_are_checked_by_stage() {
        let r = reflect();
        assert!(r.require_entry_point("fs_main", naga::ShaderStage::Fragment).is_ok());
        assert!(matches!(
            r.require_entry_point("fs_main", naga::ShaderStage::Vertex),
            Err(RenderError::MissingEntryPoint { .. })
        ));
    }

    #[test]
    fn parse_errors_are_reported() {
        let err = ProgramReflection::from_wgsl("broken", "fn (").unwrap_err();
        assert!(matches!(err, RenderError::ShaderParse { .. }));
    }

    #[test]
    fn storage_buffers_are_unsupported() {
        let src = r#"
@group(0) @binding(0) var<storage, read> data: array<f32>;
@fragment
fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(data[0]); }
"#;
        let err = ProgramReflection::from_wgsl("storage", src).unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedBinding { .. }));
    }

    // ── capabilities ──────────────────────────────────────────────────────

    const F64_SHADER: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    let x: f64 = 1.0lf;
    return vec4<f32>(f32(x));
}
"#;

    #[test]
    fn f64_needs_the_device_feature() {
        let err = ProgramReflection::from_wgsl("f64", F64_SHADER).unwrap_err();
        assert!(matches!(err, RenderError::ShaderValidation { .. }));

        let none = shader_capabilities(wgpu::Features::empty());
        let err = ProgramReflection::from_wgsl_with("f64", F64_SHADER, none).unwrap_err();
        assert!(matches!(err, RenderError::ShaderValidation { .. }));

        let caps = shader_capabilities(wgpu::Features::SHADER_F64);
        assert!(ProgramReflection::from_wgsl_with("f64", F64_SHADER, caps).is_ok());
    }

    #[test]
    fn capabilities_follow_device_features() {
        let base = shader_capabilities(wgpu::Features::empty());
        assert_eq!(base, naga::valid::Capabilities::default());
        assert!(!base.contains(naga::valid::Capabilities::FLOAT64));

        let caps = shader_capabilities(wgpu::Features::SHADER_F16 | wgpu::Features::SHADER_F64);
        assert!(caps.contains(naga::valid::Capabilities::SHADER_FLOAT16));
        assert!(caps.contains(naga::valid::Capabilities::FLOAT64));
        assert!(!caps.contains(naga::valid::Capabilities::SHADER_INT64));
    }
}
