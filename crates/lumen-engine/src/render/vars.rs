//! Shader variable storage (`GraphicsVars`).
//!
//! Uniform writes land in CPU staging first and are uploaded lazily when the
//! vars are bound for a draw, so writing uniforms needs no GPU access.

use std::sync::Arc;

use bytemuck::Pod;
use glam::{Mat4, Vec2, Vec3, Vec4};

use super::program::{
    BindLocation, ParameterBlockReflection, Program, ProgramReflection, ResourceKind,
    ResourceReflection, UniformBlockReflection, UniformType,
};
use super::sampler::Sampler;
use super::{RenderError, RenderResult};

/// A CPU value that can be written into a uniform field.
pub trait UniformValue: Pod {
    const TYPE: UniformType;
}

macro_rules! uniform_values {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(impl UniformValue for $ty {
            const TYPE: UniformType = UniformType::$kind;
        })*
    };
}

uniform_values! {
    f32 => Float,
    [f32; 2] => Float2,
    [f32; 3] => Float3,
    [f32; 4] => Float4,
    Vec2 => Float2,
    Vec3 => Float3,
    Vec4 => Float4,
    i32 => Int,
    [i32; 2] => Int2,
    [i32; 3] => Int3,
    [i32; 4] => Int4,
    u32 => UInt,
    [u32; 2] => UInt2,
    [u32; 3] => UInt3,
    [u32; 4] => UInt4,
    Mat4 => Float4x4,
    [[f32; 4]; 4] => Float4x4,
}

enum SlotValue {
    Uniform {
        staging: Vec<u8>,
        dirty: bool,
        buffer: Option<wgpu::Buffer>,
    },
    Sampler(Option<Arc<Sampler>>),
    Texture(Option<wgpu::TextureView>),
}

struct Slot {
    resource: ResourceReflection,
    value: SlotValue,
}

/// Values for one bind group.
pub struct ParameterBlock {
    group: u32,
    slots: Vec<Slot>,
    bind_group: Option<wgpu::BindGroup>,
}

impl ParameterBlock {
    fn new(reflection: &ParameterBlockReflection) -> Self {
        let slots = reflection
            .resources()
            .iter()
            .map(|resource| Slot {
                value: match &resource.kind {
                    ResourceKind::UniformBuffer(block) => SlotValue::Uniform {
                        staging: vec![0; block.size as usize],
                        dirty: true,
                        buffer: None,
                    },
                    ResourceKind::Sampler { .. } => SlotValue::Sampler(None),
                    ResourceKind::Texture2D => SlotValue::Texture(None),
                },
                resource: resource.clone(),
            })
            .collect();

        Self {
            group: reflection.group(),
            slots,
            bind_group: None,
        }
    }

    pub fn group(&self) -> u32 {
        self.group
    }

    pub fn resource_binding(&self, name: &str) -> Option<BindLocation> {
        self.slots
            .iter()
            .find(|s| s.resource.name == name)
            .map(|s| s.resource.location)
    }

    /// Returns a writer for the uniform buffer at `location`.
    ///
    /// Arrays of uniform buffers are not supported; `array_index` must be 0.
    pub fn constant_buffer(
        &mut self,
        location: BindLocation,
        array_index: u32,
    ) -> RenderResult<ConstantBufferVar<'_>> {
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.resource.location == location)
            .ok_or_else(|| {
                RenderError::UnknownResource(format!(
                    "(group {}, binding {})",
                    location.group, location.binding
                ))
            })?;

        if array_index != 0 {
            return Err(RenderError::UnknownResource(format!(
                "{}[{array_index}]",
                slot.resource.name
            )));
        }

        match (&slot.resource.kind, &mut slot.value) {
            (ResourceKind::UniformBuffer(block), SlotValue::Uniform { staging, dirty, .. }) => {
                Ok(ConstantBufferVar {
                    block,
                    staging,
                    dirty,
                })
            }
            _ => Err(RenderError::UnknownResource(slot.resource.name.clone())),
        }
    }

    /// Looks the uniform buffer up by variable name.
    pub fn constant_buffer_by_name(&mut self, name: &str) -> RenderResult<ConstantBufferVar<'_>> {
        let location = self
            .resource_binding(name)
            .ok_or_else(|| RenderError::UnknownResource(name.to_string()))?;
        self.constant_buffer(location, 0)
    }

    pub fn set_sampler(&mut self, name: &str, sampler: &Arc<Sampler>) -> RenderResult<()> {
        let slot = self.slot_mut(name)?;
        let SlotValue::Sampler(value) = &mut slot.value else {
            return Err(RenderError::UnknownResource(name.to_string()));
        };
        *value = Some(Arc::clone(sampler));
        self.bind_group = None;
        Ok(())
    }

    pub fn set_texture(&mut self, name: &str, view: &wgpu::TextureView) -> RenderResult<()> {
        let slot = self.slot_mut(name)?;
        let SlotValue::Texture(value) = &mut slot.value else {
            return Err(RenderError::UnknownResource(name.to_string()));
        };
        *value = Some(view.clone());
        self.bind_group = None;
        Ok(())
    }

    fn slot_mut(&mut self, name: &str) -> RenderResult<&mut Slot> {
        self.slots
            .iter_mut()
            .find(|s| s.resource.name == name)
            .ok_or_else(|| RenderError::UnknownResource(name.to_string()))
    }

    fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
    ) -> RenderResult<()> {
        for slot in &mut self.slots {
            let SlotValue::Uniform {
                staging,
                dirty,
                buffer,
            } = &mut slot.value
            else {
                continue;
            };

            if buffer.is_none() {
                *buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("lumen ubo `{}`", slot.resource.name)),
                    size: staging.len() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                }));
                self.bind_group = None;
            }

            if *dirty {
                if let Some(buffer) = buffer.as_ref() {
                    queue.write_buffer(buffer, 0, staging);
                }
                *dirty = false;
            }
        }

        if self.bind_group.is_some() {
            return Ok(());
        }

        let entries = self
            .slots
            .iter()
            .map(|slot| {
                let resource = match &slot.value {
                    SlotValue::Uniform {
                        buffer: Some(buffer),
                        ..
                    } => buffer.as_entire_binding(),
                    SlotValue::Sampler(Some(sampler)) => {
                        wgpu::BindingResource::Sampler(sampler.raw())
                    }
                    SlotValue::Texture(Some(view)) => wgpu::BindingResource::TextureView(view),
                    _ => return Err(RenderError::UnboundResource(slot.resource.name.clone())),
                };
                Ok(wgpu::BindGroupEntry {
                    binding: slot.resource.location.binding,
                    resource,
                })
            })
            .collect::<RenderResult<Vec<_>>>()?;

        self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("lumen bind group {}", self.group)),
            layout,
            entries: &entries,
        }));

        Ok(())
    }
}

/// Writer for one uniform buffer's CPU staging.
pub struct ConstantBufferVar<'a> {
    block: &'a UniformBlockReflection,
    staging: &'a mut Vec<u8>,
    dirty: &'a mut bool,
}

impl ConstantBufferVar<'_> {
    pub fn reflection(&self) -> &UniformBlockReflection {
        self.block
    }

    /// Writes `value` into the named field.
    pub fn set<T: UniformValue>(&mut self, field: &str, value: T) -> RenderResult<()> {
        let range = self.field_range::<T>(field)?;
        self.staging[range].copy_from_slice(bytemuck::bytes_of(&value));
        *self.dirty = true;
        Ok(())
    }

    /// Reads the staged value of the named field.
    pub fn get<T: UniformValue>(&self, field: &str) -> RenderResult<T> {
        let range = self.field_range::<T>(field)?;
        Ok(bytemuck::pod_read_unaligned(&self.staging[range]))
    }

    /// Raw staged bytes of the whole block.
    pub fn bytes(&self) -> &[u8] {
        self.staging.as_slice()
    }

    fn field_range<T: UniformValue>(&self, field: &str) -> RenderResult<std::ops::Range<usize>> {
        let f = self.block.field(field).ok_or_else(|| RenderError::UnknownField {
            block: self.block.name.clone(),
            field: field.to_string(),
        })?;

        if f.ty != T::TYPE {
            return Err(RenderError::TypeMismatch {
                field: field.to_string(),
                expected: f.ty,
                actual: T::TYPE,
            });
        }

        let start = f.offset as usize;
        Ok(start..start + std::mem::size_of::<T>())
    }
}

/// Values for every parameter block of a program.
pub struct GraphicsVars {
    reflection: Arc<ProgramReflection>,
    blocks: Vec<ParameterBlock>,
}

impl GraphicsVars {
    pub fn new(reflection: Arc<ProgramReflection>) -> Self {
        let blocks = reflection
            .parameter_blocks()
            .iter()
            .map(ParameterBlock::new)
            .collect();
        Self { reflection, blocks }
    }

    pub fn reflection(&self) -> &Arc<ProgramReflection> {
        &self.reflection
    }

    pub fn default_block(&self) -> &ParameterBlock {
        &self.blocks[0]
    }

    pub fn default_block_mut(&mut self) -> &mut ParameterBlock {
        &mut self.blocks[0]
    }

    pub fn block_mut(&mut self, group: u32) -> Option<&mut ParameterBlock> {
        self.blocks.get_mut(group as usize)
    }

    /// Uploads dirty uniforms and (re)builds bind groups for `program`.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        program: &Program,
    ) -> RenderResult<()> {
        let same_program = Arc::ptr_eq(&self.reflection, program.reflector())
            || *self.reflection == **program.reflector();
        if !same_program {
            return Err(RenderError::ProgramMismatch);
        }

        for block in &mut self.blocks {
            let layout = program
                .bind_group_layout(block.group)
                .ok_or(RenderError::ProgramMismatch)?;
            block.prepare(device, queue, layout)?;
        }

        Ok(())
    }

    /// Bind groups built by the last `prepare`, with their group index.
    pub(crate) fn bind_groups(&self) -> impl Iterator<Item = (u32, &wgpu::BindGroup)> {
        self.blocks
            .iter()
            .filter_map(|b| b.bind_group.as_ref().map(|g| (b.group, g)))
    }
}
