/// Pipeline layout descriptor: heap bindings, dynamic bindings, static samplers and uniforms

use crate::render::{BindFlags, SamplerDescriptor, StageFlags};

/// Kind of resource a binding slot accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Buffer,
    Texture,
    Sampler,
}

/// One binding slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingDescriptor {
    pub name: String,
    pub resource_type: ResourceType,
    /// Usage of the bound resource (e.g. CONSTANT_BUFFER, SAMPLED, STORAGE)
    pub bind_flags: BindFlags,
    pub stage_flags: StageFlags,
    pub slot: u32,
    pub array_size: u32,
}

impl BindingDescriptor {
    pub fn new(resource_type: ResourceType, bind_flags: BindFlags, stage_flags: StageFlags, slot: u32) -> Self {
        Self {
            name: String::new(),
            resource_type,
            bind_flags,
            stage_flags,
            slot,
            array_size: 1,
        }
    }
}

/// Immutable sampler baked into the layout
#[derive(Debug, Clone, PartialEq)]
pub struct StaticSamplerDescriptor {
    pub name: String,
    pub stage_flags: StageFlags,
    pub slot: u32,
    pub sampler: SamplerDescriptor,
}

/// Uniform (push constant) range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDescriptor {
    pub name: String,
    pub stage_flags: StageFlags,
    /// Size in bytes
    pub size: u32,
}

/// Descriptor for creating a pipeline layout
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineLayoutDescriptor {
    pub debug_name: Option<String>,
    /// Bindings filled through resource heaps
    pub heap_bindings: Vec<BindingDescriptor>,
    /// Bindings filled individually with `set_resource`
    pub bindings: Vec<BindingDescriptor>,
    pub static_samplers: Vec<StaticSamplerDescriptor>,
    pub uniforms: Vec<UniformDescriptor>,
}

impl PipelineLayoutDescriptor {
    /// Total size in bytes of all uniforms
    pub fn uniforms_size(&self) -> u32 {
        self.uniforms.iter().map(|u| u.size).sum()
    }

    /// True if any binding or sampler carries a name
    pub fn has_named_bindings(&self) -> bool {
        self.heap_bindings.iter().any(|b| !b.name.is_empty())
            || self.bindings.iter().any(|b| !b.name.is_empty())
            || self.static_samplers.iter().any(|s| !s.name.is_empty())
    }
}
