/// Resource heap descriptor and resource views

use crate::error::Result;
use crate::render::{BufferHandle, PipelineLayoutDescriptor, PipelineLayoutHandle, SamplerHandle, TextureHandle};

/// Resource bound into a heap slot or with `set_resource`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceViewDescriptor {
    Buffer(BufferHandle),
    Texture(TextureHandle),
    Sampler(SamplerHandle),
}

/// Descriptor for creating a resource heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceHeapDescriptor {
    pub pipeline_layout: Option<PipelineLayoutHandle>,
    /// Number of views; 0 takes the length of the initial view list
    pub num_resource_views: u32,
}

const SOURCE: &str = "lumen::ResourceHeap";

/// Number of descriptor sets a heap holds for a layout and view count
///
/// # Errors
///
/// `InvalidArgument` if the layout has no heap bindings or the view count is
/// not a non-zero multiple of them.
pub fn resource_heap_num_sets(layout: &PipelineLayoutDescriptor, num_views: u32) -> Result<u32> {
    let bindings_per_set = layout.heap_bindings.len() as u32;
    if bindings_per_set == 0 {
        return Err(crate::lumen_invalid!(SOURCE, "pipeline layout has no heap bindings"));
    }
    if num_views == 0 || num_views % bindings_per_set != 0 {
        return Err(crate::lumen_invalid!(
            SOURCE,
            "{} resource views is not a non-zero multiple of {} heap bindings",
            num_views, bindings_per_set
        ));
    }
    Ok(num_views / bindings_per_set)
}
