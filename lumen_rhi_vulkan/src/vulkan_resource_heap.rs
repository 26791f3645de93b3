/// Resource heaps - descriptor sets filled from resource views
///
/// A heap owns an exact-size pool holding one heap-set (set 0) per group of
/// heap bindings. View `i` lands in set `i / bindings_per_set`, in the
/// binding `i % bindings_per_set` of the layout.

use std::sync::Arc;

use ash::vk;
use lumen_rhi::lumen::render::{BindFlags, BindingDescriptor, BufferHandle, ResourceViewDescriptor};
use lumen_rhi::lumen::Result;
use lumen_rhi::lumen_invalid;

use crate::vulkan_context::{map_vk_error, GpuContext, SOURCE};
use crate::vulkan_pipeline::{pool_sizes, NativeLayout, SetEntry, HEAP_SET};

/// Native resource a descriptor points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BoundResource {
    Buffer { buffer: vk::Buffer, bind_flags: BindFlags },
    Image { view: vk::ImageView, layout: vk::ImageLayout, bind_flags: BindFlags },
    Sampler(vk::Sampler),
}

/// Check that a resource can back a descriptor of the given type
pub(crate) fn check_descriptor(descriptor_type: vk::DescriptorType, resource: &BoundResource) -> Result<()> {
    let required = match (descriptor_type, resource) {
        (vk::DescriptorType::UNIFORM_BUFFER, BoundResource::Buffer { bind_flags, .. }) => {
            (BindFlags::CONSTANT_BUFFER, *bind_flags)
        }
        (vk::DescriptorType::STORAGE_BUFFER, BoundResource::Buffer { bind_flags, .. }) => {
            (BindFlags::STORAGE, *bind_flags)
        }
        (vk::DescriptorType::SAMPLED_IMAGE, BoundResource::Image { bind_flags, .. }) => {
            (BindFlags::SAMPLED, *bind_flags)
        }
        (vk::DescriptorType::STORAGE_IMAGE, BoundResource::Image { bind_flags, .. }) => {
            (BindFlags::STORAGE, *bind_flags)
        }
        (vk::DescriptorType::SAMPLER, BoundResource::Sampler(_)) => return Ok(()),
        _ => {
            return Err(lumen_invalid!(
                SOURCE,
                "{:?} cannot back a {:?} descriptor",
                resource, descriptor_type
            ))
        }
    };
    let (flag, bind_flags) = required;
    if !bind_flags.contains(flag) {
        return Err(lumen_invalid!(
            SOURCE,
            "resource bound as {:?} was not created with {:?}",
            descriptor_type, flag
        ));
    }
    Ok(())
}

enum PendingInfo {
    Buffer(usize),
    Image(usize),
}

/// Batches descriptor writes into one vkUpdateDescriptorSets call
#[derive(Default)]
pub(crate) struct DescriptorWriter {
    buffer_infos: Vec<vk::DescriptorBufferInfo>,
    image_infos: Vec<vk::DescriptorImageInfo>,
    pending: Vec<(vk::DescriptorSet, u32, vk::DescriptorType, PendingInfo)>,
}

impl DescriptorWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a write of element 0 of `entry`
    pub fn push(&mut self, set: vk::DescriptorSet, entry: &SetEntry, resource: &BoundResource) -> Result<()> {
        check_descriptor(entry.descriptor_type, resource)?;
        let info = match *resource {
            BoundResource::Buffer { buffer, .. } => {
                self.buffer_infos.push(vk::DescriptorBufferInfo {
                    buffer,
                    offset: 0,
                    range: vk::WHOLE_SIZE,
                });
                PendingInfo::Buffer(self.buffer_infos.len() - 1)
            }
            BoundResource::Image { view, layout, .. } => {
                self.image_infos.push(vk::DescriptorImageInfo {
                    sampler: vk::Sampler::null(),
                    image_view: view,
                    image_layout: layout,
                });
                PendingInfo::Image(self.image_infos.len() - 1)
            }
            BoundResource::Sampler(sampler) => {
                self.image_infos.push(vk::DescriptorImageInfo {
                    sampler,
                    image_view: vk::ImageView::null(),
                    image_layout: vk::ImageLayout::UNDEFINED,
                });
                PendingInfo::Image(self.image_infos.len() - 1)
            }
        };
        self.pending.push((set, entry.slot, entry.descriptor_type, info));
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn flush(self, device: &ash::Device) {
        if self.pending.is_empty() {
            return;
        }
        let writes: Vec<vk::WriteDescriptorSet> = self
            .pending
            .iter()
            .map(|(set, slot, descriptor_type, info)| {
                let write = vk::WriteDescriptorSet::default()
                    .dst_set(*set)
                    .dst_binding(*slot)
                    .dst_array_element(0)
                    .descriptor_type(*descriptor_type);
                match info {
                    PendingInfo::Buffer(i) => write.buffer_info(std::slice::from_ref(&self.buffer_infos[*i])),
                    PendingInfo::Image(i) => write.image_info(std::slice::from_ref(&self.image_infos[*i])),
                }
            })
            .collect();
        unsafe { device.update_descriptor_sets(&writes, &[]) };
    }
}

/// Vulkan resource heap
pub struct VulkanResourceHeap {
    ctx: Arc<GpuContext>,
    pool: vk::DescriptorPool,
    pub(crate) sets: Vec<vk::DescriptorSet>,
    pub(crate) layout: Arc<NativeLayout>,
    /// Heap bindings of the layout, for checking written views
    pub(crate) bindings: Vec<BindingDescriptor>,
    pub(crate) debug_name: Option<String>,
    pub(crate) num_views: u32,
    /// Buffer written into each view slot, for the mapped-buffer check at submit
    buffer_slots: Vec<Option<BufferHandle>>,
}

/// Overwrite the tracked buffer of every slot in `[first, first + views.len())`
pub(crate) fn record_buffer_views(slots: &mut [Option<BufferHandle>], first: u32, views: &[ResourceViewDescriptor]) {
    for (slot, view) in slots.iter_mut().skip(first as usize).zip(views) {
        *slot = match view {
            ResourceViewDescriptor::Buffer(buffer) => Some(*buffer),
            _ => None,
        };
    }
}

impl VulkanResourceHeap {
    /// Allocate `num_sets` heap sets; the views are written separately
    pub(crate) fn new(
        ctx: &Arc<GpuContext>,
        layout: Arc<NativeLayout>,
        bindings: &[BindingDescriptor],
        num_sets: u32,
        num_views: u32,
    ) -> Result<Self> {
        let sizes = pool_sizes(&layout.heap_entries, num_sets);
        let pool_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(num_sets)
            .pool_sizes(&sizes);
        let pool = unsafe { ctx.device.create_descriptor_pool(&pool_info, None) }
            .map_err(|e| map_vk_error("vkCreateDescriptorPool", e))?;
        let mut heap = Self {
            ctx: Arc::clone(ctx),
            pool,
            sets: Vec::new(),
            layout,
            bindings: bindings.to_vec(),
            debug_name: None,
            num_views,
            buffer_slots: vec![None; num_views as usize],
        };
        let set_layouts = vec![heap.layout.set_layouts[HEAP_SET as usize]; num_sets as usize];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&set_layouts);
        heap.sets = unsafe { ctx.device.allocate_descriptor_sets(&alloc_info) }
            .map_err(|e| map_vk_error("vkAllocateDescriptorSets", e))?;
        Ok(heap)
    }

    pub fn num_sets(&self) -> u32 {
        self.sets.len() as u32
    }

    /// Buffers currently written into any slot
    pub(crate) fn buffer_views(&self) -> Vec<BufferHandle> {
        self.buffer_slots.iter().flatten().copied().collect()
    }

    /// Write `views`, resolved to `resources`, starting at descriptor `first`
    pub(crate) fn write(&mut self, first: u32, views: &[ResourceViewDescriptor], resources: &[BoundResource]) -> Result<()> {
        let bindings_per_set = self.layout.heap_entries.len();
        let mut writer = DescriptorWriter::new();
        for (i, resource) in resources.iter().enumerate() {
            let index = first as usize + i;
            let set = self.sets[index / bindings_per_set];
            let entry = &self.layout.heap_entries[index % bindings_per_set];
            writer.push(set, entry, resource)?;
        }
        writer.flush(&self.ctx.device);
        record_buffer_views(&mut self.buffer_slots, first, views);
        Ok(())
    }

    pub(crate) fn set_debug_name(&mut self, name: &str) {
        self.debug_name = Some(name.to_string());
        self.ctx.set_object_name(self.pool, name);
    }
}

impl Drop for VulkanResourceHeap {
    fn drop(&mut self) {
        // Sets are freed with their pool
        unsafe { self.ctx.device.destroy_descriptor_pool(self.pool, None) };
    }
}

#[cfg(test)]
#[path = "vulkan_resource_heap_tests.rs"]
mod tests;
