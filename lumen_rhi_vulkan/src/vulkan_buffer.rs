/// Buffer - Vulkan buffers and staging memory
///
/// Buffers with CPU access flags live in host-visible memory and are read,
/// written and mapped directly. Device-local buffers go through a temporary
/// staging buffer and a one-shot command buffer.

use std::sync::Arc;

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use lumen_rhi::lumen::render::{
    resolve_buffer_range, BindFlags, BufferDescriptor, CpuAccess, CpuAccessFlags, MappedBuffer, MiscFlags,
};
use lumen_rhi::lumen::{Error, Result};
use lumen_rhi::lumen_err;

use crate::vulkan_context::{map_vk_error, GpuContext, SOURCE};

/// Create a buffer and bind freshly allocated memory to it
pub(crate) fn create_raw_buffer(
    ctx: &GpuContext,
    name: &str,
    size: u64,
    usage: vk::BufferUsageFlags,
    location: MemoryLocation,
) -> Result<(vk::Buffer, Allocation)> {
    let info = vk::BufferCreateInfo::default()
        .size(size)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);

    unsafe {
        let buffer = ctx
            .device
            .create_buffer(&info, None)
            .map_err(|e| map_vk_error("vkCreateBuffer", e))?;
        let requirements = ctx.device.get_buffer_memory_requirements(buffer);

        let allocation = match ctx.allocate(name, requirements, location, true) {
            Ok(allocation) => allocation,
            Err(e) => {
                ctx.device.destroy_buffer(buffer, None);
                return Err(e);
            }
        };
        if let Err(e) = ctx
            .device
            .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
        {
            ctx.free(allocation);
            ctx.device.destroy_buffer(buffer, None);
            return Err(map_vk_error("vkBindBufferMemory", e));
        }
        Ok((buffer, allocation))
    }
}

// ============================================================================
// STAGING BUFFER
// ============================================================================

/// Temporary host-visible buffer for uploads and readbacks
pub(crate) struct StagingBuffer {
    ctx: Arc<GpuContext>,
    pub buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: usize,
}

impl StagingBuffer {
    /// Staging buffer the CPU writes and the GPU copies from
    pub fn upload(ctx: &Arc<GpuContext>, data: &[u8]) -> Result<Self> {
        let mut staging = Self::new(ctx, data.len() as u64, MemoryLocation::CpuToGpu, vk::BufferUsageFlags::TRANSFER_SRC)?;
        staging.bytes_mut()?.copy_from_slice(data);
        Ok(staging)
    }

    /// Staging buffer the GPU copies into and the CPU reads
    pub fn readback(ctx: &Arc<GpuContext>, size: u64) -> Result<Self> {
        Self::new(ctx, size, MemoryLocation::GpuToCpu, vk::BufferUsageFlags::TRANSFER_DST)
    }

    fn new(ctx: &Arc<GpuContext>, size: u64, location: MemoryLocation, usage: vk::BufferUsageFlags) -> Result<Self> {
        let (buffer, allocation) = create_raw_buffer(ctx, "staging", size.max(4), usage, location)?;
        Ok(Self {
            ctx: Arc::clone(ctx),
            buffer,
            allocation: Some(allocation),
            size: size as usize,
        })
    }

    pub fn bytes(&self) -> Result<&[u8]> {
        self.allocation
            .as_ref()
            .and_then(|a| a.mapped_slice())
            .map(|slice| &slice[..self.size])
            .ok_or_else(|| lumen_err!(SOURCE, "staging buffer is not host visible"))
    }

    pub fn bytes_mut(&mut self) -> Result<&mut [u8]> {
        let size = self.size;
        self.allocation
            .as_mut()
            .and_then(|a| a.mapped_slice_mut())
            .map(|slice| &mut slice[..size])
            .ok_or_else(|| lumen_err!(SOURCE, "staging buffer is not host visible"))
    }
}

impl Drop for StagingBuffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            self.ctx.free(allocation);
        }
        unsafe { self.ctx.device.destroy_buffer(self.buffer, None) };
    }
}

/// Barrier making transfer writes visible to host reads
pub(crate) fn transfer_to_host_barrier(device: &ash::Device, command_buffer: vk::CommandBuffer) {
    let barrier = vk::MemoryBarrier::default()
        .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
        .dst_access_mask(vk::AccessFlags::HOST_READ);
    unsafe {
        device.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::HOST,
            vk::DependencyFlags::empty(),
            &[barrier],
            &[],
            &[],
        );
    }
}

// ============================================================================
// BUFFER
// ============================================================================

/// Active CPU mapping of a buffer range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferMapping {
    pub access: CpuAccess,
    pub offset: u64,
    pub size: u64,
}

/// Vulkan buffer
pub struct VulkanBuffer {
    /// Shared GPU context (device, allocator, queue, command pool)
    ctx: Arc<GpuContext>,
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    allocation: Option<Allocation>,
    pub(crate) desc: BufferDescriptor,
    pub(crate) mapping: Option<BufferMapping>,
}

fn usage_flags(bind_flags: BindFlags) -> vk::BufferUsageFlags {
    let mut usage = vk::BufferUsageFlags::TRANSFER_SRC | vk::BufferUsageFlags::TRANSFER_DST;
    if bind_flags.contains(BindFlags::VERTEX_BUFFER) {
        usage |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if bind_flags.contains(BindFlags::INDEX_BUFFER) {
        usage |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    if bind_flags.contains(BindFlags::CONSTANT_BUFFER) {
        usage |= vk::BufferUsageFlags::UNIFORM_BUFFER;
    }
    if bind_flags.contains(BindFlags::STORAGE) {
        usage |= vk::BufferUsageFlags::STORAGE_BUFFER;
    }
    if bind_flags.contains(BindFlags::INDIRECT_BUFFER) {
        usage |= vk::BufferUsageFlags::INDIRECT_BUFFER;
    }
    usage
}

fn memory_location(cpu_access: CpuAccessFlags) -> MemoryLocation {
    if cpu_access.contains(CpuAccessFlags::READ) {
        MemoryLocation::GpuToCpu
    } else if cpu_access.contains(CpuAccessFlags::WRITE) {
        MemoryLocation::CpuToGpu
    } else {
        MemoryLocation::GpuOnly
    }
}

impl VulkanBuffer {
    /// Create a buffer, upload initial data or zero it
    pub fn new(ctx: &Arc<GpuContext>, desc: &BufferDescriptor, initial_data: Option<&[u8]>) -> Result<Self> {
        let name = desc.debug_name.as_deref().unwrap_or("buffer");
        let (buffer, allocation) = create_raw_buffer(
            ctx,
            name,
            desc.size,
            usage_flags(desc.bind_flags),
            memory_location(desc.cpu_access_flags),
        )?;
        if let Some(debug_name) = &desc.debug_name {
            ctx.set_object_name(buffer, debug_name);
        }

        let mut this = Self {
            ctx: Arc::clone(ctx),
            buffer,
            allocation: Some(allocation),
            desc: desc.clone(),
            mapping: None,
        };

        match initial_data {
            Some(data) if !data.is_empty() => this.write(0, data)?,
            _ if !desc.misc_flags.contains(MiscFlags::NO_INITIAL_DATA) => this.zero()?,
            _ => {}
        }
        Ok(this)
    }

    fn zero(&mut self) -> Result<()> {
        if let Some(bytes) = self.host_slice() {
            bytes.fill(0);
            return Ok(());
        }
        let buffer = self.buffer;
        let device = &self.ctx.device;
        self.ctx.immediate_submit(|cb| unsafe {
            device.cmd_fill_buffer(cb, buffer, 0, vk::WHOLE_SIZE, 0);
        })
    }

    /// Host-visible bytes of the whole buffer, `None` for device-local memory
    fn host_slice(&mut self) -> Option<&mut [u8]> {
        let size = self.desc.size as usize;
        self.allocation
            .as_mut()
            .and_then(|a| a.mapped_slice_mut())
            .map(|slice| &mut slice[..size])
    }

    pub fn is_mapped(&self) -> bool {
        self.mapping.is_some()
    }

    fn check_not_mapped(&self, what: &str) -> Result<()> {
        if self.is_mapped() {
            return Err(Error::InvalidState(format!(
                "{} on a mapped buffer; call unmap_buffer first",
                what
            )));
        }
        Ok(())
    }

    /// Write bytes at `offset`
    pub fn write(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        self.check_not_mapped("write_buffer")?;
        resolve_buffer_range(self.desc.size, offset, data.len() as u64)?;
        if data.is_empty() {
            return Ok(());
        }

        let ctx = Arc::clone(&self.ctx);
        if let Some(bytes) = self.host_slice() {
            // Pending GPU reads of the old contents must finish first
            ctx.wait_idle()?;
            bytes[offset as usize..offset as usize + data.len()].copy_from_slice(data);
            return Ok(());
        }

        let staging = StagingBuffer::upload(&ctx, data)?;
        let region = vk::BufferCopy::default()
            .src_offset(0)
            .dst_offset(offset)
            .size(data.len() as u64);
        let (src, dst) = (staging.buffer, self.buffer);
        ctx.immediate_submit(|cb| unsafe {
            ctx.device.cmd_copy_buffer(cb, src, dst, &[region]);
        })
    }

    /// Read bytes at `offset` into `data`
    pub fn read(&mut self, offset: u64, data: &mut [u8]) -> Result<()> {
        self.check_not_mapped("read_buffer")?;
        resolve_buffer_range(self.desc.size, offset, data.len() as u64)?;
        if data.is_empty() {
            return Ok(());
        }

        let ctx = Arc::clone(&self.ctx);
        if let Some(bytes) = self.host_slice() {
            ctx.wait_idle()?;
            data.copy_from_slice(&bytes[offset as usize..offset as usize + data.len()]);
            return Ok(());
        }

        let staging = StagingBuffer::readback(&ctx, data.len() as u64)?;
        let region = vk::BufferCopy::default()
            .src_offset(offset)
            .dst_offset(0)
            .size(data.len() as u64);
        let (src, dst) = (self.buffer, staging.buffer);
        ctx.immediate_submit(|cb| unsafe {
            ctx.device.cmd_copy_buffer(cb, src, dst, &[region]);
            transfer_to_host_barrier(&ctx.device, cb);
        })?;
        data.copy_from_slice(staging.bytes()?);
        Ok(())
    }

    /// Map a range for CPU access
    pub fn map(&mut self, access: CpuAccess, offset: u64, size: u64) -> Result<MappedBuffer<'_>> {
        if self.is_mapped() {
            return Err(Error::InvalidState(format!(
                "buffer {:?} is already mapped",
                self.desc.debug_name
            )));
        }
        let required = access.required_flags();
        if !self.desc.cpu_access_flags.contains(required) {
            return Err(lumen_rhi::lumen_invalid!(
                SOURCE,
                "{:?} mapping needs CPU access flags {:?}",
                access, required
            ));
        }
        let size = resolve_buffer_range(self.desc.size, offset, size)?;

        // The GPU may still be using the range
        self.ctx.wait_idle()?;
        self.mapping = Some(BufferMapping { access, offset, size });

        let data = self
            .host_slice()
            .ok_or_else(|| lumen_err!(SOURCE, "buffer with CPU access is not host visible"))?;
        let data = &mut data[offset as usize..(offset + size) as usize];
        if access == CpuAccess::WriteDiscard {
            data.fill(0);
        }
        Ok(MappedBuffer::new(data, access))
    }

    pub fn unmap(&mut self) -> Result<()> {
        if self.mapping.take().is_none() {
            return Err(Error::InvalidState(format!(
                "buffer {:?} is not mapped",
                self.desc.debug_name
            )));
        }
        Ok(())
    }
}

impl Drop for VulkanBuffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            self.ctx.free(allocation);
        }
        unsafe { self.ctx.device.destroy_buffer(self.buffer, None) };
    }
}

#[cfg(test)]
#[path = "vulkan_buffer_tests.rs"]
mod tests;
