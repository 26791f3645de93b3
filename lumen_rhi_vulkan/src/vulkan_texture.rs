/// Texture - Vulkan images, views, uploads, readbacks and MIP generation
///
/// Every texture rests in one layout derived from its bind flags. Commands
/// that need another layout transition the touched subresources and put
/// them back afterwards, so no per-subresource layout tracking is needed.

use std::sync::Arc;

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use lumen_rhi::lumen::format::{fold_texture_region, is_cube_texture, is_multi_sample_texture, mip_extent_for, Format};
use lumen_rhi::lumen::null::TexelUnit;
use lumen_rhi::lumen::render::{
    BindFlags, Extent3D, MiscFlags, Offset3D, TextureDescriptor, TextureRegion, TextureSubresource, TextureType,
};
use lumen_rhi::lumen::Result;
use lumen_rhi::{lumen_invalid, lumen_trace};

use crate::vulkan_buffer::{transfer_to_host_barrier, StagingBuffer};
use crate::vulkan_context::{map_vk_error, GpuContext, SOURCE};
use crate::vulkan_format::{aspect_flags, format_to_vk, sample_count_to_vk, texture_type_to_vk};

// ============================================================================
// LAYOUTS AND BARRIERS
// ============================================================================

/// Layout a texture returns to between commands
pub(crate) fn resting_layout(format: Format, bind_flags: BindFlags) -> vk::ImageLayout {
    if bind_flags.contains(BindFlags::STORAGE) {
        vk::ImageLayout::GENERAL
    } else if bind_flags.contains(BindFlags::SAMPLED) {
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
    } else if format.is_depth_or_stencil() && bind_flags.contains(BindFlags::DEPTH_STENCIL_ATTACHMENT) {
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
    } else if bind_flags.contains(BindFlags::COLOR_ATTACHMENT) {
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
    } else {
        vk::ImageLayout::GENERAL
    }
}

/// Layout used while a texture is bound as a render pass attachment
pub(crate) fn attachment_layout(format: Format) -> vk::ImageLayout {
    if format.is_depth_or_stencil() {
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
    } else {
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
    }
}

pub(crate) fn image_usage(bind_flags: BindFlags) -> vk::ImageUsageFlags {
    let mut usage = vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST;
    if bind_flags.contains(BindFlags::SAMPLED) {
        usage |= vk::ImageUsageFlags::SAMPLED;
    }
    if bind_flags.contains(BindFlags::STORAGE) {
        usage |= vk::ImageUsageFlags::STORAGE;
    }
    if bind_flags.contains(BindFlags::COLOR_ATTACHMENT) {
        usage |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if bind_flags.contains(BindFlags::DEPTH_STENCIL_ATTACHMENT) {
        usage |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    usage
}

/// Full pipeline barrier with a layout transition
pub(crate) fn image_barrier(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    range: vk::ImageSubresourceRange,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) {
    if old_layout == new_layout && old_layout != vk::ImageLayout::GENERAL {
        return;
    }
    let barrier = vk::ImageMemoryBarrier::default()
        .src_access_mask(vk::AccessFlags::MEMORY_WRITE)
        .dst_access_mask(vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE)
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(range);
    unsafe {
        device.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::ALL_COMMANDS,
            vk::PipelineStageFlags::ALL_COMMANDS,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
}

pub(crate) fn create_image_view(
    ctx: &GpuContext,
    image: vk::Image,
    view_type: vk::ImageViewType,
    format: vk::Format,
    range: vk::ImageSubresourceRange,
) -> Result<vk::ImageView> {
    let info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(view_type)
        .format(format)
        .components(vk::ComponentMapping::default())
        .subresource_range(range);
    unsafe { ctx.device.create_image_view(&info, None) }.map_err(|e| map_vk_error("vkCreateImageView", e))
}

// ============================================================================
// REGIONS
// ============================================================================

/// Validated texture region in Vulkan terms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ImageRegion {
    pub mip_level: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
    pub offset: vk::Offset3D,
    pub extent: vk::Extent3D,
    /// Layer-folded extent in storage units (texels or blocks)
    pub folded_units: [u32; 3],
}

/// Buffer side of a buffer/image copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BufferLayout {
    /// Row length in texels, 0 for tightly packed
    pub row_length: u32,
    /// Rows per image slice in texels, 0 for tightly packed
    pub image_height: u32,
    /// Bytes the copy reads or writes
    pub size: u64,
}

/// Vulkan image for a texture
pub struct VulkanTexture {
    ctx: Arc<GpuContext>,
    pub(crate) image: vk::Image,
    /// View over every subresource, used for sampling and storage
    pub(crate) view: vk::ImageView,
    allocation: Option<Allocation>,
    /// Normalized descriptor
    pub(crate) desc: TextureDescriptor,
    pub(crate) vk_format: vk::Format,
    pub(crate) aspect: vk::ImageAspectFlags,
    pub(crate) resting_layout: vk::ImageLayout,
    unit: TexelUnit,
}

impl VulkanTexture {
    /// Create a texture from a normalized descriptor
    ///
    /// `initial_data` holds MIP level 0 of every layer, tightly packed.
    pub fn new(ctx: &Arc<GpuContext>, desc: &TextureDescriptor, initial_data: Option<&[u8]>) -> Result<Self> {
        let multi_sample = is_multi_sample_texture(desc.texture_type);
        if multi_sample && initial_data.is_some() {
            return Err(lumen_invalid!(SOURCE, "multisample textures cannot take initial data"));
        }

        let (image_type, view_type) = texture_type_to_vk(desc.texture_type);
        let vk_format = format_to_vk(desc.format);
        let mut flags = vk::ImageCreateFlags::empty();
        if is_cube_texture(desc.texture_type) {
            flags |= vk::ImageCreateFlags::CUBE_COMPATIBLE;
        }
        if desc.texture_type == TextureType::Texture3D && desc.bind_flags.contains(BindFlags::COLOR_ATTACHMENT) {
            flags |= vk::ImageCreateFlags::TYPE_2D_ARRAY_COMPATIBLE;
        }

        let extent = vk_extent(desc.texture_type, desc.extent);
        let array_layers = if desc.texture_type == TextureType::Texture3D { 1 } else { desc.array_layers.max(1) };
        let samples = if multi_sample { sample_count_to_vk(desc.samples) } else { vk::SampleCountFlags::TYPE_1 };

        let image_info = vk::ImageCreateInfo::default()
            .flags(flags)
            .image_type(image_type)
            .format(vk_format)
            .extent(extent)
            .mip_levels(desc.mip_levels.max(1))
            .array_layers(array_layers)
            .samples(samples)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(image_usage(desc.bind_flags))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let name = desc.debug_name.as_deref().unwrap_or("texture");
        let image = unsafe { ctx.device.create_image(&image_info, None) }
            .map_err(|e| map_vk_error("vkCreateImage", e))?;

        let requirements = unsafe { ctx.device.get_image_memory_requirements(image) };
        let allocation = match ctx.allocate(name, requirements, MemoryLocation::GpuOnly, false) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { ctx.device.destroy_image(image, None) };
                return Err(e);
            }
        };
        if let Err(e) = unsafe { ctx.device.bind_image_memory(image, allocation.memory(), allocation.offset()) } {
            ctx.free(allocation);
            unsafe { ctx.device.destroy_image(image, None) };
            return Err(map_vk_error("vkBindImageMemory", e));
        }

        let aspect = aspect_flags(desc.format);
        let mut texture = Self {
            ctx: Arc::clone(ctx),
            image,
            view: vk::ImageView::null(),
            allocation: Some(allocation),
            desc: desc.clone(),
            vk_format,
            aspect,
            resting_layout: resting_layout(desc.format, desc.bind_flags),
            unit: TexelUnit::of(desc.format),
        };

        // Sampled depth-stencil views see the depth aspect only
        let view_aspect = if desc.format.is_depth() { vk::ImageAspectFlags::DEPTH } else { aspect };
        let mut view_range = texture.full_range();
        view_range.aspect_mask = view_aspect;
        texture.view = create_image_view(ctx, image, view_type, vk_format, view_range)?;

        if let Some(debug_name) = &desc.debug_name {
            ctx.set_object_name(image, debug_name);
        }

        texture.initialize(initial_data)?;
        if initial_data.is_some() && desc.misc_flags.contains(MiscFlags::GENERATE_MIPS) {
            texture.generate_mips(None)?;
        }

        lumen_trace!(
            SOURCE,
            "texture {:?} {:?} {}x{}x{}, {} layers, {} MIP levels",
            desc.texture_type,
            desc.format,
            desc.extent.width,
            desc.extent.height,
            desc.extent.depth,
            desc.array_layers,
            desc.mip_levels
        );
        Ok(texture)
    }

    /// Upload initial data or zero the image, then move it to its resting layout
    fn initialize(&mut self, initial_data: Option<&[u8]>) -> Result<()> {
        let mut uploads: Vec<(StagingBuffer, ImageRegion)> = Vec::new();

        if let Some(data) = initial_data {
            let region = self.check_region(&self.mip_region(0))?;
            let layout = self.buffer_layout(&region, 0, 0)?;
            if (data.len() as u64) < layout.size {
                return Err(lumen_invalid!(
                    SOURCE,
                    "initial data holds {} bytes but MIP 0 needs {}",
                    data.len(), layout.size
                ));
            }
            uploads.push((StagingBuffer::upload(&self.ctx, &data[..layout.size as usize])?, region));
        } else if !self.desc.misc_flags.contains(MiscFlags::NO_INITIAL_DATA) && self.desc.format.is_compressed() {
            // Compressed images cannot be cleared; upload zero blocks instead
            for level in 0..self.num_mip_levels() {
                let region = self.check_region(&self.mip_region(level))?;
                let layout = self.buffer_layout(&region, 0, 0)?;
                uploads.push((StagingBuffer::upload(&self.ctx, &vec![0u8; layout.size as usize])?, region));
            }
        }

        let zero = initial_data.is_none()
            && uploads.is_empty()
            && !self.desc.misc_flags.contains(MiscFlags::NO_INITIAL_DATA);
        let copy_aspect = if uploads.is_empty() { self.aspect } else { self.copy_aspect()? };
        let device = &self.ctx.device;
        let range = self.full_range();

        self.ctx.immediate_submit(|cb| unsafe {
            image_barrier(device, cb, self.image, range, vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
            for (staging, region) in &uploads {
                let copy = buffer_image_copy(0, copy_aspect, region, &BufferLayout { row_length: 0, image_height: 0, size: 0 });
                device.cmd_copy_buffer_to_image(
                    cb,
                    staging.buffer,
                    self.image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[copy],
                );
            }
            if zero {
                if self.desc.format.is_depth_or_stencil() {
                    let value = vk::ClearDepthStencilValue { depth: 0.0, stencil: 0 };
                    device.cmd_clear_depth_stencil_image(cb, self.image, vk::ImageLayout::TRANSFER_DST_OPTIMAL, &value, &[range]);
                } else {
                    let value = vk::ClearColorValue { float32: [0.0; 4] };
                    device.cmd_clear_color_image(cb, self.image, vk::ImageLayout::TRANSFER_DST_OPTIMAL, &value, &[range]);
                }
            }
            image_barrier(device, cb, self.image, range, vk::ImageLayout::TRANSFER_DST_OPTIMAL, self.resting_layout);
        })
    }

    pub(crate) fn unit(&self) -> TexelUnit {
        self.unit
    }

    pub fn num_mip_levels(&self) -> u32 {
        self.desc.mip_levels.max(1)
    }

    /// Array layers of the image (1 for volume textures)
    pub fn num_layers(&self) -> u32 {
        if self.desc.texture_type == TextureType::Texture3D {
            1
        } else {
            self.desc.array_layers.max(1)
        }
    }

    pub fn full_range(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: self.aspect,
            base_mip_level: 0,
            level_count: self.num_mip_levels(),
            base_array_layer: 0,
            layer_count: self.num_layers(),
        }
    }

    pub fn subresource_range(&self, mip_level: u32, num_mip_levels: u32, base_array_layer: u32, layer_count: u32) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: self.aspect,
            base_mip_level: mip_level,
            level_count: num_mip_levels,
            base_array_layer,
            layer_count,
        }
    }

    pub(crate) fn region_range(&self, region: &ImageRegion) -> vk::ImageSubresourceRange {
        self.subresource_range(region.mip_level, 1, region.base_array_layer, region.layer_count)
    }

    /// Region covering every array layer of a MIP level
    pub fn mip_region(&self, mip_level: u32) -> TextureRegion {
        let extent = mip_extent_for(&self.desc, mip_level);
        let extent = match self.desc.texture_type {
            TextureType::Texture1D | TextureType::Texture1DArray => Extent3D::new(extent.width, 1, 1),
            TextureType::Texture3D => extent,
            _ => Extent3D::new(extent.width, extent.height, 1),
        };
        TextureRegion {
            subresource: TextureSubresource::new(0, self.num_layers(), mip_level, 1),
            offset: Offset3D::default(),
            extent,
        }
    }

    /// Aspect used for buffer copies
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for packed depth-stencil formats, whose aspects
    /// Vulkan copies separately with a different layout
    pub(crate) fn copy_aspect(&self) -> Result<vk::ImageAspectFlags> {
        match self.desc.format {
            Format::D24UnormS8Uint | Format::D32FloatS8X24Uint => Err(lumen_invalid!(
                SOURCE,
                "buffer copies of packed depth-stencil format {:?} are not supported",
                self.desc.format
            )),
            f if f.is_depth() => Ok(vk::ImageAspectFlags::DEPTH),
            _ => Ok(vk::ImageAspectFlags::COLOR),
        }
    }

    /// Validate a region of a single MIP level
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the region leaves the texture, spans several MIP
    /// levels or is not aligned to the compression block size
    pub(crate) fn check_region(&self, region: &TextureRegion) -> Result<ImageRegion> {
        let sub = &region.subresource;
        if sub.num_mip_levels != 1 || sub.base_mip_level >= self.num_mip_levels() {
            return Err(lumen_invalid!(
                SOURCE,
                "MIP level {} (count {}) is not a single level of a {}-level texture",
                sub.base_mip_level, sub.num_mip_levels, self.num_mip_levels()
            ));
        }
        if sub.num_array_layers == 0 || sub.base_array_layer.saturating_add(sub.num_array_layers) > self.num_layers() {
            return Err(lumen_invalid!(
                SOURCE,
                "array layers [{}, +{}) exceed {} layers",
                sub.base_array_layer, sub.num_array_layers, self.num_layers()
            ));
        }

        let image = mip_extent_for(&self.desc, sub.base_mip_level);
        let (offset, extent) = fold_texture_region(self.desc.texture_type, region);
        if offset.x < 0 || offset.y < 0 || offset.z < 0 || extent.is_zero() {
            return Err(lumen_invalid!(SOURCE, "texture region is empty or has a negative offset"));
        }
        let (ox, oy, oz) = (offset.x as u32, offset.y as u32, offset.z as u32);
        let fits = ox.checked_add(extent.width).is_some_and(|x| x <= image.width)
            && oy.checked_add(extent.height).is_some_and(|y| y <= image.height)
            && oz.checked_add(extent.depth).is_some_and(|z| z <= image.depth);
        if !fits {
            return Err(lumen_invalid!(
                SOURCE,
                "texture region {:?}+{:?} exceeds MIP {} extent {}x{}x{}",
                offset, extent, sub.base_mip_level, image.width, image.height, image.depth
            ));
        }

        let (bw, bh) = (self.unit.width, self.unit.height);
        let aligned = ox % bw == 0
            && oy % bh == 0
            && (extent.width % bw == 0 || ox + extent.width == image.width)
            && (extent.height % bh == 0 || oy + extent.height == image.height);
        if !aligned {
            return Err(lumen_invalid!(
                SOURCE,
                "texture region is not aligned to the {}x{} block size of {:?}",
                bw, bh, self.desc.format
            ));
        }

        let o = region.offset;
        let e = region.extent;
        let (vk_offset, vk_extent) = match self.desc.texture_type {
            TextureType::Texture1D | TextureType::Texture1DArray => {
                (vk::Offset3D { x: o.x, y: 0, z: 0 }, vk::Extent3D { width: e.width, height: 1, depth: 1 })
            }
            TextureType::Texture3D => (
                vk::Offset3D { x: o.x, y: o.y, z: o.z },
                vk::Extent3D { width: e.width, height: e.height, depth: e.depth },
            ),
            _ => (
                vk::Offset3D { x: o.x, y: o.y, z: 0 },
                vk::Extent3D { width: e.width, height: e.height, depth: 1 },
            ),
        };
        let (base_array_layer, layer_count) = if self.desc.texture_type == TextureType::Texture3D {
            (0, 1)
        } else {
            (sub.base_array_layer, sub.num_array_layers)
        };

        Ok(ImageRegion {
            mip_level: sub.base_mip_level,
            base_array_layer,
            layer_count,
            offset: vk_offset,
            extent: vk_extent,
            folded_units: [extent.width.div_ceil(bw), extent.height.div_ceil(bh), extent.depth],
        })
    }

    /// Buffer layout of a region packed with the given strides (0 = tight)
    pub(crate) fn buffer_layout(&self, region: &ImageRegion, row_stride: u32, layer_stride: u32) -> Result<BufferLayout> {
        let bytes = self.unit.bytes as u64;
        let [units_x, units_y, units_z] = region.folded_units.map(u64::from);
        let row_bytes = units_x * bytes;
        let row_stride = if row_stride == 0 { row_bytes } else { row_stride as u64 };
        let layer_stride = if layer_stride == 0 { row_stride * units_y } else { layer_stride as u64 };

        if row_stride < row_bytes || layer_stride < row_stride * units_y {
            return Err(lumen_invalid!(
                SOURCE,
                "row stride {} / layer stride {} too small for {} bytes per row",
                row_stride, layer_stride, row_bytes
            ));
        }
        if bytes == 0 || row_stride % bytes != 0 || layer_stride % row_stride != 0 {
            return Err(lumen_invalid!(
                SOURCE,
                "row stride {} must be a multiple of {} bytes and layer stride {} a multiple of the row stride",
                row_stride, bytes, layer_stride
            ));
        }

        let row_length = (row_stride / bytes) as u32 * self.unit.width;
        // 1D arrays fold layers into rows: one row per layer
        let image_height = match self.desc.texture_type {
            TextureType::Texture1D | TextureType::Texture1DArray => self.unit.height,
            _ => (layer_stride / row_stride) as u32 * self.unit.height,
        };
        Ok(BufferLayout {
            row_length,
            image_height,
            size: (units_z - 1) * layer_stride + (units_y - 1) * row_stride + row_bytes,
        })
    }

    // ===== RECORDING =====

    /// Record a buffer-to-texture copy, including layout transitions
    pub(crate) fn record_copy_from_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        buffer: vk::Buffer,
        buffer_offset: u64,
        region: &ImageRegion,
        layout: &BufferLayout,
    ) -> Result<()> {
        let aspect = self.copy_aspect()?;
        self.check_buffer_offset(buffer_offset)?;
        let device = &self.ctx.device;
        let range = self.region_range(region);
        image_barrier(device, command_buffer, self.image, range, self.resting_layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        unsafe {
            device.cmd_copy_buffer_to_image(
                command_buffer,
                buffer,
                self.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[buffer_image_copy(buffer_offset, aspect, region, layout)],
            );
        }
        image_barrier(device, command_buffer, self.image, range, vk::ImageLayout::TRANSFER_DST_OPTIMAL, self.resting_layout);
        Ok(())
    }

    /// Record a texture-to-buffer copy, including layout transitions
    pub(crate) fn record_copy_to_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        buffer: vk::Buffer,
        buffer_offset: u64,
        region: &ImageRegion,
        layout: &BufferLayout,
    ) -> Result<()> {
        let aspect = self.copy_aspect()?;
        self.check_buffer_offset(buffer_offset)?;
        let device = &self.ctx.device;
        let range = self.region_range(region);
        image_barrier(device, command_buffer, self.image, range, self.resting_layout, vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
        unsafe {
            device.cmd_copy_image_to_buffer(
                command_buffer,
                self.image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                buffer,
                &[buffer_image_copy(buffer_offset, aspect, region, layout)],
            );
        }
        image_barrier(device, command_buffer, self.image, range, vk::ImageLayout::TRANSFER_SRC_OPTIMAL, self.resting_layout);
        Ok(())
    }

    pub(crate) fn check_buffer_offset(&self, offset: u64) -> Result<()> {
        let alignment = (self.unit.bytes as u64).max(if self.desc.format.is_depth() { 4 } else { 1 });
        if offset % alignment != 0 {
            return Err(lumen_invalid!(
                SOURCE,
                "buffer offset {} is not aligned to {} bytes for {:?}",
                offset, alignment, self.desc.format
            ));
        }
        Ok(())
    }

    pub(crate) fn check_single_sample(&self, what: &str) -> Result<()> {
        if is_multi_sample_texture(self.desc.texture_type) {
            return Err(lumen_invalid!(SOURCE, "{} is not supported on multisample textures", what));
        }
        Ok(())
    }

    // ===== CPU ACCESS =====

    /// Upload tightly packed texels into a region
    pub fn write_region(&self, region: &TextureRegion, data: &[u8]) -> Result<()> {
        self.check_single_sample("write_texture")?;
        let region = self.check_region(region)?;
        let layout = self.buffer_layout(&region, 0, 0)?;
        if (data.len() as u64) < layout.size {
            return Err(lumen_invalid!(
                SOURCE,
                "source holds {} bytes but the region needs {}",
                data.len(), layout.size
            ));
        }
        self.copy_aspect()?;

        let staging = StagingBuffer::upload(&self.ctx, &data[..layout.size as usize])?;
        let mut result = Ok(());
        self.ctx.immediate_submit(|cb| {
            result = self.record_copy_from_buffer(cb, staging.buffer, 0, &region, &layout);
        })?;
        result
    }

    /// Read a region back, tightly packed
    pub fn read_region(&self, region: &TextureRegion, data: &mut [u8]) -> Result<()> {
        self.check_single_sample("read_texture")?;
        let region = self.check_region(region)?;
        let layout = self.buffer_layout(&region, 0, 0)?;
        if (data.len() as u64) < layout.size {
            return Err(lumen_invalid!(
                SOURCE,
                "destination holds {} bytes but the region needs {}",
                data.len(), layout.size
            ));
        }
        self.copy_aspect()?;

        let staging = StagingBuffer::readback(&self.ctx, layout.size)?;
        let mut result = Ok(());
        self.ctx.immediate_submit(|cb| {
            result = self.record_copy_to_buffer(cb, staging.buffer, 0, &region, &layout);
            transfer_to_host_barrier(&self.ctx.device, cb);
        })?;
        result?;
        data[..layout.size as usize].copy_from_slice(staging.bytes()?);
        Ok(())
    }

    // ===== MIP GENERATION =====

    /// Resolve the subresource a MIP generation touches
    ///
    /// `None` means there is nothing to generate (single level or
    /// multisample texture).
    pub(crate) fn mip_generation_range(&self, subresource: Option<TextureSubresource>) -> Result<Option<TextureSubresource>> {
        if is_multi_sample_texture(self.desc.texture_type) || self.num_mip_levels() < 2 {
            return Ok(None);
        }
        if self.desc.format.is_compressed() {
            return Err(lumen_invalid!(
                SOURCE,
                "cannot generate MIP levels for compressed format {:?}",
                self.desc.format
            ));
        }
        let features = self.ctx.format_properties(self.vk_format).optimal_tiling_features;
        if !features.contains(vk::FormatFeatureFlags::BLIT_SRC | vk::FormatFeatureFlags::BLIT_DST) {
            return Err(lumen_invalid!(
                SOURCE,
                "format {:?} does not support blits for MIP generation",
                self.desc.format
            ));
        }
        let sub = subresource.unwrap_or(TextureSubresource::new(0, self.num_layers(), 0, self.num_mip_levels()));
        let last = sub.base_mip_level.saturating_add(sub.num_mip_levels);
        if last > self.num_mip_levels() || sub.base_array_layer.saturating_add(sub.num_array_layers) > self.num_layers() {
            return Err(lumen_invalid!(SOURCE, "MIP generation range {:?} exceeds the texture", sub));
        }
        if sub.num_mip_levels < 2 || sub.num_array_layers == 0 {
            return Ok(None);
        }
        Ok(Some(sub))
    }

    /// Record a blit chain regenerating each MIP level from its predecessor
    pub(crate) fn record_generate_mips(&self, command_buffer: vk::CommandBuffer, sub: &TextureSubresource) {
        let device = &self.ctx.device;
        let filter = if self.ctx.supports_linear_blit(self.vk_format) {
            vk::Filter::LINEAR
        } else {
            vk::Filter::NEAREST
        };
        let base = sub.base_mip_level;
        let last = base + sub.num_mip_levels;
        let (first_layer, layers) = (sub.base_array_layer, sub.num_array_layers);

        image_barrier(
            device,
            command_buffer,
            self.image,
            self.subresource_range(base, sub.num_mip_levels, first_layer, layers),
            self.resting_layout,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        );

        for level in (base + 1)..last {
            image_barrier(
                device,
                command_buffer,
                self.image,
                self.subresource_range(level - 1, 1, first_layer, layers),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            );
            let src = self.vk_mip_extent(level - 1);
            let dst = self.vk_mip_extent(level);
            let blit = vk::ImageBlit::default()
                .src_subresource(self.subresource_layers(level - 1, first_layer, layers))
                .src_offsets([vk::Offset3D::default(), extent_to_offset(src)])
                .dst_subresource(self.subresource_layers(level, first_layer, layers))
                .dst_offsets([vk::Offset3D::default(), extent_to_offset(dst)]);
            unsafe {
                device.cmd_blit_image(
                    command_buffer,
                    self.image,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    self.image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[blit],
                    filter,
                );
            }
        }

        image_barrier(
            device,
            command_buffer,
            self.image,
            self.subresource_range(base, sub.num_mip_levels - 1, first_layer, layers),
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            self.resting_layout,
        );
        image_barrier(
            device,
            command_buffer,
            self.image,
            self.subresource_range(last - 1, 1, first_layer, layers),
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            self.resting_layout,
        );
    }

    /// Regenerate MIP levels outside any command buffer
    pub fn generate_mips(&self, subresource: Option<TextureSubresource>) -> Result<()> {
        let Some(sub) = self.mip_generation_range(subresource)? else {
            return Ok(());
        };
        self.ctx.immediate_submit(|cb| self.record_generate_mips(cb, &sub))
    }

    pub(crate) fn subresource_layers(&self, mip_level: u32, base_array_layer: u32, layer_count: u32) -> vk::ImageSubresourceLayers {
        vk::ImageSubresourceLayers {
            aspect_mask: self.aspect,
            mip_level,
            base_array_layer,
            layer_count,
        }
    }

    /// Extent of a MIP level in Vulkan image terms (layers not folded in)
    pub(crate) fn vk_mip_extent(&self, mip_level: u32) -> vk::Extent3D {
        let base = vk_extent(self.desc.texture_type, self.desc.extent);
        vk::Extent3D {
            width: (base.width >> mip_level).max(1),
            height: (base.height >> mip_level).max(1),
            depth: (base.depth >> mip_level).max(1),
        }
    }

    // ===== ATTACHMENTS =====

    /// Create a single-subresource view for a render target attachment
    ///
    /// The caller owns the returned view.
    pub(crate) fn attachment_view(&self, mip_level: u32, array_layer: u32) -> Result<vk::ImageView> {
        let view_type = match self.desc.texture_type {
            TextureType::Texture1D | TextureType::Texture1DArray => vk::ImageViewType::TYPE_1D,
            _ => vk::ImageViewType::TYPE_2D,
        };
        let range = self.subresource_range(mip_level, 1, array_layer, 1);
        create_image_view(&self.ctx, self.image, view_type, self.vk_format, range)
    }
}

impl Drop for VulkanTexture {
    fn drop(&mut self) {
        unsafe {
            if self.view != vk::ImageView::null() {
                self.ctx.device.destroy_image_view(self.view, None);
            }
        }
        if let Some(allocation) = self.allocation.take() {
            self.ctx.free(allocation);
        }
        unsafe { self.ctx.device.destroy_image(self.image, None) };
    }
}

/// Vulkan image extent of a texture (layers not folded in)
pub(crate) fn vk_extent(texture_type: TextureType, extent: Extent3D) -> vk::Extent3D {
    match texture_type {
        TextureType::Texture1D | TextureType::Texture1DArray => vk::Extent3D {
            width: extent.width,
            height: 1,
            depth: 1,
        },
        TextureType::Texture3D => vk::Extent3D {
            width: extent.width,
            height: extent.height,
            depth: extent.depth,
        },
        _ => vk::Extent3D {
            width: extent.width,
            height: extent.height,
            depth: 1,
        },
    }
}

fn extent_to_offset(extent: vk::Extent3D) -> vk::Offset3D {
    vk::Offset3D {
        x: extent.width as i32,
        y: extent.height as i32,
        z: extent.depth as i32,
    }
}

pub(crate) fn buffer_image_copy(
    buffer_offset: u64,
    aspect: vk::ImageAspectFlags,
    region: &ImageRegion,
    layout: &BufferLayout,
) -> vk::BufferImageCopy {
    vk::BufferImageCopy {
        buffer_offset,
        buffer_row_length: layout.row_length,
        buffer_image_height: layout.image_height,
        image_subresource: vk::ImageSubresourceLayers {
            aspect_mask: aspect,
            mip_level: region.mip_level,
            base_array_layer: region.base_array_layer,
            layer_count: region.layer_count,
        },
        image_offset: region.offset,
        image_extent: region.extent,
    }
}

#[cfg(test)]
#[path = "vulkan_texture_tests.rs"]
mod tests;
