/// Render passes - native render passes and framebuffer recording helpers
///
/// Native passes always load and store their attachments. Clear load ops are
/// applied with `vkCmdClearAttachments` right after the pass begins, so one
/// native pass per attachment layout serves every load/store combination
/// and every pass with the same formats stays compatible with the same
/// pipelines. Attachments move from their resting layout into the
/// attachment layout before a pass and back afterwards; multisample
/// resolves are recorded after the pass ends.

use std::sync::Arc;

use ash::vk;
use lumen_rhi::lumen::format::{Format, FormatFlags};
use lumen_rhi::lumen::render::{AttachmentLoadOp, ClearFlags, ClearValue, RenderPassDescriptor};
use lumen_rhi::lumen::Result;
use lumen_rhi::lumen_invalid;

use crate::vulkan_context::{map_vk_error, GpuContext, SOURCE};
use crate::vulkan_format::{aspect_flags, format_to_vk, sample_count_to_vk};
use crate::vulkan_texture::{attachment_layout, image_barrier};

/// Create a LOAD/STORE render pass for the given attachment formats
pub(crate) fn create_native_render_pass(
    ctx: &GpuContext,
    color_formats: &[Format],
    depth_format: Option<Format>,
    samples: u32,
) -> Result<vk::RenderPass> {
    let sample_count = sample_count_to_vk(samples);
    let mut attachments: Vec<vk::AttachmentDescription> = color_formats
        .iter()
        .map(|format| {
            vk::AttachmentDescription::default()
                .format(format_to_vk(*format))
                .samples(sample_count)
                .load_op(vk::AttachmentLoadOp::LOAD)
                .store_op(vk::AttachmentStoreOp::STORE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        })
        .collect();
    let color_refs: Vec<vk::AttachmentReference> = (0..color_formats.len() as u32)
        .map(|attachment| vk::AttachmentReference {
            attachment,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        })
        .collect();

    let depth_ref = depth_format.map(|format| {
        let stencil_op = if format.is_stencil() {
            (vk::AttachmentLoadOp::LOAD, vk::AttachmentStoreOp::STORE)
        } else {
            (vk::AttachmentLoadOp::DONT_CARE, vk::AttachmentStoreOp::DONT_CARE)
        };
        attachments.push(
            vk::AttachmentDescription::default()
                .format(format_to_vk(format))
                .samples(sample_count)
                .load_op(vk::AttachmentLoadOp::LOAD)
                .store_op(vk::AttachmentStoreOp::STORE)
                .stencil_load_op(stencil_op.0)
                .stencil_store_op(stencil_op.1)
                .initial_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
        );
        vk::AttachmentReference {
            attachment: color_formats.len() as u32,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        }
    });

    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs);
    if let Some(depth_ref) = depth_ref.as_ref() {
        subpass = subpass.depth_stencil_attachment(depth_ref);
    }

    let stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
        | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
    let access = vk::AccessFlags::COLOR_ATTACHMENT_READ
        | vk::AccessFlags::COLOR_ATTACHMENT_WRITE
        | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
        | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
    let dependencies = [
        vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(stages)
            .dst_stage_mask(stages)
            .src_access_mask(access)
            .dst_access_mask(access),
        vk::SubpassDependency::default()
            .src_subpass(0)
            .dst_subpass(vk::SUBPASS_EXTERNAL)
            .src_stage_mask(stages)
            .dst_stage_mask(vk::PipelineStageFlags::ALL_COMMANDS)
            .src_access_mask(access)
            .dst_access_mask(vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE),
    ];

    let subpasses = [subpass];
    let info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses)
        .dependencies(&dependencies);
    unsafe { ctx.device.create_render_pass(&info, None) }.map_err(|e| map_vk_error("vkCreateRenderPass", e))
}

/// Attachment formats of a render pass descriptor
///
/// # Errors
///
/// `InvalidArgument` if a color attachment has no format
pub(crate) fn pass_formats(desc: &RenderPassDescriptor) -> Result<(Vec<Format>, Option<Format>)> {
    let colors = desc
        .color_attachments
        .iter()
        .enumerate()
        .map(|(index, attachment)| {
            if attachment.format == Format::Undefined {
                Err(lumen_invalid!(SOURCE, "color attachment {} of the render pass has no format", index))
            } else {
                Ok(attachment.format)
            }
        })
        .collect::<Result<Vec<_>>>()?;
    let depth = desc.depth_attachment.or(desc.stencil_attachment).map(|a| a.format);
    Ok((colors, depth))
}

/// Vulkan render pass
pub struct VulkanRenderPass {
    ctx: Arc<GpuContext>,
    pub(crate) render_pass: vk::RenderPass,
    pub(crate) desc: RenderPassDescriptor,
    pub(crate) color_formats: Vec<Format>,
    pub(crate) depth_format: Option<Format>,
}

impl VulkanRenderPass {
    /// Create a render pass from a descriptor with clamped samples
    pub fn new(ctx: &Arc<GpuContext>, desc: &RenderPassDescriptor) -> Result<Self> {
        let (color_formats, depth_format) = pass_formats(desc)?;
        let render_pass = create_native_render_pass(ctx, &color_formats, depth_format, desc.samples.max(1))?;
        if let Some(name) = &desc.debug_name {
            ctx.set_object_name(render_pass, name);
        }
        Ok(Self {
            ctx: Arc::clone(ctx),
            render_pass,
            desc: desc.clone(),
            color_formats,
            depth_format,
        })
    }

    /// True if the pass can begin on a framebuffer with these attachments
    pub(crate) fn is_compatible(&self, framebuffer: &FramebufferBinding) -> bool {
        let colors: Vec<Format> = framebuffer.colors.iter().map(|a| a.format).collect();
        self.color_formats == colors
            && self.depth_format == framebuffer.depth_stencil.map(|a| a.format)
            && self.desc.samples.max(1) == framebuffer.samples
    }
}

impl Drop for VulkanRenderPass {
    fn drop(&mut self) {
        unsafe { self.ctx.device.destroy_render_pass(self.render_pass, None) };
    }
}

// ============================================================================
// FRAMEBUFFERS
// ============================================================================

/// One image bound as a framebuffer attachment
#[derive(Debug, Clone, Copy)]
pub(crate) struct FramebufferAttachment {
    pub image: vk::Image,
    pub format: Format,
    pub mip_level: u32,
    pub array_layer: u32,
    /// Layout the image is in when the pass begins
    pub initial_layout: vk::ImageLayout,
    /// Layout the image is returned to after the pass
    pub final_layout: vk::ImageLayout,
}

impl FramebufferAttachment {
    pub fn range(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: aspect_flags(self.format),
            base_mip_level: self.mip_level,
            level_count: 1,
            base_array_layer: self.array_layer,
            layer_count: 1,
        }
    }

    pub fn subresource_layers(&self) -> vk::ImageSubresourceLayers {
        vk::ImageSubresourceLayers {
            aspect_mask: aspect_flags(self.format),
            mip_level: self.mip_level,
            base_array_layer: self.array_layer,
            layer_count: 1,
        }
    }

    pub fn attachment_layout(&self) -> vk::ImageLayout {
        attachment_layout(self.format)
    }
}

/// Everything needed to record a render pass on a framebuffer
#[derive(Debug, Clone)]
pub(crate) struct FramebufferBinding {
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub extent: vk::Extent2D,
    pub samples: u32,
    pub colors: Vec<FramebufferAttachment>,
    pub depth_stencil: Option<FramebufferAttachment>,
    /// Color attachment index and the single-sample image it resolves into
    pub resolves: Vec<(usize, FramebufferAttachment)>,
}

impl FramebufferBinding {
    pub fn full_rect(&self) -> vk::Rect2D {
        vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: self.extent,
        }
    }

    fn attachments(&self) -> impl Iterator<Item = &FramebufferAttachment> {
        self.colors.iter().chain(self.depth_stencil.iter())
    }

    /// Transition attachments and begin the native pass
    pub fn record_begin(&self, device: &ash::Device, command_buffer: vk::CommandBuffer) {
        for attachment in self.attachments() {
            image_barrier(
                device,
                command_buffer,
                attachment.image,
                attachment.range(),
                attachment.initial_layout,
                attachment.attachment_layout(),
            );
        }
        self.record_resume(device, command_buffer);
    }

    /// Begin the native pass on attachments already in attachment layout
    pub fn record_resume(&self, device: &ash::Device, command_buffer: vk::CommandBuffer) {
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(self.render_pass)
            .framebuffer(self.framebuffer)
            .render_area(self.full_rect());
        unsafe { device.cmd_begin_render_pass(command_buffer, &begin_info, vk::SubpassContents::INLINE) };
    }

    /// End the native pass, resolve, and return attachments to their final layouts
    pub fn record_end(&self, device: &ash::Device, command_buffer: vk::CommandBuffer) {
        unsafe { device.cmd_end_render_pass(command_buffer) };

        let mut resolved = vec![false; self.colors.len()];
        for (index, dst) in &self.resolves {
            let Some(src) = self.colors.get(*index) else {
                continue;
            };
            image_barrier(
                device,
                command_buffer,
                src.image,
                src.range(),
                src.attachment_layout(),
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            );
            image_barrier(
                device,
                command_buffer,
                dst.image,
                dst.range(),
                dst.initial_layout,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            );
            let region = vk::ImageResolve {
                src_subresource: src.subresource_layers(),
                src_offset: vk::Offset3D::default(),
                dst_subresource: dst.subresource_layers(),
                dst_offset: vk::Offset3D::default(),
                extent: vk::Extent3D {
                    width: self.extent.width,
                    height: self.extent.height,
                    depth: 1,
                },
            };
            unsafe {
                device.cmd_resolve_image(
                    command_buffer,
                    src.image,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    dst.image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[region],
                );
            }
            image_barrier(
                device,
                command_buffer,
                src.image,
                src.range(),
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                src.final_layout,
            );
            image_barrier(
                device,
                command_buffer,
                dst.image,
                dst.range(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                dst.final_layout,
            );
            resolved[*index] = true;
        }

        for (index, attachment) in self.colors.iter().enumerate() {
            if !resolved[index] {
                image_barrier(
                    device,
                    command_buffer,
                    attachment.image,
                    attachment.range(),
                    attachment.attachment_layout(),
                    attachment.final_layout,
                );
            }
        }
        if let Some(depth) = &self.depth_stencil {
            image_barrier(
                device,
                command_buffer,
                depth.image,
                depth.range(),
                depth.attachment_layout(),
                depth.final_layout,
            );
        }
    }
}

// ============================================================================
// CLEARS
// ============================================================================

/// Native clear value for a color attachment of `format`
pub(crate) fn color_clear_value(format: Format, color: [f32; 4]) -> vk::ClearValue {
    let flags = format.flags();
    let color = if flags.contains(FormatFlags::INTEGER) && flags.contains(FormatFlags::SIGNED) {
        vk::ClearColorValue {
            int32: color.map(|c| c as i32),
        }
    } else if flags.contains(FormatFlags::INTEGER) {
        vk::ClearColorValue {
            uint32: color.map(|c| c.max(0.0) as u32),
        }
    } else {
        vk::ClearColorValue { float32: color }
    };
    vk::ClearValue { color }
}

fn depth_stencil_aspects(flags: ClearFlags, format: Format) -> vk::ImageAspectFlags {
    let mut aspects = vk::ImageAspectFlags::empty();
    if flags.contains(ClearFlags::DEPTH) && format.is_depth() {
        aspects |= vk::ImageAspectFlags::DEPTH;
    }
    if flags.contains(ClearFlags::STENCIL) && format.is_stencil() {
        aspects |= vk::ImageAspectFlags::STENCIL;
    }
    aspects
}

/// Clear commands for `flags`, all color attachments or only `only_color`
pub(crate) fn clear_attachments(
    framebuffer: &FramebufferBinding,
    flags: ClearFlags,
    value: &ClearValue,
    only_color: Option<u32>,
) -> Vec<vk::ClearAttachment> {
    let mut clears = Vec::new();
    if flags.contains(ClearFlags::COLOR) {
        for (index, attachment) in framebuffer.colors.iter().enumerate() {
            if only_color.is_some_and(|only| only as usize != index) {
                continue;
            }
            clears.push(vk::ClearAttachment {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                color_attachment: index as u32,
                clear_value: color_clear_value(attachment.format, value.color),
            });
        }
    }
    if let Some(depth) = &framebuffer.depth_stencil {
        let aspects = depth_stencil_aspects(flags, depth.format);
        if !aspects.is_empty() {
            clears.push(vk::ClearAttachment {
                aspect_mask: aspects,
                color_attachment: 0,
                clear_value: vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue {
                        depth: value.depth,
                        stencil: value.stencil,
                    },
                },
            });
        }
    }
    clears
}

/// Clear commands emulating the Clear load ops of a render pass
///
/// Clear values are consumed in attachment order, colors first, then one
/// value for depth-stencil; missing values fall back to the default.
pub(crate) fn load_op_clears(
    framebuffer: &FramebufferBinding,
    pass: &RenderPassDescriptor,
    clear_values: &[ClearValue],
) -> Vec<vk::ClearAttachment> {
    let mut values = clear_values.iter().copied();
    let mut clears = Vec::new();
    for (index, attachment) in pass.color_attachments.iter().enumerate() {
        if attachment.load_op != AttachmentLoadOp::Clear {
            continue;
        }
        let value = values.next().unwrap_or_default();
        clears.extend(clear_attachments(framebuffer, ClearFlags::COLOR, &value, Some(index as u32)));
    }
    let mut flags = ClearFlags::empty();
    if pass.depth_attachment.is_some_and(|a| a.load_op == AttachmentLoadOp::Clear) {
        flags |= ClearFlags::DEPTH;
    }
    if pass.stencil_attachment.is_some_and(|a| a.load_op == AttachmentLoadOp::Clear) {
        flags |= ClearFlags::STENCIL;
    }
    if !flags.is_empty() {
        let value = values.next().unwrap_or_default();
        clears.extend(clear_attachments(framebuffer, flags, &value, None));
    }
    clears
}

/// Record clears over the whole framebuffer
pub(crate) fn record_clears(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    framebuffer: &FramebufferBinding,
    clears: &[vk::ClearAttachment],
) {
    if clears.is_empty() {
        return;
    }
    let rects = [vk::ClearRect {
        rect: framebuffer.full_rect(),
        base_array_layer: 0,
        layer_count: 1,
    }];
    unsafe { device.cmd_clear_attachments(command_buffer, clears, &rects) };
}

#[cfg(test)]
#[path = "vulkan_render_pass_tests.rs"]
mod tests;
