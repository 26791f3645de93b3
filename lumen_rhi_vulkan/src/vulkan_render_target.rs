/// Render targets - framebuffers over texture views and internal buffers
///
/// Every render target owns a native render pass built from its attachment
/// formats, the image views it renders through, and the internal textures
/// created for texture-less attachments. Attachments that reference
/// textures keep the texture handles so submission can reject targets whose
/// textures were released.

use std::sync::Arc;

use ash::vk;
use lumen_rhi::lumen::format::Format;
use lumen_rhi::lumen::render::{
    BindFlags, Extent3D, RenderTargetDescriptor, TextureDescriptor, TextureHandle, TextureType,
};
use lumen_rhi::lumen::Result;
use lumen_rhi::lumen_invalid;

use crate::vulkan_context::{map_vk_error, GpuContext, SOURCE};
use crate::vulkan_render_pass::{create_native_render_pass, FramebufferAttachment, FramebufferBinding};
use crate::vulkan_texture::VulkanTexture;

/// Attachment resolved by the render system
pub(crate) enum AttachmentSource<'a> {
    Texture {
        handle: TextureHandle,
        texture: &'a VulkanTexture,
        mip_level: u32,
        array_layer: u32,
    },
    /// Internal buffer of this format
    Internal(Format),
}

/// Vulkan render target
pub struct VulkanRenderTarget {
    ctx: Arc<GpuContext>,
    pub(crate) desc: RenderTargetDescriptor,
    pub(crate) binding: FramebufferBinding,
    /// Textures the attachments render into
    pub(crate) textures: Vec<TextureHandle>,
    views: Vec<vk::ImageView>,
    internal: Vec<VulkanTexture>,
}

impl VulkanRenderTarget {
    /// Create a render target; `desc.samples` is already clamped
    pub(crate) fn new(
        ctx: &Arc<GpuContext>,
        desc: &RenderTargetDescriptor,
        colors: Vec<AttachmentSource<'_>>,
        resolves: Vec<AttachmentSource<'_>>,
        depth_stencil: Option<AttachmentSource<'_>>,
    ) -> Result<Self> {
        let samples = desc.samples.max(1);
        let mut target = Self {
            ctx: Arc::clone(ctx),
            desc: desc.clone(),
            binding: FramebufferBinding {
                render_pass: vk::RenderPass::null(),
                framebuffer: vk::Framebuffer::null(),
                extent: vk::Extent2D {
                    width: desc.resolution.width,
                    height: desc.resolution.height,
                },
                samples,
                colors: Vec::new(),
                depth_stencil: None,
                resolves: Vec::new(),
            },
            textures: Vec::new(),
            views: Vec::new(),
            internal: Vec::new(),
        };

        // Drop releases whatever was created if a later step fails
        let mut attachment_views = Vec::new();
        for source in &colors {
            let (attachment, view) = target.add_attachment(source, BindFlags::COLOR_ATTACHMENT, samples)?;
            target.binding.colors.push(attachment);
            attachment_views.push(view);
        }
        if let Some(source) = &depth_stencil {
            let (attachment, view) = target.add_attachment(source, BindFlags::DEPTH_STENCIL_ATTACHMENT, samples)?;
            target.binding.depth_stencil = Some(attachment);
            attachment_views.push(view);
        }
        if samples > 1 {
            for (index, source) in resolves.iter().enumerate().take(colors.len()) {
                let (attachment, _) = target.add_attachment(source, BindFlags::COLOR_ATTACHMENT, 1)?;
                target.binding.resolves.push((index, attachment));
            }
        }

        let color_formats: Vec<Format> = target.binding.colors.iter().map(|a| a.format).collect();
        let depth_format = target.binding.depth_stencil.map(|a| a.format);
        target.binding.render_pass = create_native_render_pass(ctx, &color_formats, depth_format, samples)?;

        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(target.binding.render_pass)
            .attachments(&attachment_views)
            .width(desc.resolution.width)
            .height(desc.resolution.height)
            .layers(1);
        target.binding.framebuffer = unsafe { ctx.device.create_framebuffer(&framebuffer_info, None) }
            .map_err(|e| map_vk_error("vkCreateFramebuffer", e))?;
        if let Some(name) = &desc.debug_name {
            ctx.set_object_name(target.binding.framebuffer, name);
        }
        Ok(target)
    }

    fn add_attachment(
        &mut self,
        source: &AttachmentSource<'_>,
        usage: BindFlags,
        samples: u32,
    ) -> Result<(FramebufferAttachment, vk::ImageView)> {
        match source {
            AttachmentSource::Texture { handle, texture, mip_level, array_layer } => {
                if texture.desc.samples.max(1) != samples {
                    return Err(lumen_invalid!(
                        SOURCE,
                        "attachment texture {:?} has {} samples but the render target uses {}",
                        texture.desc.debug_name, texture.desc.samples, samples
                    ));
                }
                let view = texture.attachment_view(*mip_level, *array_layer)?;
                self.views.push(view);
                self.textures.push(*handle);
                // Volume slices are transitioned with their whole MIP level
                let array_layer = if texture.desc.texture_type == TextureType::Texture3D { 0 } else { *array_layer };
                Ok((
                    FramebufferAttachment {
                        image: texture.image,
                        format: texture.desc.format,
                        mip_level: *mip_level,
                        array_layer,
                        initial_layout: texture.resting_layout,
                        final_layout: texture.resting_layout,
                    },
                    view,
                ))
            }
            AttachmentSource::Internal(format) => {
                let texture = VulkanTexture::new(
                    &self.ctx,
                    &TextureDescriptor {
                        texture_type: if samples > 1 { TextureType::Texture2DMS } else { TextureType::Texture2D },
                        bind_flags: usage,
                        format: *format,
                        extent: Extent3D::from(self.desc.resolution),
                        mip_levels: 1,
                        samples,
                        ..Default::default()
                    },
                    None,
                )?;
                let view = texture.attachment_view(0, 0);
                let attachment = FramebufferAttachment {
                    image: texture.image,
                    format: *format,
                    mip_level: 0,
                    array_layer: 0,
                    initial_layout: texture.resting_layout,
                    final_layout: texture.resting_layout,
                };
                self.internal.push(texture);
                let view = view?;
                self.views.push(view);
                Ok((attachment, view))
            }
        }
    }
}

impl Drop for VulkanRenderTarget {
    fn drop(&mut self) {
        unsafe {
            if self.binding.framebuffer != vk::Framebuffer::null() {
                self.ctx.device.destroy_framebuffer(self.binding.framebuffer, None);
            }
            if self.binding.render_pass != vk::RenderPass::null() {
                self.ctx.device.destroy_render_pass(self.binding.render_pass, None);
            }
            for view in self.views.drain(..) {
                self.ctx.device.destroy_image_view(view, None);
            }
        }
        // Internal textures drop after their views
        self.internal.clear();
    }
}
