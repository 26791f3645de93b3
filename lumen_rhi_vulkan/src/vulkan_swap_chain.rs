/// Swap chain - Vulkan implementation of the SwapChain trait
///
/// Images are acquired eagerly: right after creation and after every
/// present, so the current swap index is always known before recording.
/// Every submission that renders into the swap chain waits on the acquire
/// semaphore (once) and signals a fresh present semaphore; `present` waits
/// on all present semaphores of the image. Multisample swap chains render
/// into an internal color buffer that is resolved into the swap image when
/// the render pass ends.

use std::sync::Arc;

use ash::vk;
use lumen_rhi::lumen::format::Format;
use lumen_rhi::lumen::render::{BindFlags, Extent2D, Extent3D, SwapChain, SwapChainBase, TextureDescriptor, TextureType};
use lumen_rhi::lumen::{Error, Result};
use lumen_rhi::{lumen_debug, lumen_error, lumen_invalid, lumen_warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::vulkan_context::{map_vk_error, GpuContext, SOURCE};
use crate::vulkan_format::vk_to_format;
use crate::vulkan_render_pass::{create_native_render_pass, FramebufferAttachment, FramebufferBinding};
use crate::vulkan_texture::{create_image_view, image_barrier, VulkanTexture};

// ============================================================================
// SURFACE NEGOTIATION
// ============================================================================

/// Pick a presentable UNORM format, preferring BGRA
pub(crate) fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<(vk::SurfaceFormatKHR, Format)> {
    [vk::Format::B8G8R8A8_UNORM, vk::Format::R8G8B8A8_UNORM]
        .iter()
        .find_map(|wanted| formats.iter().find(|f| f.format == *wanted))
        .and_then(|f| vk_to_format(f.format).map(|format| (*f, format)))
}

/// Present mode for a vsync interval, `None` if the surface cannot honor it
pub(crate) fn choose_present_mode(interval: u32, available: &[vk::PresentModeKHR]) -> Option<vk::PresentModeKHR> {
    match interval {
        0 => [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::MAILBOX]
            .into_iter()
            .find(|mode| available.contains(mode)),
        // FIFO is always supported
        1 => Some(vk::PresentModeKHR::FIFO),
        _ => None,
    }
}

pub(crate) fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, requested: Extent2D) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }
    vk::Extent2D {
        width: requested.width.clamp(caps.min_image_extent.width, caps.max_image_extent.width),
        height: requested.height.clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    }
}

/// Number of images to request; `max_image_count` 0 means unbounded
pub(crate) fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR, swap_buffers: u32) -> u32 {
    let count = swap_buffers.max(caps.min_image_count);
    if caps.max_image_count > 0 {
        count.min(caps.max_image_count)
    } else {
        count
    }
}

// ============================================================================
// SWAP CHAIN
// ============================================================================

/// Per-image presentation state
struct SwapImage {
    image: vk::Image,
    view: vk::ImageView,
    framebuffer: vk::Framebuffer,
    /// Layout the image was left in by the last recorded pass
    layout: vk::ImageLayout,
    acquire_semaphore: Option<vk::Semaphore>,
    acquire_waited: bool,
    present_semaphores: Vec<vk::Semaphore>,
}

/// Vulkan swap chain
pub struct VulkanSwapChain {
    ctx: Arc<GpuContext>,
    base: SwapChainBase,
    surface: vk::SurfaceKHR,
    swapchain: vk::SwapchainKHR,
    surface_format: vk::SurfaceFormatKHR,
    present_mode: vk::PresentModeKHR,
    extent: vk::Extent2D,
    images: Vec<SwapImage>,
    render_pass: vk::RenderPass,
    depth_format: Format,
    depth: Option<VulkanTexture>,
    depth_view: vk::ImageView,
    /// Multisample color buffer, resolved into the swap image
    msaa_color: Option<VulkanTexture>,
    msaa_view: vk::ImageView,
    free_semaphores: Vec<vk::Semaphore>,
    current: Option<u32>,
    needs_recreate: bool,
}

impl VulkanSwapChain {
    /// Create a swap chain on a windowed surface
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the surface has no native window,
    /// `InitializationFailed` if the device cannot present to it
    pub(crate) fn new(ctx: &Arc<GpuContext>, mut base: SwapChainBase) -> Result<Self> {
        let surface = create_surface(ctx, &base)?;

        let setup = || -> Result<(vk::SurfaceFormatKHR, Format)> {
            let supported = unsafe {
                ctx.surface_loader
                    .get_physical_device_surface_support(ctx.physical_device, ctx.queue_family, surface)
            }
            .map_err(|e| map_vk_error("vkGetPhysicalDeviceSurfaceSupportKHR", e))?;
            if !supported {
                return Err(Error::InitializationFailed(
                    "graphics queue cannot present to this surface".to_string(),
                ));
            }
            let formats = unsafe {
                ctx.surface_loader
                    .get_physical_device_surface_formats(ctx.physical_device, surface)
            }
            .map_err(|e| map_vk_error("vkGetPhysicalDeviceSurfaceFormatsKHR", e))?;
            choose_surface_format(&formats)
                .ok_or_else(|| Error::InitializationFailed("surface offers no 8-bit UNORM format".to_string()))
        };
        let (surface_format, color_format) = match setup() {
            Ok(chosen) => chosen,
            Err(e) => {
                unsafe { ctx.surface_loader.destroy_surface(surface, None) };
                return Err(e);
            }
        };

        let depth_format = ctx.default_depth_format;
        base.set_formats(color_format, depth_format);
        let mut swap_chain = Self {
            ctx: Arc::clone(ctx),
            base,
            surface,
            swapchain: vk::SwapchainKHR::null(),
            surface_format,
            present_mode: vk::PresentModeKHR::FIFO,
            extent: vk::Extent2D::default(),
            images: Vec::new(),
            render_pass: vk::RenderPass::null(),
            depth_format,
            depth: None,
            depth_view: vk::ImageView::null(),
            msaa_color: None,
            msaa_view: vk::ImageView::null(),
            free_semaphores: Vec::new(),
            current: None,
            needs_recreate: false,
        };
        // Drop releases the surface and anything else created so far
        swap_chain.render_pass = create_native_render_pass(
            ctx,
            &[color_format],
            Some(depth_format),
            swap_chain.base.samples(),
        )?;
        swap_chain.recreate(swap_chain.base.resolution())?;
        Ok(swap_chain)
    }

    // ===== BUFFERS =====

    fn recreate(&mut self, resolution: Extent2D) -> Result<()> {
        self.ctx.wait_idle()?;
        self.destroy_buffers();

        let caps = unsafe {
            self.ctx
                .surface_loader
                .get_physical_device_surface_capabilities(self.ctx.physical_device, self.surface)
        }
        .map_err(|e| map_vk_error("vkGetPhysicalDeviceSurfaceCapabilitiesKHR", e))?;
        let extent = choose_extent(&caps, resolution);
        if extent.width == 0 || extent.height == 0 {
            // Minimized; try again at the next present
            self.extent = extent;
            self.needs_recreate = true;
            return Ok(());
        }

        let old_swapchain = self.swapchain;
        let info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.surface)
            .min_image_count(choose_image_count(&caps, self.base.num_swap_buffers()))
            .image_format(self.surface_format.format)
            .image_color_space(self.surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(
                vk::ImageUsageFlags::COLOR_ATTACHMENT
                    | vk::ImageUsageFlags::TRANSFER_SRC
                    | vk::ImageUsageFlags::TRANSFER_DST,
            )
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(self.present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);
        let swapchain = unsafe { self.ctx.swapchain_loader.create_swapchain(&info, None) }
            .map_err(|e| map_vk_error("vkCreateSwapchainKHR", e))?;
        if old_swapchain != vk::SwapchainKHR::null() {
            unsafe { self.ctx.swapchain_loader.destroy_swapchain(old_swapchain, None) };
        }
        self.swapchain = swapchain;
        self.extent = extent;
        self.needs_recreate = false;

        let images = unsafe { self.ctx.swapchain_loader.get_swapchain_images(swapchain) }
            .map_err(|e| map_vk_error("vkGetSwapchainImagesKHR", e))?;
        self.base.set_num_swap_buffers(images.len() as u32);
        self.create_attachments()?;
        for image in images {
            let view = create_image_view(
                &self.ctx,
                image,
                vk::ImageViewType::TYPE_2D,
                self.surface_format.format,
                color_range(),
            )?;
            self.images.push(SwapImage {
                image,
                view,
                framebuffer: vk::Framebuffer::null(),
                layout: vk::ImageLayout::UNDEFINED,
                acquire_semaphore: None,
                acquire_waited: false,
                present_semaphores: Vec::new(),
            });
            let index = self.images.len() - 1;
            let color_view = if self.msaa_color.is_some() { self.msaa_view } else { view };
            let attachments = [color_view, self.depth_view];
            let framebuffer_info = vk::FramebufferCreateInfo::default()
                .render_pass(self.render_pass)
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);
            self.images[index].framebuffer = unsafe { self.ctx.device.create_framebuffer(&framebuffer_info, None) }
                .map_err(|e| map_vk_error("vkCreateFramebuffer", e))?;
        }
        lumen_debug!(
            SOURCE,
            "swap chain {}x{}, {} images, {:?}",
            extent.width, extent.height, self.images.len(), self.present_mode
        );
        self.acquire()
    }

    fn create_attachments(&mut self) -> Result<()> {
        let samples = self.base.samples();
        let texture_type = if samples > 1 { TextureType::Texture2DMS } else { TextureType::Texture2D };
        let extent = Extent3D::new(self.extent.width, self.extent.height, 1);
        let depth = VulkanTexture::new(
            &self.ctx,
            &TextureDescriptor {
                debug_name: Some("swap chain depth".to_string()),
                texture_type,
                bind_flags: BindFlags::DEPTH_STENCIL_ATTACHMENT,
                format: self.depth_format,
                extent,
                mip_levels: 1,
                samples,
                ..Default::default()
            },
            None,
        )?;
        self.depth_view = depth.attachment_view(0, 0)?;
        self.depth = Some(depth);
        if samples > 1 {
            let color = VulkanTexture::new(
                &self.ctx,
                &TextureDescriptor {
                    debug_name: Some("swap chain color".to_string()),
                    texture_type,
                    bind_flags: BindFlags::COLOR_ATTACHMENT,
                    format: self.base.color_format(),
                    extent,
                    mip_levels: 1,
                    samples,
                    ..Default::default()
                },
                None,
            )?;
            self.msaa_view = color.attachment_view(0, 0)?;
            self.msaa_color = Some(color);
        }
        Ok(())
    }

    /// Destroy everything tied to the current swapchain images
    fn destroy_buffers(&mut self) {
        let device = &self.ctx.device;
        unsafe {
            for image in self.images.drain(..) {
                if image.framebuffer != vk::Framebuffer::null() {
                    device.destroy_framebuffer(image.framebuffer, None);
                }
                device.destroy_image_view(image.view, None);
                // The device is idle, so no semaphore has a pending wait
                for semaphore in image.acquire_semaphore.into_iter().chain(image.present_semaphores) {
                    device.destroy_semaphore(semaphore, None);
                }
            }
            if self.depth_view != vk::ImageView::null() {
                device.destroy_image_view(self.depth_view, None);
                self.depth_view = vk::ImageView::null();
            }
            if self.msaa_view != vk::ImageView::null() {
                device.destroy_image_view(self.msaa_view, None);
                self.msaa_view = vk::ImageView::null();
            }
        }
        self.depth = None;
        self.msaa_color = None;
        self.current = None;
    }

    // ===== SYNCHRONIZATION =====

    fn semaphore(&mut self) -> Result<vk::Semaphore> {
        if let Some(semaphore) = self.free_semaphores.pop() {
            return Ok(semaphore);
        }
        unsafe {
            self.ctx
                .device
                .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
        }
        .map_err(|e| map_vk_error("vkCreateSemaphore", e))
    }

    fn acquire(&mut self) -> Result<()> {
        if self.swapchain == vk::SwapchainKHR::null() {
            return Ok(());
        }
        let semaphore = self.semaphore()?;
        let result = unsafe {
            self.ctx
                .swapchain_loader
                .acquire_next_image(self.swapchain, u64::MAX, semaphore, vk::Fence::null())
        };
        match result {
            Ok((index, suboptimal)) => {
                let image = &mut self.images[index as usize];
                // The previous present of this image has completed
                let recycled: Vec<vk::Semaphore> = image
                    .acquire_semaphore
                    .replace(semaphore)
                    .into_iter()
                    .chain(image.present_semaphores.drain(..))
                    .collect();
                image.acquire_waited = false;
                self.free_semaphores.extend(recycled);
                self.current = Some(index);
                if suboptimal {
                    self.needs_recreate = true;
                }
                Ok(())
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.free_semaphores.push(semaphore);
                self.current = None;
                self.needs_recreate = true;
                Ok(())
            }
            Err(e) => {
                unsafe { self.ctx.device.destroy_semaphore(semaphore, None) };
                Err(map_vk_error("vkAcquireNextImageKHR", e))
            }
        }
    }

    fn current_image(&self) -> Result<u32> {
        self.current.ok_or_else(|| {
            Error::InvalidState("swap chain has no acquired image; present or resize it first".to_string())
        })
    }

    /// Attachments of the current image for a render pass
    ///
    /// The swap image leaves the pass ready to present.
    pub(crate) fn framebuffer_binding(&self) -> Result<FramebufferBinding> {
        let index = self.current_image()?;
        let image = &self.images[index as usize];
        let swap_attachment = FramebufferAttachment {
            image: image.image,
            format: self.base.color_format(),
            mip_level: 0,
            array_layer: 0,
            initial_layout: image.layout,
            final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
        };
        let internal = |texture: &VulkanTexture| FramebufferAttachment {
            image: texture.image,
            format: texture.desc.format,
            mip_level: 0,
            array_layer: 0,
            initial_layout: texture.resting_layout,
            final_layout: texture.resting_layout,
        };
        let (colors, resolves) = match &self.msaa_color {
            Some(color) => (vec![internal(color)], vec![(0, swap_attachment)]),
            None => (vec![swap_attachment], Vec::new()),
        };
        Ok(FramebufferBinding {
            render_pass: self.render_pass,
            framebuffer: image.framebuffer,
            extent: self.extent,
            samples: self.base.samples(),
            colors,
            depth_stencil: self.depth.as_ref().map(internal),
            resolves,
        })
    }

    /// Semaphores for a submission that renders into the current image
    ///
    /// Returns the acquire semaphore if no earlier submission waited on it,
    /// and a new semaphore the submission must signal.
    pub(crate) fn submission_sync(&mut self) -> Result<(Option<vk::Semaphore>, vk::Semaphore)> {
        let index = self.current_image()? as usize;
        let signal = self.semaphore()?;
        let image = &mut self.images[index];
        let wait = if image.acquire_waited {
            None
        } else {
            image.acquire_waited = true;
            image.acquire_semaphore
        };
        image.present_semaphores.push(signal);
        Ok((wait, signal))
    }

    /// Record that a recorded pass left the current image presentable
    pub(crate) fn mark_rendered(&mut self) {
        if let Some(index) = self.current {
            self.images[index as usize].layout = vk::ImageLayout::PRESENT_SRC_KHR;
        }
    }

    /// Undo the bookkeeping of a submission that never reached the queue
    pub(crate) fn cancel_submission(&mut self, wait: Option<vk::Semaphore>, signal: vk::Semaphore) {
        if let Some(index) = self.current {
            let image = &mut self.images[index as usize];
            if wait.is_some() {
                image.acquire_waited = false;
            }
            image.present_semaphores.retain(|s| *s != signal);
        }
        self.free_semaphores.push(signal);
    }

    fn present_current(&mut self) -> Result<()> {
        let index = self.current_image()?;
        let (image_handle, layout, waited) = {
            let image = &self.images[index as usize];
            (image.image, image.layout, image.acquire_waited)
        };
        // Nothing rendered into the image: transition it here
        if !waited || layout != vk::ImageLayout::PRESENT_SRC_KHR {
            let (wait, signal) = self.submission_sync()?;
            let device = &self.ctx.device;
            let waits: Vec<vk::Semaphore> = wait.into_iter().collect();
            let result = self.ctx.immediate_submit_synced(&waits, &[signal], |cb| {
                image_barrier(device, cb, image_handle, color_range(), layout, vk::ImageLayout::PRESENT_SRC_KHR);
            });
            if let Err(e) = result {
                self.cancel_submission(wait, signal);
                return Err(e);
            }
            self.mark_rendered();
        }

        let image = &self.images[index as usize];
        let swapchains = [self.swapchain];
        let indices = [index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&image.present_semaphores)
            .swapchains(&swapchains)
            .image_indices(&indices);
        match self.ctx.queue_present(&present_info) {
            Ok(suboptimal) => {
                if suboptimal {
                    self.needs_recreate = true;
                }
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => self.needs_recreate = true,
            Err(e) => return Err(map_vk_error("vkQueuePresentKHR", e)),
        }
        self.current = None;
        Ok(())
    }

    fn recreate_at_current_size(&mut self) -> Result<()> {
        let resolution = self.base.resolution();
        self.recreate(resolution)
    }
}

fn color_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

fn create_surface(ctx: &GpuContext, base: &SwapChainBase) -> Result<vk::SurfaceKHR> {
    let surface = base.surface();
    let display = surface
        .display_handle()
        .map_err(|e| lumen_invalid!(SOURCE, "surface has no native display: {}", e))?;
    let window = surface
        .window_handle()
        .map_err(|e| lumen_invalid!(SOURCE, "surface has no native window: {}", e))?;
    unsafe {
        ash_window::create_surface(&ctx._entry, &ctx.instance, display.as_raw(), window.as_raw(), None)
    }
    .map_err(|e| {
        lumen_error!(SOURCE, "Failed to create window surface: {:?}", e);
        Error::InitializationFailed(format!("Failed to create window surface: {:?}", e))
    })
}

impl SwapChain for VulkanSwapChain {
    fn base(&self) -> &SwapChainBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SwapChainBase {
        &mut self.base
    }

    fn current_swap_index(&self) -> u32 {
        self.current.unwrap_or(0)
    }

    fn is_presentation_ready(&self) -> bool {
        self.swapchain != vk::SwapchainKHR::null() && self.extent.width > 0 && self.extent.height > 0
    }

    #[cfg(not(any(target_os = "android", target_os = "ios")))]
    fn present(&mut self) -> Result<()> {
        if self.current.is_some() {
            self.present_current()?;
        }
        if self.needs_recreate {
            self.recreate_at_current_size()
        } else {
            self.acquire()
        }
    }

    fn resize_native(&mut self, resolution: Extent2D, _fullscreen: bool) -> Result<()> {
        self.recreate(resolution)
    }

    fn set_vsync_native(&mut self, interval: u32) -> bool {
        let available = match unsafe {
            self.ctx
                .surface_loader
                .get_physical_device_surface_present_modes(self.ctx.physical_device, self.surface)
        } {
            Ok(modes) => modes,
            Err(e) => {
                lumen_warn!(SOURCE, "Failed to query present modes: {:?}", e);
                return false;
            }
        };
        let Some(mode) = choose_present_mode(interval, &available) else {
            return false;
        };
        if mode == self.present_mode {
            return true;
        }
        let previous = std::mem::replace(&mut self.present_mode, mode);
        if let Err(e) = self.recreate_at_current_size() {
            lumen_warn!(SOURCE, "Failed to apply vsync interval {}: {}", interval, e);
            self.present_mode = previous;
            return false;
        }
        true
    }
}

impl Drop for VulkanSwapChain {
    fn drop(&mut self) {
        if let Err(e) = self.ctx.wait_idle() {
            lumen_error!(SOURCE, "wait idle before swap chain destruction failed: {}", e);
        }
        self.destroy_buffers();
        unsafe {
            for semaphore in self.free_semaphores.drain(..) {
                self.ctx.device.destroy_semaphore(semaphore, None);
            }
            if self.render_pass != vk::RenderPass::null() {
                self.ctx.device.destroy_render_pass(self.render_pass, None);
            }
            if self.swapchain != vk::SwapchainKHR::null() {
                self.ctx.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
            self.ctx.surface_loader.destroy_surface(self.surface, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_swap_chain_tests.rs"]
mod tests;
