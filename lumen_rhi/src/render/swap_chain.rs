/// Swap chain abstraction
///
/// Backends implement the native half (`resize_native`, `present`, vsync);
/// the shared half lives in [`SwapChainBase`], which every backend swap chain
/// embeds. Resolution, samples and formats are fixed at creation and change
/// only through [`SwapChain::resize_buffers`].

use std::sync::Arc;

use crate::error::Result;
use crate::format::{find_depth_stencil_format, find_swap_chain_color_format, Format};
use crate::render::limits::clamp_samples;
use crate::render::{Extent2D, RenderingLimits, Surface};

const SOURCE: &str = "lumen::SwapChain";

/// Descriptor for creating a swap chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapChainDescriptor {
    pub debug_name: Option<String>,
    /// Zero takes the surface content size
    pub resolution: Extent2D,
    pub color_bits: u32,
    pub depth_bits: u32,
    pub stencil_bits: u32,
    pub samples: u32,
    pub swap_buffers: u32,
    pub fullscreen: bool,
}

impl Default for SwapChainDescriptor {
    fn default() -> Self {
        Self {
            debug_name: None,
            resolution: Extent2D::default(),
            color_bits: 32,
            depth_bits: 24,
            stencil_bits: 8,
            samples: 1,
            swap_buffers: 2,
            fullscreen: false,
        }
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResizeFlags: u32 {
        /// Also resize the surface (window) to the new resolution
        const ADAPT_SURFACE   = 1 << 0;
        const FULLSCREEN_MODE = 1 << 1;
        const WINDOWED_MODE   = 1 << 2;
    }
}

/// State shared by every backend swap chain
pub struct SwapChainBase {
    debug_name: Option<String>,
    surface: Arc<dyn Surface>,
    resolution: Extent2D,
    samples: u32,
    color_format: Format,
    depth_stencil_format: Format,
    num_swap_buffers: u32,
    fullscreen: bool,
    vsync_interval: u32,
    framebuffer_height: u32,
}

impl SwapChainBase {
    /// Negotiate resolution, samples and formats for a new swap chain
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if neither the descriptor nor the surface provides a
    /// non-zero resolution
    pub fn new(desc: &SwapChainDescriptor, surface: Arc<dyn Surface>, limits: &RenderingLimits) -> Result<Self> {
        let resolution = if desc.resolution.is_zero() {
            surface.content_size()
        } else {
            desc.resolution
        };
        if resolution.is_zero() {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "invalid swap chain resolution {}x{}",
                resolution.width, resolution.height
            ));
        }

        let samples = clamp_samples(desc.samples, limits.max_color_buffer_samples);
        if samples != desc.samples.max(1) {
            crate::lumen_warn!(
                SOURCE,
                "swap chain sample count {} clamped to {}",
                desc.samples, samples
            );
        }

        Ok(Self {
            debug_name: desc.debug_name.clone(),
            surface,
            resolution,
            samples,
            color_format: find_swap_chain_color_format(desc.color_bits),
            depth_stencil_format: find_depth_stencil_format(desc.depth_bits, desc.stencil_bits),
            num_swap_buffers: desc.swap_buffers.clamp(1, 3),
            fullscreen: desc.fullscreen,
            vsync_interval: 1,
            framebuffer_height: resolution.height,
        })
    }

    pub fn debug_name(&self) -> Option<&str> {
        self.debug_name.as_deref()
    }

    pub fn set_debug_name(&mut self, name: &str) {
        self.debug_name = Some(name.to_string());
    }

    pub fn surface(&self) -> &Arc<dyn Surface> {
        &self.surface
    }

    pub fn resolution(&self) -> Extent2D {
        self.resolution
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn color_format(&self) -> Format {
        self.color_format
    }

    pub fn depth_stencil_format(&self) -> Format {
        self.depth_stencil_format
    }

    pub fn num_swap_buffers(&self) -> u32 {
        self.num_swap_buffers
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn vsync_interval(&self) -> u32 {
        self.vsync_interval
    }

    pub fn framebuffer_height(&self) -> u32 {
        self.framebuffer_height
    }

    /// Validate a resize request and adapt the surface if asked to
    ///
    /// Returns the resolution and fullscreen mode to hand to the backend.
    pub fn prepare_resize(&self, resolution: Extent2D, flags: ResizeFlags) -> Result<(Extent2D, bool)> {
        if resolution.is_zero() {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "invalid swap chain resolution {}x{}",
                resolution.width, resolution.height
            ));
        }
        if flags.contains(ResizeFlags::FULLSCREEN_MODE | ResizeFlags::WINDOWED_MODE) {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "FULLSCREEN_MODE and WINDOWED_MODE are mutually exclusive"
            ));
        }

        let fullscreen = if flags.contains(ResizeFlags::FULLSCREEN_MODE) {
            true
        } else if flags.contains(ResizeFlags::WINDOWED_MODE) {
            false
        } else {
            self.fullscreen
        };

        let mut resolution = resolution;
        if flags.contains(ResizeFlags::ADAPT_SURFACE) && !self.surface.adapt_for_video_mode(&mut resolution, fullscreen) {
            return Err(crate::error::Error::InvalidState(format!(
                "surface could not adapt to {}x{}",
                resolution.width, resolution.height
            )));
        }
        Ok((resolution, fullscreen))
    }

    /// Record the new size after the backend resized its buffers
    pub fn commit_resize(&mut self, resolution: Extent2D, fullscreen: bool) {
        crate::lumen_debug!(
            SOURCE,
            "resized {}x{} -> {}x{}",
            self.resolution.width, self.resolution.height, resolution.width, resolution.height
        );
        self.resolution = resolution;
        self.fullscreen = fullscreen;
        self.framebuffer_height = resolution.height;
    }

    pub fn set_framebuffer_height(&mut self, height: u32) {
        self.framebuffer_height = height;
    }

    pub fn set_formats(&mut self, color: Format, depth_stencil: Format) {
        self.color_format = color;
        self.depth_stencil_format = depth_stencil;
    }

    pub fn set_num_swap_buffers(&mut self, count: u32) {
        self.num_swap_buffers = count;
    }

    pub fn set_vsync(&mut self, interval: u32) {
        self.vsync_interval = interval;
    }
}

/// Presentable surface plus its backing buffers
pub trait SwapChain: Send {
    fn base(&self) -> &SwapChainBase;
    fn base_mut(&mut self) -> &mut SwapChainBase;

    /// Index of the back buffer the next render pass draws into
    fn current_swap_index(&self) -> u32;

    /// True if the swap chain can present (surface attached, not minimized)
    fn is_presentation_ready(&self) -> bool;

    /// Hand the finished frame to the compositor
    ///
    /// Mobile targets present implicitly when the render pass ends.
    #[cfg(not(any(target_os = "android", target_os = "ios")))]
    fn present(&mut self) -> Result<()>;

    /// Re-create the native buffers at `resolution`
    fn resize_native(&mut self, resolution: Extent2D, fullscreen: bool) -> Result<()>;

    /// Apply a vsync interval; false if the backend cannot honor it
    fn set_vsync_native(&mut self, interval: u32) -> bool;

    fn resolution(&self) -> Extent2D {
        self.base().resolution()
    }

    fn samples(&self) -> u32 {
        self.base().samples()
    }

    fn color_format(&self) -> Format {
        self.base().color_format()
    }

    fn depth_stencil_format(&self) -> Format {
        self.base().depth_stencil_format()
    }

    fn num_swap_buffers(&self) -> u32 {
        self.base().num_swap_buffers()
    }

    fn is_fullscreen(&self) -> bool {
        self.base().is_fullscreen()
    }

    fn vsync_interval(&self) -> u32 {
        self.base().vsync_interval()
    }

    /// Framebuffer height cached for origin-flipping state tracking
    fn framebuffer_height(&self) -> u32 {
        self.base().framebuffer_height()
    }

    fn surface(&self) -> Arc<dyn Surface> {
        Arc::clone(self.base().surface())
    }

    /// Resize the swap chain buffers
    ///
    /// Must be called before the next render pass that targets this swap
    /// chain.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a zero resolution or conflicting mode flags,
    /// `InvalidState` if the surface refused to adapt
    fn resize_buffers(&mut self, resolution: Extent2D, flags: ResizeFlags) -> Result<()> {
        let (resolution, fullscreen) = self.base().prepare_resize(resolution, flags)?;
        self.resize_native(resolution, fullscreen)?;
        self.base_mut().commit_resize(resolution, fullscreen);
        Ok(())
    }

    /// Set the vsync interval (0 = off, 1 = every vblank)
    ///
    /// Returns false and leaves the interval unchanged if unsupported.
    fn set_vsync_interval(&mut self, interval: u32) -> bool {
        if self.set_vsync_native(interval) {
            self.base_mut().set_vsync(interval);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
#[path = "swap_chain_tests.rs"]
mod tests;
