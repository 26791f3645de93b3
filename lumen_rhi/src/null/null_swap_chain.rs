/// Null swap chain and the shared state tracker
///
/// The swap chain keeps its color (and depth-stencil) buffers in CPU memory
/// so render passes on it can be cleared, copied from and read back.

use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::format::Format;
use crate::render::*;

use super::null_objects::NullTexture;

#[derive(Debug, Default)]
struct NullState {
    bound_swap_chain: Option<SwapChainHandle>,
    framebuffer_height: u32,
}

/// State shared between a render system and its swap chains
///
/// Tracks which swap chain is current and its framebuffer height, which
/// backends with a bottom-left origin use to flip viewports and scissors.
#[derive(Debug, Clone, Default)]
pub struct NullStateManager {
    state: Arc<Mutex<NullState>>,
}

impl NullStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a swap chain current and cache its framebuffer height
    pub fn bind_swap_chain(&self, handle: SwapChainHandle, framebuffer_height: u32) {
        if let Ok(mut state) = self.state.lock() {
            state.bound_swap_chain = Some(handle);
            state.framebuffer_height = framebuffer_height;
        }
    }

    /// Update the cached height if `handle` is the current swap chain
    pub fn notify_resize(&self, handle: SwapChainHandle, framebuffer_height: u32) {
        if let Ok(mut state) = self.state.lock() {
            if state.bound_swap_chain == Some(handle) {
                state.framebuffer_height = framebuffer_height;
            }
        }
    }

    /// Forget a released swap chain
    pub fn unbind_swap_chain(&self, handle: SwapChainHandle) {
        if let Ok(mut state) = self.state.lock() {
            if state.bound_swap_chain == Some(handle) {
                state.bound_swap_chain = None;
                state.framebuffer_height = 0;
            }
        }
    }

    pub fn bound_swap_chain(&self) -> Option<SwapChainHandle> {
        self.state.lock().ok().and_then(|s| s.bound_swap_chain)
    }

    pub fn framebuffer_height(&self) -> u32 {
        self.state.lock().map(|s| s.framebuffer_height).unwrap_or(0)
    }
}

fn color_buffer(format: Format, resolution: Extent2D, samples: u32) -> NullTexture {
    NullTexture::new(&TextureDescriptor {
        debug_name: None,
        texture_type: if samples > 1 { TextureType::Texture2DMS } else { TextureType::Texture2D },
        bind_flags: BindFlags::COLOR_ATTACHMENT | BindFlags::COPY_SRC,
        format,
        extent: Extent3D::from(resolution),
        mip_levels: 1,
        samples,
        ..Default::default()
    })
}

fn depth_buffer(format: Format, resolution: Extent2D, samples: u32) -> Option<NullTexture> {
    if format == Format::Undefined {
        return None;
    }
    Some(NullTexture::new(&TextureDescriptor {
        debug_name: None,
        texture_type: if samples > 1 { TextureType::Texture2DMS } else { TextureType::Texture2D },
        bind_flags: BindFlags::DEPTH_STENCIL_ATTACHMENT,
        format,
        extent: Extent3D::from(resolution),
        mip_levels: 1,
        samples,
        ..Default::default()
    }))
}

pub struct NullSwapChain {
    base: SwapChainBase,
    handle: SwapChainHandle,
    state: NullStateManager,
    color_buffers: Vec<NullTexture>,
    depth_stencil: Option<NullTexture>,
    swap_index: u32,
    presented_frames: u64,
}

impl NullSwapChain {
    pub fn new(base: SwapChainBase, handle: SwapChainHandle, state: NullStateManager) -> Self {
        let mut swap_chain = Self {
            base,
            handle,
            state,
            color_buffers: Vec::new(),
            depth_stencil: None,
            swap_index: 0,
            presented_frames: 0,
        };
        let resolution = swap_chain.resolution();
        swap_chain.allocate_buffers(resolution);
        swap_chain.state.bind_swap_chain(handle, swap_chain.framebuffer_height());
        swap_chain
    }

    fn allocate_buffers(&mut self, resolution: Extent2D) {
        let samples = self.samples();
        self.color_buffers = (0..self.num_swap_buffers())
            .map(|_| color_buffer(self.color_format(), resolution, samples))
            .collect();
        self.depth_stencil = depth_buffer(self.depth_stencil_format(), resolution, samples);
    }

    pub fn handle(&self) -> SwapChainHandle {
        self.handle
    }

    pub fn presented_frames(&self) -> u64 {
        self.presented_frames
    }

    /// Back buffer the current frame renders into
    pub fn color_buffer(&self) -> Option<&NullTexture> {
        self.color_buffers.get(self.swap_index as usize)
    }

    pub fn color_buffer_mut(&mut self) -> Option<&mut NullTexture> {
        self.color_buffers.get_mut(self.swap_index as usize)
    }

    pub fn depth_stencil_buffer_mut(&mut self) -> Option<&mut NullTexture> {
        self.depth_stencil.as_mut()
    }
}

impl SwapChain for NullSwapChain {
    fn base(&self) -> &SwapChainBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SwapChainBase {
        &mut self.base
    }

    fn current_swap_index(&self) -> u32 {
        self.swap_index
    }

    fn is_presentation_ready(&self) -> bool {
        !self.color_buffers.is_empty()
    }

    #[cfg(not(any(target_os = "android", target_os = "ios")))]
    fn present(&mut self) -> Result<()> {
        self.presented_frames += 1;
        self.swap_index = (self.swap_index + 1) % self.num_swap_buffers().max(1);
        crate::lumen_trace!("lumen::null", "present frame {}", self.presented_frames);
        Ok(())
    }

    fn resize_native(&mut self, resolution: Extent2D, _fullscreen: bool) -> Result<()> {
        self.allocate_buffers(resolution);
        self.swap_index = 0;
        self.state.notify_resize(self.handle, resolution.height);
        Ok(())
    }

    fn set_vsync_native(&mut self, interval: u32) -> bool {
        interval <= 4
    }
}
