//! Unit tests for swap_chain.rs
//!
//! Uses a minimal in-test swap chain on top of `SwapChainBase`.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::format::Format;
use crate::render::swap_chain::*;
use crate::render::{Extent2D, HeadlessSurface, RenderingLimits, Surface};

struct TestSwapChain {
    base: SwapChainBase,
    native_resizes: Vec<Extent2D>,
}

impl SwapChain for TestSwapChain {
    fn base(&self) -> &SwapChainBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SwapChainBase {
        &mut self.base
    }

    fn current_swap_index(&self) -> u32 {
        0
    }

    fn is_presentation_ready(&self) -> bool {
        true
    }

    #[cfg(not(any(target_os = "android", target_os = "ios")))]
    fn present(&mut self) -> Result<()> {
        Ok(())
    }

    fn resize_native(&mut self, resolution: Extent2D, _fullscreen: bool) -> Result<()> {
        self.native_resizes.push(resolution);
        Ok(())
    }

    fn set_vsync_native(&mut self, interval: u32) -> bool {
        interval <= 1
    }
}

fn create(desc: &SwapChainDescriptor) -> Result<(TestSwapChain, Arc<HeadlessSurface>)> {
    let surface = Arc::new(HeadlessSurface::new(Extent2D::new(640, 480)));
    let base = SwapChainBase::new(desc, surface.clone() as Arc<dyn Surface>, &RenderingLimits::default())?;
    Ok((TestSwapChain { base, native_resizes: Vec::new() }, surface))
}

fn desc_800x600() -> SwapChainDescriptor {
    SwapChainDescriptor {
        resolution: Extent2D::new(800, 600),
        ..Default::default()
    }
}

// ============================================================================
// CREATION
// ============================================================================

#[test]
fn test_create_fixes_resolution_and_formats() {
    let (swap_chain, _) = create(&desc_800x600()).unwrap();
    assert_eq!(swap_chain.resolution(), Extent2D::new(800, 600));
    assert_eq!(swap_chain.framebuffer_height(), 600);
    assert_eq!(swap_chain.color_format(), Format::Bgra8Unorm);
    assert_eq!(swap_chain.depth_stencil_format(), Format::D24UnormS8Uint);
    assert_eq!(swap_chain.num_swap_buffers(), 2);
}

#[test]
fn test_zero_resolution_takes_surface_size() {
    let (swap_chain, _) = create(&SwapChainDescriptor::default()).unwrap();
    assert_eq!(swap_chain.resolution(), Extent2D::new(640, 480));
}

#[test]
fn test_base_getters_track_backend_updates() {
    let surface: Arc<dyn Surface> = Arc::new(HeadlessSurface::new(Extent2D::new(640, 480)));
    let desc = SwapChainDescriptor { samples: 4, ..desc_800x600() };
    let limits = RenderingLimits { max_color_buffer_samples: 8, ..Default::default() };
    let mut base = SwapChainBase::new(&desc, surface, &limits).unwrap();
    assert_eq!(base.resolution(), Extent2D::new(800, 600));
    assert_eq!(base.samples(), 4);
    assert!(!base.is_fullscreen());
    assert_eq!(base.vsync_interval(), 1);

    // Backends overwrite what the native swap chain actually got
    base.set_formats(Format::Rgba8Unorm, Format::D32Float);
    base.set_num_swap_buffers(3);
    base.set_vsync(0);
    base.commit_resize(Extent2D::new(320, 200), true);
    assert_eq!(base.color_format(), Format::Rgba8Unorm);
    assert_eq!(base.depth_stencil_format(), Format::D32Float);
    assert_eq!(base.num_swap_buffers(), 3);
    assert_eq!(base.vsync_interval(), 0);
    assert_eq!(base.resolution(), Extent2D::new(320, 200));
    assert_eq!(base.framebuffer_height(), 200);
    assert!(base.is_fullscreen());

    let swap_chain = TestSwapChain { base, native_resizes: Vec::new() };
    assert_eq!(swap_chain.num_swap_buffers(), 3);
    assert_eq!(swap_chain.color_format(), Format::Rgba8Unorm);
}

#[test]
fn test_zero_resolution_with_empty_surface_fails() {
    let surface: Arc<dyn Surface> = Arc::new(HeadlessSurface::new(Extent2D::default()));
    let result = SwapChainBase::new(&SwapChainDescriptor::default(), surface, &RenderingLimits::default());
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
}

#[test]
fn test_samples_clamped_to_device_limit() {
    let desc = SwapChainDescriptor { samples: 16, ..desc_800x600() };
    let (swap_chain, _) = create(&desc).unwrap();
    assert_eq!(swap_chain.samples(), 8);
}

#[test]
fn test_swap_buffer_count_clamped() {
    let desc = SwapChainDescriptor { swap_buffers: 7, ..desc_800x600() };
    let (swap_chain, _) = create(&desc).unwrap();
    assert_eq!(swap_chain.num_swap_buffers(), 3);
}

// ============================================================================
// RESIZE
// ============================================================================

#[test]
fn test_resize_updates_resolution_and_framebuffer_height() {
    let (mut swap_chain, _) = create(&desc_800x600()).unwrap();
    swap_chain.resize_buffers(Extent2D::new(1920, 1080), ResizeFlags::empty()).unwrap();

    assert_eq!(swap_chain.resolution(), Extent2D::new(1920, 1080));
    assert_eq!(swap_chain.framebuffer_height(), 1080);
    assert_eq!(swap_chain.native_resizes, vec![Extent2D::new(1920, 1080)]);
}

#[test]
fn test_resize_to_zero_fails_without_change() {
    let (mut swap_chain, _) = create(&desc_800x600()).unwrap();
    let result = swap_chain.resize_buffers(Extent2D::new(0, 600), ResizeFlags::empty());
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert_eq!(swap_chain.resolution(), Extent2D::new(800, 600));
    assert!(swap_chain.native_resizes.is_empty());
}

#[test]
fn test_conflicting_mode_flags_fail() {
    let (mut swap_chain, _) = create(&desc_800x600()).unwrap();
    let flags = ResizeFlags::FULLSCREEN_MODE | ResizeFlags::WINDOWED_MODE;
    assert!(swap_chain.resize_buffers(Extent2D::new(1024, 768), flags).is_err());
}

#[test]
fn test_adapt_surface_and_fullscreen() {
    let (mut swap_chain, surface) = create(&desc_800x600()).unwrap();
    let flags = ResizeFlags::ADAPT_SURFACE | ResizeFlags::FULLSCREEN_MODE;
    swap_chain.resize_buffers(Extent2D::new(1280, 720), flags).unwrap();

    assert!(swap_chain.is_fullscreen());
    assert!(surface.is_fullscreen());
    assert_eq!(surface.content_size(), Extent2D::new(1280, 720));

    swap_chain.resize_buffers(Extent2D::new(1280, 720), ResizeFlags::WINDOWED_MODE).unwrap();
    assert!(!swap_chain.is_fullscreen());
}

// ============================================================================
// VSYNC
// ============================================================================

#[test]
fn test_unsupported_vsync_interval_is_soft_failure() {
    let (mut swap_chain, _) = create(&desc_800x600()).unwrap();
    assert!(swap_chain.set_vsync_interval(0));
    assert_eq!(swap_chain.vsync_interval(), 0);
    assert!(!swap_chain.set_vsync_interval(4));
    assert_eq!(swap_chain.vsync_interval(), 0);
}
