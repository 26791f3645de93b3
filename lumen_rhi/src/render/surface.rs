/// Presentable surfaces
///
/// A swap chain keeps an `Arc<dyn Surface>` because the application usually
/// holds the same window for event handling.

use std::sync::Mutex;

use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
use winit::dpi::PhysicalSize;
use winit::window::{Fullscreen, Window};

use crate::render::Extent2D;

/// Window or canvas a swap chain presents to
pub trait Surface: HasWindowHandle + HasDisplayHandle + Send + Sync {
    /// Size of the drawable area in pixels
    fn content_size(&self) -> Extent2D;

    /// Adjust the surface for a new video mode
    ///
    /// `resolution` may be rewritten with the size the platform actually
    /// granted. Returns false if the surface cannot be adapted.
    fn adapt_for_video_mode(&self, resolution: &mut Extent2D, fullscreen: bool) -> bool;
}

impl Surface for Window {
    fn content_size(&self) -> Extent2D {
        let size = self.inner_size();
        Extent2D::new(size.width, size.height)
    }

    fn adapt_for_video_mode(&self, resolution: &mut Extent2D, fullscreen: bool) -> bool {
        if fullscreen {
            self.set_fullscreen(Some(Fullscreen::Borderless(None)));
        } else {
            self.set_fullscreen(None);
        }
        // Platforms that resize asynchronously return None; keep the request
        if let Some(granted) = self.request_inner_size(PhysicalSize::new(resolution.width, resolution.height)) {
            *resolution = Extent2D::new(granted.width, granted.height);
        }
        true
    }
}

/// Surface without a native window, for off-screen rendering and tests
#[derive(Debug)]
pub struct HeadlessSurface {
    size: Mutex<Extent2D>,
    fullscreen: Mutex<bool>,
}

impl HeadlessSurface {
    pub fn new(size: Extent2D) -> Self {
        Self {
            size: Mutex::new(size),
            fullscreen: Mutex::new(false),
        }
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen.lock().map(|f| *f).unwrap_or(false)
    }
}

impl HasWindowHandle for HeadlessSurface {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl HasDisplayHandle for HeadlessSurface {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl Surface for HeadlessSurface {
    fn content_size(&self) -> Extent2D {
        self.size.lock().map(|s| *s).unwrap_or_default()
    }

    fn adapt_for_video_mode(&self, resolution: &mut Extent2D, fullscreen: bool) -> bool {
        if resolution.is_zero() {
            return false;
        }
        if let Ok(mut size) = self.size.lock() {
            *size = *resolution;
        }
        if let Ok(mut flag) = self.fullscreen.lock() {
            *flag = fullscreen;
        }
        true
    }
}
