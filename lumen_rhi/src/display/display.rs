/// Display (monitor) interface and display modes

use std::sync::Arc;

use crate::render::{Extent2D, Offset2D};
use crate::utils::Utf8String;

/// Resolution and refresh rate of a display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DisplayMode {
    pub resolution: Extent2D,
    /// Refresh rate in Hz
    pub refresh_rate: u32,
}

impl DisplayMode {
    pub const fn new(width: u32, height: u32, refresh_rate: u32) -> Self {
        Self {
            resolution: Extent2D::new(width, height),
            refresh_rate,
        }
    }
}

/// Sort modes ascending by (pixel count, refresh rate) and drop duplicates
///
/// Callers pick the "best" or "nearest" mode from the ends of this list.
pub fn finalize_display_modes(modes: &mut Vec<DisplayMode>) {
    modes.sort_by_key(|m| (m.resolution.area(), m.refresh_rate, m.resolution.width));
    modes.dedup();
}

/// One attached monitor
pub trait Display: Send + Sync {
    fn is_primary(&self) -> bool;
    fn device_name(&self) -> Utf8String;

    /// Position of the display in the virtual desktop
    fn offset(&self) -> Offset2D;

    /// Content scale (1.0 for standard DPI)
    fn scale(&self) -> f32;

    /// Restore the mode active before the first `set_display_mode`
    fn reset_display_mode(&self) -> bool;

    /// Switch to `mode`; returns false and changes nothing if unsupported
    fn set_display_mode(&self, mode: &DisplayMode) -> bool;

    fn display_mode(&self) -> DisplayMode;

    /// Supported modes, finalized with [`finalize_display_modes`]
    fn supported_display_modes(&self) -> Vec<DisplayMode>;
}

/// Platform enumeration behind the process-wide display list
pub trait DisplaySource: Send + Sync {
    /// Cheap count used to detect hot-plug
    fn display_count(&self) -> usize;

    /// Build handles for all attached displays
    fn enumerate(&self) -> Vec<Arc<dyn Display>>;
}
