/// Configurable displays for headless runs and tests

use std::sync::{Arc, Mutex, RwLock};

use crate::display::{finalize_display_modes, Display, DisplayMode, DisplaySource};
use crate::render::Offset2D;
use crate::utils::Utf8String;

/// Display whose modes are given up front
pub struct VirtualDisplay {
    name: String,
    primary: bool,
    offset: Offset2D,
    scale: f32,
    modes: Vec<DisplayMode>,
    default_mode: DisplayMode,
    current: Mutex<DisplayMode>,
}

impl VirtualDisplay {
    /// Create a display; `current` is added to the supported modes
    pub fn new(name: &str, primary: bool, current: DisplayMode, mut modes: Vec<DisplayMode>) -> Self {
        modes.push(current);
        finalize_display_modes(&mut modes);
        Self {
            name: name.to_string(),
            primary,
            offset: Offset2D::default(),
            scale: 1.0,
            modes,
            default_mode: current,
            current: Mutex::new(current),
        }
    }

    pub fn with_offset(mut self, offset: Offset2D) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for VirtualDisplay {
    fn is_primary(&self) -> bool {
        self.primary
    }

    fn device_name(&self) -> Utf8String {
        Utf8String::from(self.name.as_str())
    }

    fn offset(&self) -> Offset2D {
        self.offset
    }

    fn scale(&self) -> f32 {
        self.scale
    }

    fn reset_display_mode(&self) -> bool {
        match self.current.lock() {
            Ok(mut current) => {
                *current = self.default_mode;
                true
            }
            Err(_) => false,
        }
    }

    fn set_display_mode(&self, mode: &DisplayMode) -> bool {
        if !self.modes.contains(mode) {
            return false;
        }
        match self.current.lock() {
            Ok(mut current) => {
                *current = *mode;
                true
            }
            Err(_) => false,
        }
    }

    fn display_mode(&self) -> DisplayMode {
        self.current.lock().map(|m| *m).unwrap_or(self.default_mode)
    }

    fn supported_display_modes(&self) -> Vec<DisplayMode> {
        self.modes.clone()
    }
}

/// Display source backed by a shared, editable list
///
/// Clones share the list, so a test can keep one clone to plug and unplug
/// displays after handing another to [`Displays::set_source`](crate::display::Displays::set_source).
#[derive(Clone, Default)]
pub struct VirtualDisplaySource {
    displays: Arc<RwLock<Vec<Arc<VirtualDisplay>>>>,
}

impl VirtualDisplaySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plug(&self, display: VirtualDisplay) -> Arc<VirtualDisplay> {
        let display = Arc::new(display);
        if let Ok(mut displays) = self.displays.write() {
            displays.push(Arc::clone(&display));
        }
        display
    }

    /// Remove the display named `name`; false if none matched
    pub fn unplug(&self, name: &str) -> bool {
        match self.displays.write() {
            Ok(mut displays) => {
                let before = displays.len();
                displays.retain(|d| d.name() != name);
                displays.len() != before
            }
            Err(_) => false,
        }
    }
}

impl DisplaySource for VirtualDisplaySource {
    fn display_count(&self) -> usize {
        self.displays.read().map(|d| d.len()).unwrap_or(0)
    }

    fn enumerate(&self) -> Vec<Arc<dyn Display>> {
        self.displays
            .read()
            .map(|displays| {
                displays
                    .iter()
                    .map(|d| Arc::clone(d) as Arc<dyn Display>)
                    .collect()
            })
            .unwrap_or_default()
    }
}
