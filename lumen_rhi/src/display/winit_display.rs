/// Displays enumerated through winit
///
/// winit only exposes monitors from inside the event loop, so the source
/// keeps a snapshot that the application refreshes from `resumed` or on
/// hot-plug, followed by [`Displays::invalidate`](crate::display::Displays::invalidate).

use std::sync::{Arc, Mutex, RwLock};

use winit::event_loop::ActiveEventLoop;
use winit::monitor::MonitorHandle;

use crate::display::{finalize_display_modes, Display, DisplayMode, DisplaySource};
use crate::render::Offset2D;
use crate::utils::Utf8String;

fn millihertz_to_hz(millihertz: u32) -> u32 {
    millihertz.saturating_add(500) / 1000
}

/// Snapshot of one winit monitor
pub struct WinitDisplay {
    name: String,
    primary: bool,
    offset: Offset2D,
    scale: f32,
    modes: Vec<DisplayMode>,
    native_mode: DisplayMode,
    current: Mutex<DisplayMode>,
}

impl WinitDisplay {
    fn capture(monitor: &MonitorHandle, primary: bool) -> Self {
        let size = monitor.size();
        let position = monitor.position();
        let native_mode = DisplayMode::new(
            size.width,
            size.height,
            monitor.refresh_rate_millihertz().map(millihertz_to_hz).unwrap_or(60),
        );

        let mut modes: Vec<DisplayMode> = monitor
            .video_modes()
            .map(|mode| {
                let size = mode.size();
                DisplayMode::new(size.width, size.height, millihertz_to_hz(mode.refresh_rate_millihertz()))
            })
            .collect();
        modes.push(native_mode);
        finalize_display_modes(&mut modes);

        Self {
            name: monitor.name().unwrap_or_else(|| "unknown".to_string()),
            primary,
            offset: Offset2D::new(position.x, position.y),
            scale: monitor.scale_factor() as f32,
            modes,
            native_mode,
            current: Mutex::new(native_mode),
        }
    }
}

impl Display for WinitDisplay {
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
                *current = self.native_mode;
                true
            }
            Err(_) => false,
        }
    }

    /// winit switches video modes only for exclusive fullscreen windows, so
    /// only the mode already active is accepted
    fn set_display_mode(&self, mode: &DisplayMode) -> bool {
        self.display_mode() == *mode
    }

    fn display_mode(&self) -> DisplayMode {
        self.current.lock().map(|m| *m).unwrap_or(self.native_mode)
    }

    fn supported_display_modes(&self) -> Vec<DisplayMode> {
        self.modes.clone()
    }
}

/// Display source fed from a winit event loop
#[derive(Clone, Default)]
pub struct WinitDisplaySource {
    displays: Arc<RwLock<Vec<Arc<WinitDisplay>>>>,
}

impl WinitDisplaySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a new snapshot of the attached monitors
    pub fn refresh(&self, event_loop: &ActiveEventLoop) {
        let primary = event_loop.primary_monitor();
        let displays: Vec<Arc<WinitDisplay>> = event_loop
            .available_monitors()
            .map(|monitor| {
                let is_primary = primary.as_ref() == Some(&monitor);
                Arc::new(WinitDisplay::capture(&monitor, is_primary))
            })
            .collect();
        if let Ok(mut snapshot) = self.displays.write() {
            *snapshot = displays;
        }
    }
}

impl DisplaySource for WinitDisplaySource {
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
