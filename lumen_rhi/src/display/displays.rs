/// Process-wide display list
///
/// The list is built on first use and rebuilt whenever the source reports a
/// different display count or after [`Displays::invalidate`] (call it from a
/// hot-plug notification). Callers must not assume the list is stable
/// between calls.

use std::sync::{Arc, OnceLock, RwLock};

use crate::display::{Display, DisplaySource, VirtualDisplaySource};

static DISPLAYS: OnceLock<RwLock<DisplayCache>> = OnceLock::new();

struct DisplayCache {
    source: Box<dyn DisplaySource>,
    displays: Vec<Arc<dyn Display>>,
    stale: bool,
}

impl DisplayCache {
    fn refresh(&mut self) {
        if self.stale || self.source.display_count() != self.displays.len() {
            self.displays = self.source.enumerate();
            self.stale = false;
            crate::lumen_debug!("lumen::Displays", "display list rebuilt ({} displays)", self.displays.len());
        }
    }
}

fn cache() -> &'static RwLock<DisplayCache> {
    DISPLAYS.get_or_init(|| {
        RwLock::new(DisplayCache {
            source: Box::new(VirtualDisplaySource::new()),
            displays: Vec::new(),
            stale: true,
        })
    })
}

pub struct Displays;

impl Displays {
    /// Current list of attached displays, rebuilt if needed
    pub fn list() -> Vec<Arc<dyn Display>> {
        match cache().write() {
            Ok(mut cache) => {
                cache.refresh();
                cache.displays.clone()
            }
            Err(_) => Vec::new(),
        }
    }

    pub fn primary() -> Option<Arc<dyn Display>> {
        Self::list().into_iter().find(|d| d.is_primary())
    }

    pub fn count() -> usize {
        Self::list().len()
    }

    /// Force a rebuild on the next query
    pub fn invalidate() {
        if let Ok(mut cache) = cache().write() {
            cache.stale = true;
        }
    }

    /// Replace the platform source (the list is rebuilt on the next query)
    pub fn set_source<S: DisplaySource + 'static>(source: S) {
        if let Ok(mut cache) = cache().write() {
            cache.source = Box::new(source);
            cache.displays.clear();
            cache.stale = true;
        }
    }
}

#[cfg(test)]
#[path = "displays_tests.rs"]
mod tests;
