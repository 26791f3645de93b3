/*!
# Lumen RHI

Backend-independent render hardware interface.

One API surface over several native graphics backends. A render system is
selected once at startup from a [`RenderSystemDescriptor`](lumen::render::RenderSystemDescriptor)
and owns every GPU object it creates; objects are addressed through
generation-checked handles.

## Architecture

- **RenderSystem**: factory and owner of all GPU objects (one per backend)
- **CommandBuffer**: deferred recorder shared by every backend
- **CommandQueue**: submission, fences and query readback
- **SwapChain**: presentable surface with resize and vsync
- **Displays**: process-wide, lazily rebuilt monitor list
- **format**: format attributes and MIP/extent math

The Null backend ships with this crate and executes commands on the CPU.
Other backends live in their own crates and register a loader with
[`Runtime::register_backend`](lumen::Runtime::register_backend).
*/

// Internal modules
mod error;
mod runtime;
pub mod display;
pub mod format;
pub mod log;
pub mod null;
pub mod render;
pub mod utils;

// Main lumen namespace module
pub mod lumen {
    // Error types
    pub use crate::error::{Error, Result};

    // Process-wide runtime
    pub use crate::runtime::{BackendLease, BackendLoader, Runtime};

    pub use crate::utils::Utf8String;

    // Logging sub-module (types only, macros are exported at the crate root)
    pub mod log {
        pub use crate::log::{format_entry, DefaultLogger, LogEntry, LogSeverity, Logger};
    }

    pub mod render {
        pub use crate::render::*;
    }

    pub mod format {
        pub use crate::format::*;
    }

    pub mod display {
        pub use crate::display::*;
    }

    pub mod null {
        pub use crate::null::*;
    }
}
