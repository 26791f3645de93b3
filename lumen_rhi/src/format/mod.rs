/// Format module - pixel formats and texture geometry math

pub mod format;
pub mod texture_flags;

pub use format::*;
pub use texture_flags::*;
