/// Display enumeration and display modes

pub mod display;
pub mod displays;
pub mod virtual_display;
pub mod winit_display;

pub use display::*;
pub use displays::*;
pub use virtual_display::*;
pub use winit_display::*;
