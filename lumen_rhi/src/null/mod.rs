//! Null backend
//!
//! Keeps every object in CPU memory and executes command buffers on the CPU.
//! Always available; used for tests and headless tooling.

mod null_command_executor;
mod null_objects;
mod null_render_system;
mod null_swap_chain;

pub use null_command_executor::NullStatistics;
pub use null_objects::{encode_clear_value, TexelUnit, PIPELINE_CACHE_MAGIC};
pub use null_render_system::NullRenderSystem;
pub use null_swap_chain::{NullStateManager, NullSwapChain};
