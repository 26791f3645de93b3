/*!
# Lumen RHI - Vulkan Backend

Vulkan implementation of the Lumen render hardware interface.

Built on ash for the Vulkan bindings and gpu-allocator for memory
management. Command buffers recorded through the shared API are checked
and translated into native command buffers at submit.

The backend registers a loader with the runtime and is selected through
[`RenderSystemDescriptor::backend`](lumen_rhi::lumen::render::RenderSystemDescriptor).

# Example

```no_run
use lumen_rhi::lumen::Runtime;
use lumen_rhi::lumen::render::{Backend, RenderSystemDescriptor};

lumen_rhi_vulkan::register();
let render_system = Runtime::load_render_system(&RenderSystemDescriptor::new(Backend::Vulkan))?;
println!("{}", render_system.renderer_info().device_name);
# Ok::<(), lumen_rhi::lumen::Error>(())
```
*/

mod vulkan_context;
mod vulkan_device;
mod vulkan_format;

// Objects
mod vulkan_buffer;
mod vulkan_texture;
mod vulkan_sampler;
mod vulkan_shader;
mod vulkan_pipeline;
mod vulkan_render_pass;
mod vulkan_render_target;
mod vulkan_resource_heap;
mod vulkan_query;
mod vulkan_swap_chain;
mod vulkan_objects;

// Submission
mod vulkan_command_executor;
mod vulkan_render_system;

#[cfg(feature = "vulkan-validation")]
mod debug;

pub use vulkan_render_system::VulkanRenderSystem;

#[cfg(feature = "vulkan-validation")]
pub use debug::{get_validation_stats, print_validation_stats_report, ValidationStats};

use lumen_rhi::lumen::render::Backend;
use lumen_rhi::lumen::Runtime;

/// Register the Vulkan backend with the runtime
///
/// Registering again replaces the loader; live render systems are not
/// affected.
pub fn register() {
    Runtime::register_backend(Backend::Vulkan, VulkanRenderSystem::load);
}
