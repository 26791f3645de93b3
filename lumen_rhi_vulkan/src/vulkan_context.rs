/// GpuContext - Shared GPU state for all Vulkan objects
///
/// Contains everything resources need for GPU operations:
/// - Instance and device for Vulkan API calls
/// - Allocator for memory management
/// - Queue for command submission
/// - Command pool for one-shot upload and readback operations
///
/// Every Vulkan object holds an `Arc<GpuContext>`, so the device outlives
/// the last object that was created from it.

use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator};
use gpu_allocator::MemoryLocation;
use lumen_rhi::lumen::format::Format;
use lumen_rhi::lumen::{Error, Result};
use lumen_rhi::{lumen_err, lumen_error, lumen_warn};

pub(crate) const SOURCE: &str = "lumen::vulkan";

/// Debug-utils loaders, present when the extension was enabled
pub(crate) struct DebugUtils {
    pub instance: ash::ext::debug_utils::Instance,
    pub device: ash::ext::debug_utils::Device,
    /// Validation messenger, null when validation is off
    pub messenger: vk::DebugUtilsMessengerEXT,
}

/// Optional device capabilities the backend checks before using them
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DeviceCapabilities {
    pub sampler_anisotropy: bool,
    pub pipeline_statistics: bool,
    pub occlusion_query_precise: bool,
    pub mirror_clamp_to_edge: bool,
    pub depth_clamp: bool,
    pub fill_mode_non_solid: bool,
    pub wide_lines: bool,
}

/// Shared GPU context for all Vulkan resources
pub struct GpuContext {
    pub(crate) _entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: ash::Device,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop so it is dropped BEFORE the device is destroyed
    pub(crate) allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Graphics queue (also used for presentation)
    pub(crate) queue: Mutex<vk::Queue>,
    pub(crate) queue_family: u32,

    /// Reusable command pool for one-shot operations
    /// (created with TRANSIENT + RESET_COMMAND_BUFFER flags)
    pub(crate) upload_command_pool: Mutex<vk::CommandPool>,

    pub(crate) surface_loader: ash::khr::surface::Instance,
    pub(crate) swapchain_loader: ash::khr::swapchain::Device,

    pub(crate) properties: vk::PhysicalDeviceProperties,
    pub(crate) capabilities: DeviceCapabilities,
    /// Depth-stencil format used for swap-chain depth buffers
    pub(crate) default_depth_format: Format,

    pub(crate) debug_utils: Option<DebugUtils>,
}

impl GpuContext {
    fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>> {
        mutex
            .lock()
            .map_err(|_| lumen_err!(SOURCE, "{} lock poisoned", what))
    }

    // ===== MEMORY =====

    /// Allocate device memory for a buffer or image
    ///
    /// # Errors
    ///
    /// `OutOfMemory` if no heap can satisfy the request
    pub fn allocate(
        &self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: MemoryLocation,
        linear: bool,
    ) -> Result<Allocation> {
        let mut allocator = Self::lock(&self.allocator, "allocator")?;
        allocator
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| match e {
                gpu_allocator::AllocationError::OutOfMemory => {
                    lumen_error!(SOURCE, "Out of GPU memory allocating '{}' ({} bytes)", name, requirements.size);
                    Error::OutOfMemory
                }
                other => lumen_err!(SOURCE, "Failed to allocate memory for '{}': {:?}", name, other),
            })
    }

    /// Return an allocation to the allocator
    pub fn free(&self, allocation: Allocation) {
        // Don't panic if lock fails - the caller still destroys its handle
        if let Ok(mut allocator) = self.allocator.lock() {
            if let Err(e) = allocator.free(allocation) {
                lumen_warn!(SOURCE, "Failed to free GPU allocation: {:?}", e);
            }
        }
    }

    // ===== SUBMISSION =====

    /// Submit batches to the queue
    pub fn queue_submit(&self, submits: &[vk::SubmitInfo<'_>], fence: vk::Fence) -> Result<()> {
        let queue = Self::lock(&self.queue, "queue")?;
        unsafe {
            self.device
                .queue_submit(*queue, submits, fence)
                .map_err(|e| map_vk_error("vkQueueSubmit", e))
        }
    }

    /// Present to a swap chain; returns true if the swap chain is suboptimal
    pub fn queue_present(&self, present_info: &vk::PresentInfoKHR<'_>) -> std::result::Result<bool, vk::Result> {
        let queue = self.queue.lock().map_err(|_| vk::Result::ERROR_UNKNOWN)?;
        unsafe { self.swapchain_loader.queue_present(*queue, present_info) }
    }

    /// Record and execute commands synchronously
    ///
    /// Used for uploads, readbacks and layout changes outside command buffers.
    pub fn immediate_submit(&self, record: impl FnOnce(vk::CommandBuffer)) -> Result<()> {
        self.immediate_submit_synced(&[], &[], record)
    }

    /// Like [`Self::immediate_submit`], waiting on and signaling semaphores
    ///
    /// Waits happen at the color-attachment-output stage, which is where
    /// swap-chain acquire semaphores are consumed.
    pub fn immediate_submit_synced(
        &self,
        wait_semaphores: &[vk::Semaphore],
        signal_semaphores: &[vk::Semaphore],
        record: impl FnOnce(vk::CommandBuffer),
    ) -> Result<()> {
        let pool = Self::lock(&self.upload_command_pool, "upload command pool")?;
        unsafe {
            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let command_buffers = self
                .device
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| lumen_err!(SOURCE, "Failed to allocate upload command buffer: {:?}", e))?;
            let command_buffer = command_buffers[0];

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            let result = self
                .device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| lumen_err!(SOURCE, "Failed to begin upload command buffer: {:?}", e))
                .and_then(|_| {
                    record(command_buffer);
                    self.device
                        .end_command_buffer(command_buffer)
                        .map_err(|e| lumen_err!(SOURCE, "Failed to end upload command buffer: {:?}", e))
                })
                .and_then(|_| self.submit_and_wait(command_buffer, wait_semaphores, signal_semaphores));

            self.device.free_command_buffers(*pool, &command_buffers);
            result
        }
    }

    fn submit_and_wait(
        &self,
        command_buffer: vk::CommandBuffer,
        wait_semaphores: &[vk::Semaphore],
        signal_semaphores: &[vk::Semaphore],
    ) -> Result<()> {
        unsafe {
            let fence = self
                .device
                .create_fence(&vk::FenceCreateInfo::default(), None)
                .map_err(|e| lumen_err!(SOURCE, "Failed to create upload fence: {:?}", e))?;
            let command_buffers = [command_buffer];
            let wait_stages = vec![vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT; wait_semaphores.len()];
            let submit = vk::SubmitInfo::default()
                .wait_semaphores(wait_semaphores)
                .wait_dst_stage_mask(&wait_stages)
                .command_buffers(&command_buffers)
                .signal_semaphores(signal_semaphores);
            let result = self.queue_submit(&[submit], fence).and_then(|_| {
                self.device
                    .wait_for_fences(&[fence], true, u64::MAX)
                    .map_err(|e| map_vk_error("vkWaitForFences", e))
            });
            self.device.destroy_fence(fence, None);
            result
        }
    }

    /// Block until the device has no pending work
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device
                .device_wait_idle()
                .map_err(|e| map_vk_error("vkDeviceWaitIdle", e))
        }
    }

    // ===== QUERIES =====

    pub fn format_properties(&self, format: vk::Format) -> vk::FormatProperties {
        unsafe {
            self.instance
                .get_physical_device_format_properties(self.physical_device, format)
        }
    }

    /// True if images of `format` can be blitted with linear filtering
    pub fn supports_linear_blit(&self, format: vk::Format) -> bool {
        self.format_properties(format)
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR)
    }

    pub fn limits(&self) -> &vk::PhysicalDeviceLimits {
        &self.properties.limits
    }

    // ===== DEBUG LABELS =====

    /// Attach a debug name to a Vulkan handle (no-op without debug utils)
    pub fn set_object_name<T: vk::Handle>(&self, handle: T, name: &str) {
        let Some(debug) = &self.debug_utils else {
            return;
        };
        let Ok(name) = CString::new(name) else {
            return;
        };
        let info = vk::DebugUtilsObjectNameInfoEXT::default()
            .object_handle(handle)
            .object_name(&name);
        unsafe {
            if let Err(e) = debug.device.set_debug_utils_object_name(&info) {
                lumen_warn!(SOURCE, "Failed to set object name: {:?}", e);
            }
        }
    }

    pub fn begin_label(&self, command_buffer: vk::CommandBuffer, name: &str) {
        let Some(debug) = &self.debug_utils else {
            return;
        };
        let name = CString::new(name).unwrap_or_default();
        let label = vk::DebugUtilsLabelEXT::default().label_name(&name);
        unsafe { debug.device.cmd_begin_debug_utils_label(command_buffer, &label) };
    }

    pub fn end_label(&self, command_buffer: vk::CommandBuffer) {
        if let Some(debug) = &self.debug_utils {
            unsafe { debug.device.cmd_end_debug_utils_label(command_buffer) };
        }
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();

            if let Ok(pool) = self.upload_command_pool.get_mut() {
                self.device.destroy_command_pool(*pool, None);
            }

            // Allocator releases its memory blocks through the device
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);

            if let Some(debug) = self.debug_utils.take() {
                if debug.messenger != vk::DebugUtilsMessengerEXT::null() {
                    debug.instance.destroy_debug_utils_messenger(debug.messenger, None);
                }
            }

            self.instance.destroy_instance(None);
        }
    }
}

/// Map a failed Vulkan call to a Lumen error
pub(crate) fn map_vk_error(call: &str, result: vk::Result) -> Error {
    match result {
        vk::Result::ERROR_OUT_OF_DEVICE_MEMORY | vk::Result::ERROR_OUT_OF_HOST_MEMORY => {
            lumen_error!(SOURCE, "{} failed: {:?}", call, result);
            Error::OutOfMemory
        }
        other => lumen_err!(SOURCE, "{} failed: {:?}", call, other),
    }
}
