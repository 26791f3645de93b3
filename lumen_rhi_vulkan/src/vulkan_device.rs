/// Vulkan instance, physical device selection and logical device creation

use std::ffi::{CStr, CString};
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};

use ash::vk::{self, Handle};
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use lumen_rhi::lumen::format::Format;
use lumen_rhi::lumen::render::{RenderSystemDescriptor, RenderSystemFlags, RendererInfo, RenderingLimits};
use lumen_rhi::lumen::{Error, Result};
use lumen_rhi::{lumen_debug, lumen_error, lumen_info, lumen_warn};

use crate::vulkan_context::{DebugUtils, DeviceCapabilities, GpuContext, SOURCE};
use crate::vulkan_format::{format_to_vk, max_sample_count};

#[cfg(feature = "vulkan-validation")]
const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Surface extensions enabled when the loader offers them
const SURFACE_EXTENSIONS: &[&CStr] = &[
    ash::khr::surface::NAME,
    ash::khr::xlib_surface::NAME,
    ash::khr::xcb_surface::NAME,
    ash::khr::wayland_surface::NAME,
    ash::khr::win32_surface::NAME,
    ash::khr::android_surface::NAME,
    ash::ext::metal_surface::NAME,
];

fn init_error(what: &str, detail: impl std::fmt::Debug) -> Error {
    lumen_error!(SOURCE, "{}: {:?}", what, detail);
    Error::InitializationFailed(format!("{}: {:?}", what, detail))
}

/// Everything `create_context` produces
pub(crate) struct DeviceSetup {
    pub context: Arc<GpuContext>,
    pub info: RendererInfo,
    pub limits: RenderingLimits,
}

/// Physical device that passed the suitability checks
struct Candidate {
    physical_device: vk::PhysicalDevice,
    queue_family: u32,
    properties: vk::PhysicalDeviceProperties,
    extensions: Vec<CString>,
}

/// Create instance, pick a physical device and create the logical device
pub(crate) fn create_context(desc: &RenderSystemDescriptor) -> Result<DeviceSetup> {
    let entry = unsafe { ash::Entry::load() }
        .map_err(|e| init_error("Failed to load Vulkan library", e))?;

    let api_version = match unsafe { entry.try_enumerate_instance_version() } {
        Ok(Some(version)) => version.min(vk::API_VERSION_1_3),
        _ => vk::API_VERSION_1_0,
    };

    // ===== INSTANCE EXTENSIONS AND LAYERS =====

    let available_extensions = unsafe { entry.enumerate_instance_extension_properties(None) }
        .map_err(|e| init_error("Failed to enumerate instance extensions", e))?;
    let has_extension = |name: &CStr| {
        available_extensions
            .iter()
            .any(|p| p.extension_name_as_c_str() == Ok(name))
    };

    let mut instance_extensions: Vec<&CStr> = SURFACE_EXTENSIONS
        .iter()
        .copied()
        .filter(|name| has_extension(name))
        .collect();

    let mut create_flags = vk::InstanceCreateFlags::empty();
    if has_extension(ash::khr::portability_enumeration::NAME) {
        instance_extensions.push(ash::khr::portability_enumeration::NAME);
        create_flags |= vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
    }

    let validation = validation_requested(desc, &entry);
    let debug_utils_enabled = has_extension(ash::ext::debug_utils::NAME)
        && (validation || desc.flags.contains(RenderSystemFlags::DEBUG_DEVICE));
    if debug_utils_enabled {
        instance_extensions.push(ash::ext::debug_utils::NAME);
    }

    let layers = enabled_layers(desc, &entry, validation);

    let app_name = desc.vulkan.application_name.to_cstring();
    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(desc.vulkan.application_version)
        .engine_name(c"Lumen")
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(api_version);

    let extension_ptrs: Vec<*const std::ffi::c_char> =
        instance_extensions.iter().map(|name| name.as_ptr()).collect();
    let layer_ptrs: Vec<*const std::ffi::c_char> = layers.iter().map(|name| name.as_ptr()).collect();

    let instance_info = vk::InstanceCreateInfo::default()
        .flags(create_flags)
        .application_info(&app_info)
        .enabled_extension_names(&extension_ptrs)
        .enabled_layer_names(&layer_ptrs);

    let instance = unsafe { entry.create_instance(&instance_info, None) }
        .map_err(|e| init_error("Failed to create Vulkan instance", e))?;

    let debug_instance = debug_utils_enabled.then(|| ash::ext::debug_utils::Instance::new(&entry, &instance));
    let messenger = match &debug_instance {
        Some(loader) if validation => create_messenger(loader),
        _ => vk::DebugUtilsMessengerEXT::null(),
    };

    let mut extension_names: Vec<String> = instance_extensions
        .iter()
        .map(|name| name.to_string_lossy().into_owned())
        .collect();

    match create_device(desc, &instance) {
        Ok((candidate, device, capabilities)) => {
            extension_names.extend(
                candidate
                    .extensions
                    .iter()
                    .map(|name| name.to_string_lossy().into_owned()),
            );
            finish_context(
                entry,
                instance,
                candidate,
                device,
                capabilities,
                debug_instance.map(|instance_loader| (instance_loader, messenger)),
                extension_names,
            )
        }
        Err(e) => {
            unsafe {
                if let Some(loader) = &debug_instance {
                    if messenger != vk::DebugUtilsMessengerEXT::null() {
                        loader.destroy_debug_utils_messenger(messenger, None);
                    }
                }
                instance.destroy_instance(None);
            }
            Err(e)
        }
    }
}

#[cfg(feature = "vulkan-validation")]
fn validation_requested(desc: &RenderSystemDescriptor, entry: &ash::Entry) -> bool {
    if !desc.vulkan.enable_validation {
        return false;
    }
    let available = unsafe { entry.enumerate_instance_layer_properties() }.unwrap_or_default();
    let found = available
        .iter()
        .any(|p| p.layer_name_as_c_str() == Ok(VALIDATION_LAYER));
    if !found {
        lumen_warn!(SOURCE, "Validation requested but {:?} is not installed", VALIDATION_LAYER);
    }
    found
}

#[cfg(not(feature = "vulkan-validation"))]
fn validation_requested(desc: &RenderSystemDescriptor, _entry: &ash::Entry) -> bool {
    if desc.vulkan.enable_validation {
        lumen_debug!(SOURCE, "Validation requested but built without the vulkan-validation feature");
    }
    false
}

#[cfg(feature = "vulkan-validation")]
fn create_messenger(loader: &ash::ext::debug_utils::Instance) -> vk::DebugUtilsMessengerEXT {
    match crate::debug::create_messenger(loader) {
        Ok(messenger) => messenger,
        Err(e) => {
            lumen_warn!(SOURCE, "Failed to create debug messenger: {:?}", e);
            vk::DebugUtilsMessengerEXT::null()
        }
    }
}

#[cfg(not(feature = "vulkan-validation"))]
fn create_messenger(_loader: &ash::ext::debug_utils::Instance) -> vk::DebugUtilsMessengerEXT {
    vk::DebugUtilsMessengerEXT::null()
}

/// User layers that are installed, plus the validation layer when enabled
fn enabled_layers(desc: &RenderSystemDescriptor, entry: &ash::Entry, validation: bool) -> Vec<CString> {
    let available = unsafe { entry.enumerate_instance_layer_properties() }.unwrap_or_default();
    let mut layers = Vec::new();

    for name in &desc.vulkan.enabled_layers {
        let installed = available
            .iter()
            .any(|p| p.layer_name_as_c_str().map(|n| n.to_bytes() == name.as_bytes()).unwrap_or(false));
        match CString::new(name.as_str()) {
            Ok(layer) if installed => layers.push(layer),
            _ => lumen_warn!(SOURCE, "Instance layer '{}' is not available, skipping", name),
        }
    }

    #[cfg(feature = "vulkan-validation")]
    if validation && !layers.iter().any(|l| l.as_c_str() == VALIDATION_LAYER) {
        layers.push(VALIDATION_LAYER.to_owned());
    }
    #[cfg(not(feature = "vulkan-validation"))]
    let _ = validation;

    layers
}

// ============================================================================
// PHYSICAL DEVICE
// ============================================================================

/// Check queue and extension requirements of one physical device
fn inspect_device(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> Option<Candidate> {
    unsafe {
        let queue_family = instance
            .get_physical_device_queue_family_properties(physical_device)
            .iter()
            .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))?
            as u32;

        let available = instance
            .enumerate_device_extension_properties(physical_device)
            .ok()?;
        let has_extension = |name: &CStr| {
            available
                .iter()
                .any(|p| p.extension_name_as_c_str() == Ok(name))
        };
        if !has_extension(ash::khr::swapchain::NAME) {
            return None;
        }

        let mut extensions = vec![ash::khr::swapchain::NAME.to_owned()];
        for optional in [
            ash::khr::portability_subset::NAME,
            ash::khr::sampler_mirror_clamp_to_edge::NAME,
        ] {
            if has_extension(optional) {
                extensions.push(optional.to_owned());
            }
        }

        Some(Candidate {
            physical_device,
            queue_family,
            properties: instance.get_physical_device_properties(physical_device),
            extensions,
        })
    }
}

/// Pick the physical device: custom handle, then discrete GPU, then first suitable
fn select_physical_device(desc: &RenderSystemDescriptor, instance: &ash::Instance) -> Result<Candidate> {
    let devices = unsafe { instance.enumerate_physical_devices() }
        .map_err(|e| init_error("Failed to enumerate physical devices", e))?;

    if let Some(raw) = desc.vulkan.custom_physical_device {
        let device = devices
            .iter()
            .copied()
            .find(|d| d.as_raw() == raw)
            .ok_or_else(|| init_error("Custom physical device not found", raw))?;
        return inspect_device(instance, device)
            .ok_or_else(|| init_error("Custom physical device lacks graphics queue or VK_KHR_swapchain", raw));
    }

    let mut candidates: Vec<Candidate> = devices
        .iter()
        .filter_map(|&d| inspect_device(instance, d))
        .collect();

    if candidates.is_empty() {
        return Err(init_error("No suitable physical device", devices.len()));
    }

    let index = if desc.flags.contains(RenderSystemFlags::PREFER_DISCRETE_GPU) {
        candidates
            .iter()
            .position(|c| c.properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU)
            .unwrap_or(0)
    } else {
        0
    };
    Ok(candidates.swap_remove(index))
}

// ============================================================================
// LOGICAL DEVICE
// ============================================================================

fn create_device(
    desc: &RenderSystemDescriptor,
    instance: &ash::Instance,
) -> Result<(Candidate, ash::Device, DeviceCapabilities)> {
    let candidate = select_physical_device(desc, instance)?;
    let supported = unsafe { instance.get_physical_device_features(candidate.physical_device) };

    let enabled = vk::PhysicalDeviceFeatures {
        sampler_anisotropy: supported.sampler_anisotropy,
        fill_mode_non_solid: supported.fill_mode_non_solid,
        depth_clamp: supported.depth_clamp,
        geometry_shader: supported.geometry_shader,
        tessellation_shader: supported.tessellation_shader,
        pipeline_statistics_query: supported.pipeline_statistics_query,
        occlusion_query_precise: supported.occlusion_query_precise,
        wide_lines: supported.wide_lines,
        independent_blend: supported.independent_blend,
        image_cube_array: supported.image_cube_array,
        ..Default::default()
    };

    let capabilities = DeviceCapabilities {
        sampler_anisotropy: supported.sampler_anisotropy == vk::TRUE,
        pipeline_statistics: supported.pipeline_statistics_query == vk::TRUE,
        occlusion_query_precise: supported.occlusion_query_precise == vk::TRUE,
        mirror_clamp_to_edge: candidate
            .extensions
            .iter()
            .any(|e| e.as_c_str() == ash::khr::sampler_mirror_clamp_to_edge::NAME),
        depth_clamp: supported.depth_clamp == vk::TRUE,
        fill_mode_non_solid: supported.fill_mode_non_solid == vk::TRUE,
        wide_lines: supported.wide_lines == vk::TRUE,
    };

    let priorities = [1.0f32];
    let queue_infos = [vk::DeviceQueueCreateInfo::default()
        .queue_family_index(candidate.queue_family)
        .queue_priorities(&priorities)];
    let extension_ptrs: Vec<*const std::ffi::c_char> =
        candidate.extensions.iter().map(|name| name.as_ptr()).collect();

    let device_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_infos)
        .enabled_extension_names(&extension_ptrs)
        .enabled_features(&enabled);

    let device = unsafe { instance.create_device(candidate.physical_device, &device_info, None) }
        .map_err(|e| init_error("Failed to create logical device", e))?;

    Ok((candidate, device, capabilities))
}

fn finish_context(
    entry: ash::Entry,
    instance: ash::Instance,
    candidate: Candidate,
    device: ash::Device,
    capabilities: DeviceCapabilities,
    debug: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    extension_names: Vec<String>,
) -> Result<DeviceSetup> {
    let allocator = Allocator::new(&AllocatorCreateDesc {
        instance: instance.clone(),
        device: device.clone(),
        physical_device: candidate.physical_device,
        debug_settings: Default::default(),
        buffer_device_address: false,
        allocation_sizes: Default::default(),
    });
    let allocator = match allocator {
        Ok(allocator) => allocator,
        Err(e) => {
            unsafe { device.destroy_device(None) };
            return Err(init_error("Failed to create GPU allocator", e));
        }
    };

    let pool_info = vk::CommandPoolCreateInfo::default()
        .queue_family_index(candidate.queue_family)
        .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
    let upload_command_pool = match unsafe { device.create_command_pool(&pool_info, None) } {
        Ok(pool) => pool,
        Err(e) => {
            drop(allocator);
            unsafe { device.destroy_device(None) };
            return Err(init_error("Failed to create upload command pool", e));
        }
    };

    let queue = unsafe { device.get_device_queue(candidate.queue_family, 0) };
    let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
    let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);
    let debug_utils = debug.map(|(instance_loader, messenger)| DebugUtils {
        instance: instance_loader,
        device: ash::ext::debug_utils::Device::new(&instance, &device),
        messenger,
    });

    let default_depth_format = [Format::D24UnormS8Uint, Format::D32FloatS8X24Uint]
        .into_iter()
        .find(|&format| {
            let props = unsafe {
                instance.get_physical_device_format_properties(candidate.physical_device, format_to_vk(format))
            };
            props
                .optimal_tiling_features
                .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
        })
        .unwrap_or(Format::D32FloatS8X24Uint);

    let limits = map_limits(&instance, &candidate);
    let info = renderer_info(&candidate.properties, extension_names);

    lumen_info!(
        SOURCE,
        "Vulkan device: {} ({}), {}",
        info.device_name,
        info.vendor_name,
        info.renderer_name
    );

    let context = GpuContext {
        _entry: entry,
        instance,
        physical_device: candidate.physical_device,
        device,
        allocator: ManuallyDrop::new(Mutex::new(allocator)),
        queue: Mutex::new(queue),
        queue_family: candidate.queue_family,
        upload_command_pool: Mutex::new(upload_command_pool),
        surface_loader,
        swapchain_loader,
        properties: candidate.properties,
        capabilities,
        default_depth_format,
        debug_utils,
    };

    Ok(DeviceSetup {
        context: Arc::new(context),
        info,
        limits,
    })
}

// ============================================================================
// INFO AND LIMITS
// ============================================================================

pub(crate) fn vendor_name(vendor_id: u32) -> &'static str {
    match vendor_id {
        0x1002 => "Advanced Micro Devices, Inc.",
        0x10DE => "NVIDIA Corporation",
        0x8086 => "Intel Corporation",
        0x13B5 => "ARM",
        0x5143 => "Qualcomm",
        0x106B => "Apple Inc.",
        _ => "Unknown",
    }
}

fn renderer_info(properties: &vk::PhysicalDeviceProperties, extension_names: Vec<String>) -> RendererInfo {
    let version = properties.api_version;
    RendererInfo {
        renderer_name: format!(
            "Vulkan {}.{}.{}",
            vk::api_version_major(version),
            vk::api_version_minor(version),
            vk::api_version_patch(version)
        ),
        device_name: properties
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        vendor_name: vendor_name(properties.vendor_id).to_string(),
        shading_language_name: "SPIR-V".to_string(),
        extension_names,
    }
}

fn map_limits(instance: &ash::Instance, candidate: &Candidate) -> RenderingLimits {
    let limits = &candidate.properties.limits;

    let max_buffer_size = if candidate.properties.api_version >= vk::API_VERSION_1_1 {
        let mut maintenance3 = vk::PhysicalDeviceMaintenance3Properties::default();
        {
            let mut properties2 = vk::PhysicalDeviceProperties2::default().push_next(&mut maintenance3);
            unsafe { instance.get_physical_device_properties2(candidate.physical_device, &mut properties2) };
        }
        maintenance3.max_memory_allocation_size
    } else {
        u32::MAX as u64
    };

    RenderingLimits {
        max_color_buffer_samples: max_sample_count(limits.framebuffer_color_sample_counts),
        max_texture_1d_size: limits.max_image_dimension1_d,
        max_texture_2d_size: limits.max_image_dimension2_d,
        max_texture_3d_size: limits.max_image_dimension3_d,
        max_texture_cube_size: limits.max_image_dimension_cube,
        max_texture_array_layers: limits.max_image_array_layers,
        max_color_attachments: limits.max_color_attachments,
        max_viewports: limits.max_viewports,
        max_buffer_size,
        max_constant_buffer_size: limits.max_uniform_buffer_range as u64,
        max_push_constant_size: limits.max_push_constants_size,
        max_anisotropy: limits.max_sampler_anisotropy,
        max_compute_work_group_count: limits.max_compute_work_group_count,
        min_constant_buffer_alignment: limits.min_uniform_buffer_offset_alignment,
    }
}

#[cfg(test)]
#[path = "vulkan_device_tests.rs"]
mod tests;
