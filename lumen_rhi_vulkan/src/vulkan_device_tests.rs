use super::*;

#[test]
fn test_vendor_names() {
    assert_eq!(vendor_name(0x10DE), "NVIDIA Corporation");
    assert_eq!(vendor_name(0x1002), "Advanced Micro Devices, Inc.");
    assert_eq!(vendor_name(0x8086), "Intel Corporation");
    assert_eq!(vendor_name(0xFFFF), "Unknown");
}

#[test]
fn test_renderer_info_from_properties() {
    let mut properties = vk::PhysicalDeviceProperties {
        api_version: vk::make_api_version(0, 1, 3, 250),
        vendor_id: 0x13B5,
        ..Default::default()
    };
    for (dst, src) in properties.device_name.iter_mut().zip(b"Test GPU\0") {
        *dst = *src as std::ffi::c_char;
    }

    let info = renderer_info(&properties, vec!["VK_KHR_surface".to_string()]);
    assert_eq!(info.renderer_name, "Vulkan 1.3.250");
    assert_eq!(info.device_name, "Test GPU");
    assert_eq!(info.vendor_name, "ARM");
    assert_eq!(info.shading_language_name, "SPIR-V");
    assert_eq!(info.extension_names, vec!["VK_KHR_surface".to_string()]);
}

#[test]
fn test_surface_extensions_include_core_surface() {
    assert_eq!(SURFACE_EXTENSIONS[0], ash::khr::surface::NAME);
}
