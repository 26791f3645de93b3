use super::*;

fn caps(current: vk::Extent2D, min_images: u32, max_images: u32) -> vk::SurfaceCapabilitiesKHR {
    vk::SurfaceCapabilitiesKHR {
        min_image_count: min_images,
        max_image_count: max_images,
        current_extent: current,
        min_image_extent: vk::Extent2D { width: 16, height: 16 },
        max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
        ..Default::default()
    }
}

fn surface_format(format: vk::Format) -> vk::SurfaceFormatKHR {
    vk::SurfaceFormatKHR {
        format,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    }
}

#[test]
fn test_surface_format_prefers_bgra() {
    let formats = [
        surface_format(vk::Format::R8G8B8A8_UNORM),
        surface_format(vk::Format::B8G8R8A8_UNORM),
    ];
    let (chosen, format) = choose_surface_format(&formats).unwrap();
    assert_eq!(chosen.format, vk::Format::B8G8R8A8_UNORM);
    assert_eq!(format, Format::Bgra8Unorm);
}

#[test]
fn test_surface_format_falls_back_to_rgba() {
    let formats = [
        surface_format(vk::Format::B8G8R8A8_SRGB),
        surface_format(vk::Format::R8G8B8A8_UNORM),
    ];
    let (_, format) = choose_surface_format(&formats).unwrap();
    assert_eq!(format, Format::Rgba8Unorm);
    assert!(choose_surface_format(&[surface_format(vk::Format::A2B10G10R10_UNORM_PACK32)]).is_none());
}

#[test]
fn test_present_mode_for_vsync_interval() {
    let all = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE];
    assert_eq!(choose_present_mode(0, &all), Some(vk::PresentModeKHR::IMMEDIATE));
    assert_eq!(
        choose_present_mode(0, &[vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX]),
        Some(vk::PresentModeKHR::MAILBOX)
    );
    assert_eq!(choose_present_mode(0, &[vk::PresentModeKHR::FIFO]), None);
    assert_eq!(choose_present_mode(1, &[vk::PresentModeKHR::FIFO]), Some(vk::PresentModeKHR::FIFO));
    assert_eq!(choose_present_mode(2, &all), None);
}

#[test]
fn test_extent_follows_surface_when_fixed() {
    let fixed = caps(vk::Extent2D { width: 800, height: 600 }, 2, 3);
    assert_eq!(choose_extent(&fixed, Extent2D::new(1024, 768)), vk::Extent2D { width: 800, height: 600 });

    let free = caps(vk::Extent2D { width: u32::MAX, height: u32::MAX }, 2, 3);
    assert_eq!(choose_extent(&free, Extent2D::new(1024, 8)), vk::Extent2D { width: 1024, height: 16 });
}

#[test]
fn test_image_count_respects_surface_bounds() {
    let extent = vk::Extent2D { width: 1, height: 1 };
    assert_eq!(choose_image_count(&caps(extent, 2, 3), 1), 2);
    assert_eq!(choose_image_count(&caps(extent, 2, 3), 3), 3);
    assert_eq!(choose_image_count(&caps(extent, 2, 2), 3), 2);
    assert_eq!(choose_image_count(&caps(extent, 1, 0), 3), 3);
}
