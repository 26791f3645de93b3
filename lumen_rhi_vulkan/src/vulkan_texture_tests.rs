use super::*;

#[test]
fn test_resting_layout_prefers_storage_then_sampling() {
    assert_eq!(
        resting_layout(Format::Rgba8Unorm, BindFlags::STORAGE | BindFlags::SAMPLED),
        vk::ImageLayout::GENERAL
    );
    assert_eq!(
        resting_layout(Format::Rgba8Unorm, BindFlags::SAMPLED | BindFlags::COLOR_ATTACHMENT),
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
    );
    assert_eq!(
        resting_layout(Format::Rgba8Unorm, BindFlags::COLOR_ATTACHMENT),
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
    );
    assert_eq!(
        resting_layout(Format::D32Float, BindFlags::DEPTH_STENCIL_ATTACHMENT),
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
    );
    assert_eq!(resting_layout(Format::Rgba8Unorm, BindFlags::COPY_DST), vk::ImageLayout::GENERAL);
}

#[test]
fn test_attachment_layout() {
    assert_eq!(attachment_layout(Format::Bgra8Unorm), vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    assert_eq!(
        attachment_layout(Format::D24UnormS8Uint),
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
    );
}

#[test]
fn test_image_usage() {
    let usage = image_usage(BindFlags::SAMPLED | BindFlags::COLOR_ATTACHMENT);
    assert!(usage.contains(vk::ImageUsageFlags::SAMPLED));
    assert!(usage.contains(vk::ImageUsageFlags::COLOR_ATTACHMENT));
    assert!(usage.contains(vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST));
    assert!(!usage.contains(vk::ImageUsageFlags::STORAGE));
}

#[test]
fn test_vk_extent_drops_layer_dimension() {
    let extent = Extent3D::new(64, 4, 1);
    assert_eq!(
        vk_extent(TextureType::Texture1DArray, extent),
        vk::Extent3D { width: 64, height: 1, depth: 1 }
    );
    assert_eq!(
        vk_extent(TextureType::Texture2DArray, Extent3D::new(32, 16, 1)),
        vk::Extent3D { width: 32, height: 16, depth: 1 }
    );
    assert_eq!(
        vk_extent(TextureType::Texture3D, Extent3D::new(8, 8, 8)),
        vk::Extent3D { width: 8, height: 8, depth: 8 }
    );
}

#[test]
fn test_buffer_image_copy_fields() {
    let region = ImageRegion {
        mip_level: 2,
        base_array_layer: 1,
        layer_count: 3,
        offset: vk::Offset3D { x: 4, y: 8, z: 0 },
        extent: vk::Extent3D { width: 16, height: 16, depth: 1 },
        folded_units: [16, 16, 3],
    };
    let layout = BufferLayout {
        row_length: 32,
        image_height: 16,
        size: 0,
    };
    let copy = buffer_image_copy(256, vk::ImageAspectFlags::COLOR, &region, &layout);
    assert_eq!(copy.buffer_offset, 256);
    assert_eq!(copy.buffer_row_length, 32);
    assert_eq!(copy.buffer_image_height, 16);
    assert_eq!(copy.image_subresource.mip_level, 2);
    assert_eq!(copy.image_subresource.base_array_layer, 1);
    assert_eq!(copy.image_subresource.layer_count, 3);
    assert_eq!(copy.image_offset.x, 4);
    assert_eq!(copy.image_extent.width, 16);
}

#[test]
fn test_extent_to_offset() {
    let offset = extent_to_offset(vk::Extent3D { width: 5, height: 6, depth: 7 });
    assert_eq!((offset.x, offset.y, offset.z), (5, 6, 7));
}
