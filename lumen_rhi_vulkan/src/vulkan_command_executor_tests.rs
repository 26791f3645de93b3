use super::*;

fn pool_size(ty: vk::DescriptorType, descriptor_count: u32) -> vk::DescriptorPoolSize {
    vk::DescriptorPoolSize { ty, descriptor_count }
}

#[test]
fn test_merge_pool_sizes_adds_same_type() {
    let mut total = vec![pool_size(vk::DescriptorType::UNIFORM_BUFFER, 2)];
    merge_pool_sizes(
        &mut total,
        &[
            pool_size(vk::DescriptorType::UNIFORM_BUFFER, 3),
            pool_size(vk::DescriptorType::SAMPLER, 1),
        ],
    );
    assert_eq!(total.len(), 2);
    assert_eq!(total[0].ty, vk::DescriptorType::UNIFORM_BUFFER);
    assert_eq!(total[0].descriptor_count, 5);
    assert_eq!(total[1].ty, vk::DescriptorType::SAMPLER);
    assert_eq!(total[1].descriptor_count, 1);
}

#[test]
fn test_merge_into_empty_totals() {
    let mut total = Vec::new();
    merge_pool_sizes(&mut total, &[pool_size(vk::DescriptorType::STORAGE_IMAGE, 4)]);
    merge_pool_sizes(&mut total, &[pool_size(vk::DescriptorType::STORAGE_IMAGE, 4)]);
    assert_eq!(total.len(), 1);
    assert_eq!(total[0].descriptor_count, 8);
}

#[test]
fn test_region_volume_counts_folded_units() {
    let region = ImageRegion {
        mip_level: 0,
        base_array_layer: 0,
        layer_count: 2,
        offset: vk::Offset3D::default(),
        extent: vk::Extent3D { width: 16, height: 8, depth: 1 },
        folded_units: [4, 2, 2],
    };
    assert_eq!(region_volume(&region), 16);
}

#[test]
fn test_bound_state_starts_empty() {
    let state = BoundState::default();
    assert!(state.pipeline.is_none());
    assert!(state.framebuffer.is_none());
    assert!(!state.dynamic_dirty);
    assert_eq!(state.dynamic_sets, 0);
}
