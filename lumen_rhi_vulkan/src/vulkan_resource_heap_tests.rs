use super::*;

fn buffer(bind_flags: BindFlags) -> BoundResource {
    BoundResource::Buffer {
        buffer: vk::Buffer::null(),
        bind_flags,
    }
}

fn image(bind_flags: BindFlags) -> BoundResource {
    BoundResource::Image {
        view: vk::ImageView::null(),
        layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        bind_flags,
    }
}

#[test]
fn test_check_descriptor_accepts_matching_resources() {
    assert!(check_descriptor(vk::DescriptorType::UNIFORM_BUFFER, &buffer(BindFlags::CONSTANT_BUFFER)).is_ok());
    assert!(check_descriptor(vk::DescriptorType::STORAGE_BUFFER, &buffer(BindFlags::STORAGE)).is_ok());
    assert!(check_descriptor(vk::DescriptorType::SAMPLED_IMAGE, &image(BindFlags::SAMPLED)).is_ok());
    assert!(check_descriptor(vk::DescriptorType::STORAGE_IMAGE, &image(BindFlags::STORAGE)).is_ok());
    assert!(check_descriptor(vk::DescriptorType::SAMPLER, &BoundResource::Sampler(vk::Sampler::null())).is_ok());
}

#[test]
fn test_check_descriptor_rejects_missing_bind_flags() {
    assert!(check_descriptor(vk::DescriptorType::UNIFORM_BUFFER, &buffer(BindFlags::VERTEX_BUFFER)).is_err());
    assert!(check_descriptor(vk::DescriptorType::STORAGE_IMAGE, &image(BindFlags::SAMPLED)).is_err());
}

#[test]
fn test_check_descriptor_rejects_wrong_resource_kind() {
    assert!(check_descriptor(vk::DescriptorType::SAMPLED_IMAGE, &buffer(BindFlags::SAMPLED)).is_err());
    assert!(check_descriptor(vk::DescriptorType::SAMPLER, &image(BindFlags::SAMPLED)).is_err());
}

#[test]
fn test_descriptor_writer_batches_writes() {
    let entry = SetEntry {
        slot: 2,
        descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
        count: 1,
        stages: vk::ShaderStageFlags::ALL,
        static_sampler: None,
    };
    let mut writer = DescriptorWriter::new();
    assert!(writer.is_empty());
    writer.push(vk::DescriptorSet::null(), &entry, &buffer(BindFlags::CONSTANT_BUFFER)).unwrap();
    assert!(!writer.is_empty());
    assert!(writer.push(vk::DescriptorSet::null(), &entry, &image(BindFlags::SAMPLED)).is_err());
    assert_eq!(writer.pending.len(), 1);
}

#[test]
fn test_record_buffer_views_tracks_overwrites() {
    let mut buffers: lumen_rhi::lumen::render::HwObjectContainer<BufferHandle, ()> =
        lumen_rhi::lumen::render::HwObjectContainer::new("buffer");
    let first = buffers.insert(());
    let second = buffers.insert(());
    let mut slots = vec![None; 4];

    record_buffer_views(&mut slots, 0, &[ResourceViewDescriptor::Buffer(first), ResourceViewDescriptor::Buffer(second)]);
    assert_eq!(slots, vec![Some(first), Some(second), None, None]);

    // A non-buffer view clears the slot
    let sampler = lumen_rhi::lumen::render::SamplerHandle::default();
    record_buffer_views(&mut slots, 1, &[ResourceViewDescriptor::Sampler(sampler), ResourceViewDescriptor::Buffer(first)]);
    assert_eq!(slots, vec![Some(first), None, Some(first), None]);
}
