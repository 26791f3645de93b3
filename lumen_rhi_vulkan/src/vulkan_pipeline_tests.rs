use super::*;
use lumen_rhi::lumen::format::Format;
use lumen_rhi::lumen::render::{SamplerDescriptor, StageFlags, StaticSamplerDescriptor};

fn binding(resource_type: ResourceType, bind_flags: BindFlags, slot: u32) -> BindingDescriptor {
    BindingDescriptor::new(resource_type, bind_flags, StageFlags::FRAGMENT, slot)
}

fn attribute(name: &str, location: u32, slot: u32, stride: u32, divisor: u32) -> VertexAttribute {
    VertexAttribute {
        name: name.to_string(),
        format: Format::Rgba32Float,
        location,
        offset: 0,
        stride,
        slot,
        instance_divisor: divisor,
    }
}

#[test]
fn test_descriptor_type_follows_bind_flags() {
    assert_eq!(
        descriptor_type(&binding(ResourceType::Buffer, BindFlags::CONSTANT_BUFFER, 0)),
        vk::DescriptorType::UNIFORM_BUFFER
    );
    assert_eq!(
        descriptor_type(&binding(ResourceType::Buffer, BindFlags::STORAGE, 0)),
        vk::DescriptorType::STORAGE_BUFFER
    );
    assert_eq!(
        descriptor_type(&binding(ResourceType::Texture, BindFlags::SAMPLED, 0)),
        vk::DescriptorType::SAMPLED_IMAGE
    );
    assert_eq!(
        descriptor_type(&binding(ResourceType::Texture, BindFlags::STORAGE, 0)),
        vk::DescriptorType::STORAGE_IMAGE
    );
    assert_eq!(
        descriptor_type(&binding(ResourceType::Sampler, BindFlags::empty(), 0)),
        vk::DescriptorType::SAMPLER
    );
}

#[test]
fn test_dynamic_set_appends_static_samplers() {
    let desc = PipelineLayoutDescriptor {
        bindings: vec![binding(ResourceType::Texture, BindFlags::SAMPLED, 0)],
        static_samplers: vec![StaticSamplerDescriptor {
            name: "linear".to_string(),
            stage_flags: StageFlags::empty(),
            slot: 3,
            sampler: SamplerDescriptor::default(),
        }],
        ..Default::default()
    };
    let entries = dynamic_set_entries(&desc).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].slot, 3);
    assert_eq!(entries[1].static_sampler, Some(0));
    assert_eq!(entries[1].stages, vk::ShaderStageFlags::ALL);
    assert_eq!(entries[0].stages, vk::ShaderStageFlags::FRAGMENT);
}

#[test]
fn test_duplicate_slots_are_rejected() {
    let desc = PipelineLayoutDescriptor {
        heap_bindings: vec![
            binding(ResourceType::Buffer, BindFlags::CONSTANT_BUFFER, 1),
            binding(ResourceType::Texture, BindFlags::SAMPLED, 1),
        ],
        ..Default::default()
    };
    assert!(heap_set_entries(&desc).is_err());

    // The same slot in different sets is fine
    let desc = PipelineLayoutDescriptor {
        heap_bindings: vec![binding(ResourceType::Buffer, BindFlags::CONSTANT_BUFFER, 1)],
        bindings: vec![binding(ResourceType::Texture, BindFlags::SAMPLED, 1)],
        ..Default::default()
    };
    assert!(heap_set_entries(&desc).is_ok());
    assert!(dynamic_set_entries(&desc).is_ok());
}

#[test]
fn test_pool_sizes_merge_types_and_scale_by_sets() {
    let mut array = binding(ResourceType::Texture, BindFlags::SAMPLED, 2);
    array.array_size = 4;
    let desc = PipelineLayoutDescriptor {
        heap_bindings: vec![
            binding(ResourceType::Buffer, BindFlags::CONSTANT_BUFFER, 0),
            binding(ResourceType::Buffer, BindFlags::CONSTANT_BUFFER, 1),
            array,
        ],
        ..Default::default()
    };
    let sizes = pool_sizes(&heap_set_entries(&desc).unwrap(), 3);
    assert_eq!(sizes.len(), 2);
    let uniform = sizes.iter().find(|s| s.ty == vk::DescriptorType::UNIFORM_BUFFER).unwrap();
    assert_eq!(uniform.descriptor_count, 6);
    let sampled = sizes.iter().find(|s| s.ty == vk::DescriptorType::SAMPLED_IMAGE).unwrap();
    assert_eq!(sampled.descriptor_count, 12);
}

#[test]
fn test_vertex_input_groups_attributes_by_slot() {
    let mut report = Report::new();
    let attributes = [
        attribute("position", 0, 0, 32, 0),
        attribute("normal", 1, 0, 32, 0),
        attribute("offset", 2, 1, 16, 1),
    ];
    let (bindings, attrs) = vertex_input(&attributes, &mut report);
    assert!(!report.has_errors());
    assert_eq!(bindings.len(), 2);
    assert_eq!(bindings[0].stride, 32);
    assert_eq!(bindings[0].input_rate, vk::VertexInputRate::VERTEX);
    assert_eq!(bindings[1].input_rate, vk::VertexInputRate::INSTANCE);
    assert_eq!(attrs.len(), 3);
    assert_eq!(attrs[2].binding, 1);
}

#[test]
fn test_vertex_input_reports_conflicting_strides() {
    let mut report = Report::new();
    let attributes = [attribute("a", 0, 0, 32, 0), attribute("b", 1, 0, 16, 0)];
    vertex_input(&attributes, &mut report);
    assert!(report.has_errors());
}

#[test]
fn test_vertex_input_warns_on_instance_divisor() {
    let mut report = Report::new();
    vertex_input(&[attribute("a", 0, 0, 16, 4)], &mut report);
    assert!(!report.has_errors());
    assert!(report.text().contains("divisor"));
}

#[test]
fn test_dynamic_states() {
    let mut desc = GraphicsPipelineDescriptor::default();
    assert_eq!(dynamic_states(&desc), vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR]);
    desc.blend.blend_factor_dynamic = true;
    desc.stencil.reference_dynamic = true;
    let states = dynamic_states(&desc);
    assert!(states.contains(&vk::DynamicState::BLEND_CONSTANTS));
    assert!(states.contains(&vk::DynamicState::STENCIL_REFERENCE));
}
