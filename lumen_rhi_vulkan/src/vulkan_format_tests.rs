//! Unit tests for the Vulkan conversion tables
//!
//! Pure mappings, no GPU required.

use super::*;

const FORMATS: &[Format] = &[
    Format::R8Unorm,
    Format::R8Snorm,
    Format::R8Uint,
    Format::R8Sint,
    Format::Rg8Unorm,
    Format::Rgba8Unorm,
    Format::Rgba8UnormSrgb,
    Format::Rgba8Snorm,
    Format::Rgba8Uint,
    Format::Rgba8Sint,
    Format::Bgra8Unorm,
    Format::Bgra8UnormSrgb,
    Format::R16Unorm,
    Format::R16Uint,
    Format::R16Float,
    Format::Rg16Float,
    Format::Rgba16Unorm,
    Format::Rgba16Float,
    Format::R32Uint,
    Format::R32Sint,
    Format::R32Float,
    Format::Rg32Float,
    Format::Rgb32Float,
    Format::Rgba32Uint,
    Format::Rgba32Float,
    Format::Rgb10A2Unorm,
    Format::Rg11B10Float,
    Format::D16Unorm,
    Format::D24UnormS8Uint,
    Format::D32Float,
    Format::D32FloatS8X24Uint,
    Format::Bc1Unorm,
    Format::Bc1UnormSrgb,
    Format::Bc2Unorm,
    Format::Bc3Unorm,
    Format::Bc4Unorm,
    Format::Bc5Unorm,
];

// ============================================================================
// FORMATS
// ============================================================================

#[test]
fn test_every_format_maps_back_to_itself() {
    for &format in FORMATS {
        let vk_format = format_to_vk(format);
        assert_ne!(vk_format, vk::Format::UNDEFINED, "{:?}", format);
        assert_eq!(vk_to_format(vk_format), Some(format));
    }
}

#[test]
fn test_undefined_and_foreign_formats() {
    assert_eq!(format_to_vk(Format::Undefined), vk::Format::UNDEFINED);
    assert_eq!(vk_to_format(vk::Format::UNDEFINED), None);
    assert_eq!(vk_to_format(vk::Format::R4G4_UNORM_PACK8), None);
}

#[test]
fn test_packed_and_compressed_format_names() {
    assert_eq!(format_to_vk(Format::Rgb10A2Unorm), vk::Format::A2B10G10R10_UNORM_PACK32);
    assert_eq!(format_to_vk(Format::Rg11B10Float), vk::Format::B10G11R11_UFLOAT_PACK32);
    assert_eq!(format_to_vk(Format::Bc1Unorm), vk::Format::BC1_RGBA_UNORM_BLOCK);
    assert_eq!(format_to_vk(Format::D32FloatS8X24Uint), vk::Format::D32_SFLOAT_S8_UINT);
}

#[test]
fn test_aspect_flags() {
    assert_eq!(aspect_flags(Format::Rgba8Unorm), vk::ImageAspectFlags::COLOR);
    assert_eq!(aspect_flags(Format::D32Float), vk::ImageAspectFlags::DEPTH);
    assert_eq!(
        aspect_flags(Format::D24UnormS8Uint),
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    );
}

#[test]
fn test_index_type() {
    assert_eq!(index_type(Format::R16Uint), vk::IndexType::UINT16);
    assert_eq!(index_type(Format::R32Uint), vk::IndexType::UINT32);
}

// ============================================================================
// TEXTURES AND SAMPLES
// ============================================================================

#[test]
fn test_texture_types() {
    assert_eq!(
        texture_type_to_vk(TextureType::TextureCube),
        (vk::ImageType::TYPE_2D, vk::ImageViewType::CUBE)
    );
    assert_eq!(
        texture_type_to_vk(TextureType::Texture1DArray),
        (vk::ImageType::TYPE_1D, vk::ImageViewType::TYPE_1D_ARRAY)
    );
    assert_eq!(
        texture_type_to_vk(TextureType::Texture3D),
        (vk::ImageType::TYPE_3D, vk::ImageViewType::TYPE_3D)
    );
    assert_eq!(
        texture_type_to_vk(TextureType::Texture2DMSArray),
        (vk::ImageType::TYPE_2D, vk::ImageViewType::TYPE_2D_ARRAY)
    );
}

#[test]
fn test_sample_counts() {
    assert_eq!(sample_count_to_vk(1), vk::SampleCountFlags::TYPE_1);
    assert_eq!(sample_count_to_vk(4), vk::SampleCountFlags::TYPE_4);
    assert_eq!(sample_count_to_vk(3), vk::SampleCountFlags::TYPE_1);

    let mask = vk::SampleCountFlags::TYPE_1 | vk::SampleCountFlags::TYPE_2 | vk::SampleCountFlags::TYPE_8;
    assert_eq!(max_sample_count(mask), 8);
    assert_eq!(max_sample_count(vk::SampleCountFlags::empty()), 1);
}

// ============================================================================
// STATE ENUMS
// ============================================================================

#[test]
fn test_sampler_state() {
    assert_eq!(address_mode_to_vk(SamplerAddressMode::Mirror), vk::SamplerAddressMode::MIRRORED_REPEAT);
    assert_eq!(address_mode_to_vk(SamplerAddressMode::Border), vk::SamplerAddressMode::CLAMP_TO_BORDER);
    assert_eq!(filter_to_vk(SamplerFilter::Nearest), vk::Filter::NEAREST);
    assert_eq!(mipmap_mode_to_vk(SamplerFilter::Linear), vk::SamplerMipmapMode::LINEAR);
    assert_eq!(border_color_to_vk(BorderColor::OpaqueWhite), vk::BorderColor::FLOAT_OPAQUE_WHITE);
    assert_eq!(compare_op_to_vk(CompareOp::LessEqual), vk::CompareOp::LESS_OR_EQUAL);
}

#[test]
fn test_blend_state() {
    assert_eq!(blend_factor_to_vk(BlendFactor::BlendFactor), vk::BlendFactor::CONSTANT_COLOR);
    assert_eq!(blend_factor_to_vk(BlendFactor::InvSrcAlpha), vk::BlendFactor::ONE_MINUS_SRC_ALPHA);
    assert_eq!(blend_op_to_vk(BlendOp::RevSubtract), vk::BlendOp::REVERSE_SUBTRACT);
    assert_eq!(color_mask_to_vk(0xF), vk::ColorComponentFlags::RGBA);
    assert_eq!(color_mask_to_vk(0b0001), vk::ColorComponentFlags::R);
    assert_eq!(color_mask_to_vk(0xFF), vk::ColorComponentFlags::RGBA);
}

#[test]
fn test_rasterizer_state() {
    assert_eq!(polygon_mode_to_vk(PolygonMode::Wireframe), vk::PolygonMode::LINE);
    assert_eq!(cull_mode_to_vk(CullMode::Back), vk::CullModeFlags::BACK);
    assert_eq!(topology_to_vk(PrimitiveTopology::Patches(3)), vk::PrimitiveTopology::PATCH_LIST);
    assert_eq!(stencil_op_to_vk(StencilOp::IncWrap), vk::StencilOp::INCREMENT_AND_WRAP);
}

#[test]
fn test_load_store_ops() {
    assert_eq!(load_op_to_vk(AttachmentLoadOp::Undefined), vk::AttachmentLoadOp::DONT_CARE);
    assert_eq!(load_op_to_vk(AttachmentLoadOp::Clear), vk::AttachmentLoadOp::CLEAR);
    assert_eq!(store_op_to_vk(AttachmentStoreOp::Undefined), vk::AttachmentStoreOp::DONT_CARE);
}

#[test]
fn test_stage_flags() {
    assert_eq!(stage_flags_to_vk(StageFlags::empty()), vk::ShaderStageFlags::empty());
    assert_eq!(
        stage_flags_to_vk(StageFlags::VERTEX | StageFlags::FRAGMENT),
        vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT
    );
    assert_eq!(stage_flags_to_vk(StageFlags::ALL), vk::ShaderStageFlags::ALL_GRAPHICS | vk::ShaderStageFlags::COMPUTE);
    assert_eq!(shader_stage_to_vk(ShaderType::TessControl), vk::ShaderStageFlags::TESSELLATION_CONTROL);
}

#[test]
fn test_scissor_negative_size_is_empty() {
    let rect = scissor_to_vk(&Scissor { x: -4, y: 8, width: -1, height: 16 });
    assert_eq!(rect.offset.x, -4);
    assert_eq!(rect.extent.width, 0);
    assert_eq!(rect.extent.height, 16);
    let viewport = viewport_to_vk(&Viewport::new(0.0, 0.0, 640.0, 480.0));
    assert_eq!(viewport.max_depth, 1.0);
}
