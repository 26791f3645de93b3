/// Conversions between Lumen descriptor enums and their Vulkan counterparts
///
/// Pure functions, no device access. Every Vulkan object creation goes
/// through these tables.

use ash::vk;
use lumen_rhi::lumen::format::Format;
use lumen_rhi::lumen::render::{
    AttachmentLoadOp, AttachmentStoreOp, BlendFactor, BlendOp, BorderColor, CompareOp, CullMode,
    PolygonMode, PrimitiveTopology, SamplerAddressMode, SamplerFilter, Scissor, ShaderType, StageFlags,
    StencilOp, TextureType, Viewport,
};

// ===== FORMATS =====

/// Vulkan format of a Lumen format
pub fn format_to_vk(format: Format) -> vk::Format {
    match format {
        Format::Undefined => vk::Format::UNDEFINED,

        Format::R8Unorm => vk::Format::R8_UNORM,
        Format::R8Snorm => vk::Format::R8_SNORM,
        Format::R8Uint => vk::Format::R8_UINT,
        Format::R8Sint => vk::Format::R8_SINT,
        Format::Rg8Unorm => vk::Format::R8G8_UNORM,
        Format::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
        Format::Rgba8UnormSrgb => vk::Format::R8G8B8A8_SRGB,
        Format::Rgba8Snorm => vk::Format::R8G8B8A8_SNORM,
        Format::Rgba8Uint => vk::Format::R8G8B8A8_UINT,
        Format::Rgba8Sint => vk::Format::R8G8B8A8_SINT,
        Format::Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
        Format::Bgra8UnormSrgb => vk::Format::B8G8R8A8_SRGB,

        Format::R16Unorm => vk::Format::R16_UNORM,
        Format::R16Uint => vk::Format::R16_UINT,
        Format::R16Float => vk::Format::R16_SFLOAT,
        Format::Rg16Float => vk::Format::R16G16_SFLOAT,
        Format::Rgba16Unorm => vk::Format::R16G16B16A16_UNORM,
        Format::Rgba16Float => vk::Format::R16G16B16A16_SFLOAT,

        Format::R32Uint => vk::Format::R32_UINT,
        Format::R32Sint => vk::Format::R32_SINT,
        Format::R32Float => vk::Format::R32_SFLOAT,
        Format::Rg32Float => vk::Format::R32G32_SFLOAT,
        Format::Rgb32Float => vk::Format::R32G32B32_SFLOAT,
        Format::Rgba32Uint => vk::Format::R32G32B32A32_UINT,
        Format::Rgba32Float => vk::Format::R32G32B32A32_SFLOAT,

        Format::Rgb10A2Unorm => vk::Format::A2B10G10R10_UNORM_PACK32,
        Format::Rg11B10Float => vk::Format::B10G11R11_UFLOAT_PACK32,

        Format::D16Unorm => vk::Format::D16_UNORM,
        Format::D24UnormS8Uint => vk::Format::D24_UNORM_S8_UINT,
        Format::D32Float => vk::Format::D32_SFLOAT,
        Format::D32FloatS8X24Uint => vk::Format::D32_SFLOAT_S8_UINT,

        Format::Bc1Unorm => vk::Format::BC1_RGBA_UNORM_BLOCK,
        Format::Bc1UnormSrgb => vk::Format::BC1_RGBA_SRGB_BLOCK,
        Format::Bc2Unorm => vk::Format::BC2_UNORM_BLOCK,
        Format::Bc3Unorm => vk::Format::BC3_UNORM_BLOCK,
        Format::Bc4Unorm => vk::Format::BC4_UNORM_BLOCK,
        Format::Bc5Unorm => vk::Format::BC5_UNORM_BLOCK,
    }
}

/// Lumen format of a Vulkan format, `None` for formats Lumen does not expose
pub fn vk_to_format(format: vk::Format) -> Option<Format> {
    let format = match format {
        vk::Format::R8_UNORM => Format::R8Unorm,
        vk::Format::R8_SNORM => Format::R8Snorm,
        vk::Format::R8_UINT => Format::R8Uint,
        vk::Format::R8_SINT => Format::R8Sint,
        vk::Format::R8G8_UNORM => Format::Rg8Unorm,
        vk::Format::R8G8B8A8_UNORM => Format::Rgba8Unorm,
        vk::Format::R8G8B8A8_SRGB => Format::Rgba8UnormSrgb,
        vk::Format::R8G8B8A8_SNORM => Format::Rgba8Snorm,
        vk::Format::R8G8B8A8_UINT => Format::Rgba8Uint,
        vk::Format::R8G8B8A8_SINT => Format::Rgba8Sint,
        vk::Format::B8G8R8A8_UNORM => Format::Bgra8Unorm,
        vk::Format::B8G8R8A8_SRGB => Format::Bgra8UnormSrgb,
        vk::Format::R16_UNORM => Format::R16Unorm,
        vk::Format::R16_UINT => Format::R16Uint,
        vk::Format::R16_SFLOAT => Format::R16Float,
        vk::Format::R16G16_SFLOAT => Format::Rg16Float,
        vk::Format::R16G16B16A16_UNORM => Format::Rgba16Unorm,
        vk::Format::R16G16B16A16_SFLOAT => Format::Rgba16Float,
        vk::Format::R32_UINT => Format::R32Uint,
        vk::Format::R32_SINT => Format::R32Sint,
        vk::Format::R32_SFLOAT => Format::R32Float,
        vk::Format::R32G32_SFLOAT => Format::Rg32Float,
        vk::Format::R32G32B32_SFLOAT => Format::Rgb32Float,
        vk::Format::R32G32B32A32_UINT => Format::Rgba32Uint,
        vk::Format::R32G32B32A32_SFLOAT => Format::Rgba32Float,
        vk::Format::A2B10G10R10_UNORM_PACK32 => Format::Rgb10A2Unorm,
        vk::Format::B10G11R11_UFLOAT_PACK32 => Format::Rg11B10Float,
        vk::Format::D16_UNORM => Format::D16Unorm,
        vk::Format::D24_UNORM_S8_UINT => Format::D24UnormS8Uint,
        vk::Format::D32_SFLOAT => Format::D32Float,
        vk::Format::D32_SFLOAT_S8_UINT => Format::D32FloatS8X24Uint,
        vk::Format::BC1_RGBA_UNORM_BLOCK => Format::Bc1Unorm,
        vk::Format::BC1_RGBA_SRGB_BLOCK => Format::Bc1UnormSrgb,
        vk::Format::BC2_UNORM_BLOCK => Format::Bc2Unorm,
        vk::Format::BC3_UNORM_BLOCK => Format::Bc3Unorm,
        vk::Format::BC4_UNORM_BLOCK => Format::Bc4Unorm,
        vk::Format::BC5_UNORM_BLOCK => Format::Bc5Unorm,
        _ => return None,
    };
    Some(format)
}

/// Image aspects a format carries
pub fn aspect_flags(format: Format) -> vk::ImageAspectFlags {
    let mut aspect = vk::ImageAspectFlags::empty();
    if format.is_depth() {
        aspect |= vk::ImageAspectFlags::DEPTH;
    }
    if format.is_stencil() {
        aspect |= vk::ImageAspectFlags::STENCIL;
    }
    if aspect.is_empty() {
        vk::ImageAspectFlags::COLOR
    } else {
        aspect
    }
}

pub fn index_type(format: Format) -> vk::IndexType {
    match format {
        Format::R16Uint => vk::IndexType::UINT16,
        _ => vk::IndexType::UINT32,
    }
}

// ===== TEXTURES =====

/// Image type and default view type of a texture type
pub fn texture_type_to_vk(texture_type: TextureType) -> (vk::ImageType, vk::ImageViewType) {
    match texture_type {
        TextureType::Texture1D => (vk::ImageType::TYPE_1D, vk::ImageViewType::TYPE_1D),
        TextureType::Texture2D => (vk::ImageType::TYPE_2D, vk::ImageViewType::TYPE_2D),
        TextureType::Texture3D => (vk::ImageType::TYPE_3D, vk::ImageViewType::TYPE_3D),
        TextureType::TextureCube => (vk::ImageType::TYPE_2D, vk::ImageViewType::CUBE),
        TextureType::Texture1DArray => (vk::ImageType::TYPE_1D, vk::ImageViewType::TYPE_1D_ARRAY),
        TextureType::Texture2DArray => (vk::ImageType::TYPE_2D, vk::ImageViewType::TYPE_2D_ARRAY),
        TextureType::TextureCubeArray => (vk::ImageType::TYPE_2D, vk::ImageViewType::CUBE_ARRAY),
        TextureType::Texture2DMS => (vk::ImageType::TYPE_2D, vk::ImageViewType::TYPE_2D),
        TextureType::Texture2DMSArray => (vk::ImageType::TYPE_2D, vk::ImageViewType::TYPE_2D_ARRAY),
    }
}

/// Sample count flag of a power-of-two sample count
pub fn sample_count_to_vk(samples: u32) -> vk::SampleCountFlags {
    match samples {
        64 => vk::SampleCountFlags::TYPE_64,
        32 => vk::SampleCountFlags::TYPE_32,
        16 => vk::SampleCountFlags::TYPE_16,
        8 => vk::SampleCountFlags::TYPE_8,
        4 => vk::SampleCountFlags::TYPE_4,
        2 => vk::SampleCountFlags::TYPE_2,
        _ => vk::SampleCountFlags::TYPE_1,
    }
}

/// Highest single sample count contained in a sample count mask
pub fn max_sample_count(flags: vk::SampleCountFlags) -> u32 {
    let raw = flags.as_raw();
    if raw == 0 {
        1
    } else {
        1 << (31 - raw.leading_zeros())
    }
}

// ===== SAMPLERS =====

pub fn filter_to_vk(filter: SamplerFilter) -> vk::Filter {
    match filter {
        SamplerFilter::Nearest => vk::Filter::NEAREST,
        SamplerFilter::Linear => vk::Filter::LINEAR,
    }
}

pub fn mipmap_mode_to_vk(filter: SamplerFilter) -> vk::SamplerMipmapMode {
    match filter {
        SamplerFilter::Nearest => vk::SamplerMipmapMode::NEAREST,
        SamplerFilter::Linear => vk::SamplerMipmapMode::LINEAR,
    }
}

pub fn address_mode_to_vk(mode: SamplerAddressMode) -> vk::SamplerAddressMode {
    match mode {
        SamplerAddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
        SamplerAddressMode::Mirror => vk::SamplerAddressMode::MIRRORED_REPEAT,
        SamplerAddressMode::Clamp => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        SamplerAddressMode::Border => vk::SamplerAddressMode::CLAMP_TO_BORDER,
        SamplerAddressMode::MirrorOnce => vk::SamplerAddressMode::MIRROR_CLAMP_TO_EDGE,
    }
}

pub fn border_color_to_vk(color: BorderColor) -> vk::BorderColor {
    match color {
        BorderColor::TransparentBlack => vk::BorderColor::FLOAT_TRANSPARENT_BLACK,
        BorderColor::OpaqueBlack => vk::BorderColor::FLOAT_OPAQUE_BLACK,
        BorderColor::OpaqueWhite => vk::BorderColor::FLOAT_OPAQUE_WHITE,
    }
}

pub fn compare_op_to_vk(op: CompareOp) -> vk::CompareOp {
    match op {
        CompareOp::Never => vk::CompareOp::NEVER,
        CompareOp::Less => vk::CompareOp::LESS,
        CompareOp::Equal => vk::CompareOp::EQUAL,
        CompareOp::LessEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareOp::Greater => vk::CompareOp::GREATER,
        CompareOp::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareOp::GreaterEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareOp::Always => vk::CompareOp::ALWAYS,
    }
}

// ===== PIPELINE STATE =====

pub fn stencil_op_to_vk(op: StencilOp) -> vk::StencilOp {
    match op {
        StencilOp::Keep => vk::StencilOp::KEEP,
        StencilOp::Zero => vk::StencilOp::ZERO,
        StencilOp::Replace => vk::StencilOp::REPLACE,
        StencilOp::IncClamp => vk::StencilOp::INCREMENT_AND_CLAMP,
        StencilOp::DecClamp => vk::StencilOp::DECREMENT_AND_CLAMP,
        StencilOp::Invert => vk::StencilOp::INVERT,
        StencilOp::IncWrap => vk::StencilOp::INCREMENT_AND_WRAP,
        StencilOp::DecWrap => vk::StencilOp::DECREMENT_AND_WRAP,
    }
}

pub fn blend_factor_to_vk(factor: BlendFactor) -> vk::BlendFactor {
    match factor {
        BlendFactor::Zero => vk::BlendFactor::ZERO,
        BlendFactor::One => vk::BlendFactor::ONE,
        BlendFactor::SrcColor => vk::BlendFactor::SRC_COLOR,
        BlendFactor::InvSrcColor => vk::BlendFactor::ONE_MINUS_SRC_COLOR,
        BlendFactor::SrcAlpha => vk::BlendFactor::SRC_ALPHA,
        BlendFactor::InvSrcAlpha => vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstColor => vk::BlendFactor::DST_COLOR,
        BlendFactor::InvDstColor => vk::BlendFactor::ONE_MINUS_DST_COLOR,
        BlendFactor::DstAlpha => vk::BlendFactor::DST_ALPHA,
        BlendFactor::InvDstAlpha => vk::BlendFactor::ONE_MINUS_DST_ALPHA,
        BlendFactor::BlendFactor => vk::BlendFactor::CONSTANT_COLOR,
        BlendFactor::InvBlendFactor => vk::BlendFactor::ONE_MINUS_CONSTANT_COLOR,
    }
}

pub fn blend_op_to_vk(op: BlendOp) -> vk::BlendOp {
    match op {
        BlendOp::Add => vk::BlendOp::ADD,
        BlendOp::Subtract => vk::BlendOp::SUBTRACT,
        BlendOp::RevSubtract => vk::BlendOp::REVERSE_SUBTRACT,
        BlendOp::Min => vk::BlendOp::MIN,
        BlendOp::Max => vk::BlendOp::MAX,
    }
}

/// RGBA write mask (bit 0 = red) as Vulkan color components
pub fn color_mask_to_vk(mask: u8) -> vk::ColorComponentFlags {
    vk::ColorComponentFlags::from_raw((mask & 0xF) as u32)
}

pub fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::Disabled => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

pub fn polygon_mode_to_vk(mode: PolygonMode) -> vk::PolygonMode {
    match mode {
        PolygonMode::Fill => vk::PolygonMode::FILL,
        PolygonMode::Wireframe => vk::PolygonMode::LINE,
        PolygonMode::Points => vk::PolygonMode::POINT,
    }
}

pub fn topology_to_vk(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::PointList => vk::PrimitiveTopology::POINT_LIST,
        PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
        PrimitiveTopology::LineStrip => vk::PrimitiveTopology::LINE_STRIP,
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
        PrimitiveTopology::Patches(_) => vk::PrimitiveTopology::PATCH_LIST,
    }
}

// ===== RENDER PASSES =====

pub fn load_op_to_vk(op: AttachmentLoadOp) -> vk::AttachmentLoadOp {
    match op {
        AttachmentLoadOp::Undefined => vk::AttachmentLoadOp::DONT_CARE,
        AttachmentLoadOp::Load => vk::AttachmentLoadOp::LOAD,
        AttachmentLoadOp::Clear => vk::AttachmentLoadOp::CLEAR,
    }
}

pub fn store_op_to_vk(op: AttachmentStoreOp) -> vk::AttachmentStoreOp {
    match op {
        AttachmentStoreOp::Undefined => vk::AttachmentStoreOp::DONT_CARE,
        AttachmentStoreOp::Store => vk::AttachmentStoreOp::STORE,
    }
}

// ===== SHADER STAGES =====

pub fn shader_stage_to_vk(shader_type: ShaderType) -> vk::ShaderStageFlags {
    match shader_type {
        ShaderType::Vertex => vk::ShaderStageFlags::VERTEX,
        ShaderType::TessControl => vk::ShaderStageFlags::TESSELLATION_CONTROL,
        ShaderType::TessEvaluation => vk::ShaderStageFlags::TESSELLATION_EVALUATION,
        ShaderType::Geometry => vk::ShaderStageFlags::GEOMETRY,
        ShaderType::Fragment => vk::ShaderStageFlags::FRAGMENT,
        ShaderType::Compute => vk::ShaderStageFlags::COMPUTE,
    }
}

pub fn stage_flags_to_vk(flags: StageFlags) -> vk::ShaderStageFlags {
    let mut out = vk::ShaderStageFlags::empty();
    let table = [
        (StageFlags::VERTEX, vk::ShaderStageFlags::VERTEX),
        (StageFlags::TESS_CONTROL, vk::ShaderStageFlags::TESSELLATION_CONTROL),
        (StageFlags::TESS_EVALUATION, vk::ShaderStageFlags::TESSELLATION_EVALUATION),
        (StageFlags::GEOMETRY, vk::ShaderStageFlags::GEOMETRY),
        (StageFlags::FRAGMENT, vk::ShaderStageFlags::FRAGMENT),
        (StageFlags::COMPUTE, vk::ShaderStageFlags::COMPUTE),
    ];
    for (lumen, vulkan) in table {
        if flags.contains(lumen) {
            out |= vulkan;
        }
    }
    out
}

// ===== VIEWPORTS =====

pub fn viewport_to_vk(viewport: &Viewport) -> vk::Viewport {
    vk::Viewport {
        x: viewport.x,
        y: viewport.y,
        width: viewport.width,
        height: viewport.height,
        min_depth: viewport.min_depth,
        max_depth: viewport.max_depth,
    }
}

/// Negative scissor sizes collapse to empty rectangles
pub fn scissor_to_vk(scissor: &Scissor) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: scissor.x, y: scissor.y },
        extent: vk::Extent2D {
            width: scissor.width.max(0) as u32,
            height: scissor.height.max(0) as u32,
        },
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
