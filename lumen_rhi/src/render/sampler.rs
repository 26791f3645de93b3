/// Sampler descriptor

use crate::render::RenderingLimits;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SamplerFilter {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SamplerAddressMode {
    #[default]
    Repeat,
    Mirror,
    Clamp,
    Border,
    MirrorOnce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareOp {
    Never,
    #[default]
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BorderColor {
    #[default]
    TransparentBlack,
    OpaqueBlack,
    OpaqueWhite,
}

/// Descriptor for creating a sampler
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDescriptor {
    pub debug_name: Option<String>,
    pub address_mode_u: SamplerAddressMode,
    pub address_mode_v: SamplerAddressMode,
    pub address_mode_w: SamplerAddressMode,
    pub min_filter: SamplerFilter,
    pub mag_filter: SamplerFilter,
    pub mip_map_filter: SamplerFilter,
    pub mip_map_enabled: bool,
    pub mip_map_lod_bias: f32,
    pub min_lod: f32,
    pub max_lod: f32,
    /// Anisotropy, 1 disables anisotropic filtering
    pub max_anisotropy: f32,
    pub compare_enabled: bool,
    pub compare_op: CompareOp,
    pub border_color: BorderColor,
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self {
            debug_name: None,
            address_mode_u: SamplerAddressMode::Repeat,
            address_mode_v: SamplerAddressMode::Repeat,
            address_mode_w: SamplerAddressMode::Repeat,
            min_filter: SamplerFilter::Linear,
            mag_filter: SamplerFilter::Linear,
            mip_map_filter: SamplerFilter::Linear,
            mip_map_enabled: true,
            mip_map_lod_bias: 0.0,
            min_lod: 0.0,
            max_lod: 1000.0,
            max_anisotropy: 1.0,
            compare_enabled: false,
            compare_op: CompareOp::Less,
            border_color: BorderColor::TransparentBlack,
        }
    }
}

impl SamplerDescriptor {
    /// Copy of this descriptor with anisotropy and LOD range clamped to the device
    pub fn clamped(&self, limits: &RenderingLimits) -> SamplerDescriptor {
        let mut desc = self.clone();
        desc.max_anisotropy = desc.max_anisotropy.clamp(1.0, limits.max_anisotropy.max(1.0));
        if desc.max_lod < desc.min_lod {
            desc.max_lod = desc.min_lod;
        }
        desc
    }
}
