/// Texture type, texture descriptor and creation-time validation

use crate::error::Result;
use crate::format::{num_mip_levels_for_type, Format};
use crate::render::{BindFlags, CpuAccessFlags, Extent3D, MiscFlags, RenderingLimits};
use crate::render::limits::clamp_samples;

/// Texture dimensionality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureType {
    Texture1D,
    #[default]
    Texture2D,
    Texture3D,
    TextureCube,
    Texture1DArray,
    Texture2DArray,
    TextureCubeArray,
    Texture2DMS,
    Texture2DMSArray,
}

/// Descriptor for creating a texture
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    pub debug_name: Option<String>,
    pub texture_type: TextureType,
    pub bind_flags: BindFlags,
    pub cpu_access_flags: CpuAccessFlags,
    pub misc_flags: MiscFlags,
    pub format: Format,
    /// Texel extent of MIP level 0 (unused dimensions must be 1)
    pub extent: Extent3D,
    /// Array layers; cube textures count faces (6 per cube)
    pub array_layers: u32,
    /// Number of MIP levels, 0 for the full chain
    pub mip_levels: u32,
    /// Samples per texel, only meaningful for multisample types
    pub samples: u32,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            debug_name: None,
            texture_type: TextureType::Texture2D,
            bind_flags: BindFlags::SAMPLED | BindFlags::COLOR_ATTACHMENT,
            cpu_access_flags: CpuAccessFlags::empty(),
            misc_flags: MiscFlags::empty(),
            format: Format::Rgba8Unorm,
            extent: Extent3D::new(1, 1, 1),
            array_layers: 1,
            mip_levels: 0,
            samples: 1,
        }
    }
}

const SOURCE: &str = "lumen::RenderSystem";

/// Validate a texture descriptor and return its normalized form
///
/// The normalized descriptor has a resolved MIP count, cube layer counts
/// rounded up to a multiple of 6 and a sample count clamped to the device.
///
/// # Errors
///
/// `InvalidArgument` for zero extents, unused dimensions other than 1,
/// format/bind-flag conflicts and sizes beyond the device limits.
pub fn validate_texture_descriptor(desc: &TextureDescriptor, limits: &RenderingLimits) -> Result<TextureDescriptor> {
    let mut out = desc.clone();
    let extent = desc.extent;

    if extent.is_zero() {
        return Err(crate::lumen_invalid!(
            SOURCE,
            "texture extent must be non-zero (got {}x{}x{})",
            extent.width, extent.height, extent.depth
        ));
    }
    if desc.format == Format::Undefined {
        return Err(crate::lumen_invalid!(SOURCE, "texture format is undefined"));
    }
    if desc.array_layers == 0 {
        return Err(crate::lumen_invalid!(SOURCE, "texture must have at least one array layer"));
    }

    // Unused dimensions and per-type size limits
    let (max_size, dims_ok) = match desc.texture_type {
        TextureType::Texture1D | TextureType::Texture1DArray => {
            (limits.max_texture_1d_size, extent.height == 1 && extent.depth == 1)
        }
        TextureType::Texture3D => (limits.max_texture_3d_size, true),
        TextureType::TextureCube | TextureType::TextureCubeArray => {
            (limits.max_texture_cube_size, extent.depth == 1)
        }
        _ => (limits.max_texture_2d_size, extent.depth == 1),
    };
    if !dims_ok {
        return Err(crate::lumen_invalid!(
            SOURCE,
            "unused dimensions of {:?} must be 1 (got {}x{}x{})",
            desc.texture_type, extent.width, extent.height, extent.depth
        ));
    }
    if extent.width > max_size || extent.height > max_size || extent.depth > max_size {
        return Err(crate::lumen_invalid!(
            SOURCE,
            "texture extent {}x{}x{} exceeds device limit {}",
            extent.width, extent.height, extent.depth, max_size
        ));
    }

    // Array layers
    match desc.texture_type {
        TextureType::Texture1D | TextureType::Texture2D | TextureType::Texture3D | TextureType::Texture2DMS => {
            if desc.array_layers != 1 {
                return Err(crate::lumen_invalid!(
                    SOURCE,
                    "{:?} cannot have {} array layers",
                    desc.texture_type, desc.array_layers
                ));
            }
        }
        TextureType::TextureCube => {
            if desc.array_layers != 1 && desc.array_layers != 6 {
                return Err(crate::lumen_invalid!(
                    SOURCE,
                    "cube texture must have 6 faces (got {} layers)",
                    desc.array_layers
                ));
            }
            out.array_layers = 6;
        }
        TextureType::TextureCubeArray => {
            let aligned = desc.array_layers.div_ceil(6) * 6;
            if aligned != desc.array_layers {
                crate::lumen_warn!(
                    SOURCE,
                    "cube array layers rounded up from {} to {}",
                    desc.array_layers, aligned
                );
            }
            out.array_layers = aligned;
        }
        _ => {}
    }
    if out.array_layers > limits.max_texture_array_layers {
        return Err(crate::lumen_invalid!(
            SOURCE,
            "{} array layers exceed device limit {}",
            out.array_layers, limits.max_texture_array_layers
        ));
    }
    if matches!(desc.texture_type, TextureType::TextureCube | TextureType::TextureCubeArray)
        && extent.width != extent.height
    {
        return Err(crate::lumen_invalid!(
            SOURCE,
            "cube faces must be square (got {}x{})",
            extent.width, extent.height
        ));
    }

    // Samples and MIP levels
    let full_chain = num_mip_levels_for_type(desc.texture_type, extent);
    if matches!(desc.texture_type, TextureType::Texture2DMS | TextureType::Texture2DMSArray) {
        if desc.samples <= 1 {
            return Err(crate::lumen_invalid!(SOURCE, "multisample texture needs more than 1 sample"));
        }
        if desc.mip_levels > 1 {
            return Err(crate::lumen_invalid!(SOURCE, "multisample texture must have exactly 1 MIP level"));
        }
        out.samples = clamp_samples(desc.samples, limits.max_color_buffer_samples);
        out.mip_levels = 1;
    } else {
        if desc.samples > 1 {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "{:?} cannot have {} samples",
                desc.texture_type, desc.samples
            ));
        }
        out.samples = 1;
        out.mip_levels = match desc.mip_levels {
            0 => full_chain,
            n if n > full_chain => {
                return Err(crate::lumen_invalid!(
                    SOURCE,
                    "{} MIP levels requested, extent allows {}",
                    n, full_chain
                ));
            }
            n => n,
        };
    }

    // Format vs. bind flags
    let format = desc.format;
    if format.is_depth_or_stencil() {
        if desc.bind_flags.intersects(BindFlags::COLOR_ATTACHMENT | BindFlags::STORAGE) {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "depth-stencil format {:?} cannot be a color attachment or storage texture",
                format
            ));
        }
        if desc.texture_type == TextureType::Texture3D {
            return Err(crate::lumen_invalid!(SOURCE, "3D textures cannot have a depth-stencil format"));
        }
    } else if desc.bind_flags.contains(BindFlags::DEPTH_STENCIL_ATTACHMENT) {
        return Err(crate::lumen_invalid!(
            SOURCE,
            "color format {:?} cannot be a depth-stencil attachment",
            format
        ));
    }
    if format.is_compressed() {
        let attribs = format.attributes();
        if desc.bind_flags.intersects(BindFlags::COLOR_ATTACHMENT | BindFlags::STORAGE) {
            return Err(crate::lumen_invalid!(SOURCE, "compressed format {:?} cannot be rendered to", format));
        }
        if extent.width % attribs.block_width != 0 || extent.height % attribs.block_height != 0 {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "extent {}x{} is not a multiple of the {}x{} block size of {:?}",
                extent.width, extent.height, attribs.block_width, attribs.block_height, format
            ));
        }
    }
    let invalid_buffer_flags = BindFlags::VERTEX_BUFFER
        | BindFlags::INDEX_BUFFER
        | BindFlags::CONSTANT_BUFFER
        | BindFlags::INDIRECT_BUFFER;
    if desc.bind_flags.intersects(invalid_buffer_flags) {
        return Err(crate::lumen_invalid!(
            SOURCE,
            "bind flags {:?} are only valid for buffers",
            desc.bind_flags & invalid_buffer_flags
        ));
    }

    Ok(out)
}
