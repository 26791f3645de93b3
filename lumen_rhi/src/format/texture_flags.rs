/// MIP-level and subresource geometry for every texture type
///
/// All functions here are pure and backend independent. Every backend sizes
/// its MIP chains, staging buffers and readbacks through them.

use crate::format::{format_memory_footprint, Format};
use crate::render::{Extent3D, Offset3D, TextureDescriptor, TextureLocation, TextureRegion, TextureSubresource, TextureType};

/// Number of MIP levels of a full chain: `1 + floor(log2(max(w, h, d)))`
///
/// A zero extent has no MIP levels.
pub fn num_mip_levels(width: u32, height: u32, depth: u32) -> u32 {
    let max_size = width.max(height).max(depth);
    32 - max_size.leading_zeros()
}

/// Number of MIP levels of a full chain for the given texture type
///
/// Only the dimensions the type actually uses take part. Multisample types
/// always have exactly one level.
pub fn num_mip_levels_for_type(texture_type: TextureType, extent: Extent3D) -> u32 {
    match texture_type {
        TextureType::Texture1D | TextureType::Texture1DArray => num_mip_levels(extent.width, 1, 1),
        TextureType::Texture2D
        | TextureType::TextureCube
        | TextureType::Texture2DArray
        | TextureType::TextureCubeArray => num_mip_levels(extent.width, extent.height, 1),
        TextureType::Texture3D => num_mip_levels(extent.width, extent.height, extent.depth),
        TextureType::Texture2DMS | TextureType::Texture2DMSArray => 1,
    }
}

/// MIP levels of a texture descriptor (`mip_levels == 0` means the full chain)
pub fn num_mip_levels_for(desc: &TextureDescriptor) -> u32 {
    if desc.mip_levels == 0 {
        num_mip_levels_for_type(desc.texture_type, desc.extent)
    } else {
        desc.mip_levels
    }
}

fn mip_dimension(size: u32, level: u32) -> u32 {
    size.checked_shr(level).unwrap_or(0).max(1)
}

/// Extent of one MIP level
///
/// Components shrink as `max(1, size >> level)`. Array types carry their
/// layer count in the first unused component (y for 1D arrays, z otherwise)
/// and keep it unchanged at every level; cube textures keep their face
/// count in z. Multisample types return `extent` unchanged for any level.
/// A level outside the MIP chain yields a zero extent.
pub fn mip_extent(texture_type: TextureType, extent: Extent3D, mip_level: u32) -> Extent3D {
    if is_multi_sample_texture(texture_type) {
        return extent;
    }
    if mip_level >= num_mip_levels_for_type(texture_type, extent) {
        return Extent3D::default();
    }
    let x = mip_dimension(extent.width, mip_level);
    let y = mip_dimension(extent.height, mip_level);
    match texture_type {
        TextureType::Texture1D => Extent3D::new(x, 1, 1),
        TextureType::Texture2D => Extent3D::new(x, y, 1),
        TextureType::Texture3D => Extent3D::new(x, y, mip_dimension(extent.depth, mip_level)),
        TextureType::Texture1DArray => Extent3D::new(x, extent.height, 1),
        TextureType::TextureCube | TextureType::Texture2DArray | TextureType::TextureCubeArray => {
            Extent3D::new(x, y, extent.depth)
        }
        TextureType::Texture2DMS | TextureType::Texture2DMSArray => extent,
    }
}

/// Extent of one MIP level of a texture descriptor
///
/// Like [`mip_extent`] but takes the layer count from the descriptor: cube
/// textures report 6 faces and cube arrays round their layers up to a
/// multiple of 6.
pub fn mip_extent_for(desc: &TextureDescriptor, mip_level: u32) -> Extent3D {
    let layers = match desc.texture_type {
        TextureType::TextureCube => 6,
        TextureType::TextureCubeArray => desc.array_layers.div_ceil(6) * 6,
        _ => desc.array_layers,
    };
    if is_multi_sample_texture(desc.texture_type) {
        return calc_texture_extent(desc.texture_type, desc.extent, layers);
    }
    if mip_level >= num_mip_levels_for_type(desc.texture_type, desc.extent) {
        return Extent3D::default();
    }
    mip_extent(desc.texture_type, calc_texture_extent(desc.texture_type, desc.extent, layers), mip_level)
}

/// Fold an array-layer count into the unused extent component of a texture type
pub fn calc_texture_extent(texture_type: TextureType, extent: Extent3D, num_array_layers: u32) -> Extent3D {
    match texture_type {
        TextureType::Texture1D => Extent3D::new(extent.width, 1, 1),
        TextureType::Texture2D | TextureType::Texture2DMS => Extent3D::new(extent.width, extent.height, 1),
        TextureType::Texture3D => extent,
        TextureType::Texture1DArray => Extent3D::new(extent.width, num_array_layers, 1),
        TextureType::TextureCube
        | TextureType::Texture2DArray
        | TextureType::TextureCubeArray
        | TextureType::Texture2DMSArray => Extent3D::new(extent.width, extent.height, num_array_layers),
    }
}

/// Texels of a single MIP level, `extent` already folded with the layer count
pub fn num_mip_texels(texture_type: TextureType, extent: Extent3D, mip_level: u32) -> u64 {
    if is_multi_sample_texture(texture_type) && mip_level > 0 {
        return 0;
    }
    mip_extent(texture_type, extent, mip_level).volume()
}

/// Texels of a whole subresource range (all its MIP levels and array layers)
pub fn num_subresource_texels(texture_type: TextureType, extent: Extent3D, subresource: &TextureSubresource) -> u64 {
    let extent = calc_texture_extent(texture_type, extent, subresource.num_array_layers);
    (0..subresource.num_mip_levels)
        .map(|level| num_mip_texels(texture_type, extent, subresource.base_mip_level + level))
        .sum()
}

/// Bytes needed to hold a subresource range tightly packed
pub fn memory_footprint(
    texture_type: TextureType,
    format: Format,
    extent: Extent3D,
    subresource: &TextureSubresource,
) -> u64 {
    format_memory_footprint(format, num_subresource_texels(texture_type, extent, subresource))
}

/// Dimensions a MIP level spans, counting the array dimension
pub fn num_mip_dimensions(texture_type: TextureType) -> u32 {
    match texture_type {
        TextureType::Texture1D => 1,
        TextureType::Texture2D | TextureType::TextureCube | TextureType::Texture2DMS => 2,
        TextureType::Texture1DArray => 2,
        TextureType::Texture3D
        | TextureType::Texture2DArray
        | TextureType::TextureCubeArray
        | TextureType::Texture2DMSArray => 3,
    }
}

/// Dimensions of a single image of the texture, ignoring arrays
pub fn num_texture_dimensions(texture_type: TextureType) -> u32 {
    match texture_type {
        TextureType::Texture1D | TextureType::Texture1DArray => 1,
        TextureType::Texture3D => 3,
        _ => 2,
    }
}

/// True if the descriptor asks for more than one MIP level
pub fn is_mip_mapped_texture(desc: &TextureDescriptor) -> bool {
    !is_multi_sample_texture(desc.texture_type) && (desc.mip_levels == 0 || desc.mip_levels > 1)
}

pub fn is_array_texture(texture_type: TextureType) -> bool {
    matches!(
        texture_type,
        TextureType::Texture1DArray
            | TextureType::Texture2DArray
            | TextureType::TextureCubeArray
            | TextureType::Texture2DMSArray
    )
}

pub fn is_multi_sample_texture(texture_type: TextureType) -> bool {
    matches!(texture_type, TextureType::Texture2DMS | TextureType::Texture2DMSArray)
}

pub fn is_cube_texture(texture_type: TextureType) -> bool {
    matches!(texture_type, TextureType::TextureCube | TextureType::TextureCubeArray)
}

/// Fold a region into the texel box it covers in a layer-folded MIP image
///
/// The array layers take the place of the unused extent component, the
/// same way [`calc_texture_extent`] folds them.
pub fn fold_texture_region(texture_type: TextureType, region: &TextureRegion) -> (Offset3D, Extent3D) {
    let o = region.offset;
    let e = region.extent;
    let first = region.subresource.base_array_layer as i32;
    let layers = region.subresource.num_array_layers;
    match texture_type {
        TextureType::Texture1D => (Offset3D::new(o.x, 0, 0), Extent3D::new(e.width, 1, 1)),
        TextureType::Texture1DArray => (Offset3D::new(o.x, first, 0), Extent3D::new(e.width, layers, 1)),
        TextureType::Texture2D | TextureType::Texture2DMS => {
            (Offset3D::new(o.x, o.y, 0), Extent3D::new(e.width, e.height, 1))
        }
        TextureType::Texture3D => (o, e),
        TextureType::TextureCube
        | TextureType::Texture2DArray
        | TextureType::TextureCubeArray
        | TextureType::Texture2DMSArray => {
            (Offset3D::new(o.x, o.y, first), Extent3D::new(e.width, e.height, layers))
        }
    }
}

/// Region addressed by a copy location and a folded copy extent
///
/// For array types the extent component that [`calc_texture_extent`] uses
/// for layers is read as the number of layers to copy.
pub fn texture_region_from_location(texture_type: TextureType, location: &TextureLocation, extent: Extent3D) -> TextureRegion {
    let (offset, extent, layers) = match texture_type {
        TextureType::Texture1DArray => (
            Offset3D::new(location.offset.x, 0, 0),
            Extent3D::new(extent.width, 1, 1),
            extent.height,
        ),
        TextureType::TextureCube
        | TextureType::Texture2DArray
        | TextureType::TextureCubeArray
        | TextureType::Texture2DMSArray => (
            Offset3D::new(location.offset.x, location.offset.y, 0),
            Extent3D::new(extent.width, extent.height, 1),
            extent.depth,
        ),
        _ => (location.offset, extent, 1),
    };
    TextureRegion {
        subresource: TextureSubresource::new(location.array_layer, layers, location.mip_level, 1),
        offset,
        extent,
    }
}

#[cfg(test)]
#[path = "texture_flags_tests.rs"]
mod tests;
