//! Unit tests for texture_flags.rs
//!
//! MIP chain lengths, MIP extents per texture type and subresource footprints.

use crate::format::*;
use crate::render::{Extent3D, Offset3D, TextureDescriptor, TextureLocation, TextureRegion, TextureSubresource, TextureType};

const ALL_TYPES: [TextureType; 9] = [
    TextureType::Texture1D,
    TextureType::Texture2D,
    TextureType::Texture3D,
    TextureType::TextureCube,
    TextureType::Texture1DArray,
    TextureType::Texture2DArray,
    TextureType::TextureCubeArray,
    TextureType::Texture2DMS,
    TextureType::Texture2DMSArray,
];

// ============================================================================
// MIP LEVEL COUNT
// ============================================================================

#[test]
fn test_num_mip_levels_powers_of_two() {
    for k in 0..16u32 {
        let size = 1u32 << k;
        assert_eq!(num_mip_levels(size, 1, 1), k + 1);
        assert_eq!(num_mip_levels(1, size, 1), k + 1);
        assert_eq!(num_mip_levels(1, 1, size), k + 1);
        assert_eq!(num_mip_levels(size, size / 2 + 1, 1), k + 1);
    }
}

#[test]
fn test_num_mip_levels_non_powers_of_two() {
    assert_eq!(num_mip_levels(1, 1, 1), 1);
    assert_eq!(num_mip_levels(3, 1, 1), 2);
    assert_eq!(num_mip_levels(800, 600, 1), 10);
    assert_eq!(num_mip_levels(1023, 1, 1), 10);
    assert_eq!(num_mip_levels(1024, 1, 1), 11);
}

#[test]
fn test_num_mip_levels_zero_extent() {
    assert_eq!(num_mip_levels(0, 0, 0), 0);
}

#[test]
fn test_num_mip_levels_per_type_uses_relevant_dimensions() {
    let extent = Extent3D::new(4, 16, 64);
    assert_eq!(num_mip_levels_for_type(TextureType::Texture1D, extent), 3);
    assert_eq!(num_mip_levels_for_type(TextureType::Texture2D, extent), 5);
    assert_eq!(num_mip_levels_for_type(TextureType::Texture3D, extent), 7);
    assert_eq!(num_mip_levels_for_type(TextureType::Texture2DArray, extent), 5);
    assert_eq!(num_mip_levels_for_type(TextureType::Texture2DMS, extent), 1);
    assert_eq!(num_mip_levels_for_type(TextureType::Texture2DMSArray, extent), 1);
}

#[test]
fn test_num_mip_levels_for_descriptor() {
    let mut desc = TextureDescriptor {
        extent: Extent3D::new(64, 64, 1),
        ..Default::default()
    };
    assert_eq!(num_mip_levels_for(&desc), 7);
    desc.mip_levels = 3;
    assert_eq!(num_mip_levels_for(&desc), 3);
}

// ============================================================================
// MIP EXTENT
// ============================================================================

#[test]
fn test_mip_extent_64x64_scenario() {
    let extent = Extent3D::new(64, 64, 1);
    assert_eq!(num_mip_levels(64, 64, 1), 7);
    assert_eq!(mip_extent(TextureType::Texture2D, extent, 0), extent);
    assert_eq!(mip_extent(TextureType::Texture2D, extent, 3), Extent3D::new(8, 8, 1));
    assert_eq!(mip_extent(TextureType::Texture2D, extent, 6), Extent3D::new(1, 1, 1));
}

#[test]
fn test_mip_extent_out_of_range_is_zero() {
    let extent = Extent3D::new(64, 32, 16);
    for texture_type in ALL_TYPES {
        if is_multi_sample_texture(texture_type) {
            continue;
        }
        let count = num_mip_levels_for_type(texture_type, extent);
        for level in count..count + 4 {
            assert_eq!(mip_extent(texture_type, extent, level), Extent3D::default());
        }
        assert_eq!(mip_extent(texture_type, extent, u32::MAX), Extent3D::default());
    }
}

#[test]
fn test_mip_extent_multisample_unchanged_for_every_level() {
    let extent = Extent3D::new(640, 480, 4);
    for texture_type in [TextureType::Texture2DMS, TextureType::Texture2DMSArray] {
        for level in [0, 1, 2, 9, 100] {
            assert_eq!(mip_extent(texture_type, extent, level), extent);
        }
    }
}

#[test]
fn test_mip_extent_keeps_array_layers() {
    let extent = Extent3D::new(32, 32, 5);
    assert_eq!(mip_extent(TextureType::Texture2DArray, extent, 2), Extent3D::new(8, 8, 5));
    assert_eq!(mip_extent(TextureType::TextureCubeArray, Extent3D::new(32, 32, 12), 5), Extent3D::new(1, 1, 12));
    assert_eq!(mip_extent(TextureType::Texture1DArray, Extent3D::new(32, 7, 1), 4), Extent3D::new(2, 7, 1));
}

#[test]
fn test_mip_extent_3d_shrinks_depth() {
    let extent = Extent3D::new(16, 8, 4);
    assert_eq!(mip_extent(TextureType::Texture3D, extent, 1), Extent3D::new(8, 4, 2));
    assert_eq!(mip_extent(TextureType::Texture3D, extent, 3), Extent3D::new(2, 1, 1));
    assert_eq!(mip_extent(TextureType::Texture3D, extent, 4), Extent3D::new(1, 1, 1));
}

#[test]
fn test_mip_extent_for_cube_descriptors() {
    let cube = TextureDescriptor {
        texture_type: TextureType::TextureCube,
        extent: Extent3D::new(16, 16, 1),
        array_layers: 6,
        ..Default::default()
    };
    assert_eq!(mip_extent_for(&cube, 1), Extent3D::new(8, 8, 6));

    let cube_array = TextureDescriptor {
        texture_type: TextureType::TextureCubeArray,
        extent: Extent3D::new(16, 16, 1),
        array_layers: 8,
        ..Default::default()
    };
    assert_eq!(mip_extent_for(&cube_array, 0), Extent3D::new(16, 16, 12));
    assert_eq!(mip_extent_for(&cube_array, 5), Extent3D::default());
}

// ============================================================================
// TEXEL COUNTS AND FOOTPRINTS
// ============================================================================

#[test]
fn test_calc_texture_extent_folds_layers() {
    let extent = Extent3D::new(8, 4, 1);
    assert_eq!(calc_texture_extent(TextureType::Texture1DArray, extent, 3), Extent3D::new(8, 3, 1));
    assert_eq!(calc_texture_extent(TextureType::Texture2DArray, extent, 3), Extent3D::new(8, 4, 3));
    assert_eq!(calc_texture_extent(TextureType::Texture2D, extent, 3), Extent3D::new(8, 4, 1));
}

#[test]
fn test_num_subresource_texels_full_chain() {
    let extent = Extent3D::new(4, 4, 1);
    let subresource = TextureSubresource::new(0, 1, 0, 3);
    // 16 + 4 + 1
    assert_eq!(num_subresource_texels(TextureType::Texture2D, extent, &subresource), 21);
}

#[test]
fn test_num_subresource_texels_array_layers() {
    let extent = Extent3D::new(4, 4, 1);
    let subresource = TextureSubresource::new(0, 2, 1, 2);
    // (4 + 1) * 2 layers
    assert_eq!(num_subresource_texels(TextureType::Texture2DArray, extent, &subresource), 10);
}

#[test]
fn test_memory_footprint_rgba8() {
    let extent = Extent3D::new(64, 64, 1);
    let footprint = memory_footprint(TextureType::Texture2D, Format::Rgba8Unorm, extent, &TextureSubresource::default());
    assert_eq!(footprint, 64 * 64 * 4);

    let all_levels = TextureSubresource::new(0, 1, 0, 7);
    let total: u64 = (0..7).map(|l| 4 * (64u64 >> l) * (64u64 >> l)).sum();
    assert_eq!(memory_footprint(TextureType::Texture2D, Format::Rgba8Unorm, extent, &all_levels), total);
}

#[test]
fn test_multisample_subresource_counts_level_zero_only() {
    let extent = Extent3D::new(8, 8, 1);
    let subresource = TextureSubresource::new(0, 1, 0, 3);
    assert_eq!(num_subresource_texels(TextureType::Texture2DMS, extent, &subresource), 64);
}

// ============================================================================
// TYPE CLASSIFICATION
// ============================================================================

#[test]
fn test_type_classification() {
    assert!(is_array_texture(TextureType::Texture2DMSArray));
    assert!(!is_array_texture(TextureType::Texture2DMS));
    assert!(!is_array_texture(TextureType::TextureCube));
    assert!(is_multi_sample_texture(TextureType::Texture2DMS));
    assert!(is_cube_texture(TextureType::TextureCubeArray));
    assert!(!is_cube_texture(TextureType::Texture2DArray));
    assert_eq!(num_mip_dimensions(TextureType::Texture2DArray), 3);
    assert_eq!(num_texture_dimensions(TextureType::Texture2DArray), 2);
    assert_eq!(num_texture_dimensions(TextureType::Texture1DArray), 1);
}

#[test]
fn test_is_mip_mapped_texture() {
    let mut desc = TextureDescriptor::default();
    assert!(is_mip_mapped_texture(&desc));
    desc.mip_levels = 1;
    assert!(!is_mip_mapped_texture(&desc));
    desc.mip_levels = 0;
    desc.texture_type = TextureType::Texture2DMS;
    assert!(!is_mip_mapped_texture(&desc));
}

// ============================================================================
// REGION FOLDING
// ============================================================================

#[test]
fn test_fold_region_puts_layers_in_unused_component() {
    let region = TextureRegion {
        subresource: TextureSubresource::new(2, 3, 0, 1),
        offset: Offset3D::new(4, 8, 0),
        extent: Extent3D::new(16, 16, 1),
    };
    assert_eq!(
        fold_texture_region(TextureType::Texture2DArray, &region),
        (Offset3D::new(4, 8, 2), Extent3D::new(16, 16, 3))
    );
    assert_eq!(
        fold_texture_region(TextureType::Texture1DArray, &region),
        (Offset3D::new(4, 2, 0), Extent3D::new(16, 3, 1))
    );
    assert_eq!(
        fold_texture_region(TextureType::Texture2D, &region),
        (Offset3D::new(4, 8, 0), Extent3D::new(16, 16, 1))
    );
}

#[test]
fn test_region_from_location_reads_layer_count_from_extent() {
    let location = TextureLocation { offset: Offset3D::new(1, 2, 0), array_layer: 4, mip_level: 1 };
    let region = texture_region_from_location(TextureType::TextureCube, &location, Extent3D::new(8, 8, 6));
    assert_eq!(region.subresource, TextureSubresource::new(4, 6, 1, 1));
    assert_eq!(region.extent, Extent3D::new(8, 8, 1));

    let region = texture_region_from_location(TextureType::Texture3D, &location, Extent3D::new(8, 8, 6));
    assert_eq!(region.subresource.num_array_layers, 1);
    assert_eq!(region.extent, Extent3D::new(8, 8, 6));
}
