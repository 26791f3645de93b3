//! Unit tests for format.rs

use crate::format::{find_depth_stencil_format, find_swap_chain_color_format, format_memory_footprint, Format};

#[test]
fn test_rgba8_attributes() {
    let attribs = Format::Rgba8Unorm.attributes();
    assert_eq!(attribs.bit_size, 32);
    assert_eq!(attribs.components, 4);
    assert!(Format::Rgba8Unorm.is_color());
    assert!(!Format::Rgba8Unorm.is_depth_or_stencil());
    assert_eq!(Format::Rgba8Unorm.bytes_per_texel(), 4);
}

#[test]
fn test_depth_stencil_classification() {
    assert!(Format::D24UnormS8Uint.is_depth());
    assert!(Format::D24UnormS8Uint.is_stencil());
    assert!(Format::D32Float.is_depth());
    assert!(!Format::D32Float.is_stencil());
    assert!(!Format::D16Unorm.is_color());
    assert_eq!(Format::D24UnormS8Uint.depth_stencil_bits(), (24, 8));
}

#[test]
fn test_index_formats() {
    assert!(Format::R16Uint.is_index_format());
    assert!(Format::R32Uint.is_index_format());
    assert!(!Format::R32Float.is_index_format());
}

#[test]
fn test_undefined_has_no_footprint() {
    assert_eq!(format_memory_footprint(Format::Undefined, 100), 0);
}

#[test]
fn test_uncompressed_footprint() {
    assert_eq!(format_memory_footprint(Format::Rgba8Unorm, 64 * 64), 16384);
    assert_eq!(format_memory_footprint(Format::Rgb32Float, 3), 36);
    assert_eq!(format_memory_footprint(Format::R16Float, 5), 10);
}

#[test]
fn test_compressed_footprint_counts_blocks() {
    // 8x8 texels = 4 blocks of 8 bytes
    assert_eq!(format_memory_footprint(Format::Bc1Unorm, 64), 32);
    // 4 blocks of 16 bytes
    assert_eq!(format_memory_footprint(Format::Bc3Unorm, 64), 64);
    assert_eq!(Format::Bc1Unorm.bytes_per_texel(), 0);
}

#[test]
fn test_swap_chain_format_selection() {
    assert_eq!(find_swap_chain_color_format(32), Format::Bgra8Unorm);
    assert_eq!(find_swap_chain_color_format(24), Format::Bgra8Unorm);
    assert_eq!(find_swap_chain_color_format(64), Format::Rgba16Float);
    assert_eq!(find_depth_stencil_format(0, 0), Format::Undefined);
    assert_eq!(find_depth_stencil_format(16, 0), Format::D16Unorm);
    assert_eq!(find_depth_stencil_format(24, 8), Format::D24UnormS8Uint);
    assert_eq!(find_depth_stencil_format(32, 0), Format::D32Float);
    assert_eq!(find_depth_stencil_format(32, 8), Format::D32FloatS8X24Uint);
}
