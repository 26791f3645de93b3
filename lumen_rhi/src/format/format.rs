/// Hardware format enumeration and per-format attributes

/// Pixel, vertex attribute and index format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    #[default]
    Undefined,

    // 8-bit channels
    R8Unorm,
    R8Snorm,
    R8Uint,
    R8Sint,
    Rg8Unorm,
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Rgba8Snorm,
    Rgba8Uint,
    Rgba8Sint,
    Bgra8Unorm,
    Bgra8UnormSrgb,

    // 16-bit channels
    R16Unorm,
    R16Uint,
    R16Float,
    Rg16Float,
    Rgba16Unorm,
    Rgba16Float,

    // 32-bit channels
    R32Uint,
    R32Sint,
    R32Float,
    Rg32Float,
    Rgb32Float,
    Rgba32Uint,
    Rgba32Float,

    // Packed
    Rgb10A2Unorm,
    Rg11B10Float,

    // Depth-stencil
    D16Unorm,
    D24UnormS8Uint,
    D32Float,
    D32FloatS8X24Uint,

    // Block compressed
    Bc1Unorm,
    Bc1UnormSrgb,
    Bc2Unorm,
    Bc3Unorm,
    Bc4Unorm,
    Bc5Unorm,
}

bitflags::bitflags! {
    /// Classification bits of a format
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FormatFlags: u32 {
        const COLOR      = 1 << 0;
        const DEPTH      = 1 << 1;
        const STENCIL    = 1 << 2;
        const COMPRESSED = 1 << 3;
        const NORMALIZED = 1 << 4;
        const INTEGER    = 1 << 5;
        const SIGNED     = 1 << 6;
        const FLOAT      = 1 << 7;
        const SRGB       = 1 << 8;
        const PACKED     = 1 << 9;
    }
}

/// Size and layout attributes of a format
///
/// For block compressed formats `bit_size` is the size of a whole block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatAttributes {
    pub bit_size: u32,
    pub block_width: u32,
    pub block_height: u32,
    pub components: u32,
    pub flags: FormatFlags,
}

const fn attribs(bit_size: u32, block_width: u32, block_height: u32, components: u32, flags: FormatFlags) -> FormatAttributes {
    FormatAttributes { bit_size, block_width, block_height, components, flags }
}

const UNORM: FormatFlags = FormatFlags::COLOR.union(FormatFlags::NORMALIZED);
const SNORM: FormatFlags = UNORM.union(FormatFlags::SIGNED);
const UINT: FormatFlags = FormatFlags::COLOR.union(FormatFlags::INTEGER);
const SINT: FormatFlags = UINT.union(FormatFlags::SIGNED);
const SFLOAT: FormatFlags = FormatFlags::COLOR.union(FormatFlags::FLOAT).union(FormatFlags::SIGNED);
const SRGB: FormatFlags = UNORM.union(FormatFlags::SRGB);
const BC: FormatFlags = UNORM.union(FormatFlags::COMPRESSED);

impl Format {
    /// Attributes of this format; `Undefined` has a zero bit size
    pub const fn attributes(self) -> FormatAttributes {
        match self {
            Format::Undefined => attribs(0, 0, 0, 0, FormatFlags::empty()),

            Format::R8Unorm => attribs(8, 1, 1, 1, UNORM),
            Format::R8Snorm => attribs(8, 1, 1, 1, SNORM),
            Format::R8Uint => attribs(8, 1, 1, 1, UINT),
            Format::R8Sint => attribs(8, 1, 1, 1, SINT),
            Format::Rg8Unorm => attribs(16, 1, 1, 2, UNORM),
            Format::Rgba8Unorm => attribs(32, 1, 1, 4, UNORM),
            Format::Rgba8UnormSrgb => attribs(32, 1, 1, 4, SRGB),
            Format::Rgba8Snorm => attribs(32, 1, 1, 4, SNORM),
            Format::Rgba8Uint => attribs(32, 1, 1, 4, UINT),
            Format::Rgba8Sint => attribs(32, 1, 1, 4, SINT),
            Format::Bgra8Unorm => attribs(32, 1, 1, 4, UNORM),
            Format::Bgra8UnormSrgb => attribs(32, 1, 1, 4, SRGB),

            Format::R16Unorm => attribs(16, 1, 1, 1, UNORM),
            Format::R16Uint => attribs(16, 1, 1, 1, UINT),
            Format::R16Float => attribs(16, 1, 1, 1, SFLOAT),
            Format::Rg16Float => attribs(32, 1, 1, 2, SFLOAT),
            Format::Rgba16Unorm => attribs(64, 1, 1, 4, UNORM),
            Format::Rgba16Float => attribs(64, 1, 1, 4, SFLOAT),

            Format::R32Uint => attribs(32, 1, 1, 1, UINT),
            Format::R32Sint => attribs(32, 1, 1, 1, SINT),
            Format::R32Float => attribs(32, 1, 1, 1, SFLOAT),
            Format::Rg32Float => attribs(64, 1, 1, 2, SFLOAT),
            Format::Rgb32Float => attribs(96, 1, 1, 3, SFLOAT),
            Format::Rgba32Uint => attribs(128, 1, 1, 4, UINT),
            Format::Rgba32Float => attribs(128, 1, 1, 4, SFLOAT),

            Format::Rgb10A2Unorm => attribs(32, 1, 1, 4, UNORM.union(FormatFlags::PACKED)),
            Format::Rg11B10Float => attribs(32, 1, 1, 3, FormatFlags::COLOR.union(FormatFlags::FLOAT).union(FormatFlags::PACKED)),

            Format::D16Unorm => attribs(16, 1, 1, 1, FormatFlags::DEPTH.union(FormatFlags::NORMALIZED)),
            Format::D24UnormS8Uint => attribs(32, 1, 1, 2, FormatFlags::DEPTH.union(FormatFlags::STENCIL).union(FormatFlags::NORMALIZED)),
            Format::D32Float => attribs(32, 1, 1, 1, FormatFlags::DEPTH.union(FormatFlags::FLOAT)),
            Format::D32FloatS8X24Uint => attribs(64, 1, 1, 2, FormatFlags::DEPTH.union(FormatFlags::STENCIL).union(FormatFlags::FLOAT)),

            Format::Bc1Unorm => attribs(64, 4, 4, 4, BC),
            Format::Bc1UnormSrgb => attribs(64, 4, 4, 4, BC.union(FormatFlags::SRGB)),
            Format::Bc2Unorm => attribs(128, 4, 4, 4, BC),
            Format::Bc3Unorm => attribs(128, 4, 4, 4, BC),
            Format::Bc4Unorm => attribs(64, 4, 4, 1, BC),
            Format::Bc5Unorm => attribs(128, 4, 4, 2, BC),
        }
    }

    pub const fn bit_size(self) -> u32 {
        self.attributes().bit_size
    }

    pub fn flags(self) -> FormatFlags {
        self.attributes().flags
    }

    pub fn is_color(self) -> bool {
        self.flags().contains(FormatFlags::COLOR)
    }

    pub fn is_depth(self) -> bool {
        self.flags().contains(FormatFlags::DEPTH)
    }

    pub fn is_stencil(self) -> bool {
        self.flags().contains(FormatFlags::STENCIL)
    }

    pub fn is_depth_or_stencil(self) -> bool {
        self.flags().intersects(FormatFlags::DEPTH | FormatFlags::STENCIL)
    }

    pub fn is_compressed(self) -> bool {
        self.flags().contains(FormatFlags::COMPRESSED)
    }

    pub fn is_integer(self) -> bool {
        self.flags().contains(FormatFlags::INTEGER)
    }

    pub fn is_srgb(self) -> bool {
        self.flags().contains(FormatFlags::SRGB)
    }

    /// R16Uint and R32Uint are the only valid index formats
    pub fn is_index_format(self) -> bool {
        matches!(self, Format::R16Uint | Format::R32Uint)
    }

    /// Bytes per texel for uncompressed formats, 0 for compressed/undefined
    pub fn bytes_per_texel(self) -> u32 {
        let attribs = self.attributes();
        if attribs.flags.contains(FormatFlags::COMPRESSED) {
            0
        } else {
            attribs.bit_size / 8
        }
    }

    /// Depth bits and stencil bits of a depth-stencil format
    pub fn depth_stencil_bits(self) -> (u32, u32) {
        match self {
            Format::D16Unorm => (16, 0),
            Format::D24UnormS8Uint => (24, 8),
            Format::D32Float => (32, 0),
            Format::D32FloatS8X24Uint => (32, 8),
            _ => (0, 0),
        }
    }
}

/// Memory footprint in bytes of `num_texels` texels in the given format
///
/// Compressed formats are counted per block; the texel count is expected to
/// cover whole blocks.
pub fn format_memory_footprint(format: Format, num_texels: u64) -> u64 {
    let attribs = format.attributes();
    if attribs.bit_size == 0 {
        return 0;
    }
    if attribs.flags.contains(FormatFlags::COMPRESSED) {
        let block_texels = (attribs.block_width * attribs.block_height) as u64;
        (num_texels / block_texels) * attribs.bit_size as u64 / 8
    } else {
        num_texels * attribs.bit_size as u64 / 8
    }
}

/// Picks the color format that best matches the requested bit depth
///
/// 32 bits and below map to BGRA8 (the usual swap-chain format), more than 32
/// bits to RGBA16 float.
pub fn find_swap_chain_color_format(color_bits: u32) -> Format {
    if color_bits > 32 {
        Format::Rgba16Float
    } else {
        Format::Bgra8Unorm
    }
}

/// Picks the depth-stencil format for the requested bit counts
///
/// Returns `Undefined` when neither depth nor stencil bits are requested.
pub fn find_depth_stencil_format(depth_bits: u32, stencil_bits: u32) -> Format {
    match (depth_bits, stencil_bits) {
        (0, 0) => Format::Undefined,
        (d, 0) if d <= 16 => Format::D16Unorm,
        (d, 0) if d <= 24 => Format::D24UnormS8Uint,
        (_, 0) => Format::D32Float,
        (d, _) if d <= 24 => Format::D24UnormS8Uint,
        _ => Format::D32FloatS8X24Uint,
    }
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
