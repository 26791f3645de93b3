/// Geometry value types shared by every descriptor: extents, offsets,
/// texture regions, viewports and clear values

use std::ops::Sub;

// ===== EXTENTS AND OFFSETS =====

/// 2D extent (width, height)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// 3D extent (width, height, depth)
///
/// A zero extent is the "out of range" sentinel returned by MIP queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent3D {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Extent3D {
    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Self { width, height, depth }
    }

    /// True if any component is zero
    pub fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0 || self.depth == 0
    }

    /// Number of texels covered by this extent
    pub fn volume(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.depth as u64
    }

    pub fn to_2d(&self) -> Extent2D {
        Extent2D::new(self.width, self.height)
    }
}

impl From<Extent2D> for Extent3D {
    fn from(extent: Extent2D) -> Self {
        Extent3D::new(extent.width, extent.height, 1)
    }
}

/// 2D offset, may be negative (window/display coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Offset2D {
    pub x: i32,
    pub y: i32,
}

impl Offset2D {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// 3D offset into a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Offset3D {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Offset3D {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl Sub for Offset3D {
    type Output = Offset3D;

    fn sub(self, rhs: Offset3D) -> Offset3D {
        Offset3D::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

// ===== TEXTURE ADDRESSING =====

/// Range of MIP levels and array layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureSubresource {
    pub base_array_layer: u32,
    pub num_array_layers: u32,
    pub base_mip_level: u32,
    pub num_mip_levels: u32,
}

impl TextureSubresource {
    /// Single layer, single MIP level
    pub const fn single(array_layer: u32, mip_level: u32) -> Self {
        Self {
            base_array_layer: array_layer,
            num_array_layers: 1,
            base_mip_level: mip_level,
            num_mip_levels: 1,
        }
    }

    pub const fn new(base_array_layer: u32, num_array_layers: u32, base_mip_level: u32, num_mip_levels: u32) -> Self {
        Self { base_array_layer, num_array_layers, base_mip_level, num_mip_levels }
    }
}

impl Default for TextureSubresource {
    fn default() -> Self {
        Self::single(0, 0)
    }
}

/// Region of a texture: a subresource plus a texel box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureRegion {
    pub subresource: TextureSubresource,
    pub offset: Offset3D,
    pub extent: Extent3D,
}

impl TextureRegion {
    pub const fn new(offset: Offset3D, extent: Extent3D) -> Self {
        Self { subresource: TextureSubresource::single(0, 0), offset, extent }
    }

    pub const fn with_subresource(subresource: TextureSubresource, offset: Offset3D, extent: Extent3D) -> Self {
        Self { subresource, offset, extent }
    }
}

/// Single texel location (offset, array layer, MIP level)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureLocation {
    pub offset: Offset3D,
    pub array_layer: u32,
    pub mip_level: u32,
}

impl TextureLocation {
    pub const fn new(offset: Offset3D) -> Self {
        Self { offset, array_layer: 0, mip_level: 0 }
    }
}

// ===== RASTER STATE VALUES =====

/// Viewport rectangle with depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height, min_depth: 0.0, max_depth: 1.0 }
    }
}

impl From<Extent2D> for Viewport {
    fn from(extent: Extent2D) -> Self {
        Viewport::new(0.0, 0.0, extent.width as f32, extent.height as f32)
    }
}

/// Scissor rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scissor {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Clear values for color, depth and stencil attachments
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearValue {
    pub color: [f32; 4],
    pub depth: f32,
    pub stencil: u32,
}

impl Default for ClearValue {
    fn default() -> Self {
        Self { color: [0.0, 0.0, 0.0, 0.0], depth: 1.0, stencil: 0 }
    }
}

bitflags::bitflags! {
    /// Attachments affected by a clear command
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClearFlags: u32 {
        const COLOR   = 1 << 0;
        const DEPTH   = 1 << 1;
        const STENCIL = 1 << 2;
        const COLOR_DEPTH = Self::COLOR.bits() | Self::DEPTH.bits();
        const DEPTH_STENCIL = Self::DEPTH.bits() | Self::STENCIL.bits();
        const ALL = Self::COLOR.bits() | Self::DEPTH.bits() | Self::STENCIL.bits();
    }
}

/// Clear command for one attachment inside a render pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachmentClear {
    pub flags: ClearFlags,
    /// Color attachment index (ignored for depth/stencil)
    pub color_attachment: u32,
    pub value: ClearValue,
}
