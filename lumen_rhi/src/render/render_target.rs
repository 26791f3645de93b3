/// Render target descriptor and attachment validation

use crate::error::Result;
use crate::format::{mip_extent_for, Format};
use crate::render::{Extent2D, RenderPassHandle, TextureDescriptor, TextureHandle};

/// One render target attachment: a texture view or a texture-less buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentDescriptor {
    /// Texture to render into; `None` creates an internal buffer of `format`
    pub texture: Option<TextureHandle>,
    pub format: Format,
    pub mip_level: u32,
    pub array_layer: u32,
}

impl AttachmentDescriptor {
    pub fn texture(texture: TextureHandle) -> Self {
        Self { texture: Some(texture), format: Format::Undefined, mip_level: 0, array_layer: 0 }
    }

    pub fn format(format: Format) -> Self {
        Self { texture: None, format, mip_level: 0, array_layer: 0 }
    }
}

/// Descriptor for creating a render target
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderTargetDescriptor {
    pub debug_name: Option<String>,
    pub render_pass: Option<RenderPassHandle>,
    pub resolution: Extent2D,
    pub samples: u32,
    pub color_attachments: Vec<AttachmentDescriptor>,
    pub resolve_attachments: Vec<AttachmentDescriptor>,
    pub depth_stencil_attachment: Option<AttachmentDescriptor>,
}

const SOURCE: &str = "lumen::RenderTarget";

/// Validate that an attachment resolution is non-zero and matches the target
pub fn validate_resolution(target: Extent2D, attachment: Extent2D) -> Result<()> {
    if attachment.is_zero() {
        return Err(crate::lumen_invalid!(
            SOURCE,
            "invalid resolution of render target attachment: {}x{}",
            attachment.width, attachment.height
        ));
    }
    if target != attachment {
        return Err(crate::lumen_invalid!(
            SOURCE,
            "resolution mismatch of render target attachment: {}x{} is specified, but expected {}x{}",
            attachment.width, attachment.height, target.width, target.height
        ));
    }
    Ok(())
}

/// Validate a texture attachment: its MIP extent must match the target resolution
pub fn validate_mip_resolution(target: Extent2D, texture: &TextureDescriptor, mip_level: u32) -> Result<()> {
    let extent = mip_extent_for(texture, mip_level);
    validate_resolution(target, extent.to_2d())
}
