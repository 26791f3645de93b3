/// Render pass descriptor: attachment formats and load/store operations

use crate::format::Format;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttachmentLoadOp {
    #[default]
    Undefined,
    Load,
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttachmentStoreOp {
    Undefined,
    #[default]
    Store,
}

/// Format and operations of one attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AttachmentFormatDescriptor {
    pub format: Format,
    pub load_op: AttachmentLoadOp,
    pub store_op: AttachmentStoreOp,
}

impl AttachmentFormatDescriptor {
    pub fn new(format: Format, load_op: AttachmentLoadOp, store_op: AttachmentStoreOp) -> Self {
        Self { format, load_op, store_op }
    }
}

/// Descriptor for creating a render pass
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderPassDescriptor {
    pub debug_name: Option<String>,
    pub color_attachments: Vec<AttachmentFormatDescriptor>,
    pub depth_attachment: Option<AttachmentFormatDescriptor>,
    pub stencil_attachment: Option<AttachmentFormatDescriptor>,
    pub samples: u32,
}

impl RenderPassDescriptor {
    /// Number of clear values expected by `begin_render_pass`
    pub fn num_clear_values(&self) -> usize {
        let colors = self
            .color_attachments
            .iter()
            .filter(|a| a.load_op == AttachmentLoadOp::Clear)
            .count();
        let depth_stencil = [self.depth_attachment, self.stencil_attachment]
            .iter()
            .flatten()
            .any(|a| a.load_op == AttachmentLoadOp::Clear);
        colors + usize::from(depth_stencil)
    }
}
