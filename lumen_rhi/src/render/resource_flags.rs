/// Bind, CPU-access and miscellaneous flags shared by buffers and textures

bitflags::bitflags! {
    /// How a resource may be bound to the pipeline or used by copy commands
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BindFlags: u32 {
        const VERTEX_BUFFER            = 1 << 0;
        const INDEX_BUFFER             = 1 << 1;
        const CONSTANT_BUFFER          = 1 << 2;
        const STORAGE                  = 1 << 3;
        const SAMPLED                  = 1 << 4;
        const COPY_SRC                 = 1 << 5;
        const COPY_DST                 = 1 << 6;
        const COLOR_ATTACHMENT         = 1 << 7;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 8;
        const INDIRECT_BUFFER          = 1 << 9;
    }
}

bitflags::bitflags! {
    /// CPU access allowed through map/read/write
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CpuAccessFlags: u32 {
        const READ  = 1 << 0;
        const WRITE = 1 << 1;
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

bitflags::bitflags! {
    /// Miscellaneous creation flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MiscFlags: u32 {
        /// Skip zero-initialization when no initial data is given
        const NO_INITIAL_DATA = 1 << 0;
        /// Generate the MIP chain after the initial upload
        const GENERATE_MIPS   = 1 << 1;
    }
}

bitflags::bitflags! {
    /// Shader stages that can see a binding
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StageFlags: u32 {
        const VERTEX          = 1 << 0;
        const TESS_CONTROL    = 1 << 1;
        const TESS_EVALUATION = 1 << 2;
        const GEOMETRY        = 1 << 3;
        const FRAGMENT        = 1 << 4;
        const COMPUTE         = 1 << 5;
        const ALL_GRAPHICS = Self::VERTEX.bits()
            | Self::TESS_CONTROL.bits()
            | Self::TESS_EVALUATION.bits()
            | Self::GEOMETRY.bits()
            | Self::FRAGMENT.bits();
        const ALL = Self::ALL_GRAPHICS.bits() | Self::COMPUTE.bits();
    }
}

/// Access mode of a buffer mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CpuAccess {
    /// Read only; writes through the mapping are refused
    ReadOnly,
    /// Write only; previous contents are kept
    WriteOnly,
    /// Write only; previous contents are undefined after mapping
    WriteDiscard,
    /// Read and write
    ReadWrite,
}

impl CpuAccess {
    pub fn can_read(self) -> bool {
        matches!(self, CpuAccess::ReadOnly | CpuAccess::ReadWrite)
    }

    pub fn can_write(self) -> bool {
        !matches!(self, CpuAccess::ReadOnly)
    }

    /// CPU access flags a resource needs to be mapped with this access
    pub fn required_flags(self) -> CpuAccessFlags {
        match self {
            CpuAccess::ReadOnly => CpuAccessFlags::READ,
            CpuAccess::WriteOnly | CpuAccess::WriteDiscard => CpuAccessFlags::WRITE,
            CpuAccess::ReadWrite => CpuAccessFlags::READ_WRITE,
        }
    }
}
