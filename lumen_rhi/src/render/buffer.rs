/// Buffer descriptor and creation-time validation

use crate::error::Result;
use crate::format::Format;
use crate::render::{BindFlags, CpuAccessFlags, MiscFlags, RenderingLimits};

/// Size value meaning "up to the end of the buffer"
pub const WHOLE_SIZE: u64 = u64::MAX;

/// Descriptor for creating a buffer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BufferDescriptor {
    pub debug_name: Option<String>,
    /// Size in bytes
    pub size: u64,
    /// Element stride for structured storage buffers, 0 otherwise
    pub stride: u32,
    /// Index format for index buffers, element format for typed buffers
    pub format: Format,
    pub bind_flags: BindFlags,
    pub cpu_access_flags: CpuAccessFlags,
    pub misc_flags: MiscFlags,
}

const SOURCE: &str = "lumen::RenderSystem";

/// Validate a buffer descriptor against the device limits
///
/// # Errors
///
/// `InvalidArgument` when the size is zero or too large, when constant and
/// storage usage are combined, when an index buffer has no index format, or
/// when the initial data is larger than the buffer.
pub fn validate_buffer_descriptor(
    desc: &BufferDescriptor,
    initial_data: Option<&[u8]>,
    limits: &RenderingLimits,
) -> Result<()> {
    if desc.size == 0 {
        return Err(crate::lumen_invalid!(SOURCE, "buffer size must be non-zero"));
    }
    if desc.size > limits.max_buffer_size {
        return Err(crate::lumen_invalid!(
            SOURCE,
            "buffer size {} exceeds device limit {}",
            desc.size, limits.max_buffer_size
        ));
    }
    if desc.bind_flags.contains(BindFlags::CONSTANT_BUFFER | BindFlags::STORAGE) {
        return Err(crate::lumen_invalid!(SOURCE, "buffer cannot be both a constant buffer and a storage buffer"));
    }
    if desc.bind_flags.contains(BindFlags::CONSTANT_BUFFER) && desc.size > limits.max_constant_buffer_size {
        return Err(crate::lumen_invalid!(
            SOURCE,
            "constant buffer size {} exceeds device limit {}",
            desc.size, limits.max_constant_buffer_size
        ));
    }
    if desc.bind_flags.contains(BindFlags::INDEX_BUFFER) && !desc.format.is_index_format() {
        return Err(crate::lumen_invalid!(
            SOURCE,
            "index buffer needs R16Uint or R32Uint format (got {:?})",
            desc.format
        ));
    }
    if desc.stride > 0 && desc.size % desc.stride as u64 != 0 {
        return Err(crate::lumen_invalid!(
            SOURCE,
            "buffer size {} is not a multiple of its stride {}",
            desc.size, desc.stride
        ));
    }
    if let Some(data) = initial_data {
        if data.len() as u64 > desc.size {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "initial data ({} bytes) exceeds buffer size {}",
                data.len(), desc.size
            ));
        }
    }
    Ok(())
}

/// Check that `[offset, offset + size)` lies inside a buffer of `buffer_size` bytes
///
/// `size` may be `WHOLE_SIZE`; the resolved size is returned.
pub fn resolve_buffer_range(buffer_size: u64, offset: u64, size: u64) -> Result<u64> {
    if offset > buffer_size {
        return Err(crate::lumen_invalid!(
            SOURCE,
            "buffer offset {} is beyond buffer size {}",
            offset, buffer_size
        ));
    }
    let size = if size == WHOLE_SIZE { buffer_size - offset } else { size };
    match offset.checked_add(size) {
        Some(end) if end <= buffer_size => Ok(size),
        _ => Err(crate::lumen_invalid!(
            SOURCE,
            "buffer range [{}, {}+{}) exceeds buffer size {}",
            offset, offset, size, buffer_size
        )),
    }
}
