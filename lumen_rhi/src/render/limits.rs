/// Device capabilities: rendering limits, renderer info and sample-count negotiation

/// Limits reported by a backend device
#[derive(Debug, Clone, PartialEq)]
pub struct RenderingLimits {
    /// Highest sample count for color attachments and swap chains
    pub max_color_buffer_samples: u32,
    pub max_texture_1d_size: u32,
    pub max_texture_2d_size: u32,
    pub max_texture_3d_size: u32,
    pub max_texture_cube_size: u32,
    pub max_texture_array_layers: u32,
    pub max_color_attachments: u32,
    pub max_viewports: u32,
    pub max_buffer_size: u64,
    pub max_constant_buffer_size: u64,
    pub max_push_constant_size: u32,
    pub max_anisotropy: f32,
    pub max_compute_work_group_count: [u32; 3],
    /// Required alignment of constant buffer offsets
    pub min_constant_buffer_alignment: u64,
}

impl Default for RenderingLimits {
    fn default() -> Self {
        Self {
            max_color_buffer_samples: 8,
            max_texture_1d_size: 16384,
            max_texture_2d_size: 16384,
            max_texture_3d_size: 2048,
            max_texture_cube_size: 16384,
            max_texture_array_layers: 2048,
            max_color_attachments: 8,
            max_viewports: 16,
            max_buffer_size: u32::MAX as u64,
            max_constant_buffer_size: 65536,
            max_push_constant_size: 128,
            max_anisotropy: 16.0,
            max_compute_work_group_count: [65535, 65535, 65535],
            min_constant_buffer_alignment: 256,
        }
    }
}

/// Descriptive information about the active renderer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RendererInfo {
    pub renderer_name: String,
    pub device_name: String,
    pub vendor_name: String,
    pub shading_language_name: String,
    pub extension_names: Vec<String>,
}

/// Clamp a requested sample count to the device maximum
///
/// The result is the largest power of two not above
/// `min(requested, max_samples)`, and at least 1.
pub fn clamp_samples(requested: u32, max_samples: u32) -> u32 {
    let samples = requested.min(max_samples).max(1);
    1 << (31 - samples.leading_zeros())
}
