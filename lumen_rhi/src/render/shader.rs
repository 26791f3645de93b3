/// Shader descriptor and vertex input layout

use crate::format::Format;
use crate::render::StageFlags;

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderType {
    Vertex,
    TessControl,
    TessEvaluation,
    Geometry,
    Fragment,
    Compute,
}

impl ShaderType {
    pub fn stage_flags(self) -> StageFlags {
        match self {
            ShaderType::Vertex => StageFlags::VERTEX,
            ShaderType::TessControl => StageFlags::TESS_CONTROL,
            ShaderType::TessEvaluation => StageFlags::TESS_EVALUATION,
            ShaderType::Geometry => StageFlags::GEOMETRY,
            ShaderType::Fragment => StageFlags::FRAGMENT,
            ShaderType::Compute => StageFlags::COMPUTE,
        }
    }
}

/// Shader source: high-level code text or a compiled binary (e.g. SPIR-V)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderSource {
    Code(String),
    Binary(Vec<u8>),
}

/// Per-vertex or per-instance input attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    pub name: String,
    pub format: Format,
    pub location: u32,
    /// Byte offset inside a vertex
    pub offset: u32,
    /// Vertex stride of the bound buffer
    pub stride: u32,
    /// Vertex buffer slot
    pub slot: u32,
    /// 0 for per-vertex data, N to advance every N instances
    pub instance_divisor: u32,
}

/// Descriptor for creating a shader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderDescriptor {
    pub debug_name: Option<String>,
    pub shader_type: ShaderType,
    pub source: ShaderSource,
    pub entry_point: String,
    /// Target profile, e.g. "spirv", "460" or "vs_5_0"
    pub profile: String,
    /// Vertex input attributes (vertex shaders only)
    pub vertex_attributes: Vec<VertexAttribute>,
}

impl ShaderDescriptor {
    pub fn new(shader_type: ShaderType, source: ShaderSource, entry_point: &str) -> Self {
        Self {
            debug_name: None,
            shader_type,
            source,
            entry_point: entry_point.to_string(),
            profile: String::new(),
            vertex_attributes: Vec::new(),
        }
    }
}
