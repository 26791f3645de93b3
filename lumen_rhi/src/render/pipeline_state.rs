/// Graphics and compute pipeline descriptors and creation-time validation
///
/// Pipeline problems never fail the creation call. They are collected in a
/// [`Report`] that stays attached to the created pipeline state.

use crate::format::Format;
use crate::render::limits::clamp_samples;
use crate::render::{
    CompareOp, PipelineLayoutHandle, RenderPassHandle, RenderingLimits, Report, Scissor, ShaderHandle,
    ShaderType, Viewport,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
    /// Patches with the given number of control points
    Patches(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolygonMode {
    #[default]
    Fill,
    Wireframe,
    Points,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    #[default]
    Disabled,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizerDescriptor {
    pub polygon_mode: PolygonMode,
    pub cull_mode: CullMode,
    pub front_ccw: bool,
    pub depth_clamp_enabled: bool,
    pub depth_bias_constant: f32,
    pub depth_bias_slope: f32,
    pub line_width: f32,
}

impl Default for RasterizerDescriptor {
    fn default() -> Self {
        Self {
            polygon_mode: PolygonMode::Fill,
            cull_mode: CullMode::Disabled,
            front_ccw: false,
            depth_clamp_enabled: false,
            depth_bias_constant: 0.0,
            depth_bias_slope: 0.0,
            line_width: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DepthDescriptor {
    pub test_enabled: bool,
    pub write_enabled: bool,
    pub compare_op: CompareOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StencilOp {
    #[default]
    Keep,
    Zero,
    Replace,
    IncClamp,
    DecClamp,
    Invert,
    IncWrap,
    DecWrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilFaceDescriptor {
    pub stencil_fail_op: StencilOp,
    pub depth_fail_op: StencilOp,
    pub depth_pass_op: StencilOp,
    pub compare_op: CompareOp,
    pub read_mask: u32,
    pub write_mask: u32,
    pub reference: u32,
}

impl Default for StencilFaceDescriptor {
    fn default() -> Self {
        Self {
            stencil_fail_op: StencilOp::Keep,
            depth_fail_op: StencilOp::Keep,
            depth_pass_op: StencilOp::Keep,
            compare_op: CompareOp::Always,
            read_mask: !0,
            write_mask: !0,
            reference: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StencilDescriptor {
    pub test_enabled: bool,
    /// Take the reference value from `set_stencil_reference` instead of the faces
    pub reference_dynamic: bool,
    pub front: StencilFaceDescriptor,
    pub back: StencilFaceDescriptor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendFactor {
    Zero,
    #[default]
    One,
    SrcColor,
    InvSrcColor,
    SrcAlpha,
    InvSrcAlpha,
    DstColor,
    InvDstColor,
    DstAlpha,
    InvDstAlpha,
    BlendFactor,
    InvBlendFactor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendOp {
    #[default]
    Add,
    Subtract,
    RevSubtract,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendTargetDescriptor {
    pub blend_enabled: bool,
    pub src_color: BlendFactor,
    pub dst_color: BlendFactor,
    pub color_op: BlendOp,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub alpha_op: BlendOp,
    /// RGBA write mask, bit 0 = red
    pub color_mask: u8,
}

impl Default for BlendTargetDescriptor {
    fn default() -> Self {
        Self {
            blend_enabled: false,
            src_color: BlendFactor::SrcAlpha,
            dst_color: BlendFactor::InvSrcAlpha,
            color_op: BlendOp::Add,
            src_alpha: BlendFactor::SrcAlpha,
            dst_alpha: BlendFactor::InvSrcAlpha,
            alpha_op: BlendOp::Add,
            color_mask: 0xF,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlendDescriptor {
    pub alpha_to_coverage_enabled: bool,
    pub blend_factor: [f32; 4],
    /// Take the blend factor from `set_blend_factor` instead
    pub blend_factor_dynamic: bool,
    pub targets: Vec<BlendTargetDescriptor>,
}

impl Default for BlendDescriptor {
    fn default() -> Self {
        Self {
            alpha_to_coverage_enabled: false,
            blend_factor: [0.0; 4],
            blend_factor_dynamic: false,
            targets: vec![BlendTargetDescriptor::default()],
        }
    }
}

/// Descriptor for creating a graphics pipeline state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphicsPipelineDescriptor {
    pub debug_name: Option<String>,
    pub pipeline_layout: Option<PipelineLayoutHandle>,
    /// Render pass the pipeline is compatible with; `None` for the swap-chain pass
    pub render_pass: Option<RenderPassHandle>,
    pub vertex_shader: Option<ShaderHandle>,
    pub tess_control_shader: Option<ShaderHandle>,
    pub tess_evaluation_shader: Option<ShaderHandle>,
    pub geometry_shader: Option<ShaderHandle>,
    pub fragment_shader: Option<ShaderHandle>,
    pub index_format: Format,
    pub primitive_topology: PrimitiveTopology,
    /// Static viewports; empty means viewports are set with commands
    pub viewports: Vec<Viewport>,
    pub scissors: Vec<Scissor>,
    pub depth: DepthDescriptor,
    pub stencil: StencilDescriptor,
    pub rasterizer: RasterizerDescriptor,
    pub blend: BlendDescriptor,
    /// Requested samples, clamped to the device
    pub samples: u32,
}

/// Descriptor for creating a compute pipeline state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComputePipelineDescriptor {
    pub debug_name: Option<String>,
    pub pipeline_layout: Option<PipelineLayoutHandle>,
    pub compute_shader: Option<ShaderHandle>,
}

/// Graphics or compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    Graphics,
    Compute,
}

/// What validation needs to know about a referenced shader
#[derive(Debug, Clone)]
pub struct ShaderInfo {
    pub shader_type: ShaderType,
    pub report: Report,
}

fn check_stage(
    report: &mut Report,
    lookup: &dyn Fn(ShaderHandle) -> Option<ShaderInfo>,
    shader: Option<ShaderHandle>,
    expected: ShaderType,
    stage_name: &str,
) {
    let Some(handle) = shader else {
        return;
    };
    match lookup(handle) {
        None => report.error(format!("{} shader handle is not alive", stage_name)),
        Some(info) if info.shader_type != expected => report.error(format!(
            "{} shader slot holds a {:?} shader",
            stage_name, info.shader_type
        )),
        Some(info) => {
            if info.report.has_errors() {
                report.error(format!("{} shader failed to compile", stage_name));
            }
            report.merge(&format!("{} shader: ", stage_name), &info.report);
        }
    }
}

/// Validate a graphics pipeline and return its report and effective sample count
///
/// Stops at the first stage group that reports errors, like a linker that
/// gives up once a stage failed.
pub fn validate_graphics_pipeline(
    desc: &GraphicsPipelineDescriptor,
    limits: &RenderingLimits,
    lookup: &dyn Fn(ShaderHandle) -> Option<ShaderInfo>,
) -> (Report, u32) {
    let mut report = Report::new();

    let samples = clamp_samples(desc.samples.max(1), limits.max_color_buffer_samples);
    if samples != desc.samples.max(1) {
        report.warning(format!("sample count {} clamped to {}", desc.samples, samples));
    }

    if desc.vertex_shader.is_none() {
        report.error("graphics pipeline has no vertex shader");
        return (report, samples);
    }
    check_stage(&mut report, lookup, desc.vertex_shader, ShaderType::Vertex, "vertex");
    check_stage(&mut report, lookup, desc.tess_control_shader, ShaderType::TessControl, "tessellation-control");
    check_stage(&mut report, lookup, desc.tess_evaluation_shader, ShaderType::TessEvaluation, "tessellation-evaluation");
    check_stage(&mut report, lookup, desc.geometry_shader, ShaderType::Geometry, "geometry");
    check_stage(&mut report, lookup, desc.fragment_shader, ShaderType::Fragment, "fragment");
    if report.has_errors() {
        return (report, samples);
    }

    let has_tess = desc.tess_control_shader.is_some() || desc.tess_evaluation_shader.is_some();
    if desc.tess_control_shader.is_some() != desc.tess_evaluation_shader.is_some() {
        report.error("tessellation needs both a control and an evaluation shader");
    }
    match desc.primitive_topology {
        PrimitiveTopology::Patches(0) => report.error("patch topology needs at least one control point"),
        PrimitiveTopology::Patches(_) if !has_tess => {
            report.error("patch topology requires tessellation shaders")
        }
        PrimitiveTopology::Patches(_) => {}
        _ if has_tess => report.error("tessellation shaders require patch topology"),
        _ => {}
    }
    if desc.index_format != Format::Undefined && !desc.index_format.is_index_format() {
        report.error(format!("{:?} is not an index format", desc.index_format));
    }
    if desc.viewports.len() as u32 > limits.max_viewports {
        report.error(format!(
            "{} viewports exceed device limit {}",
            desc.viewports.len(), limits.max_viewports
        ));
    }
    if !desc.scissors.is_empty() && desc.scissors.len() != desc.viewports.len().max(1) {
        report.warning("scissor count differs from viewport count");
    }
    if desc.blend.targets.len() as u32 > limits.max_color_attachments {
        report.error(format!(
            "{} blend targets exceed device limit {}",
            desc.blend.targets.len(), limits.max_color_attachments
        ));
    }
    if desc.fragment_shader.is_none() && !desc.depth.write_enabled {
        report.warning("pipeline has neither a fragment shader nor depth writes");
    }
    if desc.pipeline_layout.is_none() {
        report.info("pipeline has no layout; only vertex inputs are available");
    }
    (report, samples)
}

/// Validate a compute pipeline
pub fn validate_compute_pipeline(
    desc: &ComputePipelineDescriptor,
    lookup: &dyn Fn(ShaderHandle) -> Option<ShaderInfo>,
) -> Report {
    let mut report = Report::new();
    if desc.compute_shader.is_none() {
        report.error("compute pipeline has no compute shader");
        return report;
    }
    check_stage(&mut report, lookup, desc.compute_shader, ShaderType::Compute, "compute");
    report
}
