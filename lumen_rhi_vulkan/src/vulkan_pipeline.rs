/// Pipelines - pipeline layouts, pipeline caches and pipeline states
///
/// A pipeline layout has two descriptor sets. Set 0 holds the heap bindings
/// and is filled from resource heaps; set 1 holds the individually bound
/// resources plus the immutable static samplers. Binding numbers are the
/// slots of the layout descriptor. All uniforms share one push-constant
/// range visible to every stage.

use std::sync::Arc;

use ash::vk;
use lumen_rhi::lumen::render::{
    BindFlags, BindingDescriptor, ComputePipelineDescriptor, GraphicsPipelineDescriptor, PipelineKind,
    PipelineLayoutDescriptor, PrimitiveTopology, Report, ResourceType, StencilFaceDescriptor, VertexAttribute,
};
use lumen_rhi::lumen::Result;
use lumen_rhi::{lumen_invalid, lumen_warn};

use crate::vulkan_context::{map_vk_error, GpuContext, SOURCE};
use crate::vulkan_format::{
    blend_factor_to_vk, blend_op_to_vk, color_mask_to_vk, compare_op_to_vk, cull_mode_to_vk, format_to_vk,
    polygon_mode_to_vk, sample_count_to_vk, scissor_to_vk, stage_flags_to_vk, stencil_op_to_vk, topology_to_vk,
    viewport_to_vk,
};
use crate::vulkan_sampler::create_vk_sampler;
use crate::vulkan_shader::VulkanShader;

/// Descriptor set filled from resource heaps
pub(crate) const HEAP_SET: u32 = 0;
/// Descriptor set for `set_resource` bindings and static samplers
pub(crate) const DYNAMIC_SET: u32 = 1;

// ============================================================================
// DESCRIPTOR SET LAYOUT ENTRIES
// ============================================================================

/// One binding of a descriptor set layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SetEntry {
    pub slot: u32,
    pub descriptor_type: vk::DescriptorType,
    pub count: u32,
    pub stages: vk::ShaderStageFlags,
    /// Index into the layout's static samplers
    pub static_sampler: Option<usize>,
}

/// Vulkan descriptor type for a binding
pub(crate) fn descriptor_type(binding: &BindingDescriptor) -> vk::DescriptorType {
    let storage = binding.bind_flags.contains(BindFlags::STORAGE);
    match binding.resource_type {
        ResourceType::Buffer if storage => vk::DescriptorType::STORAGE_BUFFER,
        ResourceType::Buffer => vk::DescriptorType::UNIFORM_BUFFER,
        ResourceType::Texture if storage => vk::DescriptorType::STORAGE_IMAGE,
        ResourceType::Texture => vk::DescriptorType::SAMPLED_IMAGE,
        ResourceType::Sampler => vk::DescriptorType::SAMPLER,
    }
}

fn stages_or_all(flags: vk::ShaderStageFlags) -> vk::ShaderStageFlags {
    if flags.is_empty() {
        vk::ShaderStageFlags::ALL
    } else {
        flags
    }
}

fn binding_entry(binding: &BindingDescriptor) -> SetEntry {
    SetEntry {
        slot: binding.slot,
        descriptor_type: descriptor_type(binding),
        count: binding.array_size.max(1),
        stages: stages_or_all(stage_flags_to_vk(binding.stage_flags)),
        static_sampler: None,
    }
}

fn check_unique_slots(entries: &[SetEntry], set: u32) -> Result<()> {
    for (i, entry) in entries.iter().enumerate() {
        if entries[..i].iter().any(|other| other.slot == entry.slot) {
            return Err(lumen_invalid!(
                SOURCE,
                "slot {} is used twice in descriptor set {}",
                entry.slot, set
            ));
        }
    }
    Ok(())
}

/// Entries of the heap set (set 0)
pub(crate) fn heap_set_entries(desc: &PipelineLayoutDescriptor) -> Result<Vec<SetEntry>> {
    let entries: Vec<SetEntry> = desc.heap_bindings.iter().map(binding_entry).collect();
    check_unique_slots(&entries, HEAP_SET)?;
    Ok(entries)
}

/// Entries of the dynamic set (set 1): bindings first, then static samplers
pub(crate) fn dynamic_set_entries(desc: &PipelineLayoutDescriptor) -> Result<Vec<SetEntry>> {
    let mut entries: Vec<SetEntry> = desc.bindings.iter().map(binding_entry).collect();
    entries.extend(desc.static_samplers.iter().enumerate().map(|(index, sampler)| SetEntry {
        slot: sampler.slot,
        descriptor_type: vk::DescriptorType::SAMPLER,
        count: 1,
        stages: stages_or_all(stage_flags_to_vk(sampler.stage_flags)),
        static_sampler: Some(index),
    }));
    check_unique_slots(&entries, DYNAMIC_SET)?;
    Ok(entries)
}

/// Pool sizes for `num_sets` copies of a set layout
pub(crate) fn pool_sizes(entries: &[SetEntry], num_sets: u32) -> Vec<vk::DescriptorPoolSize> {
    let mut sizes: Vec<vk::DescriptorPoolSize> = Vec::new();
    for entry in entries {
        let count = entry.count * num_sets;
        match sizes.iter_mut().find(|size| size.ty == entry.descriptor_type) {
            Some(size) => size.descriptor_count += count,
            None => sizes.push(vk::DescriptorPoolSize {
                ty: entry.descriptor_type,
                descriptor_count: count,
            }),
        }
    }
    sizes
}

// ============================================================================
// PIPELINE LAYOUT
// ============================================================================

/// Native layout objects, shared with the pipelines and heaps built on them
pub(crate) struct NativeLayout {
    ctx: Arc<GpuContext>,
    pub layout: vk::PipelineLayout,
    pub set_layouts: [vk::DescriptorSetLayout; 2],
    pub heap_entries: Vec<SetEntry>,
    pub dynamic_entries: Vec<SetEntry>,
    static_samplers: Vec<vk::Sampler>,
    pub push_constant_size: u32,
}

impl NativeLayout {
    fn new(ctx: &Arc<GpuContext>, desc: &PipelineLayoutDescriptor) -> Result<Self> {
        let heap_entries = heap_set_entries(desc)?;
        let dynamic_entries = dynamic_set_entries(desc)?;

        let mut layout = Self {
            ctx: Arc::clone(ctx),
            layout: vk::PipelineLayout::null(),
            set_layouts: [vk::DescriptorSetLayout::null(); 2],
            heap_entries,
            dynamic_entries,
            static_samplers: Vec::with_capacity(desc.static_samplers.len()),
            push_constant_size: desc.uniforms_size(),
        };
        // Drop releases whatever was created if a later step fails
        for sampler in &desc.static_samplers {
            let sampler = create_vk_sampler(ctx, &sampler.sampler)?;
            layout.static_samplers.push(sampler);
        }
        layout.set_layouts[HEAP_SET as usize] = layout.create_set_layout(&layout.heap_entries)?;
        layout.set_layouts[DYNAMIC_SET as usize] = layout.create_set_layout(&layout.dynamic_entries)?;

        let push_constant_ranges = [vk::PushConstantRange {
            stage_flags: vk::ShaderStageFlags::ALL,
            offset: 0,
            size: layout.push_constant_size,
        }];
        let mut info = vk::PipelineLayoutCreateInfo::default().set_layouts(&layout.set_layouts);
        if layout.push_constant_size > 0 {
            info = info.push_constant_ranges(&push_constant_ranges);
        }
        layout.layout = unsafe { ctx.device.create_pipeline_layout(&info, None) }
            .map_err(|e| map_vk_error("vkCreatePipelineLayout", e))?;
        Ok(layout)
    }

    /// Layout with two empty sets and no push constants
    pub fn empty(ctx: &Arc<GpuContext>) -> Result<Self> {
        Self::new(ctx, &PipelineLayoutDescriptor::default())
    }

    fn create_set_layout(&self, entries: &[SetEntry]) -> Result<vk::DescriptorSetLayout> {
        let bindings: Vec<vk::DescriptorSetLayoutBinding> = entries
            .iter()
            .map(|entry| {
                let binding = vk::DescriptorSetLayoutBinding::default()
                    .binding(entry.slot)
                    .descriptor_type(entry.descriptor_type)
                    .descriptor_count(entry.count)
                    .stage_flags(entry.stages);
                match entry.static_sampler {
                    Some(index) => binding.immutable_samplers(std::slice::from_ref(&self.static_samplers[index])),
                    None => binding,
                }
            })
            .collect();
        let info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        unsafe { self.ctx.device.create_descriptor_set_layout(&info, None) }
            .map_err(|e| map_vk_error("vkCreateDescriptorSetLayout", e))
    }
}

impl Drop for NativeLayout {
    fn drop(&mut self) {
        unsafe {
            if self.layout != vk::PipelineLayout::null() {
                self.ctx.device.destroy_pipeline_layout(self.layout, None);
            }
            for set_layout in self.set_layouts {
                if set_layout != vk::DescriptorSetLayout::null() {
                    self.ctx.device.destroy_descriptor_set_layout(set_layout, None);
                }
            }
            for sampler in self.static_samplers.drain(..) {
                self.ctx.device.destroy_sampler(sampler, None);
            }
        }
    }
}

/// Vulkan pipeline layout
pub struct VulkanPipelineLayout {
    pub(crate) native: Arc<NativeLayout>,
    pub(crate) desc: PipelineLayoutDescriptor,
}

impl VulkanPipelineLayout {
    pub fn new(ctx: &Arc<GpuContext>, desc: &PipelineLayoutDescriptor) -> Result<Self> {
        let native = NativeLayout::new(ctx, desc)?;
        if let Some(name) = &desc.debug_name {
            ctx.set_object_name(native.layout, name);
        }
        Ok(Self {
            native: Arc::new(native),
            desc: desc.clone(),
        })
    }
}

// ============================================================================
// PIPELINE CACHE
// ============================================================================

/// Vulkan pipeline cache
pub struct VulkanPipelineCache {
    ctx: Arc<GpuContext>,
    pub(crate) cache: vk::PipelineCache,
    pub(crate) debug_name: Option<String>,
    pub(crate) num_pipelines: u32,
}

impl VulkanPipelineCache {
    /// Create a cache, seeding it with a blob from a previous run
    ///
    /// A blob the driver rejects is dropped with a warning.
    pub fn new(ctx: &Arc<GpuContext>, initial_blob: &[u8]) -> Result<Self> {
        let seeded = vk::PipelineCacheCreateInfo::default().initial_data(initial_blob);
        let cache = match unsafe { ctx.device.create_pipeline_cache(&seeded, None) } {
            Ok(cache) => cache,
            Err(e) if !initial_blob.is_empty() => {
                lumen_warn!(SOURCE, "pipeline cache blob rejected ({:?}); starting with an empty cache", e);
                unsafe { ctx.device.create_pipeline_cache(&vk::PipelineCacheCreateInfo::default(), None) }
                    .map_err(|e| map_vk_error("vkCreatePipelineCache", e))?
            }
            Err(e) => return Err(map_vk_error("vkCreatePipelineCache", e)),
        };
        Ok(Self {
            ctx: Arc::clone(ctx),
            cache,
            debug_name: None,
            num_pipelines: 0,
        })
    }

    /// Serialized cache contents
    pub fn blob(&self) -> Result<Vec<u8>> {
        unsafe { self.ctx.device.get_pipeline_cache_data(self.cache) }
            .map_err(|e| map_vk_error("vkGetPipelineCacheData", e))
    }
}

impl Drop for VulkanPipelineCache {
    fn drop(&mut self) {
        unsafe { self.ctx.device.destroy_pipeline_cache(self.cache, None) };
    }
}

// ============================================================================
// PIPELINE STATE
// ============================================================================

/// Vertex bindings (one per buffer slot) and attributes of a vertex shader
pub(crate) fn vertex_input(
    attributes: &[VertexAttribute],
    report: &mut Report,
) -> (Vec<vk::VertexInputBindingDescription>, Vec<vk::VertexInputAttributeDescription>) {
    let mut bindings: Vec<vk::VertexInputBindingDescription> = Vec::new();
    for attribute in attributes {
        if attribute.instance_divisor > 1 {
            report.warning(format!(
                "instance divisor {} of '{}' is not supported, stepping every instance",
                attribute.instance_divisor, attribute.name
            ));
        }
        let input_rate = if attribute.instance_divisor > 0 {
            vk::VertexInputRate::INSTANCE
        } else {
            vk::VertexInputRate::VERTEX
        };
        match bindings.iter().find(|b| b.binding == attribute.slot) {
            Some(existing) if existing.stride != attribute.stride || existing.input_rate != input_rate => {
                report.error(format!(
                    "attribute '{}' disagrees with other attributes of slot {} on stride or step rate",
                    attribute.name, attribute.slot
                ));
            }
            Some(_) => {}
            None => bindings.push(vk::VertexInputBindingDescription {
                binding: attribute.slot,
                stride: attribute.stride,
                input_rate,
            }),
        }
    }
    bindings.sort_by_key(|b| b.binding);

    let attributes = attributes
        .iter()
        .map(|attribute| vk::VertexInputAttributeDescription {
            location: attribute.location,
            binding: attribute.slot,
            format: format_to_vk(attribute.format),
            offset: attribute.offset,
        })
        .collect();
    (bindings, attributes)
}

fn stencil_face(face: &StencilFaceDescriptor) -> vk::StencilOpState {
    vk::StencilOpState {
        fail_op: stencil_op_to_vk(face.stencil_fail_op),
        pass_op: stencil_op_to_vk(face.depth_pass_op),
        depth_fail_op: stencil_op_to_vk(face.depth_fail_op),
        compare_op: compare_op_to_vk(face.compare_op),
        compare_mask: face.read_mask,
        write_mask: face.write_mask,
        reference: face.reference,
    }
}

pub(crate) fn dynamic_states(desc: &GraphicsPipelineDescriptor) -> Vec<vk::DynamicState> {
    let mut states = vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    if desc.blend.blend_factor_dynamic {
        states.push(vk::DynamicState::BLEND_CONSTANTS);
    }
    if desc.stencil.reference_dynamic {
        states.push(vk::DynamicState::STENCIL_REFERENCE);
    }
    states
}

/// Everything a graphics pipeline is built from, resolved by the render system
pub(crate) struct GraphicsPipelineInputs<'a> {
    pub desc: &'a GraphicsPipelineDescriptor,
    pub layout: Arc<NativeLayout>,
    pub render_pass: vk::RenderPass,
    pub num_color_attachments: u32,
    /// Shaders in pipeline stage order
    pub shaders: Vec<&'a VulkanShader>,
    pub samples: u32,
    pub cache: vk::PipelineCache,
}

/// Vulkan graphics or compute pipeline
pub struct VulkanPipelineState {
    ctx: Arc<GpuContext>,
    /// Null when the pipeline has errors
    pub(crate) pipeline: vk::Pipeline,
    pub(crate) kind: PipelineKind,
    pub(crate) layout: Arc<NativeLayout>,
    pub(crate) debug_name: Option<String>,
    pub(crate) samples: u32,
    pub(crate) report: Report,
    /// Viewports and scissors applied when the pipeline is bound
    pub(crate) static_viewports: Vec<vk::Viewport>,
    pub(crate) static_scissors: Vec<vk::Rect2D>,
}

impl VulkanPipelineState {
    fn build(
        ctx: &Arc<GpuContext>,
        kind: PipelineKind,
        layout: Arc<NativeLayout>,
        debug_name: Option<String>,
        samples: u32,
        report: Report,
    ) -> Self {
        Self {
            ctx: Arc::clone(ctx),
            pipeline: vk::Pipeline::null(),
            kind,
            layout,
            debug_name,
            samples,
            report,
            static_viewports: Vec::new(),
            static_scissors: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.pipeline != vk::Pipeline::null()
    }

    pub(crate) fn bind_point(&self) -> vk::PipelineBindPoint {
        match self.kind {
            PipelineKind::Graphics => vk::PipelineBindPoint::GRAPHICS,
            PipelineKind::Compute => vk::PipelineBindPoint::COMPUTE,
        }
    }

    /// Build a graphics pipeline; failures are recorded in the report
    pub(crate) fn new_graphics(ctx: &Arc<GpuContext>, inputs: GraphicsPipelineInputs<'_>, report: Report) -> Self {
        let desc = inputs.desc;
        let mut this = Self::build(
            ctx,
            PipelineKind::Graphics,
            Arc::clone(&inputs.layout),
            desc.debug_name.clone(),
            inputs.samples,
            report,
        );
        this.static_viewports = desc.viewports.iter().map(viewport_to_vk).collect();
        this.static_scissors = desc.scissors.iter().map(scissor_to_vk).collect();
        if this.report.has_errors() {
            return this;
        }

        let vertex_attributes = inputs
            .shaders
            .iter()
            .find(|shader| shader.stage == vk::ShaderStageFlags::VERTEX)
            .map(|shader| shader.desc.vertex_attributes.as_slice())
            .unwrap_or(&[]);
        let (vertex_bindings, vertex_attributes) = vertex_input(vertex_attributes, &mut this.report);

        let caps = ctx.capabilities;
        let rasterizer = &desc.rasterizer;
        if rasterizer.depth_clamp_enabled && !caps.depth_clamp {
            this.report.warning("depth clamp is not supported by the device");
        }
        if rasterizer.polygon_mode != Default::default() && !caps.fill_mode_non_solid {
            this.report.warning("non-solid fill modes are not supported by the device");
        }
        let line_width = if rasterizer.line_width != 1.0 && !caps.wide_lines {
            this.report.warning("wide lines are not supported by the device");
            1.0
        } else {
            rasterizer.line_width
        };
        if this.report.has_errors() {
            return this;
        }

        let stages: Vec<vk::PipelineShaderStageCreateInfo> = inputs
            .shaders
            .iter()
            .map(|shader| {
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(shader.stage)
                    .module(shader.module)
                    .name(&shader.entry_point)
            })
            .collect();

        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(topology_to_vk(desc.primitive_topology))
            .primitive_restart_enable(false);

        let patch_points = match desc.primitive_topology {
            PrimitiveTopology::Patches(points) => points,
            _ => 0,
        };
        let tessellation_state = vk::PipelineTessellationStateCreateInfo::default().patch_control_points(patch_points);

        // Viewports and scissors are dynamic; static ones are set at bind time
        let viewport_count = (desc.viewports.len() as u32).max(1);
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(viewport_count)
            .scissor_count(viewport_count);

        let depth_bias = rasterizer.depth_bias_constant != 0.0 || rasterizer.depth_bias_slope != 0.0;
        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(rasterizer.depth_clamp_enabled && caps.depth_clamp)
            .rasterizer_discard_enable(false)
            .polygon_mode(if caps.fill_mode_non_solid {
                polygon_mode_to_vk(rasterizer.polygon_mode)
            } else {
                vk::PolygonMode::FILL
            })
            .line_width(line_width)
            .cull_mode(cull_mode_to_vk(rasterizer.cull_mode))
            .front_face(if rasterizer.front_ccw {
                vk::FrontFace::COUNTER_CLOCKWISE
            } else {
                vk::FrontFace::CLOCKWISE
            })
            .depth_bias_enable(depth_bias)
            .depth_bias_constant_factor(rasterizer.depth_bias_constant)
            .depth_bias_slope_factor(rasterizer.depth_bias_slope);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(sample_count_to_vk(inputs.samples))
            .alpha_to_coverage_enable(desc.blend.alpha_to_coverage_enabled);

        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(desc.depth.test_enabled)
            .depth_write_enable(desc.depth.write_enabled)
            .depth_compare_op(compare_op_to_vk(desc.depth.compare_op))
            .depth_bounds_test_enable(false)
            .stencil_test_enable(desc.stencil.test_enabled)
            .front(stencil_face(&desc.stencil.front))
            .back(stencil_face(&desc.stencil.back));

        // One blend state per color attachment; the first target covers the rest
        let blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = (0..inputs.num_color_attachments as usize)
            .map(|index| {
                let target = desc
                    .blend
                    .targets
                    .get(index)
                    .or(desc.blend.targets.first())
                    .copied()
                    .unwrap_or_default();
                vk::PipelineColorBlendAttachmentState::default()
                    .blend_enable(target.blend_enabled)
                    .src_color_blend_factor(blend_factor_to_vk(target.src_color))
                    .dst_color_blend_factor(blend_factor_to_vk(target.dst_color))
                    .color_blend_op(blend_op_to_vk(target.color_op))
                    .src_alpha_blend_factor(blend_factor_to_vk(target.src_alpha))
                    .dst_alpha_blend_factor(blend_factor_to_vk(target.dst_alpha))
                    .alpha_blend_op(blend_op_to_vk(target.alpha_op))
                    .color_write_mask(color_mask_to_vk(target.color_mask))
            })
            .collect();
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&blend_attachments)
            .blend_constants(desc.blend.blend_factor);

        let dynamic_states = dynamic_states(desc);
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let mut create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .depth_stencil_state(&depth_stencil_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(inputs.layout.layout)
            .render_pass(inputs.render_pass)
            .subpass(0);
        if patch_points > 0 {
            create_info = create_info.tessellation_state(&tessellation_state);
        }

        let result = unsafe { ctx.device.create_graphics_pipelines(inputs.cache, &[create_info], None) };
        this.pipeline = this.take_pipeline(result, "vkCreateGraphicsPipelines");
        this
    }

    /// Build a compute pipeline; failures are recorded in the report
    pub(crate) fn new_compute(
        ctx: &Arc<GpuContext>,
        desc: &ComputePipelineDescriptor,
        layout: Arc<NativeLayout>,
        shader: Option<&VulkanShader>,
        cache: vk::PipelineCache,
        report: Report,
    ) -> Self {
        let mut this = Self::build(ctx, PipelineKind::Compute, layout, desc.debug_name.clone(), 1, report);
        let Some(shader) = shader.filter(|_| !this.report.has_errors()) else {
            return this;
        };
        let stage = vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::COMPUTE)
            .module(shader.module)
            .name(&shader.entry_point);
        let create_info = vk::ComputePipelineCreateInfo::default()
            .stage(stage)
            .layout(this.layout.layout);
        let result = unsafe { ctx.device.create_compute_pipelines(cache, &[create_info], None) };
        this.pipeline = this.take_pipeline(result, "vkCreateComputePipelines");
        this
    }

    fn take_pipeline(
        &mut self,
        result: std::result::Result<Vec<vk::Pipeline>, (Vec<vk::Pipeline>, vk::Result)>,
        call: &str,
    ) -> vk::Pipeline {
        match result {
            Ok(pipelines) => {
                let pipeline = pipelines.first().copied().unwrap_or_default();
                if let Some(name) = &self.debug_name {
                    self.ctx.set_object_name(pipeline, name);
                }
                pipeline
            }
            Err((_, e)) => {
                self.report.error(format!("{} failed: {:?}", call, e));
                vk::Pipeline::null()
            }
        }
    }
}

impl Drop for VulkanPipelineState {
    fn drop(&mut self) {
        if self.pipeline != vk::Pipeline::null() {
            unsafe { self.ctx.device.destroy_pipeline(self.pipeline, None) };
        }
    }
}

#[cfg(test)]
#[path = "vulkan_pipeline_tests.rs"]
mod tests;
