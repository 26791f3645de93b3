/// Recording of command buffers into native Vulkan command buffers
///
/// A submission walks the recorded commands twice. The checking pass
/// resolves every handle and range and sizes the per-submission descriptor
/// pool; the recording pass writes a fresh native command buffer. Nothing
/// reaches the queue unless the whole command buffer checks out.
///
/// Transfers, dispatches and MIP generation are followed by a global memory
/// barrier. Swap-chain images rendered into make the submission wait on
/// their acquire semaphore and signal a semaphore the present waits on.

use std::sync::Arc;

use ash::vk;
use lumen_rhi::lumen::format::{texture_region_from_location, Format};
use lumen_rhi::lumen::null::TexelUnit;
use lumen_rhi::lumen::render::*;
use lumen_rhi::lumen::{Error, Result};
use lumen_rhi::{lumen_invalid, lumen_warn};

use crate::vulkan_context::{map_vk_error, GpuContext, SOURCE};
use crate::vulkan_format::{index_type, scissor_to_vk, viewport_to_vk};
use crate::vulkan_objects::VulkanObjects;
use crate::vulkan_pipeline::{pool_sizes, NativeLayout, DYNAMIC_SET, HEAP_SET};
use crate::vulkan_render_pass::{clear_attachments, load_op_clears, record_clears, FramebufferBinding};
use crate::vulkan_resource_heap::{check_descriptor, BoundResource, DescriptorWriter};
use crate::vulkan_texture::{image_barrier, ImageRegion};

fn protocol_error(message: String) -> Error {
    lumen_warn!(SOURCE, "{}", message);
    Error::InvalidState(message)
}

/// Make every earlier write visible to every later command
fn memory_barrier(device: &ash::Device, command_buffer: vk::CommandBuffer) {
    let barrier = vk::MemoryBarrier::default()
        .src_access_mask(vk::AccessFlags::MEMORY_WRITE)
        .dst_access_mask(vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE);
    unsafe {
        device.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::ALL_COMMANDS,
            vk::PipelineStageFlags::ALL_COMMANDS,
            vk::DependencyFlags::empty(),
            &[barrier],
            &[],
            &[],
        );
    }
}

/// Merge `add` into `total`, adding up counts of the same descriptor type
fn merge_pool_sizes(total: &mut Vec<vk::DescriptorPoolSize>, add: &[vk::DescriptorPoolSize]) {
    for size in add {
        match total.iter_mut().find(|t| t.ty == size.ty) {
            Some(t) => t.descriptor_count += size.descriptor_count,
            None => total.push(*size),
        }
    }
}

/// Texels (or blocks) a validated region covers
fn region_volume(region: &ImageRegion) -> u64 {
    region.folded_units.iter().map(|u| *u as u64).product()
}

// ============================================================================
// IN-FLIGHT SUBMISSIONS
// ============================================================================

/// Native objects of one submission, kept until the GPU is done with them
pub(crate) struct InFlight {
    ctx: Arc<GpuContext>,
    fence: vk::Fence,
    command_pool: vk::CommandPool,
    descriptor_pool: vk::DescriptorPool,
    submitted: bool,
}

impl InFlight {
    fn new(ctx: &Arc<GpuContext>) -> Result<Self> {
        let mut in_flight = Self {
            ctx: Arc::clone(ctx),
            fence: vk::Fence::null(),
            command_pool: vk::CommandPool::null(),
            descriptor_pool: vk::DescriptorPool::null(),
            submitted: false,
        };
        let pool_info = vk::CommandPoolCreateInfo::default()
            .flags(vk::CommandPoolCreateFlags::TRANSIENT)
            .queue_family_index(ctx.queue_family);
        in_flight.command_pool = unsafe { ctx.device.create_command_pool(&pool_info, None) }
            .map_err(|e| map_vk_error("vkCreateCommandPool", e))?;
        in_flight.fence = unsafe { ctx.device.create_fence(&vk::FenceCreateInfo::default(), None) }
            .map_err(|e| map_vk_error("vkCreateFence", e))?;
        Ok(in_flight)
    }

    fn create_descriptor_pool(&mut self, max_sets: u32, sizes: &[vk::DescriptorPoolSize]) -> Result<()> {
        let info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(max_sets)
            .pool_sizes(sizes);
        self.descriptor_pool = unsafe { self.ctx.device.create_descriptor_pool(&info, None) }
            .map_err(|e| map_vk_error("vkCreateDescriptorPool", e))?;
        Ok(())
    }

    fn begin(&self) -> Result<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let command_buffer = unsafe { self.ctx.device.allocate_command_buffers(&alloc_info) }
            .map_err(|e| map_vk_error("vkAllocateCommandBuffers", e))?
            .first()
            .copied()
            .ok_or_else(|| Error::BackendError("no command buffer allocated".to_string()))?;
        let begin_info = vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { self.ctx.device.begin_command_buffer(command_buffer, &begin_info) }
            .map_err(|e| map_vk_error("vkBeginCommandBuffer", e))?;
        Ok(command_buffer)
    }

    /// True once the GPU finished the submission (or it never reached the queue)
    pub fn is_complete(&self) -> bool {
        !self.submitted || unsafe { self.ctx.device.get_fence_status(self.fence) }.unwrap_or(true)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        unsafe {
            if self.submitted {
                let _ = self.ctx.device.wait_for_fences(&[self.fence], true, u64::MAX);
            }
            if self.descriptor_pool != vk::DescriptorPool::null() {
                self.ctx.device.destroy_descriptor_pool(self.descriptor_pool, None);
            }
            if self.command_pool != vk::CommandPool::null() {
                self.ctx.device.destroy_command_pool(self.command_pool, None);
            }
            if self.fence != vk::Fence::null() {
                self.ctx.device.destroy_fence(self.fence, None);
            }
        }
    }
}

// ============================================================================
// EXECUTOR
// ============================================================================

struct BoundPipeline {
    kind: PipelineKind,
    bind_point: vk::PipelineBindPoint,
    layout: Arc<NativeLayout>,
    static_viewports: Vec<vk::Viewport>,
    static_scissors: Vec<vk::Rect2D>,
}

/// State bound while a command buffer is checked or recorded
#[derive(Default)]
struct BoundState {
    pipeline: Option<BoundPipeline>,
    index_buffer: Option<(BufferHandle, Format, u64)>,
    framebuffer: Option<(RenderTargetRef, FramebufferBinding)>,
    /// Resources of the dynamic set, by binding index
    dynamic: Vec<Option<BoundResource>>,
    dynamic_dirty: bool,
    /// Queries begun in this command buffer and whether inside a render pass
    open_queries: Vec<(QueryHeapHandle, u32, bool)>,
    begun_queries: Vec<(QueryHeapHandle, u32)>,
    /// Swap chains a render pass began on
    touched: Vec<SwapChainHandle>,
    /// Swap chains whose current image a finished pass left presentable
    rendered: Vec<SwapChainHandle>,
    dynamic_sets: u32,
    dynamic_pool_sizes: Vec<vk::DescriptorPoolSize>,
}

struct Recorder<'a> {
    device: &'a ash::Device,
    command_buffer: vk::CommandBuffer,
    descriptor_pool: vk::DescriptorPool,
}

pub(crate) struct VulkanExecutor<'a> {
    pub ctx: &'a Arc<GpuContext>,
    pub objects: &'a mut VulkanObjects,
    pub limits: &'a RenderingLimits,
}

impl VulkanExecutor<'_> {
    /// Check, record and submit a command buffer
    pub fn submit(&mut self, handle: CommandBufferHandle) -> Result<InFlight> {
        let commands = {
            let command_buffer = self.objects.command_buffers.get(handle)?;
            command_buffer.check_executable()?;
            let objects = &*self.objects;
            let referenced = command_buffer.referenced_buffers().expand(
                |array| Ok(objects.buffer_arrays.get(array)?.buffers.clone()),
                |heap| {
                    let mut views = objects.resource_heaps.get(heap)?.buffer_views();
                    views.retain(|buffer| objects.buffers.contains(*buffer));
                    Ok(views)
                },
            )?;
            for buffer in referenced {
                if self.objects.buffers.get(buffer)?.is_mapped() {
                    return Err(protocol_error(format!(
                        "command buffer references buffer {:?} while it is mapped",
                        buffer
                    )));
                }
            }
            command_buffer.commands().to_vec()
        };

        let mut plan = BoundState::default();
        for command in &commands {
            self.apply(&mut plan, command, None)?;
        }

        let ctx = self.ctx;
        let mut in_flight = InFlight::new(ctx)?;
        if plan.dynamic_sets > 0 {
            in_flight.create_descriptor_pool(plan.dynamic_sets, &plan.dynamic_pool_sizes)?;
        }
        let command_buffer = in_flight.begin()?;
        let recorder = Recorder {
            device: &ctx.device,
            command_buffer,
            descriptor_pool: in_flight.descriptor_pool,
        };
        // Queries must be reset outside render passes before they begin
        for (heap, query) in &plan.begun_queries {
            self.objects.query_heaps.get(*heap)?.record_reset(recorder.device, command_buffer, *query);
        }
        memory_barrier(recorder.device, command_buffer);

        let mut bound = BoundState::default();
        for command in &commands {
            self.apply(&mut bound, command, Some(&recorder))?;
        }
        unsafe { ctx.device.end_command_buffer(command_buffer) }
            .map_err(|e| map_vk_error("vkEndCommandBuffer", e))?;

        let mut syncs = Vec::with_capacity(plan.touched.len());
        for swap_chain in &plan.touched {
            match self.objects.swap_chains.get_mut(*swap_chain).and_then(|s| s.submission_sync()) {
                Ok((wait, signal)) => syncs.push((*swap_chain, wait, signal)),
                Err(e) => {
                    self.cancel_sync(&syncs);
                    return Err(e);
                }
            }
        }
        let waits: Vec<vk::Semaphore> = syncs.iter().filter_map(|(_, wait, _)| *wait).collect();
        let signals: Vec<vk::Semaphore> = syncs.iter().map(|(_, _, signal)| *signal).collect();
        let wait_stages = vec![vk::PipelineStageFlags::ALL_COMMANDS; waits.len()];
        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&waits)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signals);
        if let Err(e) = self.ctx.queue_submit(&[submit_info], in_flight.fence) {
            self.cancel_sync(&syncs);
            return Err(e);
        }
        in_flight.submitted = true;

        for swap_chain in &plan.rendered {
            if let Ok(swap_chain) = self.objects.swap_chains.get_mut(*swap_chain) {
                swap_chain.mark_rendered();
            }
        }
        for (heap, query) in &plan.begun_queries {
            if let Ok(query_heap) = self.objects.query_heaps.get_mut(*heap) {
                query_heap.written[*query as usize] = true;
            }
        }
        self.objects.command_buffers.get_mut(handle)?.mark_submitted()?;
        Ok(in_flight)
    }

    fn cancel_sync(&mut self, syncs: &[(SwapChainHandle, Option<vk::Semaphore>, vk::Semaphore)]) {
        for (swap_chain, wait, signal) in syncs {
            if let Ok(swap_chain) = self.objects.swap_chains.get_mut(*swap_chain) {
                swap_chain.cancel_submission(*wait, *signal);
            }
        }
    }

    fn apply(&self, bound: &mut BoundState, command: &Command, rec: Option<&Recorder<'_>>) -> Result<()> {
        match command {
            Command::UpdateBuffer { dst, offset, data } => {
                let buffer = self.objects.buffers.get(*dst)?;
                resolve_buffer_range(buffer.desc.size, *offset, data.len() as u64)?;
                if let Some(rec) = rec {
                    unsafe { rec.device.cmd_update_buffer(rec.command_buffer, buffer.buffer, *offset, data) };
                    memory_barrier(rec.device, rec.command_buffer);
                }
            }
            Command::CopyBuffer { dst, dst_offset, src, src_offset, size } => {
                let src_buffer = self.objects.buffers.get(*src)?;
                let dst_buffer = self.objects.buffers.get(*dst)?;
                resolve_buffer_range(src_buffer.desc.size, *src_offset, *size)?;
                resolve_buffer_range(dst_buffer.desc.size, *dst_offset, *size)?;
                if let Some(rec) = rec {
                    let region = vk::BufferCopy {
                        src_offset: *src_offset,
                        dst_offset: *dst_offset,
                        size: *size,
                    };
                    unsafe { rec.device.cmd_copy_buffer(rec.command_buffer, src_buffer.buffer, dst_buffer.buffer, &[region]) };
                    memory_barrier(rec.device, rec.command_buffer);
                }
            }
            Command::CopyBufferFromTexture { dst, dst_offset, src, src_region, row_stride, layer_stride } => {
                let texture = self.objects.textures.get(*src)?;
                texture.check_single_sample("copy_buffer_from_texture")?;
                let region = texture.check_region(src_region)?;
                let layout = texture.buffer_layout(&region, *row_stride, *layer_stride)?;
                let buffer = self.objects.buffers.get(*dst)?;
                resolve_buffer_range(buffer.desc.size, *dst_offset, layout.size)?;
                texture.copy_aspect()?;
                texture.check_buffer_offset(*dst_offset)?;
                if let Some(rec) = rec {
                    texture.record_copy_to_buffer(rec.command_buffer, buffer.buffer, *dst_offset, &region, &layout)?;
                    memory_barrier(rec.device, rec.command_buffer);
                }
            }
            Command::CopyTexture { dst, dst_location, src, src_location, extent } => {
                self.copy_texture(*dst, dst_location, *src, src_location, *extent, rec)?;
            }
            Command::CopyTextureFromBuffer { dst, dst_region, src, src_offset, row_stride, layer_stride } => {
                let texture = self.objects.textures.get(*dst)?;
                texture.check_single_sample("copy_texture_from_buffer")?;
                let region = texture.check_region(dst_region)?;
                let layout = texture.buffer_layout(&region, *row_stride, *layer_stride)?;
                let buffer = self.objects.buffers.get(*src)?;
                resolve_buffer_range(buffer.desc.size, *src_offset, layout.size)?;
                texture.copy_aspect()?;
                texture.check_buffer_offset(*src_offset)?;
                if let Some(rec) = rec {
                    texture.record_copy_from_buffer(rec.command_buffer, buffer.buffer, *src_offset, &region, &layout)?;
                    memory_barrier(rec.device, rec.command_buffer);
                }
            }
            Command::CopyTextureFromFramebuffer { dst, dst_region, src_offset } => {
                let (_, framebuffer) = bound
                    .framebuffer
                    .as_ref()
                    .ok_or_else(|| protocol_error("framebuffer copy outside a render pass".to_string()))?;
                self.copy_from_framebuffer(framebuffer, *dst, dst_region, *src_offset, rec)?;
            }
            Command::FillBuffer { dst, offset, value, size } => {
                let buffer = self.objects.buffers.get(*dst)?;
                let size = resolve_buffer_range(buffer.desc.size, *offset, *size)?;
                if size % 4 != 0 {
                    return Err(lumen_invalid!(SOURCE, "fill range of {} bytes is not 4-byte aligned", size));
                }
                if let Some(rec) = rec {
                    unsafe { rec.device.cmd_fill_buffer(rec.command_buffer, buffer.buffer, *offset, size, *value) };
                    memory_barrier(rec.device, rec.command_buffer);
                }
            }
            Command::GenerateMips { texture, subresource } => {
                let texture = self.objects.textures.get(*texture)?;
                let range = texture.mip_generation_range(*subresource)?;
                if let (Some(rec), Some(sub)) = (rec, range) {
                    texture.record_generate_mips(rec.command_buffer, &sub);
                    memory_barrier(rec.device, rec.command_buffer);
                }
            }
            Command::SetViewports(viewports) => {
                if viewports.len() as u32 > self.limits.max_viewports {
                    return Err(lumen_invalid!(
                        SOURCE,
                        "{} viewports exceed device limit {}",
                        viewports.len(), self.limits.max_viewports
                    ));
                }
                if let Some(rec) = rec.filter(|_| !viewports.is_empty()) {
                    let viewports: Vec<vk::Viewport> = viewports.iter().map(viewport_to_vk).collect();
                    unsafe { rec.device.cmd_set_viewport(rec.command_buffer, 0, &viewports) };
                }
            }
            Command::SetScissors(scissors) => {
                if scissors.len() as u32 > self.limits.max_viewports {
                    return Err(lumen_invalid!(
                        SOURCE,
                        "{} scissors exceed device limit {}",
                        scissors.len(), self.limits.max_viewports
                    ));
                }
                if let Some(rec) = rec.filter(|_| !scissors.is_empty()) {
                    let scissors: Vec<vk::Rect2D> = scissors.iter().map(scissor_to_vk).collect();
                    unsafe { rec.device.cmd_set_scissor(rec.command_buffer, 0, &scissors) };
                }
            }
            Command::SetBlendFactor(color) => {
                if let Some(rec) = rec {
                    unsafe { rec.device.cmd_set_blend_constants(rec.command_buffer, color) };
                }
            }
            Command::SetStencilReference(reference) => {
                if let Some(rec) = rec {
                    unsafe {
                        rec.device.cmd_set_stencil_reference(
                            rec.command_buffer,
                            vk::StencilFaceFlags::FRONT_AND_BACK,
                            *reference,
                        )
                    };
                }
            }
            Command::SetUniforms { first, data } => {
                let end = (*first as usize) * 4 + data.len();
                if end > self.limits.max_push_constant_size as usize {
                    return Err(lumen_invalid!(
                        SOURCE,
                        "uniform data ends at byte {} beyond device limit {}",
                        end, self.limits.max_push_constant_size
                    ));
                }
                let pipeline = bound
                    .pipeline
                    .as_ref()
                    .ok_or_else(|| protocol_error("set_uniforms without a pipeline state".to_string()))?;
                if end > pipeline.layout.push_constant_size as usize {
                    return Err(lumen_invalid!(
                        SOURCE,
                        "uniform data ends at byte {} beyond the {} bytes of the pipeline layout",
                        end, pipeline.layout.push_constant_size
                    ));
                }
                if let Some(rec) = rec {
                    unsafe {
                        rec.device.cmd_push_constants(
                            rec.command_buffer,
                            pipeline.layout.layout,
                            vk::ShaderStageFlags::ALL,
                            first * 4,
                            data,
                        )
                    };
                }
            }
            Command::SetVertexBuffer(buffer) => {
                self.require_bind_flags(*buffer, BindFlags::VERTEX_BUFFER)?;
                if let Some(rec) = rec {
                    let native = self.objects.buffers.get(*buffer)?.buffer;
                    unsafe { rec.device.cmd_bind_vertex_buffers(rec.command_buffer, 0, &[native], &[0]) };
                }
            }
            Command::SetVertexBufferArray(array) => {
                let buffers = self.objects.vertex_buffers(*array)?;
                if let Some(rec) = rec {
                    let offsets = vec![0; buffers.len()];
                    unsafe { rec.device.cmd_bind_vertex_buffers(rec.command_buffer, 0, &buffers, &offsets) };
                }
            }
            Command::SetIndexBuffer { buffer, format, offset } => {
                self.require_bind_flags(*buffer, BindFlags::INDEX_BUFFER)?;
                let native = self.objects.buffers.get(*buffer)?;
                resolve_buffer_range(native.desc.size, *offset, 0)?;
                bound.index_buffer = Some((*buffer, *format, *offset));
                if let Some(rec) = rec {
                    unsafe {
                        rec.device.cmd_bind_index_buffer(rec.command_buffer, native.buffer, *offset, index_type(*format))
                    };
                }
            }
            Command::SetPipelineState(handle) => {
                let pipeline = self.objects.pipeline_states.get(*handle)?;
                if !pipeline.is_valid() {
                    return Err(protocol_error(format!(
                        "pipeline state '{}' failed to build and cannot be bound",
                        pipeline.debug_name.as_deref().unwrap_or("unnamed")
                    )));
                }
                let same_layout = bound
                    .pipeline
                    .as_ref()
                    .is_some_and(|p| Arc::ptr_eq(&p.layout, &pipeline.layout));
                if !same_layout {
                    bound.dynamic = vec![None; pipeline.layout.dynamic_entries.len()];
                }
                // Each bind point keeps its own sets
                bound.dynamic_dirty = true;
                bound.pipeline = Some(BoundPipeline {
                    kind: pipeline.kind,
                    bind_point: pipeline.bind_point(),
                    layout: Arc::clone(&pipeline.layout),
                    static_viewports: pipeline.static_viewports.clone(),
                    static_scissors: pipeline.static_scissors.clone(),
                });
                if let Some(rec) = rec {
                    unsafe { rec.device.cmd_bind_pipeline(rec.command_buffer, pipeline.bind_point(), pipeline.pipeline) };
                    apply_static_state(rec, bound.pipeline.as_ref());
                }
            }
            Command::SetResourceHeap { heap, first_set } => {
                let heap = self.objects.resource_heaps.get(*heap)?;
                if *first_set >= heap.num_sets() {
                    return Err(lumen_invalid!(
                        SOURCE,
                        "descriptor set {} is out of range for a heap with {} sets",
                        first_set, heap.num_sets()
                    ));
                }
                if let Some(rec) = rec {
                    let sets = [heap.sets[*first_set as usize]];
                    for bind_point in [vk::PipelineBindPoint::GRAPHICS, vk::PipelineBindPoint::COMPUTE] {
                        unsafe {
                            rec.device.cmd_bind_descriptor_sets(
                                rec.command_buffer,
                                bind_point,
                                heap.layout.layout,
                                HEAP_SET,
                                &sets,
                                &[],
                            )
                        };
                    }
                }
            }
            Command::SetResource { descriptor, resource } => {
                let resolved = self.objects.bound_resource(resource)?;
                let pipeline = bound
                    .pipeline
                    .as_ref()
                    .ok_or_else(|| protocol_error("set_resource without a pipeline state".to_string()))?;
                let entry = pipeline
                    .layout
                    .dynamic_entries
                    .get(*descriptor as usize)
                    .filter(|entry| entry.static_sampler.is_none())
                    .ok_or_else(|| {
                        lumen_invalid!(
                            SOURCE,
                            "descriptor {} out of range ({} dynamic bindings)",
                            descriptor,
                            num_dynamic_bindings(&pipeline.layout)
                        )
                    })?;
                check_descriptor(entry.descriptor_type, &resolved)?;
                bound.dynamic[*descriptor as usize] = Some(resolved);
                bound.dynamic_dirty = true;
            }
            Command::BeginRenderPass { target, render_pass, clear_values } => {
                let framebuffer = self.framebuffer(bound, *target)?;
                let clears = match render_pass {
                    Some(pass) => {
                        let pass = self.objects.render_passes.get(*pass)?;
                        if !pass.is_compatible(&framebuffer) {
                            return Err(lumen_invalid!(
                                SOURCE,
                                "render pass '{}' does not match the attachments of {:?}",
                                pass.desc.debug_name.as_deref().unwrap_or("unnamed"),
                                target
                            ));
                        }
                        load_op_clears(&framebuffer, &pass.desc, clear_values)
                    }
                    None => Vec::new(),
                };
                if let RenderTargetRef::SwapChain(handle) = target {
                    if !bound.touched.contains(handle) {
                        bound.touched.push(*handle);
                    }
                }
                if let Some(rec) = rec {
                    framebuffer.record_begin(rec.device, rec.command_buffer);
                    let full = framebuffer.full_rect();
                    let viewport = vk::Viewport {
                        x: 0.0,
                        y: 0.0,
                        width: full.extent.width as f32,
                        height: full.extent.height as f32,
                        min_depth: 0.0,
                        max_depth: 1.0,
                    };
                    unsafe {
                        rec.device.cmd_set_viewport(rec.command_buffer, 0, &[viewport]);
                        rec.device.cmd_set_scissor(rec.command_buffer, 0, &[full]);
                    }
                    apply_static_state(rec, bound.pipeline.as_ref());
                    record_clears(rec.device, rec.command_buffer, &framebuffer, &clears);
                }
                bound.framebuffer = Some((*target, framebuffer));
            }
            Command::EndRenderPass => {
                if let Some((target, framebuffer)) = bound.framebuffer.take() {
                    if let Some(rec) = rec {
                        framebuffer.record_end(rec.device, rec.command_buffer);
                    }
                    if let RenderTargetRef::SwapChain(handle) = target {
                        if !bound.rendered.contains(&handle) {
                            bound.rendered.push(handle);
                        }
                    }
                }
            }
            Command::Clear { flags, value } => {
                let (_, framebuffer) = bound
                    .framebuffer
                    .as_ref()
                    .ok_or_else(|| protocol_error("clear outside a render pass".to_string()))?;
                if let Some(rec) = rec {
                    let clears = clear_attachments(framebuffer, *flags, value, None);
                    record_clears(rec.device, rec.command_buffer, framebuffer, &clears);
                }
            }
            Command::ClearAttachments(attachments) => {
                let (_, framebuffer) = bound
                    .framebuffer
                    .as_ref()
                    .ok_or_else(|| protocol_error("clear outside a render pass".to_string()))?;
                let num_colors = framebuffer.colors.len() as u32;
                let mut clears = Vec::new();
                for attachment in attachments {
                    if attachment.flags.contains(ClearFlags::COLOR) && attachment.color_attachment >= num_colors {
                        return Err(lumen_invalid!(
                            SOURCE,
                            "color attachment {} out of range ({} attachments)",
                            attachment.color_attachment, num_colors
                        ));
                    }
                    clears.extend(clear_attachments(
                        framebuffer,
                        attachment.flags,
                        &attachment.value,
                        Some(attachment.color_attachment),
                    ));
                }
                if let Some(rec) = rec {
                    record_clears(rec.device, rec.command_buffer, framebuffer, &clears);
                }
            }
            Command::Draw { num_vertices, first_vertex, num_instances, first_instance } => {
                self.require_pipeline(bound, PipelineKind::Graphics, "draw")?;
                self.flush_dynamic(bound, rec)?;
                if let Some(rec) = rec {
                    unsafe {
                        rec.device.cmd_draw(rec.command_buffer, *num_vertices, *num_instances, *first_vertex, *first_instance)
                    };
                }
            }
            Command::DrawIndexed { num_indices, first_index, vertex_offset, num_instances, first_instance } => {
                self.require_pipeline(bound, PipelineKind::Graphics, "draw_indexed")?;
                let (buffer, format, offset) = bound
                    .index_buffer
                    .ok_or_else(|| protocol_error("draw_indexed without an index buffer".to_string()))?;
                let index_size = format.bytes_per_texel() as u64;
                let start = offset + *first_index as u64 * index_size;
                let buffer = self.objects.buffers.get(buffer)?;
                resolve_buffer_range(buffer.desc.size, start, *num_indices as u64 * index_size)?;
                self.flush_dynamic(bound, rec)?;
                if let Some(rec) = rec {
                    unsafe {
                        rec.device.cmd_draw_indexed(
                            rec.command_buffer,
                            *num_indices,
                            *num_instances,
                            *first_index,
                            *vertex_offset,
                            *first_instance,
                        )
                    };
                }
            }
            Command::Dispatch { x, y, z } => {
                self.require_pipeline(bound, PipelineKind::Compute, "dispatch")?;
                let max = self.limits.max_compute_work_group_count;
                if *x > max[0] || *y > max[1] || *z > max[2] {
                    return Err(lumen_invalid!(
                        SOURCE,
                        "dispatch {}x{}x{} exceeds device limit {:?}",
                        x, y, z, max
                    ));
                }
                self.flush_dynamic(bound, rec)?;
                if let Some(rec) = rec {
                    unsafe { rec.device.cmd_dispatch(rec.command_buffer, *x, *y, *z) };
                    memory_barrier(rec.device, rec.command_buffer);
                }
            }
            Command::BeginQuery { heap, query } => {
                let query_heap = self.objects.query_heaps.get(*heap)?;
                query_heap.check_index(*query)?;
                if bound.begun_queries.contains(&(*heap, *query)) {
                    return Err(protocol_error(format!("query {} is begun twice in one command buffer", query)));
                }
                bound.begun_queries.push((*heap, *query));
                bound.open_queries.push((*heap, *query, bound.framebuffer.is_some()));
                if let Some(rec) = rec {
                    query_heap.record_begin(rec.device, rec.command_buffer, *query);
                }
            }
            Command::EndQuery { heap, query } => {
                let query_heap = self.objects.query_heaps.get(*heap)?;
                if let Some(index) = bound.open_queries.iter().position(|q| (q.0, q.1) == (*heap, *query)) {
                    let (_, _, inside_pass) = bound.open_queries.swap_remove(index);
                    if inside_pass != bound.framebuffer.is_some() && query_heap.desc.query_type != QueryType::TimeElapsed {
                        return Err(protocol_error(format!(
                            "query {} must end in the render pass scope it began in",
                            query
                        )));
                    }
                }
                if let Some(rec) = rec {
                    query_heap.record_end(rec.device, rec.command_buffer, *query);
                }
            }
            Command::PushDebugGroup(name) => {
                if let Some(rec) = rec {
                    self.ctx.begin_label(rec.command_buffer, name);
                }
            }
            Command::PopDebugGroup => {
                if let Some(rec) = rec {
                    self.ctx.end_label(rec.command_buffer);
                }
            }
        }
        Ok(())
    }

    fn require_bind_flags(&self, buffer: BufferHandle, flags: BindFlags) -> Result<()> {
        let desc = &self.objects.buffers.get(buffer)?.desc;
        if !desc.bind_flags.contains(flags) {
            return Err(lumen_invalid!(
                SOURCE,
                "buffer {:?} was not created with {:?}",
                desc.debug_name, flags
            ));
        }
        Ok(())
    }

    fn require_pipeline(&self, bound: &BoundState, kind: PipelineKind, what: &str) -> Result<()> {
        match bound.pipeline.as_ref().map(|p| p.kind) {
            Some(bound_kind) if bound_kind == kind => Ok(()),
            Some(other) => Err(protocol_error(format!("{} with a {:?} pipeline bound", what, other))),
            None => Err(protocol_error(format!("{} without a pipeline state", what))),
        }
    }

    /// Attachments of a target, as left by earlier passes of this command buffer
    fn framebuffer(&self, bound: &BoundState, target: RenderTargetRef) -> Result<FramebufferBinding> {
        let mut framebuffer = self.objects.framebuffer(target)?;
        if let RenderTargetRef::SwapChain(handle) = target {
            if bound.rendered.contains(&handle) {
                let attachments = framebuffer
                    .colors
                    .iter_mut()
                    .chain(framebuffer.resolves.iter_mut().map(|(_, attachment)| attachment));
                for attachment in attachments {
                    if attachment.final_layout == vk::ImageLayout::PRESENT_SRC_KHR {
                        attachment.initial_layout = vk::ImageLayout::PRESENT_SRC_KHR;
                    }
                }
            }
        }
        Ok(framebuffer)
    }

    /// Allocate, fill and bind the dynamic set before a draw or dispatch
    fn flush_dynamic(&self, bound: &mut BoundState, rec: Option<&Recorder<'_>>) -> Result<()> {
        let Some(pipeline) = bound.pipeline.as_ref() else {
            return Ok(());
        };
        if !bound.dynamic_dirty || pipeline.layout.dynamic_entries.is_empty() {
            return Ok(());
        }
        bound.dynamic_dirty = false;
        let Some(rec) = rec else {
            bound.dynamic_sets += 1;
            merge_pool_sizes(&mut bound.dynamic_pool_sizes, &pool_sizes(&pipeline.layout.dynamic_entries, 1));
            return Ok(());
        };

        let set_layouts = [pipeline.layout.set_layouts[DYNAMIC_SET as usize]];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(rec.descriptor_pool)
            .set_layouts(&set_layouts);
        let set = unsafe { rec.device.allocate_descriptor_sets(&alloc_info) }
            .map_err(|e| map_vk_error("vkAllocateDescriptorSets", e))?
            .first()
            .copied()
            .ok_or_else(|| Error::BackendError("no descriptor set allocated".to_string()))?;
        let mut writer = DescriptorWriter::new();
        for (entry, resource) in pipeline.layout.dynamic_entries.iter().zip(&bound.dynamic) {
            if let Some(resource) = resource {
                writer.push(set, entry, resource)?;
            }
        }
        writer.flush(rec.device);
        unsafe {
            rec.device.cmd_bind_descriptor_sets(
                rec.command_buffer,
                pipeline.bind_point,
                pipeline.layout.layout,
                DYNAMIC_SET,
                &[set],
                &[],
            )
        };
        Ok(())
    }

    fn copy_texture(
        &self,
        dst: TextureHandle,
        dst_location: &TextureLocation,
        src: TextureHandle,
        src_location: &TextureLocation,
        extent: Extent3D,
        rec: Option<&Recorder<'_>>,
    ) -> Result<()> {
        let src_texture = self.objects.textures.get(src)?;
        let src_region = src_texture.check_region(&texture_region_from_location(
            src_texture.desc.texture_type,
            src_location,
            extent,
        ))?;
        let dst_texture = self.objects.textures.get(dst)?;
        let dst_region = dst_texture.check_region(&texture_region_from_location(
            dst_texture.desc.texture_type,
            dst_location,
            extent,
        ))?;
        if src_texture.unit() != dst_texture.unit() || region_volume(&src_region) != region_volume(&dst_region) {
            return Err(lumen_invalid!(
                SOURCE,
                "copy_texture between incompatible formats {:?} and {:?}",
                src_texture.desc.format, dst_texture.desc.format
            ));
        }
        if src_texture.desc.samples.max(1) != dst_texture.desc.samples.max(1) {
            return Err(lumen_invalid!(SOURCE, "copy_texture between textures with different sample counts"));
        }
        let Some(rec) = rec else {
            return Ok(());
        };

        let copy = vk::ImageCopy {
            src_subresource: src_texture.subresource_layers(
                src_region.mip_level,
                src_region.base_array_layer,
                src_region.layer_count,
            ),
            src_offset: src_region.offset,
            dst_subresource: dst_texture.subresource_layers(
                dst_region.mip_level,
                dst_region.base_array_layer,
                dst_region.layer_count,
            ),
            dst_offset: dst_region.offset,
            extent: vk::Extent3D {
                depth: src_region.extent.depth.max(dst_region.extent.depth),
                ..src_region.extent
            },
        };
        let device = rec.device;
        let cb = rec.command_buffer;
        if src == dst {
            let range = src_texture.full_range();
            let layout = src_texture.resting_layout;
            image_barrier(device, cb, src_texture.image, range, layout, vk::ImageLayout::GENERAL);
            unsafe {
                device.cmd_copy_image(
                    cb,
                    src_texture.image,
                    vk::ImageLayout::GENERAL,
                    dst_texture.image,
                    vk::ImageLayout::GENERAL,
                    &[copy],
                )
            };
            image_barrier(device, cb, src_texture.image, range, vk::ImageLayout::GENERAL, layout);
        } else {
            let src_range = src_texture.region_range(&src_region);
            let dst_range = dst_texture.region_range(&dst_region);
            image_barrier(device, cb, src_texture.image, src_range, src_texture.resting_layout, vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
            image_barrier(device, cb, dst_texture.image, dst_range, dst_texture.resting_layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
            unsafe {
                device.cmd_copy_image(
                    cb,
                    src_texture.image,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    dst_texture.image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[copy],
                )
            };
            image_barrier(device, cb, src_texture.image, src_range, vk::ImageLayout::TRANSFER_SRC_OPTIMAL, src_texture.resting_layout);
            image_barrier(device, cb, dst_texture.image, dst_range, vk::ImageLayout::TRANSFER_DST_OPTIMAL, dst_texture.resting_layout);
        }
        memory_barrier(device, cb);
        Ok(())
    }

    /// Copy from color attachment 0, pausing the render pass around the copy
    fn copy_from_framebuffer(
        &self,
        framebuffer: &FramebufferBinding,
        dst: TextureHandle,
        dst_region: &TextureRegion,
        src_offset: Offset2D,
        rec: Option<&Recorder<'_>>,
    ) -> Result<()> {
        let source = framebuffer
            .colors
            .first()
            .ok_or_else(|| lumen_invalid!(SOURCE, "framebuffer has no color attachment 0"))?;
        if framebuffer.samples > 1 {
            return Err(lumen_invalid!(SOURCE, "copies from multisample framebuffers are not supported"));
        }
        let texture = self.objects.textures.get(dst)?;
        texture.check_single_sample("copy_texture_from_framebuffer")?;
        let region = texture.check_region(dst_region)?;
        if TexelUnit::of(source.format) != texture.unit() {
            return Err(lumen_invalid!(
                SOURCE,
                "framebuffer format is incompatible with {:?}",
                texture.desc.format
            ));
        }
        let fits = src_offset.x >= 0
            && src_offset.y >= 0
            && src_offset.x as u64 + region.extent.width as u64 <= framebuffer.extent.width as u64
            && src_offset.y as u64 + region.extent.height as u64 <= framebuffer.extent.height as u64;
        if !fits {
            return Err(lumen_invalid!(
                SOURCE,
                "framebuffer copy at {:?} of {}x{} exceeds the {}x{} framebuffer",
                src_offset, region.extent.width, region.extent.height, framebuffer.extent.width, framebuffer.extent.height
            ));
        }
        let Some(rec) = rec else {
            return Ok(());
        };

        let device = rec.device;
        let cb = rec.command_buffer;
        let src_range = source.range();
        let dst_range = texture.region_range(&region);
        let copy = vk::ImageCopy {
            src_subresource: source.subresource_layers(),
            src_offset: vk::Offset3D { x: src_offset.x, y: src_offset.y, z: 0 },
            dst_subresource: texture.subresource_layers(region.mip_level, region.base_array_layer, region.layer_count),
            dst_offset: region.offset,
            extent: vk::Extent3D {
                width: region.extent.width,
                height: region.extent.height,
                depth: 1,
            },
        };
        unsafe { device.cmd_end_render_pass(cb) };
        image_barrier(device, cb, source.image, src_range, source.attachment_layout(), vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
        image_barrier(device, cb, texture.image, dst_range, texture.resting_layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        unsafe {
            device.cmd_copy_image(
                cb,
                source.image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                texture.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[copy],
            )
        };
        image_barrier(device, cb, source.image, src_range, vk::ImageLayout::TRANSFER_SRC_OPTIMAL, source.attachment_layout());
        image_barrier(device, cb, texture.image, dst_range, vk::ImageLayout::TRANSFER_DST_OPTIMAL, texture.resting_layout);
        framebuffer.record_resume(device, cb);
        Ok(())
    }
}

/// Bindings of the dynamic set that `set_resource` can fill
fn num_dynamic_bindings(layout: &NativeLayout) -> usize {
    layout.dynamic_entries.iter().filter(|entry| entry.static_sampler.is_none()).count()
}

fn apply_static_state(rec: &Recorder<'_>, pipeline: Option<&BoundPipeline>) {
    let Some(pipeline) = pipeline.filter(|p| p.kind == PipelineKind::Graphics) else {
        return;
    };
    unsafe {
        if !pipeline.static_viewports.is_empty() {
            rec.device.cmd_set_viewport(rec.command_buffer, 0, &pipeline.static_viewports);
        }
        if !pipeline.static_scissors.is_empty() {
            rec.device.cmd_set_scissor(rec.command_buffer, 0, &pipeline.static_scissors);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_command_executor_tests.rs"]
mod tests;
