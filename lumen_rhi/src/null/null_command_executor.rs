/// CPU execution of recorded command buffers for the Null backend
///
/// Every command buffer runs twice through the same code: a checking pass
/// that resolves handles and ranges without touching memory, then the
/// executing pass. A failing command therefore leaves all objects unchanged.

use crate::error::{Error, Result};
use crate::format::{texture_region_from_location, Format};
use crate::render::*;

use super::null_objects::{NullAttachment, NullObjects, NullTexture};
use super::null_swap_chain::NullStateManager;

const SOURCE: &str = "lumen::null";

/// Counters of executed work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NullStatistics {
    pub submits: u64,
    pub commands: u64,
    pub draw_calls: u64,
    pub dispatches: u64,
    /// Vertex (or index) invocations across all instances
    pub vertices: u64,
}

/// State bound while a command buffer runs
#[derive(Default)]
struct BoundState {
    pipeline: Option<PipelineKind>,
    index_buffer: Option<(BufferHandle, Format, u64)>,
    render_target: Option<RenderTargetRef>,
    active_queries: Vec<(QueryHeapHandle, u32)>,
}

pub(super) struct NullExecutor<'a> {
    pub objects: &'a mut NullObjects,
    pub limits: &'a RenderingLimits,
    pub state_manager: &'a NullStateManager,
    pub stats: &'a mut NullStatistics,
}

fn protocol_error(message: String) -> Error {
    crate::lumen_warn!(SOURCE, "{}", message);
    Error::InvalidState(message)
}

impl NullExecutor<'_> {
    /// Check and execute a command buffer
    pub fn submit(&mut self, handle: CommandBufferHandle) -> Result<()> {
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

        let mut bound = BoundState::default();
        for command in &commands {
            self.apply(&mut bound, command, false)?;
        }

        let mut bound = BoundState::default();
        for command in &commands {
            self.apply(&mut bound, command, true)?;
        }

        self.stats.submits += 1;
        self.stats.commands += commands.len() as u64;
        self.objects.command_buffers.get_mut(handle)?.mark_submitted()
    }

    fn apply(&mut self, bound: &mut BoundState, command: &Command, execute: bool) -> Result<()> {
        match command {
            Command::UpdateBuffer { dst, offset, data } => {
                let buffer = self.objects.buffers.get_mut(*dst)?;
                let range = buffer.range(*offset, data.len() as u64)?;
                if execute {
                    buffer.data[range].copy_from_slice(data);
                }
            }
            Command::CopyBuffer { dst, dst_offset, src, src_offset, size } => {
                let src_range = self.objects.buffers.get(*src)?.range(*src_offset, *size)?;
                let dst_range = self.objects.buffers.get(*dst)?.range(*dst_offset, *size)?;
                if execute {
                    let bytes = self.objects.buffers.get(*src)?.data[src_range].to_vec();
                    self.objects.buffers.get_mut(*dst)?.data[dst_range].copy_from_slice(&bytes);
                }
            }
            Command::CopyBufferFromTexture { dst, dst_offset, src, src_region, row_stride, layer_stride } => {
                let texture = self.objects.textures.get(*src)?;
                let needed = texture.strided_size(src_region, *row_stride, *layer_stride)?;
                let range = self.objects.buffers.get(*dst)?.range(*dst_offset, needed)?;
                if execute {
                    let texture = self.objects.textures.get(*src)?;
                    let buffer = self.objects.buffers.get_mut(*dst)?;
                    texture.read_region(src_region, &mut buffer.data[range], *row_stride, *layer_stride)?;
                }
            }
            Command::CopyTexture { dst, dst_location, src, src_location, extent } => {
                let src_texture = self.objects.textures.get(*src)?;
                let src_region = texture_region_from_location(src_texture.desc.texture_type, src_location, *extent);
                let src_box = src_texture.unit_box(&src_region)?;
                let src_unit = src_texture.unit();
                let dst_texture = self.objects.textures.get(*dst)?;
                let dst_region = texture_region_from_location(dst_texture.desc.texture_type, dst_location, *extent);
                let dst_box = dst_texture.unit_box(&dst_region)?;
                if src_unit != dst_texture.unit() || src_box.volume() != dst_box.volume() {
                    return Err(crate::lumen_invalid!(
                        SOURCE,
                        "copy_texture between incompatible formats {:?} and {:?}",
                        src_texture.desc.format, dst_texture.desc.format
                    ));
                }
                if execute {
                    let texels = self.objects.textures.get(*src)?.read_region_packed(&src_region)?;
                    self.objects.textures.get_mut(*dst)?.write_region(&dst_region, &texels, 0, 0)?;
                }
            }
            Command::CopyTextureFromBuffer { dst, dst_region, src, src_offset, row_stride, layer_stride } => {
                let needed = self.objects.textures.get(*dst)?.strided_size(dst_region, *row_stride, *layer_stride)?;
                let range = self.objects.buffers.get(*src)?.range(*src_offset, needed)?;
                if execute {
                    let bytes = self.objects.buffers.get(*src)?.data[range].to_vec();
                    self.objects.textures.get_mut(*dst)?.write_region(dst_region, &bytes, *row_stride, *layer_stride)?;
                }
            }
            Command::CopyTextureFromFramebuffer { dst, dst_region, src_offset } => {
                let target = bound
                    .render_target
                    .ok_or_else(|| protocol_error("framebuffer copy outside a render pass".to_string()))?;
                let (framebuffer, mip_level, array_layer) = self.color_attachment(target, 0)?;
                let src_region = TextureRegion {
                    subresource: TextureSubresource::single(array_layer, mip_level),
                    offset: Offset3D::new(src_offset.x, src_offset.y, 0),
                    extent: Extent3D::new(dst_region.extent.width, dst_region.extent.height, 1),
                };
                let src_unit = framebuffer.unit();
                let texels = framebuffer.read_region_packed(&src_region)?;
                let dst_texture = self.objects.textures.get_mut(*dst)?;
                dst_texture.unit_box(dst_region)?;
                if src_unit != dst_texture.unit() {
                    return Err(crate::lumen_invalid!(
                        SOURCE,
                        "framebuffer format is incompatible with {:?}",
                        dst_texture.desc.format
                    ));
                }
                if execute {
                    dst_texture.write_region(dst_region, &texels, 0, 0)?;
                }
            }
            Command::FillBuffer { dst, offset, value, size } => {
                let buffer = self.objects.buffers.get_mut(*dst)?;
                let range = buffer.range(*offset, *size)?;
                if range.len() % 4 != 0 {
                    return Err(crate::lumen_invalid!(SOURCE, "fill range of {} bytes is not 4-byte aligned", range.len()));
                }
                if execute {
                    let pattern = value.to_le_bytes();
                    for chunk in buffer.data[range].chunks_exact_mut(4) {
                        chunk.copy_from_slice(&pattern);
                    }
                }
            }
            Command::GenerateMips { texture, subresource } => {
                let texture = self.objects.textures.get_mut(*texture)?;
                texture.mip_generation_range(*subresource)?;
                if execute {
                    texture.generate_mips(*subresource)?;
                }
            }
            Command::SetViewports(viewports) => {
                if viewports.len() as u32 > self.limits.max_viewports {
                    return Err(crate::lumen_invalid!(
                        SOURCE,
                        "{} viewports exceed device limit {}",
                        viewports.len(), self.limits.max_viewports
                    ));
                }
            }
            Command::SetScissors(scissors) => {
                if scissors.len() as u32 > self.limits.max_viewports {
                    return Err(crate::lumen_invalid!(
                        SOURCE,
                        "{} scissors exceed device limit {}",
                        scissors.len(), self.limits.max_viewports
                    ));
                }
            }
            Command::SetBlendFactor(_) | Command::SetStencilReference(_) => {}
            Command::SetUniforms { first, data } => {
                let end = (*first as usize) * 4 + data.len();
                if end > self.limits.max_push_constant_size as usize {
                    return Err(crate::lumen_invalid!(
                        SOURCE,
                        "uniform data ends at byte {} beyond device limit {}",
                        end, self.limits.max_push_constant_size
                    ));
                }
            }
            Command::SetVertexBuffer(buffer) => {
                self.require_bind_flags(*buffer, BindFlags::VERTEX_BUFFER)?;
            }
            Command::SetVertexBufferArray(array) => {
                self.objects.buffer_arrays.get(*array)?;
            }
            Command::SetIndexBuffer { buffer, format, offset } => {
                self.require_bind_flags(*buffer, BindFlags::INDEX_BUFFER)?;
                self.objects.buffers.get(*buffer)?.range(*offset, 0)?;
                bound.index_buffer = Some((*buffer, *format, *offset));
            }
            Command::SetPipelineState(pipeline) => {
                bound.pipeline = Some(self.objects.pipeline_states.get(*pipeline)?.kind);
            }
            Command::SetResourceHeap { heap, first_set } => {
                let heap = self.objects.resource_heaps.get(*heap)?;
                if *first_set >= heap.num_sets() {
                    return Err(crate::lumen_invalid!(
                        SOURCE,
                        "descriptor set {} is out of range for a heap with {} sets",
                        first_set, heap.num_sets()
                    ));
                }
            }
            Command::SetResource { resource, .. } => {
                self.check_view(resource)?;
            }
            Command::BeginRenderPass { target, render_pass, clear_values } => {
                self.check_target(*target)?;
                let clear_ops = match render_pass {
                    Some(pass) => Some(self.objects.render_passes.get(*pass)?.desc.clone()),
                    None => None,
                };
                bound.render_target = Some(*target);
                if execute {
                    if let RenderTargetRef::SwapChain(handle) = target {
                        let height = SwapChain::framebuffer_height(self.objects.swap_chains.get(*handle)?);
                        self.state_manager.bind_swap_chain(*handle, height);
                    }
                    if let Some(pass) = clear_ops {
                        self.apply_load_ops(*target, &pass, clear_values)?;
                    }
                }
            }
            Command::EndRenderPass => {
                bound.render_target = None;
            }
            Command::Clear { flags, value } => {
                let target = bound
                    .render_target
                    .ok_or_else(|| protocol_error("clear outside a render pass".to_string()))?;
                if execute {
                    self.clear_target(target, *flags, value, None)?;
                }
            }
            Command::ClearAttachments(attachments) => {
                let target = bound
                    .render_target
                    .ok_or_else(|| protocol_error("clear outside a render pass".to_string()))?;
                let num_colors = self.num_color_attachments(target)?;
                for attachment in attachments {
                    if attachment.flags.contains(ClearFlags::COLOR) && attachment.color_attachment >= num_colors {
                        return Err(crate::lumen_invalid!(
                            SOURCE,
                            "color attachment {} out of range ({} attachments)",
                            attachment.color_attachment, num_colors
                        ));
                    }
                    if execute {
                        self.clear_target(target, attachment.flags, &attachment.value, Some(attachment.color_attachment))?;
                    }
                }
            }
            Command::Draw { num_vertices, num_instances, .. } => {
                self.require_pipeline(bound, PipelineKind::Graphics, "draw")?;
                if execute {
                    self.count_draw(bound, *num_vertices as u64 * *num_instances as u64);
                }
            }
            Command::DrawIndexed { num_indices, first_index, num_instances, .. } => {
                self.require_pipeline(bound, PipelineKind::Graphics, "draw_indexed")?;
                let (buffer, format, offset) = bound
                    .index_buffer
                    .ok_or_else(|| protocol_error("draw_indexed without an index buffer".to_string()))?;
                let index_size = format.bytes_per_texel() as u64;
                let start = offset + *first_index as u64 * index_size;
                self.objects.buffers.get(buffer)?.range(start, *num_indices as u64 * index_size)?;
                if execute {
                    self.count_draw(bound, *num_indices as u64 * *num_instances as u64);
                }
            }
            Command::Dispatch { x, y, z } => {
                self.require_pipeline(bound, PipelineKind::Compute, "dispatch")?;
                let max = self.limits.max_compute_work_group_count;
                if *x > max[0] || *y > max[1] || *z > max[2] {
                    return Err(crate::lumen_invalid!(
                        SOURCE,
                        "dispatch {}x{}x{} exceeds device limit {:?}",
                        x, y, z, max
                    ));
                }
                if execute {
                    self.stats.dispatches += 1;
                }
            }
            Command::BeginQuery { heap, query } => {
                let query_heap = self.objects.query_heaps.get_mut(*heap)?;
                if *query >= query_heap.desc.num_queries {
                    return Err(crate::lumen_invalid!(
                        SOURCE,
                        "query {} out of range ({} queries)",
                        query, query_heap.desc.num_queries
                    ));
                }
                bound.active_queries.push((*heap, *query));
                if execute {
                    query_heap.results[*query as usize] = 0;
                    query_heap.active[*query as usize] = true;
                }
            }
            Command::EndQuery { heap, query } => {
                let query_heap = self.objects.query_heaps.get_mut(*heap)?;
                bound.active_queries.retain(|q| *q != (*heap, *query));
                if execute {
                    query_heap.active[*query as usize] = false;
                }
            }
            Command::PushDebugGroup(name) => {
                if execute {
                    crate::lumen_trace!(SOURCE, "debug group '{}'", name);
                }
            }
            Command::PopDebugGroup => {}
        }
        Ok(())
    }

    fn require_bind_flags(&self, buffer: BufferHandle, flags: BindFlags) -> Result<()> {
        let desc = &self.objects.buffers.get(buffer)?.desc;
        if !desc.bind_flags.contains(flags) {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "buffer {:?} was not created with {:?}",
                desc.debug_name, flags
            ));
        }
        Ok(())
    }

    fn require_pipeline(&self, bound: &BoundState, kind: PipelineKind, what: &str) -> Result<()> {
        match bound.pipeline {
            Some(bound_kind) if bound_kind == kind => Ok(()),
            Some(other) => Err(protocol_error(format!("{} with a {:?} pipeline bound", what, other))),
            None => Err(protocol_error(format!("{} without a pipeline state", what))),
        }
    }

    fn check_view(&self, view: &ResourceViewDescriptor) -> Result<()> {
        match view {
            ResourceViewDescriptor::Buffer(h) => self.objects.buffers.get(*h).map(|_| ()),
            ResourceViewDescriptor::Texture(h) => self.objects.textures.get(*h).map(|_| ()),
            ResourceViewDescriptor::Sampler(h) => self.objects.samplers.get(*h).map(|_| ()),
        }
    }

    fn check_target(&self, target: RenderTargetRef) -> Result<()> {
        match target {
            RenderTargetRef::SwapChain(h) => self.objects.swap_chains.get(h).map(|_| ()),
            RenderTargetRef::RenderTarget(h) => self.objects.render_targets.get(h).map(|_| ()),
        }
    }

    fn count_draw(&mut self, bound: &BoundState, invocations: u64) {
        self.stats.draw_calls += 1;
        self.stats.vertices += invocations;
        for (heap, query) in &bound.active_queries {
            if let Ok(query_heap) = self.objects.query_heaps.get_mut(*heap) {
                if query_heap.desc.query_type == QueryType::PipelineStatistics {
                    query_heap.results[*query as usize] += invocations;
                }
            }
        }
    }

    // ===== FRAMEBUFFER ACCESS =====

    fn num_color_attachments(&self, target: RenderTargetRef) -> Result<u32> {
        Ok(match target {
            RenderTargetRef::SwapChain(h) => {
                self.objects.swap_chains.get(h)?;
                1
            }
            RenderTargetRef::RenderTarget(h) => self.objects.render_targets.get(h)?.color.len() as u32,
        })
    }

    /// Color attachment `index` of a framebuffer with its MIP level and layer
    fn color_attachment(&mut self, target: RenderTargetRef, index: usize) -> Result<(&mut NullTexture, u32, u32)> {
        let objects = &mut *self.objects;
        match target {
            RenderTargetRef::SwapChain(h) => {
                let buffer = objects.swap_chains.get_mut(h)?.color_buffer_mut();
                match buffer {
                    Some(texture) if index == 0 => Ok((texture, 0, 0)),
                    _ => Err(crate::lumen_invalid!(SOURCE, "swap chain has no color attachment {}", index)),
                }
            }
            RenderTargetRef::RenderTarget(h) => {
                let render_target = objects.render_targets.get_mut(h)?;
                match render_target.color.get_mut(index) {
                    Some(NullAttachment::Internal(texture)) => Ok((texture, 0, 0)),
                    Some(NullAttachment::Texture { handle, mip_level, array_layer }) => {
                        let (handle, mip_level, array_layer) = (*handle, *mip_level, *array_layer);
                        Ok((objects.textures.get_mut(handle)?, mip_level, array_layer))
                    }
                    None => Err(crate::lumen_invalid!(SOURCE, "render target has no color attachment {}", index)),
                }
            }
        }
    }

    fn depth_stencil_attachment(&mut self, target: RenderTargetRef) -> Result<Option<(&mut NullTexture, u32, u32)>> {
        let objects = &mut *self.objects;
        match target {
            RenderTargetRef::SwapChain(h) => Ok(objects
                .swap_chains
                .get_mut(h)?
                .depth_stencil_buffer_mut()
                .map(|texture| (texture, 0, 0))),
            RenderTargetRef::RenderTarget(h) => {
                let render_target = objects.render_targets.get_mut(h)?;
                match render_target.depth_stencil.as_mut() {
                    Some(NullAttachment::Internal(texture)) => Ok(Some((texture, 0, 0))),
                    Some(NullAttachment::Texture { handle, mip_level, array_layer }) => {
                        let (handle, mip_level, array_layer) = (*handle, *mip_level, *array_layer);
                        Ok(Some((objects.textures.get_mut(handle)?, mip_level, array_layer)))
                    }
                    None => Ok(None),
                }
            }
        }
    }

    /// Clear color attachments (all, or only `only_color`) and depth-stencil
    fn clear_target(&mut self, target: RenderTargetRef, flags: ClearFlags, value: &ClearValue, only_color: Option<u32>) -> Result<()> {
        if flags.contains(ClearFlags::COLOR) {
            let count = self.num_color_attachments(target)?;
            for index in 0..count {
                if only_color.is_some_and(|only| only != index) {
                    continue;
                }
                let (texture, mip_level, array_layer) = self.color_attachment(target, index as usize)?;
                texture.clear_layer(mip_level, array_layer, value, ClearFlags::COLOR)?;
            }
        }
        let depth_flags = flags & ClearFlags::DEPTH_STENCIL;
        if !depth_flags.is_empty() {
            if let Some((texture, mip_level, array_layer)) = self.depth_stencil_attachment(target)? {
                texture.clear_layer(mip_level, array_layer, value, depth_flags)?;
            }
        }
        Ok(())
    }

    /// Apply the Clear load ops of a render pass
    ///
    /// Clear values are consumed in attachment order, colors first; missing
    /// values fall back to the default clear value.
    fn apply_load_ops(&mut self, target: RenderTargetRef, pass: &RenderPassDescriptor, clear_values: &[ClearValue]) -> Result<()> {
        let mut next = 0usize;
        let mut take = |values: &[ClearValue]| {
            let value = values.get(next).copied().unwrap_or_default();
            next += 1;
            value
        };
        for (index, attachment) in pass.color_attachments.iter().enumerate() {
            if attachment.load_op == AttachmentLoadOp::Clear {
                let value = take(clear_values);
                let (texture, mip_level, array_layer) = self.color_attachment(target, index)?;
                texture.clear_layer(mip_level, array_layer, &value, ClearFlags::COLOR)?;
            }
        }
        let mut flags = ClearFlags::empty();
        if pass.depth_attachment.is_some_and(|a| a.load_op == AttachmentLoadOp::Clear) {
            flags |= ClearFlags::DEPTH;
        }
        if pass.stencil_attachment.is_some_and(|a| a.load_op == AttachmentLoadOp::Clear) {
            flags |= ClearFlags::STENCIL;
        }
        if !flags.is_empty() {
            let value = take(clear_values);
            if let Some((texture, mip_level, array_layer)) = self.depth_stencil_attachment(target)? {
                texture.clear_layer(mip_level, array_layer, &value, flags)?;
            }
        }
        Ok(())
    }
}
