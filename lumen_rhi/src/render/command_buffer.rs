/// Deferred command buffer shared by every backend
///
/// Recording only checks the protocol (Begin/End bracketing, render-pass
/// scope, bound state). Commands reference objects by handle; the backend
/// resolves and range-checks them when the buffer is submitted.

use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::format::Format;
use crate::render::{
    AttachmentClear, BufferArrayHandle, BufferHandle, ClearFlags, ClearValue, Extent3D, Offset2D,
    PipelineStateHandle, QueryHeapHandle, RenderPassHandle, RenderTargetHandle, ResourceHeapHandle,
    ResourceViewDescriptor, Scissor, SwapChainHandle, TextureHandle, TextureLocation, TextureRegion,
    TextureSubresource, Viewport, WHOLE_SIZE,
};

/// Largest payload accepted by `update_buffer`
pub const MAX_UPDATE_BUFFER_SIZE: usize = 65536;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CommandBufferFlags: u32 {
        /// Recorded once, executed inside another command buffer
        const SECONDARY    = 1 << 0;
        /// May be submitted more than once without re-recording
        const MULTI_SUBMIT = 1 << 1;
    }
}

/// Descriptor for creating a command buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBufferDescriptor {
    pub debug_name: Option<String>,
    pub flags: CommandBufferFlags,
}

impl Default for CommandBufferDescriptor {
    fn default() -> Self {
        Self {
            debug_name: None,
            flags: CommandBufferFlags::MULTI_SUBMIT,
        }
    }
}

/// Recording state of a command buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordingState {
    /// Nothing recorded yet, or consumed by a one-time submit
    Initial,
    /// Between `begin` and `end`
    Recording,
    /// Ended and ready to submit
    Executable,
}

/// Framebuffer a render pass draws into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTargetRef {
    SwapChain(SwapChainHandle),
    RenderTarget(RenderTargetHandle),
}

/// One recorded command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    UpdateBuffer { dst: BufferHandle, offset: u64, data: Vec<u8> },
    CopyBuffer { dst: BufferHandle, dst_offset: u64, src: BufferHandle, src_offset: u64, size: u64 },
    CopyBufferFromTexture {
        dst: BufferHandle,
        dst_offset: u64,
        src: TextureHandle,
        src_region: TextureRegion,
        row_stride: u32,
        layer_stride: u32,
    },
    CopyTexture {
        dst: TextureHandle,
        dst_location: TextureLocation,
        src: TextureHandle,
        src_location: TextureLocation,
        extent: Extent3D,
    },
    CopyTextureFromBuffer {
        dst: TextureHandle,
        dst_region: TextureRegion,
        src: BufferHandle,
        src_offset: u64,
        row_stride: u32,
        layer_stride: u32,
    },
    CopyTextureFromFramebuffer { dst: TextureHandle, dst_region: TextureRegion, src_offset: Offset2D },
    FillBuffer { dst: BufferHandle, offset: u64, value: u32, size: u64 },
    GenerateMips { texture: TextureHandle, subresource: Option<TextureSubresource> },
    SetViewports(Vec<Viewport>),
    SetScissors(Vec<Scissor>),
    SetBlendFactor([f32; 4]),
    SetStencilReference(u32),
    SetUniforms { first: u32, data: Vec<u8> },
    SetVertexBuffer(BufferHandle),
    SetVertexBufferArray(BufferArrayHandle),
    SetIndexBuffer { buffer: BufferHandle, format: Format, offset: u64 },
    SetPipelineState(PipelineStateHandle),
    SetResourceHeap { heap: ResourceHeapHandle, first_set: u32 },
    SetResource { descriptor: u32, resource: ResourceViewDescriptor },
    BeginRenderPass { target: RenderTargetRef, render_pass: Option<RenderPassHandle>, clear_values: Vec<ClearValue> },
    EndRenderPass,
    Clear { flags: ClearFlags, value: ClearValue },
    ClearAttachments(Vec<AttachmentClear>),
    Draw { num_vertices: u32, first_vertex: u32, num_instances: u32, first_instance: u32 },
    DrawIndexed { num_indices: u32, first_index: u32, vertex_offset: i32, num_instances: u32, first_instance: u32 },
    Dispatch { x: u32, y: u32, z: u32 },
    BeginQuery { heap: QueryHeapHandle, query: u32 },
    EndQuery { heap: QueryHeapHandle, query: u32 },
    PushDebugGroup(String),
    PopDebugGroup,
}

impl Command {
    /// Short command name for logs and tests
    pub fn name(&self) -> &'static str {
        match self {
            Command::UpdateBuffer { .. } => "update_buffer",
            Command::CopyBuffer { .. } => "copy_buffer",
            Command::CopyBufferFromTexture { .. } => "copy_buffer_from_texture",
            Command::CopyTexture { .. } => "copy_texture",
            Command::CopyTextureFromBuffer { .. } => "copy_texture_from_buffer",
            Command::CopyTextureFromFramebuffer { .. } => "copy_texture_from_framebuffer",
            Command::FillBuffer { .. } => "fill_buffer",
            Command::GenerateMips { .. } => "generate_mips",
            Command::SetViewports(_) => "set_viewports",
            Command::SetScissors(_) => "set_scissors",
            Command::SetBlendFactor(_) => "set_blend_factor",
            Command::SetStencilReference(_) => "set_stencil_reference",
            Command::SetUniforms { .. } => "set_uniforms",
            Command::SetVertexBuffer(_) => "set_vertex_buffer",
            Command::SetVertexBufferArray(_) => "set_vertex_buffer_array",
            Command::SetIndexBuffer { .. } => "set_index_buffer",
            Command::SetPipelineState(_) => "set_pipeline_state",
            Command::SetResourceHeap { .. } => "set_resource_heap",
            Command::SetResource { .. } => "set_resource",
            Command::BeginRenderPass { .. } => "begin_render_pass",
            Command::EndRenderPass => "end_render_pass",
            Command::Clear { .. } => "clear",
            Command::ClearAttachments(_) => "clear_attachments",
            Command::Draw { .. } => "draw",
            Command::DrawIndexed { .. } => "draw_indexed",
            Command::Dispatch { .. } => "dispatch",
            Command::BeginQuery { .. } => "begin_query",
            Command::EndQuery { .. } => "end_query",
            Command::PushDebugGroup(_) => "push_debug_group",
            Command::PopDebugGroup => "pop_debug_group",
        }
    }
}

/// Deferred command recorder
pub struct CommandBuffer {
    desc: CommandBufferDescriptor,
    state: RecordingState,
    commands: Vec<Command>,
    render_pass: Option<RenderTargetRef>,
    pipeline: Option<PipelineStateHandle>,
    index_buffer_bound: bool,
    debug_group_depth: u32,
    active_queries: Vec<(QueryHeapHandle, u32)>,
    submit_count: u64,
}

const SOURCE: &str = "lumen::CommandBuffer";

fn protocol_error(message: String) -> Error {
    crate::lumen_warn!(SOURCE, "{}", message);
    Error::InvalidState(message)
}

impl CommandBuffer {
    pub fn new(desc: &CommandBufferDescriptor) -> Self {
        Self {
            desc: desc.clone(),
            state: RecordingState::Initial,
            commands: Vec::new(),
            render_pass: None,
            pipeline: None,
            index_buffer_bound: false,
            debug_group_depth: 0,
            active_queries: Vec::new(),
            submit_count: 0,
        }
    }

    pub fn descriptor(&self) -> &CommandBufferDescriptor {
        &self.desc
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn submit_count(&self) -> u64 {
        self.submit_count
    }

    pub fn is_inside_render_pass(&self) -> bool {
        self.render_pass.is_some()
    }

    pub fn set_debug_name(&mut self, name: &str) {
        self.desc.debug_name = Some(name.to_string());
    }

    // ===== RECORDING SCOPE =====

    /// Start recording, discarding previously recorded commands
    ///
    /// # Errors
    ///
    /// `InvalidState` if the buffer is already recording
    pub fn begin(&mut self) -> Result<()> {
        if self.state == RecordingState::Recording {
            return Err(protocol_error("begin called while already recording".to_string()));
        }
        self.commands.clear();
        self.render_pass = None;
        self.pipeline = None;
        self.index_buffer_bound = false;
        self.debug_group_depth = 0;
        self.active_queries.clear();
        self.state = RecordingState::Recording;
        Ok(())
    }

    /// Finish recording
    ///
    /// # Errors
    ///
    /// `InvalidState` if not recording, or if a render pass, debug group or
    /// query is still open
    pub fn end(&mut self) -> Result<()> {
        self.expect_recording("end")?;
        if self.render_pass.is_some() {
            return Err(protocol_error("end called inside a render pass".to_string()));
        }
        if self.debug_group_depth > 0 {
            return Err(protocol_error(format!(
                "end called with {} open debug group(s)",
                self.debug_group_depth
            )));
        }
        if !self.active_queries.is_empty() {
            return Err(protocol_error(format!(
                "end called with {} active query(ies)",
                self.active_queries.len()
            )));
        }
        self.state = RecordingState::Executable;
        crate::lumen_trace!(SOURCE, "recorded {} commands", self.commands.len());
        Ok(())
    }

    /// Bookkeeping after the backend executed the buffer
    ///
    /// One-time buffers return to `Initial`.
    pub fn mark_submitted(&mut self) -> Result<()> {
        if self.state != RecordingState::Executable {
            return Err(protocol_error(format!(
                "cannot submit a command buffer in state {:?}",
                self.state
            )));
        }
        self.submit_count += 1;
        if !self.desc.flags.contains(CommandBufferFlags::MULTI_SUBMIT) {
            self.commands.clear();
            self.state = RecordingState::Initial;
        }
        Ok(())
    }

    /// Check the buffer can be submitted (used by backends before execution)
    pub fn check_executable(&self) -> Result<()> {
        if self.state != RecordingState::Executable {
            return Err(protocol_error(format!(
                "cannot submit a command buffer in state {:?}",
                self.state
            )));
        }
        Ok(())
    }

    fn expect_recording(&self, what: &str) -> Result<()> {
        if self.state != RecordingState::Recording {
            return Err(protocol_error(format!("{} called outside begin/end", what)));
        }
        Ok(())
    }

    fn expect_outside_pass(&self, what: &str) -> Result<()> {
        self.expect_recording(what)?;
        if self.render_pass.is_some() {
            return Err(protocol_error(format!("{} is not allowed inside a render pass", what)));
        }
        Ok(())
    }

    fn expect_inside_pass(&self, what: &str) -> Result<()> {
        self.expect_recording(what)?;
        if self.render_pass.is_none() {
            return Err(protocol_error(format!("{} requires an active render pass", what)));
        }
        Ok(())
    }

    fn expect_pipeline(&self, what: &str) -> Result<()> {
        if self.pipeline.is_none() {
            return Err(protocol_error(format!("{} requires a bound pipeline state", what)));
        }
        Ok(())
    }

    // ===== BUFFER AND TEXTURE COPIES =====

    /// Write a small payload into a buffer (at most 64 KiB, 4-byte aligned)
    pub fn update_buffer(&mut self, dst: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        self.expect_outside_pass("update_buffer")?;
        if data.is_empty() || data.len() > MAX_UPDATE_BUFFER_SIZE {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "update_buffer payload must be 1..={} bytes (got {})",
                MAX_UPDATE_BUFFER_SIZE, data.len()
            ));
        }
        if offset % 4 != 0 || data.len() % 4 != 0 {
            return Err(crate::lumen_invalid!(SOURCE, "update_buffer offset and size must be 4-byte aligned"));
        }
        self.commands.push(Command::UpdateBuffer { dst, offset, data: data.to_vec() });
        Ok(())
    }

    /// Copy `size` bytes between buffers
    pub fn copy_buffer(&mut self, dst: BufferHandle, dst_offset: u64, src: BufferHandle, src_offset: u64, size: u64) -> Result<()> {
        self.expect_outside_pass("copy_buffer")?;
        if size == 0 {
            return Err(crate::lumen_invalid!(SOURCE, "copy_buffer size must be non-zero"));
        }
        if dst == src {
            let overlap = dst_offset < src_offset.saturating_add(size) && src_offset < dst_offset.saturating_add(size);
            if overlap {
                return Err(crate::lumen_invalid!(SOURCE, "copy_buffer source and destination ranges overlap"));
            }
        }
        self.commands.push(Command::CopyBuffer { dst, dst_offset, src, src_offset, size });
        Ok(())
    }

    /// Copy a texture region into a buffer
    ///
    /// A zero `row_stride`/`layer_stride` means tightly packed.
    pub fn copy_buffer_from_texture(
        &mut self,
        dst: BufferHandle,
        dst_offset: u64,
        src: TextureHandle,
        src_region: &TextureRegion,
        row_stride: u32,
        layer_stride: u32,
    ) -> Result<()> {
        self.expect_outside_pass("copy_buffer_from_texture")?;
        check_region(src_region)?;
        self.commands.push(Command::CopyBufferFromTexture {
            dst,
            dst_offset,
            src,
            src_region: *src_region,
            row_stride,
            layer_stride,
        });
        Ok(())
    }

    /// Copy a texel box between textures
    pub fn copy_texture(
        &mut self,
        dst: TextureHandle,
        dst_location: &TextureLocation,
        src: TextureHandle,
        src_location: &TextureLocation,
        extent: Extent3D,
    ) -> Result<()> {
        self.expect_outside_pass("copy_texture")?;
        if extent.is_zero() {
            return Err(crate::lumen_invalid!(SOURCE, "copy_texture extent must be non-zero"));
        }
        self.commands.push(Command::CopyTexture {
            dst,
            dst_location: *dst_location,
            src,
            src_location: *src_location,
            extent,
        });
        Ok(())
    }

    /// Copy buffer contents into a texture region
    pub fn copy_texture_from_buffer(
        &mut self,
        dst: TextureHandle,
        dst_region: &TextureRegion,
        src: BufferHandle,
        src_offset: u64,
        row_stride: u32,
        layer_stride: u32,
    ) -> Result<()> {
        self.expect_outside_pass("copy_texture_from_buffer")?;
        check_region(dst_region)?;
        self.commands.push(Command::CopyTextureFromBuffer {
            dst,
            dst_region: *dst_region,
            src,
            src_offset,
            row_stride,
            layer_stride,
        });
        Ok(())
    }

    /// Copy from the color buffer of the active render pass into a texture
    pub fn copy_texture_from_framebuffer(&mut self, dst: TextureHandle, dst_region: &TextureRegion, src_offset: Offset2D) -> Result<()> {
        self.expect_inside_pass("copy_texture_from_framebuffer")?;
        check_region(dst_region)?;
        if dst_region.extent.depth != 1 {
            return Err(crate::lumen_invalid!(SOURCE, "framebuffer copies are two-dimensional"));
        }
        self.commands.push(Command::CopyTextureFromFramebuffer { dst, dst_region: *dst_region, src_offset });
        Ok(())
    }

    /// Fill a buffer range with a repeated 32-bit value
    ///
    /// `size` may be `WHOLE_SIZE`; otherwise offset and size are 4-byte aligned.
    pub fn fill_buffer(&mut self, dst: BufferHandle, offset: u64, value: u32, size: u64) -> Result<()> {
        self.expect_outside_pass("fill_buffer")?;
        if offset % 4 != 0 || (size != WHOLE_SIZE && size % 4 != 0) {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "fill_buffer offset ({}) and size ({}) must be 4-byte aligned",
                offset, size
            ));
        }
        if size == 0 {
            return Err(crate::lumen_invalid!(SOURCE, "fill_buffer size must be non-zero"));
        }
        self.commands.push(Command::FillBuffer { dst, offset, value, size });
        Ok(())
    }

    /// Regenerate the whole MIP chain from level 0
    pub fn generate_mips(&mut self, texture: TextureHandle) -> Result<()> {
        self.expect_outside_pass("generate_mips")?;
        self.commands.push(Command::GenerateMips { texture, subresource: None });
        Ok(())
    }

    /// Regenerate MIP levels of a subresource from its base level
    pub fn generate_mips_range(&mut self, texture: TextureHandle, subresource: &TextureSubresource) -> Result<()> {
        self.expect_outside_pass("generate_mips")?;
        if subresource.num_mip_levels == 0 || subresource.num_array_layers == 0 {
            return Err(crate::lumen_invalid!(SOURCE, "generate_mips subresource is empty"));
        }
        self.commands.push(Command::GenerateMips { texture, subresource: Some(*subresource) });
        Ok(())
    }

    // ===== DYNAMIC STATE =====

    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.set_viewports(&[viewport])
    }

    pub fn set_viewports(&mut self, viewports: &[Viewport]) -> Result<()> {
        self.expect_recording("set_viewports")?;
        if viewports.is_empty() {
            return Err(crate::lumen_invalid!(SOURCE, "set_viewports needs at least one viewport"));
        }
        self.commands.push(Command::SetViewports(viewports.to_vec()));
        Ok(())
    }

    pub fn set_scissor(&mut self, scissor: Scissor) -> Result<()> {
        self.set_scissors(&[scissor])
    }

    pub fn set_scissors(&mut self, scissors: &[Scissor]) -> Result<()> {
        self.expect_recording("set_scissors")?;
        if scissors.is_empty() {
            return Err(crate::lumen_invalid!(SOURCE, "set_scissors needs at least one scissor"));
        }
        self.commands.push(Command::SetScissors(scissors.to_vec()));
        Ok(())
    }

    pub fn set_blend_factor(&mut self, color: [f32; 4]) -> Result<()> {
        self.expect_recording("set_blend_factor")?;
        self.commands.push(Command::SetBlendFactor(color));
        Ok(())
    }

    pub fn set_stencil_reference(&mut self, reference: u32) -> Result<()> {
        self.expect_recording("set_stencil_reference")?;
        self.commands.push(Command::SetStencilReference(reference));
        Ok(())
    }

    /// Set uniform (push constant) data starting at uniform index `first`
    pub fn set_uniforms(&mut self, first: u32, data: &[u8]) -> Result<()> {
        self.expect_recording("set_uniforms")?;
        if data.is_empty() || data.len() % 4 != 0 {
            return Err(crate::lumen_invalid!(SOURCE, "uniform data must be a non-zero multiple of 4 bytes"));
        }
        self.commands.push(Command::SetUniforms { first, data: data.to_vec() });
        Ok(())
    }

    // ===== INPUT ASSEMBLY AND BINDINGS =====

    pub fn set_vertex_buffer(&mut self, buffer: BufferHandle) -> Result<()> {
        self.expect_recording("set_vertex_buffer")?;
        self.commands.push(Command::SetVertexBuffer(buffer));
        Ok(())
    }

    pub fn set_vertex_buffer_array(&mut self, array: BufferArrayHandle) -> Result<()> {
        self.expect_recording("set_vertex_buffer_array")?;
        self.commands.push(Command::SetVertexBufferArray(array));
        Ok(())
    }

    pub fn set_index_buffer(&mut self, buffer: BufferHandle, format: Format, offset: u64) -> Result<()> {
        self.expect_recording("set_index_buffer")?;
        if !format.is_index_format() {
            return Err(crate::lumen_invalid!(SOURCE, "{:?} is not an index format", format));
        }
        self.index_buffer_bound = true;
        self.commands.push(Command::SetIndexBuffer { buffer, format, offset });
        Ok(())
    }

    pub fn set_pipeline_state(&mut self, pipeline: PipelineStateHandle) -> Result<()> {
        self.expect_recording("set_pipeline_state")?;
        self.pipeline = Some(pipeline);
        self.commands.push(Command::SetPipelineState(pipeline));
        Ok(())
    }

    pub fn set_resource_heap(&mut self, heap: ResourceHeapHandle, first_set: u32) -> Result<()> {
        self.expect_recording("set_resource_heap")?;
        self.commands.push(Command::SetResourceHeap { heap, first_set });
        Ok(())
    }

    /// Bind a single resource to a dynamic binding of the current layout
    pub fn set_resource(&mut self, descriptor: u32, resource: ResourceViewDescriptor) -> Result<()> {
        self.expect_recording("set_resource")?;
        self.commands.push(Command::SetResource { descriptor, resource });
        Ok(())
    }

    // ===== RENDER PASSES =====

    pub fn begin_render_pass(
        &mut self,
        target: RenderTargetRef,
        render_pass: Option<RenderPassHandle>,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        self.expect_outside_pass("begin_render_pass")?;
        self.render_pass = Some(target);
        self.commands.push(Command::BeginRenderPass {
            target,
            render_pass,
            clear_values: clear_values.to_vec(),
        });
        Ok(())
    }

    pub fn end_render_pass(&mut self) -> Result<()> {
        self.expect_inside_pass("end_render_pass")?;
        self.render_pass = None;
        self.commands.push(Command::EndRenderPass);
        Ok(())
    }

    /// Framebuffer of the active render pass
    pub fn current_render_target(&self) -> Option<RenderTargetRef> {
        self.render_pass
    }

    pub fn clear(&mut self, flags: ClearFlags, value: ClearValue) -> Result<()> {
        self.expect_inside_pass("clear")?;
        self.commands.push(Command::Clear { flags, value });
        Ok(())
    }

    pub fn clear_attachments(&mut self, attachments: &[AttachmentClear]) -> Result<()> {
        self.expect_inside_pass("clear_attachments")?;
        self.commands.push(Command::ClearAttachments(attachments.to_vec()));
        Ok(())
    }

    // ===== DRAWING AND COMPUTE =====

    pub fn draw(&mut self, num_vertices: u32, first_vertex: u32) -> Result<()> {
        self.draw_instanced(num_vertices, first_vertex, 1, 0)
    }

    pub fn draw_instanced(&mut self, num_vertices: u32, first_vertex: u32, num_instances: u32, first_instance: u32) -> Result<()> {
        self.expect_inside_pass("draw")?;
        self.expect_pipeline("draw")?;
        self.commands.push(Command::Draw { num_vertices, first_vertex, num_instances, first_instance });
        Ok(())
    }

    pub fn draw_indexed(&mut self, num_indices: u32, first_index: u32) -> Result<()> {
        self.draw_indexed_instanced(num_indices, first_index, 0, 1, 0)
    }

    pub fn draw_indexed_instanced(
        &mut self,
        num_indices: u32,
        first_index: u32,
        vertex_offset: i32,
        num_instances: u32,
        first_instance: u32,
    ) -> Result<()> {
        self.expect_inside_pass("draw_indexed")?;
        self.expect_pipeline("draw_indexed")?;
        if !self.index_buffer_bound {
            return Err(protocol_error("draw_indexed requires a bound index buffer".to_string()));
        }
        self.commands.push(Command::DrawIndexed {
            num_indices,
            first_index,
            vertex_offset,
            num_instances,
            first_instance,
        });
        Ok(())
    }

    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        self.expect_outside_pass("dispatch")?;
        self.expect_pipeline("dispatch")?;
        if x == 0 || y == 0 || z == 0 {
            return Err(crate::lumen_invalid!(SOURCE, "dispatch work group count {}x{}x{} is empty", x, y, z));
        }
        self.commands.push(Command::Dispatch { x, y, z });
        Ok(())
    }

    // ===== QUERIES AND DEBUG GROUPS =====

    pub fn begin_query(&mut self, heap: QueryHeapHandle, query: u32) -> Result<()> {
        self.expect_recording("begin_query")?;
        if self.active_queries.contains(&(heap, query)) {
            return Err(protocol_error(format!("query {} is already active", query)));
        }
        self.active_queries.push((heap, query));
        self.commands.push(Command::BeginQuery { heap, query });
        Ok(())
    }

    pub fn end_query(&mut self, heap: QueryHeapHandle, query: u32) -> Result<()> {
        self.expect_recording("end_query")?;
        let Some(index) = self.active_queries.iter().position(|q| *q == (heap, query)) else {
            return Err(protocol_error(format!("query {} was not begun", query)));
        };
        self.active_queries.swap_remove(index);
        self.commands.push(Command::EndQuery { heap, query });
        Ok(())
    }

    pub fn push_debug_group(&mut self, name: &str) -> Result<()> {
        self.expect_recording("push_debug_group")?;
        self.debug_group_depth += 1;
        self.commands.push(Command::PushDebugGroup(name.to_string()));
        Ok(())
    }

    pub fn pop_debug_group(&mut self) -> Result<()> {
        self.expect_recording("pop_debug_group")?;
        if self.debug_group_depth == 0 {
            return Err(protocol_error("pop_debug_group without matching push".to_string()));
        }
        self.debug_group_depth -= 1;
        self.commands.push(Command::PopDebugGroup);
        Ok(())
    }

    /// Buffers the recorded commands read from or write to
    ///
    /// Buffer arrays and resource heaps are reported by handle; the backend
    /// expands them to their member buffers against its own containers.
    pub fn referenced_buffers(&self) -> BufferReferences {
        let mut refs = BufferReferences::default();
        for command in &self.commands {
            match command {
                Command::UpdateBuffer { dst, .. } | Command::FillBuffer { dst, .. } => {
                    refs.buffers.insert(*dst);
                }
                Command::CopyBuffer { dst, src, .. } => {
                    refs.buffers.insert(*dst);
                    refs.buffers.insert(*src);
                }
                Command::CopyBufferFromTexture { dst, .. } => {
                    refs.buffers.insert(*dst);
                }
                Command::CopyTextureFromBuffer { src, .. } => {
                    refs.buffers.insert(*src);
                }
                Command::SetVertexBuffer(buffer) | Command::SetIndexBuffer { buffer, .. } => {
                    refs.buffers.insert(*buffer);
                }
                Command::SetResource { resource: ResourceViewDescriptor::Buffer(buffer), .. } => {
                    refs.buffers.insert(*buffer);
                }
                Command::SetVertexBufferArray(array) => {
                    refs.buffer_arrays.insert(*array);
                }
                Command::SetResourceHeap { heap, .. } => {
                    refs.resource_heaps.insert(*heap);
                }
                _ => {}
            }
        }
        refs
    }
}

/// Buffer-bearing objects referenced by a recorded command buffer
#[derive(Debug, Clone, Default)]
pub struct BufferReferences {
    pub buffers: FxHashSet<BufferHandle>,
    pub buffer_arrays: FxHashSet<BufferArrayHandle>,
    pub resource_heaps: FxHashSet<ResourceHeapHandle>,
}

impl BufferReferences {
    /// Every referenced buffer, with arrays and heaps expanded by the backend
    ///
    /// `array_members` and `heap_buffers` resolve a handle to the buffers it
    /// holds and fail for stale handles.
    pub fn expand<A, H>(&self, mut array_members: A, mut heap_buffers: H) -> Result<FxHashSet<BufferHandle>>
    where
        A: FnMut(BufferArrayHandle) -> Result<Vec<BufferHandle>>,
        H: FnMut(ResourceHeapHandle) -> Result<Vec<BufferHandle>>,
    {
        let mut buffers = self.buffers.clone();
        for array in &self.buffer_arrays {
            buffers.extend(array_members(*array)?);
        }
        for heap in &self.resource_heaps {
            buffers.extend(heap_buffers(*heap)?);
        }
        Ok(buffers)
    }
}

fn check_region(region: &TextureRegion) -> Result<()> {
    if region.extent.is_zero() {
        return Err(crate::lumen_invalid!(SOURCE, "texture region extent must be non-zero"));
    }
    if region.subresource.num_array_layers == 0 || region.subresource.num_mip_levels != 1 {
        return Err(crate::lumen_invalid!(
            SOURCE,
            "texture region must address at least one layer of exactly one MIP level"
        ));
    }
    if region.offset.x < 0 || region.offset.y < 0 || region.offset.z < 0 {
        return Err(crate::lumen_invalid!(SOURCE, "texture region offset must be non-negative"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "command_buffer_tests.rs"]
mod tests;
