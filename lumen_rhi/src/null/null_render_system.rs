/// Null render system: every object lives in CPU memory
///
/// Commands recorded into command buffers execute on the CPU at submit, so
/// clears, copies, fills and MIP generation produce observable results
/// without a GPU. Draws and dispatches are validated and counted.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::runtime::{BackendLease, Runtime};
use crate::render::*;

use super::null_command_executor::{NullExecutor, NullStatistics};
use super::null_objects::*;
use super::null_swap_chain::{NullStateManager, NullSwapChain};

const SOURCE: &str = "lumen::null";

/// Shader profiles the Null compiler accepts without a warning
fn is_known_profile(profile: &str) -> bool {
    let profile = profile.to_ascii_lowercase();
    matches!(profile.as_str(), "" | "spirv" | "glsl" | "hlsl")
        || profile.chars().all(|c| c.is_ascii_digit())
        || ["vs_", "ps_", "cs_", "gs_", "hs_", "ds_", "metal"]
            .iter()
            .any(|prefix| profile.starts_with(prefix))
}

/// "Compile" a shader into a report
fn compile_shader(desc: &ShaderDescriptor) -> Report {
    let mut report = Report::new();
    match &desc.source {
        ShaderSource::Code(code) => {
            if code.trim().is_empty() {
                report.error("shader source is empty");
            }
            if desc.entry_point.is_empty() {
                report.error("shader entry point is missing");
            }
        }
        ShaderSource::Binary(bytes) => {
            if bytes.is_empty() {
                report.error("shader binary is empty");
            } else if bytes.len() % 4 != 0 {
                report.error(format!("shader binary size {} is not a multiple of 4", bytes.len()));
            }
        }
    }
    if !is_known_profile(&desc.profile) {
        report.warning(format!("unknown shader profile '{}'", desc.profile));
    }
    if desc.shader_type != ShaderType::Vertex && !desc.vertex_attributes.is_empty() {
        report.warning(format!("vertex attributes ignored on a {:?} shader", desc.shader_type));
    }
    report
}

/// Render system of the Null backend
pub struct NullRenderSystem {
    _lease: BackendLease,
    debug_name: Option<String>,
    info: RendererInfo,
    limits: RenderingLimits,
    objects: NullObjects,
    state: NullStateManager,
    stats: NullStatistics,
}

impl NullRenderSystem {
    /// Create a Null render system
    ///
    /// # Errors
    ///
    /// `InitializationFailed` if another Null render system is alive
    pub fn new(desc: &RenderSystemDescriptor) -> Result<Self> {
        let lease = Runtime::acquire_backend(Backend::Null)?;
        let info = RendererInfo {
            renderer_name: "Null".to_string(),
            device_name: "Null Device".to_string(),
            vendor_name: "Lumen".to_string(),
            shading_language_name: "none".to_string(),
            extension_names: Vec::new(),
        };
        crate::lumen_info!(
            SOURCE,
            "Null render system created ({})",
            desc.debug_name.as_deref().unwrap_or("unnamed")
        );
        Ok(Self {
            _lease: lease,
            debug_name: desc.debug_name.clone(),
            info,
            limits: desc.null.limits.clone(),
            objects: NullObjects::new(),
            state: NullStateManager::new(),
            stats: NullStatistics::default(),
        })
    }

    /// Backend loader registered with the runtime
    pub fn load(desc: &RenderSystemDescriptor) -> Result<Box<dyn RenderSystem>> {
        Ok(Box::new(Self::new(desc)?))
    }

    pub fn statistics(&self) -> NullStatistics {
        self.stats
    }

    pub fn state_manager(&self) -> &NullStateManager {
        &self.state
    }

    /// Concrete swap chain, for inspecting its back buffers
    pub fn null_swap_chain(&self, handle: SwapChainHandle) -> Result<&NullSwapChain> {
        self.objects.swap_chains.get(handle)
    }

    /// Number of live objects of every kind
    pub fn object_count(&self) -> usize {
        self.objects.count()
    }

    // ===== VALIDATION HELPERS =====

    fn check_render_pass(&self, desc: &RenderPassDescriptor) -> Result<()> {
        if desc.color_attachments.len() as u32 > self.limits.max_color_attachments {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "{} color attachments exceed device limit {}",
                desc.color_attachments.len(), self.limits.max_color_attachments
            ));
        }
        if let Some(attachment) = desc.color_attachments.iter().find(|a| a.format != crate::format::Format::Undefined && !a.format.is_color()) {
            return Err(crate::lumen_invalid!(SOURCE, "{:?} is not a color format", attachment.format));
        }
        if let Some(depth) = desc.depth_attachment {
            if !depth.format.is_depth() {
                return Err(crate::lumen_invalid!(SOURCE, "{:?} is not a depth format", depth.format));
            }
        }
        if let Some(stencil) = desc.stencil_attachment {
            if !stencil.format.is_stencil() {
                return Err(crate::lumen_invalid!(SOURCE, "{:?} is not a stencil format", stencil.format));
            }
        }
        Ok(())
    }

    fn create_attachment(&self, desc: &RenderTargetDescriptor, attachment: &AttachmentDescriptor, usage: BindFlags, samples: u32) -> Result<NullAttachment> {
        let Some(handle) = attachment.texture else {
            if attachment.format == crate::format::Format::Undefined {
                return Err(crate::lumen_invalid!(SOURCE, "render target attachment needs a texture or a format"));
            }
            return Ok(NullAttachment::Internal(NullTexture::new(&TextureDescriptor {
                texture_type: if samples > 1 { TextureType::Texture2DMS } else { TextureType::Texture2D },
                bind_flags: usage,
                format: attachment.format,
                extent: Extent3D::from(desc.resolution),
                mip_levels: 1,
                samples,
                ..Default::default()
            })));
        };

        let texture = self.objects.textures.get(handle)?;
        if !texture.desc.bind_flags.contains(usage) {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "attachment texture {:?} was not created with {:?}",
                texture.desc.debug_name, usage
            ));
        }
        if attachment.mip_level >= texture.num_mip_levels() {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "attachment MIP level {} out of range ({} levels)",
                attachment.mip_level, texture.num_mip_levels()
            ));
        }
        if attachment.array_layer >= mip_extent_layers(&texture.desc) {
            return Err(crate::lumen_invalid!(SOURCE, "attachment array layer {} out of range", attachment.array_layer));
        }
        validate_mip_resolution(desc.resolution, &texture.desc, attachment.mip_level)?;
        Ok(NullAttachment::Texture {
            handle,
            mip_level: attachment.mip_level,
            array_layer: attachment.array_layer,
        })
    }

    fn check_views(&self, layout: &PipelineLayoutDescriptor, first: u32, views: &[ResourceViewDescriptor]) -> Result<()> {
        let bindings = &layout.heap_bindings;
        for (i, view) in views.iter().enumerate() {
            let binding = &bindings[(first as usize + i) % bindings.len()];
            let (alive, resource_type) = match view {
                ResourceViewDescriptor::Buffer(h) => (self.objects.buffers.contains(*h), ResourceType::Buffer),
                ResourceViewDescriptor::Texture(h) => (self.objects.textures.contains(*h), ResourceType::Texture),
                ResourceViewDescriptor::Sampler(h) => (self.objects.samplers.contains(*h), ResourceType::Sampler),
            };
            if !alive {
                return Err(Error::InvalidResource(format!("resource view {} refers to a released object", first as usize + i)));
            }
            if resource_type != binding.resource_type {
                return Err(crate::lumen_invalid!(
                    SOURCE,
                    "resource view {} is a {:?} but binding '{}' expects a {:?}",
                    first as usize + i, resource_type, binding.name, binding.resource_type
                ));
            }
        }
        Ok(())
    }

    fn shader_lookup(&self) -> impl Fn(ShaderHandle) -> Option<ShaderInfo> + '_ {
        |handle| {
            self.objects.shaders.get(handle).ok().map(|shader| ShaderInfo {
                shader_type: shader.desc.shader_type,
                report: shader.report.clone(),
            })
        }
    }

    fn insert_pipeline(
        &mut self,
        debug_name: Option<String>,
        kind: PipelineKind,
        layout: Option<PipelineLayoutHandle>,
        samples: u32,
        report: Report,
        cache: Option<PipelineCacheHandle>,
    ) -> Result<PipelineStateHandle> {
        if let Some(cache) = cache {
            self.objects.pipeline_caches.get_mut(cache)?.num_pipelines += 1;
        }
        if report.has_errors() {
            crate::lumen_warn!(
                SOURCE,
                "{:?} pipeline '{}' has errors:\n{}",
                kind,
                debug_name.as_deref().unwrap_or("unnamed"),
                report.text()
            );
        }
        Ok(self.objects.pipeline_states.insert(NullPipelineState {
            debug_name,
            kind,
            layout,
            samples,
            report,
        }))
    }
}

/// Number of array layers a texture descriptor addresses
fn mip_extent_layers(desc: &TextureDescriptor) -> u32 {
    match desc.texture_type {
        TextureType::TextureCube => 6,
        TextureType::Texture3D => 1,
        _ => desc.array_layers.max(1),
    }
}

impl Drop for NullRenderSystem {
    fn drop(&mut self) {
        crate::lumen_info!(
            SOURCE,
            "Null render system destroyed ({}, {} objects released)",
            self.debug_name.as_deref().unwrap_or("unnamed"),
            self.objects.count()
        );
        self.objects.clear();
    }
}

impl CommandQueue for NullRenderSystem {
    fn submit(&mut self, command_buffer: CommandBufferHandle) -> Result<()> {
        NullExecutor {
            objects: &mut self.objects,
            limits: &self.limits,
            state_manager: &self.state,
            stats: &mut self.stats,
        }
        .submit(command_buffer)
    }

    fn submit_fence(&mut self, fence: FenceHandle) -> Result<()> {
        // Submitted work has already executed
        self.objects.fences.get_mut(fence)?.signaled = true;
        Ok(())
    }

    fn wait_fence(&mut self, fence: FenceHandle, _timeout: Duration) -> Result<bool> {
        Ok(self.objects.fences.get(fence)?.signaled)
    }

    fn wait_idle(&mut self) -> Result<()> {
        Ok(())
    }

    fn query_result(&mut self, heap: QueryHeapHandle, first_query: u32, num_queries: u32) -> Result<Option<Vec<u64>>> {
        let query_heap = self.objects.query_heaps.get(heap)?;
        let end = first_query as u64 + num_queries as u64;
        if num_queries == 0 || end > query_heap.desc.num_queries as u64 {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "queries [{}, +{}) out of range ({} queries)",
                first_query, num_queries, query_heap.desc.num_queries
            ));
        }
        let range = first_query as usize..end as usize;
        if query_heap.active[range.clone()].iter().any(|active| *active) {
            return Ok(None);
        }
        Ok(Some(query_heap.results[range].to_vec()))
    }
}

impl RenderSystem for NullRenderSystem {
    fn backend(&self) -> Backend {
        Backend::Null
    }

    fn renderer_info(&self) -> &RendererInfo {
        &self.info
    }

    fn rendering_limits(&self) -> &RenderingLimits {
        &self.limits
    }

    // ===== SWAP CHAINS =====

    fn create_swap_chain(&mut self, desc: &SwapChainDescriptor, surface: Arc<dyn Surface>) -> Result<SwapChainHandle> {
        let base = SwapChainBase::new(desc, surface, &self.limits)?;
        let state = self.state.clone();
        let handle = self
            .objects
            .swap_chains
            .insert_with_key(|handle| NullSwapChain::new(base, handle, state));
        let swap_chain = self.objects.swap_chains.get(handle)?;
        crate::lumen_debug!(
            SOURCE,
            "swap chain {}x{} ({:?}, {} samples, {} buffers)",
            swap_chain.resolution().width,
            swap_chain.resolution().height,
            swap_chain.color_format(),
            swap_chain.samples(),
            swap_chain.num_swap_buffers()
        );
        Ok(handle)
    }

    fn release_swap_chain(&mut self, handle: SwapChainHandle) -> bool {
        let released = self.objects.swap_chains.release(handle).is_some();
        if released {
            self.state.unbind_swap_chain(handle);
        }
        released
    }

    fn swap_chain(&self, handle: SwapChainHandle) -> Result<&dyn SwapChain> {
        Ok(self.objects.swap_chains.get(handle)?)
    }

    fn swap_chain_mut(&mut self, handle: SwapChainHandle) -> Result<&mut dyn SwapChain> {
        Ok(self.objects.swap_chains.get_mut(handle)?)
    }

    // ===== COMMAND BUFFERS =====

    fn create_command_buffer(&mut self, desc: &CommandBufferDescriptor) -> Result<CommandBufferHandle> {
        Ok(self.objects.command_buffers.insert(CommandBuffer::new(desc)))
    }

    fn release_command_buffer(&mut self, handle: CommandBufferHandle) -> bool {
        self.objects.command_buffers.release(handle).is_some()
    }

    fn command_buffer(&self, handle: CommandBufferHandle) -> Result<&CommandBuffer> {
        self.objects.command_buffers.get(handle)
    }

    fn command_buffer_mut(&mut self, handle: CommandBufferHandle) -> Result<&mut CommandBuffer> {
        self.objects.command_buffers.get_mut(handle)
    }

    // ===== BUFFERS =====

    fn create_buffer(&mut self, desc: &BufferDescriptor, initial_data: Option<&[u8]>) -> Result<BufferHandle> {
        validate_buffer_descriptor(desc, initial_data, &self.limits)?;
        Ok(self.objects.buffers.insert(NullBuffer::new(desc, initial_data)))
    }

    fn release_buffer(&mut self, handle: BufferHandle) -> bool {
        self.objects.buffers.release(handle).is_some()
    }

    fn buffer_descriptor(&self, handle: BufferHandle) -> Result<BufferDescriptor> {
        Ok(self.objects.buffers.get(handle)?.desc.clone())
    }

    fn write_buffer(&mut self, handle: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        let buffer = self.objects.buffers.get_mut(handle)?;
        buffer.check_not_mapped("write_buffer")?;
        let range = buffer.range(offset, data.len() as u64)?;
        buffer.data[range].copy_from_slice(data);
        Ok(())
    }

    fn read_buffer(&mut self, handle: BufferHandle, offset: u64, data: &mut [u8]) -> Result<()> {
        let buffer = self.objects.buffers.get(handle)?;
        buffer.check_not_mapped("read_buffer")?;
        let range = buffer.range(offset, data.len() as u64)?;
        data.copy_from_slice(&buffer.data[range]);
        Ok(())
    }

    fn map_buffer_range(&mut self, handle: BufferHandle, access: CpuAccess, offset: u64, size: u64) -> Result<MappedBuffer<'_>> {
        let buffer = self.objects.buffers.get_mut(handle)?;
        if buffer.is_mapped() {
            return Err(Error::InvalidState(format!(
                "buffer {:?} is already mapped",
                buffer.desc.debug_name
            )));
        }
        let required = access.required_flags();
        if !buffer.desc.cpu_access_flags.contains(required) {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "{:?} mapping needs CPU access flags {:?}",
                access, required
            ));
        }
        let range = buffer.range(offset, size)?;
        buffer.mapping = Some(BufferMapping {
            access,
            offset,
            size: range.len() as u64,
        });
        let data = &mut buffer.data[range];
        if access == CpuAccess::WriteDiscard {
            data.fill(0);
        }
        Ok(MappedBuffer::new(data, access))
    }

    fn unmap_buffer(&mut self, handle: BufferHandle) -> Result<()> {
        let buffer = self.objects.buffers.get_mut(handle)?;
        if buffer.mapping.take().is_none() {
            return Err(Error::InvalidState(format!(
                "buffer {:?} is not mapped",
                buffer.desc.debug_name
            )));
        }
        Ok(())
    }

    fn create_buffer_array(&mut self, buffers: &[BufferHandle]) -> Result<BufferArrayHandle> {
        if buffers.is_empty() {
            return Err(crate::lumen_invalid!(SOURCE, "buffer array needs at least one buffer"));
        }
        for buffer in buffers {
            let desc = &self.objects.buffers.get(*buffer)?.desc;
            if !desc.bind_flags.contains(BindFlags::VERTEX_BUFFER) {
                return Err(crate::lumen_invalid!(
                    SOURCE,
                    "buffer {:?} in a buffer array is not a vertex buffer",
                    desc.debug_name
                ));
            }
        }
        Ok(self.objects.buffer_arrays.insert(NullBufferArray {
            debug_name: None,
            buffers: buffers.to_vec(),
        }))
    }

    fn release_buffer_array(&mut self, handle: BufferArrayHandle) -> bool {
        self.objects.buffer_arrays.release(handle).is_some()
    }

    // ===== TEXTURES =====

    fn create_texture(&mut self, desc: &TextureDescriptor, initial_data: Option<&[u8]>) -> Result<TextureHandle> {
        let normalized = validate_texture_descriptor(desc, &self.limits)?;
        let mut texture = NullTexture::new(&normalized);
        if let Some(data) = initial_data {
            let region = texture.mip_region(0);
            texture.write_region(&region, data, 0, 0)?;
            if normalized.misc_flags.contains(MiscFlags::GENERATE_MIPS) {
                texture.generate_mips(None)?;
            }
        }
        crate::lumen_trace!(
            SOURCE,
            "texture {:?} {:?} {}x{}x{}, {} layers, {} MIP levels",
            normalized.texture_type,
            normalized.format,
            normalized.extent.width,
            normalized.extent.height,
            normalized.extent.depth,
            normalized.array_layers,
            normalized.mip_levels
        );
        Ok(self.objects.textures.insert(texture))
    }

    fn release_texture(&mut self, handle: TextureHandle) -> bool {
        self.objects.textures.release(handle).is_some()
    }

    fn texture_descriptor(&self, handle: TextureHandle) -> Result<TextureDescriptor> {
        Ok(self.objects.textures.get(handle)?.desc.clone())
    }

    fn write_texture(&mut self, handle: TextureHandle, region: &TextureRegion, data: &[u8]) -> Result<()> {
        self.objects.textures.get_mut(handle)?.write_region(region, data, 0, 0)
    }

    fn read_texture(&mut self, handle: TextureHandle, region: &TextureRegion, data: &mut [u8]) -> Result<()> {
        self.objects.textures.get(handle)?.read_region(region, data, 0, 0)
    }

    // ===== SAMPLERS AND SHADERS =====

    fn create_sampler(&mut self, desc: &SamplerDescriptor) -> Result<SamplerHandle> {
        Ok(self.objects.samplers.insert(NullSampler {
            desc: desc.clamped(&self.limits),
        }))
    }

    fn release_sampler(&mut self, handle: SamplerHandle) -> bool {
        self.objects.samplers.release(handle).is_some()
    }

    fn create_shader(&mut self, desc: &ShaderDescriptor) -> Result<ShaderHandle> {
        let report = compile_shader(desc);
        if report.has_errors() {
            crate::lumen_warn!(
                SOURCE,
                "{:?} shader '{}' failed to compile:\n{}",
                desc.shader_type,
                desc.debug_name.as_deref().unwrap_or("unnamed"),
                report.text()
            );
        }
        Ok(self.objects.shaders.insert(NullShader {
            desc: desc.clone(),
            report,
        }))
    }

    fn release_shader(&mut self, handle: ShaderHandle) -> bool {
        self.objects.shaders.release(handle).is_some()
    }

    fn shader_report(&self, handle: ShaderHandle) -> Result<&Report> {
        Ok(&self.objects.shaders.get(handle)?.report)
    }

    // ===== PIPELINES =====

    fn create_pipeline_layout(&mut self, desc: &PipelineLayoutDescriptor) -> Result<PipelineLayoutHandle> {
        if desc.uniforms_size() > self.limits.max_push_constant_size {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "uniforms need {} bytes but the device allows {}",
                desc.uniforms_size(), self.limits.max_push_constant_size
            ));
        }
        Ok(self.objects.pipeline_layouts.insert(NullPipelineLayout { desc: desc.clone() }))
    }

    fn release_pipeline_layout(&mut self, handle: PipelineLayoutHandle) -> bool {
        self.objects.pipeline_layouts.release(handle).is_some()
    }

    fn create_pipeline_cache(&mut self, initial_blob: &[u8]) -> Result<PipelineCacheHandle> {
        let cache = NullPipelineCache::from_blob(initial_blob);
        if !initial_blob.is_empty() && !initial_blob.starts_with(PIPELINE_CACHE_MAGIC) {
            crate::lumen_warn!(SOURCE, "pipeline cache blob not recognized; starting with an empty cache");
        }
        Ok(self.objects.pipeline_caches.insert(cache))
    }

    fn release_pipeline_cache(&mut self, handle: PipelineCacheHandle) -> bool {
        self.objects.pipeline_caches.release(handle).is_some()
    }

    fn pipeline_cache_blob(&self, handle: PipelineCacheHandle) -> Result<Vec<u8>> {
        Ok(self.objects.pipeline_caches.get(handle)?.blob())
    }

    fn create_graphics_pipeline_state(
        &mut self,
        desc: &GraphicsPipelineDescriptor,
        cache: Option<PipelineCacheHandle>,
    ) -> Result<PipelineStateHandle> {
        if let Some(layout) = desc.pipeline_layout {
            self.objects.pipeline_layouts.get(layout)?;
        }
        if let Some(render_pass) = desc.render_pass {
            self.objects.render_passes.get(render_pass)?;
        }
        if let Some(cache) = cache {
            self.objects.pipeline_caches.get(cache)?;
        }
        let (report, samples) = validate_graphics_pipeline(desc, &self.limits, &self.shader_lookup());
        self.insert_pipeline(desc.debug_name.clone(), PipelineKind::Graphics, desc.pipeline_layout, samples, report, cache)
    }

    fn create_compute_pipeline_state(
        &mut self,
        desc: &ComputePipelineDescriptor,
        cache: Option<PipelineCacheHandle>,
    ) -> Result<PipelineStateHandle> {
        if let Some(layout) = desc.pipeline_layout {
            self.objects.pipeline_layouts.get(layout)?;
        }
        if let Some(cache) = cache {
            self.objects.pipeline_caches.get(cache)?;
        }
        let report = validate_compute_pipeline(desc, &self.shader_lookup());
        self.insert_pipeline(desc.debug_name.clone(), PipelineKind::Compute, desc.pipeline_layout, 1, report, cache)
    }

    fn release_pipeline_state(&mut self, handle: PipelineStateHandle) -> bool {
        self.objects.pipeline_states.release(handle).is_some()
    }

    fn pipeline_state_report(&self, handle: PipelineStateHandle) -> Result<&Report> {
        Ok(&self.objects.pipeline_states.get(handle)?.report)
    }

    // ===== RENDER PASSES AND TARGETS =====

    fn create_render_pass(&mut self, desc: &RenderPassDescriptor) -> Result<RenderPassHandle> {
        self.check_render_pass(desc)?;
        let mut desc = desc.clone();
        desc.samples = clamp_samples(desc.samples, self.limits.max_color_buffer_samples);
        Ok(self.objects.render_passes.insert(NullRenderPass { desc }))
    }

    fn release_render_pass(&mut self, handle: RenderPassHandle) -> bool {
        self.objects.render_passes.release(handle).is_some()
    }

    fn create_render_target(&mut self, desc: &RenderTargetDescriptor) -> Result<RenderTargetHandle> {
        if desc.resolution.is_zero() {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "render target resolution must be non-zero (got {}x{})",
                desc.resolution.width, desc.resolution.height
            ));
        }
        if desc.color_attachments.is_empty() && desc.depth_stencil_attachment.is_none() {
            return Err(crate::lumen_invalid!(SOURCE, "render target has no attachments"));
        }
        if desc.color_attachments.len() as u32 > self.limits.max_color_attachments {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "{} color attachments exceed device limit {}",
                desc.color_attachments.len(), self.limits.max_color_attachments
            ));
        }
        if let Some(render_pass) = desc.render_pass {
            self.objects.render_passes.get(render_pass)?;
        }
        let samples = clamp_samples(desc.samples, self.limits.max_color_buffer_samples);

        let color = desc
            .color_attachments
            .iter()
            .map(|a| self.create_attachment(desc, a, BindFlags::COLOR_ATTACHMENT, samples))
            .collect::<Result<Vec<_>>>()?;
        for resolve in &desc.resolve_attachments {
            self.create_attachment(desc, resolve, BindFlags::COLOR_ATTACHMENT, 1)?;
        }
        let depth_stencil = desc
            .depth_stencil_attachment
            .as_ref()
            .map(|a| self.create_attachment(desc, a, BindFlags::DEPTH_STENCIL_ATTACHMENT, samples))
            .transpose()?;

        let mut stored = desc.clone();
        stored.samples = samples;
        Ok(self.objects.render_targets.insert(NullRenderTarget {
            desc: stored,
            color,
            depth_stencil,
        }))
    }

    fn release_render_target(&mut self, handle: RenderTargetHandle) -> bool {
        self.objects.render_targets.release(handle).is_some()
    }

    fn render_target_resolution(&self, handle: RenderTargetHandle) -> Result<Extent2D> {
        Ok(self.objects.render_targets.get(handle)?.desc.resolution)
    }

    // ===== RESOURCE HEAPS =====

    fn create_resource_heap(&mut self, desc: &ResourceHeapDescriptor, views: &[ResourceViewDescriptor]) -> Result<ResourceHeapHandle> {
        let layout_handle = desc
            .pipeline_layout
            .ok_or_else(|| crate::lumen_invalid!(SOURCE, "resource heap needs a pipeline layout"))?;
        let layout = &self.objects.pipeline_layouts.get(layout_handle)?.desc;
        let num_views = if desc.num_resource_views == 0 {
            views.len() as u32
        } else {
            desc.num_resource_views
        };
        resource_heap_num_sets(layout, num_views)?;
        if views.len() as u32 > num_views {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "{} initial views exceed the heap size of {}",
                views.len(), num_views
            ));
        }
        self.check_views(layout, 0, views)?;

        let bindings_per_set = layout.heap_bindings.len() as u32;
        let mut slots = vec![None; num_views as usize];
        for (slot, view) in slots.iter_mut().zip(views) {
            *slot = Some(*view);
        }
        Ok(self.objects.resource_heaps.insert(NullResourceHeap {
            debug_name: None,
            layout: layout_handle,
            bindings_per_set,
            views: slots,
        }))
    }

    fn release_resource_heap(&mut self, handle: ResourceHeapHandle) -> bool {
        self.objects.resource_heaps.release(handle).is_some()
    }

    fn write_resource_heap(&mut self, handle: ResourceHeapHandle, first_descriptor: u32, views: &[ResourceViewDescriptor]) -> Result<u32> {
        let heap = self.objects.resource_heaps.get(handle)?;
        let end = first_descriptor as usize + views.len();
        if end > heap.views.len() {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "descriptors [{}, {}) exceed the heap size of {}",
                first_descriptor, end, heap.views.len()
            ));
        }
        let layout = &self.objects.pipeline_layouts.get(heap.layout)?.desc;
        self.check_views(layout, first_descriptor, views)?;

        let heap = self.objects.resource_heaps.get_mut(handle)?;
        for (slot, view) in heap.views[first_descriptor as usize..end].iter_mut().zip(views) {
            *slot = Some(*view);
        }
        Ok(views.len() as u32)
    }

    // ===== QUERIES AND FENCES =====

    fn create_query_heap(&mut self, desc: &QueryHeapDescriptor) -> Result<QueryHeapHandle> {
        if desc.num_queries == 0 {
            return Err(crate::lumen_invalid!(SOURCE, "query heap needs at least one query"));
        }
        Ok(self.objects.query_heaps.insert(NullQueryHeap {
            desc: desc.clone(),
            results: vec![0; desc.num_queries as usize],
            active: vec![false; desc.num_queries as usize],
        }))
    }

    fn release_query_heap(&mut self, handle: QueryHeapHandle) -> bool {
        self.objects.query_heaps.release(handle).is_some()
    }

    fn create_fence(&mut self) -> Result<FenceHandle> {
        Ok(self.objects.fences.insert(NullFence::default()))
    }

    fn release_fence(&mut self, handle: FenceHandle) -> bool {
        self.objects.fences.release(handle).is_some()
    }

    fn set_debug_name(&mut self, object: ObjectHandle, name: &str) -> Result<()> {
        let label = Some(name.to_string());
        let objects = &mut self.objects;
        match object {
            ObjectHandle::SwapChain(h) => objects.swap_chains.get_mut(h)?.base_mut().set_debug_name(name),
            ObjectHandle::CommandBuffer(h) => objects.command_buffers.get_mut(h)?.set_debug_name(name),
            ObjectHandle::Buffer(h) => objects.buffers.get_mut(h)?.desc.debug_name = label,
            ObjectHandle::BufferArray(h) => objects.buffer_arrays.get_mut(h)?.debug_name = label,
            ObjectHandle::Texture(h) => objects.textures.get_mut(h)?.desc.debug_name = label,
            ObjectHandle::Sampler(h) => objects.samplers.get_mut(h)?.desc.debug_name = label,
            ObjectHandle::Shader(h) => objects.shaders.get_mut(h)?.desc.debug_name = label,
            ObjectHandle::PipelineLayout(h) => objects.pipeline_layouts.get_mut(h)?.desc.debug_name = label,
            ObjectHandle::PipelineCache(h) => objects.pipeline_caches.get_mut(h)?.debug_name = label,
            ObjectHandle::PipelineState(h) => objects.pipeline_states.get_mut(h)?.debug_name = label,
            ObjectHandle::RenderPass(h) => objects.render_passes.get_mut(h)?.desc.debug_name = label,
            ObjectHandle::RenderTarget(h) => objects.render_targets.get_mut(h)?.desc.debug_name = label,
            ObjectHandle::ResourceHeap(h) => objects.resource_heaps.get_mut(h)?.debug_name = label,
            ObjectHandle::QueryHeap(h) => objects.query_heaps.get_mut(h)?.desc.debug_name = label,
            ObjectHandle::Fence(h) => objects.fences.get_mut(h)?.debug_name = label,
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "null_render_system_tests.rs"]
mod tests;
