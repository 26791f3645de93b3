/// Vulkan render system
///
/// Owns the GPU context and every object created through it. Command buffers
/// are recorded into native command buffers at submit; the native objects of
/// each submission are kept until its fence signals.

use std::sync::Arc;
use std::time::Duration;

use ash::vk;
use lumen_rhi::lumen::format::Format;
use lumen_rhi::lumen::render::*;
use lumen_rhi::lumen::{BackendLease, Result, Runtime};
use lumen_rhi::{lumen_debug, lumen_info, lumen_invalid, lumen_trace, lumen_warn};
use rustc_hash::FxHashMap;

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_command_executor::{InFlight, VulkanExecutor};
use crate::vulkan_context::{GpuContext, SOURCE};
use crate::vulkan_device::create_context;
use crate::vulkan_objects::{VulkanBufferArray, VulkanObjects};
use crate::vulkan_pipeline::{
    GraphicsPipelineInputs, NativeLayout, VulkanPipelineCache, VulkanPipelineLayout, VulkanPipelineState,
};
use crate::vulkan_query::{VulkanFence, VulkanQueryHeap};
use crate::vulkan_render_pass::{create_native_render_pass, VulkanRenderPass};
use crate::vulkan_render_target::{AttachmentSource, VulkanRenderTarget};
use crate::vulkan_resource_heap::VulkanResourceHeap;
use crate::vulkan_sampler::VulkanSampler;
use crate::vulkan_shader::VulkanShader;
use crate::vulkan_swap_chain::VulkanSwapChain;
use crate::vulkan_texture::VulkanTexture;

/// Number of array layers a texture descriptor addresses
fn mip_extent_layers(desc: &TextureDescriptor) -> u32 {
    match desc.texture_type {
        TextureType::TextureCube => 6,
        TextureType::Texture3D => 1,
        _ => desc.array_layers.max(1),
    }
}

pub struct VulkanRenderSystem {
    _lease: BackendLease,
    debug_name: Option<String>,
    info: RendererInfo,
    limits: RenderingLimits,
    objects: VulkanObjects,
    /// Submissions the GPU may still be executing
    pending: Vec<InFlight>,
    /// Swap-chain compatible passes for pipelines without a render pass
    default_passes: FxHashMap<(Format, u32), vk::RenderPass>,
    /// Layout of pipelines created without a pipeline layout
    empty_layout: Option<Arc<NativeLayout>>,
    ctx: Arc<GpuContext>,
}

impl VulkanRenderSystem {
    /// Create a Vulkan render system
    ///
    /// # Errors
    ///
    /// `InitializationFailed` if another Vulkan render system is alive or no
    /// suitable device is found
    pub fn new(desc: &RenderSystemDescriptor) -> Result<Self> {
        let lease = Runtime::acquire_backend(Backend::Vulkan)?;
        let setup = create_context(desc)?;
        lumen_info!(
            SOURCE,
            "Vulkan render system created on {} ({})",
            setup.info.device_name,
            desc.debug_name.as_deref().unwrap_or("unnamed")
        );
        Ok(Self {
            _lease: lease,
            debug_name: desc.debug_name.clone(),
            info: setup.info,
            limits: setup.limits,
            objects: VulkanObjects::new(),
            pending: Vec::new(),
            default_passes: FxHashMap::default(),
            empty_layout: None,
            ctx: setup.context,
        })
    }

    /// Backend loader registered with the runtime
    pub fn load(desc: &RenderSystemDescriptor) -> Result<Box<dyn RenderSystem>> {
        Ok(Box::new(Self::new(desc)?))
    }

    /// Number of live objects of every kind
    pub fn object_count(&self) -> usize {
        self.objects.count()
    }

    /// Submissions not yet known to be complete
    pub fn pending_submissions(&self) -> usize {
        self.pending.len()
    }

    /// Wait for every submission before a native object is destroyed or
    /// overwritten from the host
    fn retire_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        if let Err(e) = self.ctx.wait_idle() {
            lumen_warn!(SOURCE, "wait for pending submissions failed: {}", e);
        }
        self.pending.clear();
    }

    // ===== VALIDATION HELPERS =====

    fn check_render_pass(&self, desc: &RenderPassDescriptor) -> Result<()> {
        if desc.color_attachments.len() as u32 > self.limits.max_color_attachments {
            return Err(lumen_invalid!(
                SOURCE,
                "{} color attachments exceed device limit {}",
                desc.color_attachments.len(), self.limits.max_color_attachments
            ));
        }
        if let Some(attachment) = desc.color_attachments.iter().find(|a| a.format != Format::Undefined && !a.format.is_color()) {
            return Err(lumen_invalid!(SOURCE, "{:?} is not a color format", attachment.format));
        }
        if let Some(depth) = desc.depth_attachment {
            if !depth.format.is_depth() {
                return Err(lumen_invalid!(SOURCE, "{:?} is not a depth format", depth.format));
            }
        }
        if let Some(stencil) = desc.stencil_attachment {
            if !stencil.format.is_stencil() {
                return Err(lumen_invalid!(SOURCE, "{:?} is not a stencil format", stencil.format));
            }
        }
        Ok(())
    }

    fn attachment_source(&self, desc: &RenderTargetDescriptor, attachment: &AttachmentDescriptor, usage: BindFlags) -> Result<AttachmentSource<'_>> {
        let Some(handle) = attachment.texture else {
            if attachment.format == Format::Undefined {
                return Err(lumen_invalid!(SOURCE, "render target attachment needs a texture or a format"));
            }
            return Ok(AttachmentSource::Internal(attachment.format));
        };

        let texture = self.objects.textures.get(handle)?;
        if !texture.desc.bind_flags.contains(usage) {
            return Err(lumen_invalid!(
                SOURCE,
                "attachment texture {:?} was not created with {:?}",
                texture.desc.debug_name, usage
            ));
        }
        if attachment.mip_level >= texture.num_mip_levels() {
            return Err(lumen_invalid!(
                SOURCE,
                "attachment MIP level {} out of range ({} levels)",
                attachment.mip_level, texture.num_mip_levels()
            ));
        }
        if attachment.array_layer >= mip_extent_layers(&texture.desc) {
            return Err(lumen_invalid!(SOURCE, "attachment array layer {} out of range", attachment.array_layer));
        }
        validate_mip_resolution(desc.resolution, &texture.desc, attachment.mip_level)?;
        Ok(AttachmentSource::Texture {
            handle,
            texture,
            mip_level: attachment.mip_level,
            array_layer: attachment.array_layer,
        })
    }

    fn shader_lookup(&self) -> impl Fn(ShaderHandle) -> Option<ShaderInfo> + '_ {
        |handle| {
            self.objects.shaders.get(handle).ok().map(|shader| ShaderInfo {
                shader_type: shader.desc.shader_type,
                report: shader.report.clone(),
            })
        }
    }

    fn native_layout(&mut self, layout: Option<PipelineLayoutHandle>) -> Result<Arc<NativeLayout>> {
        if let Some(layout) = layout {
            return Ok(Arc::clone(&self.objects.pipeline_layouts.get(layout)?.native));
        }
        match &self.empty_layout {
            Some(native) => Ok(Arc::clone(native)),
            None => {
                let native = Arc::new(NativeLayout::empty(&self.ctx)?);
                self.empty_layout = Some(Arc::clone(&native));
                Ok(native)
            }
        }
    }

    /// Native pass compatible with the swap chain framebuffers
    fn default_render_pass(&mut self, samples: u32) -> Result<vk::RenderPass> {
        let color_format = self
            .objects
            .swap_chains
            .iter()
            .next()
            .map(|(_, swap_chain)| SwapChain::color_format(swap_chain))
            .unwrap_or(Format::Bgra8Unorm);
        let key = (color_format, samples);
        if let Some(render_pass) = self.default_passes.get(&key) {
            return Ok(*render_pass);
        }
        let render_pass = create_native_render_pass(&self.ctx, &[color_format], Some(self.ctx.default_depth_format), samples)?;
        self.default_passes.insert(key, render_pass);
        Ok(render_pass)
    }

    fn pipeline_cache(&mut self, cache: Option<PipelineCacheHandle>) -> Result<vk::PipelineCache> {
        match cache {
            Some(cache) => {
                let cache = self.objects.pipeline_caches.get_mut(cache)?;
                cache.num_pipelines += 1;
                Ok(cache.cache)
            }
            None => Ok(vk::PipelineCache::null()),
        }
    }

    fn insert_pipeline(&mut self, pipeline: VulkanPipelineState) -> PipelineStateHandle {
        if pipeline.report.has_errors() {
            lumen_warn!(
                SOURCE,
                "{:?} pipeline '{}' has errors:\n{}",
                pipeline.kind,
                pipeline.debug_name.as_deref().unwrap_or("unnamed"),
                pipeline.report.text()
            );
        }
        self.objects.pipeline_states.insert(pipeline)
    }
}

impl Drop for VulkanRenderSystem {
    fn drop(&mut self) {
        lumen_info!(
            SOURCE,
            "Vulkan render system destroyed ({}, {} objects released)",
            self.debug_name.as_deref().unwrap_or("unnamed"),
            self.objects.count()
        );
        if let Err(e) = self.ctx.wait_idle() {
            lumen_warn!(SOURCE, "device did not go idle before teardown: {}", e);
        }
        self.pending.clear();
        self.objects.clear();
        for (_, render_pass) in self.default_passes.drain() {
            unsafe { self.ctx.device.destroy_render_pass(render_pass, None) };
        }
        self.empty_layout = None;

        #[cfg(feature = "vulkan-validation")]
        crate::debug::print_validation_stats_report();
    }
}

impl CommandQueue for VulkanRenderSystem {
    fn submit(&mut self, command_buffer: CommandBufferHandle) -> Result<()> {
        let in_flight = VulkanExecutor {
            ctx: &self.ctx,
            objects: &mut self.objects,
            limits: &self.limits,
        }
        .submit(command_buffer)?;
        self.pending.retain(|submission| !submission.is_complete());
        self.pending.push(in_flight);
        Ok(())
    }

    fn submit_fence(&mut self, fence: FenceHandle) -> Result<()> {
        self.objects.fences.get_mut(fence)?.submit()
    }

    fn wait_fence(&mut self, fence: FenceHandle, timeout: Duration) -> Result<bool> {
        let signaled = self.objects.fences.get(fence)?.wait(timeout)?;
        if signaled {
            self.pending.retain(|submission| !submission.is_complete());
        }
        Ok(signaled)
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.ctx.wait_idle()?;
        self.pending.clear();
        Ok(())
    }

    fn query_result(&mut self, heap: QueryHeapHandle, first_query: u32, num_queries: u32) -> Result<Option<Vec<u64>>> {
        self.objects.query_heaps.get(heap)?.results(first_query, num_queries)
    }
}

impl RenderSystem for VulkanRenderSystem {
    fn backend(&self) -> Backend {
        Backend::Vulkan
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
        let swap_chain = VulkanSwapChain::new(&self.ctx, base)?;
        lumen_debug!(
            SOURCE,
            "swap chain {}x{} ({:?}, {} samples, {} buffers)",
            swap_chain.resolution().width,
            swap_chain.resolution().height,
            swap_chain.color_format(),
            swap_chain.samples(),
            swap_chain.num_swap_buffers()
        );
        Ok(self.objects.swap_chains.insert(swap_chain))
    }

    fn release_swap_chain(&mut self, handle: SwapChainHandle) -> bool {
        self.retire_pending();
        self.objects.swap_chains.release(handle).is_some()
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
        let buffer = VulkanBuffer::new(&self.ctx, desc, initial_data)?;
        Ok(self.objects.buffers.insert(buffer))
    }

    fn release_buffer(&mut self, handle: BufferHandle) -> bool {
        self.retire_pending();
        self.objects.buffers.release(handle).is_some()
    }

    fn buffer_descriptor(&self, handle: BufferHandle) -> Result<BufferDescriptor> {
        Ok(self.objects.buffers.get(handle)?.desc.clone())
    }

    fn write_buffer(&mut self, handle: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        self.retire_pending();
        self.objects.buffers.get_mut(handle)?.write(offset, data)
    }

    fn read_buffer(&mut self, handle: BufferHandle, offset: u64, data: &mut [u8]) -> Result<()> {
        self.retire_pending();
        self.objects.buffers.get_mut(handle)?.read(offset, data)
    }

    fn map_buffer_range(&mut self, handle: BufferHandle, access: CpuAccess, offset: u64, size: u64) -> Result<MappedBuffer<'_>> {
        self.retire_pending();
        self.objects.buffers.get_mut(handle)?.map(access, offset, size)
    }

    fn unmap_buffer(&mut self, handle: BufferHandle) -> Result<()> {
        self.objects.buffers.get_mut(handle)?.unmap()
    }

    fn create_buffer_array(&mut self, buffers: &[BufferHandle]) -> Result<BufferArrayHandle> {
        if buffers.is_empty() {
            return Err(lumen_invalid!(SOURCE, "buffer array needs at least one buffer"));
        }
        for buffer in buffers {
            let desc = &self.objects.buffers.get(*buffer)?.desc;
            if !desc.bind_flags.contains(BindFlags::VERTEX_BUFFER) {
                return Err(lumen_invalid!(
                    SOURCE,
                    "buffer {:?} in a buffer array is not a vertex buffer",
                    desc.debug_name
                ));
            }
        }
        Ok(self.objects.buffer_arrays.insert(VulkanBufferArray {
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
        let texture = VulkanTexture::new(&self.ctx, &normalized, initial_data)?;
        lumen_trace!(
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
        self.retire_pending();
        self.objects.textures.release(handle).is_some()
    }

    fn texture_descriptor(&self, handle: TextureHandle) -> Result<TextureDescriptor> {
        Ok(self.objects.textures.get(handle)?.desc.clone())
    }

    fn write_texture(&mut self, handle: TextureHandle, region: &TextureRegion, data: &[u8]) -> Result<()> {
        self.retire_pending();
        self.objects.textures.get(handle)?.write_region(region, data)
    }

    fn read_texture(&mut self, handle: TextureHandle, region: &TextureRegion, data: &mut [u8]) -> Result<()> {
        self.retire_pending();
        self.objects.textures.get(handle)?.read_region(region, data)
    }

    // ===== SAMPLERS AND SHADERS =====

    fn create_sampler(&mut self, desc: &SamplerDescriptor) -> Result<SamplerHandle> {
        let sampler = VulkanSampler::new(&self.ctx, &desc.clamped(&self.limits))?;
        Ok(self.objects.samplers.insert(sampler))
    }

    fn release_sampler(&mut self, handle: SamplerHandle) -> bool {
        self.retire_pending();
        self.objects.samplers.release(handle).is_some()
    }

    fn create_shader(&mut self, desc: &ShaderDescriptor) -> Result<ShaderHandle> {
        let shader = VulkanShader::new(&self.ctx, desc);
        if shader.report.has_errors() {
            lumen_warn!(
                SOURCE,
                "{:?} shader '{}' failed to load:\n{}",
                desc.shader_type,
                desc.debug_name.as_deref().unwrap_or("unnamed"),
                shader.report.text()
            );
        }
        Ok(self.objects.shaders.insert(shader))
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
            return Err(lumen_invalid!(
                SOURCE,
                "uniforms need {} bytes but the device allows {}",
                desc.uniforms_size(), self.limits.max_push_constant_size
            ));
        }
        let layout = VulkanPipelineLayout::new(&self.ctx, desc)?;
        Ok(self.objects.pipeline_layouts.insert(layout))
    }

    fn release_pipeline_layout(&mut self, handle: PipelineLayoutHandle) -> bool {
        self.retire_pending();
        self.objects.pipeline_layouts.release(handle).is_some()
    }

    fn create_pipeline_cache(&mut self, initial_blob: &[u8]) -> Result<PipelineCacheHandle> {
        let cache = VulkanPipelineCache::new(&self.ctx, initial_blob)?;
        Ok(self.objects.pipeline_caches.insert(cache))
    }

    fn release_pipeline_cache(&mut self, handle: PipelineCacheHandle) -> bool {
        self.objects.pipeline_caches.release(handle).is_some()
    }

    fn pipeline_cache_blob(&self, handle: PipelineCacheHandle) -> Result<Vec<u8>> {
        self.objects.pipeline_caches.get(handle)?.blob()
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

        let layout = self.native_layout(desc.pipeline_layout)?;
        let (render_pass, num_color_attachments) = match desc.render_pass {
            Some(handle) => {
                let pass = self.objects.render_passes.get(handle)?;
                (pass.render_pass, pass.color_formats.len() as u32)
            }
            None => (self.default_render_pass(samples)?, 1),
        };
        let native_cache = self.pipeline_cache(cache)?;

        let stages = [
            desc.vertex_shader,
            desc.tess_control_shader,
            desc.tess_evaluation_shader,
            desc.geometry_shader,
            desc.fragment_shader,
        ];
        let shaders: Vec<&VulkanShader> = stages
            .iter()
            .flatten()
            .filter_map(|handle| self.objects.shaders.get(*handle).ok())
            .collect();
        let pipeline = VulkanPipelineState::new_graphics(
            &self.ctx,
            GraphicsPipelineInputs {
                desc,
                layout,
                render_pass,
                num_color_attachments,
                shaders,
                samples,
                cache: native_cache,
            },
            report,
        );
        Ok(self.insert_pipeline(pipeline))
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
        let layout = self.native_layout(desc.pipeline_layout)?;
        let native_cache = self.pipeline_cache(cache)?;
        let shader = desc.compute_shader.and_then(|handle| self.objects.shaders.get(handle).ok());
        let pipeline = VulkanPipelineState::new_compute(&self.ctx, desc, layout, shader, native_cache, report);
        Ok(self.insert_pipeline(pipeline))
    }

    fn release_pipeline_state(&mut self, handle: PipelineStateHandle) -> bool {
        self.retire_pending();
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
        let render_pass = VulkanRenderPass::new(&self.ctx, &desc)?;
        Ok(self.objects.render_passes.insert(render_pass))
    }

    fn release_render_pass(&mut self, handle: RenderPassHandle) -> bool {
        self.retire_pending();
        self.objects.render_passes.release(handle).is_some()
    }

    fn create_render_target(&mut self, desc: &RenderTargetDescriptor) -> Result<RenderTargetHandle> {
        if desc.resolution.is_zero() {
            return Err(lumen_invalid!(
                SOURCE,
                "render target resolution must be non-zero (got {}x{})",
                desc.resolution.width, desc.resolution.height
            ));
        }
        if desc.color_attachments.is_empty() && desc.depth_stencil_attachment.is_none() {
            return Err(lumen_invalid!(SOURCE, "render target has no attachments"));
        }
        if desc.color_attachments.len() as u32 > self.limits.max_color_attachments {
            return Err(lumen_invalid!(
                SOURCE,
                "{} color attachments exceed device limit {}",
                desc.color_attachments.len(), self.limits.max_color_attachments
            ));
        }
        if let Some(render_pass) = desc.render_pass {
            self.objects.render_passes.get(render_pass)?;
        }
        let mut stored = desc.clone();
        stored.samples = clamp_samples(desc.samples, self.limits.max_color_buffer_samples);

        let colors = desc
            .color_attachments
            .iter()
            .map(|a| self.attachment_source(desc, a, BindFlags::COLOR_ATTACHMENT))
            .collect::<Result<Vec<_>>>()?;
        let resolves = desc
            .resolve_attachments
            .iter()
            .map(|a| self.attachment_source(desc, a, BindFlags::COLOR_ATTACHMENT))
            .collect::<Result<Vec<_>>>()?;
        let depth_stencil = desc
            .depth_stencil_attachment
            .as_ref()
            .map(|a| self.attachment_source(desc, a, BindFlags::DEPTH_STENCIL_ATTACHMENT))
            .transpose()?;

        let render_target = VulkanRenderTarget::new(&self.ctx, &stored, colors, resolves, depth_stencil)?;
        Ok(self.objects.render_targets.insert(render_target))
    }

    fn release_render_target(&mut self, handle: RenderTargetHandle) -> bool {
        self.retire_pending();
        self.objects.render_targets.release(handle).is_some()
    }

    fn render_target_resolution(&self, handle: RenderTargetHandle) -> Result<Extent2D> {
        Ok(self.objects.render_targets.get(handle)?.desc.resolution)
    }

    // ===== RESOURCE HEAPS =====

    fn create_resource_heap(&mut self, desc: &ResourceHeapDescriptor, views: &[ResourceViewDescriptor]) -> Result<ResourceHeapHandle> {
        let layout_handle = desc
            .pipeline_layout
            .ok_or_else(|| lumen_invalid!(SOURCE, "resource heap needs a pipeline layout"))?;
        let layout = self.objects.pipeline_layouts.get(layout_handle)?;
        let num_views = if desc.num_resource_views == 0 {
            views.len() as u32
        } else {
            desc.num_resource_views
        };
        let num_sets = resource_heap_num_sets(&layout.desc, num_views)?;
        if views.len() as u32 > num_views {
            return Err(lumen_invalid!(
                SOURCE,
                "{} initial views exceed the heap size of {}",
                views.len(), num_views
            ));
        }
        let bindings = &layout.desc.heap_bindings;
        let resources = self.objects.heap_resources(bindings, 0, views)?;

        let mut heap = VulkanResourceHeap::new(&self.ctx, Arc::clone(&layout.native), bindings, num_sets, num_views)?;
        heap.write(0, views, &resources)?;
        Ok(self.objects.resource_heaps.insert(heap))
    }

    fn release_resource_heap(&mut self, handle: ResourceHeapHandle) -> bool {
        self.retire_pending();
        self.objects.resource_heaps.release(handle).is_some()
    }

    fn write_resource_heap(&mut self, handle: ResourceHeapHandle, first_descriptor: u32, views: &[ResourceViewDescriptor]) -> Result<u32> {
        let heap = self.objects.resource_heaps.get(handle)?;
        let end = first_descriptor as usize + views.len();
        if end > heap.num_views as usize {
            return Err(lumen_invalid!(
                SOURCE,
                "descriptors [{}, {}) exceed the heap size of {}",
                first_descriptor, end, heap.num_views
            ));
        }
        let resources = self.objects.heap_resources(&heap.bindings, first_descriptor, views)?;

        // Sets referenced by pending submissions must not change under them
        self.retire_pending();
        self.objects.resource_heaps.get_mut(handle)?.write(first_descriptor, views, &resources)?;
        Ok(views.len() as u32)
    }

    // ===== QUERIES AND FENCES =====

    fn create_query_heap(&mut self, desc: &QueryHeapDescriptor) -> Result<QueryHeapHandle> {
        let heap = VulkanQueryHeap::new(&self.ctx, desc)?;
        Ok(self.objects.query_heaps.insert(heap))
    }

    fn release_query_heap(&mut self, handle: QueryHeapHandle) -> bool {
        self.retire_pending();
        self.objects.query_heaps.release(handle).is_some()
    }

    fn create_fence(&mut self) -> Result<FenceHandle> {
        let fence = VulkanFence::new(&self.ctx)?;
        Ok(self.objects.fences.insert(fence))
    }

    fn release_fence(&mut self, handle: FenceHandle) -> bool {
        self.objects.fences.release(handle).is_some()
    }

    fn set_debug_name(&mut self, object: ObjectHandle, name: &str) -> Result<()> {
        let label = Some(name.to_string());
        let ctx = &self.ctx;
        let objects = &mut self.objects;
        match object {
            ObjectHandle::SwapChain(h) => objects.swap_chains.get_mut(h)?.base_mut().set_debug_name(name),
            ObjectHandle::CommandBuffer(h) => objects.command_buffers.get_mut(h)?.set_debug_name(name),
            ObjectHandle::Buffer(h) => {
                let buffer = objects.buffers.get_mut(h)?;
                ctx.set_object_name(buffer.buffer, name);
                buffer.desc.debug_name = label;
            }
            ObjectHandle::BufferArray(h) => objects.buffer_arrays.get_mut(h)?.debug_name = label,
            ObjectHandle::Texture(h) => {
                let texture = objects.textures.get_mut(h)?;
                ctx.set_object_name(texture.image, name);
                texture.desc.debug_name = label;
            }
            ObjectHandle::Sampler(h) => {
                let sampler = objects.samplers.get_mut(h)?;
                ctx.set_object_name(sampler.sampler, name);
                sampler.desc.debug_name = label;
            }
            ObjectHandle::Shader(h) => {
                let shader = objects.shaders.get_mut(h)?;
                if shader.module != vk::ShaderModule::null() {
                    ctx.set_object_name(shader.module, name);
                }
                shader.desc.debug_name = label;
            }
            ObjectHandle::PipelineLayout(h) => {
                let layout = objects.pipeline_layouts.get_mut(h)?;
                ctx.set_object_name(layout.native.layout, name);
                layout.desc.debug_name = label;
            }
            ObjectHandle::PipelineCache(h) => {
                let cache = objects.pipeline_caches.get_mut(h)?;
                ctx.set_object_name(cache.cache, name);
                cache.debug_name = label;
            }
            ObjectHandle::PipelineState(h) => {
                let pipeline = objects.pipeline_states.get_mut(h)?;
                if pipeline.is_valid() {
                    ctx.set_object_name(pipeline.pipeline, name);
                }
                pipeline.debug_name = label;
            }
            ObjectHandle::RenderPass(h) => {
                let render_pass = objects.render_passes.get_mut(h)?;
                ctx.set_object_name(render_pass.render_pass, name);
                render_pass.desc.debug_name = label;
            }
            ObjectHandle::RenderTarget(h) => {
                let render_target = objects.render_targets.get_mut(h)?;
                ctx.set_object_name(render_target.binding.framebuffer, name);
                render_target.desc.debug_name = label;
            }
            ObjectHandle::ResourceHeap(h) => objects.resource_heaps.get_mut(h)?.set_debug_name(name),
            ObjectHandle::QueryHeap(h) => {
                let query_heap = objects.query_heaps.get_mut(h)?;
                ctx.set_object_name(query_heap.pool, name);
                query_heap.desc.debug_name = label;
            }
            ObjectHandle::Fence(h) => objects.fences.get_mut(h)?.set_debug_name(name),
        }
        Ok(())
    }
}
