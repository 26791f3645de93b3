/// Render system: backend selection, configuration and the factory trait
///
/// A render system is the single owner of every GPU object it creates.
/// Objects are handed out as generation-checked handles; using a released
/// handle fails with `InvalidResource` instead of touching freed memory.

use std::sync::Arc;

use crate::error::Result;
use crate::format::{memory_footprint, mip_extent_for};
use crate::render::*;
use crate::utils::Utf8String;

/// Native graphics API behind a render system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Backend {
    Null,
    Vulkan,
    Direct3D11,
    Direct3D12,
    Metal,
    OpenGL,
    OpenGLES,
}

impl Backend {
    pub fn name(self) -> &'static str {
        match self {
            Backend::Null => "Null",
            Backend::Vulkan => "Vulkan",
            Backend::Direct3D11 => "Direct3D 11",
            Backend::Direct3D12 => "Direct3D 12",
            Backend::Metal => "Metal",
            Backend::OpenGL => "OpenGL",
            Backend::OpenGLES => "OpenGL ES",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RenderSystemFlags: u32 {
        /// Enable the backend's debug layer where available
        const DEBUG_DEVICE        = 1 << 0;
        /// Prefer a discrete GPU over an integrated one
        const PREFER_DISCRETE_GPU = 1 << 1;
    }
}

/// Vulkan backend configuration
#[derive(Debug, Clone, PartialEq)]
pub struct VulkanConfig {
    pub application_name: Utf8String,
    pub application_version: u32,
    /// Extra instance layers to enable
    pub enabled_layers: Vec<String>,
    /// Raw `VkPhysicalDevice` handle that overrides device selection
    pub custom_physical_device: Option<u64>,
    /// Enable the Khronos validation layer (needs the `vulkan-validation` feature)
    pub enable_validation: bool,
}

impl Default for VulkanConfig {
    fn default() -> Self {
        Self {
            application_name: Utf8String::from("lumen"),
            application_version: 1,
            enabled_layers: Vec::new(),
            custom_physical_device: None,
            enable_validation: cfg!(debug_assertions),
        }
    }
}

/// Null backend configuration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NullConfig {
    /// Limits the null device reports
    pub limits: RenderingLimits,
}

/// Backend selection descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSystemDescriptor {
    pub backend: Backend,
    pub debug_name: Option<String>,
    pub flags: RenderSystemFlags,
    pub vulkan: VulkanConfig,
    pub null: NullConfig,
}

impl RenderSystemDescriptor {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            debug_name: None,
            flags: RenderSystemFlags::PREFER_DISCRETE_GPU,
            vulkan: VulkanConfig::default(),
            null: NullConfig::default(),
        }
    }
}

/// CPU view of a mapped buffer range
///
/// The mapping stays active until [`RenderSystem::unmap_buffer`] is called,
/// even after this view is dropped.
pub struct MappedBuffer<'a> {
    data: &'a mut [u8],
    access: CpuAccess,
}

impl<'a> MappedBuffer<'a> {
    pub fn new(data: &'a mut [u8], access: CpuAccess) -> Self {
        Self { data, access }
    }

    pub fn access(&self) -> CpuAccess {
        self.access
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &*self.data
    }

    /// Writable bytes, `None` for read-only mappings
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        if self.access.can_write() {
            Some(&mut *self.data)
        } else {
            None
        }
    }
}

/// Factory and owner of all GPU objects of one backend
///
/// Release calls return false when the handle is not alive, so releasing
/// twice is harmless. Dropping the render system releases every object it
/// still owns.
pub trait RenderSystem: CommandQueue + Send {
    fn backend(&self) -> Backend;
    fn renderer_info(&self) -> &RendererInfo;
    fn rendering_limits(&self) -> &RenderingLimits;

    // ===== SWAP CHAINS =====

    /// Create a swap chain presenting to `surface`
    ///
    /// The sample count is clamped to `max_color_buffer_samples`.
    fn create_swap_chain(&mut self, desc: &SwapChainDescriptor, surface: Arc<dyn Surface>) -> Result<SwapChainHandle>;
    fn release_swap_chain(&mut self, handle: SwapChainHandle) -> bool;
    fn swap_chain(&self, handle: SwapChainHandle) -> Result<&dyn SwapChain>;
    fn swap_chain_mut(&mut self, handle: SwapChainHandle) -> Result<&mut dyn SwapChain>;

    // ===== COMMAND BUFFERS =====

    fn create_command_buffer(&mut self, desc: &CommandBufferDescriptor) -> Result<CommandBufferHandle>;
    fn release_command_buffer(&mut self, handle: CommandBufferHandle) -> bool;
    fn command_buffer(&self, handle: CommandBufferHandle) -> Result<&CommandBuffer>;
    fn command_buffer_mut(&mut self, handle: CommandBufferHandle) -> Result<&mut CommandBuffer>;

    // ===== BUFFERS =====

    fn create_buffer(&mut self, desc: &BufferDescriptor, initial_data: Option<&[u8]>) -> Result<BufferHandle>;
    fn release_buffer(&mut self, handle: BufferHandle) -> bool;
    fn buffer_descriptor(&self, handle: BufferHandle) -> Result<BufferDescriptor>;
    fn write_buffer(&mut self, handle: BufferHandle, offset: u64, data: &[u8]) -> Result<()>;
    fn read_buffer(&mut self, handle: BufferHandle, offset: u64, data: &mut [u8]) -> Result<()>;

    /// Map a buffer range for CPU access
    ///
    /// # Errors
    ///
    /// `InvalidState` if the buffer is already mapped, `InvalidArgument` if
    /// the buffer lacks the CPU access flags or the range is out of bounds
    fn map_buffer_range(&mut self, handle: BufferHandle, access: CpuAccess, offset: u64, size: u64) -> Result<MappedBuffer<'_>>;

    /// Map the whole buffer
    fn map_buffer(&mut self, handle: BufferHandle, access: CpuAccess) -> Result<MappedBuffer<'_>> {
        self.map_buffer_range(handle, access, 0, WHOLE_SIZE)
    }

    /// End the active mapping, making CPU writes visible to the device
    fn unmap_buffer(&mut self, handle: BufferHandle) -> Result<()>;

    /// Group vertex buffers to bind them with a single command
    fn create_buffer_array(&mut self, buffers: &[BufferHandle]) -> Result<BufferArrayHandle>;
    fn release_buffer_array(&mut self, handle: BufferArrayHandle) -> bool;

    // ===== TEXTURES =====

    /// Create a texture, optionally filled with tightly packed MIP 0 data
    fn create_texture(&mut self, desc: &TextureDescriptor, initial_data: Option<&[u8]>) -> Result<TextureHandle>;
    fn release_texture(&mut self, handle: TextureHandle) -> bool;

    /// Normalized descriptor (resolved MIP count, rounded layers, clamped samples)
    fn texture_descriptor(&self, handle: TextureHandle) -> Result<TextureDescriptor>;

    fn texture_mip_extent(&self, handle: TextureHandle, mip_level: u32) -> Result<Extent3D> {
        let desc = self.texture_descriptor(handle)?;
        Ok(mip_extent_for(&desc, mip_level))
    }

    /// Bytes needed to hold a subresource tightly packed
    fn texture_subresource_footprint(&self, handle: TextureHandle, subresource: &TextureSubresource) -> Result<u64> {
        let desc = self.texture_descriptor(handle)?;
        Ok(memory_footprint(desc.texture_type, desc.format, desc.extent, subresource))
    }

    /// Upload tightly packed texels into a region of one MIP level
    fn write_texture(&mut self, handle: TextureHandle, region: &TextureRegion, data: &[u8]) -> Result<()>;

    /// Read back a region of one MIP level, tightly packed
    fn read_texture(&mut self, handle: TextureHandle, region: &TextureRegion, data: &mut [u8]) -> Result<()>;

    // ===== SAMPLERS AND SHADERS =====

    fn create_sampler(&mut self, desc: &SamplerDescriptor) -> Result<SamplerHandle>;
    fn release_sampler(&mut self, handle: SamplerHandle) -> bool;

    /// Create a shader; compile problems go to the shader's report
    fn create_shader(&mut self, desc: &ShaderDescriptor) -> Result<ShaderHandle>;
    fn release_shader(&mut self, handle: ShaderHandle) -> bool;
    fn shader_report(&self, handle: ShaderHandle) -> Result<&Report>;

    // ===== PIPELINES =====

    fn create_pipeline_layout(&mut self, desc: &PipelineLayoutDescriptor) -> Result<PipelineLayoutHandle>;
    fn release_pipeline_layout(&mut self, handle: PipelineLayoutHandle) -> bool;

    /// Create a pipeline cache seeded with a blob from a previous run
    fn create_pipeline_cache(&mut self, initial_blob: &[u8]) -> Result<PipelineCacheHandle>;
    fn release_pipeline_cache(&mut self, handle: PipelineCacheHandle) -> bool;
    fn pipeline_cache_blob(&self, handle: PipelineCacheHandle) -> Result<Vec<u8>>;

    /// Create a graphics pipeline
    ///
    /// Validation and link problems go to the pipeline's report; the call
    /// only fails for dead handles or backend errors.
    fn create_graphics_pipeline_state(
        &mut self,
        desc: &GraphicsPipelineDescriptor,
        cache: Option<PipelineCacheHandle>,
    ) -> Result<PipelineStateHandle>;
    fn create_compute_pipeline_state(
        &mut self,
        desc: &ComputePipelineDescriptor,
        cache: Option<PipelineCacheHandle>,
    ) -> Result<PipelineStateHandle>;
    fn release_pipeline_state(&mut self, handle: PipelineStateHandle) -> bool;
    fn pipeline_state_report(&self, handle: PipelineStateHandle) -> Result<&Report>;

    // ===== RENDER PASSES AND TARGETS =====

    fn create_render_pass(&mut self, desc: &RenderPassDescriptor) -> Result<RenderPassHandle>;
    fn release_render_pass(&mut self, handle: RenderPassHandle) -> bool;

    fn create_render_target(&mut self, desc: &RenderTargetDescriptor) -> Result<RenderTargetHandle>;
    fn release_render_target(&mut self, handle: RenderTargetHandle) -> bool;
    fn render_target_resolution(&self, handle: RenderTargetHandle) -> Result<Extent2D>;

    // ===== RESOURCE HEAPS =====

    fn create_resource_heap(&mut self, desc: &ResourceHeapDescriptor, views: &[ResourceViewDescriptor]) -> Result<ResourceHeapHandle>;
    fn release_resource_heap(&mut self, handle: ResourceHeapHandle) -> bool;

    /// Overwrite views starting at `first_descriptor`; returns the count written
    fn write_resource_heap(&mut self, handle: ResourceHeapHandle, first_descriptor: u32, views: &[ResourceViewDescriptor]) -> Result<u32>;

    // ===== QUERIES AND FENCES =====

    fn create_query_heap(&mut self, desc: &QueryHeapDescriptor) -> Result<QueryHeapHandle>;
    fn release_query_heap(&mut self, handle: QueryHeapHandle) -> bool;

    fn create_fence(&mut self) -> Result<FenceHandle>;
    fn release_fence(&mut self, handle: FenceHandle) -> bool;

    /// Attach a debug label to any object
    fn set_debug_name(&mut self, object: ObjectHandle, name: &str) -> Result<()>;
}

/// Load a render system for `desc.backend` through the runtime registry
///
/// # Errors
///
/// `InitializationFailed` if no loader is registered for the backend, if a
/// render system of that backend is already alive, or if the device cannot be
/// created.
pub fn load_render_system(desc: &RenderSystemDescriptor) -> Result<Box<dyn RenderSystem>> {
    crate::runtime::Runtime::load_render_system(desc)
}
