/// Object containers of the Vulkan render system

use ash::vk;
use lumen_rhi::lumen::render::*;
use lumen_rhi::lumen::{Error, Result};

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_pipeline::{VulkanPipelineCache, VulkanPipelineLayout, VulkanPipelineState};
use crate::vulkan_query::{VulkanFence, VulkanQueryHeap};
use crate::vulkan_render_pass::{FramebufferBinding, VulkanRenderPass};
use crate::vulkan_render_target::VulkanRenderTarget;
use crate::vulkan_resource_heap::{BoundResource, VulkanResourceHeap};
use crate::vulkan_sampler::VulkanSampler;
use crate::vulkan_shader::VulkanShader;
use crate::vulkan_swap_chain::VulkanSwapChain;
use crate::vulkan_texture::VulkanTexture;

/// Vertex buffers bound together
pub struct VulkanBufferArray {
    pub debug_name: Option<String>,
    pub buffers: Vec<BufferHandle>,
}

/// Every object container of a Vulkan render system
pub struct VulkanObjects {
    pub swap_chains: HwObjectContainer<SwapChainHandle, VulkanSwapChain>,
    pub command_buffers: HwObjectContainer<CommandBufferHandle, CommandBuffer>,
    pub buffers: HwObjectContainer<BufferHandle, VulkanBuffer>,
    pub buffer_arrays: HwObjectContainer<BufferArrayHandle, VulkanBufferArray>,
    pub textures: HwObjectContainer<TextureHandle, VulkanTexture>,
    pub samplers: HwObjectContainer<SamplerHandle, VulkanSampler>,
    pub shaders: HwObjectContainer<ShaderHandle, VulkanShader>,
    pub pipeline_layouts: HwObjectContainer<PipelineLayoutHandle, VulkanPipelineLayout>,
    pub pipeline_caches: HwObjectContainer<PipelineCacheHandle, VulkanPipelineCache>,
    pub pipeline_states: HwObjectContainer<PipelineStateHandle, VulkanPipelineState>,
    pub render_passes: HwObjectContainer<RenderPassHandle, VulkanRenderPass>,
    pub render_targets: HwObjectContainer<RenderTargetHandle, VulkanRenderTarget>,
    pub resource_heaps: HwObjectContainer<ResourceHeapHandle, VulkanResourceHeap>,
    pub query_heaps: HwObjectContainer<QueryHeapHandle, VulkanQueryHeap>,
    pub fences: HwObjectContainer<FenceHandle, VulkanFence>,
}

impl VulkanObjects {
    pub fn new() -> Self {
        Self {
            swap_chains: HwObjectContainer::new("swap chain"),
            command_buffers: HwObjectContainer::new("command buffer"),
            buffers: HwObjectContainer::new("buffer"),
            buffer_arrays: HwObjectContainer::new("buffer array"),
            textures: HwObjectContainer::new("texture"),
            samplers: HwObjectContainer::new("sampler"),
            shaders: HwObjectContainer::new("shader"),
            pipeline_layouts: HwObjectContainer::new("pipeline layout"),
            pipeline_caches: HwObjectContainer::new("pipeline cache"),
            pipeline_states: HwObjectContainer::new("pipeline state"),
            render_passes: HwObjectContainer::new("render pass"),
            render_targets: HwObjectContainer::new("render target"),
            resource_heaps: HwObjectContainer::new("resource heap"),
            query_heaps: HwObjectContainer::new("query heap"),
            fences: HwObjectContainer::new("fence"),
        }
    }

    pub fn count(&self) -> usize {
        self.swap_chains.len()
            + self.command_buffers.len()
            + self.buffers.len()
            + self.buffer_arrays.len()
            + self.textures.len()
            + self.samplers.len()
            + self.shaders.len()
            + self.pipeline_layouts.len()
            + self.pipeline_caches.len()
            + self.pipeline_states.len()
            + self.render_passes.len()
            + self.render_targets.len()
            + self.resource_heaps.len()
            + self.query_heaps.len()
            + self.fences.len()
    }

    /// Release everything, dependents before the objects they reference
    pub fn clear(&mut self) {
        self.command_buffers.clear();
        self.swap_chains.clear();
        self.resource_heaps.clear();
        self.render_targets.clear();
        self.pipeline_states.clear();
        self.pipeline_caches.clear();
        self.render_passes.clear();
        self.pipeline_layouts.clear();
        self.shaders.clear();
        self.samplers.clear();
        self.buffer_arrays.clear();
        self.textures.clear();
        self.buffers.clear();
        self.query_heaps.clear();
        self.fences.clear();
    }

    /// Native resource behind a view
    ///
    /// # Errors
    ///
    /// `InvalidResource` if the view refers to a released object
    pub(crate) fn bound_resource(&self, view: &ResourceViewDescriptor) -> Result<BoundResource> {
        let resource = match view {
            ResourceViewDescriptor::Buffer(h) => {
                let buffer = self.buffers.get(*h)?;
                BoundResource::Buffer {
                    buffer: buffer.buffer,
                    bind_flags: buffer.desc.bind_flags,
                }
            }
            ResourceViewDescriptor::Texture(h) => {
                let texture = self.textures.get(*h)?;
                BoundResource::Image {
                    view: texture.view,
                    layout: texture.resting_layout,
                    bind_flags: texture.desc.bind_flags,
                }
            }
            ResourceViewDescriptor::Sampler(h) => BoundResource::Sampler(self.samplers.get(*h)?.sampler),
        };
        Ok(resource)
    }

    /// Resolve views for a heap, checking them against the heap bindings
    pub(crate) fn heap_resources(
        &self,
        bindings: &[BindingDescriptor],
        first: u32,
        views: &[ResourceViewDescriptor],
    ) -> Result<Vec<BoundResource>> {
        views
            .iter()
            .enumerate()
            .map(|(i, view)| {
                let index = first as usize + i;
                let binding = &bindings[index % bindings.len()];
                let resource_type = match view {
                    ResourceViewDescriptor::Buffer(_) => ResourceType::Buffer,
                    ResourceViewDescriptor::Texture(_) => ResourceType::Texture,
                    ResourceViewDescriptor::Sampler(_) => ResourceType::Sampler,
                };
                let resource = self.bound_resource(view).map_err(|_| {
                    Error::InvalidResource(format!("resource view {} refers to a released object", index))
                })?;
                if resource_type != binding.resource_type {
                    return Err(lumen_rhi::lumen_invalid!(
                        crate::vulkan_context::SOURCE,
                        "resource view {} is a {:?} but binding '{}' expects a {:?}",
                        index, resource_type, binding.name, binding.resource_type
                    ));
                }
                Ok(resource)
            })
            .collect()
    }

    /// Attachments of a render target or the current swap image
    pub(crate) fn framebuffer(&self, target: RenderTargetRef) -> Result<FramebufferBinding> {
        match target {
            RenderTargetRef::SwapChain(h) => self.swap_chains.get(h)?.framebuffer_binding(),
            RenderTargetRef::RenderTarget(h) => {
                let render_target = self.render_targets.get(h)?;
                for texture in &render_target.textures {
                    if !self.textures.contains(*texture) {
                        return Err(Error::InvalidResource(format!(
                            "render target {:?} renders into a released texture",
                            render_target.desc.debug_name
                        )));
                    }
                }
                Ok(render_target.binding.clone())
            }
        }
    }

    /// Vertex buffer handles and native buffers of a buffer array
    pub(crate) fn vertex_buffers(&self, array: BufferArrayHandle) -> Result<Vec<vk::Buffer>> {
        self.buffer_arrays
            .get(array)?
            .buffers
            .iter()
            .map(|h| self.buffers.get(*h).map(|b| b.buffer))
            .collect()
    }
}
