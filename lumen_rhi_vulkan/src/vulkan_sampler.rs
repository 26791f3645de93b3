/// Sampler - VkSampler objects for sampler handles and static samplers

use std::sync::Arc;

use ash::vk;
use lumen_rhi::lumen::render::{SamplerAddressMode, SamplerDescriptor};
use lumen_rhi::lumen::Result;
use lumen_rhi::lumen_warn;

use crate::vulkan_context::{map_vk_error, GpuContext, SOURCE};
use crate::vulkan_format::{address_mode_to_vk, border_color_to_vk, compare_op_to_vk, filter_to_vk, mipmap_mode_to_vk};

/// LOD range that keeps sampling on the base level when MIP-mapping is off
const NO_MIP_MAX_LOD: f32 = 0.25;

fn address_mode(ctx: &GpuContext, mode: SamplerAddressMode) -> vk::SamplerAddressMode {
    if mode == SamplerAddressMode::MirrorOnce && !ctx.capabilities.mirror_clamp_to_edge {
        lumen_warn!(SOURCE, "MirrorOnce addressing is not supported by the device, using Mirror");
        return vk::SamplerAddressMode::MIRRORED_REPEAT;
    }
    address_mode_to_vk(mode)
}

/// Build the create info for an already clamped descriptor
pub(crate) fn sampler_create_info(ctx: &GpuContext, desc: &SamplerDescriptor) -> vk::SamplerCreateInfo<'static> {
    let anisotropy = desc.max_anisotropy > 1.0 && ctx.capabilities.sampler_anisotropy;
    let (mipmap_mode, min_lod, max_lod) = if desc.mip_map_enabled {
        (mipmap_mode_to_vk(desc.mip_map_filter), desc.min_lod, desc.max_lod)
    } else {
        (vk::SamplerMipmapMode::NEAREST, 0.0, NO_MIP_MAX_LOD)
    };

    vk::SamplerCreateInfo::default()
        .mag_filter(filter_to_vk(desc.mag_filter))
        .min_filter(filter_to_vk(desc.min_filter))
        .mipmap_mode(mipmap_mode)
        .address_mode_u(address_mode(ctx, desc.address_mode_u))
        .address_mode_v(address_mode(ctx, desc.address_mode_v))
        .address_mode_w(address_mode(ctx, desc.address_mode_w))
        .mip_lod_bias(desc.mip_map_lod_bias)
        .anisotropy_enable(anisotropy)
        .max_anisotropy(if anisotropy { desc.max_anisotropy } else { 1.0 })
        .compare_enable(desc.compare_enabled)
        .compare_op(if desc.compare_enabled { compare_op_to_vk(desc.compare_op) } else { vk::CompareOp::ALWAYS })
        .min_lod(min_lod)
        .max_lod(max_lod)
        .border_color(border_color_to_vk(desc.border_color))
        .unnormalized_coordinates(false)
}

pub(crate) fn create_vk_sampler(ctx: &GpuContext, desc: &SamplerDescriptor) -> Result<vk::Sampler> {
    let info = sampler_create_info(ctx, desc);
    let sampler = unsafe { ctx.device.create_sampler(&info, None) }
        .map_err(|e| map_vk_error("vkCreateSampler", e))?;
    if let Some(name) = &desc.debug_name {
        ctx.set_object_name(sampler, name);
    }
    Ok(sampler)
}

/// Vulkan sampler
pub struct VulkanSampler {
    ctx: Arc<GpuContext>,
    pub(crate) sampler: vk::Sampler,
    pub(crate) desc: SamplerDescriptor,
}

impl VulkanSampler {
    /// Create a sampler from a clamped descriptor
    pub fn new(ctx: &Arc<GpuContext>, desc: &SamplerDescriptor) -> Result<Self> {
        Ok(Self {
            ctx: Arc::clone(ctx),
            sampler: create_vk_sampler(ctx, desc)?,
            desc: desc.clone(),
        })
    }
}

impl Drop for VulkanSampler {
    fn drop(&mut self) {
        unsafe { self.ctx.device.destroy_sampler(self.sampler, None) };
    }
}
