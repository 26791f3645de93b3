/// Query heaps and fences

use std::sync::Arc;
use std::time::Duration;

use ash::vk;
use lumen_rhi::lumen::render::{QueryHeapDescriptor, QueryType};
use lumen_rhi::lumen::Result;
use lumen_rhi::lumen_invalid;

use crate::vulkan_context::{map_vk_error, GpuContext, SOURCE};

/// Native queries per API query
pub(crate) fn queries_per_entry(query_type: QueryType) -> u32 {
    match query_type {
        QueryType::TimeElapsed => 2,
        _ => 1,
    }
}

/// Convert raw query words to API results
///
/// Timestamps come in begin/end pairs and turn into nanoseconds.
pub(crate) fn convert_results(query_type: QueryType, raw: &[u64], timestamp_period: f32) -> Vec<u64> {
    match query_type {
        QueryType::TimeElapsed => raw
            .chunks_exact(2)
            .map(|pair| (pair[1].saturating_sub(pair[0]) as f64 * timestamp_period as f64) as u64)
            .collect(),
        QueryType::AnySamplesPassed => raw.iter().map(|samples| (*samples > 0) as u64).collect(),
        _ => raw.to_vec(),
    }
}

/// Vulkan query heap
pub struct VulkanQueryHeap {
    ctx: Arc<GpuContext>,
    pub(crate) pool: vk::QueryPool,
    pub(crate) desc: QueryHeapDescriptor,
    /// Whether the query was ever recorded since the heap was created
    pub(crate) written: Vec<bool>,
}

impl VulkanQueryHeap {
    pub fn new(ctx: &Arc<GpuContext>, desc: &QueryHeapDescriptor) -> Result<Self> {
        if desc.num_queries == 0 {
            return Err(lumen_invalid!(SOURCE, "query heap needs at least one query"));
        }
        let mut info = vk::QueryPoolCreateInfo::default()
            .query_count(desc.num_queries * queries_per_entry(desc.query_type));
        info = match desc.query_type {
            QueryType::SamplesPassed | QueryType::AnySamplesPassed => info.query_type(vk::QueryType::OCCLUSION),
            QueryType::TimeElapsed => info.query_type(vk::QueryType::TIMESTAMP),
            QueryType::PipelineStatistics => {
                if !ctx.capabilities.pipeline_statistics {
                    return Err(lumen_invalid!(SOURCE, "device does not support pipeline statistics queries"));
                }
                info.query_type(vk::QueryType::PIPELINE_STATISTICS)
                    .pipeline_statistics(vk::QueryPipelineStatisticFlags::VERTEX_SHADER_INVOCATIONS)
            }
        };
        let pool = unsafe { ctx.device.create_query_pool(&info, None) }
            .map_err(|e| map_vk_error("vkCreateQueryPool", e))?;
        let heap = Self {
            ctx: Arc::clone(ctx),
            pool,
            desc: desc.clone(),
            written: vec![false; desc.num_queries as usize],
        };
        let count = heap.native_count();
        ctx.immediate_submit(|cb| unsafe { ctx.device.cmd_reset_query_pool(cb, pool, 0, count) })?;
        if let Some(name) = &desc.debug_name {
            ctx.set_object_name(pool, name);
        }
        Ok(heap)
    }

    fn native_count(&self) -> u32 {
        self.desc.num_queries * queries_per_entry(self.desc.query_type)
    }

    /// Occlusion queries count exact samples only for `SamplesPassed`
    pub(crate) fn control_flags(&self) -> vk::QueryControlFlags {
        if self.desc.query_type == QueryType::SamplesPassed && self.ctx.capabilities.occlusion_query_precise {
            vk::QueryControlFlags::PRECISE
        } else {
            vk::QueryControlFlags::empty()
        }
    }

    pub(crate) fn check_index(&self, query: u32) -> Result<()> {
        if query >= self.desc.num_queries {
            return Err(lumen_invalid!(
                SOURCE,
                "query {} out of range ({} queries)",
                query, self.desc.num_queries
            ));
        }
        Ok(())
    }

    pub(crate) fn record_reset(&self, device: &ash::Device, command_buffer: vk::CommandBuffer, query: u32) {
        let per_entry = queries_per_entry(self.desc.query_type);
        unsafe { device.cmd_reset_query_pool(command_buffer, self.pool, query * per_entry, per_entry) };
    }

    pub(crate) fn record_begin(&self, device: &ash::Device, command_buffer: vk::CommandBuffer, query: u32) {
        unsafe {
            match self.desc.query_type {
                QueryType::TimeElapsed => device.cmd_write_timestamp(
                    command_buffer,
                    vk::PipelineStageFlags::TOP_OF_PIPE,
                    self.pool,
                    query * 2,
                ),
                _ => device.cmd_begin_query(command_buffer, self.pool, query, self.control_flags()),
            }
        }
    }

    pub(crate) fn record_end(&self, device: &ash::Device, command_buffer: vk::CommandBuffer, query: u32) {
        unsafe {
            match self.desc.query_type {
                QueryType::TimeElapsed => device.cmd_write_timestamp(
                    command_buffer,
                    vk::PipelineStageFlags::BOTTOM_OF_PIPE,
                    self.pool,
                    query * 2 + 1,
                ),
                _ => device.cmd_end_query(command_buffer, self.pool, query),
            }
        }
    }

    /// Results of `[first, first + count)`, `None` while any is pending
    ///
    /// Command buffers close every query they begin, so a query is pending
    /// only until its submission completes.
    pub fn results(&self, first: u32, count: u32) -> Result<Option<Vec<u64>>> {
        let end = first as u64 + count as u64;
        if count == 0 || end > self.desc.num_queries as u64 {
            return Err(lumen_invalid!(
                SOURCE,
                "queries [{}, +{}) out of range ({} queries)",
                first, count, self.desc.num_queries
            ));
        }
        let per_entry = queries_per_entry(self.desc.query_type) as usize;
        // Value and availability word per native query
        let mut raw = vec![[0u64; 2]; count as usize * per_entry];
        let status = unsafe {
            self.ctx.device.get_query_pool_results(
                self.pool,
                first * per_entry as u32,
                &mut raw,
                vk::QueryResultFlags::TYPE_64 | vk::QueryResultFlags::WITH_AVAILABILITY,
            )
        };
        match status {
            Ok(()) | Err(vk::Result::NOT_READY) => {}
            Err(e) => return Err(map_vk_error("vkGetQueryPoolResults", e)),
        }
        let mut values = Vec::with_capacity(count as usize * per_entry);
        for (i, pair) in raw.iter().enumerate() {
            let available = pair[1] != 0;
            if available {
                values.push(pair[0]);
            } else if self.written[first as usize + i / per_entry] {
                return Ok(None);
            } else {
                // Never recorded since creation
                values.push(0);
            }
        }
        Ok(Some(convert_results(
            self.desc.query_type,
            &values,
            self.ctx.properties.limits.timestamp_period,
        )))
    }
}

impl Drop for VulkanQueryHeap {
    fn drop(&mut self) {
        unsafe { self.ctx.device.destroy_query_pool(self.pool, None) };
    }
}

/// Vulkan fence
pub struct VulkanFence {
    ctx: Arc<GpuContext>,
    pub(crate) fence: vk::Fence,
    pub(crate) debug_name: Option<String>,
    submitted: bool,
}

impl VulkanFence {
    pub fn new(ctx: &Arc<GpuContext>) -> Result<Self> {
        let info = vk::FenceCreateInfo::default();
        let fence = unsafe { ctx.device.create_fence(&info, None) }
            .map_err(|e| map_vk_error("vkCreateFence", e))?;
        Ok(Self {
            ctx: Arc::clone(ctx),
            fence,
            debug_name: None,
            submitted: false,
        })
    }

    /// Signal the fence once all work submitted so far has completed
    pub fn submit(&mut self) -> Result<()> {
        unsafe { self.ctx.device.reset_fences(&[self.fence]) }
            .map_err(|e| map_vk_error("vkResetFences", e))?;
        self.submitted = false;
        self.ctx.queue_submit(&[], self.fence)?;
        self.submitted = true;
        Ok(())
    }

    /// Wait up to `timeout`; false if the fence is still unsignaled
    pub fn wait(&self, timeout: Duration) -> Result<bool> {
        if !self.submitted {
            return Ok(false);
        }
        let nanos = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);
        match unsafe { self.ctx.device.wait_for_fences(&[self.fence], true, nanos) } {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(e) => Err(map_vk_error("vkWaitForFences", e)),
        }
    }

    pub(crate) fn set_debug_name(&mut self, name: &str) {
        self.debug_name = Some(name.to_string());
        self.ctx.set_object_name(self.fence, name);
    }
}

impl Drop for VulkanFence {
    fn drop(&mut self) {
        unsafe {
            if self.submitted {
                let _ = self.ctx.device.wait_for_fences(&[self.fence], true, u64::MAX);
            }
            self.ctx.device.destroy_fence(self.fence, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_query_tests.rs"]
mod tests;
