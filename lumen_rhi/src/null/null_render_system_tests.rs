//! Unit tests for null_render_system.rs
//!
//! Every test creates a Null render system, which holds the process-wide
//! Null backend slot, so they run serially.

use std::sync::Arc;
use std::time::Duration;

use serial_test::serial;

use crate::error::Error;
use crate::format::Format;
use crate::null::null_render_system::NullRenderSystem;
use crate::render::*;

fn null_system() -> NullRenderSystem {
    NullRenderSystem::new(&RenderSystemDescriptor::new(Backend::Null)).unwrap()
}

fn surface(width: u32, height: u32) -> Arc<dyn Surface> {
    Arc::new(HeadlessSurface::new(Extent2D::new(width, height)))
}

fn buffer_desc(size: u64, cpu_access_flags: CpuAccessFlags) -> BufferDescriptor {
    BufferDescriptor {
        size,
        bind_flags: BindFlags::COPY_SRC | BindFlags::COPY_DST,
        cpu_access_flags,
        ..Default::default()
    }
}

fn read_all(system: &mut NullRenderSystem, buffer: BufferHandle, size: usize) -> Vec<u8> {
    let mut data = vec![0u8; size];
    system.read_buffer(buffer, 0, &mut data).unwrap();
    data
}

fn vertex_shader(system: &mut NullRenderSystem) -> ShaderHandle {
    let desc = ShaderDescriptor::new(ShaderType::Vertex, ShaderSource::Code("void main() {}".into()), "main");
    system.create_shader(&desc).unwrap()
}

fn graphics_pipeline(system: &mut NullRenderSystem) -> PipelineStateHandle {
    let vertex_shader = vertex_shader(system);
    let desc = GraphicsPipelineDescriptor {
        vertex_shader: Some(vertex_shader),
        ..Default::default()
    };
    system.create_graphics_pipeline_state(&desc, None).unwrap()
}

/// Record into a fresh command buffer and return it ended
fn record(
    system: &mut NullRenderSystem,
    body: impl FnOnce(&mut CommandBuffer) -> crate::error::Result<()>,
) -> CommandBufferHandle {
    let handle = system.create_command_buffer(&CommandBufferDescriptor::default()).unwrap();
    let cmd = system.command_buffer_mut(handle).unwrap();
    cmd.begin().unwrap();
    body(cmd).unwrap();
    cmd.end().unwrap();
    handle
}

// ============================================================================
// SYSTEM
// ============================================================================

#[test]
#[serial]
fn test_renderer_info_and_limits() {
    let mut desc = RenderSystemDescriptor::new(Backend::Null);
    desc.null.limits.max_color_buffer_samples = 4;
    let system = NullRenderSystem::new(&desc).unwrap();
    assert_eq!(system.backend(), Backend::Null);
    assert_eq!(system.renderer_info().renderer_name, "Null");
    assert_eq!(system.rendering_limits().max_color_buffer_samples, 4);
}

#[test]
#[serial]
fn test_second_null_system_fails_until_first_is_dropped() {
    let first = null_system();
    let second = NullRenderSystem::new(&RenderSystemDescriptor::new(Backend::Null));
    assert!(matches!(second, Err(Error::InitializationFailed(_))));
    drop(first);
    assert!(NullRenderSystem::new(&RenderSystemDescriptor::new(Backend::Null)).is_ok());
}

#[test]
#[serial]
fn test_drop_releases_every_object() {
    let mut system = null_system();
    system.create_buffer(&buffer_desc(16, CpuAccessFlags::empty()), None).unwrap();
    system.create_fence().unwrap();
    assert_eq!(system.object_count(), 2);
    drop(system);
    assert!(!crate::runtime::Runtime::is_backend_active(Backend::Null));
}

// ============================================================================
// HANDLES
// ============================================================================

#[test]
#[serial]
fn test_released_handle_is_rejected() {
    let mut system = null_system();
    let buffer = system.create_buffer(&buffer_desc(16, CpuAccessFlags::empty()), None).unwrap();
    assert!(system.release_buffer(buffer));
    assert!(matches!(system.buffer_descriptor(buffer), Err(Error::InvalidResource(_))));
    assert!(!system.release_buffer(buffer));
}

#[test]
#[serial]
fn test_set_debug_name() {
    let mut system = null_system();
    let buffer = system.create_buffer(&buffer_desc(16, CpuAccessFlags::empty()), None).unwrap();
    system.set_debug_name(ObjectHandle::Buffer(buffer), "vertices").unwrap();
    assert_eq!(system.buffer_descriptor(buffer).unwrap().debug_name.as_deref(), Some("vertices"));

    let fence = system.create_fence().unwrap();
    system.release_fence(fence);
    assert!(system.set_debug_name(ObjectHandle::Fence(fence), "gone").is_err());
}

// ============================================================================
// BUFFERS AND MAPPING
// ============================================================================

#[test]
#[serial]
fn test_create_buffer_validates_descriptor() {
    let mut system = null_system();
    let result = system.create_buffer(&buffer_desc(0, CpuAccessFlags::empty()), None);
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    let result = system.create_buffer(&buffer_desc(2, CpuAccessFlags::empty()), Some(&[1, 2, 3]));
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
}

#[test]
#[serial]
fn test_write_discard_then_read_only_mapping() {
    let mut system = null_system();
    let buffer = system
        .create_buffer(&buffer_desc(8, CpuAccessFlags::READ_WRITE), Some(&[7; 8]))
        .unwrap();

    {
        let mut mapped = system.map_buffer(buffer, CpuAccess::WriteDiscard).unwrap();
        let data = mapped.as_mut_slice().unwrap();
        assert!(data.iter().all(|b| *b == 0));
        data[..4].copy_from_slice(&[1, 2, 3, 4]);
    }
    system.unmap_buffer(buffer).unwrap();

    let mut mapped = system.map_buffer(buffer, CpuAccess::ReadOnly).unwrap();
    assert_eq!(mapped.as_slice(), &[1, 2, 3, 4, 0, 0, 0, 0]);
    assert!(mapped.as_mut_slice().is_none());
    system.unmap_buffer(buffer).unwrap();
}

#[test]
#[serial]
fn test_map_range() {
    let mut system = null_system();
    let buffer = system
        .create_buffer(&buffer_desc(8, CpuAccessFlags::READ), Some(&[0, 1, 2, 3, 4, 5, 6, 7]))
        .unwrap();
    let mapped = system.map_buffer_range(buffer, CpuAccess::ReadOnly, 2, 3).unwrap();
    assert_eq!(mapped.as_slice(), &[2, 3, 4]);
    drop(mapped);
    assert!(system.map_buffer_range(buffer, CpuAccess::ReadOnly, 6, 4).is_err());
}

#[test]
#[serial]
fn test_mapping_protocol_errors() {
    let mut system = null_system();
    let buffer = system.create_buffer(&buffer_desc(8, CpuAccessFlags::READ), None).unwrap();

    assert!(matches!(system.unmap_buffer(buffer), Err(Error::InvalidState(_))));
    assert!(matches!(
        system.map_buffer(buffer, CpuAccess::WriteOnly),
        Err(Error::InvalidArgument(_))
    ));

    system.map_buffer(buffer, CpuAccess::ReadOnly).unwrap();
    assert!(matches!(system.map_buffer(buffer, CpuAccess::ReadOnly), Err(Error::InvalidState(_))));
    assert!(matches!(system.write_buffer(buffer, 0, &[1]), Err(Error::InvalidState(_))));
}

#[test]
#[serial]
fn test_submit_with_mapped_buffer_fails_without_side_effects() {
    let mut system = null_system();
    let buffer = system.create_buffer(&buffer_desc(4, CpuAccessFlags::READ), None).unwrap();
    let cmd = record(&mut system, |cmd| cmd.fill_buffer(buffer, 0, 0xAABBCCDD, WHOLE_SIZE));

    system.map_buffer(buffer, CpuAccess::ReadOnly).unwrap();
    assert!(matches!(system.submit(cmd), Err(Error::InvalidState(_))));
    system.unmap_buffer(buffer).unwrap();
    assert_eq!(read_all(&mut system, buffer, 4), vec![0; 4]);

    system.submit(cmd).unwrap();
    assert_eq!(read_all(&mut system, buffer, 4), 0xAABBCCDDu32.to_le_bytes().to_vec());
}

#[test]
#[serial]
fn test_submit_with_mapped_buffer_in_vertex_array_fails() {
    let mut system = null_system();
    let desc = BufferDescriptor {
        size: 16,
        bind_flags: BindFlags::VERTEX_BUFFER,
        cpu_access_flags: CpuAccessFlags::READ,
        ..Default::default()
    };
    let first = system.create_buffer(&desc, None).unwrap();
    let second = system.create_buffer(&desc, None).unwrap();
    let array = system.create_buffer_array(&[first, second]).unwrap();
    let cmd = record(&mut system, |cmd| cmd.set_vertex_buffer_array(array));

    system.map_buffer(second, CpuAccess::ReadOnly).unwrap();
    assert!(matches!(system.submit(cmd), Err(Error::InvalidState(_))));
    system.unmap_buffer(second).unwrap();
    system.submit(cmd).unwrap();
}

#[test]
#[serial]
fn test_submit_with_mapped_buffer_in_resource_heap_fails() {
    let mut system = null_system();
    let layout = two_binding_layout(&mut system);
    let buffer = system.create_buffer(&buffer_desc(16, CpuAccessFlags::READ), None).unwrap();
    let sampler = system.create_sampler(&SamplerDescriptor::default()).unwrap();
    let desc = ResourceHeapDescriptor { pipeline_layout: Some(layout), num_resource_views: 0 };
    let views = [ResourceViewDescriptor::Buffer(buffer), ResourceViewDescriptor::Sampler(sampler)];
    let heap = system.create_resource_heap(&desc, &views).unwrap();
    let cmd = record(&mut system, |cmd| cmd.set_resource_heap(heap, 0));

    system.map_buffer(buffer, CpuAccess::ReadOnly).unwrap();
    assert!(matches!(system.submit(cmd), Err(Error::InvalidState(_))));
    system.unmap_buffer(buffer).unwrap();
    system.submit(cmd).unwrap();
}

#[test]
#[serial]
fn test_buffer_written_into_heap_later_is_checked() {
    let mut system = null_system();
    let layout = two_binding_layout(&mut system);
    let buffer = system.create_buffer(&buffer_desc(16, CpuAccessFlags::READ), None).unwrap();
    let desc = ResourceHeapDescriptor { pipeline_layout: Some(layout), num_resource_views: 2 };
    let heap = system.create_resource_heap(&desc, &[]).unwrap();
    let cmd = record(&mut system, |cmd| cmd.set_resource_heap(heap, 0));

    system.map_buffer(buffer, CpuAccess::ReadOnly).unwrap();
    system.submit(cmd).unwrap();

    system.write_resource_heap(heap, 0, &[ResourceViewDescriptor::Buffer(buffer)]).unwrap();
    assert!(matches!(system.submit(cmd), Err(Error::InvalidState(_))));
    system.unmap_buffer(buffer).unwrap();
    system.submit(cmd).unwrap();
}

// ============================================================================
// COMMAND EXECUTION
// ============================================================================

#[test]
#[serial]
fn test_update_copy_and_fill() {
    let mut system = null_system();
    let src = system.create_buffer(&buffer_desc(8, CpuAccessFlags::empty()), None).unwrap();
    let dst = system.create_buffer(&buffer_desc(8, CpuAccessFlags::empty()), None).unwrap();
    let cmd = record(&mut system, |cmd| {
        cmd.update_buffer(src, 0, &[1, 2, 3, 4, 5, 6, 7, 8])?;
        cmd.fill_buffer(dst, 0, 0x0909_0909, 8)?;
        cmd.copy_buffer(dst, 4, src, 0, 4)
    });
    system.submit(cmd).unwrap();
    assert_eq!(read_all(&mut system, dst, 8), vec![9, 9, 9, 9, 1, 2, 3, 4]);
    assert_eq!(system.statistics().submits, 1);
    assert_eq!(system.statistics().commands, 3);
}

#[test]
#[serial]
fn test_failing_command_applies_nothing() {
    let mut system = null_system();
    let buffer = system.create_buffer(&buffer_desc(8, CpuAccessFlags::empty()), None).unwrap();
    let small = system.create_buffer(&buffer_desc(4, CpuAccessFlags::empty()), None).unwrap();
    let cmd = record(&mut system, |cmd| {
        cmd.update_buffer(buffer, 0, &[5; 8])?;
        cmd.copy_buffer(small, 0, buffer, 0, 8)
    });
    assert!(matches!(system.submit(cmd), Err(Error::InvalidArgument(_))));
    assert_eq!(read_all(&mut system, buffer, 8), vec![0; 8]);
    assert_eq!(system.statistics().submits, 0);
}

#[test]
#[serial]
fn test_submit_released_resource_fails() {
    let mut system = null_system();
    let buffer = system.create_buffer(&buffer_desc(4, CpuAccessFlags::empty()), None).unwrap();
    let cmd = record(&mut system, |cmd| cmd.fill_buffer(buffer, 0, 1, 4));
    system.release_buffer(buffer);
    assert!(matches!(system.submit(cmd), Err(Error::InvalidResource(_))));
}

#[test]
#[serial]
fn test_texture_copies_through_buffers() {
    let mut system = null_system();
    let texture = system
        .create_texture(
            &TextureDescriptor {
                format: Format::R8Unorm,
                extent: Extent3D::new(2, 2, 1),
                mip_levels: 1,
                ..Default::default()
            },
            Some(&[1, 2, 3, 4]),
        )
        .unwrap();
    let buffer = system.create_buffer(&buffer_desc(4, CpuAccessFlags::empty()), None).unwrap();
    let region = TextureRegion::new(Offset3D::new(0, 0, 0), Extent3D::new(2, 2, 1));

    let cmd = record(&mut system, |cmd| cmd.copy_buffer_from_texture(buffer, 0, texture, &region, 0, 0));
    system.submit(cmd).unwrap();
    assert_eq!(read_all(&mut system, buffer, 4), vec![1, 2, 3, 4]);

    system.write_buffer(buffer, 0, &[9, 8, 7, 6]).unwrap();
    let cmd = record(&mut system, |cmd| cmd.copy_texture_from_buffer(texture, &region, buffer, 0, 0, 0));
    system.submit(cmd).unwrap();
    let mut texels = [0u8; 4];
    system.read_texture(texture, &region, &mut texels).unwrap();
    assert_eq!(texels, [9, 8, 7, 6]);
}

#[test]
#[serial]
fn test_generate_mips_command() {
    let mut system = null_system();
    let texture = system
        .create_texture(
            &TextureDescriptor {
                format: Format::R8Unorm,
                extent: Extent3D::new(2, 2, 1),
                ..Default::default()
            },
            Some(&[40, 40, 40, 40]),
        )
        .unwrap();
    let cmd = record(&mut system, |cmd| cmd.generate_mips(texture));
    system.submit(cmd).unwrap();

    let mut texel = [0u8; 1];
    let region = TextureRegion::with_subresource(
        TextureSubresource::single(0, 1),
        Offset3D::default(),
        Extent3D::new(1, 1, 1),
    );
    system.read_texture(texture, &region, &mut texel).unwrap();
    assert_eq!(texel, [40]);
}

#[test]
#[serial]
fn test_clear_swap_chain_and_copy_framebuffer() {
    let mut system = null_system();
    let swap_chain = system.create_swap_chain(&SwapChainDescriptor::default(), surface(4, 4)).unwrap();
    let format = system.swap_chain(swap_chain).unwrap().color_format();
    let texture = system
        .create_texture(
            &TextureDescriptor {
                format,
                extent: Extent3D::new(2, 2, 1),
                mip_levels: 1,
                ..Default::default()
            },
            None,
        )
        .unwrap();
    let region = TextureRegion::new(Offset3D::default(), Extent3D::new(2, 2, 1));
    let white = ClearValue { color: [1.0; 4], ..Default::default() };

    let cmd = record(&mut system, |cmd| {
        cmd.begin_render_pass(RenderTargetRef::SwapChain(swap_chain), None, &[])?;
        cmd.clear(ClearFlags::COLOR, white)?;
        cmd.copy_texture_from_framebuffer(texture, &region, Offset2D::new(1, 1))?;
        cmd.end_render_pass()
    });
    system.submit(cmd).unwrap();

    let mut texels = [0u8; 16];
    system.read_texture(texture, &region, &mut texels).unwrap();
    assert!(texels.iter().all(|b| *b == 255));
}

#[test]
#[serial]
fn test_dispatch_with_graphics_pipeline_fails_at_submit() {
    let mut system = null_system();
    let pipeline = graphics_pipeline(&mut system);
    let cmd = record(&mut system, |cmd| {
        cmd.set_pipeline_state(pipeline)?;
        cmd.dispatch(1, 1, 1)
    });
    assert!(matches!(system.submit(cmd), Err(Error::InvalidState(_))));
}

#[test]
#[serial]
fn test_draw_statistics_and_pipeline_query() {
    let mut system = null_system();
    let swap_chain = system.create_swap_chain(&SwapChainDescriptor::default(), surface(8, 8)).unwrap();
    let pipeline = graphics_pipeline(&mut system);
    let heap = system
        .create_query_heap(&QueryHeapDescriptor {
            debug_name: None,
            query_type: QueryType::PipelineStatistics,
            num_queries: 2,
        })
        .unwrap();

    let cmd = record(&mut system, |cmd| {
        cmd.begin_render_pass(RenderTargetRef::SwapChain(swap_chain), None, &[])?;
        cmd.set_pipeline_state(pipeline)?;
        cmd.begin_query(heap, 1)?;
        cmd.draw_instanced(3, 0, 2, 0)?;
        cmd.end_query(heap, 1)?;
        cmd.draw(3, 0)?;
        cmd.end_render_pass()
    });
    system.submit(cmd).unwrap();

    assert_eq!(system.query_result(heap, 0, 2).unwrap(), Some(vec![0, 6]));
    let stats = system.statistics();
    assert_eq!(stats.draw_calls, 2);
    assert_eq!(stats.vertices, 9);
}

#[test]
#[serial]
fn test_indexed_draw_checks_index_range() {
    let mut system = null_system();
    let swap_chain = system.create_swap_chain(&SwapChainDescriptor::default(), surface(8, 8)).unwrap();
    let pipeline = graphics_pipeline(&mut system);
    let indices = system
        .create_buffer(
            &BufferDescriptor {
                size: 6,
                format: Format::R16Uint,
                bind_flags: BindFlags::INDEX_BUFFER,
                ..Default::default()
            },
            None,
        )
        .unwrap();

    let cmd = record(&mut system, |cmd| {
        cmd.begin_render_pass(RenderTargetRef::SwapChain(swap_chain), None, &[])?;
        cmd.set_pipeline_state(pipeline)?;
        cmd.set_index_buffer(indices, Format::R16Uint, 0)?;
        cmd.draw_indexed(4, 0)?;
        cmd.end_render_pass()
    });
    assert!(matches!(system.submit(cmd), Err(Error::InvalidArgument(_))));
}

// ============================================================================
// TEXTURES
// ============================================================================

#[test]
#[serial]
fn test_64x64_texture_mip_chain() {
    let mut system = null_system();
    let texture = system
        .create_texture(
            &TextureDescriptor {
                extent: Extent3D::new(64, 64, 1),
                ..Default::default()
            },
            None,
        )
        .unwrap();
    assert_eq!(system.texture_descriptor(texture).unwrap().mip_levels, 7);
    assert_eq!(system.texture_mip_extent(texture, 6).unwrap(), Extent3D::new(1, 1, 1));
}

#[test]
#[serial]
fn test_texture_initial_data_too_small_fails() {
    let mut system = null_system();
    let result = system.create_texture(
        &TextureDescriptor {
            format: Format::R8Unorm,
            extent: Extent3D::new(4, 4, 1),
            ..Default::default()
        },
        Some(&[0; 8]),
    );
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
}

#[test]
#[serial]
fn test_texture_initial_data_generates_mips() {
    let mut system = null_system();
    let texture = system
        .create_texture(
            &TextureDescriptor {
                format: Format::R8Unorm,
                extent: Extent3D::new(2, 2, 1),
                misc_flags: MiscFlags::GENERATE_MIPS,
                ..Default::default()
            },
            Some(&[0, 0, 200, 200]),
        )
        .unwrap();
    let mut texel = [0u8; 1];
    let region = TextureRegion::with_subresource(
        TextureSubresource::single(0, 1),
        Offset3D::default(),
        Extent3D::new(1, 1, 1),
    );
    system.read_texture(texture, &region, &mut texel).unwrap();
    assert_eq!(texel, [100]);
}

// ============================================================================
// SWAP CHAINS
// ============================================================================

#[test]
#[serial]
fn test_swap_chain_samples_are_clamped() {
    let mut system = null_system();
    let desc = SwapChainDescriptor { samples: 16, ..Default::default() };
    let swap_chain = system.create_swap_chain(&desc, surface(800, 600)).unwrap();
    assert_eq!(system.swap_chain(swap_chain).unwrap().samples(), 8);
}

#[test]
#[serial]
fn test_swap_chain_resize_updates_framebuffer_height() {
    let mut system = null_system();
    let swap_chain = system.create_swap_chain(&SwapChainDescriptor::default(), surface(800, 600)).unwrap();
    assert_eq!(system.state_manager().framebuffer_height(), 600);

    system
        .swap_chain_mut(swap_chain)
        .unwrap()
        .resize_buffers(Extent2D::new(1920, 1080), ResizeFlags::empty())
        .unwrap();
    assert_eq!(system.swap_chain(swap_chain).unwrap().resolution(), Extent2D::new(1920, 1080));
    assert_eq!(system.state_manager().framebuffer_height(), 1080);
}

#[test]
#[serial]
fn test_present_rotates_back_buffers() {
    let mut system = null_system();
    let desc = SwapChainDescriptor { swap_buffers: 3, ..Default::default() };
    let swap_chain = system.create_swap_chain(&desc, surface(4, 4)).unwrap();
    let chain = system.swap_chain_mut(swap_chain).unwrap();
    assert_eq!(chain.current_swap_index(), 0);
    chain.present().unwrap();
    chain.present().unwrap();
    assert_eq!(chain.current_swap_index(), 2);
    chain.present().unwrap();
    assert_eq!(chain.current_swap_index(), 0);
    assert_eq!(system.null_swap_chain(swap_chain).unwrap().presented_frames(), 3);
}

#[test]
#[serial]
fn test_release_swap_chain_unbinds_it() {
    let mut system = null_system();
    let swap_chain = system.create_swap_chain(&SwapChainDescriptor::default(), surface(4, 4)).unwrap();
    assert_eq!(system.state_manager().bound_swap_chain(), Some(swap_chain));
    assert!(system.release_swap_chain(swap_chain));
    assert_eq!(system.state_manager().bound_swap_chain(), None);
    assert!(!system.release_swap_chain(swap_chain));
}

// ============================================================================
// SHADERS AND PIPELINES
// ============================================================================

#[test]
#[serial]
fn test_shader_reports() {
    let mut system = null_system();

    let good = vertex_shader(&mut system);
    assert!(system.shader_report(good).unwrap().is_empty());

    let empty = ShaderDescriptor::new(ShaderType::Fragment, ShaderSource::Code(String::new()), "main");
    let empty = system.create_shader(&empty).unwrap();
    assert!(system.shader_report(empty).unwrap().has_errors());

    let no_entry = ShaderDescriptor::new(ShaderType::Fragment, ShaderSource::Code("x".into()), "");
    let no_entry = system.create_shader(&no_entry).unwrap();
    assert!(system.shader_report(no_entry).unwrap().has_errors());

    let mut odd_profile = ShaderDescriptor::new(ShaderType::Compute, ShaderSource::Binary(vec![0; 8]), "main");
    odd_profile.profile = "quantum_9".to_string();
    let odd_profile = system.create_shader(&odd_profile).unwrap();
    let report = system.shader_report(odd_profile).unwrap();
    assert!(report.has_warnings());
    assert!(!report.has_errors());
}

#[test]
#[serial]
fn test_pipeline_without_vertex_shader_reports_error() {
    let mut system = null_system();
    let pipeline = system
        .create_graphics_pipeline_state(&GraphicsPipelineDescriptor::default(), None)
        .unwrap();
    assert!(system.pipeline_state_report(pipeline).unwrap().has_errors());
}

#[test]
#[serial]
fn test_pipeline_with_dead_layout_fails() {
    let mut system = null_system();
    let layout = system.create_pipeline_layout(&PipelineLayoutDescriptor::default()).unwrap();
    system.release_pipeline_layout(layout);
    let desc = ComputePipelineDescriptor {
        pipeline_layout: Some(layout),
        ..Default::default()
    };
    assert!(matches!(
        system.create_compute_pipeline_state(&desc, None),
        Err(Error::InvalidResource(_))
    ));
}

#[test]
#[serial]
fn test_pipeline_cache_blob_counts_pipelines() {
    let mut system = null_system();
    let cache = system.create_pipeline_cache(&[]).unwrap();
    let shader = system
        .create_shader(&ShaderDescriptor::new(ShaderType::Compute, ShaderSource::Binary(vec![0; 4]), "main"))
        .unwrap();
    let desc = ComputePipelineDescriptor {
        compute_shader: Some(shader),
        ..Default::default()
    };
    system.create_compute_pipeline_state(&desc, Some(cache)).unwrap();
    system.create_compute_pipeline_state(&desc, Some(cache)).unwrap();

    let blob = system.pipeline_cache_blob(cache).unwrap();
    let restored = system.create_pipeline_cache(&blob).unwrap();
    assert_eq!(system.pipeline_cache_blob(restored).unwrap(), blob);
}

// ============================================================================
// RENDER TARGETS AND RESOURCE HEAPS
// ============================================================================

#[test]
#[serial]
fn test_render_target_attachment_resolution_must_match() {
    let mut system = null_system();
    let texture = system
        .create_texture(&TextureDescriptor { extent: Extent3D::new(64, 64, 1), ..Default::default() }, None)
        .unwrap();

    let mut desc = RenderTargetDescriptor {
        resolution: Extent2D::new(32, 32),
        color_attachments: vec![AttachmentDescriptor::texture(texture)],
        ..Default::default()
    };
    assert!(matches!(system.create_render_target(&desc), Err(Error::InvalidArgument(_))));

    desc.color_attachments[0].mip_level = 1;
    let target = system.create_render_target(&desc).unwrap();
    assert_eq!(system.render_target_resolution(target).unwrap(), Extent2D::new(32, 32));
}

#[test]
#[serial]
fn test_render_pass_clears_render_target() {
    let mut system = null_system();
    let texture = system
        .create_texture(
            &TextureDescriptor {
                format: Format::R8Unorm,
                extent: Extent3D::new(2, 2, 1),
                mip_levels: 1,
                ..Default::default()
            },
            None,
        )
        .unwrap();
    let render_pass = system
        .create_render_pass(&RenderPassDescriptor {
            color_attachments: vec![AttachmentFormatDescriptor::new(
                Format::R8Unorm,
                AttachmentLoadOp::Clear,
                AttachmentStoreOp::Store,
            )],
            ..Default::default()
        })
        .unwrap();
    let target = system
        .create_render_target(&RenderTargetDescriptor {
            render_pass: Some(render_pass),
            resolution: Extent2D::new(2, 2),
            color_attachments: vec![AttachmentDescriptor::texture(texture)],
            ..Default::default()
        })
        .unwrap();

    let half = ClearValue { color: [0.5, 0.0, 0.0, 0.0], ..Default::default() };
    let cmd = record(&mut system, |cmd| {
        cmd.begin_render_pass(RenderTargetRef::RenderTarget(target), Some(render_pass), &[half])?;
        cmd.end_render_pass()
    });
    system.submit(cmd).unwrap();

    let mut texels = [0u8; 4];
    let region = TextureRegion::new(Offset3D::default(), Extent3D::new(2, 2, 1));
    system.read_texture(texture, &region, &mut texels).unwrap();
    assert_eq!(texels, [128; 4]);
}

fn two_binding_layout(system: &mut NullRenderSystem) -> PipelineLayoutHandle {
    let desc = PipelineLayoutDescriptor {
        heap_bindings: vec![
            BindingDescriptor::new(ResourceType::Buffer, BindFlags::CONSTANT_BUFFER, StageFlags::VERTEX, 0),
            BindingDescriptor::new(ResourceType::Sampler, BindFlags::empty(), StageFlags::FRAGMENT, 1),
        ],
        ..Default::default()
    };
    system.create_pipeline_layout(&desc).unwrap()
}

#[test]
#[serial]
fn test_resource_heap_validation() {
    let mut system = null_system();
    let layout = two_binding_layout(&mut system);
    let buffer = system.create_buffer(&buffer_desc(16, CpuAccessFlags::empty()), None).unwrap();
    let sampler = system.create_sampler(&SamplerDescriptor::default()).unwrap();
    let desc = ResourceHeapDescriptor { pipeline_layout: Some(layout), num_resource_views: 0 };

    let odd = [ResourceViewDescriptor::Buffer(buffer)];
    assert!(matches!(system.create_resource_heap(&desc, &odd), Err(Error::InvalidArgument(_))));

    let swapped = [ResourceViewDescriptor::Sampler(sampler), ResourceViewDescriptor::Buffer(buffer)];
    assert!(matches!(system.create_resource_heap(&desc, &swapped), Err(Error::InvalidArgument(_))));

    let views = [ResourceViewDescriptor::Buffer(buffer), ResourceViewDescriptor::Sampler(sampler)];
    assert!(system.create_resource_heap(&desc, &views).is_ok());

    let missing_layout = ResourceHeapDescriptor::default();
    assert!(system.create_resource_heap(&missing_layout, &views).is_err());
}

#[test]
#[serial]
fn test_write_resource_heap() {
    let mut system = null_system();
    let layout = two_binding_layout(&mut system);
    let buffer = system.create_buffer(&buffer_desc(16, CpuAccessFlags::empty()), None).unwrap();
    let sampler = system.create_sampler(&SamplerDescriptor::default()).unwrap();
    let desc = ResourceHeapDescriptor { pipeline_layout: Some(layout), num_resource_views: 4 };
    let heap = system.create_resource_heap(&desc, &[]).unwrap();

    let written = system
        .write_resource_heap(heap, 2, &[ResourceViewDescriptor::Buffer(buffer), ResourceViewDescriptor::Sampler(sampler)])
        .unwrap();
    assert_eq!(written, 2);
    assert!(system.write_resource_heap(heap, 3, &[ResourceViewDescriptor::Buffer(buffer)]).is_err());
    assert!(system.write_resource_heap(heap, 4, &[ResourceViewDescriptor::Buffer(buffer)]).is_err());
}

// ============================================================================
// FENCES AND QUERIES
// ============================================================================

#[test]
#[serial]
fn test_fence_signaled_after_submit() {
    let mut system = null_system();
    let fence = system.create_fence().unwrap();
    assert!(!system.wait_fence(fence, Duration::from_millis(1)).unwrap());
    system.submit_fence(fence).unwrap();
    assert!(system.wait_fence(fence, Duration::from_millis(1)).unwrap());
    system.wait_idle().unwrap();
}

#[test]
#[serial]
fn test_query_result_range_checked() {
    let mut system = null_system();
    let heap = system
        .create_query_heap(&QueryHeapDescriptor {
            debug_name: None,
            query_type: QueryType::SamplesPassed,
            num_queries: 2,
        })
        .unwrap();
    assert_eq!(system.query_result(heap, 0, 2).unwrap(), Some(vec![0, 0]));
    assert!(system.query_result(heap, 1, 2).is_err());
    assert!(system
        .create_query_heap(&QueryHeapDescriptor {
            debug_name: None,
            query_type: QueryType::SamplesPassed,
            num_queries: 0,
        })
        .is_err());
}
