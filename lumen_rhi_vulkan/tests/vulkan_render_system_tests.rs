//! Integration tests for the Vulkan backend
//!
//! Tests marked #[ignore] need a Vulkan capable GPU and drivers.
//!
//! Run with: cargo test --test vulkan_render_system_tests -- --ignored

use std::sync::Arc;
use std::time::Duration;

use lumen_rhi::lumen::format::Format;
use lumen_rhi::lumen::render::*;
use lumen_rhi::lumen::{Error, Runtime};
use serial_test::serial;
use winit::event_loop::EventLoop;
use winit::window::Window;

/// Create a hidden window for surface tests
#[allow(deprecated)]
fn create_test_window() -> (Window, EventLoop<()>) {
    let event_loop = EventLoop::new().unwrap();
    let window_attributes = Window::default_attributes()
        .with_title("Lumen Vulkan Test")
        .with_inner_size(winit::dpi::LogicalSize::new(800, 600))
        .with_visible(false);
    let window = event_loop.create_window(window_attributes).unwrap();
    (window, event_loop)
}

fn load_vulkan() -> Box<dyn RenderSystem> {
    lumen_rhi_vulkan::register();
    let mut desc = RenderSystemDescriptor::new(Backend::Vulkan);
    desc.debug_name = Some("vulkan tests".to_string());
    load_render_system(&desc).unwrap()
}

fn staging_buffer(system: &mut dyn RenderSystem, size: u64, initial: Option<&[u8]>) -> BufferHandle {
    system
        .create_buffer(
            &BufferDescriptor {
                size,
                bind_flags: BindFlags::COPY_SRC | BindFlags::COPY_DST,
                cpu_access_flags: CpuAccessFlags::READ | CpuAccessFlags::WRITE,
                ..Default::default()
            },
            initial,
        )
        .unwrap()
}

// ============================================================================
// REGISTRATION (no GPU)
// ============================================================================

#[test]
#[serial]
fn test_register_adds_vulkan_loader() {
    Runtime::reset_for_testing();
    assert!(!Runtime::is_backend_registered(Backend::Vulkan));
    lumen_rhi_vulkan::register();
    assert!(Runtime::is_backend_registered(Backend::Vulkan));
    assert!(Runtime::is_backend_registered(Backend::Null));
}

// ============================================================================
// DEVICE
// ============================================================================

#[test]
#[serial]
#[ignore]
fn test_load_reports_device() {
    let system = load_vulkan();
    assert_eq!(system.backend(), Backend::Vulkan);
    assert!(!system.renderer_info().device_name.is_empty());
    assert_eq!(system.renderer_info().shading_language_name, "SPIR-V");
    assert!(system.rendering_limits().max_texture_2d_size >= 4096);
    assert!(Runtime::is_backend_active(Backend::Vulkan));

    let second = load_render_system(&RenderSystemDescriptor::new(Backend::Vulkan));
    assert!(matches!(second, Err(Error::InitializationFailed(_))));

    drop(system);
    assert!(!Runtime::is_backend_active(Backend::Vulkan));
}

// ============================================================================
// HOST TRANSFERS
// ============================================================================

#[test]
#[serial]
#[ignore]
fn test_buffer_write_then_read() {
    let mut system = load_vulkan();
    let device_local = system
        .create_buffer(
            &BufferDescriptor { size: 256, bind_flags: BindFlags::STORAGE, ..Default::default() },
            None,
        )
        .unwrap();

    let data: Vec<u8> = (0..128u32).map(|i| i as u8).collect();
    system.write_buffer(device_local, 64, &data).unwrap();

    let mut out = vec![0u8; 128];
    system.read_buffer(device_local, 64, &mut out).unwrap();
    assert_eq!(out, data);

    let result = system.write_buffer(device_local, 200, &data);
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
}

#[test]
#[serial]
#[ignore]
fn test_mapped_buffer_blocks_writes() {
    let mut system = load_vulkan();
    let buffer = staging_buffer(system.as_mut(), 16, Some(&[7u8; 16]));

    {
        let mut mapped = system.map_buffer(buffer, CpuAccess::ReadWrite).unwrap();
        assert_eq!(mapped.as_slice(), &[7u8; 16]);
        mapped.as_mut_slice().unwrap()[0] = 9;
    }
    assert!(matches!(system.write_buffer(buffer, 0, &[1]), Err(Error::InvalidState(_))));
    system.unmap_buffer(buffer).unwrap();

    let mut first = [0u8; 1];
    system.read_buffer(buffer, 0, &mut first).unwrap();
    assert_eq!(first, [9]);
}

#[test]
#[serial]
#[ignore]
fn test_mapped_buffer_in_vertex_array_blocks_submit() {
    let mut system = load_vulkan();
    let vertices = system
        .create_buffer(
            &BufferDescriptor {
                size: 64,
                bind_flags: BindFlags::VERTEX_BUFFER,
                cpu_access_flags: CpuAccessFlags::READ,
                ..Default::default()
            },
            None,
        )
        .unwrap();
    let array = system.create_buffer_array(&[vertices]).unwrap();

    let cmd = system.create_command_buffer(&CommandBufferDescriptor::default()).unwrap();
    {
        let recorder = system.command_buffer_mut(cmd).unwrap();
        recorder.begin().unwrap();
        recorder.set_vertex_buffer_array(array).unwrap();
        recorder.end().unwrap();
    }

    let mapped = system.map_buffer(vertices, CpuAccess::ReadOnly).unwrap();
    drop(mapped);
    assert!(matches!(system.submit(cmd), Err(Error::InvalidState(_))));
    system.unmap_buffer(vertices).unwrap();
    system.submit(cmd).unwrap();
    system.wait_idle().unwrap();
}

#[test]
#[serial]
#[ignore]
fn test_texture_write_then_read() {
    let mut system = load_vulkan();
    let texture = system
        .create_texture(
            &TextureDescriptor {
                format: Format::Rgba8Unorm,
                extent: Extent3D::new(8, 8, 1),
                mip_levels: 1,
                ..Default::default()
            },
            None,
        )
        .unwrap();

    let region = TextureRegion::new(Offset3D::new(2, 2, 0), Extent3D::new(4, 4, 1));
    let texels: Vec<u8> = (0..64u32).map(|i| (i * 3) as u8).collect();
    system.write_texture(texture, &region, &texels).unwrap();

    let mut out = vec![0u8; 64];
    system.read_texture(texture, &region, &mut out).unwrap();
    assert_eq!(out, texels);
}

// ============================================================================
// SUBMISSION
// ============================================================================

#[test]
#[serial]
#[ignore]
fn test_fill_and_copy_through_command_buffer() {
    let mut system = load_vulkan();
    let src = staging_buffer(system.as_mut(), 64, None);
    let dst = staging_buffer(system.as_mut(), 64, None);

    let cmd = system.create_command_buffer(&CommandBufferDescriptor::default()).unwrap();
    {
        let recorder = system.command_buffer_mut(cmd).unwrap();
        recorder.begin().unwrap();
        recorder.fill_buffer(src, 0, 0xAABB_CCDD, 64).unwrap();
        recorder.update_buffer(src, 0, &[1, 2, 3, 4]).unwrap();
        recorder.copy_buffer(dst, 0, src, 0, 64).unwrap();
        recorder.end().unwrap();
    }

    let fence = system.create_fence().unwrap();
    system.submit(cmd).unwrap();
    system.submit_fence(fence).unwrap();
    assert!(system.wait_fence(fence, Duration::from_secs(5)).unwrap());

    let mut out = vec![0u8; 64];
    system.read_buffer(dst, 0, &mut out).unwrap();
    assert_eq!(&out[..4], &[1, 2, 3, 4]);
    assert!(out[4..].chunks(4).all(|word| word == 0xAABB_CCDDu32.to_le_bytes()));

    // Submitted again after the first run has retired
    system.submit(cmd).unwrap();
    system.wait_idle().unwrap();
    assert_eq!(system.command_buffer(cmd).unwrap().submit_count(), 2);
}

#[test]
#[serial]
#[ignore]
fn test_clear_render_target_and_read_back() {
    let mut system = load_vulkan();
    let color = system
        .create_texture(
            &TextureDescriptor {
                format: Format::Rgba8Unorm,
                extent: Extent3D::new(4, 4, 1),
                mip_levels: 1,
                ..Default::default()
            },
            None,
        )
        .unwrap();
    let target = system
        .create_render_target(&RenderTargetDescriptor {
            resolution: Extent2D::new(4, 4),
            color_attachments: vec![AttachmentDescriptor::texture(color)],
            ..Default::default()
        })
        .unwrap();
    let readback = staging_buffer(system.as_mut(), 64, None);

    let cmd = system.create_command_buffer(&CommandBufferDescriptor::default()).unwrap();
    {
        let recorder = system.command_buffer_mut(cmd).unwrap();
        recorder.begin().unwrap();
        recorder.begin_render_pass(RenderTargetRef::RenderTarget(target), None, &[]).unwrap();
        let green = ClearValue { color: [0.0, 1.0, 0.0, 1.0], ..Default::default() };
        recorder.clear(ClearFlags::COLOR, green).unwrap();
        recorder.end_render_pass().unwrap();
        let region = TextureRegion::new(Offset3D::default(), Extent3D::new(4, 4, 1));
        recorder.copy_buffer_from_texture(readback, 0, color, &region, 0, 0).unwrap();
        recorder.end().unwrap();
    }
    system.submit(cmd).unwrap();

    let mapped = system.map_buffer(readback, CpuAccess::ReadOnly).unwrap();
    assert!(mapped.as_slice().chunks(4).all(|texel| texel == [0, 255, 0, 255]));
    drop(mapped);
    system.unmap_buffer(readback).unwrap();
}

#[test]
#[serial]
#[ignore]
fn test_timestamp_query_resolves() {
    let mut system = load_vulkan();
    let heap = system
        .create_query_heap(&QueryHeapDescriptor {
            debug_name: Some("timestamps".to_string()),
            query_type: QueryType::TimeElapsed,
            num_queries: 1,
        })
        .unwrap();
    let buffer = staging_buffer(system.as_mut(), 1024, None);

    let cmd = system.create_command_buffer(&CommandBufferDescriptor::default()).unwrap();
    {
        let recorder = system.command_buffer_mut(cmd).unwrap();
        recorder.begin().unwrap();
        recorder.begin_query(heap, 0).unwrap();
        recorder.fill_buffer(buffer, 0, 0, 1024).unwrap();
        recorder.end_query(heap, 0).unwrap();
        recorder.end().unwrap();
    }
    system.submit(cmd).unwrap();
    system.wait_idle().unwrap();

    let results = system.query_result(heap, 0, 1).unwrap();
    assert_eq!(results.map(|r| r.len()), Some(1));
    assert!(matches!(system.query_result(heap, 0, 2), Err(Error::InvalidArgument(_))));
}

#[test]
#[serial]
#[ignore]
fn test_released_resources_become_stale() {
    let mut system = load_vulkan();
    let sampler = system.create_sampler(&SamplerDescriptor::default()).unwrap();
    let buffer = staging_buffer(system.as_mut(), 16, None);

    assert!(system.release_sampler(sampler));
    assert!(!system.release_sampler(sampler));
    assert!(system.release_buffer(buffer));
    assert!(matches!(system.buffer_descriptor(buffer), Err(Error::InvalidResource(_))));
}

// ============================================================================
// SWAP CHAIN
// ============================================================================

#[test]
#[serial]
#[ignore]
fn test_swap_chain_clear_and_present() {
    let (window, _event_loop) = create_test_window();
    let surface: Arc<dyn Surface> = Arc::new(window);
    let mut system = load_vulkan();

    let swap_chain = system
        .create_swap_chain(&SwapChainDescriptor::default(), surface)
        .unwrap();
    {
        let chain = system.swap_chain(swap_chain).unwrap();
        assert!(chain.resolution().width > 0);
        assert!(chain.num_swap_buffers() >= 2);
    }

    let cmd = system.create_command_buffer(&CommandBufferDescriptor::default()).unwrap();
    {
        let recorder = system.command_buffer_mut(cmd).unwrap();
        recorder.begin().unwrap();
        recorder
            .begin_render_pass(RenderTargetRef::SwapChain(swap_chain), None, &[])
            .unwrap();
        recorder.clear(ClearFlags::ALL, ClearValue::default()).unwrap();
        recorder.end_render_pass().unwrap();
        recorder.end().unwrap();
    }
    system.submit(cmd).unwrap();

    let chain = system.swap_chain_mut(swap_chain).unwrap();
    assert!(chain.is_presentation_ready());
    chain.present().unwrap();

    system.wait_idle().unwrap();
    assert!(system.release_swap_chain(swap_chain));
}
