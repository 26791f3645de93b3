//! Unit tests for command_buffer.rs

use crate::error::Error;
use crate::format::Format;
use crate::render::command_buffer::*;
use crate::render::handle::HwObjectContainer;
use crate::render::*;

fn recording() -> CommandBuffer {
    let mut cmd = CommandBuffer::new(&CommandBufferDescriptor::default());
    cmd.begin().unwrap();
    cmd
}

fn buffers(n: usize) -> Vec<BufferHandle> {
    let mut container: HwObjectContainer<BufferHandle, ()> = HwObjectContainer::new("buffer");
    (0..n).map(|_| container.insert(())).collect()
}

fn swap_chain_target() -> RenderTargetRef {
    RenderTargetRef::SwapChain(SwapChainHandle::default())
}

fn is_invalid_state<T: std::fmt::Debug>(result: crate::error::Result<T>) -> bool {
    matches!(result, Err(Error::InvalidState(_)))
}

// ============================================================================
// RECORDING SCOPE
// ============================================================================

#[test]
fn test_new_buffer_is_initial() {
    let cmd = CommandBuffer::new(&CommandBufferDescriptor::default());
    assert_eq!(cmd.state(), RecordingState::Initial);
    assert!(cmd.commands().is_empty());
}

#[test]
fn test_commands_outside_begin_end_fail() {
    let mut cmd = CommandBuffer::new(&CommandBufferDescriptor::default());
    assert!(is_invalid_state(cmd.set_viewport(Viewport::new(0.0, 0.0, 8.0, 8.0))));
    assert!(is_invalid_state(cmd.end()));
}

#[test]
fn test_begin_twice_fails() {
    let mut cmd = recording();
    assert!(is_invalid_state(cmd.begin()));
}

#[test]
fn test_begin_discards_previous_recording() {
    let mut cmd = recording();
    cmd.set_stencil_reference(1).unwrap();
    cmd.end().unwrap();
    assert_eq!(cmd.commands().len(), 1);

    cmd.begin().unwrap();
    assert!(cmd.commands().is_empty());
}

#[test]
fn test_end_inside_render_pass_fails() {
    let mut cmd = recording();
    cmd.begin_render_pass(swap_chain_target(), None, &[]).unwrap();
    assert!(is_invalid_state(cmd.end()));
    cmd.end_render_pass().unwrap();
    cmd.end().unwrap();
    assert_eq!(cmd.state(), RecordingState::Executable);
}

#[test]
fn test_end_with_open_debug_group_fails() {
    let mut cmd = recording();
    cmd.push_debug_group("frame").unwrap();
    assert!(is_invalid_state(cmd.end()));
    cmd.pop_debug_group().unwrap();
    cmd.end().unwrap();
}

#[test]
fn test_pop_debug_group_without_push_fails() {
    let mut cmd = recording();
    assert!(is_invalid_state(cmd.pop_debug_group()));
}

#[test]
fn test_one_time_buffer_resets_after_submit() {
    let desc = CommandBufferDescriptor { debug_name: None, flags: CommandBufferFlags::empty() };
    let mut cmd = CommandBuffer::new(&desc);
    cmd.begin().unwrap();
    cmd.set_stencil_reference(3).unwrap();
    cmd.end().unwrap();

    cmd.mark_submitted().unwrap();
    assert_eq!(cmd.state(), RecordingState::Initial);
    assert!(is_invalid_state(cmd.mark_submitted()));
}

#[test]
fn test_multi_submit_buffer_stays_executable() {
    let mut cmd = recording();
    cmd.end().unwrap();
    cmd.mark_submitted().unwrap();
    cmd.mark_submitted().unwrap();
    assert_eq!(cmd.state(), RecordingState::Executable);
    assert_eq!(cmd.submit_count(), 2);
}

// ============================================================================
// RENDER PASS SCOPE
// ============================================================================

#[test]
fn test_nested_render_pass_fails() {
    let mut cmd = recording();
    cmd.begin_render_pass(swap_chain_target(), None, &[]).unwrap();
    assert!(is_invalid_state(cmd.begin_render_pass(swap_chain_target(), None, &[])));
}

#[test]
fn test_end_render_pass_without_begin_fails() {
    let mut cmd = recording();
    assert!(is_invalid_state(cmd.end_render_pass()));
}

#[test]
fn test_copies_inside_render_pass_fail() {
    let b = buffers(2);
    let mut cmd = recording();
    cmd.begin_render_pass(swap_chain_target(), None, &[]).unwrap();
    assert!(is_invalid_state(cmd.copy_buffer(b[0], 0, b[1], 0, 16)));
    assert!(is_invalid_state(cmd.fill_buffer(b[0], 0, 0, WHOLE_SIZE)));
    assert!(is_invalid_state(cmd.update_buffer(b[0], 0, &[0; 4])));
    assert!(is_invalid_state(cmd.generate_mips(TextureHandle::default())));
}

#[test]
fn test_clear_outside_render_pass_fails() {
    let mut cmd = recording();
    assert!(is_invalid_state(cmd.clear(ClearFlags::COLOR, ClearValue::default())));
}

#[test]
fn test_current_render_target_tracks_pass() {
    let mut cmd = recording();
    assert_eq!(cmd.current_render_target(), None);
    cmd.begin_render_pass(swap_chain_target(), None, &[]).unwrap();
    assert_eq!(cmd.current_render_target(), Some(swap_chain_target()));
    assert!(cmd.is_inside_render_pass());
    cmd.end_render_pass().unwrap();
    assert!(!cmd.is_inside_render_pass());
}

// ============================================================================
// DRAW AND DISPATCH
// ============================================================================

#[test]
fn test_draw_requires_pipeline() {
    let mut cmd = recording();
    cmd.begin_render_pass(swap_chain_target(), None, &[]).unwrap();
    assert!(is_invalid_state(cmd.draw(3, 0)));
    cmd.set_pipeline_state(PipelineStateHandle::default()).unwrap();
    cmd.draw(3, 0).unwrap();
}

#[test]
fn test_draw_indexed_requires_index_buffer() {
    let b = buffers(1);
    let mut cmd = recording();
    cmd.set_pipeline_state(PipelineStateHandle::default()).unwrap();
    cmd.begin_render_pass(swap_chain_target(), None, &[]).unwrap();
    assert!(is_invalid_state(cmd.draw_indexed(6, 0)));
    cmd.set_index_buffer(b[0], Format::R16Uint, 0).unwrap();
    cmd.draw_indexed(6, 0).unwrap();
}

#[test]
fn test_set_index_buffer_rejects_non_index_format() {
    let b = buffers(1);
    let mut cmd = recording();
    assert!(matches!(
        cmd.set_index_buffer(b[0], Format::Rgba8Unorm, 0),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn test_dispatch_outside_pass_with_pipeline() {
    let mut cmd = recording();
    assert!(is_invalid_state(cmd.dispatch(1, 1, 1)));
    cmd.set_pipeline_state(PipelineStateHandle::default()).unwrap();
    cmd.dispatch(4, 4, 1).unwrap();
    assert!(matches!(cmd.dispatch(0, 1, 1), Err(Error::InvalidArgument(_))));

    cmd.begin_render_pass(swap_chain_target(), None, &[]).unwrap();
    assert!(is_invalid_state(cmd.dispatch(1, 1, 1)));
}

// ============================================================================
// ARGUMENT CHECKS
// ============================================================================

#[test]
fn test_update_buffer_limits() {
    let b = buffers(1);
    let mut cmd = recording();
    assert!(cmd.update_buffer(b[0], 0, &[0; 3]).is_err());
    assert!(cmd.update_buffer(b[0], 2, &[0; 4]).is_err());
    assert!(cmd.update_buffer(b[0], 0, &vec![0; MAX_UPDATE_BUFFER_SIZE + 4]).is_err());
    cmd.update_buffer(b[0], 4, &[1, 2, 3, 4]).unwrap();
}

#[test]
fn test_fill_buffer_alignment() {
    let b = buffers(1);
    let mut cmd = recording();
    assert!(cmd.fill_buffer(b[0], 2, 0, 8).is_err());
    assert!(cmd.fill_buffer(b[0], 0, 0, 6).is_err());
    cmd.fill_buffer(b[0], 0, 0xDEAD_BEEF, WHOLE_SIZE).unwrap();
    cmd.fill_buffer(b[0], 4, 0, 12).unwrap();
}

#[test]
fn test_copy_buffer_overlap_in_same_buffer_fails() {
    let b = buffers(2);
    let mut cmd = recording();
    assert!(cmd.copy_buffer(b[0], 8, b[0], 0, 16).is_err());
    cmd.copy_buffer(b[0], 16, b[0], 0, 16).unwrap();
    cmd.copy_buffer(b[1], 0, b[0], 0, 16).unwrap();
}

#[test]
fn test_texture_region_must_address_one_mip() {
    let b = buffers(1);
    let mut cmd = recording();
    let mut region = TextureRegion::new(Offset3D::default(), Extent3D::new(4, 4, 1));
    region.subresource.num_mip_levels = 2;
    assert!(cmd.copy_texture_from_buffer(TextureHandle::default(), &region, b[0], 0, 0, 0).is_err());
}

#[test]
fn test_set_uniforms_requires_word_multiple() {
    let mut cmd = recording();
    assert!(cmd.set_uniforms(0, &[0; 6]).is_err());
    cmd.set_uniforms(0, &[0; 16]).unwrap();
}

#[test]
fn test_query_begin_end_pairing() {
    let mut cmd = recording();
    let heap = QueryHeapHandle::default();
    assert!(is_invalid_state(cmd.end_query(heap, 0)));
    cmd.begin_query(heap, 0).unwrap();
    assert!(is_invalid_state(cmd.begin_query(heap, 0)));
    assert!(is_invalid_state(cmd.end()));
    cmd.end_query(heap, 0).unwrap();
    cmd.end().unwrap();
}

// ============================================================================
// RECORDED STREAM
// ============================================================================

#[test]
fn test_recorded_command_names_in_order() {
    let b = buffers(2);
    let mut cmd = recording();
    cmd.fill_buffer(b[0], 0, 7, WHOLE_SIZE).unwrap();
    cmd.set_pipeline_state(PipelineStateHandle::default()).unwrap();
    cmd.set_vertex_buffer(b[1]).unwrap();
    cmd.begin_render_pass(swap_chain_target(), None, &[ClearValue::default()]).unwrap();
    cmd.clear(ClearFlags::COLOR_DEPTH, ClearValue::default()).unwrap();
    cmd.draw(3, 0).unwrap();
    cmd.end_render_pass().unwrap();
    cmd.end().unwrap();

    let names: Vec<&str> = cmd.commands().iter().map(Command::name).collect();
    assert_eq!(
        names,
        vec![
            "fill_buffer",
            "set_pipeline_state",
            "set_vertex_buffer",
            "begin_render_pass",
            "clear",
            "draw",
            "end_render_pass",
        ]
    );
}

#[test]
fn test_referenced_buffers_are_deduplicated() {
    let b = buffers(3);
    let mut cmd = recording();
    cmd.fill_buffer(b[0], 0, 0, WHOLE_SIZE).unwrap();
    cmd.copy_buffer(b[1], 0, b[0], 0, 4).unwrap();
    cmd.set_vertex_buffer(b[1]).unwrap();

    let referenced = cmd.referenced_buffers();
    assert_eq!(referenced.buffers.len(), 2);
    assert!(referenced.buffers.contains(&b[0]));
    assert!(referenced.buffers.contains(&b[1]));
    assert!(!referenced.buffers.contains(&b[2]));
    assert!(referenced.buffer_arrays.is_empty());
    assert!(referenced.resource_heaps.is_empty());
}

#[test]
fn test_referenced_buffers_include_arrays_and_heaps() {
    let mut arrays: HwObjectContainer<BufferArrayHandle, ()> = HwObjectContainer::new("buffer array");
    let mut heaps: HwObjectContainer<ResourceHeapHandle, ()> = HwObjectContainer::new("resource heap");
    let array = arrays.insert(());
    let heap = heaps.insert(());
    let b = buffers(3);

    let mut cmd = recording();
    cmd.set_vertex_buffer_array(array).unwrap();
    cmd.set_resource_heap(heap, 0).unwrap();
    cmd.set_resource_heap(heap, 1).unwrap();
    cmd.update_buffer(b[2], 0, &[1, 2, 3, 4]).unwrap();

    let referenced = cmd.referenced_buffers();
    assert_eq!(referenced.buffer_arrays.len(), 1);
    assert!(referenced.buffer_arrays.contains(&array));
    assert_eq!(referenced.resource_heaps.len(), 1);
    assert!(referenced.resource_heaps.contains(&heap));

    let expanded = referenced
        .expand(|_| Ok(vec![b[0], b[2]]), |_| Ok(vec![b[1]]))
        .unwrap();
    assert_eq!(expanded.len(), 3);
    assert!(b.iter().all(|buffer| expanded.contains(buffer)));
}

#[test]
fn test_expand_propagates_stale_handles() {
    let mut heaps: HwObjectContainer<ResourceHeapHandle, ()> = HwObjectContainer::new("resource heap");
    let heap = heaps.insert(());
    let mut cmd = recording();
    cmd.set_resource_heap(heap, 0).unwrap();

    let result = cmd.referenced_buffers().expand(
        |_| Ok(Vec::new()),
        |heap| Err(Error::InvalidResource(format!("{:?}", heap))),
    );
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}
