use super::*;
use lumen_rhi::lumen::render::{AttachmentFormatDescriptor, AttachmentStoreOp};

fn attachment(format: Format) -> FramebufferAttachment {
    FramebufferAttachment {
        image: vk::Image::null(),
        format,
        mip_level: 0,
        array_layer: 0,
        initial_layout: vk::ImageLayout::UNDEFINED,
        final_layout: attachment_layout(format),
    }
}

fn framebuffer(colors: &[Format], depth: Option<Format>) -> FramebufferBinding {
    FramebufferBinding {
        render_pass: vk::RenderPass::null(),
        framebuffer: vk::Framebuffer::null(),
        extent: vk::Extent2D { width: 64, height: 32 },
        samples: 1,
        colors: colors.iter().map(|f| attachment(*f)).collect(),
        depth_stencil: depth.map(attachment),
        resolves: Vec::new(),
    }
}

fn clear_op(format: Format) -> AttachmentFormatDescriptor {
    AttachmentFormatDescriptor::new(format, AttachmentLoadOp::Clear, AttachmentStoreOp::Store)
}

fn load_op(format: Format) -> AttachmentFormatDescriptor {
    AttachmentFormatDescriptor::new(format, AttachmentLoadOp::Load, AttachmentStoreOp::Store)
}

fn clear_color(value: &vk::ClearValue) -> [f32; 4] {
    unsafe { value.color.float32 }
}

#[test]
fn test_pass_formats_requires_color_formats() {
    let desc = RenderPassDescriptor {
        color_attachments: vec![load_op(Format::Rgba8Unorm), load_op(Format::Undefined)],
        ..Default::default()
    };
    assert!(pass_formats(&desc).is_err());
}

#[test]
fn test_pass_formats_takes_stencil_when_depth_missing() {
    let desc = RenderPassDescriptor {
        color_attachments: vec![load_op(Format::Rgba8Unorm)],
        stencil_attachment: Some(load_op(Format::D24UnormS8Uint)),
        ..Default::default()
    };
    let (colors, depth) = pass_formats(&desc).unwrap();
    assert_eq!(colors, vec![Format::Rgba8Unorm]);
    assert_eq!(depth, Some(Format::D24UnormS8Uint));
}

#[test]
fn test_color_clear_value_matches_format_kind() {
    let value = color_clear_value(Format::R32Sint, [-2.0, 1.0, 0.0, 0.0]);
    assert_eq!(unsafe { value.color.int32 }[0], -2);
    let value = color_clear_value(Format::R32Uint, [-2.0, 7.0, 0.0, 0.0]);
    assert_eq!(unsafe { value.color.uint32 }[..2], [0, 7]);
    let value = color_clear_value(Format::Rgba8Unorm, [0.25, 0.5, 0.75, 1.0]);
    assert_eq!(clear_color(&value), [0.25, 0.5, 0.75, 1.0]);
}

#[test]
fn test_clear_attachments_selects_color_and_aspects() {
    let fb = framebuffer(&[Format::Rgba8Unorm, Format::Rgba8Unorm], Some(Format::D32Float));
    let value = ClearValue::default();

    let clears = clear_attachments(&fb, ClearFlags::ALL, &value, None);
    assert_eq!(clears.len(), 3);
    // D32Float has no stencil aspect
    assert_eq!(clears[2].aspect_mask, vk::ImageAspectFlags::DEPTH);

    let clears = clear_attachments(&fb, ClearFlags::COLOR, &value, Some(1));
    assert_eq!(clears.len(), 1);
    assert_eq!(clears[0].color_attachment, 1);

    let clears = clear_attachments(&fb, ClearFlags::STENCIL, &value, None);
    assert!(clears.is_empty());
}

#[test]
fn test_load_op_clears_consume_values_in_order() {
    let fb = framebuffer(&[Format::Rgba8Unorm, Format::Rgba8Unorm, Format::Rgba8Unorm], Some(Format::D24UnormS8Uint));
    let pass = RenderPassDescriptor {
        color_attachments: vec![clear_op(Format::Rgba8Unorm), load_op(Format::Rgba8Unorm), clear_op(Format::Rgba8Unorm)],
        depth_attachment: Some(clear_op(Format::D24UnormS8Uint)),
        stencil_attachment: Some(clear_op(Format::D24UnormS8Uint)),
        ..Default::default()
    };
    let red = ClearValue { color: [1.0, 0.0, 0.0, 1.0], ..Default::default() };
    let green = ClearValue { color: [0.0, 1.0, 0.0, 1.0], ..Default::default() };
    let depth = ClearValue { depth: 0.5, stencil: 3, ..Default::default() };

    let clears = load_op_clears(&fb, &pass, &[red, green, depth]);
    assert_eq!(clears.len(), 3);
    assert_eq!(clears[0].color_attachment, 0);
    assert_eq!(clear_color(&clears[0].clear_value), red.color);
    assert_eq!(clears[1].color_attachment, 2);
    assert_eq!(clear_color(&clears[1].clear_value), green.color);
    assert_eq!(clears[2].aspect_mask, vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL);
    let depth_stencil = unsafe { clears[2].clear_value.depth_stencil };
    assert_eq!((depth_stencil.depth, depth_stencil.stencil), (0.5, 3));
}

#[test]
fn test_load_op_clears_fall_back_to_default_value() {
    let fb = framebuffer(&[Format::Rgba8Unorm], Some(Format::D32Float));
    let pass = RenderPassDescriptor {
        color_attachments: vec![clear_op(Format::Rgba8Unorm)],
        depth_attachment: Some(clear_op(Format::D32Float)),
        ..Default::default()
    };
    let clears = load_op_clears(&fb, &pass, &[]);
    assert_eq!(clears.len(), 2);
    assert_eq!(clear_color(&clears[0].clear_value), ClearValue::default().color);
    assert_eq!(unsafe { clears[1].clear_value.depth_stencil }.depth, 1.0);
}
