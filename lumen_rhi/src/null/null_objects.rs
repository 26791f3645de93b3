/// CPU-side objects of the Null backend
///
/// Textures keep one byte vector per MIP level covering all array layers,
/// laid out like the layer-folded extent from `mip_extent_for`
/// (x fastest, then y, then z). Block compressed formats are stored per
/// block.

use crate::error::Result;
use crate::format::{fold_texture_region, is_multi_sample_texture, mip_extent_for, Format, FormatFlags};
use crate::render::*;

use super::null_swap_chain::NullSwapChain;

const SOURCE: &str = "lumen::null";

// ===== BUFFERS =====

/// Active CPU mapping of a buffer range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferMapping {
    pub access: CpuAccess,
    pub offset: u64,
    pub size: u64,
}

pub struct NullBuffer {
    pub desc: BufferDescriptor,
    pub data: Vec<u8>,
    pub mapping: Option<BufferMapping>,
}

impl NullBuffer {
    pub fn new(desc: &BufferDescriptor, initial_data: Option<&[u8]>) -> Self {
        let mut data = vec![0u8; desc.size as usize];
        if let Some(initial) = initial_data {
            data[..initial.len()].copy_from_slice(initial);
        }
        Self {
            desc: desc.clone(),
            data,
            mapping: None,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Byte range `[offset, offset + size)`, `size` may be `WHOLE_SIZE`
    pub fn range(&self, offset: u64, size: u64) -> Result<std::ops::Range<usize>> {
        let size = resolve_buffer_range(self.size(), offset, size)?;
        Ok(offset as usize..(offset + size) as usize)
    }

    pub fn is_mapped(&self) -> bool {
        self.mapping.is_some()
    }

    pub fn check_not_mapped(&self, what: &str) -> Result<()> {
        if self.is_mapped() {
            return Err(crate::lumen::Error::InvalidState(format!(
                "{} on a mapped buffer; call unmap_buffer first",
                what
            )));
        }
        Ok(())
    }
}

pub struct NullBufferArray {
    pub debug_name: Option<String>,
    pub buffers: Vec<BufferHandle>,
}

// ===== TEXTURES =====

/// Storage unit of a format: one texel, or one block for compressed formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TexelUnit {
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
}

impl TexelUnit {
    pub fn of(format: Format) -> Self {
        let attribs = format.attributes();
        if attribs.flags.contains(FormatFlags::COMPRESSED) {
            Self {
                width: attribs.block_width,
                height: attribs.block_height,
                bytes: (attribs.bit_size / 8) as usize,
            }
        } else {
            Self {
                width: 1,
                height: 1,
                bytes: (attribs.bit_size / 8) as usize,
            }
        }
    }

    fn units(&self, extent: Extent3D) -> Extent3D {
        Extent3D::new(
            extent.width.div_ceil(self.width),
            extent.height.div_ceil(self.height),
            extent.depth,
        )
    }
}

/// Texel box of one MIP level, in storage units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitBox {
    pub level: usize,
    pub offset: [usize; 3],
    pub extent: [usize; 3],
}

impl UnitBox {
    pub fn volume(&self) -> usize {
        self.extent[0] * self.extent[1] * self.extent[2]
    }
}

pub struct NullTexture {
    pub desc: TextureDescriptor,
    unit: TexelUnit,
    mips: Vec<Vec<u8>>,
}

impl NullTexture {
    /// Allocate zeroed storage for a normalized descriptor
    pub fn new(desc: &TextureDescriptor) -> Self {
        let unit = TexelUnit::of(desc.format);
        let mips = (0..desc.mip_levels.max(1))
            .map(|level| {
                let units = unit.units(mip_extent_for(desc, level));
                vec![0u8; units.volume() as usize * unit.bytes]
            })
            .collect();
        Self {
            desc: desc.clone(),
            unit,
            mips,
        }
    }

    pub fn unit(&self) -> TexelUnit {
        self.unit
    }

    pub fn num_mip_levels(&self) -> u32 {
        self.mips.len() as u32
    }

    pub fn mip_data(&self, level: u32) -> Option<&[u8]> {
        self.mips.get(level as usize).map(|m| m.as_slice())
    }

    /// Layer-folded extent of a MIP level in storage units
    fn level_units(&self, level: usize) -> [usize; 3] {
        let e = self.unit.units(mip_extent_for(&self.desc, level as u32));
        [e.width as usize, e.height as usize, e.depth as usize]
    }

    fn num_layers(&self) -> u32 {
        match self.desc.texture_type {
            TextureType::TextureCube => 6,
            TextureType::TextureCubeArray => self.desc.array_layers.div_ceil(6) * 6,
            _ => self.desc.array_layers,
        }
    }

    /// Resolve a region of a single MIP level into a unit box
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the region leaves the texture, spans several MIP
    /// levels or is not aligned to the compression block size
    pub fn unit_box(&self, region: &TextureRegion) -> Result<UnitBox> {
        let sub = &region.subresource;
        if sub.num_mip_levels != 1 || sub.base_mip_level >= self.num_mip_levels() {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "MIP level {} (count {}) is not a single level of a {}-level texture",
                sub.base_mip_level, sub.num_mip_levels, self.num_mip_levels()
            ));
        }
        if sub.num_array_layers == 0 || sub.base_array_layer.saturating_add(sub.num_array_layers) > self.num_layers() {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "array layers [{}, +{}) exceed {} layers",
                sub.base_array_layer, sub.num_array_layers, self.num_layers()
            ));
        }

        let level = sub.base_mip_level as usize;
        let image = mip_extent_for(&self.desc, sub.base_mip_level);
        let (offset, extent) = fold_texture_region(self.desc.texture_type, region);
        if offset.x < 0 || offset.y < 0 || offset.z < 0 || extent.is_zero() {
            return Err(crate::lumen_invalid!(SOURCE, "texture region is empty or has a negative offset"));
        }
        let (ox, oy, oz) = (offset.x as u32, offset.y as u32, offset.z as u32);
        let fits = ox.checked_add(extent.width).is_some_and(|x| x <= image.width)
            && oy.checked_add(extent.height).is_some_and(|y| y <= image.height)
            && oz.checked_add(extent.depth).is_some_and(|z| z <= image.depth);
        if !fits {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "texture region {:?}+{:?} exceeds MIP {} extent {}x{}x{}",
                offset, extent, level, image.width, image.height, image.depth
            ));
        }

        let (bw, bh) = (self.unit.width, self.unit.height);
        let aligned = ox % bw == 0
            && oy % bh == 0
            && (extent.width % bw == 0 || ox + extent.width == image.width)
            && (extent.height % bh == 0 || oy + extent.height == image.height);
        if !aligned {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "texture region is not aligned to the {}x{} block size of {:?}",
                bw, bh, self.desc.format
            ));
        }

        Ok(UnitBox {
            level,
            offset: [(ox / bw) as usize, (oy / bh) as usize, oz as usize],
            extent: [
                extent.width.div_ceil(bw) as usize,
                extent.height.div_ceil(bh) as usize,
                extent.depth as usize,
            ],
        })
    }

    /// Bytes of a region packed with the given strides (0 = tight)
    pub fn strided_size(&self, region: &TextureRegion, row_stride: u32, layer_stride: u32) -> Result<u64> {
        let b = self.unit_box(region)?;
        let (row_bytes, row_stride, layer_stride) = self.strides(&b, row_stride, layer_stride)?;
        Ok(((b.extent[2] - 1) * layer_stride + (b.extent[1] - 1) * row_stride + row_bytes) as u64)
    }

    fn strides(&self, b: &UnitBox, row_stride: u32, layer_stride: u32) -> Result<(usize, usize, usize)> {
        let row_bytes = b.extent[0] * self.unit.bytes;
        let row_stride = if row_stride == 0 { row_bytes } else { row_stride as usize };
        let layer_stride = if layer_stride == 0 { row_stride * b.extent[1] } else { layer_stride as usize };
        if row_stride < row_bytes || layer_stride < row_stride * b.extent[1] {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "row stride {} / layer stride {} too small for {} bytes per row",
                row_stride, layer_stride, row_bytes
            ));
        }
        Ok((row_bytes, row_stride, layer_stride))
    }

    fn row_start(&self, b: &UnitBox, y: usize, z: usize) -> usize {
        let [w, h, _] = self.level_units(b.level);
        (((b.offset[2] + z) * h + b.offset[1] + y) * w + b.offset[0]) * self.unit.bytes
    }

    /// Copy a region into `dst` with the given strides
    pub fn read_region(&self, region: &TextureRegion, dst: &mut [u8], row_stride: u32, layer_stride: u32) -> Result<()> {
        let b = self.unit_box(region)?;
        let (row_bytes, row_stride, layer_stride) = self.strides(&b, row_stride, layer_stride)?;
        let needed = (b.extent[2] - 1) * layer_stride + (b.extent[1] - 1) * row_stride + row_bytes;
        if dst.len() < needed {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "destination holds {} bytes but the region needs {}",
                dst.len(), needed
            ));
        }
        let mip = &self.mips[b.level];
        for z in 0..b.extent[2] {
            for y in 0..b.extent[1] {
                let src = self.row_start(&b, y, z);
                let d = z * layer_stride + y * row_stride;
                dst[d..d + row_bytes].copy_from_slice(&mip[src..src + row_bytes]);
            }
        }
        Ok(())
    }

    /// Tightly packed copy of a region
    pub fn read_region_packed(&self, region: &TextureRegion) -> Result<Vec<u8>> {
        let b = self.unit_box(region)?;
        let mut data = vec![0u8; b.volume() * self.unit.bytes];
        self.read_region(region, &mut data, 0, 0)?;
        Ok(data)
    }

    /// Write a region from `src` laid out with the given strides
    pub fn write_region(&mut self, region: &TextureRegion, src: &[u8], row_stride: u32, layer_stride: u32) -> Result<()> {
        let b = self.unit_box(region)?;
        let (row_bytes, row_stride, layer_stride) = self.strides(&b, row_stride, layer_stride)?;
        let needed = (b.extent[2] - 1) * layer_stride + (b.extent[1] - 1) * row_stride + row_bytes;
        if src.len() < needed {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "source holds {} bytes but the region needs {}",
                src.len(), needed
            ));
        }
        for z in 0..b.extent[2] {
            for y in 0..b.extent[1] {
                let dst = self.row_start(&b, y, z);
                let s = z * layer_stride + y * row_stride;
                self.mips[b.level][dst..dst + row_bytes].copy_from_slice(&src[s..s + row_bytes]);
            }
        }
        Ok(())
    }

    /// Region covering one array layer of a MIP level
    pub fn layer_region(&self, mip_level: u32, array_layer: u32) -> TextureRegion {
        let extent = mip_extent_for(&self.desc, mip_level);
        let extent = match self.desc.texture_type {
            TextureType::Texture1DArray => Extent3D::new(extent.width, 1, 1),
            TextureType::Texture3D => extent,
            _ => Extent3D::new(extent.width, extent.height, 1),
        };
        TextureRegion {
            subresource: TextureSubresource::single(array_layer, mip_level),
            offset: Offset3D::default(),
            extent,
        }
    }

    /// Region covering every array layer of a MIP level
    pub fn mip_region(&self, mip_level: u32) -> TextureRegion {
        let mut region = self.layer_region(mip_level, 0);
        region.subresource.num_array_layers = self.num_layers();
        region
    }

    /// Fill one layer of a MIP level with an encoded clear value
    pub fn clear_layer(&mut self, mip_level: u32, array_layer: u32, value: &ClearValue, flags: ClearFlags) -> Result<()> {
        let region = self.layer_region(mip_level, array_layer);
        let old = self.read_region_packed(&region)?;
        let encoded = encode_clear_value(self.desc.format, value, &old[..self.unit.bytes.min(old.len())]);
        let mut data = Vec::with_capacity(old.len());
        for texel in old.chunks(self.unit.bytes.max(1)) {
            // Untouched aspects keep their value, e.g. stencil on a depth-only clear
            data.extend_from_slice(&merge_aspects(self.desc.format, texel, &encoded, flags));
        }
        self.write_region(&region, &data, 0, 0)
    }

    /// Resolve the subresource a MIP generation touches
    ///
    /// `None` means there is nothing to generate (single level or
    /// multisample texture).
    pub fn mip_generation_range(&self, subresource: Option<TextureSubresource>) -> Result<Option<TextureSubresource>> {
        if is_multi_sample_texture(self.desc.texture_type) || self.num_mip_levels() < 2 {
            return Ok(None);
        }
        if self.desc.format.is_compressed() {
            return Err(crate::lumen_invalid!(
                SOURCE,
                "cannot generate MIP levels for compressed format {:?}",
                self.desc.format
            ));
        }
        let sub = subresource.unwrap_or(TextureSubresource::new(0, self.num_layers(), 0, self.num_mip_levels()));
        let last = sub.base_mip_level.saturating_add(sub.num_mip_levels);
        if last > self.num_mip_levels() || sub.base_array_layer.saturating_add(sub.num_array_layers) > self.num_layers() {
            return Err(crate::lumen_invalid!(SOURCE, "MIP generation range {:?} exceeds the texture", sub));
        }
        Ok(Some(sub))
    }

    /// Regenerate MIP levels from their predecessor
    ///
    /// Formats with 8-bit normalized channels are box filtered; everything
    /// else is point sampled.
    pub fn generate_mips(&mut self, subresource: Option<TextureSubresource>) -> Result<()> {
        let Some(sub) = self.mip_generation_range(subresource)? else {
            return Ok(());
        };
        let last = sub.base_mip_level + sub.num_mip_levels;

        let box_filter = matches!(
            self.desc.format,
            Format::R8Unorm
                | Format::Rg8Unorm
                | Format::Rgba8Unorm
                | Format::Rgba8UnormSrgb
                | Format::Bgra8Unorm
                | Format::Bgra8UnormSrgb
        );
        let scales = match self.desc.texture_type {
            TextureType::Texture1D | TextureType::Texture1DArray => [true, false, false],
            TextureType::Texture3D => [true, true, true],
            _ => [true, true, false],
        };
        let layer_axis = match self.desc.texture_type {
            TextureType::Texture1DArray => Some(1),
            TextureType::Texture3D | TextureType::Texture1D | TextureType::Texture2D => None,
            _ => Some(2),
        };
        let bytes = self.unit.bytes;

        for level in (sub.base_mip_level + 1)..last {
            let src_dims = self.level_units(level as usize - 1);
            let dst_dims = self.level_units(level as usize);
            let (before, after) = self.mips.split_at_mut(level as usize);
            let src = &before[level as usize - 1];
            let dst = &mut after[0];

            for z in 0..dst_dims[2] {
                for y in 0..dst_dims[1] {
                    for x in 0..dst_dims[0] {
                        let coord = [x, y, z];
                        if let Some(axis) = layer_axis {
                            let layer = coord[axis] as u32;
                            if layer < sub.base_array_layer || layer >= sub.base_array_layer + sub.num_array_layers {
                                continue;
                            }
                        }
                        let d = ((z * dst_dims[1] + y) * dst_dims[0] + x) * bytes;
                        let taps = source_taps(coord, src_dims, scales, box_filter);
                        for byte in 0..bytes {
                            let sum: u32 = taps
                                .iter()
                                .map(|t| src[((t[2] * src_dims[1] + t[1]) * src_dims[0] + t[0]) * bytes + byte] as u32)
                                .sum();
                            dst[d + byte] = if box_filter {
                                ((sum + taps.len() as u32 / 2) / taps.len() as u32) as u8
                            } else {
                                sum as u8
                            };
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn source_taps(coord: [usize; 3], src_dims: [usize; 3], scales: [bool; 3], box_filter: bool) -> Vec<[usize; 3]> {
    let mut taps = vec![[0usize; 3]];
    for axis in 0..3 {
        let base = if scales[axis] { (coord[axis] * 2).min(src_dims[axis] - 1) } else { coord[axis] };
        for tap in taps.iter_mut() {
            tap[axis] = base;
        }
        if box_filter && scales[axis] && base + 1 < src_dims[axis] {
            let extra: Vec<[usize; 3]> = taps
                .iter()
                .map(|t| {
                    let mut t = *t;
                    t[axis] = base + 1;
                    t
                })
                .collect();
            taps.extend(extra);
        }
    }
    taps
}

fn unorm8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

/// Encode a clear value as one storage unit of `format`
///
/// `fallback` supplies bytes for formats without a CPU encoding.
pub fn encode_clear_value(format: Format, value: &ClearValue, fallback: &[u8]) -> Vec<u8> {
    let [r, g, b, a] = value.color;
    match format {
        Format::R8Unorm => vec![unorm8(r)],
        Format::Rg8Unorm => vec![unorm8(r), unorm8(g)],
        Format::Rgba8Unorm | Format::Rgba8UnormSrgb => vec![unorm8(r), unorm8(g), unorm8(b), unorm8(a)],
        Format::Bgra8Unorm | Format::Bgra8UnormSrgb => vec![unorm8(b), unorm8(g), unorm8(r), unorm8(a)],
        Format::R8Uint => vec![r as u8],
        Format::Rgba8Uint => vec![r as u8, g as u8, b as u8, a as u8],
        Format::R16Uint => (r as u16).to_le_bytes().to_vec(),
        Format::R32Uint => (r as u32).to_le_bytes().to_vec(),
        Format::R32Sint => (r as i32).to_le_bytes().to_vec(),
        Format::R32Float => r.to_le_bytes().to_vec(),
        Format::Rg32Float => [r, g].iter().flat_map(|c| c.to_le_bytes()).collect(),
        Format::Rgb32Float => [r, g, b].iter().flat_map(|c| c.to_le_bytes()).collect(),
        Format::Rgba32Float => [r, g, b, a].iter().flat_map(|c| c.to_le_bytes()).collect(),
        Format::Rgba32Uint => [r, g, b, a].iter().flat_map(|c| (*c as u32).to_le_bytes()).collect(),
        Format::D16Unorm => ((value.depth.clamp(0.0, 1.0) * 65535.0 + 0.5) as u16).to_le_bytes().to_vec(),
        Format::D24UnormS8Uint => {
            // f32 rounds 2^24 - 0.5 up to 2^24, which would spill into the stencil byte
            let depth = ((f64::from(value.depth.clamp(0.0, 1.0)) * 16_777_215.0 + 0.5) as u32).min(0x00FF_FFFF);
            (depth | ((value.stencil & 0xFF) << 24)).to_le_bytes().to_vec()
        }
        Format::D32Float => value.depth.to_le_bytes().to_vec(),
        Format::D32FloatS8X24Uint => {
            let mut bytes = value.depth.to_le_bytes().to_vec();
            bytes.extend_from_slice(&(value.stencil & 0xFF).to_le_bytes());
            bytes
        }
        _ => fallback.to_vec(),
    }
}

/// Merge a cleared texel into an existing one, honoring depth/stencil flags
fn merge_aspects(format: Format, old: &[u8], cleared: &[u8], flags: ClearFlags) -> Vec<u8> {
    if cleared.len() != old.len() {
        return old.to_vec();
    }
    match format {
        Format::D24UnormS8Uint => {
            let mut texel = old.to_vec();
            if flags.contains(ClearFlags::DEPTH) {
                texel[..3].copy_from_slice(&cleared[..3]);
            }
            if flags.contains(ClearFlags::STENCIL) {
                texel[3] = cleared[3];
            }
            texel
        }
        Format::D32FloatS8X24Uint => {
            let mut texel = old.to_vec();
            if flags.contains(ClearFlags::DEPTH) {
                texel[..4].copy_from_slice(&cleared[..4]);
            }
            if flags.contains(ClearFlags::STENCIL) {
                texel[4..].copy_from_slice(&cleared[4..]);
            }
            texel
        }
        f if f.is_depth() && !flags.contains(ClearFlags::DEPTH) => old.to_vec(),
        f if f.is_color() && !flags.contains(ClearFlags::COLOR) => old.to_vec(),
        _ => cleared.to_vec(),
    }
}

// ===== SHADERS AND PIPELINES =====

pub struct NullSampler {
    pub desc: SamplerDescriptor,
}

pub struct NullShader {
    pub desc: ShaderDescriptor,
    pub report: Report,
}

pub struct NullPipelineLayout {
    pub desc: PipelineLayoutDescriptor,
}

/// Pipeline cache blob: magic followed by the number of cached pipelines
pub struct NullPipelineCache {
    pub debug_name: Option<String>,
    pub num_pipelines: u32,
}

pub const PIPELINE_CACHE_MAGIC: &[u8; 4] = b"LNPC";

impl NullPipelineCache {
    /// Load a blob; anything that is not a valid blob starts an empty cache
    pub fn from_blob(blob: &[u8]) -> Self {
        let num_pipelines = match blob {
            [m0, m1, m2, m3, c0, c1, c2, c3] if [*m0, *m1, *m2, *m3] == *PIPELINE_CACHE_MAGIC => {
                u32::from_le_bytes([*c0, *c1, *c2, *c3])
            }
            _ => 0,
        };
        Self { debug_name: None, num_pipelines }
    }

    pub fn blob(&self) -> Vec<u8> {
        let mut blob = PIPELINE_CACHE_MAGIC.to_vec();
        blob.extend_from_slice(&self.num_pipelines.to_le_bytes());
        blob
    }
}

pub struct NullPipelineState {
    pub debug_name: Option<String>,
    pub kind: PipelineKind,
    pub layout: Option<PipelineLayoutHandle>,
    pub samples: u32,
    pub report: Report,
}

// ===== RENDER PASSES, TARGETS, HEAPS, QUERIES =====

pub struct NullRenderPass {
    pub desc: RenderPassDescriptor,
}

/// Render target attachment storage
pub enum NullAttachment {
    /// View of a texture owned by the render system
    Texture { handle: TextureHandle, mip_level: u32, array_layer: u32 },
    /// Buffer owned by the render target itself
    Internal(NullTexture),
}

pub struct NullRenderTarget {
    pub desc: RenderTargetDescriptor,
    pub color: Vec<NullAttachment>,
    pub depth_stencil: Option<NullAttachment>,
}

pub struct NullResourceHeap {
    pub debug_name: Option<String>,
    pub layout: PipelineLayoutHandle,
    pub bindings_per_set: u32,
    pub views: Vec<Option<ResourceViewDescriptor>>,
}

impl NullResourceHeap {
    pub fn num_sets(&self) -> u32 {
        self.views.len() as u32 / self.bindings_per_set.max(1)
    }

    /// Buffers currently written into any heap slot
    pub fn buffer_views(&self) -> Vec<BufferHandle> {
        self.views
            .iter()
            .filter_map(|view| match view {
                Some(ResourceViewDescriptor::Buffer(buffer)) => Some(*buffer),
                _ => None,
            })
            .collect()
    }
}

pub struct NullQueryHeap {
    pub desc: QueryHeapDescriptor,
    pub results: Vec<u64>,
    pub active: Vec<bool>,
}

#[derive(Default)]
pub struct NullFence {
    pub debug_name: Option<String>,
    pub signaled: bool,
}

/// Every object container of a Null render system
pub struct NullObjects {
    pub swap_chains: HwObjectContainer<SwapChainHandle, NullSwapChain>,
    pub command_buffers: HwObjectContainer<CommandBufferHandle, CommandBuffer>,
    pub buffers: HwObjectContainer<BufferHandle, NullBuffer>,
    pub buffer_arrays: HwObjectContainer<BufferArrayHandle, NullBufferArray>,
    pub textures: HwObjectContainer<TextureHandle, NullTexture>,
    pub samplers: HwObjectContainer<SamplerHandle, NullSampler>,
    pub shaders: HwObjectContainer<ShaderHandle, NullShader>,
    pub pipeline_layouts: HwObjectContainer<PipelineLayoutHandle, NullPipelineLayout>,
    pub pipeline_caches: HwObjectContainer<PipelineCacheHandle, NullPipelineCache>,
    pub pipeline_states: HwObjectContainer<PipelineStateHandle, NullPipelineState>,
    pub render_passes: HwObjectContainer<RenderPassHandle, NullRenderPass>,
    pub render_targets: HwObjectContainer<RenderTargetHandle, NullRenderTarget>,
    pub resource_heaps: HwObjectContainer<ResourceHeapHandle, NullResourceHeap>,
    pub query_heaps: HwObjectContainer<QueryHeapHandle, NullQueryHeap>,
    pub fences: HwObjectContainer<FenceHandle, NullFence>,
}

impl NullObjects {
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

    /// Number of live objects of every kind
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
}

#[cfg(test)]
#[path = "null_objects_tests.rs"]
mod tests;
