/// Generation-checked handles and the exclusively-owning object container
///
/// Every object a render system creates lives in a [`HwObjectContainer`].
/// Callers only hold handles: a handle whose object was released fails the
/// generation check instead of aliasing a newer object.

use slotmap::{new_key_type, Key, SlotMap};
use crate::error::{Error, Result};

new_key_type! {
    pub struct SwapChainHandle;
    pub struct CommandBufferHandle;
    pub struct BufferHandle;
    pub struct BufferArrayHandle;
    pub struct TextureHandle;
    pub struct SamplerHandle;
    pub struct ShaderHandle;
    pub struct PipelineLayoutHandle;
    pub struct PipelineCacheHandle;
    pub struct PipelineStateHandle;
    pub struct RenderPassHandle;
    pub struct RenderTargetHandle;
    pub struct ResourceHeapHandle;
    pub struct QueryHeapHandle;
    pub struct FenceHandle;
}

/// Any object handle, used where an API accepts several object kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectHandle {
    SwapChain(SwapChainHandle),
    CommandBuffer(CommandBufferHandle),
    Buffer(BufferHandle),
    BufferArray(BufferArrayHandle),
    Texture(TextureHandle),
    Sampler(SamplerHandle),
    Shader(ShaderHandle),
    PipelineLayout(PipelineLayoutHandle),
    PipelineCache(PipelineCacheHandle),
    PipelineState(PipelineStateHandle),
    RenderPass(RenderPassHandle),
    RenderTarget(RenderTargetHandle),
    ResourceHeap(ResourceHeapHandle),
    QueryHeap(QueryHeapHandle),
    Fence(FenceHandle),
}

/// Typed container that exclusively owns one kind of hardware object
///
/// Insert and release are O(1); slots are recycled with a new generation so
/// a stale handle never resolves to a live object.
pub struct HwObjectContainer<K: Key, T> {
    kind: &'static str,
    objects: SlotMap<K, T>,
}

impl<K: Key, T> HwObjectContainer<K, T> {
    /// Create an empty container; `kind` names the objects in error messages
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            objects: SlotMap::with_key(),
        }
    }

    pub fn insert(&mut self, object: T) -> K {
        self.objects.insert(object)
    }

    /// Insert an object that needs to know its own handle
    pub fn insert_with_key(&mut self, make: impl FnOnce(K) -> T) -> K {
        self.objects.insert_with_key(make)
    }

    /// Remove and return the object; `None` for stale or foreign handles
    pub fn release(&mut self, handle: K) -> Option<T> {
        self.objects.remove(handle)
    }

    pub fn contains(&self, handle: K) -> bool {
        self.objects.contains_key(handle)
    }

    /// # Errors
    ///
    /// `InvalidResource` if the handle is stale or was never issued here
    pub fn get(&self, handle: K) -> Result<&T> {
        self.objects.get(handle).ok_or_else(|| self.stale(handle))
    }

    /// # Errors
    ///
    /// `InvalidResource` if the handle is stale or was never issued here
    pub fn get_mut(&mut self, handle: K) -> Result<&mut T> {
        let kind = self.kind;
        self.objects
            .get_mut(handle)
            .ok_or_else(|| Error::InvalidResource(format!("{} handle {:?} is not alive", kind, handle.data())))
    }

    fn stale(&self, handle: K) -> Error {
        Error::InvalidResource(format!("{} handle {:?} is not alive", self.kind, handle.data()))
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> {
        self.objects.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut T)> {
        self.objects.iter_mut()
    }

    /// Release every object
    pub fn clear(&mut self) {
        self.objects.clear();
    }

    /// Remove all objects and hand them out, e.g. for ordered teardown
    pub fn drain(&mut self) -> impl Iterator<Item = (K, T)> + '_ {
        self.objects.drain()
    }
}

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;
