/// Command queue: submission and GPU/CPU synchronization

use std::time::Duration;

use crate::error::Result;
use crate::render::{CommandBufferHandle, FenceHandle, QueryHeapHandle};

/// Queue that executes recorded command buffers
///
/// Synchronization is explicit: nothing waits unless the caller asks for it
/// through a fence or `wait_idle`.
pub trait CommandQueue {
    /// Submit an executable command buffer
    ///
    /// # Errors
    ///
    /// `InvalidState` if the buffer is not executable or references a mapped
    /// buffer, `InvalidResource` if it references a released object,
    /// `InvalidArgument` if a command addresses memory out of range. Nothing
    /// is executed when submission fails.
    fn submit(&mut self, command_buffer: CommandBufferHandle) -> Result<()>;

    /// Signal `fence` once all previously submitted work has completed
    fn submit_fence(&mut self, fence: FenceHandle) -> Result<()>;

    /// Wait for a fence; returns false if `timeout` elapsed first
    ///
    /// A zero timeout polls the fence.
    fn wait_fence(&mut self, fence: FenceHandle, timeout: Duration) -> Result<bool>;

    /// Block until the queue has no pending work
    fn wait_idle(&mut self) -> Result<()>;

    /// Read back query results
    ///
    /// Returns `None` if the results are not available yet.
    fn query_result(&mut self, heap: QueryHeapHandle, first_query: u32, num_queries: u32) -> Result<Option<Vec<u64>>>;
}
