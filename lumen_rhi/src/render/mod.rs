/// Backend-independent render API: descriptors, handles, command recording
/// and the render system trait

pub mod buffer;
pub mod command_buffer;
pub mod command_queue;
pub mod handle;
pub mod limits;
pub mod pipeline_layout;
pub mod pipeline_state;
pub mod query;
pub mod render_pass;
pub mod render_system;
pub mod render_target;
pub mod report;
pub mod resource_flags;
pub mod resource_heap;
pub mod sampler;
pub mod shader;
pub mod surface;
pub mod swap_chain;
pub mod texture;
pub mod types;

pub use buffer::*;
pub use command_buffer::*;
pub use command_queue::*;
pub use handle::*;
pub use limits::*;
pub use pipeline_layout::*;
pub use pipeline_state::*;
pub use query::*;
pub use render_pass::*;
pub use render_system::*;
pub use render_target::*;
pub use report::*;
pub use resource_flags::*;
pub use resource_heap::*;
pub use sampler::*;
pub use shader::*;
pub use surface::*;
pub use swap_chain::*;
pub use texture::*;
pub use types::*;
