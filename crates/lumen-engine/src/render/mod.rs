//! Small wgpu helpers shared by the demo scenes.
//!
//! Scenes own their pipelines and buffers; this module only removes the
//! descriptor boilerplate that every scene would otherwise repeat.

mod buffer;
pub mod pipeline;
mod texture;

pub use buffer::{
    aligned_size, calc_constant_buffer_byte_size, create_buffer, create_buffer_with_data,
    min_binding_size, pack_constant_slots, resolve_usage, ArrayDataType, BufferKind, CONSTANT_BUFFER_ALIGNMENT,
};
pub use texture::{
    create_cubemap, load_cubemap_faces, mip_level_count, CubemapFaces, DepthTexture, MsaaTarget,
    CUBE_FACE_NAMES,
};
