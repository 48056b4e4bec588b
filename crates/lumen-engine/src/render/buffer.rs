use std::any::TypeId;
use std::num::NonZeroU64;

use bytemuck::Pod;
use wgpu::util::DeviceExt;

/// Uniform buffers bound with dynamic offsets must start on this boundary.
pub const CONSTANT_BUFFER_ALIGNMENT: u64 = 256;

/// Intended use of a buffer, mapped onto `wgpu::BufferUsages`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BufferKind {
    Uniform,
    Vertex,
    Index,
    Storage,
    VertexStorage,
    IndexStorage,
    Indirect,
    IndirectStorage,
    /// CPU readback target.
    Read,
    /// CPU-written staging buffer.
    Write,
}

impl BufferKind {
    pub fn usages(self) -> wgpu::BufferUsages {
        use wgpu::BufferUsages as U;

        let copy = U::COPY_DST | U::COPY_SRC;
        match self {
            BufferKind::Uniform => U::UNIFORM | copy,
            BufferKind::Vertex => U::VERTEX | copy,
            BufferKind::Index => U::INDEX | copy,
            BufferKind::Storage => U::STORAGE | copy,
            BufferKind::VertexStorage => U::VERTEX | U::STORAGE | copy,
            BufferKind::IndexStorage => U::INDEX | U::STORAGE | copy,
            BufferKind::Indirect => U::INDIRECT | copy,
            BufferKind::IndirectStorage => U::INDIRECT | U::STORAGE | copy,
            BufferKind::Read => U::MAP_READ | U::COPY_DST,
            BufferKind::Write => U::MAP_WRITE | copy,
        }
    }
}

/// Element type of a typed array handed to [`create_buffer_with_data`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ArrayDataType {
    Float32,
    Float64,
    Uint16,
    Uint32,
}

impl ArrayDataType {
    /// Recognizes scalar element types; structs and vectors return `None`.
    pub fn of<T: 'static>() -> Option<Self> {
        let id = TypeId::of::<T>();
        if id == TypeId::of::<f32>() {
            Some(Self::Float32)
        } else if id == TypeId::of::<f64>() {
            Some(Self::Float64)
        } else if id == TypeId::of::<u16>() {
            Some(Self::Uint16)
        } else if id == TypeId::of::<u32>() {
            Some(Self::Uint32)
        } else {
            None
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, Self::Uint16 | Self::Uint32)
    }
}

/// Usage flags for a buffer created from data.
///
/// Integer arrays requested as `Vertex` are index data and become index buffers.
pub fn resolve_usage(kind: BufferKind, data_type: Option<ArrayDataType>) -> wgpu::BufferUsages {
    match (kind, data_type) {
        (BufferKind::Vertex, Some(t)) if t.is_integer() => BufferKind::Index.usages(),
        _ => kind.usages(),
    }
}

/// Creates an uninitialized buffer of `size` bytes.
pub fn create_buffer(
    device: &wgpu::Device,
    label: &str,
    size: u64,
    kind: BufferKind,
) -> wgpu::Buffer {
    log::debug!("buffer {label}: {size} bytes, {kind:?}");
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: kind.usages(),
        mapped_at_creation: false,
    })
}

/// Creates a buffer holding `data`.
pub fn create_buffer_with_data<T: Pod>(
    device: &wgpu::Device,
    label: &str,
    data: &[T],
    kind: BufferKind,
) -> wgpu::Buffer {
    let usage = resolve_usage(kind, ArrayDataType::of::<T>());
    log::debug!(
        "buffer {label}: {} bytes, {usage:?}",
        std::mem::size_of_val(data)
    );
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(data),
        usage,
    })
}

/// Rounds `size` up to a multiple of `alignment`. An alignment of 0 leaves it unchanged.
pub fn aligned_size(size: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return size;
    }
    size.div_ceil(alignment) * alignment
}

/// Size of a constant buffer slot usable with dynamic offsets.
pub fn calc_constant_buffer_byte_size(size: u64) -> u64 {
    aligned_size(size, CONSTANT_BUFFER_ALIGNMENT)
}

/// Packs `items` into consecutive constant buffer slots, one per dynamic offset.
///
/// Slot `i` starts at `i * calc_constant_buffer_byte_size(size_of::<T>())`.
pub fn pack_constant_slots<T: Pod>(items: &[T]) -> Vec<u8> {
    let item = std::mem::size_of::<T>();
    let slot = calc_constant_buffer_byte_size(item as u64) as usize;
    let mut out = vec![0u8; slot * items.len()];
    for (i, value) in items.iter().enumerate() {
        out[i * slot..i * slot + item].copy_from_slice(bytemuck::bytes_of(value));
    }
    out
}

/// `min_binding_size` for a binding holding one `T`.
pub fn min_binding_size<T>() -> Option<NonZeroU64> {
    NonZeroU64::new(std::mem::size_of::<T>() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::BufferUsages as U;

    #[test]
    fn every_kind_but_read_is_copyable_both_ways() {
        let kinds = [
            BufferKind::Uniform,
            BufferKind::Vertex,
            BufferKind::Index,
            BufferKind::Storage,
            BufferKind::VertexStorage,
            BufferKind::IndexStorage,
            BufferKind::Indirect,
            BufferKind::IndirectStorage,
            BufferKind::Write,
        ];
        for k in kinds {
            assert!(k.usages().contains(U::COPY_DST | U::COPY_SRC), "{k:?}");
        }
        assert_eq!(BufferKind::Read.usages(), U::MAP_READ | U::COPY_DST);
    }

    #[test]
    fn combined_kinds() {
        assert!(BufferKind::VertexStorage.usages().contains(U::VERTEX | U::STORAGE));
        assert!(BufferKind::IndirectStorage.usages().contains(U::INDIRECT | U::STORAGE));
        assert!(BufferKind::Write.usages().contains(U::MAP_WRITE));
    }

    #[test]
    fn integer_vertex_data_becomes_index_buffer() {
        let u = resolve_usage(BufferKind::Vertex, ArrayDataType::of::<u32>());
        assert_eq!(u, U::INDEX | U::COPY_DST | U::COPY_SRC);
        let u = resolve_usage(BufferKind::Vertex, ArrayDataType::of::<u16>());
        assert!(u.contains(U::INDEX));
    }

    #[test]
    fn float_vertex_data_stays_vertex() {
        let u = resolve_usage(BufferKind::Vertex, ArrayDataType::of::<f32>());
        assert!(u.contains(U::VERTEX));
        assert!(!u.contains(U::INDEX));
        assert_eq!(resolve_usage(BufferKind::Vertex, ArrayDataType::of::<[f32; 3]>()), BufferKind::Vertex.usages());
    }

    #[test]
    fn data_type_detection() {
        assert_eq!(ArrayDataType::of::<f64>(), Some(ArrayDataType::Float64));
        assert_eq!(ArrayDataType::of::<i32>(), None);
        assert!(!ArrayDataType::Float32.is_integer());
    }

    #[test]
    fn alignment_rounds_up() {
        assert_eq!(aligned_size(0, 256), 0);
        assert_eq!(aligned_size(1, 256), 256);
        assert_eq!(aligned_size(256, 256), 256);
        assert_eq!(aligned_size(257, 256), 512);
        assert_eq!(aligned_size(13, 0), 13);
        assert_eq!(calc_constant_buffer_byte_size(192), 256);
    }

    #[test]
    fn constant_slots_start_on_alignment() {
        let packed = pack_constant_slots(&[[1.0f32; 3], [2.0f32; 3]]);
        assert_eq!(packed.len(), 512);
        let second: [f32; 3] = bytemuck::pod_read_unaligned(&packed[256..268]);
        assert_eq!(second, [2.0, 2.0, 2.0]);
        assert!(packed[12..256].iter().all(|b| *b == 0));
    }

    #[test]
    fn binding_size_of_zero_sized_type_is_none() {
        assert_eq!(min_binding_size::<()>(), None);
        assert_eq!(min_binding_size::<[f32; 4]>().map(NonZeroU64::get), Some(16));
    }
}
