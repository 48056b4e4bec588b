//! Multi-dimensional fields stored as one f32 storage buffer per component.

use anyhow::{ensure, Result};
use lumen_engine::render::{self, BufferKind};

pub const MAX_DIMENSIONS: usize = 3;

pub struct DynamicBuffer {
    dims: usize,
    buffer_size: u64,
    buffers: Vec<wgpu::Buffer>,
}

impl DynamicBuffer {
    pub fn new(device: &wgpu::Device, label: &str, dims: usize, w: u32, h: u32) -> Result<Self> {
        ensure!(
            (1..=MAX_DIMENSIONS).contains(&dims),
            "{label}: {dims} dimensions (1..={MAX_DIMENSIONS} supported)"
        );
        let buffer_size = w as u64 * h as u64 * 4;
        let buffers = (0..dims)
            .map(|d| {
                render::create_buffer(
                    device,
                    &format!("{label}[{d}]"),
                    buffer_size,
                    BufferKind::Storage,
                )
            })
            .collect();
        Ok(Self {
            dims,
            buffer_size,
            buffers,
        })
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Component buffer `dim`; indices past the last component map to the last one.
    pub fn buffer(&self, dim: usize) -> &wgpu::Buffer {
        &self.buffers[dim.min(self.dims - 1)]
    }

    /// Copies every component into `other`.
    ///
    /// When the dimension counts differ the last component of the shorter side
    /// is reused, so a scalar field fills all three channels of an rgb target.
    pub fn copy_to(&self, other: &DynamicBuffer, encoder: &mut wgpu::CommandEncoder) {
        let size = self.buffer_size.min(other.buffer_size);
        for (src, dst) in copy_plan(self.dims, other.dims) {
            encoder.copy_buffer_to_buffer(&self.buffers[src], 0, &other.buffers[dst], 0, size);
        }
    }

    /// Zero-fills every component.
    pub fn clear(&self, queue: &wgpu::Queue) {
        let zeros = vec![0u8; self.buffer_size as usize];
        for buffer in &self.buffers {
            queue.write_buffer(buffer, 0, &zeros);
        }
    }
}

/// `(source, destination)` component pairs copied by `DynamicBuffer::copy_to`.
pub fn copy_plan(src_dims: usize, dst_dims: usize) -> Vec<(usize, usize)> {
    let (src_dims, dst_dims) = (src_dims.max(1), dst_dims.max(1));
    (0..src_dims.max(dst_dims))
        .map(|i| (i.min(src_dims - 1), i.min(dst_dims - 1)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_dimensions_copy_one_to_one() {
        assert_eq!(copy_plan(3, 3), vec![(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn scalar_field_fills_every_channel() {
        assert_eq!(copy_plan(1, 3), vec![(0, 0), (0, 1), (0, 2)]);
    }

    #[test]
    fn vector_field_repeats_last_component() {
        assert_eq!(copy_plan(2, 3), vec![(0, 0), (1, 1), (1, 2)]);
    }

    #[test]
    fn wider_source_overwrites_last_destination() {
        assert_eq!(copy_plan(3, 1), vec![(0, 0), (1, 0), (2, 0)]);
    }
}
