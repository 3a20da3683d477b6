use std::sync::Arc;

use parking_lot::Mutex;

use crate::foundation::core::{Canvas, PixelFormat};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::Fnv1a64;

#[derive(Debug, Default)]
struct PoolState {
    free: Vec<Vec<u8>>,
    outstanding: usize,
    allocated: usize,
    checkouts: u64,
}

#[derive(Debug)]
struct PoolShared {
    canvas: Canvas,
    format: PixelFormat,
    capacity: usize,
    state: Mutex<PoolState>,
}

impl PoolShared {
    fn byte_len(&self) -> usize {
        self.canvas.rgba8_len()
    }

    fn release(&self, data: Vec<u8>) {
        let mut st = self.state.lock();
        st.outstanding = st.outstanding.saturating_sub(1);
        if data.len() == self.byte_len() && st.free.len() < self.capacity {
            st.free.push(data);
        } else {
            st.allocated = st.allocated.saturating_sub(1);
        }
    }
}

/// Snapshot of pool counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Buffers ever allocated and still alive (free + outstanding).
    pub allocated: usize,
    /// Buffers currently checked out.
    pub outstanding: usize,
    /// Total successful checkouts.
    pub checkouts: u64,
}

/// Bounded pool of equally sized frame buffers.
///
/// Never blocks: checking out with every buffer outstanding is [`ReelError::PoolExhausted`].
/// Buffers return to the pool when dropped.
#[derive(Clone, Debug)]
pub struct PixelBufferPool {
    shared: Arc<PoolShared>,
}

impl PixelBufferPool {
    /// Create an empty pool. Buffers are allocated lazily up to `capacity`.
    pub fn new(canvas: Canvas, format: PixelFormat, capacity: usize) -> ReelResult<Self> {
        if capacity == 0 {
            return Err(ReelError::validation("pixel buffer pool capacity must be >= 1"));
        }
        if canvas.width == 0 || canvas.height == 0 {
            return Err(ReelError::validation(
                "pixel buffer pool canvas must be non-zero",
            ));
        }
        Ok(Self {
            shared: Arc::new(PoolShared {
                canvas,
                format,
                capacity,
                state: Mutex::new(PoolState::default()),
            }),
        })
    }

    /// Maximum number of simultaneously outstanding buffers.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Buffer dimensions.
    pub fn canvas(&self) -> Canvas {
        self.shared.canvas
    }

    /// Number of buffers that can be checked out right now.
    pub fn available(&self) -> usize {
        let st = self.shared.state.lock();
        self.shared.capacity.saturating_sub(st.outstanding)
    }

    /// Current counters.
    pub fn stats(&self) -> PoolStats {
        let st = self.shared.state.lock();
        PoolStats {
            allocated: st.allocated,
            outstanding: st.outstanding,
            checkouts: st.checkouts,
        }
    }

    /// Take a buffer from the pool, allocating a new one if none is free.
    pub fn checkout(&self) -> ReelResult<PixelBuffer> {
        let mut st = self.shared.state.lock();
        if st.outstanding >= self.shared.capacity {
            return Err(ReelError::pool_exhausted(format!(
                "all {} buffers are outstanding",
                self.shared.capacity
            )));
        }

        let data = match st.free.pop() {
            Some(d) => d,
            None => {
                let d = alloc_zeroed(self.shared.byte_len())?;
                st.allocated += 1;
                d
            }
        };
        st.outstanding += 1;
        st.checkouts += 1;
        drop(st);

        Ok(PixelBuffer {
            width: self.shared.canvas.width,
            height: self.shared.canvas.height,
            format: self.shared.format,
            data,
            home: Some(Arc::clone(&self.shared)),
        })
    }
}

fn alloc_zeroed(len: usize) -> ReelResult<Vec<u8>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len).map_err(|e| {
        ReelError::allocation_failed(format!("could not reserve {len} bytes for a frame: {e}"))
    })?;
    data.resize(len, 0);
    Ok(data)
}

/// One frame of pixels.
///
/// A buffer checked out of a [`PixelBufferPool`] hands its memory back to that pool on drop.
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
    home: Option<Arc<PoolShared>>,
}

impl PixelBuffer {
    /// Allocate a standalone (unpooled) buffer.
    pub fn alloc(canvas: Canvas, format: PixelFormat) -> ReelResult<Self> {
        Ok(Self {
            width: canvas.width,
            height: canvas.height,
            format,
            data: alloc_zeroed(canvas.rgba8_len())?,
            home: None,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Buffer dimensions.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Pixel layout.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Row-major pixel bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable row-major pixel bytes.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Return `true` when this buffer belongs to a pool.
    pub fn is_pooled(&self) -> bool {
        self.home.is_some()
    }

    /// Stable 64-bit hash of dimensions and contents.
    pub fn fingerprint(&self) -> u64 {
        let mut h = Fnv1a64::new_default();
        h.write_u32(self.width);
        h.write_u32(self.height);
        h.write_bytes(&self.data);
        h.finish()
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("data_len", &self.data.len())
            .field("pooled", &self.home.is_some())
            .finish()
    }
}

impl Drop for PixelBuffer {
    fn drop(&mut self) {
        if let Some(home) = self.home.take() {
            home.release(std::mem::take(&mut self.data));
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/pool.rs"]
mod tests;
