//! Scratch buffer pool shared by every module in a chain.
//!
//! Buffers are mono and reused across the whole chain rather than
//! allocated per link: audio input `j` and audio output `j` of every module
//! are bound to slot `j`, so modules process in place and the pool only has
//! to be as wide as the chain's peak channel count.

use crate::error::{ChainError, Result};

/// Pool of equally sized mono buffers.
#[derive(Debug, Default)]
pub struct ScratchPool {
    buffers: Vec<Vec<f32>>,
    nframes: usize,
}

impl ScratchPool {
    /// Creates a pool of `count` zeroed buffers of `nframes` frames.
    pub fn new(count: usize, nframes: usize) -> Result<Self> {
        let mut pool = Self {
            buffers: Vec::new(),
            nframes,
        };
        pool.resize(count)?;
        Ok(pool)
    }

    /// Creates a pool with no slots yet.
    pub fn with_nframes(nframes: usize) -> Self {
        Self {
            buffers: Vec::new(),
            nframes,
        }
    }

    /// Number of buffer slots.
    pub fn count(&self) -> usize {
        self.buffers.len()
    }

    /// Frames per buffer.
    pub fn nframes(&self) -> usize {
        self.nframes
    }

    /// Buffer at `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= count()`.
    #[inline]
    pub fn get(&self, idx: usize) -> &[f32] {
        &self.buffers[idx]
    }

    /// Mutable buffer at `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= count()`.
    #[inline]
    pub fn get_mut(&mut self, idx: usize) -> &mut [f32] {
        &mut self.buffers[idx]
    }

    /// Two distinct buffers, both mutable. `None` if `a == b` or either is
    /// out of range.
    pub fn pair_mut(&mut self, a: usize, b: usize) -> Option<(&mut [f32], &mut [f32])> {
        if a == b || a >= self.buffers.len() || b >= self.buffers.len() {
            return None;
        }
        if a < b {
            let (lo, hi) = self.buffers.split_at_mut(b);
            Some((&mut lo[a], &mut hi[0]))
        } else {
            let (lo, hi) = self.buffers.split_at_mut(a);
            Some((&mut hi[0], &mut lo[b]))
        }
    }

    /// Grows or shrinks to exactly `count` slots. New slots are zeroed.
    ///
    /// Uses fallible reservation so an oversized request surfaces as
    /// [`ChainError::BufferAllocation`] instead of aborting.
    pub fn resize(&mut self, count: usize) -> Result<()> {
        if count <= self.buffers.len() {
            self.buffers.truncate(count);
            return Ok(());
        }
        let failed = || ChainError::BufferAllocation {
            buffers: count,
            frames: self.nframes,
        };
        let mut grown = Vec::new();
        grown
            .try_reserve_exact(count - self.buffers.len())
            .map_err(|_| failed())?;
        for _ in self.buffers.len()..count {
            let mut buf = Vec::new();
            buf.try_reserve_exact(self.nframes).map_err(|_| failed())?;
            buf.resize(self.nframes, 0.0);
            grown.push(buf);
        }
        self.buffers.try_reserve_exact(grown.len()).map_err(|_| failed())?;
        self.buffers.extend(grown);
        Ok(())
    }

    /// Changes the frame count of every buffer. Samples are zeroed.
    pub fn set_nframes(&mut self, nframes: usize) -> Result<()> {
        let count = self.buffers.len();
        for buf in &mut self.buffers {
            if nframes > buf.len() {
                buf.try_reserve_exact(nframes - buf.len())
                    .map_err(|_| ChainError::BufferAllocation {
                        buffers: count,
                        frames: nframes,
                    })?;
            }
        }
        self.nframes = nframes;
        for buf in &mut self.buffers {
            buf.clear();
            buf.resize(nframes, 0.0);
        }
        Ok(())
    }

    /// Zeroes every buffer.
    pub fn clear_all(&mut self) {
        for buf in &mut self.buffers {
            buf.fill(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let pool = ScratchPool::new(3, 64).unwrap();
        assert_eq!(pool.count(), 3);
        assert_eq!(pool.nframes(), 64);
        assert!(pool.get(2).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_resize_keeps_existing() {
        let mut pool = ScratchPool::new(1, 8).unwrap();
        pool.get_mut(0)[0] = 0.5;
        pool.resize(4).unwrap();
        assert_eq!(pool.count(), 4);
        assert_eq!(pool.get(0)[0], 0.5);
        assert_eq!(pool.get(3).len(), 8);
        pool.resize(2).unwrap();
        assert_eq!(pool.count(), 2);
    }

    #[test]
    fn test_pair_mut() {
        let mut pool = ScratchPool::new(3, 4).unwrap();
        {
            let (a, b) = pool.pair_mut(2, 0).unwrap();
            a[0] = 1.0;
            b[0] = 2.0;
        }
        assert_eq!(pool.get(2)[0], 1.0);
        assert_eq!(pool.get(0)[0], 2.0);
        assert!(pool.pair_mut(1, 1).is_none());
        assert!(pool.pair_mut(0, 3).is_none());
    }

    #[test]
    fn test_set_nframes() {
        let mut pool = ScratchPool::new(2, 4).unwrap();
        pool.get_mut(1)[3] = 1.0;
        pool.set_nframes(16).unwrap();
        assert_eq!(pool.nframes(), 16);
        assert_eq!(pool.get(1).len(), 16);
        assert_eq!(pool.get(1)[3], 0.0);
    }

    #[test]
    fn test_huge_request_fails_cleanly() {
        let mut pool = ScratchPool {
            buffers: Vec::new(),
            nframes: usize::MAX / 2,
        };
        assert!(matches!(
            pool.resize(1),
            Err(ChainError::BufferAllocation { .. })
        ));
    }
}
