//! Shared chain handle for the control and realtime threads.
//!
//! # Thread Safety
//!
//! - **Edits**: `Mutex::lock` on the control thread. Modules removed while
//!   the lock is held are dropped only after it is released.
//! - **Processing**: `Mutex::try_lock` on the realtime thread. On contention
//!   the period is skipped and the drop counter incremented; the realtime
//!   thread never waits.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::chain::Chain;
use crate::module::Module;

/// What happened to one realtime period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The chain ran.
    Processed,
    /// An edit held the lock; the period was skipped.
    Dropped,
}

/// Cloneable handle on a chain shared between threads.
#[derive(Clone)]
pub struct ChainClient {
    chain: Arc<Mutex<Chain>>,
    dropped: Arc<AtomicU64>,
}

impl ChainClient {
    /// Wraps a chain.
    pub fn new(chain: Chain) -> Self {
        Self {
            chain: Arc::new(Mutex::new(chain)),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Runs a control-thread edit under the lock.
    ///
    /// Modules the edit displaced (auto-removed controllers) are dropped
    /// after the lock is released. Modules the closure returns are the
    /// caller's to drop.
    pub fn edit<R>(&self, f: impl FnOnce(&mut Chain) -> R) -> R {
        let (result, removed): (R, Vec<Box<dyn Module>>) = {
            let mut chain = self.chain.lock();
            let result = f(&mut chain);
            (result, chain.take_removed())
        };
        drop(removed);
        result
    }

    /// Realtime path: processes one period unless an edit holds the lock.
    pub fn process(&self, nframes: usize) -> ProcessOutcome {
        match self.chain.try_lock() {
            Some(mut chain) => {
                chain.process(nframes);
                ProcessOutcome::Processed
            }
            None => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                ProcessOutcome::Dropped
            }
        }
    }

    /// Realtime path for drivers: runs `f` under the same try-lock so
    /// hardware frames can be moved in and out of the chain around
    /// [`Chain::process`]. Returns `None` and counts a drop on contention.
    pub fn with_io<R>(&self, f: impl FnOnce(&mut Chain) -> R) -> Option<R> {
        match self.chain.try_lock() {
            Some(mut chain) => Some(f(&mut chain)),
            None => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Periods skipped because of lock contention.
    pub fn dropped_buffers(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClient")
            .field("dropped", &self.dropped_buffers())
            .finish_non_exhaustive()
    }
}
