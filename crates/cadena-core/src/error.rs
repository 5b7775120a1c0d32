//! Error types for structural chain edits.

use crate::backend::BackendError;
use crate::module::ModuleId;
use crate::policy::PlacementViolation;
use crate::port::PortId;

/// Errors returned by structural edits on a [`Chain`](crate::Chain).
///
/// Every variant is returned synchronously and leaves the chain in the state
/// it had before the call. Realtime lock contention is not an error: it is
/// absorbed by [`ChainClient`](crate::ChainClient) and only counted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// A module cannot accept the channel count its upstream neighbour produces.
    #[error("module '{kind}' cannot accept {inputs} input channel(s)")]
    ConfigurationRejected {
        /// Kind string of the module that refused.
        kind: String,
        /// Channel count it was offered.
        inputs: usize,
    },

    /// The edit would break a topology rule of the placement policy.
    #[error("insertion rejected: {0}")]
    InsertionRejected(#[from] PlacementViolation),

    /// The scratch pool could not grow to the required size.
    #[error("failed to allocate {buffers} scratch buffer(s) of {frames} frames")]
    BufferAllocation {
        /// Number of buffers requested.
        buffers: usize,
        /// Frames per buffer requested.
        frames: usize,
    },

    /// The module id does not belong to this chain (or was removed).
    #[error("module {0} not found")]
    ModuleNotFound(ModuleId),

    /// The port id does not exist in this chain's arena.
    #[error("port {0} not found")]
    PortNotFound(PortId),

    /// Two ports cannot be linked.
    #[error("cannot connect {from} to {to}: {reason}")]
    ConnectionRejected {
        /// First port of the attempted link.
        from: PortId,
        /// Second port of the attempted link.
        to: PortId,
        /// Why the link was refused.
        reason: &'static str,
    },

    /// The backend collaborator refused a port operation.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

impl ChainError {
    /// Creates a [`ChainError::ConfigurationRejected`] for a module kind.
    pub fn rejected(kind: &str, inputs: usize) -> Self {
        Self::ConfigurationRejected {
            kind: kind.to_string(),
            inputs,
        }
    }
}

/// Convenience result type for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_rejected_display() {
        let err = ChainError::rejected("pan", 3);
        assert_eq!(
            err.to_string(),
            "module 'pan' cannot accept 3 input channel(s)"
        );
    }

    #[test]
    fn test_placement_converts() {
        let err: ChainError = PlacementViolation::GeneratorNotAfterAdapter.into();
        assert!(matches!(err, ChainError::InsertionRejected(_)));
        assert!(err.to_string().starts_with("insertion rejected: "));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_allocation_display() {
        let err = ChainError::BufferAllocation {
            buffers: 4,
            frames: 1024,
        };
        assert_eq!(
            err.to_string(),
            "failed to allocate 4 scratch buffer(s) of 1024 frames"
        );
    }
}
