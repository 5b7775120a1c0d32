//! Cadena Core - linear signal-chain engine
//!
//! This crate hosts an ordered chain of audio modules that share one pool
//! of scratch buffers. Every structural edit is validated before it is
//! applied, so the chain always satisfies its width invariant: each
//! module's input count equals the previous module's output count.
//!
//! # Core Abstractions
//!
//! ## Modules and Ports
//!
//! - [`Module`] - Object-safe processing unit with a channel-adaptation contract
//! - [`Port`] - Typed endpoint (audio, control or aux audio) owned by a module
//! - [`PortLayout`] - The only way a module creates or resizes its ports
//! - [`ProcessContext`] - Allocation-free realtime view of a module's buffers
//!
//! ## Chain
//!
//! - [`Chain`] - Signal path, satellites, scratch pool and process queue
//! - [`PlacementPolicy`] - Adjacency rules (default [`GeneratorPlacement`])
//! - [`ChainObserver`] - Optional presentation hook
//! - [`ChainClient`] - Lock plus drop counter shared with the realtime thread
//!
//! ## Collaborators
//!
//! - [`Backend`] - Native audio system: aux port registry, transport, latency
//! - [`DummyBackend`] - In-memory backend for offline rendering and tests
//! - [`LogEntry`] - Ordered key/value pairs for persistence
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cadena_core::{Chain, ChainClient, DummyBackend};
//!
//! let mut chain = Chain::new("strip", Arc::new(DummyBackend::default()));
//! let input = chain.insert(None, Box::new(capture))?;
//! chain.insert(None, Box::new(gain))?;
//! chain.insert(None, Box::new(playback))?;
//!
//! let client = ChainClient::new(chain);
//! // realtime thread
//! client.process(256);
//! ```
//!
//! # Features
//!
//! - `tracing`: structural edits log through `tracing` at debug level.

pub mod backend;
pub mod buffer;
pub mod chain;
pub mod client;
pub mod context;
pub mod control;
pub mod error;
pub mod layout;
pub mod log;
pub mod module;
pub mod observer;
pub mod policy;
pub mod port;
mod slab;

pub use backend::{
    Backend, BackendError, BackendPortId, DummyBackend, LatencyRange, Transport,
};
pub use buffer::ScratchPool;
pub use chain::Chain;
pub use client::{ChainClient, ProcessOutcome};
pub use context::ProcessContext;
pub use control::{ControlCell, ControlHandle, ControlHints, ControlScale};
pub use error::{ChainError, Result};
pub use layout::{Controls, ModulePorts, PortLayout};
pub use log::LogEntry;
pub use module::{Module, ModuleContext, ModuleId, ModuleRole, ModuleState};
pub use observer::ChainObserver;
pub use policy::{GeneratorPlacement, PlacementPolicy, PlacementViolation, WidthOverride};
pub use port::{Direction, Port, PortArena, PortId, PortKind};
