//! The module contract.
//!
//! A [`Module`] is a processing unit with a channel-adaptation contract:
//! [`can_support_inputs`](Module::can_support_inputs) answers, without side
//! effects, how many outputs it would produce for `n` inputs, and
//! [`configure_inputs`](Module::configure_inputs) reshapes its ports to
//! that width. The chain relies on the first to validate every structural
//! edit before it calls the second.
//!
//! Modules never own their ports directly. They describe them through a
//! [`PortLayout`] while the chain is editing and reach their buffers through
//! a [`ProcessContext`] on the realtime thread.
//!
//! # Lifecycle
//!
//! ```text
//! Constructed ──insert──▶ Bound ──configure_ports──▶ Active ⇄ Bypassed
//!                                                       │
//!                                                 remove ▼
//!                                                    Removed
//! ```

use std::fmt;
use std::sync::Arc;

use crate::backend::{Backend, BackendError};
use crate::context::ProcessContext;
use crate::layout::{Controls, PortLayout};
use crate::log::LogEntry;
use crate::slab::Key;

/// Module identifier within one chain.
///
/// Slots of removed modules are reused under a new generation, so an id
/// kept past removal never resolves to a later module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub(crate) Key);

impl ModuleId {
    #[cfg(test)]
    pub(crate) const fn first(index: u32) -> Self {
        Self(Key::first(index))
    }

    /// Raw slot index.
    pub fn index(self) -> usize {
        self.0.index as usize
    }

    /// Times the slot had been freed when this id was handed out.
    pub fn generation(self) -> u32 {
        self.0.generation
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.generation {
            0 => write!(f, "ModuleId({})", self.0.index),
            g => write!(f, "ModuleId({}v{g})", self.0.index),
        }
    }
}

/// Structural role, consulted by the placement policy and process queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleRole {
    /// Bridges the chain to hardware through aux ports.
    IoAdapter,
    /// Ordinary signal-path module.
    Processor,
    /// Produces audio from zero inputs.
    Generator,
    /// Drives another module's control input from outside the signal path.
    Controller,
    /// Consumes another module's control output from outside the signal path.
    Indicator,
}

impl ModuleRole {
    /// Controllers and indicators are satellites: they join the process
    /// queue through control links rather than through the signal path.
    pub const fn is_satellite(self) -> bool {
        matches!(self, Self::Controller | Self::Indicator)
    }
}

/// Where a module is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleState {
    /// Bound to a chain, ports created, not yet running.
    Bound,
    /// Running its processing body.
    Active,
    /// Running its bypass path.
    Bypassed,
    /// Torn down and handed back for deferred deletion.
    Removed,
}

/// Environment handed to a module when it is bound to a chain.
#[derive(Clone)]
pub struct ModuleContext {
    backend: Arc<dyn Backend>,
    sample_rate: u32,
    nframes: usize,
}

impl ModuleContext {
    /// Builds a context from the backend's current settings.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let sample_rate = backend.sample_rate();
        let nframes = backend.nframes();
        Self {
            backend,
            sample_rate,
            nframes,
        }
    }

    /// Backend collaborator.
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Shared handle on the backend.
    pub fn backend_arc(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.backend)
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Period size in frames.
    pub fn nframes(&self) -> usize {
        self.nframes
    }

    pub(crate) fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
    }

    pub(crate) fn set_nframes(&mut self, nframes: usize) {
        self.nframes = nframes;
    }
}

impl fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContext")
            .field("backend", &self.backend.name())
            .field("sample_rate", &self.sample_rate)
            .field("nframes", &self.nframes)
            .finish()
    }
}

/// A processing unit that can live in a [`Chain`](crate::Chain).
///
/// Only [`kind`](Self::kind), [`can_support_inputs`](Self::can_support_inputs),
/// [`configure_inputs`](Self::configure_inputs) and [`process`](Self::process)
/// are required. Everything else has a no-op default.
///
/// # Realtime contract
///
/// [`process`](Self::process) and [`process_bypassed`](Self::process_bypassed)
/// run on the audio thread. They must finish in bounded time, must not
/// allocate and must not block.
pub trait Module: Send {
    /// Registry identifier, also written to the persistence log.
    fn kind(&self) -> &'static str;

    /// Structural role.
    fn role(&self) -> ModuleRole {
        ModuleRole::Processor
    }

    /// Called once when the module joins a chain. Create control ports and
    /// any fixed ports here.
    fn bind(
        &mut self,
        _ctx: &ModuleContext,
        _ports: &mut PortLayout<'_>,
    ) -> Result<(), BackendError> {
        Ok(())
    }

    /// Outputs produced for `n` inputs, or `None` if `n` is unsupported.
    /// Must be pure.
    fn can_support_inputs(&self, n: usize) -> Option<usize>;

    /// Reshapes ports for `n` inputs. Idempotent for a repeated `n`. On
    /// `false` the module must leave its ports as they were.
    fn configure_inputs(&mut self, n: usize, ports: &mut PortLayout<'_>) -> bool;

    /// Forces the output width. Only adapters support this.
    fn configure_outputs(&mut self, _n: usize, _ports: &mut PortLayout<'_>) -> bool {
        false
    }

    /// Processes one period.
    fn process(&mut self, ctx: &mut ProcessContext<'_>);

    /// Processes one period while bypassed. Defaults to
    /// [`ProcessContext::pass_through`].
    fn process_bypassed(&mut self, ctx: &mut ProcessContext<'_>) {
        ctx.pass_through();
    }

    /// Intrinsic processing latency in frames.
    fn latency(&self) -> u32 {
        0
    }

    /// Leaves bypass. Called on the control thread.
    fn activate(&mut self) {}

    /// Enters bypass. Called on the control thread.
    fn deactivate(&mut self) {}

    /// A control input was written through the chain.
    fn handle_control_changed(&mut self, _index: usize, _value: f32) {}

    /// A control input lost its driver. `controls` gives access to this
    /// module's control values, e.g. to drop a display to its floor.
    fn handle_control_disconnect(&mut self, _index: usize, _controls: &Controls<'_>) {}

    /// Audio buffers were rebound.
    fn handle_port_connection_change(&mut self) {}

    /// Sample rate changed.
    fn set_sample_rate(&mut self, _sample_rate: u32) {}

    /// Period size changed.
    fn set_buffer_size(&mut self, _nframes: usize) {}

    /// Appends module-specific state to a persistence entry.
    fn get(&self, _entry: &mut LogEntry) {}

    /// Restores module-specific state from a persistence entry.
    fn set(&mut self, _entry: &LogEntry) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    #[test]
    fn test_satellite_roles() {
        assert!(ModuleRole::Controller.is_satellite());
        assert!(ModuleRole::Indicator.is_satellite());
        assert!(!ModuleRole::Generator.is_satellite());
        assert!(!ModuleRole::IoAdapter.is_satellite());
    }

    #[test]
    fn test_context_reads_backend() {
        let ctx = ModuleContext::new(Arc::new(DummyBackend::new(44100, 128)));
        assert_eq!(ctx.sample_rate(), 44100);
        assert_eq!(ctx.nframes(), 128);
        assert_eq!(ctx.backend().name(), "dummy");
        assert!(format!("{ctx:?}").contains("dummy"));
    }
}
