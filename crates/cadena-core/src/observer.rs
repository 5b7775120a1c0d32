//! Optional presentation hook.
//!
//! A front end that wants to mirror the chain (draw module strips, refresh
//! meters) installs a [`ChainObserver`]. The engine calls it on the control
//! thread after each structural edit has completed. Every method defaults to
//! a no-op and the engine never depends on any of them.

use crate::module::ModuleId;

/// Receives notifications about completed structural edits.
pub trait ChainObserver: Send {
    /// A module joined the signal path at `index`.
    fn module_inserted(&mut self, _id: ModuleId, _index: usize) {}

    /// A module left the chain.
    fn module_removed(&mut self, _id: ModuleId) {}

    /// A controller or indicator was attached outside the signal path.
    fn satellite_added(&mut self, _id: ModuleId) {}

    /// Ports were reconfigured and the scratch pool resized.
    fn ports_configured(&mut self, _required_buffers: usize) {}

    /// A module entered or left bypass.
    fn bypass_changed(&mut self, _id: ModuleId, _bypassed: bool) {}
}
