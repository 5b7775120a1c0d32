//! Linear signal chain with a shared scratch pool.
//!
//! [`Chain`] owns an ordered sequence of modules (the signal path), the
//! port arena, the scratch buffer pool and the process queue. It keeps
//! one invariant across every structural edit: for each adjacent pair,
//! `ninputs(next) == noutputs(prev)`.
//!
//! # Edit pipeline
//!
//! ```text
//! insert / remove / configure_outputs
//!     │  pure dry run: can_support_inputs through everything downstream
//!     ▼
//! apply: configure_inputs cascade (journaled)
//!     │  any failure rolls the journal back
//!     ▼
//! configure_ports: resize scratch to required_buffers()
//!     ▼
//! build_process_queue: order + rebind audio ports to scratch slots
//!     ▼
//! set_latency(Input), set_latency(Output)
//! ```
//!
//! Every edit is synchronous and all-or-nothing: on `Err` the chain is left
//! exactly as it was.
//!
//! # Satellites
//!
//! Controllers and indicators are bound to the chain but are not part of the
//! signal path. They join the process queue because of control links to
//! signal-path modules. See [`add_controller`](Chain::add_controller) and
//! [`add_indicator`](Chain::add_indicator).

mod latency;
mod persist;
mod queue;
mod routing;

use std::sync::Arc;

use crate::backend::{Backend, LatencyRange};
use crate::buffer::ScratchPool;
use crate::error::{ChainError, Result};
use crate::layout::{ModulePorts, PortLayout};
use crate::log::LogEntry;
use crate::module::{Module, ModuleContext, ModuleId, ModuleRole, ModuleState};
use crate::observer::ChainObserver;
use crate::policy::{GeneratorPlacement, PlacementPolicy, WidthOverride};
use crate::port::{Direction, Port, PortArena, PortId};
use crate::slab::Slab;

/// A module bound to a chain together with its ports and lifecycle state.
pub(crate) struct ModuleSlot {
    pub(crate) module: Box<dyn Module>,
    pub(crate) ports: ModulePorts,
    pub(crate) state: ModuleState,
    pub(crate) role: ModuleRole,
    pub(crate) is_default: bool,
    pub(crate) latency: [LatencyRange; 2],
}

impl ModuleSlot {
    /// # Panics
    ///
    /// Activating an already active module is a programming error.
    fn activate(&mut self) {
        assert!(
            self.state != ModuleState::Active,
            "module '{}' activated twice",
            self.module.kind()
        );
        self.module.activate();
        self.state = ModuleState::Active;
    }

    fn deactivate(&mut self) {
        if self.state == ModuleState::Active {
            self.module.deactivate();
        }
        self.state = ModuleState::Bypassed;
    }
}

/// One step of an applied edit, recorded so it can be undone.
#[derive(Debug, Clone, Copy)]
enum Change {
    Inputs { id: ModuleId, previous: usize },
    Outputs { id: ModuleId, previous: usize },
}

/// An ordered signal path of modules sharing one scratch pool.
pub struct Chain {
    name: String,
    ctx: ModuleContext,
    arena: PortArena,
    slots: Slab<ModuleSlot>,
    order: Vec<ModuleId>,
    queue: Vec<ModuleId>,
    scratch: ScratchPool,
    policy: Box<dyn PlacementPolicy>,
    observer: Option<Box<dyn ChainObserver>>,
    latency: [LatencyRange; 2],
    graveyard: Vec<Box<dyn Module>>,
}

impl Chain {
    /// Creates an empty chain. `name` prefixes every aux port it registers.
    pub fn new(name: impl Into<String>, backend: Arc<dyn Backend>) -> Self {
        let ctx = ModuleContext::new(backend);
        let scratch = ScratchPool::with_nframes(ctx.nframes());
        Self {
            name: name.into(),
            ctx,
            arena: PortArena::new(),
            slots: Slab::default(),
            order: Vec::new(),
            queue: Vec::new(),
            scratch,
            policy: Box::new(GeneratorPlacement),
            observer: None,
            latency: [LatencyRange::ZERO; 2],
            graveyard: Vec::new(),
        }
    }

    /// Replaces the placement policy.
    #[must_use]
    pub fn with_policy(mut self, policy: Box<dyn PlacementPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Installs or clears the presentation observer.
    pub fn set_observer(&mut self, observer: Option<Box<dyn ChainObserver>>) {
        self.observer = observer;
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Chain name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Context shared with every bound module.
    pub fn context(&self) -> &ModuleContext {
        &self.ctx
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.ctx.sample_rate()
    }

    /// Period size in frames.
    pub fn nframes(&self) -> usize {
        self.ctx.nframes()
    }

    /// Signal path, head first.
    pub fn modules(&self) -> &[ModuleId] {
        &self.order
    }

    /// Number of modules in the signal path.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the signal path is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Position of `id` in the signal path.
    pub fn position(&self, id: ModuleId) -> Option<usize> {
        self.order.iter().position(|&m| m == id)
    }

    /// Module at position `index` in the signal path.
    pub fn module_at(&self, index: usize) -> Option<ModuleId> {
        self.order.get(index).copied()
    }

    /// Bound satellites (controllers and indicators).
    pub fn satellites(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.slots
            .iter()
            .filter(|(_, s)| s.role.is_satellite())
            .map(|(key, _)| ModuleId(key))
    }

    pub(crate) fn slot(&self, id: ModuleId) -> Option<&ModuleSlot> {
        self.slots.get(id.0)
    }

    pub(crate) fn slot_mut(&mut self, id: ModuleId) -> Option<&mut ModuleSlot> {
        self.slots.get_mut(id.0)
    }

    /// Returns true if `id` is bound to this chain.
    pub fn contains(&self, id: ModuleId) -> bool {
        self.slot(id).is_some()
    }

    /// The module behind `id`.
    pub fn module(&self, id: ModuleId) -> Option<&dyn Module> {
        self.slot(id).map(|s| s.module.as_ref())
    }

    /// Kind string of `id`.
    pub fn kind(&self, id: ModuleId) -> Option<&'static str> {
        self.slot(id).map(|s| s.module.kind())
    }

    /// Structural role of `id`.
    pub fn role(&self, id: ModuleId) -> Option<ModuleRole> {
        self.slot(id).map(|s| s.role)
    }

    /// Lifecycle state of `id`.
    pub fn state(&self, id: ModuleId) -> Option<ModuleState> {
        self.slot(id).map(|s| s.state)
    }

    /// Returns true if `id` is bypassed.
    pub fn is_bypassed(&self, id: ModuleId) -> bool {
        self.state(id) == Some(ModuleState::Bypassed)
    }

    /// Default modules survive removal of the module they feed.
    pub fn is_default(&self, id: ModuleId) -> bool {
        self.slot(id).is_some_and(|s| s.is_default)
    }

    /// Marks `id` as a default module.
    pub fn set_default(&mut self, id: ModuleId, is_default: bool) -> Result<()> {
        let slot = self.slot_mut(id).ok_or(ChainError::ModuleNotFound(id))?;
        slot.is_default = is_default;
        Ok(())
    }

    /// Audio input count of `id` (0 if unknown).
    pub fn ninputs(&self, id: ModuleId) -> usize {
        self.slot(id).map_or(0, |s| s.ports.audio_in.len())
    }

    /// Audio output count of `id` (0 if unknown).
    pub fn noutputs(&self, id: ModuleId) -> usize {
        self.slot(id).map_or(0, |s| s.ports.audio_out.len())
    }

    /// Port ids of `id`.
    pub fn ports_of(&self, id: ModuleId) -> Option<&ModulePorts> {
        self.slot(id).map(|s| &s.ports)
    }

    /// Looks up a port.
    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.arena.get(id)
    }

    /// The port arena.
    pub fn ports(&self) -> &PortArena {
        &self.arena
    }

    /// Number of scratch buffers currently allocated.
    pub fn scratch_len(&self) -> usize {
        self.scratch.count()
    }

    /// Modules removed as a side effect of other edits, waiting to be
    /// dropped outside the realtime lock.
    pub fn take_removed(&mut self) -> Vec<Box<dyn Module>> {
        std::mem::take(&mut self.graveyard)
    }

    fn roles(&self) -> Vec<ModuleRole> {
        self.order
            .iter()
            .map(|&id| self.slot(id).map_or(ModuleRole::Processor, |s| s.role))
            .collect()
    }

    fn width_before(&self, index: usize) -> usize {
        index
            .checked_sub(1)
            .and_then(|i| self.order.get(i))
            .map_or(0, |&id| self.noutputs(id))
    }

    fn kind_of(&self, id: ModuleId) -> &'static str {
        self.kind(id).unwrap_or("unknown")
    }

    // ── Width algebra ───────────────────────────────────────────────────

    /// Minimum scratch buffers the chain needs: the peak running width
    /// when `can_support_inputs` is chained from zero inputs at the head.
    pub fn required_buffers(&self) -> usize {
        let mut outs = 0;
        let mut peak = 0;
        for &id in &self.order {
            let Some(slot) = self.slot(id) else { continue };
            outs = slot
                .module
                .can_support_inputs(outs)
                .unwrap_or(slot.ports.audio_out.len());
            peak = peak.max(outs);
        }
        peak
    }

    /// Replays `can_support_inputs` over `ids` starting from `width`.
    /// Returns the width leaving the last one.
    fn replay(&self, ids: &[ModuleId], mut width: usize) -> Result<usize> {
        for &id in ids {
            let slot = self.slot(id).ok_or(ChainError::ModuleNotFound(id))?;
            width = slot
                .module
                .can_support_inputs(width)
                .ok_or_else(|| ChainError::rejected(slot.module.kind(), width))?;
        }
        Ok(width)
    }

    /// Dry run: would every module after `id` accept it producing `n`
    /// outputs? Never mutates.
    pub fn can_configure_outputs(&self, id: ModuleId, n: usize) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };
        if self
            .order
            .get(pos + 1)
            .is_none_or(|&next| self.ninputs(next) == n)
        {
            return true;
        }
        self.replay(&self.order[pos + 1..], n).is_ok()
    }

    // ── Binding ─────────────────────────────────────────────────────────

    fn bind_module(&mut self, mut module: Box<dyn Module>) -> Result<ModuleId> {
        let id = ModuleId(self.slots.next_key());
        let mut ports = ModulePorts::default();
        let bound = {
            let mut layout = PortLayout::new(
                id,
                &mut self.arena,
                &mut ports,
                self.ctx.backend(),
                self.ctx.nframes(),
                &self.name,
            );
            module.bind(&self.ctx, &mut layout)
        };
        let role = module.role();
        self.slots.insert(ModuleSlot {
            module,
            ports,
            state: ModuleState::Bound,
            role,
            is_default: false,
            latency: [LatencyRange::ZERO; 2],
        });
        if let Err(e) = bound {
            self.release(id);
            return Err(e.into());
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("chain_bind: {} as {id}", self.kind_of(id));
        Ok(id)
    }

    fn configure_slot_inputs(&mut self, id: ModuleId, n: usize) -> bool {
        let Some(slot) = self.slots.get_mut(id.0) else {
            return false;
        };
        let mut layout = PortLayout::new(
            id,
            &mut self.arena,
            &mut slot.ports,
            self.ctx.backend(),
            self.ctx.nframes(),
            &self.name,
        );
        slot.module.configure_inputs(n, &mut layout)
    }

    fn configure_slot_outputs(&mut self, id: ModuleId, n: usize) -> bool {
        let Some(slot) = self.slots.get_mut(id.0) else {
            return false;
        };
        let mut layout = PortLayout::new(
            id,
            &mut self.arena,
            &mut slot.ports,
            self.ctx.backend(),
            self.ctx.nframes(),
            &self.name,
        );
        slot.module.configure_outputs(n, &mut layout)
    }

    /// Re-feeds every module from `from` to the tail with its upstream width.
    fn cascade(&mut self, from: usize, journal: &mut Vec<Change>) -> Result<()> {
        for i in from..self.order.len() {
            let id = self.order[i];
            let width = self.width_before(i);
            journal.push(Change::Inputs {
                id,
                previous: self.ninputs(id),
            });
            if !self.configure_slot_inputs(id, width) {
                return Err(ChainError::rejected(self.kind_of(id), width));
            }
        }
        Ok(())
    }

    fn force_outputs(
        &mut self,
        over: WidthOverride,
        journal: &mut Vec<Change>,
    ) -> Result<()> {
        let id = self.order[over.index];
        journal.push(Change::Outputs {
            id,
            previous: self.noutputs(id),
        });
        if !self.configure_slot_outputs(id, over.outputs) {
            return Err(ChainError::rejected(self.kind_of(id), over.outputs));
        }
        Ok(())
    }

    fn rollback(&mut self, journal: Vec<Change>) {
        for change in journal.into_iter().rev() {
            let restored = match change {
                Change::Inputs { id, previous } => self.configure_slot_inputs(id, previous),
                Change::Outputs { id, previous } => self.configure_slot_outputs(id, previous),
            };
            if !restored {
                #[cfg(feature = "tracing")]
                tracing::warn!("chain_rollback: {change:?} could not be restored");
            }
        }
        if let Err(_e) = self.finish_ports() {
            #[cfg(feature = "tracing")]
            tracing::warn!("chain_rollback: reconfigure failed: {_e}");
        }
    }

    // ── Structural edits ────────────────────────────────────────────────

    /// Inserts `module` in front of `before`, or at the tail when `before`
    /// is `None`.
    ///
    /// The whole downstream cascade is validated before anything changes.
    /// On `Err` the chain is unchanged and the module is dropped.
    pub fn insert(
        &mut self,
        before: Option<ModuleId>,
        module: Box<dyn Module>,
    ) -> Result<ModuleId> {
        let index = match before {
            None => self.order.len(),
            Some(b) => self.position(b).ok_or(ChainError::ModuleNotFound(b))?,
        };

        let over = self.policy.plan_insert(&self.roles(), index, module.role())?;
        let upstream = match over {
            Some(o) if o.index < index => {
                self.replay(&self.order[o.index + 1..index], o.outputs)?
            }
            _ => self.width_before(index),
        };
        let outs = module
            .can_support_inputs(upstream)
            .ok_or_else(|| ChainError::rejected(module.kind(), upstream))?;
        self.replay(&self.order[index..], outs)?;

        let id = self.bind_module(module)?;
        let mut journal = Vec::new();
        if let Err(e) = self.apply_insert(id, index, upstream, over, &mut journal) {
            self.order.retain(|&m| m != id);
            let _ = self.release(id);
            self.rollback(journal);
            #[cfg(feature = "tracing")]
            tracing::debug!("chain_insert: rolled back: {e}");
            return Err(e);
        }

        if let Some(slot) = self.slot_mut(id) {
            slot.activate();
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "chain_insert: {} at {index}, required_buffers={}",
            self.kind_of(id),
            self.required_buffers()
        );
        if let Some(obs) = self.observer.as_mut() {
            obs.module_inserted(id, index);
        }
        Ok(id)
    }

    fn apply_insert(
        &mut self,
        id: ModuleId,
        index: usize,
        upstream: usize,
        over: Option<WidthOverride>,
        journal: &mut Vec<Change>,
    ) -> Result<()> {
        if let Some(o) = over.filter(|o| o.index < index) {
            self.force_outputs(o, journal)?;
            for i in o.index + 1..index {
                let m = self.order[i];
                let width = self.width_before(i);
                journal.push(Change::Inputs {
                    id: m,
                    previous: self.ninputs(m),
                });
                if !self.configure_slot_inputs(m, width) {
                    return Err(ChainError::rejected(self.kind_of(m), width));
                }
            }
        }
        if !self.configure_slot_inputs(id, upstream) {
            return Err(ChainError::rejected(self.kind_of(id), upstream));
        }
        self.order.insert(index, id);
        self.cascade(index + 1, journal)?;
        self.configure_ports()
    }

    /// Removes `id` from the chain and hands the module back.
    ///
    /// Its ports are disconnected first. Non-default controllers that fed
    /// only this module are destroyed too (collect them with
    /// [`take_removed`](Self::take_removed)); indicators it fed stay bound
    /// but lose their link.
    pub fn remove(&mut self, id: ModuleId) -> Result<Box<dyn Module>> {
        let Some(index) = self.position(id) else {
            if self.slot(id).is_some_and(|s| s.role.is_satellite()) {
                return self.remove_satellite(id);
            }
            return Err(ChainError::ModuleNotFound(id));
        };

        let over = self.policy.plan_remove(&self.roles(), index)?;
        let upstream = match over {
            Some(o) if o.index < index => {
                self.replay(&self.order[o.index + 1..index], o.outputs)?
            }
            _ => self.width_before(index),
        };
        if !self.can_configure_outputs(id, upstream) {
            let next = self.order[index + 1..]
                .first()
                .map_or("unknown", |&m| self.kind_of(m));
            return Err(ChainError::rejected(next, upstream));
        }

        let mut journal = Vec::new();
        self.order.remove(index);
        let applied = match over.filter(|o| o.index < index) {
            Some(o) => self
                .force_outputs(o, &mut journal)
                .and_then(|()| self.cascade(o.index + 1, &mut journal)),
            None => self.cascade(index, &mut journal),
        }
        .and_then(|()| self.configure_ports());
        if let Err(e) = applied {
            self.order.insert(index, id);
            self.rollback(journal);
            return Err(e);
        }

        let feeders = self.sole_feeders(id);
        let mut slot = self
            .release(id)
            .ok_or(ChainError::ModuleNotFound(id))?;
        if slot.state == ModuleState::Active {
            slot.module.deactivate();
        }
        slot.state = ModuleState::Removed;
        for c in feeders {
            if let Some(s) = self.release(c) {
                self.graveyard.push(s.module);
            }
        }
        self.build_process_queue();

        #[cfg(feature = "tracing")]
        tracing::debug!("chain_remove: {} from {index}", slot.module.kind());
        if let Some(obs) = self.observer.as_mut() {
            obs.module_removed(id);
        }
        Ok(slot.module)
    }

    /// Forces the output width of `id` (adapters only), re-feeding
    /// everything downstream.
    pub fn configure_outputs(&mut self, id: ModuleId, n: usize) -> Result<()> {
        let index = self.position(id).ok_or(ChainError::ModuleNotFound(id))?;
        if !self.can_configure_outputs(id, n) {
            let next = self.order[index + 1..]
                .first()
                .map_or("unknown", |&m| self.kind_of(m));
            return Err(ChainError::rejected(next, n));
        }
        let mut journal = Vec::new();
        let applied = self
            .force_outputs(WidthOverride { index, outputs: n }, &mut journal)
            .and_then(|()| self.cascade(index + 1, &mut journal))
            .and_then(|()| self.configure_ports());
        if let Err(e) = applied {
            self.rollback(journal);
            return Err(e);
        }
        Ok(())
    }

    /// Re-feeds the whole signal path from the head, resizes the scratch
    /// pool to [`required_buffers`](Self::required_buffers), rebuilds the
    /// process queue and propagates latency in both directions.
    ///
    /// The re-feed is journaled: if a module refuses its upstream width the
    /// widths already changed are put back before the error is returned.
    pub fn configure_ports(&mut self) -> Result<()> {
        let mut journal = Vec::new();
        let applied = self
            .cascade(0, &mut journal)
            .and_then(|()| self.finish_ports());
        if let Err(e) = applied {
            self.rollback(journal);
            return Err(e);
        }
        Ok(())
    }

    fn finish_ports(&mut self) -> Result<()> {
        let required = self.required_buffers();
        self.scratch.resize(required)?;
        self.build_process_queue();
        self.set_latency(Direction::Input);
        self.set_latency(Direction::Output);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "chain_configure: {} modules, {required} scratch buffers, {} queued",
            self.order.len(),
            self.queue.len()
        );
        if let Some(obs) = self.observer.as_mut() {
            obs.ports_configured(required);
        }
        Ok(())
    }

    /// Hands `entry` to the module's own [`Module::set`] and brings its
    /// ports in line with what it then reports for its current inputs.
    ///
    /// A setting that changes the output width is validated like
    /// [`configure_outputs`](Self::configure_outputs). On `Err` the
    /// module's previous settings (as written by [`Module::get`]) are put
    /// back and every width is restored.
    pub(crate) fn apply_settings(&mut self, id: ModuleId, entry: &LogEntry) -> Result<()> {
        let slot = self.slot_mut(id).ok_or(ChainError::ModuleNotFound(id))?;
        let mut previous = LogEntry::new();
        slot.module.get(&mut previous);
        slot.module.set(entry);

        let mut journal = Vec::new();
        if let Err(e) = self.refit_module(id, &mut journal) {
            if let Some(slot) = self.slot_mut(id) {
                slot.module.set(&previous);
            }
            if !journal.is_empty() {
                self.rollback(journal);
            }
            #[cfg(feature = "tracing")]
            tracing::debug!("chain_settings: {} rejected: {e}", self.kind_of(id));
            return Err(e);
        }
        Ok(())
    }

    fn refit_module(&mut self, id: ModuleId, journal: &mut Vec<Change>) -> Result<()> {
        let Some(index) = self.position(id) else {
            return Ok(());
        };
        let inputs = self.ninputs(id);
        let slot = self.slot(id).ok_or(ChainError::ModuleNotFound(id))?;
        let outputs = slot
            .module
            .can_support_inputs(inputs)
            .ok_or_else(|| ChainError::rejected(slot.module.kind(), inputs))?;
        if outputs == self.noutputs(id) {
            return Ok(());
        }
        if !self.can_configure_outputs(id, outputs) {
            let next = self.order[index + 1..]
                .first()
                .map_or("unknown", |&m| self.kind_of(m));
            return Err(ChainError::rejected(next, outputs));
        }

        self.refit_outputs(index, inputs, outputs, journal)?;
        self.cascade(index + 1, journal)?;
        self.finish_ports()?;
        #[cfg(feature = "tracing")]
        tracing::debug!("chain_refit: {} now has {outputs} outputs", self.kind_of(id));
        Ok(())
    }

    fn refit_outputs(
        &mut self,
        index: usize,
        inputs: usize,
        outputs: usize,
        journal: &mut Vec<Change>,
    ) -> Result<()> {
        let id = self.order[index];
        if self.role(id) == Some(ModuleRole::IoAdapter) {
            return self.force_outputs(WidthOverride { index, outputs }, journal);
        }
        journal.push(Change::Inputs {
            id,
            previous: inputs,
        });
        if !self.configure_slot_inputs(id, inputs) || self.noutputs(id) != outputs {
            return Err(ChainError::rejected(self.kind_of(id), inputs));
        }
        Ok(())
    }

    /// Moves `id` between Active and Bypassed.
    pub fn set_bypass(&mut self, id: ModuleId, bypassed: bool) -> Result<()> {
        let slot = self.slot_mut(id).ok_or(ChainError::ModuleNotFound(id))?;
        let changed = match (slot.state, bypassed) {
            (ModuleState::Bypassed, false) | (ModuleState::Bound, false) => {
                slot.activate();
                true
            }
            (ModuleState::Active, true) | (ModuleState::Bound, true) => {
                slot.deactivate();
                true
            }
            _ => false,
        };
        if changed && let Some(obs) = self.observer.as_mut() {
            obs.bypass_changed(id, bypassed);
        }
        Ok(())
    }

    /// Changes the period size and reconfigures. On `Err` the previous
    /// period size is back in place.
    pub fn set_buffer_size(&mut self, nframes: usize) -> Result<()> {
        let previous = self.nframes();
        self.apply_nframes(nframes)?;
        if let Err(e) = self.configure_ports() {
            self.restore(|chain| chain.apply_nframes(previous));
            return Err(e);
        }
        Ok(())
    }

    fn apply_nframes(&mut self, nframes: usize) -> Result<()> {
        self.scratch.set_nframes(nframes)?;
        self.ctx.set_nframes(nframes);
        for port in self.arena.iter_mut() {
            if port.external.is_some() {
                port.frames.clear();
                port.frames.resize(nframes, 0.0);
            }
        }
        for slot in self.slots.values_mut() {
            slot.module.set_buffer_size(nframes);
        }
        Ok(())
    }

    /// Changes the sample rate and reconfigures. On `Err` the previous
    /// rate is back in place.
    pub fn set_sample_rate(&mut self, sample_rate: u32) -> Result<()> {
        let previous = self.sample_rate();
        self.apply_sample_rate(sample_rate);
        if let Err(e) = self.configure_ports() {
            self.restore(|chain| {
                chain.apply_sample_rate(previous);
                Ok(())
            });
            return Err(e);
        }
        Ok(())
    }

    fn apply_sample_rate(&mut self, sample_rate: u32) {
        self.ctx.set_sample_rate(sample_rate);
        for slot in self.slots.values_mut() {
            slot.module.set_sample_rate(sample_rate);
        }
    }

    /// Puts a setting back after a failed reconfigure and rebinds.
    fn restore(&mut self, undo: impl FnOnce(&mut Self) -> Result<()>) {
        if let Err(_e) = undo(self).and_then(|()| self.finish_ports()) {
            #[cfg(feature = "tracing")]
            tracing::warn!("chain_restore: {_e}");
        }
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<&str> = self.order.iter().map(|&id| self.kind_of(id)).collect();
        f.debug_struct("Chain")
            .field("name", &self.name)
            .field("modules", &kinds)
            .field("scratch", &self.scratch.count())
            .field("queue", &self.queue.len())
            .finish_non_exhaustive()
    }
}
