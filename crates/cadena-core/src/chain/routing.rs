//! Control and aux links, control values and satellites.

use super::Chain;
use super::ModuleSlot;
use crate::control::ControlHandle;
use crate::error::{ChainError, Result};
use crate::layout::Controls;
use crate::module::{Module, ModuleId, ModuleRole, ModuleState};
use crate::port::{Direction, PortId, PortKind};

impl Chain {
    // ── Links ───────────────────────────────────────────────────────────

    /// Links two control or aux ports. Order does not matter; the output
    /// end is worked out from the port directions.
    ///
    /// Aux links are made in the backend first and only recorded when the
    /// backend accepts them.
    pub fn connect(&mut self, a: PortId, b: PortId) -> Result<()> {
        let (out, inp) = self
            .arena
            .check_link(a, b)
            .map_err(|reason| ChainError::ConnectionRejected {
                from: a,
                to: b,
                reason,
            })?;

        let kind = self.arena.get(out).map(|p| p.kind());
        if kind == Some(PortKind::AuxAudio) {
            let ext = |id| self.arena.get(id).and_then(|p| p.external());
            if let (Some(eo), Some(ei)) = (ext(out), ext(inp)) {
                self.ctx.backend().connect(eo, ei)?;
            }
        }
        self.arena.link(out, inp);
        if kind == Some(PortKind::Control) {
            self.build_process_queue();
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("chain_connect: {out} → {inp}");
        Ok(())
    }

    /// Removes every link of `port`.
    pub fn disconnect(&mut self, port: PortId) -> Result<()> {
        let peers = self
            .arena
            .get(port)
            .ok_or(ChainError::PortNotFound(port))?
            .connections()
            .to_vec();
        let mut touched = Vec::new();
        for peer in peers {
            self.unlink_external(port, peer);
            touched.extend(self.arena.unlink(port, peer));
        }
        self.finish_unlink(&touched);
        Ok(())
    }

    /// Removes the link between `a` and `b`, if any.
    pub fn disconnect_pair(&mut self, a: PortId, b: PortId) -> Result<()> {
        for id in [a, b] {
            self.arena.get(id).ok_or(ChainError::PortNotFound(id))?;
        }
        self.unlink_external(a, b);
        let touched = self.arena.unlink(a, b);
        self.finish_unlink(&touched);
        Ok(())
    }

    fn unlink_external(&self, a: PortId, b: PortId) {
        let (Some(pa), Some(pb)) = (self.arena.get(a), self.arena.get(b)) else {
            return;
        };
        if pa.kind() != PortKind::AuxAudio || !pa.connections().contains(&b) {
            return;
        }
        if let (Some(ea), Some(eb)) = (pa.external(), pb.external()) {
            let (eo, ei) = match pa.direction() {
                Direction::Output => (ea, eb),
                Direction::Input => (eb, ea),
            };
            self.ctx.backend().disconnect(eo, ei);
        }
    }

    fn finish_unlink(&mut self, touched: &[PortId]) {
        if touched.is_empty() {
            return;
        }
        self.notify_disconnects(touched);
        self.build_process_queue();
    }

    /// Dispatches `handle_control_disconnect` to the owners of every control
    /// input in `touched`.
    fn notify_disconnects(&mut self, touched: &[PortId]) {
        let Self { slots, arena, .. } = self;
        for &port in touched {
            let Some(p) = arena.get(port) else { continue };
            if p.kind() != PortKind::Control || p.direction() != Direction::Input {
                continue;
            }
            let (owner, index) = (p.owner(), p.index());
            if let Some(slot) = slots.get_mut(owner.0) {
                let controls = Controls::new(arena, &slot.ports);
                slot.module.handle_control_disconnect(index, &controls);
            }
        }
    }

    // ── Control values ──────────────────────────────────────────────────

    /// Control input of `id` called `name`.
    pub fn control_input(&self, id: ModuleId, name: &str) -> Option<PortId> {
        self.find_control(id, Direction::Input, name)
    }

    /// Control output of `id` called `name`.
    pub fn control_output(&self, id: ModuleId, name: &str) -> Option<PortId> {
        self.find_control(id, Direction::Output, name)
    }

    fn find_control(&self, id: ModuleId, direction: Direction, name: &str) -> Option<PortId> {
        self.slot(id)?
            .ports
            .list(PortKind::Control, direction)
            .iter()
            .copied()
            .find(|&p| self.arena.get(p).is_some_and(|p| p.name() == name))
    }

    fn control_port(&self, port: PortId) -> Result<&crate::port::Port> {
        self.arena
            .get(port)
            .filter(|p| p.kind() == PortKind::Control)
            .ok_or(ChainError::PortNotFound(port))
    }

    /// Current value of a control port.
    pub fn control_value(&self, port: PortId) -> Option<f32> {
        self.control_port(port).ok().map(|p| p.control_value())
    }

    /// Writes a control port and tells the owning module about it.
    pub fn set_control_value(&mut self, port: PortId, value: f32) -> Result<()> {
        let p = self.control_port(port)?;
        p.set_control_value_no_callback(value);
        let (owner, index, stored) = (p.owner(), p.index(), p.control_value());
        if p.direction() == Direction::Input
            && let Some(slot) = self.slot_mut(owner)
        {
            slot.module.handle_control_changed(index, stored);
        }
        Ok(())
    }

    /// Writes a control port without any module callback.
    pub fn set_control_value_no_callback(&self, port: PortId, value: f32) -> Result<()> {
        self.control_port(port)?.set_control_value_no_callback(value);
        Ok(())
    }

    /// Cross-thread handle onto a control port.
    ///
    /// The handle follows later connects and disconnects, so writes always
    /// land where [`set_control_value_no_callback`] would put them.
    ///
    /// [`set_control_value_no_callback`]: Self::set_control_value_no_callback
    pub fn control_handle(&self, port: PortId) -> Option<ControlHandle> {
        self.control_port(port).ok().map(|p| p.control_handle())
    }

    // ── Satellites ──────────────────────────────────────────────────────

    /// Binds a controller and links its first control output to `target`,
    /// a control input of a bound module.
    pub fn add_controller(
        &mut self,
        controller: Box<dyn Module>,
        target: PortId,
    ) -> Result<ModuleId> {
        self.add_satellite(controller, ModuleRole::Controller, target, Direction::Input)
    }

    /// Binds an indicator and links its first control input to `source`,
    /// a control output of a bound module.
    pub fn add_indicator(&mut self, indicator: Box<dyn Module>, source: PortId) -> Result<ModuleId> {
        self.add_satellite(indicator, ModuleRole::Indicator, source, Direction::Output)
    }

    fn add_satellite(
        &mut self,
        module: Box<dyn Module>,
        role: ModuleRole,
        peer: PortId,
        peer_direction: Direction,
    ) -> Result<ModuleId> {
        let kind = module.kind();
        if module.role() != role {
            return Err(ChainError::rejected(kind, 0));
        }
        let peer_ok = self
            .arena
            .get(peer)
            .is_some_and(|p| p.kind() == PortKind::Control && p.direction() == peer_direction);
        if !peer_ok {
            return Err(ChainError::PortNotFound(peer));
        }

        let id = self.bind_module(module)?;
        if !self.configure_slot_inputs(id, 0) {
            let _ = self.release(id);
            return Err(ChainError::rejected(kind, 0));
        }
        let own = self.slot(id).and_then(|s| {
            s.ports
                .list(PortKind::Control, peer_direction.opposite())
                .first()
                .copied()
        });
        let linked = match own {
            Some(own) => self.connect(own, peer),
            None => Err(ChainError::rejected(kind, 0)),
        };
        if let Err(e) = linked {
            let _ = self.release(id);
            return Err(e);
        }

        if let Some(slot) = self.slot_mut(id) {
            slot.activate();
        }
        self.build_process_queue();
        #[cfg(feature = "tracing")]
        tracing::debug!("chain_satellite: {kind} as {id}");
        if let Some(obs) = self.observer.as_mut() {
            obs.satellite_added(id);
        }
        Ok(id)
    }

    /// Unbinds a controller or indicator and hands it back.
    pub fn remove_satellite(&mut self, id: ModuleId) -> Result<Box<dyn Module>> {
        if !self.slot(id).is_some_and(|s| s.role.is_satellite()) || self.position(id).is_some() {
            return Err(ChainError::ModuleNotFound(id));
        }
        let mut slot = self.release(id).ok_or(ChainError::ModuleNotFound(id))?;
        if slot.state == ModuleState::Active {
            slot.module.deactivate();
        }
        slot.state = ModuleState::Removed;
        self.build_process_queue();
        if let Some(obs) = self.observer.as_mut() {
            obs.module_removed(id);
        }
        Ok(slot.module)
    }

    /// Non-default controllers whose every control link ends at `id`.
    pub(super) fn sole_feeders(&self, id: ModuleId) -> Vec<ModuleId> {
        let Some(slot) = self.slot(id) else {
            return Vec::new();
        };
        let mut feeders = Vec::new();
        for &input in &slot.ports.control_in {
            let Some(port) = self.arena.get(input) else { continue };
            for &peer in port.connections() {
                let Some(owner) = self.arena.get(peer).map(|p| p.owner()) else {
                    continue;
                };
                let Some(c) = self.slot(owner) else { continue };
                if c.role != ModuleRole::Controller || c.is_default || feeders.contains(&owner) {
                    continue;
                }
                let only_here = c
                    .ports
                    .control_out
                    .iter()
                    .filter_map(|&o| self.arena.get(o))
                    .flat_map(|o| o.connections().iter())
                    .all(|&t| self.arena.get(t).is_some_and(|t| t.owner() == id));
                if only_here {
                    feeders.push(owner);
                }
            }
        }
        feeders
    }

    /// Unbinds `id`: unregisters its aux ports, frees every port and tells
    /// the owners of control inputs that lost a driver.
    pub(super) fn release(&mut self, id: ModuleId) -> Option<ModuleSlot> {
        let slot = self.slots.remove(id.0)?;
        self.order.retain(|&m| m != id);
        self.queue.retain(|&m| m != id);

        let mut touched = Vec::new();
        for port in slot.ports.all() {
            if let Some(ext) = self.arena.get(port).and_then(|p| p.external()) {
                self.ctx.backend().unregister_port(ext);
            }
            for t in self.arena.free(port) {
                if !touched.contains(&t) {
                    touched.push(t);
                }
            }
        }
        self.notify_disconnects(&touched);
        #[cfg(feature = "tracing")]
        tracing::debug!("chain_release: {} ({id})", slot.module.kind());
        Some(slot)
    }
}
