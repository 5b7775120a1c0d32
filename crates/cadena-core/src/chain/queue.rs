//! Process queue construction and the per-period walk.
//!
//! The queue is the signal path with satellites spliced in: every controller
//! feeding a module's control inputs runs just before it, every indicator
//! reading its control outputs just after. Each module appears at most once.

use super::Chain;
use crate::context::ProcessContext;
use crate::module::{ModuleId, ModuleRole, ModuleState};
use crate::port::PortId;

impl Chain {
    /// Rebuilds the process queue from the signal path and control links,
    /// then rebinds audio ports to scratch slots. Idempotent.
    pub fn build_process_queue(&mut self) {
        let mut queue = std::mem::take(&mut self.queue);
        queue.clear();

        for &id in &self.order {
            let Some(slot) = self.slot(id) else { continue };
            for owner in self.peers_with_role(&slot.ports.control_in, ModuleRole::Controller) {
                if !queue.contains(&owner) {
                    queue.push(owner);
                }
            }
            if !queue.contains(&id) {
                queue.push(id);
            }
            for owner in self.peers_with_role(&slot.ports.control_out, ModuleRole::Indicator) {
                if !queue.contains(&owner) {
                    queue.push(owner);
                }
            }
        }

        self.queue = queue;
        self.bind_buffers();
    }

    fn peers_with_role<'a>(
        &'a self,
        ports: &'a [PortId],
        role: ModuleRole,
    ) -> impl Iterator<Item = ModuleId> + 'a {
        ports
            .iter()
            .filter_map(|&p| self.arena.get(p))
            .flat_map(|p| p.connections.iter())
            .filter_map(|&peer| self.arena.get(peer).map(|p| p.owner()))
            .filter(move |&owner| self.role(owner) == Some(role))
    }

    /// Binds audio input `j` and output `j` of every in-path module to
    /// scratch slot `j`.
    fn bind_buffers(&mut self) {
        let count = self.scratch.count();
        let Self {
            order,
            slots,
            arena,
            ..
        } = self;
        for &id in order.iter() {
            let Some(slot) = slots.get_mut(id.0) else {
                continue;
            };
            for list in [&slot.ports.audio_in, &slot.ports.audio_out] {
                for (j, &port) in list.iter().enumerate() {
                    if let Some(p) = arena.get_mut(port) {
                        p.buffer = (j < count).then_some(j);
                    }
                }
            }
            slot.module.handle_port_connection_change();
        }
    }

    /// Modules in execution order.
    pub fn process_queue(&self) -> &[ModuleId] {
        &self.queue
    }

    /// Runs one period through the queue. Active modules run their body,
    /// bypassed ones their bypass path; bound modules are skipped.
    ///
    /// `nframes` is clamped to the scratch pool's period size. Never
    /// allocates.
    pub fn process(&mut self, nframes: usize) {
        let nframes = nframes.min(self.scratch.nframes());
        let transport = self.ctx.backend().transport_query();
        let Self {
            queue,
            slots,
            scratch,
            arena,
            ..
        } = self;
        for &id in queue.iter() {
            let Some(slot) = slots.get_mut(id.0) else {
                continue;
            };
            let mut ctx = ProcessContext::new(nframes, transport, scratch, arena, &slot.ports);
            match slot.state {
                ModuleState::Active => slot.module.process(&mut ctx),
                ModuleState::Bypassed => slot.module.process_bypassed(&mut ctx),
                ModuleState::Bound | ModuleState::Removed => {}
            }
        }
    }

    /// Number of external capture channels: aux inputs of the signal path.
    pub fn external_inputs(&self) -> usize {
        self.order
            .iter()
            .filter_map(|&id| self.slot(id))
            .map(|s| s.ports.aux_in.len())
            .sum()
    }

    /// Number of external playback channels: aux outputs of the signal path.
    pub fn external_outputs(&self) -> usize {
        self.order
            .iter()
            .filter_map(|&id| self.slot(id))
            .map(|s| s.ports.aux_out.len())
            .sum()
    }

    /// Fills every external capture channel, numbered head to tail.
    pub fn write_external_inputs(&mut self, mut fill: impl FnMut(usize, &mut [f32])) {
        let Self {
            order,
            slots,
            arena,
            ..
        } = self;
        let mut channel = 0;
        for &id in order.iter() {
            let Some(slot) = slots.get(id.0) else {
                continue;
            };
            for &port in &slot.ports.aux_in {
                if let Some(p) = arena.get_mut(port) {
                    fill(channel, &mut p.frames);
                }
                channel += 1;
            }
        }
    }

    /// Reads every external playback channel, numbered head to tail.
    pub fn read_external_outputs(&self, mut read: impl FnMut(usize, &[f32])) {
        let mut channel = 0;
        for &id in &self.order {
            let Some(slot) = self.slot(id) else { continue };
            for &port in &slot.ports.aux_out {
                if let Some(p) = self.arena.get(port) {
                    read(channel, &p.frames);
                }
                channel += 1;
            }
        }
    }
}
