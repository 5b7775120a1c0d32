//! Latency propagation along the signal path.
//!
//! Capture latency ([`Direction::Input`]) is walked head to tail, playback
//! latency ([`Direction::Output`]) tail to head. At each module:
//!
//! 1. The window reported by the backend for the module's aux ports facing
//!    the walk is read. A non-zero window replaces the running base and
//!    resets the accumulated module latency.
//! 2. The module's intrinsic latency is added.
//! 3. `base + added` is published on the aux ports facing the other way.

use super::Chain;
use crate::backend::LatencyRange;
use crate::module::ModuleId;
use crate::port::{Direction, PortId};

impl Chain {
    /// Recomputes latency in `direction` and returns the chain total.
    pub fn set_latency(&mut self, direction: Direction) -> LatencyRange {
        let ids: Vec<ModuleId> = match direction {
            Direction::Input => self.order.clone(),
            Direction::Output => self.order.iter().rev().copied().collect(),
        };

        let mut base = LatencyRange::ZERO;
        let mut added = 0u32;
        for id in ids {
            let Some(slot) = self.slot(id) else { continue };
            let (facing, opposite) = match direction {
                Direction::Input => (&slot.ports.aux_in, &slot.ports.aux_out),
                Direction::Output => (&slot.ports.aux_out, &slot.ports.aux_in),
            };

            let window = self.external_window(facing, direction);
            if !window.is_zero() {
                base = window;
                added = 0;
            }
            added = added.saturating_add(slot.module.latency());
            let total = base.offset(added);

            let backend = self.ctx.backend();
            for &port in opposite {
                if let Some(ext) = self.arena.get(port).and_then(|p| p.external()) {
                    backend.set_port_latency(ext, direction, total);
                }
            }
            if let Some(slot) = self.slot_mut(id) {
                slot.latency[direction.slot()] = total;
            }
        }

        let total = base.offset(added);
        self.latency[direction.slot()] = total;
        #[cfg(feature = "tracing")]
        tracing::debug!("chain_latency: {direction:?} {total}");
        total
    }

    /// Widened backend window over `ports`; zero if none report one.
    fn external_window(&self, ports: &[PortId], direction: Direction) -> LatencyRange {
        let backend = self.ctx.backend();
        ports
            .iter()
            .filter_map(|&p| self.arena.get(p).and_then(|p| p.external()))
            .map(|ext| backend.port_latency(ext, direction))
            .filter(|r| !r.is_zero())
            .reduce(LatencyRange::widen)
            .unwrap_or(LatencyRange::ZERO)
    }

    /// Chain latency in `direction` as of the last configuration.
    pub fn latency(&self, direction: Direction) -> LatencyRange {
        self.latency[direction.slot()]
    }

    /// Accumulated latency at `id` in `direction`.
    pub fn module_latency(&self, id: ModuleId, direction: Direction) -> Option<LatencyRange> {
        self.slot(id).map(|s| s.latency[direction.slot()])
    }
}
