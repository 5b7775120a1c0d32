//! Realtime view handed to [`Module::process`](crate::Module::process).
//!
//! Channel `j` resolves to the scratch slot bound to audio output `j`, or
//! to audio input `j` when the module has fewer outputs. Since the chain
//! binds input `j` and output `j` to the same slot, a module that reads
//! channel `j` and writes channel `j` is processing in place.
//!
//! Nothing here allocates or locks. Unbound channels resolve to empty
//! slices so a module that runs before its first configuration does
//! nothing rather than panicking.

use crate::backend::Transport;
use crate::buffer::ScratchPool;
use crate::layout::ModulePorts;
use crate::port::{PortArena, PortId};

/// Per-period processing context for one module.
pub struct ProcessContext<'a> {
    nframes: usize,
    transport: Transport,
    scratch: &'a mut ScratchPool,
    arena: &'a mut PortArena,
    ports: &'a ModulePorts,
}

impl<'a> ProcessContext<'a> {
    pub(crate) fn new(
        nframes: usize,
        transport: Transport,
        scratch: &'a mut ScratchPool,
        arena: &'a mut PortArena,
        ports: &'a ModulePorts,
    ) -> Self {
        Self {
            nframes,
            transport,
            scratch,
            arena,
            ports,
        }
    }

    /// Frames to process this period.
    #[inline]
    pub fn nframes(&self) -> usize {
        self.nframes
    }

    /// Transport state for this period.
    #[inline]
    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Audio input count.
    #[inline]
    pub fn inputs(&self) -> usize {
        self.ports.audio_in.len()
    }

    /// Audio output count.
    #[inline]
    pub fn outputs(&self) -> usize {
        self.ports.audio_out.len()
    }

    /// Number of addressable channels, `max(inputs, outputs)`.
    #[inline]
    pub fn channels(&self) -> usize {
        self.inputs().max(self.outputs())
    }

    fn slot_of(&self, id: Option<&PortId>) -> Option<usize> {
        id.and_then(|&id| self.arena.get(id))
            .and_then(|p| p.buffer)
            .filter(|&slot| slot < self.scratch.count())
    }

    fn channel_slot(&self, j: usize) -> Option<usize> {
        self.slot_of(self.ports.audio_out.get(j))
            .or_else(|| self.slot_of(self.ports.audio_in.get(j)))
    }

    /// Samples of channel `j`.
    #[inline]
    pub fn channel(&self, j: usize) -> &[f32] {
        match self.channel_slot(j) {
            Some(slot) => &self.scratch.get(slot)[..self.nframes],
            None => &[],
        }
    }

    /// Mutable samples of channel `j`.
    #[inline]
    pub fn channel_mut(&mut self, j: usize) -> &mut [f32] {
        match self.channel_slot(j) {
            Some(slot) => &mut self.scratch.get_mut(slot)[..self.nframes],
            None => &mut [],
        }
    }

    /// Two distinct channels, both mutable.
    pub fn channel_pair_mut(&mut self, a: usize, b: usize) -> Option<(&mut [f32], &mut [f32])> {
        let (sa, sb) = (self.channel_slot(a)?, self.channel_slot(b)?);
        let n = self.nframes;
        self.scratch
            .pair_mut(sa, sb)
            .map(|(x, y)| (&mut x[..n], &mut y[..n]))
    }

    fn control(&self, id: Option<&PortId>) -> f32 {
        id.and_then(|&id| self.arena.get(id))
            .map_or(0.0, |p| p.control_value())
    }

    /// Value of control input `i`.
    #[inline]
    pub fn control_input(&self, i: usize) -> f32 {
        self.control(self.ports.control_in.get(i))
    }

    /// Value of control output `i`.
    #[inline]
    pub fn control_output(&self, i: usize) -> f32 {
        self.control(self.ports.control_out.get(i))
    }

    /// Writes control output `i`.
    #[inline]
    pub fn set_control_output(&self, i: usize, value: f32) {
        if let Some(p) = self
            .ports
            .control_out
            .get(i)
            .and_then(|&id| self.arena.get(id))
        {
            p.set_control_value_no_callback(value);
        }
    }

    /// Aux input count.
    pub fn aux_inputs(&self) -> usize {
        self.ports.aux_in.len()
    }

    /// Aux output count.
    pub fn aux_outputs(&self) -> usize {
        self.ports.aux_out.len()
    }

    /// Frames of aux input `i`.
    pub fn aux_input(&self, i: usize) -> &[f32] {
        match self.ports.aux_in.get(i).and_then(|&id| self.arena.get(id)) {
            Some(p) => &p.frames[..self.nframes.min(p.frames.len())],
            None => &[],
        }
    }

    /// Mutable frames of aux output `i`.
    pub fn aux_output_mut(&mut self, i: usize) -> &mut [f32] {
        let n = self.nframes;
        match self
            .ports
            .aux_out
            .get(i)
            .and_then(|&id| self.arena.get_mut(id))
        {
            Some(p) => {
                let n = n.min(p.frames.len());
                &mut p.frames[..n]
            }
            None => &mut [],
        }
    }

    /// Copies aux input `aux` into channel `j`.
    pub fn aux_to_channel(&mut self, aux: usize, j: usize) {
        let Some(slot) = self.channel_slot(j) else {
            return;
        };
        let dst = &mut self.scratch.get_mut(slot)[..self.nframes];
        match self
            .ports
            .aux_in
            .get(aux)
            .and_then(|&id| self.arena.get(id))
        {
            Some(p) => {
                let n = dst.len().min(p.frames.len());
                dst[..n].copy_from_slice(&p.frames[..n]);
                dst[n..].fill(0.0);
            }
            None => dst.fill(0.0),
        }
    }

    /// Copies channel `j` into aux output `aux`.
    pub fn channel_to_aux(&mut self, j: usize, aux: usize) {
        let slot = self.channel_slot(j);
        let Some(p) = self
            .ports
            .aux_out
            .get(aux)
            .and_then(|&id| self.arena.get_mut(id))
        else {
            return;
        };
        let n = self.nframes.min(p.frames.len());
        match slot {
            Some(slot) => p.frames[..n].copy_from_slice(&self.scratch.get(slot)[..n]),
            None => p.frames[..n].fill(0.0),
        }
    }

    /// Zeroes every output channel.
    pub fn silence_outputs(&mut self) {
        for j in 0..self.outputs() {
            self.channel_mut(j).fill(0.0);
        }
    }

    /// Bypass routing: channels shared by input and output pass untouched,
    /// extra outputs repeat the inputs round-robin, and a module without
    /// inputs goes silent.
    pub fn pass_through(&mut self) {
        let (ins, outs) = (self.inputs(), self.outputs());
        if ins == 0 {
            self.silence_outputs();
            return;
        }
        for j in ins..outs {
            let src = j % ins;
            if let (Some(a), Some(b)) = (self.channel_slot(src), self.channel_slot(j))
                && let Some((from, to)) = self.scratch.pair_mut(a, b)
            {
                to[..self.nframes].copy_from_slice(&from[..self.nframes]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleId;
    use crate::port::{Direction, Port, PortKind};

    fn bound_ports(arena: &mut PortArena, ins: usize, outs: usize) -> ModulePorts {
        let mut ports = ModulePorts::default();
        for j in 0..ins {
            let mut p = Port::new(ModuleId::first(0), j, PortKind::Audio, Direction::Input, "in");
            p.buffer = Some(j);
            ports.audio_in.push(arena.alloc(p));
        }
        for j in 0..outs {
            let mut p = Port::new(ModuleId::first(0), j, PortKind::Audio, Direction::Output, "out");
            p.buffer = Some(j);
            ports.audio_out.push(arena.alloc(p));
        }
        ports
    }

    #[test]
    fn test_channels_share_slots() {
        let mut arena = PortArena::new();
        let ports = bound_ports(&mut arena, 1, 2);
        let mut scratch = ScratchPool::new(2, 8).unwrap();
        scratch.get_mut(0).fill(0.25);

        let mut ctx = ProcessContext::new(4, Transport::default(), &mut scratch, &mut arena, &ports);
        assert_eq!(ctx.channels(), 2);
        assert_eq!(ctx.channel(0).len(), 4);
        assert_eq!(ctx.channel(0)[0], 0.25);
        let (a, b) = ctx.channel_pair_mut(0, 1).unwrap();
        b.copy_from_slice(a);
        assert_eq!(ctx.channel(1)[3], 0.25);
        assert!(ctx.channel(5).is_empty());
    }

    #[test]
    fn test_pass_through_fans_out_mono() {
        let mut arena = PortArena::new();
        let ports = bound_ports(&mut arena, 1, 2);
        let mut scratch = ScratchPool::new(2, 4).unwrap();
        scratch.get_mut(0).copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        scratch.get_mut(1).fill(9.0);

        let mut ctx = ProcessContext::new(4, Transport::default(), &mut scratch, &mut arena, &ports);
        ctx.pass_through();
        assert_eq!(scratch.get(1), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_pass_through_without_inputs_is_silent() {
        let mut arena = PortArena::new();
        let ports = bound_ports(&mut arena, 0, 2);
        let mut scratch = ScratchPool::new(2, 4).unwrap();
        scratch.get_mut(0).fill(1.0);
        scratch.get_mut(1).fill(1.0);

        let mut ctx = ProcessContext::new(4, Transport::default(), &mut scratch, &mut arena, &ports);
        ctx.pass_through();
        assert!(scratch.get(0).iter().chain(scratch.get(1)).all(|&s| s == 0.0));
    }

    #[test]
    fn test_unbound_ports_are_empty() {
        let mut arena = PortArena::new();
        let mut ports = ModulePorts::default();
        ports.audio_in.push(arena.alloc(Port::new(
            ModuleId::first(0),
            0,
            PortKind::Audio,
            Direction::Input,
            "in-1",
        )));
        let mut scratch = ScratchPool::new(1, 4).unwrap();
        let mut ctx = ProcessContext::new(4, Transport::default(), &mut scratch, &mut arena, &ports);
        assert!(ctx.channel(0).is_empty());
        assert!(ctx.channel_mut(0).is_empty());
        assert!(ctx.aux_input(0).is_empty());
    }
}
