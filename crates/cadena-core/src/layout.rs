//! Port ownership per module and the editing view modules use to shape it.

use crate::backend::{Backend, BackendError};
use crate::control::ControlHints;
use crate::module::ModuleId;
use crate::port::{Direction, Port, PortArena, PortId, PortKind};

/// Ids of one module's ports, partitioned by category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModulePorts {
    pub(crate) audio_in: Vec<PortId>,
    pub(crate) audio_out: Vec<PortId>,
    pub(crate) control_in: Vec<PortId>,
    pub(crate) control_out: Vec<PortId>,
    pub(crate) aux_in: Vec<PortId>,
    pub(crate) aux_out: Vec<PortId>,
}

impl ModulePorts {
    /// Audio inputs in channel order.
    pub fn audio_inputs(&self) -> &[PortId] {
        &self.audio_in
    }

    /// Audio outputs in channel order.
    pub fn audio_outputs(&self) -> &[PortId] {
        &self.audio_out
    }

    /// Control inputs in declaration order.
    pub fn control_inputs(&self) -> &[PortId] {
        &self.control_in
    }

    /// Control outputs in declaration order.
    pub fn control_outputs(&self) -> &[PortId] {
        &self.control_out
    }

    /// Aux inputs in channel order.
    pub fn aux_inputs(&self) -> &[PortId] {
        &self.aux_in
    }

    /// Aux outputs in channel order.
    pub fn aux_outputs(&self) -> &[PortId] {
        &self.aux_out
    }

    /// The list for one kind and direction.
    pub fn list(&self, kind: PortKind, direction: Direction) -> &[PortId] {
        match (kind, direction) {
            (PortKind::Audio, Direction::Input) => &self.audio_in,
            (PortKind::Audio, Direction::Output) => &self.audio_out,
            (PortKind::Control, Direction::Input) => &self.control_in,
            (PortKind::Control, Direction::Output) => &self.control_out,
            (PortKind::AuxAudio, Direction::Input) => &self.aux_in,
            (PortKind::AuxAudio, Direction::Output) => &self.aux_out,
        }
    }

    fn list_mut(&mut self, kind: PortKind, direction: Direction) -> &mut Vec<PortId> {
        match (kind, direction) {
            (PortKind::Audio, Direction::Input) => &mut self.audio_in,
            (PortKind::Audio, Direction::Output) => &mut self.audio_out,
            (PortKind::Control, Direction::Input) => &mut self.control_in,
            (PortKind::Control, Direction::Output) => &mut self.control_out,
            (PortKind::AuxAudio, Direction::Input) => &mut self.aux_in,
            (PortKind::AuxAudio, Direction::Output) => &mut self.aux_out,
        }
    }

    /// Every port id.
    pub fn all(&self) -> impl Iterator<Item = PortId> + '_ {
        self.audio_in
            .iter()
            .chain(&self.audio_out)
            .chain(&self.control_in)
            .chain(&self.control_out)
            .chain(&self.aux_in)
            .chain(&self.aux_out)
            .copied()
    }
}

/// Editing view over one module's ports, available while the chain is
/// binding or reconfiguring that module.
pub struct PortLayout<'a> {
    owner: ModuleId,
    arena: &'a mut PortArena,
    ports: &'a mut ModulePorts,
    backend: &'a dyn Backend,
    nframes: usize,
    prefix: &'a str,
}

impl<'a> PortLayout<'a> {
    pub(crate) fn new(
        owner: ModuleId,
        arena: &'a mut PortArena,
        ports: &'a mut ModulePorts,
        backend: &'a dyn Backend,
        nframes: usize,
        prefix: &'a str,
    ) -> Self {
        Self {
            owner,
            arena,
            ports,
            backend,
            nframes,
            prefix,
        }
    }

    /// Module being edited.
    pub fn owner(&self) -> ModuleId {
        self.owner
    }

    /// Period size aux buffers are allocated with.
    pub fn nframes(&self) -> usize {
        self.nframes
    }

    /// Current audio input count.
    pub fn audio_inputs(&self) -> usize {
        self.ports.audio_in.len()
    }

    /// Current audio output count.
    pub fn audio_outputs(&self) -> usize {
        self.ports.audio_out.len()
    }

    /// Current aux input count.
    pub fn aux_inputs(&self) -> usize {
        self.ports.aux_in.len()
    }

    /// Current aux output count.
    pub fn aux_outputs(&self) -> usize {
        self.ports.aux_out.len()
    }

    /// Sets the number of audio inputs. Ports are named `in-1`, `in-2`, ...
    pub fn resize_audio_inputs(&mut self, n: usize) {
        self.resize_audio(Direction::Input, n, "in");
    }

    /// Sets the number of audio outputs. Ports are named `out-1`, `out-2`, ...
    pub fn resize_audio_outputs(&mut self, n: usize) {
        self.resize_audio(Direction::Output, n, "out");
    }

    fn resize_audio(&mut self, direction: Direction, n: usize, base: &str) {
        let owner = self.owner;
        let list = self.ports.list_mut(PortKind::Audio, direction);
        while list.len() > n {
            if let Some(id) = list.pop() {
                self.arena.free(id);
            }
        }
        while list.len() < n {
            let index = list.len();
            let name = format!("{base}-{}", index + 1);
            list.push(
                self.arena
                    .alloc(Port::new(owner, index, PortKind::Audio, direction, name)),
            );
        }
    }

    /// Sets the number of aux inputs, registering each with the backend as
    /// `<chain>/<base>-<k>`. On error no port is added.
    pub fn resize_aux_inputs(&mut self, n: usize, base: &str) -> Result<(), BackendError> {
        self.resize_aux(Direction::Input, n, base)
    }

    /// Sets the number of aux outputs. See
    /// [`resize_aux_inputs`](Self::resize_aux_inputs).
    pub fn resize_aux_outputs(&mut self, n: usize, base: &str) -> Result<(), BackendError> {
        self.resize_aux(Direction::Output, n, base)
    }

    fn resize_aux(
        &mut self,
        direction: Direction,
        n: usize,
        base: &str,
    ) -> Result<(), BackendError> {
        let owner = self.owner;
        let current = self.ports.list(PortKind::AuxAudio, direction).len();

        let mut registered = Vec::new();
        for index in current..n {
            let name = format!("{}/{base}-{}", self.prefix, index + 1);
            match self.backend.register_port(&name, direction) {
                Ok(external) => registered.push((index, name, external)),
                Err(e) => {
                    for (_, _, external) in registered {
                        self.backend.unregister_port(external);
                    }
                    return Err(e);
                }
            }
        }

        let list = self.ports.list_mut(PortKind::AuxAudio, direction);
        while list.len() > n {
            if let Some(id) = list.pop() {
                if let Some(external) = self.arena.get(id).and_then(Port::external) {
                    self.backend.unregister_port(external);
                }
                self.arena.free(id);
            }
        }
        for (index, name, external) in registered {
            let mut port = Port::new(owner, index, PortKind::AuxAudio, direction, name);
            port.external = Some(external);
            port.frames = vec![0.0; self.nframes];
            list.push(self.arena.alloc(port));
        }
        Ok(())
    }

    /// Returns the index of the control input called `name`, creating it
    /// with `hints` if it does not exist yet.
    pub fn control_input(&mut self, name: &str, hints: ControlHints) -> usize {
        self.control(Direction::Input, name, hints)
    }

    /// Returns the index of the control output called `name`, creating it
    /// with `hints` if it does not exist yet.
    pub fn control_output(&mut self, name: &str, hints: ControlHints) -> usize {
        self.control(Direction::Output, name, hints)
    }

    fn control(&mut self, direction: Direction, name: &str, hints: ControlHints) -> usize {
        let owner = self.owner;
        let arena = &mut *self.arena;
        let list = self.ports.list_mut(PortKind::Control, direction);
        if let Some(pos) = list
            .iter()
            .position(|&id| arena.get(id).is_some_and(|p| p.name() == name))
        {
            return pos;
        }
        let index = list.len();
        list.push(arena.alloc(Port::control(owner, index, direction, name, hints)));
        index
    }
}

/// Read/write access to one module's control values, handed to
/// [`Module::handle_control_disconnect`](crate::Module::handle_control_disconnect).
pub struct Controls<'a> {
    arena: &'a PortArena,
    ports: &'a ModulePorts,
}

impl<'a> Controls<'a> {
    pub(crate) fn new(arena: &'a PortArena, ports: &'a ModulePorts) -> Self {
        Self { arena, ports }
    }

    fn port(&self, direction: Direction, index: usize) -> Option<&Port> {
        self.ports
            .list(PortKind::Control, direction)
            .get(index)
            .and_then(|&id| self.arena.get(id))
    }

    /// Value of control input `index`, or 0.0 if it does not exist.
    pub fn input(&self, index: usize) -> f32 {
        self.port(Direction::Input, index)
            .map_or(0.0, Port::control_value)
    }

    /// Writes control input `index`.
    pub fn set_input(&self, index: usize, value: f32) {
        if let Some(p) = self.port(Direction::Input, index) {
            p.set_control_value_no_callback(value);
        }
    }

    /// Value of control output `index`, or 0.0 if it does not exist.
    pub fn output(&self, index: usize) -> f32 {
        self.port(Direction::Output, index)
            .map_or(0.0, Port::control_value)
    }

    /// Writes control output `index`.
    pub fn set_output(&self, index: usize, value: f32) {
        if let Some(p) = self.port(Direction::Output, index) {
            p.set_control_value_no_callback(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    #[test]
    fn test_audio_resize_names_and_frees() {
        let backend = DummyBackend::default();
        let mut arena = PortArena::new();
        let mut ports = ModulePorts::default();
        let mut layout =
            PortLayout::new(ModuleId::first(0), &mut arena, &mut ports, &backend, 64, "strip");

        layout.resize_audio_inputs(3);
        layout.resize_audio_outputs(2);
        assert_eq!(layout.audio_inputs(), 3);
        layout.resize_audio_inputs(1);
        assert_eq!(layout.audio_inputs(), 1);

        assert_eq!(arena.len(), 3);
        let first = arena.get(ports.audio_in[0]).unwrap();
        assert_eq!(first.name(), "in-1");
        assert_eq!(arena.get(ports.audio_out[1]).unwrap().name(), "out-2");
    }

    #[test]
    fn test_aux_resize_registers_with_backend() {
        let backend = DummyBackend::default();
        let mut arena = PortArena::new();
        let mut ports = ModulePorts::default();
        let mut layout =
            PortLayout::new(ModuleId::first(0), &mut arena, &mut ports, &backend, 32, "strip");

        layout.resize_aux_inputs(2, "capture").unwrap();
        assert_eq!(
            backend.port_names(),
            vec!["strip/capture-1".to_string(), "strip/capture-2".to_string()]
        );

        layout.resize_aux_inputs(1, "capture").unwrap();
        assert_eq!(backend.port_names(), vec!["strip/capture-1".to_string()]);
        let port = arena.get(ports.aux_in[0]).unwrap();
        assert_eq!(port.aux_frames().len(), 32);
        assert!(port.external().is_some());
    }

    #[test]
    fn test_aux_registration_failure_adds_nothing() {
        let backend = DummyBackend::default();
        backend
            .register_port("strip/capture-2", Direction::Input)
            .unwrap();
        let mut arena = PortArena::new();
        let mut ports = ModulePorts::default();
        let mut layout =
            PortLayout::new(ModuleId::first(0), &mut arena, &mut ports, &backend, 32, "strip");

        assert!(layout.resize_aux_inputs(2, "capture").is_err());
        assert_eq!(layout.aux_inputs(), 0);
        assert_eq!(backend.port_names(), vec!["strip/capture-2".to_string()]);
    }

    #[test]
    fn test_control_ports_are_ensured_by_name() {
        let backend = DummyBackend::default();
        let mut arena = PortArena::new();
        let mut ports = ModulePorts::default();
        let mut layout =
            PortLayout::new(ModuleId::first(0), &mut arena, &mut ports, &backend, 32, "strip");

        let gain = layout.control_input("gain", ControlHints::linear(-70.0, 6.0, 0.0));
        let again = layout.control_input("gain", ControlHints::default());
        let mute = layout.control_input("mute", ControlHints::toggle(false));
        assert_eq!((gain, again, mute), (0, 0, 1));

        let controls = Controls::new(&arena, &ports);
        assert_eq!(controls.input(0), 0.0);
        controls.set_input(0, 12.0);
        assert_eq!(controls.input(0), 6.0);
        assert_eq!(controls.output(0), 0.0);
    }
}
