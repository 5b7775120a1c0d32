//! Typed connection endpoints and the chain-owned port arena.
//!
//! Ports live in a [`PortArena`] owned by their [`Chain`](crate::Chain) and
//! are addressed by [`PortId`]. Connection lists store ids, never
//! references, and are kept symmetric: `b` is in `a`'s list exactly when
//! `a` is in `b`'s.
//!
//! Connectivity depends on the port kind:
//!
//! | Kind | Connected when | Storage |
//! |------|----------------|---------|
//! | [`PortKind::Audio`] | bound to a scratch slot | borrowed from the chain's pool |
//! | [`PortKind::Control`] | connection list non-empty | [`ControlCell`], aliased on connect |
//! | [`PortKind::AuxAudio`] | connection list non-empty | own frame buffer plus a backend port |

use std::fmt;

use crate::backend::BackendPortId;
use crate::control::{ControlCell, ControlHandle, ControlHints, ControlRoute};
use crate::module::ModuleId;
use crate::slab::{Key, Slab};

/// Port identifier within one chain.
///
/// Freed arena slots are reused under a new generation; an id kept past
/// its port's removal resolves to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId(pub(crate) Key);

impl PortId {
    /// Raw arena index.
    pub fn index(self) -> usize {
        self.0.index as usize
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.generation {
            0 => write!(f, "PortId({})", self.0.index),
            g => write!(f, "PortId({}v{g})", self.0.index),
        }
    }
}

/// Signal direction relative to the owning module.
///
/// Also selects the latency propagation direction: [`Direction::Input`] is
/// the capture side (walked head to tail), [`Direction::Output`] the
/// playback side (walked tail to head).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Signal flows into the module.
    Input,
    /// Signal flows out of the module.
    Output,
}

impl Direction {
    /// The other direction.
    pub const fn opposite(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }

    pub(crate) const fn slot(self) -> usize {
        match self {
            Self::Input => 0,
            Self::Output => 1,
        }
    }
}

/// What a port carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    /// Main-path audio bound to the chain's scratch pool.
    Audio,
    /// A single control value.
    Control,
    /// Externally addressable audio for routing outside the main path.
    AuxAudio,
}

/// A typed connection endpoint owned by a module.
#[derive(Debug)]
pub struct Port {
    owner: ModuleId,
    index: usize,
    kind: PortKind,
    direction: Direction,
    name: String,
    pub(crate) buffer: Option<usize>,
    local: ControlCell,
    pub(crate) cell: ControlCell,
    route: ControlRoute,
    pub(crate) hints: ControlHints,
    pub(crate) connections: Vec<PortId>,
    pub(crate) external: Option<BackendPortId>,
    pub(crate) frames: Vec<f32>,
}

impl Port {
    pub(crate) fn new(
        owner: ModuleId,
        index: usize,
        kind: PortKind,
        direction: Direction,
        name: impl Into<String>,
    ) -> Self {
        let local = ControlCell::default();
        Self {
            owner,
            index,
            kind,
            direction,
            name: name.into(),
            buffer: None,
            cell: local.clone(),
            route: ControlRoute::new(local.clone()),
            local,
            hints: ControlHints::default(),
            connections: Vec::new(),
            external: None,
            frames: Vec::new(),
        }
    }

    pub(crate) fn control(
        owner: ModuleId,
        index: usize,
        direction: Direction,
        name: impl Into<String>,
        hints: ControlHints,
    ) -> Self {
        let port = Self::new(owner, index, PortKind::Control, direction, name);
        port.local.store(hints.default);
        Self { hints, ..port }
    }

    /// Module that owns this port.
    pub fn owner(&self) -> ModuleId {
        self.owner
    }

    /// Position within the owner's list for this kind and direction.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Port kind.
    pub fn kind(&self) -> PortKind {
        self.kind
    }

    /// Port direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Port name, unique within the owner for its kind and direction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Audio ports are connected when bound to a buffer; all others when
    /// their connection list is non-empty.
    pub fn connected(&self) -> bool {
        match self.kind {
            PortKind::Audio => self.buffer.is_some(),
            PortKind::Control | PortKind::AuxAudio => !self.connections.is_empty(),
        }
    }

    /// Ports linked to this one.
    pub fn connections(&self) -> &[PortId] {
        &self.connections
    }

    /// Scratch slot an audio port is bound to.
    pub fn buffer_slot(&self) -> Option<usize> {
        self.buffer
    }

    /// Range of a control port.
    pub fn hints(&self) -> ControlHints {
        self.hints
    }

    /// Backend handle of an aux port.
    pub fn external(&self) -> Option<BackendPortId> {
        self.external
    }

    /// Current value of a control port.
    pub fn control_value(&self) -> f32 {
        self.cell.load()
    }

    /// Writes a control value without dispatching to the owning module.
    pub fn set_control_value_no_callback(&self, value: f32) {
        self.cell.store(self.hints.clamp(value));
    }

    /// Cross-thread handle that follows this port across link changes.
    pub fn control_handle(&self) -> ControlHandle {
        ControlHandle::new(self.route.clone(), self.hints)
    }

    /// Frames held by an aux port for the current period.
    pub fn aux_frames(&self) -> &[f32] {
        &self.frames
    }

    fn is_aliased(&self) -> bool {
        !self.cell.ptr_eq(&self.local)
    }

    fn use_cell(&mut self, cell: ControlCell) {
        self.route.point_to(cell.clone());
        self.cell = cell;
    }

    /// Gives a control input its own storage back, keeping the last value.
    fn detach_cell(&mut self) {
        if self.is_aliased() {
            self.local.store(self.cell.load());
            self.use_cell(self.local.clone());
        }
    }
}

/// Arena of every port in one chain.
///
/// Backed by a generation-tagged slab: width changes that free and then
/// allocate audio ports reuse the freed slots.
#[derive(Debug, Default)]
pub struct PortArena {
    ports: Slab<Port>,
}

impl PortArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn alloc(&mut self, port: Port) -> PortId {
        PortId(self.ports.insert(port))
    }

    /// Unlinks and removes a port. Returns the ids of control ports that
    /// lost a link (including `id` itself when it had any).
    pub(crate) fn free(&mut self, id: PortId) -> Vec<PortId> {
        let touched = self.unlink_all(id);
        self.ports.remove(id.0);
        touched
    }

    /// Looks up a port.
    pub fn get(&self, id: PortId) -> Option<&Port> {
        self.ports.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: PortId) -> Option<&mut Port> {
        self.ports.get_mut(id.0)
    }

    /// Number of live ports.
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// Returns true if no ports are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of arena slots, live or free.
    pub fn capacity(&self) -> usize {
        self.ports.capacity()
    }

    /// Iterates live ports with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (PortId, &Port)> {
        self.ports.iter().map(|(key, p)| (PortId(key), p))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Port> {
        self.ports.values_mut()
    }

    /// Orders a candidate link as `(output, input)` after checking that the
    /// two ports may be joined.
    pub(crate) fn check_link(
        &self,
        a: PortId,
        b: PortId,
    ) -> Result<(PortId, PortId), &'static str> {
        let (Some(pa), Some(pb)) = (self.get(a), self.get(b)) else {
            return Err("port does not exist");
        };
        if pa.kind != pb.kind {
            return Err("port kinds differ");
        }
        if pa.kind == PortKind::Audio {
            return Err("audio ports are bound by the chain");
        }
        if pa.direction == pb.direction {
            return Err("both ports have the same direction");
        }
        if pa.owner == pb.owner {
            return Err("ports belong to the same module");
        }
        let (out, inp) = if pa.direction == Direction::Output {
            (a, b)
        } else {
            (b, a)
        };
        if let Some(input) = self.get(inp)
            && input.kind == PortKind::Control
            && input.connections.iter().any(|&c| c != out)
        {
            return Err("control input is already driven");
        }
        Ok((out, inp))
    }

    /// Records a symmetric link. Control inputs alias the output's cell.
    /// Linking an already linked pair is a no-op.
    pub(crate) fn link(&mut self, out: PortId, inp: PortId) {
        let Some(source) = self.get(out) else { return };
        if source.connections.contains(&inp) {
            return;
        }
        let cell = source.cell.clone();
        let kind = source.kind;

        if let Some(p) = self.get_mut(out) {
            p.connections.push(inp);
        }
        if let Some(p) = self.get_mut(inp) {
            p.connections.push(out);
            if kind == PortKind::Control {
                p.use_cell(cell);
            }
        }
    }

    /// Removes the link between `a` and `b` if present. Returns the control
    /// ports that lost it.
    pub(crate) fn unlink(&mut self, a: PortId, b: PortId) -> Vec<PortId> {
        let mut touched = Vec::new();
        for (this, other) in [(a, b), (b, a)] {
            if let Some(p) = self.get_mut(this)
                && let Some(pos) = p.connections.iter().position(|&c| c == other)
            {
                p.connections.swap_remove(pos);
                if p.kind == PortKind::Control {
                    if p.direction == Direction::Input {
                        p.detach_cell();
                    }
                    touched.push(this);
                }
            }
        }
        touched
    }

    /// Removes every link of `id`. Returns the control ports that lost one.
    pub(crate) fn unlink_all(&mut self, id: PortId) -> Vec<PortId> {
        let peers = self
            .get(id)
            .map(|p| p.connections.clone())
            .unwrap_or_default();
        let mut touched = Vec::new();
        for peer in peers {
            for t in self.unlink(id, peer) {
                if !touched.contains(&t) {
                    touched.push(t);
                }
            }
        }
        touched
    }
}
