//! Audio backend collaborator.
//!
//! The chain never talks to a sound server directly. Everything it needs from
//! one (sample rate, period size, transport, externally visible aux ports and
//! their latency) goes through the object-safe [`Backend`] trait, shared as
//! `Arc<dyn Backend>` inside the [`ModuleContext`](crate::ModuleContext)
//! handed to every module at bind time.
//!
//! [`DummyBackend`] keeps all of that in memory. It drives offline renders
//! and tests, and it is what the cpal driver in `cadena-io` uses as well,
//! since cpal exposes no port graph of its own.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::port::Direction;

/// Handle for a port registered with a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendPortId(pub u32);

impl fmt::Display for BackendPortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BackendPortId({})", self.0)
    }
}

/// A latency window in frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LatencyRange {
    /// Smallest latency.
    pub min: u32,
    /// Largest latency.
    pub max: u32,
}

impl LatencyRange {
    /// No latency.
    pub const ZERO: Self = Self { min: 0, max: 0 };

    /// Window from `min` to `max`.
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Window of exactly `frames`.
    pub const fn fixed(frames: u32) -> Self {
        Self {
            min: frames,
            max: frames,
        }
    }

    /// Returns true if both ends are zero.
    pub const fn is_zero(self) -> bool {
        self.min == 0 && self.max == 0
    }

    /// Smallest window containing both.
    #[must_use]
    pub fn widen(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Shifts both ends by `frames`.
    #[must_use]
    pub fn offset(self, frames: u32) -> Self {
        Self {
            min: self.min.saturating_add(frames),
            max: self.max.saturating_add(frames),
        }
    }
}

impl fmt::Display for LatencyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}..{}", self.min, self.max)
        }
    }
}

/// Transport position reported once per period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transport {
    /// Whether the transport is rolling.
    pub rolling: bool,
    /// Current frame position.
    pub frame: u64,
}

/// Errors raised by backend port operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// A port with this name is already registered.
    #[error("port name '{0}' is already registered")]
    DuplicatePort(String),
    /// The handle does not refer to a registered port.
    #[error("unknown backend port {0}")]
    UnknownPort(BackendPortId),
    /// The two ports cannot be connected.
    #[error("cannot connect {0} to {1}")]
    Incompatible(BackendPortId, BackendPortId),
}

/// Native audio backend as seen by the chain.
///
/// Implementations use interior mutability so a single `Arc<dyn Backend>`
/// can be shared by the chain and its modules.
/// [`transport_query`](Self::transport_query) is called on the realtime
/// thread and must not block.
pub trait Backend: Send + Sync {
    /// Short backend name for diagnostics.
    fn name(&self) -> &str;

    /// Current sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Current period size in frames.
    fn nframes(&self) -> usize;

    /// Transport state for this period. Must be wait-free.
    fn transport_query(&self) -> Transport;

    /// Registers an externally visible port.
    fn register_port(&self, name: &str, direction: Direction)
    -> Result<BackendPortId, BackendError>;

    /// Releases a port and drops all its connections.
    fn unregister_port(&self, id: BackendPortId);

    /// Connects two registered ports.
    fn connect(&self, a: BackendPortId, b: BackendPortId) -> Result<(), BackendError>;

    /// Disconnects two registered ports.
    fn disconnect(&self, a: BackendPortId, b: BackendPortId);

    /// Latency window currently reported for a port.
    fn port_latency(&self, id: BackendPortId, direction: Direction) -> LatencyRange;

    /// Publishes a latency window on a port.
    fn set_port_latency(&self, id: BackendPortId, direction: Direction, range: LatencyRange);
}

#[derive(Debug)]
struct DummyPort {
    name: String,
    direction: Direction,
    latency: [LatencyRange; 2],
    connections: Vec<BackendPortId>,
}

/// In-memory backend for offline rendering and tests.
#[derive(Debug)]
pub struct DummyBackend {
    sample_rate: u32,
    nframes: usize,
    rolling: AtomicBool,
    frame: AtomicU64,
    ports: Mutex<Vec<Option<DummyPort>>>,
}

impl DummyBackend {
    /// Creates a backend with a fixed sample rate and period size.
    pub fn new(sample_rate: u32, nframes: usize) -> Self {
        Self {
            sample_rate,
            nframes,
            rolling: AtomicBool::new(false),
            frame: AtomicU64::new(0),
            ports: Mutex::new(Vec::new()),
        }
    }

    /// Looks up a registered port by name.
    pub fn port_by_name(&self, name: &str) -> Option<BackendPortId> {
        self.ports
            .lock()
            .iter()
            .enumerate()
            .find_map(|(i, p)| match p {
                Some(p) if p.name == name => Some(BackendPortId(i as u32)),
                _ => None,
            })
    }

    /// Names of all registered ports in registration order.
    pub fn port_names(&self) -> Vec<String> {
        self.ports
            .lock()
            .iter()
            .flatten()
            .map(|p| p.name.clone())
            .collect()
    }

    /// Direction a port was registered with.
    pub fn port_direction(&self, id: BackendPortId) -> Option<Direction> {
        self.ports
            .lock()
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .map(|p| p.direction)
    }

    /// Ports connected to `id`.
    pub fn connections(&self, id: BackendPortId) -> Vec<BackendPortId> {
        self.ports
            .lock()
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .map(|p| p.connections.clone())
            .unwrap_or_default()
    }

    /// Starts or stops the transport.
    pub fn set_rolling(&self, rolling: bool) {
        self.rolling.store(rolling, Ordering::Release);
    }

    /// Advances the transport by `frames` if it is rolling.
    pub fn advance(&self, frames: u64) {
        if self.rolling.load(Ordering::Acquire) {
            self.frame.fetch_add(frames, Ordering::AcqRel);
        }
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new(48000, 256)
    }
}

impl Backend for DummyBackend {
    fn name(&self) -> &str {
        "dummy"
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn nframes(&self) -> usize {
        self.nframes
    }

    fn transport_query(&self) -> Transport {
        Transport {
            rolling: self.rolling.load(Ordering::Acquire),
            frame: self.frame.load(Ordering::Acquire),
        }
    }

    fn register_port(
        &self,
        name: &str,
        direction: Direction,
    ) -> Result<BackendPortId, BackendError> {
        let mut ports = self.ports.lock();
        if ports.iter().flatten().any(|p| p.name == name) {
            return Err(BackendError::DuplicatePort(name.to_string()));
        }
        let id = BackendPortId(ports.len() as u32);
        ports.push(Some(DummyPort {
            name: name.to_string(),
            direction,
            latency: [LatencyRange::ZERO; 2],
            connections: Vec::new(),
        }));
        Ok(id)
    }

    fn unregister_port(&self, id: BackendPortId) {
        let mut ports = self.ports.lock();
        let Some(port) = ports.get_mut(id.0 as usize).and_then(Option::take) else {
            return;
        };
        for peer in port.connections {
            if let Some(Some(p)) = ports.get_mut(peer.0 as usize) {
                p.connections.retain(|&c| c != id);
            }
        }
    }

    fn connect(&self, a: BackendPortId, b: BackendPortId) -> Result<(), BackendError> {
        let mut ports = self.ports.lock();
        let dir_a = ports
            .get(a.0 as usize)
            .and_then(Option::as_ref)
            .map(|p| p.direction)
            .ok_or(BackendError::UnknownPort(a))?;
        let dir_b = ports
            .get(b.0 as usize)
            .and_then(Option::as_ref)
            .map(|p| p.direction)
            .ok_or(BackendError::UnknownPort(b))?;
        if dir_a == dir_b {
            return Err(BackendError::Incompatible(a, b));
        }
        for (this, other) in [(a, b), (b, a)] {
            if let Some(Some(p)) = ports.get_mut(this.0 as usize)
                && !p.connections.contains(&other)
            {
                p.connections.push(other);
            }
        }
        Ok(())
    }

    fn disconnect(&self, a: BackendPortId, b: BackendPortId) {
        let mut ports = self.ports.lock();
        for (this, other) in [(a, b), (b, a)] {
            if let Some(Some(p)) = ports.get_mut(this.0 as usize) {
                p.connections.retain(|&c| c != other);
            }
        }
    }

    fn port_latency(&self, id: BackendPortId, direction: Direction) -> LatencyRange {
        self.ports
            .lock()
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .map(|p| p.latency[direction.slot()])
            .unwrap_or_default()
    }

    fn set_port_latency(&self, id: BackendPortId, direction: Direction, range: LatencyRange) {
        if let Some(Some(p)) = self.ports.lock().get_mut(id.0 as usize) {
            p.latency[direction.slot()] = range;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_range_ops() {
        let a = LatencyRange::new(64, 128);
        let b = LatencyRange::fixed(256);
        assert_eq!(a.widen(b), LatencyRange::new(64, 256));
        assert_eq!(a.offset(32), LatencyRange::new(96, 160));
        assert!(LatencyRange::ZERO.is_zero());
        assert_eq!(a.to_string(), "64..128");
        assert_eq!(b.to_string(), "256");
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let backend = DummyBackend::default();
        let id = backend.register_port("strip/in-1", Direction::Input).unwrap();
        assert_eq!(backend.port_by_name("strip/in-1"), Some(id));
        assert_eq!(
            backend.register_port("strip/in-1", Direction::Input),
            Err(BackendError::DuplicatePort("strip/in-1".to_string()))
        );
    }

    #[test]
    fn test_connect_and_unregister() {
        let backend = DummyBackend::default();
        let a = backend.register_port("a", Direction::Output).unwrap();
        let b = backend.register_port("b", Direction::Input).unwrap();
        let c = backend.register_port("c", Direction::Input).unwrap();

        backend.connect(a, b).unwrap();
        backend.connect(a, b).unwrap();
        assert_eq!(backend.connections(a), vec![b]);
        assert_eq!(
            backend.connect(b, c),
            Err(BackendError::Incompatible(b, c))
        );

        backend.unregister_port(b);
        assert!(backend.connections(a).is_empty());
        assert_eq!(backend.port_by_name("b"), None);
        assert_eq!(
            backend.connect(a, b),
            Err(BackendError::UnknownPort(b))
        );
    }

    #[test]
    fn test_port_latency_per_direction() {
        let backend = DummyBackend::default();
        let id = backend.register_port("cap", Direction::Input).unwrap();
        backend.set_port_latency(id, Direction::Input, LatencyRange::new(64, 128));
        assert_eq!(
            backend.port_latency(id, Direction::Input),
            LatencyRange::new(64, 128)
        );
        assert!(backend.port_latency(id, Direction::Output).is_zero());
    }

    #[test]
    fn test_transport_advances_when_rolling() {
        let backend = DummyBackend::default();
        backend.advance(100);
        assert_eq!(backend.transport_query().frame, 0);
        backend.set_rolling(true);
        backend.advance(100);
        assert_eq!(
            backend.transport_query(),
            Transport {
                rolling: true,
                frame: 100
            }
        );
    }
}
