//! Control-value storage shared between ports and threads.
//!
//! A [`ControlCell`] is a single `f32` stored as bits in an [`AtomicU32`].
//! Control output ports own one; connecting a control input to an output
//! aliases the input to the output's cell, so the value written by a
//! controller is the value read by the module it drives without copying.
//!
//! [`ControlHandle`] is the only view handed to other threads. It can read
//! and write the value but cannot reach module callbacks, which stay on the
//! control thread that owns structural edits. A handle goes through the
//! port's [`ControlRoute`], which the chain repoints on every link change,
//! so it always reaches the storage the port currently reads.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

/// Shared backing cell for a control port value.
#[derive(Debug, Clone)]
pub struct ControlCell(Arc<AtomicU32>);

impl ControlCell {
    /// Creates a new cell holding `value`.
    pub fn new(value: f32) -> Self {
        Self(Arc::new(AtomicU32::new(value.to_bits())))
    }

    /// Reads the current value.
    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Acquire))
    }

    /// Writes a new value.
    #[inline]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Release);
    }

    /// Returns true if both cells share the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for ControlCell {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Shared pointer to the cell a control port currently uses.
///
/// Only the control thread and handle holders lock it; the realtime path
/// reads the port's cell directly.
#[derive(Debug, Clone)]
pub(crate) struct ControlRoute(Arc<Mutex<ControlCell>>);

impl ControlRoute {
    pub(crate) fn new(cell: ControlCell) -> Self {
        Self(Arc::new(Mutex::new(cell)))
    }

    pub(crate) fn point_to(&self, cell: ControlCell) {
        *self.0.lock() = cell;
    }

    fn load(&self) -> f32 {
        self.0.lock().load()
    }

    fn store(&self, value: f32) {
        self.0.lock().store(value);
    }
}

/// Mapping curve for a control range.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum ControlScale {
    /// Equal resolution across the range.
    #[default]
    Linear,
    /// More resolution at low values. Requires `min > 0.0`.
    Logarithmic,
    /// Two states; values at or above the midpoint read as on.
    Toggle,
    /// Values snap to whole numbers.
    Integer,
}

/// Range and default for a control port.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlHints {
    /// Minimum value.
    pub min: f32,
    /// Maximum value.
    pub max: f32,
    /// Value a fresh port starts with.
    pub default: f32,
    /// Mapping curve.
    pub scale: ControlScale,
}

impl ControlHints {
    /// Linear range.
    pub const fn linear(min: f32, max: f32, default: f32) -> Self {
        Self {
            min,
            max,
            default,
            scale: ControlScale::Linear,
        }
    }

    /// Logarithmic range, typically frequencies.
    pub const fn logarithmic(min: f32, max: f32, default: f32) -> Self {
        Self {
            min,
            max,
            default,
            scale: ControlScale::Logarithmic,
        }
    }

    /// On/off switch.
    pub const fn toggle(default: bool) -> Self {
        Self {
            min: 0.0,
            max: 1.0,
            default: if default { 1.0 } else { 0.0 },
            scale: ControlScale::Toggle,
        }
    }

    /// Whole-number range.
    pub const fn integer(min: f32, max: f32, default: f32) -> Self {
        Self {
            min,
            max,
            default,
            scale: ControlScale::Integer,
        }
    }

    /// Level in decibels with a silence floor at `min`.
    pub const fn decibels(min: f32, max: f32, default: f32) -> Self {
        Self::linear(min, max, default)
    }

    /// Clamps `value` into range and applies the scale's quantization.
    pub fn clamp(&self, value: f32) -> f32 {
        let value = if value.is_nan() {
            self.default
        } else {
            value.clamp(self.min, self.max)
        };
        match self.scale {
            ControlScale::Toggle => {
                if value >= (self.min + self.max) * 0.5 {
                    self.max
                } else {
                    self.min
                }
            }
            ControlScale::Integer => value.round(),
            ControlScale::Linear | ControlScale::Logarithmic => value,
        }
    }

    /// Converts a plain value to 0.0..=1.0.
    pub fn normalize(&self, value: f32) -> f32 {
        let range = self.max - self.min;
        if range == 0.0 {
            return 0.0;
        }
        match self.scale {
            ControlScale::Logarithmic => {
                if self.min <= 0.0 || value <= 0.0 {
                    return 0.0;
                }
                (value / self.min).ln() / (self.max / self.min).ln()
            }
            _ => (value - self.min) / range,
        }
    }

    /// Inverse of [`normalize`](Self::normalize).
    pub fn denormalize(&self, normalized: f32) -> f32 {
        match self.scale {
            ControlScale::Logarithmic if self.min > 0.0 => {
                self.min * (self.max / self.min).powf(normalized)
            }
            _ => self.clamp(self.min + normalized * (self.max - self.min)),
        }
    }
}

impl Default for ControlHints {
    fn default() -> Self {
        Self::linear(0.0, 1.0, 0.0)
    }
}

/// Thread-safe handle onto one control port.
///
/// Writes go through [`set_value_no_callback`](Self::set_value_no_callback)
/// and never dispatch to the owning module. Connecting or disconnecting the
/// port is followed: a handle on a driven input writes into the driver's
/// cell, as [`Chain::set_control_value_no_callback`] does. Once the port is
/// removed the handle's writes reach nothing the chain reads.
///
/// [`Chain::set_control_value_no_callback`]: crate::Chain::set_control_value_no_callback
#[derive(Debug, Clone)]
pub struct ControlHandle {
    route: ControlRoute,
    hints: ControlHints,
}

impl ControlHandle {
    pub(crate) fn new(route: ControlRoute, hints: ControlHints) -> Self {
        Self { route, hints }
    }

    /// Current value.
    pub fn value(&self) -> f32 {
        self.route.load()
    }

    /// Writes a clamped value without invoking any module handler.
    pub fn set_value_no_callback(&self, value: f32) {
        self.route.store(self.hints.clamp(value));
    }

    /// Range of the port behind this handle.
    pub fn hints(&self) -> ControlHints {
        self.hints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_roundtrips_bits() {
        let cell = ControlCell::new(-6.5);
        assert_eq!(cell.load(), -6.5);
        cell.store(f32::MIN_POSITIVE);
        assert_eq!(cell.load(), f32::MIN_POSITIVE);
    }

    #[test]
    fn test_cell_clone_aliases() {
        let a = ControlCell::new(1.0);
        let b = a.clone();
        b.store(2.0);
        assert_eq!(a.load(), 2.0);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&ControlCell::new(2.0)));
    }

    #[test]
    fn test_hints_clamp() {
        let hints = ControlHints::linear(-70.0, 6.0, 0.0);
        assert_eq!(hints.clamp(-100.0), -70.0);
        assert_eq!(hints.clamp(10.0), 6.0);
        assert_eq!(hints.clamp(f32::NAN), 0.0);
    }

    #[test]
    fn test_toggle_and_integer() {
        let toggle = ControlHints::toggle(false);
        assert_eq!(toggle.clamp(0.7), 1.0);
        assert_eq!(toggle.clamp(0.2), 0.0);

        let int = ControlHints::integer(1.0, 8.0, 2.0);
        assert_eq!(int.clamp(3.4), 3.0);
    }

    #[test]
    fn test_log_normalize() {
        let hints = ControlHints::logarithmic(20.0, 20000.0, 440.0);
        assert!(hints.normalize(20.0).abs() < 1e-6);
        assert!((hints.normalize(20000.0) - 1.0).abs() < 1e-6);
        let mid = hints.denormalize(0.5);
        assert!((mid - 632.455).abs() < 0.1);
    }

    #[test]
    fn test_handle_clamps_and_skips_callbacks() {
        let cell = ControlCell::new(0.5);
        let handle = ControlHandle::new(ControlRoute::new(cell.clone()), ControlHints::default());
        handle.set_value_no_callback(3.0);
        assert_eq!(cell.load(), 1.0);
        assert_eq!(handle.value(), 1.0);
    }

    #[test]
    fn test_handle_follows_route() {
        let first = ControlCell::new(0.0);
        let second = ControlCell::new(0.0);
        let route = ControlRoute::new(first.clone());
        let handle = ControlHandle::new(route.clone(), ControlHints::default());

        route.point_to(second.clone());
        handle.set_value_no_callback(0.25);
        assert_eq!(second.load(), 0.25);
        assert_eq!(first.load(), 0.0);
    }
}
