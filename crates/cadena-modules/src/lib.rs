//! Built-in modules for cadena chains.
//!
//! Each module here implements [`cadena_core::Module`] and covers one shape
//! of the channel-adaptation contract:
//!
//! | Module | Role | Width |
//! |--------|------|-------|
//! | [`IoAdapter`] | I/O adapter | any → configurable |
//! | [`Gain`] | processor | n → n |
//! | [`Meter`] | processor | n → n |
//! | [`MonoPan`] | processor | 1 → 2 |
//! | [`ToneGenerator`] | generator | 0 → channels |
//! | [`Controller`] | satellite | drives a control input |
//! | [`Indicator`] | satellite | reads a control output |
//!
//! [`ModuleRegistry`] creates any of them by kind string.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cadena_core::{Chain, DummyBackend};
//! use cadena_modules::{Gain, IoAdapter, Meter};
//!
//! let mut chain = Chain::new("strip", Arc::new(DummyBackend::new(48000, 256)));
//! chain.insert(None, Box::new(IoAdapter::capture(2))).unwrap();
//! chain.insert(None, Box::new(Gain::new())).unwrap();
//! chain.insert(None, Box::new(Meter::new())).unwrap();
//! chain.insert(None, Box::new(IoAdapter::playback())).unwrap();
//! assert_eq!(chain.required_buffers(), 2);
//! ```

pub mod controller;
pub mod dsp;
pub mod gain;
pub mod indicator;
pub mod io_adapter;
pub mod meter;
pub mod pan;
pub mod registry;
pub mod tone;

pub use controller::Controller;
pub use dsp::{FLOOR_DB, Phasor, Smoothed, db_to_linear, linear_to_db};
pub use gain::Gain;
pub use indicator::Indicator;
pub use io_adapter::IoAdapter;
pub use meter::Meter;
pub use pan::MonoPan;
pub use registry::{ModuleCategory, ModuleDescriptor, ModuleFactory, ModuleRegistry};
pub use tone::ToneGenerator;
