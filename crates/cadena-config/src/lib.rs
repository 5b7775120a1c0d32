//! Chain documents for cadena.
//!
//! A [`ChainDocument`] is a whole chain as TOML: its modules in signal
//! order, their controls and settings, and the control links that attach
//! controllers and indicators. Documents go through the engine's log-entry
//! contract in both directions, so anything a module persists with
//! `Module::get` survives a save and reload.
//!
//! # Features
//!
//! - **Documents**: load, save, build a chain, capture a chain
//! - **Paths**: platform-specific chain directories
//! - **Factory chains**: built-in documents that need no files
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cadena_config::{ChainDocument, ModuleConfig, paths};
//! use cadena_core::DummyBackend;
//! use cadena_modules::ModuleRegistry;
//!
//! let doc = ChainDocument::new("vocal")
//!     .with_module(ModuleConfig::new("capture").with_setting("channels", 1))
//!     .with_module(ModuleConfig::new("gain").with_control("gain", -3.0))
//!     .with_module(ModuleConfig::new("playback"));
//!
//! let chain = doc
//!     .build(&ModuleRegistry::new(), Arc::new(DummyBackend::new(48000, 256)))
//!     .unwrap();
//! ChainDocument::capture(&chain)
//!     .unwrap()
//!     .save(paths::user_chains_dir().join("vocal.toml"))
//!     .unwrap();
//! ```

mod document;
mod error;
mod module_config;

/// Platform-specific chain directories.
pub mod paths;

/// Factory chains bundled with the library.
pub mod factory;

pub use document::ChainDocument;
pub use error::ConfigError;
pub use factory::{factory_chain_names, factory_chains, get_factory_chain};
pub use module_config::{LinkConfig, ModuleConfig};
pub use paths::{find_chain, user_chains_dir};

/// Convenience result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
