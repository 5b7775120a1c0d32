//! Module registry and factory.
//!
//! Modules are created by kind string, the same string [`Module::kind`]
//! returns and the persistence log stores under `:kind`. The registry is
//! what lets a saved chain be rebuilt.
//!
//! # Example
//!
//! ```rust
//! use cadena_modules::{ModuleCategory, ModuleRegistry};
//!
//! let registry = ModuleRegistry::new();
//! for module in registry.all_modules() {
//!     println!("{}: {}", module.kind, module.description);
//! }
//!
//! let gain = registry.create("gain").unwrap();
//! assert_eq!(gain.kind(), "gain");
//!
//! for module in registry.modules_in_category(ModuleCategory::Satellite) {
//!     println!("satellite: {}", module.name);
//! }
//! ```

use cadena_core::{Module, ModuleRole};

use crate::{Controller, Gain, Indicator, IoAdapter, Meter, MonoPan, ToneGenerator};

/// Category of module for organization and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleCategory {
    /// Hardware bridges (capture, playback)
    Io,
    /// Signal-path processors (gain, pan)
    Processing,
    /// Zero-input sources
    Source,
    /// Analysis that passes audio through (meters)
    Analysis,
    /// Controllers and indicators outside the signal path
    Satellite,
}

impl ModuleCategory {
    /// Returns a human-readable name for the category.
    pub const fn name(&self) -> &'static str {
        match self {
            ModuleCategory::Io => "I/O",
            ModuleCategory::Processing => "Processing",
            ModuleCategory::Source => "Source",
            ModuleCategory::Analysis => "Analysis",
            ModuleCategory::Satellite => "Satellite",
        }
    }

    /// Returns a description of the category.
    pub const fn description(&self) -> &'static str {
        match self {
            ModuleCategory::Io => "Adapters between the chain and the audio backend",
            ModuleCategory::Processing => "Gain stages, panners and other signal-path processors",
            ModuleCategory::Source => "Generators that need no audio input",
            ModuleCategory::Analysis => "Meters that report on the signal without changing it",
            ModuleCategory::Satellite => "Controllers and indicators linked by control ports",
        }
    }
}

/// Describes a module in the registry.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    /// Kind string, as returned by [`Module::kind`].
    pub kind: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Brief description.
    pub description: &'static str,
    /// Category for organization.
    pub category: ModuleCategory,
    /// Structural role of created instances.
    pub role: ModuleRole,
}

/// Factory function type for creating modules.
pub type ModuleFactory = fn() -> Box<dyn Module>;

struct RegistryEntry {
    descriptor: ModuleDescriptor,
    factory: ModuleFactory,
}

/// Registry of available modules.
///
/// All built-in modules are registered by [`new`](Self::new); hosts can
/// add their own with [`register`](Self::register).
pub struct ModuleRegistry {
    entries: Vec<RegistryEntry>,
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleRegistry {
    /// Create a new registry with all built-in modules registered.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::with_capacity(8),
        };
        registry.register_builtin_modules();
        registry
    }

    /// Create a registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn register_builtin_modules(&mut self) {
        self.register(
            ModuleDescriptor {
                kind: "capture",
                name: "Capture",
                description: "Hardware input feeding the head of a chain",
                category: ModuleCategory::Io,
                role: ModuleRole::IoAdapter,
            },
            || Box::new(IoAdapter::capture(2)),
        );

        self.register(
            ModuleDescriptor {
                kind: "playback",
                name: "Playback",
                description: "Hardware output at the tail of a chain",
                category: ModuleCategory::Io,
                role: ModuleRole::IoAdapter,
            },
            || Box::new(IoAdapter::playback()),
        );

        self.register(
            ModuleDescriptor {
                kind: "gain",
                name: "Gain",
                description: "Smoothed gain and mute on any channel count",
                category: ModuleCategory::Processing,
                role: ModuleRole::Processor,
            },
            || Box::new(Gain::new()),
        );

        self.register(
            ModuleDescriptor {
                kind: "pan",
                name: "Mono Pan",
                description: "Constant-power panner from one channel to two",
                category: ModuleCategory::Processing,
                role: ModuleRole::Processor,
            },
            || Box::new(MonoPan::new()),
        );

        self.register(
            ModuleDescriptor {
                kind: "meter",
                name: "Meter",
                description: "Peak meter publishing dBFS on a control output",
                category: ModuleCategory::Analysis,
                role: ModuleRole::Processor,
            },
            || Box::new(Meter::new()),
        );

        self.register(
            ModuleDescriptor {
                kind: "tone",
                name: "Tone",
                description: "Sine generator placed directly after an input adapter",
                category: ModuleCategory::Source,
                role: ModuleRole::Generator,
            },
            || Box::new(ToneGenerator::default()),
        );

        self.register(
            ModuleDescriptor {
                kind: "controller",
                name: "Controller",
                description: "Drives a control input with a held value or a sine sweep",
                category: ModuleCategory::Satellite,
                role: ModuleRole::Controller,
            },
            || Box::new(Controller::default()),
        );

        self.register(
            ModuleDescriptor {
                kind: "indicator",
                name: "Indicator",
                description: "Displays a control output, falling to its floor when unlinked",
                category: ModuleCategory::Satellite,
                role: ModuleRole::Indicator,
            },
            || Box::new(Indicator::new()),
        );
    }

    /// Register a module. A later registration of the same kind replaces
    /// the earlier one.
    pub fn register(&mut self, descriptor: ModuleDescriptor, factory: ModuleFactory) {
        self.entries.retain(|e| e.descriptor.kind != descriptor.kind);
        self.entries.push(RegistryEntry {
            descriptor,
            factory,
        });
    }

    /// Get all registered module descriptors.
    pub fn all_modules(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    /// Get modules in a specific category.
    pub fn modules_in_category(&self, category: ModuleCategory) -> Vec<&ModuleDescriptor> {
        self.entries
            .iter()
            .filter(|e| e.descriptor.category == category)
            .map(|e| &e.descriptor)
            .collect()
    }

    /// Get a descriptor by kind.
    pub fn descriptor(&self, kind: &str) -> Option<&ModuleDescriptor> {
        self.entries
            .iter()
            .find(|e| e.descriptor.kind == kind)
            .map(|e| &e.descriptor)
    }

    /// Create a module instance by kind.
    ///
    /// Returns `None` if the kind is not registered.
    pub fn create(&self, kind: &str) -> Option<Box<dyn Module>> {
        self.entries
            .iter()
            .find(|e| e.descriptor.kind == kind)
            .map(|e| (e.factory)())
    }

    /// Returns the number of registered modules.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no modules are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
