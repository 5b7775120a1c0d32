//! Per-module configuration and links between module ports.

use std::collections::BTreeMap;

use cadena_core::LogEntry;
use serde::{Deserialize, Serialize};

fn is_false(b: &bool) -> bool {
    !*b
}

/// Configuration of one module in a chain document.
///
/// Maps onto a module [`LogEntry`]: `bypassed` and `default` become
/// `:active` and `:default`, `controls` become one pair per control input
/// and `settings` are handed to the module's own `set`.
///
/// # TOML Format
///
/// ```toml
/// [[modules]]
/// kind = "gain"
/// bypassed = false
/// [modules.controls]
/// gain = -6.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleConfig {
    /// Registry kind, e.g. `"gain"`.
    pub kind: String,

    /// Whether the module starts bypassed.
    #[serde(default, skip_serializing_if = "is_false")]
    pub bypassed: bool,

    /// Shared controller that survives removal of the module it drives.
    #[serde(default, skip_serializing_if = "is_false")]
    pub default: bool,

    /// Control input values by port name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub controls: BTreeMap<String, f32>,

    /// Module-specific settings.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: BTreeMap<String, String>,
}

impl ModuleConfig {
    /// Create a configuration for `kind` with everything at defaults.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            bypassed: false,
            default: false,
            controls: BTreeMap::new(),
            settings: BTreeMap::new(),
        }
    }

    /// Set a control value.
    #[must_use]
    pub fn with_control(mut self, name: impl Into<String>, value: f32) -> Self {
        self.controls.insert(name.into(), value);
        self
    }

    /// Set a module setting.
    #[must_use]
    pub fn with_setting(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.settings.insert(key.into(), value.to_string());
        self
    }

    /// Start bypassed.
    #[must_use]
    pub fn bypassed(mut self) -> Self {
        self.bypassed = true;
        self
    }

    /// Mark as a shared controller.
    #[must_use]
    pub fn shared(mut self) -> Self {
        self.default = true;
        self
    }

    /// Entry carrying only the settings, applied before the module is
    /// bound so they can shape its ports.
    pub fn settings_entry(&self) -> LogEntry {
        self.settings
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    /// Full module entry for [`Chain::set_module`](cadena_core::Chain::set_module).
    pub fn to_entry(&self) -> LogEntry {
        let mut entry = LogEntry::new();
        entry.add(":kind", &self.kind);
        entry.add(":active", !self.bypassed);
        entry.add(":default", self.default);
        for (name, value) in &self.controls {
            entry.add(name.as_str(), value);
        }
        for (key, value) in &self.settings {
            entry.add(key.as_str(), value);
        }
        entry
    }

    /// Reads a module entry written by
    /// [`Chain::get_module`](cadena_core::Chain::get_module).
    ///
    /// `control_names` are the module's control inputs; the first pair under
    /// each becomes a control value, and every other non-reserved pair a
    /// setting.
    pub fn from_entry(entry: &LogEntry, control_names: &[&str]) -> Self {
        let mut config = Self::new(entry.find(":kind").unwrap_or_default());
        config.bypassed = entry.parse::<bool>(":active").is_some_and(|a| !a);
        config.default = entry.parse::<bool>(":default").unwrap_or(false);

        for (key, value) in entry.iter() {
            if key.starts_with(':') {
                continue;
            }
            if control_names.contains(&key) && !config.controls.contains_key(key) {
                if let Ok(v) = value.parse::<f32>() {
                    config.controls.insert(key.to_string(), v);
                }
            } else {
                config
                    .settings
                    .entry(key.to_string())
                    .or_insert_with(|| value.to_string());
            }
        }
        config
    }
}

/// A link between two module ports, by module index in the document and
/// port name.
///
/// Controllers and indicators are attached through their link: a
/// controller's `from` side and an indicator's `to` side.
///
/// ```toml
/// [[links]]
/// from = 3
/// output = "out"
/// to = 1
/// input = "gain"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkConfig {
    /// Index of the module owning the output port.
    pub from: usize,
    /// Name of the output port.
    pub output: String,
    /// Index of the module owning the input port.
    pub to: usize,
    /// Name of the input port.
    pub input: String,
}

impl LinkConfig {
    /// Link `from.output` to `to.input`.
    pub fn new(from: usize, output: impl Into<String>, to: usize, input: impl Into<String>) -> Self {
        Self {
            from,
            output: output.into(),
            to,
            input: input.into(),
        }
    }
}
