//! Chain documents: a whole chain as TOML.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use cadena_core::{Backend, Chain, LogEntry, ModuleId, ModuleRole, PortId, PortKind};
use cadena_modules::ModuleRegistry;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::module_config::{LinkConfig, ModuleConfig};

/// A chain as a document.
///
/// `modules` lists the signal path head to tail, then satellites.
/// Satellites are attached through `links`.
///
/// # TOML Format
///
/// ```toml
/// name = "vocal"
/// sample_rate = 48000
/// nframes = 256
///
/// [[modules]]
/// kind = "capture"
/// [modules.settings]
/// channels = "1"
///
/// [[modules]]
/// kind = "gain"
/// [modules.controls]
/// gain = -3.0
///
/// [[modules]]
/// kind = "playback"
///
/// [[modules]]
/// kind = "controller"
/// [modules.settings]
/// min = "-70"
/// max = "12"
///
/// [[links]]
/// from = 3
/// output = "out"
/// to = 1
/// input = "gain"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainDocument {
    /// Chain name, also the prefix of its backend ports.
    pub name: String,

    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Sample rate hint (defaults to 48000).
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Period size hint (defaults to 256).
    #[serde(default = "default_nframes")]
    pub nframes: usize,

    /// Modules, signal path first.
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,

    /// Control and aux links.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkConfig>,
}

fn default_sample_rate() -> u32 {
    48000
}

fn default_nframes() -> usize {
    256
}

impl ChainDocument {
    /// Create an empty document.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            sample_rate: default_sample_rate(),
            nframes: default_nframes(),
            modules: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a module.
    #[must_use]
    pub fn with_module(mut self, module: ModuleConfig) -> Self {
        self.modules.push(module);
        self
    }

    /// Append a link.
    #[must_use]
    pub fn with_link(mut self, link: LinkConfig) -> Self {
        self.links.push(link);
        self
    }

    /// Load a document from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let doc: ChainDocument = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), modules = doc.modules.len(), "loaded chain document");
        Ok(doc)
    }

    /// Parse a document from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the document to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        tracing::debug!(path = %path.display(), "saved chain document");
        Ok(())
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Chain-level log entry.
    pub fn chain_entry(&self) -> LogEntry {
        let mut entry = LogEntry::new();
        entry.add(":name", &self.name);
        entry.add(":sample_rate", self.sample_rate);
        entry.add(":nframes", self.nframes);
        entry
    }

    /// Builds a chain on `backend`.
    ///
    /// Signal-path modules are appended in order, then satellites are
    /// attached, then the remaining links are made. Sample rate and period
    /// size come from the backend; the document's values are hints for
    /// whoever creates it.
    pub fn build(
        &self,
        registry: &ModuleRegistry,
        backend: Arc<dyn Backend>,
    ) -> Result<Chain, ConfigError> {
        let mut chain = Chain::new(self.name.clone(), backend);
        let mut ids: HashMap<usize, ModuleId> = HashMap::new();
        let mut satellites = Vec::new();

        for (index, config) in self.modules.iter().enumerate() {
            let mut module = registry
                .create(&config.kind)
                .ok_or_else(|| ConfigError::UnknownModule(config.kind.clone()))?;
            module.set(&config.settings_entry());
            if module.role().is_satellite() {
                satellites.push((index, module));
                continue;
            }
            let id = chain.insert(None, module)?;
            chain.set_module(id, &config.to_entry())?;
            ids.insert(index, id);
        }

        let mut attached = Vec::new();
        for (index, module) in satellites {
            let config = &self.modules[index];
            let is_controller = module.role() == ModuleRole::Controller;
            let link = self
                .links
                .iter()
                .position(|l| if is_controller { l.from == index } else { l.to == index })
                .ok_or_else(|| ConfigError::UnattachedSatellite {
                    module: index,
                    kind: config.kind.clone(),
                })?;
            let l = &self.links[link];
            let id = if is_controller {
                let target = self.find_port(&chain, &ids, link, l.to, &l.input)?;
                chain.add_controller(module, target)?
            } else {
                let source = self.find_port(&chain, &ids, link, l.from, &l.output)?;
                chain.add_indicator(module, source)?
            };
            chain.set_module(id, &config.to_entry())?;
            ids.insert(index, id);
            attached.push(link);
        }

        for (i, link) in self.links.iter().enumerate() {
            if attached.contains(&i) {
                continue;
            }
            let out = self.find_port(&chain, &ids, i, link.from, &link.output)?;
            let inp = self.find_port(&chain, &ids, i, link.to, &link.input)?;
            chain.connect(out, inp)?;
        }

        tracing::info!(
            chain = %self.name,
            modules = chain.len(),
            satellites = chain.satellites().count(),
            "built chain"
        );
        Ok(chain)
    }

    fn find_port(
        &self,
        chain: &Chain,
        ids: &HashMap<usize, ModuleId>,
        link: usize,
        module: usize,
        name: &str,
    ) -> Result<PortId, ConfigError> {
        let id = ids
            .get(&module)
            .copied()
            .ok_or(ConfigError::MissingModule { link, module })?;
        chain
            .ports_of(id)
            .into_iter()
            .flat_map(|p| p.all())
            .find(|&p| chain.port(p).is_some_and(|p| p.name() == name))
            .ok_or_else(|| ConfigError::UnknownPort {
                module,
                kind: chain.kind(id).unwrap_or_default().to_string(),
                port: name.to_string(),
            })
    }

    /// Captures `chain` as a document.
    pub fn capture(chain: &Chain) -> Result<Self, ConfigError> {
        let mut chain_entry = LogEntry::new();
        chain.get(&mut chain_entry);
        let mut doc = Self::new(chain.name());
        doc.sample_rate = chain_entry.parse(":sample_rate").unwrap_or(doc.sample_rate);
        doc.nframes = chain_entry.parse(":nframes").unwrap_or(doc.nframes);

        let order: Vec<ModuleId> = chain
            .modules()
            .iter()
            .copied()
            .chain(chain.satellites())
            .collect();
        let index: HashMap<ModuleId, usize> =
            order.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        for &id in &order {
            let mut entry = LogEntry::new();
            chain.get_module(id, &mut entry)?;
            let names: Vec<&str> = chain
                .ports_of(id)
                .map(|p| p.control_inputs())
                .unwrap_or_default()
                .iter()
                .filter_map(|&p| chain.port(p).map(|p| p.name()))
                .collect();
            doc.modules.push(ModuleConfig::from_entry(&entry, &names));
        }

        for &id in &order {
            let Some(ports) = chain.ports_of(id) else { continue };
            let outputs = ports
                .control_outputs()
                .iter()
                .chain(ports.aux_outputs())
                .filter_map(|&p| chain.port(p));
            for out in outputs {
                for &peer in out.connections() {
                    let Some(inp) = chain.port(peer) else { continue };
                    let Some(&to) = index.get(&inp.owner()) else { continue };
                    if inp.kind() == PortKind::Audio {
                        continue;
                    }
                    doc.links
                        .push(LinkConfig::new(index[&id], out.name(), to, inp.name()));
                }
            }
        }
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadena_core::DummyBackend;

    fn backend() -> Arc<dyn Backend> {
        Arc::new(DummyBackend::new(48000, 64))
    }

    fn strip() -> ChainDocument {
        ChainDocument::new("strip")
            .with_module(ModuleConfig::new("capture").with_setting("channels", 2))
            .with_module(ModuleConfig::new("gain").with_control("gain", -6.0))
            .with_module(ModuleConfig::new("meter"))
            .with_module(ModuleConfig::new("playback"))
    }

    #[test]
    fn test_build_strip() {
        let chain = strip().build(&ModuleRegistry::new(), backend()).unwrap();
        assert_eq!(chain.len(), 4);
        assert_eq!(chain.required_buffers(), 2);
        let gain = chain.module_at(1).unwrap();
        let port = chain.control_input(gain, "gain").unwrap();
        assert_eq!(chain.control_value(port), Some(-6.0));
    }

    #[test]
    fn test_unknown_kind() {
        let doc = ChainDocument::new("x").with_module(ModuleConfig::new("fuzz"));
        let err = doc.build(&ModuleRegistry::new(), backend()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownModule(ref k) if k == "fuzz"));
    }

    #[test]
    fn test_rejected_width_surfaces_chain_error() {
        let doc = strip().with_module(ModuleConfig::new("pan"));
        let err = doc.build(&ModuleRegistry::new(), backend()).unwrap_err();
        assert!(matches!(err, ConfigError::Chain(_)));
    }

    #[test]
    fn test_satellite_without_link() {
        let doc = strip().with_module(ModuleConfig::new("controller"));
        let err = doc.build(&ModuleRegistry::new(), backend()).unwrap_err();
        assert!(matches!(err, ConfigError::UnattachedSatellite { module: 4, .. }));
    }

    #[test]
    fn test_capture_roundtrip_with_satellites() {
        let doc = strip()
            .with_module(
                ModuleConfig::new("controller")
                    .with_setting("min", -70)
                    .with_setting("max", 12)
                    .with_control("value", -10.0),
            )
            .with_module(ModuleConfig::new("indicator"))
            .with_link(LinkConfig::new(4, "out", 1, "gain"))
            .with_link(LinkConfig::new(2, "level", 5, "level"));
        let chain = doc.build(&ModuleRegistry::new(), backend()).unwrap();
        assert_eq!(chain.satellites().count(), 2);

        let captured = ChainDocument::capture(&chain).unwrap();
        assert_eq!(captured.modules.len(), 6);
        assert_eq!(captured.modules[4].kind, "controller");
        assert_eq!(captured.modules[4].controls.get("value"), Some(&-10.0));
        assert!(captured.links.contains(&LinkConfig::new(4, "out", 1, "gain")));
        assert!(captured.links.contains(&LinkConfig::new(2, "level", 5, "level")));

        let rebuilt = captured.build(&ModuleRegistry::new(), backend()).unwrap();
        assert_eq!(rebuilt.len(), chain.len());
        assert_eq!(rebuilt.process_queue().len(), chain.process_queue().len());
    }

    #[test]
    fn test_capture_records_bypass() {
        let mut chain = strip().build(&ModuleRegistry::new(), backend()).unwrap();
        let gain = chain.module_at(1).unwrap();
        chain.set_bypass(gain, true).unwrap();
        let doc = ChainDocument::capture(&chain).unwrap();
        assert!(doc.modules[1].bypassed);
        assert_eq!(doc.modules[0].settings.get("channels").map(String::as_str), Some("2"));
        assert_eq!(doc.nframes, 64);
    }

    #[test]
    fn test_toml_roundtrip() {
        let doc = strip()
            .with_description("two channels")
            .with_link(LinkConfig::new(0, "a", 1, "b"));
        let parsed = ChainDocument::from_toml(&doc.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, doc);
    }
}
