//! Shared CLI helpers used across multiple commands.

use cadena_config::{ChainDocument, factory_chain_names, find_chain, get_factory_chain};

/// Parse a `key=value` string for clap's `value_parser`.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| format!("Invalid control format: '{s}' (expected module.control=value)"))
}

/// Load a chain document by name or path.
///
/// Searches in this order:
/// 1. Factory chains (by name)
/// 2. A file path, then user and system chain directories (by name)
pub fn load_chain(name: &str) -> anyhow::Result<ChainDocument> {
    if let Some(doc) = get_factory_chain(name) {
        return Ok(doc);
    }
    if let Some(path) = find_chain(name) {
        tracing::debug!(path = %path.display(), "loading chain document");
        return Ok(ChainDocument::load(&path)?);
    }
    anyhow::bail!(
        "Chain '{}' not found. Factory chains: {}",
        name,
        factory_chain_names().join(", ")
    )
}

/// Apply `module.control=value` overrides to a document.
///
/// `module` is either the module's index in the document or its kind, in
/// which case the first module of that kind is used.
pub fn apply_controls(doc: &mut ChainDocument, overrides: &[(String, String)]) -> anyhow::Result<()> {
    for (key, value) in overrides {
        let (module, control) = key
            .split_once('.')
            .ok_or_else(|| anyhow::anyhow!("Control '{key}' must be module.control"))?;
        let value: f32 = value
            .parse()
            .map_err(|_| anyhow::anyhow!("Control '{key}' needs a number, got '{value}'"))?;
        let index = match module.parse::<usize>() {
            Ok(index) if index < doc.modules.len() => index,
            Ok(index) => anyhow::bail!("Chain has no module at index {index}"),
            Err(_) => doc
                .modules
                .iter()
                .position(|m| m.kind == module)
                .ok_or_else(|| anyhow::anyhow!("Chain has no '{module}' module"))?,
        };
        doc.modules[index].controls.insert(control.to_string(), value);
    }
    Ok(())
}
