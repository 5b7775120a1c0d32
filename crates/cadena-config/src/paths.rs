//! Platform-specific paths for chain documents.
//!
//! - **User chains**: `~/.config/cadena/chains/` (Linux),
//!   `~/Library/Application Support/cadena/chains/` (macOS),
//!   `%APPDATA%\cadena\chains\` (Windows)
//! - **System chains**: `/usr/share/cadena/chains/` (Linux), the platform
//!   data directory elsewhere

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

const APP_NAME: &str = "cadena";
const CHAINS_SUBDIR: &str = "chains";

/// Returns the user-specific chain directory.
///
/// Falls back to `./cadena/chains` if the config directory cannot be
/// determined.
pub fn user_chains_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
        .join(CHAINS_SUBDIR)
}

/// Returns the system-wide chain directory.
pub fn system_chains_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/usr/share").join(APP_NAME).join(CHAINS_SUBDIR)
    }
    #[cfg(not(target_os = "linux"))]
    {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME)
            .join(CHAINS_SUBDIR)
    }
}

/// Find a chain document by path or name.
///
/// Tries `name` as a file path first, then `<name>.toml` in the user and
/// system chain directories.
pub fn find_chain(name: &str) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }
    let filename = if name.ends_with(".toml") {
        name.to_string()
    } else {
        format!("{name}.toml")
    };
    [user_chains_dir(), system_chains_dir()]
        .into_iter()
        .map(|dir| dir.join(&filename))
        .find(|p| p.is_file())
}

/// Ensure the user chain directory exists.
pub fn ensure_user_chains_dir() -> Result<PathBuf, ConfigError> {
    let dir = user_chains_dir();
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| ConfigError::create_dir(&dir, e))?;
    }
    Ok(dir)
}

/// TOML files directly inside `dir`, sorted. Empty if `dir` is unreadable.
pub fn list_chains_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut found: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    found.sort();
    found
}

/// All chain documents, user directory first.
pub fn list_all_chains() -> Vec<PathBuf> {
    let mut chains = list_chains_in(&user_chains_dir());
    chains.extend(list_chains_in(&system_chains_dir()));
    chains
}

/// Chain name from a file path (the file stem).
pub fn chain_name_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(ToString::to_string)
}
