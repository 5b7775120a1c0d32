//! Key/value persistence of chain and module state.
//!
//! Module entries start with the reserved keys `:kind`, `:active`,
//! `:default` and `:inputs`, followed by one pair per control input and
//! then whatever the module itself writes in [`Module::get`]. Chain entries
//! carry `:name`, `:sample_rate` and `:nframes`.
//!
//! [`Module::get`]: crate::Module::get

use super::Chain;
use crate::error::{ChainError, Result};
use crate::log::LogEntry;
use crate::module::{ModuleId, ModuleState};

impl Chain {
    /// Appends the chain-level keys to `entry`.
    pub fn get(&self, entry: &mut LogEntry) {
        entry.add(":name", &self.name);
        entry.add(":sample_rate", self.sample_rate());
        entry.add(":nframes", self.nframes());
    }

    /// Applies `:sample_rate` and `:nframes` from `entry` when present and
    /// different from the current settings.
    pub fn set(&mut self, entry: &LogEntry) -> Result<()> {
        if let Some(sr) = entry.parse::<u32>(":sample_rate")
            && sr != self.sample_rate()
        {
            self.set_sample_rate(sr)?;
        }
        if let Some(n) = entry.parse::<usize>(":nframes")
            && n != self.nframes()
        {
            self.set_buffer_size(n)?;
        }
        Ok(())
    }

    /// Appends the state of `id` to `entry`.
    pub fn get_module(&self, id: ModuleId, entry: &mut LogEntry) -> Result<()> {
        let slot = self.slot(id).ok_or(ChainError::ModuleNotFound(id))?;
        entry.add(":kind", slot.module.kind());
        entry.add(":active", slot.state != ModuleState::Bypassed);
        entry.add(":default", slot.is_default);
        entry.add(":inputs", slot.ports.audio_in.len());
        for &port in &slot.ports.control_in {
            if let Some(p) = self.arena.get(port) {
                entry.add(p.name(), p.control_value());
            }
        }
        slot.module.get(entry);
        Ok(())
    }

    /// Restores the state of `id` from `entry`.
    ///
    /// `:kind` and `:inputs` are informational here: the module already
    /// exists and its width follows from its position. Unknown keys go to
    /// the module first; if they change its output width the change is
    /// validated against everything downstream, and a rejected entry
    /// leaves the module and the chain untouched.
    pub fn set_module(&mut self, id: ModuleId, entry: &LogEntry) -> Result<()> {
        if !self.contains(id) {
            return Err(ChainError::ModuleNotFound(id));
        }
        self.apply_settings(id, entry)?;

        if let Some(active) = entry.parse::<bool>(":active") {
            self.set_bypass(id, !active)?;
        }
        if let Some(default) = entry.parse::<bool>(":default") {
            self.set_default(id, default)?;
        }

        let controls: Vec<_> = self
            .ports_of(id)
            .map(|p| p.control_inputs().to_vec())
            .unwrap_or_default();
        for port in controls {
            let value = self
                .port(port)
                .and_then(|p| entry.parse::<f32>(p.name()));
            if let Some(value) = value {
                self.set_control_value(port, value)?;
            }
        }
        Ok(())
    }
}
