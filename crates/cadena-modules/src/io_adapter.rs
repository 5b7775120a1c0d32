//! Hardware bridge between a chain and the backend's port graph.

use cadena_core::{
    BackendError, LogEntry, Module, ModuleContext, ModuleRole, PortLayout, ProcessContext,
};

/// I/O adapter.
///
/// Its outputs are fed from aux inputs (hardware capture), and its inputs
/// are copied to aux outputs (hardware playback). A capture adapter
/// therefore starts with `channels` outputs and no inputs, and a playback
/// adapter takes whatever width reaches it and produces nothing.
///
/// Aux ports are registered with the backend as `<chain>/<label>-in-<k>`
/// and `<chain>/<label>-out-<k>`.
///
/// # Settings
///
/// | Key | Meaning |
/// |-----|---------|
/// | `channels` | Output width (aux inputs) |
/// | `label` | Base name for aux ports |
///
/// A `channels` change on an inserted adapter goes through
/// [`Chain::set_module`](cadena_core::Chain::set_module), which validates it
/// like [`Chain::configure_outputs`](cadena_core::Chain::configure_outputs).
#[derive(Debug, Clone)]
pub struct IoAdapter {
    kind: &'static str,
    label: String,
    outputs: usize,
}

impl IoAdapter {
    /// Capture adapter producing `channels` outputs.
    pub fn capture(channels: usize) -> Self {
        Self {
            kind: "capture",
            label: "capture".to_string(),
            outputs: channels,
        }
    }

    /// Playback adapter for the tail of a chain.
    pub fn playback() -> Self {
        Self {
            kind: "playback",
            label: "playback".to_string(),
            outputs: 0,
        }
    }

    /// Renames the aux ports.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Aux port base name.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Output width.
    pub fn outputs(&self) -> usize {
        self.outputs
    }

    fn aux_in_base(&self) -> String {
        format!("{}-in", self.label)
    }

    fn aux_out_base(&self) -> String {
        format!("{}-out", self.label)
    }
}

impl Module for IoAdapter {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn role(&self) -> ModuleRole {
        ModuleRole::IoAdapter
    }

    fn bind(&mut self, _ctx: &ModuleContext, ports: &mut PortLayout<'_>) -> Result<(), BackendError> {
        ports.resize_aux_inputs(self.outputs, &self.aux_in_base())?;
        ports.resize_audio_outputs(self.outputs);
        Ok(())
    }

    fn can_support_inputs(&self, _n: usize) -> Option<usize> {
        Some(self.outputs)
    }

    fn configure_inputs(&mut self, n: usize, ports: &mut PortLayout<'_>) -> bool {
        if ports.resize_aux_outputs(n, &self.aux_out_base()).is_err() {
            return false;
        }
        ports.resize_audio_inputs(n);
        true
    }

    fn configure_outputs(&mut self, n: usize, ports: &mut PortLayout<'_>) -> bool {
        if ports.resize_aux_inputs(n, &self.aux_in_base()).is_err() {
            return false;
        }
        ports.resize_audio_outputs(n);
        self.outputs = n;
        true
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) {
        // Playback first: channel j may be overwritten by capture below.
        for j in 0..ctx.aux_outputs() {
            ctx.channel_to_aux(j, j);
        }
        for k in 0..ctx.aux_inputs() {
            ctx.aux_to_channel(k, k);
        }
    }

    fn process_bypassed(&mut self, ctx: &mut ProcessContext<'_>) {
        for j in 0..ctx.aux_outputs() {
            ctx.aux_output_mut(j).fill(0.0);
        }
        ctx.pass_through();
    }

    fn get(&self, entry: &mut LogEntry) {
        entry.add("channels", self.outputs);
        entry.add("label", &self.label);
    }

    fn set(&mut self, entry: &LogEntry) {
        if let Some(channels) = entry.parse::<usize>("channels") {
            self.outputs = channels;
        }
        if let Some(label) = entry.find("label") {
            self.label = label.to_string();
        }
    }
}
