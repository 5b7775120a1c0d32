//! Gain stage on any channel count.

use cadena_core::{
    BackendError, ControlHints, LogEntry, Module, ModuleContext, PortLayout, ProcessContext,
};

use crate::dsp::{FLOOR_DB, Smoothed, db_to_linear};

const SMOOTHING_MS: f32 = 10.0;

/// Control input indices.
pub mod controls {
    /// Level in dB.
    pub const GAIN: usize = 0;
    /// Silences the output when on.
    pub const MUTE: usize = 1;
}

/// Gain stage, `n` inputs to `n` outputs, processed in place.
///
/// The gain control is in dB from the silence floor to +12. Changes ramp
/// over 10 ms, and so does mute, so neither clicks.
#[derive(Debug, Clone)]
pub struct Gain {
    level: Smoothed,
    ramp: Vec<f32>,
    initial_db: f32,
}

impl Default for Gain {
    fn default() -> Self {
        Self::new()
    }
}

impl Gain {
    /// Unity gain.
    pub fn new() -> Self {
        Self::with_db(0.0)
    }

    /// Starts at `db`.
    pub fn with_db(db: f32) -> Self {
        Self {
            level: Smoothed::new(db_to_linear(db)),
            ramp: Vec::new(),
            initial_db: db,
        }
    }

    fn target(gain_db: f32, mute: f32) -> f32 {
        if mute >= 0.5 { 0.0 } else { db_to_linear(gain_db) }
    }
}

impl Module for Gain {
    fn kind(&self) -> &'static str {
        "gain"
    }

    fn bind(&mut self, ctx: &ModuleContext, ports: &mut PortLayout<'_>) -> Result<(), BackendError> {
        ports.control_input("gain", ControlHints::decibels(FLOOR_DB, 12.0, self.initial_db));
        ports.control_input("mute", ControlHints::toggle(false));
        self.level = Smoothed::with_time(
            db_to_linear(self.initial_db),
            ctx.sample_rate() as f32,
            SMOOTHING_MS,
        );
        self.ramp = vec![0.0; ctx.nframes()];
        Ok(())
    }

    fn can_support_inputs(&self, n: usize) -> Option<usize> {
        Some(n)
    }

    fn configure_inputs(&mut self, n: usize, ports: &mut PortLayout<'_>) -> bool {
        ports.resize_audio_inputs(n);
        ports.resize_audio_outputs(n);
        true
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) {
        let target = Self::target(
            ctx.control_input(controls::GAIN),
            ctx.control_input(controls::MUTE),
        );
        self.level.set_target(target);

        let n = ctx.nframes().min(self.ramp.len());
        for g in &mut self.ramp[..n] {
            *g = self.level.advance();
        }
        for j in 0..ctx.channels() {
            for (s, g) in ctx.channel_mut(j).iter_mut().zip(&self.ramp[..n]) {
                *s *= g;
            }
        }
    }

    fn deactivate(&mut self) {
        self.level.snap_to_target();
    }

    fn set_sample_rate(&mut self, sample_rate: u32) {
        self.level.set_sample_rate(sample_rate as f32);
    }

    fn set_buffer_size(&mut self, nframes: usize) {
        self.ramp.resize(nframes, 0.0);
    }

    fn set(&mut self, entry: &LogEntry) {
        if let Some(db) = entry.parse::<f32>("gain") {
            self.initial_db = db.clamp(FLOOR_DB, 12.0);
            self.level.set_immediate(db_to_linear(self.initial_db));
        }
    }
}
