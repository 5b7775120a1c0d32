//! Sine tone generator.

use cadena_core::{
    BackendError, ControlHints, LogEntry, Module, ModuleContext, ModuleRole, PortLayout,
    ProcessContext,
};

use crate::dsp::{FLOOR_DB, Phasor, Smoothed, db_to_linear};

/// Zero-input sine generator.
///
/// Only accepts zero inputs, so it can only sit directly after an I/O
/// adapter whose outputs the chain forces to zero. The same tone is written
/// to every output channel.
///
/// # Controls
///
/// | Name | Range |
/// |------|-------|
/// | `frequency` | 20 Hz - 20 kHz, logarithmic |
/// | `level` | floor - 0 dBFS |
///
/// # Settings
///
/// `channels` sets the output width. Changed through
/// [`Chain::set_module`](cadena_core::Chain::set_module) on an inserted tone,
/// it is refused when something downstream cannot take the new width.
#[derive(Debug, Clone)]
pub struct ToneGenerator {
    channels: usize,
    phasor: Phasor,
    level: Smoothed,
}

impl Default for ToneGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ToneGenerator {
    /// Tone on `channels` outputs.
    pub fn new(channels: usize) -> Self {
        Self {
            channels: channels.max(1),
            phasor: Phasor::new(48000.0, 440.0),
            level: Smoothed::new(db_to_linear(-12.0)),
        }
    }

    /// Output width.
    pub fn channels(&self) -> usize {
        self.channels
    }
}

impl Module for ToneGenerator {
    fn kind(&self) -> &'static str {
        "tone"
    }

    fn role(&self) -> ModuleRole {
        ModuleRole::Generator
    }

    fn bind(&mut self, ctx: &ModuleContext, ports: &mut PortLayout<'_>) -> Result<(), BackendError> {
        ports.control_input("frequency", ControlHints::logarithmic(20.0, 20000.0, 440.0));
        ports.control_input("level", ControlHints::decibels(FLOOR_DB, 0.0, -12.0));
        let sr = ctx.sample_rate() as f32;
        self.phasor = Phasor::new(sr, 440.0);
        self.level = Smoothed::with_time(db_to_linear(-12.0), sr, 5.0);
        Ok(())
    }

    fn can_support_inputs(&self, n: usize) -> Option<usize> {
        (n == 0).then_some(self.channels)
    }

    fn configure_inputs(&mut self, n: usize, ports: &mut PortLayout<'_>) -> bool {
        if n != 0 {
            return false;
        }
        ports.resize_audio_outputs(self.channels);
        true
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) {
        self.phasor.set_frequency(ctx.control_input(0));
        self.level.set_target(db_to_linear(ctx.control_input(1)));

        for x in ctx.channel_mut(0) {
            *x = self.phasor.next_sine() * self.level.advance();
        }
        for j in 1..ctx.outputs() {
            if let Some((first, other)) = ctx.channel_pair_mut(0, j) {
                other.copy_from_slice(first);
            }
        }
    }

    fn process_bypassed(&mut self, ctx: &mut ProcessContext<'_>) {
        self.phasor.advance(ctx.nframes());
        ctx.silence_outputs();
    }

    fn activate(&mut self) {
        self.phasor.reset();
    }

    fn set_sample_rate(&mut self, sample_rate: u32) {
        self.phasor.set_sample_rate(sample_rate as f32);
        self.level.set_sample_rate(sample_rate as f32);
    }

    fn get(&self, entry: &mut LogEntry) {
        entry.add("channels", self.channels);
    }

    fn set(&mut self, entry: &LogEntry) {
        if let Some(channels) = entry.parse::<usize>("channels") {
            self.channels = channels.max(1);
        }
    }
}
