//! Peak meter.

use cadena_core::{
    BackendError, ControlHints, Module, ModuleContext, PortLayout, ProcessContext,
};

use crate::dsp::{FLOOR_DB, linear_to_db};

/// Peak meter, `n` to `n`, passing audio through untouched.
///
/// Publishes the period's peak across all channels in dBFS on the `level`
/// control output, with a fall-back of `decay_db` per period so the
/// reading does not flicker. Hook an [`Indicator`](crate::Indicator) to it
/// to read the level from another thread.
#[derive(Debug, Clone)]
pub struct Meter {
    decay_db: f32,
    held: f32,
}

impl Default for Meter {
    fn default() -> Self {
        Self::new()
    }
}

impl Meter {
    /// Meter with a 1.5 dB per period fall-back.
    pub fn new() -> Self {
        Self {
            decay_db: 1.5,
            held: FLOOR_DB,
        }
    }

    /// Meter with an instant fall-back.
    pub fn instant() -> Self {
        Self {
            decay_db: f32::INFINITY,
            held: FLOOR_DB,
        }
    }
}

impl Module for Meter {
    fn kind(&self) -> &'static str {
        "meter"
    }

    fn bind(&mut self, _ctx: &ModuleContext, ports: &mut PortLayout<'_>) -> Result<(), BackendError> {
        ports.control_output("level", ControlHints::decibels(FLOOR_DB, 6.0, FLOOR_DB));
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
        let mut peak = 0.0f32;
        for j in 0..ctx.channels() {
            peak = ctx.channel(j).iter().fold(peak, |acc, s| acc.max(s.abs()));
        }
        let db = linear_to_db(peak);
        self.held = db.max(self.held - self.decay_db).max(FLOOR_DB);
        ctx.set_control_output(0, self.held.min(6.0));
    }

    fn process_bypassed(&mut self, ctx: &mut ProcessContext<'_>) {
        self.held = FLOOR_DB;
        ctx.set_control_output(0, FLOOR_DB);
        ctx.pass_through();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use cadena_core::{Chain, DummyBackend};

    use crate::IoAdapter;

    fn metered(meter: Meter) -> (Chain, cadena_core::PortId) {
        let mut chain = Chain::new("strip", Arc::new(DummyBackend::new(48000, 32)));
        chain.insert(None, Box::new(IoAdapter::capture(2))).unwrap();
        let id = chain.insert(None, Box::new(meter)).unwrap();
        chain.insert(None, Box::new(IoAdapter::playback())).unwrap();
        let level = chain.control_output(id, "level").unwrap();
        (chain, level)
    }

    #[test]
    fn test_reports_peak_of_loudest_channel() {
        let (mut chain, level) = metered(Meter::instant());
        chain.write_external_inputs(|k, f| f.fill(if k == 0 { 0.1 } else { 0.5 }));
        chain.process(32);
        let db = chain.control_value(level).unwrap();
        assert!((db - linear_to_db(0.5)).abs() < 1e-3);
    }

    #[test]
    fn test_silence_reads_floor() {
        let (mut chain, level) = metered(Meter::instant());
        chain.process(32);
        assert_eq!(chain.control_value(level), Some(FLOOR_DB));
    }

    #[test]
    fn test_falls_back_gradually() {
        let (mut chain, level) = metered(Meter::new());
        chain.write_external_inputs(|_, f| f.fill(1.0));
        chain.process(32);
        chain.write_external_inputs(|_, f| f.fill(0.0));
        chain.process(32);
        assert!((chain.control_value(level).unwrap() + 1.5).abs() < 1e-3);
    }

    #[test]
    fn test_audio_is_untouched() {
        let (mut chain, _) = metered(Meter::new());
        chain.write_external_inputs(|_, f| f.fill(0.25));
        chain.process(32);
        chain.read_external_outputs(|_, f| assert!(f.iter().all(|&s| s == 0.25)));
    }
}
