//! Control-rate driver for another module's control input.

use cadena_core::{
    BackendError, ControlHints, LogEntry, Module, ModuleContext, ModuleRole, PortLayout,
    ProcessContext,
};

use crate::dsp::Phasor;

/// Controller satellite.
///
/// Holds a `value` and publishes it on its `out` control output, optionally
/// swept by a sine LFO of `rate` Hz and `depth` (fraction of half the
/// range). Attach it with [`Chain::add_controller`](cadena_core::Chain::add_controller);
/// the chain runs it right before the module it drives.
///
/// # Settings
///
/// `min`, `max`, `rate` and `depth`. `min`/`max` shape the ports and must
/// be applied before the controller is added.
#[derive(Debug, Clone)]
pub struct Controller {
    min: f32,
    max: f32,
    initial: f32,
    rate: f32,
    depth: f32,
    lfo: Phasor,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }
}

impl Controller {
    /// Constant controller over `min..=max` starting at `initial`.
    pub fn new(min: f32, max: f32, initial: f32) -> Self {
        Self {
            min,
            max,
            initial: initial.clamp(min, max),
            rate: 0.0,
            depth: 0.0,
            lfo: Phasor::new(48000.0, 0.0),
        }
    }

    /// Controller matching a target port's range and default.
    pub fn for_hints(hints: ControlHints) -> Self {
        Self::new(hints.min, hints.max, hints.default)
    }

    /// Adds a sine sweep.
    #[must_use]
    pub fn with_lfo(mut self, rate: f32, depth: f32) -> Self {
        self.rate = rate.max(0.0);
        self.depth = depth.clamp(0.0, 1.0);
        self
    }

    fn hints(&self) -> ControlHints {
        ControlHints::linear(self.min, self.max, self.initial)
    }

    /// Output for a held `value` at the current LFO position.
    fn output(&mut self, value: f32) -> f32 {
        if self.depth == 0.0 || self.rate == 0.0 {
            return value;
        }
        let swing = (self.max - self.min) * 0.5 * self.depth;
        (value + swing * self.lfo.next_sine()).clamp(self.min, self.max)
    }
}

impl Module for Controller {
    fn kind(&self) -> &'static str {
        "controller"
    }

    fn role(&self) -> ModuleRole {
        ModuleRole::Controller
    }

    fn bind(&mut self, ctx: &ModuleContext, ports: &mut PortLayout<'_>) -> Result<(), BackendError> {
        ports.control_output("out", self.hints());
        ports.control_input("value", self.hints());
        self.lfo = Phasor::new(ctx.sample_rate() as f32, self.rate);
        Ok(())
    }

    fn can_support_inputs(&self, n: usize) -> Option<usize> {
        (n == 0).then_some(0)
    }

    fn configure_inputs(&mut self, n: usize, _ports: &mut PortLayout<'_>) -> bool {
        n == 0
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) {
        let out = self.output(ctx.control_input(0));
        // The sine was sampled once; account for the rest of the period.
        self.lfo.advance(ctx.nframes().saturating_sub(1));
        ctx.set_control_output(0, out);
    }

    fn process_bypassed(&mut self, ctx: &mut ProcessContext<'_>) {
        ctx.set_control_output(0, ctx.control_input(0));
    }

    fn handle_control_changed(&mut self, index: usize, value: f32) {
        if index == 0 {
            self.initial = value;
        }
    }

    fn set_sample_rate(&mut self, sample_rate: u32) {
        self.lfo.set_sample_rate(sample_rate as f32);
    }

    fn get(&self, entry: &mut LogEntry) {
        entry.add("min", self.min);
        entry.add("max", self.max);
        entry.add("rate", self.rate);
        entry.add("depth", self.depth);
    }

    fn set(&mut self, entry: &LogEntry) {
        if let Some(min) = entry.parse::<f32>("min") {
            self.min = min;
        }
        if let Some(max) = entry.parse::<f32>("max") {
            self.max = max.max(self.min);
        }
        if let Some(rate) = entry.parse::<f32>("rate") {
            self.rate = rate.max(0.0);
            self.lfo.set_frequency(self.rate);
        }
        if let Some(depth) = entry.parse::<f32>("depth") {
            self.depth = depth.clamp(0.0, 1.0);
        }
        self.initial = self.initial.clamp(self.min, self.max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use cadena_core::{Chain, DummyBackend, ModuleId};

    use crate::{Gain, IoAdapter};

    fn driven(controller: Controller) -> (Chain, ModuleId, ModuleId) {
        let mut chain = Chain::new("strip", Arc::new(DummyBackend::new(48000, 32)));
        chain.insert(None, Box::new(IoAdapter::capture(1))).unwrap();
        let gain = chain.insert(None, Box::new(Gain::new())).unwrap();
        chain.insert(None, Box::new(IoAdapter::playback())).unwrap();
        let target = chain.control_input(gain, "gain").unwrap();
        let ctl = chain.add_controller(Box::new(controller), target).unwrap();
        (chain, gain, ctl)
    }

    #[test]
    fn test_runs_before_target() {
        let (chain, gain, ctl) = driven(Controller::new(-70.0, 12.0, 0.0));
        let queue = chain.process_queue();
        let at = |id| queue.iter().position(|&m| m == id).unwrap();
        assert_eq!(at(ctl) + 1, at(gain));
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn test_value_reaches_target() {
        let (mut chain, gain, ctl) = driven(Controller::new(-70.0, 12.0, 0.0));
        let value = chain.control_input(ctl, "value").unwrap();
        chain.set_control_value(value, -20.0).unwrap();
        chain.process(32);
        let target = chain.control_input(gain, "gain").unwrap();
        assert_eq!(chain.control_value(target), Some(-20.0));
    }

    #[test]
    fn test_lfo_sweeps_within_range() {
        let (mut chain, gain, _) =
            driven(Controller::new(-12.0, 0.0, -6.0).with_lfo(50.0, 1.0));
        let target = chain.control_input(gain, "gain").unwrap();
        let mut seen = Vec::new();
        for _ in 0..60 {
            chain.process(32);
            seen.push(chain.control_value(target).unwrap());
        }
        assert!(seen.iter().all(|v| (-12.0..=0.0).contains(v)));
        let lo = seen.iter().copied().fold(f32::MAX, f32::min);
        let hi = seen.iter().copied().fold(f32::MIN, f32::max);
        assert!(hi - lo > 6.0);
    }

    #[test]
    fn test_removing_target_destroys_controller() {
        let (mut chain, gain, ctl) = driven(Controller::default());
        chain.remove(gain).unwrap();
        assert!(!chain.contains(ctl));
        assert_eq!(chain.take_removed().len(), 1);
    }

    #[test]
    fn test_default_controller_survives() {
        let (mut chain, gain, ctl) = driven(Controller::default());
        chain.set_default(ctl, true).unwrap();
        chain.remove(gain).unwrap();
        assert!(chain.contains(ctl));
    }

    #[test]
    fn test_settings() {
        let mut c = Controller::default();
        c.set(&[("min", "-1"), ("max", "1"), ("rate", "2"), ("depth", "0.5")]
            .into_iter()
            .collect());
        let mut entry = LogEntry::new();
        c.get(&mut entry);
        assert_eq!(entry.parse::<f32>("min"), Some(-1.0));
        assert_eq!(entry.parse::<f32>("rate"), Some(2.0));
        assert_eq!(entry.parse::<f32>("depth"), Some(0.5));
    }
}
