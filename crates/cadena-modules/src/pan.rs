//! Mono to stereo panner.

use core::f32::consts::FRAC_PI_4;

use cadena_core::{
    BackendError, ControlHints, Module, ModuleContext, PortLayout, ProcessContext,
};
use libm::{cosf, sinf};

/// Constant-power panner, exactly one input to two outputs.
///
/// `pan` runs from -1 (hard left) to +1 (hard right). The centre position
/// puts both sides at -3 dB.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonoPan;

impl MonoPan {
    /// Centre-panned.
    pub fn new() -> Self {
        Self
    }

    /// Left and right gains for `pan`.
    pub fn gains(pan: f32) -> (f32, f32) {
        let angle = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
        (cosf(angle), sinf(angle))
    }
}

impl Module for MonoPan {
    fn kind(&self) -> &'static str {
        "pan"
    }

    fn bind(&mut self, _ctx: &ModuleContext, ports: &mut PortLayout<'_>) -> Result<(), BackendError> {
        ports.control_input("pan", ControlHints::linear(-1.0, 1.0, 0.0));
        Ok(())
    }

    fn can_support_inputs(&self, n: usize) -> Option<usize> {
        (n == 1).then_some(2)
    }

    fn configure_inputs(&mut self, n: usize, ports: &mut PortLayout<'_>) -> bool {
        if n != 1 {
            return false;
        }
        ports.resize_audio_inputs(1);
        ports.resize_audio_outputs(2);
        true
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) {
        let (l, r) = Self::gains(ctx.control_input(0));
        if let Some((left, right)) = ctx.channel_pair_mut(0, 1) {
            for (a, b) in left.iter_mut().zip(right.iter_mut()) {
                let x = *a;
                *a = x * l;
                *b = x * r;
            }
        }
    }
}
