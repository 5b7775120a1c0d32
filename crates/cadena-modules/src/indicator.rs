//! Level display fed by another module's control output.

use cadena_core::{
    BackendError, ControlCell, ControlHints, Controls, Module, ModuleContext, ModuleRole,
    PortLayout, ProcessContext,
};

use crate::dsp::FLOOR_DB;

/// Indicator satellite.
///
/// Copies its `level` control input into a display cell once per period.
/// The cell is shared with whoever called [`display`](Self::display), so a
/// UI thread can read it without touching the chain. When the input loses
/// its driver both the input and the display fall to the floor.
#[derive(Debug, Clone)]
pub struct Indicator {
    floor: f32,
    display: ControlCell,
}

impl Default for Indicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator {
    /// Level indicator floored at [`FLOOR_DB`].
    pub fn new() -> Self {
        Self::with_floor(FLOOR_DB)
    }

    /// Indicator that drops to `floor` when disconnected.
    pub fn with_floor(floor: f32) -> Self {
        Self {
            floor,
            display: ControlCell::new(floor),
        }
    }

    /// Shared display value.
    pub fn display(&self) -> ControlCell {
        self.display.clone()
    }
}

impl Module for Indicator {
    fn kind(&self) -> &'static str {
        "indicator"
    }

    fn role(&self) -> ModuleRole {
        ModuleRole::Indicator
    }

    fn bind(&mut self, _ctx: &ModuleContext, ports: &mut PortLayout<'_>) -> Result<(), BackendError> {
        ports.control_input("level", ControlHints::decibels(self.floor, 6.0, self.floor));
        Ok(())
    }

    fn can_support_inputs(&self, n: usize) -> Option<usize> {
        (n == 0).then_some(0)
    }

    fn configure_inputs(&mut self, n: usize, _ports: &mut PortLayout<'_>) -> bool {
        n == 0
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) {
        self.display.store(ctx.control_input(0));
    }

    fn process_bypassed(&mut self, _ctx: &mut ProcessContext<'_>) {}

    fn deactivate(&mut self) {
        self.display.store(self.floor);
    }

    fn handle_control_disconnect(&mut self, index: usize, controls: &Controls<'_>) {
        if index == 0 {
            controls.set_input(0, self.floor);
            self.display.store(self.floor);
        }
    }
}
