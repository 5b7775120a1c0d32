//! Integration tests for the cadena-core chain engine.
//!
//! Drives whole chains through the public API with small inline modules:
//! width adaptation across inserts, placement rules for zero-input
//! generators, satellite teardown, process queue stability, latency
//! propagation and the realtime client's drop counter.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cadena_core::{
    Backend, BackendError, Chain, ChainClient, ChainError, ControlHints, Controls, Direction,
    DummyBackend, LatencyRange, Module, ModuleContext, ModuleId, ModuleRole, PlacementViolation,
    PortLayout, ProcessContext, ProcessOutcome,
};

const NFRAMES: usize = 32;
const FLOOR_DB: f32 = -70.0;

// ============================================================================
// Inline modules
// ============================================================================

/// Hardware bridge: aux inputs feed the outputs, inputs feed aux outputs.
struct Io {
    label: &'static str,
    outputs: usize,
}

impl Io {
    fn capture(outputs: usize) -> Box<dyn Module> {
        Box::new(Self {
            label: "capture",
            outputs,
        })
    }

    fn playback() -> Box<dyn Module> {
        Box::new(Self {
            label: "playback",
            outputs: 0,
        })
    }
}

impl Module for Io {
    fn kind(&self) -> &'static str {
        "io"
    }

    fn role(&self) -> ModuleRole {
        ModuleRole::IoAdapter
    }

    fn bind(&mut self, _ctx: &ModuleContext, ports: &mut PortLayout<'_>) -> Result<(), BackendError> {
        ports.resize_audio_outputs(self.outputs);
        ports.resize_aux_inputs(self.outputs, &format!("{}-in", self.label))
    }

    fn can_support_inputs(&self, _n: usize) -> Option<usize> {
        Some(self.outputs)
    }

    fn configure_inputs(&mut self, n: usize, ports: &mut PortLayout<'_>) -> bool {
        if ports
            .resize_aux_outputs(n, &format!("{}-out", self.label))
            .is_err()
        {
            return false;
        }
        ports.resize_audio_inputs(n);
        true
    }

    fn configure_outputs(&mut self, n: usize, ports: &mut PortLayout<'_>) -> bool {
        if ports
            .resize_aux_inputs(n, &format!("{}-in", self.label))
            .is_err()
        {
            return false;
        }
        ports.resize_audio_outputs(n);
        self.outputs = n;
        true
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) {
        for j in 0..ctx.aux_outputs() {
            ctx.channel_to_aux(j, j);
        }
        for k in 0..ctx.aux_inputs() {
            ctx.aux_to_channel(k, k);
        }
    }
}

/// Mono gain: accepts exactly one channel.
struct MonoGain;

impl Module for MonoGain {
    fn kind(&self) -> &'static str {
        "mono-gain"
    }

    fn bind(&mut self, _ctx: &ModuleContext, ports: &mut PortLayout<'_>) -> Result<(), BackendError> {
        ports.control_input("gain", ControlHints::linear(0.0, 4.0, 1.0));
        Ok(())
    }

    fn can_support_inputs(&self, n: usize) -> Option<usize> {
        (n == 1).then_some(1)
    }

    fn configure_inputs(&mut self, n: usize, ports: &mut PortLayout<'_>) -> bool {
        if n != 1 {
            return false;
        }
        ports.resize_audio_inputs(1);
        ports.resize_audio_outputs(1);
        true
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) {
        let gain = ctx.control_input(0);
        ctx.channel_mut(0).iter_mut().for_each(|s| *s *= gain);
    }
}

/// Gain on any width.
struct Gain {
    latency: u32,
}

impl Module for Gain {
    fn kind(&self) -> &'static str {
        "gain"
    }

    fn bind(&mut self, _ctx: &ModuleContext, ports: &mut PortLayout<'_>) -> Result<(), BackendError> {
        ports.control_input("gain", ControlHints::linear(0.0, 4.0, 1.0));
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
        let gain = ctx.control_input(0);
        for j in 0..ctx.channels() {
            ctx.channel_mut(j).iter_mut().for_each(|s| *s *= gain);
        }
    }

    fn latency(&self) -> u32 {
        self.latency
    }
}

/// Peak meter publishing dBFS on a control output.
struct Meter;

impl Module for Meter {
    fn kind(&self) -> &'static str {
        "meter"
    }

    fn bind(&mut self, _ctx: &ModuleContext, ports: &mut PortLayout<'_>) -> Result<(), BackendError> {
        ports.control_output("level", ControlHints::linear(FLOOR_DB, 6.0, FLOOR_DB));
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
        let db = if peak > 0.0 { 20.0 * peak.log10() } else { FLOOR_DB };
        ctx.set_control_output(0, db);
    }
}

/// Zero-input generator writing a constant.
struct Synth;

impl Module for Synth {
    fn kind(&self) -> &'static str {
        "synth"
    }

    fn role(&self) -> ModuleRole {
        ModuleRole::Generator
    }

    fn can_support_inputs(&self, n: usize) -> Option<usize> {
        (n == 0).then_some(1)
    }

    fn configure_inputs(&mut self, n: usize, ports: &mut PortLayout<'_>) -> bool {
        if n != 0 {
            return false;
        }
        ports.resize_audio_outputs(1);
        true
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) {
        ctx.channel_mut(0).fill(0.25);
    }
}

/// Controller holding a fixed value on its output.
struct Fader;

impl Module for Fader {
    fn kind(&self) -> &'static str {
        "fader"
    }

    fn role(&self) -> ModuleRole {
        ModuleRole::Controller
    }

    fn bind(&mut self, _ctx: &ModuleContext, ports: &mut PortLayout<'_>) -> Result<(), BackendError> {
        ports.control_output("out", ControlHints::linear(FLOOR_DB, 6.0, 0.0));
        Ok(())
    }

    fn can_support_inputs(&self, _n: usize) -> Option<usize> {
        Some(0)
    }

    fn configure_inputs(&mut self, _n: usize, _ports: &mut PortLayout<'_>) -> bool {
        true
    }

    fn process(&mut self, _ctx: &mut ProcessContext<'_>) {}
}

/// Level display that falls to the floor when its driver goes away.
struct Display {
    floored: Arc<AtomicBool>,
}

impl Module for Display {
    fn kind(&self) -> &'static str {
        "display"
    }

    fn role(&self) -> ModuleRole {
        ModuleRole::Indicator
    }

    fn bind(&mut self, _ctx: &ModuleContext, ports: &mut PortLayout<'_>) -> Result<(), BackendError> {
        ports.control_input("level", ControlHints::linear(FLOOR_DB, 6.0, FLOOR_DB));
        Ok(())
    }

    fn can_support_inputs(&self, _n: usize) -> Option<usize> {
        Some(0)
    }

    fn configure_inputs(&mut self, _n: usize, _ports: &mut PortLayout<'_>) -> bool {
        true
    }

    fn process(&mut self, _ctx: &mut ProcessContext<'_>) {}

    fn handle_control_disconnect(&mut self, index: usize, controls: &Controls<'_>) {
        controls.set_input(index, FLOOR_DB);
        self.floored.store(true, Ordering::Relaxed);
    }
}

fn new_chain() -> (Chain, Arc<DummyBackend>) {
    let backend = Arc::new(DummyBackend::new(48000, NFRAMES));
    (Chain::new("strip", backend.clone()), backend)
}

/// `[Io(channels), Meter, Io]`
fn metered(channels: usize) -> (Chain, Arc<DummyBackend>, [ModuleId; 3]) {
    let (mut chain, backend) = new_chain();
    let a = chain.insert(None, Io::capture(channels)).unwrap();
    let m = chain.insert(None, Box::new(Meter)).unwrap();
    let p = chain.insert(None, Io::playback()).unwrap();
    (chain, backend, [a, m, p])
}

fn port_shapes(chain: &Chain) -> Vec<(usize, usize)> {
    chain
        .modules()
        .iter()
        .map(|&id| (chain.ninputs(id), chain.noutputs(id)))
        .collect()
}

fn assert_adjacent(chain: &Chain) {
    for pair in chain.modules().windows(2) {
        assert_eq!(
            chain.ninputs(pair[1]),
            chain.noutputs(pair[0]),
            "width mismatch between {} and {}",
            pair[0],
            pair[1]
        );
    }
}

// ============================================================================
// 1. Width adaptation
// ============================================================================

#[test]
fn gain_adopts_upstream_width() {
    let (mut chain, _, [a, m, p]) = metered(2);
    let g = chain.insert(Some(m), Box::new(Gain { latency: 0 })).unwrap();

    assert_eq!(chain.modules(), &[a, g, m, p]);
    assert_eq!(chain.ninputs(g), 2);
    assert_eq!(chain.noutputs(g), 2);
    assert_eq!(chain.required_buffers(), 2);
    assert_eq!(chain.scratch_len(), 2);
    assert_adjacent(&chain);
}

#[test]
fn rejected_insert_changes_nothing() {
    let (mut chain, backend, [a, m, p]) = metered(2);
    let shapes = port_shapes(&chain);
    let names = backend.port_names();

    let err = chain.insert(Some(m), Box::new(MonoGain)).unwrap_err();
    assert_eq!(err, ChainError::rejected("mono-gain", 2));
    assert_eq!(chain.modules(), &[a, m, p]);
    assert_eq!(port_shapes(&chain), shapes);
    assert_eq!(backend.port_names(), names);
}

#[test]
fn remove_then_reinsert_restores_buffers() {
    let (mut chain, _, [_, m, _]) = metered(2);
    let g = chain.insert(Some(m), Box::new(Gain { latency: 0 })).unwrap();
    let before = chain.required_buffers();

    let gain = chain.remove(g).unwrap();
    chain.insert(Some(m), gain).unwrap();
    assert_eq!(chain.required_buffers(), before);
    assert_adjacent(&chain);
}

#[test]
fn adapter_width_change_cascades() {
    let (mut chain, _, [a, m, p]) = metered(1);
    chain.configure_outputs(a, 2).unwrap();
    assert_eq!(chain.ninputs(m), 2);
    assert_eq!(chain.ninputs(p), 2);
    assert_eq!(chain.scratch_len(), 2);

    chain.insert(Some(p), Box::new(Gain { latency: 0 })).unwrap();
    let mono = chain
        .insert(
            Some(p),
            Box::new(Io {
                label: "return",
                outputs: 1,
            }),
        )
        .unwrap();
    chain.insert(Some(p), Box::new(MonoGain)).unwrap();
    assert!(chain.configure_outputs(mono, 2).is_err());
    assert_eq!(chain.noutputs(mono), 1);
    assert_adjacent(&chain);
}

// ============================================================================
// 2. Zero-input generators
// ============================================================================

#[test]
fn synth_must_follow_adapter() {
    let (mut chain, _, [a, m, p]) = metered(2);
    let shapes = port_shapes(&chain);

    assert_eq!(
        chain.insert(Some(p), Box::new(Synth)).unwrap_err(),
        ChainError::InsertionRejected(PlacementViolation::GeneratorNotAfterAdapter)
    );
    assert_eq!(chain.modules(), &[a, m, p]);
    assert_eq!(port_shapes(&chain), shapes);

    let s = chain.insert(Some(m), Box::new(Synth)).unwrap();
    assert_eq!(chain.noutputs(a), 0);
    assert_eq!(chain.ninputs(s), 0);
    assert_eq!(chain.ninputs(m), 1);
    assert_adjacent(&chain);
}

#[test]
fn synth_output_reaches_playback() {
    let (mut chain, _, [_, m, _]) = metered(1);
    chain.insert(Some(m), Box::new(Synth)).unwrap();
    chain.process(NFRAMES);

    let mut seen = Vec::new();
    chain.read_external_outputs(|ch, frames| seen.push((ch, frames[NFRAMES - 1])));
    assert_eq!(seen, vec![(0, 0.25)]);
}

// ============================================================================
// 3. Satellites
// ============================================================================

#[test]
fn removing_meter_floors_display() {
    let (mut chain, _, [_, m, _]) = metered(1);
    let level = chain.control_output(m, "level").unwrap();
    let floored = Arc::new(AtomicBool::new(false));
    let d = chain
        .add_indicator(Box::new(Display { floored: floored.clone() }), level)
        .unwrap();
    let input = chain.control_input(d, "level").unwrap();

    chain.write_external_inputs(|_, frames| frames.fill(0.5));
    chain.process(NFRAMES);
    let shown = chain.control_value(input).unwrap();
    assert!((shown - 20.0 * 0.5f32.log10()).abs() < 1e-4);

    chain.remove(m).unwrap();
    assert!(!chain.port(input).unwrap().connected());
    assert_eq!(chain.control_value(input), Some(FLOOR_DB));
    assert!(floored.load(Ordering::Relaxed));
}

#[test]
fn removing_sole_controller_floors_display() {
    let (mut chain, _) = new_chain();
    let floored = Arc::new(AtomicBool::new(false));
    let m = chain.insert(None, Box::new(Meter)).unwrap();
    let level = chain.control_output(m, "level").unwrap();
    let d = chain
        .add_indicator(Box::new(Display { floored: floored.clone() }), level)
        .unwrap();
    let input = chain.control_input(d, "level").unwrap();
    chain.disconnect(input).unwrap();
    floored.store(false, Ordering::Relaxed);

    let f = chain.add_controller(Box::new(Fader), input).unwrap();
    assert!(chain.port(input).unwrap().connected());
    assert_eq!(chain.control_value(input), Some(0.0));

    chain.remove(f).unwrap();
    assert!(!chain.port(input).unwrap().connected());
    assert_eq!(chain.control_value(input), Some(FLOOR_DB));
    assert!(floored.load(Ordering::Relaxed));
}

#[test]
fn controller_follows_its_target_out() {
    let (mut chain, _, [_, m, _]) = metered(1);
    let g = chain.insert(Some(m), Box::new(Gain { latency: 0 })).unwrap();
    let gain = chain.control_input(g, "gain").unwrap();
    let f = chain.add_controller(Box::new(Fader), gain).unwrap();
    assert!(chain.process_queue().contains(&f));

    chain.remove(g).unwrap();
    assert!(!chain.contains(f));
    let dropped = chain.take_removed();
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].kind(), "fader");
}

// ============================================================================
// 4. Process queue
// ============================================================================

#[test]
fn queue_is_idempotent() {
    let (mut chain, _, [a, m, p]) = metered(2);
    let level = chain.control_output(m, "level").unwrap();
    let d = chain
        .add_indicator(Box::new(Display { floored: Arc::default() }), level)
        .unwrap();
    assert_eq!(chain.process_queue(), &[a, m, d, p]);

    let first = chain.process_queue().to_vec();
    chain.build_process_queue();
    assert_eq!(chain.process_queue(), first.as_slice());
}

// ============================================================================
// 5. Latency
// ============================================================================

#[test]
fn latency_resets_at_external_windows() {
    let (mut chain, backend, [a, m, p]) = metered(1);
    chain.insert(Some(m), Box::new(Gain { latency: 10 })).unwrap();
    chain.insert(Some(p), Box::new(Gain { latency: 5 })).unwrap();

    let capture = chain.ports_of(a).unwrap().aux_inputs()[0];
    let ext = chain.port(capture).unwrap().external().unwrap();
    backend.set_port_latency(ext, Direction::Input, LatencyRange::new(100, 200));

    assert_eq!(
        chain.set_latency(Direction::Input),
        LatencyRange::new(115, 215)
    );
    assert_eq!(chain.latency(Direction::Output), LatencyRange::fixed(15));
}

// ============================================================================
// 6. Realtime client
// ============================================================================

#[test]
fn client_counts_dropped_periods() {
    let (chain, _, [_, m, _]) = metered(1);
    let client = ChainClient::new(chain);
    let rt = client.clone();

    assert_eq!(rt.process(NFRAMES), ProcessOutcome::Processed);
    let removed = client.edit(|chain| {
        assert_eq!(rt.process(NFRAMES), ProcessOutcome::Dropped);
        chain.remove(m)
    });
    assert!(removed.is_ok());
    assert_eq!(client.dropped_buffers(), 1);

    let len = rt.with_io(|chain| {
        chain.write_external_inputs(|_, frames| frames.fill(1.0));
        chain.process(NFRAMES);
        chain.len()
    });
    assert_eq!(len, Some(2));
}
