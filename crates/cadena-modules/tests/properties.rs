//! Property-based tests for the registered signal-path modules.
//!
//! Every processor in the registry is dropped into a
//! `capture → module → playback` strip with random control values and must
//! produce finite, bounded output, or be rejected with the chain unchanged.

use std::sync::Arc;

use cadena_core::{Chain, DummyBackend, ModuleId, ModuleRole};
use cadena_modules::{IoAdapter, ModuleRegistry};
use proptest::prelude::*;

const NFRAMES: usize = 32;

fn processor_kinds() -> Vec<&'static str> {
    ModuleRegistry::new()
        .all_modules()
        .filter(|d| d.role == ModuleRole::Processor)
        .map(|d| d.kind)
        .collect()
}

/// Sets every control input of `id` from normalized values.
fn set_random_controls(chain: &mut Chain, id: ModuleId, values: &[f32; 8]) {
    let ports = chain.ports_of(id).unwrap().control_inputs().to_vec();
    for (i, port) in ports.into_iter().enumerate() {
        let hints = chain.port(port).unwrap().hints();
        let value = hints.denormalize(values[i % 8]);
        chain.set_control_value(port, value).unwrap();
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// For input in [-1, 1] and any control values, every processor's
    /// output stays finite and within +/-4 (at most +12 dB).
    #[test]
    fn processors_finite_and_bounded(
        input in prop::array::uniform32(-1.0f32..=1.0f32),
        controls in prop::array::uniform8(0.0f32..=1.0f32),
        channels in 1usize..4,
        kind_idx in 0usize..8,
    ) {
        let kinds = processor_kinds();
        let kind = kinds[kind_idx % kinds.len()];
        let registry = ModuleRegistry::new();

        let mut chain = Chain::new("prop", Arc::new(DummyBackend::new(48000, NFRAMES)));
        chain.insert(None, Box::new(IoAdapter::capture(channels))).unwrap();
        chain.insert(None, Box::new(IoAdapter::playback())).unwrap();
        let tail = chain.module_at(1);

        let before = chain.required_buffers();
        let Ok(id) = chain.insert(tail, registry.create(kind).unwrap()) else {
            prop_assert_eq!(chain.len(), 2);
            prop_assert_eq!(chain.required_buffers(), before);
            return Ok(());
        };
        set_random_controls(&mut chain, id, &controls);

        for _ in 0..8 {
            chain.write_external_inputs(|_, f| f.copy_from_slice(&input));
            chain.process(NFRAMES);
            let mut ok = true;
            chain.read_external_outputs(|_, f| {
                ok &= f.iter().all(|s| s.is_finite() && s.abs() <= 4.0);
            });
            prop_assert!(ok, "module '{}' produced out-of-range output", kind);
        }
    }

    /// Modules keep the strip width-consistent whatever width reaches them.
    #[test]
    fn strip_stays_consistent(channels in 0usize..5, kind_idx in 0usize..8) {
        let kinds = processor_kinds();
        let kind = kinds[kind_idx % kinds.len()];
        let registry = ModuleRegistry::new();

        let mut chain = Chain::new("prop", Arc::new(DummyBackend::new(48000, NFRAMES)));
        chain.insert(None, Box::new(IoAdapter::capture(channels))).unwrap();
        chain.insert(None, Box::new(IoAdapter::playback())).unwrap();
        let _ = chain.insert(chain.module_at(1), registry.create(kind).unwrap());

        for pair in chain.modules().windows(2) {
            prop_assert_eq!(chain.ninputs(pair[1]), chain.noutputs(pair[0]));
        }
        prop_assert_eq!(chain.scratch_len(), chain.required_buffers());
    }
}
