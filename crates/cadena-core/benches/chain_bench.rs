//! Criterion benchmarks for the chain engine (`cadena-core::chain`).
//!
//! Measures chain overhead independently of DSP cost using a trivial
//! in-place `Gain` module. Two axes:
//!
//! - **Edit** - insert/remove with full downstream validation and reconfiguration
//! - **Process** - `process()` throughput at varying period sizes
//!
//! Run with: `cargo bench -p cadena-core -- chain/`
#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use cadena_core::{Chain, DummyBackend, Module, PortLayout, ProcessContext};

const SAMPLE_RATE: u32 = 48000;
const PERIOD: usize = 256;
const PERIODS: &[usize] = &[64, 128, 256, 512, 1024];

// ---------------------------------------------------------------------------
// Trivial Gain module: isolates chain overhead from DSP cost
// ---------------------------------------------------------------------------

struct Gain(f32);

impl Module for Gain {
    fn kind(&self) -> &'static str {
        "gain"
    }

    fn can_support_inputs(&self, n: usize) -> Option<usize> {
        Some(n.max(2))
    }

    fn configure_inputs(&mut self, n: usize, ports: &mut PortLayout<'_>) -> bool {
        ports.resize_audio_inputs(n);
        ports.resize_audio_outputs(n.max(2));
        true
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) {
        for j in 0..ctx.channels() {
            ctx.channel_mut(j).iter_mut().for_each(|s| *s *= self.0);
        }
    }
}

fn make_chain(n: usize, period: usize) -> Chain {
    let mut chain = Chain::new("bench", Arc::new(DummyBackend::new(SAMPLE_RATE, period)));
    for _ in 0..n {
        chain.insert(None, Box::new(Gain(0.9))).unwrap();
    }
    chain
}

// ---------------------------------------------------------------------------
// Edit benchmarks
// ---------------------------------------------------------------------------

fn bench_edit(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain/edit");

    for &n in &[5usize, 20] {
        group.bench_with_input(BenchmarkId::new("insert_remove_head", n), &n, |b, &n| {
            let mut chain = make_chain(n, PERIOD);
            b.iter(|| {
                let head = chain.module_at(0);
                let id = chain.insert(head, Box::new(Gain(0.5))).unwrap();
                black_box(chain.remove(id).unwrap());
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Process benchmarks
// ---------------------------------------------------------------------------

fn bench_process(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain/process");

    for &n in &[5usize, 20] {
        let mut chain = make_chain(n, PERIOD);
        group.bench_function(format!("linear_{n}_period{PERIOD}"), |b| {
            b.iter(|| chain.process(black_box(PERIOD)));
        });
    }

    for &period in PERIODS {
        let mut chain = make_chain(5, period);
        group.bench_with_input(BenchmarkId::new("linear_5", period), &period, |b, &p| {
            b.iter(|| chain.process(black_box(p)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_edit, bench_process);
criterion_main!(benches);
