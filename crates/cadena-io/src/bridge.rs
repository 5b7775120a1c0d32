//! Adapts device callbacks of any size to fixed chain periods.
//!
//! cpal hands out interleaved buffers whose length need not match the
//! chain's period. [`PeriodBridge`] queues captured frames, runs the chain
//! one full period at a time through [`ChainClient::with_io`], and queues
//! the rendered frames until the device asks for them.
//!
//! Channel mapping in both directions: channel `k` goes to channel `k`; a
//! single source channel is copied to every destination; anything else
//! missing is silence.

use std::collections::VecDeque;

use cadena_core::{ChainClient, ProcessOutcome};

/// Captured input is capped at this many periods; older frames are dropped.
const MAX_PENDING_PERIODS: usize = 4;

/// Period-size adapter between a device and a [`ChainClient`].
#[derive(Debug)]
pub struct PeriodBridge {
    nframes: usize,
    in_channels: usize,
    out_channels: usize,
    pending_in: VecDeque<f32>,
    pending_out: VecDeque<f32>,
    period_in: Vec<f32>,
    period_out: Vec<f32>,
}

impl PeriodBridge {
    /// Creates a bridge for `nframes`-frame periods between a device with
    /// `in_channels` capture and `out_channels` playback channels.
    pub fn new(nframes: usize, in_channels: usize, out_channels: usize) -> Self {
        let nframes = nframes.max(1);
        Self {
            nframes,
            in_channels,
            out_channels,
            pending_in: VecDeque::with_capacity(nframes * in_channels * (MAX_PENDING_PERIODS + 1)),
            pending_out: VecDeque::with_capacity(nframes * out_channels * 2),
            period_in: vec![0.0; nframes * in_channels],
            period_out: vec![0.0; nframes * out_channels],
        }
    }

    /// Chain period in frames.
    pub fn nframes(&self) -> usize {
        self.nframes
    }

    /// Queues interleaved captured samples.
    pub fn push_input(&mut self, data: &[f32]) {
        if self.in_channels == 0 {
            return;
        }
        self.pending_in.extend(data.iter().copied());
        let cap = self.nframes * self.in_channels * MAX_PENDING_PERIODS;
        if self.pending_in.len() > cap {
            let excess = self.pending_in.len() - cap;
            self.pending_in.drain(..excess);
        }
    }

    /// Fills an interleaved playback buffer, running as many chain periods
    /// as needed. Returns the number of periods dropped to lock contention.
    pub fn fill_output(&mut self, client: &ChainClient, data: &mut [f32]) -> usize {
        if self.out_channels == 0 {
            data.fill(0.0);
            return 0;
        }
        let mut dropped = 0;
        while self.pending_out.len() < data.len() {
            if self.run_period(client) == ProcessOutcome::Dropped {
                dropped += 1;
            }
        }
        let len = data.len();
        for (dst, src) in data.iter_mut().zip(self.pending_out.drain(..len)) {
            *dst = src;
        }
        dropped
    }

    fn run_period(&mut self, client: &ChainClient) -> ProcessOutcome {
        let needed = self.nframes * self.in_channels;
        if self.pending_in.len() >= needed {
            for (dst, src) in self.period_in.iter_mut().zip(self.pending_in.drain(..needed)) {
                *dst = src;
            }
        } else {
            self.period_in.fill(0.0);
        }

        let Self {
            nframes,
            in_channels,
            out_channels,
            period_in,
            period_out,
            ..
        } = self;
        let (nframes, in_channels, out_channels) = (*nframes, *in_channels, *out_channels);
        period_out.fill(0.0);

        let ran = client.with_io(|chain| {
            chain.write_external_inputs(|k, frames| {
                match source_channel(k, in_channels) {
                    Some(c) => {
                        for (i, x) in frames.iter_mut().take(nframes).enumerate() {
                            *x = period_in[i * in_channels + c];
                        }
                    }
                    None => frames.fill(0.0),
                }
            });
            chain.process(nframes);
            let sources = chain.external_outputs();
            chain.read_external_outputs(|k, frames| {
                for c in (0..out_channels).filter(|&c| source_channel(c, sources) == Some(k)) {
                    for (i, &x) in frames.iter().take(nframes).enumerate() {
                        period_out[i * out_channels + c] = x;
                    }
                }
            });
        });

        self.pending_out.extend(self.period_out.iter().copied());
        if ran.is_some() {
            ProcessOutcome::Processed
        } else {
            ProcessOutcome::Dropped
        }
    }
}

/// Source channel feeding destination `k` when `sources` channels exist.
fn source_channel(k: usize, sources: usize) -> Option<usize> {
    match sources {
        0 => None,
        1 => Some(0),
        n if k < n => Some(k),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_channel_mapping() {
        assert_eq!(source_channel(0, 0), None);
        assert_eq!(source_channel(3, 1), Some(0));
        assert_eq!(source_channel(1, 2), Some(1));
        assert_eq!(source_channel(2, 2), None);
    }

    #[test]
    fn test_input_is_capped() {
        let mut bridge = PeriodBridge::new(4, 2, 2);
        bridge.push_input(&[1.0; 100]);
        assert_eq!(bridge.pending_in.len(), 4 * 2 * MAX_PENDING_PERIODS);
    }

    #[test]
    fn test_no_input_channels_ignores_input() {
        let mut bridge = PeriodBridge::new(4, 0, 2);
        bridge.push_input(&[1.0; 8]);
        assert!(bridge.pending_in.is_empty());
    }
}
