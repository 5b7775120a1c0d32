//! Offline rendering through a [`DummyBackend`].

use std::sync::Arc;

use cadena_core::{Backend, Chain, DummyBackend};

/// Runs a chain faster than real time, one period at a time.
///
/// The chain must have been built on the same backend; the renderer rolls
/// its transport and advances it by one period after every call to
/// [`Chain::process`].
#[derive(Debug, Clone)]
pub struct OfflineRenderer {
    backend: Arc<DummyBackend>,
}

impl OfflineRenderer {
    /// Creates a renderer over `backend`.
    pub fn new(backend: Arc<DummyBackend>) -> Self {
        Self { backend }
    }

    /// The backend as the chain sees it.
    pub fn backend(&self) -> Arc<dyn Backend> {
        self.backend.clone()
    }

    /// Renders `frames` frames and returns one vector per external output.
    ///
    /// External input `k` reads `input[k]`; a single input channel feeds
    /// every external input. Inputs shorter than `frames`, and inputs the
    /// slice does not cover, read silence. `progress` receives the number
    /// of frames rendered so far after each period.
    pub fn render(
        &self,
        chain: &mut Chain,
        input: &[Vec<f32>],
        frames: usize,
        mut progress: impl FnMut(usize),
    ) -> Vec<Vec<f32>> {
        let nframes = chain.nframes().max(1);
        let mut output = vec![Vec::with_capacity(frames); chain.external_outputs()];

        self.backend.set_rolling(true);
        let mut done = 0;
        while done < frames {
            let take = nframes.min(frames - done);
            chain.write_external_inputs(|k, buf| {
                buf.fill(0.0);
                let source = if input.len() == 1 { input.first() } else { input.get(k) };
                if let Some(src) = source
                    && done < src.len()
                {
                    let end = (done + take).min(src.len());
                    buf[..end - done].copy_from_slice(&src[done..end]);
                }
            });
            chain.process(nframes);
            chain.read_external_outputs(|k, buf| {
                if let Some(out) = output.get_mut(k) {
                    out.extend_from_slice(&buf[..take.min(buf.len())]);
                }
            });
            self.backend.advance(nframes as u64);
            done += take;
            progress(done);
        }
        self.backend.set_rolling(false);

        tracing::info!(
            chain = chain.name(),
            frames,
            channels = output.len(),
            "offline render finished"
        );
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadena_modules::{Gain, IoAdapter};

    fn strip(backend: &OfflineRenderer, channels: usize, db: f32) -> Chain {
        let mut chain = Chain::new("render", backend.backend());
        chain.insert(None, Box::new(IoAdapter::capture(channels))).unwrap();
        chain.insert(None, Box::new(Gain::with_db(db))).unwrap();
        chain.insert(None, Box::new(IoAdapter::playback())).unwrap();
        chain
    }

    #[test]
    fn test_partial_last_period() {
        let renderer = OfflineRenderer::new(Arc::new(DummyBackend::new(48000, 64)));
        let mut chain = strip(&renderer, 2, 0.0);
        let input = vec![vec![0.25; 100], vec![-0.25; 100]];

        let mut calls = Vec::new();
        let out = renderer.render(&mut chain, &input, 150, |n| calls.push(n));

        assert_eq!(calls, vec![64, 128, 150]);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|c| c.len() == 150));
        assert_eq!(out[0][50], 0.25);
        assert_eq!(out[1][50], -0.25);
        assert_eq!(out[0][120], 0.0);
    }

    #[test]
    fn test_mono_input_feeds_all_channels() {
        let renderer = OfflineRenderer::new(Arc::new(DummyBackend::new(48000, 32)));
        let mut chain = strip(&renderer, 2, 0.0);
        let out = renderer.render(&mut chain, &[vec![0.5; 64]], 64, |_| {});
        assert_eq!(out[1][10], 0.5);
    }

    #[test]
    fn test_transport_advances_per_period() {
        let backend = Arc::new(DummyBackend::new(48000, 32));
        let renderer = OfflineRenderer::new(backend.clone());
        let mut chain = strip(&renderer, 1, 0.0);
        renderer.render(&mut chain, &[], 100, |_| {});
        let transport = backend.transport_query();
        assert!(!transport.rolling);
        assert_eq!(transport.frame, 128);
    }
}
