//! Real-time audio streaming via cpal.
//!
//! cpal exposes no port graph, so a realtime chain still runs on a
//! [`DummyBackend`](cadena_core::DummyBackend) for its aux port registry.
//! [`ChainStream`] opens the devices and moves frames between their
//! callbacks and the chain's external ports through a [`PeriodBridge`].

use crate::bridge::PeriodBridge;
use crate::device::{Side, describe, open};
use crate::{Error, Result};
use cadena_core::ChainClient;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, Stream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;

/// Stream configuration.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Buffer size in frames; also the chain's period.
    pub buffer_size: u32,
    /// Input device name or index (default device if `None`).
    pub input_device: Option<String>,
    /// Output device name or index (default device if `None`).
    pub output_device: Option<String>,
    /// Open no input stream; the chain's external inputs read silence.
    pub output_only: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 256,
            input_device: None,
            output_device: None,
            output_only: false,
        }
    }
}

/// Real-time driver for a [`ChainClient`].
///
/// The output callback runs the chain; the input callback only forwards
/// captured frames. Periods lost to lock contention are counted by the
/// client and by [`dropped_periods`](Self::dropped_periods).
pub struct ChainStream {
    input_device: Option<Device>,
    output_device: Device,
    config: StreamConfig,
    running: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    _input_stream: Option<Stream>,
    _output_stream: Option<Stream>,
}

impl ChainStream {
    /// Opens the configured devices.
    pub fn new(config: StreamConfig) -> Result<Self> {
        let host = cpal::default_host();

        let input_device = if config.output_only {
            None
        } else {
            Some(open(&host, Side::Capture, config.input_device.as_deref())?)
        };
        let output_device = open(&host, Side::Playback, config.output_device.as_deref())?;

        tracing::info!(
            host = host.id().name(),
            output = %describe(&output_device),
            input = ?input_device.as_ref().map(describe),
            "audio devices opened"
        );

        Ok(Self {
            input_device,
            output_device,
            config,
            running: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicU64::new(0)),
            _input_stream: None,
            _output_stream: None,
        })
    }

    /// Get the configured sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Get the configured period in frames.
    pub fn buffer_size(&self) -> usize {
        self.config.buffer_size as usize
    }

    /// Flag that keeps [`run`](Self::run) blocking; clear it to stop.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Periods the output callback could not process.
    pub fn dropped_periods(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Starts the streams and blocks until the stream is stopped.
    pub fn run(&mut self, client: ChainClient) -> Result<()> {
        let output_channels = self
            .output_device
            .default_output_config()
            .map_err(|e| Error::Stream(e.to_string()))?
            .channels();
        let input_channels = match &self.input_device {
            Some(device) => device
                .default_input_config()
                .map_err(|e| Error::Stream(e.to_string()))?
                .channels(),
            None => 0,
        };

        let (tx, rx) = mpsc::sync_channel::<Vec<f32>>(4);
        self.running.store(true, Ordering::SeqCst);

        if let Some(device) = &self.input_device {
            let input_running = Arc::clone(&self.running);
            let stream = device
                .build_input_stream(
                    &self.stream_config(input_channels),
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        if input_running.load(Ordering::SeqCst) {
                            let _ = tx.try_send(data.to_vec());
                        }
                    },
                    |err| tracing::error!(%err, "input stream error"),
                    None,
                )
                .map_err(|e| Error::Stream(e.to_string()))?;
            stream.play().map_err(|e| Error::Stream(e.to_string()))?;
            self._input_stream = Some(stream);
        }

        let output_running = Arc::clone(&self.running);
        let dropped = Arc::clone(&self.dropped);
        let mut bridge = PeriodBridge::new(
            self.buffer_size(),
            usize::from(input_channels),
            usize::from(output_channels),
        );
        let stream = self
            .output_device
            .build_output_stream(
                &self.stream_config(output_channels),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !output_running.load(Ordering::SeqCst) {
                        data.fill(0.0);
                        return;
                    }
                    while let Ok(samples) = rx.try_recv() {
                        bridge.push_input(&samples);
                    }
                    let lost = bridge.fill_output(&client, data);
                    if lost > 0 {
                        dropped.fetch_add(lost as u64, Ordering::Relaxed);
                    }
                },
                |err| tracing::error!(%err, "output stream error"),
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;
        stream.play().map_err(|e| Error::Stream(e.to_string()))?;
        self._output_stream = Some(stream);

        tracing::info!(
            sample_rate = self.config.sample_rate,
            buffer_size = self.config.buffer_size,
            input_channels,
            output_channels,
            "realtime stream started"
        );

        while self.running.load(Ordering::SeqCst) {
            std::thread::sleep(std::time::Duration::from_millis(100));
        }

        self._input_stream = None;
        self._output_stream = None;
        tracing::info!(dropped = self.dropped_periods(), "realtime stream stopped");
        Ok(())
    }

    /// Stop the audio stream.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the stream is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn stream_config(&self, channels: u16) -> cpal::StreamConfig {
        cpal::StreamConfig {
            channels,
            sample_rate: self.config.sample_rate,
            buffer_size: cpal::BufferSize::Fixed(self.config.buffer_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StreamConfig::default();
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.buffer_size, 256);
        assert!(!config.output_only);
        assert!(config.input_device.is_none());
    }
}
