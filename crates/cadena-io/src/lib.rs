//! Audio I/O for cadena chains.
//!
//! This crate provides:
//!
//! - **WAV file I/O**: [`read_wav`] and [`write_wav`] for multichannel files
//! - **Offline rendering**: [`OfflineRenderer`] runs a chain period by period
//!   over a [`DummyBackend`](cadena_core::DummyBackend)
//! - **Real-time streaming**: [`ChainStream`] drives a [`ChainClient`] from
//!   cpal callbacks through a [`PeriodBridge`]
//! - **Device discovery**: [`scan`] lists capture and playback endpoints;
//!   [`ChannelFit`] tells how one lines up with a chain's external channels
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cadena_core::{Chain, DummyBackend};
//! use cadena_io::{OfflineRenderer, read_wav, write_wav};
//!
//! let (input, spec) = read_wav("input.wav")?;
//! let backend = Arc::new(DummyBackend::new(spec.sample_rate, 256));
//! let mut chain = build_chain(backend.clone());
//!
//! let renderer = OfflineRenderer::new(backend);
//! let output = renderer.render(&mut chain, &input, input[0].len(), |_| {});
//! write_wav("output.wav", &output, spec)?;
//! ```
//!
//! [`ChainClient`]: cadena_core::ChainClient

mod bridge;
mod device;
mod render;
mod stream;
mod wav;

pub use bridge::PeriodBridge;
pub use render::OfflineRenderer;
pub use device::{ChannelFit, DeviceReport, Endpoint, Side, scan, select};
pub use stream::{ChainStream, StreamConfig};
pub use wav::{WavFormat, WavInfo, WavSpec, read_wav, read_wav_info, write_wav};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Sample data does not fit the requested layout.
    #[error("Invalid sample layout: {0}")]
    Layout(String),

    /// The chain refused a reconfiguration requested by the driver.
    #[error("Chain error: {0}")]
    Chain(#[from] cadena_core::ChainError),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
