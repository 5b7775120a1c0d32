//! Real-time chain processing command.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use cadena_core::{ChainClient, DummyBackend};
use cadena_io::{ChainStream, ChannelFit, DeviceReport, Side, StreamConfig, scan};
use cadena_modules::ModuleRegistry;
use clap::Args;

use super::common::{apply_controls, load_chain, parse_key_val};

#[derive(Args)]
pub struct RealtimeArgs {
    /// Chain name (factory or saved) or path to a chain document
    #[arg(value_name = "CHAIN")]
    chain: String,

    /// Control overrides (e.g., "gain.gain=-6")
    #[arg(long = "set", value_parser = parse_key_val, number_of_values = 1)]
    controls: Vec<(String, String)>,

    /// Input device name or index
    #[arg(long)]
    input_device: Option<String>,

    /// Output device name or index
    #[arg(long)]
    output_device: Option<String>,

    /// Sample rate (defaults to the chain's)
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Buffer size in frames (defaults to the chain's)
    #[arg(long)]
    buffer_size: Option<u32>,

    /// Open no input device, even if the chain captures
    #[arg(long)]
    output_only: bool,
}

pub fn run(args: RealtimeArgs) -> anyhow::Result<()> {
    let mut doc = load_chain(&args.chain)?;
    apply_controls(&mut doc, &args.controls)?;

    let sample_rate = args.sample_rate.unwrap_or(doc.sample_rate);
    let buffer_size = args.buffer_size.unwrap_or(u32::try_from(doc.nframes)?);

    let backend = Arc::new(DummyBackend::new(sample_rate, buffer_size as usize));
    let chain = doc.build(&ModuleRegistry::new(), backend)?;
    let inputs = chain.external_inputs();
    let outputs = chain.external_outputs();
    let output_only = args.output_only || inputs == 0;
    let modules = chain.len();

    println!("Real-time chain '{}' with {} module(s)", doc.name, modules);
    let report = scan();
    if output_only {
        println!("  Input:  none");
    } else {
        let line = endpoint_summary(&report, Side::Capture, args.input_device.as_deref(), inputs, outputs);
        println!("  Input:  {line}");
    }
    let line = endpoint_summary(&report, Side::Playback, args.output_device.as_deref(), inputs, outputs);
    println!("  Output: {line}");
    println!("  Sample rate: {sample_rate} Hz");
    println!("  Buffer size: {buffer_size} frames");
    println!("\nPress Ctrl+C to stop...\n");

    let mut stream = ChainStream::new(StreamConfig {
        sample_rate,
        buffer_size,
        input_device: args.input_device,
        output_device: args.output_device,
        output_only,
    })?;

    let running = stream.running_flag();
    ctrlc::set_handler(move || {
        println!("\nStopping...");
        running.store(false, Ordering::SeqCst);
    })?;

    let client = ChainClient::new(chain);
    stream.run(client.clone())?;

    let dropped = client.dropped_buffers();
    if dropped > 0 {
        tracing::warn!(dropped, "periods skipped while the chain was being edited");
    }
    println!("Done!");
    Ok(())
}

/// One-line description of the endpoint a stream would open on `side`.
fn endpoint_summary(
    report: &DeviceReport,
    side: Side,
    selector: Option<&str>,
    inputs: usize,
    outputs: usize,
) -> String {
    match report.pick(side, selector) {
        Ok(endpoint) => {
            let fit = ChannelFit::for_chain(side, endpoint.channels.into(), inputs, outputs);
            format!("{} ({} ch, {fit})", endpoint.name, endpoint.channels)
        }
        Err(e) => format!("{} ({e})", selector.unwrap_or("default")),
    }
}
