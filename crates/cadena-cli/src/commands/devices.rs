//! Audio device listing, optionally measured against a chain.

use std::sync::Arc;

use cadena_core::DummyBackend;
use cadena_io::{ChannelFit, DeviceReport, Endpoint, Side, scan};
use cadena_modules::ModuleRegistry;
use clap::{Args, Subcommand};

use super::common::{apply_controls, load_chain, parse_key_val};

#[derive(Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    command: Option<DevicesCommand>,
}

#[derive(Subcommand)]
enum DevicesCommand {
    /// List capture and playback devices
    List {
        /// Show how each device lines up with this chain's external channels
        #[arg(long, value_name = "CHAIN")]
        chain: Option<String>,

        /// Control overrides applied before measuring the chain
        #[arg(long = "set", value_parser = parse_key_val, number_of_values = 1)]
        controls: Vec<(String, String)>,
    },

    /// Show the default devices
    Info,
}

/// External channel counts of a built chain.
#[derive(Debug, Clone, Copy)]
struct ChainWidth {
    inputs: usize,
    outputs: usize,
}

pub fn run(args: DevicesArgs) -> anyhow::Result<()> {
    let command = args.command.unwrap_or(DevicesCommand::List {
        chain: None,
        controls: Vec::new(),
    });
    match command {
        DevicesCommand::List { chain, controls } => {
            let width = match chain {
                Some(name) => Some(chain_width(&name, &controls)?),
                None => None,
            };
            list(&scan(), width);
        }
        DevicesCommand::Info => info(&scan()),
    }
    Ok(())
}

fn chain_width(name: &str, controls: &[(String, String)]) -> anyhow::Result<ChainWidth> {
    let mut doc = load_chain(name)?;
    apply_controls(&mut doc, controls)?;
    let backend = Arc::new(DummyBackend::new(doc.sample_rate, doc.nframes));
    let chain = doc.build(&ModuleRegistry::new(), backend)?;
    let width = ChainWidth {
        inputs: chain.external_inputs(),
        outputs: chain.external_outputs(),
    };
    println!(
        "Chain '{}': {} external input(s), {} external output(s)\n",
        doc.name, width.inputs, width.outputs
    );
    Ok(width)
}

fn list(report: &DeviceReport, width: Option<ChainWidth>) {
    if report.capture.is_empty() && report.playback.is_empty() {
        println!("No audio devices found.");
        return;
    }

    for (side, title) in [(Side::Capture, "Capture"), (Side::Playback, "Playback")] {
        let endpoints = report.side(side);
        if endpoints.is_empty() {
            continue;
        }
        println!("{title} devices:");
        for (index, endpoint) in endpoints.iter().enumerate() {
            let fit = width.map(|w| {
                ChannelFit::for_chain(side, endpoint.channels.into(), w.inputs, w.outputs)
            });
            println!("  {}", endpoint_line(index, endpoint, fit));
        }
        println!();
    }

    println!(
        "Total: {} capture, {} playback",
        report.capture.len(),
        report.playback.len()
    );
    println!("\nSelect by index or name fragment with --input-device/--output-device:");
    println!("  cadena realtime stereo-strip --input-device 0 --output-device usb");
}

fn info(report: &DeviceReport) {
    for (side, title) in [(Side::Capture, "Default capture"), (Side::Playback, "Default playback")] {
        match report.pick(side, None) {
            Ok(endpoint) => {
                println!("{title}:");
                println!("  Name: {}", endpoint.name);
                println!("  Channels: {}", endpoint.channels);
                println!("  Sample rate: {} Hz", endpoint.sample_rate);
            }
            Err(_) => println!("{title}: none"),
        }
        println!();
    }
}

fn endpoint_line(index: usize, endpoint: &Endpoint, fit: Option<ChannelFit>) -> String {
    let mut line = format!(
        "[{index}] {} ({} ch, {} Hz)",
        endpoint.name, endpoint.channels, endpoint.sample_rate
    );
    if endpoint.is_default {
        line.push_str(" *default");
    }
    if let Some(fit) = fit {
        line.push_str(&format!(" -> {fit}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(channels: u16, is_default: bool) -> Endpoint {
        Endpoint {
            name: "USB Audio".to_string(),
            channels,
            sample_rate: 48000,
            is_default,
        }
    }

    #[test]
    fn test_endpoint_line_marks_default_and_fit() {
        assert_eq!(
            endpoint_line(0, &endpoint(2, false), None),
            "[0] USB Audio (2 ch, 48000 Hz)"
        );
        assert_eq!(
            endpoint_line(3, &endpoint(8, true), Some(ChannelFit::Unused(6))),
            "[3] USB Audio (8 ch, 48000 Hz) *default -> 6 channel(s) dropped"
        );
    }

    #[test]
    fn test_chain_width_of_factory_chain() {
        let width = chain_width("stereo-strip", &[]).unwrap();
        assert_eq!(width.outputs, 2);
        assert_eq!(
            ChannelFit::for_chain(Side::Playback, 2, width.inputs, width.outputs),
            ChannelFit::Exact
        );
        assert!(chain_width("no-such-chain-7a1", &[]).is_err());
    }
}
