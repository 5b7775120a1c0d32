//! Display a chain's topology.

#![allow(clippy::print_literal)] // Table headers use literal strings intentionally

use std::path::PathBuf;
use std::sync::Arc;

use cadena_config::ChainDocument;
use cadena_core::{Chain, Direction, DummyBackend, ModuleId, PortKind};
use cadena_modules::ModuleRegistry;
use clap::Args;

use super::common::{apply_controls, load_chain, parse_key_val};

/// Display chain information.
#[derive(Args)]
pub struct InfoArgs {
    /// Chain name (factory or saved) or path to a chain document
    #[arg(value_name = "CHAIN")]
    chain: String,

    /// Control overrides (e.g., "gain.gain=-6")
    #[arg(long = "set", value_parser = parse_key_val, number_of_values = 1)]
    controls: Vec<(String, String)>,

    /// Capture the built chain and save it as a document
    #[arg(long, value_name = "PATH")]
    save: Option<PathBuf>,
}

/// Run the info command.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let mut doc = load_chain(&args.chain)?;
    apply_controls(&mut doc, &args.controls)?;

    let backend = Arc::new(DummyBackend::new(doc.sample_rate, doc.nframes));
    let chain = doc.build(&ModuleRegistry::new(), backend)?;

    println!("Chain:       {}", chain.name());
    if let Some(description) = &doc.description {
        println!("Description: {description}");
    }
    println!("Sample Rate: {} Hz", chain.sample_rate());
    println!("Period:      {} frames", chain.nframes());
    println!("Buffers:     {}", chain.scratch_len());
    println!(
        "External:    {} in, {} out",
        chain.external_inputs(),
        chain.external_outputs()
    );
    println!(
        "Latency:     capture {}, playback {}",
        chain.latency(Direction::Input),
        chain.latency(Direction::Output)
    );
    println!();

    println!("Signal path:");
    println!("  {:>3}  {:12}  {:>5}  {:>5}  {:8}  {}", "#", "Kind", "In", "Out", "State", "Controls");
    for (index, &id) in chain.modules().iter().enumerate() {
        let state = if chain.is_bypassed(id) { "bypassed" } else { "active" };
        println!(
            "  {:>3}  {:12}  {:>5}  {:>5}  {:8}  {}",
            index,
            chain.kind(id).unwrap_or("?"),
            chain.ninputs(id),
            chain.noutputs(id),
            state,
            controls_summary(&chain, id)
        );
    }

    let satellites: Vec<ModuleId> = chain.satellites().collect();
    if !satellites.is_empty() {
        println!();
        println!("Satellites:");
        for id in satellites {
            println!(
                "  {:12}  {}",
                chain.kind(id).unwrap_or("?"),
                links_summary(&chain, id)
            );
        }
    }

    println!();
    let queue: Vec<&str> = chain
        .process_queue()
        .iter()
        .filter_map(|&id| chain.kind(id))
        .collect();
    println!("Process queue: {}", queue.join(" -> "));

    if let Some(path) = &args.save {
        ChainDocument::capture(&chain)?.save(path)?;
        println!("\nSaved {}", path.display());
    }

    Ok(())
}

fn controls_summary(chain: &Chain, id: ModuleId) -> String {
    chain
        .ports_of(id)
        .map(|p| p.control_inputs())
        .unwrap_or_default()
        .iter()
        .filter_map(|&p| chain.port(p))
        .map(|p| {
            let linked = if p.connected() { "*" } else { "" };
            format!("{}={:.2}{linked}", p.name(), p.control_value())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn links_summary(chain: &Chain, id: ModuleId) -> String {
    let Some(ports) = chain.ports_of(id) else {
        return String::new();
    };
    ports
        .all()
        .filter_map(|p| chain.port(p))
        .filter(|p| p.kind() == PortKind::Control)
        .flat_map(|p| {
            p.connections().iter().filter_map(move |&peer| {
                let peer = chain.port(peer)?;
                let arrow = if p.direction() == Direction::Output { "->" } else { "<-" };
                Some(format!(
                    "{} {arrow} {}.{}",
                    p.name(),
                    chain.kind(peer.owner()).unwrap_or("?"),
                    peer.name()
                ))
            })
        })
        .collect::<Vec<_>>()
        .join(", ")
}
