//! Module listing and information command.

#![allow(clippy::print_literal)] // Table headers use literal strings intentionally

use std::sync::Arc;

use cadena_core::{Chain, ControlHints, DummyBackend, ModuleRole};
use cadena_modules::{IoAdapter, ModuleCategory, ModuleDescriptor, ModuleRegistry};
use clap::Args;

#[derive(Args)]
pub struct ModulesArgs {
    /// Show details for a specific module kind
    #[arg(value_name = "KIND")]
    kind: Option<String>,

    /// Print machine-readable JSON instead of a table
    #[arg(long)]
    json: bool,
}

pub fn run(args: ModulesArgs) -> anyhow::Result<()> {
    let registry = ModuleRegistry::new();

    if let Some(kind) = &args.kind {
        let descriptor = registry
            .descriptor(kind)
            .ok_or_else(|| anyhow::anyhow!("Unknown module: {kind}"))?;
        let controls = scratch_controls(&registry, descriptor);
        if args.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&descriptor_json(descriptor, &controls))?
            );
        } else {
            print_detail(descriptor, &controls);
        }
        return Ok(());
    }

    if args.json {
        let all: Vec<_> = registry
            .all_modules()
            .map(|d| descriptor_json(d, &scratch_controls(&registry, d)))
            .collect();
        println!("{}", serde_json::to_string_pretty(&all)?);
        return Ok(());
    }

    println!("Available Modules");
    println!("=================\n");
    for category in [
        ModuleCategory::Io,
        ModuleCategory::Processing,
        ModuleCategory::Source,
        ModuleCategory::Analysis,
        ModuleCategory::Satellite,
    ] {
        let modules = registry.modules_in_category(category);
        if modules.is_empty() {
            continue;
        }
        println!("{} - {}", category.name(), category.description());
        for module in modules {
            println!("  {:12}  {}", module.kind, module.description);
        }
        println!();
    }
    println!("Use 'cadena modules <KIND>' for controls.");
    Ok(())
}

fn print_detail(descriptor: &ModuleDescriptor, controls: &[(String, ControlHints)]) {
    println!("{} ({})", descriptor.name, descriptor.kind);
    println!("{}", "=".repeat(descriptor.name.len() + descriptor.kind.len() + 3));
    println!();
    println!("{}", descriptor.description);
    println!("Role: {}", role_name(descriptor.role));
    println!();

    if controls.is_empty() {
        println!("No control inputs.");
        return;
    }
    println!("Controls:");
    println!();
    println!("  {:12}  {:>10}  {:>10}  {:>10}", "Name", "Default", "Min", "Max");
    println!("  {:12}  {:>10}  {:>10}  {:>10}", "----", "-------", "---", "---");
    for (name, hints) in controls {
        println!(
            "  {:12}  {:>10.2}  {:>10.2}  {:>10.2}",
            name, hints.default, hints.min, hints.max
        );
    }
    println!();
    println!("Example usage:");
    if let Some((name, hints)) = controls.first() {
        println!(
            "  cadena render <CHAIN> out.wav --set {}.{}={}",
            descriptor.kind, name, hints.default
        );
    }
}

fn descriptor_json(
    descriptor: &ModuleDescriptor,
    controls: &[(String, ControlHints)],
) -> serde_json::Value {
    serde_json::json!({
        "kind": descriptor.kind,
        "name": descriptor.name,
        "description": descriptor.description,
        "category": descriptor.category.name(),
        "role": role_name(descriptor.role),
        "controls": controls
            .iter()
            .map(|(name, h)| serde_json::json!({
                "name": name,
                "default": h.default,
                "min": h.min,
                "max": h.max,
            }))
            .collect::<Vec<_>>(),
    })
}

fn role_name(role: ModuleRole) -> &'static str {
    match role {
        ModuleRole::IoAdapter => "io-adapter",
        ModuleRole::Processor => "processor",
        ModuleRole::Generator => "generator",
        ModuleRole::Controller => "controller",
        ModuleRole::Indicator => "indicator",
    }
}

/// Control inputs of a signal-path module, found by placing it after a
/// mono capture adapter in a scratch chain. Satellites report none.
fn scratch_controls(
    registry: &ModuleRegistry,
    descriptor: &ModuleDescriptor,
) -> Vec<(String, ControlHints)> {
    if descriptor.role.is_satellite() {
        return Vec::new();
    }
    let Some(module) = registry.create(descriptor.kind) else {
        return Vec::new();
    };
    let mut chain = Chain::new("inspect", Arc::new(DummyBackend::default()));
    if chain.insert(None, Box::new(IoAdapter::capture(1))).is_err() {
        return Vec::new();
    }
    let Ok(id) = chain.insert(None, module) else {
        return Vec::new();
    };
    chain
        .ports_of(id)
        .map(|p| p.control_inputs())
        .unwrap_or_default()
        .iter()
        .filter_map(|&p| chain.port(p))
        .map(|p| (p.name().to_string(), p.hints()))
        .collect()
}
