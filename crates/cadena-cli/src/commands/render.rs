//! Offline chain rendering command.

use std::path::PathBuf;
use std::sync::Arc;

use cadena_core::DummyBackend;
use cadena_io::{OfflineRenderer, WavSpec, read_wav, write_wav};
use cadena_modules::{ModuleRegistry, linear_to_db};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use super::common::{apply_controls, load_chain, parse_key_val};

#[derive(Args)]
pub struct RenderArgs {
    /// Chain name (factory or saved) or path to a chain document
    #[arg(value_name = "CHAIN")]
    chain: String,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Input WAV file feeding the capture adapter (silence if omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Length in seconds when there is no input file
    #[arg(short, long, default_value = "2.0")]
    duration: f32,

    /// Extra seconds rendered after the input ends
    #[arg(long, default_value = "0.0")]
    tail: f32,

    /// Control overrides (e.g., "gain.gain=-6")
    #[arg(long = "set", value_parser = parse_key_val, number_of_values = 1)]
    controls: Vec<(String, String)>,

    /// Period size in frames (defaults to the chain's)
    #[arg(long)]
    block_size: Option<usize>,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    if ![16, 24, 32].contains(&args.bit_depth) {
        anyhow::bail!("Unsupported bit depth {} (use 16, 24 or 32)", args.bit_depth);
    }

    let mut doc = load_chain(&args.chain)?;
    apply_controls(&mut doc, &args.controls)?;

    let (input, sample_rate) = match &args.input {
        Some(path) => {
            println!("Reading {}...", path.display());
            let (samples, spec) = read_wav(path)?;
            (samples, spec.sample_rate)
        }
        None => (Vec::new(), doc.sample_rate),
    };
    let input_frames = input.first().map_or(0, Vec::len);
    let frames = if args.input.is_some() {
        input_frames + seconds_to_frames(args.tail, sample_rate)
    } else {
        seconds_to_frames(args.duration, sample_rate)
    };

    let nframes = args.block_size.unwrap_or(doc.nframes);
    let renderer = OfflineRenderer::new(Arc::new(DummyBackend::new(sample_rate, nframes)));
    let mut chain = doc.build(&ModuleRegistry::new(), renderer.backend())?;
    if chain.external_outputs() == 0 {
        anyhow::bail!("Chain '{}' has no playback outputs", doc.name);
    }

    println!(
        "Rendering '{}': {} frames at {} Hz, {} in / {} out",
        doc.name,
        frames,
        sample_rate,
        chain.external_inputs(),
        chain.external_outputs()
    );

    let pb = ProgressBar::new(frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );
    let output = renderer.render(&mut chain, &input, frames, |done| pb.set_position(done as u64));
    pb.finish_with_message("done");

    println!("\nOutput:");
    for (k, channel) in output.iter().enumerate() {
        println!(
            "  ch{}: RMS {:.1} dB, Peak {:.1} dB",
            k + 1,
            linear_to_db(rms(channel)),
            linear_to_db(peak(channel))
        );
    }

    let spec = WavSpec {
        sample_rate,
        bits_per_sample: args.bit_depth,
        ..WavSpec::default()
    };
    println!("\nWriting {}...", args.output.display());
    write_wav(&args.output, &output, spec)?;
    println!("Done!");

    Ok(())
}

fn seconds_to_frames(seconds: f32, sample_rate: u32) -> usize {
    (seconds.max(0.0) * sample_rate as f32).round() as usize
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0, f32::max)
}
