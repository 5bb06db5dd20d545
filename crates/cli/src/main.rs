//! CLI tool for extracting embedded images from PDF, Word and PowerPoint files.

use anyhow::{Context, Result};
use clap::Parser;
use imgx_core::{format_file_size, ImageOutcome, SourceInfo};
use imgx_extract::{DocumentOutcome, ExtractOptions, ExtractionJob, OutputLayout, ProgressEvent};
use std::path::{Path, PathBuf};

/// Extract embedded images from .pdf, .docx and .pptx files.
#[derive(Parser, Debug)]
#[command(name = "image-extract")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input document(s) (.pdf, .docx or .pptx)
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Output directory (default: extracted_images next to each input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Use a separate extracted_images_<name> directory per input
    #[arg(long)]
    per_document: bool,

    /// Verbose output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.verbose {
        "debug"
    } else if args.quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Some(missing) = args.input.iter().find(|p| !p.exists()) {
        eprintln!("File not found: {}", missing.display());
        std::process::exit(1);
    }

    let mut options = ExtractOptions::new();
    if args.per_document {
        options = options.with_layout(OutputLayout::PerDocument);
    }
    if let Some(dir) = &args.output {
        options = options.with_output_dir(dir);
    }

    for input_path in &args.input {
        process_file(input_path, &options, &args)?;
    }

    Ok(())
}

/// Extract one document on a worker thread, printing progress as it arrives.
fn process_file(input_path: &Path, options: &ExtractOptions, args: &Args) -> Result<()> {
    if !args.quiet {
        if let Some(info) = SourceInfo::inspect(input_path) {
            println!("{} ({})", info.name, format_file_size(info.size));
        }
    }

    let job = ExtractionJob::spawn(input_path, options.clone())
        .with_context(|| format!("Failed to start extraction of {}", input_path.display()))?;

    for event in job.events() {
        if let Some(line) = describe_event(&event, args.verbose) {
            if !args.quiet {
                println!("{}", line);
            }
        }
    }

    let outcome = job.join();
    match &outcome {
        DocumentOutcome::Failed { .. } => eprintln!("{}", summary(&outcome)),
        _ if !args.quiet => println!("{}", summary(&outcome)),
        _ => {}
    }

    Ok(())
}

/// Progress line for an event, if it should be shown.
fn describe_event(event: &ProgressEvent, verbose: bool) -> Option<String> {
    match event {
        ProgressEvent::Started { format, .. } => Some(format!("  Format: {}", format)),
        ProgressEvent::Page {
            current,
            total,
            percent,
        } => Some(format!("  [{:>3}%] {} of {}", percent, current, total)),
        ProgressEvent::Image(ImageOutcome::Written { path, .. }) if verbose => {
            Some(format!("    saved {}", path.display()))
        }
        ProgressEvent::Image(ImageOutcome::Skipped { name, reason }) if verbose => {
            Some(format!("    skipped {}: {}", name, reason))
        }
        _ => None,
    }
}

/// Final status line for a document.
fn summary(outcome: &DocumentOutcome) -> String {
    match outcome {
        DocumentOutcome::Completed(report) => format!(
            "{} images written to {}",
            report.written(),
            report.output_dir.display()
        ),
        DocumentOutcome::Unsupported { extension } => {
            let extension = if extension.is_empty() {
                "(none)"
            } else {
                extension.as_str()
            };
            format!("File format not supported: {}", extension)
        }
        DocumentOutcome::Failed { cause } => format!("Extraction failed: {}", cause),
    }
}
