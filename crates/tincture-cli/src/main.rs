//! Tincture CLI - recolor an image after a style reference.
//!
//! Two subcommands mirror the two transfer variants: `basic` matches raw
//! pixel chroma, `windowed` matches lightness patches.

mod args;
mod logging;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tincture_core::{ColorTransfer, PipelineError};

use crate::args::{
    BASIC_DEFAULTS, DefaultPaths, ResolvedRun, TransferArgs, Variant, WINDOWED_DEFAULTS,
};

/// Tincture - example-based KNN color transfer
#[derive(Parser)]
#[command(name = "tincture")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log debug detail
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-pixel transfer: match each pixel's chroma against the reference
    Basic {
        #[command(flatten)]
        args: TransferArgs,
    },

    /// Window-based transfer: match lightness patches around each pixel
    #[command(alias = "advanced")]
    Windowed {
        #[command(flatten)]
        args: TransferArgs,

        /// Window half-size (1 means a 3x3 window) [default: 1]
        #[arg(long)]
        window_size: Option<usize>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Basic { args } => run(args, BASIC_DEFAULTS, Variant::Basic),
        Commands::Windowed { args, window_size } => {
            run(args, WINDOWED_DEFAULTS, Variant::Windowed(*window_size))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::from(1)
        }
    }
}

fn run(args: &TransferArgs, defaults: DefaultPaths, variant: Variant) -> Result<()> {
    let run = args
        .resolve(defaults, &args::base_dir(), variant)
        .context("failed to resolve parameters")?;
    print_plan(&run);
    let effective = run.params.to_json_pretty()?;
    tracing::debug!(params = %effective, "effective params");

    let transfer = ColorTransfer::new(run.params.clone()).context("invalid parameters")?;
    let report = transfer.run_files(&run.source, &run.reference, &run.output)?;

    tracing::debug!(?report, "transfer report");
    println!(
        "{} {} samples rewritten ({}x{}, {} backend)",
        "Color transfer complete:".green().bold(),
        report.query_samples,
        report.width,
        report.height,
        report.strategy
    );
    Ok(())
}

fn print_plan(run: &ResolvedRun) {
    println!("  {} {}", "Source:".dimmed(), run.source.display());
    println!("  {} {}", "Reference:".dimmed(), run.reference.display());
    println!("  {} {}", "Output:".dimmed(), run.output.display());
    println!(
        "  {} k={} sigma={} window={}",
        "Params:".dimmed(),
        run.params.k,
        run.params.sigma,
        window_label(run.params.window_size)
    );
}

fn window_label(window_size: usize) -> String {
    if window_size == 0 {
        return "off".to_string();
    }
    match window_size.checked_mul(2).and_then(|n| n.checked_add(1)) {
        Some(side) => format!("{side}x{side}"),
        None => format!("half-size {window_size}"),
    }
}

fn report_error(err: &anyhow::Error) {
    let missing = err
        .downcast_ref::<PipelineError>()
        .filter(|pipeline| pipeline.source.is_not_found());
    if let Some(pipeline) = missing {
        let cwd = std::env::current_dir().unwrap_or_else(|_| Path::new(".").to_path_buf());
        eprintln!(
            "{}: file not found, check the path ({}; working directory: {})",
            "error".red(),
            pipeline.source,
            cwd.display()
        );
        return;
    }
    eprintln!("{}: {:#}", "error".red(), err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tincture_core::LabImage;
    use tincture_core::color::to_device;
    use tincture_core::io::save_image;

    #[test]
    fn test_cli_parses_basic_with_overrides() {
        let cli = Cli::try_parse_from([
            "tincture", "basic", "--source", "a.jpg", "-k", "3", "--sigma", "12.5",
        ])
        .unwrap();
        match cli.command {
            Commands::Basic { args } => {
                assert_eq!(args.source.as_deref(), Some(Path::new("a.jpg")));
                assert_eq!(args.k, Some(3));
                assert_eq!(args.sigma, Some(12.5));
                assert!(args.reference.is_none());
            }
            _ => panic!("expected basic command"),
        }
    }

    #[test]
    fn test_cli_advanced_alias_and_window() {
        let cli = Cli::try_parse_from([
            "tincture",
            "advanced",
            "--window-size",
            "2",
            "--index",
            "brute-force",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Windowed { args, window_size } => {
                assert_eq!(window_size, Some(2));
                assert_eq!(args.index, Some(args::IndexArg::BruteForce));
            }
            _ => panic!("expected windowed command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_index() {
        assert!(Cli::try_parse_from(["tincture", "basic", "--index", "ball-tree"]).is_err());
    }

    #[test]
    fn test_window_label() {
        assert_eq!(window_label(0), "off");
        assert_eq!(window_label(1), "3x3");
        assert_eq!(window_label(2), "5x5");
        assert_eq!(
            window_label(usize::MAX / 2 + 1),
            format!("half-size {}", usize::MAX / 2 + 1)
        );
    }

    #[test]
    fn test_run_rejects_huge_window_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("s.png");
        let reference = dir.path().join("r.png");
        let output = dir.path().join("o.png");
        write_card(&source, 30.0);
        write_card(&reference, 70.0);

        let args = TransferArgs {
            source: Some(source),
            reference: Some(reference),
            output: Some(output.clone()),
            k: Some(1),
            sigma: None,
            index: None,
            config: None,
        };
        let err = run(&args, WINDOWED_DEFAULTS, Variant::Windowed(Some(usize::MAX / 2 + 1)))
            .unwrap_err();
        let pipeline = err.downcast_ref::<PipelineError>().unwrap();
        assert!(matches!(
            pipeline.source,
            tincture_core::TransferError::InvalidWindow { .. }
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_run_end_to_end_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("s.png");
        let reference = dir.path().join("r.png");
        let output = dir.path().join("out/o.png");
        write_card(&source, 30.0);
        write_card(&reference, 70.0);

        let args = TransferArgs {
            source: Some(source),
            reference: Some(reference),
            output: Some(output.clone()),
            k: Some(2),
            sigma: None,
            index: None,
            config: None,
        };
        run(&args, WINDOWED_DEFAULTS, Variant::Windowed(None)).unwrap();
        assert!(output.exists());
    }

    #[test]
    fn test_run_reports_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let args = TransferArgs {
            source: Some(dir.path().join("missing.png")),
            reference: Some(dir.path().join("also-missing.png")),
            output: Some(dir.path().join("o.png")),
            k: None,
            sigma: None,
            index: None,
            config: None,
        };
        let err = run(&args, BASIC_DEFAULTS, Variant::Basic).unwrap_err();
        let pipeline = err.downcast_ref::<PipelineError>().unwrap();
        assert!(pipeline.source.is_not_found());
    }

    /// Write a 4x4 PNG whose chroma varies along the diagonal.
    fn write_card(path: &Path, lightness: f32) {
        let mut lab = LabImage::filled(4, 4, [lightness, 0.0, 0.0]);
        for i in 0..4 {
            let idx = lab.index(i, i);
            lab.pixels[idx] = [lightness, 10.0 * i as f32, -5.0 * i as f32];
        }
        save_image(&to_device(&lab), path).unwrap();
    }
}
