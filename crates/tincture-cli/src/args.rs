//! Command-line arguments and default path resolution.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use tincture_core::{IndexStrategy, TransferParams};

/// Environment variable overriding the base directory for default paths.
pub const HOME_ENV: &str = "TINCTURE_HOME";

/// Default file locations for one subcommand, relative to the base directory.
#[derive(Debug, Clone, Copy)]
pub struct DefaultPaths {
    pub source: &'static str,
    pub reference: &'static str,
    pub output: &'static str,
}

pub const BASIC_DEFAULTS: DefaultPaths = DefaultPaths {
    source: "data/source/730x576x2.jpg",
    reference: "data/reference/grass.jpg",
    output: "data/output/transferred_image.png",
};

pub const WINDOWED_DEFAULTS: DefaultPaths = DefaultPaths {
    source: "data/source/SummerForest.jpg",
    reference: "data/reference/AutumnForest.jpg",
    output: "data/output/advanced_transferred_image.png",
};

/// Window half-size used by the windowed subcommand when nothing else sets one.
pub const DEFAULT_WINDOW_SIZE: usize = 1;

/// Which transfer variant is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Per-pixel chroma matching; the window is always zero.
    Basic,
    /// Patch matching with an optional `--window-size` flag.
    Windowed(Option<usize>),
}

/// Index backend as spelled on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IndexArg {
    Auto,
    KdTree,
    BruteForce,
}

impl From<IndexArg> for IndexStrategy {
    fn from(arg: IndexArg) -> Self {
        match arg {
            IndexArg::Auto => Self::Auto,
            IndexArg::KdTree => Self::KdTree,
            IndexArg::BruteForce => Self::BruteForce,
        }
    }
}

/// Options shared by both transfer subcommands.
#[derive(Debug, Clone, Args)]
pub struct TransferArgs {
    /// Image to recolor
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Style reference image
    #[arg(long)]
    pub reference: Option<PathBuf>,

    /// Where to write the result
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Number of nearest neighbors blended per sample
    #[arg(short)]
    pub k: Option<usize>,

    /// Standard deviation of the Gaussian kernel
    #[arg(long)]
    pub sigma: Option<f64>,

    /// Nearest-neighbor index backend
    #[arg(long, value_enum)]
    pub index: Option<IndexArg>,

    /// JSON params file; flags given on the command line take precedence
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Fully resolved inputs for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRun {
    pub source: PathBuf,
    pub reference: PathBuf,
    pub output: PathBuf,
    pub params: TransferParams,
}

impl TransferArgs {
    /// Merge defaults, the optional params file, and flags.
    ///
    /// Flags win over the params file, which wins over built-in defaults. The
    /// windowed variant treats a zero window from the file as unset.
    pub fn resolve(
        &self,
        defaults: DefaultPaths,
        base: &Path,
        variant: Variant,
    ) -> Result<ResolvedRun, tincture_core::TransferError> {
        let mut params = match &self.config {
            Some(path) => TransferParams::from_json_file(path)?,
            None => TransferParams::default(),
        };
        if let Some(k) = self.k {
            params.k = k;
        }
        if let Some(sigma) = self.sigma {
            params.sigma = sigma;
        }
        if let Some(index) = self.index {
            params.index = index.into();
        }
        params.window_size = match variant {
            Variant::Basic => 0,
            Variant::Windowed(Some(size)) => size,
            Variant::Windowed(None) if params.window_size > 0 => params.window_size,
            Variant::Windowed(None) => DEFAULT_WINDOW_SIZE,
        };

        Ok(ResolvedRun {
            source: pick(&self.source, base, defaults.source),
            reference: pick(&self.reference, base, defaults.reference),
            output: pick(&self.output, base, defaults.output),
            params,
        })
    }
}

fn pick(given: &Option<PathBuf>, base: &Path, default: &str) -> PathBuf {
    given.clone().unwrap_or_else(|| base.join(default))
}

/// Base directory for default paths: `$TINCTURE_HOME`, else the working directory.
pub fn base_dir() -> PathBuf {
    std::env::var_os(HOME_ENV)
        .map(PathBuf::from)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}
