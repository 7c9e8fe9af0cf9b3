//! Error taxonomy for the transfer pipeline.

use std::fmt;
use std::path::PathBuf;

/// A failure raised by one of the transfer components.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("invalid shape: expected 3 channels, got {channels}")]
    InvalidShape { channels: u8 },
    #[error(
        "window size {window_size} (side {side}) does not fit a {width}x{height} image"
    )]
    InvalidWindow {
        window_size: usize,
        side: usize,
        width: u32,
        height: u32,
    },
    #[error("k = {k} is out of range for a reference set of {len} samples")]
    InvalidK { k: usize, len: usize },
    #[error("k must be at least 1")]
    ZeroK,
    #[error("sigma must be positive and finite, got {0}")]
    InvalidSigma(f64),
    #[error("feature dimension mismatch: index holds {expected}-d vectors, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image codec error on {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("invalid params file: {0}")]
    Config(#[from] serde_json::Error),
}

impl TransferError {
    /// Attach the pipeline stage this error surfaced in.
    pub fn at(self, stage: Stage) -> PipelineError {
        PipelineError {
            stage,
            source: self,
        }
    }

    /// True when the error is a missing input file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// The pipeline states, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Load,
    Convert,
    ExtractReference,
    BuildIndex,
    ExtractTarget,
    Query,
    Blend,
    Reassemble,
    ConvertBack,
    Save,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Load => "load",
            Self::Convert => "convert",
            Self::ExtractReference => "extract reference",
            Self::BuildIndex => "build index",
            Self::ExtractTarget => "extract target",
            Self::Query => "query",
            Self::Blend => "blend",
            Self::Reassemble => "reassemble",
            Self::ConvertBack => "convert back",
            Self::Save => "save",
        };
        f.write_str(label)
    }
}

/// A [`TransferError`] tagged with the stage that aborted the run.
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: TransferError,
}
