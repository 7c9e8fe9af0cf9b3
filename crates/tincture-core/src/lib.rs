//! Tincture Core — example-based color transfer.
//!
//! Recolors a source image so its chroma resembles a reference image while
//! keeping the source's lightness. Each source sample is matched against an
//! exact K-nearest-neighbor index of reference samples (raw chroma or
//! lightness patches) and the neighbors' chroma is blended with a Gaussian
//! kernel.

pub mod blend;
pub mod color;
pub mod error;
pub mod features;
pub mod image;
pub mod index;
pub mod io;
pub mod params;
pub mod pipeline;

// Re-exports for convenience.
pub use crate::image::LabImage;
pub use error::{PipelineError, Stage, TransferError};
pub use features::{FeatureMode, FeatureSet, ReferenceSet, ValidRegion};
pub use index::{IndexStrategy, Neighbor, NeighborIndex};
pub use params::TransferParams;
pub use pipeline::{ColorTransfer, TransferReport};
