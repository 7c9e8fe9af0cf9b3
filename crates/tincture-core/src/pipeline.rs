//! The transfer pipeline.
//!
//! ```text
//! Load → Convert → ExtractReference → BuildIndex → ExtractTarget
//!      → Query → Blend → Reassemble → ConvertBack → Save
//! ```
//!
//! Each stage consumes the previous stage's output and produces new data.
//! The first failure aborts the run and is reported with its [`Stage`];
//! nothing is written on failure.

use std::path::Path;

use glam::Vec2;
use image::{DynamicImage, RgbImage};
use rayon::prelude::*;

use crate::blend;
use crate::color;
use crate::error::{PipelineError, Stage, TransferError};
use crate::features::{self, FeatureMode};
use crate::image::LabImage;
use crate::index::{self, IndexStrategy, NeighborIndex};
use crate::io;
use crate::params::TransferParams;

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReport {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Length of every feature vector.
    pub dimension: usize,
    /// Samples in the reference index.
    pub reference_samples: usize,
    /// Target samples that were rewritten.
    pub query_samples: usize,
    /// Index backend actually built.
    pub strategy: IndexStrategy,
}

/// A configured color transfer.
#[derive(Debug, Clone)]
pub struct ColorTransfer {
    params: TransferParams,
}

impl ColorTransfer {
    /// Create a transfer after checking `k >= 1` and `sigma > 0`.
    pub fn new(params: TransferParams) -> Result<Self, TransferError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &TransferParams {
        &self.params
    }

    /// Load both images, transfer, and save the result.
    pub fn run_files(
        &self,
        source_path: &Path,
        reference_path: &Path,
        output_path: &Path,
    ) -> Result<TransferReport, PipelineError> {
        let source = io::load_image(source_path).map_err(|e| e.at(Stage::Load))?;
        let reference = io::load_image(reference_path).map_err(|e| e.at(Stage::Load))?;
        tracing::info!(
            source_width = source.width(),
            source_height = source.height(),
            reference_width = reference.width(),
            reference_height = reference.height(),
            "loaded images"
        );

        let (output, report) = self.run_device(&source, &reference)?;

        io::save_image(&output, output_path).map_err(|e| e.at(Stage::Save))?;
        tracing::info!(path = %output_path.display(), "saved result");
        Ok(report)
    }

    /// Transfer reference chroma onto `source`; both are device RGB.
    pub fn transfer(
        &self,
        source: &DynamicImage,
        reference: &DynamicImage,
    ) -> Result<RgbImage, PipelineError> {
        self.run_device(source, reference).map(|(image, _)| image)
    }

    /// Transfer reference chroma onto `target`; both are already Lab.
    pub fn transfer_lab(
        &self,
        target: &LabImage,
        reference: &LabImage,
    ) -> Result<LabImage, PipelineError> {
        self.run_lab(target, reference).map(|(image, _)| image)
    }

    fn run_device(
        &self,
        source: &DynamicImage,
        reference: &DynamicImage,
    ) -> Result<(RgbImage, TransferReport), PipelineError> {
        let source_lab = color::to_perceptual(source).map_err(|e| e.at(Stage::Convert))?;
        let reference_lab = color::to_perceptual(reference).map_err(|e| e.at(Stage::Convert))?;
        tracing::info!("converted images to Lab");

        let (output_lab, report) = self.run_lab(&source_lab, &reference_lab)?;

        let output = color::to_device(&output_lab);
        tracing::debug!("converted result back to sRGB");
        Ok((output, report))
    }

    fn run_lab(
        &self,
        target: &LabImage,
        reference: &LabImage,
    ) -> Result<(LabImage, TransferReport), PipelineError> {
        let TransferParams {
            k,
            sigma,
            window_size,
            index: strategy,
        } = self.params;
        let mode = FeatureMode::from_window_size(window_size);
        tracing::info!(
            k,
            sigma,
            window_side = mode.side(),
            "starting color transfer"
        );

        let (reference_set, _) = features::extract(reference, window_size)
            .map_err(|e| e.at(Stage::ExtractReference))?;
        let reference_samples = reference_set.len();

        index::check_k(k, reference_samples).map_err(|e| e.at(Stage::BuildIndex))?;
        let dimension = reference_set.dimension();
        let index = index::build(reference_set, strategy);
        tracing::info!(
            samples = reference_samples,
            backend = %index.strategy(),
            "built neighbor index"
        );

        let (target_set, region) =
            features::extract(target, window_size).map_err(|e| e.at(Stage::ExtractTarget))?;
        tracing::info!(queries = target_set.len(), "searching nearest neighbors");

        let index: &dyn NeighborIndex = index.as_ref();
        let chroma: Vec<Vec2> = (0..target_set.len())
            .into_par_iter()
            .map(|i| {
                let neighbors = index
                    .query(target_set.vector(i), k)
                    .map_err(|e| e.at(Stage::Query))?;
                blend::blend(&neighbors, sigma).map_err(|e| e.at(Stage::Blend))
            })
            .collect::<Result<_, _>>()?;
        tracing::info!("color transfer computed");

        let mut output = target.clone();
        for (i, &ab) in chroma.iter().enumerate() {
            let (x, y) = region.position(i);
            output.set_chroma(x, y, ab);
        }

        let report = TransferReport {
            width: output.width,
            height: output.height,
            dimension,
            reference_samples,
            query_samples: chroma.len(),
            strategy: index.strategy(),
        };
        Ok((output, report))
    }
}
