//! Transfer parameters.
//!
//! `TransferParams` is the single source of truth for a run. It can be read
//! from a JSON file; missing fields fall back to the defaults below.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::blend::check_sigma;
use crate::error::TransferError;
use crate::index::IndexStrategy;

/// Default neighbor count.
pub const DEFAULT_K: usize = 10;
/// Default kernel bandwidth.
pub const DEFAULT_SIGMA: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferParams {
    /// Number of neighbors blended per sample.
    pub k: usize,
    /// Gaussian kernel bandwidth.
    pub sigma: f64,
    /// Window half-size. `0` matches raw chroma, `n >= 1` matches
    /// `(2n+1)²` lightness patches.
    pub window_size: usize,
    /// Search structure for the reference features.
    pub index: IndexStrategy,
}

impl Default for TransferParams {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            sigma: DEFAULT_SIGMA,
            window_size: 0,
            index: IndexStrategy::Auto,
        }
    }
}

impl TransferParams {
    /// Check the image-independent constraints (`k >= 1`, `sigma > 0`).
    ///
    /// The upper bound on `k` and the window fit depend on the images and are
    /// checked by the pipeline.
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.k == 0 {
            return Err(TransferError::ZeroK);
        }
        check_sigma(self.sigma)
    }

    pub fn from_json_str(json: &str) -> Result<Self, TransferError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, TransferError> {
        let text = std::fs::read_to_string(path).map_err(|source| TransferError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String, TransferError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
