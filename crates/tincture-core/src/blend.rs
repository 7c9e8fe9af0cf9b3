//! Gaussian kernel blending of neighbor chroma.
//!
//! ```text
//! w_i   = exp(-d_i² / (2σ²))
//! ŵ_i   = w_i / Σ w_j
//! chroma = Σ ŵ_i · label_i
//! ```

use glam::Vec2;

use crate::error::TransferError;
use crate::index::Neighbor;

/// Check that sigma is a usable kernel bandwidth.
pub fn check_sigma(sigma: f64) -> Result<(), TransferError> {
    if !(sigma > 0.0 && sigma.is_finite()) {
        return Err(TransferError::InvalidSigma(sigma));
    }
    Ok(())
}

/// Normalized kernel weights for a list of distances.
///
/// The result is non-negative and sums to 1. If every raw weight underflows
/// to zero, weights are taken relative to the smallest distance instead,
/// which yields the same normalized vector.
pub fn gaussian_weights(distances: &[f64], sigma: f64) -> Result<Vec<f64>, TransferError> {
    check_sigma(sigma)?;
    let denom = 2.0 * sigma * sigma;

    let mut weights: Vec<f64> = distances.iter().map(|d| (-(d * d) / denom).exp()).collect();
    let mut total: f64 = weights.iter().sum();

    if !(total > 0.0) && !distances.is_empty() {
        let nearest_sq = distances
            .iter()
            .map(|d| d * d)
            .fold(f64::INFINITY, f64::min);
        tracing::trace!(nearest_sq, sigma, "kernel weights underflowed, rescaling");
        weights = distances
            .iter()
            .map(|d| (-(d * d - nearest_sq) / denom).exp())
            .collect();
        total = weights.iter().sum();
    }

    for w in &mut weights {
        *w /= total;
    }
    Ok(weights)
}

/// Blend the neighbors' chroma labels with Gaussian kernel weights.
pub fn blend(neighbors: &[Neighbor], sigma: f64) -> Result<Vec2, TransferError> {
    let distances: Vec<f64> = neighbors.iter().map(|n| n.distance).collect();
    let weights = gaussian_weights(&distances, sigma)?;

    let (a, b) = neighbors
        .iter()
        .zip(&weights)
        .fold((0.0_f64, 0.0_f64), |(a, b), (n, &w)| {
            (a + w * n.label.x as f64, b + w * n.label.y as f64)
        });
    Ok(Vec2::new(a as f32, b as f32))
}
