//! Feature extraction — one fixed-length vector plus a chroma label per sample.
//!
//! Two modes share one code path:
//! - **Chroma** (`window_size == 0`): the vector is the pixel's `(a, b)`.
//! - **Window** (`window_size >= 1`): the vector is the row-major lightness
//!   patch of side `2 * window_size + 1` centred on the pixel. Pixels closer
//!   than `window_size` to an edge produce no sample.
//!
//! Samples are always emitted in row-major order of their centre pixel. The
//! neighbor index breaks distance ties by this order.

use glam::Vec2;
use rayon::prelude::*;

use crate::error::TransferError;
use crate::image::LabImage;

/// How a sample's feature vector is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureMode {
    /// The pixel's own chroma pair.
    Chroma,
    /// A lightness patch of side `2 * size + 1`.
    Window { size: usize },
}

impl FeatureMode {
    pub fn from_window_size(window_size: usize) -> Self {
        if window_size == 0 {
            Self::Chroma
        } else {
            Self::Window { size: window_size }
        }
    }

    /// Border excluded on every edge.
    pub fn border(&self) -> usize {
        match self {
            Self::Chroma => 0,
            Self::Window { size } => *size,
        }
    }

    /// Window side length (1 for chroma mode). Saturates at `usize::MAX`.
    pub fn side(&self) -> usize {
        self.border().saturating_mul(2).saturating_add(1)
    }

    /// Length of every feature vector produced in this mode.
    pub fn dimension(&self) -> usize {
        match self {
            Self::Chroma => 2,
            Self::Window { .. } => self.side().saturating_mul(self.side()),
        }
    }
}

/// The interior rectangle of pixels that produce samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidRegion {
    pub border: usize,
    pub width: usize,
    pub height: usize,
}

impl ValidRegion {
    /// Number of sample columns.
    pub fn cols(&self) -> usize {
        self.width.saturating_sub(self.border.saturating_mul(2))
    }

    /// Number of sample rows.
    pub fn rows(&self) -> usize {
        self.height.saturating_sub(self.border.saturating_mul(2))
    }

    /// Total number of samples.
    pub fn len(&self) -> usize {
        self.cols() * self.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Image coordinates of the `i`-th sample in emission order.
    pub fn position(&self, i: usize) -> (usize, usize) {
        let cols = self.cols();
        (self.border + i % cols, self.border + i / cols)
    }

    /// Whether `(x, y)` is rewritten by a transfer.
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.border
            && y >= self.border
            && x < self.width - self.border
            && y < self.height - self.border
    }
}

/// An ordered collection of feature vectors with their chroma labels.
///
/// Vectors are stored flat: sample `i` occupies
/// `values[i * dimension..(i + 1) * dimension]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    dimension: usize,
    values: Vec<f32>,
    labels: Vec<Vec2>,
}

/// The feature set extracted from the reference image.
pub type ReferenceSet = FeatureSet;

impl FeatureSet {
    /// Build a set from flat values and labels.
    ///
    /// Returns `None` when `values` is not `labels.len() * dimension` long or
    /// `dimension` is zero.
    pub fn from_parts(dimension: usize, values: Vec<f32>, labels: Vec<Vec2>) -> Option<Self> {
        (dimension > 0 && values.len() == labels.len() * dimension).then_some(Self {
            dimension,
            values,
            labels,
        })
    }

    /// Build a set from individual vectors. All vectors must share a length.
    #[cfg(test)]
    pub(crate) fn from_vectors(vectors: &[Vec<f32>], labels: Vec<Vec2>) -> Option<Self> {
        let dimension = vectors.first()?.len();
        if vectors.iter().any(|v| v.len() != dimension) {
            return None;
        }
        Self::from_parts(dimension, vectors.concat(), labels)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Feature vector of sample `i`.
    #[inline]
    pub fn vector(&self, i: usize) -> &[f32] {
        &self.values[i * self.dimension..(i + 1) * self.dimension]
    }

    /// Chroma label of sample `i`.
    #[inline]
    pub fn label(&self, i: usize) -> Vec2 {
        self.labels[i]
    }

    pub fn labels(&self) -> &[Vec2] {
        &self.labels
    }

    /// Iterate over vectors in insertion order.
    pub fn vectors(&self) -> impl ExactSizeIterator<Item = &[f32]> + '_ {
        self.values.chunks_exact(self.dimension)
    }
}

/// Extract features from a Lab image.
///
/// Fails with [`TransferError::InvalidWindow`] when `2 * window_size + 1`
/// exceeds the image's smaller side.
pub fn extract(
    image: &LabImage,
    window_size: usize,
) -> Result<(FeatureSet, ValidRegion), TransferError> {
    let mode = FeatureMode::from_window_size(window_size);
    let min_side = image.min_side();
    if min_side == 0 || window_size > (min_side - 1) / 2 {
        return Err(TransferError::InvalidWindow {
            window_size,
            side: mode.side(),
            width: image.width,
            height: image.height,
        });
    }

    let region = ValidRegion {
        border: mode.border(),
        width: image.width as usize,
        height: image.height as usize,
    };
    let dimension = mode.dimension();
    let cols = region.cols();

    let mut values = vec![0.0_f32; region.len() * dimension];
    let mut labels = vec![Vec2::ZERO; region.len()];

    values
        .par_chunks_mut(cols * dimension)
        .zip(labels.par_chunks_mut(cols))
        .enumerate()
        .for_each(|(row, (row_values, row_labels))| {
            let y = row + region.border;
            for (col, (dst, label)) in row_values
                .chunks_exact_mut(dimension)
                .zip(row_labels.iter_mut())
                .enumerate()
            {
                let x = col + region.border;
                *label = image.chroma(x, y);
                match mode {
                    FeatureMode::Chroma => {
                        dst[0] = label.x;
                        dst[1] = label.y;
                    }
                    FeatureMode::Window { size } => write_patch(image, x, y, size, dst),
                }
            }
        });

    tracing::debug!(
        samples = region.len(),
        dimension,
        border = region.border,
        "extracted features"
    );

    Ok((
        FeatureSet {
            dimension,
            values,
            labels,
        },
        region,
    ))
}

/// Copy the lightness patch centred on `(cx, cy)` into `dst`, row-major.
fn write_patch(image: &LabImage, cx: usize, cy: usize, size: usize, dst: &mut [f32]) {
    let side = 2 * size + 1;
    for (dy, dst_row) in dst.chunks_exact_mut(side).enumerate() {
        let y = cy + dy - size;
        let start = image.index(cx - size, y);
        for (d, px) in dst_row.iter_mut().zip(&image.pixels[start..start + side]) {
            *d = px[0];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// L = 10 * y + x, a = x, b = -y.
    fn ramp(width: u32, height: u32) -> LabImage {
        let pixels = (0..height)
            .flat_map(|y| (0..width).map(move |x| [(10 * y + x) as f32, x as f32, -(y as f32)]))
            .collect();
        LabImage {
            width,
            height,
            pixels,
        }
    }

    #[test]
    fn test_chroma_mode_covers_every_pixel_in_row_major_order() {
        let img = ramp(3, 2);
        let (set, region) = extract(&img, 0).unwrap();
        assert_eq!(set.dimension(), 2);
        assert_eq!(set.len(), 6);
        assert_eq!(region.border, 0);
        assert_eq!(set.vector(4), &[1.0, -1.0]);
        assert_eq!(set.label(4), Vec2::new(1.0, -1.0));
        assert_eq!(region.position(4), (1, 1));
    }

    #[test]
    fn test_window_mode_excludes_border_and_flattens_row_major() {
        let img = ramp(5, 4);
        let (set, region) = extract(&img, 1).unwrap();
        assert_eq!(set.dimension(), 9);
        assert_eq!((region.cols(), region.rows()), (3, 2));
        assert_eq!(set.len(), 6);

        // First sample is centred on (1, 1).
        assert_eq!(
            set.vector(0),
            &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0, 20.0, 21.0, 22.0]
        );
        assert_eq!(set.label(0), Vec2::new(1.0, -1.0));

        // Last sample is centred on (3, 2).
        assert_eq!(region.position(5), (3, 2));
        assert_eq!(set.vector(5)[4], 23.0);
        assert_eq!(set.label(5), Vec2::new(3.0, -2.0));
    }

    #[test]
    fn test_window_equal_to_image_side_yields_single_sample() {
        let img = ramp(3, 3);
        let (set, region) = extract(&img, 1).unwrap();
        assert_eq!(set.len(), 1);
        assert!(region.contains(1, 1));
        assert!(!region.contains(0, 1));
        assert!(!region.contains(2, 2));
    }

    #[test]
    fn test_window_too_large_is_rejected() {
        let img = ramp(6, 4);
        let err = extract(&img, 2).unwrap_err();
        assert!(matches!(
            err,
            TransferError::InvalidWindow {
                window_size: 2,
                side: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_huge_window_is_rejected_without_overflow() {
        let img = LabImage::filled(8, 8, [50.0, 0.0, 0.0]);
        for window_size in [usize::MAX / 2 + 1, usize::MAX / 2, usize::MAX] {
            let err = extract(&img, window_size).unwrap_err();
            assert!(matches!(
                err,
                TransferError::InvalidWindow {
                    side: usize::MAX,
                    width: 8,
                    height: 8,
                    ..
                }
            ));
        }
        assert_eq!(FeatureMode::from_window_size(usize::MAX).dimension(), usize::MAX);
    }

    #[test]
    fn test_largest_fitting_window() {
        let img = ramp(8, 7);
        let (set, region) = extract(&img, 3).unwrap();
        assert_eq!(set.dimension(), 49);
        assert_eq!((region.cols(), region.rows()), (2, 1));
        assert!(extract(&img, 4).is_err());
    }

    #[test]
    fn test_from_vectors_rejects_ragged_input() {
        let ragged = vec![vec![0.0, 1.0], vec![2.0]];
        assert!(FeatureSet::from_vectors(&ragged, vec![Vec2::ZERO; 2]).is_none());

        let ok = FeatureSet::from_vectors(&[vec![0.0, 1.0]], vec![Vec2::X]).unwrap();
        assert_eq!(ok.dimension(), 2);
        assert_eq!(ok.vectors().count(), 1);
    }
}
