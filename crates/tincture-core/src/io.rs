//! Image file loading and saving.

use std::io;
use std::path::Path;

use image::{DynamicImage, RgbImage};

use crate::error::TransferError;

/// Load an image file as 8-bit RGB.
///
/// Any format the `image` crate decodes is accepted. Alpha is dropped and
/// grayscale is expanded to three channels.
pub fn load_image(path: &Path) -> Result<DynamicImage, TransferError> {
    if !path.exists() {
        return Err(TransferError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, "image file does not exist"),
        });
    }

    let decoded = image::open(path).map_err(|e| image_error(path, e))?;
    tracing::debug!(
        path = %path.display(),
        width = decoded.width(),
        height = decoded.height(),
        color = ?decoded.color(),
        "decoded image"
    );
    Ok(DynamicImage::ImageRgb8(decoded.to_rgb8()))
}

/// Save an RGB image, choosing the format from the file extension.
///
/// Missing parent directories are created.
pub fn save_image(image: &RgbImage, path: &Path) -> Result<(), TransferError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| TransferError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    image.save(path).map_err(|e| image_error(path, e))
}

fn image_error(path: &Path, err: image::ImageError) -> TransferError {
    match err {
        image::ImageError::IoError(source) => TransferError::Io {
            path: path.to_path_buf(),
            source,
        },
        source => TransferError::Image {
            path: path.to_path_buf(),
            source,
        },
    }
}
