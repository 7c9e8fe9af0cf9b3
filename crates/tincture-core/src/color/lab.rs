//! sRGB ⇄ CIE-Lab conversion.
//!
//! Lab uses the D65 white point and the 2° observer, matching the sRGB
//! primaries, so no chromatic adaptation is needed in either direction.
//!
//! ```text
//! forward: u8 / 255 → sRGB EOTF → linear sRGB → XYZ(D65) → Lab
//! inverse: Lab → XYZ(D65) → linear sRGB → sRGB OETF → ×255 → clip → round
//! ```

use image::{DynamicImage, RgbImage};
use palette::{FromColor, IntoColor, Lab, LinSrgb, Srgb};
use rayon::prelude::*;

use crate::error::TransferError;
use crate::image::LabImage;

/// Convert a single 8-bit sRGB pixel to `[L, a, b]`.
pub fn srgb8_to_lab(rgb: [u8; 3]) -> [f32; 3] {
    let srgb = Srgb::new(
        rgb[0] as f32 / 255.0,
        rgb[1] as f32 / 255.0,
        rgb[2] as f32 / 255.0,
    );
    let lin: LinSrgb<f32> = srgb.into_linear();
    let lab: Lab = Lab::from_color(lin);
    [lab.l, lab.a, lab.b]
}

/// Convert `[L, a, b]` back to an 8-bit sRGB pixel.
///
/// Out-of-gamut values are clipped silently to `[0, 255]`.
pub fn lab_to_srgb8(lab: [f32; 3]) -> [u8; 3] {
    let lab: Lab = Lab::new(lab[0], lab[1], lab[2]);
    let lin: LinSrgb<f32> = lab.into_color();
    let srgb: Srgb<f32> = Srgb::from_linear(lin);
    [
        encode_channel(srgb.red),
        encode_channel(srgb.green),
        encode_channel(srgb.blue),
    ]
}

fn encode_channel(v: f32) -> u8 {
    // NaN clamps to NaN and `as u8` saturates it to 0.
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Convert a decoded device image to Lab.
///
/// Fails with [`TransferError::InvalidShape`] unless the image has exactly
/// three channels. Higher bit depths are reduced to 8 bits first.
pub fn to_perceptual(image: &DynamicImage) -> Result<LabImage, TransferError> {
    let channels = image.color().channel_count();
    if channels != 3 {
        return Err(TransferError::InvalidShape { channels });
    }

    let rgb = image.to_rgb8();
    Ok(rgb8_to_lab(&rgb))
}

/// Convert an 8-bit RGB buffer to Lab.
pub fn rgb8_to_lab(rgb: &RgbImage) -> LabImage {
    let pixels = rgb
        .as_raw()
        .par_chunks_exact(3)
        .map(|px| srgb8_to_lab([px[0], px[1], px[2]]))
        .collect();

    LabImage {
        width: rgb.width(),
        height: rgb.height(),
        pixels,
    }
}

/// Convert a Lab image back to 8-bit sRGB.
pub fn to_device(image: &LabImage) -> RgbImage {
    let mut out = RgbImage::new(image.width, image.height);
    let raw: &mut [u8] = &mut out;
    raw.par_chunks_exact_mut(3)
        .zip(image.pixels.par_iter())
        .for_each(|(dst, lab)| dst.copy_from_slice(&lab_to_srgb8(*lab)));
    out
}
