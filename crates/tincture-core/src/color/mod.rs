//! Color management — conversions between device sRGB and CIE-Lab.

pub mod lab;

pub use lab::{lab_to_srgb8, srgb8_to_lab, to_device, to_perceptual};
