// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversions between `Frame` and the `image` crate's buffers, plus the
// still-photo intake used when a user picks an existing picture instead of
// pointing the camera.

use coverscan_core::error::{Result, ScanError};
use coverscan_core::Frame;
use image::{DynamicImage, GrayImage, ImageBuffer, Rgba, RgbaImage, imageops};
use tracing::{debug, info, instrument};

/// Convert any decoded image into an RGBA8 frame.
pub fn frame_from_dynamic(image: DynamicImage) -> Result<Frame> {
    let rgba = image.into_rgba8();
    let (width, height) = rgba.dimensions();
    Frame::new(width, height, rgba.into_raw())
}

/// Decode encoded image bytes (JPEG, PNG, TIFF, etc.) into a frame.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn frame_from_bytes(data: &[u8]) -> Result<Frame> {
    let image = image::load_from_memory(data).map_err(|err| {
        ScanError::ImageError(format!("failed to decode image: {}", err))
    })?;
    debug!(
        width = image.width(),
        height = image.height(),
        "Image decoded from bytes"
    );
    frame_from_dynamic(image)
}

/// Load a frame from an image file on disk.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn open_frame(path: impl AsRef<std::path::Path>) -> Result<Frame> {
    let image = image::open(path.as_ref()).map_err(|err| {
        ScanError::ImageError(format!(
            "failed to open {}: {}",
            path.as_ref().display(),
            err
        ))
    })?;
    info!(
        width = image.width(),
        height = image.height(),
        "Image loaded"
    );
    frame_from_dynamic(image)
}

/// Move a frame's buffer into an `RgbaImage` without copying.
pub fn frame_to_rgba(frame: Frame) -> Result<RgbaImage> {
    let (width, height) = frame.dimensions();
    RgbaImage::from_raw(width, height, frame.into_raw()).ok_or_else(|| {
        ScanError::InvalidFrame(format!("buffer does not match {width}x{height}"))
    })
}

/// Luma (Rec. 709 weights, alpha ignored) of a frame for edge detection.
/// The frame is borrowed as an RGBA view, not copied.
pub fn frame_to_luma(frame: &Frame) -> Result<GrayImage> {
    let (width, height) = frame.dimensions();
    let view = ImageBuffer::<Rgba<u8>, &[u8]>::from_raw(width, height, frame.as_bytes()).ok_or_else(|| {
        ScanError::InvalidFrame(format!("buffer does not match {width}x{height}"))
    })?;
    Ok(imageops::grayscale(&view))
}

/// Write a frame to a file. The format is inferred from the file extension.
pub fn save_frame(frame: &Frame, path: impl AsRef<std::path::Path>) -> Result<()> {
    let rgba = frame_to_rgba(frame.clone())?;
    let image = if path_wants_opaque(path.as_ref()) {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(rgba).into_rgb8())
    } else {
        DynamicImage::ImageRgba8(rgba)
    };
    image.save(path.as_ref()).map_err(|err| {
        ScanError::ImageError(format!(
            "failed to save image to {}: {}",
            path.as_ref().display(),
            err
        ))
    })
}

/// JPEG has no alpha channel, so those outputs are flattened to RGB first.
fn path_wants_opaque(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "jpg" | "jpeg"))
        .unwrap_or(false)
}
