//! Decoding of raw capture segments into pixel and depth grids.

use crate::config::CameraConfig;
use crate::error::{DrishtiError, Result};
use crate::io::RgbdPayload;
use image::{ColorType, ImageFormat, Rgb, RgbImage};
use tracing::{debug, warn};

/// Bytes per depth sample (IEEE-754 single precision)
const DEPTH_SAMPLE_BYTES: usize = 4;

/// Row-major `height × width` grid of raw depth samples.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthGrid {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl DepthGrid {
    /// Wrap a flat row-major buffer; fails unless it holds exactly `width * height` samples.
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        let cells = width as usize * height as usize;
        if data.len() != cells {
            return Err(DrishtiError::Shape(format!(
                "{} depth samples cannot be reshaped to {}x{}",
                data.len(),
                height,
                width
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sample at column `u`, row `v`.
    #[inline]
    pub fn get(&self, u: u32, v: u32) -> f32 {
        self.data[v as usize * self.width as usize + u as usize]
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Decoded RGB segment plus the encoder's self-description.
#[derive(Debug, Clone)]
pub struct DecodedRgb {
    pub image: RgbImage,
    /// Container format detected from the bytes
    pub format: Option<ImageFormat>,
    /// Color mode stored in the file before conversion to RGB
    pub color_type: ColorType,
}

/// One synchronized RGB + depth capture. Immutable once built.
#[derive(Debug, Clone)]
pub struct Frame {
    rgb: RgbImage,
    depth: DepthGrid,
}

impl Frame {
    /// Pair an RGB image with a depth grid of the same dimensions.
    pub fn new(rgb: RgbImage, depth: DepthGrid) -> Result<Self> {
        if rgb.dimensions() != (depth.width(), depth.height()) {
            return Err(DrishtiError::Shape(format!(
                "RGB image is {}x{} but depth grid is {}x{}",
                rgb.width(),
                rgb.height(),
                depth.width(),
                depth.height()
            )));
        }
        Ok(Self { rgb, depth })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.depth.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.depth.height
    }

    #[inline]
    pub fn rgb(&self) -> &RgbImage {
        &self.rgb
    }

    #[inline]
    pub fn depth(&self) -> &DepthGrid {
        &self.depth
    }

    /// Color at column `u`, row `v`.
    #[inline]
    pub fn color(&self, u: u32, v: u32) -> [u8; 3] {
        let Rgb(c) = *self.rgb.get_pixel(u, v);
        c
    }
}

/// Decode a self-describing encoded still image into RGB pixels.
pub fn decode_rgb(bytes: &[u8]) -> Result<DecodedRgb> {
    let format = image::guess_format(bytes).ok();
    let decoded = image::load_from_memory(bytes)?;
    let color_type = decoded.color();
    debug!(
        "RGB image decoded: format {:?}, size {}x{}, mode {:?}",
        format,
        decoded.width(),
        decoded.height(),
        color_type
    );
    Ok(DecodedRgb {
        image: decoded.to_rgb8(),
        format,
        color_type,
    })
}

/// Reinterpret `bytes` as little-endian f32 samples in `height` rows of `width`.
///
/// A byte count other than `width * height * 4` logs a warning; decoding
/// still fails if the samples cannot fill the declared grid exactly.
pub fn decode_depth(bytes: &[u8], width: u32, height: u32) -> Result<DepthGrid> {
    let expected = width as usize * height as usize * DEPTH_SAMPLE_BYTES;
    if bytes.len() != expected {
        warn!(
            "Depth size mismatch: expected {} bytes, got {}",
            expected,
            bytes.len()
        );
    }
    if bytes.len() % DEPTH_SAMPLE_BYTES != 0 {
        return Err(DrishtiError::Shape(format!(
            "{} depth bytes are not a whole number of f32 samples",
            bytes.len()
        )));
    }

    let data = bytes
        .chunks_exact(DEPTH_SAMPLE_BYTES)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    DepthGrid::new(width, height, data)
}

/// Decoder bound to the camera's declared resolution.
#[derive(Debug, Clone, Copy)]
pub struct FrameDecoder {
    width: u32,
    height: u32,
}

impl FrameDecoder {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(config.width, config.height)
    }

    pub fn decode_rgb(&self, bytes: &[u8]) -> Result<DecodedRgb> {
        decode_rgb(bytes)
    }

    pub fn decode_depth(&self, bytes: &[u8]) -> Result<DepthGrid> {
        decode_depth(bytes, self.width, self.height)
    }

    /// Decode both segments of a capture into a [`Frame`].
    ///
    /// Depth is decoded first so a malformed grid is rejected before the
    /// more expensive image decode.
    pub fn decode(&self, payload: &RgbdPayload) -> Result<Frame> {
        let depth = self.decode_depth(&payload.depth)?;
        let rgb = self.decode_rgb(&payload.rgb)?;
        Frame::new(rgb.image, depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(image: DynamicImage) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        image.write_to(&mut cursor, ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    fn depth_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_decode_rgb_png() {
        let img = RgbImage::from_fn(4, 3, |x, y| Rgb([x as u8 * 10, y as u8 * 20, 7]));
        let decoded = decode_rgb(&png_bytes(DynamicImage::ImageRgb8(img))).unwrap();
        assert_eq!(decoded.format, Some(ImageFormat::Png));
        assert_eq!(decoded.color_type, ColorType::Rgb8);
        assert_eq!(decoded.image.dimensions(), (4, 3));
        assert_eq!(decoded.image.get_pixel(3, 2).0, [30, 40, 7]);
    }

    #[test]
    fn test_decode_rgba_drops_alpha() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 128]));
        let decoded = decode_rgb(&png_bytes(DynamicImage::ImageRgba8(img))).unwrap();
        assert_eq!(decoded.color_type, ColorType::Rgba8);
        assert_eq!(decoded.image.get_pixel(0, 0).0, [1, 2, 3]);
    }

    #[test]
    fn test_decode_rgb_rejects_garbage() {
        let err = decode_rgb(b"definitely not an image").unwrap_err();
        assert!(matches!(err, DrishtiError::Decode(_)));
    }

    #[test]
    fn test_decode_depth_row_major() {
        let values: Vec<f32> = (0..6).map(|i| i as f32).collect();
        let grid = decode_depth(&depth_bytes(&values), 3, 2).unwrap();
        assert_eq!(grid.get(0, 0), 0.0);
        assert_eq!(grid.get(2, 0), 2.0);
        assert_eq!(grid.get(0, 1), 3.0);
        assert_eq!(grid.get(2, 1), 5.0);
    }

    #[test]
    fn test_decode_depth_wrong_count_fails() {
        let err = decode_depth(&depth_bytes(&[1.0; 5]), 3, 2).unwrap_err();
        assert!(matches!(err, DrishtiError::Shape(_)));
    }

    #[test]
    fn test_decode_depth_partial_sample_fails() {
        let mut bytes = depth_bytes(&[1.0; 6]);
        bytes.push(0);
        assert!(matches!(
            decode_depth(&bytes, 3, 2).unwrap_err(),
            DrishtiError::Shape(_)
        ));
    }

    #[test]
    fn test_frame_rejects_mismatched_dimensions() {
        let depth = DepthGrid::new(2, 2, vec![1.0; 4]).unwrap();
        let rgb = RgbImage::new(3, 2);
        assert!(matches!(
            Frame::new(rgb, depth).unwrap_err(),
            DrishtiError::Shape(_)
        ));
    }

    #[test]
    fn test_decoder_builds_frame() {
        let rgb = png_bytes(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            2,
            2,
            Rgb([9, 8, 7]),
        )));
        let payload = RgbdPayload {
            rgb,
            depth: depth_bytes(&[0.5; 4]),
        };
        let frame = FrameDecoder::new(2, 2).decode(&payload).unwrap();
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.color(1, 1), [9, 8, 7]);
        assert_eq!(frame.depth().get(1, 1), 0.5);
    }
}
