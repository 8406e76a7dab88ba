//! Horizontal strip composition.

use std::path::Path;

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::error::StripError;

/// JPEG quality for encoded strips.
pub const STRIP_JPEG_QUALITY: u8 = 90;

pub const STRIP_MIME: &str = "image/jpeg";

/// An encoded strip image.
#[derive(Debug, Clone)]
pub struct StripImage {
    pub width: u32,
    pub height: u32,
    pub jpeg: Vec<u8>,
}

impl StripImage {
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.jpeg)
    }

    /// `data:` URL suitable for an `image_url` message part.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", STRIP_MIME, self.to_base64())
    }
}

fn scaled_dim(dim: u32, scale: f32) -> u32 {
    ((dim as f64 * scale as f64) as u32).max(1)
}

/// Concatenate frames left to right.
///
/// Frames are optionally shrunk by `scale`, then resized to the tallest
/// frame's height with their aspect ratio kept.
pub fn compose_frames(frames: Vec<RgbImage>, scale: Option<f32>) -> Result<RgbImage, StripError> {
    if frames.is_empty() {
        return Err(StripError::Empty);
    }

    let frames: Vec<RgbImage> = match scale {
        Some(s) if s != 1.0 => frames
            .into_iter()
            .map(|im| {
                let (w, h) = im.dimensions();
                imageops::resize(&im, scaled_dim(w, s), scaled_dim(h, s), FilterType::Lanczos3)
            })
            .collect(),
        _ => frames,
    };

    let max_h = frames.iter().map(|im| im.height()).max().unwrap_or(1);
    let frames: Vec<RgbImage> = frames
        .into_iter()
        .map(|im| {
            let (w, h) = im.dimensions();
            if h == max_h {
                im
            } else {
                let new_w = ((w as u64 * max_h as u64) / h as u64).max(1) as u32;
                imageops::resize(&im, new_w, max_h, FilterType::Lanczos3)
            }
        })
        .collect();

    let total_w: u32 = frames.iter().map(|im| im.width()).sum();
    let mut strip = RgbImage::new(total_w, max_h);
    let mut x = 0i64;
    for im in &frames {
        imageops::replace(&mut strip, im, x, 0);
        x += im.width() as i64;
    }
    Ok(strip)
}

pub fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>, StripError> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, STRIP_JPEG_QUALITY);
    encoder.encode_image(image)?;
    Ok(buf)
}

/// Load frames from disk and compose them into an encoded strip.
pub fn compose_strip<P: AsRef<Path>>(
    paths: &[P],
    scale: Option<f32>,
) -> Result<StripImage, StripError> {
    let frames = paths
        .iter()
        .map(|p| {
            let p = p.as_ref();
            image::open(p)
                .map(|im| im.to_rgb8())
                .map_err(|e| StripError::Open {
                    path: p.display().to_string(),
                    message: e.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let strip = compose_frames(frames, scale)?;
    let jpeg = encode_jpeg(&strip)?;
    Ok(StripImage {
        width: strip.width(),
        height: strip.height(),
        jpeg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(w: u32, h: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([value, value, value]))
    }

    #[test]
    fn test_compose_equal_heights() {
        let strip = compose_frames(vec![solid(4, 3, 0), solid(5, 3, 255)], None).expect("strip");
        assert_eq!(strip.dimensions(), (9, 3));
        assert_eq!(strip.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(strip.get_pixel(4, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_compose_unifies_height() {
        let strip = compose_frames(vec![solid(10, 10, 10), solid(10, 5, 20)], None).expect("strip");
        // second frame scaled to 20x10
        assert_eq!(strip.dimensions(), (30, 10));
    }

    #[test]
    fn test_compose_with_scale() {
        let strip =
            compose_frames(vec![solid(8, 6, 0), solid(8, 6, 0)], Some(0.5)).expect("strip");
        assert_eq!(strip.dimensions(), (8, 3));
    }

    #[test]
    fn test_scale_never_below_one_pixel() {
        let strip = compose_frames(vec![solid(2, 2, 0)], Some(0.1)).expect("strip");
        assert_eq!(strip.dimensions(), (1, 1));
    }

    #[test]
    fn test_compose_empty() {
        assert!(matches!(compose_frames(vec![], None), Err(StripError::Empty)));
    }

    #[test]
    fn test_compose_strip_from_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        solid(6, 4, 30).save(&a).expect("save");
        solid(6, 4, 200).save(&b).expect("save");

        let strip = compose_strip(&[&a, &b, &a], None).expect("strip");
        assert_eq!((strip.width, strip.height), (18, 4));
        assert_eq!(&strip.jpeg[..2], &[0xFF, 0xD8]);
        assert!(strip.to_data_url().starts_with("data:image/jpeg;base64,/9j/"));
    }

    #[test]
    fn test_compose_strip_missing_file() {
        let result = compose_strip(&[Path::new("/nonexistent/frame.jpg")], None);
        assert!(matches!(result, Err(StripError::Open { .. })));
    }
}
