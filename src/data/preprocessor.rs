// ============================================================
// Layer 4 — Image Preprocessor
// ============================================================
// Turns an image file into the float layout the network expects.
//
// Steps (applied in order):
//   1. Decode the file and convert to 8-bit RGB
//   2. Resize to size × size (Triangle filter)
//   3. Subtract the ImageNet per-channel mean (RGB order)
//   4. Reverse the channel order to BGR
//
// Output layout is HWC, row-major: pixel (y, x) channel c lives at
// index (y * size + x) * 3 + c. The pretrained AlexNet weights were
// learned on mean-centred BGR input, so both the centring and the
// channel swap must match.

use std::path::Path;

use image::{imageops::FilterType, ImageResult, RgbImage};

/// Per-channel ImageNet mean in RGB order.
pub const IMAGENET_MEAN_RGB: [f32; 3] = [123.68, 116.779, 103.939];

pub const CHANNELS: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct ImagePreprocessor {
    size: u32,
}

impl ImagePreprocessor {
    pub fn new(size: usize) -> Self {
        Self { size: size as u32 }
    }

    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// Number of floats produced per image.
    pub fn sample_len(&self) -> usize {
        self.size() * self.size() * CHANNELS
    }

    pub fn load(&self, path: &Path) -> ImageResult<Vec<f32>> {
        let img = image::open(path)?.to_rgb8();
        Ok(self.process(img))
    }

    pub fn process(&self, img: RgbImage) -> Vec<f32> {
        let img = if img.dimensions() == (self.size, self.size) {
            img
        } else {
            image::imageops::resize(&img, self.size, self.size, FilterType::Triangle)
        };

        let mut out = Vec::with_capacity(self.sample_len());
        for pixel in img.pixels() {
            let [r, g, b] = pixel.0;
            out.push(b as f32 - IMAGENET_MEAN_RGB[2]);
            out.push(g as f32 - IMAGENET_MEAN_RGB[1]);
            out.push(r as f32 - IMAGENET_MEAN_RGB[0]);
        }
        out
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_mean_subtracted_and_bgr_ordered() {
        let p   = ImagePreprocessor::new(1);
        let img = RgbImage::from_pixel(1, 1, Rgb([200, 100, 50]));
        let out = p.process(img);

        assert_eq!(out.len(), 3);
        assert!((out[0] - (50.0 - 103.939)).abs() < 1e-4);
        assert!((out[1] - (100.0 - 116.779)).abs() < 1e-4);
        assert!((out[2] - (200.0 - 123.68)).abs() < 1e-4);
    }

    #[test]
    fn test_resizes_to_square() {
        let p   = ImagePreprocessor::new(4);
        let img = RgbImage::from_pixel(10, 6, Rgb([10, 20, 30]));
        assert_eq!(p.process(img).len(), p.sample_len());
    }

    #[test]
    fn test_load_from_disk() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("px.png");
        RgbImage::from_pixel(3, 3, Rgb([0, 0, 0])).save(&path).unwrap();

        let out = ImagePreprocessor::new(3).load(&path).unwrap();
        assert_eq!(out.len(), 27);
        assert!((out[0] + 103.939).abs() < 1e-4);
    }
}
