use burn::data::dataset::Dataset;

use crate::data::loader::{ManifestEntry, ManifestLoader};
use crate::data::preprocessor::ImagePreprocessor;
use crate::domain::errors::FinetuneResult;

/// One decoded, preprocessed example.
/// `pixels` is HWC, BGR, mean-centred; `label` is the class index.
#[derive(Debug, Clone)]
pub struct ImageSample {
    pub pixels: Vec<f32>,
    pub label:  usize,
}

/// A manifest split whose images are decoded on demand.
pub struct ManifestDataset {
    entries:      Vec<ManifestEntry>,
    preprocessor: ImagePreprocessor,
}

impl ManifestDataset {
    pub fn new(entries: Vec<ManifestEntry>, preprocessor: ImagePreprocessor) -> Self {
        Self { entries, preprocessor }
    }

    pub fn from_manifest(
        path:        &str,
        num_classes: usize,
        image_size:  usize,
    ) -> FinetuneResult<Self> {
        let entries = ManifestLoader::new(path, num_classes).load()?;
        Ok(Self::new(entries, ImagePreprocessor::new(image_size)))
    }

}

impl Dataset<ImageSample> for ManifestDataset {
    fn get(&self, index: usize) -> Option<ImageSample> {
        let entry = self.entries.get(index)?;
        match self.preprocessor.load(&entry.image_path) {
            Ok(pixels) => Some(ImageSample { pixels, label: entry.label }),
            Err(e) => {
                tracing::error!("Cannot decode '{}': {}", entry.image_path.display(), e);
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::fs;

    #[test]
    fn test_decodes_entries_from_manifest() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(8, 8, Rgb([1, 2, 3])).save(dir.path().join("a.png")).unwrap();
        fs::write(dir.path().join("b.png"), b"not an image").unwrap();
        let manifest = dir.path().join("val.txt");
        fs::write(&manifest, "a.png 1\nb.png 0\n").unwrap();

        let ds = ManifestDataset::from_manifest(manifest.to_str().unwrap(), 2, 4).unwrap();
        assert_eq!(ds.len(), 2);

        let sample = ds.get(0).unwrap();
        assert_eq!(sample.label, 1);
        assert_eq!(sample.pixels.len(), 4 * 4 * 3);

        // Undecodable file surfaces as a missing sample
        assert!(ds.get(1).is_none());
        assert!(ds.get(2).is_none());
    }
}
