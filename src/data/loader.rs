// ============================================================
// Layer 4 — Manifest Loader
// ============================================================
// Reads the text manifests that describe a dataset split.
//
// Manifest format (one example per line):
//
//   images/cat_001.jpg 0
//   images/dog_017.jpg 1
//   /abs/path/bird.png 3
//
// Fields are whitespace separated: image path, integer class.
// Blank lines are ignored. Relative image paths are resolved
// against the directory containing the manifest, so a manifest
// can be moved together with its images.
//
// Anything wrong with a manifest is a configuration error:
// it is reported before the first training step runs.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::errors::{FinetuneError, FinetuneResult};

/// One `(image_path, class_label)` pair from a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub image_path: PathBuf,
    pub label:      usize,
}

/// Loads and validates a manifest file.
pub struct ManifestLoader {
    path:        PathBuf,
    num_classes: usize,
}

impl ManifestLoader {
    pub fn new(path: impl Into<PathBuf>, num_classes: usize) -> Self {
        Self { path: path.into(), num_classes }
    }

    /// Read the manifest and check every referenced image exists.
    pub fn load(&self) -> FinetuneResult<Vec<ManifestEntry>> {
        if !self.path.is_file() {
            return Err(FinetuneError::config(format!(
                "manifest '{}' does not exist",
                self.path.display()
            )));
        }

        let text = fs::read_to_string(&self.path)
            .map_err(|e| FinetuneError::io(&self.path, e))?;
        let base = self.path.parent().unwrap_or_else(|| Path::new("."));
        let entries = parse_manifest(&text, base, self.num_classes)
            .map_err(|msg| FinetuneError::config(format!("{}: {}", self.path.display(), msg)))?;

        for entry in &entries {
            if !entry.image_path.is_file() {
                return Err(FinetuneError::config(format!(
                    "{}: image '{}' does not exist",
                    self.path.display(),
                    entry.image_path.display()
                )));
            }
        }

        tracing::info!(
            "Loaded {} examples from '{}'",
            entries.len(),
            self.path.display()
        );
        Ok(entries)
    }
}

/// Parse manifest text. Errors carry the 1-based line number.
pub fn parse_manifest(
    text:        &str,
    base_dir:    &Path,
    num_classes: usize,
) -> Result<Vec<ManifestEntry>, String> {
    let mut entries = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        let mut fields = line.split_whitespace();

        let Some(path) = fields.next() else {
            continue;
        };
        let label = fields
            .next()
            .ok_or_else(|| format!("line {line_no}: missing class label"))?;
        if fields.next().is_some() {
            return Err(format!("line {line_no}: expected 'image_path label'"));
        }

        let label: usize = label
            .parse()
            .map_err(|_| format!("line {line_no}: invalid class label '{label}'"))?;
        if label >= num_classes {
            return Err(format!(
                "line {line_no}: class label {label} out of range for {num_classes} classes"
            ));
        }

        let path = Path::new(path);
        let image_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        };

        entries.push(ManifestEntry { image_path, label });
    }

    Ok(entries)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_pairs_and_skips_blank_lines() {
        let text    = "a.jpg 0\n\n  b.jpg   3  \n";
        let entries = parse_manifest(text, Path::new("/data"), 4).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].image_path, PathBuf::from("/data/a.jpg"));
        assert_eq!(entries[1].label, 3);
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let entries = parse_manifest("/img/x.png 1", Path::new("/data"), 2).unwrap();
        assert_eq!(entries[0].image_path, PathBuf::from("/img/x.png"));
    }

    #[test]
    fn test_rejects_out_of_range_label() {
        let err = parse_manifest("a.jpg 4", Path::new("."), 4).unwrap_err();
        assert!(err.contains("out of range"));
    }

    #[test]
    fn test_rejects_missing_or_bad_label() {
        assert!(parse_manifest("a.jpg", Path::new("."), 4).is_err());
        assert!(parse_manifest("a.jpg cat", Path::new("."), 4).is_err());
        assert!(parse_manifest("a.jpg 1 extra", Path::new("."), 4).is_err());
    }

    #[test]
    fn test_missing_manifest_is_configuration_error() {
        let loader = ManifestLoader::new("/definitely/not/here.txt", 4);
        assert!(matches!(loader.load(), Err(FinetuneError::Configuration(_))));
    }

    #[test]
    fn test_missing_image_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("train.txt");
        fs::write(&manifest, "missing.jpg 0\n").unwrap();

        let err = ManifestLoader::new(&manifest, 4).load().unwrap_err();
        assert!(matches!(err, FinetuneError::Configuration(_)));
        assert!(err.to_string().contains("missing.jpg"));
    }
}
