use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use quizpdf_core::{FigureKey, FigureStore};

use crate::prelude::*;

/// Writes figures as PNG files into a single directory.
///
/// A key is written at most once per store. Files left by an earlier run
/// under the same name are replaced.
#[derive(Debug)]
pub struct PngDirectory {
    dir: PathBuf,
    written: HashSet<FigureKey>,
}

impl PngDirectory {
    /// Create `dir` (and its parents) if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .wrap_err_with(|| f!("Failed to create output directory {}", dir.display()))?;

        Ok(PngDirectory {
            dir,
            written: HashSet::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn written(&self) -> usize {
        self.written.len()
    }
}

impl FigureStore<DynamicImage> for PngDirectory {
    type Error = Error;

    fn persist(&mut self, key: &FigureKey, raster: &DynamicImage) -> Result<PathBuf, Error> {
        let path = self.dir.join(key.file_name());
        let write_failed = |reason: String| Error::FigureWrite {
            path: path.display().to_string(),
            reason,
        };

        if self.written.contains(key) {
            return Err(Error::FigureExists(path.display().to_string()));
        }

        let file = File::create(&path).map_err(|e| write_failed(e.to_string()))?;

        raster
            .write_to(&mut BufWriter::new(file), image::ImageFormat::Png)
            .map_err(|e| write_failed(e.to_string()))?;

        log::debug!("wrote {}", path.display());
        self.written.insert(*key);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(page: usize, block: usize, region: usize) -> FigureKey {
        FigureKey {
            page,
            block,
            region,
        }
    }

    #[test]
    fn test_creates_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("nested").join("q_images");

        let store = PngDirectory::create(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(store.dir(), dir.as_path());
    }

    #[test]
    fn test_persist_writes_png() {
        let root = tempfile::tempdir().unwrap();
        let mut store = PngDirectory::create(root.path()).unwrap();

        let path = store
            .persist(&key(2, 0, 1), &DynamicImage::new_rgb8(3, 2))
            .unwrap();

        assert_eq!(path, root.path().join("p2_q0_img1.png"));
        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
        assert_eq!(store.written(), 1);
    }

    #[test]
    fn test_same_key_refused_within_run() {
        let root = tempfile::tempdir().unwrap();
        let mut store = PngDirectory::create(root.path()).unwrap();
        let raster = DynamicImage::new_luma8(1, 1);

        store.persist(&key(1, 0, 0), &raster).unwrap();
        let err = store.persist(&key(1, 0, 0), &raster).unwrap_err();
        assert!(matches!(err, Error::FigureExists(_)));
    }

    #[test]
    fn test_existing_file_replaced() {
        let root = tempfile::tempdir().unwrap();
        let existing = root.path().join("p1_q0_img0.png");
        std::fs::write(&existing, b"stale").unwrap();

        let mut store = PngDirectory::create(root.path()).unwrap();
        store
            .persist(&key(1, 0, 0), &DynamicImage::new_luma8(4, 4))
            .unwrap();

        assert_eq!(image::open(&existing).unwrap().width(), 4);
    }

    #[test]
    fn test_second_run_into_same_directory_attaches_figures() {
        let root = tempfile::tempdir().unwrap();
        let raster = DynamicImage::new_rgb8(2, 2);

        let mut first = PngDirectory::create(root.path()).unwrap();
        let first_path = first.persist(&key(1, 0, 0), &raster).unwrap();

        let mut second = PngDirectory::create(root.path()).unwrap();
        let second_path = second.persist(&key(1, 0, 0), &raster).unwrap();

        assert_eq!(first_path, second_path);
        assert_eq!(second.written(), 1);
        assert!(second.persist(&key(1, 0, 0), &raster).is_err());
    }
}
