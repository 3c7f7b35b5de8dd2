//! DRIVE-style dataset layout on disk.
//!
//! ```text
//! <root>/<split>/images/21_training.tif
//! <root>/<split>/mask/21_training_mask.gif
//! <root>/<split>/1st_manual/21_manual1.gif
//! <root>/<split>/segmented/21_segmented.png   (written)
//! ```

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use image::ImageFormat;

use crate::error::SegmentError;
use crate::metrics::ItemId;
use crate::pipeline::{ItemRasters, ItemSource, SegmentationSink};
use crate::raster::BinaryMask;

/// Split used when none is given.
pub const DEFAULT_SPLIT: &str = "training";
/// Item ids of the DRIVE training split.
pub const DEFAULT_IDS: RangeInclusive<ItemId> = 21..=40;

/// File naming of one dataset split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    root: PathBuf,
    split: String,
}

impl DatasetLayout {
    pub fn new(root: impl Into<PathBuf>, split: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            split: split.into(),
        }
    }

    /// Layout of the default `training` split under `root`.
    pub fn training(root: impl Into<PathBuf>) -> Self {
        Self::new(root, DEFAULT_SPLIT)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn split(&self) -> &str {
        &self.split
    }

    fn split_dir(&self) -> PathBuf {
        self.root.join(&self.split)
    }

    pub fn image_path(&self, id: ItemId) -> PathBuf {
        self.split_dir()
            .join("images")
            .join(format!("{id:02}_{}.tif", self.split))
    }

    pub fn fov_path(&self, id: ItemId) -> PathBuf {
        self.split_dir()
            .join("mask")
            .join(format!("{id:02}_{}_mask.gif", self.split))
    }

    pub fn ground_truth_path(&self, id: ItemId) -> PathBuf {
        self.split_dir()
            .join("1st_manual")
            .join(format!("{id:02}_manual1.gif"))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.split_dir().join("segmented")
    }

    pub fn output_path(&self, id: ItemId) -> PathBuf {
        self.output_dir().join(format!("{id:02}_segmented.png"))
    }
}

fn open(path: &Path) -> Result<image::DynamicImage, SegmentError> {
    if !path.is_file() {
        return Err(SegmentError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    image::open(path).map_err(|source| SegmentError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })
}

/// A dataset split that loads rasters and stores segmentations as PNG.
#[derive(Debug, Clone)]
pub struct Dataset {
    layout: DatasetLayout,
}

impl Dataset {
    pub fn new(layout: DatasetLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    /// Create the output directory if needed.
    pub fn ensure_output_dir(&self) -> Result<PathBuf, SegmentError> {
        let dir = self.layout.output_dir();
        std::fs::create_dir_all(&dir).map_err(|source| SegmentError::OutputDir {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }
}

impl ItemSource for Dataset {
    fn load(&self, id: ItemId) -> Result<ItemRasters, SegmentError> {
        let image = open(&self.layout.image_path(id))?.to_rgb8();
        let fov = open(&self.layout.fov_path(id))?.to_luma8();
        let ground_truth = open(&self.layout.ground_truth_path(id))?.to_luma8();
        tracing::debug!(id, width = image.width(), height = image.height(), "loaded item");
        Ok(ItemRasters {
            image,
            fov,
            ground_truth,
        })
    }
}

impl SegmentationSink for Dataset {
    fn store(&self, id: ItemId, mask: &BinaryMask) -> Result<(), SegmentError> {
        self.ensure_output_dir()?;
        let path = self.layout.output_path(id);
        mask.to_gray_image()
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|source| SegmentError::Write {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(id, path = %path.display(), "wrote segmentation");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fundus_item;

    fn write_item(layout: &DatasetLayout, id: ItemId) {
        let item = fundus_item(16, 12, 6, 3);
        for p in [layout.image_path(id), layout.fov_path(id), layout.ground_truth_path(id)] {
            std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        }
        item.image
            .save_with_format(layout.image_path(id), ImageFormat::Tiff)
            .unwrap();
        // The GIF encoder takes RGB(A) input.
        for (gray, path) in [
            (item.fov, layout.fov_path(id)),
            (item.ground_truth, layout.ground_truth_path(id)),
        ] {
            image::DynamicImage::ImageLuma8(gray)
                .to_rgb8()
                .save_with_format(path, ImageFormat::Gif)
                .unwrap();
        }
    }

    #[test]
    fn drive_paths() {
        let layout = DatasetLayout::training("/data/DRIVE");
        assert_eq!(
            layout.image_path(21),
            Path::new("/data/DRIVE/training/images/21_training.tif")
        );
        assert_eq!(
            layout.fov_path(3),
            Path::new("/data/DRIVE/training/mask/03_training_mask.gif")
        );
        assert_eq!(
            layout.ground_truth_path(40),
            Path::new("/data/DRIVE/training/1st_manual/40_manual1.gif")
        );
        assert_eq!(
            layout.output_path(22),
            Path::new("/data/DRIVE/training/segmented/22_segmented.png")
        );
        let test = DatasetLayout::new("/d", "test");
        assert_eq!(test.image_path(1), Path::new("/d/test/images/01_test.tif"));
    }

    #[test]
    fn missing_files_are_reported_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let ds = Dataset::new(DatasetLayout::training(dir.path()));
        match ds.load(21) {
            Err(SegmentError::MissingInput { path }) => {
                assert_eq!(path, ds.layout().image_path(21));
            }
            other => panic!("expected missing input, got {other:?}"),
        }
    }

    #[test]
    fn corrupt_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DatasetLayout::training(dir.path());
        let path = layout.image_path(21);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not a tiff").unwrap();
        let err = Dataset::new(layout).load(21).unwrap_err();
        assert!(matches!(err, SegmentError::ImageDecode { .. }));
    }

    #[test]
    fn load_and_store_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DatasetLayout::training(dir.path());
        write_item(&layout, 21);
        let ds = Dataset::new(layout);

        let rasters = ds.load(21).unwrap();
        assert_eq!(rasters.image.dimensions(), (16, 12));
        assert!(rasters.fov.get_pixel(0, 0)[0] > 127);
        assert!(rasters.ground_truth.get_pixel(7, 5)[0] > 127);
        assert!(rasters.ground_truth.get_pixel(0, 5)[0] < 128);

        let mask = BinaryMask::from_fn(16, 12, |x, _| x < 4);
        ds.store(21, &mask).unwrap();
        let written = image::open(ds.layout().output_path(21)).unwrap().to_luma8();
        assert_eq!(BinaryMask::from_gray_threshold(&written, 127), mask);
    }
}
