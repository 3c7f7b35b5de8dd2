//! High-level segmentation API.
//!
//! [`Segmenter`] is the primary entry point. It owns a validated
//! [`SegmentConfig`]: create once, segment many images.

use image::RgbImage;

use crate::config::SegmentConfig;
use crate::error::{ConfigError, SegmentError};
use crate::metrics::{ConfusionCounts, ItemId};
use crate::pipeline::{
    self, BatchOptions, BatchReport, ItemRasters, ItemReport, ItemSource, Segmentation,
    SegmentationSink,
};
use crate::raster::{extract_channel, BinaryMask};

/// Primary segmentation interface.
///
/// # Examples
///
/// ```no_run
/// use vesselseg::{BinaryMask, SegmentConfig, Segmenter};
/// use image::RgbImage;
///
/// let segmenter = Segmenter::new(SegmentConfig::default()).unwrap();
/// let image = RgbImage::new(565, 584);
/// let fov = BinaryMask::filled(565, 584);
/// let seg = segmenter.segment(&image, &fov).unwrap();
/// println!("{} vessel pixels", seg.mask.count_true());
/// ```
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: SegmentConfig,
}

impl Segmenter {
    /// Validate `config` and wrap it.
    pub fn new(config: SegmentConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SegmentConfig {
        &self.config
    }

    /// Mutable access for post-construction tuning. Changes are validated
    /// again by every entry point.
    pub fn config_mut(&mut self) -> &mut SegmentConfig {
        &mut self.config
    }

    /// Segment an RGB fundus image inside `fov`.
    pub fn segment(&self, image: &RgbImage, fov: &BinaryMask) -> Result<Segmentation, SegmentError> {
        self.config.validate()?;
        let gray = extract_channel(image, &self.config.channel);
        pipeline::segment_channel(&gray, fov, &self.config)
    }

    /// Segment and score against a ground-truth mask.
    pub fn evaluate(
        &self,
        image: &RgbImage,
        fov: &BinaryMask,
        truth: &BinaryMask,
    ) -> Result<(Segmentation, ConfusionCounts), SegmentError> {
        let seg = self.segment(image, fov)?;
        let counts = ConfusionCounts::from_masks(&seg.mask, truth)?;
        Ok((seg, counts))
    }

    /// Segment and score one dataset item.
    pub fn process_item(
        &self,
        id: ItemId,
        rasters: &ItemRasters,
    ) -> Result<(Segmentation, ItemReport), SegmentError> {
        self.config.validate()?;
        pipeline::process_item(id, rasters, &self.config)
    }

    /// Run the batch driver over `ids`.
    pub fn run_batch(
        &self,
        source: &dyn ItemSource,
        sink: Option<&dyn SegmentationSink>,
        ids: &[ItemId],
        options: BatchOptions,
    ) -> Result<BatchReport, SegmentError> {
        pipeline::run_batch(source, sink, ids, &self.config, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fundus_item;

    #[test]
    fn new_rejects_invalid_config() {
        let mut cfg = SegmentConfig::default();
        cfg.vesselness.beta = -1.0;
        assert!(matches!(
            Segmenter::new(cfg),
            Err(ConfigError::NonPositive {
                field: "vesselness.beta",
                ..
            })
        ));
    }

    #[test]
    fn config_mut_changes_are_revalidated() {
        let mut seg = Segmenter::new(SegmentConfig::default()).unwrap();
        seg.config_mut().clahe.tile_rows = 0;
        assert_eq!(seg.config().clahe.tile_rows, 0);
        let err = seg
            .segment(&RgbImage::new(8, 8), &BinaryMask::filled(8, 8))
            .unwrap_err();
        assert!(matches!(err, SegmentError::Config(_)));
    }

    #[test]
    fn evaluate_matches_item_processing() {
        let item = fundus_item(64, 64, 30, 5);
        let segmenter = Segmenter::new(SegmentConfig::default()).unwrap();
        let fov = BinaryMask::from_gray_threshold(&item.fov, 127);
        let truth = BinaryMask::from_gray_threshold(&item.ground_truth, 0);
        let (seg, counts) = segmenter.evaluate(&item.image, &fov, &truth).unwrap();
        let (_, report) = segmenter.process_item(7, &item).unwrap();
        assert_eq!(counts, report.counts);
        assert_eq!(seg.threshold, report.threshold);
        assert!(counts.scores().dice > 0.8);
    }

    #[test]
    fn fov_size_mismatch_is_reported() {
        let segmenter = Segmenter::new(SegmentConfig::default()).unwrap();
        let err = segmenter
            .segment(&RgbImage::new(10, 10), &BinaryMask::filled(10, 9))
            .unwrap_err();
        assert!(matches!(err, SegmentError::DimensionMismatch { .. }));
    }
}
