//! Per-image orchestration: enhance → vesselness → threshold → cleanup → FOV,
//! then scoring against the ground truth.

use std::time::Instant;

use image::GrayImage;

use super::result::{ItemRasters, ItemReport, Segmentation};
use crate::config::SegmentConfig;
use crate::error::{ensure_same_size, SegmentError};
use crate::metrics::{ConfusionCounts, ItemId};
use crate::raster::{extract_channel, BinaryMask};
use crate::{enhance, fov, morphology, threshold, vesselness};

fn elapsed_ms(t0: Instant) -> f64 {
    t0.elapsed().as_secs_f64() * 1e3
}

/// Segment one 8-bit channel in which vessels are bright.
pub fn segment_channel(
    gray: &GrayImage,
    fov_mask: &BinaryMask,
    config: &SegmentConfig,
) -> Result<Segmentation, SegmentError> {
    ensure_same_size("field-of-view mask", gray.dimensions(), fov_mask.dimensions())?;

    let t0 = Instant::now();
    let enhanced = enhance::clahe(gray, &config.clahe)?;
    tracing::debug!(elapsed_ms = elapsed_ms(t0), "clahe");

    let t0 = Instant::now();
    let response = vesselness::frangi(&enhanced, &config.vesselness)?;
    tracing::debug!(
        elapsed_ms = elapsed_ms(t0),
        scales = config.vesselness.scales().len(),
        "vesselness"
    );

    let otsu = threshold::otsu_threshold(&response, &config.threshold)?;
    if otsu.degenerate {
        tracing::warn!(
            value = otsu.threshold,
            "vesselness response is constant; segmentation is empty"
        );
    }
    let binary = threshold::binarize(&response, &otsu);

    let t0 = Instant::now();
    let cleaned = morphology::clean(&binary, &config.cleanup);
    tracing::debug!(
        elapsed_ms = elapsed_ms(t0),
        before = binary.count_true(),
        after = cleaned.count_true(),
        "cleanup"
    );

    let mask = fov::apply_fov(&cleaned, fov_mask)?;
    Ok(Segmentation {
        vesselness: response,
        threshold: otsu.threshold,
        degenerate: otsu.degenerate,
        mask,
    })
}

/// Segment and score one dataset item.
pub fn process_item(
    id: ItemId,
    rasters: &ItemRasters,
    config: &SegmentConfig,
) -> Result<(Segmentation, ItemReport), SegmentError> {
    let size = rasters.image.dimensions();
    ensure_same_size("field-of-view mask", size, rasters.fov.dimensions())?;
    ensure_same_size("ground truth", size, rasters.ground_truth.dimensions())?;

    let gray = extract_channel(&rasters.image, &config.channel);
    let fov_mask = BinaryMask::from_gray_threshold(&rasters.fov, config.fov_threshold);
    let truth = BinaryMask::from_gray_threshold(&rasters.ground_truth, 0);

    let segmentation = segment_channel(&gray, &fov_mask, config)?;
    let counts = ConfusionCounts::from_masks(&segmentation.mask, &truth)?;
    let scores = counts.scores();
    tracing::info!(
        id,
        dice = scores.dice,
        sensitivity = scores.sensitivity,
        "item {id:02} segmented: {} vessel pixels",
        segmentation.mask.count_true()
    );

    let report = ItemReport {
        id,
        counts,
        scores,
        threshold: segmentation.threshold,
        degenerate: segmentation.degenerate,
    };
    Ok((segmentation, report))
}
