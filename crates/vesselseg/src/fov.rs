//! Field-of-view restriction.

use crate::error::{ensure_same_size, SegmentError};
use crate::raster::BinaryMask;

/// Keep only segmented pixels that lie inside the field of view.
pub fn apply_fov(segmentation: &BinaryMask, fov: &BinaryMask) -> Result<BinaryMask, SegmentError> {
    ensure_same_size("field-of-view mask", segmentation.dimensions(), fov.dimensions())?;
    Ok(segmentation.and(fov))
}
