//! Morphological cleanup of a binary vessel mask: a disk closing bridges
//! small gaps, then 8-connected components below a size cutoff are dropped.

mod closing;
mod components;

pub use closing::{close, dilate, disk_offsets, erode};
pub use components::{label_components, remove_small_components, Components};

use crate::raster::BinaryMask;

/// Cleanup parameters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Disk radius of the closing; 0 disables it.
    pub closing_radius: u32,
    /// Components with fewer pixels are removed; 0 keeps everything.
    pub min_component_size: usize,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            closing_radius: 1,
            min_component_size: 35,
        }
    }
}

/// Closing followed by small-component removal.
pub fn clean(mask: &BinaryMask, config: &CleanupConfig) -> BinaryMask {
    let closed = close(mask, config.closing_radius);
    remove_small_components(&closed, config.min_component_size)
}
