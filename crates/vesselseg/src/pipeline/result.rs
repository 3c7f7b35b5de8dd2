use image::{GrayImage, RgbImage};

use crate::metrics::{ConfusionCounts, ItemId, MeanScores, MetricScores};
use crate::raster::{BinaryMask, GrayMap};

/// Decoded rasters of one dataset item.
#[derive(Debug, Clone)]
pub struct ItemRasters {
    /// Fundus photograph.
    pub image: RgbImage,
    /// Field-of-view raster; binarized with `fov_threshold`.
    pub fov: GrayImage,
    /// Manual annotation; any non-zero value is a vessel.
    pub ground_truth: GrayImage,
}

/// Per-image pipeline product.
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Multiscale vesselness response in [0,1].
    pub vesselness: GrayMap,
    /// Otsu threshold applied to the response.
    pub threshold: f32,
    /// The response was constant, so nothing was segmented.
    pub degenerate: bool,
    /// Cleaned segmentation restricted to the field of view.
    pub mask: BinaryMask,
}

/// Scores of one successfully processed item.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ItemReport {
    pub id: ItemId,
    pub counts: ConfusionCounts,
    pub scores: MetricScores,
    pub threshold: f32,
    pub degenerate: bool,
}

/// Why an item was skipped.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ItemFailure {
    pub id: ItemId,
    pub message: String,
}

/// Result of processing one item.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Processed(ItemReport),
    Failed(ItemFailure),
}

impl ItemOutcome {
    pub fn id(&self) -> ItemId {
        match self {
            Self::Processed(r) => r.id,
            Self::Failed(f) => f.id,
        }
    }

    pub fn report(&self) -> Option<&ItemReport> {
        match self {
            Self::Processed(r) => Some(r),
            Self::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ItemFailure> {
        match self {
            Self::Processed(_) => None,
            Self::Failed(f) => Some(f),
        }
    }
}

/// Batch-level aggregate.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchSummary {
    /// No item was processed successfully.
    NoData { attempted: usize },
    /// Means over the processed items.
    Aggregate {
        processed: usize,
        failed: usize,
        mean: MeanScores,
    },
}

/// Everything a batch run produced, outcomes in item order.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<ItemOutcome>,
    pub summary: BatchSummary,
}

impl BatchReport {
    pub fn reports(&self) -> impl Iterator<Item = &ItemReport> {
        self.outcomes.iter().filter_map(ItemOutcome::report)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemFailure> {
        self.outcomes.iter().filter_map(ItemOutcome::failure)
    }
}
