//! vesselseg: retinal blood-vessel segmentation and scoring.
//!
//! The pipeline stages are:
//!
//! 1. **Channel** – select (and by default invert) the green channel so
//!    vessels become bright ridges.
//! 2. **Enhance** – contrast-limited adaptive histogram equalization.
//! 3. **Vesselness** – multiscale Hessian (Frangi) ridge response.
//! 4. **Threshold** – Otsu global threshold of the response.
//! 5. **Morphology** – disk closing and 8-connected small-component removal.
//! 6. **FOV** – restrict the mask to the camera field of view.
//! 7. **Metrics** – confusion counts, per-image scores, batch means.
//!
//! # Public API
//! - [`Segmenter`] as the primary entry point
//! - [`SegmentConfig`] and the per-stage configs for tuning
//! - [`run_batch`] with the [`ItemSource`] / [`SegmentationSink`] traits, and
//!   [`Dataset`] implementing both for the DRIVE directory layout
//!
//! The stage modules are public for callers that want a single step.

mod api;
pub mod config;
pub mod dataset;
pub mod enhance;
pub mod error;
pub mod fov;
pub mod metrics;
pub mod morphology;
mod pipeline;
pub mod raster;
pub mod threshold;
pub mod vesselness;

#[cfg(test)]
pub(crate) mod test_utils;

pub use api::Segmenter;
pub use config::SegmentConfig;
pub use dataset::{Dataset, DatasetLayout};
pub use enhance::ClaheConfig;
pub use error::{ConfigError, SegmentError};
pub use metrics::{ConfusionCounts, ItemId, MeanScores, MetricScores, MetricsAccumulator};
pub use morphology::CleanupConfig;
pub use pipeline::{
    process_item, run_batch, segment_channel, BatchOptions, BatchReport, BatchSummary,
    ItemFailure, ItemOutcome, ItemRasters, ItemReport, ItemSource, Segmentation,
    SegmentationSink,
};
pub use raster::{BinaryMask, Channel, ChannelConfig, GrayMap};
pub use threshold::{OtsuResult, ThresholdConfig};
pub use vesselness::VesselnessConfig;
