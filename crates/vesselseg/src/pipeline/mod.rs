//! Segmentation pipeline glue.
//!
//! The algorithmic stages live in `enhance`, `vesselness`, `threshold`,
//! `morphology`, `fov` and `metrics`; this module fixes their order and the
//! data handed between them.
//!
//! Entry points:
//! - `segment_channel`: one 8-bit channel (vessels bright) plus a FOV mask
//! - `process_item`: one RGB item, scored against its ground truth
//! - `run_batch`: many items from an [`ItemSource`], optionally stored into a
//!   [`SegmentationSink`], with per-item outcomes and a batch summary

mod batch;
mod result;
mod run;

pub use batch::{run_batch, BatchOptions, ItemSource, SegmentationSink};
pub use result::{
    BatchReport, BatchSummary, ItemFailure, ItemOutcome, ItemRasters, ItemReport, Segmentation,
};
pub use run::{process_item, segment_channel};
