//! Batch driver: load, segment, store and score independent items.

use rayon::prelude::*;

use super::result::{BatchReport, BatchSummary, ItemFailure, ItemOutcome, ItemRasters};
use super::run::process_item;
use crate::config::SegmentConfig;
use crate::error::SegmentError;
use crate::metrics::{ItemId, MetricsAccumulator};
use crate::raster::BinaryMask;

/// Supplies decoded rasters for an item.
pub trait ItemSource: Sync {
    fn load(&self, id: ItemId) -> Result<ItemRasters, SegmentError>;
}

/// Receives the final segmentation of an item.
pub trait SegmentationSink: Sync {
    fn store(&self, id: ItemId, mask: &BinaryMask) -> Result<(), SegmentError>;
}

/// Batch execution options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Process items on the rayon pool instead of one after another.
    pub parallel: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { parallel: true }
    }
}

fn run_item(
    id: ItemId,
    source: &dyn ItemSource,
    sink: Option<&dyn SegmentationSink>,
    config: &SegmentConfig,
) -> ItemOutcome {
    let result = source.load(id).and_then(|rasters| {
        let (segmentation, report) = process_item(id, &rasters, config)?;
        if let Some(sink) = sink {
            sink.store(id, &segmentation.mask)?;
        }
        Ok(report)
    });
    match result {
        Ok(report) => ItemOutcome::Processed(report),
        Err(e) => {
            tracing::warn!(id, "skipping item {id:02}: {e}");
            ItemOutcome::Failed(ItemFailure {
                id,
                message: e.to_string(),
            })
        }
    }
}

/// Process `ids` and aggregate the scores of the items that succeeded.
///
/// A failing item is recorded in the report and never affects the others.
/// The configuration is validated once up front.
pub fn run_batch(
    source: &dyn ItemSource,
    sink: Option<&dyn SegmentationSink>,
    ids: &[ItemId],
    config: &SegmentConfig,
    options: BatchOptions,
) -> Result<BatchReport, SegmentError> {
    config.validate()?;
    tracing::info!(parallel = options.parallel, "processing {} items", ids.len());

    let outcomes: Vec<ItemOutcome> = if options.parallel {
        ids.par_iter()
            .map(|&id| run_item(id, source, sink, config))
            .collect()
    } else {
        ids.iter()
            .map(|&id| run_item(id, source, sink, config))
            .collect()
    };

    let accumulator: MetricsAccumulator = outcomes
        .iter()
        .filter_map(ItemOutcome::report)
        .map(|r| (r.id, r.scores))
        .collect();
    let failed = outcomes.len() - accumulator.len();

    let summary = match accumulator.finalize() {
        None => {
            tracing::warn!("no items processed ({} attempted)", ids.len());
            BatchSummary::NoData {
                attempted: ids.len(),
            }
        }
        Some(mean) => {
            tracing::info!(
                processed = accumulator.len(),
                failed,
                dice = mean.dice,
                "batch done"
            );
            BatchSummary::Aggregate {
                processed: accumulator.len(),
                failed,
                mean,
            }
        }
    };

    Ok(BatchReport { outcomes, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fundus_item;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// In-memory source; ids without rasters behave like missing files.
    struct MemorySource(BTreeMap<ItemId, ItemRasters>);

    impl ItemSource for MemorySource {
        fn load(&self, id: ItemId) -> Result<ItemRasters, SegmentError> {
            self.0
                .get(&id)
                .cloned()
                .ok_or_else(|| SegmentError::MissingInput {
                    path: PathBuf::from(format!("{id:02}_training.tif")),
                })
        }
    }

    #[derive(Default)]
    struct MemorySink(Mutex<Vec<(ItemId, usize)>>);

    impl SegmentationSink for MemorySink {
        fn store(&self, id: ItemId, mask: &BinaryMask) -> Result<(), SegmentError> {
            self.0.lock().unwrap().push((id, mask.count_true()));
            Ok(())
        }
    }

    fn source(ids: &[ItemId]) -> MemorySource {
        MemorySource(ids.iter().map(|&id| (id, fundus_item(64, 64, 30, 5))).collect())
    }

    #[test]
    fn failing_item_does_not_stop_the_batch() {
        let src = source(&[21, 23]);
        let sink = MemorySink::default();
        let report = run_batch(
            &src,
            Some(&sink),
            &[21, 22, 23],
            &SegmentConfig::default(),
            BatchOptions::default(),
        )
        .unwrap();

        let ids: Vec<ItemId> = report.outcomes.iter().map(ItemOutcome::id).collect();
        assert_eq!(ids, vec![21, 22, 23]);
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].id, 22);
        assert!(failures[0].message.contains("22_training.tif"));

        match report.summary {
            BatchSummary::Aggregate {
                processed,
                failed,
                mean,
            } => {
                assert_eq!((processed, failed), (2, 1));
                assert_eq!(mean.count, 2);
                assert!(mean.dice > 0.5);
            }
            other => panic!("expected aggregate, got {other:?}"),
        }

        let mut stored = sink.0.into_inner().unwrap();
        stored.sort();
        assert_eq!(stored.iter().map(|s| s.0).collect::<Vec<_>>(), vec![21, 23]);
    }

    #[test]
    fn only_failures_report_no_data() {
        let src = source(&[]);
        let report = run_batch(
            &src,
            None,
            &[1, 2],
            &SegmentConfig::default(),
            BatchOptions { parallel: false },
        )
        .unwrap();
        assert_eq!(report.summary, BatchSummary::NoData { attempted: 2 });
        assert_eq!(report.failures().count(), 2);
    }

    #[test]
    fn sequential_and_parallel_agree() {
        let src = source(&[3, 1, 2]);
        let cfg = SegmentConfig::default();
        let ids = [1, 2, 3];
        let par = run_batch(&src, None, &ids, &cfg, BatchOptions { parallel: true }).unwrap();
        let seq = run_batch(&src, None, &ids, &cfg, BatchOptions { parallel: false }).unwrap();
        assert_eq!(par, seq);
    }

    #[test]
    fn invalid_config_fails_before_any_item() {
        let mut cfg = SegmentConfig::default();
        cfg.threshold.bins = 0;
        let err = run_batch(&source(&[1]), None, &[1], &cfg, BatchOptions::default()).unwrap_err();
        assert!(matches!(err, SegmentError::Config(_)));
    }
}
