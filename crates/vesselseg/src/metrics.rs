//! Pixel-wise scoring of a segmentation against ground truth.

use serde::Serialize;

use crate::error::{ensure_same_size, SegmentError};
use crate::raster::BinaryMask;

/// Dataset index of a batch item.
pub type ItemId = u32;

/// Confusion-matrix counts over all pixels of one image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionCounts {
    pub tp: u64,
    pub fp: u64,
    #[serde(rename = "fn")]
    pub fn_: u64,
    pub tn: u64,
}

impl ConfusionCounts {
    /// Compare a segmentation with the ground truth pixel by pixel.
    pub fn from_masks(segmentation: &BinaryMask, truth: &BinaryMask) -> Result<Self, SegmentError> {
        ensure_same_size("ground truth", segmentation.dimensions(), truth.dimensions())?;
        let mut c = Self::default();
        for (&s, &t) in segmentation.as_raw().iter().zip(truth.as_raw()) {
            match (s, t) {
                (true, true) => c.tp += 1,
                (true, false) => c.fp += 1,
                (false, true) => c.fn_ += 1,
                (false, false) => c.tn += 1,
            }
        }
        Ok(c)
    }

    pub fn total(&self) -> u64 {
        self.tp + self.fp + self.fn_ + self.tn
    }

    pub fn scores(&self) -> MetricScores {
        MetricScores {
            accuracy: ratio(self.tp + self.tn, self.total()),
            sensitivity: ratio(self.tp, self.tp + self.fn_),
            specificity: ratio(self.tn, self.tn + self.fp),
            dice: ratio(2 * self.tp, 2 * self.tp + self.fp + self.fn_),
        }
    }
}

/// `num / den`, or 0 when the denominator is 0.
fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Per-image scores, each in [0,1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricScores {
    pub accuracy: f64,
    pub sensitivity: f64,
    pub specificity: f64,
    pub dice: f64,
}

/// Per-metric means over a batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeanScores {
    pub accuracy: f64,
    pub sensitivity: f64,
    pub specificity: f64,
    pub dice: f64,
    /// Number of records averaged.
    pub count: usize,
}

/// Ordered collection of per-item scores.
#[derive(Debug, Clone, Default)]
pub struct MetricsAccumulator {
    records: Vec<(ItemId, MetricScores)>,
}

impl MetricsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, keeping records sorted by item id.
    pub fn push(&mut self, id: ItemId, scores: MetricScores) {
        let at = self.records.partition_point(|(other, _)| *other <= id);
        self.records.insert(at, (id, scores));
    }

    /// Absorb the records of another accumulator.
    pub fn merge(&mut self, other: MetricsAccumulator) {
        for (id, scores) in other.records {
            self.push(id, scores);
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[(ItemId, MetricScores)] {
        &self.records
    }

    /// Per-metric arithmetic means, or `None` if nothing was recorded.
    ///
    /// Non-finite entries are left out of their metric's mean; a metric with
    /// no finite entry reports NaN.
    pub fn finalize(&self) -> Option<MeanScores> {
        if self.records.is_empty() {
            return None;
        }
        let mean_of = |f: fn(&MetricScores) -> f64| {
            let (sum, n) = self
                .records
                .iter()
                .map(|(_, s)| f(s))
                .filter(|v| v.is_finite())
                .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
            if n == 0 {
                f64::NAN
            } else {
                sum / n as f64
            }
        };
        Some(MeanScores {
            accuracy: mean_of(|s| s.accuracy),
            sensitivity: mean_of(|s| s.sensitivity),
            specificity: mean_of(|s| s.specificity),
            dice: mean_of(|s| s.dice),
            count: self.records.len(),
        })
    }
}

impl FromIterator<(ItemId, MetricScores)> for MetricsAccumulator {
    fn from_iter<I: IntoIterator<Item = (ItemId, MetricScores)>>(iter: I) -> Self {
        let mut acc = Self::new();
        for (id, scores) in iter {
            acc.push(id, scores);
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn scores(v: f64) -> MetricScores {
        MetricScores {
            accuracy: v,
            sensitivity: v,
            specificity: v,
            dice: v,
        }
    }

    #[test]
    fn counts_partition_the_image() {
        let mut rng = StdRng::seed_from_u64(5);
        let seg = BinaryMask::from_fn(13, 9, |_, _| rng.gen_bool(0.4));
        let gt = BinaryMask::from_fn(13, 9, |_, _| rng.gen_bool(0.2));
        let c = ConfusionCounts::from_masks(&seg, &gt).unwrap();
        assert_eq!(c.total(), 13 * 9);
        assert_eq!(c.tp + c.fp, seg.count_true() as u64);
        assert_eq!(c.tp + c.fn_, gt.count_true() as u64);
        let s = c.scores();
        for v in [s.accuracy, s.sensitivity, s.specificity, s.dice] {
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn known_counts() {
        let c = ConfusionCounts {
            tp: 30,
            fp: 10,
            fn_: 20,
            tn: 940,
        };
        let s = c.scores();
        assert_abs_diff_eq!(s.accuracy, 0.97, epsilon = 1e-12);
        assert_abs_diff_eq!(s.sensitivity, 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(s.specificity, 940.0 / 950.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.dice, 60.0 / 90.0, epsilon = 1e-12);
    }

    #[test]
    fn empty_truth_and_empty_segmentation_score_zero_where_undefined() {
        let empty = BinaryMask::new(4, 4);
        let s = ConfusionCounts::from_masks(&empty, &empty).unwrap().scores();
        assert_eq!(s.accuracy, 1.0);
        assert_eq!(s.specificity, 1.0);
        assert_eq!(s.sensitivity, 0.0);
        assert_eq!(s.dice, 0.0);
        assert_eq!(ConfusionCounts::default().scores().accuracy, 0.0);
    }

    #[test]
    fn mismatched_masks_are_rejected() {
        let err = ConfusionCounts::from_masks(&BinaryMask::new(3, 3), &BinaryMask::new(3, 4));
        assert!(matches!(err, Err(SegmentError::DimensionMismatch { .. })));
    }

    #[test]
    fn empty_accumulator_has_no_mean() {
        assert!(MetricsAccumulator::new().finalize().is_none());
    }

    #[test]
    fn mean_is_independent_of_push_order() {
        let records: Vec<(ItemId, MetricScores)> =
            (21..41).map(|id| (id, scores(1.0 / id as f64))).collect();
        let reference = records.iter().copied().collect::<MetricsAccumulator>();
        let expected = reference.finalize().unwrap();

        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..5 {
            let mut shuffled = records.clone();
            shuffled.shuffle(&mut rng);
            let (left, right) = shuffled.split_at(7);
            let mut a: MetricsAccumulator = left.iter().copied().collect();
            let b: MetricsAccumulator = right.iter().copied().collect();
            a.merge(b);
            assert_eq!(a.finalize().unwrap(), expected);
            let ids: Vec<ItemId> = a.records().iter().map(|(id, _)| *id).collect();
            assert_eq!(ids, (21..41).collect::<Vec<_>>());
        }
    }

    #[test]
    fn non_finite_entries_are_excluded() {
        let mut acc = MetricsAccumulator::new();
        acc.push(1, scores(0.5));
        acc.push(2, scores(f64::NAN));
        acc.push(3, scores(1.0));
        let mean = acc.finalize().unwrap();
        assert_abs_diff_eq!(mean.dice, 0.75, epsilon = 1e-12);
        assert_eq!(mean.count, 3);

        let mut all_nan = MetricsAccumulator::new();
        all_nan.push(1, scores(f64::NAN));
        assert!(all_nan.finalize().unwrap().accuracy.is_nan());
    }
}
