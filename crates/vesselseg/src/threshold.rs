//! Otsu global thresholding of a real-valued response map.

use crate::error::ConfigError;
use crate::raster::{BinaryMask, GrayMap};

/// Histogram resolution for Otsu's method.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Number of equal-width bins spanning `[min, max]` of the map.
    pub bins: usize,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self { bins: 256 }
    }
}

impl ThresholdConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bins < 2 {
            return Err(ConfigError::TooFewBins { bins: self.bins });
        }
        Ok(())
    }
}

/// Result of Otsu's method.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct OtsuResult {
    /// Pixels with `value > threshold` are foreground.
    pub threshold: f32,
    /// All finite values were identical (or there were none). The
    /// threshold then equals that value and nothing is foreground.
    pub degenerate: bool,
}

/// Otsu threshold over the finite values of `map`.
///
/// Splits are evaluated after every bin; the split maximizing the
/// between-class variance wins, ties going to the lowest bin. The threshold
/// is the center of the last background bin.
pub fn otsu_threshold(map: &GrayMap, config: &ThresholdConfig) -> Result<OtsuResult, ConfigError> {
    config.validate()?;
    let bins = config.bins;

    let (mut lo, mut hi) = (f32::INFINITY, f32::NEG_INFINITY);
    for &v in map.as_raw().iter().filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !lo.is_finite() {
        return Ok(OtsuResult {
            threshold: 0.0,
            degenerate: true,
        });
    }
    if hi <= lo {
        return Ok(OtsuResult {
            threshold: lo,
            degenerate: true,
        });
    }

    let width = (hi as f64 - lo as f64) / bins as f64;
    let mut hist = vec![0u64; bins];
    for &v in map.as_raw().iter().filter(|v| v.is_finite()) {
        let b = (((v as f64 - lo as f64) / width) as usize).min(bins - 1);
        hist[b] += 1;
    }

    let total: u64 = hist.iter().sum();
    let sum_total: f64 = hist.iter().enumerate().map(|(i, &c)| i as f64 * c as f64).sum();

    let mut best_bin = 0usize;
    let mut best_var = f64::NEG_INFINITY;
    let mut w_b = 0u64;
    let mut sum_b = 0.0f64;
    for (i, &count) in hist.iter().enumerate().take(bins - 1) {
        w_b += count;
        sum_b += i as f64 * count as f64;
        if w_b == 0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f == 0 {
            break;
        }
        let mu_b = sum_b / w_b as f64;
        let mu_f = (sum_total - sum_b) / w_f as f64;
        let var = w_b as f64 * w_f as f64 * (mu_b - mu_f) * (mu_b - mu_f);
        if var > best_var {
            best_var = var;
            best_bin = i;
        }
    }

    Ok(OtsuResult {
        threshold: (lo as f64 + (best_bin as f64 + 0.5) * width) as f32,
        degenerate: false,
    })
}

/// Foreground mask for an Otsu result. Degenerate results select nothing.
pub fn binarize(map: &GrayMap, otsu: &OtsuResult) -> BinaryMask {
    if otsu.degenerate {
        let (w, h) = map.dimensions();
        return BinaryMask::new(w, h);
    }
    BinaryMask::from_map_threshold(map, otsu.threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn two_level_map_splits_between_levels() {
        // 70 % of pixels at 10, 30 % at 200.
        let map = GrayMap::from_fn(10, 10, |x, _| Luma([if x < 7 { 10.0 } else { 200.0 }]));
        let otsu = otsu_threshold(&map, &ThresholdConfig::default()).unwrap();
        assert!(!otsu.degenerate);
        assert!(otsu.threshold > 10.0 && otsu.threshold < 200.0, "{}", otsu.threshold);

        let mask = binarize(&map, &otsu);
        assert_eq!(mask.count_true(), 30);
        assert!(mask.get(9, 0));
        assert!(!mask.get(0, 0));
    }

    #[test]
    fn bimodal_noise_separates_modes() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(11);
        let map = GrayMap::from_fn(64, 64, |x, _| {
            let base = if x < 40 { 0.2 } else { 0.7 };
            Luma([base + rng.gen_range(-0.05..0.05)])
        });
        let otsu = otsu_threshold(&map, &ThresholdConfig::default()).unwrap();
        assert!(otsu.threshold > 0.2 && otsu.threshold < 0.65, "{}", otsu.threshold);
        let mask = binarize(&map, &otsu);
        let bright = (0..64).flat_map(|y| (40..64).map(move |x| (x, y)));
        assert!(bright.into_iter().all(|(x, y)| mask.get(x, y)));
        // At most the upper half of the last background bin leaks through.
        let leaked = (0..64)
            .flat_map(|y| (0..40).map(move |x| (x, y)))
            .filter(|&(x, y)| mask.get(x, y))
            .count();
        assert!(leaked < 100, "{leaked}");
    }

    #[test]
    fn uniform_map_is_degenerate() {
        let map = GrayMap::from_pixel(8, 8, Luma([0.3]));
        let otsu = otsu_threshold(&map, &ThresholdConfig::default()).unwrap();
        assert!(otsu.degenerate);
        assert_eq!(otsu.threshold, 0.3);
        assert_eq!(binarize(&map, &otsu).count_true(), 0);
    }

    #[test]
    fn non_finite_values_are_ignored() {
        let map = GrayMap::from_fn(4, 4, |x, y| {
            Luma([match (x, y) {
                (0, 0) => f32::NAN,
                (1, 0) => f32::INFINITY,
                _ if x >= 2 => 1.0,
                _ => 0.0,
            }])
        });
        let otsu = otsu_threshold(&map, &ThresholdConfig::default()).unwrap();
        assert!(!otsu.degenerate);
        assert!(otsu.threshold > 0.0 && otsu.threshold < 1.0);

        let all_nan = GrayMap::from_pixel(3, 3, Luma([f32::NAN]));
        let otsu = otsu_threshold(&all_nan, &ThresholdConfig::default()).unwrap();
        assert!(otsu.degenerate);
        assert_eq!(otsu.threshold, 0.0);
    }

    #[test]
    fn too_few_bins_is_rejected() {
        let map = GrayMap::new(2, 2);
        let err = otsu_threshold(&map, &ThresholdConfig { bins: 1 }).unwrap_err();
        assert!(matches!(err, ConfigError::TooFewBins { bins: 1 }));
    }
}
