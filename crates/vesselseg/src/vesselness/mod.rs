//! Multiscale Hessian vesselness (Frangi-style ridge detector, 2D).
//!
//! At each scale σ the scale-normalized Hessian `σ²·H` is computed with
//! Gaussian-derivative kernels, its eigenvalues are ordered so that
//! `|λ1| <= |λ2|`, and
//!
//! ```text
//! Rb = λ1 / λ2
//! S  = sqrt(λ1² + λ2²)
//! V  = exp(-Rb² / 2β²) · (1 - exp(-S² / 2γ²))
//! ```
//!
//! The response is the per-pixel maximum of `V` over all scales.
//!
//! Polarity: the filter detects **bright ridges on a darker background**.
//! Across a bright ridge the intensity has a maximum, so the cross-section
//! curvature `λ2` is negative; pixels with `λ2 >= 0` score zero. Dark vessels
//! must be inverted before filtering (see [`crate::raster::ChannelConfig`]).
//!
//! Reference: Frangi, Niessen, Vincken, Viergever, "Multiscale vessel
//! enhancement filtering", MICCAI 1998.

mod eigen;
mod hessian;

use rayon::prelude::*;

pub use eigen::symmetric_eigenvalues;

use crate::config::check_positive;
use crate::error::ConfigError;
use crate::raster::GrayMap;

/// Vesselness parameters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VesselnessConfig {
    /// Smallest Gaussian scale (pixels).
    pub sigma_min: f64,
    /// Largest Gaussian scale (pixels, inclusive).
    pub sigma_max: f64,
    /// Increment between consecutive scales.
    pub sigma_step: f64,
    /// Blob-suppression sensitivity (`Rb` term).
    pub beta: f64,
    /// Structureness sensitivity (`S` term), in units of scale-normalized
    /// curvature of a [0,1] image.
    pub gamma: f64,
}

impl Default for VesselnessConfig {
    fn default() -> Self {
        Self {
            sigma_min: 1.0,
            sigma_max: 15.0,
            sigma_step: 2.0,
            beta: 5.0,
            gamma: 0.04,
        }
    }
}

impl VesselnessConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("vesselness.sigma_min", self.sigma_min)?;
        check_positive("vesselness.sigma_max", self.sigma_max)?;
        check_positive("vesselness.sigma_step", self.sigma_step)?;
        check_positive("vesselness.beta", self.beta)?;
        check_positive("vesselness.gamma", self.gamma)?;
        if self.sigma_min > self.sigma_max {
            return Err(ConfigError::EmptyScaleRange {
                sigma_min: self.sigma_min,
                sigma_max: self.sigma_max,
            });
        }
        Ok(())
    }

    /// Scales `sigma_min + k·sigma_step` up to and including `sigma_max`.
    pub fn scales(&self) -> Vec<f64> {
        let n = ((self.sigma_max - self.sigma_min) / self.sigma_step + 1e-9).floor() as usize + 1;
        (0..n)
            .map(|k| self.sigma_min + k as f64 * self.sigma_step)
            .collect()
    }
}

/// Vesselness response plus the scale that produced it.
#[derive(Debug, Clone)]
pub struct VesselnessResponse {
    /// Maximum response over scales, in [0,1].
    pub response: GrayMap,
    /// Scale σ of the maximum; 0 where no scale responded.
    pub scale: GrayMap,
}

/// Per-pixel vesselness from ordered Hessian eigenvalues.
#[inline]
pub fn vesselness_from_eigenvalues(l1: f32, l2: f32, two_beta_sq: f32, two_gamma_sq: f32) -> f32 {
    if !(l2 < 0.0) {
        return 0.0;
    }
    let rb = l1 / l2;
    let s_sq = l1 * l1 + l2 * l2;
    let v = (-rb * rb / two_beta_sq).exp() * (1.0 - (-s_sq / two_gamma_sq).exp());
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Multiscale vesselness of a [0,1] map.
pub fn frangi(image: &GrayMap, config: &VesselnessConfig) -> Result<GrayMap, ConfigError> {
    Ok(frangi_with_scales(image, config)?.response)
}

/// Multiscale vesselness with the per-pixel best scale.
pub fn frangi_with_scales(
    image: &GrayMap,
    config: &VesselnessConfig,
) -> Result<VesselnessResponse, ConfigError> {
    config.validate()?;
    let (w, h) = image.dimensions();
    let n = w as usize * h as usize;
    let two_beta_sq = (2.0 * config.beta * config.beta) as f32;
    let two_gamma_sq = (2.0 * config.gamma * config.gamma) as f32;

    let mut best = vec![0.0f32; n];
    let mut best_scale = vec![0.0f32; n];
    if n == 0 {
        return Ok(VesselnessResponse {
            response: GrayMap::new(w, h),
            scale: GrayMap::new(w, h),
        });
    }

    for sigma in config.scales() {
        let t0 = std::time::Instant::now();
        let hs = hessian::hessian(image, sigma);
        best.par_iter_mut()
            .zip(best_scale.par_iter_mut())
            .enumerate()
            .for_each(|(i, (b, s))| {
                let (l1, l2) = symmetric_eigenvalues(hs.xx[i], hs.xy[i], hs.yy[i]);
                let v = vesselness_from_eigenvalues(l1, l2, two_beta_sq, two_gamma_sq);
                if v > *b {
                    *b = v;
                    *s = sigma as f32;
                }
            });
        tracing::trace!(sigma, elapsed_ms = t0.elapsed().as_secs_f64() * 1e3, "vesselness scale done");
    }

    Ok(VesselnessResponse {
        response: GrayMap::from_raw(w, h, best).expect("one sample per pixel"),
        scale: GrayMap::from_raw(w, h, best_scale).expect("one sample per pixel"),
    })
}
