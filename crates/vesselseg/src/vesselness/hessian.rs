//! Scale-normalized Hessian via separable Gaussian-derivative convolution.

use rayon::prelude::*;

use crate::raster::GrayMap;

/// Kernels are truncated at this many standard deviations.
const TRUNCATE_SIGMAS: f64 = 3.0;

/// Sampled 1D Gaussian and its first two derivatives, laid out for
/// correlation (tap `i` multiplies the sample at offset `i - radius`).
pub(crate) struct DerivativeKernels {
    pub radius: usize,
    pub g0: Vec<f32>,
    pub g1: Vec<f32>,
    pub g2: Vec<f32>,
}

impl DerivativeKernels {
    pub(crate) fn new(sigma: f64) -> Self {
        let radius = ((TRUNCATE_SIGMAS * sigma).ceil() as usize).max(1);
        let s2 = sigma * sigma;
        let xs = (-(radius as i64)..=radius as i64).map(|x| x as f64);

        let raw: Vec<f64> = xs.clone().map(|x| (-x * x / (2.0 * s2)).exp()).collect();
        let norm: f64 = raw.iter().sum();
        let g0: Vec<f64> = raw.iter().map(|v| v / norm).collect();

        let g1: Vec<f64> = xs
            .clone()
            .zip(&g0)
            .map(|(x, g)| x / s2 * g)
            .collect();

        // Zero-mean so constant regions have exactly zero curvature.
        let mut g2: Vec<f64> = xs.zip(&g0).map(|(x, g)| (x * x / (s2 * s2) - 1.0 / s2) * g).collect();
        let mean = g2.iter().sum::<f64>() / g2.len() as f64;
        g2.iter_mut().for_each(|v| *v -= mean);

        let to_f32 = |v: Vec<f64>| -> Vec<f32> { v.into_iter().map(|x| x as f32).collect() };
        Self {
            radius,
            g0: to_f32(g0),
            g1: to_f32(g1),
            g2: to_f32(g2),
        }
    }
}

/// Half-sample symmetric reflection (`d c b a | a b c d | d c b a`).
#[inline]
fn reflect(i: i64, n: usize) -> usize {
    let n = n as i64;
    let period = 2 * n;
    let m = i.rem_euclid(period);
    (if m < n { m } else { period - 1 - m }) as usize
}

/// Index tables so the inner loops never branch on borders.
fn reflected_indices(n: usize, radius: usize) -> Vec<usize> {
    (0..n + 2 * radius)
        .map(|i| reflect(i as i64 - radius as i64, n))
        .collect()
}

fn convolve_rows(src: &[f32], w: usize, h: usize, kernel: &[f32], radius: usize) -> Vec<f32> {
    let idx = reflected_indices(w, radius);
    let mut out = vec![0.0f32; w * h];
    out.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        let line = &src[y * w..(y + 1) * w];
        for (x, o) in row.iter_mut().enumerate() {
            let taps = &idx[x..x + kernel.len()];
            *o = kernel
                .iter()
                .zip(taps)
                .map(|(k, &i)| k * line[i])
                .sum();
        }
    });
    out
}

fn convolve_cols(src: &[f32], w: usize, h: usize, kernel: &[f32], radius: usize) -> Vec<f32> {
    let idx = reflected_indices(h, radius);
    let mut out = vec![0.0f32; w * h];
    out.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        let taps = &idx[y..y + kernel.len()];
        for (k, &sy) in kernel.iter().zip(taps) {
            let line = &src[sy * w..(sy + 1) * w];
            for (o, &v) in row.iter_mut().zip(line) {
                *o += k * v;
            }
        }
    });
    out
}

/// Scale-normalized Hessian entries at one scale.
pub(crate) struct Hessian {
    pub xx: Vec<f32>,
    pub xy: Vec<f32>,
    pub yy: Vec<f32>,
}

/// Compute `σ² · (Ixx, Ixy, Iyy)` at scale `sigma`.
pub(crate) fn hessian(image: &GrayMap, sigma: f64) -> Hessian {
    let (w, h) = image.dimensions();
    let (w, h) = (w as usize, h as usize);
    let k = DerivativeKernels::new(sigma);
    let src = image.as_raw();
    let r = k.radius;

    let smooth_x = convolve_rows(src, w, h, &k.g0, r);
    let d1_x = convolve_rows(src, w, h, &k.g1, r);
    let d2_x = convolve_rows(src, w, h, &k.g2, r);

    let mut xx = convolve_cols(&d2_x, w, h, &k.g0, r);
    let mut xy = convolve_cols(&d1_x, w, h, &k.g1, r);
    let mut yy = convolve_cols(&smooth_x, w, h, &k.g2, r);

    let s2 = (sigma * sigma) as f32;
    for buf in [&mut xx, &mut xy, &mut yy] {
        buf.par_iter_mut().for_each(|v| *v *= s2);
    }
    Hessian { xx, xy, yy }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn reflection_is_half_sample_symmetric() {
        let got: Vec<usize> = (-3..7).map(|i| reflect(i, 4)).collect();
        assert_eq!(got, vec![2, 1, 0, 0, 1, 2, 3, 3, 2, 1]);
        // Kernel wider than the signal wraps repeatedly.
        assert_eq!(reflect(9, 2), 1);
        assert_eq!(reflect(0, 1), 0);
        assert_eq!(reflect(-5, 1), 0);
    }

    #[test]
    fn kernel_moments() {
        let k = DerivativeKernels::new(2.0);
        let xs: Vec<f32> = (-(k.radius as i32)..=k.radius as i32).map(|x| x as f32).collect();
        assert_abs_diff_eq!(k.g0.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(k.g1.iter().sum::<f32>(), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(k.g2.iter().sum::<f32>(), 0.0, epsilon = 1e-6);
        // Correlating a unit ramp with G' gives its slope.
        let ramp: f32 = k.g1.iter().zip(&xs).map(|(g, x)| g * x).sum();
        assert_abs_diff_eq!(ramp, 1.0, epsilon = 2e-2);
    }

    #[test]
    fn flat_image_has_zero_hessian() {
        let img = GrayMap::from_pixel(20, 15, image::Luma([0.4]));
        let hs = hessian(&img, 3.0);
        for buf in [&hs.xx, &hs.xy, &hs.yy] {
            assert!(buf.iter().all(|v| v.abs() < 1e-5));
        }
    }

    #[test]
    fn parabola_curvature_is_recovered() {
        // I(x, y) = 0.001 x² has Ixx = 0.002 everywhere away from borders.
        let img = GrayMap::from_fn(64, 8, |x, _| image::Luma([0.001 * (x as f32 - 32.0).powi(2)]));
        let sigma = 1.5;
        let hs = hessian(&img, sigma);
        let i = 4 * 64 + 32;
        assert_abs_diff_eq!(hs.xx[i], 0.002 * (sigma * sigma) as f32, epsilon = 2e-4);
        assert_abs_diff_eq!(hs.yy[i], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(hs.xy[i], 0.0, epsilon = 1e-6);
    }
}
