//! Contrast-limited adaptive histogram equalization (CLAHE).
//!
//! The image is split into a grid of tiles. Each tile gets its own
//! equalization curve from a clipped histogram, and every output pixel blends
//! the curves of the (up to four) tiles whose centers surround it, so tile
//! borders leave no seams.

use image::GrayImage;
use rayon::prelude::*;

use crate::config::check_positive;
use crate::error::ConfigError;
use crate::raster::GrayMap;

const N_BINS: usize = 256;

/// CLAHE parameters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ClaheConfig {
    /// Histogram bins are clipped at `clip_limit` times the mean bin count.
    pub clip_limit: f32,
    /// Number of tile rows.
    pub tile_rows: u32,
    /// Number of tile columns.
    pub tile_cols: u32,
}

impl Default for ClaheConfig {
    fn default() -> Self {
        Self {
            clip_limit: 5.5,
            tile_rows: 32,
            tile_cols: 32,
        }
    }
}

impl ClaheConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("clahe.clip_limit", self.clip_limit as f64)?;
        check_positive("clahe.tile_rows", self.tile_rows as f64)?;
        check_positive("clahe.tile_cols", self.tile_cols as f64)?;
        Ok(())
    }
}

/// Tile layout along one axis: tile edges and tile centers.
struct Axis {
    edges: Vec<u32>,
    centers: Vec<f32>,
}

impl Axis {
    fn new(len: u32, tiles: u32) -> Self {
        let tiles = tiles.clamp(1, len.max(1));
        let edges: Vec<u32> = (0..=tiles)
            .map(|i| (i as u64 * len as u64 / tiles as u64) as u32)
            .collect();
        let centers = edges
            .windows(2)
            .map(|w| (w[0] + w[1] - 1) as f32 * 0.5)
            .collect();
        Self { edges, centers }
    }

    fn n_tiles(&self) -> usize {
        self.centers.len()
    }

    /// Neighbouring tile indices and blend weight of the second one.
    #[inline]
    fn locate(&self, p: f32) -> (usize, usize, f32) {
        let c = &self.centers;
        let last = c.len() - 1;
        if p <= c[0] {
            return (0, 0, 0.0);
        }
        if p >= c[last] {
            return (last, last, 0.0);
        }
        // First center strictly greater than p; p lies between i-1 and i.
        let i = c.partition_point(|&ci| ci <= p);
        let t = (p - c[i - 1]) / (c[i] - c[i - 1]);
        (i - 1, i, t)
    }
}

/// Clipped, redistributed, cumulative histogram of one tile normalized to [0,1].
fn tile_lut(gray: &GrayImage, x0: u32, x1: u32, y0: u32, y1: u32, clip_limit: f32) -> [f32; N_BINS] {
    let mut hist = [0.0f64; N_BINS];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[gray.get_pixel(x, y)[0] as usize] += 1.0;
        }
    }
    let n_px = ((x1 - x0) as f64) * ((y1 - y0) as f64);
    let limit = clip_limit as f64 * n_px / N_BINS as f64;

    let mut excess = 0.0;
    for h in hist.iter_mut() {
        if *h > limit {
            excess += *h - limit;
            *h = limit;
        }
    }
    let redistributed = excess / N_BINS as f64;

    let mut lut = [0.0f32; N_BINS];
    let mut cdf = 0.0;
    for (out, h) in lut.iter_mut().zip(hist.iter()) {
        cdf += h + redistributed;
        *out = (cdf / n_px).min(1.0) as f32;
    }
    lut
}

/// Apply CLAHE to an 8-bit channel. Output values lie in [0,1].
pub fn clahe(gray: &GrayImage, config: &ClaheConfig) -> Result<GrayMap, ConfigError> {
    config.validate()?;
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return Ok(GrayMap::new(w, h));
    }

    let xs = Axis::new(w, config.tile_cols);
    let ys = Axis::new(h, config.tile_rows);
    let n_cols = xs.n_tiles();

    let luts: Vec<[f32; N_BINS]> = (0..ys.n_tiles() * n_cols)
        .into_par_iter()
        .map(|t| {
            let (ty, tx) = (t / n_cols, t % n_cols);
            tile_lut(
                gray,
                xs.edges[tx],
                xs.edges[tx + 1],
                ys.edges[ty],
                ys.edges[ty + 1],
                config.clip_limit,
            )
        })
        .collect();

    let src = gray.as_raw();
    let stride = w as usize;
    let mut out = vec![0.0f32; stride * h as usize];
    out.par_chunks_mut(stride).enumerate().for_each(|(y, row)| {
        let (ty0, ty1, fy) = ys.locate(y as f32);
        for (x, o) in row.iter_mut().enumerate() {
            let (tx0, tx1, fx) = xs.locate(x as f32);
            let v = src[y * stride + x] as usize;
            let top = (1.0 - fx) * luts[ty0 * n_cols + tx0][v] + fx * luts[ty0 * n_cols + tx1][v];
            let bottom =
                (1.0 - fx) * luts[ty1 * n_cols + tx0][v] + fx * luts[ty1 * n_cols + tx1][v];
            *o = (1.0 - fy) * top + fy * bottom;
        }
    });

    Ok(GrayMap::from_raw(w, h, out).expect("one sample per pixel"))
}
