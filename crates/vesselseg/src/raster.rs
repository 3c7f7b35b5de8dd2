//! Raster types shared by all pipeline stages.
//!
//! Continuous maps use `image`'s `ImageBuffer<Luma<f32>>` so they can be
//! inspected and exported with the usual tooling; decisions use
//! [`BinaryMask`], a plain row-major `bool` grid.

use image::{GrayImage, ImageBuffer, Luma, RgbImage};

/// Single-channel real-valued map (enhanced intensity, vesselness response).
pub type GrayMap = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Row-major boolean grid: `true` means "vessel present" (or "inside the
/// field of view" for FOV masks).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl BinaryMask {
    /// All-false mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; width as usize * height as usize],
        }
    }

    /// All-true mask (e.g. a field of view covering the whole image).
    pub fn filled(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![true; width as usize * height as usize],
        }
    }

    /// Build a mask by evaluating `f(x, y)` at every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap an existing row-major buffer. Returns `None` on length mismatch.
    pub fn from_raw(width: u32, height: u32, data: Vec<bool>) -> Option<Self> {
        if data.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// `value > threshold` for every pixel of an 8-bit raster.
    pub fn from_gray_threshold(gray: &GrayImage, threshold: u8) -> Self {
        let (width, height) = gray.dimensions();
        Self {
            width,
            height,
            data: gray.as_raw().iter().map(|&v| v > threshold).collect(),
        }
    }

    /// `value > threshold` for every pixel of a real-valued map.
    pub fn from_map_threshold(map: &GrayMap, threshold: f32) -> Self {
        let (width, height) = map.dimensions();
        Self {
            width,
            height,
            data: map.as_raw().iter().map(|&v| v > threshold).collect(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[y as usize * self.width as usize + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        let idx = y as usize * self.width as usize + x as usize;
        self.data[idx] = value;
    }

    pub fn as_raw(&self) -> &[bool] {
        &self.data
    }

    pub(crate) fn as_raw_mut(&mut self) -> &mut [bool] {
        &mut self.data
    }

    /// Number of `true` pixels.
    pub fn count_true(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Pixel-wise AND. Callers check dimensions first.
    pub(crate) fn and(&self, other: &BinaryMask) -> BinaryMask {
        debug_assert_eq!(self.dimensions(), other.dimensions());
        BinaryMask {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| a && b)
                .collect(),
        }
    }

    /// Export as 0/255 8-bit raster.
    pub fn to_gray_image(&self) -> GrayImage {
        let raw = self.data.iter().map(|&v| if v { 255 } else { 0 }).collect();
        GrayImage::from_raw(self.width, self.height, raw).expect("buffer length matches mask")
    }
}

/// Source channel of an RGB fundus photograph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Red,
    /// Highest vessel/background contrast in fundus photographs.
    #[default]
    Green,
    Blue,
}

impl Channel {
    fn index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
        }
    }
}

/// Channel selection applied before contrast enhancement.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Channel to extract.
    pub channel: Channel,
    /// Invert intensities (`255 - v`).
    ///
    /// Vessels are darker than the background in fundus photographs while the
    /// vesselness filter detects bright ridges, so inversion is on by default.
    pub invert: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            channel: Channel::Green,
            invert: true,
        }
    }
}

/// Extract one channel of an RGB image as an 8-bit grayscale raster.
pub fn extract_channel(image: &RgbImage, config: &ChannelConfig) -> GrayImage {
    let c = config.channel.index();
    let (w, h) = image.dimensions();
    let raw = image
        .as_raw()
        .chunks_exact(3)
        .map(|px| if config.invert { 255 - px[c] } else { px[c] })
        .collect();
    GrayImage::from_raw(w, h, raw).expect("one sample per pixel")
}

/// Convert an 8-bit raster to a [0,1] map.
pub fn gray_to_map(gray: &GrayImage) -> GrayMap {
    let (w, h) = gray.dimensions();
    let raw = gray.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
    GrayMap::from_raw(w, h, raw).expect("one sample per pixel")
}

/// Quantize a [0,1] map to 8 bits (values outside the range are clamped).
pub fn map_to_gray(map: &GrayMap) -> GrayImage {
    let (w, h) = map.dimensions();
    let raw = map
        .as_raw()
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();
    GrayImage::from_raw(w, h, raw).expect("one sample per pixel")
}
