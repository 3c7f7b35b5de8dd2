//! Synthetic fixtures shared by unit tests.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use crate::pipeline::ItemRasters;
use crate::raster::GrayMap;

/// Flat `bg` image with a full-height vertical stripe `[x0, x0 + width)` at `line`.
pub(crate) fn vertical_line_gray(w: u32, h: u32, x0: u32, width: u32, bg: u8, line: u8) -> GrayImage {
    let mut img = GrayImage::from_pixel(w, h, Luma([bg]));
    draw_filled_rect_mut(&mut img, Rect::at(x0 as i32, 0).of_size(width, h), Luma([line]));
    img
}

/// [`vertical_line_gray`] for real-valued maps.
pub(crate) fn vertical_line_map(w: u32, h: u32, x0: u32, width: u32, bg: f32, line: f32) -> GrayMap {
    let mut img = GrayMap::from_pixel(w, h, Luma([bg]));
    draw_filled_rect_mut(&mut img, Rect::at(x0 as i32, 0).of_size(width, h), Luma([line]));
    img
}

/// Fundus-like item: a dark vertical vessel on a brighter background (green
/// 125 on 155, i.e. 130 on 100 once inverted), full field of view, and a
/// ground truth matching the stripe.
pub(crate) fn fundus_item(w: u32, h: u32, x0: u32, width: u32) -> ItemRasters {
    let mut image = RgbImage::from_pixel(w, h, Rgb([180, 155, 60]));
    draw_filled_rect_mut(&mut image, Rect::at(x0 as i32, 0).of_size(width, h), Rgb([150, 125, 50]));
    ItemRasters {
        image,
        fov: GrayImage::from_pixel(w, h, Luma([255])),
        ground_truth: vertical_line_gray(w, h, x0, width, 0, 255),
    }
}
