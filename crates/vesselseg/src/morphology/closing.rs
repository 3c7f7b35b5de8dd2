//! Binary dilation, erosion and closing with a disk structuring element.
//!
//! Neighbours outside the image are ignored by both operations, which makes
//! the closing extensive: every foreground pixel of the input survives.

use rayon::prelude::*;

use crate::raster::BinaryMask;

/// Offsets `(dx, dy)` with `dx² + dy² <= r²`.
pub fn disk_offsets(radius: u32) -> Vec<(i32, i32)> {
    let r = radius as i32;
    let r2 = r * r;
    let mut out = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r2 {
                out.push((dx, dy));
            }
        }
    }
    out
}

#[derive(Clone, Copy)]
enum Reduce {
    Any,
    All,
}

/// Reduce the in-bounds disk neighbourhood of every pixel.
fn neighbourhood_op(mask: &BinaryMask, offsets: &[(i32, i32)], reduce: Reduce) -> BinaryMask {
    let (w, h) = mask.dimensions();
    let mut out = BinaryMask::new(w, h);
    if out.is_empty() {
        return out;
    }
    let src = mask.as_raw();
    let (wi, hi) = (w as i32, h as i32);
    out.as_raw_mut()
        .par_chunks_mut(w as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as i32;
            for (x, o) in row.iter_mut().enumerate() {
                let x = x as i32;
                let mut values = offsets.iter().filter_map(|&(dx, dy)| {
                    let (nx, ny) = (x + dx, y + dy);
                    (nx >= 0 && ny >= 0 && nx < wi && ny < hi)
                        .then(|| src[(ny * wi + nx) as usize])
                });
                *o = match reduce {
                    Reduce::Any => values.any(|v| v),
                    Reduce::All => values.all(|v| v),
                };
            }
        });
    out
}

pub fn dilate(mask: &BinaryMask, radius: u32) -> BinaryMask {
    neighbourhood_op(mask, &disk_offsets(radius), Reduce::Any)
}

pub fn erode(mask: &BinaryMask, radius: u32) -> BinaryMask {
    neighbourhood_op(mask, &disk_offsets(radius), Reduce::All)
}

/// Dilation followed by erosion. Radius 0 returns a copy.
pub fn close(mask: &BinaryMask, radius: u32) -> BinaryMask {
    if radius == 0 {
        return mask.clone();
    }
    erode(&dilate(mask, radius), radius)
}
