//! 8-connected component labelling (two-pass, union-find).

use crate::raster::BinaryMask;

/// Label grid plus per-label pixel counts.
#[derive(Debug, Clone)]
pub struct Components {
    pub width: u32,
    pub height: u32,
    /// Row-major labels; 0 is background, components are `1..=sizes.len()`.
    pub labels: Vec<u32>,
    /// `sizes[k]` is the pixel count of label `k + 1`.
    pub sizes: Vec<usize>,
}

impl Components {
    pub fn count(&self) -> usize {
        self.sizes.len()
    }

    #[inline]
    pub fn label(&self, x: u32, y: u32) -> u32 {
        self.labels[y as usize * self.width as usize + x as usize]
    }
}

fn find_root(parent: &mut [u32], label: u32) -> u32 {
    let mut cur = label;
    while cur != parent[cur as usize] {
        parent[cur as usize] = parent[parent[cur as usize] as usize];
        cur = parent[cur as usize];
    }
    cur
}

fn union(parent: &mut [u32], a: u32, b: u32) {
    let ra = find_root(parent, a);
    let rb = find_root(parent, b);
    // The smaller label becomes the root.
    if ra < rb {
        parent[rb as usize] = ra;
    } else if rb < ra {
        parent[ra as usize] = rb;
    }
}

/// Label the 8-connected foreground components of `mask`.
///
/// Labels are consecutive and numbered in raster order of each component's
/// first pixel.
pub fn label_components(mask: &BinaryMask) -> Components {
    let (w, h) = mask.dimensions();
    let (wu, hu) = (w as usize, h as usize);
    let src = mask.as_raw();
    let mut labels = vec![0u32; wu * hu];
    let mut parent: Vec<u32> = vec![0];

    // First pass: provisional labels from the already-visited neighbours
    // (W, NW, N, NE).
    for y in 0..hu {
        for x in 0..wu {
            let i = y * wu + x;
            if !src[i] {
                continue;
            }
            let mut neighbours = [0u32; 4];
            let mut n = 0;
            if x > 0 && labels[i - 1] > 0 {
                neighbours[n] = labels[i - 1];
                n += 1;
            }
            if y > 0 {
                let up = i - wu;
                if x > 0 && labels[up - 1] > 0 {
                    neighbours[n] = labels[up - 1];
                    n += 1;
                }
                if labels[up] > 0 {
                    neighbours[n] = labels[up];
                    n += 1;
                }
                if x + 1 < wu && labels[up + 1] > 0 {
                    neighbours[n] = labels[up + 1];
                    n += 1;
                }
            }
            let neighbours = &neighbours[..n];
            match neighbours.iter().copied().min() {
                None => {
                    let next = parent.len() as u32;
                    parent.push(next);
                    labels[i] = next;
                }
                Some(min) => {
                    labels[i] = min;
                    for &other in neighbours {
                        if other != min {
                            union(&mut parent, min, other);
                        }
                    }
                }
            }
        }
    }

    // Resolve roots to consecutive labels.
    let mut relabel = vec![0u32; parent.len()];
    let mut next = 0u32;
    for l in 1..parent.len() as u32 {
        let root = find_root(&mut parent, l);
        if relabel[root as usize] == 0 {
            next += 1;
            relabel[root as usize] = next;
        }
        relabel[l as usize] = relabel[root as usize];
    }

    // Second pass.
    let mut sizes = vec![0usize; next as usize];
    for l in labels.iter_mut().filter(|l| **l > 0) {
        *l = relabel[*l as usize];
        sizes[*l as usize - 1] += 1;
    }

    Components {
        width: w,
        height: h,
        labels,
        sizes,
    }
}

/// Drop components with fewer than `min_size` pixels. `min_size = 0` keeps
/// everything.
pub fn remove_small_components(mask: &BinaryMask, min_size: usize) -> BinaryMask {
    if min_size == 0 {
        return mask.clone();
    }
    let comps = label_components(mask);
    let (w, h) = mask.dimensions();
    let mut out = BinaryMask::new(w, h);
    for (o, &l) in out.as_raw_mut().iter_mut().zip(&comps.labels) {
        *o = l > 0 && comps.sizes[l as usize - 1] >= min_size;
    }
    out
}
