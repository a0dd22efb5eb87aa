//! Cell extraction: threshold, connected-component labeling, per-component
//! centroid/size/intensity, pixel -> coordinate through the analysis window.
//!
//! Output is deterministic: cells are ordered by their first pixel in
//! row-major scan order.

use rain_traits::{GeoPoint, RasterImage};

use crate::config::{Connectivity, ExtractCfg};
use crate::window::GeoWindow;

/// One precipitation cell detected in a single frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub position: GeoPoint,
    /// Mean luminance over the component, 0-255.
    pub intensity: f64,
    pub pixel_count: usize,
    /// Frame timestamp (unix seconds).
    pub timestamp: i64,
}

/// Detect cells in `raster`, mapping centroids through `window`.
pub fn extract_cells(
    raster: &RasterImage,
    window: &GeoWindow,
    timestamp: i64,
    cfg: &ExtractCfg,
) -> Vec<Cell> {
    let (w, h) = (raster.width, raster.height);
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let mask: Vec<bool> = raster
        .pixels
        .iter()
        .map(|&p| p > cfg.rain_threshold)
        .collect();
    let (labels, count) = label_components(&mask, w, h, cfg.connectivity);
    if count == 0 {
        return Vec::new();
    }

    let mut acc = vec![Blob::default(); count + 1];
    for (idx, &label) in labels.iter().enumerate() {
        if label == 0 {
            continue;
        }
        let b = &mut acc[label as usize];
        b.pixels += 1;
        b.sum_col += (idx % w) as f64;
        b.sum_row += (idx / w) as f64;
        b.sum_intensity += f64::from(raster.pixels[idx]);
    }

    let cells: Vec<Cell> = acc
        .iter()
        .skip(1)
        .filter(|b| b.pixels >= cfg.min_cell_pixels.max(1))
        .map(|b| {
            let n = b.pixels as f64;
            let position = window.pixel_to_geo(b.sum_col / n, b.sum_row / n, w, h);
            Cell {
                position,
                intensity: b.sum_intensity / n,
                pixel_count: b.pixels,
                timestamp,
            }
        })
        .collect();

    tracing::debug!(
        timestamp,
        components = count,
        cells = cells.len(),
        "extracted cells"
    );
    cells
}

/// True when the pixel under `point` is above the rain threshold.
pub fn is_wet_at(raster: &RasterImage, window: &GeoWindow, point: GeoPoint, threshold: u8) -> bool {
    let (col, row) = window.geo_to_pixel(point, raster.width, raster.height);
    let (col, row) = (col.round(), row.round());
    if !(col.is_finite() && row.is_finite()) || col < 0.0 || row < 0.0 {
        return false;
    }
    raster
        .get(col as usize, row as usize)
        .is_some_and(|v| v > threshold)
}

#[derive(Debug, Clone, Copy, Default)]
struct Blob {
    pixels: usize,
    sum_col: f64,
    sum_row: f64,
    sum_intensity: f64,
}

/// Two-pass union-find labeling. Returns per-pixel labels (0 = background,
/// 1..=count sequential in scan order) and the component count.
fn label_components(mask: &[bool], w: usize, h: usize, conn: Connectivity) -> (Vec<u32>, usize) {
    let mut labels = vec![0u32; w * h];
    // parent[0] is the background slot
    let mut parent: Vec<u32> = vec![0];

    fn find(parent: &mut [u32], mut x: u32) -> u32 {
        while parent[x as usize] != x {
            parent[x as usize] = parent[parent[x as usize] as usize];
            x = parent[x as usize];
        }
        x
    }

    fn union(parent: &mut [u32], a: u32, b: u32) {
        let ra = find(parent, a);
        let rb = find(parent, b);
        // lower root wins so provisional order is kept
        if ra < rb {
            parent[rb as usize] = ra;
        } else if rb < ra {
            parent[ra as usize] = rb;
        }
    }

    let mut neighbours: Vec<u32> = Vec::with_capacity(4);
    for row in 0..h {
        for col in 0..w {
            let idx = row * w + col;
            if !mask[idx] {
                continue;
            }
            neighbours.clear();
            if col > 0 && labels[idx - 1] > 0 {
                neighbours.push(labels[idx - 1]);
            }
            if row > 0 && labels[idx - w] > 0 {
                neighbours.push(labels[idx - w]);
            }
            if conn == Connectivity::Eight && row > 0 {
                if col > 0 && labels[idx - w - 1] > 0 {
                    neighbours.push(labels[idx - w - 1]);
                }
                if col + 1 < w && labels[idx - w + 1] > 0 {
                    neighbours.push(labels[idx - w + 1]);
                }
            }

            match neighbours.iter().min().copied() {
                None => {
                    let next = parent.len() as u32;
                    parent.push(next);
                    labels[idx] = next;
                }
                Some(min) => {
                    labels[idx] = min;
                    for &n in &neighbours {
                        union(&mut parent, min, n);
                    }
                }
            }
        }
    }

    // Second pass: flatten to sequential labels in order of first appearance.
    let mut remap = vec![0u32; parent.len()];
    let mut count = 0u32;
    for label in &mut labels {
        if *label == 0 {
            continue;
        }
        let root = find(&mut parent, *label) as usize;
        if remap[root] == 0 {
            count += 1;
            remap[root] = count;
        }
        *label = remap[root];
    }
    (labels, count as usize)
}
