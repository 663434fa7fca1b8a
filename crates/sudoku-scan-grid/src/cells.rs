//! Cell extraction and normalization from a rectified grid.

use sudoku_scan_core::{resize_bilinear, GrayImage, GrayImageView};

use crate::components::keep_largest_component;
use crate::rectify::{CELL_SIZE, GRID_SIZE};

/// Fraction of a tile trimmed from each side to discard grid-line residue.
const MARGIN_FRAC: f32 = 0.2;

/// Cells with fewer than this fraction of bright pixels are empty.
const MIN_INK_FRAC: f32 = 0.05;

/// One normalized 28x28 cell image.
#[derive(Clone, Debug)]
pub struct Cell {
    pub image: GrayImage,
    pub is_empty: bool,
}

fn crop(src: &GrayImageView<'_>, x0: usize, y0: usize, w: usize, h: usize) -> GrayImage {
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        let src_row = (y0 + y) * src.width + x0;
        out.data[y * w..(y + 1) * w].copy_from_slice(&src.data[src_row..src_row + w]);
    }
    out
}

/// Shift the image so its intensity centroid lands on the frame center.
/// Pixels shifted out of frame are dropped; exposed pixels are zero.
fn center_by_mass(src: &GrayImage) -> GrayImage {
    let (w, h) = (src.width, src.height);
    let mut mass = 0f64;
    let mut mx = 0f64;
    let mut my = 0f64;
    for y in 0..h {
        for x in 0..w {
            let v = src.at(x, y) as f64;
            mass += v;
            mx += v * x as f64;
            my += v * y as f64;
        }
    }
    if mass <= 0.0 {
        return src.clone();
    }

    let cx = mx / mass;
    let cy = my / mass;
    let dx = (w as f64 / 2.0 - cx).round() as i32;
    let dy = (h as f64 / 2.0 - cy).round() as i32;

    let mut out = GrayImage::new(w, h);
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let (sx, sy) = (x - dx, y - dy);
            if sx < 0 || sy < 0 || sx >= w as i32 || sy >= h as i32 {
                continue;
            }
            out.set(x as usize, y as usize, src.at(sx as usize, sy as usize));
        }
    }
    out
}

fn ink_fraction(img: &GrayImage) -> f32 {
    let bright = img.data.iter().filter(|&&v| v > 128).count();
    bright as f32 / img.data.len() as f32
}

/// Normalize one tile: trim the margin, resize back to 28x28, recenter by
/// mass, then strip everything but the largest connected component.
pub fn normalize_cell(tile: &GrayImageView<'_>) -> Cell {
    let margin = (tile.width as f32 * MARGIN_FRAC).round() as usize;
    let inner_w = tile.width - 2 * margin;
    let inner_h = tile.height - 2 * margin;
    let inner = crop(tile, margin, margin, inner_w, inner_h);

    let resized = resize_bilinear(&inner.view(), CELL_SIZE, CELL_SIZE);
    let centered = center_by_mass(&resized);
    let cleaned = keep_largest_component(&centered.view());

    let is_empty = ink_fraction(&cleaned) < MIN_INK_FRAC;
    Cell {
        image: cleaned,
        is_empty,
    }
}

/// Tile the rectified grid into 81 normalized cells, row-major.
pub fn extract_cells(rect: &GrayImageView<'_>) -> Vec<Cell> {
    debug_assert_eq!(rect.width, GRID_SIZE);
    debug_assert_eq!(rect.height, GRID_SIZE);

    let mut cells = Vec::with_capacity(81);
    for row in 0..9 {
        for col in 0..9 {
            let tile = crop(rect, col * CELL_SIZE, row * CELL_SIZE, CELL_SIZE, CELL_SIZE);
            cells.push(normalize_cell(&tile.view()));
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::label_components;
    use approx::assert_abs_diff_eq;

    fn blank_grid() -> GrayImage {
        GrayImage::new(GRID_SIZE, GRID_SIZE)
    }

    fn stamp_block(img: &mut GrayImage, cx: usize, cy: usize, half: usize) {
        for y in cy - half..=cy + half {
            for x in cx - half..=cx + half {
                img.set(x, y, 255);
            }
        }
    }

    #[test]
    fn blank_grid_yields_81_empty_cells() {
        let grid = blank_grid();
        let cells = extract_cells(&grid.view());
        assert_eq!(cells.len(), 81);
        assert!(cells.iter().all(|c| c.is_empty));
        assert!(cells
            .iter()
            .all(|c| c.image.width == CELL_SIZE && c.image.height == CELL_SIZE));
    }

    #[test]
    fn inked_cell_is_detected_and_centered() {
        let mut grid = blank_grid();
        // a fat blob near the corner of cell (2, 4), off center
        let x0 = 4 * CELL_SIZE + 9;
        let y0 = 2 * CELL_SIZE + 9;
        stamp_block(&mut grid, x0, y0, 4);

        let cells = extract_cells(&grid.view());
        let cell = &cells[2 * 9 + 4];
        assert!(!cell.is_empty);

        // centroid should land on the frame center after recentering
        let mut mass = 0f64;
        let mut mx = 0f64;
        let mut my = 0f64;
        for y in 0..CELL_SIZE {
            for x in 0..CELL_SIZE {
                let v = cell.image.at(x, y) as f64;
                mass += v;
                mx += v * x as f64;
                my += v * y as f64;
            }
        }
        assert!(mass > 0.0);
        assert_abs_diff_eq!(mx / mass, 14.0, epsilon = 1.5);
        assert_abs_diff_eq!(my / mass, 14.0, epsilon = 1.5);
    }

    #[test]
    fn noise_cleaner_leaves_one_component() {
        let mut grid = blank_grid();
        // main glyph in the cell center plus a line fleck near the border
        stamp_block(&mut grid, 14, 14, 4);
        grid.set(7, 7, 255);
        grid.set(7, 8, 255);

        let cells = extract_cells(&grid.view());
        let cell = &cells[0];
        let (_, stats) = label_components(&cell.image.view());
        assert!(stats.len() <= 1);
    }

    #[test]
    fn margin_crop_discards_border_lines() {
        let mut grid = blank_grid();
        // paint the full border of cell (0,0) like grid-line bleed
        for i in 0..CELL_SIZE {
            grid.set(i, 0, 255);
            grid.set(0, i, 255);
        }
        let cells = extract_cells(&grid.view());
        assert!(cells[0].is_empty);
    }
}
