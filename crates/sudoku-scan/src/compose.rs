//! Render solved digits over the rectified grid.

use sudoku_scan_core::{GrayImageView, RgbImage};
use sudoku_scan_grid::CELL_SIZE;
use sudoku_scan_solver::Board;

/// Color used for digits the solver filled in.
pub const SOLVED_COLOR: [u8; 3] = [255, 0, 0];

/// 5x7 glyphs for digits 0-9; each row holds 5 bits, MSB on the left.
pub const DIGIT_FONT: [[u8; 7]; 10] = [
    [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E], // 0
    [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E], // 1
    [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F], // 2
    [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E], // 3
    [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02], // 4
    [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E], // 5
    [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E], // 6
    [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08], // 7
    [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E], // 8
    [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C], // 9
];

pub const FONT_WIDTH: usize = 5;
pub const FONT_HEIGHT: usize = 7;

/// Draw one digit centered at (cx, cy), each font bit becoming a
/// `scale`x`scale` block.
pub fn draw_digit(img: &mut RgbImage, digit: u8, cx: usize, cy: usize, scale: usize, color: [u8; 3]) {
    debug_assert!(digit <= 9);
    let glyph = &DIGIT_FONT[digit as usize];
    let w = FONT_WIDTH * scale;
    let h = FONT_HEIGHT * scale;
    let x0 = cx.saturating_sub(w / 2);
    let y0 = cy.saturating_sub(h / 2);

    for (row, bits) in glyph.iter().enumerate() {
        for col in 0..FONT_WIDTH {
            if bits & (0x10 >> col) == 0 {
                continue;
            }
            for dy in 0..scale {
                for dx in 0..scale {
                    let (px, py) = (x0 + col * scale + dx, y0 + row * scale + dy);
                    if px < img.width && py < img.height {
                        img.set(px, py, color);
                    }
                }
            }
        }
    }
}

/// Scale that fits a glyph into two thirds of a cell.
#[inline]
fn digit_scale(cell_size: usize) -> usize {
    (cell_size * 2 / 3) / FONT_HEIGHT
}

/// Replicate the rectified gray grid into RGB and stamp every solver-filled
/// (non-fixed) digit in red at its cell center.
pub fn compose_solved_image(rect: &GrayImageView<'_>, board: &Board) -> RgbImage {
    let mut out = RgbImage::from_gray(rect);
    let scale = digit_scale(CELL_SIZE).max(1);

    for row in 0..9 {
        for col in 0..9 {
            if board.is_fixed(row, col) {
                continue;
            }
            let digit = board.get(row, col);
            if digit == 0 {
                continue;
            }
            let cx = col * CELL_SIZE + CELL_SIZE / 2;
            let cy = row * CELL_SIZE + CELL_SIZE / 2;
            draw_digit(&mut out, digit, cx, cy, scale, SOLVED_COLOR);
        }
    }
    out
}
