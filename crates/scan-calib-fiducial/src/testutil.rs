//! Synthetic sample-square rendering for tests.

use scan_calib_core::GrayImage;

use crate::board::BoardLayout;
use crate::catalog::{catalog, marker_keypoint, MARKERS_PER_BOARD};
use crate::dictionary::MARKER_BITS;

const GRID_CELLS: usize = MARKER_BITS + 2;

/// Render one marker (border plus payload) at `cell_px` pixels per cell,
/// top-left at `(x0, y0)`, into a white canvas.
pub(crate) fn render_marker(img: &mut GrayImage, code: u64, x0: usize, y0: usize, cell_px: usize) {
    for cy in 0..GRID_CELLS {
        for cx in 0..GRID_CELLS {
            let is_border = cx == 0 || cy == 0 || cx + 1 == GRID_CELLS || cy + 1 == GRID_CELLS;
            let is_black =
                is_border || ((code >> ((cy - 1) * MARKER_BITS + (cx - 1))) & 1) == 1;
            if !is_black {
                continue;
            }
            for yy in 0..cell_px {
                for xx in 0..cell_px {
                    let x = x0 + cx * cell_px + xx;
                    let y = y0 + cy * cell_px + yy;
                    img.data[y * img.width + x] = 0;
                }
            }
        }
    }
}

/// Render the full sample square (both boards, all eight markers) on a
/// white canvas at `cell_px` pixels per marker cell. The canvas origin
/// coincides with the catalog origin.
pub(crate) fn render_sample_square(cell_px: usize) -> (GrayImage, f64) {
    // One marker cell is 1/15 cm, so pixels per cm = 15 * cell_px.
    let ppcm = 15.0 * cell_px as f64;
    let width = (2.4 * ppcm) as usize;
    let height = (15.4 * ppcm) as usize;
    let mut img = GrayImage::new(width, height, 255);

    for board in 0..2 {
        let layout = BoardLayout::sample_square(board);
        for m in 0..MARKERS_PER_BOARD {
            let tl = catalog().position(marker_keypoint(board, m));
            let x0 = (tl.x * ppcm).round() as usize;
            let y0 = (tl.y * ppcm).round() as usize;
            render_marker(&mut img, layout.dictionary().codes[m], x0, y0, cell_px);
        }
    }
    (img, ppcm)
}
