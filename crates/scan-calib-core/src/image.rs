//! Grayscale buffers and the reorientation helpers shared by the fiducial
//! detector and the calibration pipeline.

use nalgebra::Point2;

/// Borrowed row-major grayscale buffer, `len = width * height`.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8],
}

/// Owned row-major grayscale buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn new(width: usize, height: usize, fill: u8) -> Self {
        Self {
            width,
            height,
            data: vec![fill; width * height],
        }
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u8) {
        self.data[y * self.width + x] = v;
    }

    /// Mirror around the vertical axis (`x -> width - 1 - x`).
    pub fn flipped_horizontal(&self) -> GrayImage {
        let mut out = GrayImage::new(self.width, self.height, 0);
        for y in 0..self.height {
            for x in 0..self.width {
                out.set(self.width - 1 - x, y, self.get(x, y));
            }
        }
        out
    }

    /// Mirror around the horizontal axis (`y -> height - 1 - y`).
    pub fn flipped_vertical(&self) -> GrayImage {
        let mut out = GrayImage::new(self.width, self.height, 0);
        for y in 0..self.height {
            for x in 0..self.width {
                out.set(x, self.height - 1 - y, self.get(x, y));
            }
        }
        out
    }

    /// Rotate the pixel grid by a quarter-turn multiple.
    pub fn rotated(&self, turn: QuarterTurn) -> GrayImage {
        let (ow, oh) = match turn {
            QuarterTurn::Cw180 => (self.width, self.height),
            _ => (self.height, self.width),
        };
        let mut out = GrayImage::new(ow, oh, 0);
        let max_x = (self.width - 1) as f64;
        let max_y = (self.height - 1) as f64;
        for y in 0..self.height {
            for x in 0..self.width {
                let p = turn.map_point(Point2::new(x as f64, y as f64), max_x, max_y);
                out.set(p.x as usize, p.y as usize, self.get(x, y));
            }
        }
        out
    }
}

/// Clockwise quarter-turn rotations of an image or of coordinates within it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuarterTurn {
    Cw90,
    Cw180,
    Cw270,
}

impl QuarterTurn {
    /// All turns, ordered by increasing angle.
    pub const ALL: [QuarterTurn; 3] = [QuarterTurn::Cw90, QuarterTurn::Cw180, QuarterTurn::Cw270];

    /// Map a point from the unrotated frame into the rotated frame.
    ///
    /// `max_x`/`max_y` are the inclusive coordinate maxima of the unrotated
    /// frame (`width - 1`/`height - 1` for pixel grids, `1.0` for UV space).
    #[inline]
    pub fn map_point(self, p: Point2<f64>, max_x: f64, max_y: f64) -> Point2<f64> {
        match self {
            QuarterTurn::Cw90 => Point2::new(max_y - p.y, p.x),
            QuarterTurn::Cw180 => Point2::new(max_x - p.x, max_y - p.y),
            QuarterTurn::Cw270 => Point2::new(p.y, max_x - p.x),
        }
    }

    /// Whether rotated width and height swap relative to the source.
    #[inline]
    pub fn swaps_dimensions(self) -> bool {
        !matches!(self, QuarterTurn::Cw180)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(w: usize, h: usize) -> GrayImage {
        let mut img = GrayImage::new(w, h, 0);
        for y in 0..h {
            for x in 0..w {
                img.set(x, y, (y * w + x) as u8);
            }
        }
        img
    }

    #[test]
    fn flips_are_involutions() {
        let img = ramp(5, 3);
        assert_eq!(img.flipped_horizontal().flipped_horizontal(), img);
        assert_eq!(img.flipped_vertical().flipped_vertical(), img);
    }

    #[test]
    fn quarter_turns_compose_to_identity() {
        let img = ramp(4, 3);
        let once = img.rotated(QuarterTurn::Cw90);
        assert_eq!(once.width, 3);
        assert_eq!(once.height, 4);
        let back = once
            .rotated(QuarterTurn::Cw90)
            .rotated(QuarterTurn::Cw90)
            .rotated(QuarterTurn::Cw90);
        assert_eq!(back, img);
        assert_eq!(img.rotated(QuarterTurn::Cw180).rotated(QuarterTurn::Cw180), img);
    }

    #[test]
    fn map_point_matches_pixel_rotation() {
        let img = ramp(6, 4);
        let rot = img.rotated(QuarterTurn::Cw270);
        let p = QuarterTurn::Cw270.map_point(Point2::new(2.0, 1.0), 5.0, 3.0);
        assert_eq!(rot.get(p.x as usize, p.y as usize), img.get(2, 1));
    }
}
