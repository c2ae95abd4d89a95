//! Quad candidate extraction from dark pixel components.

use nalgebra::Point2;
use scan_calib_core::GrayImageView;
use std::collections::VecDeque;

use crate::threshold::image_threshold;

/// Components smaller than this cannot yield a usable quad.
const MIN_COMPONENT_PIXELS: usize = 16;

/// Extract candidate marker quads from an image.
///
/// The image is binarized with a global Otsu threshold, dark pixels are
/// grouped into 4-connected components, and each component is reduced to
/// its four extreme corners. Candidates touching the image border or with
/// a perimeter below `min_perimeter_px` are dropped. Corners come back in
/// clockwise order (image coordinates, y down) starting at an arbitrary
/// corner.
pub(crate) fn extract_quad_candidates(
    img: &GrayImageView<'_>,
    min_perimeter_px: f64,
) -> Vec<[Point2<f64>; 4]> {
    let (w, h) = (img.width, img.height);
    if w < 3 || h < 3 {
        return Vec::new();
    }

    let thr = image_threshold(img);
    let mut visited = vec![false; w * h];
    let mut quads = Vec::new();
    let mut component = Vec::new();

    for start in 0..w * h {
        if visited[start] || img.data[start] >= thr {
            continue;
        }

        component.clear();
        let mut touches_border = false;
        let mut queue = VecDeque::from([start]);
        visited[start] = true;
        while let Some(idx) = queue.pop_front() {
            let (x, y) = (idx % w, idx / w);
            component.push(idx);
            if x == 0 || y == 0 || x + 1 == w || y + 1 == h {
                touches_border = true;
            }

            let mut push = |n: usize| {
                if !visited[n] && img.data[n] < thr {
                    visited[n] = true;
                    queue.push_back(n);
                }
            };
            if x > 0 {
                push(idx - 1);
            }
            if x + 1 < w {
                push(idx + 1);
            }
            if y > 0 {
                push(idx - w);
            }
            if y + 1 < h {
                push(idx + w);
            }
        }

        if touches_border || component.len() < MIN_COMPONENT_PIXELS {
            continue;
        }
        let Some(corners) = quad_corners(&component, w) else {
            continue;
        };
        if perimeter(&corners) < min_perimeter_px {
            continue;
        }
        quads.push(corners);
    }

    log::debug!("{} quad candidates (threshold {thr})", quads.len());
    quads
}

/// Reduce a pixel component to four extreme corners: the point farthest
/// from the centroid, the point farthest from it, and the farthest point
/// on each side of the line between them.
fn quad_corners(component: &[usize], w: usize) -> Option<[Point2<f64>; 4]> {
    let pt = |idx: usize| Point2::new((idx % w) as f64, (idx / w) as f64);

    let n = component.len() as f64;
    let centroid = component
        .iter()
        .fold(Point2::origin(), |acc, &i| acc + pt(i).coords / n);

    let farthest_from = |origin: Point2<f64>| {
        component
            .iter()
            .map(|&i| pt(i))
            .max_by(|a, b| {
                (a - origin)
                    .norm_squared()
                    .total_cmp(&(b - origin).norm_squared())
            })
            .unwrap_or(origin)
    };
    let p0 = farthest_from(centroid);
    let p1 = farthest_from(p0);

    let dir = p1 - p0;
    let mut left: Option<(f64, Point2<f64>)> = None;
    let mut right: Option<(f64, Point2<f64>)> = None;
    for &i in component {
        let p = pt(i);
        let cross = dir.x * (p.y - p0.y) - dir.y * (p.x - p0.x);
        if cross > 0.5 && left.map(|(c, _)| cross > c).unwrap_or(true) {
            left = Some((cross, p));
        } else if cross < -0.5 && right.map(|(c, _)| cross < c).unwrap_or(true) {
            right = Some((cross, p));
        }
    }
    let (_, p2) = left?;
    let (_, p3) = right?;

    // Clockwise order around the quad center, then half a pixel outward:
    // component pixels are pixel centers, half a pixel inside the outline.
    let center = Point2::from((p0.coords + p1.coords + p2.coords + p3.coords) / 4.0);
    let mut corners = [p0, p1, p2, p3];
    corners.sort_by(|a, b| {
        let aa = (a.y - center.y).atan2(a.x - center.x);
        let ab = (b.y - center.y).atan2(b.x - center.x);
        aa.total_cmp(&ab)
    });
    for c in &mut corners {
        c.x += 0.5 * (c.x - center.x).signum();
        c.y += 0.5 * (c.y - center.y).signum();
    }
    Some(corners)
}

fn perimeter(corners: &[Point2<f64>; 4]) -> f64 {
    (0..4)
        .map(|i| (corners[(i + 1) % 4] - corners[i]).norm())
        .sum()
}
