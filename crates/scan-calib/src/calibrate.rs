//! Mesh centering: sample-square calibration with a bounding-box fallback.

use nalgebra::{Matrix3, Point2, Point3, Vector3};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

use scan_calib_core::{align_rotation, GrayImage};
use scan_calib_fiducial::{catalog, detect_sample_square, FlipAxis, SampleSquareDetection};
use scan_calib_mesh::{compute_obb, Mesh, MeshError, Obb, UvLocator};

use crate::config::{CenteringConfig, ConfigError};
use crate::transform::CenteringTransform;

/// Cap on surface normals sampled for the 180-degree vote.
const NORMAL_VOTE_SAMPLES: usize = 1000;

/// Flip the fallback orientation when at most this fraction of sampled
/// normals points along the minor axis.
const FLIP_VOTE_FRACTION: f64 = 0.4;

/// Errors from [`center_mesh`].
#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("mesh has too few vertices for an oriented bounding box")]
    DegenerateMesh,
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// Outcome of a centering run.
#[derive(Clone, Debug)]
pub struct CenteringResult {
    /// The transform that was applied to the mesh.
    pub transform: CenteringTransform,
    /// Texture in the normalized orientation, present when the detector
    /// mirrored or rotated it. The mesh UVs have been remapped to match.
    pub reoriented_texture: Option<GrayImage>,
    /// True when orientation came from the bounding-box fallback.
    pub used_fallback: bool,
}

/// Center, orient and scale a mesh.
///
/// The mesh is translated so its oriented-bounding-box center lands on
/// the origin. When a texture is supplied and the sample square is found
/// in it, orientation and scale come from the square; otherwise the
/// bounding-box fallback orients the mesh at identity scale. The composed
/// transform is applied to the mesh and returned for persistence.
pub fn center_mesh(
    mesh: &mut Mesh,
    texture: Option<&GrayImage>,
    config: &CenteringConfig,
) -> Result<CenteringResult, CalibrationError> {
    config.validate()?;
    if mesh.normals.is_empty() {
        log::info!("generating vertex normals");
        mesh.compute_vertex_normals();
    }

    let obb = compute_obb(&mesh.vertices).ok_or(CalibrationError::DegenerateMesh)?;
    let translation = -obb.center().coords;

    let square = texture.and_then(|tex| sample_square_calibration(mesh, tex, &obb, config));
    let used_fallback = square.is_none();
    let (scale, rotation, reoriented_texture) = match square {
        Some(sq) => (sq.scale, sq.rotation, sq.reoriented_texture),
        None => {
            log::info!("starting bounding box calibration");
            (1.0, bounding_box_calibration(mesh, &obb, config), None)
        }
    };

    let transform = CenteringTransform {
        scale,
        rotation,
        translation,
    };
    mesh.transform(&transform.matrix());

    Ok(CenteringResult {
        transform,
        reoriented_texture,
        used_fallback,
    })
}

struct SquareCalibration {
    scale: f64,
    rotation: Matrix3<f64>,
    reoriented_texture: Option<GrayImage>,
}

/// Scale and orient from the sample square in the texture.
///
/// A winning flip or rotation is applied to the mesh UV coordinates and
/// a matching texture copy is produced. Returns `None` when the square is
/// not detected or fewer than two keypoints resolve to 3D, deferring to
/// the bounding-box fallback.
fn sample_square_calibration(
    mesh: &mut Mesh,
    texture: &GrayImage,
    obb: &Obb,
    config: &CenteringConfig,
) -> Option<SquareCalibration> {
    log::info!("detecting sample square");
    let det = detect_sample_square(texture, &config.detect);
    if !det.detected {
        log::info!("sample square not detected");
        return None;
    }

    let reoriented_texture = normalize_uv_orientation(mesh, texture, &det);
    let (width, height) = match det.rotation {
        Some(turn) if turn.swaps_dimensions() => (texture.height, texture.width),
        _ => (texture.width, texture.height),
    };
    let max_x = (width - 1) as f64;
    let max_y = (height - 1) as f64;
    let to_uv = |p: Point2<f64>| Point2::new(p.x / max_x, p.y / max_y);

    log::info!("computing uv lookup grid");
    let locator = UvLocator::build(mesh)?;

    let rotation = square_orientation(mesh, &locator, &det, obb, config, &to_uv);
    let scale = square_scale(mesh, &locator, &det, &to_uv)?;

    Some(SquareCalibration {
        scale,
        rotation,
        reoriented_texture,
    })
}

/// Apply the detector's flip and rotation to the mesh UVs and produce a
/// matching texture copy. UVs live in the unit square, so the mirror maps
/// a coordinate to one minus itself.
fn normalize_uv_orientation(
    mesh: &mut Mesh,
    texture: &GrayImage,
    det: &SampleSquareDetection,
) -> Option<GrayImage> {
    let mut out: Option<GrayImage> = None;

    if let Some(axis) = det.flip {
        log::info!("mirroring texture and uv map");
        match axis {
            FlipAxis::Horizontal => {
                out = Some(texture.flipped_horizontal());
                for uv in &mut mesh.uv_coords {
                    uv.x = 1.0 - uv.x;
                }
            }
            FlipAxis::Vertical => {
                out = Some(texture.flipped_vertical());
                for uv in &mut mesh.uv_coords {
                    uv.y = 1.0 - uv.y;
                }
            }
        }
    }

    if let Some(turn) = det.rotation {
        log::info!("rotating texture and uv map by {turn:?}");
        let src = out.as_ref().unwrap_or(texture);
        out = Some(src.rotated(turn));
        for uv in &mut mesh.uv_coords {
            *uv = turn.map_point(*uv, 1.0, 1.0);
        }
    }

    out
}

/// Mean marker "right" and "down" directions lifted to 3D, optionally
/// snapped to the nearest bounding-box edge, then aligned to +X / -Y.
fn square_orientation(
    mesh: &Mesh,
    locator: &UvLocator,
    det: &SampleSquareDetection,
    obb: &Obb,
    config: &CenteringConfig,
    to_uv: &impl Fn(Point2<f64>) -> Point2<f64>,
) -> Matrix3<f64> {
    let mut right_samples: Vec<Vector3<f64>> = Vec::new();
    let mut down_samples: Vec<Vector3<f64>> = Vec::new();

    for board in &det.boards {
        for marker in &board.markers {
            let mut pts = [Point3::origin(); 4];
            let mut hit = true;
            for (slot, &c) in pts.iter_mut().zip(marker.corners.iter()) {
                match locator.lookup(to_uv(c), mesh) {
                    Some(p) => *slot = p,
                    None => {
                        hit = false;
                        break;
                    }
                }
            }
            if !hit {
                continue;
            }
            right_samples.push((pts[1] - pts[0]).normalize());
            right_samples.push((pts[2] - pts[3]).normalize());
            down_samples.push((pts[3] - pts[0]).normalize());
            down_samples.push((pts[2] - pts[1]).normalize());
        }
    }

    if right_samples.is_empty() {
        if det.boards.iter().any(|b| !b.markers.is_empty()) {
            log::warn!("marker corners do not lie in the uv map, orientation unknown");
        } else {
            log::warn!("no markers detected, orientation unknown");
        }
        return Matrix3::identity();
    }

    let mean = |samples: &[Vector3<f64>]| {
        (samples.iter().sum::<Vector3<f64>>() / samples.len() as f64).normalize()
    };
    let mut right = mean(&right_samples);
    let mut down = mean(&down_samples);
    if config.snap_to_obb {
        right = obb.closest_axis(&right);
        down = obb.closest_axis(&down);
    }

    let right_target = Vector3::x();
    let down_target = -Vector3::y();
    let r = align_rotation(&right, &right_target, &down_target);
    align_rotation(&(r * down), &down_target, &right_target) * r
}

/// Mean catalog-over-measured distance ratio across keypoint pairs, with
/// per-pair absolute error diagnostics. Keypoints whose UV misses the
/// mesh are excluded; fewer than two hits aborts to the fallback.
fn square_scale(
    mesh: &Mesh,
    locator: &UvLocator,
    det: &SampleSquareDetection,
    to_uv: &impl Fn(Point2<f64>) -> Point2<f64>,
) -> Option<f64> {
    let cat = catalog();
    let mut hits: Vec<(usize, Point3<f64>)> = Vec::new();
    for kp in &det.keypoints {
        match locator.lookup(to_uv(kp.position), mesh) {
            Some(p) => hits.push((kp.id, p)),
            None => log::debug!("keypoint {} misses the uv map", kp.id),
        }
    }
    if hits.len() < 2 {
        log::warn!(
            "only {} of {} keypoints lie in the uv map, cannot calculate scale",
            hits.len(),
            det.keypoints.len()
        );
        return None;
    }

    let mut ratios = Vec::new();
    let mut expected = Vec::new();
    let mut measured = Vec::new();
    for (i, &(id_a, pa)) in hits.iter().enumerate() {
        for &(id_b, pb) in &hits[i + 1..] {
            let dist_cm = cat.distance(id_a, id_b);
            let dist_3d = (pb - pa).norm();
            ratios.push(dist_cm / dist_3d);
            expected.push(dist_cm);
            measured.push(dist_3d);
        }
    }
    let scale = ratios.iter().sum::<f64>() / ratios.len() as f64;

    let mut errors: Vec<f64> = expected
        .iter()
        .zip(&measured)
        .map(|(e, m)| (m * scale - e).abs())
        .collect();
    errors.sort_by(f64::total_cmp);
    let median = if errors.len() % 2 == 0 {
        (errors[errors.len() / 2 - 1] + errors[errors.len() / 2]) / 2.0
    } else {
        errors[errors.len() / 2]
    };
    log::info!(
        "scale factor {scale:.7}, absolute error (cm): max {:.7}, min {:.7}, mean {:.7}, median {median:.7}",
        errors[errors.len() - 1],
        errors[0],
        errors.iter().sum::<f64>() / errors.len() as f64,
    );

    Some(scale)
}

/// Orient the mesh from its bounding box alone, at identity scale.
///
/// The longest and second longest box edges are aligned to the configured
/// axes. The 180-degree ambiguity is settled by a vote over sampled
/// surface normals: if at most [`FLIP_VOTE_FRACTION`] of them point along
/// the minor axis, the orientation is flipped around it. The vote assumes
/// outward-dominant normals and can mislead on highly concave geometry.
pub(crate) fn bounding_box_calibration(
    mesh: &Mesh,
    obb: &Obb,
    config: &CenteringConfig,
) -> Matrix3<f64> {
    let mid_axis = config.mid_dir.basis();
    let max_sign = if config.flip_max { -1.0 } else { 1.0 };
    let mid_sign = if config.flip_mid { -1.0 } else { 1.0 };

    let max_target = config.max_dir.basis() * max_sign;
    let mid_target = mid_axis * mid_sign;
    let min_target = config.min_dir().basis();

    let axes = obb.axes();
    let r = align_rotation(&axes[0], &max_target, &mid_axis);
    let mut r = align_rotation(&(r * axes[1]), &mid_target, &max_target) * r;

    if mesh.normals.is_empty() {
        log::warn!("mesh has no normals, skipping orientation vote");
        return r;
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let count = mesh.normals.len().min(NORMAL_VOTE_SAMPLES);
    let indices: Vec<usize> = (0..mesh.normals.len()).collect();
    let toward_min = indices
        .choose_multiple(&mut rng, count)
        .filter(|&&i| (r * mesh.normals[i]).dot(&min_target) > 0.0)
        .count();

    if (toward_min as f64) <= (count as f64) * FLIP_VOTE_FRACTION {
        log::info!(
            "{toward_min} of {count} sampled normals point along the minor axis, flipping"
        );
        r = align_rotation(&-min_target, &min_target, &mid_target) * r;
    }
    r
}
