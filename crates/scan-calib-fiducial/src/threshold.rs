//! Thresholding for quad extraction and marker decoding.
//!
//! Both consumers feed intensity histograms: quad extraction samples the
//! whole frame under a pixel budget, marker decoding samples the rectified
//! quad interior. The split point comes from Otsu's between-class variance
//! over the histogram.

use scan_calib_core::GrayImageView;

/// Cap on the pixel count sampled for the whole-image threshold.
const SAMPLE_BUDGET: usize = 1 << 20;

/// Global binarization threshold for a frame.
///
/// Large scans are subsampled with an even stride so the histogram never
/// accumulates more than the budget.
pub(crate) fn image_threshold(img: &GrayImageView<'_>) -> u8 {
    let stride = (img.width * img.height / SAMPLE_BUDGET).max(1);
    otsu_threshold(img.data.iter().step_by(stride).copied())
}

/// Otsu split point for a stream of intensity samples.
///
/// An empty stream falls back to mid-gray and a stream with at most two
/// distinct values splits halfway between them, so synthetic two-tone
/// renders binarize exactly.
pub(crate) fn otsu_threshold<I>(samples: I) -> u8
where
    I: IntoIterator<Item = u8>,
{
    let mut hist = [0u64; 256];
    let mut total = 0u64;
    for v in samples {
        hist[v as usize] += 1;
        total += 1;
    }
    if total == 0 {
        return 127;
    }

    let lo = hist.iter().position(|&n| n > 0).unwrap_or(0);
    let hi = hist.iter().rposition(|&n| n > 0).unwrap_or(255);
    if lo == hi {
        return lo as u8;
    }
    if hist[lo..=hi].iter().filter(|&&n| n > 0).count() == 2 {
        return ((lo + hi) / 2) as u8;
    }

    let weighted_total: u64 = hist
        .iter()
        .enumerate()
        .map(|(v, &n)| v as u64 * n)
        .sum();

    let mut below = 0u64;
    let mut below_sum = 0u64;
    let mut best_t = lo as u8;
    let mut best_var = -1.0f64;
    for t in lo..hi {
        below += hist[t];
        below_sum += t as u64 * hist[t];
        let above = total - below;
        if below == 0 || above == 0 {
            continue;
        }

        let mean_below = below_sum as f64 / below as f64;
        let mean_above = (weighted_total - below_sum) as f64 / above as f64;
        let gap = mean_below - mean_above;
        let var_between = below as f64 * above as f64 * gap * gap;
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    best_t
}

#[cfg(test)]
mod tests {
    use super::*;
    use scan_calib_core::GrayImage;

    #[test]
    fn bimodal_samples_split_between_modes() {
        let mut samples = vec![20u8; 50];
        samples.extend(std::iter::repeat(200u8).take(50));
        let t = otsu_threshold(samples);
        assert!(t > 20 && t <= 200, "threshold {t} outside (20, 200]");
    }

    #[test]
    fn variance_scan_splits_at_the_wide_gap() {
        let mut samples = vec![0u8; 10];
        samples.extend(std::iter::repeat(10u8).take(10));
        samples.extend(std::iter::repeat(200u8).take(10));
        assert_eq!(otsu_threshold(samples), 10);
    }

    #[test]
    fn degenerate_inputs_have_stable_fallbacks() {
        assert_eq!(otsu_threshold(std::iter::empty()), 127);
        assert_eq!(otsu_threshold([42u8; 10]), 42);
        assert_eq!(otsu_threshold([10u8, 10, 30, 30]), 20);
    }

    #[test]
    fn image_threshold_separates_dark_patch() {
        let mut img = GrayImage::new(64, 64, 230);
        for y in 20..40 {
            for x in 20..40 {
                img.set(x, y, 15);
            }
        }
        let thr = image_threshold(&img.view());
        assert!(thr > 15 && thr <= 230, "threshold {thr} outside (15, 230]");
    }
}
