//! Two-image similarity via binary feature descriptors.
//!
//! The classic ORB-style pipeline: FAST-9 keypoints on a smoothed grayscale
//! image, 256-bit binary descriptors sampled from a fixed pattern around each
//! keypoint, brute-force Hamming matching with cross-check, and a verdict of
//! "similar" when the match count clears the configured threshold.
//!
//! Two properties of the pipeline are load-bearing for callers:
//!
//! - An image with no detectable keypoints produces no descriptors, and a
//!   comparison where either side has no descriptors reports **0 matches and
//!   not-similar regardless of the threshold**.
//! - Matching is cross-checked (a pair counts only if each descriptor is the
//!   other's best match), which keeps match counts between unrelated images
//!   near zero instead of growing with keypoint count.

use crate::config::MatchConfig;
use crate::error::DocIntelError;
use crate::output::MatchReport;
use image::{DynamicImage, GrayImage};
use imageproc::corners::{corners_fast9, Corner};
use imageproc::filter::gaussian_blur_f32;
use once_cell::sync::Lazy;
use std::path::Path;
use tracing::debug;

/// Descriptor length in bytes (256 bits).
const DESCRIPTOR_BYTES: usize = 32;

/// Half-width of the square patch a descriptor is sampled from.
const PATCH_RADIUS: i32 = 15;

/// A 256-bit binary descriptor.
type Descriptor = [u8; DESCRIPTOR_BYTES];

/// The fixed point-pair sampling pattern shared by every descriptor.
///
/// 256 pixel pairs inside the 31×31 patch, generated once from a fixed seed
/// so descriptors are comparable across runs and processes. The generator is
/// a plain LCG: the pattern only needs to be well-spread and stable, not
/// cryptographic.
static SAMPLING_PATTERN: Lazy<Vec<(i32, i32, i32, i32)>> = Lazy::new(|| {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    let mut next_offset = move || -> i32 {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        // Top bits have the best statistical quality in an LCG.
        let v = (state >> 33) as i32;
        v.rem_euclid(2 * PATCH_RADIUS + 1) - PATCH_RADIUS
    };

    (0..DESCRIPTOR_BYTES * 8)
        .map(|_| (next_offset(), next_offset(), next_offset(), next_offset()))
        .collect()
});

/// Detect FAST-9 keypoints, strongest first, capped at `max_keypoints`.
fn detect_keypoints(gray: &GrayImage, config: &MatchConfig) -> Vec<Corner> {
    let mut corners = corners_fast9(gray, config.fast_threshold);
    corners.sort_by(|a, b| b.score.total_cmp(&a.score));
    corners.truncate(config.max_keypoints);
    corners
}

/// Compute the descriptor for one keypoint, or None if its patch would
/// leave the image.
fn describe(gray: &GrayImage, corner: &Corner) -> Option<Descriptor> {
    let (w, h) = (gray.width() as i32, gray.height() as i32);
    let (cx, cy) = (corner.x as i32, corner.y as i32);

    if cx - PATCH_RADIUS < 0 || cy - PATCH_RADIUS < 0 || cx + PATCH_RADIUS >= w || cy + PATCH_RADIUS >= h
    {
        return None;
    }

    let mut descriptor = [0u8; DESCRIPTOR_BYTES];
    for (bit, (x1, y1, x2, y2)) in SAMPLING_PATTERN.iter().enumerate() {
        let p1 = gray.get_pixel((cx + x1) as u32, (cy + y1) as u32).0[0];
        let p2 = gray.get_pixel((cx + x2) as u32, (cy + y2) as u32).0[0];
        if p1 < p2 {
            descriptor[bit / 8] |= 1 << (bit % 8);
        }
    }
    Some(descriptor)
}

/// Keypoints + descriptors for one image.
struct ImageFeatures {
    keypoints: usize,
    descriptors: Vec<Descriptor>,
}

/// Smooth, detect and describe.
fn extract_features(img: &DynamicImage, config: &MatchConfig) -> ImageFeatures {
    let gray = img.to_luma8();
    let smoothed = if config.blur_sigma > 0.0 {
        gaussian_blur_f32(&gray, config.blur_sigma)
    } else {
        gray
    };

    let keypoints = detect_keypoints(&smoothed, config);
    let descriptors: Vec<Descriptor> = keypoints
        .iter()
        .filter_map(|c| describe(&smoothed, c))
        .collect();

    debug!(
        "{} keypoints, {} descriptors",
        keypoints.len(),
        descriptors.len()
    );

    ImageFeatures {
        keypoints: keypoints.len(),
        descriptors,
    }
}

/// Hamming distance between two descriptors.
fn hamming(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x ^ y).count_ones())
        .sum()
}

/// Index of the nearest descriptor in `haystack`, by Hamming distance.
fn best_match(needle: &Descriptor, haystack: &[Descriptor]) -> Option<usize> {
    haystack
        .iter()
        .enumerate()
        .min_by_key(|(_, d)| hamming(needle, d))
        .map(|(i, _)| i)
}

/// Count cross-checked matches between two descriptor sets.
///
/// A pair (i, j) counts only when j is i's best match AND i is j's best
/// match — the crossCheck behaviour of a brute-force matcher.
fn count_matches(a: &[Descriptor], b: &[Descriptor]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    // Precompute b→a best matches once; a→b is evaluated in the loop.
    let reverse: Vec<Option<usize>> = b.iter().map(|d| best_match(d, a)).collect();

    a.iter()
        .enumerate()
        .filter(|&(i, d)| match best_match(d, b) {
            Some(j) => reverse[j] == Some(i),
            None => false,
        })
        .count()
}

/// Compare two images and report whether they are similar.
///
/// `is_similar` is `matches > config.match_threshold`. When either image
/// yields no descriptors the report is 0 matches / not similar, whatever the
/// threshold.
pub fn compare(img_a: &DynamicImage, img_b: &DynamicImage, config: &MatchConfig) -> MatchReport {
    let features_a = extract_features(img_a, config);
    let features_b = extract_features(img_b, config);

    let matches = count_matches(&features_a.descriptors, &features_b.descriptors);
    let is_similar = !features_a.descriptors.is_empty()
        && !features_b.descriptors.is_empty()
        && matches > config.match_threshold;

    MatchReport {
        keypoints_a: features_a.keypoints,
        keypoints_b: features_b.keypoints,
        matches,
        threshold: config.match_threshold,
        is_similar,
    }
}

/// Load two images from disk and compare them.
pub fn compare_files(
    path_a: impl AsRef<Path>,
    path_b: impl AsRef<Path>,
    config: &MatchConfig,
) -> Result<MatchReport, DocIntelError> {
    let open = |path: &Path| -> Result<DynamicImage, DocIntelError> {
        image::open(path).map_err(|e| DocIntelError::ImageReadFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    };

    let img_a = open(path_a.as_ref())?;
    let img_b = open(path_b.as_ref())?;
    Ok(compare(&img_a, &img_b, config))
}
