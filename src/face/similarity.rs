use super::summary::FeatureSummary;

/// Ratio differences at or beyond this count as completely dissimilar.
const RATIO_SPAN: f64 = 0.2;
/// Age gap at which age similarity reaches zero.
const AGE_SPAN: f64 = 15.0;
/// Lower bound of the image quality factor.
const MIN_QUALITY_FACTOR: f64 = 0.7;
/// Contour descriptors that differ still count as half similar.
const CONTOUR_MISMATCH: f64 = 0.5;

const RATIO_WEIGHT: f64 = 0.25;
const SYMMETRY_WEIGHT: f64 = 0.15;
const CONTOUR_WEIGHT: f64 = 0.1;

const FEATURE_SHARE: f64 = 0.6;
const AGE_SHARE: f64 = 0.2;
const GENDER_SHARE: f64 = 0.2;

/// Raw composites cluster mid-range when sub-scores are missing; raising them to this power
/// pushes weak matches down harder than strong ones. Only the ordering is meaningful.
pub const SPREAD_EXPONENT: f64 = 1.5;

/// Weighted similarity of two summaries in [0, 1]. Symmetric in its arguments.
pub fn score(a: &FeatureSummary, b: &FeatureSummary) -> f64 {
    let features = feature_similarity(a, b);
    let age = both(a.age, b.age)
        .map(|(x, y)| (1.0 - (x - y).abs() / AGE_SPAN).max(0.0))
        .unwrap_or(0.0);
    let gender = match (&a.gender, &b.gender) {
        (Some(x), Some(y)) if x == y => 1.0,
        _ => 0.0,
    };
    let quality = both(a.image_quality_score, b.image_quality_score)
        .map(|(x, y)| ((x + y) / 2.0 / 100.0).max(MIN_QUALITY_FACTOR))
        .unwrap_or(1.0);

    let raw = features * FEATURE_SHARE + age * AGE_SHARE + gender * GENDER_SHARE;
    let adjusted = (raw.clamp(0.0, 1.0) * quality).clamp(0.0, 1.0);
    let result = adjusted.powf(SPREAD_EXPONENT);

    debug!(
        "similarity: features: {:.3}, age: {:.3}, gender: {:.3}, quality: {:.3}, raw: {:.3}, result: {:.3}",
        features, age, gender, quality, raw, result
    );

    if result.is_finite() {
        result
    } else {
        0.0
    }
}

/// Weighted mean over the facial features present on both sides, 0 when none are.
fn feature_similarity(a: &FeatureSummary, b: &FeatureSummary) -> f64 {
    let ratio = |x: f64, y: f64| 1.0 - ((x - y).abs() / RATIO_SPAN).min(1.0);

    let terms = [
        both(a.eye_distance_ratio, b.eye_distance_ratio).map(|(x, y)| (ratio(x, y), RATIO_WEIGHT)),
        both(a.eye_nose_ratio, b.eye_nose_ratio).map(|(x, y)| (ratio(x, y), RATIO_WEIGHT)),
        both(a.nose_mouth_ratio, b.nose_mouth_ratio).map(|(x, y)| (ratio(x, y), RATIO_WEIGHT)),
        both(a.symmetry_score, b.symmetry_score).map(|(x, y)| (1.0 - (x - y).abs(), SYMMETRY_WEIGHT)),
        match (&a.contour_features, &b.contour_features) {
            (Some(x), Some(y)) => {
                let similarity = if x == y { 1.0 } else { CONTOUR_MISMATCH };
                Some((similarity, CONTOUR_WEIGHT))
            }
            _ => None,
        },
    ];

    let (weighted, total) = terms
        .iter()
        .flatten()
        .fold((0.0, 0.0), |(sum, weight), (s, w)| (sum + s * w, weight + w));

    if total > 0.0 {
        weighted / total
    } else {
        0.0
    }
}

fn both(a: Option<f64>, b: Option<f64>) -> Option<(f64, f64)> {
    a.zip(b)
}
