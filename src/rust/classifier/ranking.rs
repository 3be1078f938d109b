use std::cmp::Ordering;

/// Returns class indices ordered by descending score.
///
/// The sort is stable, so exactly equal scores keep ascending index order.
/// NaN scores rank below every number.
pub(crate) fn rank_scores(scores: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| descending(scores[a], scores[b]));
    order
}

fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => b.total_cmp(&a),
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
    }
}

/// Converts a raw output score into a confidence in `[0, 1]`.
///
/// Floating models already emit probabilities; quantized models emit bytes.
#[inline]
pub(crate) fn normalize_confidence(raw: f32, floating: bool) -> f32 {
    if floating {
        raw
    } else {
        raw / 255.0
    }
}

/// Walks `order` and yields `(index, confidence)` until the first confidence
/// below `min_confidence`.
///
/// This is a prefix of the ranked list, not a filter over it. The two agree
/// only because `order` is already sorted by descending score.
pub(crate) fn ranked_prefix<'a>(
    scores: &'a [f32],
    order: &'a [usize],
    floating: bool,
    min_confidence: Option<f32>,
) -> impl Iterator<Item = (usize, f32)> + 'a {
    order
        .iter()
        .map(move |&index| (index, normalize_confidence(scores[index], floating)))
        .take_while(move |&(_, confidence)| match min_confidence {
            Some(threshold) => confidence >= threshold,
            None => true,
        })
}
