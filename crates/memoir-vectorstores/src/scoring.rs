use crate::index::Metric;

/// Map a raw index value onto a normalized similarity score in `(0, 1]`.
///
/// For L2 the raw value is a distance where 0 means identical: an exact
/// match scores exactly 1.0, everything else `1 / (1 + distance)`,
/// decreasing monotonically and approaching 0 asymptotically. An
/// inner-product value is a similarity, so it is first folded into the
/// same distance form (`max(0, 1 - similarity)`), keeping the score range
/// and direction consistent across metrics.
pub fn normalize_score(metric: Metric, raw: f32) -> f32 {
    let distance = match metric {
        Metric::L2 => raw,
        Metric::InnerProduct => (1.0 - raw).max(0.0),
    };
    if distance == 0.0 {
        1.0
    } else {
        1.0 / (1.0 + distance)
    }
}
