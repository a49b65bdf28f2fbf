//! Threshold checks run after every cycle.
//!
//! Compares the two most recent history records against the operator's
//! criteria. Checks run in a fixed order and the first violation wins, so the
//! same history and criteria always produce the same report.

use crate::domain::models::{FailSafeCriteria, FailSafeCriterion, FailSafeReport, HistoricalRecord};

/// Similarity above which two syntheses for different suggestions count as redundant.
pub const REDUNDANCY_SIMILARITY: f64 = 0.9;

/// Evaluate the latest cycle. Returns `None` with fewer than two records or no violation.
pub fn evaluate(history: &[HistoricalRecord], criteria: &FailSafeCriteria) -> Option<FailSafeReport> {
    let [.., prev, curr] = history else {
        return None;
    };

    check_cycle_duration(curr, criteria)
        .or_else(|| check_artifact_growth(prev, curr, criteria))
        .or_else(|| check_performance_drop(prev, curr, criteria))
        .or_else(|| check_bottlenecks(curr, criteria))
        .or_else(|| check_redundancy(prev, curr))
        .or_else(|| check_reuse_rate(curr, criteria))
}

/// Share of positions holding the same character in both texts, relative to
/// the longer text. Zero when either text is missing or empty.
#[allow(clippy::cast_precision_loss)]
pub fn positional_similarity(a: Option<&str>, b: Option<&str>) -> f64 {
    let (Some(a), Some(b)) = (a, b) else {
        return 0.0;
    };
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let longer = a.chars().count().max(b.chars().count());
    let matching = a.chars().zip(b.chars()).filter(|(x, y)| x == y).count();
    matching as f64 / longer as f64
}

fn check_cycle_duration(curr: &HistoricalRecord, criteria: &FailSafeCriteria) -> Option<FailSafeReport> {
    let duration = curr.cycle_duration_seconds?;
    (duration > criteria.max_cycle_duration_seconds).then(|| {
        FailSafeReport::new(
            FailSafeCriterion::MaxCycleDurationExceeded,
            format!(
                "Cycle duration was {duration}s, exceeding the maximum of {}s.",
                criteria.max_cycle_duration_seconds
            ),
        )
    })
}

#[allow(clippy::cast_precision_loss)]
fn check_artifact_growth(
    prev: &HistoricalRecord,
    curr: &HistoricalRecord,
    criteria: &FailSafeCriteria,
) -> Option<FailSafeReport> {
    let prev_len = char_len(prev.evolved_artifact_text.as_deref());
    if prev_len == 0 {
        return None;
    }
    let curr_len = char_len(curr.evolved_artifact_text.as_deref());

    let growth = (curr_len as f64 - prev_len as f64) / prev_len as f64 * 100.0;
    (growth < criteria.min_artifact_growth_rate_pct).then(|| {
        FailSafeReport::new(
            FailSafeCriterion::MinCodeGrowthRate,
            format!(
                "Code growth rate is {growth:.1}%, which is below the minimum threshold of {}%.",
                criteria.min_artifact_growth_rate_pct
            ),
        )
    })
}

fn check_performance_drop(
    prev: &HistoricalRecord,
    curr: &HistoricalRecord,
    criteria: &FailSafeCriteria,
) -> Option<FailSafeReport> {
    let scores = [
        (
            "Solution quality",
            prev.metrics.solution_quality,
            curr.metrics.solution_quality,
        ),
        (
            "Coordinator performance",
            prev.metrics.coordinator_performance,
            curr.metrics.coordinator_performance,
        ),
    ];

    scores.into_iter().find_map(|(label, before, after)| {
        if before <= 0.0 {
            return None;
        }
        let drop = (before - after) / before * 100.0;
        (drop > criteria.max_performance_drop_pct).then(|| {
            FailSafeReport::new(
                FailSafeCriterion::MaxPerformanceDrop,
                format!(
                    "{label} dropped by {drop:.1}%, more than the maximum allowed drop of {}%.",
                    criteria.max_performance_drop_pct
                ),
            )
        })
    })
}

fn check_bottlenecks(curr: &HistoricalRecord, criteria: &FailSafeCriteria) -> Option<FailSafeReport> {
    let count = curr.metrics.bottleneck_count?;
    (count > criteria.max_bottlenecks).then(|| {
        FailSafeReport::new(
            FailSafeCriterion::MaxBottlenecks,
            format!(
                "Unresolved bottlenecks count is {count}, exceeding the maximum of {}.",
                criteria.max_bottlenecks
            ),
        )
    })
}

fn check_redundancy(prev: &HistoricalRecord, curr: &HistoricalRecord) -> Option<FailSafeReport> {
    if curr.suggestion_text == prev.suggestion_text {
        return None;
    }
    let similarity = positional_similarity(
        curr.artifact_synthesis_text.as_deref(),
        prev.artifact_synthesis_text.as_deref(),
    );
    (similarity > REDUNDANCY_SIMILARITY).then(|| {
        FailSafeReport::new(
            FailSafeCriterion::MissingCodeReuse,
            format!(
                "Redundant code generated. New code is {:.0}% similar to the previous cycle's code for a different task.",
                similarity * 100.0
            ),
        )
    })
}

fn check_reuse_rate(curr: &HistoricalRecord, criteria: &FailSafeCriteria) -> Option<FailSafeReport> {
    let pct = curr.metrics.reuse_rate? * 100.0;
    (pct < criteria.min_reuse_rate_pct).then(|| {
        FailSafeReport::new(
            FailSafeCriterion::LowCodeReuseRate,
            format!(
                "Code reuse rate is {pct:.1}%, which is below the minimum threshold of {}%.",
                criteria.min_reuse_rate_pct
            ),
        )
    })
}

fn char_len(text: Option<&str>) -> usize {
    text.map_or(0, |t| t.chars().count())
}
