//! Regression trends and z-score outliers over cycle history.

use crate::domain::models::{
    Anomaly, GrowthClass, HistoricalRecord, MetricName, Trend, TrendDirection,
};

/// Slope magnitude separating a directional trend from a flat one.
pub const DIRECTION_THRESHOLD: f64 = 0.1;

/// Standard deviations below the mean that make a value anomalous.
pub const ANOMALY_Z_THRESHOLD: f64 = -1.5;

/// Minimum series length for anomaly detection.
pub const MIN_ANOMALY_SAMPLES: usize = 3;

/// Ordinary least-squares slope of `series` against its index.
///
/// Zero for fewer than two samples or when the fit is undefined.
#[allow(clippy::cast_precision_loss)]
pub fn slope(series: &[f64]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }

    let n = series.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = series.iter().sum::<f64>() / n;

    let (num, den) = series
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, &y)| {
            let dx = i as f64 - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });

    let slope = num / den;
    if slope.is_finite() {
        slope
    } else {
        0.0
    }
}

/// Direction of a slope. Slopes within the flat threshold count as flat.
pub fn classify_direction(slope: f64) -> TrendDirection {
    if slope > DIRECTION_THRESHOLD {
        TrendDirection::Upward
    } else if slope < -DIRECTION_THRESHOLD {
        TrendDirection::Downward
    } else {
        TrendDirection::Flat
    }
}

/// Classify the pace of change of `slope` over a time span in milliseconds.
#[allow(clippy::cast_precision_loss)]
pub fn classify_growth(slope: f64, span_ms: i64) -> GrowthClass {
    let normalized = slope * span_ms as f64;
    if normalized > 1.0 {
        GrowthClass::Exponential
    } else if normalized > 0.2 {
        GrowthClass::Incremental
    } else if normalized < -0.2 {
        GrowthClass::Declining
    } else {
        GrowthClass::Stagnant
    }
}

/// Indices and z-scores of values far below the series mean.
///
/// One-sided: only negative deviations are reported. Nothing is flagged when
/// the series is shorter than `min_len` or has no spread.
#[allow(clippy::cast_precision_loss)]
pub fn find_anomalies(series: &[f64], min_len: usize) -> Vec<(usize, f64)> {
    if series.len() < min_len || series.is_empty() {
        return Vec::new();
    }

    let n = series.len() as f64;
    let mean = series.iter().sum::<f64>() / n;
    let variance = series.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 || !std_dev.is_finite() {
        return Vec::new();
    }

    series
        .iter()
        .enumerate()
        .filter_map(|(i, v)| {
            let z = (v - mean) / std_dev;
            (z < ANOMALY_Z_THRESHOLD).then_some((i, z))
        })
        .collect()
}

/// Trends for every tracked metric with at least two recorded values.
pub fn analyze_trends(history: &[HistoricalRecord]) -> Vec<Trend> {
    let (Some(first), Some(last)) = (history.first(), history.last()) else {
        return Vec::new();
    };
    if history.len() < 2 {
        return Vec::new();
    }
    let span_ms = (last.timestamp - first.timestamp).num_milliseconds();

    MetricName::TRENDED
        .into_iter()
        .filter_map(|metric| {
            let values: Vec<f64> = history.iter().filter_map(|r| r.metrics.get(metric)).collect();
            if values.len() < 2 {
                return None;
            }
            let slope = slope(&values);
            Some(Trend {
                metric,
                direction: classify_direction(slope),
                slope,
                growth: classify_growth(slope, span_ms),
            })
        })
        .collect()
}

/// Records whose scanned metrics fall far below their history mean.
pub fn detect_anomalies(history: &[HistoricalRecord]) -> Vec<Anomaly> {
    if history.len() < MIN_ANOMALY_SAMPLES {
        return Vec::new();
    }

    MetricName::ANOMALY_SCANNED
        .into_iter()
        .flat_map(|metric| {
            let points: Vec<(&HistoricalRecord, f64)> = history
                .iter()
                .filter_map(|r| r.metrics.get(metric).map(|v| (r, v)))
                .collect();
            let values: Vec<f64> = points.iter().map(|(_, v)| *v).collect();

            find_anomalies(&values, MIN_ANOMALY_SAMPLES)
                .into_iter()
                .map(|(i, z)| Anomaly {
                    metric,
                    record: points[i].0.clone(),
                    z_deviation: z,
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::PerformanceMetrics;
    use chrono::{Duration, TimeZone, Utc};

    fn history(solution: &[f64]) -> Vec<HistoricalRecord> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        solution
            .iter()
            .enumerate()
            .map(|(i, &s)| {
                HistoricalRecord::pending(format!("cycle {i}"))
                    .with_timestamp(start + Duration::minutes(i64::try_from(i).unwrap()))
                    .with_metrics(PerformanceMetrics {
                        solution_quality: s,
                        coordinator_performance: 3.0,
                        directive_quality: 3.0,
                        ..PerformanceMetrics::default()
                    })
            })
            .collect()
    }

    #[test]
    fn test_slope_basics() {
        assert!((slope(&[1.0, 2.0, 3.0, 4.0, 5.0]) - 1.0).abs() < 1e-9);
        assert!(slope(&[3.0, 3.0, 3.0, 3.0]).abs() < f64::EPSILON);
        assert!(slope(&[]).abs() < f64::EPSILON);
        assert!(slope(&[7.0]).abs() < f64::EPSILON);
        assert!(slope(&[5.0, 3.0, 1.0]) < 0.0);
    }

    #[test]
    fn test_direction_thresholds() {
        assert_eq!(classify_direction(0.5), TrendDirection::Upward);
        assert_eq!(classify_direction(-0.5), TrendDirection::Downward);
        assert_eq!(classify_direction(0.1), TrendDirection::Flat);
    }

    #[test]
    fn test_growth_classes() {
        assert_eq!(classify_growth(0.01, 1000), GrowthClass::Exponential);
        assert_eq!(classify_growth(0.0005, 1000), GrowthClass::Incremental);
        assert_eq!(classify_growth(-0.001, 1000), GrowthClass::Declining);
        assert_eq!(classify_growth(0.0, 1000), GrowthClass::Stagnant);
    }

    #[test]
    fn test_find_anomalies() {
        let flagged = find_anomalies(&[5.0, 5.0, 5.0, 5.0, 0.0], MIN_ANOMALY_SAMPLES);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].0, 4);
        assert!((flagged[0].1 + 2.0).abs() < 1e-9);

        assert!(find_anomalies(&[5.0, 5.0, 5.0], MIN_ANOMALY_SAMPLES).is_empty());
        assert!(find_anomalies(&[1.0, 5.0], MIN_ANOMALY_SAMPLES).is_empty());
    }

    #[test]
    fn test_high_outliers_are_not_flagged() {
        assert!(find_anomalies(&[1.0, 1.0, 1.0, 1.0, 9.0], MIN_ANOMALY_SAMPLES).is_empty());
    }

    #[test]
    fn test_analyze_trends_skips_sparse_metrics() {
        let trends = analyze_trends(&history(&[1.0, 2.0, 3.0]));
        let metrics: Vec<MetricName> = trends.iter().map(|t| t.metric).collect();
        assert_eq!(
            metrics,
            vec![
                MetricName::SolutionQuality,
                MetricName::CoordinatorPerformance,
                MetricName::DirectiveQuality
            ]
        );
        assert_eq!(trends[0].direction, TrendDirection::Upward);
        assert_eq!(trends[0].growth, GrowthClass::Exponential);
        assert_eq!(trends[1].direction, TrendDirection::Flat);
    }

    #[test]
    fn test_detect_anomalies_returns_offending_record() {
        let anomalies = detect_anomalies(&history(&[5.0, 5.0, 5.0, 5.0, 0.0]));
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].metric, MetricName::SolutionQuality);
        assert_eq!(anomalies[0].record.suggestion_text, "cycle 4");
    }

    #[test]
    fn test_short_history_has_no_analysis() {
        assert!(analyze_trends(&history(&[3.0])).is_empty());
        assert!(detect_anomalies(&history(&[5.0, 0.0])).is_empty());
    }
}
