use hypercycle::domain::models::TrendDirection;
use hypercycle::services::trend_analyzer::{
    classify_direction, find_anomalies, slope, ANOMALY_Z_THRESHOLD, MIN_ANOMALY_SAMPLES,
};
use proptest::prelude::*;

proptest! {
    /// Property: a constant series has no slope and no anomalies
    #[test]
    fn prop_constant_series_is_flat(value in -100.0f64..100.0, len in 0usize..20) {
        let series = vec![value; len];
        prop_assert!(slope(&series).abs() < 1e-9);
        prop_assert!(find_anomalies(&series, MIN_ANOMALY_SAMPLES).is_empty());
    }

    /// Property: a linear series recovers its step as the slope
    #[test]
    fn prop_linear_series_slope(start in -50.0f64..50.0, step in -5.0f64..5.0, len in 2usize..30) {
        #[allow(clippy::cast_precision_loss)]
        let series: Vec<f64> = (0..len).map(|i| start + step * i as f64).collect();
        prop_assert!((slope(&series) - step).abs() < 1e-6);
    }

    /// Property: shifting a series does not change its slope
    #[test]
    fn prop_slope_shift_invariant(
        series in proptest::collection::vec(-100.0f64..100.0, 2..20),
        shift in -100.0f64..100.0,
    ) {
        let shifted: Vec<f64> = series.iter().map(|v| v + shift).collect();
        prop_assert!((slope(&series) - slope(&shifted)).abs() < 1e-6);
    }

    /// Property: the direction follows the slope's sign beyond the threshold
    #[test]
    fn prop_direction_matches_sign(s in -10.0f64..10.0) {
        let direction = classify_direction(s);
        if s > 0.1 {
            prop_assert_eq!(direction, TrendDirection::Upward);
        } else if s < -0.1 {
            prop_assert_eq!(direction, TrendDirection::Downward);
        } else {
            prop_assert_eq!(direction, TrendDirection::Flat);
        }
    }

    /// Property: flagged values sit below the mean past the z threshold
    #[test]
    fn prop_anomalies_are_low_outliers(series in proptest::collection::vec(0.0f64..10.0, 0..25)) {
        #[allow(clippy::cast_precision_loss)]
        let mean = if series.is_empty() { 0.0 } else { series.iter().sum::<f64>() / series.len() as f64 };
        for (index, z) in find_anomalies(&series, MIN_ANOMALY_SAMPLES) {
            prop_assert!(z < ANOMALY_Z_THRESHOLD);
            prop_assert!(series[index] < mean);
        }
        if series.len() < MIN_ANOMALY_SAMPLES {
            prop_assert!(find_anomalies(&series, MIN_ANOMALY_SAMPLES).is_empty());
        }
    }
}

#[test]
fn test_reference_series() {
    assert!(slope(&[1.0, 2.0, 3.0, 4.0, 5.0]) > 0.0);
    assert!(slope(&[3.0, 3.0, 3.0, 3.0]).abs() < f64::EPSILON);
    assert!(slope(&[]).abs() < f64::EPSILON);

    let flagged = find_anomalies(&[5.0, 5.0, 5.0, 5.0, 0.0], MIN_ANOMALY_SAMPLES);
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].0, 4);
    assert!(find_anomalies(&[5.0, 5.0, 5.0], MIN_ANOMALY_SAMPLES).is_empty());
}
