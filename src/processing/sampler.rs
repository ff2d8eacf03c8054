//! Averaging of repeated USBL fixes

use crate::core::{AveragedFix, NavResult, NavigationError, RelativeFix};
use crate::hardware::PositioningSource;
use log::{info, warn};
use nalgebra::Vector2;

/// Collects a fixed number of fixes and reduces them to their mean
#[derive(Debug, Clone)]
pub struct PositionSampler {
    sample_count: usize,
    /// Rejection threshold in standard deviations, if enabled
    outlier_threshold: Option<f64>,
}

impl PositionSampler {
    pub fn new(sample_count: usize) -> Self {
        Self { sample_count, outlier_threshold: None }
    }

    /// Drop fixes further than `threshold` standard deviations from the mean
    /// before averaging. Only applied when at least three fixes were read.
    pub fn with_outlier_rejection(mut self, threshold: f64) -> Self {
        self.outlier_threshold = Some(threshold);
        self
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Read `sample_count` fixes and return their mean.
    ///
    /// Individual read failures are skipped; sampling only fails when no fix
    /// at all was obtained.
    pub fn sample(&self, source: &mut dyn PositioningSource) -> NavResult<AveragedFix> {
        info!("Reading {} fixes from {}", self.sample_count, source.describe());

        let mut fixes = Vec::with_capacity(self.sample_count);
        for attempt in 1..=self.sample_count {
            match source.read_fix() {
                Ok(fix) if fix.is_finite() => {
                    info!("Fix {}: x={:.2}m, y={:.2}m", attempt, fix.x, fix.y);
                    fixes.push(fix);
                }
                Ok(fix) => warn!("Discarding non-finite fix {}: {:?}", attempt, fix),
                Err(e) => warn!("Fix {} failed: {}", attempt, e),
            }
        }

        if fixes.is_empty() {
            return Err(NavigationError::NoFix { attempts: self.sample_count });
        }

        let kept = match self.outlier_threshold {
            Some(threshold) if fixes.len() >= 3 => reject_outliers(&fixes, threshold),
            _ => fixes,
        };

        let mean = mean_offset(&kept);
        let timestamp_ms = kept.iter().map(|f| f.timestamp_ms).max().unwrap_or(0);
        let averaged = AveragedFix {
            x: mean.x,
            y: mean.y,
            sample_count: kept.len(),
            attempts: self.sample_count,
            timestamp_ms,
        };

        info!(
            "Average fix: x={:.2}m, y={:.2}m from {}/{} reads",
            averaged.x, averaged.y, averaged.sample_count, averaged.attempts
        );
        Ok(averaged)
    }
}

fn mean_offset(fixes: &[RelativeFix]) -> Vector2<f64> {
    let sum = fixes
        .iter()
        .fold(Vector2::zeros(), |acc: Vector2<f64>, f| acc + f.offset());
    sum / fixes.len() as f64
}

fn reject_outliers(fixes: &[RelativeFix], threshold: f64) -> Vec<RelativeFix> {
    let mean = mean_offset(fixes);
    let distances: Vec<f64> = fixes.iter().map(|f| (f.offset() - mean).norm()).collect();
    let variance = distances.iter().map(|d| d * d).sum::<f64>() / distances.len() as f64;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return fixes.to_vec();
    }

    let kept: Vec<RelativeFix> = fixes
        .iter()
        .zip(&distances)
        .filter(|(_, d)| **d <= threshold * std_dev)
        .map(|(f, _)| *f)
        .collect();

    if kept.is_empty() {
        return fixes.to_vec();
    }

    let dropped = fixes.len() - kept.len();
    if dropped > 0 {
        warn!("Rejected {} outlier fixes beyond {:.1} sigma", dropped, threshold);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{CommError, MockPositioningSource};

    #[test]
    fn test_average_of_three_fixes() {
        let mut source = MockPositioningSource::new("usbl");
        source.push_fix(1.0, 1.0);
        source.push_fix(3.0, 3.0);
        source.push_fix(2.0, 2.0);

        let averaged = PositionSampler::new(3).sample(&mut source).unwrap();
        assert_eq!(averaged.x, 2.0);
        assert_eq!(averaged.y, 2.0);
        assert_eq!(averaged.sample_count, 3);
    }

    #[test]
    fn test_no_successful_reads_is_no_fix() {
        let mut source = MockPositioningSource::new("usbl");
        for _ in 0..4 {
            source.push_error(CommError::Timeout { timeout_ms: 100 });
        }

        let result = PositionSampler::new(4).sample(&mut source);
        assert_eq!(result, Err(NavigationError::NoFix { attempts: 4 }));
        assert_eq!(source.read_count(), 4);
    }

    #[test]
    fn test_single_success_returned_unchanged() {
        let mut source = MockPositioningSource::new("usbl");
        source.push_error(CommError::Timeout { timeout_ms: 100 });
        source.push_fix(-8.5, 8.54);
        source.push_error(CommError::InvalidMessage { details: "bad frame".to_string() });

        let averaged = PositionSampler::new(3).sample(&mut source).unwrap();
        assert_eq!(averaged.x, -8.5);
        assert_eq!(averaged.y, 8.54);
        assert_eq!(averaged.sample_count, 1);
        assert_eq!(averaged.attempts, 3);
    }

    #[test]
    fn test_no_retry_beyond_sample_count() {
        let mut source = MockPositioningSource::new("usbl");
        source.push_error(CommError::Timeout { timeout_ms: 100 });
        source.push_error(CommError::Timeout { timeout_ms: 100 });
        source.push_fix(1.0, 1.0);

        let result = PositionSampler::new(2).sample(&mut source);
        assert!(matches!(result, Err(NavigationError::NoFix { .. })));
        assert_eq!(source.queued_count(), 1);
    }

    #[test]
    fn test_zero_sample_count_fails() {
        let mut source = MockPositioningSource::new("usbl");
        source.push_fix(1.0, 1.0);
        let result = PositionSampler::new(0).sample(&mut source);
        assert_eq!(result, Err(NavigationError::NoFix { attempts: 0 }));
    }

    #[test]
    fn test_non_finite_fix_discarded() {
        let mut source = MockPositioningSource::new("usbl");
        source.push_fix(f64::NAN, 1.0);
        source.push_fix(4.0, 6.0);

        let averaged = PositionSampler::new(2).sample(&mut source).unwrap();
        assert_eq!((averaged.x, averaged.y), (4.0, 6.0));
    }

    #[test]
    fn test_outlier_rejection() {
        let mut source = MockPositioningSource::new("usbl");
        for _ in 0..9 {
            source.push_fix(10.0, 10.0);
        }
        source.push_fix(200.0, -150.0);

        let averaged = PositionSampler::new(10)
            .with_outlier_rejection(2.0)
            .sample(&mut source)
            .unwrap();
        assert_eq!(averaged.sample_count, 9);
        assert!((averaged.x - 10.0).abs() < 1e-9);
        assert!((averaged.y - 10.0).abs() < 1e-9);
    }
}
