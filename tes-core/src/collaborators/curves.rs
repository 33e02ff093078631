//! `detectCurves(points, sensitivity) -> curves[]` and the `autoMaparse`
//! fallback that derives points from a flat price series first.
//!
//! Curvature is estimated from the discrete second derivative of a
//! Catmull-Rom-smoothed path: a run of samples whose curvature magnitude
//! stays above `sensitivity` becomes one reported curve.

use serde::{Deserialize, Serialize};

use crate::spline::{catmull_rom, Point};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Curve {
    pub start_index: usize,
    pub end_index: usize,
    pub direction: &'static str,
    pub magnitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaparseResult {
    pub curves: Vec<Curve>,
    pub sample_count: usize,
}

pub trait CurveDetector: Send + Sync {
    fn detect_curves(&self, points: &[Point], sensitivity: f64) -> Vec<Curve>;
    fn auto_maparse(&self, prices: &[f64]) -> MaparseResult;
}

pub struct DefaultCurveDetector;

impl CurveDetector for DefaultCurveDetector {
    fn detect_curves(&self, points: &[Point], sensitivity: f64) -> Vec<Curve> {
        if points.len() < 3 {
            return Vec::new();
        }
        let sensitivity = sensitivity.max(1e-9);

        let mut curves = Vec::new();
        let mut run_start: Option<usize> = None;
        let mut run_direction: Option<&'static str> = None;
        let mut run_peak = 0.0_f64;

        for i in 1..points.len() - 1 {
            let curvature = second_derivative(&points[i - 1], &points[i], &points[i + 1]);
            let above = curvature.abs() >= sensitivity;
            let direction = if curvature >= 0.0 { "convex" } else { "concave" };

            match (above, run_start) {
                (true, None) => {
                    run_start = Some(i - 1);
                    run_direction = Some(direction);
                    run_peak = curvature.abs();
                }
                (true, Some(_)) if run_direction == Some(direction) => {
                    run_peak = run_peak.max(curvature.abs());
                }
                (true, Some(start)) => {
                    curves.push(Curve {
                        start_index: start,
                        end_index: i,
                        direction: run_direction.unwrap_or("convex"),
                        magnitude: run_peak,
                    });
                    run_start = Some(i - 1);
                    run_direction = Some(direction);
                    run_peak = curvature.abs();
                }
                (false, Some(start)) => {
                    curves.push(Curve {
                        start_index: start,
                        end_index: i,
                        direction: run_direction.unwrap_or("convex"),
                        magnitude: run_peak,
                    });
                    run_start = None;
                    run_direction = None;
                    run_peak = 0.0;
                }
                (false, None) => {}
            }
        }

        if let Some(start) = run_start {
            curves.push(Curve {
                start_index: start,
                end_index: points.len() - 1,
                direction: run_direction.unwrap_or("convex"),
                magnitude: run_peak,
            });
        }

        curves
    }

    fn auto_maparse(&self, prices: &[f64]) -> MaparseResult {
        if prices.len() < 2 {
            return MaparseResult {
                curves: Vec::new(),
                sample_count: prices.len(),
            };
        }

        let control_points: Vec<Point> = prices
            .iter()
            .enumerate()
            .map(|(i, &price)| Point { x: i as f64, y: price })
            .collect();

        let sample_count = (prices.len() * 4).max(8);
        let smoothed = catmull_rom(&control_points, sample_count);
        let default_sensitivity = price_sensitivity(prices);
        let curves = self.detect_curves(&smoothed, default_sensitivity);

        MaparseResult {
            curves,
            sample_count: smoothed.len(),
        }
    }
}

fn second_derivative(p0: &Point, p1: &Point, p2: &Point) -> f64 {
    (p2.y - 2.0 * p1.y + p0.y) / 2.0
}

/// A sensitivity derived from the series' own volatility, used when the
/// caller (`autoMaparse`) has no explicit sensitivity to pass in.
fn price_sensitivity(prices: &[f64]) -> f64 {
    if prices.len() < 2 {
        return 1.0;
    }
    let mean = prices.iter().sum::<f64>() / prices.len() as f64;
    let variance = prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / prices.len() as f64;
    (variance.sqrt() * 0.1).max(1e-6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_points_have_no_curves() {
        let detector = DefaultCurveDetector;
        let points: Vec<Point> = (0..10).map(|i| Point { x: i as f64, y: 5.0 }).collect();
        let curves = detector.detect_curves(&points, 0.01);
        assert!(curves.is_empty());
    }

    #[test]
    fn sharp_peak_is_detected() {
        let detector = DefaultCurveDetector;
        let points = vec![
            Point { x: 0.0, y: 0.0 },
            Point { x: 1.0, y: 0.0 },
            Point { x: 2.0, y: 10.0 },
            Point { x: 3.0, y: 0.0 },
            Point { x: 4.0, y: 0.0 },
        ];
        let curves = detector.detect_curves(&points, 1.0);
        assert!(!curves.is_empty());
    }

    #[test]
    fn too_few_points_returns_empty() {
        let detector = DefaultCurveDetector;
        let points = vec![Point { x: 0.0, y: 0.0 }, Point { x: 1.0, y: 1.0 }];
        assert!(detector.detect_curves(&points, 0.1).is_empty());
    }

    #[test]
    fn auto_maparse_handles_short_series() {
        let detector = DefaultCurveDetector;
        let result = detector.auto_maparse(&[1.0]);
        assert_eq!(result.sample_count, 1);
        assert!(result.curves.is_empty());
    }

    #[test]
    fn auto_maparse_smooths_a_real_series() {
        let detector = DefaultCurveDetector;
        let prices = vec![10.0, 10.2, 10.1, 15.0, 10.3, 10.4, 10.2];
        let result = detector.auto_maparse(&prices);
        assert!(result.sample_count >= prices.len());
    }
}
