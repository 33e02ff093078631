//! `gaugeWNBATOR(tensor) -> result`, backing `/api/gauge/womens-sports`.
//!
//! Pure function over a flat numeric tensor: reduces it to a normalized
//! score plus a confidence derived from sample spread.

use serde::{Deserialize, Serialize};

pub type Tensor = Vec<f64>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GaugeResult {
    pub score: f64,
    pub confidence: f64,
    pub category: &'static str,
    pub samples: usize,
}

pub trait GaugeEngine: Send + Sync {
    fn gauge_wnbator(&self, tensor: &Tensor) -> GaugeResult;
}

pub struct DefaultGaugeEngine;

impl GaugeEngine for DefaultGaugeEngine {
    fn gauge_wnbator(&self, tensor: &Tensor) -> GaugeResult {
        if tensor.is_empty() {
            return GaugeResult {
                score: 0.0,
                confidence: 0.0,
                category: "insufficient",
                samples: 0,
            };
        }

        let n = tensor.len() as f64;
        let mean = tensor.iter().sum::<f64>() / n;
        let variance = tensor.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let stddev = variance.sqrt();

        let score = mean.clamp(-1.0, 1.0);
        let confidence = (1.0 / (1.0 + stddev)).clamp(0.0, 1.0);
        let category = category_for(score, confidence);

        GaugeResult {
            score,
            confidence,
            category,
            samples: tensor.len(),
        }
    }
}

fn category_for(score: f64, confidence: f64) -> &'static str {
    if confidence < 0.2 {
        "noisy"
    } else if score >= 0.5 {
        "strong-positive"
    } else if score >= 0.0 {
        "positive"
    } else if score >= -0.5 {
        "negative"
    } else {
        "strong-negative"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tensor_is_insufficient() {
        let engine = DefaultGaugeEngine;
        let result = engine.gauge_wnbator(&vec![]);
        assert_eq!(result.category, "insufficient");
        assert_eq!(result.samples, 0);
    }

    #[test]
    fn uniform_tensor_has_high_confidence() {
        let engine = DefaultGaugeEngine;
        let result = engine.gauge_wnbator(&vec![0.6, 0.6, 0.6, 0.6]);
        assert_eq!(result.samples, 4);
        assert!(result.confidence > 0.9);
        assert_eq!(result.category, "strong-positive");
    }

    #[test]
    fn scattered_tensor_has_lower_confidence() {
        let engine = DefaultGaugeEngine;
        let result = engine.gauge_wnbator(&vec![-1.0, 1.0, -1.0, 1.0]);
        assert!(result.confidence < 0.5);
    }

    #[test]
    fn score_stays_within_bounds() {
        let engine = DefaultGaugeEngine;
        let result = engine.gauge_wnbator(&vec![5.0, 5.0, 5.0]);
        assert!((-1.0..=1.0).contains(&result.score));
    }
}
