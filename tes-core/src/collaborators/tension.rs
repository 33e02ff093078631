//! `mapEdgeRelation(conflict, entropy, tension) -> {color, opacity, width, meta}`.
//!
//! Pure function: same inputs always produce the same HEX color, opacity,
//! width bucket, and relation label, which is what the round-trip testable
//! property requires.

use serde::{Deserialize, Serialize};

/// HEX-formatted color plus the opacity/width/meta bundle `mapEdgeRelation`
/// returns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EdgeRelation {
    pub color: Color,
    pub opacity: f64,
    pub width: u8,
    pub meta: TensionMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Color {
    #[serde(rename = "HEX")]
    pub hex: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TensionMeta {
    pub conflict: f64,
    pub entropy: f64,
    pub tension: f64,
    pub relation: &'static str,
}

pub trait TensionEngine: Send + Sync {
    fn map_edge_relation(&self, conflict: f64, entropy: f64, tension: f64) -> EdgeRelation;
}

pub struct DefaultTensionEngine;

impl TensionEngine for DefaultTensionEngine {
    fn map_edge_relation(&self, conflict: f64, entropy: f64, tension: f64) -> EdgeRelation {
        let conflict = conflict.clamp(0.0, 1.0);
        let entropy = entropy.clamp(0.0, 1.0);
        let tension = tension.clamp(0.0, 1.0);

        let magnitude = (conflict + entropy + tension) / 3.0;
        let relation = relation_for(magnitude);
        let width = width_for(magnitude);
        let opacity = (0.2 + entropy * 0.8).clamp(0.0, 1.0);
        let hex = color_for(conflict, magnitude);

        EdgeRelation {
            color: Color { hex },
            opacity,
            width,
            meta: TensionMeta {
                conflict,
                entropy,
                tension,
                relation,
            },
        }
    }
}

fn relation_for(magnitude: f64) -> &'static str {
    if magnitude >= 0.75 {
        "extreme"
    } else if magnitude >= 0.5 {
        "intense"
    } else if magnitude >= 0.25 {
        "moderate"
    } else {
        "temperate"
    }
}

fn width_for(magnitude: f64) -> u8 {
    if magnitude >= 0.75 {
        4
    } else if magnitude >= 0.5 {
        3
    } else if magnitude >= 0.25 {
        2
    } else {
        1
    }
}

/// Interpolates from a cool green (low conflict) to a hot red (high
/// conflict), with `magnitude` darkening the result so high-tension edges
/// read as more saturated.
fn color_for(conflict: f64, magnitude: f64) -> String {
    let r = (40.0 + conflict * 200.0).clamp(0.0, 255.0);
    let g = (200.0 - conflict * 160.0).clamp(0.0, 255.0);
    let b = (80.0 - magnitude * 60.0).clamp(0.0, 255.0);
    format!("#{:02X}{:02X}{:02X}", r as u8, g as u8, b as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_color_matches_format() {
        let engine = DefaultTensionEngine;
        let result = engine.map_edge_relation(1.0, 0.0, 0.0);
        let re_ok = result.color.hex.starts_with('#')
            && result.color.hex.len() == 7
            && result.color.hex[1..].chars().all(|c| c.is_ascii_hexdigit() && (c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert!(re_ok, "unexpected hex format: {}", result.color.hex);
    }

    #[test]
    fn opacity_and_width_stay_in_bounds() {
        let engine = DefaultTensionEngine;
        for i in 0..=10 {
            let v = i as f64 / 10.0;
            let result = engine.map_edge_relation(v, v, v);
            assert!((0.0..=1.0).contains(&result.opacity));
            assert!((1..=4).contains(&result.width));
        }
    }

    #[test]
    fn relation_buckets_follow_magnitude() {
        let engine = DefaultTensionEngine;
        assert_eq!(engine.map_edge_relation(0.0, 0.0, 0.0).meta.relation, "temperate");
        assert_eq!(engine.map_edge_relation(1.0, 1.0, 1.0).meta.relation, "extreme");
    }

    #[test]
    fn meta_echoes_clamped_inputs() {
        let engine = DefaultTensionEngine;
        let result = engine.map_edge_relation(0.3, 0.6, 0.9);
        assert_eq!(result.meta.conflict, 0.3);
        assert_eq!(result.meta.entropy, 0.6);
        assert_eq!(result.meta.tension, 0.9);
    }

    #[test]
    fn same_inputs_produce_identical_output() {
        let engine = DefaultTensionEngine;
        let a = engine.map_edge_relation(0.42, 0.17, 0.88);
        let b = engine.map_edge_relation(0.42, 0.17, 0.88);
        assert_eq!(a, b);
    }
}
