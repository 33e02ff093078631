//! Spline math engine: Catmull-Rom, cubic, linear, and extrapolate curve
//! evaluation, shared by the `/ws/spline-live` broadcast loop, the
//! `/api/spline/*` endpoints, and the curve-detection collaborator.

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Evaluates a centripetal Catmull-Rom spline through `control_points` at
/// `sample_count` evenly spaced parameter values, matching the warmup
/// synthetic's "100-point Catmull-Rom" contract.
#[must_use]
pub fn catmull_rom(control_points: &[Point], sample_count: usize) -> Vec<Point> {
    if control_points.len() < 2 || sample_count == 0 {
        return control_points.to_vec();
    }
    if control_points.len() == 2 {
        return linear(control_points, sample_count);
    }

    let segments = control_points.len() - 1;
    let mut out = Vec::with_capacity(sample_count);

    for i in 0..sample_count {
        let t_global = i as f64 / (sample_count - 1).max(1) as f64 * segments as f64;
        let segment = (t_global.floor() as usize).min(segments - 1);
        let t = t_global - segment as f64;

        let p0 = control_points[segment.saturating_sub(1)];
        let p1 = control_points[segment];
        let p2 = control_points[(segment + 1).min(control_points.len() - 1)];
        let p3 = control_points[(segment + 2).min(control_points.len() - 1)];

        out.push(catmull_rom_segment(p0, p1, p2, p3, t));
    }
    out
}

fn catmull_rom_segment(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let t2 = t * t;
    let t3 = t2 * t;
    let x = 0.5
        * ((2.0 * p1.x)
            + (-p0.x + p2.x) * t
            + (2.0 * p0.x - 5.0 * p1.x + 4.0 * p2.x - p3.x) * t2
            + (-p0.x + 3.0 * p1.x - 3.0 * p2.x + p3.x) * t3);
    let y = 0.5
        * ((2.0 * p1.y)
            + (-p0.y + p2.y) * t
            + (2.0 * p0.y - 5.0 * p1.y + 4.0 * p2.y - p3.y) * t2
            + (-p0.y + 3.0 * p1.y - 3.0 * p2.y + p3.y) * t3);
    Point { x, y }
}

/// Natural cubic spline through every control point, parameterized by
/// index (uniform knot spacing). Unlike `catmull_rom`, which blends four
/// local points per segment, this solves one tridiagonal system per axis
/// for the second derivatives that make the whole curve C2-continuous with
/// zero curvature at both ends — the standard "natural" boundary condition.
#[must_use]
pub fn cubic(control_points: &[Point], sample_count: usize) -> Vec<Point> {
    if control_points.len() < 2 || sample_count == 0 {
        return control_points.to_vec();
    }
    if control_points.len() < 3 {
        return linear(control_points, sample_count);
    }

    let xs: Vec<f64> = control_points.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = control_points.iter().map(|p| p.y).collect();
    let mx = natural_second_derivatives(&xs);
    let my = natural_second_derivatives(&ys);

    let segments = control_points.len() - 1;
    (0..sample_count)
        .map(|i| {
            let t_global = i as f64 / (sample_count - 1).max(1) as f64 * segments as f64;
            let segment = (t_global.floor() as usize).min(segments - 1);
            let s = t_global - segment as f64;
            Point {
                x: cubic_segment(xs[segment], xs[segment + 1], mx[segment], mx[segment + 1], s),
                y: cubic_segment(ys[segment], ys[segment + 1], my[segment], my[segment + 1], s),
            }
        })
        .collect()
}

/// Second derivatives at each of `values`' uniformly spaced knots (`h = 1`),
/// solved via the Thomas algorithm with natural (zero-curvature) boundary
/// conditions at both ends.
fn natural_second_derivatives(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut sub = vec![0.0; n];
    let mut diag = vec![1.0; n];
    let mut sup = vec![0.0; n];
    let mut rhs = vec![0.0; n];

    for i in 1..n - 1 {
        sub[i] = 1.0;
        diag[i] = 4.0;
        sup[i] = 1.0;
        rhs[i] = 6.0 * (values[i - 1] - 2.0 * values[i] + values[i + 1]);
    }

    // Forward elimination.
    for i in 1..n {
        let factor = sub[i] / diag[i - 1];
        diag[i] -= factor * sup[i - 1];
        rhs[i] -= factor * rhs[i - 1];
    }

    // Back-substitution.
    let mut m = vec![0.0; n];
    m[n - 1] = rhs[n - 1] / diag[n - 1];
    for i in (0..n - 1).rev() {
        m[i] = (rhs[i] - sup[i] * m[i + 1]) / diag[i];
    }
    m
}

/// Evaluates one unit-spaced segment `[y_i, y_{i+1}]` of a natural cubic
/// spline at local parameter `s ∈ [0, 1]`, given the second derivatives at
/// both endpoints.
fn cubic_segment(y_i: f64, y_i1: f64, m_i: f64, m_i1: f64, s: f64) -> f64 {
    let one_minus_s = 1.0 - s;
    (one_minus_s * y_i)
        + (s * y_i1)
        + ((one_minus_s.powi(3) - one_minus_s) * m_i + (s.powi(3) - s) * m_i1) / 6.0
}

/// Straight-line interpolation between consecutive control points.
#[must_use]
pub fn linear(control_points: &[Point], sample_count: usize) -> Vec<Point> {
    if control_points.len() < 2 || sample_count == 0 {
        return control_points.to_vec();
    }
    let segments = control_points.len() - 1;
    (0..sample_count)
        .map(|i| {
            let t_global = i as f64 / (sample_count - 1).max(1) as f64 * segments as f64;
            let segment = (t_global.floor() as usize).min(segments - 1);
            let t = t_global - segment as f64;
            let a = control_points[segment];
            let b = control_points[segment + 1];
            Point {
                x: a.x + (b.x - a.x) * t,
                y: a.y + (b.y - a.y) * t,
            }
        })
        .collect()
}

/// Linear extrapolation beyond the last two control points, `count`
/// additional samples spaced at the same interval as the final segment.
#[must_use]
pub fn extrapolate(control_points: &[Point], count: usize) -> Vec<Point> {
    let Some(&second_last) = control_points.get(control_points.len().wrapping_sub(2)) else {
        return Vec::new();
    };
    let Some(&last) = control_points.last() else {
        return Vec::new();
    };
    let dx = last.x - second_last.x;
    let dy = last.y - second_last.y;
    (1..=count)
        .map(|i| Point {
            x: last.x + dx * i as f64,
            y: last.y + dy * i as f64,
        })
        .collect()
}

/// A deterministic 100-point synthetic curve, used both by the warmup
/// self-check and by tests.
#[must_use]
pub fn synthetic_control_points(count: usize) -> Vec<Point> {
    (0..count)
        .map(|i| {
            let t = i as f64 / count.max(1) as f64;
            Point {
                x: t * 10.0,
                y: (t * std::f64::consts::TAU).sin(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catmull_rom_passes_through_endpoints() {
        let points = vec![
            Point { x: 0.0, y: 0.0 },
            Point { x: 1.0, y: 1.0 },
            Point { x: 2.0, y: 0.0 },
            Point { x: 3.0, y: 1.0 },
        ];
        let rendered = catmull_rom(&points, 50);
        assert_eq!(rendered.len(), 50);
        assert!((rendered.first().unwrap().x - 0.0).abs() < 1e-6);
    }

    #[test]
    fn cubic_passes_through_endpoints() {
        let points = vec![
            Point { x: 0.0, y: 0.0 },
            Point { x: 1.0, y: 1.0 },
            Point { x: 2.0, y: 0.0 },
            Point { x: 3.0, y: 1.0 },
        ];
        let rendered = cubic(&points, 40);
        assert_eq!(rendered.len(), 40);
        assert!((rendered.first().unwrap().x - 0.0).abs() < 1e-6);
        assert!((rendered.last().unwrap().x - 3.0).abs() < 1e-6);
    }

    #[test]
    fn cubic_reduces_to_linear_for_collinear_points() {
        let points = vec![
            Point { x: 0.0, y: 0.0 },
            Point { x: 1.0, y: 1.0 },
            Point { x: 2.0, y: 2.0 },
        ];
        let rendered = cubic(&points, 5);
        for p in &rendered {
            assert!((p.y - p.x).abs() < 1e-9);
        }
    }

    #[test]
    fn cubic_diverges_from_catmull_rom_on_curved_input() {
        let points = vec![
            Point { x: 0.0, y: 0.0 },
            Point { x: 1.0, y: 3.0 },
            Point { x: 2.0, y: -2.0 },
            Point { x: 3.0, y: 4.0 },
            Point { x: 4.0, y: 0.0 },
        ];
        let a = cubic(&points, 25);
        let b = catmull_rom(&points, 25);
        assert!(a.iter().zip(b.iter()).any(|(p, q)| (p.y - q.y).abs() > 1e-3));
    }

    #[test]
    fn linear_interpolates_midpoint() {
        let points = vec![Point { x: 0.0, y: 0.0 }, Point { x: 10.0, y: 10.0 }];
        let rendered = linear(&points, 3);
        assert_eq!(rendered.len(), 3);
        assert!((rendered[1].x - 5.0).abs() < 1e-6);
    }

    #[test]
    fn extrapolate_continues_last_segment_direction() {
        let points = vec![Point { x: 0.0, y: 0.0 }, Point { x: 1.0, y: 2.0 }];
        let extrapolated = extrapolate(&points, 2);
        assert_eq!(extrapolated[0], Point { x: 2.0, y: 4.0 });
        assert_eq!(extrapolated[1], Point { x: 3.0, y: 6.0 });
    }

    #[test]
    fn synthetic_points_are_deterministic() {
        assert_eq!(synthetic_control_points(100), synthetic_control_points(100));
    }
}
