//! Bounded derivative-free minimization.
//!
//! A Powell conjugate-direction search over box-constrained parameters,
//! with a bracketing golden-section line search along each direction.
//! Every evaluation goes through a [`TrackedObjective`], and the result is
//! the best point ever evaluated rather than the point the search ends on:
//! under non-smooth objectives (L1 costs) the final iterate is not
//! guaranteed to be the best one visited.

use crate::error::{AnalysisError, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// `1 / phi`, the golden-section contraction ratio.
const INV_PHI: f64 = 0.618_033_988_749_895;
/// Bracket expansion ratio.
const PHI: f64 = 1.618_033_988_749_895;
/// Initial line-search step as a fraction of the widest parameter span.
const INITIAL_STEP: f64 = 0.01;

/// Stopping rules for [`minimize_bounded`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowellConfig {
    /// Absolute tolerance on the largest coordinate change per iteration
    pub tolerance_x: f64,
    /// Relative tolerance on the objective decrease per iteration
    pub tolerance_fx: f64,
    /// Maximum number of direction-set sweeps
    pub max_iterations: usize,
}

impl Default for PowellConfig {
    fn default() -> Self {
        Self {
            tolerance_x: 0.01,
            tolerance_fx: 0.01,
            max_iterations: 200,
        }
    }
}

/// Best objective value seen so far and where it was evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct BestPoint {
    pub value: f64,
    pub point: DVector<f64>,
}

/// Objective wrapper that records the best evaluation explicitly.
///
/// NaN objective values are treated as `+inf`.
pub struct TrackedObjective<F> {
    f: F,
    best: Option<BestPoint>,
    evaluations: usize,
}

impl<F> TrackedObjective<F>
where
    F: FnMut(&DVector<f64>) -> f64,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            best: None,
            evaluations: 0,
        }
    }

    pub fn evaluate(&mut self, x: &DVector<f64>) -> f64 {
        let raw = (self.f)(x);
        let value = if raw.is_nan() { f64::INFINITY } else { raw };
        self.evaluations += 1;
        let improved = self.best.as_ref().map_or(true, |b| value < b.value);
        if improved {
            self.best = Some(BestPoint {
                value,
                point: x.clone(),
            });
        }
        value
    }

    pub fn best(&self) -> Option<&BestPoint> {
        self.best.as_ref()
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn into_best(self) -> Option<BestPoint> {
        self.best
    }
}

/// Box constraints `lower <= x <= upper`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    lower: DVector<f64>,
    upper: DVector<f64>,
}

impl Bounds {
    pub fn new(lower: DVector<f64>, upper: DVector<f64>) -> Result<Self> {
        if lower.len() != upper.len() {
            return Err(AnalysisError::invalid(format!(
                "bounds have {} lower and {} upper entries",
                lower.len(),
                upper.len()
            )));
        }
        for (i, (&l, &u)) in lower.iter().zip(upper.iter()).enumerate() {
            if !l.is_finite() || !u.is_finite() || l > u {
                return Err(AnalysisError::invalid(format!(
                    "bad bounds [{l}, {u}] for dimension {i}"
                )));
            }
        }
        Ok(Self { lower, upper })
    }

    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    pub fn lower(&self) -> &DVector<f64> {
        &self.lower
    }

    pub fn upper(&self) -> &DVector<f64> {
        &self.upper
    }

    /// Largest `upper - lower` over all dimensions.
    pub fn max_span(&self) -> f64 {
        (&self.upper - &self.lower).max()
    }

    pub fn clamp(&self, x: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            x.len(),
            x.iter()
                .zip(self.lower.iter().zip(self.upper.iter()))
                .map(|(&v, (&l, &u))| v.clamp(l, u)),
        )
    }

    /// Range of `alpha` keeping `x + alpha * dir` inside the box.
    fn step_limits(&self, x: &DVector<f64>, dir: &DVector<f64>) -> (f64, f64) {
        let mut lo = f64::NEG_INFINITY;
        let mut hi = f64::INFINITY;
        for i in 0..x.len() {
            let d = dir[i];
            if d.abs() < 1e-300 {
                continue;
            }
            let a = (self.lower[i] - x[i]) / d;
            let b = (self.upper[i] - x[i]) / d;
            lo = lo.max(a.min(b));
            hi = hi.min(a.max(b));
        }
        (lo.min(0.0), hi.max(0.0))
    }
}

/// Result of a bounded minimization.
#[derive(Debug, Clone, PartialEq)]
pub struct PowellOutcome {
    /// Best point evaluated during the whole search
    pub best: BestPoint,
    pub iterations: usize,
    pub evaluations: usize,
    pub converged: bool,
}

fn eval_along<F>(
    obj: &mut TrackedObjective<F>,
    x: &DVector<f64>,
    dir: &DVector<f64>,
    alpha: f64,
) -> f64
where
    F: FnMut(&DVector<f64>) -> f64,
{
    obj.evaluate(&(x + dir * alpha))
}

fn golden_section<F>(
    obj: &mut TrackedObjective<F>,
    x: &DVector<f64>,
    dir: &DVector<f64>,
    mut left: f64,
    mut right: f64,
    tol: f64,
) -> (f64, f64)
where
    F: FnMut(&DVector<f64>) -> f64,
{
    let mut c = right - INV_PHI * (right - left);
    let mut d = left + INV_PHI * (right - left);
    let mut fc = eval_along(obj, x, dir, c);
    let mut fd = eval_along(obj, x, dir, d);
    while right - left > tol {
        if fc < fd {
            right = d;
            d = c;
            fd = fc;
            c = right - INV_PHI * (right - left);
            fc = eval_along(obj, x, dir, c);
        } else {
            left = c;
            c = d;
            fc = fd;
            d = left + INV_PHI * (right - left);
            fd = eval_along(obj, x, dir, d);
        }
    }
    if fc < fd {
        (c, fc)
    } else {
        (d, fd)
    }
}

/// Minimize along `dir` from `x` (where the objective is `fx`).
///
/// Returns the step `alpha` and the objective there; `alpha` is 0 unless a
/// strictly better point was found.
fn line_minimize<F>(
    obj: &mut TrackedObjective<F>,
    x: &DVector<f64>,
    fx: f64,
    dir: &DVector<f64>,
    bounds: &Bounds,
    step: f64,
    tol: f64,
) -> (f64, f64)
where
    F: FnMut(&DVector<f64>) -> f64,
{
    let (lo, hi) = bounds.step_limits(x, dir);
    if hi - lo <= tol {
        return (0.0, fx);
    }

    let mut best = (0.0, fx);
    let forward = step.min(hi);
    let f_forward = if forward > 0.0 {
        eval_along(obj, x, dir, forward)
    } else {
        f64::INFINITY
    };

    let (mut a, mut b, mut fb) = if f_forward < fx {
        (0.0, forward, f_forward)
    } else {
        let backward = (-step).max(lo);
        let f_backward = if backward < 0.0 {
            eval_along(obj, x, dir, backward)
        } else {
            f64::INFINITY
        };
        if f_backward < fx {
            (0.0, backward, f_backward)
        } else {
            // Minimum bracketed around the current point.
            let left = backward.min(0.0);
            let right = forward.max(0.0);
            let candidate = golden_section(obj, x, dir, left, right, tol);
            if candidate.1 < best.1 {
                best = candidate;
            }
            return best;
        }
    };
    best = (b, fb);

    loop {
        let c = (b + PHI * (b - a)).clamp(lo, hi);
        if (c - b).abs() <= f64::EPSILON * b.abs().max(1.0) {
            // Still descending at the boundary.
            return best;
        }
        let fc = eval_along(obj, x, dir, c);
        if fc >= fb {
            let candidate = golden_section(obj, x, dir, a.min(c), a.max(c), tol);
            if candidate.1 < best.1 {
                best = candidate;
            }
            return best;
        }
        a = b;
        b = c;
        fb = fc;
        best = (b, fb);
    }
}

/// Minimize `f` inside `bounds`, starting from `start`.
///
/// # Arguments
/// * `f` - Objective; NaN values count as `+inf`
/// * `start` - Initial point, clamped into the box
/// * `bounds` - Box constraints
/// * `config` - Stopping rules
///
/// # Returns
/// The best point ever evaluated. Fails with `DegenerateSignal` if no finite
/// objective value was seen.
pub fn minimize_bounded<F>(
    f: F,
    start: &DVector<f64>,
    bounds: &Bounds,
    config: &PowellConfig,
) -> Result<PowellOutcome>
where
    F: FnMut(&DVector<f64>) -> f64,
{
    let n = bounds.dim();
    if start.len() != n {
        return Err(AnalysisError::invalid(format!(
            "start point has {} dimensions, bounds have {n}",
            start.len()
        )));
    }

    let mut obj = TrackedObjective::new(f);
    let mut x = bounds.clamp(start);
    let mut fx = obj.evaluate(&x);

    let scale = bounds.max_span();
    let step = INITIAL_STEP * scale;
    let line_tol = (0.1 * config.tolerance_x).max(scale * 1e-12);
    let mut dirs = DMatrix::<f64>::identity(n, n);

    let mut iterations = 0;
    let mut converged = scale <= 0.0;
    while !converged && iterations < config.max_iterations {
        iterations += 1;
        let x_start = x.clone();
        let f_start = fx;
        let mut biggest_drop = 0.0;
        let mut biggest_idx = 0;

        for i in 0..n {
            let dir = dirs.column(i).clone_owned();
            let (alpha, f_new) = line_minimize(&mut obj, &x, fx, &dir, bounds, step, line_tol);
            if alpha != 0.0 {
                x = bounds.clamp(&(&x + &dir * alpha));
            }
            if fx - f_new > biggest_drop {
                biggest_drop = fx - f_new;
                biggest_idx = i;
            }
            fx = f_new;
        }

        let moved = &x - &x_start;
        let max_move = moved.amax();
        if max_move > 0.0 {
            let extrapolated = bounds.clamp(&(&x + &moved));
            let fe = obj.evaluate(&extrapolated);
            if fe < f_start {
                let t = 2.0 * (f_start - 2.0 * fx + fe) * (f_start - fx - biggest_drop).powi(2)
                    - biggest_drop * (f_start - fe).powi(2);
                if t < 0.0 {
                    let dir = moved.normalize();
                    let (alpha, f_new) =
                        line_minimize(&mut obj, &x, fx, &dir, bounds, step, line_tol);
                    if alpha != 0.0 {
                        x = bounds.clamp(&(&x + &dir * alpha));
                        fx = f_new;
                    }
                    let last = dirs.column(n - 1).clone_owned();
                    dirs.set_column(biggest_idx, &last);
                    dirs.set_column(n - 1, &dir);
                }
            }
        }

        let fx_ok =
            2.0 * (f_start - fx) <= config.tolerance_fx * (f_start.abs() + fx.abs()) + 1e-20;
        let x_ok = (&x - &x_start).amax() <= config.tolerance_x;
        trace!(iteration = iterations, value = fx, max_move, "powell sweep");
        converged = fx_ok && x_ok;
    }

    let evaluations = obj.evaluations();
    let best = obj
        .into_best()
        .filter(|b| b.value.is_finite())
        .ok_or_else(|| AnalysisError::degenerate("objective never evaluated to a finite value"))?;

    Ok(PowellOutcome {
        best,
        iterations,
        evaluations,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(n: usize, half: f64) -> Bounds {
        Bounds::new(DVector::from_element(n, -half), DVector::from_element(n, half)).unwrap()
    }

    #[test]
    fn test_tracked_objective_keeps_best() {
        let mut values = vec![3.0, 1.0, 2.0, f64::NAN].into_iter();
        let mut obj = TrackedObjective::new(|_: &DVector<f64>| values.next().unwrap_or(9.0));
        for i in 0..4 {
            obj.evaluate(&DVector::from_element(1, i as f64));
        }
        assert_eq!(obj.evaluations(), 4);
        let best = obj.into_best().unwrap();
        assert_eq!(best.value, 1.0);
        assert_eq!(best.point[0], 1.0);
    }

    #[test]
    fn test_quadratic_minimum() {
        let bounds = unit_box(3, 10.0);
        let target = DVector::from_vec(vec![1.5, -2.0, 0.25]);
        let t = target.clone();
        let out = minimize_bounded(
            move |x: &DVector<f64>| (x - &t).norm_squared(),
            &DVector::zeros(3),
            &bounds,
            &PowellConfig {
                tolerance_x: 1e-6,
                tolerance_fx: 1e-10,
                max_iterations: 100,
            },
        )
        .unwrap();
        assert!((&out.best.point - &target).amax() < 1e-3);
        assert!(out.iterations >= 1);
    }

    #[test]
    fn test_coupled_valley() {
        // Narrow valley along x = y with its minimum at (1, 1)
        let bounds = unit_box(2, 5.0);
        let out = minimize_bounded(
            |p: &DVector<f64>| (p[0] - p[1]).powi(2) + 0.1 * (p[0] + p[1] - 2.0).powi(2),
            &DVector::from_vec(vec![-3.0, 4.0]),
            &bounds,
            &PowellConfig {
                tolerance_x: 1e-8,
                tolerance_fx: 1e-12,
                max_iterations: 200,
            },
        )
        .unwrap();
        assert!((out.best.point[0] - 1.0).abs() < 1e-3);
        assert!((out.best.point[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_respects_bounds() {
        let bounds = Bounds::new(
            DVector::from_vec(vec![0.0, 0.0]),
            DVector::from_vec(vec![1.0, 1.0]),
        )
        .unwrap();
        let out = minimize_bounded(
            |p: &DVector<f64>| (p[0] - 3.0).powi(2) + (p[1] + 2.0).powi(2),
            &DVector::from_vec(vec![0.5, 0.5]),
            &bounds,
            &PowellConfig::default(),
        )
        .unwrap();
        assert!((out.best.point[0] - 1.0).abs() < 1e-9);
        assert!(out.best.point[1].abs() < 1e-9);
    }

    #[test]
    fn test_locked_dimension() {
        let bounds = Bounds::new(
            DVector::from_vec(vec![2.0, -5.0]),
            DVector::from_vec(vec![2.0, 5.0]),
        )
        .unwrap();
        let out = minimize_bounded(
            |p: &DVector<f64>| (p[1] - 1.0).abs(),
            &DVector::from_vec(vec![0.0, 0.0]),
            &bounds,
            &PowellConfig::default(),
        )
        .unwrap();
        assert_eq!(out.best.point[0], 2.0);
        assert!((out.best.point[1] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(Bounds::new(DVector::from_element(2, 1.0), DVector::from_element(2, 0.0)).is_err());
        assert!(Bounds::new(DVector::zeros(2), DVector::zeros(3)).is_err());
        let bounds = unit_box(2, 1.0);
        assert!(minimize_bounded(
            |_: &DVector<f64>| 0.0,
            &DVector::zeros(3),
            &bounds,
            &PowellConfig::default()
        )
        .is_err());
        assert!(matches!(
            minimize_bounded(
                |_: &DVector<f64>| f64::NAN,
                &DVector::zeros(2),
                &bounds,
                &PowellConfig::default()
            ),
            Err(AnalysisError::DegenerateSignal(_))
        ));
    }
}
