//! Sequential quadratic programming over the capped simplex.
//!
//! Minimizes a smooth objective subject to `sum(x) = 1` and
//! `lower <= x <= upper`. Each iteration solves the quadratic subproblem
//!
//! ```text
//! min  0.5 d'Bd + g'd
//! s.t. sum(d) = 0
//!      lower - x <= d <= upper - x
//! ```
//!
//! with Clarabel, where `B` is a damped BFGS approximation of the Hessian,
//! then takes an Armijo backtracking step along `d`. The iterate is projected
//! back onto the feasible set after every step so that solver tolerances do
//! not accumulate into the constraints.

use clarabel::algebra::*;
use clarabel::solver::*;

pub trait Objective {
    fn value(&self, x: &[f64]) -> f64;
    fn gradient(&self, x: &[f64]) -> Vec<f64>;
}

#[derive(Debug, Clone, Copy)]
pub struct SqpSettings {
    pub max_iter: usize,
    /// Converged when the infinity norm of the search direction drops below this.
    pub step_tolerance: f64,
    /// Converged when the objective changes by less than this, relative to `1 + |f|`.
    pub function_tolerance: f64,
}

impl Default for SqpSettings {
    fn default() -> Self {
        SqpSettings {
            max_iter: 200,
            step_tolerance: 1e-9,
            function_tolerance: 1e-12,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqpOutcome {
    pub x: Vec<f64>,
    pub fun: f64,
    pub iterations: usize,
    pub success: bool,
    pub message: String,
}

const ARMIJO_C: f64 = 1e-4;
const MIN_STEP: f64 = 1e-10;
const QP_MAX_ITER: u32 = 100;

/// Minimize `objective` from the uniform starting point.
///
/// Non-convergence is reported through `success`, never as an error.
pub fn minimize(
    objective: &dyn Objective,
    lower: &[f64],
    upper: &[f64],
    settings: &SqpSettings,
) -> SqpOutcome {
    let n = lower.len();
    let start = vec![1.0 / n as f64; n];
    let mut x = project_capped_simplex(&start, lower, upper);
    let mut f = objective.value(&x);
    let mut g = objective.gradient(&x);
    let mut b = identity(n);
    let mut scaled = false;

    for iteration in 1..=settings.max_iter {
        let d = match solve_subproblem(&b, &g, &x, lower, upper) {
            Ok(d) => d,
            Err(message) => return finish(x, f, iteration, false, message),
        };

        let step_norm = d.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        if step_norm < settings.step_tolerance {
            return finish(x, f, iteration, true, "search direction below tolerance".into());
        }

        let slope = dot(&g, &d);
        if slope >= 0.0 {
            return finish(x, f, iteration, true, "no descent direction remains".into());
        }

        let mut alpha = 1.0;
        let mut accepted = None;
        while alpha >= MIN_STEP {
            let trial: Vec<f64> = x.iter().zip(&d).map(|(xi, di)| xi + alpha * di).collect();
            let trial = project_capped_simplex(&trial, lower, upper);
            let f_trial = objective.value(&trial);
            if f_trial.is_finite() && f_trial <= f + ARMIJO_C * alpha * slope {
                accepted = Some((trial, f_trial));
                break;
            }
            alpha *= 0.5;
        }

        let Some((x_new, f_new)) = accepted else {
            return finish(x, f, iteration, false, "line search failed".into());
        };

        let g_new = objective.gradient(&x_new);
        let s: Vec<f64> = x_new.iter().zip(&x).map(|(a, b)| a - b).collect();
        let y: Vec<f64> = g_new.iter().zip(&g).map(|(a, b)| a - b).collect();

        if !scaled {
            let sy = dot(&s, &y);
            let yy = dot(&y, &y);
            if sy > 0.0 && yy > 0.0 {
                let scale = yy / sy;
                b = identity(n);
                b.iter_mut().enumerate().for_each(|(i, row)| row[i] = scale);
                scaled = true;
            }
        }
        damped_bfgs_update(&mut b, &s, &y);

        let delta = (f - f_new).abs();
        x = x_new;
        g = g_new;
        let converged = delta <= settings.function_tolerance * (1.0 + f_new.abs());
        f = f_new;

        if converged {
            return finish(x, f, iteration, true, "objective change below tolerance".into());
        }
    }

    finish(x, f, settings.max_iter, false, "iteration limit reached".into())
}

fn finish(x: Vec<f64>, fun: f64, iterations: usize, success: bool, message: String) -> SqpOutcome {
    SqpOutcome {
        x,
        fun,
        iterations,
        success,
        message,
    }
}

fn solve_subproblem(
    b: &[Vec<f64>],
    g: &[f64],
    x: &[f64],
    lower: &[f64],
    upper: &[f64],
) -> Result<Vec<f64>, String> {
    let n = x.len();

    // Clarabel takes the upper triangle of P only.
    let mut p_data = Vec::new();
    let mut p_indices = Vec::new();
    let mut p_indptr = vec![0];
    for j in 0..n {
        for i in 0..=j {
            let val = 0.5 * (b[i][j] + b[j][i]);
            if val != 0.0 {
                p_data.push(val);
                p_indices.push(i);
            }
        }
        p_indptr.push(p_data.len());
    }
    let p = CscMatrix::new(n, n, p_indptr, p_indices, p_data);

    // Rows: [sum(d) = 0; d <= upper - x; -d <= x - lower]
    let mut a_data = Vec::with_capacity(3 * n);
    let mut a_indices = Vec::with_capacity(3 * n);
    let mut a_indptr = vec![0];
    for j in 0..n {
        a_data.push(1.0);
        a_indices.push(0);
        a_data.push(1.0);
        a_indices.push(1 + j);
        a_data.push(-1.0);
        a_indices.push(1 + n + j);
        a_indptr.push(a_data.len());
    }
    let a = CscMatrix::new(1 + 2 * n, n, a_indptr, a_indices, a_data);

    let mut rhs = vec![0.0];
    rhs.extend(upper.iter().zip(x).map(|(u, xi)| (u - xi).max(0.0)));
    rhs.extend(x.iter().zip(lower).map(|(xi, l)| (xi - l).max(0.0)));

    let cones = [ZeroConeT(1), NonnegativeConeT(2 * n)];

    let settings = DefaultSettingsBuilder::default()
        .max_iter(QP_MAX_ITER)
        .verbose(false)
        .build()
        .map_err(|e| format!("failed to build QP settings: {}", e))?;

    let mut solver = DefaultSolver::new(&p, g, &a, &rhs, &cones, settings);
    solver.solve();

    match solver.solution.status {
        SolverStatus::Solved | SolverStatus::AlmostSolved => Ok(solver.solution.x.clone()),
        status => Err(format!("QP subproblem status: {:?}", status)),
    }
}

/// Powell-damped BFGS update; keeps `b` positive definite.
fn damped_bfgs_update(b: &mut [Vec<f64>], s: &[f64], y: &[f64]) {
    let bs = mat_vec(b, s);
    let sbs = dot(s, &bs);
    if sbs <= 1e-16 {
        return;
    }

    let sy = dot(s, y);
    let r: Vec<f64> = if sy >= 0.2 * sbs {
        y.to_vec()
    } else {
        let theta = 0.8 * sbs / (sbs - sy);
        y.iter()
            .zip(&bs)
            .map(|(yi, bsi)| theta * yi + (1.0 - theta) * bsi)
            .collect()
    };
    let sr = dot(s, &r);
    if sr <= 1e-16 {
        return;
    }

    for i in 0..b.len() {
        for j in 0..b.len() {
            b[i][j] += r[i] * r[j] / sr - bs[i] * bs[j] / sbs;
        }
    }
}

/// Euclidean projection onto `{x : sum(x) = 1, lower <= x <= upper}`.
///
/// Bisects on the shift `tau` in `clamp(y - tau, lower, upper)`. Assumes
/// the set is non-empty.
pub fn project_capped_simplex(y: &[f64], lower: &[f64], upper: &[f64]) -> Vec<f64> {
    let shifted = |tau: f64| -> Vec<f64> {
        y.iter()
            .zip(lower.iter().zip(upper))
            .map(|(yi, (l, u))| (yi - tau).clamp(*l, *u))
            .collect()
    };

    let mut lo = y
        .iter()
        .zip(upper)
        .map(|(yi, u)| yi - u)
        .fold(f64::INFINITY, f64::min)
        - 1.0;
    let mut hi = y
        .iter()
        .zip(lower)
        .map(|(yi, l)| yi - l)
        .fold(f64::NEG_INFINITY, f64::max)
        + 1.0;

    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        let total: f64 = shifted(mid).iter().sum();
        if total > 1.0 {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-15 {
            break;
        }
    }
    shifted(0.5 * (lo + hi))
}

fn identity(n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect()
}

fn mat_vec(m: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    m.iter().map(|row| dot(row, v)).collect()
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
