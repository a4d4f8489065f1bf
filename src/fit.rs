//! Bounded parameter fitting for anything [`Parametrized`].
//!
//! The parameters in state [`ParameterState::Fit`](crate::parameters::ParameterState::Fit)
//! are searched with a Nelder–Mead simplex. Every candidate vector is clamped to
//! the parameter bounds and written into a private clone of the target; the
//! caller's cost closure is evaluated on that clone. The live object is written
//! exactly once, with the best vector found.

use argmin::core::{CostFunction, Error, Executor, State};
use argmin::solver::neldermead::NelderMead;
use log::info;

use crate::error::CameraError;
use crate::parameters::Parametrized;

/// Relative size of the initial simplex steps.
const SIMPLEX_STEP: f64 = 0.05;
/// Simplex step for coordinates that start at exactly zero.
const SIMPLEX_ZERO_STEP: f64 = 0.00025;

/// Optimizer limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    /// Maximum number of simplex iterations.
    pub max_iters: u64,
    /// Stop once the standard deviation of the simplex costs drops below this.
    pub sd_tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions {
            max_iters: 2000,
            sd_tolerance: 1e-10,
        }
    }
}

/// Outcome of a fit. The best values have already been written to the target.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    /// Fitted parameter names, in the order of `x`.
    pub names: Vec<String>,
    /// Best parameter vector, within bounds.
    pub x: Vec<f64>,
    /// Cost at `x`.
    pub cost: f64,
    /// Iterations performed.
    pub iterations: u64,
}

struct FitProblem<'a, T, F> {
    target: &'a T,
    names: &'a [String],
    bounds: &'a [(f64, f64)],
    cost: &'a F,
}

impl<T, F> CostFunction for FitProblem<'_, T, F>
where
    T: Parametrized + Clone,
    F: Fn(&T) -> f64,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> Result<Self::Output, Error> {
        let mut candidate = self.target.clone();
        candidate.set_fit_parameters(self.names, &clamp_to_bounds(p, self.bounds))?;
        let value = (self.cost)(&candidate);
        Ok(if value.is_finite() { value } else { f64::INFINITY })
    }
}

fn clamp_to_bounds(values: &[f64], bounds: &[(f64, f64)]) -> Vec<f64> {
    values
        .iter()
        .zip(bounds)
        .map(|(&v, &(lower, upper))| v.max(lower).min(upper))
        .collect()
}

/// Start vertex plus one vertex per coordinate, each step pointing into the bounds.
fn initial_simplex(start: &[f64], bounds: &[(f64, f64)]) -> Vec<Vec<f64>> {
    let mut simplex = vec![start.to_vec()];
    for (i, (&value, &(lower, upper))) in start.iter().zip(bounds).enumerate() {
        let step = if value == 0.0 {
            SIMPLEX_ZERO_STEP
        } else {
            SIMPLEX_STEP * value.abs()
        };
        let mut vertex = start.to_vec();
        vertex[i] = if value + step <= upper || value - step < lower {
            value + step
        } else {
            value - step
        };
        simplex.push(vertex);
    }
    simplex
}

/// Minimizes `cost` over the fit-tagged parameters of `target`.
///
/// # Arguments
///
/// * `target` - The object to calibrate; written only with the final result.
/// * `cost` - Evaluated on a clone of `target` holding the candidate values.
/// * `options` - Optimizer limits.
///
/// # Errors
///
/// [`CameraError::InvalidParams`] if no parameter is selected for fitting,
/// [`CameraError::Optimizer`] if the solver fails.
pub fn fit<T, F>(target: &mut T, cost: F, options: &FitOptions) -> Result<FitResult, CameraError>
where
    T: Parametrized + Clone,
    F: Fn(&T) -> f64,
{
    let parameters = target.parameter_set();
    let names = parameters.fit_parameter_names();
    if names.is_empty() {
        return Err(CameraError::InvalidParams(
            "no parameter is selected for fitting".to_string(),
        ));
    }
    let bounds = parameters.parameter_ranges(&names)?;
    let start = clamp_to_bounds(&parameters.parameter_defaults(&names)?, &bounds);
    info!("fitting {} parameters: {}", names.len(), names.join(", "));

    let solver = NelderMead::new(initial_simplex(&start, &bounds))
        .with_sd_tolerance(options.sd_tolerance)
        .map_err(|e| CameraError::Optimizer(e.to_string()))?;
    let problem = FitProblem {
        target: &*target,
        names: &names,
        bounds: &bounds,
        cost: &cost,
    };
    let result = Executor::new(problem, solver)
        .configure(|state| state.max_iters(options.max_iters))
        .run()
        .map_err(|e| CameraError::Optimizer(e.to_string()))?;

    let state = result.state();
    let best = state
        .get_best_param()
        .ok_or_else(|| CameraError::Optimizer("solver returned no parameters".to_string()))?;
    let x = clamp_to_bounds(best, &bounds);
    let best_cost = state.get_best_cost();
    let iterations = state.get_iter();

    target.set_fit_parameters(&names, &x)?;
    info!("fit finished after {iterations} iterations with cost {best_cost:.6e}");

    Ok(FitResult {
        names,
        x,
        cost: best_cost,
        iterations,
    })
}
