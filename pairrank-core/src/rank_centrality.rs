/// Rank Centrality (Negahban, Oh & Shah, 2014).
///
/// Scores are the stationary distribution of a random walk that moves from
/// item `i` to item `j` in proportion to how often `j` beat `i`. Each strongly
/// connected component of the walk is solved on its own and scaled so that a
/// component of `m` items sums to `m * mean`.
use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use crate::constants::{
    DEFAULT_GMRES_MAX_ITERATIONS, DEFAULT_GMRES_RESTART, DEFAULT_RANK_MEAN, DEFAULT_TOLERANCE,
    DIRECT_SOLVE_MAX_NODES,
};
use crate::error::{Error, Result};
use crate::gmres::{gmres, GmresOptions};
use crate::scc::{group_by_component, strongly_connected_components};
use crate::sparse::CsrMatrix;
use crate::win_matrix::WinMatrix;

/// Linear solver used for each component's stationary system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Solver {
    /// Restarted GMRES, with a dense LU retry if it fails to converge.
    #[default]
    Gmres,
    /// Dense LU, with GMRES as the fallback for singular systems.
    Direct,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankOptions {
    /// Target mean score.
    pub mean: f64,
    /// Relative residual tolerance for the iterative solver.
    pub tolerance: f64,
    /// Solver tried first on each component.
    pub solver: Solver,
    /// GMRES Krylov subspace size per restart cycle.
    pub restart: usize,
    /// GMRES inner iterations summed over all cycles.
    pub max_iterations: usize,
    /// Largest component re-solved with a dense LU when GMRES does not
    /// converge. `0` disables the fallback.
    pub direct_max_nodes: usize,
}

impl Default for RankOptions {
    fn default() -> Self {
        RankOptions {
            mean: DEFAULT_RANK_MEAN,
            tolerance: DEFAULT_TOLERANCE,
            solver: Solver::Gmres,
            restart: DEFAULT_GMRES_RESTART,
            max_iterations: DEFAULT_GMRES_MAX_ITERATIONS,
            direct_max_nodes: DIRECT_SOLVE_MAX_NODES,
        }
    }
}

impl RankOptions {
    fn validate(&self) -> Result<()> {
        if !self.mean.is_finite() || self.mean <= 0.0 {
            return Err(Error::invalid_config(format!(
                "mean must be finite and positive, got {}",
                self.mean
            )));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(Error::invalid_config(format!(
                "tolerance must be finite and positive, got {}",
                self.tolerance
            )));
        }
        if self.restart == 0 || self.max_iterations == 0 {
            return Err(Error::invalid_config(
                "restart and max_iterations must be at least 1",
            ));
        }
        Ok(())
    }
}

/// How a component's scores were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverUsed {
    /// Single-item component, scored `mean` without solving.
    Trivial,
    Gmres,
    Direct,
    /// GMRES failed to converge and the dense LU succeeded.
    DirectFallback,
    /// The dense LU found the system singular and GMRES took over.
    GmresFallback,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComponentSummary {
    /// Item indices in this component, ascending.
    pub members: Vec<usize>,
    pub converged: bool,
    /// Relative residual of the component's linear system.
    pub residual: f64,
    pub solver_used: SolverUsed,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankOutcome {
    /// One score per item, indexed like the win matrix.
    pub scores: Vec<f64>,
    pub components: Vec<ComponentSummary>,
    /// False if any component kept an unconverged iterate.
    pub converged: bool,
}

/// Rank every item of `w`. Non-convergence is logged, never an error.
pub fn rank(w: &WinMatrix, mean: f64, tolerance: f64) -> Result<Vec<f64>> {
    let options = RankOptions {
        mean,
        tolerance,
        ..RankOptions::default()
    };
    rank_with_options(w, &options).map(|outcome| outcome.scores)
}

pub fn rank_with_options(w: &WinMatrix, options: &RankOptions) -> Result<RankOutcome> {
    options.validate()?;
    let n = w.n();

    if n <= 1 {
        let components = (0..n)
            .map(|i| ComponentSummary {
                members: vec![i],
                converged: true,
                residual: 0.0,
                solver_used: SolverUsed::Trivial,
            })
            .collect();
        return Ok(RankOutcome {
            scores: vec![options.mean; n],
            components,
            converged: true,
        });
    }

    let p = transition_matrix(w);
    let (n_components, labels) = strongly_connected_components(&p);
    let groups = group_by_component(n_components, &labels);
    debug!(
        components = n_components,
        largest = groups.iter().map(Vec::len).max().unwrap_or(0),
        "decomposed comparison graph"
    );

    let mut scores = vec![0.0; n];
    let mut components = Vec::with_capacity(n_components);
    for members in groups {
        let summary = if members.len() == 1 {
            scores[members[0]] = options.mean;
            ComponentSummary {
                members,
                converged: true,
                residual: 0.0,
                solver_used: SolverUsed::Trivial,
            }
        } else {
            let sub_p = p.submatrix(&members);
            let solved = stationary_component(&sub_p, options);
            for (&idx, &score) in members.iter().zip(&solved.scores) {
                scores[idx] = score;
            }
            ComponentSummary {
                members,
                converged: solved.converged,
                residual: solved.residual,
                solver_used: solved.solver_used,
            }
        };
        components.push(summary);
    }

    let converged = components.iter().all(|c| c.converged);
    Ok(RankOutcome {
        scores,
        components,
        converged,
    })
}

/// Time-reversible transition matrix of the comparison walk.
///
/// `P[i, j] = W[j, i] / (W[i, j] + W[j, i]) / d_max` for `i != j`, where
/// `d_max` is the largest number of distinct opponents any item has lost to.
/// The diagonal makes every row sum to one.
pub fn transition_matrix(w: &WinMatrix) -> CsrMatrix {
    let n = w.n();
    let losses = w.as_csr().transpose();

    let d_max = (0..n)
        .map(|i| losses.row(i).filter(|&(j, _)| j != i).count())
        .max()
        .unwrap_or(0);
    if d_max == 0 {
        return CsrMatrix::identity(n);
    }
    let inv_d_max = 1.0 / d_max as f64;

    let mut triplets = Vec::with_capacity(losses.nnz() + n);
    for i in 0..n {
        let mut off_diagonal = 0.0;
        for (j, lost_to_j) in losses.row(i) {
            if j == i {
                continue;
            }
            let beat_j = losses.get(j, i);
            let value = lost_to_j / (lost_to_j + beat_j) * inv_d_max;
            off_diagonal += value;
            triplets.push((i, j, value));
        }
        triplets.push((i, i, 1.0 - off_diagonal));
    }
    CsrMatrix::from_triplets(n, n, triplets)
}

struct ComponentSolve {
    scores: Vec<f64>,
    converged: bool,
    residual: f64,
    solver_used: SolverUsed,
}

/// `[1 ... 1; (P - I)^T without its first row]`: stationarity plus the sum
/// constraint replacing one redundant balance equation.
fn stationary_system(sub_p: &CsrMatrix) -> CsrMatrix {
    let m = sub_p.nrows();
    let ones = (0..m).map(|c| (0, c, 1.0));
    let transposed = sub_p
        .triplets()
        .filter(|&(_, col, _)| col >= 1)
        .map(|(row, col, v)| (col, row, v));
    let minus_identity = (1..m).map(|r| (r, r, -1.0));
    CsrMatrix::from_triplets(m, m, ones.chain(transposed).chain(minus_identity))
}

fn relative_residual(a: &CsrMatrix, b: &[f64], x: &[f64]) -> f64 {
    let b_norm = b.iter().map(|v| v * v).sum::<f64>().sqrt();
    let r_norm = a
        .mul_vec(x)
        .iter()
        .zip(b)
        .map(|(ax, bi)| (bi - ax) * (bi - ax))
        .sum::<f64>()
        .sqrt();
    if b_norm > 0.0 {
        r_norm / b_norm
    } else {
        r_norm
    }
}

fn solve_direct(a: &CsrMatrix, b: &[f64]) -> Option<Vec<f64>> {
    let m = a.nrows();
    let mut dense = DMatrix::<f64>::zeros(m, m);
    for (i, j, v) in a.triplets() {
        dense[(i, j)] = v;
    }
    let x = dense.lu().solve(&DVector::from_column_slice(b))?;
    if x.iter().all(|v| v.is_finite()) {
        Some(x.iter().copied().collect())
    } else {
        None
    }
}

fn stationary_component(sub_p: &CsrMatrix, options: &RankOptions) -> ComponentSolve {
    let m = sub_p.nrows();
    let a = stationary_system(sub_p);
    let mut b = vec![0.0; m];
    b[0] = m as f64 * options.mean;

    let gmres_options = GmresOptions {
        tolerance: options.tolerance,
        restart: options.restart,
        max_iterations: options.max_iterations,
    };
    let x0 = vec![options.mean; m];

    match options.solver {
        Solver::Gmres => {
            let result = gmres(&a, &b, Some(&x0), &gmres_options);
            if result.converged {
                return ComponentSolve {
                    scores: result.x,
                    converged: true,
                    residual: result.residual,
                    solver_used: SolverUsed::Gmres,
                };
            }
            warn!(
                size = m,
                iterations = result.iterations,
                residual = result.residual,
                "GMRES did not converge"
            );
            if m <= options.direct_max_nodes {
                if let Some(x) = solve_direct(&a, &b) {
                    let residual = relative_residual(&a, &b, &x);
                    return ComponentSolve {
                        scores: x,
                        converged: true,
                        residual,
                        solver_used: SolverUsed::DirectFallback,
                    };
                }
                warn!(size = m, "dense LU fallback found a singular system");
            }
            ComponentSolve {
                scores: result.x,
                converged: false,
                residual: result.residual,
                solver_used: SolverUsed::Gmres,
            }
        }
        Solver::Direct => {
            if let Some(x) = solve_direct(&a, &b) {
                let residual = relative_residual(&a, &b, &x);
                return ComponentSolve {
                    scores: x,
                    converged: true,
                    residual,
                    solver_used: SolverUsed::Direct,
                };
            }
            warn!(size = m, "singular stationary system, falling back to GMRES");
            let result = gmres(&a, &b, Some(&x0), &gmres_options);
            if !result.converged {
                warn!(
                    size = m,
                    iterations = result.iterations,
                    residual = result.residual,
                    "GMRES did not converge"
                );
            }
            ComponentSolve {
                scores: result.x,
                converged: result.converged,
                residual: result.residual,
                solver_used: SolverUsed::GmresFallback,
            }
        }
    }
}
