/// Restarted GMRES for sparse non-symmetric systems `A x = b`.
///
/// Arnoldi with modified Gram-Schmidt, Givens rotations for the small
/// least-squares problem. Convergence means `||b - A x|| <= tol * ||b||`.
use crate::constants::{DEFAULT_GMRES_MAX_ITERATIONS, DEFAULT_GMRES_RESTART, DEFAULT_TOLERANCE};
use crate::sparse::CsrMatrix;

/// Relative size below which a new Arnoldi vector counts as a breakdown.
const BREAKDOWN_THRESHOLD: f64 = 1e-14;

#[derive(Debug, Clone, Copy)]
pub struct GmresOptions {
    pub tolerance: f64,
    /// Krylov subspace dimension per cycle.
    pub restart: usize,
    /// Inner iterations summed over all cycles.
    pub max_iterations: usize,
}

impl Default for GmresOptions {
    fn default() -> Self {
        GmresOptions {
            tolerance: DEFAULT_TOLERANCE,
            restart: DEFAULT_GMRES_RESTART,
            max_iterations: DEFAULT_GMRES_MAX_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GmresResult {
    pub x: Vec<f64>,
    pub converged: bool,
    pub iterations: usize,
    /// Final relative residual `||b - A x|| / ||b||`.
    pub residual: f64,
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

fn residual(a: &CsrMatrix, b: &[f64], x: &[f64]) -> Vec<f64> {
    a.mul_vec(x).iter().zip(b).map(|(ax, bi)| bi - ax).collect()
}

pub fn gmres(a: &CsrMatrix, b: &[f64], x0: Option<&[f64]>, options: &GmresOptions) -> GmresResult {
    let n = b.len();
    let mut x = match x0 {
        Some(x0) => x0.to_vec(),
        None => vec![0.0; n],
    };

    let b_norm = norm(b);
    if b_norm == 0.0 {
        return GmresResult {
            x: vec![0.0; n],
            converged: true,
            iterations: 0,
            residual: 0.0,
        };
    }

    let target = options.tolerance * b_norm;
    let m = options.restart.clamp(1, n.max(1));
    let mut iterations = 0usize;

    let mut r = residual(a, b, &x);
    let mut beta = norm(r.as_slice());

    while beta > target && iterations < options.max_iterations {
        let mut basis: Vec<Vec<f64>> = Vec::with_capacity(m + 1);
        basis.push(r.iter().map(|v| v / beta).collect());

        // h[i][k]: upper Hessenberg matrix, rotated in place into R.
        let mut h = vec![vec![0.0; m]; m + 1];
        let mut cs = vec![0.0; m];
        let mut sn = vec![0.0; m];
        let mut g = vec![0.0; m + 1];
        g[0] = beta;

        let mut k_used = 0usize;
        for k in 0..m {
            if iterations >= options.max_iterations {
                break;
            }
            iterations += 1;

            let mut w = a.mul_vec(&basis[k]);
            let w_scale = norm(&w);
            for (i, v) in basis.iter().enumerate() {
                let hik = dot(&w, v);
                h[i][k] = hik;
                for (wj, vj) in w.iter_mut().zip(v) {
                    *wj -= hik * vj;
                }
            }
            let h_next = norm(&w);
            h[k + 1][k] = h_next;

            for i in 0..k {
                let upper = cs[i] * h[i][k] + sn[i] * h[i + 1][k];
                h[i + 1][k] = -sn[i] * h[i][k] + cs[i] * h[i + 1][k];
                h[i][k] = upper;
            }

            let denom = h[k][k].hypot(h[k + 1][k]);
            if denom == 0.0 {
                cs[k] = 1.0;
                sn[k] = 0.0;
            } else {
                cs[k] = h[k][k] / denom;
                sn[k] = h[k + 1][k] / denom;
            }
            h[k][k] = cs[k] * h[k][k] + sn[k] * h[k + 1][k];
            h[k + 1][k] = 0.0;
            g[k + 1] = -sn[k] * g[k];
            g[k] *= cs[k];
            k_used = k + 1;

            let breakdown = h_next <= BREAKDOWN_THRESHOLD * w_scale.max(f64::MIN_POSITIVE);
            if g[k + 1].abs() <= target || breakdown || k + 1 == m {
                break;
            }
            basis.push(w.iter().map(|v| v / h_next).collect());
        }

        if k_used == 0 {
            break;
        }

        // Back substitution on the k_used x k_used triangle.
        let mut y = vec![0.0; k_used];
        for i in (0..k_used).rev() {
            let tail: f64 = ((i + 1)..k_used).map(|j| h[i][j] * y[j]).sum();
            y[i] = if h[i][i] != 0.0 { (g[i] - tail) / h[i][i] } else { 0.0 };
        }
        for (yi, v) in y.iter().zip(&basis) {
            for (xj, vj) in x.iter_mut().zip(v) {
                *xj += yi * vj;
            }
        }

        let next_r = residual(a, b, &x);
        let next_beta = norm(&next_r);
        let stagnated = next_beta >= beta;
        r = next_r;
        beta = next_beta;
        if stagnated {
            break;
        }
    }

    GmresResult {
        x,
        converged: beta <= target,
        iterations,
        residual: beta / b_norm,
    }
}
