//! Small dense least-squares solver
//!
//! Models here have at most a few dozen parameters, so the normal
//! equations solved by Gaussian elimination are enough.

use crate::error::FitError;

/// Solve `min ||X b - y||^2 + sum(penalty_j * b_j^2)`
///
/// `rows` are the design matrix rows, each of length `penalties.len()`.
pub fn ridge_least_squares(
    rows: &[Vec<f64>],
    targets: &[f64],
    penalties: &[f64],
) -> Result<Vec<f64>, FitError> {
    let p = penalties.len();
    let mut a = vec![vec![0.0; p]; p];
    let mut b = vec![0.0; p];

    for (row, &y) in rows.iter().zip(targets) {
        for i in 0..p {
            if row[i] == 0.0 {
                continue;
            }
            b[i] += row[i] * y;
            for j in i..p {
                a[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..p {
        for j in 0..i {
            a[i][j] = a[j][i];
        }
        a[i][i] += penalties[i];
    }

    solve(a, b)
}

/// Solve `A x = b` with partial pivoting
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, FitError> {
    let n = b.len();
    let scale = a
        .iter()
        .enumerate()
        .map(|(i, row)| row[i].abs())
        .fold(0.0_f64, f64::max)
        .max(f64::MIN_POSITIVE);
    let tolerance = scale * 1e-12;

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&x, &y| a[x][col].abs().total_cmp(&a[y][col].abs()))
            .unwrap_or(col);
        if !(a[pivot_row][col].abs() > tolerance) {
            return Err(FitError::Singular { parameters: n });
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }

    if x.iter().all(|v| v.is_finite()) {
        Ok(x)
    } else {
        Err(FitError::NonFinite)
    }
}
