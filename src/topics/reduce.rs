//! Dimensionality reduction by PCA on a Gram matrix.
//!
//! Document vectors are sparse and very wide, while corpora hold at most a
//! few thousand documents, so the principal components are computed from
//! the `n x n` matrix of pairwise dot products instead of the `d x d`
//! covariance. Eigenvectors come from power iteration with Gram-Schmidt
//! deflation, started from a seeded random vector so runs are reproducible.

use super::vectorizer::{SparseVec, sparse_dot};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MAX_ITERATIONS: usize = 300;
const TOLERANCE: f64 = 1e-10;

/// Pairwise dot products of sparse rows.
pub fn gram_matrix(rows: &[SparseVec]) -> Vec<Vec<f64>> {
    let n = rows.len();
    let mut gram = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            let d = sparse_dot(&rows[i], &rows[j]);
            gram[i][j] = d;
            gram[j][i] = d;
        }
    }
    gram
}

/// Double-center a Gram matrix so its eigenvectors are principal components.
fn center(gram: &mut [Vec<f64>]) {
    let n = gram.len();
    if n == 0 {
        return;
    }
    let nf = n as f64;
    let row_means: Vec<f64> = gram.iter().map(|r| r.iter().sum::<f64>() / nf).collect();
    let grand_mean = row_means.iter().sum::<f64>() / nf;
    for i in 0..n {
        for j in 0..n {
            gram[i][j] = gram[i][j] - row_means[i] - row_means[j] + grand_mean;
        }
    }
}

fn mat_vec(m: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    m.iter()
        .map(|row| row.iter().zip(v).map(|(a, b)| a * b).sum())
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normalize(v: &mut [f64]) -> f64 {
    let norm = dot(v, v).sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    norm
}

fn orthogonalize(v: &mut [f64], basis: &[Vec<f64>]) {
    for b in basis {
        let p = dot(v, b);
        v.iter_mut().zip(b).for_each(|(x, y)| *x -= p * y);
    }
}

/// Leading `k` eigenpairs `(eigenvalue, unit eigenvector)` of a symmetric
/// positive semi-definite matrix, largest first. Stops early once the
/// remaining spectrum is zero.
pub fn top_eigenpairs(m: &[Vec<f64>], k: usize, seed: u64) -> Vec<(f64, Vec<f64>)> {
    let n = m.len();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pairs: Vec<(f64, Vec<f64>)> = Vec::new();

    for _ in 0..k.min(n) {
        let basis: Vec<Vec<f64>> = pairs.iter().map(|(_, v)| v.clone()).collect();
        let mut v: Vec<f64> = (0..n).map(|_| rng.random_range(-1.0..1.0)).collect();
        orthogonalize(&mut v, &basis);
        if normalize(&mut v) == 0.0 {
            break;
        }

        let mut eigenvalue = 0.0;
        for _ in 0..MAX_ITERATIONS {
            let mut w = mat_vec(m, &v);
            orthogonalize(&mut w, &basis);
            let norm = normalize(&mut w);
            if norm <= TOLERANCE {
                eigenvalue = 0.0;
                break;
            }
            let delta: f64 = w.iter().zip(&v).map(|(a, b)| (a - b).abs()).sum();
            v = w;
            eigenvalue = norm;
            if delta < TOLERANCE {
                break;
            }
        }

        if eigenvalue <= TOLERANCE {
            break;
        }
        pairs.push((eigenvalue, v));
    }
    pairs
}

/// Project rows onto their first `k` principal components.
///
/// Every returned row has exactly `k` coordinates; components beyond the
/// rank of the data are zero.
pub fn pca_project(rows: &[SparseVec], k: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut gram = gram_matrix(rows);
    center(&mut gram);
    let pairs = top_eigenpairs(&gram, k, seed);

    let mut coords = vec![vec![0.0; k]; rows.len()];
    for (c, (lambda, vector)) in pairs.iter().enumerate() {
        let scale = lambda.sqrt();
        for (i, row) in coords.iter_mut().enumerate() {
            row[c] = vector[i] * scale;
        }
    }
    coords
}
