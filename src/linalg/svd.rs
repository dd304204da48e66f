#![allow(non_snake_case)]

use ndarray::{Array1, Array2, s};
use ndarray_linalg::svddc::JobSvd;
use ndarray_linalg::{QR, SVDDCInto};
use ndarray_rand::RandomExt;
use rand::SeedableRng;
use rand::distributions::Uniform;
use rand_pcg::Pcg64;

use crate::linalg::{LinalgError, LinearOperator};

/// Truncated SVD `A ≈ U · diag(s) · Vᵀ`.
#[derive(Debug, Clone)]
pub struct Svd {
    /// `nrows × k`
    pub u: Array2<f64>,
    pub s: Array1<f64>,
    /// `ncols × k`
    pub v: Array2<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct SvdOptions {
    pub oversample: usize,
    pub power_iters: usize,
    pub seed: u64,
}

impl Default for SvdOptions {
    fn default() -> Self {
        Self {
            oversample: 10,
            power_iters: 4,
            seed: 42,
        }
    }
}

/// Randomized range finder with QR-stabilized power iterations (Halko et
/// al.), followed by an exact SVD of the small projected matrix.
pub fn randomized_svd<A: LinearOperator + ?Sized>(
    op: &A,
    k: usize,
    opts: SvdOptions,
) -> Result<Svd, LinalgError> {
    let (m, n) = (op.nrows(), op.ncols());
    if k == 0 || k > m.min(n) {
        return Err(LinalgError::Dimension(format!(
            "rank {k} requested from a {m}x{n} matrix"
        )));
    }
    let l = (k + opts.oversample).min(m).min(n);

    let mut rng = Pcg64::seed_from_u64(opts.seed);
    let omega = Array2::random_using((n, l), Uniform::new(-1.0, 1.0), &mut rng);

    let mut Q: Array2<f64> = op.apply(&omega).qr()?.0;
    for _ in 0..opts.power_iters {
        Q = op.apply_t(&Q).qr()?.0;
        Q = op.apply(&Q).qr()?.0;
    }

    // B = Qᵀ A, built as (Aᵀ Q)ᵀ so the operator is only ever applied.
    let B = op.apply_t(&Q).reversed_axes();
    let (U, sigma, Vt) = B.svddc_into(JobSvd::Some)?;
    let U = U.ok_or(LinalgError::NoVectors)?;
    let Vt = Vt.ok_or(LinalgError::NoVectors)?;

    let mut u = Q.dot(&U.slice(s![.., ..k]));
    let mut v = Vt.slice(s![..k, ..]).t().to_owned();
    fix_signs(&mut u, &mut v);

    Ok(Svd {
        u,
        s: sigma.slice(s![..k]).to_owned(),
        v,
    })
}

/// Flips each singular pair so that the largest-magnitude entry of `v` is
/// positive, making results independent of the random start.
fn fix_signs(u: &mut Array2<f64>, v: &mut Array2<f64>) {
    for j in 0..v.ncols() {
        let best = v
            .column(j)
            .iter()
            .fold(0.0f64, |best, &x| if x.abs() > best.abs() { x } else { best });
        if best < 0.0 {
            v.column_mut(j).mapv_inplace(|x| -x);
            u.column_mut(j).mapv_inplace(|x| -x);
        }
    }
}

/// Principal components of an already centered (and usually scaled)
/// cells × features matrix.
#[derive(Debug, Clone)]
pub struct Pca {
    /// cells × k
    pub scores: Array2<f64>,
    /// features × k
    pub loadings: Array2<f64>,
}

pub fn pca(data: &Array2<f64>, k: usize, seed: u64) -> Result<Pca, LinalgError> {
    let svd = randomized_svd(
        data,
        k,
        SvdOptions {
            seed,
            ..SvdOptions::default()
        },
    )?;
    let scores = svd.u * &svd.s;
    Ok(Pca {
        scores,
        loadings: svd.v,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/linalg/svd.rs"]
mod tests;
