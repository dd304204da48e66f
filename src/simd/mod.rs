pub mod avx2;
pub mod neon;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Scalar,
    Avx2,
    Neon,
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
pub const BACKEND: Backend = Backend::Avx2;

#[cfg(all(
    not(all(target_arch = "x86_64", target_feature = "avx2")),
    target_arch = "aarch64",
    target_feature = "neon"
))]
pub const BACKEND: Backend = Backend::Neon;

#[cfg(not(any(
    all(target_arch = "x86_64", target_feature = "avx2"),
    all(target_arch = "aarch64", target_feature = "neon")
)))]
pub const BACKEND: Backend = Backend::Scalar;

pub fn backend_name() -> &'static str {
    match BACKEND {
        Backend::Scalar => "scalar",
        Backend::Avx2 => "avx2",
        Backend::Neon => "neon",
    }
}

/// Library size of one cell column.
pub fn sum_u32(values: &[u32]) -> u64 {
    #[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
    {
        return avx2::sum_u32(values);
    }

    #[cfg(all(
        not(all(target_arch = "x86_64", target_feature = "avx2")),
        target_arch = "aarch64",
        target_feature = "neon"
    ))]
    {
        return neon::sum_u32(values);
    }

    #[cfg(not(any(
        all(target_arch = "x86_64", target_feature = "avx2"),
        all(target_arch = "aarch64", target_feature = "neon")
    )))]
    {
        values.iter().map(|v| *v as u64).sum()
    }
}

/// Squared Euclidean distance between two embedding rows of equal length.
pub fn sq_dist_f32(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    #[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
    {
        return avx2::sq_dist_f32(a, b);
    }

    #[cfg(all(
        not(all(target_arch = "x86_64", target_feature = "avx2")),
        target_arch = "aarch64",
        target_feature = "neon"
    ))]
    {
        return neon::sq_dist_f32(a, b);
    }

    #[cfg(not(any(
        all(target_arch = "x86_64", target_feature = "avx2"),
        all(target_arch = "aarch64", target_feature = "neon")
    )))]
    {
        sq_dist_scalar(a, b)
    }
}

#[allow(dead_code)]
fn sq_dist_scalar(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
#[path = "../../tests/src_inline/simd/mod.rs"]
mod tests;
