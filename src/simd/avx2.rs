#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
pub fn sum_u32(values: &[u32]) -> u64 {
    // SAFETY: this function is compiled only when target includes AVX2.
    unsafe { sum_u32_avx2(values) }
}

#[cfg(not(all(target_arch = "x86_64", target_feature = "avx2")))]
pub fn sum_u32(values: &[u32]) -> u64 {
    values.iter().map(|v| *v as u64).sum()
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
pub fn sq_dist_f32(a: &[f32], b: &[f32]) -> f32 {
    // SAFETY: this function is compiled only when target includes AVX2.
    unsafe { sq_dist_f32_avx2(a, b) }
}

#[cfg(not(all(target_arch = "x86_64", target_feature = "avx2")))]
pub fn sq_dist_f32(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
#[target_feature(enable = "avx2")]
unsafe fn sum_u32_avx2(values: &[u32]) -> u64 {
    let mut i = 0usize;
    let len = values.len();
    let mut acc_lo = _mm256_setzero_si256();
    let mut acc_hi = _mm256_setzero_si256();

    while i + 8 <= len {
        let v = unsafe { _mm256_loadu_si256(values.as_ptr().add(i) as *const __m256i) };

        let lo64 = _mm256_cvtepu32_epi64(_mm256_castsi256_si128(v));
        let hi64 = _mm256_cvtepu32_epi64(_mm256_extracti128_si256(v, 1));

        acc_lo = _mm256_add_epi64(acc_lo, lo64);
        acc_hi = _mm256_add_epi64(acc_hi, hi64);

        i += 8;
    }

    let mut buf_lo = [0u64; 4];
    let mut buf_hi = [0u64; 4];
    unsafe {
        _mm256_storeu_si256(buf_lo.as_mut_ptr() as *mut __m256i, acc_lo);
        _mm256_storeu_si256(buf_hi.as_mut_ptr() as *mut __m256i, acc_hi);
    }

    let mut sum = buf_lo.iter().sum::<u64>() + buf_hi.iter().sum::<u64>();
    for v in &values[i..] {
        sum += *v as u64;
    }
    sum
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
#[target_feature(enable = "avx2")]
unsafe fn sq_dist_f32_avx2(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    let mut i = 0usize;
    let mut acc = _mm256_setzero_ps();

    while i + 8 <= len {
        let (va, vb) = unsafe {
            (
                _mm256_loadu_ps(a.as_ptr().add(i)),
                _mm256_loadu_ps(b.as_ptr().add(i)),
            )
        };
        let d = _mm256_sub_ps(va, vb);
        acc = _mm256_add_ps(acc, _mm256_mul_ps(d, d));
        i += 8;
    }

    let mut buf = [0f32; 8];
    unsafe { _mm256_storeu_ps(buf.as_mut_ptr(), acc) };
    let mut sum: f32 = buf.iter().sum();
    while i < len {
        let d = a[i] - b[i];
        sum += d * d;
        i += 1;
    }
    sum
}
