//! explicit AVX path for the 4-state partials x partials kernel, the single
//! hottest loop of nucleotide workloads. one 256-bit lane holds a full
//! 4-state partial vector, so each output row is two multiplies and two
//! horizontal sums. every other kernel relies on the optimizer.

/// runtime check, taken once at dispatcher construction
#[cfg(all(target_arch = "x86_64", not(feature = "single")))]
pub fn detect() -> bool {
    std::arch::is_x86_feature_detected!("avx")
}

#[cfg(not(all(target_arch = "x86_64", not(feature = "single"))))]
pub fn detect() -> bool {
    false
}

#[cfg(all(target_arch = "x86_64", not(feature = "single")))]
pub mod avx {
    use std::arch::x86_64::*;

    /// one category block. matrices are 16 Reals, partials and out are
    /// pattern-count x 4. caller has verified AVX support.
    ///
    /// horizontal sums associate (x0+x2)+(x1+x3), so results can differ
    /// from the scalar kernel in the last ulp.
    #[target_feature(enable = "avx")]
    pub unsafe fn partials_partials4(
        p1: &[f64],
        m1: &[f64],
        p2: &[f64],
        m2: &[f64],
        out: &mut [f64],
    ) {
        unsafe {
            let rows1: [__m256d; 4] =
                std::array::from_fn(|i| _mm256_loadu_pd(m1.as_ptr().add(i * 4)));
            let rows2: [__m256d; 4] =
                std::array::from_fn(|i| _mm256_loadu_pd(m2.as_ptr().add(i * 4)));
            for k in 0..out.len() / 4 {
                let v1 = _mm256_loadu_pd(p1.as_ptr().add(k * 4));
                let v2 = _mm256_loadu_pd(p2.as_ptr().add(k * 4));
                for i in 0..4 {
                    let sum1 = hsum(_mm256_mul_pd(rows1[i], v1));
                    let sum2 = hsum(_mm256_mul_pd(rows2[i], v2));
                    *out.get_unchecked_mut(k * 4 + i) = sum1 * sum2;
                }
            }
        }
    }

    #[target_feature(enable = "avx")]
    unsafe fn hsum(v: __m256d) -> f64 {
        unsafe {
            let lo = _mm256_castpd256_pd128(v);
            let hi = _mm256_extractf128_pd::<1>(v);
            let sum = _mm_add_pd(lo, hi);
            let swap = _mm_unpackhi_pd(sum, sum);
            _mm_cvtsd_f64(_mm_add_sd(sum, swap))
        }
    }
}
