//! runtime-S kernels serving every alphabet without a tuned specialization.
//! strided (pattern, state) views keep the index arithmetic local; the
//! specialized kernels must agree with these bit for bit.

use crate::Real;
use crate::StateIndex;

/// one category block: both children are state-coded tips
pub fn states_states(
    s: usize,
    x1: &[StateIndex],
    m1: &[Real],
    x2: &[StateIndex],
    m2: &[Real],
    out: &mut [Real],
) {
    for ((out_k, &s1), &s2) in out.chunks_exact_mut(s).zip(x1).zip(x2) {
        let s1 = s1 as usize;
        let s2 = s2 as usize;
        match (s1 < s, s2 < s) {
            (true, true) => {
                for (i, slot) in out_k.iter_mut().enumerate() {
                    *slot = m1[i * s + s1] * m2[i * s + s2];
                }
            }
            (true, false) => {
                for (i, slot) in out_k.iter_mut().enumerate() {
                    *slot = m1[i * s + s1];
                }
            }
            (false, true) => {
                for (i, slot) in out_k.iter_mut().enumerate() {
                    *slot = m2[i * s + s2];
                }
            }
            (false, false) => out_k.fill(1.0),
        }
    }
}

/// one category block: state-coded child 1, partials child 2
pub fn states_partials(
    s: usize,
    x1: &[StateIndex],
    m1: &[Real],
    p2: &[Real],
    m2: &[Real],
    out: &mut [Real],
) {
    for ((out_k, &s1), p2_k) in out
        .chunks_exact_mut(s)
        .zip(x1)
        .zip(p2.chunks_exact(s))
    {
        let s1 = s1 as usize;
        for (i, slot) in out_k.iter_mut().enumerate() {
            let row2 = &m2[i * s..][..s];
            let sum = row2.iter().zip(p2_k).map(|(m, p)| m * p).sum::<Real>();
            *slot = match s1 < s {
                true => m1[i * s + s1] * sum,
                false => sum,
            };
        }
    }
}

/// one category block: both children carry partials
pub fn partials_partials(
    s: usize,
    p1: &[Real],
    m1: &[Real],
    p2: &[Real],
    m2: &[Real],
    out: &mut [Real],
) {
    for ((out_k, p1_k), p2_k) in out
        .chunks_exact_mut(s)
        .zip(p1.chunks_exact(s))
        .zip(p2.chunks_exact(s))
    {
        for (i, slot) in out_k.iter_mut().enumerate() {
            let row1 = &m1[i * s..][..s];
            let row2 = &m2[i * s..][..s];
            let sum1 = row1.iter().zip(p1_k).map(|(m, p)| m * p).sum::<Real>();
            let sum2 = row2.iter().zip(p2_k).map(|(m, p)| m * p).sum::<Real>();
            *slot = sum1 * sum2;
        }
    }
}
