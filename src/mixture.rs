//! root-side tail of the pruning pass: collapse the rate-category mixture,
//! then reduce each pattern against the stationary frequencies.

use crate::LogLik;
use crate::Probability;
use crate::Real;

/// weight each category block by its mixture proportion and accumulate in
/// one pass over the root partials. `out` is P x S, `partials` is R x P x S.
pub fn integrate(proportions: &[Probability], partials: &[Real], out: &mut [Real]) {
    let ps = out.len();
    debug_assert_eq!(partials.len(), proportions.len() * ps);
    for (l, &weight) in proportions.iter().enumerate() {
        let block = &partials[l * ps..][..ps];
        match l {
            0 => {
                for (slot, x) in out.iter_mut().zip(block) {
                    *slot = x * weight;
                }
            }
            _ => {
                for (slot, x) in out.iter_mut().zip(block) {
                    *slot += x * weight;
                }
            }
        }
    }
}

/// per-pattern inner product with the stationary frequencies, then ln.
/// nonpositive site mass yields -inf; a NaN mass falls through the ln and
/// stays NaN. anomalies travel in the output, the driver decides what a
/// non-finite site likelihood means.
pub fn reduce(frequencies: &[Probability], integrated: &[Real], out: &mut [LogLik]) {
    let s = frequencies.len();
    debug_assert_eq!(integrated.len(), out.len() * s);
    for (loglik, block) in out.iter_mut().zip(integrated.chunks_exact(s)) {
        let sum = frequencies
            .iter()
            .zip(block)
            .map(|(f, x)| f * x)
            .sum::<Real>();
        *loglik = match sum <= 0.0 {
            true => Real::NEG_INFINITY,
            false => sum.ln(),
        };
    }
}
