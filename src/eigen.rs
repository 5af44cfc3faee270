use crate::InitError;
use crate::Rate;
use crate::Real;
use crate::MAX_STATES;
use crate::MIN_PROB;

/// owned spectral form of a rate matrix Q = U diag(lambda) U^-1, as supplied
/// by an external eigendecomposer. the derived tensor
/// `c[i*S*S + j*S + k] = U[i,k] * U^-1[k,j]` turns each transition matrix
/// cell into a single dot product against the exponentiated eigenvalues.
///
/// complex conjugate eigenvalue pairs sit at adjacent indices; the pair's
/// imaginary part is taken from its first member by convention. any complex
/// pair disables the cMatrix fast path, because the pair's 2x2 rotation
/// block mixes rows of U^-1 that the diagonal tensor cannot express.
#[derive(Debug, Clone)]
pub struct Eigen {
    states: usize,
    vectors: Vec<Real>,
    inverse: Vec<Real>,
    values: Vec<Real>,
    values_imag: Vec<Real>,
    c_matrix: Vec<Real>,
    complex: bool,
}

impl Eigen {
    pub fn new(
        states: usize,
        vectors: &[Real],
        inverse: &[Real],
        values: &[Real],
        values_imag: Option<&[Real]>,
    ) -> Result<Self, InitError> {
        if !(2..=MAX_STATES).contains(&states) {
            return Err(InitError::Alphabet(states));
        }
        Self::shaped("eigenvectors", vectors, states * states)?;
        Self::shaped("inverse eigenvectors", inverse, states * states)?;
        Self::shaped("eigenvalues", values, states)?;
        let values_imag = match values_imag {
            Some(imag) => {
                Self::shaped("imaginary eigenvalues", imag, states)?;
                imag.to_vec()
            }
            None => vec![0.0; states],
        };
        let mut c_matrix = vec![0.0; states * states * states];
        let mut c = 0;
        for i in 0..states {
            for j in 0..states {
                for k in 0..states {
                    c_matrix[c] = vectors[i * states + k] * inverse[k * states + j];
                    c += 1;
                }
            }
        }
        Ok(Self {
            states,
            vectors: vectors.to_vec(),
            inverse: inverse.to_vec(),
            values: values.to_vec(),
            complex: values_imag.iter().any(|&b| b != 0.0),
            values_imag,
            c_matrix,
        })
    }

    fn shaped(name: &'static str, got: &[Real], expected: usize) -> Result<(), InitError> {
        match got.len() == expected {
            true => Ok(()),
            false => Err(InitError::Shape {
                name,
                expected,
                got: got.len(),
            }),
        }
    }

    /// the decomposition of Q = 0: every transition matrix is the identity.
    /// a fresh core starts here so it is evaluable before a model arrives.
    pub fn identity(states: usize) -> Self {
        let mut vectors = vec![0.0; states * states];
        for i in 0..states {
            vectors[i * states + i] = 1.0;
        }
        Self::new(states, &vectors, &vectors, &vec![0.0; states], None)
            .expect("identity decomposition")
    }

    /// spectral form of the symmetric equal-rates model (Jukes-Cantor
    /// generalized to S states, unit total rate): eigenvalue 0 on the
    /// stationary direction and -S/(S-1) on the sum-zero subspace, with an
    /// orthonormal Helmert basis so the inverse is the transpose.
    pub fn equal_rates(states: usize) -> Self {
        let s = states;
        let mut vectors = vec![0.0; s * s];
        let mut inverse = vec![0.0; s * s];
        let unit = 1.0 / (s as Real).sqrt();
        for i in 0..s {
            vectors[i * s] = unit;
            inverse[i] = unit;
        }
        for m in 1..s {
            let norm = 1.0 / ((m * (m + 1)) as Real).sqrt();
            for j in 0..m {
                vectors[j * s + m] = norm;
                inverse[m * s + j] = norm;
            }
            vectors[m * s + m] = -(m as Real) * norm;
            inverse[m * s + m] = -(m as Real) * norm;
        }
        let mut values = vec![-(s as Real) / (s as Real - 1.0); s];
        values[0] = 0.0;
        Self::new(s, &vectors, &inverse, &values, None).expect("equal rates decomposition")
    }

    pub fn states(&self) -> usize {
        self.states
    }

    /// write one floored S x S transition matrix for branch length `t`
    /// scaled by category rate `rate`. `iexp` is caller scratch of S*S,
    /// touched only on the complex path.
    pub fn transition(&self, t: Real, rate: Rate, out: &mut [Real], iexp: &mut [Real]) {
        debug_assert_eq!(out.len(), self.states * self.states);
        debug_assert_eq!(iexp.len(), self.states * self.states);
        let tau = t * rate;
        match self.complex {
            false => self.spectral(tau, out),
            true => self.rotational(tau, out, iexp),
        }
    }

    /// all-real eigenvalues: one dot product per cell against exp(lambda tau)
    fn spectral(&self, tau: Real, out: &mut [Real]) {
        let s = self.states;
        let mut tmp = [0.0; MAX_STATES];
        for (e, &lambda) in tmp.iter_mut().zip(self.values.iter()) {
            *e = (lambda * tau).exp();
        }
        for (cell, row) in out.iter_mut().zip(self.c_matrix.chunks_exact(s)) {
            let sum = row.iter().zip(&tmp[..s]).map(|(c, e)| c * e).sum::<Real>();
            *cell = if sum < 0.0 { MIN_PROB } else { sum };
        }
    }

    /// conjugate pairs present: exponentiate block-diagonally onto U^-1,
    /// then multiply U back in. for a pair a +- bi at rows (k, k+1),
    /// exp(At) acts as the 2x2 block [cos, sin; -sin, cos] scaled by exp(a tau).
    fn rotational(&self, tau: Real, out: &mut [Real], iexp: &mut [Real]) {
        let s = self.states;
        let mut k = 0;
        while k < s {
            let a = self.values[k];
            let b = self.values_imag[k];
            if b == 0.0 {
                let e = (a * tau).exp();
                for j in 0..s {
                    iexp[k * s + j] = self.inverse[k * s + j] * e;
                }
                k += 1;
            } else {
                let e = (a * tau).exp();
                let cos = e * (b * tau).cos();
                let sin = e * (b * tau).sin();
                for j in 0..s {
                    let lo = self.inverse[k * s + j];
                    let hi = self.inverse[(k + 1) * s + j];
                    iexp[k * s + j] = cos * lo + sin * hi;
                    iexp[(k + 1) * s + j] = cos * hi - sin * lo;
                }
                k += 2;
            }
        }
        for i in 0..s {
            for j in 0..s {
                let mut sum = 0.0;
                for k in 0..s {
                    sum += self.vectors[i * s + k] * iexp[k * s + j];
                }
                out[i * s + j] = if sum < 0.0 { MIN_PROB } else { sum };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Arbitrary;

    /// Jukes-Cantor spectral form: lambda = (0, -4/3, -4/3, -4/3) under the
    /// symmetric change-of-basis with unit total rate.
    pub fn jukes_cantor() -> Eigen {
        Eigen::new(
            4,
            &[
                1.0, 1.0, 0.0, 1.0, //
                1.0, -1.0, 0.0, 1.0, //
                1.0, 0.0, 1.0, -1.0, //
                1.0, 0.0, -1.0, -1.0, //
            ],
            &[
                0.25, 0.25, 0.25, 0.25, //
                0.5, -0.5, 0.0, 0.0, //
                0.0, 0.0, 0.5, -0.5, //
                0.25, 0.25, -0.25, -0.25, //
            ],
            &[0.0, -4.0 / 3.0, -4.0 / 3.0, -4.0 / 3.0],
            None,
        )
        .unwrap()
    }

    impl Arbitrary for Eigen {
        /// Jukes-Cantor with a random overall rate: still a valid spectral
        /// form, so every derived matrix stays row stochastic
        fn random() -> Self {
            let mu = 0.5 + 1.5 * rand::random::<Real>();
            let jc = jukes_cantor();
            let values = jc.values.iter().map(|&l| l * mu).collect::<Vec<_>>();
            Eigen::new(4, &jc.vectors, &jc.inverse, &values, None).unwrap()
        }
    }

    /// truncated series for exp(Q t), reference only
    fn expm(q: &[Real], s: usize, t: Real) -> Vec<Real> {
        let mut out = vec![0.0; s * s];
        let mut term = vec![0.0; s * s];
        for i in 0..s {
            out[i * s + i] = 1.0;
            term[i * s + i] = 1.0;
        }
        for n in 1..64 {
            let mut next = vec![0.0; s * s];
            for i in 0..s {
                for j in 0..s {
                    let mut sum = 0.0;
                    for k in 0..s {
                        sum += term[i * s + k] * q[k * s + j];
                    }
                    next[i * s + j] = sum * t / n as Real;
                }
            }
            for (o, x) in out.iter_mut().zip(&next) {
                *o += x;
            }
            term = next;
        }
        out
    }

    #[test]
    fn identity_at_zero_branch_length() {
        let eigen = Eigen::random();
        let mut out = vec![0.0; 16];
        let mut iexp = vec![0.0; 16];
        eigen.transition(0.0, 1.0, &mut out, &mut iexp);
        for i in 0..4 {
            for j in 0..4 {
                let want = if i == j { 1.0 } else { 0.0 };
                assert!((out[i * 4 + j] - want).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn rows_are_stochastic() {
        let eigen = Eigen::random();
        let mut out = vec![0.0; 16];
        let mut iexp = vec![0.0; 16];
        for t in [0.01, 0.1, 1.0, 10.0] {
            eigen.transition(t, 1.0, &mut out, &mut iexp);
            for row in out.chunks_exact(4) {
                let sum = row.iter().sum::<Real>();
                assert!((sum - 1.0).abs() <= 1e-9 * 4.0, "row sum {}", sum);
                assert!(row.iter().all(|&p| p >= 0.0));
            }
        }
    }

    #[test]
    fn jukes_cantor_closed_form() {
        let eigen = jukes_cantor();
        let mut out = vec![0.0; 16];
        let mut iexp = vec![0.0; 16];
        for t in [0.1, 0.5, 2.0] {
            eigen.transition(t, 1.0, &mut out, &mut iexp);
            let same = 0.25 + 0.75 * (-4.0 * t / 3.0 as Real).exp();
            let diff = 0.25 - 0.25 * (-4.0 * t / 3.0 as Real).exp();
            for i in 0..4 {
                for j in 0..4 {
                    let want = if i == j { same } else { diff };
                    assert!((out[i * 4 + j] - want).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn category_rate_scales_branch_length() {
        let eigen = Eigen::random();
        let mut a = vec![0.0; 16];
        let mut b = vec![0.0; 16];
        let mut iexp = vec![0.0; 16];
        eigen.transition(0.8, 2.5, &mut a, &mut iexp);
        eigen.transition(2.0, 1.0, &mut b, &mut iexp);
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn conjugate_pairs_match_series_exponential() {
        // cyclic 3-state model: eigenvalues 0 and -3/2 +- i sqrt(3)/2,
        // real basis from the circulant eigenvectors
        let sq = (3.0 as Real).sqrt();
        let q = [
            -1.0, 1.0, 0.0, //
            0.0, -1.0, 1.0, //
            1.0, 0.0, -1.0, //
        ];
        let vectors = [
            1.0, 1.0, 0.0, //
            1.0, -0.5, sq / 2.0, //
            1.0, -0.5, -sq / 2.0, //
        ];
        let inverse = [
            1.0 / 3.0,
            1.0 / 3.0,
            1.0 / 3.0, //
            2.0 / 3.0,
            -1.0 / 3.0,
            -1.0 / 3.0, //
            0.0,
            1.0 / sq,
            -1.0 / sq, //
        ];
        let values = [0.0, -1.5, -1.5];
        let imag = [0.0, sq / 2.0, -sq / 2.0];
        let eigen = Eigen::new(3, &vectors, &inverse, &values, Some(&imag)).unwrap();
        let mut out = vec![0.0; 9];
        let mut iexp = vec![0.0; 9];
        for t in [0.1, 0.7, 2.0] {
            eigen.transition(t, 1.0, &mut out, &mut iexp);
            let want = expm(&q, 3, t);
            for (x, y) in out.iter().zip(&want) {
                assert!((x - y).abs() < 1e-9, "{} vs {}", x, y);
            }
            for row in out.chunks_exact(3) {
                assert!((row.iter().sum::<Real>() - 1.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn equal_rates_closed_form() {
        for s in [2, 4, 8, 20, 61] {
            let eigen = Eigen::equal_rates(s);
            let mut out = vec![0.0; s * s];
            let mut iexp = vec![0.0; s * s];
            let t = 0.73;
            eigen.transition(t, 1.0, &mut out, &mut iexp);
            let decay = (-(s as Real) * t / (s as Real - 1.0)).exp();
            let same = 1.0 / s as Real + (1.0 - 1.0 / s as Real) * decay;
            let diff = 1.0 / s as Real * (1.0 - decay);
            for i in 0..s {
                for j in 0..s {
                    let want = if i == j { same } else { diff };
                    assert!((out[i * s + j] - want).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn floor_applies_to_negative_cells() {
        // a deliberately non-stochastic "decomposition" whose reassembly
        // goes negative: U = U^-1 = I with a sign flip in one cell
        let vectors = [1.0, 0.0, 0.0, 1.0];
        let inverse = [1.0, -2.0, 0.0, 1.0];
        let eigen = Eigen::new(2, &vectors, &inverse, &[0.0, 0.0], None).unwrap();
        let mut out = vec![0.0; 4];
        let mut iexp = vec![0.0; 4];
        eigen.transition(1.0, 1.0, &mut out, &mut iexp);
        assert_eq!(out[1], MIN_PROB);
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(matches!(
            Eigen::new(4, &[0.0; 15], &[0.0; 16], &[0.0; 4], None),
            Err(InitError::Shape { .. })
        ));
        assert!(matches!(
            Eigen::new(4, &[0.0; 16], &[0.0; 16], &[0.0; 3], None),
            Err(InitError::Shape { .. })
        ));
        assert!(matches!(
            Eigen::new(1, &[0.0; 1], &[0.0; 1], &[0.0; 1], None),
            Err(InitError::Alphabet(1))
        ));
    }
}
