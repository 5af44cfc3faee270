use crate::Real;
use crate::StateIndex;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub mod fixed;
pub mod generic;
pub mod nucleotide;
pub mod simd;

/// pruning kernel dispatcher. picks the tuned form for the alphabet at
/// every call and fans the category blocks out when built with `parallel`.
/// each kernel writes a parent's full R x P x S partial array from two
/// children; the caller owns buffer selection and flipping.
pub struct Kernel {
    states: usize,
    patterns: usize,
    categories: usize,
    avx: bool,
}

impl Kernel {
    pub fn new(states: usize, patterns: usize, categories: usize) -> Self {
        let avx = states == 4 && simd::detect();
        if avx {
            log::debug!("avx kernel enabled for 4-state partials");
        }
        Self {
            states,
            patterns,
            categories,
            avx,
        }
    }

    /// both children are state-coded tips
    pub fn states_states(
        &self,
        x1: &[StateIndex],
        m1: &[Real],
        x2: &[StateIndex],
        m2: &[Real],
        out: &mut [Real],
    ) {
        self.check_states(x1);
        self.check_states(x2);
        self.check_matrix(m1);
        self.check_matrix(m2);
        let ss = self.states * self.states;
        self.categories_mut(out, |l, out| {
            let m1 = &m1[l * ss..][..ss];
            let m2 = &m2[l * ss..][..ss];
            match self.states {
                4 => nucleotide::states_states(x1, m1, x2, m2, out),
                8 => fixed::states_states::<8>(x1, m1, x2, m2, out),
                20 => fixed::states_states::<20>(x1, m1, x2, m2, out),
                s => generic::states_states(s, x1, m1, x2, m2, out),
            }
        });
    }

    /// state-coded child 1, partials child 2
    pub fn states_partials(
        &self,
        x1: &[StateIndex],
        m1: &[Real],
        p2: &[Real],
        m2: &[Real],
        out: &mut [Real],
    ) {
        self.check_states(x1);
        self.check_partials(p2);
        self.check_matrix(m1);
        self.check_matrix(m2);
        let ss = self.states * self.states;
        let ps = self.patterns * self.states;
        self.categories_mut(out, |l, out| {
            let m1 = &m1[l * ss..][..ss];
            let m2 = &m2[l * ss..][..ss];
            let p2 = &p2[l * ps..][..ps];
            match self.states {
                4 => nucleotide::states_partials(x1, m1, p2, m2, out),
                8 => fixed::states_partials::<8>(x1, m1, p2, m2, out),
                20 => fixed::states_partials::<20>(x1, m1, p2, m2, out),
                s => generic::states_partials(s, x1, m1, p2, m2, out),
            }
        });
    }

    /// both children carry partials
    pub fn partials_partials(
        &self,
        p1: &[Real],
        m1: &[Real],
        p2: &[Real],
        m2: &[Real],
        out: &mut [Real],
    ) {
        self.check_partials(p1);
        self.check_partials(p2);
        self.check_matrix(m1);
        self.check_matrix(m2);
        let ss = self.states * self.states;
        let ps = self.patterns * self.states;
        self.categories_mut(out, |l, out| {
            let m1 = &m1[l * ss..][..ss];
            let m2 = &m2[l * ss..][..ss];
            let p1 = &p1[l * ps..][..ps];
            let p2 = &p2[l * ps..][..ps];
            match self.states {
                4 => {
                    #[cfg(all(target_arch = "x86_64", not(feature = "single")))]
                    if self.avx {
                        unsafe { simd::avx::partials_partials4(p1, m1, p2, m2, out) };
                        return;
                    }
                    nucleotide::partials_partials(p1, m1, p2, m2, out)
                }
                8 => fixed::partials_partials::<8>(p1, m1, p2, m2, out),
                20 => fixed::partials_partials::<20>(p1, m1, p2, m2, out),
                s => generic::partials_partials(s, p1, m1, p2, m2, out),
            }
        });
    }

    /// run one closure per category block of `out`, in parallel when built
    /// with the `parallel` feature. blocks are disjoint by construction.
    fn categories_mut(&self, out: &mut [Real], run: impl Fn(usize, &mut [Real]) + Send + Sync) {
        let ps = self.patterns * self.states;
        debug_assert_eq!(out.len(), self.categories * ps);
        #[cfg(feature = "parallel")]
        out.par_chunks_mut(ps)
            .enumerate()
            .for_each(|(l, block)| run(l, block));
        #[cfg(not(feature = "parallel"))]
        out.chunks_mut(ps)
            .enumerate()
            .for_each(|(l, block)| run(l, block));
    }

    fn check_states(&self, x: &[StateIndex]) {
        debug_assert_eq!(x.len(), self.patterns);
    }

    fn check_partials(&self, p: &[Real]) {
        debug_assert_eq!(p.len(), self.categories * self.patterns * self.states);
    }

    fn check_matrix(&self, m: &[Real]) {
        debug_assert_eq!(m.len(), self.categories * self.states * self.states);
    }
}
