use crate::buffer::pool::Child;
use crate::buffer::pool::Kind;
use crate::buffer::pool::Pool;
use crate::buffer::pool::Views;
use crate::eigen::Eigen;
use crate::kernel::Kernel;
use crate::mixture;
use crate::versioned::Versioned;
use crate::BranchLength;
use crate::InitError;
use crate::LogLik;
use crate::Probability;
use crate::Rate;
use crate::Real;
use crate::StateIndex;

/// one pruning step: combine two children into their parent. lists of these
/// arrive in post-order with respect to the dirty subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub child1: usize,
    pub child2: usize,
    pub parent: usize,
}

impl From<(usize, usize, usize)> for Operation {
    fn from((child1, child2, parent): (usize, usize, usize)) -> Self {
        Self {
            child1,
            child2,
            parent,
        }
    }
}

/// the likelihood engine: owns every per-node arena, the model state with
/// its shadow copies, and the kernel dispatcher. a proposal driver talks to
/// this and nothing else.
///
/// the update cycle per proposal is
///   store() -> updateMatrices -> updatePartials -> logLikelihoods,
/// then restore() if rejected. restore never recomputes or copies arenas,
/// it swaps the live-index vectors back.
pub struct Felsenstein {
    pool: Pool,
    kernel: Kernel,
    eigen: Versioned<Eigen>,
    frequencies: Versioned<Vec<Probability>>,
    rates: Versioned<Vec<Rate>>,
    proportions: Versioned<Vec<Probability>>,
    integrated: Vec<Real>,
    iexp: Vec<Real>,
}

impl Felsenstein {
    /// allocate a core for fixed dimensions. model state starts neutral:
    /// identity decomposition, uniform frequencies, unit rates, uniform
    /// proportions, so every operation is legal from the first call.
    pub fn new(
        states: usize,
        patterns: usize,
        categories: usize,
        kinds: &[Kind],
    ) -> Result<Self, InitError> {
        let pool = Pool::new(states, patterns, categories, kinds)?;
        Ok(Self {
            kernel: Kernel::new(states, patterns, categories),
            eigen: Versioned::new(Eigen::identity(states)),
            frequencies: Versioned::new(vec![1.0 / states as Probability; states]),
            rates: Versioned::new(vec![1.0; categories]),
            proportions: Versioned::new(vec![1.0 / categories as Probability; categories]),
            integrated: vec![0.0; patterns * states],
            iexp: vec![0.0; states * states],
            pool,
        })
    }

    pub fn states(&self) -> usize {
        self.pool.states()
    }
    pub fn patterns(&self) -> usize {
        self.pool.patterns()
    }
    pub fn categories(&self) -> usize {
        self.pool.categories()
    }
    pub fn nodes(&self) -> usize {
        self.pool.nodes()
    }

    /// live partials of an internal or partial-tip node, for inspection
    pub fn partials(&self, n: usize) -> &[Real] {
        self.pool.live_partials(n)
    }

    /// live transition matrices of a node, for inspection
    pub fn matrix(&self, n: usize) -> &[Real] {
        self.pool.live_matrix(n)
    }

    /// write a state-coded tip. values at or above the alphabet size are
    /// stored as the canonical unknown/gap sentinel. tips do not flip.
    pub fn set_tip_states(&mut self, n: usize, states: &[StateIndex]) {
        assert_eq!(states.len(), self.pool.patterns());
        let sentinel = self.pool.states() as StateIndex;
        for (slot, &state) in self.pool.tip_states_mut(n).iter_mut().zip(states) {
            *slot = state.min(sentinel);
        }
    }

    /// write a partials-coded tip. accepts one category block of P x S,
    /// replicated across categories, or the full R x P x S array.
    pub fn set_tip_partials(&mut self, n: usize, partials: &[Real]) {
        let block = self.pool.patterns() * self.pool.states();
        let full = self.pool.categories() * block;
        let slot = self.pool.tip_partials_mut(n);
        match partials.len() {
            len if len == block => {
                for chunk in slot.chunks_exact_mut(block) {
                    chunk.copy_from_slice(partials);
                }
            }
            len if len == full => slot.copy_from_slice(partials),
            len => panic!("tip partials want {} or {} values, got {}", block, full, len),
        }
    }

    /// swap in a new spectral form. writes the live slot; store/restore
    /// guards the previous one.
    pub fn set_eigen(&mut self, eigen: Eigen) {
        assert_eq!(eigen.states(), self.pool.states());
        *self.eigen.live_mut() = eigen;
    }

    pub fn set_frequencies(&mut self, frequencies: &[Probability]) {
        self.frequencies.live_mut().copy_from_slice(frequencies);
    }

    pub fn set_category_rates(&mut self, rates: &[Rate]) {
        self.rates.live_mut().copy_from_slice(rates);
    }

    pub fn set_category_proportions(&mut self, proportions: &[Probability]) {
        self.proportions.live_mut().copy_from_slice(proportions);
    }

    /// rebuild the transition matrices of the listed nodes at the given
    /// branch lengths, one category block per rate, into each node's
    /// alternate arena, then flip. entries are independent.
    pub fn update_matrices(&mut self, nodes: &[usize], lengths: &[BranchLength]) {
        assert_eq!(nodes.len(), lengths.len());
        let ss = self.pool.states() * self.pool.states();
        let eigen = self.eigen.live();
        let rates = self.rates.live();
        for (&n, &t) in nodes.iter().zip(lengths) {
            let arena = self.pool.alt_matrix_mut(n);
            for (l, &rate) in rates.iter().enumerate() {
                eigen.transition(t, rate, &mut arena[l * ss..][..ss], &mut self.iexp);
            }
            self.pool.flip_matrix(n);
        }
        log::debug!("rebuilt {} transition matrices", nodes.len());
    }

    /// run the pruning kernels over a post-order operation list, in caller
    /// order. each op reads its children's live arenas, writes the parent's
    /// alternate arena, and flips the parent.
    pub fn update_partials(&mut self, operations: &[Operation]) {
        for op in operations {
            let Views {
                child1,
                matrix1,
                child2,
                matrix2,
                parent,
            } = self.pool.views(op.child1, op.child2, op.parent);
            match (child1, child2) {
                (Child::States(x1), Child::States(x2)) => {
                    self.kernel.states_states(x1, matrix1, x2, matrix2, parent)
                }
                (Child::States(x1), Child::Partials(p2)) => {
                    self.kernel.states_partials(x1, matrix1, p2, matrix2, parent)
                }
                (Child::Partials(p1), Child::States(x2)) => {
                    self.kernel.states_partials(x2, matrix2, p1, matrix1, parent)
                }
                (Child::Partials(p1), Child::Partials(p2)) => {
                    self.kernel.partials_partials(p1, matrix1, p2, matrix2, parent)
                }
            }
            self.pool.flip_partials(op.parent);
            log::trace!(
                "pruned ({}, {}) -> {}",
                op.child1,
                op.child2,
                op.parent
            );
        }
        log::debug!("ran {} pruning operations", operations.len());
    }

    /// per-pattern log likelihood at the root: mixture integration, then
    /// the stationary-frequency reduction. anomalies stay in `out`.
    pub fn log_likelihoods(&mut self, root: usize, out: &mut [LogLik]) {
        assert_eq!(out.len(), self.pool.patterns());
        mixture::integrate(
            self.proportions.live(),
            self.pool.live_partials(root),
            &mut self.integrated,
        );
        mixture::reduce(self.frequencies.live(), &self.integrated, out);
    }

    /// snapshot model state and live-index vectors. arena contents are
    /// never copied; both physical arenas persist through the proposal.
    pub fn store(&mut self) {
        self.eigen.store();
        self.frequencies.store();
        self.rates.store();
        self.proportions.store();
        self.pool.store();
    }

    /// reject the proposal: swap every snapshot back. O(nodes).
    pub fn restore(&mut self) {
        self.eigen.restore();
        self.frequencies.restore();
        self.rates.restore();
        self.proportions.restore();
        self.pool.restore();
    }
}
