use super::aligned::Aligned;
use crate::InitError;
use crate::Real;
use crate::StateIndex;
use crate::MAX_STATES;

/// how a node carries its observations into the pruning recursion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// partials computed from two children, double buffered
    Internal,
    /// tip encoded as one state index per pattern
    StateTip,
    /// tip supplied as a full partial vector (external ambiguity or error model)
    PartialTip,
}

/// per-node storage. internals flip between two arenas; tips never flip.
enum Slot {
    Internal([Aligned; 2]),
    StateTip(Vec<StateIndex>),
    PartialTip(Aligned),
}

/// a child as the kernel dispatcher sees it
pub enum Child<'a> {
    States(&'a [StateIndex]),
    Partials(&'a [Real]),
}

/// disjoint borrows for one pruning operation: both children read-only,
/// the parent's alternate arena writable
pub struct Views<'a> {
    pub child1: Child<'a>,
    pub matrix1: &'a [Real],
    pub child2: Child<'a>,
    pub matrix2: &'a [Real],
    pub parent: &'a mut [Real],
}

/// owns every per-node array in the core: transition matrices (two arenas
/// per node) and partials (two arenas per internal node), plus the live
/// index bit per node and its shadow for store/restore.
pub struct Pool {
    states: usize,
    patterns: usize,
    categories: usize,
    slots: Vec<Slot>,
    matrices: Vec<[Aligned; 2]>,
    live_matrix: Vec<u8>,
    live_partials: Vec<u8>,
    shadow_matrix: Vec<u8>,
    shadow_partials: Vec<u8>,
}

impl Pool {
    pub fn new(
        states: usize,
        patterns: usize,
        categories: usize,
        kinds: &[Kind],
    ) -> Result<Self, InitError> {
        if !(2..=MAX_STATES).contains(&states) {
            return Err(InitError::Alphabet(states));
        }
        if patterns == 0 {
            return Err(InitError::Dimension { name: "patterns" });
        }
        if categories == 0 {
            return Err(InitError::Dimension { name: "categories" });
        }
        if kinds.is_empty() {
            return Err(InitError::Dimension { name: "nodes" });
        }
        let nodes = kinds.len();
        let matrix_len = categories * states * states;
        let partials_len = categories * patterns * states;
        let mut slots = Vec::with_capacity(nodes);
        let mut matrices = Vec::with_capacity(nodes);
        for kind in kinds {
            slots.push(match kind {
                Kind::Internal => {
                    Slot::Internal([Aligned::zeroed(partials_len)?, Aligned::zeroed(partials_len)?])
                }
                Kind::StateTip => Slot::StateTip(vec![0; patterns]),
                Kind::PartialTip => Slot::PartialTip(Aligned::zeroed(partials_len)?),
            });
            matrices.push([Aligned::zeroed(matrix_len)?, Aligned::zeroed(matrix_len)?]);
        }
        log::debug!(
            "pool: {} nodes, {} reals in matrices, {} reals in partials",
            nodes,
            2 * nodes * matrix_len,
            slots
                .iter()
                .map(|s| match s {
                    Slot::Internal(_) => 2 * partials_len,
                    Slot::StateTip(_) => 0,
                    Slot::PartialTip(_) => partials_len,
                })
                .sum::<usize>(),
        );
        Ok(Self {
            states,
            patterns,
            categories,
            slots,
            matrices,
            live_matrix: vec![0; nodes],
            live_partials: vec![0; nodes],
            shadow_matrix: vec![0; nodes],
            shadow_partials: vec![0; nodes],
        })
    }

    pub fn states(&self) -> usize {
        self.states
    }
    pub fn patterns(&self) -> usize {
        self.patterns
    }
    pub fn categories(&self) -> usize {
        self.categories
    }
    pub fn nodes(&self) -> usize {
        self.slots.len()
    }

    pub fn kind(&self, n: usize) -> Kind {
        match &self.slots[n] {
            Slot::Internal(_) => Kind::Internal,
            Slot::StateTip(_) => Kind::StateTip,
            Slot::PartialTip(_) => Kind::PartialTip,
        }
    }

    /// a specific matrix arena, independent of which one is live
    pub fn matrix_mut(&mut self, n: usize, b: usize) -> &mut [Real] {
        &mut self.matrices[n][b]
    }

    /// a specific partial arena of an internal node
    pub fn partials_mut(&mut self, n: usize, b: usize) -> &mut [Real] {
        match &mut self.slots[n] {
            Slot::Internal(bufs) => &mut bufs[b],
            _ => panic!("node {} has no double-buffered partials", n),
        }
    }

    /// the transition matrix arena consistent with the current parameters
    pub fn live_matrix(&self, n: usize) -> &[Real] {
        &self.matrices[n][self.live_matrix[n] as usize]
    }

    /// the arena the next updateMatrix pass writes into
    pub fn alt_matrix_mut(&mut self, n: usize) -> &mut [Real] {
        &mut self.matrices[n][1 - self.live_matrix[n] as usize]
    }

    pub fn flip_matrix(&mut self, n: usize) {
        self.live_matrix[n] ^= 1;
    }

    /// the live partials of an internal or partial-tip node
    pub fn live_partials(&self, n: usize) -> &[Real] {
        match &self.slots[n] {
            Slot::Internal(bufs) => &bufs[self.live_partials[n] as usize],
            Slot::PartialTip(buf) => buf,
            Slot::StateTip(_) => panic!("node {} holds states, not partials", n),
        }
    }

    pub fn flip_partials(&mut self, n: usize) {
        debug_assert!(self.kind(n) == Kind::Internal, "tips do not flip");
        self.live_partials[n] ^= 1;
    }

    pub fn tip_states(&self, n: usize) -> &[StateIndex] {
        match &self.slots[n] {
            Slot::StateTip(states) => states,
            _ => panic!("node {} is not a state tip", n),
        }
    }

    pub fn tip_states_mut(&mut self, n: usize) -> &mut [StateIndex] {
        match &mut self.slots[n] {
            Slot::StateTip(states) => states,
            _ => panic!("node {} is not a state tip", n),
        }
    }

    pub fn tip_partials_mut(&mut self, n: usize) -> &mut [Real] {
        match &mut self.slots[n] {
            Slot::PartialTip(buf) => buf,
            _ => panic!("node {} is not a partial tip", n),
        }
    }

    /// gather one operation's borrows: children live, parent alternate.
    /// node indices must be pairwise distinct.
    pub fn views(&mut self, child1: usize, child2: usize, parent: usize) -> Views<'_> {
        let live1 = self.live_partials[child1] as usize;
        let live2 = self.live_partials[child2] as usize;
        let alt = 1 - self.live_partials[parent] as usize;
        let matrix1 = &self.matrices[child1][self.live_matrix[child1] as usize][..];
        let matrix2 = &self.matrices[child2][self.live_matrix[child2] as usize][..];
        let [s1, s2, sp] = self
            .slots
            .get_disjoint_mut([child1, child2, parent])
            .expect("operation nodes must be distinct");
        let parent = match sp {
            Slot::Internal(bufs) => &mut bufs[alt][..],
            _ => panic!("operation parent {} must be internal", parent),
        };
        Views {
            child1: Self::child(s1, live1),
            matrix1,
            child2: Self::child(s2, live2),
            matrix2,
            parent,
        }
    }

    fn child(slot: &Slot, live: usize) -> Child<'_> {
        match slot {
            Slot::Internal(bufs) => Child::Partials(&bufs[live]),
            Slot::StateTip(states) => Child::States(states),
            Slot::PartialTip(buf) => Child::Partials(buf),
        }
    }

    /// snapshot the live index vectors. arena contents are never copied.
    pub fn store(&mut self) {
        self.shadow_matrix.copy_from_slice(&self.live_matrix);
        self.shadow_partials.copy_from_slice(&self.live_partials);
    }

    /// swap roles with the snapshot. every arena physically persists, so
    /// this reverts any number of flips in one pass.
    pub fn restore(&mut self) {
        std::mem::swap(&mut self.live_matrix, &mut self.shadow_matrix);
        std::mem::swap(&mut self.live_partials, &mut self.shadow_partials);
    }
}
