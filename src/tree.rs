use crate::buffer::pool::Kind;
use crate::felsenstein::Operation;
use crate::Arbitrary;
use crate::BranchLength;
use petgraph::graph::DiGraph;
use petgraph::graph::NodeIndex;
use petgraph::visit::DfsPostOrder;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rand::Rng;

/// rooted bifurcating tree adapter between a proposal driver and the core.
/// node weights are core node indices, edges run parent -> child and carry
/// the child's branch length. the adapter schedules; it never proposes.
///
/// core indices are dense: tips take 0..T, internals T..2T-1, the root last.
pub struct Phylogeny {
    graph: DiGraph<usize, BranchLength>,
    handle: Vec<NodeIndex>,
    tips: usize,
}

impl Phylogeny {
    /// two tips under one root
    pub fn cherry(t1: BranchLength, t2: BranchLength) -> Self {
        Self::caterpillar(&[t1, t2])
    }

    /// deterministic comb shape: tips 0 and 1 join first, every later tip
    /// joins the previous internal. `lengths[i]` is tip i's branch; internal
    /// branches start at unit length.
    pub fn caterpillar(lengths: &[BranchLength]) -> Self {
        let tips = lengths.len();
        assert!(tips >= 2, "a rooted bifurcating tree needs two tips");
        let mut graph = DiGraph::new();
        let mut handle = Vec::with_capacity(2 * tips - 1);
        for core in 0..2 * tips - 1 {
            handle.push(graph.add_node(core));
        }
        graph.add_edge(handle[tips], handle[0], lengths[0]);
        graph.add_edge(handle[tips], handle[1], lengths[1]);
        for i in 2..tips {
            let parent = handle[tips + i - 1];
            graph.add_edge(parent, handle[tips + i - 2], 1.0);
            graph.add_edge(parent, handle[i], lengths[i]);
        }
        Self {
            graph,
            handle,
            tips,
        }
    }

    /// random shape over `tips` leaves: repeatedly join two uniformly
    /// chosen subtree roots until one remains
    pub fn grow(tips: usize, rng: &mut impl Rng) -> Self {
        assert!(tips >= 2, "a rooted bifurcating tree needs two tips");
        let mut graph = DiGraph::new();
        let mut handle = Vec::with_capacity(2 * tips - 1);
        for core in 0..2 * tips - 1 {
            handle.push(graph.add_node(core));
        }
        let mut roots = (0..tips).collect::<Vec<_>>();
        let mut next = tips;
        while roots.len() > 1 {
            let a = roots.swap_remove(rng.random_range(0..roots.len()));
            let b = roots.swap_remove(rng.random_range(0..roots.len()));
            graph.add_edge(handle[next], handle[a], 0.05 + 0.5 * rng.random::<BranchLength>());
            graph.add_edge(handle[next], handle[b], 0.05 + 0.5 * rng.random::<BranchLength>());
            roots.push(next);
            next += 1;
        }
        Self {
            graph,
            handle,
            tips,
        }
    }

    pub fn tips(&self) -> usize {
        self.tips
    }

    pub fn nodes(&self) -> usize {
        self.graph.node_count()
    }

    pub fn root(&self) -> usize {
        self.nodes() - 1
    }

    pub fn is_tip(&self, n: usize) -> bool {
        n < self.tips
    }

    /// node kinds for core construction, every tip the same representation
    pub fn kinds(&self, tip: Kind) -> Vec<Kind> {
        (0..self.nodes())
            .map(|n| match self.is_tip(n) {
                true => tip,
                false => Kind::Internal,
            })
            .collect()
    }

    pub fn length(&self, n: usize) -> BranchLength {
        let edge = self
            .graph
            .edges_directed(self.handle[n], Direction::Incoming)
            .next()
            .expect("the root has no branch");
        *edge.weight()
    }

    pub fn set_length(&mut self, n: usize, t: BranchLength) {
        let edge = self
            .graph
            .edges_directed(self.handle[n], Direction::Incoming)
            .next()
            .expect("the root has no branch")
            .id();
        self.graph[edge] = t;
    }

    /// every node below the root paired with its branch length, ready for
    /// a full updateMatrices pass
    pub fn lengths(&self) -> (Vec<usize>, Vec<BranchLength>) {
        let nodes = (0..self.nodes()).filter(|&n| n != self.root()).collect::<Vec<_>>();
        let lengths = nodes.iter().map(|&n| self.length(n)).collect();
        (nodes, lengths)
    }

    fn children(&self, n: usize) -> (usize, usize) {
        let mut kids = self
            .graph
            .neighbors_directed(self.handle[n], Direction::Outgoing)
            .map(|h| self.graph[h]);
        let b = kids.next().expect("internal node");
        let a = kids.next().expect("bifurcating node");
        debug_assert!(kids.next().is_none());
        (a, b)
    }

    /// full post-order operation schedule for the whole tree
    pub fn operations(&self) -> Vec<Operation> {
        let mut ops = Vec::with_capacity(self.nodes() - self.tips);
        let mut walk = DfsPostOrder::new(&self.graph, self.handle[self.root()]);
        while let Some(h) = walk.next(&self.graph) {
            let n = self.graph[h];
            if !self.is_tip(n) {
                let (a, b) = self.children(n);
                ops.push(Operation::from((a, b, n)));
            }
        }
        ops
    }

    /// the operations invalidated by perturbing the branch above `n`,
    /// nearest ancestor first
    pub fn path_to_root(&self, n: usize) -> Vec<Operation> {
        let mut ops = Vec::new();
        let mut at = self.handle[n];
        while let Some(parent) = self
            .graph
            .neighbors_directed(at, Direction::Incoming)
            .next()
        {
            let p = self.graph[parent];
            let (a, b) = self.children(p);
            ops.push(Operation::from((a, b, p)));
            at = parent;
        }
        ops
    }
}

impl Arbitrary for Phylogeny {
    fn random() -> Self {
        Self::grow(8, &mut rand::rng())
    }
}
