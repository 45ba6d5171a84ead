//! A control flow graph represented as an arena of nodes with ordered
//! predecessor and successor lists.
//!
//! Nodes are arena indices, so graphs are cheap to clone and carry no
//! interior pointers. Successors iterate in edge-insertion order, which is
//! also the order depth-first traversals explore children; every analysis
//! built on top of the graph is therefore deterministic for a given
//! construction sequence.

use cranelift_entity::packed_option::PackedOption;
use cranelift_entity::{EntitySet, PrimaryMap, entity_impl};
use smallvec::SmallVec;

#[cfg(feature = "enable-serde")]
use serde_derive::{Deserialize, Serialize};

/// An opaque reference to a basic block in a [`FlowGraph`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct Node(u32);
entity_impl!(Node, "n");

/// Per-node adjacency and display information.
#[derive(Clone, Default)]
struct NodeData {
    label: String,
    succs: SmallVec<[Node; 4]>,
    preds: SmallVec<[Node; 4]>,
}

/// Read-only view of a control flow graph, the adapter interface shared by
/// [`FlowGraph`] and the derived-sequence graphs.
///
/// Implementations must iterate nodes, successors and predecessors in a
/// stable order.
pub trait Cfg {
    /// The designated entry node, if one has been set.
    fn entry(&self) -> Option<Node>;

    /// Number of nodes in the graph.
    fn num_nodes(&self) -> usize;

    /// Iterate over all nodes in creation order.
    fn nodes(&self) -> impl Iterator<Item = Node> + '_;

    /// The ordered successors of `n`.
    fn succs(&self, n: Node) -> &[Node];

    /// The ordered predecessors of `n`.
    fn preds(&self, n: Node) -> &[Node];
}

/// A directed graph of basic blocks with a designated entry.
///
/// Edges form a set: inserting an edge twice has no effect. Nodes are never
/// deallocated; collapsing retires them, and retired nodes are skipped by
/// iteration.
#[derive(Clone, Default)]
pub struct FlowGraph {
    nodes: PrimaryMap<Node, NodeData>,
    entry: PackedOption<Node>,
    retired: EntitySet<Node>,
    live: usize,
}

impl FlowGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new node with an empty label.
    pub fn make_node(&mut self) -> Node {
        self.live += 1;
        self.nodes.push(NodeData::default())
    }

    /// Add a new node with the given display label.
    pub fn make_labeled(&mut self, label: impl Into<String>) -> Node {
        let n = self.make_node();
        self.nodes[n].label = label.into();
        n
    }

    /// The display label of `n`. Empty if none was set.
    pub fn label(&self, n: Node) -> &str {
        &self.nodes[n].label
    }

    /// Set the display label of `n`.
    pub fn set_label(&mut self, n: Node, label: impl Into<String>) {
        self.nodes[n].label = label.into();
    }

    /// Designate `n` as the entry node.
    pub fn set_entry(&mut self, n: Node) {
        debug_assert!(self.is_live(n));
        self.entry = n.into();
    }

    /// Does `n` refer to a node of this graph that has not been retired?
    pub fn is_live(&self, n: Node) -> bool {
        self.nodes.is_valid(n) && !self.retired.contains(n)
    }

    /// Insert the edge `from -> to`. Inserting an existing edge is a no-op.
    pub fn add_edge(&mut self, from: Node, to: Node) {
        debug_assert!(self.is_live(from) && self.is_live(to));
        if self.nodes[from].succs.contains(&to) {
            return;
        }
        self.nodes[from].succs.push(to);
        self.nodes[to].preds.push(from);
    }

    /// Remove the edge `from -> to` if present.
    pub fn remove_edge(&mut self, from: Node, to: Node) {
        self.nodes[from].succs.retain(|s| *s != to);
        self.nodes[to].preds.retain(|p| *p != from);
    }

    /// Is there an edge `from -> to`?
    pub fn has_edge(&self, from: Node, to: Node) -> bool {
        self.nodes[from].succs.contains(&to)
    }

    /// The node id the next call to [`FlowGraph::make_node`] will return.
    pub(crate) fn next_node(&self) -> Node {
        self.nodes.next_key()
    }

    /// Collapse the two-node conditional chain `a`, `b` into the freshly
    /// created, still unconnected pseudo-node `p`.
    ///
    /// The pseudo-node takes over `a`'s predecessors in place, preserving
    /// their branch ordering, and branches to `succs` in the given order.
    /// Both `a` and `b` are retired. Callers must ensure `b`'s only
    /// predecessor is `a` and that neither node branches to the other
    /// except for the single `a -> b` edge.
    pub(crate) fn collapse_pair(&mut self, p: Node, a: Node, b: Node, succs: [Node; 2]) {
        debug_assert!(self.is_live(p) && self.is_live(a) && self.is_live(b));
        debug_assert!(self.nodes[p].succs.is_empty() && self.nodes[p].preds.is_empty());
        debug_assert_eq!(self.nodes[b].preds.as_slice(), &[a]);

        // Rewrite `a` to the pseudo-node in every predecessor's successor
        // list, keeping branch slots intact.
        let preds = std::mem::take(&mut self.nodes[a].preds);
        for &q in &preds {
            for s in self.nodes[q].succs.iter_mut() {
                if *s == a {
                    *s = p;
                }
            }
        }
        self.nodes[p].preds = preds;

        // Detach the pair from its former successors.
        for n in [a, b] {
            let outs = std::mem::take(&mut self.nodes[n].succs);
            for &s in &outs {
                if s == a || s == b {
                    continue;
                }
                self.nodes[s].preds.retain(|q| *q != a && *q != b);
            }
            self.nodes[n].preds.clear();
        }

        for &s in &succs {
            self.add_edge(p, s);
        }
        if self.entry.expand() == Some(a) {
            self.entry = p.into();
        }
        self.retired.insert(a);
        self.retired.insert(b);
        self.live -= 2;
    }
}

impl Cfg for FlowGraph {
    fn entry(&self) -> Option<Node> {
        self.entry.expand()
    }

    fn num_nodes(&self) -> usize {
        self.live
    }

    fn nodes(&self) -> impl Iterator<Item = Node> + '_ {
        self.nodes.keys().filter(move |n| !self.retired.contains(*n))
    }

    fn succs(&self, n: Node) -> &[Node] {
        &self.nodes[n].succs
    }

    fn preds(&self, n: Node) -> &[Node] {
        &self.nodes[n].preds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty() {
        let g = FlowGraph::new();
        assert_eq!(g.num_nodes(), 0);
        assert_eq!(g.entry(), None);
    }

    #[test]
    fn edges_form_a_set() {
        let mut g = FlowGraph::new();
        let a = g.make_labeled("a");
        let b = g.make_labeled("b");
        g.add_edge(a, b);
        g.add_edge(a, b);
        assert_eq!(g.succs(a), &[b]);
        assert_eq!(g.preds(b), &[a]);

        g.remove_edge(a, b);
        assert!(g.succs(a).is_empty());
        assert!(g.preds(b).is_empty());
    }

    #[test]
    fn successor_order_is_insertion_order() {
        let mut g = FlowGraph::new();
        let a = g.make_node();
        let b = g.make_node();
        let c = g.make_node();
        g.add_edge(a, c);
        g.add_edge(a, b);
        assert_eq!(g.succs(a), &[c, b]);
    }

    #[test]
    fn collapse_pair_rewires() {
        // e -> a -> {b, x}; b -> {y, x}
        let mut g = FlowGraph::new();
        let e = g.make_labeled("e");
        let a = g.make_labeled("a");
        let b = g.make_labeled("b");
        let x = g.make_labeled("x");
        let y = g.make_labeled("y");
        g.add_edge(e, a);
        g.add_edge(a, b);
        g.add_edge(a, x);
        g.add_edge(b, y);
        g.add_edge(b, x);
        g.set_entry(e);

        let p = g.make_labeled("a || b");
        g.collapse_pair(p, a, b, [x, y]);
        assert!(!g.is_live(a));
        assert!(!g.is_live(b));
        assert_eq!(g.succs(e), &[p]);
        assert_eq!(g.preds(p), &[e]);
        assert_eq!(g.succs(p), &[x, y]);
        assert_eq!(g.preds(x), &[p]);
        assert_eq!(g.preds(y), &[p]);
        assert_eq!(g.num_nodes(), 4);
        assert_eq!(g.label(p), "a || b");
    }

    #[test]
    fn collapse_pair_moves_entry() {
        let mut g = FlowGraph::new();
        let a = g.make_node();
        let b = g.make_node();
        let x = g.make_node();
        let y = g.make_node();
        g.add_edge(a, b);
        g.add_edge(a, x);
        g.add_edge(b, y);
        g.add_edge(b, x);
        g.set_entry(a);

        let p = g.make_node();
        g.collapse_pair(p, a, b, [x, y]);
        assert_eq!(g.entry(), Some(p));
    }
}
