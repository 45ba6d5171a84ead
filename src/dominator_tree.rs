//! A dominator tree represented as mappings of nodes to their immediate
//! dominator.

use crate::dfs::DfsOrder;
use crate::flowgraph::{Cfg, Node};
use cranelift_entity::SecondaryMap;
use cranelift_entity::packed_option::PackedOption;

/// Dominator tree node. We keep one of these per graph node.
#[derive(Clone, Default)]
struct DomNode {
    /// The immediate dominator of this node.
    ///
    /// This is `None` for unreachable nodes and the entry node, which has
    /// no immediate dominator.
    idom: PackedOption<Node>,

    /// First child node in the dominator tree.
    child: PackedOption<Node>,

    /// Next sibling node in the dominator tree. This linked list is ordered
    /// according to the CFG reverse post-order.
    sibling: PackedOption<Node>,

    /// Sequence number of this node in a pre-order traversal of the
    /// dominator tree. Unreachable nodes have number 0, the entry is 1.
    pre_number: u32,

    /// Maximum `pre_number` in the dominator sub-tree rooted at this node.
    /// Always >= `pre_number`.
    pre_max: u32,
}

/// The dominator tree for a single control flow graph.
///
/// Immediate dominators are computed with Keith D. Cooper's "Simple, Fast
/// Dominator Algorithm"; the pre-order interval numbering on top of them
/// makes [`DominatorTree::dominates`] a constant-time check.
pub struct DominatorTree {
    nodes: SecondaryMap<Node, DomNode>,
}

impl DominatorTree {
    /// Compute the dominator tree of `g` using a previously computed DFS
    /// ordering of the same graph.
    pub fn with_graph(g: &impl Cfg, dfs: &DfsOrder) -> Self {
        let mut domtree = Self {
            nodes: SecondaryMap::with_capacity(g.num_nodes()),
        };
        domtree.compute_idoms(g, dfs);
        domtree.compute_preorder(dfs);
        domtree
    }

    /// Returns the immediate dominator of `n`.
    ///
    /// A node is said to *dominate* `n` if all control flow paths from the
    /// entry to `n` must go through it; the immediate dominator is the
    /// dominator closest to `n`.
    ///
    /// This returns `None` if `n` is unreachable or is the entry node.
    pub fn idom(&self, n: Node) -> Option<Node> {
        self.nodes[n].idom.expand()
    }

    /// Fast, constant-time dominance check.
    ///
    /// A node is considered to dominate itself. Dominance is ill defined
    /// for unreachable nodes; an unreachable node dominates no reachable
    /// node and is dominated by none.
    pub fn dominates(&self, a: Node, b: Node) -> bool {
        let na = &self.nodes[a];
        let nb = &self.nodes[b];
        na.pre_number <= nb.pre_number && na.pre_max >= nb.pre_max
    }

    /// Iterative fixpoint over the reverse post-order, refining immediate
    /// dominator estimates until they converge. Converges in one pass for
    /// reducible graphs.
    fn compute_idoms(&mut self, g: &impl Cfg, dfs: &DfsOrder) {
        let Some(entry) = g.entry() else { return };
        // Seed the entry as its own dominator so every reachable node finds
        // at least one processed predecessor; unseeded again below.
        self.nodes[entry].idom = entry.into();

        let mut changed = true;
        while changed {
            changed = false;
            for &n in dfs.postorder().iter().rev() {
                if n == entry {
                    continue;
                }
                let idom = self.compute_idom(g, dfs, n).into();
                if self.nodes[n].idom != idom {
                    self.nodes[n].idom = idom;
                    changed = true;
                }
            }
        }
        self.nodes[entry].idom = PackedOption::default();
    }

    /// Compute the immediate dominator of `n` from the current estimates of
    /// its already processed predecessors.
    fn compute_idom(&self, g: &impl Cfg, dfs: &DfsOrder, n: Node) -> Node {
        let mut processed = g
            .preds(n)
            .iter()
            .copied()
            .filter(|&p| self.nodes[p].idom.is_some());

        // The reverse post-order visits at least one predecessor before `n`.
        let mut idom = processed
            .next()
            .expect("reachable node must have a processed predecessor");
        for p in processed {
            idom = self.common_dominator(dfs, idom, p);
        }
        idom
    }

    /// Walk two dominator chains upwards until they meet.
    fn common_dominator(&self, dfs: &DfsOrder, mut a: Node, mut b: Node) -> Node {
        while a != b {
            while dfs.rpo_number(a) > dfs.rpo_number(b) {
                a = self.nodes[a]
                    .idom
                    .expect("dominator chain ended before the entry");
            }
            while dfs.rpo_number(b) > dfs.rpo_number(a) {
                b = self.nodes[b]
                    .idom
                    .expect("dominator chain ended before the entry");
            }
        }
        a
    }

    /// Assign the pre-order interval numbering that backs `dominates`.
    fn compute_preorder(&mut self, dfs: &DfsOrder) {
        // Step 1: populate child and sibling links. Following the CFG
        // post-order and pushing to the front of the child lists leaves
        // sibling lists ordered by the CFG reverse post-order.
        let mut stack: Vec<Node> = Vec::new();
        for &n in dfs.postorder() {
            if let Some(idom) = self.nodes[n].idom.expand() {
                let sib = std::mem::replace(&mut self.nodes[idom].child, n.into());
                self.nodes[n].sibling = sib;
            } else {
                // Only the entry lacks an immediate dominator.
                stack.push(n);
            }
        }

        // Step 2: assign pre-order numbers from a DFS of the dominator tree.
        debug_assert!(stack.len() <= 1);
        let mut count = 0;
        while let Some(n) = stack.pop() {
            count += 1;
            let node = &mut self.nodes[n];
            node.pre_number = count;
            node.pre_max = count;
            if let Some(s) = node.sibling.expand() {
                stack.push(s);
            }
            if let Some(c) = node.child.expand() {
                stack.push(c);
            }
        }

        // Step 3: propagate `pre_max` up the tree. The CFG post-order is
        // topologically ordered with respect to dominance, so a node comes
        // before its immediate dominator.
        for &n in dfs.postorder() {
            if let Some(idom) = self.nodes[n].idom.expand() {
                let pre_max = self.nodes[n].pre_max.max(self.nodes[idom].pre_max);
                self.nodes[idom].pre_max = pre_max;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flowgraph::FlowGraph;

    fn domtree(g: &FlowGraph) -> (DfsOrder, DominatorTree) {
        let dfs = DfsOrder::compute(g);
        let dt = DominatorTree::with_graph(g, &dfs);
        (dfs, dt)
    }

    #[test]
    fn diamond() {
        let mut g = FlowGraph::new();
        let a = g.make_node();
        let b = g.make_node();
        let c = g.make_node();
        let d = g.make_node();
        g.add_edge(a, b);
        g.add_edge(a, c);
        g.add_edge(b, d);
        g.add_edge(c, d);
        g.set_entry(a);

        let (_, dt) = domtree(&g);
        assert_eq!(dt.idom(a), None);
        assert_eq!(dt.idom(b), Some(a));
        assert_eq!(dt.idom(c), Some(a));
        assert_eq!(dt.idom(d), Some(a));

        assert!(dt.dominates(a, a));
        assert!(dt.dominates(a, d));
        assert!(!dt.dominates(b, d));
        assert!(!dt.dominates(d, a));
        assert!(dt.dominates(b, b));
    }

    #[test]
    fn chain_into_loop() {
        // a -> b -> c -> b, c -> d
        let mut g = FlowGraph::new();
        let a = g.make_node();
        let b = g.make_node();
        let c = g.make_node();
        let d = g.make_node();
        g.add_edge(a, b);
        g.add_edge(b, c);
        g.add_edge(c, b);
        g.add_edge(c, d);
        g.set_entry(a);

        let (_, dt) = domtree(&g);
        assert_eq!(dt.idom(b), Some(a));
        assert_eq!(dt.idom(c), Some(b));
        assert_eq!(dt.idom(d), Some(c));
        assert!(dt.dominates(b, d));
        assert!(dt.dominates(b, c));
        assert!(!dt.dominates(c, b));
    }

    #[test]
    fn unreachable_node() {
        let mut g = FlowGraph::new();
        let a = g.make_node();
        let b = g.make_node();
        let orphan = g.make_node();
        g.add_edge(a, b);
        g.add_edge(orphan, b);
        g.set_entry(a);

        let (dfs, dt) = domtree(&g);
        assert!(!dfs.is_reachable(orphan));
        assert_eq!(dt.idom(orphan), None);
        assert_eq!(dt.idom(b), Some(a));
        assert!(!dt.dominates(orphan, b));
        assert!(!dt.dominates(a, orphan));
    }

    #[test]
    fn two_backedges_share_header() {
        // a -> b; b -> c, b -> d; c -> b; d -> b; d -> e
        let mut g = FlowGraph::new();
        let a = g.make_node();
        let b = g.make_node();
        let c = g.make_node();
        let d = g.make_node();
        let e = g.make_node();
        g.add_edge(a, b);
        g.add_edge(b, c);
        g.add_edge(b, d);
        g.add_edge(c, b);
        g.add_edge(d, b);
        g.add_edge(d, e);
        g.set_entry(a);

        let (_, dt) = domtree(&g);
        assert_eq!(dt.idom(c), Some(b));
        assert_eq!(dt.idom(d), Some(b));
        assert_eq!(dt.idom(e), Some(d));
        assert!(dt.dominates(b, e));
    }
}
