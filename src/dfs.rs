//! Depth-first search numbering of control flow graphs.
//!
//! Every analysis in this crate orders nodes by the numbers assigned here.
//! Children are explored in edge-insertion order, so the numbering is a
//! pure function of the graph construction sequence.

use crate::flowgraph::{Cfg, Node};
use cranelift_entity::SecondaryMap;
use std::cmp::Ordering;

/// Pre-order and reverse post-order numbering of the nodes reachable from
/// the entry.
///
/// Numbers are 1-based; number 0 marks a node as unreachable. Unreachable
/// nodes are excluded from all later passes.
pub struct DfsOrder {
    pre: SecondaryMap<Node, u32>,
    rpo: SecondaryMap<Node, u32>,
    preorder: Vec<Node>,
    postorder: Vec<Node>,
}

impl DfsOrder {
    /// Traverse `g` from its entry and assign pre-order and reverse
    /// post-order numbers to every reachable node.
    pub fn compute(g: &impl Cfg) -> Self {
        let mut order = Self {
            pre: SecondaryMap::new(),
            rpo: SecondaryMap::new(),
            preorder: Vec::with_capacity(g.num_nodes()),
            postorder: Vec::with_capacity(g.num_nodes()),
        };
        let Some(entry) = g.entry() else {
            return order;
        };

        // Iterative traversal with an explicit frame stack. Each frame holds
        // a node and the index of its next unexplored successor.
        let mut stack: Vec<(Node, usize)> = Vec::new();
        order.pre[entry] = 1;
        order.preorder.push(entry);
        stack.push((entry, 0));
        loop {
            let Some(&(n, i)) = stack.last() else { break };
            let succs = g.succs(n);
            if i < succs.len() {
                stack.last_mut().unwrap().1 = i + 1;
                let s = succs[i];
                if order.pre[s] == 0 {
                    order.pre[s] = order.preorder.len() as u32 + 1;
                    order.preorder.push(s);
                    stack.push((s, 0));
                }
            } else {
                order.postorder.push(n);
                stack.pop();
            }
        }

        let count = order.postorder.len() as u32;
        for (i, &n) in order.postorder.iter().enumerate() {
            order.rpo[n] = count - i as u32;
        }
        order
    }

    /// Is `n` reachable from the entry?
    pub fn is_reachable(&self, n: Node) -> bool {
        self.rpo[n] != 0
    }

    /// The 1-based pre-order number of `n`, or 0 if unreachable.
    pub fn pre_number(&self, n: Node) -> u32 {
        self.pre[n]
    }

    /// The 1-based reverse post-order number of `n`, or 0 if unreachable.
    pub fn rpo_number(&self, n: Node) -> u32 {
        self.rpo[n]
    }

    /// Compare two nodes by reverse post-order number.
    pub fn rpo_cmp(&self, a: Node, b: Node) -> Ordering {
        self.rpo[a].cmp(&self.rpo[b])
    }

    /// Reachable nodes in pre-order.
    pub fn preorder(&self) -> &[Node] {
        &self.preorder
    }

    /// Reachable nodes in post-order. Iterating this slice visits nodes in
    /// descending reverse post-order; iterating it in reverse yields the
    /// reverse post-order itself.
    pub fn postorder(&self) -> &[Node] {
        &self.postorder
    }

    /// Number of reachable nodes.
    pub fn len(&self) -> usize {
        self.postorder.len()
    }

    /// Is the reachable set empty (no entry set)?
    pub fn is_empty(&self) -> bool {
        self.postorder.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flowgraph::FlowGraph;

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

        let dfs = DfsOrder::compute(&g);
        assert_eq!(dfs.preorder(), &[a, b, d, c]);
        assert_eq!(dfs.postorder(), &[d, b, c, a]);
        assert_eq!(dfs.rpo_number(a), 1);
        assert_eq!(dfs.rpo_number(c), 2);
        assert_eq!(dfs.rpo_number(b), 3);
        assert_eq!(dfs.rpo_number(d), 4);
    }

    #[test]
    fn cycle() {
        let mut g = FlowGraph::new();
        let a = g.make_node();
        let b = g.make_node();
        g.add_edge(a, b);
        g.add_edge(b, a);
        g.set_entry(a);

        let dfs = DfsOrder::compute(&g);
        assert_eq!(dfs.postorder(), &[b, a]);
        assert!(dfs.rpo_cmp(a, b).is_lt());
    }

    #[test]
    fn unreachable_marked() {
        let mut g = FlowGraph::new();
        let a = g.make_node();
        let b = g.make_node();
        let orphan = g.make_node();
        g.add_edge(a, b);
        g.set_entry(a);

        let dfs = DfsOrder::compute(&g);
        assert!(dfs.is_reachable(a));
        assert!(dfs.is_reachable(b));
        assert!(!dfs.is_reachable(orphan));
        assert_eq!(dfs.pre_number(orphan), 0);
        assert_eq!(dfs.len(), 2);
    }

    #[test]
    fn no_entry() {
        let mut g = FlowGraph::new();
        g.make_node();
        let dfs = DfsOrder::compute(&g);
        assert!(dfs.is_empty());
    }
}
