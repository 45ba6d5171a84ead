//! Interval partitioning of control flow graphs.
//!
//! An interval I(h) is the maximal single-entry region headed by h in which
//! every member other than the header has all of its predecessors inside
//! the region. The intervals of a graph partition its reachable node set
//! and are the unit of collapse in the derived sequence.
//!
//! ref: Figure 6-8; Cifuentes, *Reverse Compilation Techniques*, 1994.

use crate::dfs::DfsOrder;
use crate::flowgraph::{Cfg, Node};
use cranelift_entity::EntitySet;

/// A maximal single-entry region of a control flow graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interval {
    header: Node,
    members: Vec<Node>,
}

impl Interval {
    /// The unique entry node of the interval.
    pub fn header(&self) -> Node {
        self.header
    }

    /// The member nodes in discovery order, header first.
    pub fn members(&self) -> &[Node] {
        &self.members
    }

    /// Does the interval contain `n`?
    pub fn contains(&self, n: Node) -> bool {
        self.members.contains(&n)
    }
}

/// Partition the nodes of `g` reachable from its entry into intervals.
///
/// Worklist algorithm: the entry heads the first interval; every node with
/// a predecessor in an emitted interval that is not itself absorbed heads a
/// later one. Interval order is the order headers entered the worklist,
/// which is deterministic given the graph's stable node iteration.
pub fn intervals(g: &impl Cfg, dfs: &DfsOrder) -> Vec<Interval> {
    let mut out = Vec::new();
    let Some(entry) = g.entry() else {
        return out;
    };

    let mut headers = vec![entry];
    let mut queued = EntitySet::new();
    queued.insert(entry);
    let mut assigned = EntitySet::new();

    let mut next = 0;
    while next < headers.len() {
        let h = headers[next];
        next += 1;
        if assigned.contains(h) {
            continue;
        }
        assigned.insert(h);
        let mut in_interval = EntitySet::new();
        in_interval.insert(h);
        let mut members = vec![h];

        // Expand: absorb any node all of whose predecessors already lie in
        // the interval, until a fixpoint.
        let mut changed = true;
        while changed {
            changed = false;
            for m in g.nodes() {
                if !dfs.is_reachable(m) || assigned.contains(m) {
                    continue;
                }
                let preds = g.preds(m);
                if preds.is_empty() {
                    continue;
                }
                if preds.iter().all(|&p| in_interval.contains(p)) {
                    in_interval.insert(m);
                    assigned.insert(m);
                    members.push(m);
                    changed = true;
                }
            }
        }

        // Queue new headers: reachable nodes outside every interval with a
        // predecessor inside this one.
        for m in g.nodes() {
            if !dfs.is_reachable(m) || assigned.contains(m) || queued.contains(m) {
                continue;
            }
            if g.preds(m).iter().any(|&p| in_interval.contains(p)) {
                queued.insert(m);
                headers.push(m);
            }
        }

        out.push(Interval { header: h, members });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flowgraph::FlowGraph;

    fn compute(g: &FlowGraph) -> Vec<Interval> {
        let dfs = DfsOrder::compute(g);
        intervals(g, &dfs)
    }

    #[test]
    fn single_node() {
        let mut g = FlowGraph::new();
        let a = g.make_node();
        g.set_entry(a);

        let ivs = compute(&g);
        assert_eq!(ivs.len(), 1);
        assert_eq!(ivs[0].header(), a);
        assert_eq!(ivs[0].members(), &[a]);
    }

    #[test]
    fn loop_body_is_second_interval() {
        // a -> b; b -> {c, d}; c -> e; d -> e; e -> b, e -> f
        let mut g = FlowGraph::new();
        let a = g.make_node();
        let b = g.make_node();
        let c = g.make_node();
        let d = g.make_node();
        let e = g.make_node();
        let f = g.make_node();
        g.add_edge(a, b);
        g.add_edge(b, c);
        g.add_edge(b, d);
        g.add_edge(c, e);
        g.add_edge(d, e);
        g.add_edge(e, b);
        g.add_edge(e, f);
        g.set_entry(a);

        let ivs = compute(&g);
        assert_eq!(ivs.len(), 2);
        assert_eq!(ivs[0].members(), &[a]);
        assert_eq!(ivs[1].header(), b);
        assert_eq!(ivs[1].members(), &[b, c, d, e, f]);
    }

    #[test]
    fn partition_properties() {
        // Same shape, plus an unreachable orphan that must stay out.
        let mut g = FlowGraph::new();
        let a = g.make_node();
        let b = g.make_node();
        let c = g.make_node();
        let d = g.make_node();
        let orphan = g.make_node();
        g.add_edge(a, b);
        g.add_edge(a, c);
        g.add_edge(b, d);
        g.add_edge(c, d);
        g.add_edge(d, a);
        g.set_entry(a);

        let dfs = DfsOrder::compute(&g);
        let ivs = intervals(&g, &dfs);

        // Union of the intervals is exactly the reachable set, disjointly.
        let mut seen = Vec::new();
        for iv in &ivs {
            assert!(iv.contains(iv.header()));
            for &m in iv.members() {
                assert!(dfs.is_reachable(m));
                assert!(!seen.contains(&m), "node in two intervals");
                seen.push(m);
            }
            // Predecessor closure for non-header members.
            for &m in &iv.members()[1..] {
                for &p in g.preds(m) {
                    assert!(iv.contains(p));
                }
            }
        }
        assert_eq!(seen.len(), dfs.len());
        assert!(!seen.contains(&orphan));
    }
}
