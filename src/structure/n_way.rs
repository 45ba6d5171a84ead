//! N-way conditional structuring.
//!
//! A node with three or more successors is a multi-target branch. It
//! becomes an n-way primitive when all of its targets rejoin at one node,
//! the shared immediate post-dominator.

use crate::dfs::DfsOrder;
use crate::dominator_tree::DominatorTree;
use crate::flowgraph::{Cfg, FlowGraph, Node};
use crate::primitive::{Primitive, PrimitiveKind};
use cranelift_entity::SecondaryMap;
use cranelift_entity::packed_option::PackedOption;

/// Find multi-target branch regions and their common follow.
pub(super) fn structure(g: &FlowGraph, dfs: &DfsOrder, domtree: &DominatorTree) -> Vec<Primitive> {
    let mut ipdom = None;
    let mut prims = Vec::new();
    for &h in dfs.postorder() {
        let succs = g.succs(h);
        if succs.len() < 3 {
            continue;
        }
        // Degenerate multi-target branches with a looping arm are left to
        // loop structuring.
        if succs
            .iter()
            .any(|&s| dfs.rpo_number(s) <= dfs.rpo_number(h))
        {
            continue;
        }

        // Post-dominators are only needed if an n-way head exists at all.
        let ipdom = ipdom.get_or_insert_with(|| post_dominators(g, dfs));
        let mut common: Option<Node> = None;
        let mut joined = true;
        for &s in succs {
            match (common, ipdom[s].expand()) {
                (None, Some(f)) => common = Some(f),
                (Some(c), Some(f)) if c == f => {}
                _ => {
                    joined = false;
                    break;
                }
            }
        }

        match common.filter(|_| joined) {
            Some(follow) => prims.push(Primitive {
                kind: PrimitiveKind::NWay,
                entry: h,
                nodes: super::region(dfs, domtree, h, follow),
                follow: Some(follow),
            }),
            None => {
                log::debug!("n-way conditional at {h} has no common follow");
                prims.push(Primitive {
                    kind: PrimitiveKind::NWay,
                    entry: h,
                    nodes: vec![h],
                    follow: None,
                });
            }
        }
    }
    prims
}

/// Reversed view of the reachable subgraph, with a virtual exit joining
/// every sink so that graphs with several exits still have a full
/// post-dominator relation.
struct ReverseCfg {
    entry: Node,
    nodes: Vec<Node>,
    succs: SecondaryMap<Node, Vec<Node>>,
    preds: SecondaryMap<Node, Vec<Node>>,
}

impl Cfg for ReverseCfg {
    fn entry(&self) -> Option<Node> {
        Some(self.entry)
    }

    fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    fn nodes(&self) -> impl Iterator<Item = Node> + '_ {
        self.nodes.iter().copied()
    }

    fn succs(&self, n: Node) -> &[Node] {
        &self.succs[n]
    }

    fn preds(&self, n: Node) -> &[Node] {
        &self.preds[n]
    }
}

/// The immediate post-dominator of every reachable node, where defined.
///
/// Computed as the immediate dominators of the reversed graph. Nodes that
/// cannot reach any sink have no post-dominator and map to `None`, as does
/// any node whose only post-dominator is the virtual exit.
fn post_dominators(g: &FlowGraph, dfs: &DfsOrder) -> SecondaryMap<Node, PackedOption<Node>> {
    let exit = g.next_node();
    let mut rev = ReverseCfg {
        entry: exit,
        nodes: vec![exit],
        succs: SecondaryMap::new(),
        preds: SecondaryMap::new(),
    };
    for &n in dfs.postorder().iter().rev() {
        rev.nodes.push(n);
        if g.succs(n).is_empty() {
            rev.succs[exit].push(n);
            rev.preds[n].push(exit);
        }
        for &s in g.succs(n) {
            rev.succs[s].push(n);
            rev.preds[n].push(s);
        }
    }

    let rev_dfs = DfsOrder::compute(&rev);
    let rev_dom = DominatorTree::with_graph(&rev, &rev_dfs);

    let mut out: SecondaryMap<Node, PackedOption<Node>> = SecondaryMap::new();
    for &n in dfs.postorder() {
        if let Some(p) = rev_dom.idom(n)
            && p != exit
        {
            out[n] = p.into();
        }
    }
    out
}
