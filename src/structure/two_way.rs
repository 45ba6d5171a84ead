//! 2-way conditional structuring.

use crate::dfs::DfsOrder;
use crate::dominator_tree::DominatorTree;
use crate::flowgraph::{Cfg, FlowGraph, Node};
use crate::primitive::{Primitive, PrimitiveKind};
use cranelift_entity::packed_option::PackedOption;
use cranelift_entity::{EntitySet, SecondaryMap};

/// Find if-then and if-then-else regions.
///
/// Nodes are visited in descending reverse post-order so that inner
/// conditionals are recovered before the conditionals enclosing them.
/// `loop_conditionals` holds the loop headers and latching nodes whose
/// branches belong to a loop primitive; `compound_follow` maps collapsed
/// short-circuit chains to their shared target, adopted as follow when a
/// chain has no interior join.
pub(super) fn structure(
    g: &FlowGraph,
    dfs: &DfsOrder,
    domtree: &DominatorTree,
    loop_conditionals: &EntitySet<Node>,
    compound_follow: &SecondaryMap<Node, PackedOption<Node>>,
) -> Vec<Primitive> {
    let mut prims = Vec::new();
    for &h in dfs.postorder() {
        if g.succs(h).len() != 2 || loop_conditionals.contains(h) {
            continue;
        }
        let follow = find_follow(g, dfs, domtree, h).or_else(|| compound_follow[h].expand());
        let Some(follow) = follow else {
            // No join could be determined; report the conditional as open
            // and leave the decision to the caller.
            log::debug!("2-way conditional at {h} has no follow");
            prims.push(Primitive {
                kind: PrimitiveKind::IfThen,
                entry: h,
                nodes: vec![h],
                follow: None,
            });
            continue;
        };
        let kind = if g.succs(h).contains(&follow) {
            PrimitiveKind::IfThen
        } else {
            PrimitiveKind::IfElse
        };
        prims.push(Primitive {
            kind,
            entry: h,
            nodes: super::region(dfs, domtree, h, follow),
            follow: Some(follow),
        });
    }
    prims
}

/// The follow of a 2-way conditional at `h`: the node with the largest
/// reverse post-order number whose immediate dominator is `h` and which
/// joins at least two paths out of `h`.
fn find_follow(g: &FlowGraph, dfs: &DfsOrder, domtree: &DominatorTree, h: Node) -> Option<Node> {
    let reach = reachable_from(g, h);
    let mut best: Option<Node> = None;
    for &f in dfs.postorder() {
        if f == h || domtree.idom(f) != Some(h) {
            continue;
        }
        let joined = g.preds(f).iter().filter(|&&p| reach.contains(p)).count();
        if joined < 2 {
            continue;
        }
        match best {
            Some(b) if dfs.rpo_number(f) <= dfs.rpo_number(b) => {}
            _ => best = Some(f),
        }
    }
    best
}

/// The set of nodes reachable from `h`, `h` included.
fn reachable_from(g: &FlowGraph, h: Node) -> EntitySet<Node> {
    let mut seen = EntitySet::new();
    seen.insert(h);
    let mut stack = vec![h];
    while let Some(n) = stack.pop() {
        for &s in g.succs(n) {
            if !seen.contains(s) {
                seen.insert(s);
                stack.push(s);
            }
        }
    }
    seen
}
