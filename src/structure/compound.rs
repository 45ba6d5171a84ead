//! Compound condition structuring.
//!
//! Short-circuit Boolean operators compile into chains of 2-way branches
//! sharing a target. This pass finds such chains and collapses each pair
//! of condition nodes into a single pseudo-node, repeating until no
//! pattern remains, so a chain of n conditions collapses through n-1
//! compound primitives.

use super::PrimitiveHook;
use crate::dfs::DfsOrder;
use crate::flowgraph::{Cfg, FlowGraph, Node};
use crate::primitive::{Primitive, PrimitiveKind};

/// A matched pair of condition nodes.
struct Chain {
    /// Head condition.
    a: Node,
    /// Second condition; branches to the head's other target.
    b: Node,
    kind: PrimitiveKind,
    /// Shared short-circuit target of both conditions.
    shared: Node,
    /// The remaining target of `b`: the next condition of a longer chain,
    /// or the exit taken when the whole chain decides the other way.
    rest: Node,
}

/// Collapse every short-circuit chain in `g`, appending one compound
/// primitive per collapsed pair. The hooks fire before and after each
/// merge.
pub(super) fn structure(
    g: &mut FlowGraph,
    prims: &mut Vec<Primitive>,
    before: &mut Option<PrimitiveHook<'_>>,
    after: &mut Option<PrimitiveHook<'_>>,
) {
    loop {
        let dfs = DfsOrder::compute(g);
        let Some(chain) = find_chain(g, &dfs) else {
            break;
        };
        let op = match chain.kind {
            PrimitiveKind::CompoundAnd => "&&",
            _ => "||",
        };
        let label = format!("{} {} {}", name(g, chain.a), op, name(g, chain.b));
        log::debug!("compound condition: {label}");

        let pseudo = g.make_labeled(label);
        let prim = Primitive {
            kind: chain.kind,
            entry: pseudo,
            nodes: vec![chain.a, chain.b],
            follow: Some(chain.shared),
        };
        if let Some(hook) = before.as_mut() {
            hook(g, &prim);
        }
        // The shared target leads first so that the follow of the collapsed
        // conditional orders after the rest of the chain.
        g.collapse_pair(pseudo, chain.a, chain.b, [chain.shared, chain.rest]);
        if let Some(hook) = after.as_mut() {
            hook(g, &prim);
        }
        prims.push(prim);
    }
}

/// Find the first collapsible pair, scanning heads in ascending reverse
/// post-order.
///
/// For a head `a` with targets `(b, x)`, a second condition `b` reached
/// only from `a` matches when one of its own targets is `x` again: as its
/// second target this is a disjunction, as its first a conjunction.
fn find_chain(g: &FlowGraph, dfs: &DfsOrder) -> Option<Chain> {
    for &a in dfs.postorder().iter().rev() {
        let &[s0, s1] = g.succs(a) else { continue };
        for (b, x) in [(s0, s1), (s1, s0)] {
            if b == a || x == a || g.preds(b) != &[a][..] || Some(b) == g.entry() {
                continue;
            }
            let &[t0, t1] = g.succs(b) else { continue };
            if t0 == a || t1 == a || t0 == b || t1 == b {
                continue;
            }
            let kind = if t1 == x {
                PrimitiveKind::CompoundOr
            } else if t0 == x {
                PrimitiveKind::CompoundAnd
            } else {
                continue;
            };
            let rest = if t0 == x { t1 } else { t0 };
            return Some(Chain {
                a,
                b,
                kind,
                shared: x,
                rest,
            });
        }
    }
    None
}

fn name(g: &FlowGraph, n: Node) -> String {
    let label = g.label(n);
    if label.is_empty() {
        n.to_string()
    } else {
        label.to_string()
    }
}
