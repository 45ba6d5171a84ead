//! Control flow structuring passes.
//!
//! The structuring algorithm is not finite Church-Rosser, so the passes
//! run in a fixed order: compound conditionals first, then n-way
//! conditionals, loops, and 2-way conditionals last. Reordering them
//! changes the result.

mod compound;
mod loops;
mod n_way;
mod two_way;

use crate::dfs::DfsOrder;
use crate::dominator_tree::DominatorTree;
use crate::flowgraph::{Cfg, FlowGraph, Node};
use crate::primitive::Primitive;
use crate::result::{AnalysisError, AnalysisResult};
use cranelift_entity::packed_option::PackedOption;
use cranelift_entity::{EntitySet, SecondaryMap};

/// Observer invoked before or after a primitive is produced.
///
/// Hooks receive the analyzer's working graph and must treat it as
/// read-only; for compound conditions the graph is observed before and
/// after the pair of condition nodes is collapsed.
pub type PrimitiveHook<'a> = &'a mut dyn FnMut(&FlowGraph, &Primitive);

/// Analyze the control flow graph `g` and return the recovered high-level
/// control flow primitives.
///
/// The caller's graph is left untouched: short-circuit chains are
/// collapsed in a private working copy, and the pseudo-nodes introduced by
/// that collapsing are defined by the compound primitives in the returned
/// list. Repeated calls on the same graph return identical lists.
///
/// The `before` and `after` hooks, when given, are invoked around each
/// located primitive in emission order.
pub fn analyze(
    g: &FlowGraph,
    mut before: Option<PrimitiveHook<'_>>,
    mut after: Option<PrimitiveHook<'_>>,
) -> AnalysisResult<Vec<Primitive>> {
    let entry = g.entry().ok_or(AnalysisError::UnreachableEntry)?;
    if !g.is_live(entry) {
        return Err(AnalysisError::UnreachableEntry);
    }

    let mut work = g.clone();
    let mut prims = Vec::new();

    // Structure compound conditionals. This is the only pass that rewrites
    // the working graph.
    compound::structure(&mut work, &mut prims, &mut before, &mut after);
    let fired = prims.len();

    let dfs = DfsOrder::compute(&work);
    let domtree = DominatorTree::with_graph(&work, &dfs);

    // Chains without an interior join adopt their short-circuit target as
    // follow during 2-way structuring.
    let mut compound_follow: SecondaryMap<Node, PackedOption<Node>> = SecondaryMap::new();
    for p in &prims {
        if let Some(f) = p.follow {
            compound_follow[p.entry] = f.into();
        }
    }

    // Structure n-way conditionals.
    prims.extend(n_way::structure(&work, &dfs, &domtree));

    // Structure loops.
    let found = loops::structure(&work, &dfs, &domtree)?;
    let mut loop_conditionals = EntitySet::new();
    for l in &found {
        if let Some(cond) = l.conditional() {
            loop_conditionals.insert(cond);
        }
    }
    prims.extend(found.iter().map(|l| l.to_primitive()));

    // Structure 2-way conditionals.
    prims.extend(two_way::structure(
        &work,
        &dfs,
        &domtree,
        &loop_conditionals,
        &compound_follow,
    ));

    for p in &prims[fired..] {
        if let Some(hook) = before.as_mut() {
            hook(&work, p);
        }
        if let Some(hook) = after.as_mut() {
            hook(&work, p);
        }
    }
    log::debug!("analyze: recovered {} primitives", prims.len());
    Ok(prims)
}

/// The nodes belonging to a conditional rooted at `h`: every node
/// dominated by `h` and ordered strictly before the follow, `h` itself
/// included, in reverse post-order.
fn region(dfs: &DfsOrder, domtree: &DominatorTree, h: Node, follow: Node) -> Vec<Node> {
    let lo = dfs.rpo_number(h);
    let hi = dfs.rpo_number(follow);
    let mut nodes = Vec::new();
    for &y in dfs.postorder().iter().rev() {
        let r = dfs.rpo_number(y);
        if r >= lo && r < hi && domtree.dominates(h, y) {
            nodes.push(y);
        }
    }
    nodes
}
