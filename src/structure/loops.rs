//! Loop structuring over the derived sequence.
//!
//! A loop surfaces at the derived-sequence level where its back edge first
//! falls inside one interval: inner loops at early levels, outer loops at
//! later ones. Each interval contributes at most one loop, and a header
//! claimed at an earlier level is never claimed again.

use crate::derived_sequence::DerivedSequence;
use crate::dfs::DfsOrder;
use crate::dominator_tree::DominatorTree;
use crate::flowgraph::{Cfg, FlowGraph, Node};
use crate::primitive::{Primitive, PrimitiveKind};
use crate::result::AnalysisResult;
use cranelift_entity::EntitySet;

/// How a recovered loop tests its exit condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum LoopKind {
    PreTested,
    PostTested,
    Endless,
}

/// A recovered loop, in terms of the analyzed graph's nodes.
pub(super) struct Loop {
    pub kind: LoopKind,
    pub header: Node,
    pub latch: Node,
    pub nodes: Vec<Node>,
    pub follow: Option<Node>,
}

impl Loop {
    /// The node holding the loop's exit condition, if any. 2-way
    /// structuring must not treat it as a conditional of its own.
    pub fn conditional(&self) -> Option<Node> {
        match self.kind {
            LoopKind::PreTested => Some(self.header),
            LoopKind::PostTested => Some(self.latch),
            LoopKind::Endless => None,
        }
    }

    pub fn to_primitive(&self) -> Primitive {
        let kind = match self.kind {
            LoopKind::PreTested => PrimitiveKind::PreTestedLoop,
            LoopKind::PostTested => PrimitiveKind::PostTestedLoop,
            LoopKind::Endless => PrimitiveKind::EndlessLoop,
        };
        Primitive {
            kind,
            entry: self.header,
            nodes: self.nodes.clone(),
            follow: self.follow,
        }
    }
}

/// Find every loop of `g`, innermost first.
pub(super) fn structure(
    g: &FlowGraph,
    dfs: &DfsOrder,
    domtree: &DominatorTree,
) -> AnalysisResult<Vec<Loop>> {
    let seq = DerivedSequence::compute(g)?;
    if log::log_enabled!(log::Level::Trace) {
        let mut dot = String::new();
        if seq.write_dot(&mut dot).is_ok() {
            log::trace!("derived sequence:\n{dot}");
        }
    }

    let mut loops = Vec::new();
    let mut claimed = EntitySet::new();
    for level in 0..seq.len() {
        let dg = seq.graph(level);
        for iv in seq.intervals(level) {
            let header = dg.head(iv.header());
            if claimed.contains(header) {
                continue;
            }

            // All original-graph nodes collapsed into this interval.
            let mut in_interval = EntitySet::new();
            for &m in iv.members() {
                for &o in dg.members(m) {
                    in_interval.insert(o);
                }
            }

            // The latching node: the back-edge source inside the interval
            // with the largest reverse post-order number, provided the
            // header dominates it.
            let mut latch: Option<Node> = None;
            for &p in g.preds(header) {
                if !in_interval.contains(p) || !domtree.dominates(header, p) {
                    continue;
                }
                match latch {
                    Some(l) if dfs.rpo_number(p) <= dfs.rpo_number(l) => {}
                    _ => latch = Some(p),
                }
            }
            let Some(latch) = latch else { continue };

            claimed.insert(header);
            let l = build_loop(g, dfs, domtree, header, latch);
            log::debug!(
                "{:?} loop: header {}, latch {}, {} nodes",
                l.kind,
                l.header,
                l.latch,
                l.nodes.len()
            );
            loops.push(l);
        }
    }
    Ok(loops)
}

/// Collect the loop's node set and classify it.
fn build_loop(
    g: &FlowGraph,
    dfs: &DfsOrder,
    domtree: &DominatorTree,
    header: Node,
    latch: Node,
) -> Loop {
    // The body is every node ordered between header and latch that the
    // header dominates. Nodes of an inner loop are included in the outer
    // body as well: nesting, not exclusion.
    let lo = dfs.rpo_number(header);
    let hi = dfs.rpo_number(latch);
    let mut nodes = Vec::new();
    let mut in_body = EntitySet::new();
    for &y in dfs.postorder().iter().rev() {
        let r = dfs.rpo_number(y);
        if r >= lo && r <= hi && domtree.dominates(header, y) {
            nodes.push(y);
            in_body.insert(y);
        }
    }

    let header_exit = g
        .succs(header)
        .iter()
        .copied()
        .find(|&s| !in_body.contains(s));
    let latch_exit = g
        .succs(latch)
        .iter()
        .copied()
        .find(|&s| !in_body.contains(s));

    let (kind, follow) = if g.succs(header).len() >= 2 && header_exit.is_some() {
        (LoopKind::PreTested, header_exit)
    } else if g.succs(latch).len() >= 2 && latch_exit.is_some() {
        (LoopKind::PostTested, latch_exit)
    } else {
        // No exit condition. As a hint, report the first node control could
        // escape to, if the loop can be left at all.
        let escape = nodes
            .iter()
            .flat_map(|&y| g.succs(y).iter().copied())
            .filter(|&s| dfs.is_reachable(s) && !in_body.contains(s))
            .min_by_key(|&s| dfs.rpo_number(s));
        (LoopKind::Endless, escape)
    };

    Loop {
        kind,
        header,
        latch,
        nodes,
        follow,
    }
}
