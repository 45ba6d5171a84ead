//! The derived sequence of graphs built by collapsing intervals.
//!
//! Starting from a mirror of the input graph, each step replaces every
//! interval with a single node and keeps only the edges that crossed
//! interval boundaries. The sequence ends when a step no longer shrinks the
//! graph. Outer loops that span several intervals of the input surface as
//! single-interval loops in later graphs of the sequence.
//!
//! ref: Figure 6-10; Cifuentes, *Reverse Compilation Techniques*, 1994.

use crate::dfs::DfsOrder;
use crate::flowgraph::{Cfg, FlowGraph, Node};
use crate::interval::{self, Interval};
use crate::result::{AnalysisError, AnalysisResult};
use cranelift_entity::packed_option::PackedOption;
use cranelift_entity::{PrimaryMap, SecondaryMap};
use rustc_hash::FxHashSet;
use std::fmt;

/// Payload of a node in a derived graph.
#[derive(Clone, Debug)]
struct DerivedNode {
    /// The original-graph node this node ultimately stands for: the header
    /// of the collapsed region.
    head: Node,
    /// Every original-graph node collapsed into this one, discovery order.
    members: Vec<Node>,
    succs: Vec<Node>,
    preds: Vec<Node>,
}

/// One graph of the derived sequence.
///
/// Node ids are local to the graph; the payload accessors translate them
/// back to nodes of the original graph.
#[derive(Clone, Default, Debug)]
pub struct DerivedGraph {
    nodes: PrimaryMap<Node, DerivedNode>,
    entry: PackedOption<Node>,
}

impl DerivedGraph {
    /// The original-graph header node that `n` stands for.
    pub fn head(&self, n: Node) -> Node {
        self.nodes[n].head
    }

    /// The original-graph nodes collapsed into `n`.
    pub fn members(&self, n: Node) -> &[Node] {
        &self.nodes[n].members
    }

    fn add_node(&mut self, head: Node, members: Vec<Node>) -> Node {
        self.nodes.push(DerivedNode {
            head,
            members,
            succs: Vec::new(),
            preds: Vec::new(),
        })
    }

    fn add_edge(&mut self, from: Node, to: Node) {
        debug_assert!(!self.nodes[from].succs.contains(&to));
        self.nodes[from].succs.push(to);
        self.nodes[to].preds.push(from);
    }
}

impl Cfg for DerivedGraph {
    fn entry(&self) -> Option<Node> {
        self.entry.expand()
    }

    fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    fn nodes(&self) -> impl Iterator<Item = Node> + '_ {
        self.nodes.keys()
    }

    fn succs(&self, n: Node) -> &[Node] {
        &self.nodes[n].succs
    }

    fn preds(&self, n: Node) -> &[Node] {
        &self.nodes[n].preds
    }
}

/// The derived sequence G⁰, G¹, …, Gⁿ⁻¹ of a control flow graph, together
/// with the intervals of every graph in the sequence.
///
/// The fixpoint duplicate that terminates the construction is not stored:
/// the last graph held here is the final one that still differed from its
/// predecessor.
#[derive(Debug)]
pub struct DerivedSequence {
    graphs: Vec<DerivedGraph>,
    intervals: Vec<Vec<Interval>>,
}

impl DerivedSequence {
    /// Build the derived sequence of `g`.
    ///
    /// Fails with [`AnalysisError::MissingInterval`] if an edge connects
    /// the unreachable part of `g` to its reachable part; isolated
    /// unreachable subgraphs are ignored.
    pub fn compute(g: &FlowGraph) -> AnalysisResult<Self> {
        // G⁰ mirrors the input one node to one node.
        let mut g0 = DerivedGraph::default();
        let mut mirror: SecondaryMap<Node, PackedOption<Node>> = SecondaryMap::new();
        for n in g.nodes() {
            mirror[n] = g0.add_node(n, vec![n]).into();
        }
        for n in g.nodes() {
            let from = mirror[n].expect("live node was just mirrored");
            for &s in g.succs(n) {
                g0.add_edge(from, mirror[s].expect("edge target must be live"));
            }
        }
        if let Some(e) = g.entry() {
            g0.entry = mirror[e];
        }

        let mut graphs = Vec::new();
        let mut ivs = Vec::new();
        let mut order = DfsOrder::compute(&g0);
        graphs.push(g0);
        ivs.push(interval::intervals(&graphs[0], &order));
        loop {
            let prev = graphs.last().unwrap();
            let next = collapse(prev, ivs.last().unwrap())?;
            if next.num_nodes() == prev.num_nodes() {
                break;
            }
            order = DfsOrder::compute(&next);
            ivs.push(interval::intervals(&next, &order));
            graphs.push(next);
        }
        log::debug!("derived sequence of {} graphs", graphs.len());
        Ok(Self {
            graphs,
            intervals: ivs,
        })
    }

    /// Number of graphs in the sequence.
    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    /// A derived sequence always contains at least G⁰.
    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    /// The `i`-th graph of the sequence; index 0 mirrors the input.
    pub fn graph(&self, i: usize) -> &DerivedGraph {
        &self.graphs[i]
    }

    /// The intervals of the `i`-th graph, in terms of its local node ids.
    pub fn intervals(&self, i: usize) -> &[Interval] {
        &self.intervals[i]
    }

    /// Write the whole sequence as one DOT digraph, one cluster per graph.
    /// Node names carry the original-graph header id, so they can be
    /// correlated with recovered primitives.
    pub fn write_dot(&self, w: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(w, "digraph {{")?;
        for (i, g) in self.graphs.iter().enumerate() {
            writeln!(w, "    subgraph cluster_{i} {{")?;
            writeln!(w, "        label = \"G{i}\"")?;
            for n in g.nodes() {
                writeln!(w, "        g{}_{} [label=\"{}\"]", i, n, g.head(n))?;
            }
            for n in g.nodes() {
                for &s in g.succs(n) {
                    writeln!(w, "        g{}_{} -> g{}_{}", i, n, i, s)?;
                }
            }
            writeln!(w, "    }}")?;
        }
        writeln!(w, "}}")
    }
}

/// Collapse each interval of `prev` into one node of the next graph.
fn collapse(prev: &DerivedGraph, ivs: &[Interval]) -> AnalysisResult<DerivedGraph> {
    let mut next = DerivedGraph::default();
    let mut interval_of: SecondaryMap<Node, Option<u32>> = SecondaryMap::new();
    let mut nodes = Vec::with_capacity(ivs.len());

    for (j, iv) in ivs.iter().enumerate() {
        let mut members = Vec::new();
        for &m in iv.members() {
            interval_of[m] = Some(j as u32);
            members.extend_from_slice(prev.members(m));
        }
        let n = next.add_node(prev.head(iv.header()), members);
        nodes.push(n);
        if prev.entry() == Some(iv.header()) {
            next.entry = n.into();
        }
    }

    // An edge joins two collapsed nodes iff some edge of `prev` crossed the
    // corresponding interval boundary. Both end points of every cross edge
    // are checked: predecessors of each header, and successors of each
    // member.
    let mut seen: FxHashSet<(u32, u32)> = FxHashSet::default();
    for (j, iv) in ivs.iter().enumerate() {
        let j = j as u32;
        for &p in prev.preds(iv.header()) {
            if iv.contains(p) {
                continue;
            }
            let k = interval_of[p].ok_or(AnalysisError::MissingInterval(prev.head(p)))?;
            if seen.insert((k, j)) {
                next.add_edge(nodes[k as usize], nodes[j as usize]);
            }
        }
        for &m in iv.members() {
            for &s in prev.succs(m) {
                if iv.contains(s) {
                    continue;
                }
                let k = interval_of[s].ok_or(AnalysisError::MissingInterval(prev.head(s)))?;
                if seen.insert((j, k)) {
                    next.add_edge(nodes[j as usize], nodes[k as usize]);
                }
            }
        }
    }
    Ok(next)
}
