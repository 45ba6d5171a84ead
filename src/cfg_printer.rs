//! The `CfgPrinter` utility.

use crate::flowgraph::{Cfg, FlowGraph};
use core::fmt::{self, Display, Formatter, Write};

/// A utility for pretty-printing a [`FlowGraph`] in DOT format.
///
/// Node names in the output are the same ids that recovered primitives
/// refer to.
pub struct CfgPrinter<'a> {
    graph: &'a FlowGraph,
}

impl<'a> CfgPrinter<'a> {
    /// Create a new CfgPrinter.
    pub fn new(graph: &'a FlowGraph) -> Self {
        Self { graph }
    }

    /// Write the graph in DOT format to `w`.
    pub fn write(&self, w: &mut dyn Write) -> fmt::Result {
        self.header(w)?;
        self.nodes(w)?;
        self.connections(w)?;
        writeln!(w, "}}")
    }

    fn header(&self, w: &mut dyn Write) -> fmt::Result {
        writeln!(w, "digraph {{")?;
        if let Some(entry) = self.graph.entry() {
            writeln!(w, "    {{rank=min; {entry}}}")?;
        }
        Ok(())
    }

    fn nodes(&self, w: &mut dyn Write) -> fmt::Result {
        for n in self.graph.nodes() {
            let label = self.graph.label(n);
            if label.is_empty() {
                writeln!(w, "    {n}")?;
            } else {
                writeln!(w, "    {n} [label=\"{label}\"]")?;
            }
        }
        Ok(())
    }

    fn connections(&self, w: &mut dyn Write) -> fmt::Result {
        for n in self.graph.nodes() {
            for s in self.graph.succs(n) {
                writeln!(w, "    {n} -> {s}")?;
            }
        }
        Ok(())
    }
}

impl Display for CfgPrinter<'_> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.write(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_labels_and_edges() {
        let mut g = FlowGraph::new();
        let a = g.make_labeled("entry");
        let b = g.make_node();
        g.add_edge(a, b);
        g.set_entry(a);

        let dot = CfgPrinter::new(&g).to_string();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("{rank=min; n0}"));
        assert!(dot.contains("n0 [label=\"entry\"]"));
        assert!(dot.contains("n0 -> n1"));
        assert!(dot.trim_end().ends_with('}'));
    }
}
