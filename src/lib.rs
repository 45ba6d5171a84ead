//! Control-flow structuring library.
//!
//! `flowstruct` recovers high-level control flow constructs (loops, n-way
//! and 2-way conditionals, short-circuit conditions) from a low-level
//! control flow graph, using the interval method described in C. Cifuentes,
//! *Reverse Compilation Techniques*, Queensland University of Technology,
//! 1994.
//!
//! The analysis partitions the graph into single-entry regions called
//! intervals, collapses them repeatedly to build the derived sequence of
//! graphs, and then runs a fixed order of structuring passes over the
//! result. The input graph is never modified; recovered constructs are
//! returned as a list of [`Primitive`]s referring to graph nodes.
//!
//! ```
//! use flowstruct::{analyze, FlowGraph, PrimitiveKind};
//!
//! let mut g = FlowGraph::new();
//! let cond = g.make_labeled("cond");
//! let then = g.make_labeled("then");
//! let join = g.make_labeled("join");
//! g.add_edge(cond, then);
//! g.add_edge(cond, join);
//! g.add_edge(then, join);
//! g.set_entry(cond);
//!
//! let prims = analyze(&g, None, None).unwrap();
//! assert_eq!(prims.len(), 1);
//! assert_eq!(prims[0].kind, PrimitiveKind::IfThen);
//! assert_eq!(prims[0].follow, Some(join));
//! ```

#![deny(missing_docs, trivial_numeric_casts, unused_extern_crates)]
#![warn(unused_import_braces)]

pub mod cfg_printer;
pub mod derived_sequence;
pub mod dfs;
pub mod dominator_tree;
pub mod flowgraph;
pub mod interval;
pub mod primitive;
pub mod structure;

mod result;

pub use crate::flowgraph::{Cfg, FlowGraph, Node};
pub use crate::primitive::{Primitive, PrimitiveKind};
pub use crate::result::{AnalysisError, AnalysisResult};
pub use crate::structure::{PrimitiveHook, analyze};

/// Version number of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
