//! Result and error types for control flow analysis.

use crate::flowgraph::Node;
use thiserror::Error;

/// An error that aborts an analysis run.
///
/// Fatal conditions only; a conditional without a determinable follow node
/// is not an error and is reported as a [`Primitive`](crate::Primitive)
/// with `follow: None`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// A predecessor or successor could not be located in any interval
    /// while collapsing the derived sequence. This happens when the input
    /// graph contains an edge between its unreachable and reachable parts.
    #[error("no interval contains node {0}")]
    MissingInterval(Node),

    /// The graph has no entry node, or its entry has been removed.
    #[error("entry node is missing from the graph")]
    UnreachableEntry,

    /// Reserved for extensions that inspect typed instructions; the named
    /// construct is not implemented.
    #[error("unsupported type: {0}")]
    UnsupportedType(&'static str),
}

/// Result type alias for analysis entry points.
pub type AnalysisResult<T> = Result<T, AnalysisError>;
