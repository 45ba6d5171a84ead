//! High-level control flow primitives recovered by the structuring passes.

use crate::flowgraph::Node;
use std::fmt;

#[cfg(feature = "enable-serde")]
use serde_derive::{Deserialize, Serialize};

/// The kind of construct a [`Primitive`] describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "enable-serde", serde(rename_all = "kebab-case"))]
pub enum PrimitiveKind {
    /// A loop whose condition is tested at the header, before the body.
    PreTestedLoop,
    /// A loop whose condition is tested at the latching node, after the
    /// body.
    PostTestedLoop,
    /// A loop with no exit condition at its header or latching node.
    EndlessLoop,
    /// A conditional where one branch rejoins at the follow directly.
    IfThen,
    /// A conditional with distinct then and else regions.
    IfElse,
    /// A multi-target branch whose arms rejoin at a common follow.
    NWay,
    /// A short-circuit conjunction of two conditions.
    CompoundAnd,
    /// A short-circuit disjunction of two conditions.
    CompoundOr,
}

impl PrimitiveKind {
    /// Stable textual name, identical to the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreTestedLoop => "pre-tested-loop",
            Self::PostTestedLoop => "post-tested-loop",
            Self::EndlessLoop => "endless-loop",
            Self::IfThen => "if-then",
            Self::IfElse => "if-else",
            Self::NWay => "n-way",
            Self::CompoundAnd => "compound-and",
            Self::CompoundOr => "compound-or",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recovered high-level control flow construct.
///
/// All node references are in terms of the analyzed graph. Compound
/// condition primitives introduce pseudo-nodes standing for a collapsed
/// pair of conditions; the pseudo-node appears as `entry` of the compound
/// primitive (with the merged pair in `nodes`) and may appear in later
/// primitives of the same run.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct Primitive {
    /// What was recovered.
    pub kind: PrimitiveKind,
    /// The header or condition node of the construct.
    pub entry: Node,
    /// The nodes belonging to the construct, in reverse post-order.
    pub nodes: Vec<Node>,
    /// Where control resumes after the construct. `None` for endless loops
    /// without a known escape and for conditionals whose follow could not
    /// be determined.
    pub follow: Option<Node>,
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.kind, self.entry)?;
        match self.follow {
            Some(follow) => write!(f, ", follow {follow}"),
            None => write!(f, ", open follow"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names() {
        assert_eq!(PrimitiveKind::PreTestedLoop.as_str(), "pre-tested-loop");
        assert_eq!(PrimitiveKind::NWay.as_str(), "n-way");
        assert_eq!(PrimitiveKind::CompoundOr.to_string(), "compound-or");
    }
}
