use serde::{Deserialize, Serialize};
use std::fmt;

/// Addresses a node in the dialog graph.
///
/// The optional priority travels with the label for logging and for the
/// opt-in priority ordering of transitions. It never takes part in node
/// lookup: two labels that differ only in priority address the same node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowLabel {
    pub flow: String,
    pub node: String,
    pub priority: Option<f64>,
}

impl FlowLabel {
    pub fn new(flow: impl Into<String>, node: impl Into<String>) -> Self {
        Self {
            flow: flow.into(),
            node: node.into(),
            priority: None,
        }
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Returns `true` if both labels address the same node, ignoring priority.
    pub fn same_node(&self, other: &FlowLabel) -> bool {
        self.flow == other.flow && self.node == other.node
    }

    /// The same label without its priority component.
    pub fn without_priority(&self) -> FlowLabel {
        FlowLabel::new(self.flow.clone(), self.node.clone())
    }
}

/// 2^53: every integer below it is exactly representable as `f64`.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

impl fmt::Display for FlowLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.priority {
            Some(p) if p.fract() == 0.0 && p.abs() < MAX_EXACT_INTEGER => {
                write!(f, "{}/{}@{}", self.flow, self.node, p as i64)
            }
            Some(p) => write!(f, "{}/{}@{}", self.flow, self.node, p),
            None => write!(f, "{}/{}", self.flow, self.node),
        }
    }
}

/// Dense handle into the node table of a `Graph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
