use crate::condition::ConditionRef;
use crate::error::{ConfigError, LookupError};
use crate::label::{FlowLabel, NodeId};
use crate::processing::ProcessingStep;
use crate::response::ResponseSpec;
use crate::script::{DestinationDefinition, IntoScript};
use crate::slots::SlotSchema;
use ahash::AHashMap;
use serde_json::{Map, Value};
use std::fmt;

mod builder;

pub use builder::GraphBuilder;

/// Priority-free key of a node, used for lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub flow: String,
    pub node: String,
}

impl NodeKey {
    pub fn new(flow: impl Into<String>, node: impl Into<String>) -> Self {
        Self {
            flow: flow.into(),
            node: node.into(),
        }
    }

    pub fn of(label: &FlowLabel) -> Self {
        Self::new(label.flow.clone(), label.node.clone())
    }
}

/// Where a transition leads.
#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    /// A fixed node. The label is the target as declared, priority included.
    Node(NodeId, FlowLabel),
    Start,
    Fallback,
    /// The node visited `shift` turns ago; `0` is the current node.
    Repeat { shift: usize },
    /// The next node of the current flow in declaration order.
    Forward { wrap: bool },
    /// The previous node of the current flow in declaration order.
    Backward { wrap: bool },
}

impl Destination {
    /// Only fixed labels carry a priority.
    pub fn priority(&self) -> Option<f64> {
        match self {
            Destination::Node(_, label) => label.priority,
            _ => None,
        }
    }
}

impl From<DestinationDefinition> for Destination {
    fn from(definition: DestinationDefinition) -> Self {
        match definition {
            DestinationDefinition::Start => Destination::Start,
            DestinationDefinition::Fallback => Destination::Fallback,
            DestinationDefinition::Repeat(args) => Destination::Repeat {
                shift: args.unwrap_or_default().shift,
            },
            DestinationDefinition::Forward(args) => Destination::Forward {
                wrap: args.unwrap_or_default().wrap,
            },
            DestinationDefinition::Backward(args) => Destination::Backward {
                wrap: args.unwrap_or_default().wrap,
            },
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Node(_, label) => write!(f, "{}", label),
            Destination::Start => f.write_str("start()"),
            Destination::Fallback => f.write_str("fallback()"),
            Destination::Repeat { shift } => write!(f, "repeat({})", shift),
            Destination::Forward { wrap } => write!(f, "forward(loop={})", wrap),
            Destination::Backward { wrap } => write!(f, "backward(loop={})", wrap),
        }
    }
}

/// A guarded edge to another node.
#[derive(Clone)]
pub struct Transition {
    pub destination: Destination,
    pub condition: ConditionRef,
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("destination", &self.destination)
            .field("condition", &self.condition.describe())
            .finish()
    }
}

/// A node of the loaded graph, with everything it inherits from `GLOBAL` and
/// its flow's `LOCAL` node already merged in.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub label: FlowLabel,
    pub response: Option<ResponseSpec>,
    pub pre_transition: Vec<ProcessingStep>,
    pub pre_response: Vec<ProcessingStep>,
    /// Evaluated in this order; the first guard that holds wins.
    pub transitions: Vec<Transition>,
    pub misc: Map<String, Value>,
}

/// The immutable, validated node graph of a dialog script.
///
/// Every reference in the script has been resolved when a `Graph` exists:
/// fixed transition targets, the start and fallback labels, conditions, slots
/// and processing steps. Destinations such as `repeat` or `forward` depend on
/// the session and are resolved per turn. It is shared between sessions through an `Arc`.
#[derive(Debug)]
pub struct Graph {
    nodes: Vec<Node>,
    index: AHashMap<NodeKey, NodeId>,
    /// Addressable nodes of each flow in declaration order.
    flows: AHashMap<String, Vec<NodeId>>,
    start: NodeId,
    fallback: NodeId,
    schema: SlotSchema,
    custom_dir: String,
}

impl Graph {
    /// Starts building a graph from a script in any format implementing `IntoScript`.
    pub fn builder(script: impl IntoScript) -> Result<GraphBuilder, ConfigError> {
        Ok(GraphBuilder::new(script.into_script()?))
    }

    /// Loads a script that references no custom conditions or processing.
    pub fn load(script: impl IntoScript) -> Result<Graph, ConfigError> {
        Self::builder(script)?.build()
    }

    pub fn lookup(&self, flow: &str, node: &str) -> Result<&Node, LookupError> {
        self.index
            .get(&NodeKey::new(flow, node))
            .map(|id| &self.nodes[id.index()])
            .ok_or_else(|| LookupError::NotFound {
                flow: flow.to_string(),
                node: node.to_string(),
            })
    }

    /// Resolves a label to its node handle. The priority is ignored.
    pub fn resolve(&self, label: &FlowLabel) -> Result<NodeId, LookupError> {
        self.index
            .get(&NodeKey::of(label))
            .copied()
            .ok_or_else(|| LookupError::NotFound {
                flow: label.flow.clone(),
                node: label.node.clone(),
            })
    }

    /// Returns the node behind a handle issued by this graph.
    ///
    /// # Panics
    /// If `id` was issued by a different graph and is out of range.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// The nodes of `flow` in declaration order, `LOCAL` excluded.
    pub fn flow(&self, flow: &str) -> Option<&[NodeId]> {
        self.flows.get(flow).map(Vec::as_slice)
    }

    /// The node one step after (`step = 1`) or before (`step = -1`) the node
    /// of `label` within its flow. Without `wrap`, stepping past either end
    /// yields `None`.
    pub fn neighbour(&self, label: &FlowLabel, step: isize, wrap: bool) -> Option<NodeId> {
        let id = self.resolve(label).ok()?;
        let order = self.flow(&label.flow)?;
        let position = order.iter().position(|n| *n == id)? as isize;
        let len = order.len() as isize;
        let next = position + step;
        let next = if wrap {
            next.rem_euclid(len)
        } else if (0..len).contains(&next) {
            next
        } else {
            return None;
        };
        order.get(next as usize).copied()
    }

    pub fn start(&self) -> &Node {
        self.node(self.start)
    }

    pub fn fallback(&self) -> &Node {
        self.node(self.fallback)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn schema(&self) -> &SlotSchema {
        &self.schema
    }

    pub fn custom_dir(&self) -> &str {
        &self.custom_dir
    }
}
