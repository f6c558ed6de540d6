use crate::error::ConfigError;
use crate::label::FlowLabel;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Key of the script-wide node whose transitions and processing every node inherits.
pub const GLOBAL: &str = "GLOBAL";
/// Reserved node name whose transitions and processing every node of its flow inherits.
pub const LOCAL: &str = "LOCAL";

fn default_custom_dir() -> String {
    "custom_dir".to_string()
}

/// The complete, canonical definition of a dialog script, ready for loading.
/// This is the target structure for any custom configuration format.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptDefinition {
    /// Namespace root of externally supplied conditions and processing steps.
    #[serde(default = "default_custom_dir")]
    pub custom_dir: String,
    pub start_label: LabelDefinition,
    /// Defaults to the start label when omitted.
    #[serde(default)]
    pub fallback_label: Option<LabelDefinition>,
    #[serde(default)]
    pub slots: BTreeMap<String, SlotDefinition>,
    pub flow: BTreeMap<String, FlowDefinition>,
    #[serde(rename = "GLOBAL", default)]
    pub global: Option<NodeDefinition>,
}

impl ScriptDefinition {
    /// Parses a script from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parses a script from an already decoded JSON value, e.g. one produced by a YAML loader.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// The nodes of one flow, in declaration order.
///
/// The order is what `forward` and `backward` destinations step through.
#[derive(Debug, Clone, Default)]
pub struct FlowDefinition {
    nodes: Vec<(String, NodeDefinition)>,
}

impl FlowDefinition {
    pub fn get(&self, name: &str) -> Option<&NodeDefinition> {
        self.nodes.iter().find(|(n, _)| n == name).map(|(_, node)| node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeDefinition)> {
        self.nodes.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl FromIterator<(String, NodeDefinition)> for FlowDefinition {
    fn from_iter<I: IntoIterator<Item = (String, NodeDefinition)>>(iter: I) -> Self {
        let mut flow = FlowDefinition::default();
        for (name, node) in iter {
            match flow.nodes.iter_mut().find(|(n, _)| *n == name) {
                Some(existing) => existing.1 = node,
                None => flow.nodes.push((name, node)),
            }
        }
        flow
    }
}

impl<'de> Deserialize<'de> for FlowDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FlowVisitor;

        impl<'de> Visitor<'de> for FlowVisitor {
            type Value = FlowDefinition;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of node names to nodes")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut nodes: Vec<(String, NodeDefinition)> = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, node)) = map.next_entry::<String, NodeDefinition>()? {
                    if nodes.iter().any(|(existing, _)| *existing == name) {
                        return Err(de::Error::custom(format_args!("duplicate node '{}'", name)));
                    }
                    nodes.push((name, node));
                }
                Ok(FlowDefinition { nodes })
            }
        }

        deserializer.deserialize_map(FlowVisitor)
    }
}

/// The body of a single node.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeDefinition {
    #[serde(rename = "RESPONSE", default)]
    pub response: Option<Value>,
    /// Ordered map of step name to step.
    #[serde(rename = "PRE_TRANSITIONS_PROCESSING", default)]
    pub pre_transitions_processing: Map<String, Value>,
    #[serde(rename = "PRE_RESPONSE_PROCESSING", default)]
    pub pre_response_processing: Map<String, Value>,
    #[serde(rename = "TRANSITIONS", default)]
    pub transitions: Vec<TransitionDefinition>,
    #[serde(rename = "MISC", default)]
    pub misc: Map<String, Value>,
}

/// A guarded edge as written in the script.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransitionDefinition {
    #[serde(alias = "dst")]
    pub lbl: TargetDefinition,
    pub cnd: Value,
}

/// Where a transition leads: a fixed label, or a destination computed from
/// the session when the transition is taken.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TargetDefinition {
    Label(LabelDefinition),
    Destination(DestinationDefinition),
}

/// A destination as written in the script, e.g. `{"start": null}` or
/// `{"forward": {"loop": true}}`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationDefinition {
    Start,
    Fallback,
    Repeat(Option<RepeatArgs>),
    Forward(Option<StepArgs>),
    Backward(Option<StepArgs>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepeatArgs {
    /// How many turns back to go. `0` is the current node.
    #[serde(default)]
    pub shift: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepArgs {
    /// Wrap around at either end of the flow.
    #[serde(default, rename = "loop")]
    pub wrap: bool,
}

/// A label as written in the script.
///
/// `[flow, node]` and `[flow, node, priority]` are absolute. A bare node name
/// is relative to the flow of the node that declares the transition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LabelDefinition {
    Relative(String),
    Absolute(String, String),
    Prioritized(String, String, f64),
}

impl LabelDefinition {
    /// Resolves the definition into a `FlowLabel`. `current_flow` is `None`
    /// where relative labels are not allowed (start and fallback labels).
    pub fn to_label(&self, current_flow: Option<&str>) -> Result<FlowLabel, String> {
        match self {
            LabelDefinition::Relative(node) => match current_flow {
                Some(flow) => Ok(FlowLabel::new(flow, node.clone())),
                None => Err(format!(
                    "relative label '{}' is not allowed here, use [flow, node]",
                    node
                )),
            },
            LabelDefinition::Absolute(flow, node) => Ok(FlowLabel::new(flow.clone(), node.clone())),
            LabelDefinition::Prioritized(flow, node, priority) => {
                if !priority.is_finite() {
                    return Err(format!("priority of '{}/{}' must be finite", flow, node));
                }
                Ok(FlowLabel::new(flow.clone(), node.clone()).with_priority(*priority))
            }
        }
    }
}

/// A node of the slot namespace tree.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SlotDefinition {
    Regexp(RegexpSlotDefinition),
    Group(BTreeMap<String, SlotDefinition>),
}

/// A leaf slot filled by a regular expression capture.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegexpSlotDefinition {
    pub regexp: String,
    #[serde(default)]
    pub match_group_idx: usize,
}
