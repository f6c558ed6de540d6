use super::{Destination, Graph, Node, NodeKey, Transition};
use crate::condition::parsing::register_default_parsers;
use crate::condition::{Condition, ConditionCompiler, ConditionParser, ConditionRef};
use crate::error::ConfigError;
use crate::label::{FlowLabel, NodeId};
use crate::processing::{Phase, Processing, ProcessingStep, StepCompiler};
use crate::response::ResponseSpec;
use crate::script::{GLOBAL, LOCAL, NodeDefinition, ScriptDefinition, TargetDefinition};
use crate::slots::SlotSchema;
use ahash::AHashMap;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collects the externally supplied callables a script refers to, then
/// validates the script and loads it into a `Graph`.
pub struct GraphBuilder {
    script: ScriptDefinition,
    parsers: AHashMap<String, Arc<dyn ConditionParser>>,
    conditions: AHashMap<String, ConditionRef>,
    processing: AHashMap<String, Arc<dyn Processing>>,
}

/// One level of the `GLOBAL` > `LOCAL` > node hierarchy.
struct Level<'s> {
    definition: &'s NodeDefinition,
    location: String,
}

impl GraphBuilder {
    pub fn new(script: ScriptDefinition) -> Self {
        let mut parsers: AHashMap<String, Arc<dyn ConditionParser>> = AHashMap::new();
        register_default_parsers(&mut parsers);
        Self {
            script,
            parsers,
            conditions: AHashMap::new(),
            processing: AHashMap::new(),
        }
    }

    /// Registers a custom condition under its qualified name, e.g. `custom_dir.cnd.is_admin`.
    pub fn with_condition(mut self, name: impl Into<String>, condition: impl Condition + 'static) -> Self {
        self.conditions.insert(name.into(), Arc::new(condition));
        self
    }

    /// Adds or replaces a named condition parser.
    pub fn with_condition_parser(mut self, parser: impl ConditionParser + 'static) -> Self {
        self.parsers.insert(parser.name().to_string(), Arc::new(parser));
        self
    }

    /// Registers a custom processing step under its qualified name, e.g. `custom_dir.proc.lookup`.
    pub fn with_processing(mut self, name: impl Into<String>, step: impl Processing + 'static) -> Self {
        self.processing.insert(name.into(), Arc::new(step));
        self
    }

    pub fn build(self) -> Result<Graph, ConfigError> {
        let script = &self.script;
        validate_custom_dir(&script.custom_dir)?;
        let custom_prefix = format!("{}.", script.custom_dir);
        for name in self.conditions.keys().chain(self.processing.keys()) {
            if !name.starts_with(&custom_prefix) {
                warn!(name = %name, custom_dir = %script.custom_dir, "registered callable is outside custom_dir and can never be referenced");
            }
        }

        let schema = SlotSchema::from_definitions(&script.slots)?;

        // Handles are issued before anything is compiled so that conditions
        // can reference any node.
        let mut index = AHashMap::new();
        let mut flows: AHashMap<String, Vec<NodeId>> = AHashMap::new();
        let mut pending = Vec::new();
        for (flow, nodes) in &script.flow {
            let order = flows.entry(flow.clone()).or_default();
            for (name, definition) in nodes.iter() {
                if name == LOCAL {
                    continue;
                }
                let id = NodeId(pending.len() as u32);
                index.insert(NodeKey::new(flow.clone(), name), id);
                order.push(id);
                pending.push((flow.as_str(), name, definition));
            }
        }

        let conditions = ConditionCompiler {
            parsers: &self.parsers,
            custom: &self.conditions,
            schema: &schema,
            nodes: &index,
            custom_prefix: &custom_prefix,
            flow: None,
        };
        let steps = StepCompiler {
            schema: &schema,
            custom: &self.processing,
            custom_prefix: &custom_prefix,
        };

        let start_label = conditions.node_label(&script.start_label, "start_label")?;
        let fallback_label = match &script.fallback_label {
            Some(definition) => conditions.node_label(definition, "fallback_label")?,
            None => start_label.clone(),
        };

        // A LOCAL is normally checked through the nodes inheriting it. One
        // that nothing inherits is compiled on its own and discarded.
        for (flow, nodes) in &script.flow {
            let Some(local) = nodes.get(LOCAL) else {
                continue;
            };
            if flows.get(flow).is_some_and(|order| !order.is_empty()) {
                continue;
            }
            warn!(flow = %flow, "LOCAL node has no nodes to apply to");
            let levels = [Level {
                definition: local,
                location: format!("{}/{}", flow, LOCAL),
            }];
            compile_node(NodeId(0), flow, LOCAL, &levels, conditions.in_flow(flow), &steps, &index)?;
        }

        let mut nodes = Vec::with_capacity(pending.len());
        for (flow, name, definition) in pending {
            let mut levels = Vec::with_capacity(3);
            if let Some(global) = &script.global {
                levels.push(Level {
                    definition: global,
                    location: GLOBAL.to_string(),
                });
            }
            if let Some(local) = script.flow.get(flow).and_then(|nodes| nodes.get(LOCAL)) {
                levels.push(Level {
                    definition: local,
                    location: format!("{}/{}", flow, LOCAL),
                });
            }
            levels.push(Level {
                definition,
                location: format!("{}/{}", flow, name),
            });

            let id = NodeId(nodes.len() as u32);
            let node = compile_node(id, flow, name, &levels, conditions.in_flow(flow), &steps, &index)?;
            debug!(
                node = %node.label,
                transitions = node.transitions.len(),
                pre_transition = node.pre_transition.len(),
                pre_response = node.pre_response.len(),
                "compiled node"
            );
            nodes.push(node);
        }

        let start = index[&NodeKey::of(&start_label)];
        let fallback = index[&NodeKey::of(&fallback_label)];
        info!(
            nodes = nodes.len(),
            flows = script.flow.len(),
            slots = schema.leaves().len(),
            start = %start_label,
            fallback = %fallback_label,
            "graph loaded"
        );

        Ok(Graph {
            nodes,
            index,
            flows,
            start,
            fallback,
            schema,
            custom_dir: self.script.custom_dir.clone(),
        })
    }
}

fn validate_custom_dir(custom_dir: &str) -> Result<(), ConfigError> {
    let valid = !custom_dir.is_empty()
        && custom_dir
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidCustomDir(custom_dir.to_string()))
    }
}

fn compile_node(
    id: NodeId,
    flow: &str,
    name: &str,
    levels: &[Level<'_>],
    conditions: ConditionCompiler<'_>,
    steps: &StepCompiler<'_>,
    index: &AHashMap<NodeKey, NodeId>,
) -> Result<Node, ConfigError> {
    let pre_transition = merge_steps(levels, |d| &d.pre_transitions_processing, "PRE_TRANSITIONS_PROCESSING")
        .into_iter()
        .map(|(step, definition, location)| steps.compile(step, definition, Phase::PreTransition, &location))
        .collect::<Result<Vec<ProcessingStep>, _>>()?;
    let pre_response = merge_steps(levels, |d| &d.pre_response_processing, "PRE_RESPONSE_PROCESSING")
        .into_iter()
        .map(|(step, definition, location)| steps.compile(step, definition, Phase::PreResponse, &location))
        .collect::<Result<Vec<ProcessingStep>, _>>()?;

    // Own transitions first, then LOCAL, then GLOBAL.
    let mut transitions = Vec::new();
    for level in levels.iter().rev() {
        for (i, transition) in level.definition.transitions.iter().enumerate() {
            let location = format!("{} > TRANSITIONS[{}]", level.location, i);
            let destination = match &transition.lbl {
                TargetDefinition::Label(definition) => {
                    let label = conditions.node_label(definition, &location)?;
                    Destination::Node(index[&NodeKey::of(&label)], label)
                }
                TargetDefinition::Destination(definition) => Destination::from(*definition),
            };
            let condition = conditions.compile(&transition.cnd, &location)?;
            transitions.push(Transition { destination, condition });
        }
    }

    let response = levels
        .iter()
        .rev()
        .find_map(|level| {
            level
                .definition
                .response
                .as_ref()
                .map(|r| ResponseSpec::parse(r, &format!("{} > RESPONSE", level.location)))
        })
        .transpose()?;

    let mut misc = Map::new();
    for level in levels {
        for (key, value) in &level.definition.misc {
            misc.insert(key.clone(), value.clone());
        }
    }

    Ok(Node {
        id,
        label: FlowLabel::new(flow, name),
        response,
        pre_transition,
        pre_response,
        transitions,
        misc,
    })
}

/// Merges the named steps of every level, least specific first. A step that
/// reuses an inherited name replaces the inherited step in place.
fn merge_steps<'s>(
    levels: &[Level<'s>],
    select: impl Fn(&'s NodeDefinition) -> &'s Map<String, Value>,
    section: &str,
) -> Vec<(&'s str, &'s Value, String)> {
    let mut merged: Vec<(&'s str, &'s Value, String)> = Vec::new();
    for level in levels {
        let location = format!("{} > {}", level.location, section);
        for (name, definition) in select(level.definition) {
            match merged.iter_mut().find(|(existing, _, _)| *existing == name.as_str()) {
                Some(slot) => *slot = (name.as_str(), definition, location.clone()),
                None => merged.push((name.as_str(), definition, location.clone())),
            }
        }
    }
    merged
}
