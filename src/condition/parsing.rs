use super::standard::*;
use super::ConditionRef;
use crate::error::ConfigError;
use crate::graph::NodeKey;
use crate::label::{FlowLabel, NodeId};
use crate::script::LabelDefinition;
use crate::slots::{SlotPath, SlotSchema};
use ahash::AHashMap;
use regex::RegexBuilder;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Defines the contract for turning the arguments of a named condition into a `Condition`.
pub trait ConditionParser: Send + Sync {
    fn name(&self) -> &str;
    fn parse(
        &self,
        args: &Value,
        compiler: &ConditionCompiler<'_>,
        location: &str,
    ) -> Result<ConditionRef, ConfigError>;
}

/// Resolves condition definitions against the registries of a graph being loaded.
///
/// A definition is a boolean constant, a name (`"custom_dir.cnd.condition"`) or a
/// single-key object mapping a name to its arguments (`{"slots_extracted": "a.b"}`).
#[derive(Clone, Copy)]
pub struct ConditionCompiler<'a> {
    pub(crate) parsers: &'a AHashMap<String, Arc<dyn ConditionParser>>,
    pub(crate) custom: &'a AHashMap<String, ConditionRef>,
    pub(crate) schema: &'a SlotSchema,
    pub(crate) nodes: &'a AHashMap<NodeKey, NodeId>,
    pub(crate) custom_prefix: &'a str,
    pub(crate) flow: Option<&'a str>,
}

impl<'a> ConditionCompiler<'a> {
    /// The same compiler, resolving relative labels against `flow`.
    pub(crate) fn in_flow(self, flow: &'a str) -> Self {
        Self {
            flow: Some(flow),
            ..self
        }
    }

    pub fn compile(&self, definition: &Value, location: &str) -> Result<ConditionRef, ConfigError> {
        match definition {
            Value::Bool(b) => Ok(Arc::new(Constant(*b))),
            Value::String(name) => self.resolve(name, &Value::Null, location),
            Value::Object(map) if map.len() == 1 => {
                let (name, args) = map.iter().next().ok_or_else(|| self.malformed(definition, location))?;
                self.resolve(name, args, location)
            }
            _ => Err(self.malformed(definition, location)),
        }
    }

    fn resolve(&self, name: &str, args: &Value, location: &str) -> Result<ConditionRef, ConfigError> {
        if name.starts_with(self.custom_prefix) {
            let inner = self
                .custom
                .get(name)
                .ok_or_else(|| ConfigError::UnresolvedReference {
                    name: name.to_string(),
                    location: location.to_string(),
                })?;
            if !args.is_null() {
                return Err(ConfigError::InvalidArguments {
                    name: name.to_string(),
                    location: location.to_string(),
                    message: "custom conditions take no arguments".to_string(),
                });
            }
            return Ok(Arc::new(Named {
                name: name.to_string(),
                inner: inner.clone(),
            }));
        }

        let parser = self
            .parsers
            .get(name)
            .ok_or_else(|| ConfigError::UnknownCondition {
                name: name.to_string(),
                location: location.to_string(),
            })?;
        parser.parse(args, self, location)
    }

    /// Parses and validates a slot path against the schema.
    pub fn slot_path(&self, raw: &str, location: &str) -> Result<SlotPath, ConfigError> {
        let path = SlotPath::parse(raw).map_err(|message| ConfigError::UnknownSlot {
            path: format!("{} ({})", raw, message),
            location: location.to_string(),
        })?;
        if !self.schema.contains(&path) {
            return Err(ConfigError::UnknownSlot {
                path: raw.to_string(),
                location: location.to_string(),
            });
        }
        Ok(path)
    }

    /// Resolves a label definition and checks that it addresses a node.
    pub fn node_label(&self, definition: &LabelDefinition, location: &str) -> Result<FlowLabel, ConfigError> {
        let label = definition
            .to_label(self.flow)
            .map_err(|message| ConfigError::InvalidLabel {
                location: location.to_string(),
                message,
            })?;
        if !self.nodes.contains_key(&NodeKey::of(&label)) {
            return Err(ConfigError::NodeNotFound {
                label: label.to_string(),
                referenced_from: location.to_string(),
            });
        }
        Ok(label)
    }

    fn malformed(&self, definition: &Value, location: &str) -> ConfigError {
        ConfigError::UnknownCondition {
            name: definition.to_string(),
            location: location.to_string(),
        }
    }
}

/// Decodes the arguments of a named condition with serde.
fn decode<T: for<'de> Deserialize<'de>>(name: &str, args: &Value, location: &str) -> Result<T, ConfigError> {
    T::deserialize(args).map_err(|e| ConfigError::InvalidArguments {
        name: name.to_string(),
        location: location.to_string(),
        message: e.to_string(),
    })
}

fn invalid(name: &str, location: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidArguments {
        name: name.to_string(),
        location: location.to_string(),
        message: message.into(),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SlotsArgs {
    Paths(OneOrMany),
    Full {
        slots: OneOrMany,
        #[serde(default)]
        mode: SlotsMode,
    },
}

fn parse_slots(
    name: &str,
    args: &Value,
    compiler: &ConditionCompiler<'_>,
    location: &str,
    default_mode: SlotsMode,
) -> Result<ConditionRef, ConfigError> {
    let (raw_paths, mode) = match decode::<SlotsArgs>(name, args, location)? {
        SlotsArgs::Paths(paths) => (paths.into_vec(), default_mode),
        SlotsArgs::Full { slots, mode } => (slots.into_vec(), mode),
    };
    if raw_paths.is_empty() {
        return Err(invalid(name, location, "at least one slot path is required"));
    }
    let paths = raw_paths
        .iter()
        .map(|raw| compiler.slot_path(raw, location))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Arc::new(SlotsExtracted { paths, mode }))
}

fn parse_slots_extracted(
    args: &Value,
    compiler: &ConditionCompiler<'_>,
    location: &str,
) -> Result<ConditionRef, ConfigError> {
    parse_slots("slots_extracted", args, compiler, location, SlotsMode::All)
}

fn parse_slots_extracted_any(
    args: &Value,
    compiler: &ConditionCompiler<'_>,
    location: &str,
) -> Result<ConditionRef, ConfigError> {
    parse_slots("slots_extracted_any", args, compiler, location, SlotsMode::Any)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RegexpArgs {
    Pattern(String),
    Full {
        pattern: String,
        #[serde(default)]
        case_insensitive: bool,
    },
}

fn parse_regexp(args: &Value, _compiler: &ConditionCompiler<'_>, location: &str) -> Result<ConditionRef, ConfigError> {
    let (pattern, case_insensitive) = match decode::<RegexpArgs>("regexp", args, location)? {
        RegexpArgs::Pattern(p) => (p, false),
        RegexpArgs::Full {
            pattern,
            case_insensitive,
        } => (pattern, case_insensitive),
    };
    let regex = RegexBuilder::new(&pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| invalid("regexp", location, e.to_string()))?;
    Ok(Arc::new(Regexp(regex)))
}

fn parse_has_text(args: &Value, _compiler: &ConditionCompiler<'_>, location: &str) -> Result<ConditionRef, ConfigError> {
    let text: String = decode("has_text", args, location)?;
    Ok(Arc::new(HasText(text)))
}

fn parse_exact_match(args: &Value, _compiler: &ConditionCompiler<'_>, location: &str) -> Result<ConditionRef, ConfigError> {
    let text: String = decode("exact_match", args, location)?;
    Ok(Arc::new(ExactMatch(text)))
}

fn parse_list(
    name: &str,
    args: &Value,
    compiler: &ConditionCompiler<'_>,
    location: &str,
) -> Result<Vec<ConditionRef>, ConfigError> {
    let items = args
        .as_array()
        .ok_or_else(|| invalid(name, location, "expected a list of conditions"))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| compiler.compile(item, &format!("{} > {}[{}]", location, name, i)))
        .collect()
}

fn parse_all(args: &Value, compiler: &ConditionCompiler<'_>, location: &str) -> Result<ConditionRef, ConfigError> {
    Ok(Arc::new(All(parse_list("all", args, compiler, location)?)))
}

fn parse_any(args: &Value, compiler: &ConditionCompiler<'_>, location: &str) -> Result<ConditionRef, ConfigError> {
    Ok(Arc::new(Any(parse_list("any", args, compiler, location)?)))
}

fn parse_not(args: &Value, compiler: &ConditionCompiler<'_>, location: &str) -> Result<ConditionRef, ConfigError> {
    let inner = compiler.compile(args, &format!("{} > not", location))?;
    Ok(Arc::new(Not(inner)))
}

fn parse_true(args: &Value, _compiler: &ConditionCompiler<'_>, location: &str) -> Result<ConditionRef, ConfigError> {
    require_no_args("true", args, location)?;
    Ok(Arc::new(Constant(true)))
}

fn parse_false(args: &Value, _compiler: &ConditionCompiler<'_>, location: &str) -> Result<ConditionRef, ConfigError> {
    require_no_args("false", args, location)?;
    Ok(Arc::new(Constant(false)))
}

fn require_no_args(name: &str, args: &Value, location: &str) -> Result<(), ConfigError> {
    if args.is_null() {
        Ok(())
    } else {
        Err(invalid(name, location, "takes no arguments"))
    }
}

fn default_last_n() -> usize {
    1
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LastLabelsArgs {
    #[serde(default)]
    labels: Vec<LabelDefinition>,
    #[serde(default)]
    flow_labels: Vec<String>,
    #[serde(default = "default_last_n")]
    last_n_indices: usize,
}

fn parse_check_last_labels(
    args: &Value,
    compiler: &ConditionCompiler<'_>,
    location: &str,
) -> Result<ConditionRef, ConfigError> {
    let args: LastLabelsArgs = decode("check_last_labels", args, location)?;
    if args.last_n_indices == 0 {
        return Err(invalid("check_last_labels", location, "last_n_indices must be at least 1"));
    }
    let labels = args
        .labels
        .iter()
        .map(|l| compiler.node_label(l, location))
        .collect::<Result<Vec<_>, _>>()?;
    for flow in &args.flow_labels {
        if !compiler.nodes.keys().any(|key| &key.flow == flow) {
            return Err(ConfigError::FlowNotFound {
                flow: flow.clone(),
                referenced_from: location.to_string(),
            });
        }
    }
    Ok(Arc::new(CheckLastLabels {
        labels,
        flows: args.flow_labels,
        last_n: args.last_n_indices,
    }))
}

/// Master macro to define the built-in condition parsers and their registration.
macro_rules! define_condition_parsers {
    ( $( ($struct_name:ident, $name:expr, $parse:path) ),* $(,)? ) => {
        $(
            struct $struct_name;
            impl ConditionParser for $struct_name {
                fn name(&self) -> &str { $name }
                fn parse(&self, args: &Value, compiler: &ConditionCompiler<'_>, location: &str) -> Result<ConditionRef, ConfigError> {
                    $parse(args, compiler, location)
                }
            }
        )*

        pub(crate) fn register_default_parsers(registry: &mut AHashMap<String, Arc<dyn ConditionParser>>) {
            $( registry.insert($name.to_string(), Arc::new($struct_name)); )*
        }
    };
}

define_condition_parsers! {
    (SlotsExtractedParser, "slots_extracted", parse_slots_extracted),
    (SlotsExtractedAnyParser, "slots_extracted_any", parse_slots_extracted_any),
    (RegexpParser, "regexp", parse_regexp),
    (HasTextParser, "has_text", parse_has_text),
    (ExactMatchParser, "exact_match", parse_exact_match),
    (AllParser, "all", parse_all),
    (AnyParser, "any", parse_any),
    (NotParser, "not", parse_not),
    (TrueParser, "true", parse_true),
    (FalseParser, "false", parse_false),
    (CheckLastLabelsParser, "check_last_labels", parse_check_last_labels),
}
