use crate::context::TurnState;
use crate::error::{ConfigError, ProcessingError};
use crate::slots::{SlotPath, SlotSchema};
use ahash::AHashMap;
use itertools::Itertools;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

static NO_ARGS: Value = Value::Null;

/// An externally supplied processing step.
pub trait Processing: Send + Sync {
    fn process(&self, state: &mut TurnState<'_>) -> Result<(), ProcessingError>;
}

impl<F> Processing for F
where
    F: Fn(&mut TurnState<'_>) -> Result<(), ProcessingError> + Send + Sync,
{
    fn process(&self, state: &mut TurnState<'_>) -> Result<(), ProcessingError> {
        self(state)
    }
}

/// When a step runs within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// On the current node, before transition guards are evaluated.
    PreTransition,
    /// On the target node, before its response is rendered.
    PreResponse,
}

#[derive(Clone)]
pub enum ProcessingAction {
    Extract(Vec<SlotPath>),
    ExtractAll,
    Unset(Vec<SlotPath>),
    UnsetAll,
    /// Marks the node's response as a slot template. Has no effect on its own.
    FillTemplate,
    Custom {
        name: String,
        inner: Arc<dyn Processing>,
    },
}

impl fmt::Debug for ProcessingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl ProcessingAction {
    pub fn describe(&self) -> String {
        match self {
            ProcessingAction::Extract(paths) => format!("extract({})", paths.iter().join(", ")),
            ProcessingAction::ExtractAll => "extract_all".to_string(),
            ProcessingAction::Unset(paths) => format!("unset({})", paths.iter().join(", ")),
            ProcessingAction::UnsetAll => "unset_all".to_string(),
            ProcessingAction::FillTemplate => "fill_template".to_string(),
            ProcessingAction::Custom { name, .. } => name.clone(),
        }
    }
}

/// A named step of a node's processing list.
#[derive(Debug, Clone)]
pub struct ProcessingStep {
    pub name: String,
    pub action: ProcessingAction,
}

impl ProcessingStep {
    /// Runs the step against the turn's working state.
    ///
    /// Extraction steps never fail: a miss leaves the slot unfilled.
    pub fn run(&self, state: &mut TurnState<'_>) -> Result<(), ProcessingError> {
        let text = state.request.text.as_deref();
        match &self.action {
            ProcessingAction::Extract(paths) => {
                for path in paths {
                    let written = state.schema.extract(state.slots, path, text);
                    debug!(step = %self.name, slot = %path, written, "extract");
                }
            }
            ProcessingAction::ExtractAll => {
                let written = state.schema.extract_all(state.slots, text);
                debug!(step = %self.name, written, "extract_all");
            }
            ProcessingAction::Unset(paths) => {
                for path in paths {
                    state.schema.unset(state.slots, path);
                }
            }
            ProcessingAction::UnsetAll => state.schema.unset_all(state.slots),
            ProcessingAction::FillTemplate => {}
            ProcessingAction::Custom { inner, .. } => inner.process(state)?,
        }
        Ok(())
    }

    pub fn is_fill_template(&self) -> bool {
        matches!(self.action, ProcessingAction::FillTemplate)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PathArgs {
    One(String),
    Many(Vec<String>),
}

/// Resolves step definitions against the slot schema and the custom processing registry.
pub(crate) struct StepCompiler<'a> {
    pub(crate) schema: &'a SlotSchema,
    pub(crate) custom: &'a AHashMap<String, Arc<dyn Processing>>,
    pub(crate) custom_prefix: &'a str,
}

impl StepCompiler<'_> {
    pub(crate) fn compile(
        &self,
        name: &str,
        definition: &Value,
        phase: Phase,
        location: &str,
    ) -> Result<ProcessingStep, ConfigError> {
        let location = format!("{} > {}", location, name);
        let (callee, args) = match definition {
            Value::String(callee) => (callee.as_str(), &NO_ARGS),
            Value::Object(map) if map.len() == 1 => map
                .iter()
                .next()
                .map(|(k, v)| (k.as_str(), v))
                .ok_or_else(|| unknown(&definition.to_string(), &location))?,
            _ => return Err(unknown(&definition.to_string(), &location)),
        };

        let action = if callee.starts_with(self.custom_prefix) {
            let inner = self
                .custom
                .get(callee)
                .ok_or_else(|| ConfigError::UnresolvedReference {
                    name: callee.to_string(),
                    location: location.clone(),
                })?;
            no_args(callee, args, &location)?;
            ProcessingAction::Custom {
                name: callee.to_string(),
                inner: inner.clone(),
            }
        } else {
            match callee {
                "extract" => ProcessingAction::Extract(self.paths(callee, args, &location)?),
                "unset" => ProcessingAction::Unset(self.paths(callee, args, &location)?),
                "extract_all" => {
                    no_args(callee, args, &location)?;
                    ProcessingAction::ExtractAll
                }
                "unset_all" => {
                    no_args(callee, args, &location)?;
                    ProcessingAction::UnsetAll
                }
                "fill_template" => {
                    no_args(callee, args, &location)?;
                    if phase != Phase::PreResponse {
                        return Err(ConfigError::InvalidArguments {
                            name: callee.to_string(),
                            location,
                            message: "fill_template is only valid in PRE_RESPONSE_PROCESSING".to_string(),
                        });
                    }
                    ProcessingAction::FillTemplate
                }
                other => return Err(unknown(other, &location)),
            }
        };

        Ok(ProcessingStep {
            name: name.to_string(),
            action,
        })
    }

    fn paths(&self, callee: &str, args: &Value, location: &str) -> Result<Vec<SlotPath>, ConfigError> {
        let raw = match PathArgs::deserialize(args) {
            Ok(PathArgs::One(path)) => vec![path],
            Ok(PathArgs::Many(paths)) if !paths.is_empty() => paths,
            _ => {
                return Err(ConfigError::InvalidArguments {
                    name: callee.to_string(),
                    location: location.to_string(),
                    message: "expected a slot path or a non-empty list of slot paths".to_string(),
                });
            }
        };
        raw.iter()
            .map(|raw| {
                SlotPath::parse(raw)
                    .ok()
                    .filter(|path| self.schema.contains(path))
                    .ok_or_else(|| ConfigError::UnknownSlot {
                        path: raw.clone(),
                        location: location.to_string(),
                    })
            })
            .collect()
    }
}

fn unknown(name: &str, location: &str) -> ConfigError {
    ConfigError::UnknownProcessing {
        name: name.to_string(),
        location: location.to_string(),
    }
}

fn no_args(callee: &str, args: &Value, location: &str) -> Result<(), ConfigError> {
    if args.is_null() {
        Ok(())
    } else {
        Err(ConfigError::InvalidArguments {
            name: callee.to_string(),
            location: location.to_string(),
            message: "takes no arguments".to_string(),
        })
    }
}
