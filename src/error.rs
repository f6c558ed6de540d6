use crate::label::FlowLabel;
use crate::message::Message;
use thiserror::Error;

/// Errors that can occur while loading a script into a `Graph`.
///
/// Every variant is raised at load time. A graph that loads successfully can
/// never fail a turn because of a dangling reference.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to parse script: {0}")]
    Parse(String),

    #[error("Invalid custom_dir '{0}': it must be a single non-empty identifier without '.'")]
    InvalidCustomDir(String),

    #[error("Node '{label}' not found, which is referenced from {referenced_from}")]
    NodeNotFound {
        label: String,
        referenced_from: String,
    },

    #[error("Flow '{flow}' not found, which is referenced from {referenced_from}")]
    FlowNotFound {
        flow: String,
        referenced_from: String,
    },

    #[error("Invalid label in {location}: {message}")]
    InvalidLabel { location: String, message: String },

    #[error("Unknown condition '{name}' in {location}")]
    UnknownCondition { name: String, location: String },

    #[error("Reference '{name}' in {location} does not resolve to a registered callable")]
    UnresolvedReference { name: String, location: String },

    #[error("Unknown processing step '{name}' in {location}")]
    UnknownProcessing { name: String, location: String },

    #[error("Slot '{path}' referenced in {location} is not defined")]
    UnknownSlot { path: String, location: String },

    #[error("Slot '{path}' has an invalid regular expression: {message}")]
    InvalidRegex { path: String, message: String },

    #[error("Slot group '{0}' must have at least one child")]
    EmptySlotGroup(String),

    #[error("Invalid slot name '{name}' under '{parent}'")]
    InvalidSlotName { name: String, parent: String },

    #[error("Invalid response in {location}: {message}")]
    InvalidResponse { location: String, message: String },

    #[error("Invalid arguments for '{name}' in {location}: {message}")]
    InvalidArguments {
        name: String,
        location: String,
        message: String,
    },
}

/// Errors that can occur when looking up a node in a loaded graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Node '{flow}/{node}' not found in the graph")]
    NotFound { flow: String, node: String },
}

/// Error reported by a custom processing step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ProcessingError(pub String);

/// Errors that can occur during a single dialog turn.
///
/// A failed turn leaves its session untouched and never affects other sessions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TurnError {
    #[error("Inbound message for session '{0}' has neither text nor attachments")]
    EmptyRequest(String),

    #[error("Session '{session_id}' points at '{label}', which is not part of the graph")]
    UnknownNode { session_id: String, label: FlowLabel },

    #[error("Processing step '{step}' on node '{label}' failed: {source}")]
    Processing {
        step: String,
        label: FlowLabel,
        #[source]
        source: ProcessingError,
    },

    #[error("Failed to render the response of node '{label}': {message}")]
    Response { label: FlowLabel, message: String },
}

/// Errors that can occur when saving or restoring a session snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("Session serialization failed: {0}")]
    Encode(String),

    #[error("Session deserialization failed: {0}")]
    Decode(String),
}

/// Errors reported by the happy-path checker.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HappyPathError {
    #[error("Turn {turn} failed: {source}")]
    Turn {
        turn: usize,
        #[source]
        source: TurnError,
    },

    #[error("Turn {turn} ({request:?}): expected {expected:?}, got {actual:?}")]
    Mismatch {
        turn: usize,
        request: Message,
        expected: Option<Message>,
        actual: Option<Message>,
    },
}
