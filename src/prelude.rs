//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the kaiwa crate.
//! Import this module to get access to the core functionality without having to import
//! each type individually.
//!
//! # Example
//!
//! ```rust,no_run
//! use kaiwa::prelude::*;
//! use std::sync::Arc;
//!
//! # fn run_example() -> Result<()> {
//! let script = std::fs::read_to_string("path/to/script.json")?;
//! let graph = Graph::load(script.as_str())?;
//!
//! let runner = Runner::new(Arc::new(graph), EngineConfig::default().with_seed(7));
//! let mut session = runner.new_session("user-1");
//! let outcome = runner.turn(&mut session, &Message::text("hello"))?;
//!
//! println!("Turn Outcome: {:?}", outcome);
//! # Ok(())
//! # }
//! ```

// Loading
pub use crate::graph::{Destination, Graph, GraphBuilder, Node, Transition};
pub use crate::script::{IntoScript, ScriptDefinition};

// Running turns
pub use crate::config::{DEFAULT_HISTORY_LIMIT, EngineConfig};
pub use crate::dialog::Dialog;
pub use crate::resolver::{TransitionOrder, TransitionResolver};
pub use crate::runner::{Runner, TurnOutcome};
pub use crate::session::Session;

// Extension points
pub use crate::condition::{Condition, ConditionParser, ConditionRef};
pub use crate::context::{Context, TurnState};
pub use crate::processing::Processing;

// Data types
pub use crate::label::{FlowLabel, NodeId};
pub use crate::message::{Attachment, Media, Message};
pub use crate::slots::{SlotPath, SlotStore};

// Error types
pub use crate::error::{ConfigError, LookupError, ProcessingError, SnapshotError, TurnError};

// Trace formatting
pub use crate::trace::TraceFormatter;

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
