//! # Kaiwa - Dialog Flow Engine
//!
//! **Kaiwa** is a graph-based dialog state machine with slot filling, conditional routing
//! and deterministic fallback. A declarative script describes flows of nodes, the slots
//! to extract from user messages, the conditions guarding each transition and the
//! responses to render. Kaiwa validates the whole script once, ahead of time, and then
//! runs turns for any number of sessions against the immutable result.
//!
//! ## Core Workflow
//!
//! The engine is format-agnostic. It operates on a canonical in-memory model of a
//! "script definition." The primary workflow is:
//!
//! 1.  **Load Your Script**: Decode your configuration (JSON, YAML, ...) into a `serde_json::Value`, or implement the `IntoScript` trait for your own structs.
//! 2.  **Build the Graph**: Use `Graph::builder` to register custom conditions and processing steps, then `build()` it. Every label, slot, regex and reference is checked here.
//! 3.  **Run Turns**: Wrap the graph in a `Runner`, or in a `Dialog` to have sessions managed for you, and feed it user messages.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kaiwa::prelude::*;
//! use std::sync::Arc;
//!
//! fn main() -> Result<()> {
//!     let script = serde_json::json!({
//!         "slots": {
//!             "person": {
//!                 "username": { "regexp": "username is ([a-zA-Z]+)", "match_group_idx": 1 },
//!                 "email": { "regexp": "email is ([a-z@\\.A-Z]+)", "match_group_idx": 1 }
//!             }
//!         },
//!         "start_label": ["flow", "start"],
//!         "flow": {
//!             "flow": {
//!                 "start": {
//!                     "RESPONSE": "Hi! Tell me your username or email.",
//!                     "PRE_TRANSITIONS_PROCESSING": { "get_slots": { "extract": "person" } },
//!                     "TRANSITIONS": [
//!                         { "lbl": ["flow", "known", 2], "cnd": { "slots_extracted_any": "person" } }
//!                     ]
//!                 },
//!                 "known": {
//!                     "RESPONSE": { "filled_template": "Welcome, {person.username}!" }
//!                 }
//!             }
//!         }
//!     });
//!
//!     // The custom condition is referenced from scripts as `custom_dir.cnd.always`.
//!     let graph = Graph::builder(script)?
//!         .with_condition("custom_dir.cnd.always", |_ctx: &Context<'_>| true)
//!         .build()?;
//!
//!     let dialog = Dialog::new(Runner::new(Arc::new(graph), EngineConfig::default()));
//!     let outcome = dialog.respond("user-1", &Message::text("my username is ada"))?;
//!
//!     println!("-> {} ({})", outcome.label, outcome.reason);
//!     if let Some(text) = outcome.response.and_then(|r| r.text) {
//!         println!("-> {}", text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod condition;
pub mod config;
pub mod context;
pub mod dialog;
pub mod error;
pub mod graph;
pub mod label;
pub mod message;
pub mod prelude;
pub mod processing;
pub mod resolver;
pub mod response;
pub mod runner;
pub mod script;
pub mod session;
pub mod slots;
pub mod testing;
pub mod trace;
