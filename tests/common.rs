//! Common test utilities for building dialog scripts and runners.
use kaiwa::prelude::*;
use serde_json::{Value, json};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Installs a fmt subscriber writing through the test harness, once per test binary.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// The slot-filling script: extract a programmer's username and email, then
/// route on which of them was found.
///
/// Start and fallback are both `flow/node`.
#[allow(dead_code)]
pub fn slot_script() -> Value {
    json!({
        "custom_dir": "custom_dir",
        "slots": {
            "person": {
                "programmer": {
                    "username": { "regexp": "username is ([a-zA-Z]+)", "match_group_idx": 1 },
                    "email": { "regexp": "email is ([a-z@\\.A-Z]+)", "match_group_idx": 1 }
                }
            }
        },
        "start_label": ["flow", "node"],
        "fallback_label": ["flow", "node"],
        "flow": {
            "flow": {
                "node": {
                    "RESPONSE": "Hi! What is your username or email?",
                    "PRE_TRANSITIONS_PROCESSING": {
                        "get_username": { "extract": "person.programmer.username" },
                        "get_email": { "extract": "person.programmer.email" }
                    },
                    "TRANSITIONS": [
                        { "lbl": ["flow", "node1", 2], "cnd": { "slots_extracted": "person.programmer.username" } },
                        { "lbl": ["flow", "node2", 2], "cnd": { "slots_extracted": "person.programmer.email" } }
                    ]
                },
                "node1": {
                    "RESPONSE": { "filled_template": "Nice to meet you, {person.programmer.username}." },
                    "TRANSITIONS": [{ "lbl": ["flow", "node"], "cnd": true }]
                },
                "node2": {
                    "RESPONSE": "This's Slot speaking, how can I assist you?",
                    "PRE_TRANSITIONS_PROCESSING": {
                        "get_username": { "extract": "person.programmer.username" }
                    },
                    "TRANSITIONS": [
                        { "lbl": ["flow", "done"], "cnd": { "slots_extracted": ["person.programmer.username", "person.programmer.email"] } }
                    ]
                },
                "done": {
                    "RESPONSE": "Thanks {person.programmer.username}, we will write to {person.programmer.email}.",
                    "PRE_RESPONSE_PROCESSING": { "fill": "fill_template" }
                }
            }
        }
    })
}

/// A two-flow script exercising `GLOBAL` and `LOCAL` inheritance.
///
/// Every node can reach `help/start` through the global transition; the
/// `shop` flow additionally offers a local way back to its own start.
#[allow(dead_code)]
pub fn inheritance_script() -> Value {
    json!({
        "start_label": ["shop", "start"],
        "fallback_label": ["shop", "confused"],
        "GLOBAL": {
            "TRANSITIONS": [{ "lbl": ["help", "start"], "cnd": { "has_text": "help" } }],
            "MISC": { "channel": "web" }
        },
        "flow": {
            "shop": {
                "LOCAL": {
                    "RESPONSE": "Welcome to the shop.",
                    "TRANSITIONS": [{ "lbl": "start", "cnd": { "exact_match": "back" } }]
                },
                "start": {
                    "TRANSITIONS": [
                        { "lbl": "cart", "cnd": { "regexp": { "pattern": "^buy", "case_insensitive": true } } },
                        { "lbl": ["help", "start"], "cnd": { "exact_match": "help me with my cart" } }
                    ]
                },
                "cart": { "RESPONSE": "Added to cart." },
                "confused": { "RESPONSE": "Sorry, I did not get that." }
            },
            "help": {
                "start": { "RESPONSE": "How can I help?" }
            }
        }
    })
}

/// A script whose start node answers with one of two alternatives.
#[allow(dead_code)]
pub fn choice_script() -> Value {
    json!({
        "start_label": ["flow", "start"],
        "flow": {
            "flow": {
                "start": {
                    "RESPONSE": ["heads", "tails"],
                    "TRANSITIONS": [{ "lbl": "start", "cnd": true }]
                }
            }
        }
    })
}

/// A linear wizard flow navigated with destinations instead of fixed labels.
///
/// Stepping past the last node falls back to `aside/help`, which returns to
/// wherever the session was before.
#[allow(dead_code)]
pub fn wizard_script() -> Value {
    json!({
        "start_label": ["wizard", "name"],
        "fallback_label": ["aside", "help"],
        "flow": {
            "wizard": {
                "LOCAL": {
                    "TRANSITIONS": [
                        { "lbl": { "forward": null }, "cnd": { "exact_match": "next" } },
                        { "lbl": { "backward": null }, "cnd": { "exact_match": "back" } },
                        { "lbl": { "repeat": null }, "cnd": { "exact_match": "again" } },
                        { "lbl": { "start": null }, "cnd": { "exact_match": "restart" } }
                    ]
                },
                "name": { "RESPONSE": "What is your name?" },
                "age": { "RESPONSE": "How old are you?" },
                "done": { "RESPONSE": "All set." }
            },
            "aside": {
                "help": {
                    "RESPONSE": "Say next or back.",
                    "TRANSITIONS": [{ "lbl": { "repeat": { "shift": 1 } }, "cnd": true }]
                }
            }
        }
    })
}

#[allow(dead_code)]
pub fn load(script: Value) -> Arc<Graph> {
    Arc::new(Graph::load(script).expect("script should load"))
}

#[allow(dead_code)]
pub fn runner(script: Value) -> Runner {
    Runner::new(load(script), EngineConfig::default())
}

#[allow(dead_code)]
pub fn text_of(outcome: &TurnOutcome) -> Option<&str> {
    outcome.response.as_ref().and_then(|r| r.text.as_deref())
}
