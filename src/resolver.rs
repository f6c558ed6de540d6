use crate::context::Context;
use crate::graph::{Destination, Graph, Node, Transition};
use crate::label::{FlowLabel, NodeId};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Order in which a node's transitions are scanned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionOrder {
    /// Declaration order. Label priorities are informational only.
    #[default]
    Declared,
    /// Descending label priority; a missing priority ranks lowest and ties
    /// keep their declaration order.
    Priority,
}

/// One guard the resolver evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardOutcome {
    /// The transition's destination as declared.
    pub destination: String,
    pub condition: String,
    pub passed: bool,
    /// `false` when the guard held but the destination led nowhere, e.g.
    /// `forward` on the last node of a flow. Such a transition is skipped.
    pub reachable: bool,
}

/// Everything the resolver looked at during one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionTrace {
    pub from: FlowLabel,
    /// Guards in evaluation order, up to and including the one that held.
    pub evaluated: Vec<GuardOutcome>,
    pub target: FlowLabel,
    pub fallback: bool,
}

/// The transition chosen for a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub target: NodeId,
    /// The target label, carrying the priority of the transition that was taken.
    pub label: FlowLabel,
    pub fallback: bool,
    pub trace: TransitionTrace,
}

/// First-match transition resolution with a graph-wide fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionResolver {
    order: TransitionOrder,
}

impl TransitionResolver {
    pub fn new(order: TransitionOrder) -> Self {
        Self { order }
    }

    /// Picks the next node. Exactly one hop is taken: the first transition
    /// whose guard holds and whose destination exists, or the fallback node
    /// when there is none.
    pub fn resolve(&self, graph: &Graph, node: &Node, ctx: &Context<'_>) -> Resolution {
        let mut evaluated = Vec::with_capacity(node.transitions.len());
        for transition in self.ordered(&node.transitions) {
            let passed = transition.condition.check(ctx);
            let reached = if passed {
                locate(graph, &transition.destination, ctx)
            } else {
                None
            };
            trace!(from = %node.label, to = %transition.destination, passed, reachable = reached.is_some(), "guard");
            evaluated.push(GuardOutcome {
                destination: transition.destination.to_string(),
                condition: transition.condition.describe(),
                passed,
                reachable: !passed || reached.is_some(),
            });
            if let Some((target, label)) = reached {
                return Resolution {
                    target,
                    label: label.clone(),
                    fallback: false,
                    trace: TransitionTrace {
                        from: node.label.clone(),
                        evaluated,
                        target: label,
                        fallback: false,
                    },
                };
            }
        }

        let fallback = graph.fallback();
        Resolution {
            target: fallback.id,
            label: fallback.label.clone(),
            fallback: true,
            trace: TransitionTrace {
                from: node.label.clone(),
                evaluated,
                target: fallback.label.clone(),
                fallback: true,
            },
        }
    }

    fn ordered<'n>(&self, transitions: &'n [Transition]) -> Vec<&'n Transition> {
        let mut ordered: Vec<&Transition> = transitions.iter().collect();
        if self.order == TransitionOrder::Priority {
            // `sort_by` is stable, so equal priorities keep declaration order.
            ordered.sort_by(|a, b| {
                let a = a.destination.priority().unwrap_or(f64::NEG_INFINITY);
                let b = b.destination.priority().unwrap_or(f64::NEG_INFINITY);
                b.total_cmp(&a)
            });
        }
        ordered
    }
}

/// Resolves a destination against the session in `ctx`.
fn locate(graph: &Graph, destination: &Destination, ctx: &Context<'_>) -> Option<(NodeId, FlowLabel)> {
    let id = match destination {
        Destination::Node(id, label) => return Some((*id, label.clone())),
        Destination::Start => graph.start().id,
        Destination::Fallback => graph.fallback().id,
        Destination::Repeat { shift } => {
            let index = ctx.history.len().checked_sub(shift + 1)?;
            graph.resolve(&ctx.history[index]).ok()?
        }
        Destination::Forward { wrap } => graph.neighbour(ctx.current, 1, *wrap)?,
        Destination::Backward { wrap } => graph.neighbour(ctx.current, -1, *wrap)?,
    };
    Some((id, graph.node(id).label.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::slots::SlotStore;
    use serde_json::json;

    fn graph() -> Graph {
        Graph::load(json!({
            "start_label": ["flow", "start"],
            "fallback_label": ["flow", "fallback"],
            "flow": {
                "flow": {
                    "start": {
                        "TRANSITIONS": [
                            { "lbl": ["flow", "low"], "cnd": { "has_text": "go" } },
                            { "lbl": ["flow", "high", 5], "cnd": { "has_text": "go" } },
                            { "lbl": ["flow", "never", 9], "cnd": false }
                        ]
                    },
                    "low": {},
                    "high": {},
                    "never": {},
                    "fallback": {}
                }
            }
        }))
        .unwrap()
    }

    fn resolve(order: TransitionOrder, text: &str) -> Resolution {
        let graph = graph();
        let request = Message::text(text);
        let slots = SlotStore::new();
        let node = graph.lookup("flow", "start").unwrap();
        let ctx = Context {
            session_id: "s",
            request: &request,
            slots: &slots,
            schema: graph.schema(),
            current: &node.label,
            history: &[],
        };
        TransitionResolver::new(order).resolve(&graph, node, &ctx)
    }

    fn steps_graph() -> Graph {
        Graph::load(json!({
            "start_label": ["steps", "one"],
            "fallback_label": ["aside", "lost"],
            "flow": {
                "steps": {
                    "one": {},
                    "LOCAL": {
                        "TRANSITIONS": [
                            { "lbl": { "forward": null }, "cnd": { "exact_match": "next" } },
                            { "lbl": { "forward": { "loop": true } }, "cnd": { "exact_match": "next!" } },
                            { "lbl": { "backward": null }, "cnd": { "exact_match": "prev" } },
                            { "lbl": { "backward": { "loop": true } }, "cnd": { "exact_match": "prev!" } },
                            { "lbl": { "repeat": null }, "cnd": { "exact_match": "again" } },
                            { "lbl": { "repeat": { "shift": 1 } }, "cnd": { "exact_match": "undo" } },
                            { "lbl": { "start": null }, "cnd": { "exact_match": "home" } },
                            { "dst": { "fallback": null }, "cnd": { "exact_match": "panic" } }
                        ]
                    },
                    "two": {},
                    "three": {}
                },
                "aside": { "lost": {} }
            }
        }))
        .unwrap()
    }

    fn step_from(node: &str, history: &[FlowLabel], text: &str) -> Resolution {
        let graph = steps_graph();
        let request = Message::text(text);
        let slots = SlotStore::new();
        let node = graph.lookup("steps", node).unwrap();
        let ctx = Context {
            session_id: "s",
            request: &request,
            slots: &slots,
            schema: graph.schema(),
            current: &node.label,
            history,
        };
        TransitionResolver::default().resolve(&graph, node, &ctx)
    }

    fn steps(node: &str) -> FlowLabel {
        FlowLabel::new("steps", node)
    }

    #[test]
    fn declared_order_takes_first_match() {
        let resolution = resolve(TransitionOrder::Declared, "go");
        assert_eq!(resolution.label, FlowLabel::new("flow", "low"));
        assert!(!resolution.fallback);
        assert_eq!(resolution.trace.evaluated.len(), 1);
    }

    #[test]
    fn priority_order_prefers_higher_priority() {
        let resolution = resolve(TransitionOrder::Priority, "go");
        assert_eq!(resolution.label, FlowLabel::new("flow", "high").with_priority(5.0));
        let checked: Vec<_> = resolution.trace.evaluated.iter().map(|g| g.passed).collect();
        assert_eq!(checked, vec![false, true]);
    }

    #[test]
    fn forward_and_backward_follow_declaration_order() {
        let history = [steps("one")];
        assert_eq!(step_from("one", &history, "next").label, steps("two"));
        assert_eq!(step_from("two", &history, "next").label, steps("three"));
        assert_eq!(step_from("two", &history, "prev").label, steps("one"));
        assert_eq!(step_from("three", &history, "next!").label, steps("one"));
        assert_eq!(step_from("one", &history, "prev!").label, steps("three"));
    }

    #[test]
    fn stepping_off_the_flow_end_skips_the_transition() {
        let resolution = step_from("three", &[steps("three")], "next");
        assert!(resolution.fallback);
        assert_eq!(resolution.label, FlowLabel::new("aside", "lost"));
        let first = &resolution.trace.evaluated[0];
        assert!(first.passed && !first.reachable);

        assert!(step_from("one", &[steps("one")], "prev").fallback);
    }

    #[test]
    fn repeat_walks_back_through_history() {
        let history = [steps("one"), steps("three"), steps("two")];
        assert_eq!(step_from("two", &history, "again").label, steps("two"));
        assert_eq!(step_from("two", &history, "undo").label, steps("three"));

        let short = step_from("one", &[steps("one")], "undo");
        assert!(short.fallback);
    }

    #[test]
    fn start_and_fallback_destinations() {
        let history = [steps("one"), steps("three")];
        let home = step_from("three", &history, "home");
        assert_eq!(home.label, steps("one"));
        assert!(!home.fallback);

        let lost = step_from("three", &history, "panic");
        assert_eq!(lost.label, FlowLabel::new("aside", "lost"));
        assert!(!lost.fallback);
    }

    #[test]
    fn no_match_falls_back() {
        let resolution = resolve(TransitionOrder::Declared, "stay");
        assert!(resolution.fallback);
        assert_eq!(resolution.label, FlowLabel::new("flow", "fallback"));
        assert_eq!(resolution.trace.evaluated.len(), 3);
    }
}
