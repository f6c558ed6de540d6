use crate::config::EngineConfig;
use crate::context::{Context, TurnState};
use crate::error::TurnError;
use crate::graph::{Graph, Node};
use crate::label::FlowLabel;
use crate::message::Message;
use crate::processing::ProcessingStep;
use crate::resolver::TransitionResolver;
use crate::response;
use crate::session::Session;
use crate::slots::SlotStore;
use crate::trace::TraceFormatter;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};

/// Result of a single dialog turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// The node the turn ended at.
    pub label: FlowLabel,
    /// `None` when the node declares no response.
    pub response: Option<Message>,
    pub fallback: bool,
    /// Human-readable explanation of the transition.
    pub reason: String,
}

/// Executes turns of any number of sessions against one shared graph.
#[derive(Debug, Clone)]
pub struct Runner {
    graph: Arc<Graph>,
    config: EngineConfig,
    resolver: TransitionResolver,
}

impl Runner {
    pub fn new(graph: Arc<Graph>, config: EngineConfig) -> Self {
        let resolver = TransitionResolver::new(config.order);
        Self {
            graph,
            config,
            resolver,
        }
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A session positioned at the start node.
    pub fn new_session(&self, id: impl Into<String>) -> Session {
        Session::new(id, self.graph.start().label.clone())
    }

    /// Runs one turn: pre-transition processing on the current node,
    /// transition resolution, pre-response processing on the target node and
    /// response rendering.
    ///
    /// The turn works on a copy of the slot store. `session` is updated only
    /// when every step succeeded; on error it is left exactly as it was.
    pub fn turn(&self, session: &mut Session, request: &Message) -> Result<TurnOutcome, TurnError> {
        let span = info_span!("turn", session = %session.id, turn = session.turns);
        let _enter = span.enter();

        if request.is_empty() {
            return Err(TurnError::EmptyRequest(session.id.clone()));
        }
        let current = self
            .graph
            .resolve(&session.current)
            .map(|id| self.graph.node(id))
            .map_err(|_| TurnError::UnknownNode {
                session_id: session.id.clone(),
                label: session.current.clone(),
            })?;

        let mut slots = session.slots.clone();
        self.run_steps(current, &current.pre_transition, session, request, &mut slots)?;

        let resolution = {
            let ctx = self.context(session, request, &slots);
            self.resolver.resolve(&self.graph, current, &ctx)
        };
        let target = self.graph.node(resolution.target);

        self.run_steps(target, &target.pre_response, session, request, &mut slots)?;

        let rendered = {
            let ctx = self.context(session, request, &slots);
            match self.config.seed {
                Some(seed) => {
                    let mut rng = StdRng::seed_from_u64(turn_seed(seed, &session.id, session.turns));
                    response::render(target, &ctx, &mut rng)
                }
                None => response::render(target, &ctx, &mut rand::rng()),
            }
        };
        let response = rendered.map_err(|message| TurnError::Response {
            label: target.label.clone(),
            message,
        })?;
        let reason = TraceFormatter::format_trace(&resolution.trace);

        session.slots = slots;
        session.current = resolution.label.clone();
        session.history.push(resolution.label.clone());
        if let Some(limit) = self.config.history_limit {
            let excess = session.history.len().saturating_sub(limit.max(1));
            session.history.drain(..excess);
        }
        session.turns += 1;

        info!(to = %resolution.label, fallback = resolution.fallback, "turn complete");
        debug!(reason = %reason, slots = session.slots.len());

        Ok(TurnOutcome {
            label: resolution.label,
            response,
            fallback: resolution.fallback,
            reason,
        })
    }

    fn context<'a>(&'a self, session: &'a Session, request: &'a Message, slots: &'a SlotStore) -> Context<'a> {
        Context {
            session_id: &session.id,
            request,
            slots,
            schema: self.graph.schema(),
            current: &session.current,
            history: &session.history,
        }
    }

    fn run_steps(
        &self,
        node: &Node,
        steps: &[ProcessingStep],
        session: &Session,
        request: &Message,
        slots: &mut SlotStore,
    ) -> Result<(), TurnError> {
        let mut state = TurnState {
            session_id: &session.id,
            request,
            slots,
            schema: self.graph.schema(),
            current: &session.current,
            history: &session.history,
        };
        for step in steps {
            step.run(&mut state).map_err(|source| {
                warn!(node = %node.label, step = %step.name, error = %source, "processing failed");
                TurnError::Processing {
                    step: step.name.clone(),
                    label: node.label.clone(),
                    source,
                }
            })?;
        }
        Ok(())
    }
}

/// Seed of the response generator for one turn of one session.
fn turn_seed(seed: u64, session_id: &str, turn: u64) -> u64 {
    ahash::RandomState::with_seeds(seed, 0x6b61_6977_61, 0, 0).hash_one((session_id, turn))
}
