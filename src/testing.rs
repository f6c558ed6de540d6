//! Scripted-conversation checks for dialog scripts.

use crate::error::HappyPathError;
use crate::message::Message;
use crate::runner::Runner;
use crate::session::Session;
use tracing::debug;

/// A scripted conversation: every request paired with the response it must produce.
#[derive(Debug, Clone, Default)]
pub struct HappyPath {
    steps: Vec<(Message, Option<Message>)>,
}

impl HappyPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects `request` to be answered with `response`.
    pub fn step(mut self, request: impl Into<Message>, response: impl Into<Message>) -> Self {
        self.steps.push((request.into(), Some(response.into())));
        self
    }

    /// Expects `request` to land on a node without a response.
    pub fn silent_step(mut self, request: impl Into<Message>) -> Self {
        self.steps.push((request.into(), None));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Plays the conversation in a fresh session and stops at the first
    /// deviation. Returns the final session on success.
    ///
    /// Responses chosen at random can only be checked reliably with a
    /// seeded `EngineConfig`.
    pub fn check(&self, runner: &Runner) -> Result<Session, HappyPathError> {
        let mut session = runner.new_session("happy_path");
        for (i, (request, expected)) in self.steps.iter().enumerate() {
            let turn = i + 1;
            let outcome = runner
                .turn(&mut session, request)
                .map_err(|source| HappyPathError::Turn { turn, source })?;
            debug!(turn, label = %outcome.label, "happy path step");
            if &outcome.response != expected {
                return Err(HappyPathError::Mismatch {
                    turn,
                    request: request.clone(),
                    expected: expected.clone(),
                    actual: outcome.response,
                });
            }
        }
        Ok(session)
    }
}

/// Shorthand for checking `(request, response)` text pairs.
pub fn check_happy_path<'a>(
    runner: &Runner,
    steps: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<Session, HappyPathError> {
    steps
        .into_iter()
        .fold(HappyPath::new(), |path, (request, response)| path.step(request, response))
        .check(runner)
}
