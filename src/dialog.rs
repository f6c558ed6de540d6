use crate::error::TurnError;
use crate::message::Message;
use crate::runner::{Runner, TurnOutcome};
use crate::session::Session;
use ahash::AHashMap;
use rayon::prelude::*;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, warn};

type SessionHandle = Arc<Mutex<Session>>;

/// A thread-safe table of sessions served by one `Runner`.
///
/// Sessions are created at the start node on first contact. Turns of
/// different sessions run in parallel; turns of the same session are
/// serialized by that session's lock.
pub struct Dialog {
    runner: Runner,
    sessions: RwLock<AHashMap<String, SessionHandle>>,
}

impl Dialog {
    pub fn new(runner: Runner) -> Self {
        Self {
            runner,
            sessions: RwLock::new(AHashMap::new()),
        }
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    /// Runs one turn for `session_id`, creating the session if needed.
    pub fn respond(&self, session_id: &str, request: &Message) -> Result<TurnOutcome, TurnError> {
        let handle = self.handle(session_id);
        let mut session = handle.lock().unwrap_or_else(|poisoned| {
            warn!(session = %session_id, "recovering session after a panicked turn");
            poisoned.into_inner()
        });
        self.runner.turn(&mut session, request)
    }

    /// Runs a batch of turns in parallel. Results are returned in input order.
    ///
    /// Requests for the same session are serialized, in no particular order.
    pub fn respond_batch(&self, requests: &[(String, Message)]) -> Vec<Result<TurnOutcome, TurnError>> {
        requests
            .par_iter()
            .map(|(session_id, request)| self.respond(session_id, request))
            .collect()
    }

    /// A copy of the session's current state.
    pub fn session(&self, session_id: &str) -> Option<Session> {
        let handle = self.read().get(session_id).cloned()?;
        let session = handle.lock().unwrap_or_else(PoisonError::into_inner);
        Some(session.clone())
    }

    /// Puts a previously saved session back into the table and returns the
    /// one it replaces, if any.
    pub fn restore(&self, session: Session) -> Option<Session> {
        let id = session.id.clone();
        let previous = self.write().insert(id, Arc::new(Mutex::new(session)))?;
        Self::into_session(previous)
    }

    pub fn remove(&self, session_id: &str) -> Option<Session> {
        let previous = self.write().remove(session_id)?;
        Self::into_session(previous)
    }

    pub fn session_count(&self) -> usize {
        self.read().len()
    }

    fn handle(&self, session_id: &str) -> SessionHandle {
        if let Some(handle) = self.read().get(session_id) {
            return handle.clone();
        }
        self.write()
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!(session = %session_id, "new session");
                Arc::new(Mutex::new(self.runner.new_session(session_id)))
            })
            .clone()
    }

    // Turns commit only after every step succeeded, so neither the table nor a
    // session is ever left half-written by a panic.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, AHashMap<String, SessionHandle>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, AHashMap<String, SessionHandle>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn into_session(handle: SessionHandle) -> Option<Session> {
        match Arc::try_unwrap(handle) {
            Ok(mutex) => Some(mutex.into_inner().unwrap_or_else(PoisonError::into_inner)),
            Err(shared) => Some(shared.lock().unwrap_or_else(PoisonError::into_inner).clone()),
        }
    }
}
