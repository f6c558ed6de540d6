use crate::label::FlowLabel;
use crate::message::Message;
use crate::slots::{SlotPath, SlotSchema, SlotStore};

/// Read-only view of a turn handed to conditions and response rendering.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub session_id: &'a str,
    pub request: &'a Message,
    pub slots: &'a SlotStore,
    pub schema: &'a SlotSchema,
    /// The node the turn started at.
    pub current: &'a FlowLabel,
    /// Visited labels, oldest first, ending with `current`.
    pub history: &'a [FlowLabel],
}

impl<'a> Context<'a> {
    pub fn text(&self) -> Option<&'a str> {
        self.request.text.as_deref()
    }

    pub fn is_filled(&self, path: &SlotPath) -> bool {
        self.schema.is_filled(self.slots, path)
    }

    pub fn slot(&self, path: &str) -> Option<&'a str> {
        self.slots.get_str(path)
    }
}

/// Mutable view of a turn handed to processing steps.
///
/// `slots` is the turn's working copy; it is committed to the session only
/// when the whole turn succeeds.
#[derive(Debug)]
pub struct TurnState<'a> {
    pub session_id: &'a str,
    pub request: &'a Message,
    pub slots: &'a mut SlotStore,
    pub schema: &'a SlotSchema,
    pub current: &'a FlowLabel,
    pub history: &'a [FlowLabel],
}

impl<'a> TurnState<'a> {
    pub fn text(&self) -> Option<&'a str> {
        self.request.text.as_deref()
    }

    /// Reborrows the state as a read-only `Context`.
    pub fn as_context(&self) -> Context<'_> {
        Context {
            session_id: self.session_id,
            request: self.request,
            slots: self.slots,
            schema: self.schema,
            current: self.current,
            history: self.history,
        }
    }
}
