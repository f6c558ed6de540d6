use crate::context::Context;
use std::sync::Arc;

pub mod parsing;
pub mod standard;

pub use parsing::{ConditionCompiler, ConditionParser};
pub use standard::*;

/// A predicate guarding a transition.
///
/// Built-in predicates and externally supplied ones share this contract, so
/// the resolver invokes any of them the same way regardless of origin.
pub trait Condition: Send + Sync {
    fn check(&self, ctx: &Context<'_>) -> bool;

    /// A short, human-readable form used in turn traces.
    fn describe(&self) -> String {
        "custom".to_string()
    }
}

impl<F> Condition for F
where
    F: Fn(&Context<'_>) -> bool + Send + Sync,
{
    fn check(&self, ctx: &Context<'_>) -> bool {
        self(ctx)
    }
}

/// Shared, type-erased condition as stored in the graph.
pub type ConditionRef = Arc<dyn Condition>;
