use super::{Condition, ConditionRef};
use crate::context::Context;
use crate::label::FlowLabel;
use crate::slots::SlotPath;
use itertools::Itertools;
use regex::Regex;
use serde::Deserialize;

/// A condition with a fixed outcome.
pub struct Constant(pub bool);

impl Condition for Constant {
    fn check(&self, _ctx: &Context<'_>) -> bool {
        self.0
    }

    fn describe(&self) -> String {
        self.0.to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotsMode {
    #[default]
    All,
    Any,
}

/// True iff all (or any, depending on `mode`) listed slot paths are filled.
pub struct SlotsExtracted {
    pub paths: Vec<SlotPath>,
    pub mode: SlotsMode,
}

impl SlotsExtracted {
    pub fn all(paths: Vec<SlotPath>) -> Self {
        Self {
            paths,
            mode: SlotsMode::All,
        }
    }

    pub fn any(paths: Vec<SlotPath>) -> Self {
        Self {
            paths,
            mode: SlotsMode::Any,
        }
    }
}

impl Condition for SlotsExtracted {
    fn check(&self, ctx: &Context<'_>) -> bool {
        match self.mode {
            SlotsMode::All => self.paths.iter().all(|p| ctx.is_filled(p)),
            SlotsMode::Any => self.paths.iter().any(|p| ctx.is_filled(p)),
        }
    }

    fn describe(&self) -> String {
        let name = match self.mode {
            SlotsMode::All => "slots_extracted",
            SlotsMode::Any => "slots_extracted_any",
        };
        format!("{}({})", name, self.paths.iter().join(", "))
    }
}

/// True if the request text contains a match of the expression.
pub struct Regexp(pub Regex);

impl Condition for Regexp {
    fn check(&self, ctx: &Context<'_>) -> bool {
        ctx.text().is_some_and(|text| self.0.is_match(text))
    }

    fn describe(&self) -> String {
        format!("regexp(/{}/)", self.0.as_str())
    }
}

/// True if the request text contains the given substring.
pub struct HasText(pub String);

impl Condition for HasText {
    fn check(&self, ctx: &Context<'_>) -> bool {
        ctx.text().is_some_and(|text| text.contains(&self.0))
    }

    fn describe(&self) -> String {
        format!("has_text({:?})", self.0)
    }
}

/// True if the request text equals the given string.
pub struct ExactMatch(pub String);

impl Condition for ExactMatch {
    fn check(&self, ctx: &Context<'_>) -> bool {
        ctx.text() == Some(self.0.as_str())
    }

    fn describe(&self) -> String {
        format!("exact_match({:?})", self.0)
    }
}

pub struct All(pub Vec<ConditionRef>);

impl Condition for All {
    fn check(&self, ctx: &Context<'_>) -> bool {
        self.0.iter().all(|c| c.check(ctx))
    }

    fn describe(&self) -> String {
        format!("all({})", self.0.iter().map(|c| c.describe()).join(", "))
    }
}

pub struct Any(pub Vec<ConditionRef>);

impl Condition for Any {
    fn check(&self, ctx: &Context<'_>) -> bool {
        self.0.iter().any(|c| c.check(ctx))
    }

    fn describe(&self) -> String {
        format!("any({})", self.0.iter().map(|c| c.describe()).join(", "))
    }
}

pub struct Not(pub ConditionRef);

impl Condition for Not {
    fn check(&self, ctx: &Context<'_>) -> bool {
        !self.0.check(ctx)
    }

    fn describe(&self) -> String {
        format!("not({})", self.0.describe())
    }
}

/// True if one of the last `last_n` visited labels is listed in `labels` or
/// belongs to a flow listed in `flows`.
pub struct CheckLastLabels {
    pub labels: Vec<FlowLabel>,
    pub flows: Vec<String>,
    pub last_n: usize,
}

impl Condition for CheckLastLabels {
    fn check(&self, ctx: &Context<'_>) -> bool {
        let skip = ctx.history.len().saturating_sub(self.last_n);
        ctx.history[skip..].iter().any(|visited| {
            self.flows.contains(&visited.flow) || self.labels.iter().any(|l| l.same_node(visited))
        })
    }

    fn describe(&self) -> String {
        format!(
            "check_last_labels([{}], last {})",
            self.labels
                .iter()
                .map(ToString::to_string)
                .chain(self.flows.iter().cloned())
                .join(", "),
            self.last_n
        )
    }
}

/// An externally supplied condition, remembered under its qualified name.
pub struct Named {
    pub name: String,
    pub inner: ConditionRef,
}

impl Condition for Named {
    fn check(&self, ctx: &Context<'_>) -> bool {
        self.inner.check(ctx)
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}
