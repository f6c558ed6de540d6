use crate::resolver::{GuardOutcome, TransitionTrace};
use itertools::Itertools;

/// Formats transition traces into human-readable strings
pub struct TraceFormatter;

impl TraceFormatter {
    /// Format a transition trace into a one-line explanation of the hop.
    pub fn format_trace(trace: &TransitionTrace) -> String {
        let (held, rejected) = match trace.evaluated.split_last() {
            Some((last, rest)) if last.passed && last.reachable => (Some(last), rest),
            _ => (None, trace.evaluated.as_slice()),
        };

        let mut result = match held {
            Some(guard) => format!("{} -> {} because {} held", trace.from, trace.target, guard.condition),
            None if trace.evaluated.is_empty() => {
                format!("{} -> {} by fallback (no transitions)", trace.from, trace.target)
            }
            None => format!("{} -> {} by fallback", trace.from, trace.target),
        };

        if !rejected.is_empty() {
            result.push_str(&format!(
                "; rejected: {}",
                rejected.iter().map(Self::format_guard).join(", ")
            ));
        }
        result
    }

    fn format_guard(guard: &GuardOutcome) -> String {
        if guard.reachable {
            format!("{} ({})", guard.destination, guard.condition)
        } else {
            format!("{} ({}, no such node)", guard.destination, guard.condition)
        }
    }
}
