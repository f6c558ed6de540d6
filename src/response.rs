use crate::context::Context;
use crate::error::ConfigError;
use crate::graph::Node;
use crate::message::Message;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Deserialize;
use serde_json::Value;

/// A response alternative. `fill_slots` replaces `{slot.path}` placeholders
/// in the text with the session's slot values when rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageTemplate {
    pub message: Message,
    pub fill_slots: bool,
}

impl MessageTemplate {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            fill_slots: false,
        }
    }

    fn render(&self, ctx: &Context<'_>, fill_slots: bool) -> Message {
        let mut message = self.message.clone();
        if self.fill_slots || fill_slots {
            message.text = message.text.map(|text| ctx.slots.fill_template(&text));
        }
        message
    }
}

/// How a node's response is chosen.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseSpec {
    Single(MessageTemplate),
    /// Uniformly random among the alternatives.
    Choice(Vec<MessageTemplate>),
    /// Random among the alternatives, proportionally to their weights.
    Weighted(Vec<(MessageTemplate, f64)>),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WeightedDefinition {
    response: Value,
    weight: f64,
}

impl ResponseSpec {
    /// Parses a `RESPONSE` definition, validating it completely.
    pub fn parse(definition: &Value, location: &str) -> Result<Self, ConfigError> {
        match definition {
            Value::Array(items) => Ok(ResponseSpec::Choice(parse_alternatives(items, location)?)),
            Value::Object(map) if map.len() == 1 && map.contains_key("choice") => {
                let items = map["choice"]
                    .as_array()
                    .ok_or_else(|| invalid(location, "choice expects a list of responses"))?;
                Ok(ResponseSpec::Choice(parse_alternatives(items, location)?))
            }
            Value::Object(map) if map.len() == 1 && map.contains_key("weighted_choice") => {
                let items: Vec<WeightedDefinition> = Vec::deserialize(&map["weighted_choice"])
                    .map_err(|e| invalid(location, &format!("weighted_choice: {}", e)))?;
                if items.is_empty() {
                    return Err(invalid(location, "weighted_choice needs at least one alternative"));
                }
                let mut alternatives = Vec::with_capacity(items.len());
                for item in items {
                    if !item.weight.is_finite() || item.weight < 0.0 {
                        return Err(invalid(location, "weights must be finite and non-negative"));
                    }
                    alternatives.push((parse_template(&item.response, location)?, item.weight));
                }
                let total: f64 = alternatives.iter().map(|(_, w)| w).sum();
                if total == 0.0 {
                    return Err(invalid(location, "at least one weight must be positive"));
                }
                if !total.is_finite() {
                    return Err(invalid(location, "the sum of the weights overflows"));
                }
                Ok(ResponseSpec::Weighted(alternatives))
            }
            other => Ok(ResponseSpec::Single(parse_template(other, location)?)),
        }
    }

    /// Picks one alternative.
    pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&MessageTemplate, String> {
        match self {
            ResponseSpec::Single(template) => Ok(template),
            ResponseSpec::Choice(alternatives) => alternatives
                .choose(rng)
                .ok_or_else(|| "no alternatives to choose from".to_string()),
            ResponseSpec::Weighted(alternatives) => alternatives
                .choose_weighted(rng, |(_, weight)| *weight)
                .map(|(template, _)| template)
                .map_err(|e| e.to_string()),
        }
    }

    pub fn alternatives(&self) -> usize {
        match self {
            ResponseSpec::Single(_) => 1,
            ResponseSpec::Choice(alternatives) => alternatives.len(),
            ResponseSpec::Weighted(alternatives) => alternatives.len(),
        }
    }
}

/// Renders the response of `node`. A node without a response renders nothing.
///
/// Rendering only reads the slot store.
pub fn render<R: Rng + ?Sized>(
    node: &Node,
    ctx: &Context<'_>,
    rng: &mut R,
) -> Result<Option<Message>, String> {
    let Some(spec) = &node.response else {
        return Ok(None);
    };
    let fill_slots = node.pre_response.iter().any(|step| step.is_fill_template());
    let template = spec.select(rng)?;
    Ok(Some(template.render(ctx, fill_slots)))
}

fn parse_alternatives(items: &[Value], location: &str) -> Result<Vec<MessageTemplate>, ConfigError> {
    if items.is_empty() {
        return Err(invalid(location, "a list of responses needs at least one alternative"));
    }
    items.iter().map(|item| parse_template(item, location)).collect()
}

fn parse_template(definition: &Value, location: &str) -> Result<MessageTemplate, ConfigError> {
    match definition {
        Value::String(text) => Ok(MessageTemplate::new(Message::text(text.clone()))),
        Value::Object(map) if map.len() == 1 && map.contains_key("filled_template") => {
            let mut template = parse_template(&map["filled_template"], location)?;
            template.fill_slots = true;
            Ok(template)
        }
        Value::Object(_) => Message::deserialize(definition)
            .map(MessageTemplate::new)
            .map_err(|e| invalid(location, &e.to_string())),
        other => Err(invalid(location, &format!("unsupported response {}", other))),
    }
}

fn invalid(location: &str, message: &str) -> ConfigError {
    ConfigError::InvalidResponse {
        location: location.to_string(),
        message: message.to_string(),
    }
}
