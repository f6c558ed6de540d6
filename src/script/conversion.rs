use super::definition::ScriptDefinition;
use crate::error::ConfigError;

/// A trait for custom configuration models that can be converted into a kaiwa `ScriptDefinition`.
///
/// This is the extension point that keeps the engine format-agnostic. A YAML
/// or TOML loader, or a visual editor export, implements this trait to hand the
/// engine an in-memory script.
///
/// # Example
///
/// ```rust,no_run
/// use kaiwa::prelude::*;
/// use kaiwa::error::ConfigError;
///
/// struct MyScript { greeting: String }
///
/// impl IntoScript for MyScript {
///     fn into_script(self) -> std::result::Result<ScriptDefinition, ConfigError> {
///         ScriptDefinition::from_value(serde_json::json!({
///             "start_label": ["greeting_flow", "start"],
///             "flow": {
///                 "greeting_flow": {
///                     "start": { "TRANSITIONS": [{ "lbl": "hello", "cnd": true }] },
///                     "hello": { "RESPONSE": self.greeting }
///                 }
///             }
///         }))
///     }
/// }
/// ```
pub trait IntoScript {
    /// Consumes the object and converts it into a kaiwa script.
    fn into_script(self) -> Result<ScriptDefinition, ConfigError>;
}

impl IntoScript for ScriptDefinition {
    fn into_script(self) -> Result<ScriptDefinition, ConfigError> {
        Ok(self)
    }
}

impl IntoScript for serde_json::Value {
    fn into_script(self) -> Result<ScriptDefinition, ConfigError> {
        ScriptDefinition::from_value(self)
    }
}

impl IntoScript for &str {
    fn into_script(self) -> Result<ScriptDefinition, ConfigError> {
        ScriptDefinition::from_json(self)
    }
}
