use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An inbound request or outbound response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub misc: Map<String, Value>,
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn text_str(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// A message with neither text nor attachments.
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.attachments.is_empty()
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::text(text)
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::text(text)
    }
}

/// Structured, non-text payload carried alongside message text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attachment {
    Image(Media),
    Audio(Media),
    Video(Media),
    Document(Media),
    Location { longitude: f64, latitude: f64 },
}

/// A reference to a media resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Media {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Media {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_image_attachment() {
        let message: Message = serde_json::from_value(json!({
            "text": "Here is a cat",
            "attachments": [
                { "image": { "source": "https://example.com/cat.png", "title": "cat" } }
            ]
        }))
        .unwrap();
        assert_eq!(
            message.attachments,
            vec![Attachment::Image(
                Media::new("https://example.com/cat.png").with_title("cat")
            )]
        );
    }

    #[test]
    fn empty_message_detection() {
        assert!(Message::default().is_empty());
        assert!(!Message::text("hi").is_empty());
        assert!(
            !Message::default()
                .with_attachment(Attachment::Location {
                    longitude: 1.0,
                    latitude: 2.0
                })
                .is_empty()
        );
    }
}
