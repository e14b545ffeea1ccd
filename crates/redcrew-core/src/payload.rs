use serde::{Deserialize, Serialize};

/// The result a specialist produces for one delegation: free text or a
/// structured JSON document, with no other side channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// Plain text output.
    Text(String),
    /// Structured output (e.g. a generated content plan).
    Structured(serde_json::Value),
}

impl Payload {
    /// Creates a text payload.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// Creates a structured payload.
    pub fn structured(value: serde_json::Value) -> Self {
        Self::Structured(value)
    }

    /// The payload rendered as text: text payloads verbatim, structured
    /// payloads as compact JSON.
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured(value) => value.to_string(),
        }
    }

    /// First non-empty line of the textual rendering, trimmed.
    /// Empty payloads yield `None`.
    pub fn first_line(&self) -> Option<String> {
        let text = self.as_text();
        text.lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
    }
}
