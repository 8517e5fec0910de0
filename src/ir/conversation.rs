//! Conversation records as persisted at the file boundary.
//!
//! The wire schema is fixed by the training-data format this crate
//! interoperates with: a record carries an `image` path and an ordered
//! `conversations` list of `{ "from": "human" | "gpt", "value": ... }`
//! turns. Assistant turn values may embed grounding annotations; all other
//! text passes through verbatim.

use serde::{Deserialize, Serialize};

/// Who produced a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    #[serde(rename = "human")]
    Human,
    /// Serialized as `"gpt"` for compatibility with existing datasets.
    #[serde(rename = "gpt")]
    Assistant,
}

/// A single conversation turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(rename = "from")]
    pub speaker: Speaker,

    #[serde(rename = "value")]
    pub text: String,

    /// Optional task tag found in some datasets (e.g. "Grounding",
    /// "Image Captioning"); carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Turn {
    /// Creates a human turn.
    pub fn human(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Human,
            text: text.into(),
            attribute: None,
        }
    }

    /// Creates an assistant turn.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            attribute: None,
        }
    }

    /// Tags the turn with a task attribute.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Returns true if this is an assistant turn.
    #[inline]
    pub fn is_assistant(&self) -> bool {
        self.speaker == Speaker::Assistant
    }
}

/// An image-anchored dialogue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Path of the image the dialogue is about, relative or absolute.
    #[serde(rename = "image")]
    pub image_ref: String,

    /// Ordered turns.
    #[serde(rename = "conversations")]
    pub turns: Vec<Turn>,
}

impl Conversation {
    /// Creates a conversation about the given image.
    pub fn new(image_ref: impl Into<String>, turns: Vec<Turn>) -> Self {
        Self {
            image_ref: image_ref.into(),
            turns,
        }
    }

    /// Iterates over the assistant turns in order.
    pub fn assistant_turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().filter(|t| t.is_assistant())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_schema_field_names() {
        let conv = Conversation::new(
            "images/0001.jpg",
            vec![
                Turn::human("Describe the image."),
                Turn::assistant("A quiet street."),
            ],
        );

        let json = serde_json::to_value(&conv).unwrap();
        assert_eq!(json["image"], "images/0001.jpg");
        assert_eq!(json["conversations"][0]["from"], "human");
        assert_eq!(json["conversations"][1]["from"], "gpt");
        assert_eq!(json["conversations"][1]["value"], "A quiet street.");
    }

    #[test]
    fn test_attribute_roundtrip() {
        let turn = Turn::assistant("There is <p>a</p>[0.1,0.2] here.").with_attribute("Grounding");
        let json = serde_json::to_string(&turn).unwrap();
        let back: Turn = serde_json::from_str(&json).unwrap();
        assert_eq!(back.attribute.as_deref(), Some("Grounding"));

        // Absent attributes stay absent on the wire.
        let plain = serde_json::to_value(Turn::human("hi")).unwrap();
        assert!(plain.get("attribute").is_none());
    }

    #[test]
    fn test_assistant_turns_iterator() {
        let conv = Conversation::new(
            "a.png",
            vec![
                Turn::human("q1"),
                Turn::assistant("a1"),
                Turn::human("q2"),
                Turn::assistant("a2"),
            ],
        );
        let texts: Vec<&str> = conv.assistant_turns().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["a1", "a2"]);
    }
}
