//! Conversation file I/O at the persisted-schema boundary.
//!
//! Files hold one [`Conversation`] record each: an `image` path (relative
//! paths resolve against the file's own directory) and ordered
//! `{from, value}` turns. Everything here reads or writes that boundary;
//! the classification logic itself is storage-independent.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::codec::{self, ParseWarning};
use crate::error::LabelbridgeError;
use crate::ir::{Conversation, Shape, ShapeType, Turn};

/// Reads one conversation record from a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn read_conversation_json(path: &Path) -> Result<Conversation, LabelbridgeError> {
    let file = File::open(path).map_err(LabelbridgeError::Io)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| LabelbridgeError::ConversationJsonParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes one conversation record to a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_conversation_json(
    path: &Path,
    conversation: &Conversation,
) -> Result<(), LabelbridgeError> {
    let file = File::create(path).map_err(LabelbridgeError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, conversation).map_err(|source| {
        LabelbridgeError::ConversationJsonWrite {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Reads a conversation record from a JSON string.
///
/// Useful for testing without file I/O.
pub fn from_json_str(json: &str) -> Result<Conversation, serde_json::Error> {
    serde_json::from_str(json)
}

/// Writes a conversation record to a JSON string.
///
/// Useful for testing without file I/O.
pub fn to_json_string(conversation: &Conversation) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(conversation)
}

/// Resolves a conversation's image reference to an existing file.
///
/// Relative references resolve against the conversation file's directory.
/// If the referenced path does not exist, its bare filename is tried in
/// that same directory before giving up - datasets moved between machines
/// routinely carry stale directory prefixes.
pub fn resolve_image_path(
    conversation_path: &Path,
    image_ref: &str,
) -> Result<PathBuf, LabelbridgeError> {
    let base_dir = conversation_path.parent().unwrap_or_else(|| Path::new(""));

    let referenced = Path::new(image_ref);
    let candidate = if referenced.is_absolute() {
        referenced.to_path_buf()
    } else {
        base_dir.join(referenced)
    };
    if candidate.is_file() {
        return Ok(candidate);
    }

    if let Some(file_name) = referenced.file_name() {
        let fallback = base_dir.join(file_name);
        if fallback.is_file() {
            log::debug!(
                "image '{}' not found, using sibling file {}",
                image_ref,
                fallback.display()
            );
            return Ok(fallback);
        }
    }

    Err(LabelbridgeError::ImageNotFound {
        conversation_path: conversation_path.to_path_buf(),
        image_ref: image_ref.to_string(),
    })
}

/// Pixel shapes recovered from one conversation file.
#[derive(Debug)]
pub struct LoadedShapes {
    /// Resolved image path the shapes are scaled against.
    pub image_path: PathBuf,
    /// Probed image width in pixels.
    pub image_width: u32,
    /// Probed image height in pixels.
    pub image_height: u32,
    /// All shapes decoded from assistant turns, in turn order.
    pub shapes: Vec<Shape>,
    /// Decode warnings accumulated across all assistant turns.
    pub warnings: Vec<ParseWarning>,
}

/// Loads a conversation file and converts its annotations to pixel shapes.
///
/// The image is only probed for dimensions, never decoded. Malformed
/// grounding fragments become warnings in the result; the load itself
/// fails only for unreadable files or a missing/unprobeable image.
pub fn load_pixel_shapes(path: &Path) -> Result<LoadedShapes, LabelbridgeError> {
    let conversation = read_conversation_json(path)?;
    let image_path = resolve_image_path(path, &conversation.image_ref)?;

    let size = imagesize::size(&image_path).map_err(|source| LabelbridgeError::ImageProbe {
        path: image_path.clone(),
        source,
    })?;
    let (width, height) = (size.width as u32, size.height as u32);

    let mut shapes = Vec::new();
    let mut warnings = Vec::new();
    for turn in conversation.assistant_turns() {
        let (mut turn_shapes, turn_warnings) =
            codec::decode_to_shapes(&turn.text, width as f64, height as f64);
        shapes.append(&mut turn_shapes);
        warnings.extend(turn_warnings);
    }

    log::debug!(
        "loaded {} shape(s) from {} ({} warning(s))",
        shapes.len(),
        path.display(),
        warnings.len()
    );

    Ok(LoadedShapes {
        image_path,
        image_width: width,
        image_height: height,
        shapes,
        warnings,
    })
}

/// Builds a grounding conversation record from pixel shapes.
///
/// The human turn is a generated detection prompt, the assistant turn the
/// encoded response sentence; both are tagged `Grounding`.
pub fn conversation_from_shapes(
    image_ref: impl Into<String>,
    shapes: &[Shape],
    image_width: f64,
    image_height: f64,
) -> Conversation {
    let response = codec::encode_shapes(shapes, image_width, image_height);

    let mut labels: Vec<&str> = shapes.iter().map(|s| s.label.as_str()).collect();
    labels.sort_unstable();
    labels.dedup();

    let annotation_noun = if shapes
        .iter()
        .any(|s| matches!(s.shape_type, ShapeType::Rectangle))
    {
        "bounding boxes"
    } else if shapes
        .iter()
        .any(|s| matches!(s.shape_type, ShapeType::Polygon))
    {
        "polygons"
    } else if shapes.iter().any(|s| matches!(s.shape_type, ShapeType::Point)) {
        "points"
    } else {
        "annotations"
    };

    let prompt = match labels.as_slice() {
        [only] => format!("Detect all {only} in the image and describe using {annotation_noun}."),
        _ => format!("Detect all objects in the image and describe using {annotation_noun}."),
    };

    Conversation::new(
        image_ref,
        vec![
            Turn::human(prompt).with_attribute("Grounding"),
            Turn::assistant(response).with_attribute("Grounding"),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Coord;

    #[test]
    fn test_json_str_roundtrip() {
        let json = r#"{
            "image": "scene.jpg",
            "conversations": [
                {"from": "human", "value": "Find the cars."},
                {"from": "gpt", "value": "There is <p>car</p>[0.1,0.2,0.5,0.8] in the image."}
            ]
        }"#;

        let conversation = from_json_str(json).expect("parse conversation");
        assert_eq!(conversation.image_ref, "scene.jpg");
        assert_eq!(conversation.turns.len(), 2);

        let serialized = to_json_string(&conversation).expect("serialize conversation");
        let restored = from_json_str(&serialized).expect("reparse conversation");
        assert_eq!(conversation, restored);
    }

    #[test]
    fn test_conversation_from_shapes_single_label() {
        let shapes = vec![Shape::new(
            "car",
            ShapeType::Rectangle,
            vec![Coord::new(10.0, 20.0), Coord::new(50.0, 80.0)],
        )];
        let conversation = conversation_from_shapes("scene.jpg", &shapes, 100.0, 100.0);

        assert_eq!(conversation.turns.len(), 2);
        assert_eq!(
            conversation.turns[0].text,
            "Detect all car in the image and describe using bounding boxes."
        );
        assert!(conversation.turns[1].text.contains("<p>car</p>[0.1000,0.2000,0.5000,0.8000]"));
        assert_eq!(conversation.turns[0].attribute.as_deref(), Some("Grounding"));
    }

    #[test]
    fn test_conversation_from_shapes_mixed_labels() {
        let shapes = vec![
            Shape::new("car", ShapeType::Point, vec![Coord::new(10.0, 10.0)]),
            Shape::new("dog", ShapeType::Point, vec![Coord::new(20.0, 20.0)]),
        ];
        let conversation = conversation_from_shapes("scene.jpg", &shapes, 100.0, 100.0);
        assert!(conversation.turns[0].text.starts_with("Detect all objects"));
        assert!(conversation.turns[0].text.contains("points"));
    }
}
