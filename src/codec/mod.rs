//! Encoding and decoding of the inline grounding grammar.
//!
//! Grounded model output embeds spatial references as
//! `<p>label</p>[x1,y1,...]` fragments in otherwise free text. The decoder
//! here is a recoverable scanner over untrusted input: a malformed fragment
//! produces a [`ParseWarning`] and is skipped, and every well-formed
//! fragment elsewhere in the same text is still recovered. Decoding never
//! fails.
//!
//! Coordinates inside the grammar are normalized to [0, 1]; conversion to
//! pixel space happens in a separate, typed step.

use std::fmt;

use crate::ir::{GroundingAnnotation, Shape};

/// Decimal digits used when serializing coordinates.
///
/// The matching round-trip tolerance is `0.5 * 10^-COORD_PRECISION` in
/// normalized units.
pub const COORD_PRECISION: usize = 4;

/// Maximum decode(encode(x)) error in normalized units.
pub fn round_trip_tolerance() -> f64 {
    0.5 * 10f64.powi(-(COORD_PRECISION as i32))
}

/// A non-fatal finding attached to a decode result.
#[derive(Clone, Debug, PartialEq)]
pub enum ParseWarning {
    /// A structurally matched fragment whose coordinate list could not be
    /// used: a token failed to parse, or the count was odd or below 2.
    MalformedGroundingAnnotation {
        /// Label of the offending fragment.
        label: String,
        /// Raw bracket body as it appeared in the text.
        body: String,
        /// Byte offset of the fragment's opening tag.
        offset: usize,
        /// What was wrong with the coordinate list.
        reason: String,
    },
    /// A parsed coordinate outside [0, 1]. The value is kept as-is, not
    /// clamped; the annotation is still produced.
    CoordinateOutOfRange {
        /// Label of the containing annotation.
        label: String,
        /// Index of the coordinate within the flat list.
        coord_index: usize,
        /// The out-of-range value.
        value: f64,
    },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::MalformedGroundingAnnotation {
                label,
                body,
                offset,
                reason,
            } => write!(
                f,
                "malformed grounding annotation '<p>{label}</p>[{body}]' at byte {offset}: {reason}"
            ),
            ParseWarning::CoordinateOutOfRange {
                label,
                coord_index,
                value,
            } => write!(
                f,
                "coordinate {coord_index} of '{label}' is outside [0, 1]: {value}"
            ),
        }
    }
}

/// The outcome of scanning one text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Decoded {
    /// Annotations recovered from well-formed fragments, in text order.
    pub annotations: Vec<GroundingAnnotation>,
    /// Findings for fragments that were skipped or suspicious.
    pub warnings: Vec<ParseWarning>,
}

impl Decoded {
    /// Returns true if at least one annotation was recovered.
    pub fn has_annotations(&self) -> bool {
        !self.annotations.is_empty()
    }
}

const OPEN_TAG: &str = "<p>";
const CLOSE_TAG: &str = "</p>";

/// Scans `text` left to right for grounding fragments.
///
/// A fragment is the literal `<p>`, a label of one or more characters
/// excluding `<`, the literal `</p>`, optional whitespace, and a non-empty
/// `[...]` coordinate list. Matches are non-overlapping. Text that merely
/// resembles a fragment (no bracket, empty label) is ordinary prose and is
/// skipped without a warning; a structural match with a bad coordinate
/// list yields a [`ParseWarning::MalformedGroundingAnnotation`].
pub fn decode(text: &str) -> Decoded {
    let mut decoded = Decoded::default();
    let mut cursor = 0;

    while let Some(found) = text[cursor..].find(OPEN_TAG) {
        let open = cursor + found;
        let label_start = open + OPEN_TAG.len();

        // The label runs to the next '<', which must begin the close tag.
        let Some(lt) = text[label_start..].find('<') else {
            break;
        };
        if lt == 0 || !text[label_start + lt..].starts_with(CLOSE_TAG) {
            // Empty label, or a stray '<' (possibly a fresh open tag):
            // resume scanning at the '<' we stopped on.
            cursor = label_start + lt;
            continue;
        }
        let label = &text[label_start..label_start + lt];
        let after_close = label_start + lt + CLOSE_TAG.len();

        // Optional whitespace between the close tag and the bracket.
        let trimmed = text[after_close..].trim_start();
        let bracket = after_close + (text[after_close..].len() - trimmed.len());
        if !trimmed.starts_with('[') {
            cursor = after_close;
            continue;
        }
        let Some(body_len) = text[bracket + 1..].find(']') else {
            cursor = after_close;
            continue;
        };
        let body = &text[bracket + 1..bracket + 1 + body_len];
        if body.is_empty() {
            cursor = after_close;
            continue;
        }

        // The fragment is structurally complete; from here on, problems
        // are warnings. A used fragment is consumed whole; a malformed one
        // is consumed only up to its opening bracket, so a valid fragment
        // swallowed by an unterminated body is still recovered.
        let consumed = bracket + 1 + body_len + 1;

        match parse_coordinate_list(body) {
            Ok(coords) => match GroundingAnnotation::classify(label.trim(), coords) {
                Some(annotation) => {
                    for (coord_index, &value) in annotation.coords.iter().enumerate() {
                        if !(0.0..=1.0).contains(&value) {
                            decoded.warnings.push(ParseWarning::CoordinateOutOfRange {
                                label: annotation.label.clone(),
                                coord_index,
                                value,
                            });
                        }
                    }
                    decoded.annotations.push(annotation);
                    cursor = consumed;
                }
                None => {
                    decoded
                        .warnings
                        .push(malformed(label, body, open, "odd or too-short coordinate count"));
                    cursor = bracket + 1;
                }
            },
            Err(reason) => {
                decoded.warnings.push(malformed(label, body, open, &reason));
                cursor = bracket + 1;
            }
        }
    }

    decoded
}

fn malformed(label: &str, body: &str, offset: usize, reason: &str) -> ParseWarning {
    ParseWarning::MalformedGroundingAnnotation {
        label: label.trim().to_string(),
        body: body.to_string(),
        offset,
        reason: reason.to_string(),
    }
}

fn parse_coordinate_list(body: &str) -> Result<Vec<f64>, String> {
    body.split(',')
        .map(|token| {
            let token = token.trim();
            token
                .parse::<f64>()
                .map_err(|_| format!("invalid coordinate '{token}'"))
        })
        .collect()
}

/// Decodes `text` and converts every annotation to a pixel-space [`Shape`].
///
/// The warning list from [`decode`] is carried through unchanged.
pub fn decode_to_shapes(
    text: &str,
    image_width: f64,
    image_height: f64,
) -> (Vec<Shape>, Vec<ParseWarning>) {
    let decoded = decode(text);
    let shapes = decoded
        .annotations
        .iter()
        .map(|annotation| annotation.to_shape(image_width, image_height))
        .collect();
    (shapes, decoded.warnings)
}

/// Formats one fragment of the grounding grammar.
///
/// Coordinates are written at fixed [`COORD_PRECISION`]. No semantic bounds
/// are checked here; that is the decoder's job on re-parse.
pub fn encode(label: &str, coords: &[f64]) -> String {
    let body = coords
        .iter()
        .map(|c| format!("{c:.prec$}", prec = COORD_PRECISION))
        .collect::<Vec<_>>()
        .join(",");
    format!("{OPEN_TAG}{label}{CLOSE_TAG}[{body}]")
}

/// Renders pixel-space shapes as one grounded response sentence.
///
/// Shapes the grammar cannot express (lines, linestrips, circles, masks)
/// are skipped with a log warning.
pub fn encode_shapes(shapes: &[Shape], image_width: f64, image_height: f64) -> String {
    let fragments: Vec<String> = shapes
        .iter()
        .filter_map(|shape| {
            match GroundingAnnotation::from_shape(shape, image_width, image_height) {
                Some(annotation) => Some(encode(&annotation.label, &annotation.coords)),
                None => {
                    log::warn!(
                        "skipping '{}' shape '{}': not expressible in grounding text",
                        shape.shape_type,
                        shape.label
                    );
                    None
                }
            }
        })
        .collect();

    match fragments.len() {
        0 => "I don't see any specific objects to locate in this image.".to_string(),
        1 => format!("There is {} in the image.", fragments[0]),
        2 => format!("There are {} and {} in the image.", fragments[0], fragments[1]),
        _ => {
            let (last, rest) = fragments.split_last().expect("three or more fragments");
            format!("There are {}, and {} in the image.", rest.join(", "), last)
        }
    }
}
