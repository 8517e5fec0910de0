//! Vector shape primitives as drawn by an annotation GUI.
//!
//! A [`Shape`] is the unit the raster side of the crate consumes: an ordered
//! point list in pixel space, a label, an optional group id tying several
//! shapes together as one logical instance, and (for mask shapes only) a
//! pre-rasterized boolean patch.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LabelbridgeError;
use crate::raster::Mask;

use super::coord::Coord;
use super::Pixel;

/// The geometric interpretation of a shape's point list.
///
/// Deliberately exhaustive: there is no catch-all variant, so a shape type
/// this crate does not know about is a parse/construction error
/// ([`LabelbridgeError::UnsupportedShapeType`]), never a silent polygon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    /// One point, rendered as a filled disc.
    Point,
    /// Two points, rendered as a stroked segment.
    Line,
    /// Two or more points connected by strokes, without a closing segment.
    LineStrip,
    /// Two opposite corners in any order, rendered filled.
    Rectangle,
    /// Center and a rim point, rendered as a filled disc.
    Circle,
    /// Three or more vertices, rendered as a filled closed loop.
    Polygon,
    /// A pre-rasterized boolean patch pasted at its recorded offset.
    Mask,
}

impl ShapeType {
    /// The lowercase tag used in persisted annotation data.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeType::Point => "point",
            ShapeType::Line => "line",
            ShapeType::LineStrip => "linestrip",
            ShapeType::Rectangle => "rectangle",
            ShapeType::Circle => "circle",
            ShapeType::Polygon => "polygon",
            ShapeType::Mask => "mask",
        }
    }
}

impl FromStr for ShapeType {
    type Err = LabelbridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "point" => Ok(ShapeType::Point),
            "line" => Ok(ShapeType::Line),
            "linestrip" => Ok(ShapeType::LineStrip),
            "rectangle" => Ok(ShapeType::Rectangle),
            "circle" => Ok(ShapeType::Circle),
            "polygon" => Ok(ShapeType::Polygon),
            "mask" => Ok(ShapeType::Mask),
            other => Err(LabelbridgeError::UnsupportedShapeType(other.to_string())),
        }
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A boolean sub-raster pasted into a canvas at an integer offset.
///
/// Used only by [`ShapeType::Mask`] shapes, whose coverage was produced
/// outside the rasterizer (e.g. by a segmentation model in the GUI host).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaskPatch {
    /// The patch coverage itself.
    pub data: Mask,
    /// Column offset of the patch's left edge in the target canvas.
    pub origin_x: i64,
    /// Row offset of the patch's top edge in the target canvas.
    pub origin_y: i64,
}

/// A single vector shape annotation in pixel space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// Semantic label of the annotated object (e.g. "car").
    pub label: String,

    /// How the point list is interpreted geometrically.
    pub shape_type: ShapeType,

    /// Ordered vertices in pixel coordinates.
    pub points: Vec<Coord<Pixel>>,

    /// Optional id tying multiple shapes together as one logical instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<u32>,

    /// Pre-rasterized coverage, present iff `shape_type` is `Mask`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<MaskPatch>,
}

impl Shape {
    /// Creates a new shape with the given label, type and points.
    pub fn new(
        label: impl Into<String>,
        shape_type: ShapeType,
        points: Vec<Coord<Pixel>>,
    ) -> Self {
        Self {
            label: label.into(),
            shape_type,
            points,
            group_id: None,
            mask: None,
        }
    }

    /// Sets the group id for this shape.
    pub fn with_group_id(mut self, group_id: u32) -> Self {
        self.group_id = Some(group_id);
        self
    }

    /// Attaches a pre-rasterized mask patch to this shape.
    pub fn with_mask(mut self, mask: MaskPatch) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Checks the per-type point-count invariants.
    ///
    /// Point: exactly 1. Line, rectangle, circle: exactly 2. Linestrip: at
    /// least 2. Polygon: at least 3 (fewer vertices cannot bound an area).
    /// Mask: must carry a patch.
    pub fn validate_geometry(&self) -> Result<(), LabelbridgeError> {
        let n = self.points.len();
        let expectation = match self.shape_type {
            ShapeType::Point if n != 1 => Some("exactly 1 point"),
            ShapeType::Line | ShapeType::Rectangle | ShapeType::Circle if n != 2 => {
                Some("exactly 2 points")
            }
            ShapeType::LineStrip if n < 2 => Some("at least 2 points"),
            ShapeType::Polygon if n < 3 => Some("at least 3 points"),
            ShapeType::Mask if self.mask.is_none() => Some("an attached mask patch"),
            _ => None,
        };

        match expectation {
            Some(expected) => Err(self.geometry_error(format!("expected {expected}, got {n}"))),
            None => Ok(()),
        }
    }

    /// Builds an [`LabelbridgeError::InvalidShapeGeometry`] for this shape.
    pub(crate) fn geometry_error(&self, message: impl Into<String>) -> LabelbridgeError {
        LabelbridgeError::InvalidShapeGeometry {
            shape_type: self.shape_type.as_str(),
            label: self.label.clone(),
            message: message.into(),
        }
    }
}
