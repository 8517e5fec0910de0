//! Grounding annotations: spatial references embedded in model text.
//!
//! A grounded assistant response embeds `<p>label</p>[coords]` fragments
//! whose coordinate count determines the annotation kind. This module holds
//! the decoded form and its conversions to and from pixel-space [`Shape`]s;
//! the text grammar itself lives in [`crate::codec`].

use serde::{Deserialize, Serialize};

use super::coord::Coord;
use super::shape::{Shape, ShapeType};
use super::Pixel;

/// The kind of spatial reference, derived from the coordinate count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationKind {
    /// 2 coordinates: a single x, y location.
    #[serde(rename = "point")]
    Point,
    /// 4 coordinates: an axis-aligned x1, y1, x2, y2 box.
    #[serde(rename = "bbox")]
    BBox,
    /// 8 coordinates: four arbitrary corner points.
    #[serde(rename = "oriented_box")]
    OrientedBox,
    /// Any other even count >= 6: a closed vertex loop.
    #[serde(rename = "polygon")]
    Polygon,
}

impl AnnotationKind {
    /// Classifies a coordinate count, or `None` if the count is odd or < 2.
    ///
    /// 8 coordinates are an oriented box, not a 4-gon: the distinction
    /// matters downstream, where oriented boxes keep their corner order.
    pub fn for_count(count: usize) -> Option<Self> {
        match count {
            2 => Some(AnnotationKind::Point),
            4 => Some(AnnotationKind::BBox),
            8 => Some(AnnotationKind::OrientedBox),
            n if n >= 6 && n % 2 == 0 => Some(AnnotationKind::Polygon),
            _ => None,
        }
    }
}

/// One decoded spatial reference from grounded text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundingAnnotation {
    /// The label inside the `<p>...</p>` tag, trimmed.
    pub label: String,

    /// Kind derived from the coordinate count.
    pub kind: AnnotationKind,

    /// Flat x, y interleaved coordinate list; always even length.
    pub coords: Vec<f64>,

    /// True while coordinates are in [0, 1] image-fraction space.
    pub normalized: bool,
}

impl GroundingAnnotation {
    /// Classifies and wraps a normalized coordinate list.
    ///
    /// Returns `None` when the count does not map to a kind (odd or < 2);
    /// the decoder turns that case into a warning instead.
    pub fn classify(label: impl Into<String>, coords: Vec<f64>) -> Option<Self> {
        let kind = AnnotationKind::for_count(coords.len())?;
        Some(Self {
            label: label.into(),
            kind,
            coords,
            normalized: true,
        })
    }

    /// Scales a normalized annotation to pixel space.
    ///
    /// Already-pixel annotations are returned unchanged.
    pub fn to_pixel(&self, image_width: f64, image_height: f64) -> Self {
        if !self.normalized {
            return self.clone();
        }
        let coords = self
            .coords
            .chunks_exact(2)
            .flat_map(|xy| [xy[0] * image_width, xy[1] * image_height])
            .collect();
        Self {
            label: self.label.clone(),
            kind: self.kind,
            coords,
            normalized: false,
        }
    }

    /// Converts to a pixel-space [`Shape`] for display.
    ///
    /// Points become point shapes, bboxes become rectangles, and both
    /// oriented boxes and polygons become polygon shapes (their vertex
    /// order is already the loop order).
    pub fn to_shape(&self, image_width: f64, image_height: f64) -> Shape {
        let pixel = self.to_pixel(image_width, image_height);
        let points: Vec<Coord<Pixel>> = pixel
            .coords
            .chunks_exact(2)
            .map(|xy| Coord::new(xy[0], xy[1]))
            .collect();

        let shape_type = match pixel.kind {
            AnnotationKind::Point => ShapeType::Point,
            AnnotationKind::BBox => ShapeType::Rectangle,
            AnnotationKind::OrientedBox | AnnotationKind::Polygon => ShapeType::Polygon,
        };

        Shape::new(pixel.label, shape_type, points)
    }

    /// Builds a normalized annotation from a pixel-space shape.
    ///
    /// Returns `None` for shape types the grounding grammar cannot express
    /// (lines, linestrips, circles, masks), and for degenerate geometry.
    pub fn from_shape(shape: &Shape, image_width: f64, image_height: f64) -> Option<Self> {
        shape.validate_geometry().ok()?;

        let normalize = |points: &[Coord<Pixel>]| -> Vec<f64> {
            points
                .iter()
                .map(|p| p.to_normalized(image_width, image_height))
                .flat_map(|p| [p.x, p.y])
                .collect()
        };

        match shape.shape_type {
            ShapeType::Point => Self::classify(shape.label.clone(), normalize(&shape.points)),
            ShapeType::Rectangle => {
                let coords = normalize(&shape.points);
                // Corner order in the drawing is arbitrary; bbox coords are not.
                let [x1, y1, x2, y2] = [coords[0], coords[1], coords[2], coords[3]];
                Self::classify(
                    shape.label.clone(),
                    vec![x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)],
                )
            }
            ShapeType::Polygon => Self::classify(shape.label.clone(), normalize(&shape.points)),
            ShapeType::Line | ShapeType::LineStrip | ShapeType::Circle | ShapeType::Mask => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_for_count() {
        assert_eq!(AnnotationKind::for_count(2), Some(AnnotationKind::Point));
        assert_eq!(AnnotationKind::for_count(4), Some(AnnotationKind::BBox));
        assert_eq!(
            AnnotationKind::for_count(6),
            Some(AnnotationKind::Polygon)
        );
        assert_eq!(
            AnnotationKind::for_count(8),
            Some(AnnotationKind::OrientedBox)
        );
        assert_eq!(
            AnnotationKind::for_count(10),
            Some(AnnotationKind::Polygon)
        );
        assert_eq!(AnnotationKind::for_count(0), None);
        assert_eq!(AnnotationKind::for_count(3), None);
        assert_eq!(AnnotationKind::for_count(5), None);
    }

    #[test]
    fn test_to_pixel_scales_pairs() {
        let ann = GroundingAnnotation::classify("car", vec![0.1, 0.2, 0.5, 0.8]).unwrap();
        let px = ann.to_pixel(100.0, 200.0);
        assert!(!px.normalized);
        assert_eq!(px.coords, vec![10.0, 40.0, 50.0, 160.0]);
    }

    #[test]
    fn test_to_shape_bbox_becomes_rectangle() {
        let ann = GroundingAnnotation::classify("car", vec![0.1, 0.2, 0.5, 0.8]).unwrap();
        let shape = ann.to_shape(100.0, 100.0);
        assert_eq!(shape.shape_type, ShapeType::Rectangle);
        assert_eq!(shape.points.len(), 2);
        assert_eq!(shape.points[0].x, 10.0);
        assert_eq!(shape.points[1].y, 80.0);
    }

    #[test]
    fn test_from_shape_normalizes_rectangle_corners() {
        // Drawn bottom-right to top-left; the annotation must still be ordered.
        let shape = Shape::new(
            "car",
            ShapeType::Rectangle,
            vec![Coord::new(80.0, 60.0), Coord::new(20.0, 10.0)],
        );
        let ann = GroundingAnnotation::from_shape(&shape, 100.0, 100.0).unwrap();
        assert_eq!(ann.kind, AnnotationKind::BBox);
        assert_eq!(ann.coords, vec![0.2, 0.1, 0.8, 0.6]);
    }

    #[test]
    fn test_from_shape_rejects_strokes() {
        let line = Shape::new(
            "edge",
            ShapeType::Line,
            vec![Coord::new(0.0, 0.0), Coord::new(5.0, 5.0)],
        );
        assert!(GroundingAnnotation::from_shape(&line, 10.0, 10.0).is_none());
    }
}
