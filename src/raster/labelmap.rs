//! Compositing ordered shapes into class/instance label maps.
//!
//! The compositor is an explicit sequential fold over the input shapes:
//! later shapes overwrite earlier ones wherever their coverage overlaps
//! (last-write-wins, no blending). Identity resolution follows the
//! annotation semantics: grouped shapes sharing `(label, group_id)` merge
//! into one instance whose coverage is the union of their masks, while
//! ungrouped shapes always get a fresh instance, even under the same label.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::LabelbridgeError;
use crate::ir::{BBoxXYXY, Pixel, Shape};

use super::{rasterize, Mask, RasterOptions};

/// Paired class and instance rasters over one canvas.
///
/// Both maps share dimensions and use 0 as background. A pixel has a
/// positive class id iff it has a positive instance id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMap {
    width: u32,
    height: u32,
    class_map: Vec<u32>,
    instance_map: Vec<u32>,
}

impl LabelMap {
    /// Creates an all-background label map.
    pub fn new(width: u32, height: u32) -> Self {
        let size = (width as usize) * (height as usize);
        Self {
            width,
            height,
            class_map: vec![0; size],
            instance_map: vec![0; size],
        }
    }

    /// Returns the width in pixels.
    #[inline]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height in pixels.
    #[inline]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Gets `(class_id, instance_id)` at the specified pixel.
    ///
    /// Returns `None` if the coordinates are out of bounds.
    pub fn get(&self, x: u32, y: u32) -> Option<(u32, u32)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize) * (self.width as usize) + (x as usize);
        Some((self.class_map[idx], self.instance_map[idx]))
    }

    /// Returns the raw class plane, row-major.
    pub fn class_map(&self) -> &[u32] {
        &self.class_map
    }

    /// Returns the raw instance plane, row-major.
    pub fn instance_map(&self) -> &[u32] {
        &self.instance_map
    }

    /// Extracts the coverage of one instance id as a boolean mask.
    pub fn instance_mask(&self, instance_id: u32) -> Mask {
        let data = self.instance_map.iter().map(|&id| id == instance_id).collect();
        Mask::from_data(self.width, self.height, data)
            .expect("instance plane length matches its own dimensions")
    }

    #[inline]
    fn overwrite(&mut self, idx: usize, class_id: u32, instance_id: u32) {
        self.class_map[idx] = class_id;
        self.instance_map[idx] = instance_id;
    }
}

/// One entry of the instance identity table, in first-seen order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceIdentity {
    /// 1-based instance id as written into the instance plane.
    pub instance_id: u32,
    /// Label shared by all shapes of the instance.
    pub label: String,
    /// Group id, if the instance was formed by explicit grouping.
    pub group_id: Option<u32>,
}

/// A shape the compositor had to skip, with the reason.
#[derive(Debug)]
pub struct ShapeIssue {
    /// Index of the shape in the input order.
    pub shape_index: usize,
    /// Label of the skipped shape.
    pub label: String,
    /// What went wrong for this shape alone.
    pub error: LabelbridgeError,
}

impl std::fmt::Display for ShapeIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "shape {} ('{}'): {}", self.shape_index, self.label, self.error)
    }
}

/// The outcome of compositing a shape list.
#[derive(Debug)]
pub struct LabelMapResult {
    /// The composited class/instance planes.
    pub label_map: LabelMap,
    /// Identity table, ordered by instance id.
    pub instances: Vec<InstanceIdentity>,
    /// Shapes that were skipped, in input order.
    pub issues: Vec<ShapeIssue>,
}

/// Composites `shapes` in input (z-)order into class and instance maps.
///
/// Later shapes always win on overlap. A shape whose label is missing from
/// `label_to_class_id` or whose geometry cannot be rasterized is recorded
/// in [`LabelMapResult::issues`] and skipped; the remaining shapes still
/// composite. Skipped shapes allocate no instance id.
pub fn build_label_maps(
    height: u32,
    width: u32,
    shapes: &[Shape],
    label_to_class_id: &BTreeMap<String, u32>,
    opts: &RasterOptions,
) -> LabelMapResult {
    let mut label_map = LabelMap::new(width, height);
    let mut instances: Vec<InstanceIdentity> = Vec::new();
    let mut issues: Vec<ShapeIssue> = Vec::new();

    // Grouped identities resolve through this table; ungrouped shapes are
    // never entered, so each gets its own id.
    let mut group_instances: BTreeMap<(String, u32), u32> = BTreeMap::new();

    for (shape_index, shape) in shapes.iter().enumerate() {
        let Some(&class_id) = label_to_class_id.get(&shape.label) else {
            issues.push(ShapeIssue {
                shape_index,
                label: shape.label.clone(),
                error: LabelbridgeError::UnknownLabelClass(shape.label.clone()),
            });
            continue;
        };

        let coverage = match rasterize(height, width, shape, opts) {
            Ok(mask) => mask,
            Err(error) => {
                issues.push(ShapeIssue {
                    shape_index,
                    label: shape.label.clone(),
                    error,
                });
                continue;
            }
        };

        let instance_id = match shape.group_id {
            Some(group_id) => *group_instances
                .entry((shape.label.clone(), group_id))
                .or_insert_with(|| {
                    allocate_instance(&mut instances, &shape.label, Some(group_id))
                }),
            None => allocate_instance(&mut instances, &shape.label, None),
        };

        for (idx, &covered) in coverage.data().iter().enumerate() {
            if covered {
                label_map.overwrite(idx, class_id, instance_id);
            }
        }
    }

    LabelMapResult {
        label_map,
        instances,
        issues,
    }
}

fn allocate_instance(
    instances: &mut Vec<InstanceIdentity>,
    label: &str,
    group_id: Option<u32>,
) -> u32 {
    let instance_id = instances.len() as u32 + 1;
    instances.push(InstanceIdentity {
        instance_id,
        label: label.to_string(),
        group_id,
    });
    instance_id
}

/// Derives a tight box from each instance mask, in input order.
///
/// An entry with no covered pixel yields [`LabelbridgeError::EmptyInstanceMask`]
/// for that position only; callers that composited overlapping shapes can
/// hit this when a later shape overwrote an instance completely.
pub fn extract_bboxes(masks: &[Mask]) -> Vec<Result<BBoxXYXY<Pixel>, LabelbridgeError>> {
    masks
        .iter()
        .enumerate()
        .map(|(index, mask)| {
            mask.bounding_box()
                .ok_or(LabelbridgeError::EmptyInstanceMask(index))
        })
        .collect()
}

impl LabelMapResult {
    /// Boxes for every instance in the identity table, in id order.
    pub fn instance_bboxes(&self) -> Vec<Result<BBoxXYXY<Pixel>, LabelbridgeError>> {
        let masks: Vec<Mask> = self
            .instances
            .iter()
            .map(|identity| self.label_map.instance_mask(identity.instance_id))
            .collect();
        extract_bboxes(&masks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Coord, ShapeType};

    fn rect(label: &str, x1: f64, y1: f64, x2: f64, y2: f64) -> Shape {
        Shape::new(
            label,
            ShapeType::Rectangle,
            vec![Coord::new(x1, y1), Coord::new(x2, y2)],
        )
    }

    fn class_table(entries: &[(&str, u32)]) -> BTreeMap<String, u32> {
        entries
            .iter()
            .map(|&(label, id)| (label.to_string(), id))
            .collect()
    }

    #[test]
    fn test_class_and_instance_planes_agree() {
        let shapes = vec![rect("car", 1.0, 1.0, 5.0, 5.0)];
        let table = class_table(&[("car", 1)]);
        let result = build_label_maps(10, 10, &shapes, &table, &RasterOptions::default());

        assert!(result.issues.is_empty());
        let map = &result.label_map;
        for y in 0..10 {
            for x in 0..10 {
                let (class_id, instance_id) = map.get(x, y).unwrap();
                assert_eq!(class_id > 0, instance_id > 0);
            }
        }
        assert_eq!(map.get(2, 2), Some((1, 1)));
        assert_eq!(map.get(9, 9), Some((0, 0)));
    }

    #[test]
    fn test_ungrouped_same_label_shapes_stay_distinct() {
        let shapes = vec![
            rect("car", 0.0, 0.0, 3.0, 3.0),
            rect("car", 5.0, 5.0, 8.0, 8.0),
        ];
        let table = class_table(&[("car", 1)]);
        let result = build_label_maps(10, 10, &shapes, &table, &RasterOptions::default());

        assert_eq!(result.instances.len(), 2);
        assert_eq!(result.label_map.get(1, 1), Some((1, 1)));
        assert_eq!(result.label_map.get(6, 6), Some((1, 2)));
    }

    #[test]
    fn test_grouped_shapes_merge_into_one_instance() {
        let shapes = vec![
            rect("car", 0.0, 0.0, 3.0, 3.0).with_group_id(1),
            rect("car", 5.0, 5.0, 8.0, 8.0).with_group_id(1),
        ];
        let table = class_table(&[("car", 1)]);
        let result = build_label_maps(10, 10, &shapes, &table, &RasterOptions::default());

        assert_eq!(result.instances.len(), 1);
        assert_eq!(result.instances[0].group_id, Some(1));
        assert_eq!(result.label_map.get(1, 1), Some((1, 1)));
        assert_eq!(result.label_map.get(6, 6), Some((1, 1)));

        // The instance mask is the union of both rectangles.
        let union = result.label_map.instance_mask(1);
        assert_eq!(union.area(), 9 + 9);
    }

    #[test]
    fn test_same_group_id_different_label_stays_distinct() {
        let shapes = vec![
            rect("car", 0.0, 0.0, 3.0, 3.0).with_group_id(1),
            rect("bus", 5.0, 5.0, 8.0, 8.0).with_group_id(1),
        ];
        let table = class_table(&[("car", 1), ("bus", 2)]);
        let result = build_label_maps(10, 10, &shapes, &table, &RasterOptions::default());
        assert_eq!(result.instances.len(), 2);
    }

    #[test]
    fn test_later_shape_wins_overlap() {
        let shapes = vec![
            rect("car", 0.0, 0.0, 6.0, 6.0),
            rect("bus", 3.0, 3.0, 9.0, 9.0),
        ];
        let table = class_table(&[("car", 1), ("bus", 2)]);
        let result = build_label_maps(10, 10, &shapes, &table, &RasterOptions::default());

        // Overlap pixels belong to the later shape in both planes.
        assert_eq!(result.label_map.get(4, 4), Some((2, 2)));
        // Non-overlapping part of the first shape is untouched.
        assert_eq!(result.label_map.get(1, 1), Some((1, 1)));
    }

    #[test]
    fn test_unknown_label_is_skipped_not_fatal() {
        let shapes = vec![
            rect("car", 0.0, 0.0, 3.0, 3.0),
            rect("mystery", 4.0, 4.0, 6.0, 6.0),
            rect("bus", 7.0, 7.0, 9.0, 9.0),
        ];
        let table = class_table(&[("car", 1), ("bus", 2)]);
        let result = build_label_maps(10, 10, &shapes, &table, &RasterOptions::default());

        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].shape_index, 1);
        assert!(matches!(
            result.issues[0].error,
            LabelbridgeError::UnknownLabelClass(_)
        ));

        // The other shapes composited, and the skipped shape consumed no id.
        assert_eq!(result.instances.len(), 2);
        assert_eq!(result.label_map.get(8, 8), Some((2, 2)));
        assert_eq!(result.label_map.get(5, 5), Some((0, 0)));
    }

    #[test]
    fn test_instance_bboxes_and_empty_instance() {
        let shapes = vec![
            rect("car", 2.0, 2.0, 7.0, 9.0),
            // Completely buries the first instance.
            rect("bus", 0.0, 0.0, 12.0, 12.0),
        ];
        let table = class_table(&[("car", 1), ("bus", 2)]);
        let result = build_label_maps(20, 20, &shapes, &table, &RasterOptions::default());

        let boxes = result.instance_bboxes();
        assert_eq!(boxes.len(), 2);
        assert!(matches!(
            boxes[0],
            Err(LabelbridgeError::EmptyInstanceMask(0))
        ));
        let bus = boxes[1].as_ref().unwrap();
        assert!((bus.xmin() - 0.0).abs() <= 1.0);
        assert!((bus.xmax() - 12.0).abs() <= 1.0);
    }

    #[test]
    fn test_extract_bboxes_order_matches_input() {
        let a = rasterize(
            20,
            20,
            &rect("a", 2.0, 2.0, 7.0, 9.0),
            &RasterOptions::default(),
        )
        .unwrap();
        let b = rasterize(
            20,
            20,
            &rect("b", 10.0, 10.0, 15.0, 12.0),
            &RasterOptions::default(),
        )
        .unwrap();

        let boxes = extract_bboxes(&[a, b]);
        let first = boxes[0].as_ref().unwrap();
        let second = boxes[1].as_ref().unwrap();
        assert!((first.xmin() - 2.0).abs() <= 1.0);
        assert!((first.ymax() - 9.0).abs() <= 1.0);
        assert!((second.xmin() - 10.0).abs() <= 1.0);
    }
}
