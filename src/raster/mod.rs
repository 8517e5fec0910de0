//! Boolean coverage rasters and per-shape rasterization.
//!
//! The rasterizer turns one vector [`Shape`] into a [`Mask`] over a given
//! canvas size. Coverage is strictly boolean - a pixel is covered or it is
//! not, with no anti-aliasing.
//!
//! # Coverage convention
//!
//! A pixel `(x, y)` is covered iff its center `(x + 0.5, y + 0.5)` lies
//! inside the shape region. Rectangle interiors (and polygon scanline
//! spans) are half-open `[min, max)`, so a rectangle with integer corners
//! `(x1, y1)-(x2, y2)` covers exactly `(x2 - x1) * (y2 - y1)` pixels.
//! Disc and stroke footprints use a closed distance test.

pub mod labelmap;

pub use labelmap::{
    build_label_maps, extract_bboxes, InstanceIdentity, LabelMap, LabelMapResult, ShapeIssue,
};

use serde::{Deserialize, Serialize};

use crate::error::LabelbridgeError;
use crate::ir::{BBoxXYXY, Coord, MaskPatch, Pixel, Shape, ShapeType};

/// A boolean coverage raster.
///
/// Stored as a flat `Vec<bool>` in row-major order (C-contiguous): the
/// pixel at `(x, y)` lives at index `y * width + x`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl Mask {
    /// Creates a new all-false mask.
    pub fn new(width: u32, height: u32) -> Self {
        let size = (width as usize) * (height as usize);
        Self {
            width,
            height,
            data: vec![false; size],
        }
    }

    /// Creates a mask from existing row-major data.
    ///
    /// Caller-supplied data whose length disagrees with the declared
    /// dimensions is structurally impossible to interpret and is rejected
    /// outright.
    pub fn from_data(width: u32, height: u32, data: Vec<bool>) -> Result<Self, LabelbridgeError> {
        let expected = (width as usize) * (height as usize);
        if data.len() != expected {
            return Err(LabelbridgeError::RasterDimensionMismatch {
                width,
                height,
                actual_len: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
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

    /// Returns a reference to the raw coverage data.
    pub fn data(&self) -> &[bool] {
        &self.data
    }

    /// Gets the coverage at the specified pixel.
    ///
    /// Returns `None` if the coordinates are out of bounds.
    pub fn get(&self, x: u32, y: u32) -> Option<bool> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data
            .get((y as usize) * (self.width as usize) + (x as usize))
            .copied()
    }

    /// Marks the specified in-bounds pixel as covered.
    #[inline]
    pub(crate) fn put(&mut self, x: u32, y: u32) {
        let idx = (y as usize) * (self.width as usize) + (x as usize);
        self.data[idx] = true;
    }

    /// Returns the number of covered pixels.
    pub fn area(&self) -> usize {
        self.data.iter().filter(|&&covered| covered).count()
    }

    /// Returns the tight axis-aligned box around all covered pixels.
    ///
    /// Coordinates are the min/max covered column and row. Returns `None`
    /// for a mask with no covered pixel.
    pub fn bounding_box(&self) -> Option<BBoxXYXY<Pixel>> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for y in 0..self.height {
            let row = &self.data[(y as usize) * (self.width as usize)..][..self.width as usize];
            for (x, &covered) in row.iter().enumerate() {
                if !covered {
                    continue;
                }
                let x = x as u32;
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                });
            }
        }
        bounds.map(|(x0, y0, x1, y1)| {
            BBoxXYXY::from_xyxy(x0 as f64, y0 as f64, x1 as f64, y1 as f64)
        })
    }
}

/// Stroke and marker sizing for the rasterizer.
#[derive(Clone, Copy, Debug)]
pub struct RasterOptions {
    /// Full stroke width for line and linestrip shapes, in pixels.
    pub line_width: f64,
    /// Disc radius for point shapes, in pixels.
    pub point_size: f64,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            line_width: 10.0,
            point_size: 5.0,
        }
    }
}

/// Rasterizes one shape onto a fresh `height` x `width` canvas.
///
/// Pure function: no shared state, one isolated mask per call. Geometry
/// that violates the per-type point-count invariants yields
/// [`LabelbridgeError::InvalidShapeGeometry`]; regions falling outside the
/// canvas are clipped silently.
pub fn rasterize(
    height: u32,
    width: u32,
    shape: &Shape,
    opts: &RasterOptions,
) -> Result<Mask, LabelbridgeError> {
    shape.validate_geometry()?;

    let mut mask = Mask::new(width, height);
    match shape.shape_type {
        ShapeType::Circle => {
            let center = shape.points[0];
            let radius = center.distance_to(&shape.points[1]);
            fill_disc(&mut mask, center, radius);
        }
        ShapeType::Rectangle => {
            let (a, b) = (shape.points[0], shape.points[1]);
            fill_rect(
                &mut mask,
                a.x.min(b.x),
                a.y.min(b.y),
                a.x.max(b.x),
                a.y.max(b.y),
            );
        }
        ShapeType::Line => {
            stroke_segment(
                &mut mask,
                shape.points[0],
                shape.points[1],
                opts.line_width / 2.0,
            );
        }
        ShapeType::LineStrip => {
            // Consecutive strokes only; no closing segment back to the start.
            for pair in shape.points.windows(2) {
                stroke_segment(&mut mask, pair[0], pair[1], opts.line_width / 2.0);
            }
        }
        ShapeType::Point => {
            fill_disc(&mut mask, shape.points[0], opts.point_size);
        }
        ShapeType::Polygon => {
            fill_polygon(&mut mask, &shape.points);
        }
        ShapeType::Mask => match &shape.mask {
            Some(patch) => {
                paste_patch(&mut mask, patch).map_err(|message| shape.geometry_error(message))?;
            }
            None => return Err(shape.geometry_error("expected an attached mask patch")),
        },
    }

    Ok(mask)
}

/// Clips a closed `[lo, hi]` coordinate span to `0..limit` pixel indices.
fn clip_span(lo: f64, hi: f64, limit: u32) -> Option<(u32, u32)> {
    if !lo.is_finite() || !hi.is_finite() {
        return None;
    }
    let start = lo.floor().max(0.0);
    let end = hi.ceil().min(limit as f64);
    if end <= start {
        return None;
    }
    Some((start as u32, end as u32))
}

/// Pixel indices whose centers lie in the half-open span `[lo, hi)`.
fn span_half_open(lo: f64, hi: f64, limit: u32) -> Option<(u32, u32)> {
    if !lo.is_finite() || !hi.is_finite() {
        return None;
    }
    let start = (lo - 0.5).ceil().max(0.0);
    let end = (hi - 0.5).ceil().min(limit as f64);
    if end <= start {
        return None;
    }
    Some((start as u32, end as u32))
}

fn fill_disc(mask: &mut Mask, center: Coord<Pixel>, radius: f64) {
    let Some((y0, y1)) = clip_span(center.y - radius, center.y + radius, mask.height()) else {
        return;
    };
    let Some((x0, x1)) = clip_span(center.x - radius, center.x + radius, mask.width()) else {
        return;
    };
    let r2 = radius * radius;
    for y in y0..y1 {
        let dy = (y as f64 + 0.5) - center.y;
        for x in x0..x1 {
            let dx = (x as f64 + 0.5) - center.x;
            if dx * dx + dy * dy <= r2 {
                mask.put(x, y);
            }
        }
    }
}

fn fill_rect(mask: &mut Mask, min_x: f64, min_y: f64, max_x: f64, max_y: f64) {
    let Some((y0, y1)) = span_half_open(min_y, max_y, mask.height()) else {
        return;
    };
    let Some((x0, x1)) = span_half_open(min_x, max_x, mask.width()) else {
        return;
    };
    for y in y0..y1 {
        for x in x0..x1 {
            mask.put(x, y);
        }
    }
}

fn stroke_segment(mask: &mut Mask, a: Coord<Pixel>, b: Coord<Pixel>, half_width: f64) {
    let Some((y0, y1)) = clip_span(
        a.y.min(b.y) - half_width,
        a.y.max(b.y) + half_width,
        mask.height(),
    ) else {
        return;
    };
    let Some((x0, x1)) = clip_span(
        a.x.min(b.x) - half_width,
        a.x.max(b.x) + half_width,
        mask.width(),
    ) else {
        return;
    };

    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    let hw2 = half_width * half_width;

    for y in y0..y1 {
        let cy = y as f64 + 0.5;
        for x in x0..x1 {
            let cx = x as f64 + 0.5;
            // Project the pixel center onto the segment, clamped to its ends.
            let t = if len2 > 0.0 {
                (((cx - a.x) * dx + (cy - a.y) * dy) / len2).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let ex = cx - (a.x + t * dx);
            let ey = cy - (a.y + t * dy);
            if ex * ex + ey * ey <= hw2 {
                mask.put(x, y);
            }
        }
    }
}

/// Even-odd scanline fill sampled at pixel centers.
fn fill_polygon(mask: &mut Mask, points: &[Coord<Pixel>]) {
    let min_y = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_y = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
    let Some((y0, y1)) = clip_span(min_y, max_y, mask.height()) else {
        return;
    };

    let mut crossings: Vec<f64> = Vec::with_capacity(points.len());
    for y in y0..y1 {
        let cy = y as f64 + 0.5;

        crossings.clear();
        for i in 0..points.len() {
            let p = points[i];
            let q = points[(i + 1) % points.len()];
            // Half-open vertical test so a vertex touching the scanline is
            // counted by exactly one of its two edges.
            if (p.y <= cy) != (q.y <= cy) {
                crossings.push(p.x + (cy - p.y) * (q.x - p.x) / (q.y - p.y));
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        for pair in crossings.chunks_exact(2) {
            if let Some((x0, x1)) = span_half_open(pair[0], pair[1], mask.width()) {
                for x in x0..x1 {
                    mask.put(x, y);
                }
            }
        }
    }
}

/// Pastes a patch into the canvas at its recorded offset.
///
/// A patch that does not fit entirely inside the canvas is a data error,
/// not a clipping case: its offset and dimensions were recorded against
/// this canvas when the patch was produced.
fn paste_patch(mask: &mut Mask, patch: &MaskPatch) -> Result<(), String> {
    let (px, py) = (patch.origin_x, patch.origin_y);
    let (pw, ph) = (patch.data.width() as i64, patch.data.height() as i64);
    if px < 0 || py < 0 || px + pw > mask.width() as i64 || py + ph > mask.height() as i64 {
        return Err(format!(
            "mask patch {}x{} at offset ({}, {}) does not fit a {}x{} canvas",
            pw,
            ph,
            px,
            py,
            mask.width(),
            mask.height()
        ));
    }

    for y in 0..patch.data.height() {
        for x in 0..patch.data.width() {
            if patch.data.get(x, y) == Some(true) {
                mask.put(x + px as u32, y + py as u32);
            }
        }
    }
    Ok(())
}
