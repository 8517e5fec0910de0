//! Core data model for labelbridge.
//!
//! This module defines the canonical representation every conversion in
//! the crate passes through: vector [`Shape`]s in pixel space, typed
//! [`Coord`]/[`BBoxXYXY`] values that keep pixel and normalized spaces
//! apart at compile time, decoded [`GroundingAnnotation`]s, and the
//! persisted [`Conversation`] record.
//!
//! # Design Principles
//!
//! 1. **Type Safety**: marker types make a normalized-vs-pixel mix-up a
//!    compile error instead of a subtly misplaced box.
//!
//! 2. **Exhaustive tags**: [`ShapeType`] has no catch-all variant; data
//!    with an unknown tag fails loudly at the boundary.
//!
//! 3. **Permissive Construction**: "invalid" values (out-of-range
//!    coordinates, unordered boxes) are representable, so decoding can
//!    report issues rather than panic while parsing.

mod bbox;
mod conversation;
mod coord;
mod grounding;
mod shape;
mod space;

// Re-export core types for convenient access
pub use bbox::BBoxXYXY;
pub use conversation::{Conversation, Speaker, Turn};
pub use coord::Coord;
pub use grounding::{AnnotationKind, GroundingAnnotation};
pub use shape::{MaskPatch, Shape, ShapeType};
pub use space::{Normalized, Pixel};
