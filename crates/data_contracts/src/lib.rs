//! Shared data contracts for boja annotation files.
//!
//! Annotations follow the Pascal VOC XML layout: one `<annotation>` document
//! per image, one `<object>` per labeled box.

pub mod annotation;

pub use annotation::{
    has_boxes, inspect, read_content, AnnotationError, AnnotationStatus, ImageMeta, LabeledBox,
    ValidationError, VocAnnotation,
};
