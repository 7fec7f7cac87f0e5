use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Pascal VOC `<annotation>` document. Unknown elements are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct VocAnnotation {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub size: Option<VocSize>,
    #[serde(rename = "object", default)]
    pub objects: Vec<VocObject>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct VocSize {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub depth: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VocObject {
    pub name: String,
    #[serde(default)]
    pub bndbox: Option<VocBndBox>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct VocBndBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

/// Image-level metadata carried by an annotation file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMeta {
    pub filename: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub depth: Option<u32>,
}

/// One labeled box in pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
    pub label: String,
}

impl LabeledBox {
    pub fn area(&self) -> f32 {
        (self.xmax - self.xmin) * (self.ymax - self.ymin)
    }

    pub fn as_xyxy(&self) -> [f32; 4] {
        [self.xmin, self.ymin, self.xmax, self.ymax]
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.label.trim().is_empty() {
            return Err(ValidationError::MissingLabel);
        }
        let b = self.as_xyxy();
        if b.iter().any(|v| !v.is_finite()) {
            return Err(ValidationError::NonFiniteBox(b));
        }
        if b[0] >= b[2] || b[1] >= b[3] {
            return Err(ValidationError::InvalidBoxOrder(b));
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("object has an empty <name>")]
    MissingLabel,
    #[error("bndbox contains non-finite values: {0:?}")]
    NonFiniteBox([f32; 4]),
    #[error("bndbox min>=max: {0:?}")]
    InvalidBoxOrder([f32; 4]),
}

#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("xml parse error at {path}: {source}")]
    Xml {
        path: PathBuf,
        #[source]
        source: quick_xml::DeError,
    },
    #[error("annotation validation failed at {path}: object[{index}]: {source}")]
    Validation {
        path: PathBuf,
        index: usize,
        #[source]
        source: ValidationError,
    },
}

/// Outcome of probing an annotation file without surfacing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationStatus {
    WithBoxes(usize),
    Empty,
    Unreadable,
}

impl VocAnnotation {
    pub fn parse(xml: &str) -> Result<Self, quick_xml::DeError> {
        quick_xml::de::from_str(xml)
    }

    pub fn image_meta(&self) -> ImageMeta {
        ImageMeta {
            filename: self.filename.clone(),
            width: self.size.map(|s| s.width),
            height: self.size.map(|s| s.height),
            depth: self.size.and_then(|s| s.depth),
        }
    }

    /// Objects with a bounding box, in document order. Objects without
    /// `<bndbox>` are skipped.
    pub fn labeled_boxes(&self) -> Vec<LabeledBox> {
        self.objects
            .iter()
            .filter_map(|obj| {
                obj.bndbox.map(|b| LabeledBox {
                    xmin: b.xmin,
                    ymin: b.ymin,
                    xmax: b.xmax,
                    ymax: b.ymax,
                    label: obj.name.trim().to_string(),
                })
            })
            .collect()
    }
}

/// Read and validate an annotation file, returning its image metadata and boxes.
pub fn read_content(path: &Path) -> Result<(ImageMeta, Vec<LabeledBox>), AnnotationError> {
    let raw = fs::read_to_string(path).map_err(|e| AnnotationError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let doc = VocAnnotation::parse(&raw).map_err(|e| AnnotationError::Xml {
        path: path.to_path_buf(),
        source: e,
    })?;
    let boxes = doc.labeled_boxes();
    for (index, b) in boxes.iter().enumerate() {
        b.validate().map_err(|source| AnnotationError::Validation {
            path: path.to_path_buf(),
            index,
            source,
        })?;
    }
    Ok((doc.image_meta(), boxes))
}

pub fn inspect(path: &Path) -> AnnotationStatus {
    match read_content(path) {
        Ok((_, boxes)) if boxes.is_empty() => AnnotationStatus::Empty,
        Ok((_, boxes)) => AnnotationStatus::WithBoxes(boxes.len()),
        Err(_) => AnnotationStatus::Unreadable,
    }
}

/// True when the file parses and holds at least one valid box. Never errors.
pub fn has_boxes(path: &Path) -> bool {
    matches!(inspect(path), AnnotationStatus::WithBoxes(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_FRUIT: &str = r#"
<annotation>
    <folder>images</folder>
    <filename>a.jpg</filename>
    <size><width>64</width><height>48</height><depth>3</depth></size>
    <segmented>0</segmented>
    <object>
        <name>apple</name>
        <pose>Unspecified</pose>
        <bndbox><xmin>1</xmin><ymin>2</ymin><xmax>11</xmax><ymax>22</ymax></bndbox>
    </object>
    <object>
        <name> banana </name>
        <bndbox><xmin>5.5</xmin><ymin>6</ymin><xmax>9.5</xmax><ymax>8</ymax></bndbox>
    </object>
</annotation>"#;

    #[test]
    fn parses_objects_in_document_order() {
        let doc = VocAnnotation::parse(TWO_FRUIT).unwrap();
        let boxes = doc.labeled_boxes();
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].label, "apple");
        assert_eq!(boxes[0].as_xyxy(), [1.0, 2.0, 11.0, 22.0]);
        assert_eq!(boxes[1].label, "banana");
        assert_eq!(boxes[1].area(), 8.0);
    }

    #[test]
    fn image_meta_reads_size_block() {
        let doc = VocAnnotation::parse(TWO_FRUIT).unwrap();
        let meta = doc.image_meta();
        assert_eq!(meta.filename.as_deref(), Some("a.jpg"));
        assert_eq!(meta.width, Some(64));
        assert_eq!(meta.height, Some(48));
        assert_eq!(meta.depth, Some(3));
    }

    #[test]
    fn object_without_bndbox_is_skipped() {
        let xml = "<annotation><object><name>pear</name></object></annotation>";
        let doc = VocAnnotation::parse(xml).unwrap();
        assert_eq!(doc.objects.len(), 1);
        assert!(doc.labeled_boxes().is_empty());
    }

    #[test]
    fn inverted_box_fails_validation() {
        let b = LabeledBox {
            xmin: 10.0,
            ymin: 0.0,
            xmax: 5.0,
            ymax: 4.0,
            label: "apple".into(),
        };
        assert_eq!(
            b.validate(),
            Err(ValidationError::InvalidBoxOrder([10.0, 0.0, 5.0, 4.0]))
        );
    }
}
