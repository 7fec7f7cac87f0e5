//! Manifest parsing and filtering into confirmed image/annotation pairs.

use crate::types::{BojaDatasetError, DatasetResult, FilterSummary};
use data_contracts::AnnotationStatus;
use std::fs;
use std::path::{Path, PathBuf};

/// Annotation filename marking a manifest record as intentionally unusable.
pub const INVALID_ANNOTATION_FILE_IDENTIFIER: &str = "invalid";

/// One `image,annotation[,...]` manifest record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub image_name: String,
    pub annotation_name: String,
}

impl ManifestEntry {
    /// Parse a raw manifest line. Surrounding whitespace is stripped; fields
    /// past the second are ignored. Returns None for lines with fewer than
    /// two fields.
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.trim().split(',');
        let image_name = fields.next()?;
        let annotation_name = fields.next()?;
        Some(Self {
            image_name: image_name.to_string(),
            annotation_name: annotation_name.to_string(),
        })
    }

    pub fn is_flagged_invalid(&self) -> bool {
        self.annotation_name
            .eq_ignore_ascii_case(INVALID_ANNOTATION_FILE_IDENTIFIER)
    }
}

/// Probe used by the filter to decide whether an annotation holds boxes.
pub trait AnnotationSource {
    fn inspect(&self, path: &Path) -> AnnotationStatus;

    fn has_boxes(&self, path: &Path) -> bool {
        matches!(self.inspect(path), AnnotationStatus::WithBoxes(_))
    }
}

/// Pascal VOC files on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct VocReader;

impl AnnotationSource for VocReader {
    fn inspect(&self, path: &Path) -> AnnotationStatus {
        data_contracts::inspect(path)
    }
}

/// Index-aligned image and annotation paths that passed every check.
#[derive(Debug, Clone, Default)]
pub struct FilteredManifest {
    pub images: Vec<PathBuf>,
    pub annotations: Vec<PathBuf>,
    pub summary: FilterSummary,
}

impl FilteredManifest {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Malformed,
    FlaggedInvalid,
    MissingImage,
    MissingAnnotation,
    Empty,
    Unreadable,
}

impl Rejection {
    fn as_str(&self) -> &'static str {
        match self {
            Rejection::Malformed => "malformed line",
            Rejection::FlaggedInvalid => "annotation flagged invalid",
            Rejection::MissingImage => "image file missing",
            Rejection::MissingAnnotation => "annotation file missing",
            Rejection::Empty => "annotation has no boxes",
            Rejection::Unreadable => "annotation unreadable",
        }
    }

    fn count(&self, summary: &mut FilterSummary) {
        match self {
            Rejection::Malformed => summary.malformed += 1,
            Rejection::FlaggedInvalid => summary.flagged_invalid += 1,
            Rejection::MissingImage => summary.missing_image += 1,
            Rejection::MissingAnnotation => summary.missing_annotation += 1,
            Rejection::Empty => summary.empty += 1,
            Rejection::Unreadable => summary.unreadable += 1,
        }
    }
}

fn check_entry(
    entry: Option<&ManifestEntry>,
    image_dir: &Path,
    annotation_dir: &Path,
    reader: &dyn AnnotationSource,
) -> Result<(PathBuf, PathBuf), Rejection> {
    let entry = entry.ok_or(Rejection::Malformed)?;
    // The sentinel is checked before touching the filesystem so the file is never parsed.
    if entry.is_flagged_invalid() {
        return Err(Rejection::FlaggedInvalid);
    }
    let image_path = image_dir.join(&entry.image_name);
    if !image_path.is_file() {
        return Err(Rejection::MissingImage);
    }
    let annotation_path = annotation_dir.join(&entry.annotation_name);
    if !annotation_path.is_file() {
        return Err(Rejection::MissingAnnotation);
    }
    match reader.inspect(&annotation_path) {
        AnnotationStatus::WithBoxes(_) => Ok((image_path, annotation_path)),
        AnnotationStatus::Empty => Err(Rejection::Empty),
        AnnotationStatus::Unreadable => Err(Rejection::Unreadable),
    }
}

/// Filter manifest text against the image and annotation directories,
/// preserving line order. Rejected lines are counted, never errors.
pub fn filter_lines(
    contents: &str,
    image_dir: &Path,
    annotation_dir: &Path,
    reader: &dyn AnnotationSource,
) -> FilteredManifest {
    let mut out = FilteredManifest::default();
    for (line_no, line) in contents.lines().enumerate() {
        out.summary.total += 1;
        let entry = ManifestEntry::parse(line);
        match check_entry(entry.as_ref(), image_dir, annotation_dir, reader) {
            Ok((image, annotation)) => {
                out.summary.accepted += 1;
                out.images.push(image);
                out.annotations.push(annotation);
            }
            Err(reason) => {
                tracing::debug!(
                    line = line_no + 1,
                    entry = line.trim(),
                    reason = reason.as_str(),
                    "rejected manifest line"
                );
                reason.count(&mut out.summary);
            }
        }
    }
    out
}

/// Read a manifest file and filter it. Fails only when the manifest itself
/// cannot be read.
pub fn filter_manifest(
    manifest_path: &Path,
    image_dir: &Path,
    annotation_dir: &Path,
    reader: &dyn AnnotationSource,
) -> DatasetResult<FilteredManifest> {
    let contents = fs::read_to_string(manifest_path).map_err(|e| BojaDatasetError::Io {
        path: manifest_path.to_path_buf(),
        source: e,
    })?;
    let filtered = filter_lines(&contents, image_dir, annotation_dir, reader);
    let s = &filtered.summary;
    tracing::info!(
        manifest = %manifest_path.display(),
        total = s.total,
        accepted = s.accepted,
        malformed = s.malformed,
        flagged_invalid = s.flagged_invalid,
        missing_image = s.missing_image,
        missing_annotation = s.missing_annotation,
        empty = s.empty,
        unreadable = s.unreadable,
        "filtered manifest"
    );
    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Reader backed by a fixed table instead of XML files.
    struct FakeReader(HashMap<PathBuf, AnnotationStatus>);

    impl AnnotationSource for FakeReader {
        fn inspect(&self, path: &Path) -> AnnotationStatus {
            self.0
                .get(path)
                .copied()
                .unwrap_or(AnnotationStatus::Unreadable)
        }
    }

    #[test]
    fn parse_takes_first_two_fields() {
        let e = ManifestEntry::parse("  a.jpg,a.xml,extra,more \n").unwrap();
        assert_eq!(e.image_name, "a.jpg");
        assert_eq!(e.annotation_name, "a.xml");
    }

    #[test]
    fn parse_rejects_single_field_and_blank() {
        assert_eq!(ManifestEntry::parse("a.jpg"), None);
        assert_eq!(ManifestEntry::parse(""), None);
        assert_eq!(ManifestEntry::parse("   "), None);
    }

    #[test]
    fn sentinel_is_case_insensitive() {
        for name in ["invalid", "INVALID", "Invalid"] {
            let e = ManifestEntry::parse(&format!("x.jpg,{name}")).unwrap();
            assert!(e.is_flagged_invalid());
        }
        assert!(!ManifestEntry::parse("x.jpg,invalid.xml")
            .unwrap()
            .is_flagged_invalid());
    }

    #[test]
    fn filter_counts_each_cause_once() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let images = tmp.path().join("images");
        let annotations = tmp.path().join("annotations");
        fs::create_dir_all(&images)?;
        fs::create_dir_all(&annotations)?;
        for name in ["a.jpg", "b.jpg", "c.jpg", "d.jpg", "e.jpg"] {
            fs::write(images.join(name), b"")?;
        }
        for name in ["a.xml", "c.xml", "d.xml", "invalid"] {
            fs::write(annotations.join(name), b"")?;
        }
        let reader = FakeReader(HashMap::from([
            (annotations.join("a.xml"), AnnotationStatus::WithBoxes(2)),
            (annotations.join("c.xml"), AnnotationStatus::Empty),
            (annotations.join("d.xml"), AnnotationStatus::Unreadable),
            (annotations.join("invalid"), AnnotationStatus::WithBoxes(1)),
        ]));
        let manifest = "a.jpg,a.xml\n\
                        b.jpg,invalid\n\
                        c.jpg,c.xml\n\
                        d.jpg,d.xml\n\
                        e.jpg,e.xml\n\
                        z.jpg,a.xml\n\
                        lonely\n";
        let out = filter_lines(manifest, &images, &annotations, &reader);

        assert_eq!(out.images, vec![images.join("a.jpg")]);
        assert_eq!(out.annotations, vec![annotations.join("a.xml")]);
        assert_eq!(
            out.summary,
            FilterSummary {
                total: 7,
                accepted: 1,
                malformed: 1,
                flagged_invalid: 1,
                missing_image: 1,
                missing_annotation: 1,
                empty: 1,
                unreadable: 1,
            }
        );
        assert_eq!(out.summary.rejected(), 6);
        Ok(())
    }

    #[test]
    fn missing_manifest_is_an_io_error() {
        let err = filter_manifest(
            Path::new("/definitely/not/here/manifest.txt"),
            Path::new("."),
            Path::new("."),
            &VocReader,
        )
        .unwrap_err();
        assert!(matches!(err, BojaDatasetError::Io { .. }));
    }
}
