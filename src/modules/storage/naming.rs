//! Object naming and categorization.
//!
//! Storage keys are laid out as
//! `{organization_id}/{category}/{base_name}-{suffix}{extension}` so objects
//! are partitioned per organization and category without consulting the
//! database. The category is never persisted; it is derived again from the
//! file name or from the key.

use std::collections::BTreeMap;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

lazy_static! {
    /// Characters allowed in the base-name segment of a key
    static ref UNSAFE_KEY_CHARS: Regex = Regex::new(r"[^A-Za-z0-9._-]+").unwrap();
}

/// Length of the random suffix appended to every base name
const UNIQUE_SUFFIX_LEN: usize = 8;

/// Base name used when the uploaded name has none left after sanitizing
const FALLBACK_BASE_NAME: &str = "file";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Documents,
    Images,
    Audio,
    Video,
    Archives,
    Others,
}

/// Extension (lowercase, without dot) to category
const EXTENSION_TABLE: &[(&str, FileCategory)] = &[
    ("pdf", FileCategory::Documents),
    ("doc", FileCategory::Documents),
    ("docx", FileCategory::Documents),
    ("txt", FileCategory::Documents),
    ("rtf", FileCategory::Documents),
    ("odt", FileCategory::Documents),
    ("md", FileCategory::Documents),
    ("csv", FileCategory::Documents),
    ("xls", FileCategory::Documents),
    ("xlsx", FileCategory::Documents),
    ("ppt", FileCategory::Documents),
    ("pptx", FileCategory::Documents),
    ("jpg", FileCategory::Images),
    ("jpeg", FileCategory::Images),
    ("png", FileCategory::Images),
    ("gif", FileCategory::Images),
    ("webp", FileCategory::Images),
    ("svg", FileCategory::Images),
    ("bmp", FileCategory::Images),
    ("mp3", FileCategory::Audio),
    ("wav", FileCategory::Audio),
    ("ogg", FileCategory::Audio),
    ("flac", FileCategory::Audio),
    ("m4a", FileCategory::Audio),
    ("mp4", FileCategory::Video),
    ("mov", FileCategory::Video),
    ("avi", FileCategory::Video),
    ("mkv", FileCategory::Video),
    ("webm", FileCategory::Video),
    ("zip", FileCategory::Archives),
    ("rar", FileCategory::Archives),
    ("7z", FileCategory::Archives),
    ("tar", FileCategory::Archives),
    ("gz", FileCategory::Archives),
];

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Documents => "documents",
            Self::Images => "images",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Archives => "archives",
            Self::Others => "others",
        }
    }

    /// Category for a file name, from its lowercase extension
    pub fn from_filename(filename: &str) -> Self {
        let (_, extension) = split_name(final_segment(filename));
        let extension = extension.trim_start_matches('.').to_lowercase();

        EXTENSION_TABLE
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, category)| *category)
            .unwrap_or(Self::Others)
    }

    /// Category encoded in a storage key built by [`generate_object_key`]
    pub fn from_object_key(key: &str) -> Option<Self> {
        let segment = key.split('/').nth(1)?;
        [
            Self::Documents,
            Self::Images,
            Self::Audio,
            Self::Video,
            Self::Archives,
            Self::Others,
        ]
        .into_iter()
        .find(|c| c.as_str() == segment)
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build a collision-free storage key for an upload
pub fn generate_object_key(organization_id: Uuid, filename: &str) -> String {
    let category = FileCategory::from_filename(filename);
    let (base_name, extension) = split_name(final_segment(filename));

    let base_name = sanitize(base_name);
    let base_name = if base_name.is_empty() {
        FALLBACK_BASE_NAME.to_string()
    } else {
        base_name
    };
    let extension = sanitize(extension);

    let suffix = Uuid::new_v4().simple().to_string();

    format!(
        "{}/{}/{}-{}{}",
        organization_id,
        category.as_str(),
        base_name,
        &suffix[..UNIQUE_SUFFIX_LEN],
        extension
    )
}

/// Category name to the extensions it covers
pub fn supported_file_types() -> BTreeMap<FileCategory, Vec<String>> {
    let mut types: BTreeMap<FileCategory, Vec<String>> = BTreeMap::new();
    for (ext, category) in EXTENSION_TABLE {
        types.entry(*category).or_default().push(format!(".{}", ext));
    }
    types
}

/// Last path segment of an uploaded name (clients may send full paths)
fn final_segment(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
}

/// Split into base name and extension (with its dot). A leading dot does not
/// start an extension, so ".env" has none.
fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

fn sanitize(segment: &str) -> String {
    UNSAFE_KEY_CHARS.replace_all(segment, "_").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_extension() {
        assert_eq!(FileCategory::from_filename("report.pdf"), FileCategory::Documents);
        assert_eq!(FileCategory::from_filename("PHOTO.JPG"), FileCategory::Images);
        assert_eq!(FileCategory::from_filename("song.flac"), FileCategory::Audio);
        assert_eq!(FileCategory::from_filename("clip.webm"), FileCategory::Video);
        assert_eq!(FileCategory::from_filename("backup.tar.gz"), FileCategory::Archives);
        assert_eq!(FileCategory::from_filename("binary.exe"), FileCategory::Others);
        assert_eq!(FileCategory::from_filename("Makefile"), FileCategory::Others);
        assert_eq!(FileCategory::from_filename(".env"), FileCategory::Others);
    }

    #[test]
    fn test_object_key_layout() {
        let org = Uuid::new_v4();
        let key = generate_object_key(org, "report.pdf");

        let prefix = format!("{}/documents/report-", org);
        assert!(key.starts_with(&prefix), "unexpected key {}", key);
        assert!(key.ends_with(".pdf"));
        assert_eq!(key.len(), prefix.len() + UNIQUE_SUFFIX_LEN + ".pdf".len());
    }

    #[test]
    fn test_same_name_gives_distinct_keys() {
        let org = Uuid::new_v4();
        let first = generate_object_key(org, "report.pdf");
        let second = generate_object_key(org, "report.pdf");
        assert_ne!(first, second);
    }

    #[test]
    fn test_object_key_strips_paths_and_unsafe_chars() {
        let org = Uuid::new_v4();
        let key = generate_object_key(org, "../../etc/my notes?.txt");
        let name = key.rsplit('/').next().unwrap();

        assert_eq!(key.split('/').count(), 3);
        assert!(name.starts_with("my_notes_-"));
        assert!(name.ends_with(".txt"));
    }

    #[test]
    fn test_object_key_without_base_name() {
        let key = generate_object_key(Uuid::new_v4(), "???");
        let name = key.rsplit('/').next().unwrap();
        assert!(name.starts_with("_-"));

        let key = generate_object_key(Uuid::new_v4(), "");
        let name = key.rsplit('/').next().unwrap();
        assert!(name.starts_with("file-"));
    }

    #[test]
    fn test_category_round_trips_through_key() {
        let key = generate_object_key(Uuid::new_v4(), "holiday.png");
        assert_eq!(FileCategory::from_object_key(&key), Some(FileCategory::Images));
        assert_eq!(FileCategory::from_object_key("no-slashes"), None);
    }

    #[test]
    fn test_supported_file_types() {
        let types = supported_file_types();
        assert!(types[&FileCategory::Documents].contains(&".pdf".to_string()));
        assert!(types[&FileCategory::Archives].contains(&".7z".to_string()));
        assert!(!types.contains_key(&FileCategory::Others));
    }
}
