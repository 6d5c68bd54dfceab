//! Front-matter metadata extraction.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::markdown::split_front_matter;

/// Errors raised while reading a document's front matter.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The document could not be read from disk.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// No `---` delimited block opens the document.
    #[error("document has no front matter block")]
    MissingFrontMatter,
    /// The front matter is not a valid metadata mapping.
    #[error("invalid front matter: {0}")]
    Decode(#[from] serde_yaml::Error),
}

/// Descriptive record decoded from a document's front matter.
///
/// Every field defaults to empty when absent. `date` is kept verbatim and only parsed when a
/// link needs the publish month.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Metadata {
    /// Article title.
    pub title: String,
    /// Article author.
    pub author: String,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Publish date as written.
    pub date: String,
}

/// Read `path` and decode its front matter.
pub fn extract_metadata(path: impl AsRef<Path>) -> Result<Metadata, MetadataError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_metadata(&content)
}

/// Decode the front matter at the head of `content`.
pub fn parse_metadata(content: &str) -> Result<Metadata, MetadataError> {
    let (block, _) = split_front_matter(content).ok_or(MetadataError::MissingFrontMatter)?;
    if block.trim().is_empty() {
        return Ok(Metadata::default());
    }
    Ok(serde_yaml::from_str(block)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ARTICLE: &str = "---\ntitle: \"Use local AWS credentials in a React app\"\nauthor: Gernot\ntags:\n  - aws\n  - react\ndate: 2024-03-04\n---\n\n## Problem\n\nBody.\n";

    #[test]
    fn decodes_all_fields() {
        let meta = parse_metadata(ARTICLE).expect("metadata");
        assert_eq!(meta.title, "Use local AWS credentials in a React app");
        assert_eq!(meta.author, "Gernot");
        assert_eq!(meta.tags, vec!["aws", "react"]);
        assert_eq!(meta.date, "2024-03-04");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let meta = parse_metadata("---\ntitle: Only a title\n---\nbody\n").expect("metadata");
        assert_eq!(meta.title, "Only a title");
        assert!(meta.author.is_empty());
        assert!(meta.tags.is_empty());
        assert!(meta.date.is_empty());
    }

    #[test]
    fn rfc2822_dates_survive_verbatim() {
        let meta = parse_metadata("---\ndate: Wed, 12 Dec 2012 15:14:59 +0000\n---\n").unwrap();
        assert_eq!(meta.date, "Wed, 12 Dec 2012 15:14:59 +0000");
    }

    #[test]
    fn empty_block_yields_default_metadata() {
        assert_eq!(parse_metadata("---\n---\nbody\n").unwrap(), Metadata::default());
    }

    #[test]
    fn document_without_front_matter_fails() {
        assert!(matches!(
            parse_metadata("# Title\n\nNo metadata here.\n"),
            Err(MetadataError::MissingFrontMatter)
        ));
        assert!(matches!(
            parse_metadata("---\ntitle: never closed\n"),
            Err(MetadataError::MissingFrontMatter)
        ));
    }

    #[test]
    fn malformed_yaml_fails_whole_call() {
        let result = parse_metadata("---\ntitle: ok\ntags: [unterminated\n---\n");
        assert!(matches!(result, Err(MetadataError::Decode(_))));

        let wrong_shape = parse_metadata("---\ntags: 5\n---\n");
        assert!(matches!(wrong_shape, Err(MetadataError::Decode(_))));
    }

    #[test]
    fn extract_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(ARTICLE.as_bytes()).expect("write");
        let meta = extract_metadata(file.path()).expect("metadata");
        assert_eq!(meta.author, "Gernot");
    }

    #[test]
    fn unreadable_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("missing.md");
        let error = extract_metadata(&missing).unwrap_err();
        assert!(matches!(error, MetadataError::Io { .. }));
        assert!(error.to_string().contains("missing.md"));
    }
}
