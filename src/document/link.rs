//! Source path to published URL conversion.

use std::str::FromStr;

use thiserror::Error;
use time::{
    Date, OffsetDateTime, format_description::well_known::Rfc2822, macros::format_description,
};

const CONTENT_MARKER: &str = "content/";
const POST_MARKER: &str = "post/";
const INDEX_FILE: &str = "index.md";
const DATE_FALLBACK_LINK: &str = "/";

/// Errors raised while turning a source path into a link.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    /// The path does not contain the marker the addressing method anchors on.
    #[error("path {path} does not contain '{marker}'")]
    MissingMarker {
        /// Marker that was searched for.
        marker: &'static str,
        /// Path supplied by the caller.
        path: String,
    },
    /// The publish date matched none of the accepted formats.
    #[error("unable to parse date: '{0}'")]
    DateFormatUnrecognized(String),
    /// An addressing method name or number was not recognized.
    #[error("unknown addressing method: '{0}'")]
    UnknownMethod(String),
}

/// Addressing convention used to derive a published URL from a content path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AddressingMethod {
    /// Page bundles under `content/`: `content/post/2024/slug/index.md` → `post/2024/slug/`.
    #[default]
    ContentRelative,
    /// Dated archive under `post/`: `post/2012/slug.md` → `2012/<month>/slug.html`.
    PostArchive,
}

impl FromStr for AddressingMethod {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "content" => Ok(Self::ContentRelative),
            "2" | "post" => Ok(Self::PostArchive),
            other => Err(LinkError::UnknownMethod(other.to_string())),
        }
    }
}

/// Convert a filesystem path into a relative link under the chosen addressing method.
///
/// An unparsable `date` under [`AddressingMethod::PostArchive`] degrades to `"/"` and is logged;
/// use [`parse_publish_month`] to detect that case up front.
pub fn path_to_link(path: &str, method: AddressingMethod, date: &str) -> Result<String, LinkError> {
    tracing::debug!(path, method = ?method, "Converting path to link");

    let link = match method {
        AddressingMethod::ContentRelative => after_marker(path, CONTENT_MARKER)?.to_string(),
        AddressingMethod::PostArchive => {
            let remainder = after_marker(path, POST_MARKER)?;
            let segments: Vec<&str> = remainder.split('/').collect();
            let first = segments.first().copied().unwrap_or_default();
            let last = segments.last().copied().unwrap_or_default();
            let file_name = format!("{}.html", last.strip_suffix(".md").unwrap_or(last));

            match parse_publish_month(date) {
                Ok(month) => format!("{first}/{month}/{file_name}"),
                Err(error) => {
                    tracing::warn!(path, error = %error, "Falling back to root link");
                    DATE_FALLBACK_LINK.to_string()
                }
            }
        }
    };

    Ok(link.replace(INDEX_FILE, ""))
}

/// Parse the two-digit month from an RFC 2822 timestamp or a `YYYY-MM-DD` date.
pub fn parse_publish_month(date: &str) -> Result<String, LinkError> {
    let trimmed = date.trim();
    let month = OffsetDateTime::parse(trimmed, &Rfc2822)
        .map(|parsed| parsed.month())
        .or_else(|_| {
            Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
                .map(|parsed| parsed.month())
        })
        .map_err(|_| LinkError::DateFormatUnrecognized(date.to_string()))?;

    Ok(format!("{:02}", u8::from(month)))
}

fn after_marker<'a>(path: &'a str, marker: &'static str) -> Result<&'a str, LinkError> {
    path.find(marker)
        .map(|position| &path[position + marker.len()..])
        .ok_or_else(|| LinkError::MissingMarker {
            marker,
            path: path.to_string(),
        })
}
