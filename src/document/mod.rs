//! Per-document helpers: front-matter metadata and canonical link derivation.

mod link;
mod metadata;

pub use link::{AddressingMethod, LinkError, parse_publish_month, path_to_link};
pub use metadata::{Metadata, MetadataError, extract_metadata, parse_metadata};
