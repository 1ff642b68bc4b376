use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// Metadata attached to a stored object.
///
/// Identity fields (`path`, `name`, `size`, `bucket`, generations and
/// timestamps) are synthesized by the store; the optional content fields and
/// `custom_metadata` are caller-settable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StorageMetadata {
    pub bucket: Option<String>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_type: Option<String>,
    pub creation_time: Option<DateTime<Utc>>,
    pub generation: i64,
    pub md5_hash: Option<String>,
    pub metadata_generation: i64,
    pub name: Option<String>,
    pub path: String,
    pub size: u64,
    pub updated_time: Option<DateTime<Utc>>,
    pub custom_metadata: BTreeMap<String, String>,
}

/// One page of object listings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListResult {
    pub items: Vec<String>,
    pub page_token: Option<String>,
}
