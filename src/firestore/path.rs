use std::fmt::{Display, Formatter};

use crate::firestore::error::{invalid_argument, FirestoreResult};

/// A slash-delimited Firestore path, alternating collection and document
/// segments starting with a collection.
///
/// Document paths therefore have an even number of segments
/// (`users/alice`, `users/alice/pets/rex`), collection paths an odd number
/// (`users`, `users/alice/pets`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourcePath {
    segments: Vec<String>,
}

impl ResourcePath {
    pub fn document(path: &str) -> FirestoreResult<Self> {
        let parsed = Self::parse(path)?;
        if parsed.segments.len() % 2 != 0 {
            return Err(invalid_argument(format!(
                "{path} is an invalid document path"
            )));
        }
        Ok(parsed)
    }

    pub fn collection(path: &str) -> FirestoreResult<Self> {
        let parsed = Self::parse(path)?;
        if parsed.segments.len() % 2 != 1 {
            return Err(invalid_argument(format!(
                "{path} is an invalid collection path"
            )));
        }
        Ok(parsed)
    }

    fn parse(path: &str) -> FirestoreResult<Self> {
        if path.is_empty() {
            return Err(invalid_argument("Resource paths must not be empty"));
        }
        if path.starts_with('/') || path.ends_with('/') || path.contains("//") {
            return Err(invalid_argument(format!(
                "Found empty segment in resource path {path}"
            )));
        }
        Ok(Self {
            segments: path.split('/').map(str::to_string).collect(),
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The enclosing path, without the leaf segment.
    pub(crate) fn parent(&self) -> ResourcePath {
        ResourcePath {
            segments: self.segments[..self.segments.len().saturating_sub(1)].to_vec(),
        }
    }

    /// The leaf id, i.e. the last path segment.
    pub fn id(&self) -> &str {
        self.segments
            .last()
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn canonical_string(&self) -> String {
        self.segments.join("/")
    }
}

impl Display for ResourcePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical_string())
    }
}
