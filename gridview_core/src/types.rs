//! Common identifier types shared across the grid module.

use serde::{Deserialize, Serialize};

/// Caller-supplied stable identifier for an object, attribute, or observer.
///
/// Handles are opaque to the grid: it never allocates them, it only keys
/// lookups by them. Zero is a legal handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Handle(pub u64);

impl Handle {
    /// Returns the raw handle value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Handle {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Object type classification (e.g. "vehicle", "pedestrian", "drone").
///
/// Set once at creation, used only for query filtering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectType(String);

impl ObjectType {
    /// Creates a type from any string-like value.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the type name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ObjectType {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an object lives relative to the local host.
///
/// Carried on the create notification; the grid accepts it but does not
/// key any behavior off it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locality {
    #[default]
    Unknown,
    Local,
    Remote,
}
