//! Parsed cache values.

use geomap_core::{BoundaryCollection, Dataset};

/// A parsed source file.
///
/// Every variant owns its data, so `clone()` is a deep copy; callers can
/// edit what they check out without touching the cached original.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Table(Dataset),
    Boundaries(BoundaryCollection),
    Text(String),
}

impl Resource {
    pub fn kind(&self) -> &'static str {
        match self {
            Resource::Table(_) => "table",
            Resource::Boundaries(_) => "boundaries",
            Resource::Text(_) => "text",
        }
    }

    pub fn into_table(self) -> Option<Dataset> {
        match self {
            Resource::Table(dataset) => Some(dataset),
            _ => None,
        }
    }

    pub fn into_boundaries(self) -> Option<BoundaryCollection> {
        match self {
            Resource::Boundaries(collection) => Some(collection),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Dataset> {
        match self {
            Resource::Table(dataset) => Some(dataset),
            _ => None,
        }
    }
}
