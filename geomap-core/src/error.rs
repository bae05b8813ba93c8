/// Error types for the Geomap pipeline
use thiserror::Error;

/// How a failure is recovered from by the render orchestration.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ErrorClass {
    /// File missing, unreachable or forbidden: notify and fall back to a default value.
    Load,
    /// Malformed input: notify and abort the in-progress update.
    Parse,
    /// Nothing renderable: substitute a guidance message for the output.
    Validation,
    /// Layer misconfigured: skip only that layer.
    Guard,
}

/// Main error type for Geomap operations
#[derive(Error, Debug)]
pub enum GeomapError {
    /// Local file could not be read
    #[error("Could not read file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Remote resource could not be downloaded
    #[error("Could not download file {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The sandbox does not allow fetching this file type
    #[error("Fetching {0} is not allowed in this environment")]
    Forbidden(String),

    /// Failed to parse tabular data
    #[error("Failed to parse table {name}: {source}")]
    Csv {
        name: String,
        #[source]
        source: csv::Error,
    },

    /// Failed to parse GeoJSON
    #[error("Failed to parse GeoJSON {name}: {reason}")]
    GeoJson { name: String, reason: String },

    /// Failed to read a binary spreadsheet
    #[error("Failed to read spreadsheet {name}: {reason}")]
    Spreadsheet { name: String, reason: String },

    /// No parser is available for the file type
    #[error("Unsupported file format {extension} for {name}")]
    UnsupportedFormat { name: String, extension: String },

    /// A cell value could not be converted to the requested type
    #[error("Invalid value {value:?} for a {expected} cell")]
    InvalidCell { value: String, expected: String },

    /// A color string is not a `#rrggbb` hex color
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// Column lookup failed (lookups are exact-match)
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Nothing can be rendered; the message is shown to the user instead
    #[error("{0}")]
    Validation(String),

    /// A single layer was misconfigured and skipped
    #[error("{0}")]
    Guard(String),

    /// The density estimator could not be evaluated for the point cloud
    #[error("Density estimation failed: {0}")]
    Density(String),
}

impl GeomapError {
    /// Recovery class used by the orchestration layer.
    pub fn class(&self) -> ErrorClass {
        match self {
            GeomapError::Io { .. } | GeomapError::Fetch { .. } | GeomapError::Forbidden(_) => {
                ErrorClass::Load
            }
            GeomapError::Csv { .. }
            | GeomapError::GeoJson { .. }
            | GeomapError::Spreadsheet { .. }
            | GeomapError::UnsupportedFormat { .. }
            | GeomapError::InvalidCell { .. }
            | GeomapError::InvalidColor(_) => ErrorClass::Parse,
            GeomapError::ColumnNotFound(_) | GeomapError::Validation(_) => ErrorClass::Validation,
            GeomapError::Guard(_) | GeomapError::Density(_) => ErrorClass::Guard,
        }
    }
}

/// Type alias for Results using GeomapError
pub type Result<T> = std::result::Result<T, GeomapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classes() {
        assert_eq!(GeomapError::Forbidden("a.xlsx".into()).class(), ErrorClass::Load);
        assert_eq!(
            GeomapError::GeoJson { name: "x".into(), reason: "bad".into() }.class(),
            ErrorClass::Parse
        );
        assert_eq!(GeomapError::Validation("none".into()).class(), ErrorClass::Validation);
        assert_eq!(GeomapError::Guard("colors".into()).class(), ErrorClass::Guard);
    }

    #[test]
    fn validation_message_is_verbatim() {
        let err = GeomapError::Validation("No locations found".into());
        assert_eq!(err.to_string(), "No locations found");
    }
}
