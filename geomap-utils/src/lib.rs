//! Shared utility functions for Geomap crates.

/// Label utilities for identifiers derived from user data.
pub mod labels {
    /// Turn an arbitrary category or file label into an identifier-safe token.
    ///
    /// Whitespace is removed first, then every remaining character that is not
    /// an ASCII letter or digit becomes `_`.
    /// e.g. `"North West"` -> `"NorthWest"`, `"a-b.c"` -> `"a_b_c"`
    pub fn sanitize(label: &str) -> String {
        label
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect()
    }

    /// File stem used to name per-file settings, i.e. everything before the first `.`
    pub fn file_stem(name: &str) -> &str {
        let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
        base.split('.').next().unwrap_or(base)
    }

    /// Lowercased extension including the leading dot, or an empty string.
    pub fn extension(name: &str) -> String {
        let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
        match base.rfind('.') {
            Some(idx) if idx > 0 => base[idx..].to_ascii_lowercase(),
            _ => String::new(),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_sanitize() {
            assert_eq!(sanitize("North West"), "NorthWest");
            assert_eq!(sanitize("a-b.c"), "a_b_c");
            assert_eq!(sanitize(" 12 "), "12");
            assert_eq!(sanitize("Île"), "_le");
        }

        #[test]
        fn test_file_stem_and_extension() {
            assert_eq!(file_stem("gardens.csv"), "gardens");
            assert_eq!(file_stem("../data/canada.provinces.geojson"), "canada");
            assert_eq!(extension("../data/Canada.GEOJSON"), ".geojson");
            assert_eq!(extension("README"), "");
            assert_eq!(extension(".hidden"), "");
        }
    }
}

/// Numeric parsing helpers.
pub mod numbers {
    /// Parse a float the way spreadsheet users expect: surrounding whitespace is
    /// ignored, and `inf`/`nan` spellings are accepted. Empty input is not a number.
    pub fn parse_float(s: &str) -> Option<f64> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return None;
        }
        trimmed.parse::<f64>().ok()
    }

    /// True when every item parses as a float. An empty iterator is vacuously numeric.
    pub fn all_numeric<'a, I>(items: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        items.into_iter().all(|s| parse_float(s).is_some())
    }

    /// Format a float without a trailing `.0` for whole numbers.
    pub fn format_number(value: f64) -> String {
        if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e15 {
            format!("{}", value as i64)
        } else {
            format!("{}", value)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_float() {
            assert_eq!(parse_float(" 1.5 "), Some(1.5));
            assert_eq!(parse_float("1e3"), Some(1000.0));
            assert_eq!(parse_float(""), None);
            assert_eq!(parse_float("abc"), None);
            assert!(parse_float("inf").unwrap().is_infinite());
        }

        #[test]
        fn test_all_numeric() {
            assert!(all_numeric(["1", "2.5", "-3"]));
            assert!(!all_numeric(["1", "name"]));
        }

        #[test]
        fn test_format_number() {
            assert_eq!(format_number(3.0), "3");
            assert_eq!(format_number(2.5), "2.5");
            assert_eq!(format_number(-10.0), "-10");
        }
    }
}
