//! String helpers shared by the filter, sampler, and dataset layers.
//!
//! The important one is `normalize_value`: label comparison across the crate
//! is case- and whitespace-insensitive, and the same normalization feeds
//! cache-key derivation so the two stay consistent.

/// Normalize an answer label for comparison: lowercase and trim.
#[inline]
pub fn normalize_value(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Normalize an optional label, mapping None through.
#[inline]
pub fn normalize_optional_value(value: Option<&str>) -> Option<String> {
    value.map(normalize_value)
}

/// Clean and validate a string, returning `Option<String>`.
///
/// Trims whitespace and filters out empty strings.
#[inline]
pub fn clean_optional_string(s: Option<&String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// String cleaning extension trait
pub trait StringExt {
    /// Trim and return `None` for empty strings
    fn clean(&self) -> Option<String>;

    /// Trimmed copy
    fn trimmed(&self) -> String;
}

impl StringExt for str {
    #[inline]
    fn clean(&self) -> Option<String> {
        let trimmed = self.trim();
        if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
    }

    #[inline]
    fn trimmed(&self) -> String {
        self.trim().to_string()
    }
}

impl StringExt for String {
    #[inline]
    fn clean(&self) -> Option<String> {
        self.as_str().clean()
    }

    #[inline]
    fn trimmed(&self) -> String {
        self.as_str().trimmed()
    }
}

impl<T: AsRef<str>> StringExt for Option<T> {
    #[inline]
    fn clean(&self) -> Option<String> {
        self.as_ref().and_then(|s| s.as_ref().clean())
    }

    #[inline]
    fn trimmed(&self) -> String {
        self.as_ref()
            .map(|s| s.as_ref().trim().to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_value() {
        assert_eq!(normalize_value("  YES  "), "yes");
        assert_eq!(normalize_value("No"), "no");
        assert_eq!(normalize_value("yes"), "yes");
    }

    #[test]
    fn test_normalized_equality_for_filters() {
        // "  YES  " must compare equal to "yes" under filter rules
        assert_eq!(normalize_value("  YES  "), normalize_value("yes"));
    }

    #[test]
    fn test_clean() {
        assert_eq!("  hello  ".clean(), Some("hello".to_string()));
        assert_eq!("   ".clean(), None);
        assert_eq!(Some("  x ".to_string()).clean(), Some("x".to_string()));
        let none: Option<String> = None;
        assert_eq!(none.clean(), None);
    }
}
