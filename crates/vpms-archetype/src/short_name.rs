//! Archetype short names and wildcard patterns
//!
//! Short names look like `lookup.state` or `party.customerperson`. A pattern may
//! contain `*` wildcards (`lookup.sta*`, `party.*`), each matching any run of
//! characters, anchored at both ends.

use crate::error::ArchetypeError;
use regex::Regex;
use std::fmt::{self, Display, Formatter};

/// Compiled short-name pattern
#[derive(Debug, Clone)]
pub struct ShortNamePattern {
    raw: String,
    regex: Option<Regex>,
}

impl ShortNamePattern {
    /// Parse and compile a pattern
    ///
    /// # Errors
    /// Returns [`ArchetypeError::InvalidShortName`] for empty names, characters
    /// outside `[A-Za-z0-9_.*]`, or empty dot-separated segments.
    pub fn parse(raw: &str) -> Result<Self, ArchetypeError> {
        validate(raw, true)?;

        let regex = if raw.contains('*') {
            let expr = format!("^{}$", regex::escape(raw).replace(r"\*", ".*"));
            let compiled = Regex::new(&expr)
                .map_err(|e| ArchetypeError::invalid_short_name(raw, e.to_string()))?;
            Some(compiled)
        } else {
            None
        };

        Ok(Self {
            raw: raw.to_string(),
            regex,
        })
    }

    /// Pattern text as written
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True if the pattern contains a wildcard
    #[inline]
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.regex.is_some()
    }

    /// Check a concrete short name against this pattern
    #[must_use]
    pub fn matches(&self, short_name: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(short_name),
            None => self.raw == short_name,
        }
    }
}

impl Display for ShortNamePattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for ShortNamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for ShortNamePattern {}

/// Validate a concrete (wildcard-free) short name
///
/// # Errors
/// Returns [`ArchetypeError::InvalidShortName`] if the name is malformed or
/// contains a wildcard.
pub fn validate_short_name(name: &str) -> Result<(), ArchetypeError> {
    validate(name, false)
}

/// Check whether `short_name` satisfies `pattern`
///
/// # Errors
/// Returns an error if `pattern` is malformed.
pub fn matches(pattern: &str, short_name: &str) -> Result<bool, ArchetypeError> {
    Ok(ShortNamePattern::parse(pattern)?.matches(short_name))
}

/// Check whether two names or patterns denote overlapping archetypes
///
/// True when they are identical or either one's wildcard matches the other
/// literally. Used when both sides may be family names.
///
/// # Errors
/// Returns an error if either side is malformed.
pub fn overlaps(a: &str, b: &str) -> Result<bool, ArchetypeError> {
    if a == b {
        return Ok(true);
    }
    let pa = ShortNamePattern::parse(a)?;
    let pb = ShortNamePattern::parse(b)?;
    Ok(pa.matches(b) || pb.matches(a))
}

fn validate(raw: &str, allow_wildcard: bool) -> Result<(), ArchetypeError> {
    if raw.is_empty() {
        return Err(ArchetypeError::invalid_short_name(raw, "empty"));
    }
    if let Some(c) = raw
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '*')))
    {
        return Err(ArchetypeError::invalid_short_name(
            raw,
            format!("invalid character '{c}'"),
        ));
    }
    if !allow_wildcard && raw.contains('*') {
        return Err(ArchetypeError::invalid_short_name(raw, "wildcard not allowed"));
    }
    if raw.split('.').any(str::is_empty) {
        return Err(ArchetypeError::invalid_short_name(raw, "empty segment"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn exact_pattern_matches_only_itself() {
        let pattern = ShortNamePattern::parse("lookup.state").unwrap();
        assert!(!pattern.is_wildcard());
        assert!(pattern.matches("lookup.state"));
        assert!(!pattern.matches("lookup.stateX"));
        assert!(!pattern.matches("lookup"));
    }

    #[test]
    fn wildcard_pattern_is_anchored() {
        let pattern = ShortNamePattern::parse("lookup.sta*").unwrap();
        assert!(pattern.is_wildcard());
        assert!(pattern.matches("lookup.state"));
        assert!(pattern.matches("lookup.sta"));
        assert!(!pattern.matches("xlookup.state"));
        assert!(!pattern.matches("lookupXstate"));
    }

    #[test]
    fn dot_is_literal() {
        let pattern = ShortNamePattern::parse("party.*").unwrap();
        assert!(pattern.matches("party.customerperson"));
        assert!(!pattern.matches("partyXcustomer"));
    }

    #[test]
    fn rejects_malformed_patterns() {
        for bad in ["", "lookup..state", ".lookup", "lookup.state.", "lookup state", "lookup.[a]"] {
            assert!(
                matches!(
                    ShortNamePattern::parse(bad),
                    Err(ArchetypeError::InvalidShortName { .. })
                ),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn concrete_names_reject_wildcards() {
        assert!(validate_short_name("lookup.state").is_ok());
        assert!(validate_short_name("lookup.*").is_err());
    }

    #[test]
    fn overlaps_is_symmetric_for_families() {
        assert!(overlaps("lookup.state", "lookup.state").unwrap());
        assert!(overlaps("lookup.sta*", "lookup.state").unwrap());
        assert!(overlaps("lookup.state", "lookup.sta*").unwrap());
        assert!(!overlaps("lookup.suburb", "lookup.sta*").unwrap());
    }

    proptest! {
        #[test]
        fn literal_names_match_themselves(name in "[a-z]{1,8}(\\.[a-zA-Z0-9_]{1,8}){0,2}") {
            let pattern = ShortNamePattern::parse(&name).unwrap();
            prop_assert!(pattern.matches(&name));
        }

        #[test]
        fn prefix_wildcard_matches_any_suffix(
            prefix in "[a-z]{1,6}\\.",
            suffix in "[a-zA-Z0-9_]{0,8}",
        ) {
            let pattern = ShortNamePattern::parse(&format!("{prefix}*")).unwrap();
            let name = format!("{prefix}{suffix}");
            prop_assert!(pattern.matches(&name));
        }
    }
}
