//! Match patterns shared by exclusion and replacement rules.
//!
//! A pattern is either a literal prefix or a regular expression. The two
//! kinds intentionally differ in how they substitute:
//! - `Prefix` matches only at the start of the image but replaces the first
//!   occurrence of the prefix text, using the replacement verbatim
//! - `Regex` matches anywhere and replaces every match, expanding capture
//!   group references such as `${name}` in the replacement

use std::fmt;

use regex::Regex;
use thiserror::Error;

/// Errors raised while building a pattern from its document form.
#[derive(Error, Debug)]
pub enum PatternError {
    #[error("one of `prefix` and `regexp` must be non-empty")]
    Missing,

    #[error("only one of `prefix` and `regexp` must be set")]
    Ambiguous,

    #[error("error parsing regexp: {0}")]
    Regex(#[from] regex::Error),
}

/// A compiled image match pattern.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Literal prefix, matched with `starts_with`.
    Prefix(String),
    /// Regular expression, matched with an unanchored search.
    Regex(Regex),
}

impl Pattern {
    /// Build a pattern from the two optional document fields.
    ///
    /// Empty strings count as unset. Exactly one of `prefix` and `regexp`
    /// must remain.
    pub fn from_parts(prefix: Option<&str>, regexp: Option<&str>) -> Result<Self, PatternError> {
        let prefix = prefix.filter(|p| !p.is_empty());
        let regexp = regexp.filter(|r| !r.is_empty());

        match (prefix, regexp) {
            (None, None) => Err(PatternError::Missing),
            (Some(_), Some(_)) => Err(PatternError::Ambiguous),
            (Some(prefix), None) => Ok(Pattern::Prefix(prefix.to_string())),
            (None, Some(expr)) => Ok(Pattern::Regex(Regex::new(expr)?)),
        }
    }

    /// Shorthand for a prefix pattern.
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Pattern::Prefix(prefix.into())
    }

    /// Compile a regex pattern.
    pub fn regex(expr: &str) -> Result<Self, PatternError> {
        Ok(Pattern::Regex(Regex::new(expr)?))
    }

    /// Check whether the pattern matches the image.
    pub fn matches(&self, image: &str) -> bool {
        match self {
            Pattern::Prefix(prefix) => image.starts_with(prefix.as_str()),
            Pattern::Regex(re) => re.is_match(image),
        }
    }

    /// Substitute `template` into `image` without checking for a match first.
    ///
    /// Prefix patterns replace the first occurrence of the prefix anywhere in
    /// the image, which is position 0 whenever [`Pattern::matches`] holds.
    pub fn substitute(&self, image: &str, template: &str) -> String {
        match self {
            Pattern::Prefix(prefix) => image.replacen(prefix.as_str(), template, 1),
            Pattern::Regex(re) => re.replace_all(image, template).into_owned(),
        }
    }

    /// Substitute `template` if the pattern matches, otherwise return the
    /// image unchanged.
    pub fn replace_image(&self, image: &str, template: &str) -> String {
        if self.matches(image) {
            self.substitute(image, template)
        } else {
            image.to_string()
        }
    }

    /// The source text of the pattern.
    pub fn as_str(&self) -> &str {
        match self {
            Pattern::Prefix(prefix) => prefix,
            Pattern::Regex(re) => re.as_str(),
        }
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Pattern::Prefix(a), Pattern::Prefix(b)) => a == b,
            (Pattern::Regex(a), Pattern::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl Eq for Pattern {}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Prefix(prefix) => write!(f, "prefix {:?}", prefix),
            Pattern::Regex(re) => write!(f, "regexp {:?}", re.as_str()),
        }
    }
}
