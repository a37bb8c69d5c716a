//! Image rewrite rules.
//!
//! The rule document has two independent lists:
//! - `exclude`: images matching any of these are never rewritten
//! - `replace`: the first matching rule rewrites the image
//!
//! ```yaml
//! exclude:
//!   - prefix: someregistry.org/excluded-namespace
//! replace:
//!   - prefix: docker.io
//!     replacement: registry.example.com/docker.io
//!   - regexp: '^quay\.io/(?P<path>.+)$'
//!     replacement: registry.example.com/quay/${path}
//! ```
//!
//! The document is validated once at startup into an immutable [`Config`].

pub mod pattern;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::image::normalize_image;

pub use pattern::{Pattern, PatternError};

/// Errors for a single rule.
#[derive(Error, Debug)]
pub enum RuleError {
    #[error(transparent)]
    InvalidPattern(#[from] PatternError),

    #[error("replacement must not be empty")]
    EmptyReplacement,
}

/// Which rule list a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Exclusion,
    Replacement,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Exclusion => write!(f, "exclusion"),
            RuleKind::Replacement => write!(f, "replacement"),
        }
    }
}

/// Errors raised while loading the rule document.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("config validation failed: invalid {kind} rule #{index}: {source}")]
    InvalidRule {
        kind: RuleKind,
        index: usize,
        #[source]
        source: RuleError,
    },
}

/// Exclusion rule as written in the document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawExclusionRule {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub regexp: Option<String>,
}

/// Replacement rule as written in the document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawReplacementRule {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub regexp: Option<String>,
    #[serde(default)]
    pub replacement: String,
}

/// The rule document before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    #[serde(default)]
    pub exclude: Vec<RawExclusionRule>,
    #[serde(default)]
    pub replace: Vec<RawReplacementRule>,
}

impl RawConfig {
    /// Compile and check every rule.
    ///
    /// All exclusion rules are checked before any replacement rule; the first
    /// invalid rule is reported with its list and zero-based index.
    pub fn validate(self) -> Result<Config, ConfigError> {
        let exclude = self
            .exclude
            .into_iter()
            .enumerate()
            .map(|(index, rule)| {
                ExclusionRule::try_from(rule).map_err(|source| ConfigError::InvalidRule {
                    kind: RuleKind::Exclusion,
                    index,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let replace = self
            .replace
            .into_iter()
            .enumerate()
            .map(|(index, rule)| {
                ReplacementRule::try_from(rule).map_err(|source| ConfigError::InvalidRule {
                    kind: RuleKind::Replacement,
                    index,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Config { exclude, replace })
    }
}

/// An image pattern that vetoes any replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionRule {
    pub pattern: Pattern,
}

impl TryFrom<RawExclusionRule> for ExclusionRule {
    type Error = RuleError;

    fn try_from(raw: RawExclusionRule) -> Result<Self, Self::Error> {
        let pattern = Pattern::from_parts(raw.prefix.as_deref(), raw.regexp.as_deref())?;
        Ok(Self { pattern })
    }
}

/// An image pattern with the replacement applied on match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementRule {
    pub pattern: Pattern,
    pub replacement: String,
}

impl ReplacementRule {
    /// Create a replacement rule, rejecting an empty replacement.
    pub fn new(pattern: Pattern, replacement: impl Into<String>) -> Result<Self, RuleError> {
        let replacement = replacement.into();
        if replacement.is_empty() {
            return Err(RuleError::EmptyReplacement);
        }
        Ok(Self {
            pattern,
            replacement,
        })
    }
}

impl TryFrom<RawReplacementRule> for ReplacementRule {
    type Error = RuleError;

    fn try_from(raw: RawReplacementRule) -> Result<Self, Self::Error> {
        let pattern = Pattern::from_parts(raw.prefix.as_deref(), raw.regexp.as_deref())?;
        Self::new(pattern, raw.replacement)
    }
}

/// Outcome of evaluating the rules against one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The normalized image matched the exclusion rule at this index.
    Excluded { rule: usize },
    /// The replacement rule at this index matched and produced `image`.
    Replaced { rule: usize, image: String },
    /// No rule matched.
    Unchanged,
}

/// Validated, immutable rule set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    exclude: Vec<ExclusionRule>,
    replace: Vec<ReplacementRule>,
}

impl Config {
    /// Create a rule set from already validated rules.
    pub fn new(exclude: Vec<ExclusionRule>, replace: Vec<ReplacementRule>) -> Self {
        Self { exclude, replace }
    }

    /// Parse and validate a YAML (or JSON) rule document.
    pub fn from_yaml(document: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(document)?;
        raw.validate()
    }

    /// Read, parse and validate the rule document at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading configuration");

        let document = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&document)
    }

    pub fn exclusions(&self) -> &[ExclusionRule] {
        &self.exclude
    }

    pub fn replacements(&self) -> &[ReplacementRule] {
        &self.replace
    }

    /// True when no rules are configured.
    pub fn is_empty(&self) -> bool {
        self.exclude.is_empty() && self.replace.is_empty()
    }

    /// Decide what happens to `image`.
    ///
    /// Matching happens on the normalized image. Exclusions win over
    /// replacements; among replacements the first match wins.
    pub fn decide(&self, image: &str) -> Decision {
        let normalized = normalize_image(image);

        if let Some(rule) = self
            .exclude
            .iter()
            .position(|rule| rule.pattern.matches(&normalized))
        {
            return Decision::Excluded { rule };
        }

        self.replace
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.pattern.matches(&normalized))
            .map(|(index, rule)| Decision::Replaced {
                rule: index,
                image: rule.pattern.substitute(&normalized, &rule.replacement),
            })
            .unwrap_or(Decision::Unchanged)
    }

    /// Return the rewritten image, or the original (unnormalized) image when
    /// it is excluded or no replacement matches.
    pub fn evaluate(&self, image: &str) -> String {
        match self.decide(image) {
            Decision::Replaced { image, .. } => image,
            Decision::Excluded { .. } | Decision::Unchanged => image.to_string(),
        }
    }
}
