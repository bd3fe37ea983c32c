//! Signature types and builder
//!
//! A signature is an immutable attack-pattern rule: a case-insensitive,
//! multiline regex evaluated against the whole candidate string, plus an
//! impact weight and category tags. Signatures are built once when the
//! catalog loads and shared read-only across request threads.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::SignatureError;

/// Attack-pattern rule with impact weight and category tags
#[derive(Debug, Clone)]
pub struct Signature {
    id: u32,
    pattern: Regex,
    description: String,
    tags: Vec<String>,
    impact: u32,
}

impl Signature {
    /// Compile a signature, failing if the pattern is empty or invalid
    pub fn new(
        id: u32,
        pattern: &str,
        description: &str,
        tags: Vec<String>,
        impact: u32,
    ) -> Result<Self, SignatureError> {
        let pattern = compile_pattern(id, pattern)?;
        Ok(Self {
            id,
            pattern,
            description: description.to_string(),
            tags,
            impact,
        })
    }

    /// Check whether the candidate string matches this signature
    pub fn matches(&self, candidate: &str) -> bool {
        self.pattern.is_match(candidate)
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Raw pattern source, used when compiling the catalog's set matcher
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Category labels such as "xss" or "sqli"
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Severity weight added to an event's impact when this signature matches
    pub fn impact(&self) -> u32 {
        self.impact
    }
}

/// Compile a pattern with the flags every signature uses
pub(crate) fn compile_pattern(id: u32, pattern: &str) -> Result<Regex, SignatureError> {
    if pattern.trim().is_empty() {
        return Err(SignatureError::EmptyPattern { id });
    }

    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(true)
        .dot_matches_new_line(true)
        .build()
        .map_err(|source| SignatureError::InvalidPattern { id, source })
}

/// Plain signature definition as produced by an external catalog loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureDef {
    pub id: u32,
    pub rule: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub impact: u32,
}

impl TryFrom<&SignatureDef> for Signature {
    type Error = SignatureError;

    fn try_from(def: &SignatureDef) -> Result<Self, Self::Error> {
        Signature::new(
            def.id,
            &def.rule,
            &def.description,
            def.tags.clone(),
            def.impact,
        )
    }
}

/// Builder for creating signatures with a fluent API
pub struct SignatureBuilder {
    id: u32,
    pattern: String,
    description: String,
    tags: Vec<String>,
    impact: u32,
}

impl SignatureBuilder {
    /// Create a new builder with the required id
    pub fn new(id: u32) -> Self {
        Self {
            id,
            pattern: String::new(),
            description: String::new(),
            tags: vec![],
            impact: 1,
        }
    }

    /// Set the regex pattern
    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = pattern.to_string();
        self
    }

    /// Set the description
    pub fn description(mut self, desc: &str) -> Self {
        self.description = desc.to_string();
        self
    }

    /// Set the impact weight
    pub fn impact(mut self, impact: u32) -> Self {
        self.impact = impact;
        self
    }

    /// Add a tag
    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    /// Add multiple tags
    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.tags.extend(tags.iter().map(|s| s.to_string()));
        self
    }

    /// Build the signature
    pub fn build(self) -> Result<Signature, SignatureError> {
        Signature::new(
            self.id,
            &self.pattern,
            &self.description,
            self.tags,
            self.impact,
        )
    }
}
