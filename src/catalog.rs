//! Signature catalog and match evaluation
//!
//! The catalog is compiled once and shared read-only across requests. All
//! patterns are compiled into a single `RegexSet` so one pass over the
//! candidate reports every matching signature; when the set cannot be built
//! (for example it exceeds the regex size limit) evaluation falls back to
//! testing each signature in turn. Both paths return matches in catalog
//! order and never stop at the first hit.

use regex::{RegexSet, RegexSetBuilder};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::signature::{Signature, SignatureDef};

/// Evaluate every signature against a candidate, in order
///
/// This is the reference evaluation: no short-circuiting, so impact and tag
/// aggregation see every contributing rule.
pub fn evaluate(candidate: &str, signatures: &[Arc<Signature>]) -> Vec<Arc<Signature>> {
    signatures
        .iter()
        .filter(|sig| sig.matches(candidate))
        .cloned()
        .collect()
}

/// Compiled, immutable set of signatures
pub struct SignatureCatalog {
    signatures: Vec<Arc<Signature>>,
    /// One-pass matcher over all patterns; `None` means sequential evaluation
    set: Option<RegexSet>,
}

impl SignatureCatalog {
    /// Build a catalog from already-compiled signatures
    pub fn new(signatures: Vec<Signature>) -> Self {
        let signatures: Vec<Arc<Signature>> = signatures.into_iter().map(Arc::new).collect();
        let set = Self::compile_set(&signatures);

        info!(
            signatures = signatures.len(),
            set_matcher = set.is_some(),
            "Signature catalog compiled"
        );

        Self { signatures, set }
    }

    /// Materialize definitions from an external loader
    ///
    /// Definitions whose pattern does not compile are skipped and logged;
    /// they never enter the active set.
    pub fn from_defs(defs: &[SignatureDef]) -> Self {
        let mut signatures = Vec::with_capacity(defs.len());

        for def in defs {
            match Signature::try_from(def) {
                Ok(sig) => signatures.push(sig),
                Err(e) => {
                    warn!(signature_id = def.id, error = %e, "Rejected signature definition");
                }
            }
        }

        Self::new(signatures)
    }

    fn compile_set(signatures: &[Arc<Signature>]) -> Option<RegexSet> {
        if signatures.is_empty() {
            return None;
        }

        let result = RegexSetBuilder::new(signatures.iter().map(|s| s.pattern()))
            .case_insensitive(true)
            .multi_line(true)
            .dot_matches_new_line(true)
            .build();

        match result {
            Ok(set) => Some(set),
            Err(e) => {
                warn!(
                    error = %e,
                    "Failed to compile signature set, falling back to sequential matching"
                );
                None
            }
        }
    }

    /// Return every signature matching the candidate, in catalog order
    pub fn evaluate(&self, candidate: &str) -> Vec<Arc<Signature>> {
        let matched: Vec<Arc<Signature>> = match &self.set {
            Some(set) => set
                .matches(candidate)
                .into_iter()
                .map(|idx| Arc::clone(&self.signatures[idx]))
                .collect(),
            None => evaluate(candidate, &self.signatures),
        };

        if !matched.is_empty() {
            debug!(
                matched = matched.len(),
                candidate_len = candidate.len(),
                "Signatures matched"
            );
        }

        matched
    }

    /// All active signatures in catalog order
    pub fn signatures(&self) -> &[Arc<Signature>] {
        &self.signatures
    }

    pub fn get(&self, id: u32) -> Option<&Arc<Signature>> {
        self.signatures.iter().find(|s| s.id() == id)
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Whether the one-pass set matcher is in use
    pub fn uses_set_matcher(&self) -> bool {
        self.set.is_some()
    }
}

impl FromIterator<Signature> for SignatureCatalog {
    fn from_iter<I: IntoIterator<Item = Signature>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
