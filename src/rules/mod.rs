//! Built-in Signature Set
//!
//! A compact default catalog organized by attack category, so the monitor
//! is usable without an external catalog loader.

pub mod injection;
pub mod sqli;
pub mod xss;

use crate::catalog::SignatureCatalog;
use crate::signature::Signature;
use anyhow::{Context, Result};

/// Load all built-in signatures in catalog order
pub fn default_signatures() -> Result<Vec<Signature>> {
    let mut signatures = Vec::new();

    signatures.extend(xss::signatures().context("Failed to build XSS signatures")?);
    signatures.extend(sqli::signatures().context("Failed to build SQLi signatures")?);
    signatures.extend(injection::signatures().context("Failed to build injection signatures")?);

    Ok(signatures)
}

/// Compile the built-in signatures into a catalog
pub fn default_catalog() -> Result<SignatureCatalog> {
    Ok(SignatureCatalog::new(default_signatures()?))
}

/// Get signatures carrying a tag
pub fn get_signatures_by_tag<'a>(signatures: &'a [Signature], tag: &str) -> Vec<&'a Signature> {
    signatures
        .iter()
        .filter(|s| s.tags().iter().any(|t| t == tag))
        .collect()
}
