//! Candidate normalization seam
//!
//! Decoding and canonicalizing raw values to defeat encoding-based evasion
//! happens upstream. The monitor only needs something that turns a raw value
//! into the candidate string it matches against.

use std::borrow::Cow;

/// Turns a raw parameter value into the candidate that signatures see
pub trait Normalizer: Send + Sync {
    fn normalize<'a>(&self, value: &'a str) -> Cow<'a, str>;
}

/// Matches against the raw value unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Normalizer for Identity {
    fn normalize<'a>(&self, value: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(value)
    }
}

impl<F> Normalizer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn normalize<'a>(&self, value: &'a str) -> Cow<'a, str> {
        Cow::Owned(self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_borrows() {
        let out = Identity.normalize("<script>");
        assert!(matches!(out, Cow::Borrowed("<script>")));
    }

    #[test]
    fn test_closure_normalizer() {
        let collapse = |v: &str| v.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(collapse.normalize("union   \n select"), "union select");
    }
}
