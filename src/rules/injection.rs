//! Traversal, file inclusion and command injection signatures

use crate::signature::{Signature, SignatureBuilder};
use anyhow::Result;

pub fn signatures() -> Result<Vec<Signature>> {
    Ok(vec![
        SignatureBuilder::new(40)
            .pattern(r"(?:\.\.[/\\]){2,}|(?:%2e%2e(?:%2f|%5c)){2,}")
            .description("Detects directory traversal")
            .impact(5)
            .tags(&["dt", "id", "lfi"])
            .build()?,
        SignatureBuilder::new(41)
            .pattern(r"/etc/(?:passwd|shadow|hosts)\b|\bboot\.ini\b|\bwin\.ini\b")
            .description("Detects access to well-known system files")
            .impact(5)
            .tags(&["dt", "id", "lfi"])
            .build()?,
        SignatureBuilder::new(42)
            .pattern(r"[;&|`]\s*(?:cat|ls|id|whoami|uname|wget|curl|nc|bash|sh)(?:\s|$)")
            .description("Detects shell command injection")
            .impact(6)
            .tags(&["id", "rfe", "lfi"])
            .build()?,
        SignatureBuilder::new(43)
            .pattern(r"\b(?:php|zlib|glob|phar|expect|file)://")
            .description("Detects stream wrapper based file inclusion")
            .impact(5)
            .tags(&["rfe", "lfi"])
            .build()?,
        SignatureBuilder::new(44)
            .pattern(r"%00|\x00|%0d%0a")
            .description("Detects null byte and CRLF injection")
            .impact(4)
            .tags(&["id", "lfi"])
            .build()?,
    ])
}
