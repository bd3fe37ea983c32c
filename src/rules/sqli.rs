//! SQL injection signatures

use crate::signature::{Signature, SignatureBuilder};
use anyhow::Result;

pub fn signatures() -> Result<Vec<Signature>> {
    Ok(vec![
        SignatureBuilder::new(20)
            .pattern(r"\bunion\b(?:\s+all)?\s+select\b")
            .description("Detects UNION-based SQL injection")
            .impact(6)
            .tags(&["sqli", "id"])
            .build()?,
        SignatureBuilder::new(21)
            .pattern(r#"['"]\s*(?:or|and)\s+['"]?\w+['"]?\s*=\s*['"]?\w+"#)
            .description("Detects classic boolean SQL injection")
            .impact(5)
            .tags(&["sqli", "id"])
            .build()?,
        SignatureBuilder::new(22)
            .pattern(r#"['"`]\s*(?:;|--|#|/\*)"#)
            .description("Detects quote breaking followed by a statement terminator or comment")
            .impact(4)
            .tags(&["sqli", "id"])
            .build()?,
        SignatureBuilder::new(23)
            .pattern(r";\s*(?:drop|delete|truncate|alter|insert|update|create)\s")
            .description("Detects stacked destructive statements")
            .impact(7)
            .tags(&["sqli", "id"])
            .build()?,
        SignatureBuilder::new(24)
            .pattern(r"\b(?:sleep|benchmark|pg_sleep)\s*\(|\bwaitfor\s+delay\b")
            .description("Detects time-based blind SQL injection")
            .impact(6)
            .tags(&["sqli", "id", "dos"])
            .build()?,
        SignatureBuilder::new(25)
            .pattern(r"\binformation_schema\b|\bsysobjects\b|\bmysql\.user\b")
            .description("Detects database schema probing")
            .impact(5)
            .tags(&["sqli", "id", "lfi"])
            .build()?,
    ])
}
