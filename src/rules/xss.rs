//! Cross-site scripting signatures

use crate::signature::{Signature, SignatureBuilder};
use anyhow::Result;

pub fn signatures() -> Result<Vec<Signature>> {
    Ok(vec![
        SignatureBuilder::new(1)
            .pattern(r#"(?:"[^"]*[^-]?>)|(?:[^\w\s]\s*/>)|(?:>")"#)
            .description("Detects html breaking injections including whitespace attacks")
            .impact(4)
            .tags(&["xss", "csrf"])
            .build()?,
        SignatureBuilder::new(2)
            .pattern(r"<\s*script\b")
            .description("Detects opening script tags")
            .impact(6)
            .tags(&["xss", "csrf", "id", "rfe"])
            .build()?,
        SignatureBuilder::new(3)
            .pattern(r"\bon(?:error|load|mouseover|focus|blur|click|submit)\s*=")
            .description("Detects JavaScript event handlers in attributes")
            .impact(5)
            .tags(&["xss", "csrf"])
            .build()?,
        SignatureBuilder::new(4)
            .pattern(r"\b(?:window|document|top|parent|self)\s*\.\s*(?:name|cookie|location|domain)\b")
            .description("Detects access to sensitive DOM properties")
            .impact(5)
            .tags(&["xss", "csrf", "id"])
            .build()?,
        SignatureBuilder::new(5)
            .pattern(r"\b(?:eval|settimeout|setinterval|execscript)\s*\(")
            .description("Detects JavaScript code execution calls")
            .impact(5)
            .tags(&["xss", "csrf", "id", "rfe"])
            .build()?,
        SignatureBuilder::new(6)
            .pattern(r"(?:javascript|vbscript|livescript)\s*:|data\s*:\s*text/html")
            .description("Detects script URI schemes")
            .impact(5)
            .tags(&["xss", "csrf"])
            .build()?,
        SignatureBuilder::new(7)
            .pattern(r"<\s*(?:iframe|object|embed|applet|frameset|base)\b")
            .description("Detects embedded frame and object injection")
            .impact(5)
            .tags(&["xss", "csrf", "rfe"])
            .build()?,
    ])
}
