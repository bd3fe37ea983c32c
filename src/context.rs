//! Request metadata used when recording a report
//!
//! Transports do not always expose the request path or the server address
//! directly. `resolve` fills them in from whatever is available and never
//! fails; missing values degrade to placeholders.

use serde::{Deserialize, Serialize};

/// Placeholder for an unknown originating address
pub const UNKNOWN_ADDRESS: &str = "local/unknown";

/// Raw request metadata as seen by the host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RequestContext {
    /// Peer address of the connection
    #[serde(default)]
    pub remote_addr: Option<String>,
    /// Value of the X-Forwarded-For header
    #[serde(default)]
    pub forwarded_for: Option<String>,
    /// Full request URI, when the transport provides it
    #[serde(default)]
    pub request_uri: Option<String>,
    /// Path of the handling script, used to rebuild the URI
    #[serde(default)]
    pub script_name: Option<String>,
    #[serde(default)]
    pub query_string: Option<String>,
    #[serde(default)]
    pub server_addr: Option<String>,
    /// Local address of the accepting socket; preferred over `server_addr`
    #[serde(default)]
    pub local_addr: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remote_addr(mut self, addr: &str) -> Self {
        self.remote_addr = Some(addr.to_string());
        self
    }

    pub fn with_forwarded_for(mut self, addr: &str) -> Self {
        self.forwarded_for = Some(addr.to_string());
        self
    }

    pub fn with_request_uri(mut self, uri: &str) -> Self {
        self.request_uri = Some(uri.to_string());
        self
    }

    pub fn with_script(mut self, script_name: &str, query_string: Option<&str>) -> Self {
        self.script_name = Some(script_name.to_string());
        self.query_string = query_string.map(str::to_string);
        self
    }

    pub fn with_server_addr(mut self, addr: &str) -> Self {
        self.server_addr = Some(addr.to_string());
        self
    }

    pub fn with_local_addr(mut self, addr: &str) -> Self {
        self.local_addr = Some(addr.to_string());
        self
    }

    /// Resolve effective path and addresses
    pub fn resolve(&self) -> ResolvedRequest {
        let path = match non_empty(&self.request_uri) {
            Some(uri) => uri.to_string(),
            None => {
                let mut path = non_empty(&self.script_name)
                    .map(|s| s.trim_start_matches('/').to_string())
                    .unwrap_or_default();
                if let Some(query) = non_empty(&self.query_string) {
                    path.push('?');
                    path.push_str(query);
                }
                path
            }
        };

        let server_addr = non_empty(&self.local_addr)
            .or_else(|| non_empty(&self.server_addr))
            .unwrap_or_default()
            .to_string();

        ResolvedRequest {
            remote_addr: non_empty(&self.remote_addr)
                .unwrap_or(UNKNOWN_ADDRESS)
                .to_string(),
            forwarded_for: non_empty(&self.forwarded_for).map(str::to_string),
            path,
            server_addr,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Request metadata after pre-flight resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRequest {
    pub remote_addr: String,
    pub forwarded_for: Option<String>,
    pub path: String,
    pub server_addr: String,
}

impl ResolvedRequest {
    /// Originating address with the forwarded address in parentheses
    pub fn origin(&self) -> String {
        match &self.forwarded_for {
            Some(fwd) => format!("{} ({})", self.remote_addr, fwd),
            None => self.remote_addr.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uri_wins() {
        let resolved = RequestContext::new()
            .with_request_uri("/search?q=1")
            .with_script("/index.php", Some("pg=home"))
            .resolve();
        assert_eq!(resolved.path, "/search?q=1");
    }

    #[test]
    fn test_path_rebuilt_from_script_and_query() {
        let resolved = RequestContext::new()
            .with_script("/index.php", Some("test=1"))
            .resolve();
        assert_eq!(resolved.path, "index.php?test=1");

        let resolved = RequestContext::new()
            .with_script("/index.php", Some(""))
            .resolve();
        assert_eq!(resolved.path, "index.php");
    }

    #[test]
    fn test_local_addr_preferred() {
        let resolved = RequestContext::new()
            .with_server_addr("10.0.0.1")
            .with_local_addr("192.168.0.10")
            .resolve();
        assert_eq!(resolved.server_addr, "192.168.0.10");

        let resolved = RequestContext::new().with_server_addr("10.0.0.1").resolve();
        assert_eq!(resolved.server_addr, "10.0.0.1");
    }

    #[test]
    fn test_missing_metadata_never_fails() {
        let resolved = RequestContext::new().resolve();
        assert_eq!(resolved.remote_addr, UNKNOWN_ADDRESS);
        assert_eq!(resolved.path, "");
        assert_eq!(resolved.server_addr, "");
        assert_eq!(resolved.origin(), UNKNOWN_ADDRESS);
    }

    #[test]
    fn test_origin_with_forwarded() {
        let resolved = RequestContext::new()
            .with_remote_addr("203.0.113.9")
            .with_forwarded_for("198.51.100.7")
            .resolve();
        assert_eq!(resolved.origin(), "203.0.113.9 (198.51.100.7)");
    }
}
