//! The single backend origin every request is forwarded to.

use std::fmt;
use url::Url;

/// Backend base URL, normalized to end with `/` so endpoint paths resolve
/// beneath it (`http://host/base` + `api/x` → `http://host/base/api/x`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendOrigin {
    base: Url,
}

impl BackendOrigin {
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        let base = Url::parse(&format!("{}/", raw.trim_end_matches('/')))?;
        Ok(Self { base })
    }

    /// Resolve `path` beneath the origin. Leading slashes are ignored, and the
    /// path is always treated as relative, so it cannot switch host or scheme.
    pub fn join(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base.join(&format!("./{}", path.trim_start_matches('/')))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }
}

impl fmt::Display for BackendOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base.as_str().trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_endpoint() {
        let origin = BackendOrigin::parse("http://10.1.1.1:3010").unwrap();
        assert_eq!(
            origin.join("api/messages/send").unwrap().as_str(),
            "http://10.1.1.1:3010/api/messages/send"
        );
        assert_eq!(origin.join("/").unwrap().as_str(), "http://10.1.1.1:3010/");
        assert_eq!(origin.join("").unwrap().as_str(), "http://10.1.1.1:3010/");
    }

    #[test]
    fn test_join_keeps_base_path() {
        let origin = BackendOrigin::parse("https://gw.example.com/wa/").unwrap();
        assert_eq!(
            origin.join("/api/session/send-message").unwrap().as_str(),
            "https://gw.example.com/wa/api/session/send-message"
        );
        assert_eq!(origin.to_string(), "https://gw.example.com/wa");
    }

    #[test]
    fn test_join_never_leaves_origin() {
        let origin = BackendOrigin::parse("http://backend:3010").unwrap();
        assert_eq!(
            origin.join("//evil.example/x").unwrap().as_str(),
            "http://backend:3010/evil.example/x"
        );
        assert_eq!(
            origin.join("/mailto:someone").unwrap().host_str(),
            Some("backend")
        );
    }
}
