use crate::domain::context::RequestContext;
use anyhow::Result;
use serde_json::json;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_type: &'static str,
    pub os: &'static str,
    pub client: &'static str,
}

/// Coarse user-agent classification. Enough to keep the fingerprint stable
/// across requests from the same device without storing the raw string.
pub fn parse_user_agent(ua: &str) -> DeviceInfo {
    let lower = ua.to_lowercase();

    let os = if lower.contains("android") {
        "android"
    } else if lower.contains("iphone") || lower.contains("ipad") || lower.contains("ios") {
        "ios"
    } else if lower.contains("windows") {
        "windows"
    } else if lower.contains("mac os") || lower.contains("macintosh") {
        "macos"
    } else if lower.contains("linux") {
        "linux"
    } else {
        "unknown"
    };

    let device_type = match os {
        "android" | "ios" => {
            if lower.contains("ipad") || lower.contains("tablet") {
                "tablet"
            } else {
                "mobile"
            }
        }
        "unknown" => "unknown",
        _ => "desktop",
    };

    // Order matters: Edge and Chrome UAs both carry "safari".
    let client = if lower.contains("edg/") || lower.contains("edge") {
        "edge"
    } else if lower.contains("firefox") {
        "firefox"
    } else if lower.contains("chrome") || lower.contains("crios") {
        "chrome"
    } else if lower.contains("safari") {
        "safari"
    } else if lower.contains("curl") {
        "curl"
    } else {
        "other"
    };

    DeviceInfo { device_type, os, client }
}

/// Stable SHA-256 fingerprint over parsed device fields, the whitelisted
/// header subset and the client IP. Raw identifying data never leaves this
/// function.
pub fn generate(ctx: &RequestContext) -> String {
    let device = parse_user_agent(&ctx.user_agent);
    let canonical = json!({
        "ip": ctx.ip,
        "device": device.device_type,
        "os": device.os,
        "client": device.client,
        "headers": {
            "accept": ctx.accept,
            "language": ctx.accept_language,
            "encoding": ctx.accept_encoding,
        },
    })
    .to_string();

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// Trust in [0,1] accumulated for a fingerprint over time.
#[async_trait::async_trait]
pub trait DeviceTrustProvider: Send + Sync {
    async fn trust_score(&self, fingerprint: &str) -> Result<f64>;
}

/// Cold-start provider: every device gets the same moderate trust until a
/// behavioral history backend is wired in.
pub struct FixedDeviceTrust(pub f64);

impl Default for FixedDeviceTrust {
    fn default() -> Self {
        Self(0.5)
    }
}

#[async_trait::async_trait]
impl DeviceTrustProvider for FixedDeviceTrust {
    async fn trust_score(&self, _fingerprint: &str) -> Result<f64> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(ua: &str, ip: &str) -> RequestContext {
        RequestContext {
            user_agent: ua.to_string(),
            ip: ip.to_string(),
            accept: Some("application/json".to_string()),
            accept_language: Some("en-US".to_string()),
            accept_encoding: Some("gzip".to_string()),
        }
    }

    #[test]
    fn fingerprint_is_stable() {
        let a = generate(&ctx("Mozilla/5.0 (Windows NT 10.0) Chrome/120.0", "203.0.113.9"));
        let b = generate(&ctx("Mozilla/5.0 (Windows NT 10.0) Chrome/120.0", "203.0.113.9"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn fingerprint_changes_with_network_identity() {
        let a = generate(&ctx("curl/8.0", "203.0.113.9"));
        let b = generate(&ctx("curl/8.0", "198.51.100.4"));
        assert_ne!(a, b);
    }

    #[test]
    fn classifies_common_user_agents() {
        let chrome = parse_user_agent(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0 Safari/537.36",
        );
        assert_eq!(chrome.os, "windows");
        assert_eq!(chrome.client, "chrome");
        assert_eq!(chrome.device_type, "desktop");

        let iphone = parse_user_agent("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0) Safari/604.1");
        assert_eq!(iphone.os, "ios");
        assert_eq!(iphone.device_type, "mobile");

        let unknown = parse_user_agent("");
        assert_eq!(unknown.os, "unknown");
        assert_eq!(unknown.device_type, "unknown");
    }
}
