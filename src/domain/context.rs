use axum::http::HeaderMap;

/// Request attributes consumed by fraud evaluation: the client network
/// identity plus the header subset that feeds device fingerprinting.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user_agent: String,
    pub ip: String,
    pub accept: Option<String>,
    pub accept_language: Option<String>,
    pub accept_encoding: Option<String>,
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|h| h.to_str().ok()).map(str::to_string)
}

pub fn build_context(headers: &HeaderMap) -> RequestContext {
    // First hop of x-forwarded-for is the client.
    let ip = header(headers, "x-forwarded-for")
        .map(|v| v.split(',').next().unwrap_or("").trim().to_string())
        .unwrap_or_default();

    RequestContext {
        user_agent: header(headers, "user-agent").unwrap_or_default(),
        ip,
        accept: header(headers, "accept"),
        accept_language: header(headers, "accept-language"),
        accept_encoding: header(headers, "accept-encoding"),
    }
}
