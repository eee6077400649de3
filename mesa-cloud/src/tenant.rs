//! Subdomain tenant resolution (`<slug>.<BASE_DOMAIN>`)

use http::HeaderMap;

use crate::validation::slug_problem;

/// Host the client addressed: `X-Forwarded-Host` first (proxy), then `Host`
pub fn request_host(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(http::header::HOST))
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Restaurant slug encoded in `host`, if it is a single-label tenant subdomain
pub fn subdomain_slug(host: &str, base_domain: &str) -> Option<String> {
    let host = host.trim().to_ascii_lowercase();
    let host = match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name.to_string(),
        _ => host,
    };
    let label = host.strip_suffix(base_domain)?.strip_suffix('.')?;
    if label.is_empty() || label.contains('.') || slug_problem(label).is_some() {
        return None;
    }
    Some(label.to_string())
}

/// Slug for the current request, if addressed through a tenant subdomain
pub fn tenant_slug(headers: &HeaderMap, base_domain: &str) -> Option<String> {
    request_host(headers).and_then(|host| subdomain_slug(host, base_domain))
}
