//! Session cookie handling with environment-aware attributes.
//!
//! Localhost gets a host-only, non-Secure cookie; everywhere else the cookie
//! is Secure and scoped to the shared root domain so one session is valid
//! across subdomains. Logout clears the current and the legacy cookie name,
//! whichever scheme issued the session.

use axum::http::{
    header::{InvalidHeaderValue, AUTHORIZATION, COOKIE, HOST},
    HeaderMap, HeaderValue,
};

use super::state::AuthConfig;

pub(crate) const SESSION_COOKIE_NAME: &str = "session_token";
/// Cookie name used by the previous session scheme; still cleared on logout.
pub(crate) const LEGACY_SESSION_COOKIE_NAME: &str = "auth-token";

/// Host from the request, port stripped. Falls back to the configured base
/// URL when the header is missing or unreadable.
pub(crate) fn request_host(headers: &HeaderMap, config: &AuthConfig) -> String {
    headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .map(strip_port)
        .filter(|host| !host.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            url::Url::parse(config.base_url())
                .ok()
                .and_then(|url| url.host_str().map(str::to_string))
                .unwrap_or_else(|| "localhost".to_string())
        })
}

fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 hosts keep their brackets; only the trailing :port goes.
    if let Some(end) = host.rfind(']') {
        return &host[..=end];
    }
    host.split(':').next().unwrap_or(host)
}

pub(crate) fn is_localhost(host: &str) -> bool {
    host == "localhost"
        || host == "127.0.0.1"
        || host == "[::1]"
        || host.ends_with(".localhost")
}

/// Build the session cookie for this request's host.
pub(crate) fn session_cookie(
    config: &AuthConfig,
    host: &str,
    token: &str,
    max_age_seconds: i64,
) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&cookie_value(
        config,
        host,
        SESSION_COOKIE_NAME,
        token,
        max_age_seconds,
    ))
}

/// Expire both the current and the legacy cookie under the same domain rule.
pub(crate) fn clear_session_cookies(config: &AuthConfig, host: &str) -> Vec<HeaderValue> {
    [SESSION_COOKIE_NAME, LEGACY_SESSION_COOKIE_NAME]
        .iter()
        .filter_map(|name| HeaderValue::from_str(&cookie_value(config, host, name, "", 0)).ok())
        .collect()
}

fn cookie_value(
    config: &AuthConfig,
    host: &str,
    name: &str,
    value: &str,
    max_age_seconds: i64,
) -> String {
    let mut cookie =
        format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}");
    if !is_localhost(host) {
        if let Some(domain) = config.cookie_domain() {
            cookie.push_str("; Domain=");
            cookie.push_str(domain);
        }
        cookie.push_str("; Secure");
    }
    cookie
}

/// Pull the session token from a Bearer header or the session cookie.
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
