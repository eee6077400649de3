//! XSS input sanitization
//!
//! Rewrites the query string and JSON request bodies before they reach the
//! extractors. Every string (object keys included) is HTML-entity escaped;
//! the restaurant and location variants additionally strip script blocks,
//! `javascript:` schemes and inline event handlers from known name, URL and
//! address fields. Path parameters are typed or slug-validated by handlers.

use std::sync::LazyLock;

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::uri::{PathAndQuery, Uri};
use axum::middleware::Next;
use axum::response::Response;
use http_body_util::LengthLimitError;
use regex::Regex;
use serde_json::{Map, Value};
use shared::error::{AppError, ErrorCode};

/// Largest JSON body the sanitizer will buffer
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid script regex")
});
static JAVASCRIPT_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript\s*:").expect("valid scheme regex"));
static EVENT_HANDLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bon[a-z]+\s*=").expect("valid handler regex"));

const NAME_FIELDS: &[&str] = &[
    "name",
    "restaurant_name",
    "business_name",
    "first_name",
    "last_name",
    "owner_name",
    "cardholder_name",
];
const URL_FIELDS: &[&str] = &["website", "logo_url", "favicon_url", "image_url", "url"];
const ADDRESS_FIELDS: &[&str] = &["address", "city", "state", "zip_code", "country"];

// ── String sanitizers ──

/// HTML entity escape: `& < > " ' /`
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverse of [`escape_html`] for values stored escaped and used outside HTML
pub fn unescape_html(input: &str) -> String {
    input
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#x2F;", "/")
        .replace("&amp;", "&")
}

fn strip_active_content(input: &str) -> String {
    let without_scripts = SCRIPT_BLOCK.replace_all(input, "");
    let without_scheme = JAVASCRIPT_SCHEME.replace_all(&without_scripts, "");
    EVENT_HANDLER.replace_all(&without_scheme, "").into_owned()
}

/// Person and business names
pub fn sanitize_name(input: &str) -> String {
    let stripped = strip_active_content(input);
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    escape_html(&collapsed)
}

/// Website, logo and image URLs
pub fn sanitize_url(input: &str) -> String {
    let stripped = strip_active_content(input);
    let compact: String = stripped.chars().filter(|c| !c.is_whitespace()).collect();
    escape_html(&compact)
}

/// Street, city, state, postal code, country
pub fn sanitize_address(input: &str) -> String {
    escape_html(strip_active_content(input).trim())
}

// ── JSON walkers ──

/// Escape every string in the value, object keys included
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(escape_html(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (escape_html(&k), sanitize_value(v)))
                .collect(),
        ),
        other => other,
    }
}

type FieldSanitizer = fn(&str) -> Option<fn(&str) -> String>;

fn restaurant_field(key: &str) -> Option<fn(&str) -> String> {
    if NAME_FIELDS.contains(&key) {
        Some(sanitize_name)
    } else if URL_FIELDS.contains(&key) {
        Some(sanitize_url)
    } else if ADDRESS_FIELDS.contains(&key) {
        Some(sanitize_address)
    } else {
        None
    }
}

fn location_field(key: &str) -> Option<fn(&str) -> String> {
    if NAME_FIELDS.contains(&key) {
        Some(sanitize_name)
    } else if ADDRESS_FIELDS.contains(&key) {
        Some(sanitize_address)
    } else {
        None
    }
}

fn sanitize_fields(value: Value, route: FieldSanitizer) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, v) in map {
                let v = match (v, route(&key)) {
                    (Value::String(s), Some(sanitizer)) => Value::String(sanitizer(&s)),
                    (v, _) => sanitize_fields(v, route),
                };
                out.insert(escape_html(&key), v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|v| sanitize_fields(v, route))
                .collect(),
        ),
        Value::String(s) => Value::String(escape_html(&s)),
        other => other,
    }
}

/// Registration and profile payloads
pub fn sanitize_restaurant_value(value: Value) -> Value {
    sanitize_fields(value, restaurant_field)
}

/// Location payloads
pub fn sanitize_location_value(value: Value) -> Value {
    sanitize_fields(value, location_field)
}

// ── Request rewriting ──

fn sanitize_query(uri: &Uri) -> Result<Option<Uri>, AppError> {
    let Some(query) = uri.query() else {
        return Ok(None);
    };
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
        .map_err(|e| AppError::with_message(ErrorCode::InvalidRequest, e.to_string()))?;
    let cleaned: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| (escape_html(k), escape_html(v)))
        .collect();
    if cleaned == pairs {
        return Ok(None);
    }

    let encoded = serde_urlencoded::to_string(&cleaned)
        .map_err(|e| AppError::internal(format!("query re-encoding failed: {e}")))?;
    let path_and_query = PathAndQuery::try_from(format!("{}?{}", uri.path(), encoded))
        .map_err(|e| AppError::invalid_request(e.to_string()))?;
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query);
    Uri::from_parts(parts)
        .map(Some)
        .map_err(|e| AppError::invalid_request(e.to_string()))
}

fn is_json(req: &Request) -> bool {
    req.headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| {
            ct.split(';')
                .next()
                .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        })
}

async fn read_body(body: Body) -> Result<Bytes, AppError> {
    axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| {
            let inner = e.into_inner();
            if inner.downcast_ref::<LengthLimitError>().is_some() {
                AppError::new(ErrorCode::PayloadTooLarge)
            } else {
                AppError::invalid_request(format!("Failed to read request body: {inner}"))
            }
        })
}

async fn sanitize_request(
    req: Request,
    sanitizer: fn(Value) -> Value,
) -> Result<Request, AppError> {
    let (mut parts, body) = req.into_parts();

    if let Some(uri) = sanitize_query(&parts.uri)? {
        parts.uri = uri;
    }

    let req = Request::from_parts(parts, body);
    if !is_json(&req) {
        return Ok(req);
    }

    let (mut parts, body) = req.into_parts();
    let bytes = read_body(body).await?;
    if bytes.is_empty() {
        return Ok(Request::from_parts(parts, Body::from(bytes)));
    }

    // Not JSON: leave it for the extractor to reject
    let Ok(value) = serde_json::from_slice::<Value>(&bytes) else {
        return Ok(Request::from_parts(parts, Body::from(bytes)));
    };

    let cleaned = serde_json::to_vec(&sanitizer(value))
        .map_err(|e| AppError::internal(format!("body re-encoding failed: {e}")))?;
    parts.headers.remove(http::header::CONTENT_LENGTH);
    Ok(Request::from_parts(parts, Body::from(cleaned)))
}

/// Generic sanitizer for most route groups
pub async fn sanitize_input(req: Request, next: Next) -> Result<Response, AppError> {
    let req = sanitize_request(req, sanitize_value).await?;
    Ok(next.run(req).await)
}

/// Restaurant registration and profile routes
pub async fn sanitize_restaurant_input(req: Request, next: Next) -> Result<Response, AppError> {
    let req = sanitize_request(req, sanitize_restaurant_value).await?;
    Ok(next.run(req).await)
}

/// Location routes
pub async fn sanitize_location_input(req: Request, next: Next) -> Result<Response, AppError> {
    let req = sanitize_request(req, sanitize_location_value).await?;
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("Test <script>alert(1)</script>"),
            "Test &lt;script&gt;alert(1)&lt;&#x2F;script&gt;"
        );
        assert_eq!(escape_html(r#"a & "b" 'c'"#), "a &amp; &quot;b&quot; &#x27;c&#x27;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_unescape_reverses_escape() {
        let url = "https://cdn.example.com/f.ico?a=1&b='x'";
        assert_eq!(unescape_html(&escape_html(url)), url);
        assert_eq!(unescape_html("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_escaped_output_has_no_markup() {
        for payload in [
            "<script>alert('x')</script>",
            "\"><img src=x onerror=alert(1)>",
            "</textarea><svg/onload=alert(1)>",
        ] {
            let out = escape_html(payload);
            assert!(!out.contains(['<', '>', '"', '\'', '/']), "{out}");
        }
    }

    #[test]
    fn test_strict_sanitizers() {
        assert_eq!(
            sanitize_name("  Chez <SCRIPT type=\"x\">evil()</script >Marie  "),
            "Chez Marie"
        );
        assert_eq!(sanitize_url("javascript:alert(1)"), "alert(1)");
        assert_eq!(
            sanitize_url(" https://example.com/logo.png "),
            "https:&#x2F;&#x2F;example.com&#x2F;logo.png"
        );
        assert_eq!(sanitize_address("1 Main St onclick=steal()"), "1 Main St steal()");
    }

    #[test]
    fn test_sanitize_value_recurses() {
        let value = json!({
            "<k>": "<v>",
            "list": ["a/b", 1, true, null],
            "nested": { "n": 2.5 }
        });
        assert_eq!(
            sanitize_value(value),
            json!({
                "&lt;k&gt;": "&lt;v&gt;",
                "list": ["a&#x2F;b", 1, true, null],
                "nested": { "n": 2.5 }
            })
        );
    }

    #[test]
    fn test_restaurant_routing() {
        let value = json!({
            "restaurant": {
                "name": "Bistro <script>x()</script>",
                "website": "javascript:alert(1)",
                "description": "<b>Fresh</b>"
            },
            "locations": [{ "city": " Lyon <script>x</script>", "phone": "<1>" }]
        });
        let out = sanitize_restaurant_value(value);
        assert_eq!(out["restaurant"]["name"], "Bistro");
        assert_eq!(out["restaurant"]["website"], "alert(1)");
        assert_eq!(out["restaurant"]["description"], "&lt;b&gt;Fresh&lt;&#x2F;b&gt;");
        assert_eq!(out["locations"][0]["city"], "Lyon");
        assert_eq!(out["locations"][0]["phone"], "&lt;1&gt;");
    }

    #[test]
    fn test_location_routing_leaves_urls_generic() {
        let out = sanitize_location_value(json!({
            "name": "<script>1</script>Downtown",
            "url": "a/b"
        }));
        assert_eq!(out["name"], "Downtown");
        assert_eq!(out["url"], "a&#x2F;b");
    }

    #[test]
    fn test_query_rewrite() {
        let uri: Uri = "/api/v1/menu/items?language=%3Cen%3E&available=true".parse().unwrap();
        let rewritten = sanitize_query(&uri).unwrap().unwrap();
        assert_eq!(rewritten.path(), "/api/v1/menu/items");
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(rewritten.query().unwrap()).unwrap();
        assert_eq!(pairs[0], ("language".into(), "&lt;en&gt;".into()));

        let clean: Uri = "/api/v1/menu/items?language=en".parse().unwrap();
        assert!(sanitize_query(&clean).unwrap().is_none());
    }

    async fn body_of(req: Request) -> Bytes {
        axum::body::to_bytes(req.into_body(), usize::MAX).await.unwrap()
    }

    fn json_request(body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/api/v1/test/xss")
            .header("content-type", "application/json; charset=utf-8")
            .header("content-length", body.len())
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_json_body_rewritten() {
        let req = sanitize_request(json_request(r#"{"name":"<b>"}"#), sanitize_value)
            .await
            .unwrap();
        assert!(req.headers().get(http::header::CONTENT_LENGTH).is_none());
        let value: Value = serde_json::from_slice(&body_of(req).await).unwrap();
        assert_eq!(value, json!({ "name": "&lt;b&gt;" }));
    }

    #[tokio::test]
    async fn test_invalid_json_passes_through() {
        let req = sanitize_request(json_request("{not json"), sanitize_value)
            .await
            .unwrap();
        assert_eq!(&body_of(req).await[..], b"{not json");
    }

    #[tokio::test]
    async fn test_non_json_body_untouched() {
        let req = Request::builder()
            .method("POST")
            .uri("/x")
            .header("content-type", "text/plain")
            .body(Body::from("<b>"))
            .unwrap();
        let req = sanitize_request(req, sanitize_value).await.unwrap();
        assert_eq!(&body_of(req).await[..], b"<b>");
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let big = vec![b' '; MAX_BODY_BYTES + 1];
        let req = Request::builder()
            .method("POST")
            .uri("/x")
            .header("content-type", "application/json")
            .body(Body::from(big))
            .unwrap();
        let err = sanitize_request(req, sanitize_value).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PayloadTooLarge);
    }
}
