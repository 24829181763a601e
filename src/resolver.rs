//! Short-link resolution for affiliate/shortened AliExpress URLs.
//!
//! Short links (`s.click.aliexpress.com`, `/e/_...`) serve a gateway page
//! that redirects via script or meta refresh instead of an HTTP redirect the
//! proxies would follow. Resolution fetches that page through the resolution
//! proxy chain and pattern-matches the real product URL out of the body.
//! Resolution never fails the pipeline: if nothing matches, the original URL
//! is kept and the fetch proceeds with it.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::network::HttpClient;
use crate::proxy::ResolveBackend;

/// JSON envelope returned by the AllOrigins `/get` endpoint.
#[derive(Debug, Deserialize)]
struct AllOriginsEnvelope {
    contents: Option<String>,
}

/// A redirect-indicating pattern and how to read its match.
struct RedirectPattern {
    regex: Regex,
    /// Take capture group 1; otherwise the whole match is the URL.
    capture: bool,
}

lazy_static! {
    /// Ordered redirect patterns: script navigation first, then meta refresh,
    /// then direct product-URL matches, then JSON redirect fields.
    static ref REDIRECT_PATTERNS: Vec<RedirectPattern> = vec![
        RedirectPattern {
            regex: Regex::new(r#"(?i)window\.location\.href\s*=\s*["']([^"']+)["']"#).expect("invalid script href regex"),
            capture: true,
        },
        RedirectPattern {
            regex: Regex::new(r#"(?i)window\.location\s*=\s*["']([^"']+)["']"#).expect("invalid script location regex"),
            capture: true,
        },
        RedirectPattern {
            regex: Regex::new(r#"(?i)location\.replace\(["']([^"']+)["']\)"#).expect("invalid location.replace regex"),
            capture: true,
        },
        RedirectPattern {
            regex: Regex::new(
                r#"(?i)<meta[^>]*http-equiv=["']refresh["'][^>]*content=["'][^;]*;\s*url=([^"']+)["']"#
            )
            .expect("invalid meta refresh regex"),
            capture: true,
        },
        RedirectPattern {
            regex: Regex::new(r#"(?i)https?://[^/\s"'<>]*aliexpress\.com/item/\d+\.html[^\s"'<>]*"#)
                .expect("invalid item url regex"),
            capture: false,
        },
        RedirectPattern {
            regex: Regex::new(r#"(?i)https?://[^/\s"'<>]*aliexpress\.com/item/[^\s"'<>]+"#).expect("invalid loose item url regex"),
            capture: false,
        },
        RedirectPattern {
            regex: Regex::new(r#"(?i)"redirectUrl"\s*:\s*"([^"]+)""#).expect("invalid redirectUrl regex"),
            capture: true,
        },
    ];
}

/// Whether a URL carries a short-link marker.
pub fn is_short_link(url: &str) -> bool {
    url.contains("s.click.aliexpress.com") || url.contains("/e/_")
}

/// Resolve a shortened link to its canonical product URL.
///
/// Tries each resolution backend in order with a bounded timeout; the first
/// body that yields a redirect candidate wins. Individual backend failures
/// are logged and skipped; if everything fails the input URL is returned.
pub async fn resolve_short_link(client: &HttpClient, url: &str) -> String {
    info!(url = %truncate_for_log(url), "resolving shortened link");

    for backend in ResolveBackend::CHAIN {
        let wrapped = backend.wrap(url);
        let body = match client
            .fetch_text(&wrapped, Config::RESOLVE_TIMEOUT_SECS)
            .await
        {
            Ok(result) => result.content,
            Err(e) => {
                warn!(backend = backend.label(), error = %e, "resolution proxy failed");
                continue;
            }
        };

        let html = if backend.is_envelope() {
            match serde_json::from_str::<AllOriginsEnvelope>(&body) {
                Ok(envelope) => envelope.contents.unwrap_or_default(),
                Err(e) => {
                    warn!(backend = backend.label(), error = %e, "bad proxy envelope");
                    continue;
                }
            }
        } else {
            body
        };

        if let Some(resolved) = find_redirect_target(&html) {
            info!(resolved = %truncate_for_log(&resolved), "short link resolved");
            return resolved;
        }
    }

    warn!("resolution found no candidate, keeping original URL");
    url.to_string()
}

/// Search a body against the ordered redirect patterns; first match wins.
pub fn find_redirect_target(html: &str) -> Option<String> {
    for pattern in REDIRECT_PATTERNS.iter() {
        let Some(m) = pattern.regex.captures(html) else {
            continue;
        };
        let raw = if pattern.capture {
            m.get(1)?.as_str()
        } else {
            m.get(0)?.as_str()
        };
        return Some(normalize_redirect_url(raw));
    }
    None
}

/// Unescape a matched redirect URL and coerce it to absolute https form.
pub fn normalize_redirect_url(raw: &str) -> String {
    let mut url = raw
        .replace("\\u002F", "/")
        .replace("\\/", "/")
        .replace('\\', "")
        .replace("&amp;", "&");

    if !url.starts_with("http") {
        if url.starts_with("//") {
            url = format!("https:{}", url);
        } else {
            url = format!("https://{}", url);
        }
    }
    url
}

fn truncate_for_log(url: &str) -> String {
    url.chars().take(60).collect()
}
