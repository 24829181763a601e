//! Page-content fetching through the CORS proxy chain.
//!
//! Backends are tried strictly in order; a failure (bad status, timeout,
//! too-short body) advances to the next one and the last failure propagates
//! when the chain is exhausted. Short non-product responses are treated as
//! gateway pages: if they carry an embedded redirect and this is the first
//! hop, the fetch restarts once against the resolved URL.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::config::Config;
use crate::network::{FetchError, HttpClient};
use crate::proxy::ContentBackend;
use crate::resolver;

/// Markers whose presence identifies a real product page.
const PRODUCT_PAGE_MARKERS: [&str; 3] = [r#"itemprop="name""#, "product-title", "og:title"];

lazy_static! {
    /// Gateway redirect patterns beyond the shared script/meta set: bare
    /// `url=` attributes and anchors pointing at a product URL.
    static ref GATEWAY_URL_ATTR: Regex =
        Regex::new(r#"(?i)url=([^"']+)["']"#).expect("invalid url attr regex");
    static ref GATEWAY_ANCHOR: Regex = Regex::new(
        r#"(?i)href=["'](https?://[^"']*aliexpress\.com/item/[^"']+)["']"#
    )
    .expect("invalid anchor regex");
}

/// One attempt against a wrapped proxy URL. The chain logic is written
/// against this seam so it can be exercised without live backends.
trait PageTransport {
    async fn fetch(&self, wrapped_url: &str) -> Result<String, FetchError>;
}

struct HttpTransport<'a> {
    client: &'a HttpClient,
}

impl PageTransport for HttpTransport<'_> {
    async fn fetch(&self, wrapped_url: &str) -> Result<String, FetchError> {
        self.client
            .fetch_text(wrapped_url, Config::FETCH_TIMEOUT_SECS)
            .await
            .map(|result| result.content)
    }
}

/// Outcome of one pass over the proxy chain.
enum ChainOutcome {
    Html(String),
    Gateway(String),
}

/// Fetch the HTML of a product page through the proxy chain, following at
/// most one embedded gateway redirect.
pub async fn fetch_page_content(client: &HttpClient, url: &str) -> Result<String, FetchError> {
    fetch_with_transport(&HttpTransport { client }, url).await
}

async fn fetch_with_transport<T: PageTransport>(
    transport: &T,
    url: &str,
) -> Result<String, FetchError> {
    let mut target = url.to_string();
    let mut is_retry = false;

    loop {
        match fetch_via_chain(transport, &target, is_retry).await? {
            ChainOutcome::Html(html) => return Ok(html),
            ChainOutcome::Gateway(next) => {
                info!(next = %next, "gateway page detected, following redirect");
                target = next;
                is_retry = true;
            }
        }
    }
}

async fn fetch_via_chain<T: PageTransport>(
    transport: &T,
    url: &str,
    is_retry: bool,
) -> Result<ChainOutcome, FetchError> {
    let mut last_error: Option<FetchError> = None;

    for backend in ContentBackend::CHAIN {
        info!(backend = backend.label(), "fetching page content");

        let html = match transport.fetch(&backend.wrap(url)).await {
            Ok(html) => html,
            Err(e) => {
                warn!(backend = backend.label(), error = %e, "proxy failed");
                last_error = Some(e);
                continue;
            }
        };

        // Redirect-gateway heuristic: small body that is clearly not a
        // product page but points somewhere that might be one.
        if html.len() < Config::GATEWAY_MAX_LEN && !is_product_page(&html) {
            if let Some(next) = gateway_redirect(&html) {
                if !is_retry {
                    return Ok(ChainOutcome::Gateway(next));
                }
                warn!("gateway redirect found on retry hop, ignoring");
            }
        }

        if html.len() > Config::MIN_HTML_LEN {
            info!(backend = backend.label(), chars = html.len(), "fetch succeeded");
            return Ok(ChainOutcome::Html(html));
        }

        warn!(
            backend = backend.label(),
            chars = html.len(),
            "body too short, trying next proxy"
        );
        last_error = Some(FetchError::BodyTooShort(html.len()));
    }

    let last = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no proxy backends configured".to_string());
    Err(FetchError::Exhausted(last))
}

/// Whether the body carries any product-page marker.
fn is_product_page(html: &str) -> bool {
    PRODUCT_PAGE_MARKERS.iter().any(|m| html.contains(m))
}

/// Extract an embedded redirect target from a suspected gateway page.
///
/// Reuses the resolver's script/meta patterns, then falls back to bare `url=`
/// attributes and product-URL anchors. The result is coerced to an absolute
/// URL, with relative paths anchored on the main site.
fn gateway_redirect(html: &str) -> Option<String> {
    if let Some(target) = resolver::find_redirect_target(html) {
        return Some(target);
    }
    if let Some(caps) = GATEWAY_URL_ATTR.captures(html) {
        return Some(absolutize(caps[1].trim()));
    }
    if let Some(caps) = GATEWAY_ANCHOR.captures(html) {
        return Some(absolutize(caps[1].trim()));
    }
    None
}

/// Coerce a gateway target to absolute https form; bare paths are anchored on
/// the main aliexpress host.
fn absolutize(raw: &str) -> String {
    let url = raw
        .replace("\\u002F", "/")
        .replace("\\/", "/")
        .replace('\\', "")
        .replace("&amp;", "&");

    if url.starts_with("//") {
        format!("https:{}", url)
    } else if url.starts_with("http") {
        url
    } else if url.starts_with('/') {
        format!("https://www.aliexpress.com{}", url)
    } else {
        format!("https://www.aliexpress.com/{}", url)
    }
}
