//! Catalog of third-party CORS proxy backends.
//!
//! Every backend is an untrusted, rate-unreliable HTTP relay. Each one wraps a
//! target URL in its own call convention; callers iterate a chain strictly in
//! order and advance on failure. Swapping a backend means editing this file
//! only.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

/// Base of the image rewrite proxy used for hotlink-blocked thumbnails.
const IMAGE_PROXY_BASE: &str = "https://images.weserv.nl/?url=";

fn encode_component(url: &str) -> String {
    utf8_percent_encode(url, NON_ALPHANUMERIC).to_string()
}

/// Content-fetch proxy backends, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentBackend {
    AllOrigins,
    CodeTabs,
    ThingProxy,
}

impl ContentBackend {
    /// Iteration order for page-content fetches.
    pub const CHAIN: [ContentBackend; 3] = [
        ContentBackend::AllOrigins,
        ContentBackend::CodeTabs,
        ContentBackend::ThingProxy,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ContentBackend::AllOrigins => "AllOrigins",
            ContentBackend::CodeTabs => "CodeTabs",
            ContentBackend::ThingProxy => "ThingProxy",
        }
    }

    /// Wrap a target URL in this backend's call convention.
    pub fn wrap(self, url: &str) -> String {
        match self {
            ContentBackend::AllOrigins => format!(
                "https://api.allorigins.win/raw?url={}",
                encode_component(url)
            ),
            ContentBackend::CodeTabs => format!(
                "https://api.codetabs.com/v1/proxy?quest={}",
                encode_component(url)
            ),
            // ThingProxy takes the raw URL as a path suffix
            ContentBackend::ThingProxy => {
                format!("https://thingproxy.freeboard.io/fetch/{}", url)
            }
        }
    }
}

/// Short-link resolution proxy backends, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveBackend {
    /// Returns a JSON envelope; the page body lives in its `contents` field.
    AllOriginsEnvelope,
    CodeTabs,
}

impl ResolveBackend {
    pub const CHAIN: [ResolveBackend; 2] =
        [ResolveBackend::AllOriginsEnvelope, ResolveBackend::CodeTabs];

    pub fn label(self) -> &'static str {
        match self {
            ResolveBackend::AllOriginsEnvelope => "AllOrigins",
            ResolveBackend::CodeTabs => "CodeTabs",
        }
    }

    pub fn wrap(self, url: &str) -> String {
        match self {
            ResolveBackend::AllOriginsEnvelope => format!(
                "https://api.allorigins.win/get?url={}",
                encode_component(url)
            ),
            ResolveBackend::CodeTabs => format!(
                "https://api.codetabs.com/v1/proxy?quest={}",
                encode_component(url)
            ),
        }
    }

    /// Whether the response body arrives wrapped in a JSON envelope.
    pub fn is_envelope(self) -> bool {
        matches!(self, ResolveBackend::AllOriginsEnvelope)
    }
}

/// Rewrite an image URL through the image proxy: strip the scheme, re-encode,
/// and prefix the fixed proxy base.
pub fn image_proxy_url(url: &str) -> String {
    let bare = url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("//");
    format!("{}{}", IMAGE_PROXY_BASE, encode_component(bare))
}
