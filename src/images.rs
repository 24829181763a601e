//! Image URL normalization, filtering, ordered deduplication, and the
//! display-time hotlink fallback protocol.
//!
//! CDN image URLs arrive escaped, protocol-relative, and carrying resize
//! suffixes (`foo.jpg_50x50.jpg`). Normalizing before deduplication is what
//! keeps the image list free of visually identical variants.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::config::Config;
use crate::proxy;

/// Substrings that mark a URL as a non-product asset.
const IGNORED_MARKERS: &[&str] = &[
    "placeholder",
    "logo",
    "icon",
    "avatar",
    "sprite",
    "blank",
    "grey.gif",
    "pixel",
    ".svg",
    "data:image",
];

/// Recognized image extensions, longest first so `.jpeg_` wins over `.jpg_`.
const IMAGE_EXTENSIONS: &[&str] = &[".jpeg", ".webp", ".jpg", ".png"];

lazy_static! {
    /// Absolute alicdn image URLs, quoted in markup or script.
    pub static ref CDN_IMAGE: Regex = Regex::new(
        r#"['"](https?://[^'"]*alicdn\.com[^'"]*\.(?:jpg|jpeg|png|webp))['"]"#
    )
    .expect("invalid cdn image regex");

    /// Protocol-relative alicdn image URLs.
    pub static ref CDN_IMAGE_PROTO_RELATIVE: Regex = Regex::new(
        r#"['"]//(ae[0-9]+\.alicdn\.com[^'"]+\.(?:jpg|jpeg|png|webp))['"]"#
    )
    .expect("invalid protocol-relative cdn image regex");

    /// Bare `.mp4` URLs anywhere in the document.
    pub static ref VIDEO_URL: Regex =
        Regex::new(r#"https?://[^"'\s]+\.mp4"#).expect("invalid video url regex");
}

/// Normalize a raw image URL candidate to canonical https form.
///
/// Returns `None` for empty, over-long, non-http, or otherwise unusable
/// candidates. Normalization unescapes JSON slashes and entities, forces
/// `https:`, and strips resize suffixes appended after the real extension.
pub fn normalize_image_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_matches(|c| c == '"' || c == '\'');
    if trimmed.is_empty() {
        return None;
    }

    let mut url = trimmed
        .replace("\\u002F", "/")
        .replace("\\/", "/")
        .replace('\\', "")
        .replace("&amp;", "&");

    if url.starts_with("//") {
        url = format!("https:{}", url);
    } else if let Some(rest) = url.strip_prefix("http://") {
        url = format!("https://{}", rest);
    }

    if !url.starts_with("https://") {
        return None;
    }
    if url.len() > Config::MAX_IMAGE_URL_LEN {
        return None;
    }

    Some(strip_resize_suffix(&url))
}

/// Strip a resize token appended after the image extension:
/// `foo.jpg_50x50.jpg` becomes `foo.jpg`.
pub fn strip_resize_suffix(url: &str) -> String {
    for ext in IMAGE_EXTENSIONS {
        let marker = format!("{}_", ext);
        if let Some(pos) = url.find(&marker) {
            return url[..pos + ext.len()].to_string();
        }
    }
    url.to_string()
}

/// True when the URL matches a known non-product asset pattern.
pub fn is_ignored(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    IGNORED_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Ordered set of normalized image URLs with a hard cap.
///
/// Insertion order is preserved; duplicates (after normalization) and ignored
/// URLs are rejected. Re-inserting a previously produced list is a no-op.
#[derive(Debug, Default)]
pub struct ImageSet {
    urls: Vec<String>,
}

impl ImageSet {
    pub fn new() -> Self {
        Self { urls: Vec::new() }
    }

    /// Normalize and append a candidate. Returns true if it was added.
    pub fn insert(&mut self, raw: &str) -> bool {
        let Some(url) = normalize_image_url(raw) else {
            return false;
        };
        if is_ignored(&url) {
            debug!(url = %url, "skipping ignored image");
            return false;
        }
        if self.urls.len() >= Config::MAX_IMAGES || self.urls.contains(&url) {
            return false;
        }
        self.urls.push(url);
        true
    }

    /// Normalize and place a candidate at the front of the set.
    ///
    /// Used for the og:/twitter: primary image so it always renders first.
    /// If the URL is already present it is moved, not duplicated.
    pub fn insert_front(&mut self, raw: &str) -> bool {
        let Some(url) = normalize_image_url(raw) else {
            return false;
        };
        if is_ignored(&url) {
            return false;
        }
        if let Some(pos) = self.urls.iter().position(|u| u == &url) {
            let existing = self.urls.remove(pos);
            self.urls.insert(0, existing);
            return false;
        }
        if self.urls.len() >= Config::MAX_IMAGES {
            self.urls.pop();
        }
        self.urls.insert(0, url);
        true
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.urls
    }

    pub fn into_vec(self) -> Vec<String> {
        self.urls
    }
}

/// Harvest every alicdn image URL (absolute and protocol-relative) from raw
/// HTML into `out`, normalized and filtered.
pub fn harvest_cdn_images(html: &str, out: &mut Vec<String>) {
    for caps in CDN_IMAGE.captures_iter(html) {
        if let Some(url) = normalize_image_url(&caps[1]) {
            if !is_ignored(&url) && !out.contains(&url) {
                out.push(url);
            }
        }
    }
    for caps in CDN_IMAGE_PROTO_RELATIVE.captures_iter(html) {
        let absolute = format!("https://{}", &caps[1]);
        if let Some(url) = normalize_image_url(&absolute) {
            if !is_ignored(&url) && !out.contains(&url) {
                out.push(url);
            }
        }
    }
}

/// Harvest unique `.mp4` URLs in discovery order.
pub fn harvest_videos(html: &str) -> Vec<String> {
    let mut videos = Vec::new();
    for m in VIDEO_URL.find_iter(html) {
        let url = m.as_str().to_string();
        if !videos.contains(&url) {
            videos.push(url);
        }
    }
    videos
}

/// Per-image display retry state.
///
/// Images hotlinked from the CDN are often blocked; the renderer attempts the
/// direct URL first, then exactly one pass through the image proxy, then gives
/// up and substitutes its placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayAttempt {
    Direct,
    ProxyRetried,
    Failed,
}

impl DisplayAttempt {
    /// Next state after a load failure in the current state.
    pub fn after_failure(self) -> DisplayAttempt {
        match self {
            DisplayAttempt::Direct => DisplayAttempt::ProxyRetried,
            DisplayAttempt::ProxyRetried | DisplayAttempt::Failed => DisplayAttempt::Failed,
        }
    }
}

/// Resolve the URL the renderer should try for the given attempt state.
/// `None` means the caller should fall back to its placeholder.
pub fn resolve_display_url(url: &str, state: DisplayAttempt) -> Option<String> {
    match state {
        DisplayAttempt::Direct => Some(url.to_string()),
        DisplayAttempt::ProxyRetried => Some(proxy::image_proxy_url(url)),
        DisplayAttempt::Failed => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_resize_suffix() {
        assert_eq!(
            strip_resize_suffix("https://ae01.alicdn.com/kf/foo.jpg_50x50.jpg"),
            "https://ae01.alicdn.com/kf/foo.jpg"
        );
        assert_eq!(
            strip_resize_suffix("https://ae01.alicdn.com/kf/foo.png_640x640.png_.webp"),
            "https://ae01.alicdn.com/kf/foo.png"
        );
        assert_eq!(
            strip_resize_suffix("https://ae01.alicdn.com/kf/foo.jpg"),
            "https://ae01.alicdn.com/kf/foo.jpg"
        );
    }

    #[test]
    fn test_normalize_protocol_relative() {
        assert_eq!(
            normalize_image_url("//ae01.alicdn.com/kf/foo.jpg").as_deref(),
            Some("https://ae01.alicdn.com/kf/foo.jpg")
        );
    }

    #[test]
    fn test_normalize_escaped_slashes_and_entities() {
        assert_eq!(
            normalize_image_url("https:\\/\\/ae01.alicdn.com\\/kf\\/a.jpg?x=1&amp;y=2").as_deref(),
            Some("https://ae01.alicdn.com/kf/a.jpg?x=1&y=2")
        );
    }

    #[test]
    fn test_normalize_forces_https() {
        assert_eq!(
            normalize_image_url("http://ae01.alicdn.com/kf/foo.jpg").as_deref(),
            Some("https://ae01.alicdn.com/kf/foo.jpg")
        );
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        assert!(normalize_image_url("").is_none());
        assert!(normalize_image_url("   ").is_none());
        assert!(normalize_image_url("data:image/png;base64,AAAA").is_none());
        let long = format!("https://ae01.alicdn.com/{}.jpg", "a".repeat(400));
        assert!(normalize_image_url(&long).is_none());
    }

    #[test]
    fn test_ignored_patterns() {
        assert!(is_ignored("https://cdn.example.com/assets/logo.png"));
        assert!(is_ignored("https://cdn.example.com/user/Avatar_small.jpg"));
        assert!(!is_ignored("https://ae01.alicdn.com/kf/product.jpg"));
    }

    #[test]
    fn test_image_set_dedupes_normalized_variants() {
        let mut set = ImageSet::new();
        assert!(set.insert("https://ae01.alicdn.com/kf/a.jpg"));
        // Same image, different surface forms
        assert!(!set.insert("//ae01.alicdn.com/kf/a.jpg"));
        assert!(!set.insert("https://ae01.alicdn.com/kf/a.jpg_220x220.jpg"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_image_set_rejects_ignored() {
        let mut set = ImageSet::new();
        assert!(!set.insert("https://cdn.example.com/logo.png"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_image_set_cap() {
        let mut set = ImageSet::new();
        for i in 0..40 {
            set.insert(&format!("https://ae01.alicdn.com/kf/img{}.jpg", i));
        }
        assert_eq!(set.len(), Config::MAX_IMAGES);
    }

    #[test]
    fn test_image_set_reinsertion_is_idempotent() {
        let mut set = ImageSet::new();
        set.insert("https://ae01.alicdn.com/kf/a.jpg");
        set.insert("https://ae01.alicdn.com/kf/b.jpg");
        let produced = set.into_vec();

        let mut again = ImageSet::new();
        for url in &produced {
            again.insert(url);
        }
        for url in &produced {
            again.insert(url);
        }
        assert_eq!(again.into_vec(), produced);
    }

    #[test]
    fn test_insert_front_moves_existing_to_front() {
        let mut set = ImageSet::new();
        set.insert("https://ae01.alicdn.com/kf/a.jpg");
        set.insert("https://ae01.alicdn.com/kf/b.jpg");
        set.insert_front("https://ae01.alicdn.com/kf/b.jpg");
        assert_eq!(set.as_slice()[0], "https://ae01.alicdn.com/kf/b.jpg");
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_harvest_cdn_images() {
        let html = r#"
            <img src="https://ae01.alicdn.com/kf/one.jpg_50x50.jpg">
            <script>var x = "//ae02.alicdn.com/kf/two.png";</script>
            <img src="https://ae01.alicdn.com/kf/one.jpg">
        "#;
        let mut found = Vec::new();
        harvest_cdn_images(html, &mut found);
        assert_eq!(
            found,
            vec![
                "https://ae01.alicdn.com/kf/one.jpg".to_string(),
                "https://ae02.alicdn.com/kf/two.png".to_string(),
            ]
        );
    }

    #[test]
    fn test_harvest_videos_unique() {
        let html = "play https://video.example.com/a.mp4 and https://video.example.com/a.mp4";
        assert_eq!(harvest_videos(html), vec!["https://video.example.com/a.mp4"]);
    }

    #[test]
    fn test_display_attempt_state_machine() {
        let url = "https://ae01.alicdn.com/kf/a.jpg";
        assert_eq!(
            resolve_display_url(url, DisplayAttempt::Direct).as_deref(),
            Some(url)
        );

        let retried = DisplayAttempt::Direct.after_failure();
        assert_eq!(retried, DisplayAttempt::ProxyRetried);
        let proxied = resolve_display_url(url, retried).unwrap();
        assert!(proxied.starts_with("https://images.weserv.nl/?url="));
        assert!(!proxied.contains("https://ae01"));

        let failed = retried.after_failure();
        assert_eq!(failed, DisplayAttempt::Failed);
        assert!(resolve_display_url(url, failed).is_none());
        // Terminal state stays terminal
        assert_eq!(failed.after_failure(), DisplayAttempt::Failed);
    }
}
