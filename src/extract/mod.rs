//! Multi-source product extraction.
//!
//! Given raw HTML and the source URL, produces a normalized [`ProductRecord`]
//! by merging values from independent strategies under strict precedence.
//! Each field is resolved by folding an ordered list of extractors; the first
//! non-empty value wins and missing fields degrade to defaults. This function
//! never fails - the caller decides whether the result is usable.

pub mod json_ld;
pub mod meta;
pub mod price;
pub mod state_object;

use lazy_static::lazy_static;
use regex::Regex;
use scraper::Html;
use serde_json::Value;
use tracing::{debug, info};

use crate::images::{self, ImageSet};
use crate::models::{ProductRecord, DEFAULT_RATING, DEFAULT_REVIEWS, TITLE_FALLBACK};

/// State-object paths holding the product title.
const STATE_TITLE_PATHS: [&str; 4] = [
    "titleModule.subject",
    "productInfoComponent.subject",
    "subject",
    "title",
];

/// State-object paths holding image URL arrays.
const STATE_IMAGE_LIST_PATHS: [&str; 3] = [
    "imageModule.imagePathList",
    "imageModule.summImagePathList",
    "imagePathList",
];

lazy_static! {
    /// Inline `"imagePathList": [...]` arrays outside a parsed state object.
    static ref IMAGE_PATH_LIST: Regex =
        Regex::new(r#""imagePathList"\s*:\s*\[([^\]]+)\]"#).expect("invalid imagePathList regex");

    /// Quoted strings inside a JSON array body.
    static ref QUOTED_ITEM: Regex = Regex::new(r#""([^"]+)""#).expect("invalid array item regex");

    /// Common single-image JSON keys.
    static ref IMAGE_KEY: Regex = Regex::new(
        r#""(?:imageUrl|mainImage|imgUrl|productImage)"\s*:\s*"([^"]+)""#
    )
    .expect("invalid image key regex");

    static ref RATING_KEYS: Vec<Regex> = vec![
        Regex::new(r#""averageStar"\s*:\s*"([^"]+)""#).expect("invalid averageStar regex"),
        Regex::new(r#""starRating"\s*:\s*([\d.]+)"#).expect("invalid starRating regex"),
    ];

    static ref REVIEWS_KEYS: Vec<Regex> = vec![
        Regex::new(r#""totalValidNum"\s*:\s*(\d+)"#).expect("invalid totalValidNum regex"),
        Regex::new(r#""totalFeedbackCount"\s*:\s*(\d+)"#).expect("invalid totalFeedbackCount regex"),
    ];
}

/// Extract a product record from raw HTML and its source URL.
pub fn extract(html: &str, source_url: &str) -> ProductRecord {
    let doc = Html::parse_document(html);
    let state = state_object::find_state_object(html);
    let ld = json_ld::find_product(&doc);

    let mut record = ProductRecord::new();

    record.name = extract_title(&doc, state.as_ref(), ld.as_ref());
    record.set_images(extract_images(html, &doc, state.as_ref(), ld.as_ref()));
    record.videos = images::harvest_videos(html);

    let description = meta::description(&doc)
        .or_else(|| ld.as_ref().and_then(|p| p.description.clone()))
        .unwrap_or_else(|| record.description.clone());
    record.set_description(&description);

    record.current_price =
        price::current_price(html, &doc, state.as_ref(), ld.as_ref(), source_url);
    record.original_price = price::original_price(html, state.as_ref(), source_url);
    record.discount = format!(
        "{}%",
        price::discount(html, &record.current_price, &record.original_price)
    );

    record.rating = first_capture(&RATING_KEYS, html).unwrap_or_else(|| DEFAULT_RATING.to_string());
    record.reviews =
        first_capture(&REVIEWS_KEYS, html).unwrap_or_else(|| DEFAULT_REVIEWS.to_string());

    info!(
        name = %record.name,
        price = %record.current_price,
        images = record.images.len(),
        videos = record.videos.len(),
        "extraction complete"
    );
    record
}

/// Title cascade: DOM headings, JSON-LD, state object, og:/twitter:, `<title>`,
/// constant fallback. The winner passes through vendor-suffix cleanup.
fn extract_title(doc: &Html, state: Option<&Value>, ld: Option<&json_ld::ProductLd>) -> String {
    let raw = meta::heading_title(doc)
        .or_else(|| ld.and_then(|p| p.name.clone()))
        .or_else(|| state.and_then(|s| state_object::lookup_string(s, &STATE_TITLE_PATHS)))
        .or_else(|| meta::og_title(doc))
        .or_else(|| meta::title_tag(doc))
        .unwrap_or_else(|| TITLE_FALLBACK.to_string());
    meta::clean_title(&raw)
}

/// Union of all image sources, normalized, filtered, deduplicated, and with
/// the og:/twitter: primary image forced to the front.
fn extract_images(
    html: &str,
    doc: &Html,
    state: Option<&Value>,
    ld: Option<&json_ld::ProductLd>,
) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();
    let push = |raw: &str, out: &mut Vec<String>| {
        if let Some(url) = images::normalize_image_url(raw) {
            if !images::is_ignored(&url) && !out.contains(&url) {
                out.push(url);
            }
        }
    };

    if let Some(product) = ld {
        for url in &product.images {
            push(url, &mut candidates);
        }
    }

    if let Some(state) = state {
        for path in STATE_IMAGE_LIST_PATHS {
            let Some(items) = state_object::lookup_rooted(state, path).and_then(Value::as_array)
            else {
                continue;
            };
            for item in items {
                if let Some(url) = item.as_str() {
                    push(url, &mut candidates);
                }
            }
        }
    }

    // Inline imagePathList arrays that never made it into a parsed state object
    for caps in IMAGE_PATH_LIST.captures_iter(html) {
        for item in QUOTED_ITEM.captures_iter(&caps[1]) {
            push(&item[1], &mut candidates);
        }
    }

    for caps in IMAGE_KEY.captures_iter(html) {
        push(&caps[1], &mut candidates);
    }

    images::harvest_cdn_images(html, &mut candidates);
    debug!(total = candidates.len(), "image candidates gathered");

    // Prefer /kf/ product-path images when any exist; the rest of the page is
    // mostly store banners and seller assets.
    let product_only: Vec<String> = candidates
        .iter()
        .filter(|u| u.contains("/kf/"))
        .cloned()
        .collect();
    let chosen = if product_only.is_empty() {
        candidates
    } else {
        product_only
    };

    let mut set = ImageSet::new();
    for url in &chosen {
        set.insert(url);
    }
    if let Some(primary) = meta::primary_image(doc) {
        set.insert_front(&primary);
    }
    set.into_vec()
}

/// First capture across a precedence-ordered regex battery.
fn first_capture(patterns: &[Regex], html: &str) -> Option<String> {
    for re in patterns {
        if let Some(caps) = re.captures(html) {
            let value = caps[1].trim().to_string();
            if !value.is_empty() {
                return Some(value);
            }
        }
    }
    None
}
