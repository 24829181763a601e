//! Price extraction cascade.
//!
//! Tiers, first hit wins: embedded state object price module, DOM price
//! spans, JSON-LD offer, price meta tags, legacy JSON key regexes, and as a
//! last resort the `pdp_npi` query parameter on the source URL. Bare numeric
//! values get a currency marker attached only when they lack one.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::Html;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::extract::json_ld::ProductLd;
use crate::extract::{meta, state_object};
use crate::models::PRICE_SENTINEL;

/// State-object paths for the current price, most specific first.
const STATE_CURRENT_PATHS: [&str; 4] = [
    "priceModule.formatedActivityPrice",
    "priceModule.formatedPrice",
    "priceModule.minActivityAmount.formatedAmount",
    "priceModule.minAmount.formatedAmount",
];

const STATE_ORIGINAL_PATHS: [&str; 2] = [
    "priceModule.formatedOldPrice",
    "priceModule.maxAmount.formatedAmount",
];

lazy_static! {
    /// Price values inside known product-price span markup.
    static ref PRICE_SPAN: Regex = Regex::new(
        r#"class="[^"]*(?:product-price-value|uniform-banner-box-price)[^"]*"[^>]*>([^<]+)<"#
    )
    .expect("invalid price span regex");

    /// Legacy embedded-JSON price keys, in precedence order.
    static ref CURRENT_PRICE_KEYS: Vec<Regex> = build_key_regexes(&[
        "formatedAmount",
        "actPriceText",
        "minPrice",
        "salePrice",
    ]);

    static ref ORIGINAL_PRICE_KEYS: Vec<Regex> = build_key_regexes(&[
        "oldPriceText",
        "origPriceText",
        "formatedOldPrice",
    ]);

    static ref DISCOUNT_KEYS: Vec<Regex> = vec![
        Regex::new(r#""discount"\s*:\s*"?(\d+)"?"#).expect("invalid discount regex"),
        Regex::new(r#""discountRate"\s*:\s*"?(\d+)"?"#).expect("invalid discountRate regex"),
    ];
}

/// Build regexes matching `"key": "value"` and `"key": 12.34` forms.
fn build_key_regexes(keys: &[&str]) -> Vec<Regex> {
    keys.iter()
        .map(|key| {
            Regex::new(&format!(
                r#""{}"\s*:\s*(?:"([^"]+)"|([0-9][0-9.]*))"#,
                key
            ))
            .expect("invalid price key regex")
        })
        .collect()
}

/// First capture across a precedence-ordered regex battery.
fn first_key_match(keys: &[Regex], html: &str) -> Option<String> {
    for re in keys {
        if let Some(caps) = re.captures(html) {
            let value = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty());
            if value.is_some() {
                return value;
            }
        }
    }
    None
}

/// Current price through the full cascade; falls back to the sentinel.
pub fn current_price(
    html: &str,
    doc: &Html,
    state: Option<&Value>,
    ld: Option<&ProductLd>,
    source_url: &str,
) -> String {
    state
        .and_then(|s| state_object::lookup_string(s, &STATE_CURRENT_PATHS))
        .or_else(|| dom_price_span(html))
        .or_else(|| {
            ld.and_then(|p| {
                p.price
                    .as_deref()
                    .map(|v| format_price(v, p.currency.as_deref()))
            })
        })
        .or_else(|| {
            meta::price_meta(doc).map(|(value, currency)| format_price(&value, currency.as_deref()))
        })
        .or_else(|| first_key_match(&CURRENT_PRICE_KEYS, html))
        .or_else(|| {
            decode_pdp_npi(source_url).map(|npi| {
                format_price(&format!("{:.2}", npi.current), Some(&npi.currency))
            })
        })
        .unwrap_or_else(|| {
            debug!("no price source resolved, using sentinel");
            PRICE_SENTINEL.to_string()
        })
}

/// Original (pre-discount) price; empty string when unknown.
pub fn original_price(html: &str, state: Option<&Value>, source_url: &str) -> String {
    state
        .and_then(|s| state_object::lookup_string(s, &STATE_ORIGINAL_PATHS))
        .or_else(|| first_key_match(&ORIGINAL_PRICE_KEYS, html))
        .or_else(|| {
            decode_pdp_npi(source_url).and_then(|npi| {
                npi.original
                    .map(|orig| format_price(&format!("{:.2}", orig), Some(&npi.currency)))
            })
        })
        .unwrap_or_default()
}

/// Discount percentage as a bare numeral string.
///
/// Explicit `discount`/`discountRate` keys win; otherwise computed from the
/// two prices when both parse; otherwise `"0"`.
pub fn discount(html: &str, current: &str, original: &str) -> String {
    if let Some(explicit) = first_key_match(&DISCOUNT_KEYS, html) {
        return explicit;
    }
    if let (Some(cur), Some(orig)) = (parse_price_number(current), parse_price_number(original)) {
        if orig > 0.0 && orig > cur {
            return format!("{}", ((orig - cur) / orig * 100.0).round() as i64);
        }
    }
    "0".to_string()
}

fn dom_price_span(html: &str) -> Option<String> {
    PRICE_SPAN
        .captures(html)
        .map(|caps| caps[1].trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Prices decoded from the `pdp_npi` query parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct NpiPrice {
    pub currency: String,
    pub current: f64,
    pub original: Option<f64>,
}

/// Decode prices from the bang-delimited `pdp_npi` affiliate parameter.
///
/// A 3-letter uppercase field marks the currency; the following one or two
/// numeric fields carry the prices. The lower value is always the current
/// price, so a higher-first ordering is swapped.
pub fn decode_pdp_npi(source_url: &str) -> Option<NpiPrice> {
    let parsed = Url::parse(source_url).ok()?;
    let raw = parsed
        .query_pairs()
        .find(|(key, _)| key == "pdp_npi")
        .map(|(_, value)| value.into_owned())?;

    let fields: Vec<&str> = raw.split('!').collect();
    let currency_idx = fields
        .iter()
        .position(|f| f.len() == 3 && f.chars().all(|c| c.is_ascii_uppercase()))?;
    let currency = fields[currency_idx].to_string();

    let mut amounts = Vec::new();
    for field in fields.iter().skip(currency_idx + 1) {
        match field.parse::<f64>() {
            Ok(v) if amounts.len() < 2 => amounts.push(v),
            _ => break,
        }
    }

    match amounts.as_slice() {
        [only] => Some(NpiPrice {
            currency,
            current: *only,
            original: None,
        }),
        [a, b] => {
            let (current, original) = if a > b { (*b, *a) } else { (*a, *b) };
            Some(NpiPrice {
                currency,
                current,
                original: Some(original),
            })
        }
        _ => None,
    }
}

/// Attach a currency marker to a bare numeric price; values that already
/// carry one are returned unchanged.
pub fn format_price(value: &str, currency: Option<&str>) -> String {
    let trimmed = value.trim();
    if has_currency_marker(trimmed) {
        return trimmed.to_string();
    }
    match currency {
        Some(code) => match currency_symbol(code) {
            Some(symbol) => format!("{}{}", symbol, trimmed),
            None => format!("{} {}", code, trimmed),
        },
        None => format!("${}", trimmed),
    }
}

fn has_currency_marker(s: &str) -> bool {
    s.chars()
        .any(|c| !(c.is_ascii_digit() || c == '.' || c == ',' || c.is_whitespace()))
}

fn currency_symbol(code: &str) -> Option<&'static str> {
    match code {
        "USD" => Some("$"),
        "EUR" => Some("€"),
        "GBP" => Some("£"),
        "JPY" | "CNY" => Some("¥"),
        _ => None,
    }
}

/// Numeric value of a formatted price string; `None` when nothing parses.
pub fn parse_price_number(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract_all(html: &str, url: &str) -> (String, String) {
        let doc = Html::parse_document(html);
        let current = current_price(html, &doc, None, None, url);
        let original = original_price(html, None, url);
        (current, original)
    }

    #[test]
    fn test_legacy_key_precedence() {
        let html = r#"{"minPrice": "7.00", "formatedAmount": "US $4.99"}"#;
        let (current, _) = extract_all(html, "https://example.com");
        assert_eq!(current, "US $4.99");
    }

    #[test]
    fn test_legacy_numeric_value() {
        let html = r#"{"minPrice": 7.5}"#;
        let (current, _) = extract_all(html, "https://example.com");
        assert_eq!(current, "7.5");
    }

    #[test]
    fn test_dom_price_span() {
        let html = r#"<span class="product-price-value">US $12.34</span>"#;
        let (current, _) = extract_all(html, "https://example.com");
        assert_eq!(current, "US $12.34");
    }

    #[test]
    fn test_sentinel_when_nothing_found() {
        let (current, original) = extract_all("<html></html>", "https://example.com");
        assert_eq!(current, PRICE_SENTINEL);
        assert_eq!(original, "");
    }

    #[test]
    fn test_pdp_npi_decode_swaps_to_lower_current() {
        let url =
            "https://www.aliexpress.com/item/123.html?pdp_npi=4%40dis%21USD%2129.99%2119.99%21%21%21";
        let npi = decode_pdp_npi(url).unwrap();
        assert_eq!(npi.currency, "USD");
        assert_eq!(npi.current, 19.99);
        assert_eq!(npi.original, Some(29.99));
    }

    #[test]
    fn test_pdp_npi_single_amount() {
        let url = "https://www.aliexpress.com/item/123.html?pdp_npi=2%40dis%21EUR%218.40%21%21";
        let npi = decode_pdp_npi(url).unwrap();
        assert_eq!(npi.current, 8.4);
        assert_eq!(npi.original, None);
    }

    #[test]
    fn test_pdp_npi_missing() {
        assert!(decode_pdp_npi("https://www.aliexpress.com/item/123.html").is_none());
        assert!(decode_pdp_npi("not a url").is_none());
    }

    #[test]
    fn test_pdp_npi_is_last_resort() {
        let html = "<html></html>";
        let url =
            "https://www.aliexpress.com/item/123.html?pdp_npi=4%40dis%21USD%2129.99%2119.99%21%21";
        let (current, original) = extract_all(html, url);
        assert_eq!(current, "$19.99");
        assert_eq!(original, "$29.99");
    }

    #[test]
    fn test_format_price_keeps_existing_marker() {
        assert_eq!(format_price("US $9.99", Some("USD")), "US $9.99");
        assert_eq!(format_price("€5,20", None), "€5,20");
    }

    #[test]
    fn test_format_price_attaches_currency() {
        assert_eq!(format_price("19.99", Some("USD")), "$19.99");
        assert_eq!(format_price("19.99", Some("AUD")), "AUD 19.99");
        assert_eq!(format_price("19.99", None), "$19.99");
    }

    #[test]
    fn test_discount_explicit_key_wins() {
        let html = r#"{"discount": "35"}"#;
        assert_eq!(discount(html, "$65.00", "$100.00"), "35");
    }

    #[test]
    fn test_discount_computed_from_prices() {
        assert_eq!(discount("<html></html>", "$75.00", "$100.00"), "25");
    }

    #[test]
    fn test_discount_defaults_to_zero() {
        assert_eq!(discount("<html></html>", "$--.--", ""), "0");
        // No discount when current exceeds original
        assert_eq!(discount("<html></html>", "$120.00", "$100.00"), "0");
    }

    #[test]
    fn test_parse_price_number() {
        assert_eq!(parse_price_number("US $1,234.56"), Some(1234.56));
        assert_eq!(parse_price_number("$--.--"), None);
        assert_eq!(parse_price_number(""), None);
    }
}
