//! Meta-tag and DOM title extraction via CSS selectors.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Selector};

lazy_static! {
    static ref VENDOR_TOKEN: Regex = Regex::new(r"(?i)aliexpress").expect("invalid vendor regex");
}

/// First non-empty `content` attribute across the given selectors.
fn select_content(doc: &Html, selectors: &[&str]) -> Option<String> {
    for css in selectors {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        if let Some(content) = doc
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return Some(content.to_string());
        }
    }
    None
}

/// First non-empty text across the given selectors.
fn select_text(doc: &Html, selectors: &[&str]) -> Option<String> {
    for css in selectors {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        if let Some(text) = doc
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
        {
            return Some(text);
        }
    }
    None
}

/// Product title from headings carrying product-title markup. Generic `h1`
/// elements are left to the lower tiers; nav banners and error headings
/// would otherwise outrank structured data.
pub fn heading_title(doc: &Html) -> Option<String> {
    select_text(
        doc,
        &[
            r#"h1[data-pl="product-title"]"#,
            "h1.product-title-text",
        ],
    )
}

/// Title from og:/twitter: meta tags.
pub fn og_title(doc: &Html) -> Option<String> {
    select_content(
        doc,
        &[
            r#"meta[property="og:title"]"#,
            r#"meta[name="twitter:title"]"#,
        ],
    )
}

/// Plain `<title>` tag.
pub fn title_tag(doc: &Html) -> Option<String> {
    select_text(doc, &["title"])
}

/// Description meta tags, plain `description` first.
pub fn description(doc: &Html) -> Option<String> {
    select_content(
        doc,
        &[
            r#"meta[name="description"]"#,
            r#"meta[property="og:description"]"#,
        ],
    )
}

/// Primary share image from og:/twitter: meta tags.
pub fn primary_image(doc: &Html) -> Option<String> {
    select_content(
        doc,
        &[
            r#"meta[property="og:image"]"#,
            r#"meta[property="og:image:secure_url"]"#,
            r#"meta[name="twitter:image"]"#,
            r#"meta[name="twitter:image:src"]"#,
        ],
    )
}

/// Price meta tags: value plus optional currency code.
pub fn price_meta(doc: &Html) -> Option<(String, Option<String>)> {
    let price = select_content(
        doc,
        &[
            r#"meta[itemprop="price"]"#,
            r#"meta[property="og:price:amount"]"#,
            r#"meta[property="product:price:amount"]"#,
        ],
    )?;
    let currency = select_content(
        doc,
        &[
            r#"meta[itemprop="priceCurrency"]"#,
            r#"meta[property="og:price:currency"]"#,
            r#"meta[property="product:price:currency"]"#,
        ],
    );
    Some((price, currency))
}

/// Strip vendor-name suffixes and separators from a raw title: cut at the
/// first `|`, drop the vendor token, drop ` - ` separators, trim.
pub fn clean_title(raw: &str) -> String {
    let before_pipe = raw.split('|').next().unwrap_or(raw);
    let without_vendor = VENDOR_TOKEN.replace_all(before_pipe, "");
    without_vendor.replace(" - ", "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn test_heading_title_prefers_specific_markup() {
        let doc = parse(
            r#"<h1>Generic heading</h1>
               <h1 class="product-title-text">Real Product Name</h1>"#,
        );
        assert_eq!(heading_title(&doc).as_deref(), Some("Real Product Name"));
    }

    #[test]
    fn test_heading_title_ignores_generic_h1() {
        let doc = parse("<h1>Site Banner</h1>");
        assert_eq!(heading_title(&doc), None);
    }

    #[test]
    fn test_og_title_then_twitter() {
        let doc = parse(r#"<meta name="twitter:title" content="Tw Title">"#);
        assert_eq!(og_title(&doc).as_deref(), Some("Tw Title"));

        let doc = parse(
            r#"<meta property="og:title" content="OG Title">
               <meta name="twitter:title" content="Tw Title">"#,
        );
        assert_eq!(og_title(&doc).as_deref(), Some("OG Title"));
    }

    #[test]
    fn test_title_tag() {
        let doc = parse("<html><head><title> Page Title </title></head></html>");
        assert_eq!(title_tag(&doc).as_deref(), Some("Page Title"));
    }

    #[test]
    fn test_description_precedence() {
        let doc = parse(
            r#"<meta property="og:description" content="OG desc">
               <meta name="description" content="Plain desc">"#,
        );
        assert_eq!(description(&doc).as_deref(), Some("Plain desc"));
    }

    #[test]
    fn test_primary_image() {
        let doc = parse(r#"<meta property="og:image" content="//ae01.alicdn.com/kf/a.jpg">"#);
        assert_eq!(
            primary_image(&doc).as_deref(),
            Some("//ae01.alicdn.com/kf/a.jpg")
        );
    }

    #[test]
    fn test_price_meta_with_currency() {
        let doc = parse(
            r#"<meta itemprop="price" content="15.50">
               <meta itemprop="priceCurrency" content="USD">"#,
        );
        let (price, currency) = price_meta(&doc).unwrap();
        assert_eq!(price, "15.50");
        assert_eq!(currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(
            clean_title("Mini Drone 4K - AliExpress 12 | Aliexpress"),
            "Mini Drone 4K 12"
        );
        assert_eq!(clean_title("Plain Product"), "Plain Product");
        assert_eq!(clean_title("AliExpress"), "");
    }
}
