//! JSON-LD structured data extraction.
//!
//! Locates the first schema.org `Product` node across all
//! `<script type="application/ld+json">` blocks, including nodes nested in
//! arrays, child objects, or a `@graph` wrapper.

use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

/// Product fields pulled from a JSON-LD `Product` node.
#[derive(Debug, Clone, Default)]
pub struct ProductLd {
    pub name: Option<String>,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub price: Option<String>,
    pub currency: Option<String>,
}

/// Find the first `Product` node in any JSON-LD block of the document.
pub fn find_product(doc: &Html) -> Option<ProductLd> {
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;

    for element in doc.select(&selector) {
        let text: String = element.text().collect();
        let value: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "skipping malformed JSON-LD block");
                continue;
            }
        };
        if let Some(node) = product_node(&value) {
            return Some(from_node(node));
        }
    }
    None
}

/// Depth-first search for a node whose `@type` is or includes `Product`.
fn product_node(value: &Value) -> Option<&Value> {
    match value {
        Value::Object(map) => {
            if is_product(value) {
                return Some(value);
            }
            map.values().find_map(product_node)
        }
        Value::Array(items) => items.iter().find_map(product_node),
        _ => None,
    }
}

fn is_product(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => t == "Product",
        Some(Value::Array(types)) => types.iter().any(|t| t == "Product"),
        _ => false,
    }
}

fn from_node(node: &Value) -> ProductLd {
    let mut product = ProductLd {
        name: string_field(node, "name"),
        description: string_field(node, "description"),
        ..ProductLd::default()
    };

    match node.get("image") {
        Some(Value::String(url)) => product.images.push(url.clone()),
        Some(Value::Array(items)) => {
            for item in items {
                match item {
                    Value::String(url) => product.images.push(url.clone()),
                    // ImageObject form
                    Value::Object(_) => {
                        if let Some(url) = string_field(item, "url") {
                            product.images.push(url);
                        }
                    }
                    _ => {}
                }
            }
        }
        Some(Value::Object(_)) => {
            if let Some(url) = node.get("image").and_then(|i| string_field(i, "url")) {
                product.images.push(url);
            }
        }
        _ => {}
    }

    if let Some(offer) = first_offer(node) {
        let (price, currency) = offer_price(offer);
        product.price = price;
        product.currency = currency;
    }

    product
}

/// `offers` can be a single object or an array; take the first entry.
fn first_offer(node: &Value) -> Option<&Value> {
    match node.get("offers")? {
        offer @ Value::Object(_) => Some(offer),
        Value::Array(items) => items.first(),
        _ => None,
    }
}

/// Price precedence inside an offer: `price`, `lowPrice`, `highPrice`, then
/// nested `priceSpecification.price`.
fn offer_price(offer: &Value) -> (Option<String>, Option<String>) {
    let price = scalar_field(offer, "price")
        .or_else(|| scalar_field(offer, "lowPrice"))
        .or_else(|| scalar_field(offer, "highPrice"))
        .or_else(|| {
            offer
                .get("priceSpecification")
                .and_then(|spec| scalar_field(spec, "price"))
        });

    let currency = string_field(offer, "priceCurrency").or_else(|| {
        offer
            .get("priceSpecification")
            .and_then(|spec| string_field(spec, "priceCurrency"))
    });

    (price, currency)
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// String or numeric field rendered as a string.
fn scalar_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn test_find_product_basic() {
        let html = r#"
            <html><head>
            <script type="application/ld+json">
            {
                "@context": "https://schema.org",
                "@type": "Product",
                "name": "Wireless Earbuds",
                "description": "Noise cancelling earbuds",
                "image": ["https://ae01.alicdn.com/kf/a.jpg"],
                "offers": {
                    "@type": "Offer",
                    "price": "19.99",
                    "priceCurrency": "USD"
                }
            }
            </script>
            </head></html>
        "#;
        let product = find_product(&parse(html)).unwrap();
        assert_eq!(product.name.as_deref(), Some("Wireless Earbuds"));
        assert_eq!(product.price.as_deref(), Some("19.99"));
        assert_eq!(product.currency.as_deref(), Some("USD"));
        assert_eq!(product.images, vec!["https://ae01.alicdn.com/kf/a.jpg"]);
    }

    #[test]
    fn test_find_product_inside_graph() {
        let html = r#"
            <script type="application/ld+json">
            {
                "@graph": [
                    {"@type": "BreadcrumbList"},
                    {"@type": "Product", "name": "Graph Product",
                     "offers": [{"lowPrice": 5.5, "priceCurrency": "EUR"}]}
                ]
            }
            </script>
        "#;
        let product = find_product(&parse(html)).unwrap();
        assert_eq!(product.name.as_deref(), Some("Graph Product"));
        assert_eq!(product.price.as_deref(), Some("5.5"));
        assert_eq!(product.currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn test_type_array_counts_as_product() {
        let html = r#"
            <script type="application/ld+json">
            {"@type": ["Thing", "Product"], "name": "Typed"}
            </script>
        "#;
        let product = find_product(&parse(html)).unwrap();
        assert_eq!(product.name.as_deref(), Some("Typed"));
    }

    #[test]
    fn test_price_specification_fallback() {
        let html = r#"
            <script type="application/ld+json">
            {"@type": "Product", "name": "Spec",
             "offers": {"priceSpecification": {"price": "12.00", "priceCurrency": "GBP"}}}
            </script>
        "#;
        let product = find_product(&parse(html)).unwrap();
        assert_eq!(product.price.as_deref(), Some("12.00"));
        assert_eq!(product.currency.as_deref(), Some("GBP"));
    }

    #[test]
    fn test_scalar_image_accepted() {
        let html = r#"
            <script type="application/ld+json">
            {"@type": "Product", "name": "One Image", "image": "https://ae01.alicdn.com/kf/x.jpg"}
            </script>
        "#;
        let product = find_product(&parse(html)).unwrap();
        assert_eq!(product.images.len(), 1);
    }

    #[test]
    fn test_malformed_block_is_skipped() {
        let html = r#"
            <script type="application/ld+json">not json</script>
            <script type="application/ld+json">{"@type": "Product", "name": "Second"}</script>
        "#;
        let product = find_product(&parse(html)).unwrap();
        assert_eq!(product.name.as_deref(), Some("Second"));
    }

    #[test]
    fn test_no_product_node() {
        let html = r#"
            <script type="application/ld+json">{"@type": "WebSite", "name": "Site"}</script>
        "#;
        assert!(find_product(&parse(html)).is_none());
    }
}
