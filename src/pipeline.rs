//! Analysis pipeline orchestration: resolve, fetch, extract, validate.
//!
//! The extracted record is returned to the caller, which owns it for the rest
//! of the session. There is no shared mutable product state; a new analysis
//! or manual submission produces a fresh record.

use tracing::{error, info};

use crate::extract;
use crate::fetcher;
use crate::models::ProductRecord;
use crate::network::{FetchError, HttpClient};
use crate::resolver;

/// Terminal pipeline failures. Every variant switches the caller to the
/// manual-entry fallback instead of surfacing a raw error.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Incomplete data extracted: no usable product name")]
    ExtractionIncomplete,
}

/// Run the full analysis for a product URL.
///
/// Shortened links are resolved first (best effort); the page is fetched
/// through the proxy chain; extraction always yields a record, which is
/// accepted only if it carries a usable name. The record's `url` field is
/// the caller's original input, not the resolved target.
pub async fn analyze(client: &HttpClient, url: &str) -> Result<ProductRecord, AnalyzeError> {
    let target = if resolver::is_short_link(url) {
        resolver::resolve_short_link(client, url).await
    } else {
        url.to_string()
    };

    info!(url = %target, "fetching HTML content");
    let html = fetcher::fetch_page_content(client, &target).await?;

    info!("extracting product data");
    let mut record = extract::extract(&html, &target);
    if record.name.trim().is_empty() {
        error!("extraction produced no usable name");
        return Err(AnalyzeError::ExtractionIncomplete);
    }

    record.url = url.to_string();
    Ok(record)
}

/// Build a record from pasted raw HTML (manual fallback, first form).
pub fn from_manual_html(html: &str, source_url: &str) -> Result<ProductRecord, AnalyzeError> {
    let mut record = extract::extract(html, source_url);
    if record.name.trim().is_empty() {
        return Err(AnalyzeError::ExtractionIncomplete);
    }
    record.url = source_url.to_string();
    Ok(record)
}

/// Manual-entry form fields (manual fallback, second form). Empty fields
/// take fixed defaults.
#[derive(Debug, Clone, Default)]
pub struct ManualFields {
    pub title: Option<String>,
    pub price: Option<String>,
    pub old_price: Option<String>,
    pub discount: Option<String>,
    pub description: Option<String>,
    /// Newline- or comma-delimited image URL list.
    pub images: Option<String>,
}

/// Build a record from explicit manual-entry fields.
pub fn from_manual_fields(fields: ManualFields) -> ProductRecord {
    let mut record = ProductRecord::new();
    record.name = fields
        .title
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "Manual Product".to_string());
    record.current_price = fields
        .price
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "$0.00".to_string());
    record.original_price = fields.old_price.unwrap_or_default();
    record.discount = format!(
        "{}%",
        fields
            .discount
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim_end_matches('%').to_string())
            .unwrap_or_else(|| "0".to_string())
    );
    record.set_description(
        fields
            .description
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "Manual description.".to_string())
            .as_str(),
    );
    record.rating = "N/A".to_string();
    record.reviews = "0".to_string();
    record.features = vec!["Premium Quality".to_string(), "Best Deal".to_string()];

    if let Some(raw) = fields.images {
        let urls: Vec<String> = raw
            .split(|c| c == '\n' || c == ',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        record.merge_images(&urls);
    } else {
        record.set_images(Vec::new());
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PLACEHOLDER_IMAGE;

    #[test]
    fn test_manual_fields_defaults() {
        let record = from_manual_fields(ManualFields::default());
        assert_eq!(record.name, "Manual Product");
        assert_eq!(record.current_price, "$0.00");
        assert_eq!(record.discount, "0%");
        assert_eq!(record.rating, "N/A");
        assert_eq!(record.reviews, "0");
        assert_eq!(record.features, vec!["Premium Quality", "Best Deal"]);
        assert_eq!(record.image, PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_manual_fields_explicit_values() {
        let record = from_manual_fields(ManualFields {
            title: Some("Hand Entered".to_string()),
            price: Some("$9.99".to_string()),
            old_price: Some("$19.99".to_string()),
            discount: Some("50%".to_string()),
            description: Some("desc".to_string()),
            images: Some(
                "https://ae01.alicdn.com/kf/a.jpg\nhttps://ae01.alicdn.com/kf/b.jpg, https://ae01.alicdn.com/kf/a.jpg"
                    .to_string(),
            ),
        });
        assert_eq!(record.name, "Hand Entered");
        assert_eq!(record.discount, "50%");
        assert_eq!(record.images.len(), 2);
        assert_eq!(record.image, "https://ae01.alicdn.com/kf/a.jpg");
    }

    #[test]
    fn test_manual_html_requires_name() {
        let err = from_manual_html("<html><head><title>AliExpress</title></head></html>", "")
            .unwrap_err();
        assert!(matches!(err, AnalyzeError::ExtractionIncomplete));
    }

    #[test]
    fn test_manual_html_extracts_record() {
        let html = r#"
            <html><head><title>Great Gadget</title></head>
            <body><img src="https://ae01.alicdn.com/kf/g.jpg"></body></html>
        "#;
        let record = from_manual_html(html, "https://example.com/pasted").unwrap();
        assert_eq!(record.name, "Great Gadget");
        assert_eq!(record.url, "https://example.com/pasted");
    }
}
