use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Sentinel shown when no price source resolves.
pub const PRICE_SENTINEL: &str = "$--.--";

/// Title used when every title source comes up empty.
pub const TITLE_FALLBACK: &str = "AliExpress Product";

/// Description used when no meta/JSON-LD description is present.
pub const DESCRIPTION_FALLBACK: &str = "Product details available on AliExpress.";

/// Guaranteed-resolvable placeholder for products with no discoverable images.
pub const PLACEHOLDER_IMAGE: &str = "https://placehold.co/400x400/1e293b/white?text=No+Image";

pub const DEFAULT_RATING: &str = "4.8";
pub const DEFAULT_REVIEWS: &str = "120+";

/// Marketing bullets attached to every automatically extracted record.
pub const DEFAULT_FEATURES: [&str; 4] = [
    "Global Shipping",
    "Top Rated",
    "Secure Payment",
    "Buyer Protection",
];

/// Normalized product record produced by the extraction pipeline.
///
/// Serialized field names stay camelCase so downstream consumers (renderer,
/// post generator) see `currentPrice`/`originalPrice` as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub name: String,
    pub current_price: String,
    pub original_price: String,
    /// Percentage string, always carries a trailing `%`.
    pub discount: String,
    pub description: String,
    /// Primary image; equal to `images[0]` whenever `images` is non-empty.
    pub image: String,
    /// Unique, normalized, absolute image URLs in discovery order.
    pub images: Vec<String>,
    /// Unique `.mp4` URLs in discovery order.
    pub videos: Vec<String>,
    pub rating: String,
    pub reviews: String,
    pub features: Vec<String>,
    /// Original source URL, attached by the caller after extraction.
    pub url: String,
}

impl ProductRecord {
    /// Create an empty record carrying all default/sentinel values.
    pub fn new() -> Self {
        Self {
            name: String::new(),
            current_price: PRICE_SENTINEL.to_string(),
            original_price: String::new(),
            discount: "0%".to_string(),
            description: DESCRIPTION_FALLBACK.to_string(),
            image: PLACEHOLDER_IMAGE.to_string(),
            images: Vec::new(),
            videos: Vec::new(),
            rating: DEFAULT_RATING.to_string(),
            reviews: DEFAULT_REVIEWS.to_string(),
            features: DEFAULT_FEATURES.iter().map(|s| s.to_string()).collect(),
            url: String::new(),
        }
    }

    /// Set the description, truncating to the configured maximum length.
    pub fn set_description(&mut self, description: &str) {
        self.description = truncate_chars(description, Config::DESCRIPTION_MAX_LEN);
    }

    /// Replace the image list, keeping the primary image in sync.
    /// An empty list degrades to the single-element placeholder.
    pub fn set_images(&mut self, images: Vec<String>) {
        if images.is_empty() {
            self.image = PLACEHOLDER_IMAGE.to_string();
            self.images = vec![PLACEHOLDER_IMAGE.to_string()];
        } else {
            self.image = images[0].clone();
            self.images = images;
        }
    }

    /// Merge additional image candidates into the existing list.
    ///
    /// Used during manual-fallback augmentation; this is the only partial
    /// mutation the record supports. Existing order is preserved and the
    /// invariants (dedupe, ignore filter, cap) are re-applied.
    pub fn merge_images(&mut self, extra: &[String]) {
        let mut set = crate::images::ImageSet::new();
        for url in &self.images {
            set.insert(url);
        }
        for url in extra {
            set.insert(url);
        }
        self.set_images(set.into_vec());
    }
}

impl Default for ProductRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncate a string to at most `max` characters without splitting a char.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
