pub mod cli;
pub mod config;
pub mod extract;
pub mod fetcher;
pub mod images;
pub mod logging;
pub mod models;
pub mod network;
pub mod pipeline;
pub mod proxy;
pub mod resolver;

// Re-export main types for library usage
pub use extract::extract;
pub use images::{resolve_display_url, DisplayAttempt, ImageSet};
pub use models::ProductRecord;
pub use network::{FetchError, HttpClient};
pub use pipeline::{analyze, from_manual_fields, from_manual_html, AnalyzeError, ManualFields};
