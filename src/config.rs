// Global configuration constants - single source of truth

pub struct Config;

impl Config {
    // Network timing
    pub const RESOLVE_TIMEOUT_SECS: u64 = 20;
    pub const FETCH_TIMEOUT_SECS: u64 = 25;
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;

    // Body acceptance heuristics
    pub const MIN_HTML_LEN: usize = 500;
    pub const GATEWAY_MAX_LEN: usize = 10_000;

    // Record shaping
    pub const MAX_IMAGES: usize = 30;
    pub const MAX_IMAGE_URL_LEN: usize = 300;
    pub const DESCRIPTION_MAX_LEN: usize = 250;
}
