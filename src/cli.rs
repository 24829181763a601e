use clap::{Parser, Subcommand};

/// CLI entry point for the product analyzer.
/// Exit codes: 0=success, 1=pipeline failure, 2=invalid arguments
#[derive(Parser, Debug)]
#[command(name = "aliviral")]
#[command(about = "AliExpress product analyzer - extracts structured product data via CORS proxies")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a product URL: resolve, fetch through proxies, extract.
    Analyze {
        #[arg(help = "Product URL (full or shortened affiliate link)")]
        url: String,

        #[arg(
            long,
            default_value = "./logs",
            help = "Directory for rotated log files"
        )]
        log_dir: String,

        #[arg(long, help = "Print the record as compact JSON instead of pretty")]
        compact: bool,
    },

    /// Extract a record from a saved HTML file (offline / pasted source).
    Extract {
        #[arg(short, long, help = "Path to the HTML file")]
        file: String,

        #[arg(
            short,
            long,
            default_value = "",
            help = "Source URL the HTML was fetched from (enables URL-based price recovery)"
        )]
        source_url: String,

        #[arg(long, default_value = "./logs", help = "Directory for rotated log files")]
        log_dir: String,

        #[arg(long, help = "Print the record as compact JSON instead of pretty")]
        compact: bool,
    },

    /// Build a record from manual-entry fields when extraction fails.
    Manual {
        #[arg(long, help = "Product title")]
        title: Option<String>,

        #[arg(long, help = "Current price, e.g. \"$9.99\"")]
        price: Option<String>,

        #[arg(long, help = "Original (pre-discount) price")]
        old_price: Option<String>,

        #[arg(long, help = "Discount percentage, with or without the % sign")]
        discount: Option<String>,

        #[arg(long, help = "Product description")]
        description: Option<String>,

        #[arg(
            long,
            help = "Image URLs, newline- or comma-delimited"
        )]
        images: Option<String>,

        #[arg(long, default_value = "./logs", help = "Directory for rotated log files")]
        log_dir: String,

        #[arg(long, help = "Print the record as compact JSON instead of pretty")]
        compact: bool,
    },
}

impl Cli {
    /// Parse CLI arguments; on error, clap prints help and exits with code 2.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
