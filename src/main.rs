use thiserror::Error;
use tracing::error;

use aliviral::cli::{Cli, Commands};
use aliviral::models::ProductRecord;
use aliviral::pipeline::{self, ManualFields};
use aliviral::{logging, HttpClient};

#[derive(Error, Debug)]
pub enum MainError {
    #[error("Analysis failed: {0}")]
    Analyze(#[from] aliviral::AnalyzeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

#[tokio::main]
async fn main() -> Result<(), MainError> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Analyze {
            url,
            log_dir,
            compact,
        } => {
            init_logging(&log_dir)?;
            let client = HttpClient::new();
            match pipeline::analyze(&client, &url).await {
                Ok(record) => print_record(&record, compact)?,
                Err(e) => {
                    // Terminal pipeline failure: point the user at the manual
                    // fallback instead of dumping a backtrace.
                    error!(error = %e, "auto-analysis failed");
                    eprintln!("Auto-analysis failed: {}", e);
                    eprintln!("Fall back to manual entry: aliviral manual --title ... --price ...");
                    return Err(e.into());
                }
            }
        }
        Commands::Extract {
            file,
            source_url,
            log_dir,
            compact,
        } => {
            init_logging(&log_dir)?;
            let html = std::fs::read_to_string(&file)?;
            let record = pipeline::from_manual_html(&html, &source_url)?;
            print_record(&record, compact)?;
        }
        Commands::Manual {
            title,
            price,
            old_price,
            discount,
            description,
            images,
            log_dir,
            compact,
        } => {
            init_logging(&log_dir)?;
            let record = pipeline::from_manual_fields(ManualFields {
                title,
                price,
                old_price,
                discount,
                description,
                images,
            });
            print_record(&record, compact)?;
        }
    }

    Ok(())
}

fn init_logging(log_dir: &str) -> Result<(), MainError> {
    logging::init_logging(log_dir).map_err(|e| MainError::Logging(e.to_string()))
}

/// Print the record as JSON for downstream consumers (renderer, post
/// generator).
fn print_record(record: &ProductRecord, compact: bool) -> Result<(), MainError> {
    let json = if compact {
        serde_json::to_string(record)?
    } else {
        serde_json::to_string_pretty(record)?
    };
    println!("{}", json);
    Ok(())
}
