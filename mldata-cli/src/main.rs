//! mldata command line client
//!
//! Inspects and exports datasets hosted on a remote mldata service.
//!
//! # Usage
//!
//! ```bash
//! # Show a dataset's fields and counts
//! mldata --url http://localhost:5555 info alice/cats
//!
//! # List the identifiers of the second page
//! mldata --config mldata.toml keys cats --page 1
//!
//! # Export metadata as CSV plus content files named 0.png, 1.png, ...
//! mldata export alice/cats ./cats --format csv --extension png --numbered-ids
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mldata_core::{Client, ClientConfig, ExportOptions, MetadataFormat};

/// mldata dataset client
#[derive(Parser, Debug)]
#[command(name = "mldata")]
#[command(about = "Command line client for remote mldata datasets")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "MLDATA_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the service (overrides the configuration file)
    #[arg(long)]
    url: Option<String>,

    /// Bearer token (overrides the configuration file)
    #[arg(long, env = "MLDATA_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Owner namespace for dataset names without a '/'
    #[arg(long)]
    token_prefix: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a dataset's fields and counts
    Info {
        /// Dataset name, `owner/name` or bare `name`
        dataset: String,
    },

    /// Print element identifiers, one per line
    Keys {
        dataset: String,

        /// Only this page, fetched directly
        #[arg(long)]
        page: Option<usize>,
    },

    /// Save metadata and content to a local folder
    Export {
        dataset: String,

        /// Destination folder, created if missing
        folder: PathBuf,

        /// Metadata format (json, csv)
        #[arg(long, default_value = "json")]
        format: MetadataFormat,

        /// Extension appended to content file names
        #[arg(long)]
        extension: Option<String>,

        /// Name content files by position instead of identifier
        #[arg(long)]
        numbered_ids: bool,

        /// Skip content files
        #[arg(long)]
        only_metadata: bool,
    },
}

fn load_config(args: &Args) -> mldata_core::Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    }
    .with_env_overrides();

    if let Some(url) = &args.url {
        config.server.url = url.clone();
    }
    if let Some(token) = &args.token {
        config.server.token = Some(token.clone());
    }
    if let Some(prefix) = &args.token_prefix {
        config.server.token_prefix = Some(prefix.clone());
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let filter = tracing_subscriber::filter::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(&args)?;
    tracing::debug!("Connecting to {}", config.server.url);
    let client = Client::from_config(config).await?;

    match args.command {
        Command::Info { dataset } => {
            let dataset = client.dataset(&dataset).await?;
            println!("{}", dataset);
            println!("  url_prefix: {}", dataset.url_prefix());
            println!("  comments:   {}", dataset.comments_count());
            println!("  page size:  {}", dataset.page_size());
        }
        Command::Keys { dataset, page } => {
            let dataset = client.dataset(&dataset).await?;
            for key in dataset.keys(page).await? {
                println!("{}", key);
            }
        }
        Command::Export {
            dataset,
            folder,
            format,
            extension,
            numbered_ids,
            only_metadata,
        } => {
            let dataset = client.dataset(&dataset).await?;
            let options = ExportOptions {
                format,
                extension,
                numbered_ids,
                only_metadata,
            };
            let summary = dataset.save_to_folder(&folder, &options).await?;
            tracing::info!(
                "Exported {} elements ({} content files) to {}",
                summary.elements,
                summary.content_files,
                summary.folder.display()
            );
        }
    }

    Ok(())
}
