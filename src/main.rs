//! app-reviews - Scrape Google Play and App Store reviews into CSV files

use anyhow::Result;
use app_reviews::commands::{BatchCommand, ReviewsCommand, RunReport};
use app_reviews::config::{Config, Overrides, SortOrder};
use app_reviews::format::format_report;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "app-reviews",
    version,
    about = "Scrape Google Play and App Store reviews into CSV files",
    long_about = "Reads google_app_package_url and apple_app_package_url from the environment \
                  and writes every review of each app to a CSV file per store."
)]
struct Cli {
    /// Review language (default: en)
    #[arg(short, long, global = true, env = "lang")]
    lang: Option<String>,

    /// Store country (default: from the App Store URL, else us)
    #[arg(long, global = true, env = "country")]
    country: Option<String>,

    /// Directory receiving the CSV files
    #[arg(short, long, global = true, env = "RESULT_FOLDER")]
    result_dir: Option<PathBuf>,

    /// Proxy URL (e.g., socks5://host:port)
    #[arg(long, global = true, env = "APP_REVIEWS_PROXY")]
    proxy: Option<String>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every configured store (default)
    Run,

    /// Scrape Google Play reviews
    #[command(alias = "g")]
    Google {
        /// Play Store details URL
        url: String,

        /// Review sort order: most-relevant, newest, rating
        #[arg(long)]
        sort: Option<SortOrder>,
    },

    /// Scrape App Store reviews
    #[command(alias = "a")]
    Apple {
        /// App Store app URL
        url: String,
    },

    /// Export App Store details and reviews for keywords and app links
    #[command(alias = "b")]
    Batch {
        /// Comma-separated search keywords (env: KEYWORD)
        #[arg(short, long)]
        keyword: Option<String>,

        /// Comma-separated App Store links (env: URLS)
        #[arg(short, long)]
        urls: Option<String>,

        /// Do not expand keywords with store suggestions
        #[arg(long)]
        no_suggestions: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let mut overrides = Overrides {
        lang: cli.lang,
        country: cli.country,
        result_dir: cli.result_dir,
        proxy: cli.proxy,
        ..Overrides::default()
    };

    let command = cli.command.unwrap_or(Commands::Run);
    match &command {
        Commands::Run => {}
        Commands::Google { url, sort } => {
            overrides.google_url = Some(url.clone());
            overrides.google_sort = *sort;
        }
        Commands::Apple { url } => overrides.apple_url = Some(url.clone()),
        Commands::Batch { keyword, urls, no_suggestions } => {
            overrides.keyword = keyword.clone();
            overrides.urls = urls.clone();
            overrides.no_suggestions = *no_suggestions;
        }
    }

    // Load config with layered overrides
    let config = Config::load(cli.config.as_deref())?.with_env().with_overrides(overrides);

    let report = match command {
        Commands::Run => ReviewsCommand::new(config).execute().await,

        Commands::Google { .. } => {
            let google = ReviewsCommand::new(config).run_google().await;
            RunReport { google, apple: skipped_by_cli() }
        }

        Commands::Apple { .. } => {
            let apple = ReviewsCommand::new(config).run_apple().await;
            RunReport { google: skipped_by_cli(), apple }
        }

        Commands::Batch { .. } => {
            let report = BatchCommand::new(config).execute().await?;
            println!(
                "{} apps, {} reviews\n  {}\n  {}",
                report.apps,
                report.reviews,
                report.details_file.display(),
                report.reviews_file.display()
            );
            return Ok(());
        }
    };

    println!("{}", format_report(&report));

    if report.has_failures() {
        std::process::exit(1);
    }

    Ok(())
}

fn skipped_by_cli() -> app_reviews::Outcome {
    app_reviews::Outcome::Skipped(app_reviews::ReviewError::MissingConfig("not selected"))
}
