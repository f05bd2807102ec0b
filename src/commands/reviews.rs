//! Runs both marketplaces from configuration and reports per-store outcomes.

use crate::apple::{AppStore, AppStoreClient};
use crate::commands::apple::AppleCommand;
use crate::commands::google::{search_package, GoogleCommand};
use crate::config::{non_empty, Config};
use crate::error::{ReviewError, ReviewResult};
use crate::format::OutputFile;
use crate::google::{GooglePlay, GooglePlayClient};
use crate::target::{self, GooglePackage, Marketplace, Target};
use tracing::{error, info, warn};

/// What happened to one marketplace in a run.
#[derive(Debug)]
pub enum Outcome {
    Written(OutputFile),
    /// Not configured; not an error
    Skipped(ReviewError),
    Failed(ReviewError),
}

impl Outcome {
    fn from_result(marketplace: Marketplace, result: ReviewResult<OutputFile>) -> Self {
        match result {
            Ok(file) => Outcome::Written(file),
            Err(reason @ ReviewError::MissingConfig(_)) => {
                info!("Skipping {}: {}", marketplace, reason);
                Outcome::Skipped(reason)
            }
            Err(err) => {
                error!("{} failed: {}", marketplace, err);
                Outcome::Failed(err)
            }
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

/// Outcome of both marketplaces.
#[derive(Debug)]
pub struct RunReport {
    pub google: Outcome,
    pub apple: Outcome,
}

impl RunReport {
    pub fn outcomes(&self) -> [(Marketplace, &Outcome); 2] {
        [(Marketplace::Google, &self.google), (Marketplace::Apple, &self.apple)]
    }

    /// True when at least one configured marketplace failed.
    pub fn has_failures(&self) -> bool {
        self.google.is_failed() || self.apple.is_failed()
    }
}

/// Scrapes both stores as configured. Never fails; see the returned report.
pub async fn app_reviews(config: Config) -> RunReport {
    ReviewsCommand::new(config).execute().await
}

/// Orchestrates the Google Play and App Store runs.
pub struct ReviewsCommand {
    config: Config,
}

impl ReviewsCommand {
    /// Creates a new orchestration command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs both marketplaces against the live stores.
    pub async fn execute(&self) -> RunReport {
        let google = self.run_google().await;
        let apple = self.run_apple().await;
        RunReport { google, apple }
    }

    /// Runs both marketplaces with provided clients (for testing).
    pub async fn execute_with_clients(
        &self,
        google: &impl GooglePlay,
        apple: &impl AppStore,
    ) -> RunReport {
        let google = self.run_google_with_client(google).await;
        let apple = self.run_apple_with_client(apple).await;
        RunReport { google, apple }
    }

    /// Runs Google Play only, building the live client.
    pub async fn run_google(&self) -> Outcome {
        if let Err(reason) = self.require_url(Marketplace::Google) {
            return Outcome::from_result(Marketplace::Google, Err(reason));
        }

        match GooglePlayClient::new(&self.config) {
            Ok(client) => self.run_google_with_client(&client).await,
            Err(e) => Outcome::from_result(Marketplace::Google, Err(ReviewError::upstream(e))),
        }
    }

    /// Runs the App Store only, building the live client.
    pub async fn run_apple(&self) -> Outcome {
        if let Err(reason) = self.require_url(Marketplace::Apple) {
            return Outcome::from_result(Marketplace::Apple, Err(reason));
        }

        match AppStoreClient::new(&self.config) {
            Ok(client) => self.run_apple_with_client(&client).await,
            Err(e) => Outcome::from_result(Marketplace::Apple, Err(ReviewError::upstream(e))),
        }
    }

    pub async fn run_google_with_client(&self, client: &impl GooglePlay) -> Outcome {
        let result = self.scrape_google(client).await;
        Outcome::from_result(Marketplace::Google, result)
    }

    pub async fn run_apple_with_client(&self, client: &impl AppStore) -> Outcome {
        let result = async {
            let target = self.apple_target()?;
            info!("Scraping App Store reviews for {}", target.identifier);
            AppleCommand::new(self.config.clone()).execute_with_client(client, &target).await
        }
        .await;

        Outcome::from_result(Marketplace::Apple, result)
    }

    fn require_url(&self, marketplace: Marketplace) -> ReviewResult<&str> {
        let url = match marketplace {
            Marketplace::Google => self.config.google_url.as_deref(),
            Marketplace::Apple => self.config.apple_url.as_deref(),
        };
        non_empty(url).ok_or(ReviewError::MissingConfig(marketplace.env_key()))
    }

    /// Scrapes the package named in the URL; odd-looking ids that the store
    /// rejects are retried with the top search hit.
    async fn scrape_google(&self, client: &impl GooglePlay) -> ReviewResult<OutputFile> {
        let url = self.require_url(Marketplace::Google)?;
        let package = target::parse_google_url(url)?;
        let command = GoogleCommand::new(self.config.clone());

        let target = self.google_target(package.as_str());
        info!("Scraping Google Play reviews for {}", target.identifier);

        match (command.execute_with_client(client, &target).await, package) {
            (Err(err @ ReviewError::Upstream(_)), GooglePackage::NeedsSearch(query)) => {
                warn!("Package id '{}' failed ({}), falling back to search", query, err);
                let resolved = search_package(client, &query).await?;
                let target = self.google_target(&resolved);
                info!("Scraping Google Play reviews for {}", target.identifier);
                command.execute_with_client(client, &target).await
            }
            (result, _) => result,
        }
    }

    /// Builds the Google Play target for a package id.
    pub fn google_target(&self, package: &str) -> Target {
        Target::google(
            package,
            &target::resolve_country(&self.config),
            self.config.effective_lang(),
        )
    }

    /// Derives the App Store target.
    pub fn apple_target(&self) -> ReviewResult<Target> {
        let url = self.require_url(Marketplace::Apple)?;
        let app = target::parse_apple_url(url)?;

        Ok(Target::apple(
            &app.name,
            app.app_id,
            &target::resolve_country(&self.config),
            self.config.effective_lang(),
        ))
    }
}
