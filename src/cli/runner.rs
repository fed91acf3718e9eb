//! CLI runner - executes discovery or a sync run

use crate::auth::{Authenticator, GrantObserver, TokenGrant};
use crate::catalog::Catalog;
use crate::cli::commands::{Cli, Mode};
use crate::client::{EloquaClient, Transport};
use crate::config::{check_bulk_page_size, update_config_file, TapConfig};
use crate::discover::DiscoveryContext;
use crate::error::{Error, Result, ResultExt};
use crate::output::StdoutWriter;
use crate::state::StateManager;
use crate::sync::{SyncConfig, SyncEngine};
use crate::types::{parse_timestamp_str, JsonObject, JsonValue};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = TapConfig::from_file(&self.cli.config)?;
        let authenticator = self.build_authenticator(&config)?;
        let client: Arc<dyn Transport> = Arc::new(EloquaClient::from_config(&config, authenticator)?);

        match self.cli.mode() {
            Mode::Discover => self.discover(client).await,
            Mode::Sync => self.sync(&config, client).await,
        }
    }

    /// Build the authenticator, writing rotated credentials back to the config file
    fn build_authenticator(&self, config: &TapConfig) -> Result<Arc<Authenticator>> {
        let auth = Authenticator::new(config.auth_config(self.cli.dev)?)
            .on_grant(grant_observer(self.cli.config.clone()));
        Ok(Arc::new(auth))
    }

    /// Print the catalog
    async fn discover(&self, client: Arc<dyn Transport>) -> Result<()> {
        info!("Running discovery");
        let context = DiscoveryContext::new(client);
        let catalog = context.catalog().await?;
        println!("{}", serde_json::to_string_pretty(catalog)?);
        Ok(())
    }

    /// Sync the selected streams
    async fn sync(&self, config: &TapConfig, client: Arc<dyn Transport>) -> Result<()> {
        let catalog_path = self
            .cli
            .catalog
            .as_ref()
            .ok_or_else(|| Error::config("A catalog is required to sync (use --catalog)"))?;
        let catalog = Catalog::from_file(catalog_path)
            .with_context(|| format!("Unable to load catalog {}", catalog_path.display()))?;

        let state = self.load_state()?;
        let sync_config = sync_config(config)?;

        info!(
            streams = ?catalog.selected_streams(),
            start_date = %config.start_date,
            "Starting sync"
        );

        let mut engine = SyncEngine::new(client, state, Arc::new(StdoutWriter::new()), sync_config);
        let stats = engine.sync(&catalog).await?;

        info!(
            records = stats.records_synced,
            pages = stats.pages_fetched,
            exports_created = stats.exports_created,
            exports_resumed = stats.exports_resumed,
            "Run finished"
        );
        Ok(())
    }

    /// Load state from `--state`, persisting to `--output-state` when given
    fn load_state(&self) -> Result<StateManager> {
        let state = match &self.cli.state {
            Some(path) => StateManager::from_file(path)?,
            None => StateManager::in_memory(),
        };
        Ok(match &self.cli.output_state {
            Some(path) => state.persist_to(path),
            None => state,
        })
    }
}

/// Sync settings derived from the connector config
pub fn sync_config(config: &TapConfig) -> Result<SyncConfig> {
    let start_date = parse_timestamp_str(&config.start_date).ok_or_else(|| Error::InvalidConfigValue {
        field: "start_date".to_string(),
        message: format!("'{}' is not a valid timestamp", config.start_date),
    })?;
    let page_size = check_bulk_page_size(config.bulk_page_size)?;
    Ok(SyncConfig::new(start_date).with_page_size(page_size))
}

/// Observer that merges each new grant into the config file at `path`
pub fn grant_observer(path: PathBuf) -> GrantObserver {
    Arc::new(move |grant: &TokenGrant| write_grant(&path, grant))
}

fn write_grant(path: &Path, grant: &TokenGrant) -> Result<()> {
    let mut updates = JsonObject::new();
    updates.insert(
        "refresh_token".to_string(),
        JsonValue::String(grant.refresh_token.clone()),
    );
    updates.insert(
        "access_token".to_string(),
        JsonValue::String(grant.access_token.clone()),
    );
    updates.insert(
        "expires_in".to_string(),
        JsonValue::String(grant.expires_at.to_rfc3339()),
    );
    update_config_file(path, updates)?;
    info!(path = %path.display(), "Saved rotated credentials");
    Ok(())
}
