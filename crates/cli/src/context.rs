// Wiring from resolved configuration to the components

use vizdash_ai::{Dispatcher, GeminiClient};
use vizdash_config::ResolvedConfig;
use vizdash_engine::{DashError, Dashboard};
use vizdash_tableau_client::TableauClient;

use crate::CliError;

pub type SiteDashboard = Dashboard<TableauClient>;

pub fn load_config() -> Result<ResolvedConfig, CliError> {
    ResolvedConfig::load().map_err(CliError::config)
}

/// A dashboard over the configured site. Missing Tableau settings are
/// fatal here (exit 10).
pub fn open_dashboard(config: &ResolvedConfig) -> Result<SiteDashboard, CliError> {
    let tableau = config.tableau().map_err(CliError::config)?;
    let client = TableauClient::from_config(&tableau)
        .map_err(|e| CliError::dash(DashError::from(e)))?;
    tracing::debug!(server = %tableau.server_url, ttl_secs = config.cache_ttl.as_secs(), "dashboard ready");
    Ok(Dashboard::new(client, config.cache_ttl))
}

/// The Gemini dispatcher. Fails with exit 11 when no key is configured.
pub fn open_dispatcher(config: &ResolvedConfig) -> Result<Dispatcher<GeminiClient>, CliError> {
    config.ai.require_key().map_err(CliError::config)?;
    let client = GeminiClient::from_config(&config.ai)
        .map_err(|e| CliError::dispatch(e.into()))?;
    Ok(Dispatcher::new(client, &config.prompt))
}
