//! External follower-count sources.
//!
//! A fetcher turns a handle into a follower count or fails; it knows nothing
//! about caching. Two backends exist:
//!
//! - `ScriptFetcher`: runs a configured program that prints the count on stdout
//! - `ApifyFetcher`: calls the Apify Instagram profile scraper directly

pub mod apify;
pub mod error;
pub mod script;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::auth;
use crate::config::{Config, FetcherConfig};
use crate::models::Handle;

pub use apify::ApifyFetcher;
pub use error::FetchError;
pub use script::ScriptFetcher;

#[async_trait]
pub trait FollowerFetcher: Send + Sync {
    async fn fetch_followers(&self, handle: &Handle) -> Result<u64, FetchError>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

/// Parse a fetcher's textual output as a follower count.
pub fn parse_count(output: &str) -> Result<u64, FetchError> {
    let trimmed = output.trim();
    trimmed
        .parse::<u64>()
        .map_err(|_| FetchError::InvalidOutput(FetchError::truncate_body(trimmed)))
}

/// Build the fetcher selected in `config`.
///
/// The Apify token is resolved from the environment or the OS keychain. The
/// Apify backend requires it; scripts receive it as `APIFY_TOKEN` when known.
pub fn from_config(config: &Config) -> Result<Arc<dyn FollowerFetcher>> {
    let token = auth::resolve_apify_token();
    let fetcher: Arc<dyn FollowerFetcher> = match &config.fetcher {
        FetcherConfig::Script { program, args } => {
            let mut fetcher = ScriptFetcher::new(program.clone(), args.clone());
            if let Some(token) = token {
                fetcher = fetcher.with_env(auth::APIFY_TOKEN_ENV, token);
            }
            Arc::new(fetcher)
        }
        FetcherConfig::Apify { actor_id, base_url } => {
            let token = token.ok_or(FetchError::MissingToken)?;
            let mut fetcher = ApifyFetcher::new(token, actor_id.clone(), config.fetch_timeout())?;
            if let Some(base_url) = base_url {
                fetcher = fetcher.with_base_url(base_url.clone());
            }
            Arc::new(fetcher)
        }
    };
    debug!(fetcher = fetcher.name(), "Configured follower fetcher");
    Ok(fetcher)
}
