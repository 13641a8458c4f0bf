//! Direct Apify backend.
//!
//! Runs the Instagram profile scraper synchronously and reads the follower
//! count from the first dataset item.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{FetchError, FollowerFetcher};
use crate::models::Handle;

const BASE_URL: &str = "https://api.apify.com/v2";

/// Actor ID for the Instagram profile scraper.
pub const INSTAGRAM_PROFILE_SCRAPER: &str = "7RQ4RlfRihUhflQtJ";

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Serialize)]
struct ProfileScraperInput<'a> {
    usernames: [&'a str; 1],
}

/// The fields we need from a scraped profile. Actors disagree on the key.
#[derive(Debug, Deserialize)]
struct ProfileItem {
    #[serde(rename = "followersCount", default)]
    followers_count: Option<i64>,
    #[serde(default)]
    followers: Option<i64>,
}

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApifyFetcher {
    client: Client,
    token: String,
    actor_id: String,
    base_url: String,
}

impl ApifyFetcher {
    pub fn new(token: String, actor_id: String, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            token,
            actor_id,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Point the fetcher at another API root (self-hosted proxy, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn run_url(&self) -> String {
        format!(
            "{}/acts/{}/run-sync-get-dataset-items",
            self.base_url.trim_end_matches('/'),
            self.actor_id
        )
    }

    async fn run_scraper(&self, handle: &Handle) -> Result<Vec<ProfileItem>, FetchError> {
        let url = self.run_url();
        let input = ProfileScraperInput {
            usernames: [handle.as_str()],
        };
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.token)
                .json(&input)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                let body = response.text().await?;
                return serde_json::from_str(&body).map_err(|e| {
                    FetchError::InvalidResponse(format!(
                        "{}: {}",
                        e,
                        FetchError::truncate_body(&body)
                    ))
                });
            }

            if status.as_u16() == 429 {
                retries += 1;
                if retries > MAX_RATE_LIMIT_RETRIES {
                    return Err(FetchError::RateLimited);
                }
                warn!(handle = %handle, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2; // Exponential backoff
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::from_status(status, &body));
        }
    }
}

/// Pull the follower count out of the scraper's dataset items.
fn followers_from_items(items: &[ProfileItem], handle: &Handle) -> Result<u64, FetchError> {
    let item = items
        .first()
        .ok_or_else(|| FetchError::NoData(handle.to_string()))?;

    let count = item
        .followers_count
        .or(item.followers)
        .ok_or_else(|| FetchError::InvalidResponse("no followers count in profile item".to_string()))?;

    u64::try_from(count).map_err(|_| FetchError::InvalidOutput(count.to_string()))
}

#[async_trait]
impl FollowerFetcher for ApifyFetcher {
    async fn fetch_followers(&self, handle: &Handle) -> Result<u64, FetchError> {
        debug!(handle = %handle, actor = %self.actor_id, "Running Apify profile scraper");
        let items = self.run_scraper(handle).await?;
        let followers = followers_from_items(&items, handle)?;
        debug!(handle = %handle, followers, "Apify returned follower count");
        Ok(followers)
    }

    fn name(&self) -> &'static str {
        "apify"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> Handle {
        Handle::parse("some.user").unwrap()
    }

    fn items(json: &str) -> Vec<ProfileItem> {
        serde_json::from_str(json).expect("parse profile items")
    }

    #[test]
    fn test_followers_count_key() {
        let parsed = items(r#"[{"username":"some.user","followersCount":8412,"followsCount":300}]"#);
        assert_eq!(followers_from_items(&parsed, &handle()).unwrap(), 8412);
    }

    #[test]
    fn test_followers_fallback_key() {
        let parsed = items(r#"[{"followers":77}]"#);
        assert_eq!(followers_from_items(&parsed, &handle()).unwrap(), 77);
    }

    #[test]
    fn test_prefers_followers_count() {
        let parsed = items(r#"[{"followersCount":10,"followers":20}]"#);
        assert_eq!(followers_from_items(&parsed, &handle()).unwrap(), 10);
    }

    #[test]
    fn test_empty_dataset() {
        assert!(matches!(
            followers_from_items(&[], &handle()),
            Err(FetchError::NoData(h)) if h == "some.user"
        ));
    }

    #[test]
    fn test_missing_or_negative_count() {
        let parsed = items(r#"[{"username":"some.user"}]"#);
        assert!(matches!(
            followers_from_items(&parsed, &handle()),
            Err(FetchError::InvalidResponse(_))
        ));

        let parsed = items(r#"[{"followersCount":-1}]"#);
        assert!(matches!(
            followers_from_items(&parsed, &handle()),
            Err(FetchError::InvalidOutput(_))
        ));
    }

    #[test]
    fn test_run_url() {
        let fetcher = ApifyFetcher::new("t".into(), INSTAGRAM_PROFILE_SCRAPER.into(), Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://localhost:9000/v2/");
        assert_eq!(
            fetcher.run_url(),
            "http://localhost:9000/v2/acts/7RQ4RlfRihUhflQtJ/run-sync-get-dataset-items"
        );
    }

    #[test]
    fn test_input_shape() {
        let handle = handle();
        let input = ProfileScraperInput {
            usernames: [handle.as_str()],
        };
        assert_eq!(serde_json::to_string(&input).unwrap(), r#"{"usernames":["some.user"]}"#);
    }
}
