use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{redirect, Client, ClientBuilder, StatusCode};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::clock::{Clock, SystemClock};
use crate::config::SensorConfig;
use crate::error::{FetchError, SetupError};
use crate::snapshot::Snapshot;

/// What a call to [`SharedPolledResource::refresh`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The refresh interval has not elapsed since the last attempt.
    Fresh,
    /// Another caller is already fetching.
    Busy,
    Updated,
    Failed,
}

#[derive(Debug, Default)]
struct CacheState {
    snapshot: Option<Arc<Snapshot>>,
    last_fetch: Option<DateTime<Utc>>,
}

/// Throttled fetcher for one channel, shared by every reading view of that
/// channel.
///
/// At most one request is in flight at a time. Callers that arrive while a
/// fetch is running return immediately and keep seeing the previous snapshot.
pub struct SharedPolledResource {
    client: Client,
    url: Url,
    channel: String,
    refresh_interval: Duration,
    clock: Arc<dyn Clock>,
    fetching: AtomicBool,
    state: RwLock<CacheState>,
}

/// Clears the fetching flag when dropped, whichever way the fetch exits.
struct FetchGuard<'a> {
    fetching: &'a AtomicBool,
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.fetching.store(false, Ordering::Release);
    }
}

pub fn build_client(config: &SensorConfig) -> Result<Client, SetupError> {
    let client = ClientBuilder::new()
        .redirect(redirect::Policy::limited(5))
        .timeout(config.request_timeout())
        .user_agent(concat!("ubibot-core/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

fn channel_url(config: &SensorConfig) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&config.endpoint)?;
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(["channels", config.channel.as_str()]);
    url.query_pairs_mut().append_pair("account_key", &config.api_key);
    Ok(url)
}

impl SharedPolledResource {
    /// Build the resource without fetching. The first [`refresh`](Self::refresh)
    /// always goes to the network.
    pub fn new(
        client: Client,
        config: &SensorConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SetupError> {
        Ok(Self {
            client,
            url: channel_url(config)?,
            channel: config.channel.clone(),
            refresh_interval: config.refresh_period(),
            clock,
            fetching: AtomicBool::new(false),
            state: RwLock::new(CacheState::default()),
        })
    }

    /// Build the resource with a default HTTP client and the system clock, and
    /// perform the initial fetch.
    pub async fn connect(config: &SensorConfig) -> Result<Arc<Self>, SetupError> {
        let client = build_client(config)?;
        Self::connect_with(client, config, Arc::new(SystemClock)).await
    }

    pub async fn connect_with(
        client: Client,
        config: &SensorConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Arc<Self>, SetupError> {
        let resource = Arc::new(Self::new(client, config, clock)?);
        if resource.refresh().await == RefreshOutcome::Failed {
            warn!(
                channel = %resource.channel,
                "initial fetch failed, readings unavailable until the next refresh"
            );
        }
        Ok(resource)
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    pub async fn current_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.state.read().await.snapshot.clone()
    }

    /// Completion time of the last fetch attempt, successful or not.
    pub async fn last_fetch(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.last_fetch
    }

    /// Fetch a new snapshot if the refresh interval has elapsed and no other
    /// fetch is running. Never waits for another caller's fetch.
    pub async fn refresh(&self) -> RefreshOutcome {
        if !self.is_stale().await {
            return RefreshOutcome::Fresh;
        }
        let Some(_guard) = self.try_begin_fetch() else {
            debug!(channel = %self.channel, "fetch already in progress, skipping");
            return RefreshOutcome::Busy;
        };
        // A fetch may have completed between the staleness check and the swap.
        if !self.is_stale().await {
            return RefreshOutcome::Fresh;
        }

        let result = self.fetch().await;
        let completed_at = self.clock.now();
        let mut state = self.state.write().await;
        state.last_fetch = Some(completed_at);
        match result {
            Ok(snapshot) => {
                info!(
                    channel = %self.channel,
                    fields = snapshot.fields.len(),
                    "channel snapshot updated"
                );
                state.snapshot = Some(Arc::new(snapshot));
                RefreshOutcome::Updated
            }
            Err(FetchError::Status(status)) => {
                error!(
                    channel = %self.channel,
                    status = status.as_u16(),
                    "channel request rejected"
                );
                RefreshOutcome::Failed
            }
            Err(err) => {
                warn!(channel = %self.channel, error = %err, "failed to fetch channel");
                RefreshOutcome::Failed
            }
        }
    }

    async fn is_stale(&self) -> bool {
        let Some(last_fetch) = self.state.read().await.last_fetch else {
            return true;
        };
        // A clock that moved backwards counts as not yet elapsed.
        (self.clock.now() - last_fetch)
            .to_std()
            .map(|elapsed| elapsed >= self.refresh_interval)
            .unwrap_or(false)
    }

    fn try_begin_fetch(&self) -> Option<FetchGuard<'_>> {
        self.fetching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FetchGuard {
                fetching: &self.fetching,
            })
    }

    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        // Strip the URL from transport errors, it carries the account key.
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status));
        }
        let body = response.bytes().await.map_err(reqwest::Error::without_url)?;
        let snapshot = Snapshot::from_body(&body, self.clock.now())?;
        Ok(snapshot)
    }
}
