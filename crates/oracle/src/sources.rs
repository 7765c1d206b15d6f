//! External signal sources.
//!
//! Each provider answers `GET {base_url}/{identity}` with a JSON object
//! carrying a `score` and arbitrary numeric metrics. The identity is always
//! sent as a single percent-encoded path segment. Providers are optional:
//! calls are bounded by a timeout and any failure degrades to "no report".

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aura_core::types::WalletAddress;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::SourcesConfig;

const MAX_REPORT_BYTES: usize = 256 * 1024;

/// A provider's answer about one identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalReport {
    /// Provider score (0-100 for identity providers).
    #[serde(default)]
    pub score: f64,

    /// Every other field of the response.
    #[serde(default, flatten)]
    pub metrics: Map<String, Value>,
}

impl SignalReport {
    /// Report with only a score.
    pub fn with_score(score: f64) -> Self {
        Self {
            score,
            metrics: Map::new(),
        }
    }

    /// Add a metric.
    pub fn metric_value(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.metrics.insert(name.to_string(), value.into());
        self
    }

    /// Numeric metric; numeric strings are accepted.
    pub fn metric(&self, name: &str) -> Option<f64> {
        match self.metrics.get(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|v| v.is_finite())
    }

    /// Score if finite.
    pub fn finite_score(&self) -> Option<f64> {
        Some(self.score).filter(|s| s.is_finite())
    }
}

/// A provider of identity or activity signals.
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// Provider name, for logs.
    fn name(&self) -> &str;

    /// Fetch the report for `identity`.
    async fn fetch(&self, identity: &str) -> Result<SignalReport>;
}

/// JSON-over-HTTP provider.
#[derive(Clone)]
pub struct HttpSignalSource {
    name: String,
    base_url: Url,
    client: Client,
}

impl HttpSignalSource {
    pub fn new(name: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid {} source URL: {}", name, base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("{} source URL cannot carry a path: {}", name, base_url);
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent("aura-oracle/signals")
            .build()
            .context("Failed to build signal source HTTP client")?;

        Ok(Self {
            name: name.to_string(),
            base_url,
            client,
        })
    }

    /// `{base_url}/{identity}`, with `identity` encoded as one segment.
    fn identity_url(&self, identity: &str) -> Result<Url> {
        if matches!(identity, "" | "." | "..") {
            anyhow::bail!("Refusing {} lookup for identity {:?}", self.name, identity);
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("{} source URL cannot carry a path", self.name))?
            .pop_if_empty()
            .push(identity);
        Ok(url)
    }
}

#[async_trait]
impl SignalSource for HttpSignalSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, identity: &str) -> Result<SignalReport> {
        let url = self.identity_url(identity)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to reach {} source", self.name))?
            .error_for_status()
            .with_context(|| format!("{} source returned an error status", self.name))?;

        if let Some(len) = response.content_length() {
            if len as usize > MAX_REPORT_BYTES {
                anyhow::bail!("{} report too large ({} bytes)", self.name, len);
            }
        }

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read {} report", self.name))?;
        if bytes.len() > MAX_REPORT_BYTES {
            anyhow::bail!("{} report too large ({} bytes)", self.name, bytes.len());
        }

        serde_json::from_slice(&bytes).with_context(|| format!("Invalid {} report JSON", self.name))
    }
}

/// Provider stand-in that always reports a zero score.
#[derive(Debug, Clone)]
pub struct NullSignalSource {
    name: String,
}

impl NullSignalSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl SignalSource for NullSignalSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, _identity: &str) -> Result<SignalReport> {
        Ok(SignalReport::default())
    }
}

/// Reports gathered for one wallet. `None` means the provider failed or
/// timed out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedSignals {
    pub github: Option<SignalReport>,
    pub twitter: Option<SignalReport>,
    pub onchain: Option<SignalReport>,
    pub defi: Option<SignalReport>,
}

/// Fans out to every provider with a per-call timeout.
#[derive(Clone)]
pub struct SignalCollector {
    github: Arc<dyn SignalSource>,
    twitter: Arc<dyn SignalSource>,
    onchain: Arc<dyn SignalSource>,
    defi: Arc<dyn SignalSource>,
    timeout: Duration,
}

impl SignalCollector {
    pub fn new(
        github: Arc<dyn SignalSource>,
        twitter: Arc<dyn SignalSource>,
        onchain: Arc<dyn SignalSource>,
        defi: Arc<dyn SignalSource>,
        timeout: Duration,
    ) -> Self {
        Self {
            github,
            twitter,
            onchain,
            defi,
            timeout,
        }
    }

    /// Collector whose providers all report zero.
    pub fn null(timeout: Duration) -> Self {
        Self::new(
            Arc::new(NullSignalSource::new("github")),
            Arc::new(NullSignalSource::new("twitter")),
            Arc::new(NullSignalSource::new("onchain")),
            Arc::new(NullSignalSource::new("defi")),
            timeout,
        )
    }

    /// Build from the `[sources]` section; missing URLs become null sources.
    pub fn from_config(config: &SourcesConfig) -> Result<Self> {
        let timeout = config.timeout();
        let build = |name: &str, url: &Option<String>| -> Result<Arc<dyn SignalSource>> {
            let source: Arc<dyn SignalSource> = match url {
                Some(url) => Arc::new(HttpSignalSource::new(name, url, timeout)?),
                None => {
                    debug!(source = name, "No URL configured, using null signal source");
                    Arc::new(NullSignalSource::new(name))
                }
            };
            Ok(source)
        };

        Ok(Self::new(
            build("github", &config.github_url)?,
            build("twitter", &config.twitter_url)?,
            build("onchain", &config.onchain_url)?,
            build("defi", &config.defi_url)?,
            timeout,
        ))
    }

    /// Per-call timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch_bounded(&self, source: &dyn SignalSource, identity: &str) -> Option<SignalReport> {
        match tokio::time::timeout(self.timeout, source.fetch(identity)).await {
            Ok(Ok(report)) => Some(report),
            Ok(Err(e)) => {
                warn!(source = source.name(), identity, "Signal source failed: {:#}", e);
                None
            }
            Err(_) => {
                warn!(
                    source = source.name(),
                    identity,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Signal source timed out"
                );
                None
            }
        }
    }

    /// Query the on-chain provider alone.
    pub async fn onchain(&self, wallet: &WalletAddress) -> Option<SignalReport> {
        self.fetch_bounded(self.onchain.as_ref(), &wallet.to_string())
            .await
    }

    /// Query the identity providers with caller-supplied identities.
    pub async fn identity(
        &self,
        github: Option<&str>,
        twitter: Option<&str>,
    ) -> (Option<SignalReport>, Option<SignalReport>) {
        let github_fut = async {
            match github {
                Some(id) => self.fetch_bounded(self.github.as_ref(), id).await,
                None => None,
            }
        };
        let twitter_fut = async {
            match twitter {
                Some(id) => self.fetch_bounded(self.twitter.as_ref(), id).await,
                None => None,
            }
        };
        tokio::join!(github_fut, twitter_fut)
    }

    /// Query every provider for a wallet concurrently.
    pub async fn collect(&self, wallet: &WalletAddress) -> CollectedSignals {
        let identity = wallet.to_string();
        let (github, twitter, onchain, defi) = tokio::join!(
            self.fetch_bounded(self.github.as_ref(), &identity),
            self.fetch_bounded(self.twitter.as_ref(), &identity),
            self.fetch_bounded(self.onchain.as_ref(), &identity),
            self.fetch_bounded(self.defi.as_ref(), &identity),
        );

        CollectedSignals {
            github,
            twitter,
            onchain,
            defi,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_sources {
    use super::*;

    /// Returns a fixed report.
    pub struct StaticSource(pub SignalReport);

    #[async_trait]
    impl SignalSource for StaticSource {
        fn name(&self) -> &str {
            "static"
        }

        async fn fetch(&self, _identity: &str) -> Result<SignalReport> {
            Ok(self.0.clone())
        }
    }

    /// Always fails.
    pub struct FailingSource;

    #[async_trait]
    impl SignalSource for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        async fn fetch(&self, _identity: &str) -> Result<SignalReport> {
            anyhow::bail!("provider down")
        }
    }

    /// Never answers.
    pub struct HangingSource;

    #[async_trait]
    impl SignalSource for HangingSource {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn fetch(&self, _identity: &str) -> Result<SignalReport> {
            std::future::pending::<Result<SignalReport>>().await
        }
    }
}
