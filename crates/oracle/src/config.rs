//! Configuration management for the Aura oracle.
//!
//! Configuration is loaded from a TOML file. Values may reference environment
//! variables with `${VAR_NAME}`; references inside TOML comments are left
//! untouched. Every section except `[database]` is optional and falls back to
//! the defaults below.

use anyhow::{Context, Result};
use aura_core::constants::{
    DEFAULT_FEATURE_TTL_SECS, DEFAULT_ISSUER_DID, DEFAULT_ORACLE_ADDRESS,
    DEFAULT_REFRESH_BATCH_SIZE, DEFAULT_REFRESH_INTERVAL_SECS, DEFAULT_SUBJECT_DID_PREFIX,
    FORCE_REFRESH_COOLDOWN_SECS, SCORE_HISTORY_CAP, SIGNIFICANT_CHANGE_THRESHOLD,
};
use aura_core::types::WalletAddress;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration for the oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Refresh scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Feature store configuration
    #[serde(default)]
    pub features: FeaturesConfig,

    /// External signal sources
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Credential issuance
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Oracle identity
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Event channel
    #[serde(default)]
    pub events: EventsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "sqlite://aura.db")
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Refresh scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Run the background refresh loop
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds slept between refresh cycles. Must be greater than 0.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Passports refreshed concurrently per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Absolute risk score change that emits a `passport_updated` event
    #[serde(default = "default_significant_change")]
    pub significant_change_threshold: f64,

    /// Score history entries kept per passport
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,

    /// Seconds a wallet must wait between forced refreshes
    #[serde(default = "default_cooldown_secs")]
    pub force_refresh_cooldown_secs: u64,
}

/// Feature store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    /// Cache features in memory (disabled = every read is a miss)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Default feature time-to-live in seconds
    #[serde(default = "default_feature_ttl_secs")]
    pub ttl_secs: u64,
}

/// External signal source configuration.
///
/// A source without a base URL is replaced by a null source that always
/// reports a zero score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Per-call timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// GitHub-like identity provider base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,

    /// Twitter-like identity provider base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter_url: Option<String>,

    /// On-chain activity reader base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onchain_url: Option<String>,

    /// DeFi activity reader base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defi_url: Option<String>,
}

/// Credential issuance configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Issuer DID embedded in credentials and checked on issuance
    #[serde(default = "default_issuer_did")]
    pub issuer_did: String,

    /// Prefix for subject DIDs; the wallet address is appended
    #[serde(default = "default_subject_did_prefix")]
    pub subject_did_prefix: String,
}

/// Oracle identity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Address embedded in assessment proofs
    #[serde(default = "default_oracle_address")]
    pub address: String,
}

/// Event channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Publish events (disabled = events are dropped silently)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Bounded channel capacity; new events are rejected when full
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

fn default_batch_size() -> usize {
    DEFAULT_REFRESH_BATCH_SIZE
}

fn default_significant_change() -> f64 {
    SIGNIFICANT_CHANGE_THRESHOLD
}

fn default_history_cap() -> usize {
    SCORE_HISTORY_CAP
}

fn default_cooldown_secs() -> u64 {
    FORCE_REFRESH_COOLDOWN_SECS
}

fn default_feature_ttl_secs() -> u64 {
    DEFAULT_FEATURE_TTL_SECS
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_issuer_did() -> String {
    DEFAULT_ISSUER_DID.to_string()
}

fn default_subject_did_prefix() -> String {
    DEFAULT_SUBJECT_DID_PREFIX.to_string()
}

fn default_oracle_address() -> String {
    DEFAULT_ORACLE_ADDRESS.to_string()
}

fn default_event_capacity() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
            batch_size: default_batch_size(),
            significant_change_threshold: default_significant_change(),
            history_cap: default_history_cap(),
            force_refresh_cooldown_secs: default_cooldown_secs(),
        }
    }
}

impl SchedulerConfig {
    /// Cycle interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Forced refresh cooldown as a duration.
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.force_refresh_cooldown_secs)
    }
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_feature_ttl_secs(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            github_url: None,
            twitter_url: None,
            onchain_url: None,
            defi_url: None,
        }
    }
}

impl SourcesConfig {
    /// Per-call timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            issuer_did: default_issuer_did(),
            subject_did_prefix: default_subject_did_prefix(),
        }
    }
}

impl CredentialsConfig {
    /// Subject DID for a wallet.
    pub fn subject_did(&self, wallet: &WalletAddress) -> String {
        format!("{}{}", self.subject_did_prefix, wallet)
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            address: default_oracle_address(),
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: default_event_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables can be referenced using `${VAR_NAME}` syntax.
    /// For example: `url = "${AURA_DATABASE_URL}"`
    ///
    /// # Example
    /// ```no_run
    /// # use aura_oracle::config::Config;
    /// let config = Config::from_file("aura.toml")?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let expanded = Self::expand_env_vars(&contents)?;

        let config: Config = toml::from_str(&expanded)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml).context("Failed to parse TOML configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Deterministic configuration for tests and embedded use.
    ///
    /// The scheduler is disabled and no signal source URLs are set.
    pub fn for_test(database_url: impl Into<String>) -> Self {
        Self {
            server: ServerConfig { port: 0 },
            database: DatabaseConfig {
                url: database_url.into(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
            },
            scheduler: SchedulerConfig {
                enabled: false,
                ..SchedulerConfig::default()
            },
            features: FeaturesConfig::default(),
            sources: SourcesConfig {
                timeout_ms: 500,
                ..SourcesConfig::default()
            },
            credentials: CredentialsConfig::default(),
            oracle: OracleConfig::default(),
            events: EventsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }
        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }
        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot exceed max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.scheduler.interval_secs == 0 {
            anyhow::bail!("Scheduler interval_secs must be greater than 0");
        }
        if self.scheduler.batch_size == 0 {
            anyhow::bail!("Scheduler batch_size must be greater than 0");
        }
        if self.scheduler.history_cap == 0 {
            anyhow::bail!("Scheduler history_cap must be greater than 0");
        }
        let threshold = self.scheduler.significant_change_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            anyhow::bail!(
                "Scheduler significant_change_threshold must be a non-negative number (got {})",
                threshold
            );
        }

        if self.features.ttl_secs == 0 {
            anyhow::bail!("Features ttl_secs must be greater than 0");
        }

        if self.sources.timeout_ms == 0 {
            anyhow::bail!("Sources timeout_ms must be greater than 0");
        }
        for (name, url) in [
            ("github_url", &self.sources.github_url),
            ("twitter_url", &self.sources.twitter_url),
            ("onchain_url", &self.sources.onchain_url),
            ("defi_url", &self.sources.defi_url),
        ] {
            if let Some(url) = url {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    anyhow::bail!(
                        "Sources {} must start with one of: http://, https:// (got {})",
                        name,
                        url
                    );
                }
            }
        }

        if self.credentials.issuer_did.trim().is_empty() {
            anyhow::bail!("Credentials issuer_did cannot be empty");
        }
        if !self.credentials.subject_did_prefix.starts_with("did:") {
            anyhow::bail!("Credentials subject_did_prefix must start with 'did:'");
        }

        self.oracle
            .address
            .parse::<WalletAddress>()
            .with_context(|| format!("Invalid oracle address: {}", self.oracle.address))?;

        if self.events.capacity == 0 {
            anyhow::bail!("Events capacity must be greater than 0");
        }

        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            anyhow::bail!(
                "Logging format must be 'json' or 'pretty' (got {})",
                self.logging.format
            );
        }

        Ok(())
    }

    /// Expand `${VAR_NAME}` placeholders.
    ///
    /// Placeholders are expanded inside and outside TOML strings, but not
    /// after a `#` that starts a comment. Fails if a referenced variable is
    /// unset, a placeholder is unclosed, or a name is empty.
    fn expand_env_vars(input: &str) -> Result<String> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Lex {
            Bare,
            Basic,
            Literal,
            MultiBasic,
            MultiLiteral,
            Comment,
        }

        let chars: Vec<char> = input.chars().collect();
        let mut out = String::with_capacity(input.len());
        let mut state = Lex::Bare;
        let mut i = 0;

        let triple = |at: usize, quote: char| {
            chars.get(at) == Some(&quote)
                && chars.get(at + 1) == Some(&quote)
                && chars.get(at + 2) == Some(&quote)
        };

        while i < chars.len() {
            let ch = chars[i];

            // Escapes only exist in basic strings.
            if ch == '\\' && matches!(state, Lex::Basic | Lex::MultiBasic) {
                out.push(ch);
                if let Some(next) = chars.get(i + 1) {
                    out.push(*next);
                }
                i += 2;
                continue;
            }

            if ch == '\n' {
                if state == Lex::Comment {
                    state = Lex::Bare;
                }
                out.push(ch);
                i += 1;
                continue;
            }

            let quote_len = match (state, ch) {
                (Lex::Bare, '"') if triple(i, '"') => {
                    state = Lex::MultiBasic;
                    3
                }
                (Lex::Bare, '\'') if triple(i, '\'') => {
                    state = Lex::MultiLiteral;
                    3
                }
                (Lex::MultiBasic, '"') if triple(i, '"') => {
                    state = Lex::Bare;
                    3
                }
                (Lex::MultiLiteral, '\'') if triple(i, '\'') => {
                    state = Lex::Bare;
                    3
                }
                (Lex::Bare, '"') => {
                    state = Lex::Basic;
                    1
                }
                (Lex::Basic, '"') => {
                    state = Lex::Bare;
                    1
                }
                (Lex::Bare, '\'') => {
                    state = Lex::Literal;
                    1
                }
                (Lex::Literal, '\'') => {
                    state = Lex::Bare;
                    1
                }
                _ => 0,
            };
            if quote_len > 0 {
                out.extend(&chars[i..i + quote_len]);
                i += quote_len;
                continue;
            }

            if ch == '#' && state == Lex::Bare {
                state = Lex::Comment;
                out.push(ch);
                i += 1;
                continue;
            }

            if ch == '$' && state != Lex::Comment && chars.get(i + 1) == Some(&'{') {
                let start = i;
                let name_start = i + 2;
                let close = chars[name_start..]
                    .iter()
                    .position(|c| *c == '}')
                    .map(|offset| name_start + offset);

                let Some(close) = close else {
                    anyhow::bail!(
                        "Unclosed environment variable placeholder at position {}",
                        start
                    );
                };

                let name: String = chars[name_start..close].iter().collect();
                if name.is_empty() {
                    anyhow::bail!("Empty environment variable name at position {}", start);
                }

                let value = std::env::var(&name).map_err(|_| {
                    anyhow::anyhow!(
                        "Environment variable '{}' is not set (referenced at position {})",
                        name,
                        start
                    )
                })?;
                out.push_str(&value);
                i = close + 1;
                continue;
            }

            out.push(ch);
            i += 1;
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[database]
url = "sqlite://aura.db"
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.scheduler.interval_secs, 300);
        assert_eq!(config.scheduler.batch_size, 10);
        assert_eq!(config.scheduler.history_cap, 30);
        assert_eq!(config.scheduler.force_refresh_cooldown_secs, 360);
        assert_eq!(config.scheduler.significant_change_threshold, 50.0);
        assert_eq!(config.features.ttl_secs, 3600);
        assert_eq!(config.sources.timeout_ms, 5000);
        assert_eq!(config.events.capacity, 1024);
        assert_eq!(config.logging.format, "pretty");
        assert!(config.sources.github_url.is_none());
    }

    #[test]
    fn test_load_full_config() {
        let toml = r#"
[server]
port = 9000

[database]
url = "sqlite://aura.db"
max_connections = 8
min_connections = 2

[scheduler]
enabled = false
interval_secs = 60
batch_size = 4

[features]
enabled = false
ttl_secs = 120

[sources]
timeout_ms = 1500
github_url = "https://signals.example.com/github"

[credentials]
issuer_did = "did:example:issuer"
subject_did_prefix = "did:example:"

[oracle]
address = "0x1111111111111111111111111111111111111111"

[events]
capacity = 16

[logging]
level = "debug"
format = "json"
"#;
        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert!(!config.scheduler.enabled);
        assert_eq!(config.scheduler.interval(), Duration::from_secs(60));
        assert!(!config.features.enabled);
        assert_eq!(config.sources.timeout(), Duration::from_millis(1500));
        assert_eq!(
            config.credentials.subject_did(&WalletAddress::from([0xab; 20])),
            format!("did:example:0x{}", "ab".repeat(20))
        );
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_database_section_is_required() {
        assert!(Config::from_toml_str("[server]\nport = 1\n").is_err());
    }

    #[test]
    fn test_validation_zero_interval() {
        let toml = format!("{}\n[scheduler]\ninterval_secs = 0\n", MINIMAL);
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(err.to_string().contains("interval_secs"));
    }

    #[test]
    fn test_validation_zero_batch() {
        let toml = format!("{}\n[scheduler]\nbatch_size = 0\n", MINIMAL);
        assert!(Config::from_toml_str(&toml).is_err());
    }

    #[test]
    fn test_validation_source_url_scheme() {
        let toml = format!("{}\n[sources]\ntwitter_url = \"ftp://x\"\n", MINIMAL);
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(err.to_string().contains("must start with one of"));
    }

    #[test]
    fn test_validation_oracle_address() {
        let toml = format!("{}\n[oracle]\naddress = \"0x12\"\n", MINIMAL);
        assert!(Config::from_toml_str(&toml).is_err());
    }

    #[test]
    fn test_validation_log_format() {
        let toml = format!("{}\n[logging]\nformat = \"xml\"\n", MINIMAL);
        assert!(Config::from_toml_str(&toml).is_err());
    }

    #[test]
    fn test_for_test_is_valid() {
        let config = Config::for_test("sqlite::memory:");
        config.validate().unwrap();
        assert!(!config.scheduler.enabled);
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("AURA_TEST_VAR", "hello");
        let result = Config::expand_env_vars("value is ${AURA_TEST_VAR}").unwrap();
        assert_eq!(result, "value is hello");

        let result = Config::expand_env_vars("no variables here").unwrap();
        assert_eq!(result, "no variables here");

        std::env::remove_var("AURA_TEST_VAR");
    }

    #[test]
    fn test_expand_env_vars_errors() {
        let err = Config::expand_env_vars("x = ${AURA_UNDEFINED_VAR_98765}").unwrap_err();
        assert!(err.to_string().contains("AURA_UNDEFINED_VAR_98765"));

        let err = Config::expand_env_vars("x = ${}").unwrap_err();
        assert!(err.to_string().contains("Empty"));

        let err = Config::expand_env_vars("x = ${UNCLOSED").unwrap_err();
        assert!(err.to_string().contains("Unclosed"));
    }

    #[test]
    fn test_expand_env_vars_skips_comments() {
        std::env::set_var("AURA_IN_STRING", "expanded");

        let input = r#"
# url = "${AURA_IN_COMMENT}"
key = "a/#${AURA_IN_STRING}"  # see ${AURA_IN_COMMENT}
lit = 'has # and ${AURA_IN_STRING}'
"#;
        let result = Config::expand_env_vars(input).unwrap();
        assert!(result.contains("a/#expanded"));
        assert!(result.contains("has # and expanded"));
        assert_eq!(result.matches("${AURA_IN_COMMENT}").count(), 2);

        std::env::remove_var("AURA_IN_STRING");
    }

    #[test]
    fn test_expand_env_vars_multiline_and_escapes() {
        std::env::set_var("AURA_ML_VAR", "inner");

        let input = "a = \"\"\"\nline # not a comment ${AURA_ML_VAR}\n\"\"\"\nb = \"say \\\"hi\\\" ${AURA_ML_VAR}\"\n";
        let result = Config::expand_env_vars(input).unwrap();
        assert!(result.contains("line # not a comment inner"));
        assert!(result.contains("say \\\"hi\\\" inner"));

        std::env::remove_var("AURA_ML_VAR");
    }

    #[test]
    fn test_config_from_file_with_env_vars() {
        std::env::set_var("AURA_TEST_DB_URL", "sqlite://from-env.db");
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "[database]\nurl = \"${AURA_TEST_DB_URL}\" # ${AURA_NOT_SET}\n",
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.database.url, "sqlite://from-env.db");

        std::env::remove_var("AURA_TEST_DB_URL");
    }
}
