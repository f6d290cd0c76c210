use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

use crate::aggregator::HealthPolicy;
use crate::error::ErrorKind;
use crate::identity::{MatchMode, NameMatcher};
use crate::models::ProviderTag;
use crate::providers::{api_football, sportmonks, ClientSettings, RetryPolicy};

/// Multi-provider football fixture aggregator
#[derive(Parser, Debug, Clone)]
#[command(name = "fixture-aggregator", version, about)]
pub struct Config {
    /// HTTP API listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// Provider tried first; the other configured provider is the fallback
    #[arg(long, env = "PRIMARY_PROVIDER", value_enum, default_value = "api_football")]
    pub primary: ProviderTag,

    /// API-Football base URL
    #[arg(long, env = "API_FOOTBALL_URL", default_value = api_football::DEFAULT_BASE_URL)]
    pub api_football_url: String,

    /// API-Football key (x-apisports-key)
    #[arg(long, env = "API_FOOTBALL_KEY")]
    pub api_football_key: Option<String>,

    /// Timezone passed to API-Football date queries
    #[arg(long, env = "API_FOOTBALL_TIMEZONE", default_value = "UTC")]
    pub timezone: String,

    /// SportMonks v3 football base URL
    #[arg(long, env = "SPORTMONKS_URL", default_value = sportmonks::DEFAULT_BASE_URL)]
    pub sportmonks_url: String,

    /// SportMonks API token
    #[arg(long, env = "SPORTMONKS_API_TOKEN")]
    pub sportmonks_token: Option<String>,

    /// Minimum delay between two requests to the same provider (ms)
    #[arg(long, env = "RATE_LIMIT_DELAY_MS", default_value = "100")]
    pub rate_limit_delay_ms: u64,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// Attempts per request, including the first
    #[arg(long, env = "RETRY_ATTEMPTS", default_value = "3")]
    pub retry_attempts: u32,

    /// First retry delay (ms), doubled on each further retry
    #[arg(long, env = "RETRY_BASE_DELAY_MS", default_value = "250")]
    pub retry_base_delay_ms: u64,

    /// Upper bound of random jitter added to retry delays (ms)
    #[arg(long, env = "RETRY_JITTER_MS", default_value = "0")]
    pub retry_jitter_ms: u64,

    /// Consecutive counted failures before a provider is disabled
    #[arg(long, env = "BREAKER_THRESHOLD", default_value = "5")]
    pub breaker_threshold: u32,

    /// How long a disabled provider stays disabled (seconds)
    #[arg(long, env = "BREAKER_COOLDOWN_SECS", default_value = "1800")]
    pub breaker_cooldown_secs: u64,

    /// Failure kinds that count toward disabling a provider
    #[arg(
        long,
        env = "BREAKER_COUNTED_KINDS",
        value_enum,
        value_delimiter = ',',
        default_value = "capability-denied"
    )]
    pub breaker_counted_kinds: Vec<ErrorKind>,

    /// Matches returned by team-form lookups
    #[arg(long, env = "FORM_LOOKBACK", default_value = "5")]
    pub form_lookback: u32,

    /// Longest date range (inclusive days) a range or ROI request may cover
    #[arg(long, env = "MAX_RANGE_DAYS", default_value = "31")]
    pub max_range_days: u32,

    /// Team-name comparison used to map fixtures between providers
    #[arg(long, env = "NAME_MATCHING", value_enum, default_value = "normalized")]
    pub name_matching: MatchMode,

    /// Jaro-Winkler threshold for normalized name matching (0.0–1.0)
    #[arg(long, env = "NAME_SIMILARITY", default_value = "0.90")]
    pub name_similarity: f64,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_football_key.is_none() && self.sportmonks_token.is_none() {
            anyhow::bail!("At least one of API_FOOTBALL_KEY or SPORTMONKS_API_TOKEN is required");
        }
        if self.key_for(self.primary).is_none() {
            anyhow::bail!("Primary provider {} has no credentials configured", self.primary);
        }
        for (name, url) in [
            ("api_football_url", &self.api_football_url),
            ("sportmonks_url", &self.sportmonks_url),
        ] {
            if let Err(e) = Url::parse(url) {
                anyhow::bail!("{} is not a valid URL ({}): {}", name, url, e);
            }
        }
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            anyhow::bail!("listen_addr must be host:port, got {}", self.listen_addr);
        }
        if self.retry_attempts == 0 {
            anyhow::bail!("retry_attempts must be at least 1");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be positive");
        }
        if self.breaker_threshold == 0 {
            anyhow::bail!("breaker_threshold must be at least 1");
        }
        if self.max_range_days == 0 {
            anyhow::bail!("max_range_days must be at least 1");
        }
        if self.form_lookback == 0 {
            anyhow::bail!("form_lookback must be at least 1");
        }
        if !(self.name_similarity > 0.0 && self.name_similarity <= 1.0) {
            anyhow::bail!("name_similarity must be in (0.0, 1.0]");
        }
        Ok(())
    }

    pub fn key_for(&self, provider: ProviderTag) -> Option<&str> {
        match provider {
            ProviderTag::ApiFootball => self.api_football_key.as_deref(),
            ProviderTag::SportMonks => self.sportmonks_token.as_deref(),
        }
    }

    /// Providers with credentials, primary first.
    pub fn provider_order(&self) -> Vec<ProviderTag> {
        let mut order = vec![self.primary];
        order.extend(
            [ProviderTag::ApiFootball, ProviderTag::SportMonks]
                .into_iter()
                .filter(|p| *p != self.primary && self.key_for(*p).is_some()),
        );
        order
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_jitter: Duration::from_millis(self.retry_jitter_ms),
        }
    }

    pub fn client_settings(&self, provider: ProviderTag) -> ClientSettings {
        let base_url = match provider {
            ProviderTag::ApiFootball => &self.api_football_url,
            ProviderTag::SportMonks => &self.sportmonks_url,
        };
        ClientSettings {
            base_url: base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            min_request_interval: Duration::from_millis(self.rate_limit_delay_ms),
            retry: self.retry_policy(),
        }
    }

    pub fn health_policy(&self) -> HealthPolicy {
        HealthPolicy {
            failure_threshold: self.breaker_threshold,
            cooldown: Duration::from_secs(self.breaker_cooldown_secs),
            counted: self.breaker_counted_kinds.clone(),
        }
    }

    pub fn name_matcher(&self) -> NameMatcher {
        NameMatcher::from_mode(self.name_matching, self.name_similarity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["fixture-aggregator"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--api-football-key", "k"]);
        config.validate().unwrap();
        assert_eq!(config.primary, ProviderTag::ApiFootball);
        assert_eq!(config.provider_order(), vec![ProviderTag::ApiFootball]);

        let retry = config.retry_policy();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.backoff(0), Duration::from_millis(250));

        let health = config.health_policy();
        assert_eq!(health.failure_threshold, 5);
        assert_eq!(health.cooldown, Duration::from_secs(30 * 60));
        assert_eq!(health.counted, vec![ErrorKind::CapabilityDenied]);

        assert_eq!(config.name_matcher(), NameMatcher::default());
        assert_eq!(config.max_range_days, 31);
        let settings = config.client_settings(ProviderTag::SportMonks);
        assert_eq!(settings.base_url, sportmonks::DEFAULT_BASE_URL);
        assert_eq!(settings.min_request_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_primary_first_then_fallback() {
        let config = parse(&[
            "--api-football-key",
            "k",
            "--sportmonks-token",
            "t",
            "--primary",
            "sportmonks",
        ]);
        config.validate().unwrap();
        assert_eq!(
            config.provider_order(),
            vec![ProviderTag::SportMonks, ProviderTag::ApiFootball]
        );
    }

    #[test]
    fn test_counted_kinds_list() {
        let config = parse(&[
            "--api-football-key",
            "k",
            "--breaker-counted-kinds",
            "capability-denied,unauthorized",
        ]);
        assert_eq!(
            config.health_policy().counted,
            vec![ErrorKind::CapabilityDenied, ErrorKind::Unauthorized]
        );
    }

    #[test]
    fn test_exact_matching_mode() {
        let config = parse(&["--api-football-key", "k", "--name-matching", "exact"]);
        assert_eq!(config.name_matcher(), NameMatcher::Exact);
    }

    #[test]
    fn test_validation_rejects_bad_settings() {
        let missing_primary = parse(&["--sportmonks-token", "t"]);
        assert!(missing_primary.validate().is_err());

        let mut config = parse(&["--api-football-key", "k"]);
        config.retry_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = parse(&["--api-football-key", "k"]);
        config.name_similarity = 1.5;
        assert!(config.validate().is_err());

        let mut config = parse(&["--api-football-key", "k"]);
        config.listen_addr = "nowhere".into();
        assert!(config.validate().is_err());

        let mut config = parse(&["--api-football-key", "k"]);
        config.breaker_threshold = 0;
        assert!(config.validate().is_err());

        let mut config = parse(&["--api-football-key", "k"]);
        config.max_range_days = 0;
        assert!(config.validate().is_err());
    }
}
