use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use nearcar_core::{DEFAULT_CACHE_CAPACITY, DEFAULT_VEHICLE_LIMIT};

/// Runtime settings, read from flags with environment fallbacks.
#[derive(Debug, Clone, Parser)]
#[command(name = "nearcar-server")]
#[command(about = "Answer nearest-vehicle ETA queries over HTTP", long_about = None)]
pub(crate) struct Config {
    /// Address to listen on
    #[arg(long, env = "NEARCAR_LISTEN", default_value = "0.0.0.0:8080")]
    pub(crate) listen: SocketAddr,

    /// Upstream cluster base URLs, comma separated or repeated
    #[arg(long = "upstream", env = "NEARCAR_UPSTREAM", value_delimiter = ',', required = true)]
    pub(crate) upstreams: Vec<String>,

    /// Per-attempt upstream timeout in milliseconds
    #[arg(long, env = "NEARCAR_TIMEOUT_MS", default_value_t = 1000)]
    pub(crate) timeout_ms: u64,

    /// Nearby vehicles considered per query
    #[arg(long, env = "NEARCAR_VEHICLE_LIMIT", default_value_t = DEFAULT_VEHICLE_LIMIT)]
    pub(crate) vehicle_limit: usize,

    /// Keep upstream answers in memory for this many seconds (disabled when unset)
    #[arg(long, env = "NEARCAR_CACHE_TTL_SECS")]
    pub(crate) cache_ttl_secs: Option<u64>,

    /// Most vehicle sets, and as many prediction sets, the in-memory cache keeps
    #[arg(long, env = "NEARCAR_CACHE_CAPACITY", default_value_t = DEFAULT_CACHE_CAPACITY)]
    pub(crate) cache_capacity: usize,
}

impl Config {
    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub(crate) fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_upstream_contract() {
        let config = Config::try_parse_from(["nearcar-server", "--upstream", "http://a"])
            .expect("minimal flags parse");
        assert_eq!(config.listen.port(), 8080, "default port");
        assert_eq!(config.timeout(), Duration::from_millis(1000), "default timeout");
        assert_eq!(config.vehicle_limit, 10, "default vehicle limit");
        assert!(config.cache_ttl().is_none(), "cache disabled by default");
        assert_eq!(config.cache_capacity, 10_000, "default cache bound");
    }

    #[test]
    fn splits_comma_separated_upstreams() {
        let config = Config::try_parse_from([
            "nearcar-server",
            "--upstream",
            "http://a:1,http://b:2",
            "--upstream",
            "http://c:3",
            "--cache-ttl-secs",
            "30",
            "--cache-capacity",
            "64",
        ])
        .expect("flags parse");
        assert_eq!(
            config.upstreams,
            vec!["http://a:1", "http://b:2", "http://c:3"],
            "order kept"
        );
        assert_eq!(config.cache_ttl(), Some(Duration::from_secs(30)), "ttl set");
        assert_eq!(config.cache_capacity, 64, "capacity set");
    }

    #[test]
    fn requires_an_upstream() {
        assert!(
            Config::try_parse_from(["nearcar-server"]).is_err(),
            "no upstream configured"
        );
    }
}
