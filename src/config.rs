use crate::anchors::CacheOptions;
use crate::anchors::keys::DEFAULT_PARTITION_SIZE;
use crate::table::memory::DEFAULT_PAGE_SIZE;

use std::net::SocketAddr;
use std::path::PathBuf;

/// Process configuration. Every flag can also come from the environment.
#[derive(Debug, Clone, clap::Parser)]
#[command(author, version, about)]
pub struct Config {
    /// Address the HTTP API listens on.
    #[arg(long, env = "ANCHOR_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Snapshot file for the anchor table. Without it the table lives in memory only.
    #[arg(long, env = "ANCHOR_DATA_FILE", value_name = "FILE")]
    pub data_file: Option<PathBuf>,

    /// Anchor numbers per table partition.
    #[arg(long, env = "ANCHOR_PARTITION_SIZE", default_value_t = DEFAULT_PARTITION_SIZE)]
    pub partition_size: u64,

    /// Rows returned per scan page.
    #[arg(long, env = "ANCHOR_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Log filter, e.g. `info` or `anchor_registry=debug`. `RUST_LOG` wins if set.
    #[arg(long, env = "ANCHOR_LOG", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.partition_size == 0 {
            anyhow::bail!("--partition-size must be greater than zero");
        }
        if self.page_size == 0 {
            anyhow::bail!("--page-size must be greater than zero");
        }
        Ok(())
    }

    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            partition_size: self.partition_size,
            ..CacheOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["anchor-registry"]).unwrap();

        assert_eq!(config.bind, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.partition_size, DEFAULT_PARTITION_SIZE);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_partition_size_rejected() {
        let config =
            Config::try_parse_from(["anchor-registry", "--partition-size", "0"]).unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cache_options_follow_flags() {
        let config = Config::try_parse_from([
            "anchor-registry",
            "--partition-size",
            "250",
            "--data-file",
            "/tmp/anchors.bin",
        ])
        .unwrap();

        assert_eq!(config.cache_options().partition_size, 250);
        assert_eq!(config.data_file, Some(PathBuf::from("/tmp/anchors.bin")));
    }
}
