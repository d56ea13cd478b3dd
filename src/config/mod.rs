//! Configuration resolution: CLI arguments merged with an optional TOML
//! file. File values override CLI values where present.

mod file_config;

pub use file_config::FileConfig;

use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that take part in config resolution.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub entity_db_path: PathBuf,
    pub graph_db_path: PathBuf,
    pub read_pool_size: usize,
    pub query_timeout_ms: u64,
    pub resync_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub entity_db_path: PathBuf,
    pub graph_db_path: PathBuf,
    pub read_pool_size: usize,
    pub query_timeout: Duration,
    /// Zero disables the periodic resync loop.
    pub resync_interval: Duration,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    pub fn resolve(cli: CliConfig, file: Option<FileConfig>) -> Self {
        let file = file.unwrap_or_default();
        AppConfig {
            entity_db_path: file
                .entity_db_path
                .map(PathBuf::from)
                .unwrap_or(cli.entity_db_path),
            graph_db_path: file
                .graph_db_path
                .map(PathBuf::from)
                .unwrap_or(cli.graph_db_path),
            read_pool_size: file.read_pool_size.unwrap_or(cli.read_pool_size),
            query_timeout: Duration::from_millis(
                file.query_timeout_ms.unwrap_or(cli.query_timeout_ms),
            ),
            resync_interval: Duration::from_secs(
                file.resync_interval_secs.unwrap_or(cli.resync_interval_secs),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli() -> CliConfig {
        CliConfig {
            entity_db_path: PathBuf::from("/data/entities.db"),
            graph_db_path: PathBuf::from("/data/graph.db"),
            read_pool_size: 4,
            query_timeout_ms: 500,
            resync_interval_secs: 0,
        }
    }

    #[test]
    fn file_values_override_cli() {
        let file = FileConfig {
            graph_db_path: Some("/other/graph.db".into()),
            query_timeout_ms: Some(100),
            ..Default::default()
        };
        let config = AppConfig::resolve(cli(), Some(file));
        assert_eq!(config.graph_db_path, PathBuf::from("/other/graph.db"));
        assert_eq!(config.query_timeout, Duration::from_millis(100));
        // CLI values fill the gaps
        assert_eq!(config.entity_db_path, PathBuf::from("/data/entities.db"));
        assert_eq!(config.read_pool_size, 4);
    }

    #[test]
    fn no_file_uses_cli_values() {
        let config = AppConfig::resolve(cli(), None);
        assert_eq!(config.resync_interval, Duration::ZERO);
        assert_eq!(config.query_timeout, Duration::from_millis(500));
    }
}
