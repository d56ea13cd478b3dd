use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub entity_db_path: Option<String>,
    pub graph_db_path: Option<String>,
    pub read_pool_size: Option<usize>,
    pub query_timeout_ms: Option<u64>,
    pub resync_interval_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_leaves_other_fields_unset() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "graph_db_path = \"/tmp/graph.db\"").unwrap();
        writeln!(file, "query_timeout_ms = 250").unwrap();

        let config = FileConfig::load(file.path()).unwrap();
        assert_eq!(config.graph_db_path.as_deref(), Some("/tmp/graph.db"));
        assert_eq!(config.query_timeout_ms, Some(250));
        assert!(config.entity_db_path.is_none());
        assert!(config.resync_interval_secs.is_none());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(FileConfig::load(Path::new("/nonexistent/melodex.toml")).is_err());
    }
}
