//! Configuration loader for Recall.
//!
//! Reads a TOML file into [`RecallConfig`]. A missing file yields the
//! defaults; an unreadable or malformed file is an error.

use std::path::{Path, PathBuf};

use anyhow::Context;
use recall_types::config::RecallConfig;
use tracing::debug;

/// File name looked up by [`load_config_from_data_dir`].
pub const CONFIG_FILE: &str = "config.toml";

/// Load configuration from `path`.
pub async fn load_config(path: &Path) -> anyhow::Result<RecallConfig> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file found, using defaults");
            return Ok(RecallConfig::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    let config = toml::from_str::<RecallConfig>(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Load `{data_dir}/config.toml`.
pub async fn load_config_from_data_dir(data_dir: &Path) -> anyhow::Result<RecallConfig> {
    load_config(&data_dir.join(CONFIG_FILE)).await
}

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `RECALL_DATA_DIR` environment variable
/// 2. `~/.recall`
/// 3. `.recall` in the current directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("RECALL_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".recall");
    }

    PathBuf::from(".recall")
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_types::vector::Metric;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("absent.toml")).await.unwrap();
        assert_eq!(config, RecallConfig::default());
        assert_eq!(config.history.default_window, 10);
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
[history]
default_window = 6

[retrieval]
default_k = 2
default_metric = "l2"
threshold = 1.5

[chat]
system_prompt_language = "French"
"#,
        )
        .await
        .unwrap();

        let config = load_config_from_data_dir(tmp.path()).await.unwrap();
        assert_eq!(config.history.default_window, 6);
        assert_eq!(config.retrieval.default_k, 2);
        assert_eq!(config.retrieval.default_metric, Metric::Euclidean);
        assert_eq!(config.retrieval.threshold, Some(1.5));
        assert_eq!(config.chat.system_prompt_language, "French");
        assert_eq!(config.chat.model_name, "gpt-4o-mini");
        assert_eq!(config.logging.level, "info");
    }

    #[tokio::test]
    async fn load_config_invalid_toml_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        tokio::fs::write(&path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let err = load_config(&path).await.unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[tokio::test]
    async fn load_config_unknown_metric_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        tokio::fs::write(&path, "[retrieval]\ndefault_metric = \"manhattan\"\n")
            .await
            .unwrap();

        assert!(load_config(&path).await.is_err());
    }

    #[test]
    fn resolve_data_dir_ends_with_recall_by_default() {
        if std::env::var("RECALL_DATA_DIR").is_err() {
            assert!(resolve_data_dir().ends_with(".recall"));
        }
    }
}
