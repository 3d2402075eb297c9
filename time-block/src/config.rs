//! src/config.rs
//! ============================================================================
//! # Config: Profiler Configuration Loader and Saver
//!
//! Settings for a [`TimeBlock`](crate::TimeBlock) instance and the default
//! per-scope switches, stored as TOML.
//!
//! ## Example
//! ```rust,ignore
//! let config = TimeBlockConfig::load("time_block.toml").await?;
//! let tb = TimeBlock::with_config(config);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use tokio::fs as TokioFs;

use crate::error::TimeBlockError;

/// Per-scope switches shared by `ctx`, `actx` and the call wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeOptions {
    /// Emit `"<path>: running"` on entry
    pub print_start: bool,

    /// Emit the duration line on exit
    pub print_stop: bool,

    /// Append the rendered argument list to wrapped call labels
    pub print_args: bool,

    /// Run the memory-release hook (separately timed) before the final
    /// memory reading
    pub do_gc: bool,
}

impl Default for ScopeOptions {
    fn default() -> Self {
        Self {
            print_start: true,
            print_stop: true,
            print_args: false,
            do_gc: false,
        }
    }
}

impl ScopeOptions {
    /// Options with both notices switched off.
    pub fn quiet() -> Self {
        Self {
            print_start: false,
            print_stop: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn print_start(mut self, on: bool) -> Self {
        self.print_start = on;
        self
    }

    #[must_use]
    pub fn print_stop(mut self, on: bool) -> Self {
        self.print_stop = on;
        self
    }

    #[must_use]
    pub fn print_args(mut self, on: bool) -> Self {
        self.print_args = on;
        self
    }

    #[must_use]
    pub fn do_gc(mut self, on: bool) -> Self {
        self.do_gc = on;
        self
    }
}

/// Instance-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeBlockConfig {
    /// Synthetic first entry of every context stack. `None` picks `""` on the
    /// main thread and `"Thread <name>"` elsewhere, decided at construction.
    pub root_label: Option<String>,

    /// Use the running tokio task (`Task-<id>`) as root label when there is one
    pub root_from_task: bool,

    /// Initial state of the notice switch
    pub notices: bool,

    /// Defaults for scopes opened without explicit options
    pub scope: ScopeOptions,
}

impl Default for TimeBlockConfig {
    fn default() -> Self {
        Self {
            root_label: None,
            root_from_task: false,
            notices: true,
            scope: ScopeOptions::default(),
        }
    }
}

impl TimeBlockConfig {
    #[must_use]
    pub fn root_label<S: Into<String>>(mut self, label: S) -> Self {
        self.root_label = Some(label.into());
        self
    }

    #[must_use]
    pub fn root_from_task(mut self, on: bool) -> Self {
        self.root_from_task = on;
        self
    }

    #[must_use]
    pub fn notices(mut self, on: bool) -> Self {
        self.notices = on;
        self
    }

    #[must_use]
    pub fn scope(mut self, options: ScopeOptions) -> Self {
        self.scope = options;
        self
    }

    /// Parse a config from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, TimeBlockError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> Result<String, TimeBlockError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Loads config from a TOML file, or returns defaults if it does not exist.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, TimeBlockError> {
        let path = path.as_ref();
        if !path.exists() {
            info!(
                "No config file found at {}, using default configuration",
                path.display()
            );
            return Ok(Self::default());
        }

        info!("Loading config from {}", path.display());
        let text = TokioFs::read_to_string(path)
            .await
            .map_err(|e| TimeBlockError::config_io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Saves config as TOML, creating parent directories.
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TimeBlockError> {
        let path = path.as_ref();
        info!("Saving config to {}", path.display());

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            TokioFs::create_dir_all(parent)
                .await
                .map_err(|e| TimeBlockError::config_io(parent, e))?;
        }

        let toml_str = self.to_toml_string()?;
        TokioFs::write(path, toml_str)
            .await
            .map_err(|e| TimeBlockError::config_io(path, e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config = TimeBlockConfig::from_toml_str("").unwrap();
        assert_eq!(config, TimeBlockConfig::default());
        assert!(config.scope.print_start);
        assert!(!config.scope.do_gc);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = TimeBlockConfig::from_toml_str(
            r#"
root_label = "worker"
notices = false

[scope]
do_gc = true
"#,
        )
        .unwrap();

        assert_eq!(config.root_label.as_deref(), Some("worker"));
        assert!(!config.notices);
        assert!(config.scope.do_gc);
        assert!(config.scope.print_stop);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = TimeBlockConfig::from_toml_str("notices = 3").unwrap_err();
        assert!(matches!(err, TimeBlockError::Config(_)));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("time_block.toml");

        let config = TimeBlockConfig::default()
            .root_label("svc")
            .root_from_task(true);
        config.save(&path).await.unwrap();

        let loaded = TimeBlockConfig::load(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = TimeBlockConfig::load(dir.path().join("absent.toml"))
            .await
            .unwrap();
        assert_eq!(loaded, TimeBlockConfig::default());
    }
}
