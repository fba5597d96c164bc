use kav::CliResult;
use kav_host::{KavConfig, KubeContentSource, ProcessToolRunner, ToolRunner};
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::{Cli, OutputFormat};

/// Everything a handler needs
pub struct AppState {
    pub config_path: PathBuf,
    pub output: OutputFormat,
    pub source: KubeContentSource,
}

impl AppState {
    /// Load the config file and apply command-line overrides.
    ///
    /// An explicit `--config` must exist; the default location may be absent.
    pub fn load(cli: &Cli) -> CliResult<Self> {
        let config_path = cli.config.clone().unwrap_or_else(KavConfig::default_path);
        let mut config = match &cli.config {
            Some(path) => KavConfig::load(path)?,
            None => KavConfig::load_or_default(&config_path)?,
        };

        if let Some(path) = &cli.rakkess_path {
            config.rakkess_path = Some(path.clone());
        }
        if let Some(path) = &cli.who_can_path {
            config.who_can_path = Some(path.clone());
        }
        tracing::debug!(path = %config_path.display(), ?config, "Effective configuration");

        Ok(Self::with_runner(
            config_path,
            config,
            Arc::new(ProcessToolRunner::new()),
            cli.output,
        ))
    }

    pub fn with_runner(
        config_path: PathBuf,
        config: KavConfig,
        runner: Arc<dyn ToolRunner>,
        output: OutputFormat,
    ) -> Self {
        Self {
            config_path,
            output,
            source: KubeContentSource::new(runner, config),
        }
    }

    pub fn config(&self) -> &KavConfig {
        self.source.config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_load_applies_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "rakkess-path": "/opt/rakkess", "verbs": ["get"] }"#,
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "kav",
            "--config",
            path.to_str().unwrap(),
            "--who-can-path",
            "/opt/who-can",
            "config",
        ])
        .unwrap();
        let app = AppState::load(&cli).unwrap();

        assert_eq!(app.config_path, path);
        assert_eq!(app.config().rakkess_program(), PathBuf::from("/opt/rakkess"));
        assert_eq!(app.config().who_can_program(), PathBuf::from("/opt/who-can"));
        assert_eq!(app.config().verbs, ["get"]);
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let cli = Cli::try_parse_from(["kav", "--config", path.to_str().unwrap(), "version"])
            .unwrap();

        let err = AppState::load(&cli).err().unwrap();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("does not exist"));
    }
}
