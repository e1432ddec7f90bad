//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{DesiredState, ProcessSettings};
use crate::connection::RetryPolicy;
use crate::engine::{Provisioner, RunReport};
use crate::error::{Result, ResultExt};
use crate::loader::load_desired_state;
use crate::output::{render_check_pretty, render_json, render_pretty, render_state_summary};
use crate::session::{Connector, SqlxConnector};
use crate::watch::ConfigWatcher;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Effective settings after merging the environment with CLI flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Provisioning document
    pub config_path: PathBuf,
    /// Watch mode
    pub watch: bool,
    /// Poll interval in watch mode
    pub watch_interval: Duration,
    /// Connection retry policy
    pub policy: RetryPolicy,
    /// Output format
    pub format: OutputFormat,
}

impl RunSettings {
    /// Merge: CLI flags win over the environment, which wins over defaults
    pub fn resolve(cli: &Cli, env: ProcessSettings) -> Self {
        let mut policy = RetryPolicy::default();
        if let Some(attempts) = cli.max_attempts {
            policy = policy.with_max_attempts(attempts);
        }
        if let Some(secs) = cli.retry_delay_secs {
            policy = policy.with_delay(Duration::from_secs(secs));
        }

        Self {
            config_path: cli.config.clone().unwrap_or(env.config_path),
            watch: cli.watch || env.watch,
            watch_interval: cli
                .interval
                .filter(|secs| *secs > 0)
                .map_or(env.watch_interval, Duration::from_secs),
            policy,
            format: cli.format,
        }
    }
}

/// CLI runner
pub struct Runner {
    command: Commands,
    settings: RunSettings,
    provisioner: Provisioner,
}

impl Runner {
    /// Create a runner for real servers, reading settings from the environment
    pub fn new(cli: Cli) -> Self {
        Self::with_connector(cli, ProcessSettings::from_env(), Arc::new(SqlxConnector))
    }

    /// Create a runner with explicit environment settings and connector
    pub fn with_connector(cli: Cli, env: ProcessSettings, connector: Arc<dyn Connector>) -> Self {
        let settings = RunSettings::resolve(&cli, env);
        let provisioner = Provisioner::new(connector).with_policy(settings.policy);
        Self {
            command: cli.command.unwrap_or(Commands::Run),
            settings,
            provisioner,
        }
    }

    /// Effective settings
    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Run the CLI command
    ///
    /// Only configuration problems are returned as errors; unreachable
    /// servers and failed grants are part of the report.
    pub async fn run(&self) -> Result<()> {
        match self.command {
            Commands::Run if self.settings.watch => {
                self.watch().await;
                Ok(())
            }
            Commands::Run => self.run_once().await.map(|_| ()),
            Commands::Validate => self.validate(),
            Commands::Check => self.check().await,
        }
    }

    /// Load the document, provision every server and print the report
    pub async fn run_once(&self) -> Result<RunReport> {
        let state = self.load()?;
        let report = self.provisioner.run(&state).await;

        let text = match self.settings.format {
            OutputFormat::Json => render_json(&report).context("failed to render run report")?,
            OutputFormat::Pretty => render_pretty(&report),
        };
        println!("{text}");

        Ok(report)
    }

    /// Re-provision on every config change until Ctrl-C
    async fn watch(&self) {
        let mut watcher =
            ConfigWatcher::new(&self.settings.config_path, self.settings.watch_interval);

        let runner = self;
        watcher
            .watch(move || async move {
                if let Err(e) = runner.run_once().await {
                    error!("Provisioning pass failed: {e}");
                }
            })
            .await;
    }

    /// Load and validate the document, print what it contains
    fn validate(&self) -> Result<()> {
        let state = self.load()?;

        let text = match self.settings.format {
            OutputFormat::Json => serde_json::to_string(&json!({
                "valid": true,
                "servers": state.servers.len(),
                "grants": state.grant_count(),
            }))
            .context("failed to render validation summary")?,
            OutputFormat::Pretty => render_state_summary(&state),
        };
        println!("{text}");

        Ok(())
    }

    /// Report existence of every user and database
    async fn check(&self) -> Result<()> {
        let state = self.load()?;
        let report = self.provisioner.check(&state).await;

        let text = match self.settings.format {
            OutputFormat::Json => render_json(&report).context("failed to render check report")?,
            OutputFormat::Pretty => render_check_pretty(&report),
        };
        println!("{text}");

        Ok(())
    }

    fn load(&self) -> Result<DesiredState> {
        info!(path = %self.settings.config_path.display(), "Loading provisioning document");
        load_desired_state(&self.settings.config_path)
    }
}
