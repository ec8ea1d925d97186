//! Wiring of the default collaborators from configuration.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::Config;
use crate::engine::X2tGateway;
use crate::fetch::RemoteFetcher;
use crate::orchestrator::{AcquisitionOrchestrator, Collaborators, OrchestratorSettings};
use crate::server::AppState;
use crate::store::FileFlagStore;
use crate::ui::{LoadingIndicator, MenuGuide, VisibilityController};

/// A fully wired loader: x2t subprocess engine, in-process panel state and
/// a file-backed guide flag.
pub struct App {
    pub orchestrator: Arc<AcquisitionOrchestrator>,
    pub panel: Arc<VisibilityController>,
    pub engine: Arc<X2tGateway>,
    pub flags: Arc<FileFlagStore>,
}

impl App {
    /// Loader for a long-running process such as the HTTP server.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::build(config, OrchestratorSettings::from_config(config))
    }

    /// Loader for a command that exits after a single acquisition; the menu
    /// guide is disabled.
    pub fn one_shot(config: &Config) -> Result<Self> {
        let settings = OrchestratorSettings {
            guide_enabled: false,
            ..OrchestratorSettings::from_config(config)
        };
        Self::build(config, settings)
    }

    fn build(config: &Config, settings: OrchestratorSettings) -> Result<Self> {
        let panel = Arc::new(VisibilityController::new());
        let engine = Arc::new(X2tGateway::new(config.engine.clone()));
        let flags = Arc::new(FileFlagStore::new(&config.guide.state_path));
        let guide = Arc::new(MenuGuide::new(flags.clone(), config.guide.visible_for()));
        let fetcher = RemoteFetcher::new(&config.fetch).context("Failed to set up HTTP client")?;

        let orchestrator = AcquisitionOrchestrator::new(
            Collaborators {
                gateway: engine.clone(),
                panel: panel.clone(),
                guide,
                loading: LoadingIndicator::new(),
                fetcher,
            },
            settings,
        );

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            panel,
            engine,
            flags,
        })
    }

    pub fn server_state(&self) -> AppState {
        AppState::new(self.orchestrator.clone(), self.panel.clone())
    }
}
