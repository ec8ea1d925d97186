//! Document acquisition and load orchestration.
//!
//! Every way a document can arrive ends in the same tail:
//!
//! ```text
//! pick_local ─┐
//! open_url ───┤                       ┌─ ok ──▶ menu guide (delayed)
//! chunks ─────┼─▶ session.set ─▶ init ─▶ open ─┤
//! create_new ─┘                       └─ err ─▶ control panel back, error up
//! ```
//!
//! One acquisition runs at a time: each path takes the in-flight token
//! before touching the session and holds it until the tail is done. The
//! loading indicator is a guard created before the first await that can
//! take real time, so every exit path releases it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::chunk::{AssemblyState, ChunkAssembler, ReassemblyOrder};
use crate::config::{default_accept, Config};
use crate::error::{AcquisitionError, Result};
use crate::fetch::RemoteFetcher;
use crate::models::{AcquisitionResult, Chunk, DocumentKind, DocumentRecord};
use crate::picker::{await_pick, is_accepted, PickOutcome};
use crate::session::DocumentSession;
use crate::traits::{ConversionGateway, FilePicker, PanelControl};
use crate::ui::{LoadingIndicator, MenuGuide};

/// Tunables for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub accept: Vec<String>,
    pub pick_cancel_timeout: Duration,
    pub guide_delay: Duration,
    /// When false, successful loads never schedule the menu guide.
    pub guide_enabled: bool,
    pub order: ReassemblyOrder,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            accept: default_accept(),
            pick_cancel_timeout: Duration::from_millis(5000),
            guide_delay: Duration::from_millis(1000),
            guide_enabled: true,
            order: ReassemblyOrder::Arrival,
        }
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            accept: config.picker.accept.clone(),
            pick_cancel_timeout: config.picker.cancel_timeout(),
            guide_delay: config.guide.delay(),
            guide_enabled: true,
            order: config.transfer.order,
        }
    }
}

/// Everything the orchestrator talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub gateway: Arc<dyn ConversionGateway>,
    pub panel: Arc<dyn PanelControl>,
    pub guide: Arc<MenuGuide>,
    pub loading: LoadingIndicator,
    pub fetcher: RemoteFetcher,
}

/// Progress of the chunked-stream path after one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamProgress {
    Incomplete { received: usize, total: usize },
    Opened(AcquisitionResult),
}

pub struct AcquisitionOrchestrator {
    gateway: Arc<dyn ConversionGateway>,
    panel: Arc<dyn PanelControl>,
    guide: Arc<MenuGuide>,
    loading: LoadingIndicator,
    fetcher: RemoteFetcher,
    settings: OrchestratorSettings,
    session: DocumentSession,
    assembler: Mutex<ChunkAssembler>,
    in_flight: tokio::sync::Mutex<()>,
}

impl AcquisitionOrchestrator {
    pub fn new(collaborators: Collaborators, settings: OrchestratorSettings) -> Self {
        Self {
            gateway: collaborators.gateway,
            panel: collaborators.panel,
            guide: collaborators.guide,
            loading: collaborators.loading,
            fetcher: collaborators.fetcher,
            assembler: Mutex::new(ChunkAssembler::new(settings.order)),
            settings,
            session: DocumentSession::new(),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    pub fn session(&self) -> &DocumentSession {
        &self.session
    }

    pub fn loading(&self) -> &LoadingIndicator {
        &self.loading
    }

    pub fn guide(&self) -> &Arc<MenuGuide> {
        &self.guide
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Chunks buffered for the in-flight transfer.
    pub fn pending_chunks(&self) -> usize {
        self.assembler().pending()
    }

    fn assembler(&self) -> std::sync::MutexGuard<'_, ChunkAssembler> {
        self.assembler.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Acquisition paths
    // ═══════════════════════════════════════════════════════════════════

    /// Let the user pick a local file and open it.
    ///
    /// Cancellation (explicit or by timeout) leaves the UI untouched and
    /// resolves [`AcquisitionResult::Cancelled`].
    pub async fn pick_local(&self, picker: &dyn FilePicker) -> Result<AcquisitionResult> {
        let _token = self.in_flight.lock().await;

        let file = match await_pick(picker, &self.settings.accept, self.settings.pick_cancel_timeout)
            .await
        {
            PickOutcome::Chosen(file) => file,
            PickOutcome::NoFile => {
                tracing::info!("file pick cancelled");
                return Ok(AcquisitionResult::Cancelled);
            }
            PickOutcome::TimedOut => {
                tracing::info!("file pick timed out, treating as cancelled");
                return Ok(AcquisitionResult::Cancelled);
            }
        };

        if !is_accepted(&file.name, &self.settings.accept) {
            tracing::warn!(file_name = %file.name, "picked file type not accepted");
            return Err(AcquisitionError::UnsupportedFormat(file.name));
        }

        let _loading = self.loading.show();
        self.panel.hide();

        let mut record = DocumentRecord::new(file.name, file.bytes);
        if let Some(url) = file.source_url {
            record = record.with_source_url(url);
        }
        self.load(record).await
    }

    /// Download `url` and open it.
    ///
    /// Network problems resolve [`AcquisitionResult::Failed`] after telling
    /// the user and bringing the control panel back; engine failures are
    /// returned as errors.
    pub async fn open_url(&self, url: &str, file_name: Option<&str>) -> Result<AcquisitionResult> {
        let _loading = self.loading.show();
        let _token = self.in_flight.lock().await;
        self.panel.hide();

        let fetched = match self.fetcher.fetch(url, file_name).await {
            Ok(fetched) => fetched,
            Err(e) => {
                let reason = match e {
                    AcquisitionError::NetworkFailure(reason) => reason,
                    other => other.to_string(),
                };
                tracing::error!(url, reason = %reason, "error opening document from URL");
                self.panel
                    .alert(&format!("Failed to open document: {}", reason));
                self.panel.show();
                return Ok(AcquisitionResult::Failed { reason });
            }
        };

        let record = DocumentRecord::new(fetched.file_name, fetched.bytes).with_source_url(url);
        match self.load(record).await {
            Ok(result) => Ok(result),
            Err(e) => {
                self.panel.alert(&format!("Failed to open document: {}", e));
                Err(e)
            }
        }
    }

    /// Feed one chunk of a streamed file.
    ///
    /// Opens the document once the transfer completes. A protocol
    /// violation discards the transfer and brings the control panel back.
    pub async fn submit_chunk(&self, chunk: Chunk) -> Result<StreamProgress> {
        self.panel.hide();

        let state = self.assembler().submit(chunk);
        let file = match state {
            Ok(AssemblyState::Incomplete { received, total }) => {
                tracing::debug!(received, total, "chunk buffered");
                return Ok(StreamProgress::Incomplete { received, total });
            }
            Ok(AssemblyState::Complete(file)) => file,
            Err(e) => {
                tracing::error!(error = %e, "chunked transfer aborted");
                self.panel.show();
                return Err(e);
            }
        };

        let _loading = self.loading.show();
        let _token = self.in_flight.lock().await;
        tracing::info!(
            file_name = %file.name,
            bytes = file.bytes.len(),
            mime = %file.mime,
            "chunked transfer complete"
        );

        let record = DocumentRecord::new(file.name, file.bytes);
        self.load(record).await.map(StreamProgress::Opened)
    }

    /// The channel closed: drop any partial transfer and shut the viewer.
    ///
    /// The buffer is dropped right away; the viewer is closed only after an
    /// acquisition already in flight has finished, so its document cannot
    /// reappear after the close.
    pub async fn close_channel(&self) -> Result<()> {
        self.assembler().reset();
        let _token = self.in_flight.lock().await;
        self.gateway
            .close()
            .await
            .map_err(AcquisitionError::ConversionEngineFailure)
    }

    /// Open a new blank document of `kind`.
    pub async fn create_new(&self, kind: DocumentKind) -> Result<AcquisitionResult> {
        let _loading = self.loading.show();
        let _token = self.in_flight.lock().await;
        self.panel.hide();
        self.load(DocumentRecord::blank(kind.blank_file_name())).await
    }

    // ═══════════════════════════════════════════════════════════════════
    // Common tail
    // ═══════════════════════════════════════════════════════════════════

    async fn load(&self, record: DocumentRecord) -> Result<AcquisitionResult> {
        let record = self.session.set(record);

        match self.open_current().await {
            Ok(()) => {
                if self.settings.guide_enabled {
                    self.guide.schedule(self.settings.guide_delay);
                }
                Ok(AcquisitionResult::from_record(&record))
            }
            Err(e) => {
                tracing::error!(file_name = %record.file_name, error = %e, "error opening document");
                self.panel.show();
                Err(e)
            }
        }
    }

    async fn open_current(&self) -> Result<()> {
        self.gateway
            .init()
            .await
            .map_err(AcquisitionError::ConversionEngineFailure)?;
        let record = self.session.get();
        self.gateway
            .open(&record)
            .await
            .map_err(AcquisitionError::ConversionEngineFailure)
    }
}
