//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use office_loader::config::FetchConfig;
use office_loader::fetch::RemoteFetcher;
use office_loader::models::{Chunk, DocumentRecord};
use office_loader::orchestrator::{AcquisitionOrchestrator, Collaborators, OrchestratorSettings};
use office_loader::store::MemoryFlagStore;
use office_loader::traits::{ConversionGateway, FilePicker, PickSignal, PickedFile};
use office_loader::ui::{LoadingIndicator, MenuGuide, VisibilityController, MENU_GUIDE_DISMISSED_KEY};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

// ─── Gateway ────────────────────────────────────────────────────────

/// Records every call; can be told to fail.
#[derive(Default)]
pub struct RecordingGateway {
    pub inits: AtomicUsize,
    pub closes: AtomicUsize,
    pub opened: Mutex<Vec<DocumentRecord>>,
    pub fail_open: AtomicBool,
    pub fail_init: AtomicBool,
    /// Simulated engine work per open.
    pub open_delay: Mutex<Option<Duration>>,
    in_open: AtomicUsize,
    pub max_concurrent_opens: AtomicUsize,
    /// `open:<name>` and `close`, in completion order.
    pub calls: Mutex<Vec<String>>,
}

impl RecordingGateway {
    pub fn opened_names(&self) -> Vec<String> {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.file_name.clone())
            .collect()
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConversionGateway for RecordingGateway {
    async fn init(&self) -> Result<()> {
        if self.fail_init.load(Ordering::SeqCst) {
            anyhow::bail!("x2t runtime failed to initialize");
        }
        self.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn open(&self, document: &DocumentRecord) -> Result<()> {
        let now = self.in_open.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_opens.fetch_max(now, Ordering::SeqCst);

        let delay = *self.open_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_open.fetch_sub(1, Ordering::SeqCst);

        if self.fail_open.load(Ordering::SeqCst) {
            anyhow::bail!("malformed document: {}", document.file_name);
        }
        self.opened.lock().unwrap().push(document.clone());
        self.calls
            .lock()
            .unwrap()
            .push(format!("open:{}", document.file_name));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push("close".to_string());
        Ok(())
    }
}

// ─── Pickers ────────────────────────────────────────────────────────

/// Answers right away with a file.
pub struct ChosenPicker {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ChosenPicker {
    pub fn new(name: &str, bytes: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            bytes: bytes.to_vec(),
        }
    }
}

impl FilePicker for ChosenPicker {
    fn present(&self, _accept: &[String], reply: oneshot::Sender<PickSignal>) {
        let _ = reply.send(PickSignal::Chosen(PickedFile {
            name: self.name.clone(),
            bytes: self.bytes.clone(),
            source_url: Some(format!("file:///tmp/{}", self.name)),
        }));
    }
}

/// Reports "no file" right away.
pub struct NoFilePicker;

impl FilePicker for NoFilePicker {
    fn present(&self, _accept: &[String], reply: oneshot::Sender<PickSignal>) {
        let _ = reply.send(PickSignal::NoFile);
    }
}

/// Keeps the reply handle and never answers.
#[derive(Default)]
pub struct SilentPicker {
    held: Mutex<Vec<oneshot::Sender<PickSignal>>>,
}

impl FilePicker for SilentPicker {
    fn present(&self, _accept: &[String], reply: oneshot::Sender<PickSignal>) {
        self.held.lock().unwrap().push(reply);
    }
}

// ─── Harness ────────────────────────────────────────────────────────

pub struct Harness {
    pub orchestrator: Arc<AcquisitionOrchestrator>,
    pub gateway: Arc<RecordingGateway>,
    pub panel: Arc<VisibilityController>,
    pub store: Arc<MemoryFlagStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(MemoryFlagStore::new())
    }

    pub fn with_guide_dismissed() -> Self {
        Self::with_store(MemoryFlagStore::with_flag(MENU_GUIDE_DISMISSED_KEY, true))
    }

    pub fn with_store(store: MemoryFlagStore) -> Self {
        Self::build(store, OrchestratorSettings::default())
    }

    pub fn build(store: MemoryFlagStore, settings: OrchestratorSettings) -> Self {
        let gateway = Arc::new(RecordingGateway::default());
        let panel = Arc::new(VisibilityController::new());
        let store = Arc::new(store);
        let guide = Arc::new(MenuGuide::new(store.clone(), Duration::from_millis(5000)));
        let fetcher = RemoteFetcher::new(&FetchConfig {
            timeout_secs: 5,
            user_agent: "office-loader-tests".to_string(),
        })
        .unwrap();

        let orchestrator = AcquisitionOrchestrator::new(
            Collaborators {
                gateway: gateway.clone(),
                panel: panel.clone(),
                guide,
                loading: LoadingIndicator::new(),
                fetcher,
            },
            settings,
        );

        Self {
            orchestrator: Arc::new(orchestrator),
            gateway,
            panel,
            store,
        }
    }
}

/// A chunk of `report.docx` carrying `payload`.
pub fn chunk(index: u32, total: u32, payload: &str, size: u64) -> Chunk {
    Chunk {
        chunk_index: index,
        total_chunks: total,
        data: STANDARD.encode(payload),
        name: "report.docx".to_string(),
        size,
        last_modified: 1_700_000_000_000,
        mime: "application/vnd.openxmlformats-officedocument.wordprocessingml.document".to_string(),
    }
}
