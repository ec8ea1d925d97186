//! Collaborator traits.
//!
//! The orchestrator never talks to a concrete engine, UI or store. Each
//! collaborator is a trait object handed to it at construction time:
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │            AcquisitionOrchestrator            │
//! └──────┬──────────────┬──────────────┬──────────┘
//!        ▼              ▼              ▼
//! ConversionGateway  PanelControl   FlagStore
//!  (x2t + viewer)    (panel / FAB)  (guide flag)
//! ```
//!
//! The file picker is passed per call instead, since each pick presents a
//! fresh chooser.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::models::DocumentRecord;

// ═══════════════════════════════════════════════════════════════════════
// Conversion engine
// ═══════════════════════════════════════════════════════════════════════

/// The external conversion engine and viewer.
///
/// Implementations are opaque to the orchestrator. Errors from any method
/// become [`AcquisitionError::ConversionEngineFailure`](crate::error::AcquisitionError::ConversionEngineFailure).
///
/// # Example
///
/// ```rust
/// use anyhow::Result;
/// use async_trait::async_trait;
/// use office_loader::models::DocumentRecord;
/// use office_loader::traits::ConversionGateway;
///
/// struct NullViewer;
///
/// #[async_trait]
/// impl ConversionGateway for NullViewer {
///     async fn init(&self) -> Result<()> { Ok(()) }
///     async fn open(&self, _document: &DocumentRecord) -> Result<()> { Ok(()) }
///     async fn close(&self) -> Result<()> { Ok(()) }
/// }
/// ```
#[async_trait]
pub trait ConversionGateway: Send + Sync {
    /// Prepare the engine for a document load.
    ///
    /// Called before every open, so it must be idempotent.
    async fn init(&self) -> Result<()>;

    /// Convert and display `document`. Fails on malformed or unsupported
    /// input.
    async fn open(&self, document: &DocumentRecord) -> Result<()>;

    /// Tear down the active viewer instance, if any.
    async fn close(&self) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════
// UI
// ═══════════════════════════════════════════════════════════════════════

/// The primary panel of the UI.
///
/// `hide` is called when an acquisition takes over the screen and `show`
/// when it fails and the previous state must come back.
pub trait PanelControl: Send + Sync {
    fn hide(&self);
    fn show(&self);
    /// Surface a message to the end user.
    fn alert(&self, message: &str);
}

// ═══════════════════════════════════════════════════════════════════════
// Persistence
// ═══════════════════════════════════════════════════════════════════════

/// Key-value boolean flags that outlive the session.
pub trait FlagStore: Send + Sync {
    fn get_flag(&self, key: &str) -> bool;
    fn set_flag(&self, key: &str, value: bool) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════
// File picker
// ═══════════════════════════════════════════════════════════════════════

/// A file the user chose in the picker.
#[derive(Debug, Clone)]
pub struct PickedFile {
    pub name: String,
    pub bytes: Vec<u8>,
    /// Where the file came from, if the picker knows.
    pub source_url: Option<String>,
}

/// What a picker reports once the user is done with it.
#[derive(Debug)]
pub enum PickSignal {
    Chosen(PickedFile),
    /// The picker closed and reported that nothing was selected.
    NoFile,
}

/// A file chooser.
///
/// `present` shows the chooser and returns immediately. The picker sends at
/// most one [`PickSignal`] on `reply`. Some pickers close without sending
/// anything, dropping `reply` or simply never answering; the caller covers
/// that case with a timer.
pub trait FilePicker: Send + Sync {
    fn present(&self, accept: &[String], reply: oneshot::Sender<PickSignal>);
}
