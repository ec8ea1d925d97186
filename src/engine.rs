//! Subprocess-backed conversion engine.
//!
//! [`X2tGateway`] drives an external converter binary. Each opened document
//! gets its own directory under the work dir:
//!
//! ```text
//! <work_dir>/<uuid>/<file_name>        input, written from the record
//! <work_dir>/<uuid>/<stem>.<ext>       output, produced by the converter
//! ```
//!
//! The converter is invoked as `<command> <args..> <input> <output>`. A
//! non-zero exit fails the open with the converter's stderr. Blank documents
//! have nothing to convert and only become the active document.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::process::Command;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::models::{base_file_name, DocumentKind, DocumentRecord};
use crate::traits::ConversionGateway;

/// The document currently shown by the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveDocument {
    pub file_name: String,
    pub kind: DocumentKind,
    /// Converted output, `None` for blank documents.
    pub output: Option<PathBuf>,
    dir: PathBuf,
}

pub struct X2tGateway {
    config: EngineConfig,
    inits: AtomicUsize,
    active: Mutex<Option<ActiveDocument>>,
}

impl X2tGateway {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            inits: AtomicUsize::new(0),
            active: Mutex::new(None),
        }
    }

    pub fn active(&self) -> Option<ActiveDocument> {
        self.active.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of successful `init` calls.
    pub fn init_count(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    fn replace_active(&self, next: Option<ActiveDocument>) -> Option<ActiveDocument> {
        let mut guard = self.active.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, next)
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        let result = Command::new(&self.config.command)
            .args(&self.config.args)
            .arg(input)
            .arg(output)
            .output()
            .await
            .with_context(|| format!("Failed to run converter '{}'", self.config.command))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            bail!(
                "converter exited with {}: {}",
                result.status,
                stderr.trim()
            );
        }
        if !output.exists() {
            bail!("converter produced no output at {}", output.display());
        }
        Ok(())
    }
}

async fn remove_dir(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to clean up document dir");
        }
    }
}

#[async_trait]
impl ConversionGateway for X2tGateway {
    async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.config.work_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create engine work dir: {}",
                    self.config.work_dir.display()
                )
            })?;
        let n = self.inits.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(inits = n, "conversion engine ready");
        Ok(())
    }

    async fn open(&self, document: &DocumentRecord) -> Result<()> {
        // Names come from the peer; only the last component ever touches disk.
        let file_name = base_file_name(&document.file_name)
            .with_context(|| format!("invalid document file name: '{}'", document.file_name))?;
        let kind = document
            .kind()
            .with_context(|| format!("unsupported document type: '{}'", document.file_name))?;

        let dir = self.config.work_dir.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let output = match &document.binary {
            None => None,
            Some(binary) => {
                let input = dir.join(&file_name);
                let stem = Path::new(&file_name)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "document".to_string());
                let output = dir.join(format!("{}.{}", stem, self.config.output_extension));

                if let Err(e) = tokio::fs::write(&input, binary.as_ref()).await {
                    remove_dir(&dir).await;
                    return Err(anyhow::Error::new(e)
                        .context(format!("Failed to write {}", input.display())));
                }

                if let Err(e) = self.convert(&input, &output).await {
                    remove_dir(&dir).await;
                    return Err(e);
                }
                Some(output)
            }
        };

        tracing::info!(
            file_name = %document.file_name,
            kind = %kind,
            blank = document.is_blank(),
            "document opened"
        );

        let previous = self.replace_active(Some(ActiveDocument {
            file_name,
            kind,
            output,
            dir,
        }));
        if let Some(previous) = previous {
            remove_dir(&previous.dir).await;
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if let Some(previous) = self.replace_active(None) {
            tracing::info!(file_name = %previous.file_name, "viewer closed");
            remove_dir(&previous.dir).await;
        }
        Ok(())
    }
}
