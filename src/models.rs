//! Core data models used throughout the loader.
//!
//! These types represent the chunks, assembled files, document records and
//! acquisition outcomes that flow from an acquisition path to the viewer.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One fragment of a file sent over the message channel.
///
/// Field names follow the camelCase wire format of the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub chunk_index: u32,
    pub total_chunks: u32,
    /// Base64-encoded slice of the file.
    pub data: String,
    pub name: String,
    pub size: u64,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub last_modified: i64,
    #[serde(rename = "type", default)]
    pub mime: String,
}

/// A file rebuilt from a completed chunked transfer.
#[derive(Debug, Clone)]
pub struct AssembledFile {
    pub name: String,
    pub mime: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub bytes: Vec<u8>,
}

impl AssembledFile {
    pub(crate) fn last_modified_from_millis(millis: i64) -> Option<DateTime<Utc>> {
        if millis <= 0 {
            return None;
        }
        Utc.timestamp_millis_opt(millis).single()
    }
}

/// The document currently loaded (or being loaded) in the viewer.
///
/// Records are never mutated in place; the session swaps in a new one.
/// `binary == None` denotes a new blank document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentRecord {
    pub file_name: String,
    pub binary: Option<Arc<[u8]>>,
    pub source_url: Option<String>,
}

impl DocumentRecord {
    pub fn new(file_name: impl Into<String>, binary: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            binary: Some(Arc::from(binary)),
            source_url: None,
        }
    }

    pub fn blank(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            binary: None,
            source_url: None,
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn is_blank(&self) -> bool {
        self.binary.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.file_name.is_empty() && self.binary.is_none()
    }

    pub fn size(&self) -> usize {
        self.binary.as_ref().map(|b| b.len()).unwrap_or(0)
    }

    /// Lowercased extension of the file name, without the dot.
    pub fn extension(&self) -> Option<String> {
        file_extension(&self.file_name)
    }

    pub fn kind(&self) -> Option<DocumentKind> {
        self.extension()
            .as_deref()
            .and_then(DocumentKind::from_extension)
    }
}

/// Lowercased extension of `name`, without the dot.
pub fn file_extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Final path component of `name`, or `None` if there is none (`..`, `/`,
/// empty). Both `/` and `\` count as separators.
pub fn base_file_name(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    match last {
        "" | "." | ".." => None,
        other => Some(other.to_string()),
    }
}

/// Editor family a document opens in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Word,
    Cell,
    Slide,
}

impl DocumentKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "docx" | "doc" | "odt" | "rtf" | "txt" => Some(Self::Word),
            "xlsx" | "xls" | "ods" | "csv" => Some(Self::Cell),
            "pptx" | "ppt" | "odp" => Some(Self::Slide),
            _ => None,
        }
    }

    /// Extension used when creating a new blank document of this kind.
    pub fn blank_extension(self) -> &'static str {
        match self {
            Self::Word => "docx",
            Self::Cell => "xlsx",
            Self::Slide => "pptx",
        }
    }

    pub fn blank_file_name(self) -> String {
        format!("New_Document.{}", self.blank_extension())
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "word" | "docx" => Some(Self::Word),
            "cell" | "excel" | "xlsx" => Some(Self::Cell),
            "slide" | "powerpoint" | "pptx" => Some(Self::Slide),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Word => "word",
            Self::Cell => "cell",
            Self::Slide => "slide",
        };
        f.write_str(s)
    }
}

/// Terminal outcome of an acquisition path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionResult {
    Success {
        file_name: String,
        binary: Option<Arc<[u8]>>,
    },
    Cancelled,
    Failed {
        reason: String,
    },
}

impl AcquisitionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub(crate) fn from_record(record: &DocumentRecord) -> Self {
        Self::Success {
            file_name: record.file_name.clone(),
            binary: record.binary.clone(),
        }
    }
}
