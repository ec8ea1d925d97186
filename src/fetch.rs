//! Remote document fetch.
//!
//! Downloads a document over HTTP and works out what to call it.
//!
//! # File name resolution
//!
//! | Priority | Source |
//! |----------|--------|
//! | 1 | Name passed by the caller |
//! | 2 | `Content-Disposition` `filename=` / `filename*=` |
//! | 3 | Last path segment of the URL, query stripped |
//! | 4 | `"document"` |

use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::Url;
use std::time::Duration;

use crate::config::FetchConfig;
use crate::error::{AcquisitionError, Result};
use crate::models::base_file_name;

/// Name used when nothing better is known.
pub const FALLBACK_FILE_NAME: &str = "document";

/// A downloaded document.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

/// HTTP client for document downloads.
#[derive(Debug, Clone)]
pub struct RemoteFetcher {
    client: reqwest::Client,
}

impl RemoteFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AcquisitionError::Unknown(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Download `url`. Non-2xx statuses and transport errors are
    /// [`AcquisitionError::NetworkFailure`].
    pub async fn fetch(&self, url: &str, file_name: Option<&str>) -> Result<FetchedDocument> {
        tracing::info!(url, "fetching document");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AcquisitionError::NetworkFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = match status.canonical_reason() {
                Some(text) => format!("{} {}", status.as_u16(), text),
                None => status.as_u16().to_string(),
            };
            return Err(AcquisitionError::NetworkFailure(format!(
                "Failed to fetch document: {}",
                reason
            )));
        }

        let disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let file_name = derive_file_name(file_name, disposition.as_deref(), url);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AcquisitionError::NetworkFailure(e.to_string()))?
            .to_vec();

        tracing::debug!(file_name = %file_name, bytes = bytes.len(), "document downloaded");

        Ok(FetchedDocument {
            file_name,
            mime,
            bytes,
        })
    }
}

/// Pick a file name following the priority table in the module docs.
///
/// Every candidate is reduced to its final path component; one that has
/// none falls through to the next source.
pub fn derive_file_name(explicit: Option<&str>, content_disposition: Option<&str>, url: &str) -> String {
    explicit
        .and_then(base_file_name)
        .or_else(|| {
            content_disposition
                .and_then(filename_from_content_disposition)
                .as_deref()
                .and_then(base_file_name)
        })
        .or_else(|| filename_from_url(url).as_deref().and_then(base_file_name))
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}

/// Extract the file name from a `Content-Disposition` header value.
///
/// A plain `filename=` parameter wins over `filename*=`. Surrounding quotes
/// are stripped, and separators inside them belong to the name. An RFC 5987
/// `charset'lang'` prefix is dropped and the value percent-decoded.
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let mut extended = None;

    for param in split_params(header) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = unquote(value.trim());

        if key == "filename" {
            if !value.trim().is_empty() {
                return Some(value.trim().to_string());
            }
        } else if key == "filename*" {
            let encoded = match value.splitn(3, '\'').collect::<Vec<_>>().as_slice() {
                [_charset, _lang, rest] => *rest,
                _ => value,
            };
            let decoded = urlencoding::decode_binary(encoded.as_bytes());
            let decoded = String::from_utf8_lossy(&decoded);
            if !decoded.trim().is_empty() {
                extended = Some(decoded.trim().to_string());
            }
        }
    }

    extended
}

/// Split header parameters on `;`. A quote right after `=` opens a quoted
/// value and separators inside it are kept.
fn split_params(header: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut quote: Option<char> = None;
    let mut prev = None;
    let mut start = 0;

    for (i, c) in header.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if (c == '"' || c == '\'') && prev == Some('=') => quote = Some(c),
            None if c == ';' => {
                params.push(header[start..i].trim());
                start = i + 1;
            }
            None => {}
        }
        if !c.is_whitespace() {
            prev = Some(c);
        }
    }
    params.push(header[start..].trim());
    params
}

fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(q).and_then(|v| v.strip_suffix(q)) {
            return inner;
        }
    }
    value
}

/// Last non-empty path segment of `url`, query and fragment excluded.
pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.last()?;
    if segment.is_empty() {
        return None;
    }
    Some(segment.to_string())
}
