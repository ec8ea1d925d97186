//! Chunked-transfer reassembly.
//!
//! Files sent over the message channel arrive as a sequence of [`Chunk`]s,
//! each carrying a base64 slice of the file plus the file's metadata. The
//! [`ChunkAssembler`] buffers them until the declared chunk count is reached,
//! then decodes the buffer into one [`AssembledFile`].
//!
//! One assembler belongs to one viewing session. Only a single transfer is
//! in flight at a time, so the assembler owns a single pending buffer.
//!
//! Metadata that must agree across a transfer (`totalChunks`, `name`,
//! `size`, `type`) is checked against the first buffered chunk; any
//! disagreement aborts the transfer instead of assembling the wrong bytes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;

use crate::error::{AcquisitionError, Result};
use crate::models::{AssembledFile, Chunk};

/// Order in which buffered chunks are concatenated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReassemblyOrder {
    /// Concatenate in arrival order; duplicates count toward completion.
    #[default]
    Arrival,
    /// Drop repeated indices and sort by `chunkIndex` before decoding.
    Index,
}

/// Result of submitting one chunk.
#[derive(Debug)]
pub enum AssemblyState {
    Incomplete { received: usize, total: usize },
    Complete(AssembledFile),
}

#[derive(Debug, Default)]
pub struct ChunkAssembler {
    order: ReassemblyOrder,
    pending: Vec<Chunk>,
}

impl ChunkAssembler {
    pub fn new(order: ReassemblyOrder) -> Self {
        Self {
            order,
            pending: Vec::new(),
        }
    }

    /// Number of chunks currently buffered.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Discard any in-flight transfer.
    pub fn reset(&mut self) {
        if !self.pending.is_empty() {
            tracing::debug!(discarded = self.pending.len(), "discarding pending transfer");
        }
        self.pending.clear();
    }

    /// Add a chunk to the pending transfer.
    ///
    /// Returns [`AssemblyState::Complete`] exactly once per transfer, when the
    /// buffer first reaches the declared chunk count. The buffer is empty
    /// again after completion or after any error.
    pub fn submit(&mut self, chunk: Chunk) -> Result<AssemblyState> {
        if let Err(e) = self.validate(&chunk) {
            self.pending.clear();
            return Err(e);
        }

        let total = chunk.total_chunks as usize;

        if self.pending.iter().any(|c| c.chunk_index == chunk.chunk_index) {
            match self.order {
                ReassemblyOrder::Arrival => {
                    tracing::warn!(
                        index = chunk.chunk_index,
                        name = %chunk.name,
                        "duplicate chunk index buffered in arrival order"
                    );
                }
                ReassemblyOrder::Index => {
                    tracing::debug!(index = chunk.chunk_index, "dropping duplicate chunk");
                    return Ok(AssemblyState::Incomplete {
                        received: self.pending.len(),
                        total,
                    });
                }
            }
        }

        self.pending.push(chunk);

        if self.pending.len() < total {
            return Ok(AssemblyState::Incomplete {
                received: self.pending.len(),
                total,
            });
        }

        let mut chunks = std::mem::take(&mut self.pending);
        if self.order == ReassemblyOrder::Index {
            chunks.sort_by_key(|c| c.chunk_index);
        }
        decode_chunks(chunks).map(AssemblyState::Complete)
    }

    fn validate(&self, chunk: &Chunk) -> Result<()> {
        if chunk.total_chunks == 0 {
            return Err(violation(format!(
                "chunk for '{}' declares zero total chunks",
                chunk.name
            )));
        }
        if chunk.chunk_index >= chunk.total_chunks {
            return Err(violation(format!(
                "chunk index {} out of range for {} chunks",
                chunk.chunk_index, chunk.total_chunks
            )));
        }

        let Some(first) = self.pending.first() else {
            return Ok(());
        };

        if first.total_chunks != chunk.total_chunks {
            return Err(violation(format!(
                "totalChunks changed mid-transfer ({} then {})",
                first.total_chunks, chunk.total_chunks
            )));
        }
        if first.name != chunk.name {
            return Err(violation(format!(
                "file name changed mid-transfer ('{}' then '{}')",
                first.name, chunk.name
            )));
        }
        if first.size != chunk.size {
            return Err(violation(format!(
                "file size changed mid-transfer ({} then {})",
                first.size, chunk.size
            )));
        }
        if first.mime != chunk.mime {
            return Err(violation(format!(
                "mime type changed mid-transfer ('{}' then '{}')",
                first.mime, chunk.mime
            )));
        }
        Ok(())
    }
}

fn decode_chunks(chunks: Vec<Chunk>) -> Result<AssembledFile> {
    let Some(first) = chunks.first() else {
        return Err(violation("no chunks to assemble".to_string()));
    };

    let name = first.name.clone();
    let mime = first.mime.clone();
    let size = first.size;
    let last_modified = AssembledFile::last_modified_from_millis(first.last_modified);

    // `size` is declared by the sender; never trust it for allocation.
    let mut bytes = Vec::new();
    for chunk in &chunks {
        let decoded = STANDARD.decode(chunk.data.as_bytes()).map_err(|e| {
            violation(format!(
                "chunk {} of '{}' is not valid base64: {}",
                chunk.chunk_index, chunk.name, e
            ))
        })?;
        bytes.extend_from_slice(&decoded);
    }

    if bytes.len() as u64 != size {
        tracing::warn!(
            name = %name,
            declared = size,
            assembled = bytes.len(),
            "assembled size differs from declared size"
        );
    }

    Ok(AssembledFile {
        name,
        mime,
        size,
        last_modified,
        bytes,
    })
}

fn violation(message: String) -> AcquisitionError {
    AcquisitionError::TransferProtocolViolation(message)
}
