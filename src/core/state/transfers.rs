// src/core/state/transfers.rs

//! Per-connection state machine for chunked file uploads.
//!
//! A transfer is started with a declared name and size, fed raw chunks, and
//! finished with a SHA-256 digest. A connection has at most one transfer in flight.
//!
//! Bytes land in a partial file private to the transfer and are moved to the
//! destination name only once the digest matches.

use crate::core::{ChatError, ConnectionId};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{error, info, warn};

/// An upload that has been started but not yet finished or cancelled.
#[derive(Debug)]
pub struct FileTransferSession {
    pub connection_id: ConnectionId,
    pub filename: String,
    pub declared_size: u64,
    /// Where the file is moved once the transfer completes.
    pub path: PathBuf,
    /// The file being written while the transfer is active.
    pub part_path: PathBuf,
    pub bytes_received: u64,
    sink: BufWriter<File>,
    hasher: Sha256,
}

/// The outcome of a transfer whose size and checksum both matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTransfer {
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
    pub checksum: String,
}

/// Owns every in-flight upload and its open file handle.
#[derive(Debug)]
pub struct FileTransferManager {
    upload_dir: PathBuf,
    transfers: HashMap<ConnectionId, FileTransferSession>,
}

impl FileTransferManager {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            transfers: HashMap::new(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Begins a new upload, cancelling any previous one for the same connection.
    pub async fn start(
        &mut self,
        id: ConnectionId,
        filename: &str,
        size: i64,
    ) -> Result<&FileTransferSession, ChatError> {
        let sanitized = sanitize_filename(filename);
        if sanitized.is_empty() || size <= 0 {
            return Err(ChatError::InvalidFileMetadata);
        }

        if self.transfers.contains_key(&id) {
            warn!(
                connection_id = id,
                "Connection started a new transfer while another was active; cancelling the old one."
            );
            self.cancel(id, "superseded by a new transfer").await;
        }

        fs::create_dir_all(&self.upload_dir).await?;
        let path = self.upload_dir.join(&sanitized);
        let part_path = self.upload_dir.join(format!(".{id}-{sanitized}.part"));
        let file = File::create(&part_path).await?;

        info!(
            connection_id = id,
            filename = %sanitized,
            size,
            path = %path.display(),
            "File transfer started."
        );

        let session = FileTransferSession {
            connection_id: id,
            filename: sanitized,
            declared_size: size as u64,
            path,
            part_path,
            bytes_received: 0,
            sink: BufWriter::new(file),
            hasher: Sha256::new(),
        };
        Ok(self.transfers.entry(id).insert_entry(session).into_mut())
    }

    /// Appends a chunk. A chunk that would exceed the declared size is not
    /// written and cancels the transfer.
    pub async fn append_chunk(&mut self, id: ConnectionId, chunk: &[u8]) -> Result<u64, ChatError> {
        let session = self
            .transfers
            .get_mut(&id)
            .ok_or(ChatError::NoActiveTransfer)?;

        let new_total = session.bytes_received + chunk.len() as u64;
        if new_total > session.declared_size {
            let declared = session.declared_size;
            error!(
                connection_id = id,
                declared,
                attempted = new_total,
                "Client sent more data than declared. Aborting transfer."
            );
            self.cancel(id, "declared size exceeded").await;
            return Err(ChatError::TransferOverflow { declared });
        }

        if let Err(e) = session.sink.write_all(chunk).await {
            error!(connection_id = id, "Failed to write file chunk: {}", e);
            self.cancel(id, "write failure").await;
            return Err(e.into());
        }
        session.hasher.update(chunk);
        session.bytes_received = new_total;
        Ok(new_total)
    }

    /// Finalizes the upload and verifies its SHA-256 digest.
    pub async fn finish(
        &mut self,
        id: ConnectionId,
        claimed_checksum: &str,
    ) -> Result<CompletedTransfer, ChatError> {
        let session = self
            .transfers
            .get(&id)
            .ok_or(ChatError::NoActiveTransfer)?;

        if session.bytes_received != session.declared_size {
            let (received, declared) = (session.bytes_received, session.declared_size);
            error!(
                connection_id = id,
                received, declared, "File size mismatch at end of transfer."
            );
            self.cancel(id, "incomplete transfer").await;
            return Err(ChatError::IncompleteTransfer { received, declared });
        }

        let Some(mut session) = self.transfers.remove(&id) else {
            return Err(ChatError::NoActiveTransfer);
        };

        let closed = async {
            session.sink.flush().await?;
            session.sink.get_mut().sync_all().await
        }
        .await;
        if let Err(e) = closed {
            error!(connection_id = id, "Failed to close uploaded file: {}", e);
            drop(session.sink);
            remove_partial_file(&session.part_path).await;
            return Err(e.into());
        }
        drop(session.sink);

        let actual = hex::encode(session.hasher.finalize());
        if !actual.eq_ignore_ascii_case(claimed_checksum.trim()) {
            warn!(
                connection_id = id,
                filename = %session.filename,
                expected = %claimed_checksum,
                actual = %actual,
                "Checksum mismatch; discarding uploaded file."
            );
            remove_partial_file(&session.part_path).await;
            return Err(ChatError::ChecksumMismatch(session.filename));
        }

        if let Err(e) = fs::rename(&session.part_path, &session.path).await {
            error!(
                connection_id = id,
                path = %session.path.display(),
                "Failed to move completed upload into place: {}", e
            );
            remove_partial_file(&session.part_path).await;
            return Err(e.into());
        }

        info!(
            connection_id = id,
            filename = %session.filename,
            size = session.declared_size,
            "File transfer completed."
        );
        Ok(CompletedTransfer {
            filename: session.filename,
            path: session.path,
            size: session.declared_size,
            checksum: actual,
        })
    }

    /// Aborts the upload and deletes the partial file. Returns false if the
    /// connection had no transfer.
    pub async fn cancel(&mut self, id: ConnectionId, reason: &str) -> bool {
        let Some(session) = self.transfers.remove(&id) else {
            return false;
        };
        warn!(
            connection_id = id,
            filename = %session.filename,
            reason,
            "Cancelling file transfer."
        );
        drop(session.sink);
        remove_partial_file(&session.part_path).await;
        true
    }

    /// Cancels every in-flight upload. Returns how many were cancelled.
    pub async fn cancel_all(&mut self, reason: &str) -> usize {
        let ids: Vec<ConnectionId> = self.transfers.keys().copied().collect();
        let mut cancelled = 0;
        for id in ids {
            if self.cancel(id, reason).await {
                cancelled += 1;
            }
        }
        cancelled
    }

    pub fn session(&self, id: ConnectionId) -> Option<&FileTransferSession> {
        self.transfers.get(&id)
    }

    pub fn active_count(&self) -> usize {
        self.transfers.len()
    }
}

/// Reduces a client-supplied name to its final path component.
pub fn sanitize_filename(filename: &str) -> String {
    let last = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    match last {
        "." | ".." => String::new(),
        other => other.to_string(),
    }
}

async fn remove_partial_file(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => info!(path = %path.display(), "Removed partial upload."),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => error!(path = %path.display(), "Failed to remove partial upload: {}", e),
    }
}
