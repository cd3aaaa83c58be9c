//! Chunked upload of telemetry CSV files.
//!
//! A file is split into [`CHUNK_SIZE`] pieces that are sent strictly one
//! after the other. Once every piece is acknowledged a single finalize call
//! asks the backend to assemble and ingest the dataset. Any rejected call
//! abandons the whole job.

use std::{
    fs::File,
    io::{self, Cursor, Read, Seek, SeekFrom},
    ops::Range,
    path::Path,
};

use log::{debug, info, warn};

use crate::api::{ChunkUpload, FinalizeUpload, VehicleDataApi};
use crate::errors::DashboardError;

pub const CHUNK_SIZE: u64 = 1024 * 1024;
pub const UPLOAD_SUCCESS_MESSAGE: &str = "CSV data loaded and processed successfully";

/// Receives status updates while an upload runs.
pub trait UploadObserver {
    /// Called with the rounded percentage after each chunk, and with `None`
    /// once the upload is no longer in progress.
    fn on_progress(&mut self, progress: Option<u8>);
    fn on_message(&mut self, message: &str);
    /// Called exactly once after the backend finalized the dataset.
    fn on_complete(&mut self);
}

/// A readable file with a known name and length.
pub struct UploadFile<R> {
    name: String,
    len: u64,
    // lent to the blocking pool while a chunk is read
    reader: Option<R>,
}

impl UploadFile<File> {
    pub fn open(path: &Path) -> Result<Self, DashboardError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| DashboardError::InvalidUploadFile {
                path: format!("{:?}", path),
            })?
            .to_string();
        let file = File::open(path).map_err(|e| DashboardError::UploadFileError { source: e })?;
        let len = file
            .metadata()
            .map_err(|e| DashboardError::UploadFileError { source: e })?
            .len();
        Ok(Self {
            name,
            len,
            reader: Some(file),
        })
    }
}

impl UploadFile<Cursor<Vec<u8>>> {
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            len: bytes.len() as u64,
            reader: Some(Cursor::new(bytes)),
        }
    }
}

impl<R> UploadFile<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

}

impl<R: Read + Seek + Send + 'static> UploadFile<R> {
    /// Reads `range` on tokio's blocking pool, so list requests sharing the
    /// runtime keep making progress during a large upload.
    async fn read_range(&mut self, range: Range<u64>) -> io::Result<Vec<u8>> {
        let mut reader = self
            .reader
            .take()
            .ok_or_else(|| io::Error::other("a previous read of this file failed"))?;
        let (reader, data) = tokio::task::spawn_blocking(move || {
            let data = read_exact_range(&mut reader, range);
            (reader, data)
        })
        .await
        .map_err(io::Error::other)?;
        self.reader = Some(reader);
        data
    }
}

fn read_exact_range<R: Read + Seek>(reader: &mut R, range: Range<u64>) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; (range.end - range.start) as usize];
    reader.seek(SeekFrom::Start(range.start))?;
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Number of chunks a file of `len` bytes is split into.
pub fn chunk_count(len: u64, chunk_size: u64) -> u64 {
    len.div_ceil(chunk_size)
}

/// Byte range of chunk `index`, clamped to the file length.
pub fn chunk_range(index: u64, len: u64, chunk_size: u64) -> Range<u64> {
    let start = index * chunk_size;
    let end = ((index + 1) * chunk_size).min(len);
    start..end
}

/// Percentage reported after chunk `index` (0 based), rounded half up.
pub fn progress_percent(index: u64, total_chunks: u64) -> u8 {
    if total_chunks == 0 {
        return 100;
    }
    let scaled = (index + 1) * 200 + total_chunks;
    (scaled / (2 * total_chunks)).min(100) as u8
}

/// Dataset name derived from an uploaded file name: the name without a
/// trailing `.csv`. `None` when nothing is left.
pub fn dataset_name_for(file_name: &str) -> Option<String> {
    let name = if file_name.len() >= 4
        && file_name.is_char_boundary(file_name.len() - 4)
        && file_name[file_name.len() - 4..].eq_ignore_ascii_case(".csv")
    {
        &file_name[..file_name.len() - 4]
    } else {
        file_name
    };
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadState {
    Pending,
    Sending { chunk_index: u64, total_chunks: u64 },
    Finalizing { total_chunks: u64 },
    Done,
    /// `chunk_index` is `None` when finalize was rejected
    Failed { chunk_index: Option<u64> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadSummary {
    pub file_name: String,
    pub vehicle_id: String,
    pub total_chunks: u64,
    pub bytes_sent: u64,
}

/// A single run of the chunked upload protocol.
pub struct UploadJob<R> {
    file: UploadFile<R>,
    vehicle_id: String,
    chunk_size: u64,
    total_chunks: u64,
    state: UploadState,
}

impl<R: Read + Seek + Send + 'static> UploadJob<R> {
    pub fn new(file: UploadFile<R>, vehicle_id: &str) -> Result<Self, DashboardError> {
        Self::with_chunk_size(file, vehicle_id, CHUNK_SIZE)
    }

    pub fn with_chunk_size(
        file: UploadFile<R>,
        vehicle_id: &str,
        chunk_size: u64,
    ) -> Result<Self, DashboardError> {
        if vehicle_id.is_empty() {
            return Err(DashboardError::EmptyDatasetName);
        }
        if chunk_size == 0 {
            return Err(DashboardError::InvalidUserInput {
                field: "chunk_size".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        let total_chunks = chunk_count(file.len(), chunk_size);
        Ok(Self {
            file,
            vehicle_id: vehicle_id.to_string(),
            chunk_size,
            total_chunks,
            state: UploadState::Pending,
        })
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn total_chunks(&self) -> u64 {
        self.total_chunks
    }

    fn transition(&mut self, next: UploadState) {
        debug!(
            "Upload of {}: {:?} -> {:?}",
            self.file.name(),
            self.state,
            next
        );
        self.state = next;
    }

    pub async fn run<B, O>(
        &mut self,
        backend: &B,
        observer: &mut O,
    ) -> Result<UploadSummary, DashboardError>
    where
        B: VehicleDataApi,
        O: UploadObserver,
    {
        info!(
            "Uploading {} ({} bytes) as {} in {} chunks",
            self.file.name(),
            self.file.len(),
            self.vehicle_id,
            self.total_chunks
        );
        let mut bytes_sent = 0;
        for chunk_index in 0..self.total_chunks {
            self.transition(UploadState::Sending {
                chunk_index,
                total_chunks: self.total_chunks,
            });
            let range = chunk_range(chunk_index, self.file.len(), self.chunk_size);
            let data = match self.file.read_range(range).await {
                Ok(data) => data,
                Err(e) => {
                    self.transition(UploadState::Failed {
                        chunk_index: Some(chunk_index),
                    });
                    return Err(DashboardError::UploadFileError { source: e });
                }
            };
            let len = data.len() as u64;
            let chunk = ChunkUpload {
                file_name: self.file.name().to_string(),
                chunk_index,
                total_chunks: self.total_chunks,
                vehicle_id: self.vehicle_id.clone(),
                data,
            };
            if let Err(e) = backend.upload_chunk(chunk).await {
                warn!("Chunk {} of {} rejected: {}", chunk_index, self.file.name(), e);
                self.transition(UploadState::Failed {
                    chunk_index: Some(chunk_index),
                });
                return Err(e);
            }
            bytes_sent += len;
            observer.on_progress(Some(progress_percent(chunk_index, self.total_chunks)));
        }

        self.transition(UploadState::Finalizing {
            total_chunks: self.total_chunks,
        });
        let finalize = FinalizeUpload {
            file_name: self.file.name().to_string(),
            total_chunks: self.total_chunks,
            vehicle_id: self.vehicle_id.clone(),
        };
        if let Err(e) = backend.finalize_upload(&finalize).await {
            warn!("Finalize of {} rejected: {}", self.file.name(), e);
            self.transition(UploadState::Failed { chunk_index: None });
            return Err(e);
        }

        self.transition(UploadState::Done);
        observer.on_message(UPLOAD_SUCCESS_MESSAGE);
        observer.on_progress(None);
        observer.on_complete();
        Ok(UploadSummary {
            file_name: finalize.file_name,
            vehicle_id: finalize.vehicle_id,
            total_chunks: self.total_chunks,
            bytes_sent,
        })
    }
}

/// Sends `file` to the backend in [`CHUNK_SIZE`] pieces and finalizes it as
/// dataset `vehicle_id`.
pub async fn upload_file_in_chunks<B, R, O>(
    backend: &B,
    file: UploadFile<R>,
    vehicle_id: &str,
    observer: &mut O,
) -> Result<UploadSummary, DashboardError>
where
    B: VehicleDataApi,
    R: Read + Seek + Send + 'static,
    O: UploadObserver,
{
    UploadJob::new(file, vehicle_id)?
        .run(backend, observer)
        .await
}
