use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::error::{PipelineError, Result};
use super::export::ExportBuffer;

pub const ARCHIVE_NAME: &str = "processed_files.zip";
pub const ARCHIVE_MIME: &str = "application/zip";

// ---------------------------------------------------------------------------
// ProcessedFileSet – every export produced in the session
// ---------------------------------------------------------------------------

/// Export buffers keyed by file name, in insertion order.
///
/// Inserting a name that is already present replaces that buffer in place.
#[derive(Debug, Clone, Default)]
pub struct ProcessedFileSet {
    buffers: Vec<ExportBuffer>,
}

impl ProcessedFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace; returns the buffer previously stored under the name.
    pub fn insert(&mut self, buffer: ExportBuffer) -> Option<ExportBuffer> {
        match self.buffers.iter_mut().find(|b| b.name() == buffer.name()) {
            Some(slot) => {
                log::warn!("{} produced again, replacing earlier export", buffer.name());
                Some(std::mem::replace(slot, buffer))
            }
            None => {
                self.buffers.push(buffer);
                None
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExportBuffer> {
        self.buffers.iter()
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ZIP aggregation
// ---------------------------------------------------------------------------

/// One archive entry per buffer, in insertion order.
pub fn aggregate(files: &ProcessedFileSet) -> Result<Vec<u8>> {
    if files.is_empty() {
        return Err(PipelineError::EmptyFileSet);
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for buffer in files.iter() {
        zip.start_file(buffer.name(), options)
            .map_err(|e| archive_error(buffer.name(), e))?;
        zip.write_all(buffer.bytes())
            .map_err(|e| archive_error(buffer.name(), e))?;
    }
    let cursor = zip
        .finish()
        .map_err(|e| archive_error(ARCHIVE_NAME, e))?;

    log::info!("archived {} files", files.len());
    Ok(cursor.into_inner())
}

/// [`aggregate`] wrapped as the `processed_files.zip` download.
pub fn archive(files: &ProcessedFileSet) -> Result<ExportBuffer> {
    Ok(ExportBuffer::new(ARCHIVE_NAME, aggregate(files)?, ARCHIVE_MIME))
}

fn archive_error(entry: &str, err: impl std::fmt::Display) -> PipelineError {
    PipelineError::Archive(format!("{entry}: {err}"))
}
