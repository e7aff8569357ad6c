//! File and stdin input, file output.
//!
//! Inputs (prompts, transcripts, documents, repository files) are read
//! whole. Files above a size threshold are memory-mapped instead of read
//! through a buffer, so their bytes can be inspected (UTF-8 validation,
//! binary detection) without a copy.

// Memory mapping requires unsafe; the mapping is read-only.
#![allow(unsafe_code)]

use crate::error::{IoError, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::ops::Deref;
use std::path::Path;

/// Threshold for using memory mapping (1MB).
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Maximum input size (64MB).
const MAX_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Path that selects standard input.
pub const STDIN_PATH: &str = "-";

/// Bytes of a whole file.
#[derive(Debug)]
pub enum FileContent {
    /// Read-only mapping of a large file.
    Mapped(Mmap),
    /// Buffered contents of a small file.
    Buffered(Vec<u8>),
}

impl FileContent {
    /// Returns true if the content is memory-mapped.
    #[must_use]
    pub const fn is_mapped(&self) -> bool {
        matches!(self, Self::Mapped(_))
    }

    /// Borrows the content as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns the byte offset of the first invalid sequence.
    pub fn as_text(&self) -> std::result::Result<&str, usize> {
        std::str::from_utf8(self).map_err(|e| e.valid_up_to())
    }
}

impl Deref for FileContent {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Mapped(mmap) => &mmap[..],
            Self::Buffered(bytes) => bytes.as_slice(),
        }
    }
}

/// Whole-file reader.
///
/// # Examples
///
/// ```no_run
/// use devtools_rs::io::FileReader;
///
/// let reader = FileReader::open("transcript.sse").unwrap();
/// let content = reader.read_to_string().unwrap();
/// ```
#[derive(Debug)]
pub struct FileReader {
    file: File,
    size: u64,
    path: String,
}

impl FileReader {
    /// Opens a file for reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the file doesn't exist, can't be opened, or is
    /// larger than the input limit.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy().to_string();

        if !path_ref.is_file() {
            return Err(IoError::FileNotFound { path: path_str }.into());
        }

        let read_failed = |e: std::io::Error| IoError::ReadFailed {
            path: path_str.clone(),
            reason: e.to_string(),
        };
        let file = File::open(path_ref).map_err(read_failed)?;
        let size = file.metadata().map_err(read_failed)?.len();

        if size > MAX_FILE_SIZE {
            return Err(IoError::ReadFailed {
                path: path_str,
                reason: format!("file too large: {size} bytes (max: {MAX_FILE_SIZE} bytes)"),
            }
            .into());
        }

        Ok(Self {
            file,
            size,
            path: path_str,
        })
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Reads the file as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the content is not UTF-8.
    pub fn read_to_string(&self) -> Result<String> {
        let content = self.read_content()?;
        let text = content.as_text().map_err(|offset| IoError::ReadFailed {
            path: self.path.clone(),
            reason: format!("invalid UTF-8 at byte {offset}"),
        })?;
        Ok(text.to_string())
    }

    /// Reads the file's bytes, memory-mapping large files.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or mapping fails.
    pub fn read_content(&self) -> Result<FileContent> {
        if self.size >= MMAP_THRESHOLD {
            // Safety: read-only mapping; inputs are not modified while read
            let mmap = unsafe {
                Mmap::map(&self.file).map_err(|e| IoError::MmapFailed {
                    path: self.path.clone(),
                    reason: e.to_string(),
                })?
            };
            return Ok(FileContent::Mapped(mmap));
        }

        let mut file = &self.file;
        let mut buffer = Vec::with_capacity(usize::try_from(self.size).unwrap_or_default());
        file.read_to_end(&mut buffer)
            .map_err(|e| IoError::ReadFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        Ok(FileContent::Buffered(buffer))
    }
}

/// Reads a UTF-8 file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid UTF-8.
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<String> {
    FileReader::open(path)?.read_to_string()
}

/// Reads all of `reader` as UTF-8 text.
///
/// # Errors
///
/// Returns an error if reading fails or the input is not UTF-8.
pub fn read_stream<R: Read>(mut reader: R) -> Result<String> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| IoError::ReadFailed {
            path: STDIN_PATH.to_string(),
            reason: e.to_string(),
        })?;
    Ok(text)
}

/// Reads `path`, or standard input when `path` is `None` or `-`.
///
/// # Errors
///
/// Returns an error if the input cannot be read.
pub fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new(STDIN_PATH) => read_file(path),
        _ => read_stream(std::io::stdin().lock()),
    }
}

/// Writes content to a file, creating parent directories if needed.
///
/// # Errors
///
/// Returns an error if directory creation or file writing fails.
pub fn write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    let path_ref = path.as_ref();
    let path_str = path_ref.to_string_lossy().to_string();

    if let Some(parent) = path_ref.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| IoError::DirectoryFailed {
            path: parent.to_string_lossy().to_string(),
            reason: e.to_string(),
        })?;
    }

    std::fs::write(path_ref, content).map_err(|e| IoError::WriteFailed {
        path: path_str,
        reason: e.to_string(),
    })?;

    Ok(())
}
