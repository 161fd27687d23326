//! Offset-addressed file access, handle-by-opaque-value.
//!
//! Responsibilities:
//! - Define the file contract of the firmware API: open with a mode mask,
//!   read/write at an explicit offset, query length, close. There is no
//!   seek; callers carry their own cursor, which is why every call takes an
//!   offset.
//! - Provide [`MemStore`], an in-memory implementation used as the default
//!   test double. It is a map of paths to byte vectors, not a file system.
//!
//! The engine itself touches this only to load wavetable data
//! (`synth::load_wavetable`); everything else is for the hosted application.

use std::collections::HashMap;

use bitflags::bitflags;

bitflags! {
    /// Open mode mask. Values are part of the device contract.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct OpenMode: u8 {
        const READ  = 1 << 0;
        const WRITE = 1 << 1;
    }
}

/// An opaque open-file handle. Meaningful only to the store that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FileHandle(u32);

/// Errors from file operations.
#[derive(Debug)]
pub enum FileError {
    /// Opened for reading, but the path does not exist.
    NotFound(String),
    /// The mode mask had neither READ nor WRITE set.
    EmptyMode,
    /// The handle was never issued, or was already closed.
    StaleHandle,
    /// Read on a write-only handle, or write on a read-only handle.
    BadAccess,
}

impl core::fmt::Display for FileError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FileError::NotFound(path) => write!(f, "no such file: {path}"),
            FileError::EmptyMode => write!(f, "open mode selects neither read nor write"),
            FileError::StaleHandle => write!(f, "file handle is closed or was never issued"),
            FileError::BadAccess => write!(f, "operation not permitted by the open mode"),
        }
    }
}

impl std::error::Error for FileError {}

/// The file capability injected into the device table.
///
/// Reads past the end are short, not errors. Writes may extend the file.
pub trait FileStore {
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<FileHandle, FileError>;
    fn read(&mut self, handle: FileHandle, offset: u32, buf: &mut [u8])
        -> Result<usize, FileError>;
    fn write(&mut self, handle: FileHandle, offset: u32, data: &[u8])
        -> Result<usize, FileError>;
    fn close(&mut self, handle: FileHandle) -> Result<(), FileError>;
    fn len(&mut self, handle: FileHandle) -> Result<u32, FileError>;
    fn exists(&mut self, path: &str) -> bool;
}

struct OpenEntry {
    path: String,
    mode: OpenMode,
}

/// In-memory [`FileStore`].
#[derive(Default)]
pub struct MemStore {
    files: HashMap<String, Vec<u8>>,
    open: HashMap<u32, OpenEntry>,
    next_handle: u32,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file, replacing any previous contents.
    pub fn insert(&mut self, path: &str, bytes: Vec<u8>) {
        self.files.insert(path.to_owned(), bytes);
    }

    fn entry(&self, handle: FileHandle) -> Result<&OpenEntry, FileError> {
        self.open.get(&handle.0).ok_or(FileError::StaleHandle)
    }
}

impl FileStore for MemStore {
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<FileHandle, FileError> {
        if mode.is_empty() {
            return Err(FileError::EmptyMode);
        }
        if !self.files.contains_key(path) {
            if !mode.contains(OpenMode::WRITE) {
                return Err(FileError::NotFound(path.to_owned()));
            }
            self.files.insert(path.to_owned(), Vec::new());
        }

        let id = self.next_handle;
        self.next_handle += 1;
        self.open.insert(
            id,
            OpenEntry {
                path: path.to_owned(),
                mode,
            },
        );
        Ok(FileHandle(id))
    }

    fn read(
        &mut self,
        handle: FileHandle,
        offset: u32,
        buf: &mut [u8],
    ) -> Result<usize, FileError> {
        let entry = self.entry(handle)?;
        if !entry.mode.contains(OpenMode::READ) {
            return Err(FileError::BadAccess);
        }
        let data = &self.files[&entry.path];

        let start = (offset as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    fn write(
        &mut self,
        handle: FileHandle,
        offset: u32,
        data: &[u8],
    ) -> Result<usize, FileError> {
        let entry = self.entry(handle)?;
        if !entry.mode.contains(OpenMode::WRITE) {
            return Err(FileError::BadAccess);
        }
        let path = entry.path.clone();
        let file = self.files.get_mut(&path).expect("open file has contents");

        let end = offset as usize + data.len();
        if file.len() < end {
            file.resize(end, 0);
        }
        file[offset as usize..end].copy_from_slice(data);
        Ok(data.len())
    }

    fn close(&mut self, handle: FileHandle) -> Result<(), FileError> {
        self.open
            .remove(&handle.0)
            .map(|_| ())
            .ok_or(FileError::StaleHandle)
    }

    fn len(&mut self, handle: FileHandle) -> Result<u32, FileError> {
        let entry = self.entry(handle)?;
        Ok(self.files[&entry.path].len() as u32)
    }

    fn exists(&mut self, path: &str) -> bool {
        self.files.contains_key(path)
    }
}
