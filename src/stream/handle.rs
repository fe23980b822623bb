//! Handle types a [`ByteStream`](crate::stream::ByteStream) can wrap.
//!
//! A handle is an already-open byte source. It performs raw I/O without
//! enforcing any capability policy; classification and enforcement live in
//! the stream abstraction that wraps it.

use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::base::error::Error;

/// One open byte source: a file, an in-memory buffer, or anything a caller
/// supplies.
pub trait StreamHandle {
    /// The `fopen`-style mode string the handle was opened with, exactly as
    /// supplied.
    fn mode(&self) -> &str;

    /// Whether the handle supports seeking.
    fn is_seekable(&self) -> bool;

    /// Snapshot of the handle's metadata.
    fn metadata(&self) -> StreamMetadata;

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;

    /// Current offset of the handle's pointer.
    fn position(&mut self) -> io::Result<u64>;

    /// Total size of the underlying source in bytes.
    fn size(&mut self) -> io::Result<u64>;
}

/// Metadata snapshot of a handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMetadata {
    pub stream_type: String,
    pub mode: String,
    pub seekable: bool,
    /// Source location, when the handle has one (a file path).
    pub uri: Option<String>,
}

/// A single metadata field, looked up by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataValue {
    Str(String),
    Bool(bool),
}

impl StreamMetadata {
    /// Look up one field by its conventional key name.
    pub fn get(&self, key: &str) -> Option<MetadataValue> {
        match key {
            "stream_type" => Some(MetadataValue::Str(self.stream_type.clone())),
            "mode" => Some(MetadataValue::Str(self.mode.clone())),
            "seekable" => Some(MetadataValue::Bool(self.seekable)),
            "uri" => self.uri.clone().map(MetadataValue::Str),
            _ => None,
        }
    }
}

/// A filesystem-backed handle opened from an `fopen`-style mode string.
#[derive(Debug)]
pub struct FileHandle {
    file: File,
    mode: String,
    uri: String,
    seekable: bool,
}

impl FileHandle {
    /// Open `path` with an `fopen`-style mode: one of `r`, `r+`, `w`, `w+`,
    /// `a`, `a+`, `x`, `x+`, `c`, `c+`, optionally carrying the `b`/`t`
    /// translation flags (which change nothing here).
    pub fn open(path: impl AsRef<Path>, mode: &str) -> Result<Self, Error> {
        let path = path.as_ref();
        let mut options = OpenOptions::new();
        let base: String = mode.chars().filter(|c| !matches!(c, 'b' | 't')).collect();
        match base.as_str() {
            "r" => {
                options.read(true);
            }
            "r+" => {
                options.read(true).write(true);
            }
            "w" => {
                options.write(true).create(true).truncate(true);
            }
            "w+" => {
                options.read(true).write(true).create(true).truncate(true);
            }
            "a" => {
                options.append(true).create(true);
            }
            "a+" => {
                options.read(true).append(true).create(true);
            }
            "x" => {
                options.write(true).create_new(true);
            }
            "x+" => {
                options.read(true).write(true).create_new(true);
            }
            "c" => {
                options.write(true).create(true);
            }
            "c+" => {
                options.read(true).write(true).create(true);
            }
            _ => {
                return Err(Error::UnsupportedStreamMode {
                    mode: mode.to_owned(),
                })
            }
        }

        let file = options.open(path).map_err(|source| Error::StreamOpen {
            path: path.to_path_buf(),
            source,
        })?;
        // Pipes and other special files opened by path do not seek.
        let seekable = file.metadata().map(|m| m.is_file()).unwrap_or(false);

        Ok(Self {
            file,
            mode: mode.to_owned(),
            uri: path.display().to_string(),
            seekable,
        })
    }
}

impl StreamHandle for FileHandle {
    fn mode(&self) -> &str {
        &self.mode
    }

    fn is_seekable(&self) -> bool {
        self.seekable
    }

    fn metadata(&self) -> StreamMetadata {
        StreamMetadata {
            stream_type: String::from("file"),
            mode: self.mode.clone(),
            seekable: self.seekable,
            uri: Some(self.uri.clone()),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.file.write(data)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }

    fn position(&mut self) -> io::Result<u64> {
        self.file.stream_position()
    }

    fn size(&mut self) -> io::Result<u64> {
        self.file.metadata().map(|m| m.len())
    }
}

/// An in-memory handle over an owned byte buffer. Always seekable.
#[derive(Debug)]
pub struct MemoryHandle {
    cursor: Cursor<Vec<u8>>,
    mode: &'static str,
}

impl MemoryHandle {
    /// A readable and writable buffer holding `data`.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            cursor: Cursor::new(data.into()),
            mode: "w+",
        }
    }

    /// A read-only buffer holding `data`.
    pub fn read_only(data: impl Into<Vec<u8>>) -> Self {
        Self {
            cursor: Cursor::new(data.into()),
            mode: "r",
        }
    }
}

impl StreamHandle for MemoryHandle {
    fn mode(&self) -> &str {
        self.mode
    }

    fn is_seekable(&self) -> bool {
        true
    }

    fn metadata(&self) -> StreamMetadata {
        StreamMetadata {
            stream_type: String::from("memory"),
            mode: self.mode.to_owned(),
            seekable: true,
            uri: None,
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.cursor.write(data)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }

    fn position(&mut self) -> io::Result<u64> {
        self.cursor.stream_position()
    }

    fn size(&mut self) -> io::Result<u64> {
        Ok(self.cursor.get_ref().len() as u64)
    }
}
