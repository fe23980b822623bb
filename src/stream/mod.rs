//! Byte-stream abstraction over one already-open handle.
//!
//! Capability flags (readable, writable, seekable) are classified from the
//! handle's open-mode string and cached until the handle changes, so
//! repeated checks cost nothing. Size and metadata are cached the same way,
//! with writes invalidating the cached size.

pub mod handle;

use std::cell::RefCell;
use std::io::SeekFrom;
use std::rc::Rc;

use bytes::Bytes;

use crate::base::error::Error;

pub use handle::{FileHandle, MemoryHandle, MetadataValue, StreamHandle, StreamMetadata};

/// A stream shared by reference within one thread. Message bodies are
/// handed around this way; everything here is strictly single-threaded.
pub type SharedStream = Rc<RefCell<ByteStream>>;

/// Mode prefixes that open a handle for reading.
const READABLE_MODES: [&str; 6] = ["r", "r+", "w+", "a+", "x+", "c+"];

/// Mode prefixes that open a handle for writing.
const WRITABLE_MODES: [&str; 9] = ["r+", "w", "w+", "a", "a+", "x", "x+", "c", "c+"];

/// A stream over exactly one underlying handle.
///
/// The stream owns its handle; attaching a new one hands the previous one
/// back to the caller without closing it. Two streams may legally wrap
/// handles over the same underlying source; nothing here deduplicates.
#[derive(Default)]
pub struct ByteStream {
    handle: Option<Box<dyn StreamHandle>>,
    readable: Option<bool>,
    writable: Option<bool>,
    seekable: Option<bool>,
    size: Option<u64>,
    metadata: Option<StreamMetadata>,
    eof: bool,
}

impl ByteStream {
    /// Wrap an already-open handle.
    pub fn new(handle: Box<dyn StreamHandle>) -> Self {
        Self {
            handle: Some(handle),
            ..Self::default()
        }
    }

    /// A readable, writable, seekable stream over an in-memory buffer.
    pub fn from_memory(data: impl Into<Vec<u8>>) -> Self {
        Self::new(Box::new(MemoryHandle::new(data)))
    }

    /// Wrap this stream for shared, single-threaded use.
    pub fn into_shared(self) -> SharedStream {
        Rc::new(RefCell::new(self))
    }

    /// Is a handle currently attached?
    pub fn is_attached(&self) -> bool {
        self.handle.is_some()
    }

    /// Attach a new handle, returning the previous one un-closed.
    ///
    /// All cached flags and metadata are dropped; they will be recomputed
    /// from the new handle on demand.
    pub fn attach(&mut self, handle: Box<dyn StreamHandle>) -> Option<Box<dyn StreamHandle>> {
        tracing::trace!(mode = handle.mode(), "attaching stream handle");
        let old = self.handle.replace(handle);
        self.clear_caches();
        old
    }

    /// Release ownership of the handle to the caller and clear all caches.
    pub fn detach(&mut self) -> Option<Box<dyn StreamHandle>> {
        tracing::trace!("detaching stream handle");
        let old = self.handle.take();
        self.clear_caches();
        old
    }

    /// Drop the handle, closing it, and clear all caches.
    pub fn close(&mut self) {
        self.handle = None;
        self.clear_caches();
    }

    fn clear_caches(&mut self) {
        self.readable = None;
        self.writable = None;
        self.seekable = None;
        self.size = None;
        self.metadata = None;
        self.eof = false;
    }

    /// Whether the handle's mode opens it for reading. `false` when
    /// detached. Computed once and cached until the handle changes.
    pub fn is_readable(&mut self) -> bool {
        if let Some(flag) = self.readable {
            return flag;
        }
        let flag = self
            .handle
            .as_ref()
            .is_some_and(|h| READABLE_MODES.iter().any(|m| h.mode().starts_with(m)));
        self.readable = Some(flag);
        flag
    }

    /// Whether the handle's mode opens it for writing. `false` when
    /// detached. Computed once and cached until the handle changes.
    pub fn is_writable(&mut self) -> bool {
        if let Some(flag) = self.writable {
            return flag;
        }
        let flag = self
            .handle
            .as_ref()
            .is_some_and(|h| WRITABLE_MODES.iter().any(|m| h.mode().starts_with(m)));
        self.writable = Some(flag);
        flag
    }

    /// Whether the handle supports seeking. `false` when detached.
    pub fn is_seekable(&mut self) -> bool {
        if let Some(flag) = self.seekable {
            return flag;
        }
        let flag = self.handle.as_ref().is_some_and(|h| h.is_seekable());
        self.seekable = Some(flag);
        flag
    }

    /// Query the handle's full metadata, refreshing the cached snapshot.
    pub fn metadata(&mut self) -> Option<StreamMetadata> {
        let meta = self.handle.as_ref().map(|h| h.metadata());
        self.metadata = meta.clone();
        meta
    }

    /// Look up one metadata field. Answers from the cached snapshot when
    /// one exists; only queries the handle when nothing is cached yet.
    pub fn metadata_value(&mut self, key: &str) -> Option<MetadataValue> {
        if let Some(meta) = &self.metadata {
            return meta.get(key);
        }
        self.metadata().and_then(|meta| meta.get(key))
    }

    /// Total size in bytes, when the handle can report one. Cached until a
    /// write or a handle change invalidates it.
    pub fn size(&mut self) -> Option<u64> {
        if self.size.is_some() {
            return self.size;
        }
        self.size = self.handle.as_mut().and_then(|h| h.size().ok());
        self.size
    }

    /// Current pointer offset.
    pub fn tell(&mut self) -> Result<u64, Error> {
        let handle = self.handle.as_mut().ok_or(Error::StreamTell(None))?;
        handle.position().map_err(|e| Error::StreamTell(Some(e)))
    }

    /// Has a read consumed the stream to its end? Detached streams report
    /// `true`.
    pub fn eof(&self) -> bool {
        if self.handle.is_none() {
            return true;
        }
        self.eof
    }

    /// Move the pointer. Requires the seekable capability.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, Error> {
        if !self.is_seekable() {
            return Err(Error::StreamSeek(None));
        }
        let handle = self.handle.as_mut().ok_or(Error::StreamSeek(None))?;
        let position = handle.seek(pos).map_err(|e| Error::StreamSeek(Some(e)))?;
        self.eof = false;
        Ok(position)
    }

    /// Move the pointer back to the start. Requires the seekable capability.
    pub fn rewind(&mut self) -> Result<(), Error> {
        if !self.is_seekable() {
            return Err(Error::StreamRewind(None));
        }
        let handle = self.handle.as_mut().ok_or(Error::StreamRewind(None))?;
        handle
            .seek(SeekFrom::Start(0))
            .map_err(|e| Error::StreamRewind(Some(e)))?;
        self.eof = false;
        Ok(())
    }

    /// Read up to `max` bytes from the current position. Requires the
    /// readable capability. A read past the end returns empty bytes and
    /// marks the stream exhausted.
    pub fn read(&mut self, max: usize) -> Result<Bytes, Error> {
        if !self.is_readable() {
            return Err(Error::StreamRead(None));
        }
        let handle = self.handle.as_mut().ok_or(Error::StreamRead(None))?;
        let mut buf = vec![0u8; max];
        let n = handle.read(&mut buf).map_err(|e| Error::StreamRead(Some(e)))?;
        buf.truncate(n);
        if max > 0 && n == 0 {
            self.eof = true;
        }
        Ok(Bytes::from(buf))
    }

    /// Read everything from the current position to the end. Requires the
    /// readable capability.
    pub fn get_contents(&mut self) -> Result<Bytes, Error> {
        if !self.is_readable() {
            return Err(Error::StreamContents(None));
        }
        let handle = self.handle.as_mut().ok_or(Error::StreamContents(None))?;
        let mut buf = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            let n = handle
                .read(&mut chunk)
                .map_err(|e| Error::StreamContents(Some(e)))?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        self.eof = true;
        Ok(Bytes::from(buf))
    }

    /// Write `data` at the current position, returning the number of bytes
    /// written. Requires the writable capability; invalidates the cached
    /// size.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, Error> {
        if !self.is_writable() {
            return Err(Error::StreamWrite(None));
        }
        let handle = self.handle.as_mut().ok_or(Error::StreamWrite(None))?;
        let written = handle.write(data).map_err(|e| Error::StreamWrite(Some(e)))?;
        self.size = None;
        Ok(written)
    }

    /// Best-effort full contents as text: rewind, read everything, and fall
    /// back to an empty string on any failure. Reading moves the pointer,
    /// which rules out a `Display` impl.
    pub fn to_string_lossy(&mut self) -> String {
        if self.rewind().is_err() {
            return String::new();
        }
        match self.get_contents() {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => String::new(),
        }
    }
}

impl std::fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteStream")
            .field("attached", &self.handle.is_some())
            .field("readable", &self.readable)
            .field("writable", &self.writable)
            .field("seekable", &self.seekable)
            .field("size", &self.size)
            .field("eof", &self.eof)
            .finish()
    }
}
