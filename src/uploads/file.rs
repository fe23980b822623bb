//! Single-use uploaded-file handles.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, warn};

use crate::base::error::Error;
use crate::stream::{ByteStream, FileHandle, SharedStream};

/// Status code attached to an uploaded file by the gateway.
///
/// Code 5 has never been assigned; it decodes as `Unknown(5)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadErrorCode {
    /// The upload completed.
    Ok,
    /// Larger than the server-wide size limit.
    ExceedsMaxSize,
    /// Larger than the limit the form declared.
    ExceedsFormMaxSize,
    /// Only partially transferred.
    Partial,
    /// No file was submitted for the field.
    NoFile,
    /// The gateway had no temporary directory to store it in.
    NoTmpDir,
    /// The gateway could not write the temporary file.
    WriteFailed,
    /// A gateway extension rejected the upload.
    BlockedByExtension,
    /// A code outside the assigned range.
    Unknown(u8),
}

impl UploadErrorCode {
    pub fn code(self) -> u8 {
        match self {
            UploadErrorCode::Ok => 0,
            UploadErrorCode::ExceedsMaxSize => 1,
            UploadErrorCode::ExceedsFormMaxSize => 2,
            UploadErrorCode::Partial => 3,
            UploadErrorCode::NoFile => 4,
            UploadErrorCode::NoTmpDir => 6,
            UploadErrorCode::WriteFailed => 7,
            UploadErrorCode::BlockedByExtension => 8,
            UploadErrorCode::Unknown(code) => code,
        }
    }

    pub fn is_ok(self) -> bool {
        self == UploadErrorCode::Ok
    }
}

impl From<u8> for UploadErrorCode {
    fn from(code: u8) -> Self {
        match code {
            0 => UploadErrorCode::Ok,
            1 => UploadErrorCode::ExceedsMaxSize,
            2 => UploadErrorCode::ExceedsFormMaxSize,
            3 => UploadErrorCode::Partial,
            4 => UploadErrorCode::NoFile,
            6 => UploadErrorCode::NoTmpDir,
            7 => UploadErrorCode::WriteFailed,
            8 => UploadErrorCode::BlockedByExtension,
            other => UploadErrorCode::Unknown(other),
        }
    }
}

/// One uploaded file: a temporary source path plus the client-supplied
/// metadata that came with it.
///
/// The handle is single-use. It starts pending; a successful
/// [`move_to`](Self::move_to) transitions it to moved, permanently. A
/// failed move leaves it pending, but the source may already be gone, so
/// retries should pick a fresh target rather than assume the source
/// survived.
#[derive(Debug)]
pub struct UploadedFile {
    path: PathBuf,
    name: Option<String>,
    media_type: Option<String>,
    size: Option<u64>,
    error: UploadErrorCode,
    /// Source path came from the server's native upload mechanism.
    sapi: bool,
    stream: Option<SharedStream>,
    moved: bool,
}

impl UploadedFile {
    /// A file whose source path is plain filesystem data.
    pub fn new(
        path: impl Into<PathBuf>,
        name: Option<String>,
        media_type: Option<String>,
        size: Option<u64>,
        error: UploadErrorCode,
    ) -> Self {
        Self {
            path: path.into(),
            name,
            media_type,
            size,
            error,
            sapi: false,
            stream: None,
            moved: false,
        }
    }

    /// A file whose source path was produced by the server's upload
    /// mechanism. Moving it first validates that the source really is an
    /// uploaded file.
    pub fn new_sapi(
        path: impl Into<PathBuf>,
        name: Option<String>,
        media_type: Option<String>,
        size: Option<u64>,
        error: UploadErrorCode,
    ) -> Self {
        Self {
            sapi: true,
            ..Self::new(path, name, media_type, size, error)
        }
    }

    pub fn error(&self) -> UploadErrorCode {
        self.error
    }

    pub fn client_filename(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn client_media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    /// Size in bytes as the client declared it, not as measured.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// The temporary source path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_moved(&self) -> bool {
        self.moved
    }

    /// A read-only stream over the source file, opened lazily and cached
    /// for the handle's pending lifetime. Fails once the file has been
    /// moved.
    pub fn stream(&mut self) -> Result<SharedStream, Error> {
        if self.moved {
            return Err(Error::UploadAlreadyMoved {
                name: self.display_name(),
            });
        }
        match &self.stream {
            Some(stream) => Ok(Rc::clone(stream)),
            None => {
                let handle = FileHandle::open(&self.path, "r")?;
                let stream = ByteStream::new(Box::new(handle)).into_shared();
                self.stream = Some(Rc::clone(&stream));
                Ok(stream)
            }
        }
    }

    /// Move the source file to `target` and mark the handle moved.
    ///
    /// Exactly one strategy applies: a target with a `://` scheme marker is
    /// written by copy-then-delete; a gateway-supplied source is validated
    /// and then renamed, falling back to copy-then-delete when the rename
    /// cannot cross to the target; anything else is a plain rename. Any
    /// failure leaves the handle pending.
    pub fn move_to(&mut self, target: impl AsRef<Path>) -> Result<(), Error> {
        let target = target.as_ref();
        if self.moved {
            return Err(Error::UploadAlreadyMoved {
                name: self.display_name(),
            });
        }

        let target_text = target.display().to_string();
        let target_is_stream = target_text.find("://").is_some_and(|pos| pos > 0);

        // Filesystem targets fail fast on an unwritable directory; a
        // stream-scheme location has no directory to check, its copy step
        // reports the failure instead.
        if !target_is_stream && !parent_is_writable(target) {
            return Err(Error::UploadTargetNotWritable {
                target: target_text,
            });
        }

        if target_is_stream {
            debug!(target = %target_text, "moving upload by copy to a stream target");
            self.copy_then_remove(target)?;
        } else if self.sapi {
            if !fs::metadata(&self.path).map(|m| m.is_file()).unwrap_or(false) {
                return Err(Error::InvalidUploadSource {
                    path: self.path.clone(),
                });
            }
            debug!(target = %target_text, "moving gateway upload");
            if let Err(rename_error) = fs::rename(&self.path, target) {
                warn!(
                    error = %rename_error,
                    "rename failed, falling back to copy and delete"
                );
                self.copy_then_remove(target)?;
            }
        } else {
            debug!(target = %target_text, "moving upload by rename");
            fs::rename(&self.path, target).map_err(|source| Error::UploadMoveFailed {
                name: self.display_name(),
                target: target_text,
                source,
            })?;
        }

        self.moved = true;
        self.stream = None;
        Ok(())
    }

    fn copy_then_remove(&self, target: &Path) -> Result<(), Error> {
        fs::copy(&self.path, target).map_err(|source| Error::UploadMoveFailed {
            name: self.display_name(),
            target: target.display().to_string(),
            source,
        })?;
        fs::remove_file(&self.path).map_err(|source| Error::UploadRemoveFailed {
            name: self.display_name(),
            source,
        })?;
        Ok(())
    }

    fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.path.display().to_string(),
        }
    }
}

fn parent_is_writable(target: &Path) -> bool {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::metadata(parent).is_ok_and(|m| m.is_dir() && !m.permissions().readonly())
}
