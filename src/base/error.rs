use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide error type.
///
/// Variants are grouped by concern: validation failures are raised before
/// any state is mutated and are fully recoverable; stream errors surface a
/// failed I/O primitive or a missing capability; upload errors are terminal
/// for the operation but never flip the file into the moved state.
#[derive(Debug, Error)]
pub enum Error {
    // Validation errors
    #[error("invalid HTTP protocol version `{version}`: must be one of 1.0, 1.1, 2.0")]
    InvalidProtocolVersion { version: String },
    #[error("unsupported stream mode `{mode}`")]
    UnsupportedStreamMode { mode: String },
    #[error("upload target path `{target}` is not writable")]
    UploadTargetNotWritable { target: String },
    #[error("invalid URI `{input}`")]
    InvalidUri {
        input: String,
        #[source]
        source: url::ParseError,
    },

    // Header errors
    #[error("header `{key}` does not hold a valid RFC 2822 date: `{value}`")]
    MalformedDate {
        key: String,
        value: String,
        #[source]
        source: time::error::Parse,
    },

    // Stream errors
    #[error("could not open `{}`", path.display())]
    StreamOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not get the position of the pointer in stream")]
    StreamTell(#[source] Option<io::Error>),
    #[error("could not seek in stream")]
    StreamSeek(#[source] Option<io::Error>),
    #[error("could not rewind stream")]
    StreamRewind(#[source] Option<io::Error>),
    #[error("could not read from stream")]
    StreamRead(#[source] Option<io::Error>),
    #[error("could not write to stream")]
    StreamWrite(#[source] Option<io::Error>),
    #[error("could not get contents of stream")]
    StreamContents(#[source] Option<io::Error>),

    // Upload errors
    #[error("uploaded file `{name}` has already been moved")]
    UploadAlreadyMoved { name: String },
    #[error("`{}` is not a valid uploaded file", path.display())]
    InvalidUploadSource { path: PathBuf },
    #[error("error moving uploaded file `{name}` to `{target}`")]
    UploadMoveFailed {
        name: String,
        target: String,
        #[source]
        source: io::Error,
    },
    #[error("error removing uploaded file `{name}`")]
    UploadRemoveFailed {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// True for errors the caller can recover from by fixing the argument
    /// and retrying, without having lost any state.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidProtocolVersion { .. }
                | Error::UnsupportedStreamMode { .. }
                | Error::UploadTargetNotWritable { .. }
                | Error::InvalidUri { .. }
        )
    }
}
