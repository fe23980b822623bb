//! Uploaded-file handling: descriptor-tree normalization and the
//! single-use file handles it produces.

pub mod file;
pub mod tree;

pub use file::{UploadErrorCode, UploadedFile};
pub use tree::{
    DescriptorEntry, OneOrMany, UploadDescriptor, UploadGroup, UploadNode, UploadedFileTree,
};
