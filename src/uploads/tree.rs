//! Normalization of raw upload descriptors into a uniform tree.
//!
//! A multipart decode hands over a shape-ambiguous nested structure: a
//! field node either carries an upload error signal (making it one file,
//! or a parallel-array batch of files) or it is a subtree of more fields.
//! Normalization resolves the ambiguity once, producing a tree whose nodes
//! are explicitly either a file or a group.

use crate::uploads::file::{UploadErrorCode, UploadedFile};

/// A descriptor field that is a scalar for a single file and a parallel
/// array for a multi-file field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Value at `idx`. A scalar only answers for index 0; short parallel
    /// arrays answer `None` past their end.
    fn get(&self, idx: usize) -> Option<&T> {
        match self {
            OneOrMany::One(value) if idx == 0 => Some(value),
            OneOrMany::One(_) => None,
            OneOrMany::Many(values) => values.get(idx),
        }
    }
}

/// A raw descriptor node that carries an error signal: one file, or a
/// batch of parallel arrays zipped by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorEntry {
    pub tmp_name: OneOrMany<String>,
    pub name: Option<OneOrMany<String>>,
    pub media_type: Option<OneOrMany<String>>,
    pub size: Option<OneOrMany<u64>>,
    /// The shape discriminator: scalar means one file, a collection means
    /// one file per index.
    pub error: OneOrMany<u8>,
}

impl Default for DescriptorEntry {
    fn default() -> Self {
        Self {
            tmp_name: OneOrMany::One(String::new()),
            name: None,
            media_type: None,
            size: None,
            error: OneOrMany::One(0),
        }
    }
}

impl DescriptorEntry {
    /// A single-file descriptor with just a source path and error code.
    pub fn single(tmp_name: impl Into<String>, error: u8) -> Self {
        Self {
            tmp_name: OneOrMany::One(tmp_name.into()),
            error: OneOrMany::One(error),
            ..Self::default()
        }
    }

    /// A multi-file descriptor from parallel source-path and error arrays.
    pub fn parallel(tmp_names: Vec<String>, errors: Vec<u8>) -> Self {
        Self {
            tmp_name: OneOrMany::Many(tmp_names),
            error: OneOrMany::Many(errors),
            ..Self::default()
        }
    }
}

/// A raw upload descriptor node, shaped like the multipart decode output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadDescriptor {
    /// A node with an error signal: file data.
    Entry(DescriptorEntry),
    /// A node without one: a subtree of named children.
    Group(Vec<(String, UploadDescriptor)>),
}

/// A normalized tree node: a single file or a keyed group of nodes.
#[derive(Debug)]
pub enum UploadNode {
    File(UploadedFile),
    Group(UploadGroup),
}

impl UploadNode {
    pub fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            UploadNode::File(file) => Some(file),
            UploadNode::Group(_) => None,
        }
    }

    pub fn as_file_mut(&mut self) -> Option<&mut UploadedFile> {
        match self {
            UploadNode::File(file) => Some(file),
            UploadNode::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&UploadGroup> {
        match self {
            UploadNode::File(_) => None,
            UploadNode::Group(group) => Some(group),
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut UploadGroup> {
        match self {
            UploadNode::File(_) => None,
            UploadNode::Group(group) => Some(group),
        }
    }
}

/// An ordered, keyed collection of normalized nodes. Multi-file fields are
/// groups keyed `"0"`, `"1"`, ... in upload order.
#[derive(Debug, Default)]
pub struct UploadGroup {
    entries: Vec<(String, UploadNode)>,
}

impl UploadGroup {
    pub fn get(&self, key: &str) -> Option<&UploadNode> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, node)| node)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut UploadNode> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, node)| node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UploadNode)> {
        self.entries.iter().map(|(k, node)| (k.as_str(), node))
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every file leaf under this group, depth-first in field order.
    pub fn files(&self) -> Vec<&UploadedFile> {
        let mut files = Vec::new();
        for (_, node) in &self.entries {
            match node {
                UploadNode::File(file) => files.push(file),
                UploadNode::Group(group) => files.extend(group.files()),
            }
        }
        files
    }

    /// Mutable access to every file leaf, depth-first in field order.
    pub fn files_mut(&mut self) -> Vec<&mut UploadedFile> {
        let mut files = Vec::new();
        for (_, node) in &mut self.entries {
            match node {
                UploadNode::File(file) => files.push(file),
                UploadNode::Group(group) => files.extend(group.files_mut()),
            }
        }
        files
    }
}

/// The normalized tree of uploaded files for one request.
#[derive(Debug, Default)]
pub struct UploadedFileTree {
    root: UploadGroup,
}

impl UploadedFileTree {
    /// Normalize a raw descriptor tree.
    ///
    /// Every produced file is marked gateway-originated, so moving it
    /// validates the source first.
    pub fn normalize<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, UploadDescriptor)>,
    {
        let entries = fields
            .into_iter()
            .map(|(key, descriptor)| (key.into(), normalize_node(descriptor)))
            .collect();
        Self {
            root: UploadGroup { entries },
        }
    }

    pub fn root(&self) -> &UploadGroup {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut UploadGroup {
        &mut self.root
    }

    pub fn get(&self, field: &str) -> Option<&UploadNode> {
        self.root.get(field)
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut UploadNode> {
        self.root.get_mut(field)
    }

    pub fn files(&self) -> Vec<&UploadedFile> {
        self.root.files()
    }

    pub fn files_mut(&mut self) -> Vec<&mut UploadedFile> {
        self.root.files_mut()
    }

    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

fn normalize_node(descriptor: UploadDescriptor) -> UploadNode {
    match descriptor {
        UploadDescriptor::Group(children) => {
            let entries = children
                .into_iter()
                .map(|(key, child)| (key, normalize_node(child)))
                .collect();
            UploadNode::Group(UploadGroup { entries })
        }
        UploadDescriptor::Entry(entry) => normalize_entry(entry),
    }
}

fn normalize_entry(entry: DescriptorEntry) -> UploadNode {
    match &entry.error {
        OneOrMany::One(code) => UploadNode::File(leaf_at(&entry, 0, *code)),
        OneOrMany::Many(codes) => {
            let entries = codes
                .iter()
                .enumerate()
                .map(|(idx, &code)| {
                    (idx.to_string(), UploadNode::File(leaf_at(&entry, idx, code)))
                })
                .collect();
            UploadNode::Group(UploadGroup { entries })
        }
    }
}

// Zip one index out of the parallel arrays; anything missing degrades to
// empty/None instead of failing the whole tree.
fn leaf_at(entry: &DescriptorEntry, idx: usize, code: u8) -> UploadedFile {
    let tmp_name = entry.tmp_name.get(idx).cloned().unwrap_or_default();
    let name = entry.name.as_ref().and_then(|v| v.get(idx)).cloned();
    let media_type = entry.media_type.as_ref().and_then(|v| v.get(idx)).cloned();
    let size = entry.size.as_ref().and_then(|v| v.get(idx)).copied();
    UploadedFile::new_sapi(tmp_name, name, media_type, size, UploadErrorCode::from(code))
}
