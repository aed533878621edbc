//! The backing-store capability the access layer consumes.
//!
//! Decoding a repository's object format and chunk trees happens behind these
//! traits. The rest of the crate only ever walks [`Node`]s by [`NodeId`] and
//! streams file bytes through [`FileData`].

use std::path::{Path, PathBuf};

use crate::node::{Node, NodeId};

pub mod memory;

pub use self::memory::{MemoryArchive, MemoryBackend};

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("Directory is not a repository. Path: '{}'", .0.display())]
    NotAnArchive(PathBuf),

    #[error("Repository could not be read. Path: '{}'", .1.display())]
    Corrupt(#[source] std::io::Error, PathBuf),
}

/// The logical tree of one open repository.
pub trait Archive {
    fn root(&self) -> NodeId;

    fn node(&self, id: NodeId) -> Option<&Node>;

    /// Child of `dir` with exactly this name. `None` when `dir` is not a directory.
    fn lookup(&self, dir: NodeId, name: &str) -> Option<NodeId>;

    /// Children of `dir` in insertion order. Empty when `dir` is not a directory.
    fn children(&self, dir: NodeId) -> Vec<NodeId>;

    /// Re-synchronise the children of `dir` with the store, which may have
    /// grown since the archive was opened.
    fn reload(&mut self, _dir: NodeId) -> std::io::Result<()> {
        Ok(())
    }

    /// Open the content of a file node, positioned at offset 0.
    fn open_file(&self, file: NodeId) -> std::io::Result<Box<dyn FileData>>;
}

/// Positioned access to the bytes of one file.
///
/// Storage may be chunked: a `read` is allowed to return fewer bytes than
/// asked for, but only returns an empty buffer at end of data. Callers never
/// ask for zero bytes; a store may reject such a read with an error.
pub trait FileData {
    fn size(&self) -> u64;

    fn seek(&mut self, offset: u64) -> std::io::Result<()>;

    fn read(&mut self, max: usize) -> std::io::Result<Vec<u8>>;
}

/// Opens repositories found on disk.
pub trait Backend {
    type Archive: Archive;

    /// Whether `dir` looks like the root of a repository.
    fn is_archive_root(&self, dir: &Path) -> bool {
        has_archive_markers(dir)
    }

    fn open(&self, root: &Path) -> Result<Self::Archive, OpenError>;
}

/// A repository root holds `objects` and `refs`, either directly (bare) or
/// under `.git`.
pub fn has_archive_markers(dir: &Path) -> bool {
    let bare = dir.join("objects").exists() && dir.join("refs").exists();
    bare || {
        let git = dir.join(".git");
        git.join("objects").exists() && git.join("refs").exists()
    }
}
