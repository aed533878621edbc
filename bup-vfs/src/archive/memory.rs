//! An in-process node tree.
//!
//! File content is kept as a list of chunks, the way a hashsplit store keeps
//! large files, and reads never cross a chunk boundary.

use std::collections::HashMap;
use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;

use super::{Archive, Backend, FileData, OpenError};
use crate::node::{Node, NodeId, NodeKind, NodeMeta};

const ROOT: NodeId = NodeId::new(0);

#[derive(Debug, Clone)]
struct Slot {
    node: Node,
    children: IndexMap<String, NodeId>,
    content: Option<Arc<ChunkedContent>>,
}

#[derive(Debug)]
struct ChunkedContent {
    chunks: Vec<Vec<u8>>,
    /// Offset of the first byte of each chunk.
    starts: Vec<u64>,
    size: u64,
}

impl ChunkedContent {
    fn new(chunks: Vec<Vec<u8>>) -> ChunkedContent {
        let chunks: Vec<Vec<u8>> = chunks.into_iter().filter(|c| !c.is_empty()).collect();
        let mut starts = Vec::with_capacity(chunks.len());
        let mut size = 0u64;
        for chunk in chunks.iter() {
            starts.push(size);
            size += chunk.len() as u64;
        }

        ChunkedContent {
            chunks,
            starts,
            size,
        }
    }
}

struct ChunkCursor {
    content: Arc<ChunkedContent>,
    position: u64,
}

impl FileData for ChunkCursor {
    fn size(&self) -> u64 {
        self.content.size
    }

    fn seek(&mut self, offset: u64) -> std::io::Result<()> {
        if offset > self.content.size {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "seek offset is past the end of the file",
            ));
        }
        self.position = offset;
        Ok(())
    }

    fn read(&mut self, max: usize) -> std::io::Result<Vec<u8>> {
        if self.position >= self.content.size {
            return Ok(vec![]);
        }
        if max == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "read of zero bytes"));
        }

        let index = self
            .content
            .starts
            .partition_point(|start| *start <= self.position)
            - 1;
        let chunk = &self.content.chunks[index];
        let within = (self.position - self.content.starts[index]) as usize;
        let len = max.min(chunk.len() - within);

        self.position += len as u64;
        Ok(chunk[within..within + len].to_vec())
    }
}

/// A complete archive built in memory.
#[derive(Debug, Clone)]
pub struct MemoryArchive {
    slots: Vec<Slot>,
}

impl MemoryArchive {
    pub fn new(root: NodeMeta) -> MemoryArchive {
        MemoryArchive {
            slots: vec![Slot {
                node: Node::new("/", None, NodeKind::Directory, root),
                children: IndexMap::new(),
                content: None,
            }],
        }
    }

    #[inline(always)]
    pub fn root_id(&self) -> NodeId {
        ROOT
    }

    pub fn add_directory(
        &mut self,
        parent: NodeId,
        name: &str,
        meta: NodeMeta,
    ) -> std::io::Result<NodeId> {
        self.insert(parent, name, NodeKind::Directory, meta, None)
    }

    /// Add a file whose content is the concatenation of `chunks`.
    pub fn add_file<I, C>(
        &mut self,
        parent: NodeId,
        name: &str,
        meta: NodeMeta,
        chunks: I,
    ) -> std::io::Result<NodeId>
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        let content = ChunkedContent::new(chunks.into_iter().map(Into::into).collect());
        let kind = NodeKind::File { size: content.size };
        self.insert(parent, name, kind, meta, Some(Arc::new(content)))
    }

    pub fn add_symlink(
        &mut self,
        parent: NodeId,
        name: &str,
        meta: NodeMeta,
        target: &str,
    ) -> std::io::Result<NodeId> {
        let kind = NodeKind::Symlink {
            target: target.to_string(),
        };
        self.insert(parent, name, kind, meta, None)
    }

    fn insert(
        &mut self,
        parent: NodeId,
        name: &str,
        kind: NodeKind,
        meta: NodeMeta,
        content: Option<Arc<ChunkedContent>>,
    ) -> std::io::Result<NodeId> {
        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("invalid node name '{}'", name),
            ));
        }

        let id = NodeId::new(self.slots.len() as u64);
        let parent_slot = self
            .slot_mut(parent)
            .filter(|slot| slot.node.is_directory())
            .ok_or_else(|| Error::new(ErrorKind::InvalidInput, "parent must be a directory"))?;

        if parent_slot.children.contains_key(name) {
            return Err(Error::new(
                ErrorKind::AlreadyExists,
                format!("'{}' already exists", name),
            ));
        }
        parent_slot.children.insert(name.to_string(), id);

        self.slots.push(Slot {
            node: Node::new(name, Some(parent), kind, meta),
            children: IndexMap::new(),
            content,
        });
        Ok(id)
    }

    #[inline(always)]
    fn slot(&self, id: NodeId) -> Option<&Slot> {
        self.slots.get(id.get() as usize)
    }

    #[inline(always)]
    fn slot_mut(&mut self, id: NodeId) -> Option<&mut Slot> {
        self.slots.get_mut(id.get() as usize)
    }
}

impl Archive for MemoryArchive {
    fn root(&self) -> NodeId {
        ROOT
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slot(id).map(|slot| &slot.node)
    }

    fn lookup(&self, dir: NodeId, name: &str) -> Option<NodeId> {
        self.slot(dir)?.children.get(name).copied()
    }

    fn children(&self, dir: NodeId) -> Vec<NodeId> {
        self.slot(dir)
            .map(|slot| slot.children.values().copied().collect())
            .unwrap_or_default()
    }

    fn open_file(&self, file: NodeId) -> std::io::Result<Box<dyn FileData>> {
        let content = self
            .slot(file)
            .and_then(|slot| slot.content.clone())
            .ok_or_else(|| Error::new(ErrorKind::InvalidInput, "node is not a file"))?;

        Ok(Box::new(ChunkCursor {
            content,
            position: 0,
        }))
    }
}

/// Serves [`MemoryArchive`]s registered under their root directory.
///
/// Discovery still inspects the real filesystem for repository markers; only
/// opening is answered from memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    archives: HashMap<PathBuf, MemoryArchive>,
}

impl MemoryBackend {
    pub fn new() -> MemoryBackend {
        MemoryBackend::default()
    }

    pub fn insert<P: Into<PathBuf>>(&mut self, root: P, archive: MemoryArchive) {
        self.archives.insert(root.into(), archive);
    }
}

impl Backend for MemoryBackend {
    type Archive = MemoryArchive;

    fn open(&self, root: &Path) -> Result<MemoryArchive, OpenError> {
        self.archives
            .get(root)
            .cloned()
            .ok_or_else(|| OpenError::NotAnArchive(root.to_path_buf()))
    }
}
