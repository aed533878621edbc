//! The request surface a transport drives.
//!
//! A [`Session`] serves one request at a time. Each call takes the address as
//! the transport received it, finds the repository behind it, resolves the
//! path and answers through a [`Reply`]. `Ok(())` completes the response.

use std::fmt;

use crate::archive::{Archive, Backend};
use crate::config::SessionConfig;
use crate::entry::encode;
use crate::error::{Error, Result};
use crate::locator::RepositorySlot;
use crate::metadata::RequestMetadata;
use crate::node::{Node, NodeId, NodeKind};
use crate::owner::{NameLookup, OwnerCache, SystemNames};
use crate::path::display_components;
use crate::reply::Reply;
use crate::resolve::{resolve, ResolveError};
use crate::stream::{ReadOutcome, StreamReader};

/// Identifies the file opened by one successful [`Session::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(u64);

impl HandleId {
    #[inline(always)]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    ReadWrite,
}

impl OpenMode {
    #[inline(always)]
    pub fn writes(self) -> bool {
        !matches!(self, OpenMode::Read)
    }
}

#[derive(Debug)]
struct OpenFile {
    handle: HandleId,
    /// Repository generation the file was opened under.
    generation: u64,
    path: String,
    reader: StreamReader,
}

pub struct Session<B: Backend, L = SystemNames> {
    backend: B,
    config: SessionConfig,
    repositories: RepositorySlot<B::Archive>,
    owners: OwnerCache<L>,
    open_file: Option<OpenFile>,
    next_handle: u64,
}

impl<B: Backend> Session<B, SystemNames> {
    pub fn new(backend: B) -> Session<B, SystemNames> {
        Session::with_config(backend, SessionConfig::default())
    }

    pub fn with_config(backend: B, config: SessionConfig) -> Session<B, SystemNames> {
        Session::with_lookup(backend, config, SystemNames)
    }
}

impl<B: Backend, L: NameLookup> Session<B, L> {
    pub fn with_lookup(backend: B, config: SessionConfig, lookup: L) -> Session<B, L> {
        Session {
            backend,
            config,
            repositories: RepositorySlot::new(),
            owners: OwnerCache::new(lookup),
            open_file: None,
            next_handle: 0,
        }
    }

    #[inline(always)]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[inline(always)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Root of the repository currently open, slash-terminated.
    pub fn repository_root(&self) -> Option<&str> {
        self.repositories.current().map(|repo| repo.root())
    }

    /// Stream a whole file, honouring a `resume` offset in `meta`.
    pub fn get<R: Reply + ?Sized>(
        &mut self,
        address: &str,
        meta: &RequestMetadata,
        reply: &mut R,
    ) -> Result<()> {
        tracing::debug!(address, "get");
        let depth = self.config.max_symlink_depth;
        let chunk_size = self.config.chunk_size();

        let (repo, components) = self.repositories.locate(&self.backend, address)?;
        let archive = repo.archive();
        let path = display_components(&components);
        let id = lookup(archive, &components, true, depth)?;
        let node = file_node(archive, id, &path)?;

        let mut reader = archive
            .open_file(id)
            .and_then(|data| StreamReader::open(data, chunk_size))
            .map_err(|source| Error::CannotOpenForReading {
                address: address.to_string(),
                source,
            })?;

        reply.mime_type(&node.mime_type);
        reply.total_size(reader.size());

        let mut processed = 0;
        if let Some(offset) = meta.resume_offset() {
            if offset < reader.size() {
                match reader.seek(offset) {
                    Ok(_) => {
                        tracing::debug!(path = %path, offset, "resuming");
                        reply.can_resume();
                        processed = offset;
                    }
                    Err(e) => {
                        tracing::warn!(path = %path, offset, error = %e, "resume seek failed, reading from start");
                        reader.seek(0).map_err(|source| Error::CannotSeek {
                            path: path.clone(),
                            offset: 0,
                            source,
                        })?;
                    }
                }
            } else {
                tracing::debug!(path = %path, offset, size = reader.size(), "resume offset out of range");
            }
        }

        loop {
            let outcome = reader.read(None).map_err(|source| Error::ReadFailure {
                path: path.clone(),
                source,
            })?;
            match outcome {
                ReadOutcome::Data(chunk) if !chunk.is_empty() => {
                    processed += chunk.len() as u64;
                    reply.data(&chunk);
                    reply.processed_size(processed);
                }
                _ => break,
            }
        }

        reply.data(&[]);
        reply.processed_size(processed);
        Ok(())
    }

    /// Emit one entry per child of the directory at `address`.
    pub fn list_dir<R: Reply + ?Sized>(
        &mut self,
        address: &str,
        meta: &RequestMetadata,
        reply: &mut R,
    ) -> Result<()> {
        let details = meta.details(self.config.default_details);
        let depth = self.config.max_symlink_depth;
        tracing::debug!(address, details, "list_dir");

        let (repo, components) = self.repositories.locate(&self.backend, address)?;
        let path = display_components(&components);
        let dir = lookup(repo.archive(), &components, true, depth)?;
        match repo.archive().node(dir).map(|node| &node.kind) {
            Some(NodeKind::Directory) => {}
            Some(NodeKind::File { .. }) => return Err(Error::IsFile { path }),
            Some(NodeKind::Symlink { .. }) | None => return Err(Error::NotFound { path }),
        }

        repo.archive_mut()
            .reload(dir)
            .map_err(|source| Error::ReadFailure {
                path: path.clone(),
                source,
            })?;

        let archive = repo.archive();
        for child in archive.children(dir) {
            if let Some(entry) = encode(archive, child, details, &mut self.owners, depth) {
                reply.list_entry(&entry);
            }
        }
        Ok(())
    }

    /// Open a file for positioned reads, replacing any file already open.
    pub fn open<R: Reply + ?Sized>(
        &mut self,
        address: &str,
        mode: OpenMode,
        reply: &mut R,
    ) -> Result<HandleId> {
        tracing::debug!(address, ?mode, "open");
        if mode.writes() {
            return Err(Error::CannotOpenForWriting {
                address: address.to_string(),
            });
        }
        let depth = self.config.max_symlink_depth;
        let chunk_size = self.config.chunk_size();

        let (repo, components) = self.repositories.locate(&self.backend, address)?;
        let archive = repo.archive();
        let path = display_components(&components);
        let id = lookup(archive, &components, true, depth)?;
        let mime_type = file_node(archive, id, &path)?.mime_type.clone();

        let reader = archive
            .open_file(id)
            .and_then(|data| StreamReader::open(data, chunk_size))
            .map_err(|source| Error::CannotOpenForReading {
                address: address.to_string(),
                source,
            })?;
        let size = reader.size();

        self.next_handle += 1;
        let handle = HandleId(self.next_handle);
        if let Some(previous) = self.open_file.take() {
            tracing::debug!(handle = %previous.handle, "discarding open file");
        }
        self.open_file = Some(OpenFile {
            handle,
            generation: self.repositories.generation(),
            path,
            reader,
        });

        reply.mime_type(&mime_type);
        reply.total_size(size);
        reply.position(0);
        reply.opened();
        Ok(handle)
    }

    /// Read up to `max` bytes from the open file.
    pub fn read<R: Reply + ?Sized>(&mut self, max: u64, reply: &mut R) -> Result<()> {
        let file = self.current_file()?;
        let mut budget = max;

        while budget > 0 {
            let want = usize::try_from(budget).unwrap_or(usize::MAX);
            let outcome = file.reader.read(Some(want)).map_err(|source| Error::ReadFailure {
                path: file.path.clone(),
                source,
            })?;
            match outcome {
                ReadOutcome::Data(chunk) if !chunk.is_empty() => {
                    budget -= chunk.len() as u64;
                    reply.data(&chunk);
                }
                _ => break,
            }
        }

        reply.data(&[]);
        Ok(())
    }

    pub fn seek<R: Reply + ?Sized>(&mut self, offset: u64, reply: &mut R) -> Result<()> {
        let file = self.current_file()?;
        file.reader.seek(offset).map_err(|source| Error::CannotSeek {
            path: file.path.clone(),
            offset,
            source,
        })?;
        reply.position(offset);
        Ok(())
    }

    /// Describe the node at `address` without following a final symlink.
    pub fn stat<R: Reply + ?Sized>(
        &mut self,
        address: &str,
        meta: &RequestMetadata,
        reply: &mut R,
    ) -> Result<()> {
        let details = meta.details(self.config.default_details);
        let depth = self.config.max_symlink_depth;
        tracing::debug!(address, details, "stat");

        let (repo, components) = self.repositories.locate(&self.backend, address)?;
        let archive = repo.archive();
        let id = lookup(archive, &components, false, depth)?;
        let entry = encode(archive, id, details, &mut self.owners, depth).ok_or_else(|| {
            Error::NotFound {
                path: display_components(&components),
            }
        })?;
        reply.stat_entry(&entry);
        Ok(())
    }

    pub fn mime_type<R: Reply + ?Sized>(&mut self, address: &str, reply: &mut R) -> Result<()> {
        tracing::debug!(address, "mime_type");
        let depth = self.config.max_symlink_depth;

        let (repo, components) = self.repositories.locate(&self.backend, address)?;
        let archive = repo.archive();
        let id = lookup(archive, &components, false, depth)?;
        let node = archive.node(id).ok_or_else(|| Error::NotFound {
            path: display_components(&components),
        })?;
        reply.mime_type(&node.mime_type);
        Ok(())
    }

    pub fn close(&mut self) {
        if let Some(file) = self.open_file.take() {
            tracing::debug!(handle = %file.handle, path = %file.path, "close");
        }
    }

    /// Whether `handle` still names the open file.
    pub fn is_open(&self, handle: HandleId) -> bool {
        self.open_file
            .as_ref()
            .map(|file| file.handle == handle && file.generation == self.repositories.generation())
            .unwrap_or(false)
    }

    fn current_file(&mut self) -> Result<&mut OpenFile> {
        let generation = self.repositories.generation();
        if matches!(&self.open_file, Some(file) if file.generation != generation) {
            tracing::debug!("open file belonged to a replaced repository");
            self.open_file = None;
        }
        self.open_file.as_mut().ok_or(Error::NoOpenHandle)
    }
}

fn lookup<A: Archive + ?Sized>(
    archive: &A,
    components: &[String],
    follow_final: bool,
    max_symlink_depth: usize,
) -> Result<NodeId> {
    resolve(archive, components, follow_final, max_symlink_depth).map_err(|e| {
        let path = display_components(components);
        tracing::debug!(path = %path, error = %e, "resolution failed");
        match e {
            ResolveError::NotFound => Error::NotFound { path },
            ResolveError::TooManySymlinks => Error::TooManySymlinks { path },
        }
    })
}

/// The node `id` if it holds file content.
fn file_node<'a, A: Archive + ?Sized>(archive: &'a A, id: NodeId, path: &str) -> Result<&'a Node> {
    match archive.node(id) {
        Some(node) if matches!(node.kind, NodeKind::File { .. }) => Ok(node),
        Some(node) if node.is_directory() => Err(Error::IsDirectory {
            path: path.to_string(),
        }),
        _ => Err(Error::NotFound {
            path: path.to_string(),
        }),
    }
}
