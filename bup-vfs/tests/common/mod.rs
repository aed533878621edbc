#![allow(dead_code)]

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use bup_vfs::{
    Archive, Backend, FileData, MemoryArchive, MemoryBackend, NameLookup, Node, NodeId, NodeMeta,
    OpenError, Session, SessionConfig,
};
use tempfile::TempDir;

pub const REPORT: &[u8] = b"quarterly numbers";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// Fixed owner names so tests do not depend on the host's passwd file.
pub struct Names;

impl NameLookup for Names {
    fn user_name(&self, uid: u32) -> Option<String> {
        (uid == 1000).then(|| "alice".to_string())
    }

    fn group_name(&self, gid: u32) -> Option<String> {
        (gid == 100).then(|| "users".to_string())
    }
}

/// Create repository markers in `dir`, bare or under `.git`.
pub fn make_markers(dir: &Path, git: bool) {
    let base = if git { dir.join(".git") } else { dir.to_path_buf() };
    fs::create_dir_all(base.join("objects")).unwrap();
    fs::create_dir_all(base.join("refs")).unwrap();
}

/// The tree used by most tests:
///
/// ```text
/// docs/report.txt        "quarterly numbers" in two chunks
/// docs/latest  -> report.txt
/// docs/gone    -> missing.txt
/// docs/empty.bin         0 bytes
/// docs/empty-dir/
/// big.bin                70 bytes in ten chunks
/// loop-a -> loop-b, loop-b -> loop-a
/// ```
pub fn sample_archive() -> MemoryArchive {
    let owned = |perms| NodeMeta::new(perms).with_owner(1000, 100);
    let mut archive = MemoryArchive::new(owned(0o755));
    let root = archive.root_id();

    let docs = archive.add_directory(root, "docs", owned(0o755)).unwrap();
    archive
        .add_file(
            docs,
            "report.txt",
            owned(0o644)
                .with_times(1_600_000_000, 1_600_000_100)
                .with_mime_type("text/plain"),
            vec![&REPORT[..9], &REPORT[9..]],
        )
        .unwrap();
    archive
        .add_symlink(docs, "latest", NodeMeta::new(0o777), "report.txt")
        .unwrap();
    archive
        .add_symlink(docs, "gone", NodeMeta::new(0o777), "missing.txt")
        .unwrap();
    archive
        .add_file(docs, "empty.bin", owned(0o600), Vec::<Vec<u8>>::new())
        .unwrap();
    archive.add_directory(docs, "empty-dir", owned(0o700)).unwrap();

    archive
        .add_file(root, "big.bin", owned(0o644), big_chunks())
        .unwrap();
    archive
        .add_symlink(root, "loop-a", NodeMeta::new(0o777), "loop-b")
        .unwrap();
    archive
        .add_symlink(root, "loop-b", NodeMeta::new(0o777), "loop-a")
        .unwrap();

    archive
}

pub fn big_chunks() -> Vec<Vec<u8>> {
    (0u8..10).map(|i| vec![b'a' + i; 7]).collect()
}

pub fn big_content() -> Vec<u8> {
    big_chunks().concat()
}

/// A repository rooted at `<tmp>/home/u/backups/b1` with `.git` markers.
pub struct Fixture {
    pub tmp: TempDir,
    pub root: PathBuf,
    pub backend: MemoryBackend,
}

impl Fixture {
    pub fn new() -> Fixture {
        init_tracing();
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("home/u/backups/b1");
        make_markers(&root, true);

        let mut backend = MemoryBackend::new();
        backend.insert(&root, sample_archive());
        Fixture { tmp, root, backend }
    }

    /// Absolute address of `rel` inside the repository.
    pub fn addr(&self, rel: &str) -> String {
        format!("{}/{}", self.root.display(), rel)
    }

    pub fn session(&self) -> Session<MemoryBackend, Names> {
        self.session_with(SessionConfig::new().with_read_chunk_size(4))
    }

    pub fn session_with(&self, config: SessionConfig) -> Session<MemoryBackend, Names> {
        Session::with_lookup(self.backend.clone(), config, Names)
    }
}

/// How a [`FaultyArchive`] misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Clean,
    /// Seeks anywhere but offset 0 fail.
    SeekAway,
    /// Every seek fails.
    Seek,
    /// Reads fail once this many chunks have been returned.
    ReadAfter(usize),
}

#[derive(Debug, Default)]
pub struct Counters {
    pub opens: Cell<usize>,
    pub drops: Cell<usize>,
    pub reloads: Cell<usize>,
}

/// Wraps a [`MemoryArchive`] to inject store failures and count calls.
pub struct FaultyArchive {
    inner: MemoryArchive,
    fault: Fault,
    counters: Rc<Counters>,
}

impl Drop for FaultyArchive {
    fn drop(&mut self) {
        self.counters.drops.set(self.counters.drops.get() + 1);
    }
}

impl Archive for FaultyArchive {
    fn root(&self) -> NodeId {
        self.inner.root()
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.inner.node(id)
    }

    fn lookup(&self, dir: NodeId, name: &str) -> Option<NodeId> {
        self.inner.lookup(dir, name)
    }

    fn children(&self, dir: NodeId) -> Vec<NodeId> {
        self.inner.children(dir)
    }

    fn reload(&mut self, dir: NodeId) -> std::io::Result<()> {
        self.counters.reloads.set(self.counters.reloads.get() + 1);
        self.inner.reload(dir)
    }

    fn open_file(&self, file: NodeId) -> std::io::Result<Box<dyn FileData>> {
        let inner = self.inner.open_file(file)?;
        Ok(Box::new(FaultyData {
            inner,
            fault: self.fault,
            reads: 0,
        }))
    }
}

struct FaultyData {
    inner: Box<dyn FileData>,
    fault: Fault,
    reads: usize,
}

impl FileData for FaultyData {
    fn size(&self) -> u64 {
        self.inner.size()
    }

    fn seek(&mut self, offset: u64) -> std::io::Result<()> {
        match self.fault {
            Fault::Seek => Err(refused("seek")),
            Fault::SeekAway if offset != 0 => Err(refused("seek")),
            _ => self.inner.seek(offset),
        }
    }

    fn read(&mut self, max: usize) -> std::io::Result<Vec<u8>> {
        if let Fault::ReadAfter(n) = self.fault {
            if self.reads >= n {
                return Err(refused("read"));
            }
        }
        self.reads += 1;
        self.inner.read(max)
    }
}

fn refused(what: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("{} refused", what))
}

pub struct FaultyBackend {
    pub inner: MemoryBackend,
    pub fault: Fault,
    pub counters: Rc<Counters>,
}

impl FaultyBackend {
    pub fn new(inner: MemoryBackend, fault: Fault) -> FaultyBackend {
        FaultyBackend {
            inner,
            fault,
            counters: Rc::new(Counters::default()),
        }
    }
}

impl Backend for FaultyBackend {
    type Archive = FaultyArchive;

    fn open(&self, root: &Path) -> Result<FaultyArchive, OpenError> {
        let inner = self.inner.open(root)?;
        self.counters.opens.set(self.counters.opens.get() + 1);
        Ok(FaultyArchive {
            inner,
            fault: self.fault,
            counters: Rc::clone(&self.counters),
        })
    }
}

pub fn faulty_session(fixture: &Fixture, fault: Fault) -> (Session<FaultyBackend, Names>, Rc<Counters>) {
    let backend = FaultyBackend::new(fixture.backend.clone(), fault);
    let counters = Rc::clone(&backend.counters);
    let session = Session::with_lookup(
        backend,
        SessionConfig::new().with_read_chunk_size(4),
        Names,
    );
    (session, counters)
}
