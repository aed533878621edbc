use std::fmt;

pub const S_IFMT: u32 = 0o170_000;
pub const S_IFDIR: u32 = 0o040_000;
pub const S_IFREG: u32 = 0o100_000;
pub const S_IFLNK: u32 = 0o120_000;

/// Permission bits, including setuid, setgid and sticky.
pub const PERMISSION_MASK: u32 = 0o7777;

pub const MIME_DIRECTORY: &str = "inode/directory";
pub const MIME_SYMLINK: &str = "inode/symlink";
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";

/// Key of a node inside the archive that owns it.
///
/// Ids are only meaningful to the archive that handed them out, and only for as
/// long as that archive is open.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(u64);

impl NodeId {
    #[inline(always)]
    pub const fn new(value: u64) -> NodeId {
        NodeId(value)
    }

    #[inline(always)]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File { size: u64 },
    Symlink { target: String },
}

impl NodeKind {
    #[inline(always)]
    pub fn type_bits(&self) -> u32 {
        match self {
            NodeKind::Directory => S_IFDIR,
            NodeKind::File { .. } => S_IFREG,
            NodeKind::Symlink { .. } => S_IFLNK,
        }
    }

    fn default_mime_type(&self) -> &'static str {
        match self {
            NodeKind::Directory => MIME_DIRECTORY,
            NodeKind::File { .. } => MIME_OCTET_STREAM,
            NodeKind::Symlink { .. } => MIME_SYMLINK,
        }
    }
}

/// Attributes supplied when a node is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeMeta {
    pub permissions: u32,
    pub mime_type: Option<String>,
    pub uid: u32,
    pub gid: u32,
    /// Seconds since the Unix epoch.
    pub atime: i64,
    /// Seconds since the Unix epoch.
    pub mtime: i64,
}

impl NodeMeta {
    pub fn new(permissions: u32) -> NodeMeta {
        NodeMeta {
            permissions: permissions & PERMISSION_MASK,
            ..NodeMeta::default()
        }
    }

    pub fn with_owner(mut self, uid: u32, gid: u32) -> NodeMeta {
        self.uid = uid;
        self.gid = gid;
        self
    }

    pub fn with_times(mut self, atime: i64, mtime: i64) -> NodeMeta {
        self.atime = atime;
        self.mtime = mtime;
        self
    }

    pub fn with_mime_type<S: Into<String>>(mut self, mime_type: S) -> NodeMeta {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// One entry of an archive's logical tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    /// Containing directory; `None` only for the archive root. Used to resolve
    /// symlink targets relative to where the link lives.
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    /// File type and permission bits, as in `st_mode`.
    pub mode: u32,
    pub mime_type: String,
    pub uid: u32,
    pub gid: u32,
    pub atime: i64,
    pub mtime: i64,
}

impl Node {
    pub fn new<S: Into<String>>(
        name: S,
        parent: Option<NodeId>,
        kind: NodeKind,
        meta: NodeMeta,
    ) -> Node {
        let mime_type = meta
            .mime_type
            .unwrap_or_else(|| kind.default_mime_type().to_string());

        Node {
            name: name.into(),
            parent,
            mode: kind.type_bits() | (meta.permissions & PERMISSION_MASK),
            kind,
            mime_type,
            uid: meta.uid,
            gid: meta.gid,
            atime: meta.atime,
            mtime: meta.mtime,
        }
    }

    #[inline(always)]
    pub fn file_type(&self) -> u32 {
        self.mode & S_IFMT
    }

    #[inline(always)]
    pub fn permissions(&self) -> u32 {
        self.mode & PERMISSION_MASK
    }

    #[inline(always)]
    pub fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory)
    }

    #[inline(always)]
    pub fn is_symlink(&self) -> bool {
        matches!(self.kind, NodeKind::Symlink { .. })
    }

    /// Total byte length for files, `None` for anything else.
    #[inline(always)]
    pub fn file_size(&self) -> Option<u64> {
        match self.kind {
            NodeKind::File { size } => Some(size),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn symlink_target(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Symlink { target } => Some(target),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_combines_kind_and_permissions() {
        let node = Node::new(
            "report.txt",
            Some(NodeId::new(0)),
            NodeKind::File { size: 12 },
            NodeMeta::new(0o4755),
        );
        assert_eq!(node.mode, 0o104_755);
        assert_eq!(node.file_type(), S_IFREG);
        assert_eq!(node.permissions(), 0o4755);
        assert_eq!(node.file_size(), Some(12));
        assert_eq!(node.mime_type, MIME_OCTET_STREAM);
    }

    #[test]
    fn stray_type_bits_in_permissions_are_dropped() {
        let node = Node::new(
            "docs",
            None,
            NodeKind::Directory,
            NodeMeta {
                permissions: S_IFREG | 0o755,
                ..NodeMeta::default()
            },
        );
        assert_eq!(node.file_type(), S_IFDIR);
        assert_eq!(node.mime_type, MIME_DIRECTORY);
    }

    #[test]
    fn symlink_target() {
        let node = Node::new(
            "latest",
            Some(NodeId::new(1)),
            NodeKind::Symlink {
                target: "2021-03-04-101112".into(),
            },
            NodeMeta::new(0o777).with_mime_type("inode/symlink"),
        );
        assert!(node.is_symlink());
        assert_eq!(node.symlink_target(), Some("2021-03-04-101112"));
        assert_eq!(node.file_size(), None);
    }
}
