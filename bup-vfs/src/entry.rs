use serde::Serialize;

use crate::archive::Archive;
use crate::node::{Node, NodeId};
use crate::owner::{NameLookup, OwnerCache};
use crate::resolve::resolve_link;

/// Flat metadata record describing one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub name: String,
    /// `S_IFMT` bits of the mode.
    pub file_type: u32,
    /// Permission bits of the mode.
    pub access: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_dest: Option<String>,
    #[serde(flatten)]
    pub details: Option<EntryDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryDetails {
    /// Byte length for files, 0 for everything else.
    pub size: u64,
    pub mime_type: String,
    pub access_time: i64,
    pub modification_time: i64,
    pub user: String,
    pub group: String,
}

/// Encode the node `id` at the given detail level.
///
/// - Level 0: name, type, permissions and link destination.
/// - Level 1: adds size, MIME type, times, owner and group.
/// - Level 2 and above: for a symlink whose target resolves, every field but
///   the name and link destination describes the target instead of the link.
///
/// Returns `None` when `id` is not a node of `archive`.
pub fn encode<A, L>(
    archive: &A,
    id: NodeId,
    details: u32,
    owners: &mut OwnerCache<L>,
    max_symlink_depth: usize,
) -> Option<Entry>
where
    A: Archive + ?Sized,
    L: NameLookup,
{
    let node = archive.node(id)?;
    let link_dest = node.symlink_target().map(str::to_string);

    let described: &Node = match (&link_dest, details > 1) {
        (Some(_), true) => resolve_link(archive, id, max_symlink_depth)
            .ok()
            .and_then(|target| archive.node(target))
            .unwrap_or(node),
        _ => node,
    };

    let details = (details > 0).then(|| EntryDetails {
        size: described.file_size().unwrap_or(0),
        mime_type: described.mime_type.clone(),
        access_time: described.atime,
        modification_time: described.mtime,
        user: owners.user(described.uid),
        group: owners.group(described.gid),
    });

    Some(Entry {
        name: node.name.clone(),
        file_type: described.file_type(),
        access: described.permissions(),
        link_dest,
        details,
    })
}
