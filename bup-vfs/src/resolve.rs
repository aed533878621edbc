//! Walks path components through an [`Archive`].
//!
//! Symlink targets are resolved relative to the directory holding the link
//! (absolute targets from the repository root), and every link followed draws
//! from a single budget so that cycles fail instead of recursing forever.

use relative_path::{Component, RelativePath};

use crate::archive::Archive;
use crate::node::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("path not found")]
    NotFound,

    #[error("too many levels of symbolic links")]
    TooManySymlinks,
}

/// Resolve `components` from the root of `archive`.
///
/// A symlink met before the last component is always followed. The last
/// component is followed only when `follow_final` is set; if its target does
/// not resolve, the link itself is returned.
pub fn resolve<A, S>(
    archive: &A,
    components: &[S],
    follow_final: bool,
    max_symlink_depth: usize,
) -> Result<NodeId, ResolveError>
where
    A: Archive + ?Sized,
    S: AsRef<str>,
{
    let mut walker = Walker {
        archive,
        remaining: max_symlink_depth,
    };
    let components: Vec<&str> = components.iter().map(|c| c.as_ref()).collect();
    walker.walk(archive.root(), &components, follow_final)
}

/// Resolve the target of the symlink `link`, following the whole chain.
pub fn resolve_link<A>(
    archive: &A,
    link: NodeId,
    max_symlink_depth: usize,
) -> Result<NodeId, ResolveError>
where
    A: Archive + ?Sized,
{
    let mut walker = Walker {
        archive,
        remaining: max_symlink_depth,
    };
    let target = walker.follow(link)?;
    match archive.node(target) {
        Some(node) if !node.is_symlink() => Ok(target),
        _ => Err(ResolveError::NotFound),
    }
}

struct Walker<'a, A: ?Sized> {
    archive: &'a A,
    remaining: usize,
}

impl<'a, A: Archive + ?Sized> Walker<'a, A> {
    fn walk(
        &mut self,
        start: NodeId,
        components: &[&str],
        follow_final: bool,
    ) -> Result<NodeId, ResolveError> {
        let archive = self.archive;
        let mut current = start;

        for (i, name) in components.iter().enumerate() {
            let dir = archive.node(current).ok_or(ResolveError::NotFound)?;
            if !dir.is_directory() {
                return Err(ResolveError::NotFound);
            }

            let next = match *name {
                "" | "." => continue,
                ".." => dir.parent.unwrap_or(current),
                name => archive.lookup(current, name).ok_or(ResolveError::NotFound)?,
            };

            let is_last = i + 1 == components.len();
            current = if !is_last && self.is_symlink(next) {
                self.follow(next)?
            } else {
                next
            };
        }

        if follow_final && self.is_symlink(current) {
            return match self.follow(current) {
                Err(ResolveError::NotFound) => Ok(current),
                other => other,
            };
        }

        Ok(current)
    }

    /// Target of `link`, itself resolved with its final symlink followed.
    fn follow(&mut self, link: NodeId) -> Result<NodeId, ResolveError> {
        if self.remaining == 0 {
            return Err(ResolveError::TooManySymlinks);
        }
        self.remaining -= 1;

        let archive = self.archive;
        let node = archive.node(link).ok_or(ResolveError::NotFound)?;
        let target = match node.symlink_target() {
            Some(target) if !target.is_empty() => target,
            _ => return Err(ResolveError::NotFound),
        };

        let start = if target.starts_with('/') {
            archive.root()
        } else {
            node.parent.unwrap_or_else(|| archive.root())
        };

        let components: Vec<&str> = RelativePath::new(target)
            .components()
            .map(|component| match component {
                Component::CurDir => ".",
                Component::ParentDir => "..",
                Component::Normal(name) => name,
            })
            .collect();

        tracing::trace!(link = %link, to = target, "following symlink");
        let resolved = self.walk(start, &components, true)?;

        // A dangling link at the end of the chain comes back as itself.
        if self.is_symlink(resolved) {
            return Err(ResolveError::NotFound);
        }
        Ok(resolved)
    }

    #[inline(always)]
    fn is_symlink(&self, id: NodeId) -> bool {
        self.archive
            .node(id)
            .map(|node| node.is_symlink())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;
    use crate::node::NodeMeta;

    struct Fixture {
        archive: MemoryArchive,
        docs: NodeId,
        report: NodeId,
        nested: NodeId,
    }

    fn fixture() -> Fixture {
        let mut archive = MemoryArchive::new(NodeMeta::new(0o755));
        let root = archive.root_id();
        let docs = archive.add_directory(root, "docs", NodeMeta::new(0o755)).unwrap();
        let report = archive
            .add_file(docs, "report.txt", NodeMeta::new(0o644), vec![b"report".to_vec()])
            .unwrap();
        let sub = archive.add_directory(docs, "sub", NodeMeta::new(0o755)).unwrap();
        let nested = archive
            .add_file(sub, "deep.txt", NodeMeta::new(0o644), vec![b"deep".to_vec()])
            .unwrap();

        let link = NodeMeta::new(0o777);
        archive.add_symlink(docs, "same-dir", link.clone(), "report.txt").unwrap();
        archive.add_symlink(sub, "up", link.clone(), "../report.txt").unwrap();
        archive.add_symlink(root, "absolute", link.clone(), "/docs/sub/deep.txt").unwrap();
        archive.add_symlink(root, "docs-link", link.clone(), "docs").unwrap();
        archive.add_symlink(root, "chain", link.clone(), "absolute").unwrap();
        archive.add_symlink(root, "dangling", link.clone(), "nowhere").unwrap();
        archive.add_symlink(root, "escape", link.clone(), "../../../docs/report.txt").unwrap();
        archive.add_symlink(root, "loop-a", link.clone(), "loop-b").unwrap();
        archive.add_symlink(root, "loop-b", link.clone(), "loop-a").unwrap();
        archive.add_symlink(root, "empty", link, "").unwrap();

        Fixture {
            archive,
            docs,
            report,
            nested,
        }
    }

    fn get(f: &Fixture, path: &[&str], follow: bool) -> Result<NodeId, ResolveError> {
        resolve(&f.archive, path, follow, 40)
    }

    #[test]
    fn plain_paths() {
        let f = fixture();
        assert_eq!(get(&f, &[], false), Ok(f.archive.root_id()));
        assert_eq!(get(&f, &["docs"], false), Ok(f.docs));
        assert_eq!(get(&f, &["docs", "report.txt"], true), Ok(f.report));
        assert_eq!(get(&f, &["docs", "missing"], true), Err(ResolveError::NotFound));
    }

    #[test]
    fn file_mid_path_is_not_found() {
        let f = fixture();
        assert_eq!(
            get(&f, &["docs", "report.txt", "x"], false),
            Err(ResolveError::NotFound)
        );
    }

    #[test]
    fn final_symlink_follows_only_on_request() {
        let f = fixture();
        let link = get(&f, &["docs", "same-dir"], false).unwrap();
        assert!(f.archive.node(link).unwrap().is_symlink());
        assert_eq!(get(&f, &["docs", "same-dir"], true), Ok(f.report));
    }

    #[test]
    fn relative_targets_use_link_parent() {
        let f = fixture();
        assert_eq!(get(&f, &["docs", "sub", "up"], true), Ok(f.report));
    }

    #[test]
    fn absolute_targets_start_at_root() {
        let f = fixture();
        assert_eq!(get(&f, &["absolute"], true), Ok(f.nested));
        assert_eq!(get(&f, &["chain"], true), Ok(f.nested));
    }

    #[test]
    fn symlink_mid_path_is_followed() {
        let f = fixture();
        assert_eq!(get(&f, &["docs-link", "report.txt"], false), Ok(f.report));
        assert_eq!(get(&f, &["dangling", "x"], false), Err(ResolveError::NotFound));
    }

    #[test]
    fn never_climbs_above_root() {
        let f = fixture();
        assert_eq!(get(&f, &["..", "..", "docs"], false), Ok(f.docs));
        assert_eq!(get(&f, &["escape"], true), Ok(f.report));
        assert_eq!(get(&f, &["docs", ".", "..", "docs"], false), Ok(f.docs));
    }

    #[test]
    fn dangling_final_link_returns_link() {
        let f = fixture();
        let dangling = get(&f, &["dangling"], true).unwrap();
        assert_eq!(f.archive.node(dangling).unwrap().name, "dangling");
        let empty = get(&f, &["empty"], true).unwrap();
        assert_eq!(f.archive.node(empty).unwrap().name, "empty");
    }

    #[test]
    fn cycles_hit_depth_bound() {
        let f = fixture();
        assert_eq!(get(&f, &["loop-a"], true), Err(ResolveError::TooManySymlinks));
        assert_eq!(get(&f, &["loop-a", "x"], false), Err(ResolveError::TooManySymlinks));
        // Not following the final link never touches the cycle.
        assert!(get(&f, &["loop-a"], false).is_ok());
    }

    #[test]
    fn depth_bound_is_configurable() {
        let f = fixture();
        assert_eq!(resolve(&f.archive, &["chain"], true, 2), Ok(f.nested));
        assert_eq!(
            resolve(&f.archive, &["chain"], true, 1),
            Err(ResolveError::TooManySymlinks)
        );
    }

    #[test]
    fn resolve_link_directly() {
        let f = fixture();
        let link = get(&f, &["docs", "sub", "up"], false).unwrap();
        assert_eq!(resolve_link(&f.archive, link, 40), Ok(f.report));
        let dangling = get(&f, &["dangling"], false).unwrap();
        assert_eq!(resolve_link(&f.archive, dangling, 40), Err(ResolveError::NotFound));
    }
}
