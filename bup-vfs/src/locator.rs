//! Finds the repository an address points into.

use std::path::Path;

use crate::archive::{Archive, Backend};
use crate::error::{Error, Result};
use crate::path::{Address, SEPARATOR};

/// An open repository and the root it was found at.
#[derive(Debug)]
pub struct Repository<A> {
    root: String,
    archive: A,
}

impl<A: Archive> Repository<A> {
    pub fn new<S: Into<String>>(root: S, archive: A) -> Repository<A> {
        let mut root = root.into();
        if !root.ends_with(SEPARATOR) {
            root.push(SEPARATOR);
        }
        Repository { root, archive }
    }

    /// Slash-terminated root path.
    #[inline(always)]
    pub fn root(&self) -> &str {
        &self.root
    }

    #[inline(always)]
    pub fn archive(&self) -> &A {
        &self.archive
    }

    #[inline(always)]
    pub fn archive_mut(&mut self) -> &mut A {
        &mut self.archive
    }
}

/// Holds the one repository a session works against.
///
/// Every replacement bumps the generation, so anything derived from an older
/// repository can tell that it is stale.
#[derive(Debug)]
pub struct RepositorySlot<A> {
    current: Option<Repository<A>>,
    generation: u64,
}

impl<A> Default for RepositorySlot<A> {
    fn default() -> Self {
        RepositorySlot {
            current: None,
            generation: 0,
        }
    }
}

impl<A: Archive> RepositorySlot<A> {
    pub fn new() -> RepositorySlot<A> {
        RepositorySlot::default()
    }

    pub fn current(&self) -> Option<&Repository<A>> {
        self.current.as_ref()
    }

    #[inline(always)]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Release the current repository, then install `next`.
    pub fn replace(&mut self, next: Option<Repository<A>>) {
        if let Some(old) = self.current.take() {
            tracing::debug!(root = old.root(), "closing repository");
            drop(old);
        }
        self.generation += 1;
        self.current = next;
    }

    /// Find the repository holding `address` and the components below its root.
    ///
    /// The current repository is reused when the address falls under it.
    /// Otherwise it is released and ancestors of the address are tried from
    /// the shortest down, the first one with archive markers becoming the new
    /// repository.
    pub fn locate<B>(
        &mut self,
        backend: &B,
        address: &str,
    ) -> Result<(&mut Repository<A>, Vec<String>)>
    where
        B: Backend<Archive = A>,
    {
        let normalized = Address::parse(address);

        let reuse = self
            .current
            .as_ref()
            .and_then(|repo| normalized.strip_root(repo.root()));
        if let Some(components) = reuse {
            return match self.current.as_mut() {
                Some(repo) => Ok((repo, components)),
                None => Err(not_found(address)),
            };
        }

        if self.current.is_some() {
            self.replace(None);
        }

        let components: Vec<&str> = normalized.components().collect();
        let mut candidate = String::with_capacity(normalized.as_str().len());
        candidate.push(SEPARATOR);

        for (i, component) in components.iter().enumerate() {
            candidate.push_str(component);
            candidate.push(SEPARATOR);

            if !backend.is_archive_root(Path::new(&candidate)) {
                continue;
            }

            let archive = match backend.open(Path::new(&candidate)) {
                Ok(archive) => archive,
                Err(e) => {
                    tracing::warn!(root = %candidate, error = %e, "repository failed to open");
                    return Err(not_found(address));
                }
            };

            tracing::info!(root = %candidate, "opened repository");
            let rest = components[i + 1..].iter().map(|c| c.to_string()).collect();
            self.replace(Some(Repository::new(candidate, archive)));
            return match self.current.as_mut() {
                Some(repo) => Ok((repo, rest)),
                None => Err(not_found(address)),
            };
        }

        tracing::debug!(address, "no repository found");
        Err(not_found(address))
    }
}

fn not_found(address: &str) -> Error {
    Error::RepositoryNotFound {
        address: address.to_string(),
    }
}
