//! Read-only filesystem access to bup backup repositories.
//!
//! Addresses are mapped onto the repository that contains them by looking for
//! repository markers in each ancestor directory. The path below the root is
//! then walked through the repository's tree, symlinks included, and answered
//! as directory listings, metadata records or resumable byte streams.
//!
//! The repository format itself stays behind the [`Backend`] and [`Archive`]
//! traits. [`MemoryBackend`] is a complete in-process implementation.

mod archive;
mod config;
mod entry;
mod error;
mod locator;
mod metadata;
pub mod node;
mod owner;
mod path;
mod reply;
mod resolve;
mod session;
mod stream;

pub use archive::{
    has_archive_markers, Archive, Backend, FileData, MemoryArchive, MemoryBackend, OpenError,
};
pub use config::SessionConfig;
pub use entry::{encode, Entry, EntryDetails};
pub use error::{Error, ErrorKind, Result};
pub use locator::{Repository, RepositorySlot};
pub use metadata::RequestMetadata;
pub use node::{Node, NodeId, NodeKind, NodeMeta};
pub use owner::{NameLookup, OwnerCache, SystemNames};
pub use path::Address;
pub use reply::{Event, Reply, Transcript};
pub use resolve::{resolve, resolve_link, ResolveError};
pub use session::{HandleId, OpenMode, Session};
pub use stream::{ReadOutcome, StreamReader};
