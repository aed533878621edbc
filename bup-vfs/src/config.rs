use serde::Deserialize;

/// Detail level used when a request does not say how much it wants.
pub const DEFAULT_DETAILS: u32 = 2;

/// Symlink hops allowed during a single resolution, as `MAXSYMLINKS` on Linux.
pub const DEFAULT_MAX_SYMLINK_DEPTH: usize = 40;

pub const DEFAULT_READ_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Detail level for `stat` and `list_dir` when the request carries none.
    pub default_details: u32,

    /// Upper bound on symlinks followed while resolving one path.
    pub max_symlink_depth: usize,

    /// Largest number of bytes requested from the store in a single read.
    pub read_chunk_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            default_details: DEFAULT_DETAILS,
            max_symlink_depth: DEFAULT_MAX_SYMLINK_DEPTH,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

impl SessionConfig {
    pub fn new() -> SessionConfig {
        SessionConfig::default()
    }

    pub fn with_default_details(mut self, details: u32) -> SessionConfig {
        self.default_details = details;
        self
    }

    pub fn with_max_symlink_depth(mut self, depth: usize) -> SessionConfig {
        self.max_symlink_depth = depth;
        self
    }

    pub fn with_read_chunk_size(mut self, size: usize) -> SessionConfig {
        self.read_chunk_size = size;
        self
    }

    /// The chunk size actually used; a zero from configuration would stall reads.
    #[inline(always)]
    pub(crate) fn chunk_size(&self) -> usize {
        self.read_chunk_size.max(1)
    }
}
