use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No bup repository found. Address: '{address}'")]
    RepositoryNotFound { address: String },

    #[error("Path not found in repository. Path: '{path}'")]
    NotFound { path: String },

    #[error("Path is a directory. Path: '{path}'")]
    IsDirectory { path: String },

    #[error("Path is a file. Path: '{path}'")]
    IsFile { path: String },

    #[error("Repository is read-only, cannot open for writing. Address: '{address}'")]
    CannotOpenForWriting { address: String },

    #[error("Cannot open for reading. Address: '{address}'")]
    CannotOpenForReading {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot seek to offset {offset}. Path: '{path}'")]
    CannotSeek {
        path: String,
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Reading failed. Path: '{path}'")]
    ReadFailure {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No file is open")]
    NoOpenHandle,

    #[error("Too many levels of symbolic links. Path: '{path}'")]
    TooManySymlinks { path: String },
}

/// Flat classification of [`Error`], for transports that map errors onto their
/// own protocol codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RepositoryNotFound,
    NotFound,
    IsDirectory,
    IsFile,
    CannotOpenForWriting,
    CannotOpenForReading,
    CannotSeek,
    ReadFailure,
    NoOpenHandle,
    TooManySymlinks,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RepositoryNotFound => "repository not found",
            ErrorKind::NotFound => "not found",
            ErrorKind::IsDirectory => "is a directory",
            ErrorKind::IsFile => "is a file",
            ErrorKind::CannotOpenForWriting => "cannot open for writing",
            ErrorKind::CannotOpenForReading => "cannot open for reading",
            ErrorKind::CannotSeek => "cannot seek",
            ErrorKind::ReadFailure => "read failure",
            ErrorKind::NoOpenHandle => "no open handle",
            ErrorKind::TooManySymlinks => "too many symlinks",
        }
    }

    /// A file operation on a directory, or a directory operation on a file.
    #[inline(always)]
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, ErrorKind::IsDirectory | ErrorKind::IsFile)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::RepositoryNotFound { .. } => ErrorKind::RepositoryNotFound,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::IsDirectory { .. } => ErrorKind::IsDirectory,
            Error::IsFile { .. } => ErrorKind::IsFile,
            Error::CannotOpenForWriting { .. } => ErrorKind::CannotOpenForWriting,
            Error::CannotOpenForReading { .. } => ErrorKind::CannotOpenForReading,
            Error::CannotSeek { .. } => ErrorKind::CannotSeek,
            Error::ReadFailure { .. } => ErrorKind::ReadFailure,
            Error::NoOpenHandle => ErrorKind::NoOpenHandle,
            Error::TooManySymlinks { .. } => ErrorKind::TooManySymlinks,
        }
    }
}
