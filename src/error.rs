//! The closed error taxonomy shared by every operation in the context core.
//!
//! Errors that are *local* to a constructing node are also recorded on the
//! node itself (see [`crate::context::Context::context_error`]); this enum
//! is only the propagated half of that story — see §7 of the design for the
//! local-vs-global split.

use thiserror::Error;

pub type DisirResult<T> = Result<T, DisirError>;

/// Closed set of error kinds, mirrored 1:1 from the status codes this
/// crate's design grew out of.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DisirError {
    #[error("no can do: {0}")]
    NoCanDo(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("too few arguments: {0}")]
    TooFewArguments(String),

    #[error("context in wrong state: {0}")]
    ContextInWrongState(String),

    #[error("wrong context: {0}")]
    WrongContext(String),

    #[error("invalid context: {0}")]
    InvalidContext(String),

    #[error("destroyed context")]
    DestroyedContext,

    #[error("no memory")]
    NoMemory,

    #[error("internal error: {0}")]
    InternalError(String),

    #[error("insufficient resources: {0}")]
    InsufficientResources(String),

    #[error("already exists: {0}")]
    Exists(String),

    #[error("conflicting semver: {0}")]
    ConflictingSemver(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("exhausted")]
    Exhausted,

    #[error("mold missing: {0}")]
    MoldMissing(String),

    #[error("wrong value type: {0}")]
    WrongValueType(String),

    #[error("not exist: {0}")]
    NotExist(String),

    #[error("restriction violated: {0}")]
    RestrictionViolated(String),

    #[error("one or more elements invalid")]
    ElementsInvalid,

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("plugin error: {0}")]
    PluginError(String),

    #[error("load error: {0}")]
    LoadError(String),

    #[error("config invalid: {0}")]
    ConfigInvalid(String),

    #[error("group missing: {0}")]
    GroupMissing(String),

    #[error("permission error: {0}")]
    PermissionError(String),

    #[error("filesystem error: {0}")]
    FsError(String),

    #[error("default missing")]
    DefaultMissing,

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for DisirError {
    fn from(err: std::io::Error) -> Self {
        DisirError::FsError(err.to_string())
    }
}

impl From<toml::ser::Error> for DisirError {
    fn from(err: toml::ser::Error) -> Self {
        DisirError::InternalError(format!("toml serialize: {err}"))
    }
}

impl From<toml::de::Error> for DisirError {
    fn from(err: toml::de::Error) -> Self {
        DisirError::ConfigInvalid(format!("toml parse: {err}"))
    }
}
