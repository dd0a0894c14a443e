use crate::wire::Errno;
use std::num::TryFromIntError;
use std::string::FromUtf8Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Kinded error type shared by every layer below the dispatcher.
///
/// Every variant has an unambiguous mapping to a single `Errno` (see
/// `From<Error> for Errno` below); there is no "unrepresentable" error
/// that would force a panic or a trap at the WASI boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("bad file descriptor")]
    Badf,
    #[error("invalid argument")]
    Inval,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no such file or directory")]
    Noent,
    #[error("file exists")]
    Exist,
    #[error("not a directory")]
    Notdir,
    #[error("directory not empty")]
    Notempty,
    #[error("operation not permitted")]
    Perm,
    #[error("read-only file system")]
    Rofs,
    #[error("too many levels of symbolic links")]
    Loop,
    #[error("function not implemented")]
    Nosys,
    #[error("out-of-bounds guest memory access")]
    Fault,
    #[error("capability not held: wanted {wanted:?}, have {have:?}")]
    NotCapable { wanted: String, have: String },
    #[error("value out of range for destination type")]
    Overflow(#[from] TryFromIntError),
    #[error("path is not valid UTF-8")]
    Utf8(#[from] FromUtf8Error),
}

impl From<Error> for Errno {
    fn from(e: Error) -> Errno {
        use Error::*;
        match e {
            Badf => Errno::Badf,
            Inval => Errno::Inval,
            Io(_) => Errno::Io,
            Noent => Errno::Noent,
            Exist => Errno::Exist,
            Notdir => Errno::Notdir,
            Notempty => Errno::Notempty,
            Perm => Errno::Perm,
            Rofs => Errno::Rofs,
            Loop => Errno::Loop,
            Nosys => Errno::Nosys,
            Fault => Errno::Fault,
            NotCapable { .. } => Errno::Notcapable,
            Overflow(_) => Errno::Overflow,
            Utf8(_) => Errno::Ilseq,
        }
    }
}

impl From<std::io::ErrorKind> for Error {
    fn from(kind: std::io::ErrorKind) -> Error {
        use std::io::ErrorKind::*;
        match kind {
            NotFound => Error::Noent,
            PermissionDenied => Error::Perm,
            AlreadyExists => Error::Exist,
            InvalidInput | InvalidData => Error::Inval,
            _ => Error::Io(kind.into()),
        }
    }
}
