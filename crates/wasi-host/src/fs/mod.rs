//! File-handle capability traits and the composable overlay file system.
//!
//! The source this crate descends from carried at least three overlapping
//! notions of "a file system" at once: a `File`/`FS` pair guarded by
//! permission wrappers, a syscall-style `FS` returning raw errno values, and
//! an experimental `sys` layer underneath both. This module is the one
//! surviving shape: a pair of capability traits (`WasiFile`, `WasiDir`) each
//! handle implements according to what it actually is, a single concrete
//! host port (`host`) backing real files and directories, and a single
//! composable overlay (`overlay`) presenting them as one namespace.

mod host;
mod overlay;
mod readonly;
pub mod stdio;

pub use host::{HostDir, HostFile};
pub use overlay::Overlay;
pub use readonly::ReadOnly;

use crate::wire::{Filestat, Filetype};
use crate::{Error, Result};
use std::io::{IoSlice, IoSliceMut, SeekFrom};

/// Capabilities common to both files and directories.
pub trait WasiHandle {
    /// A stable name used only for diagnostics (logging); never parsed.
    fn display_name(&self) -> String;

    /// Releases the underlying resource. Called exactly once by the
    /// descriptor table on `fd_close`/teardown.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Operations available on a regular-file-like handle. Not every
/// implementation supports every operation (an in-memory test double may
/// not support `set_times`, for instance) — unsupported operations return
/// `Error::Nosys` rather than panicking.
pub trait WasiFile: WasiHandle {
    fn filetype(&self) -> Result<Filetype>;
    fn filestat(&self) -> Result<Filestat>;

    fn read_vectored(&self, bufs: &mut [IoSliceMut<'_>]) -> Result<usize>;
    fn read_vectored_at(&self, bufs: &mut [IoSliceMut<'_>], offset: u64) -> Result<usize>;
    fn write_vectored(&self, bufs: &[IoSlice<'_>]) -> Result<usize>;
    fn write_vectored_at(&self, bufs: &[IoSlice<'_>], offset: u64) -> Result<usize> {
        let _ = (bufs, offset);
        Err(Error::Nosys)
    }
    fn seek(&self, pos: SeekFrom) -> Result<u64>;

    fn set_times(
        &self,
        atim: Option<std::time::SystemTime>,
        mtim: Option<std::time::SystemTime>,
    ) -> Result<()> {
        let _ = (atim, mtim);
        Err(Error::Nosys)
    }
    fn set_size(&self, size: u64) -> Result<()> {
        let _ = size;
        Err(Error::Nosys)
    }

    fn advise(&self) -> Result<()> {
        Err(Error::Nosys)
    }
    fn allocate(&self) -> Result<()> {
        Err(Error::Nosys)
    }
    fn datasync(&self) -> Result<()> {
        Err(Error::Nosys)
    }
    fn sync(&self) -> Result<()> {
        Err(Error::Nosys)
    }
}

/// One page of directory entries returned by [`WasiDir::read_dir_chunk`].
pub struct DirChunkEntry {
    pub name: String,
    pub ino: u64,
    pub filetype: Filetype,
}

/// Operations available on a directory-like handle.
pub trait WasiDir: WasiHandle {
    fn filestat(&self) -> Result<Filestat>;

    /// Opens `path` relative to this directory. `write` requests a handle
    /// capable of `write_vectored`; implementations that cannot distinguish
    /// read-only from read-write opens may ignore it and always grant both.
    fn open_relative(
        &self,
        path: &str,
        create: bool,
        excl: bool,
        truncate: bool,
        directory: bool,
        write: bool,
    ) -> Result<OpenedRelative>;

    fn stat_relative(&self, path: &str, follow: bool) -> Result<Filestat>;

    fn make_dir(&self, path: &str) -> Result<()>;

    /// Returns up to `max_entries` entries starting at `start_index`
    /// (a zero-based, insertion-stable position, *not* the wire cookie —
    /// the dispatcher owns the cookie-to-index mapping).
    fn read_dir_chunk(&self, start_index: u64, max_entries: usize) -> Result<Vec<DirChunkEntry>>;

    fn unlink_file(&self, _path: &str) -> Result<()> {
        Err(Error::Nosys)
    }
    fn remove_dir(&self, _path: &str) -> Result<()> {
        Err(Error::Nosys)
    }
    fn rename(&self, _old_path: &str, _new_path: &str) -> Result<()> {
        Err(Error::Nosys)
    }
    fn symlink(&self, _old_path: &str, _new_path: &str) -> Result<()> {
        Err(Error::Nosys)
    }
    fn readlink(&self, _path: &str) -> Result<String> {
        Err(Error::Nosys)
    }
}

/// The result of `open_relative`: either a fresh file or a fresh directory,
/// the two keeping this crate's two capability traits distinct all the way
/// through `path_open`.
pub enum OpenedRelative {
    File(Box<dyn WasiFile>),
    Dir(Box<dyn WasiDir>),
}

// Trait objects don't automatically implement the traits they're objects
// of; these forwarding impls let `Box<dyn WasiFile>`/`Box<dyn WasiDir>`
// themselves be used wherever a `T: WasiFile`/`T: WasiDir` is expected,
// which `ReadOnly<T>` and the overlay's mount list both rely on.
impl WasiHandle for Box<dyn WasiFile> {
    fn display_name(&self) -> String {
        (**self).display_name()
    }
    fn close(&self) -> Result<()> {
        (**self).close()
    }
}

impl WasiFile for Box<dyn WasiFile> {
    fn filetype(&self) -> Result<Filetype> {
        (**self).filetype()
    }
    fn filestat(&self) -> Result<Filestat> {
        (**self).filestat()
    }
    fn read_vectored(&self, bufs: &mut [IoSliceMut<'_>]) -> Result<usize> {
        (**self).read_vectored(bufs)
    }
    fn read_vectored_at(&self, bufs: &mut [IoSliceMut<'_>], offset: u64) -> Result<usize> {
        (**self).read_vectored_at(bufs, offset)
    }
    fn write_vectored(&self, bufs: &[IoSlice<'_>]) -> Result<usize> {
        (**self).write_vectored(bufs)
    }
    fn write_vectored_at(&self, bufs: &[IoSlice<'_>], offset: u64) -> Result<usize> {
        (**self).write_vectored_at(bufs, offset)
    }
    fn seek(&self, pos: SeekFrom) -> Result<u64> {
        (**self).seek(pos)
    }
    fn set_times(
        &self,
        atim: Option<std::time::SystemTime>,
        mtim: Option<std::time::SystemTime>,
    ) -> Result<()> {
        (**self).set_times(atim, mtim)
    }
    fn set_size(&self, size: u64) -> Result<()> {
        (**self).set_size(size)
    }
    fn advise(&self) -> Result<()> {
        (**self).advise()
    }
    fn allocate(&self) -> Result<()> {
        (**self).allocate()
    }
    fn datasync(&self) -> Result<()> {
        (**self).datasync()
    }
    fn sync(&self) -> Result<()> {
        (**self).sync()
    }
}

impl WasiHandle for Box<dyn WasiDir> {
    fn display_name(&self) -> String {
        (**self).display_name()
    }
    fn close(&self) -> Result<()> {
        (**self).close()
    }
}

impl WasiDir for Box<dyn WasiDir> {
    fn filestat(&self) -> Result<Filestat> {
        (**self).filestat()
    }
    fn open_relative(
        &self,
        path: &str,
        create: bool,
        excl: bool,
        truncate: bool,
        directory: bool,
        write: bool,
    ) -> Result<OpenedRelative> {
        (**self).open_relative(path, create, excl, truncate, directory, write)
    }
    fn stat_relative(&self, path: &str, follow: bool) -> Result<Filestat> {
        (**self).stat_relative(path, follow)
    }
    fn make_dir(&self, path: &str) -> Result<()> {
        (**self).make_dir(path)
    }
    fn read_dir_chunk(&self, start_index: u64, max_entries: usize) -> Result<Vec<DirChunkEntry>> {
        (**self).read_dir_chunk(start_index, max_entries)
    }
    fn unlink_file(&self, path: &str) -> Result<()> {
        (**self).unlink_file(path)
    }
    fn remove_dir(&self, path: &str) -> Result<()> {
        (**self).remove_dir(path)
    }
    fn rename(&self, old_path: &str, new_path: &str) -> Result<()> {
        (**self).rename(old_path, new_path)
    }
    fn symlink(&self, old_path: &str, new_path: &str) -> Result<()> {
        (**self).symlink(old_path, new_path)
    }
    fn readlink(&self, path: &str) -> Result<String> {
        (**self).readlink(path)
    }
}
