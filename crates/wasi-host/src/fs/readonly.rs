//! A handle wrapper that rejects mutating operations with a dedicated
//! sentinel error mapped to `EROFS`, rather than forwarding them to a
//! handle that might actually perform them.

use super::{DirChunkEntry, OpenedRelative, WasiDir, WasiFile, WasiHandle};
use crate::wire::{Filestat, Filetype};
use crate::{Error, Result};
use std::io::{IoSlice, IoSliceMut, SeekFrom};

/// Wraps any `WasiFile` or `WasiDir` implementation, passing reads through
/// unchanged and turning every write-shaped call into `Error::Rofs`.
pub struct ReadOnly<T>(T);

impl<T> ReadOnly<T> {
    pub fn new(inner: T) -> Self {
        ReadOnly(inner)
    }
}

impl<T: WasiHandle> WasiHandle for ReadOnly<T> {
    fn display_name(&self) -> String {
        self.0.display_name()
    }
    fn close(&self) -> Result<()> {
        self.0.close()
    }
}

impl<F: WasiFile> WasiFile for ReadOnly<F> {
    fn filetype(&self) -> Result<Filetype> {
        self.0.filetype()
    }
    fn filestat(&self) -> Result<Filestat> {
        self.0.filestat()
    }
    fn read_vectored(&self, bufs: &mut [IoSliceMut<'_>]) -> Result<usize> {
        self.0.read_vectored(bufs)
    }
    fn read_vectored_at(&self, bufs: &mut [IoSliceMut<'_>], offset: u64) -> Result<usize> {
        self.0.read_vectored_at(bufs, offset)
    }
    fn write_vectored(&self, _bufs: &[IoSlice<'_>]) -> Result<usize> {
        Err(Error::Rofs)
    }
    fn write_vectored_at(&self, _bufs: &[IoSlice<'_>], _offset: u64) -> Result<usize> {
        Err(Error::Rofs)
    }
    fn seek(&self, pos: SeekFrom) -> Result<u64> {
        self.0.seek(pos)
    }
    fn set_times(
        &self,
        _atim: Option<std::time::SystemTime>,
        _mtim: Option<std::time::SystemTime>,
    ) -> Result<()> {
        Err(Error::Rofs)
    }
    fn set_size(&self, _size: u64) -> Result<()> {
        Err(Error::Rofs)
    }
    fn advise(&self) -> Result<()> {
        self.0.advise()
    }
    fn allocate(&self) -> Result<()> {
        Err(Error::Rofs)
    }
    fn datasync(&self) -> Result<()> {
        self.0.datasync()
    }
    fn sync(&self) -> Result<()> {
        self.0.sync()
    }
}

impl<D: WasiDir> WasiDir for ReadOnly<D> {
    fn filestat(&self) -> Result<Filestat> {
        self.0.filestat()
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
        if create || excl || truncate || write {
            return Err(Error::Rofs);
        }
        match self.0.open_relative(path, false, false, false, directory, false)? {
            OpenedRelative::File(f) => Ok(OpenedRelative::File(Box::new(ReadOnly::new(f)))),
            OpenedRelative::Dir(d) => Ok(OpenedRelative::Dir(Box::new(ReadOnly::new(d)))),
        }
    }

    fn stat_relative(&self, path: &str, follow: bool) -> Result<Filestat> {
        self.0.stat_relative(path, follow)
    }

    fn make_dir(&self, _path: &str) -> Result<()> {
        Err(Error::Rofs)
    }

    fn read_dir_chunk(&self, start_index: u64, max_entries: usize) -> Result<Vec<DirChunkEntry>> {
        self.0.read_dir_chunk(start_index, max_entries)
    }

    fn unlink_file(&self, _path: &str) -> Result<()> {
        Err(Error::Rofs)
    }
    fn remove_dir(&self, _path: &str) -> Result<()> {
        Err(Error::Rofs)
    }
    fn rename(&self, _old_path: &str, _new_path: &str) -> Result<()> {
        Err(Error::Rofs)
    }
    fn symlink(&self, _old_path: &str, _new_path: &str) -> Result<()> {
        Err(Error::Rofs)
    }
    fn readlink(&self, path: &str) -> Result<String> {
        self.0.readlink(path)
    }
}
