//! The concrete host file-system port: `WasiFile`/`WasiDir` backed by real
//! `cap_std` handles, sandboxed to whatever directory the context opened as
//! a mount root. This is "one of the three parallel abstractions" the
//! source carried, now the only one left.

use super::{DirChunkEntry, OpenedRelative, WasiDir, WasiFile, WasiHandle};
use crate::wire::Filestat;
use crate::{Error, Result};
use cap_fs_ext::{FileTypeExt, FollowSymlinks, MetadataExt, OpenOptionsFollowExt};
use std::io::{IoSlice, IoSliceMut, SeekFrom};
use std::path::Path;
use system_interface::fs::FileIoExt;

fn filetype_from_cap_std(ft: &cap_std::fs::FileType) -> crate::wire::Filetype {
    use crate::wire::Filetype::*;
    if ft.is_dir() {
        Directory
    } else if ft.is_symlink() {
        SymbolicLink
    } else if ft.is_socket() {
        if ft.is_block_device() {
            SocketDgram
        } else {
            SocketStream
        }
    } else if ft.is_block_device() {
        BlockDevice
    } else if ft.is_char_device() {
        CharacterDevice
    } else if ft.is_file() {
        RegularFile
    } else {
        Unknown
    }
}

fn filestat_from_metadata(meta: &cap_std::fs::Metadata) -> Filestat {
    let nanos = |t: std::io::Result<cap_std::time::SystemTime>| -> u64 {
        t.ok()
            .and_then(|t| {
                t.into_std()
                    .duration_since(std::time::SystemTime::UNIX_EPOCH)
                    .ok()
            })
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    };
    let mtim = nanos(meta.modified());
    Filestat {
        dev: meta.dev(),
        ino: meta.ino(),
        filetype: filetype_from_cap_std(&meta.file_type()),
        nlink: meta.nlink(),
        size: meta.len(),
        atim_ns: {
            let a = nanos(meta.accessed());
            if a == 0 {
                mtim
            } else {
                a
            }
        },
        mtim_ns: mtim,
        ctim_ns: {
            let c = nanos(meta.created());
            if c == 0 {
                mtim
            } else {
                c
            }
        },
    }
}

fn map_io_err(e: std::io::Error) -> Error {
    Error::from(e.kind())
}

pub struct HostFile {
    file: cap_std::fs::File,
}

impl HostFile {
    pub fn new(file: cap_std::fs::File) -> Self {
        HostFile { file }
    }
}

impl WasiHandle for HostFile {
    fn display_name(&self) -> String {
        "host-file".to_string()
    }
}

impl WasiFile for HostFile {
    fn filetype(&self) -> Result<crate::wire::Filetype> {
        let meta = self.file.metadata().map_err(map_io_err)?;
        Ok(filetype_from_cap_std(&meta.file_type()))
    }

    fn filestat(&self) -> Result<Filestat> {
        let meta = self.file.metadata().map_err(map_io_err)?;
        Ok(filestat_from_metadata(&meta))
    }

    fn read_vectored(&self, bufs: &mut [IoSliceMut<'_>]) -> Result<usize> {
        use std::io::Read;
        (&self.file).read_vectored(bufs).map_err(map_io_err)
    }

    fn read_vectored_at(&self, bufs: &mut [IoSliceMut<'_>], offset: u64) -> Result<usize> {
        self.file.read_vectored_at(bufs, offset).map_err(map_io_err)
    }

    fn write_vectored(&self, bufs: &[IoSlice<'_>]) -> Result<usize> {
        use std::io::Write;
        (&self.file).write_vectored(bufs).map_err(map_io_err)
    }

    fn write_vectored_at(&self, bufs: &[IoSlice<'_>], offset: u64) -> Result<usize> {
        self.file.write_vectored_at(bufs, offset).map_err(map_io_err)
    }

    fn seek(&self, pos: SeekFrom) -> Result<u64> {
        use std::io::Seek;
        (&self.file).seek(pos).map_err(map_io_err)
    }

    fn set_times(
        &self,
        atim: Option<std::time::SystemTime>,
        mtim: Option<std::time::SystemTime>,
    ) -> Result<()> {
        use fs_set_times::SetTimes;
        let conv = |t: Option<std::time::SystemTime>| t.map(cap_std::time::SystemTime::from_std);
        self.file
            .set_times(
                conv(atim).map(fs_set_times::SystemTimeSpec::Absolute),
                conv(mtim).map(fs_set_times::SystemTimeSpec::Absolute),
            )
            .map_err(map_io_err)
    }

    fn set_size(&self, size: u64) -> Result<()> {
        self.file.set_len(size).map_err(map_io_err)
    }

    fn datasync(&self) -> Result<()> {
        self.file.sync_data().map_err(map_io_err)
    }

    fn sync(&self) -> Result<()> {
        self.file.sync_all().map_err(map_io_err)
    }
}

pub struct HostDir {
    dir: cap_std::fs::Dir,
}

impl HostDir {
    pub fn new(dir: cap_std::fs::Dir) -> Self {
        HostDir { dir }
    }

    pub fn open_ambient(path: &Path) -> Result<Self> {
        let dir = cap_std::fs::Dir::open_ambient_dir(path, cap_std::ambient_authority())
            .map_err(map_io_err)?;
        Ok(HostDir::new(dir))
    }
}

impl WasiHandle for HostDir {
    fn display_name(&self) -> String {
        "host-dir".to_string()
    }
}

impl WasiDir for HostDir {
    fn filestat(&self) -> Result<Filestat> {
        let meta = self.dir.dir_metadata().map_err(map_io_err)?;
        Ok(filestat_from_metadata(&meta))
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
        if directory {
            let d = self.dir.open_dir(Path::new(path)).map_err(map_io_err)?;
            return Ok(OpenedRelative::Dir(Box::new(HostDir::new(d))));
        }
        let mut opts = cap_std::fs::OpenOptions::new();
        opts.follow(FollowSymlinks::Yes);
        if create && excl {
            opts.create_new(true);
        } else if create {
            opts.create(true);
        }
        if truncate {
            opts.truncate(true);
        }
        if write {
            opts.write(true).read(true);
        } else {
            opts.read(true);
        }
        let f = self.dir.open_with(Path::new(path), &opts).map_err(map_io_err)?;
        if f.metadata().map_err(map_io_err)?.is_dir() {
            let d = self.dir.open_dir(Path::new(path)).map_err(map_io_err)?;
            return Ok(OpenedRelative::Dir(Box::new(HostDir::new(d))));
        }
        Ok(OpenedRelative::File(Box::new(HostFile::new(f))))
    }

    fn stat_relative(&self, path: &str, follow: bool) -> Result<Filestat> {
        let meta = if follow {
            self.dir.metadata(Path::new(path))
        } else {
            self.dir.symlink_metadata(Path::new(path))
        }
        .map_err(map_io_err)?;
        Ok(filestat_from_metadata(&meta))
    }

    fn make_dir(&self, path: &str) -> Result<()> {
        self.dir.create_dir(Path::new(path)).map_err(map_io_err)
    }

    fn read_dir_chunk(&self, start_index: u64, max_entries: usize) -> Result<Vec<DirChunkEntry>> {
        let entries = self
            .dir
            .entries()
            .map_err(map_io_err)?
            .skip(start_index as usize)
            .take(max_entries);
        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.map_err(map_io_err)?;
            let file_type = entry.file_type().map_err(map_io_err)?;
            let meta = entry.metadata().map_err(map_io_err)?;
            let name = entry
                .file_name()
                .into_string()
                .map_err(|_| Error::Inval)?;
            out.push(DirChunkEntry {
                name,
                ino: meta.ino(),
                filetype: filetype_from_cap_std(&file_type),
            });
        }
        Ok(out)
    }

    fn unlink_file(&self, path: &str) -> Result<()> {
        self.dir.remove_file(Path::new(path)).map_err(map_io_err)
    }

    fn remove_dir(&self, path: &str) -> Result<()> {
        self.dir.remove_dir(Path::new(path)).map_err(map_io_err)
    }

    fn rename(&self, old_path: &str, new_path: &str) -> Result<()> {
        self.dir
            .rename(Path::new(old_path), &self.dir, Path::new(new_path))
            .map_err(map_io_err)
    }

    fn symlink(&self, old_path: &str, new_path: &str) -> Result<()> {
        self.dir
            .symlink(old_path, Path::new(new_path))
            .map_err(map_io_err)
    }

    fn readlink(&self, path: &str) -> Result<String> {
        let target = self.dir.read_link(Path::new(path)).map_err(map_io_err)?;
        target.into_os_string().into_string().map_err(|_| Error::Inval)
    }
}
