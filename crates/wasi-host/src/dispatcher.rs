//! The WASI call dispatcher: decodes argument packs out of guest linear
//! memory, enforces rights on the looked-up handle, performs the host
//! operation, encodes the result back into guest memory, and returns a
//! numeric error code. This is the only layer that knows about the wire
//! format in `wire` and the table in `table` at the same time.

use crate::ctx::{Entry, WasiCtx};
use crate::fs::{DirChunkEntry, OpenedRelative};
use crate::rights;
use crate::wire::{
    DirentHeader, Errno, Fdflags, Fdstat, Filestat, Iovec, Lookupflags, Oflags, Prestat, Rights,
    Whence,
};
use crate::{Error, Result};
use std::io::{IoSlice, IoSliceMut, SeekFrom};

/// A bounds-checked view over a fixed slice of guest linear memory. Any
/// access outside the slice fails with `EFAULT` rather than panicking.
pub struct GuestMemory<'a> {
    bytes: &'a mut [u8],
}

impl<'a> GuestMemory<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        GuestMemory { bytes }
    }

    fn span(&self, offset: u32, len: usize) -> Result<std::ops::Range<usize>> {
        let start = offset as usize;
        let end = start.checked_add(len).ok_or(Error::Fault)?;
        if end > self.bytes.len() {
            return Err(Error::Fault);
        }
        Ok(start..end)
    }

    pub fn read(&self, offset: u32, len: u32) -> Result<&[u8]> {
        let span = self.span(offset, len as usize)?;
        Ok(&self.bytes[span])
    }

    pub fn read_u32(&self, offset: u32) -> Result<u32> {
        let span = self.span(offset, 4)?;
        Ok(u32::from_le_bytes(self.bytes[span].try_into().unwrap()))
    }

    pub fn read_u64(&self, offset: u32) -> Result<u64> {
        let span = self.span(offset, 8)?;
        Ok(u64::from_le_bytes(self.bytes[span].try_into().unwrap()))
    }

    pub fn write(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        let span = self.span(offset, data.len())?;
        self.bytes[span].copy_from_slice(data);
        Ok(())
    }

    pub fn write_u32(&mut self, offset: u32, value: u32) -> Result<()> {
        self.write(offset, &value.to_le_bytes())
    }

    pub fn write_u64(&mut self, offset: u32, value: u64) -> Result<()> {
        self.write(offset, &value.to_le_bytes())
    }

    pub fn read_path(&self, ptr: u32, len: u32) -> Result<String> {
        Ok(String::from_utf8(self.read(ptr, len)?.to_vec())?)
    }

    fn read_iovecs(&self, iovs_ptr: u32, iovs_len: u32) -> Result<Vec<Iovec>> {
        let mut out = Vec::with_capacity(iovs_len as usize);
        for i in 0..iovs_len {
            let entry_ptr = iovs_ptr
                .checked_add(i.checked_mul(Iovec::SIZE as u32).ok_or(Error::Fault)?)
                .ok_or(Error::Fault)?;
            out.push(Iovec::decode(self.read(entry_ptr, Iovec::SIZE as u32)?));
        }
        Ok(out)
    }
}

/// No dirfd supplied; the call resolves against the context's overlay root.
pub const DIRFD_NONE: u32 = u32::MAX;

fn to_errno<T>(r: Result<T>) -> u16 {
    match r {
        Ok(_) => Errno::Success.raw(),
        Err(e) => {
            tracing::debug!(error = %e, "dispatcher call failed");
            Errno::from(e).raw()
        }
    }
}

fn require(held: Rights, wanted: Rights) -> Result<()> {
    if held.contains(wanted) {
        Ok(())
    } else {
        Err(Error::NotCapable {
            wanted: format!("{:?}", wanted),
            have: format!("{:?}", held),
        })
    }
}

pub struct Dispatcher<'ctx> {
    ctx: &'ctx WasiCtx,
}

impl<'ctx> Dispatcher<'ctx> {
    pub fn new(ctx: &'ctx WasiCtx) -> Self {
        Dispatcher { ctx }
    }

    pub fn fd_close(&self, fd: u32) -> u16 {
        tracing::debug!(fd, "fd_close");
        to_errno(self.fd_close_inner(fd))
    }

    fn fd_close_inner(&self, fd: u32) -> Result<()> {
        let mut table = self.ctx.table();
        let entry = table.get(fd).ok_or(Error::Badf)?;
        if entry.is_preopen() {
            // A preopened directory lives for the lifetime of the context;
            // closing it would leave its guest path dangling.
            return Err(Error::Perm);
        }
        match entry {
            Entry::File { file, .. } => file.close()?,
            Entry::Dir { dir, .. } => dir.close()?,
        }
        table.delete(fd);
        Ok(())
    }

    pub fn fd_fdstat_get(&self, mem: &mut GuestMemory, fd: u32, out: u32) -> u16 {
        tracing::debug!(fd, out, "fd_fdstat_get");
        to_errno(self.fd_fdstat_get_inner(mem, fd, out))
    }

    fn fd_fdstat_get_inner(&self, mem: &mut GuestMemory, fd: u32, out: u32) -> Result<()> {
        mem.span(out, Fdstat::SIZE)?;
        let table = self.ctx.table();
        let entry = table.get(fd).ok_or(Error::Badf)?;
        let filetype = match entry {
            Entry::File { file, .. } => file.filetype()?,
            Entry::Dir { .. } => crate::wire::Filetype::Directory,
        };
        let stat = Fdstat {
            filetype,
            flags: Fdflags::empty(),
            rights_base: entry.rights_base(),
            rights_inheriting: entry.rights_inheriting(),
        };
        mem.write(out, &stat.encode())
    }

    pub fn fd_filestat_get(&self, mem: &mut GuestMemory, fd: u32, out: u32) -> u16 {
        tracing::debug!(fd, out, "fd_filestat_get");
        to_errno(self.fd_filestat_get_inner(mem, fd, out))
    }

    fn fd_filestat_get_inner(&self, mem: &mut GuestMemory, fd: u32, out: u32) -> Result<()> {
        mem.span(out, Filestat::SIZE)?;
        let table = self.ctx.table();
        let entry = table.get(fd).ok_or(Error::Badf)?;
        require(entry.rights_base(), Rights::FD_FILESTAT_GET)?;
        let stat = match entry {
            Entry::File { file, .. } => file.filestat()?,
            Entry::Dir { dir, .. } => dir.filestat()?,
        };
        mem.write(out, &stat.encode())
    }

    pub fn fd_read(&self, mem: &mut GuestMemory, fd: u32, iovs: u32, iovs_len: u32, out_nread: u32) -> u16 {
        tracing::trace!(fd, iovs_len, "fd_read");
        to_errno(self.fd_read_inner(mem, fd, iovs, iovs_len, out_nread, None))
    }

    pub fn fd_pread(
        &self,
        mem: &mut GuestMemory,
        fd: u32,
        iovs: u32,
        iovs_len: u32,
        offset: u64,
        out_nread: u32,
    ) -> u16 {
        tracing::trace!(fd, iovs_len, offset, "fd_pread");
        to_errno(self.fd_read_inner(mem, fd, iovs, iovs_len, out_nread, Some(offset)))
    }

    fn fd_read_inner(
        &self,
        mem: &mut GuestMemory,
        fd: u32,
        iovs: u32,
        iovs_len: u32,
        out_nread: u32,
        offset: Option<u64>,
    ) -> Result<()> {
        mem.span(out_nread, 4)?;
        let iovecs = mem.read_iovecs(iovs, iovs_len)?;
        let table = self.ctx.table();
        let entry = table.get(fd).ok_or(Error::Badf)?;
        let wanted = if offset.is_some() {
            Rights::FD_READ | Rights::FD_SEEK
        } else {
            Rights::FD_READ
        };
        require(entry.rights_base(), wanted)?;
        let file = entry.as_file()?;

        for iov in &iovecs {
            mem.span(iov.offset, iov.length as usize)?;
        }

        // Read each iovec individually rather than in one gathered call, so a
        // failure partway through the list still leaves the bytes already read
        // into earlier iovecs accounted for. A short read at EOF, or an I/O
        // error once at least one byte has been read, is success: only an
        // error on the very first byte propagates as a failure.
        let mut total = 0usize;
        for iov in &iovecs {
            let mut buf = vec![0u8; iov.length as usize];
            let mut slice = [IoSliceMut::new(&mut buf)];
            let n = match offset {
                Some(off) => file.read_vectored_at(&mut slice, off + total as u64),
                None => file.read_vectored(&mut slice),
            };
            match n {
                Ok(n) => {
                    mem.write(iov.offset, &buf[..n])?;
                    total += n;
                    if n < buf.len() {
                        break;
                    }
                }
                Err(e) => {
                    if total > 0 {
                        break;
                    }
                    return Err(e);
                }
            }
        }
        mem.write_u32(out_nread, total as u32)
    }

    pub fn fd_write(&self, mem: &mut GuestMemory, fd: u32, iovs: u32, iovs_len: u32, out_nwritten: u32) -> u16 {
        tracing::trace!(fd, iovs_len, "fd_write");
        to_errno(self.fd_write_inner(mem, fd, iovs, iovs_len, out_nwritten))
    }

    fn fd_write_inner(
        &self,
        mem: &mut GuestMemory,
        fd: u32,
        iovs: u32,
        iovs_len: u32,
        out_nwritten: u32,
    ) -> Result<()> {
        mem.span(out_nwritten, 4)?;
        let iovecs = mem.read_iovecs(iovs, iovs_len)?;
        let table = self.ctx.table();
        let entry = table.get(fd).ok_or(Error::Badf)?;
        require(entry.rights_base(), Rights::FD_WRITE)?;
        let file = entry.as_file()?;

        let mut buffers = Vec::with_capacity(iovecs.len());
        for iov in &iovecs {
            buffers.push(mem.read(iov.offset, iov.length)?.to_vec());
        }

        // Write each iovec individually so a failing iovec still leaves the
        // count of bytes already written by earlier iovecs reported in
        // out_nwritten, alongside the errno of the failing write.
        let mut total = 0usize;
        let mut first_err = None;
        for buf in &buffers {
            let slice = [IoSlice::new(buf)];
            match file.write_vectored(&slice) {
                Ok(n) => {
                    total += n;
                    if n < buf.len() {
                        break;
                    }
                }
                Err(e) => {
                    first_err = Some(e);
                    break;
                }
            }
        }
        mem.write_u32(out_nwritten, total as u32)?;
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn fd_seek(&self, mem: &mut GuestMemory, fd: u32, offset: i64, whence: u8, out_newoffset: u32) -> u16 {
        tracing::debug!(fd, offset, whence, "fd_seek");
        to_errno(self.fd_seek_inner(mem, fd, offset, whence, out_newoffset))
    }

    fn fd_seek_inner(
        &self,
        mem: &mut GuestMemory,
        fd: u32,
        offset: i64,
        whence: u8,
        out_newoffset: u32,
    ) -> Result<()> {
        mem.span(out_newoffset, 8)?;
        let whence = Whence::try_from(whence)?;
        let table = self.ctx.table();
        let entry = table.get(fd).ok_or(Error::Badf)?;
        let wanted = if offset == 0 && whence == Whence::Current {
            Rights::FD_TELL
        } else {
            Rights::FD_SEEK
        };
        require(entry.rights_base(), wanted)?;
        let file = entry.as_file()?;
        let pos = match whence {
            Whence::Start => SeekFrom::Start(offset as u64),
            Whence::Current => SeekFrom::Current(offset),
            Whence::End => SeekFrom::End(offset),
        };
        let new_offset = file.seek(pos)?;
        mem.write_u64(out_newoffset, new_offset)
    }

    pub fn fd_readdir(
        &self,
        mem: &mut GuestMemory,
        fd: u32,
        buf: u32,
        buf_len: u32,
        cookie: u64,
        out_bufused: u32,
    ) -> u16 {
        tracing::debug!(fd, buf_len, cookie, "fd_readdir");
        to_errno(self.fd_readdir_inner(mem, fd, buf, buf_len, cookie, out_bufused))
    }

    fn fd_readdir_inner(
        &self,
        mem: &mut GuestMemory,
        fd: u32,
        buf: u32,
        buf_len: u32,
        cookie: u64,
        out_bufused: u32,
    ) -> Result<()> {
        mem.span(out_bufused, 4)?;
        mem.span(buf, buf_len as usize)?;
        if (buf_len as usize) < DirentHeader::SIZE {
            return Err(Error::Inval);
        }
        let table = self.ctx.table();
        let entry = table.get(fd).ok_or(Error::Badf)?;
        require(entry.rights_base(), Rights::FD_READDIR)?;
        let (dir, cursor_cell) = match entry {
            Entry::Dir {
                dir,
                readdir_cursor,
                ..
            } => (dir.as_ref(), readdir_cursor),
            Entry::File { .. } => return Err(Error::Notdir),
        };
        let cursor = *cursor_cell.borrow();
        if cookie < cursor {
            return Err(Error::Nosys);
        }
        if cookie > cursor {
            return Err(Error::Inval);
        }

        let mut written = 0usize;
        let mut index = cursor;
        let mut truncated = false;
        'page: loop {
            let chunk = dir.read_dir_chunk(index, 10)?;
            if chunk.is_empty() {
                break;
            }
            for entry in &chunk {
                let DirChunkEntry { name, ino, filetype } = entry;
                let remaining = buf_len as usize - written;
                if remaining < DirentHeader::SIZE {
                    truncated = true;
                    break 'page;
                }
                let name_bytes = name.as_bytes();
                let name_room = buf_len as usize - (written + DirentHeader::SIZE);
                let take = name_bytes.len().min(name_room);
                let fully_written = take == name_bytes.len();
                // Only a fully-serialized entry (header + whole name) advances the
                // cursor; a clipped name leaves `index` unchanged so the next call,
                // made with the same cookie, re-emits this entry from scratch.
                let next_cookie = if fully_written { index + 1 } else { index };
                let header = DirentHeader {
                    next_cookie,
                    ino: *ino,
                    name_len: name_bytes.len() as u32,
                    filetype: *filetype,
                };
                mem.write((buf as usize + written) as u32, &header.encode())?;
                written += DirentHeader::SIZE;
                mem.write((buf as usize + written) as u32, &name_bytes[..take])?;
                written += take;
                if !fully_written {
                    truncated = true;
                    break 'page;
                }
                index += 1;
            }
        }
        *cursor_cell.borrow_mut() = index;
        let bufused = if truncated { buf_len as usize } else { written };
        mem.write_u32(out_bufused, bufused as u32)
    }

    pub fn path_open(
        &self,
        mem: &mut GuestMemory,
        dirfd: u32,
        lookupflags: u32,
        path_ptr: u32,
        path_len: u32,
        oflags: u16,
        rights_base: u64,
        rights_inherit: u64,
        fdflags: u16,
        out_fd: u32,
    ) -> u16 {
        tracing::debug!(dirfd, oflags, fdflags, "path_open");
        to_errno(self.path_open_inner(
            mem,
            dirfd,
            lookupflags,
            path_ptr,
            path_len,
            oflags,
            rights_base,
            rights_inherit,
            fdflags,
            out_fd,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn path_open_inner(
        &self,
        mem: &mut GuestMemory,
        dirfd: u32,
        lookupflags: u32,
        path_ptr: u32,
        path_len: u32,
        oflags: u16,
        rights_base: u64,
        rights_inherit: u64,
        fdflags: u16,
        out_fd: u32,
    ) -> Result<()> {
        mem.span(out_fd, 4)?;
        let path = mem.read_path(path_ptr, path_len)?;
        let lookupflags = Lookupflags(lookupflags);
        let oflags = Oflags(oflags);
        let fdflags = Fdflags(fdflags);
        let requested_base = Rights(rights_base);
        let requested_inherit = Rights(rights_inherit);

        let (narrowed_base, narrowed_inherit, parent_base) = if dirfd == DIRFD_NONE || path.starts_with('/') {
            (requested_base, requested_inherit, Rights::all())
        } else {
            let table = self.ctx.table();
            let entry = table.get(dirfd).ok_or(Error::Badf)?;
            require(entry.rights_base(), Rights::PATH_OPEN)?;
            let inheriting = entry.rights_inheriting();
            (
                Rights(requested_base.0 & inheriting.0),
                Rights(requested_inherit.0 & inheriting.0),
                entry.rights_base(),
            )
        };

        let allow_truncate = parent_base.contains(Rights::PATH_FILESTAT_SET_SIZE) && oflags.contains(Oflags::TRUNC);
        let (host_flags, _perm) = rights::wasi_to_open(
            lookupflags,
            oflags,
            narrowed_base,
            narrowed_inherit,
            fdflags,
        );
        let write = narrowed_base.contains(Rights::FD_WRITE) || host_flags.write;

        let opened = if dirfd == DIRFD_NONE || path.starts_with('/') {
            self.ctx.root().open_relative(
                path.trim_start_matches('/'),
                oflags.contains(Oflags::CREAT),
                oflags.contains(Oflags::EXCL),
                allow_truncate,
                oflags.contains(Oflags::DIRECTORY),
                write,
            )?
        } else {
            let table = self.ctx.table();
            let entry = table.get(dirfd).ok_or(Error::Badf)?;
            let dir = entry.as_dir()?;
            dir.open_relative(
                &path,
                oflags.contains(Oflags::CREAT),
                oflags.contains(Oflags::EXCL),
                allow_truncate,
                oflags.contains(Oflags::DIRECTORY),
                write,
            )?
        };

        let new_fd = match opened {
            OpenedRelative::File(file) => self.ctx.table().insert(Entry::File {
                file,
                rights_base: narrowed_base,
                rights_inheriting: narrowed_inherit,
            }),
            OpenedRelative::Dir(dir) => self.ctx.table().insert(Entry::Dir {
                dir,
                rights_base: narrowed_base,
                rights_inheriting: narrowed_inherit,
                preopen_path: None,
                readdir_cursor: std::cell::RefCell::new(0),
            }),
        };
        mem.write_u32(out_fd, new_fd)
    }

    pub fn path_filestat_get(
        &self,
        mem: &mut GuestMemory,
        dirfd: u32,
        lookupflags: u32,
        path_ptr: u32,
        path_len: u32,
        out: u32,
    ) -> u16 {
        tracing::debug!(dirfd, "path_filestat_get");
        to_errno(self.path_filestat_get_inner(mem, dirfd, lookupflags, path_ptr, path_len, out))
    }

    fn path_filestat_get_inner(
        &self,
        mem: &mut GuestMemory,
        dirfd: u32,
        lookupflags: u32,
        path_ptr: u32,
        path_len: u32,
        out: u32,
    ) -> Result<()> {
        mem.span(out, Filestat::SIZE)?;
        let path = mem.read_path(path_ptr, path_len)?;
        let follow = Lookupflags(lookupflags).contains(Lookupflags::SYMLINK_FOLLOW);
        let stat = if dirfd == DIRFD_NONE || path.starts_with('/') {
            self.ctx
                .root()
                .stat_relative(path.trim_start_matches('/'), follow)?
        } else {
            let table = self.ctx.table();
            let entry = table.get(dirfd).ok_or(Error::Badf)?;
            require(entry.rights_base(), Rights::PATH_FILESTAT_GET)?;
            entry.as_dir()?.stat_relative(&path, follow)?
        };
        mem.write(out, &stat.encode())
    }

    pub fn path_create_directory(&self, mem: &mut GuestMemory, dirfd: u32, path_ptr: u32, path_len: u32) -> u16 {
        tracing::debug!(dirfd, "path_create_directory");
        to_errno(self.path_create_directory_inner(mem, dirfd, path_ptr, path_len))
    }

    fn path_create_directory_inner(
        &self,
        mem: &mut GuestMemory,
        dirfd: u32,
        path_ptr: u32,
        path_len: u32,
    ) -> Result<()> {
        let path = mem.read_path(path_ptr, path_len)?;
        if dirfd == DIRFD_NONE || path.starts_with('/') {
            self.ctx.root().make_dir(path.trim_start_matches('/'))
        } else {
            let table = self.ctx.table();
            let entry = table.get(dirfd).ok_or(Error::Badf)?;
            require(entry.rights_base(), Rights::PATH_CREATE_DIRECTORY)?;
            entry.as_dir()?.make_dir(&path)
        }
    }

    pub fn fd_prestat_get(&self, mem: &mut GuestMemory, fd: u32, out: u32) -> u16 {
        tracing::debug!(fd, "fd_prestat_get");
        to_errno(self.fd_prestat_get_inner(mem, fd, out))
    }

    fn fd_prestat_get_inner(&self, mem: &mut GuestMemory, fd: u32, out: u32) -> Result<()> {
        mem.span(out, Prestat::SIZE)?;
        let table = self.ctx.table();
        let entry = table.get(fd).ok_or(Error::Badf)?;
        let path = entry.preopen_path().ok_or(Error::Badf)?;
        let stat = Prestat {
            name_len: path.to_string_lossy().len() as u32,
        };
        mem.write(out, &stat.encode())
    }

    pub fn fd_prestat_dir_name(&self, mem: &mut GuestMemory, fd: u32, ptr: u32, len: u32) -> u16 {
        tracing::debug!(fd, len, "fd_prestat_dir_name");
        to_errno(self.fd_prestat_dir_name_inner(mem, fd, ptr, len))
    }

    fn fd_prestat_dir_name_inner(&self, mem: &mut GuestMemory, fd: u32, ptr: u32, len: u32) -> Result<()> {
        let table = self.ctx.table();
        let entry = table.get(fd).ok_or(Error::Badf)?;
        let path = entry.preopen_path().ok_or(Error::Badf)?;
        let name = path.to_string_lossy();
        if name.len() > len as usize {
            return Err(Error::Inval);
        }
        mem.write(ptr, name.as_bytes())
    }

    // --- Stubbed operations: callable with the right signature, always
    // report not-implemented, never touch guest memory or a handle.

    pub fn fd_advise(&self, _fd: u32, _offset: u64, _len: u64, _advice: u8) -> u16 {
        Errno::Nosys.raw()
    }
    pub fn fd_allocate(&self, _fd: u32, _offset: u64, _len: u64) -> u16 {
        Errno::Nosys.raw()
    }
    pub fn fd_datasync(&self, _fd: u32) -> u16 {
        Errno::Nosys.raw()
    }
    pub fn fd_sync(&self, _fd: u32) -> u16 {
        Errno::Nosys.raw()
    }
    pub fn fd_tell(&self, _fd: u32, _out_offset: u32) -> u16 {
        Errno::Nosys.raw()
    }
    pub fn fd_renumber(&self, _fd: u32, _to: u32) -> u16 {
        Errno::Nosys.raw()
    }
    pub fn fd_fdstat_set_flags(&self, _fd: u32, _flags: u16) -> u16 {
        Errno::Nosys.raw()
    }
    pub fn fd_fdstat_set_rights(&self, _fd: u32, _base: u64, _inherit: u64) -> u16 {
        Errno::Nosys.raw()
    }
    pub fn fd_filestat_set_size(&self, _fd: u32, _size: u64) -> u16 {
        Errno::Nosys.raw()
    }
    pub fn fd_filestat_set_times(&self, _fd: u32, _atim: u64, _mtim: u64, _fstflags: u8) -> u16 {
        Errno::Nosys.raw()
    }
    pub fn fd_pwrite(&self, _fd: u32, _iovs: u32, _iovs_len: u32, _offset: u64, _out_nwritten: u32) -> u16 {
        Errno::Nosys.raw()
    }
    pub fn path_filestat_set_times(
        &self,
        _dirfd: u32,
        _lookupflags: u32,
        _path_ptr: u32,
        _path_len: u32,
        _atim: u64,
        _mtim: u64,
        _fstflags: u8,
    ) -> u16 {
        Errno::Nosys.raw()
    }
    pub fn path_link(
        &self,
        _old_dirfd: u32,
        _old_lookupflags: u32,
        _old_path_ptr: u32,
        _old_path_len: u32,
        _new_dirfd: u32,
        _new_path_ptr: u32,
        _new_path_len: u32,
    ) -> u16 {
        Errno::Nosys.raw()
    }
    pub fn path_readlink(
        &self,
        _dirfd: u32,
        _path_ptr: u32,
        _path_len: u32,
        _buf: u32,
        _buf_len: u32,
        _out_bufused: u32,
    ) -> u16 {
        Errno::Nosys.raw()
    }
    pub fn path_remove_directory(&self, _dirfd: u32, _path_ptr: u32, _path_len: u32) -> u16 {
        Errno::Nosys.raw()
    }
    pub fn path_rename(
        &self,
        _old_dirfd: u32,
        _old_path_ptr: u32,
        _old_path_len: u32,
        _new_dirfd: u32,
        _new_path_ptr: u32,
        _new_path_len: u32,
    ) -> u16 {
        Errno::Nosys.raw()
    }
    pub fn path_symlink(
        &self,
        _old_path_ptr: u32,
        _old_path_len: u32,
        _dirfd: u32,
        _new_path_ptr: u32,
        _new_path_len: u32,
    ) -> u16 {
        Errno::Nosys.raw()
    }
    pub fn path_unlink_file(&self, _dirfd: u32, _path_ptr: u32, _path_len: u32) -> u16 {
        Errno::Nosys.raw()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ctx::{PreopenDir, WasiCtx};
    use std::path::PathBuf;

    fn ctx_with_tempdir() -> (WasiCtx, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = WasiCtx::builder()
            .preopen_dir(PreopenDir {
                host_path: PathBuf::from(dir.path()),
                guest_path: "/".to_string(),
                read_only: false,
            })
            .build()
            .unwrap();
        (ctx, dir)
    }

    // Open a file for writing, write bytes, close it, re-open for
    // reading and read the same bytes back.
    #[test]
    fn s1_write_then_read_round_trip() {
        let (ctx, _dir) = ctx_with_tempdir();
        let disp = Dispatcher::new(&ctx);
        let mut buf = vec![0u8; 256];

        let preopen_fd = 0u32;
        let path = b"hello.txt";
        buf[0..path.len()].copy_from_slice(path);
        let mut mem = GuestMemory::new(&mut buf);

        let rc = disp.path_open(
            &mut mem,
            preopen_fd,
            Lookupflags::SYMLINK_FOLLOW.0,
            0,
            path.len() as u32,
            Oflags::CREAT.0,
            Rights::all().0,
            Rights::all().0,
            0,
            100,
        );
        assert_eq!(rc, Errno::Success.raw());
        let fd = mem.read_u32(100).unwrap();

        let payload = b"hi there";
        let payload_ptr = 16u32;
        mem.write(payload_ptr, payload).unwrap();
        let iov_ptr = 64u32;
        mem.write(iov_ptr, &payload_ptr.to_le_bytes()).unwrap();
        mem.write(iov_ptr + 4, &(payload.len() as u32).to_le_bytes()).unwrap();
        let rc = disp.fd_write(&mut mem, fd, iov_ptr, 1, 120);
        assert_eq!(rc, Errno::Success.raw());
        assert_eq!(mem.read_u32(120).unwrap(), payload.len() as u32);

        assert_eq!(disp.fd_seek(&mut mem, fd, 0, 0, 130), Errno::Success.raw());
        assert_eq!(disp.fd_close(fd), Errno::Success.raw());

        let rc = disp.path_open(&mut mem, preopen_fd, 0, 0, path.len() as u32, 0, Rights::all().0, Rights::all().0, 0, 140);
        assert_eq!(rc, Errno::Success.raw());
        let fd2 = mem.read_u32(140).unwrap();

        let read_buf_ptr = 200u32;
        mem.write(iov_ptr, &read_buf_ptr.to_le_bytes()).unwrap();
        mem.write(iov_ptr + 4, &(payload.len() as u32).to_le_bytes()).unwrap();
        let rc = disp.fd_read(&mut mem, fd2, iov_ptr, 1, 150);
        assert_eq!(rc, Errno::Success.raw());
        assert_eq!(mem.read_u32(150).unwrap(), payload.len() as u32);
        assert_eq!(mem.read(read_buf_ptr, payload.len() as u32).unwrap(), payload);
    }

    // Closing then reopening reuses the lowest free descriptor.
    #[test]
    fn s4_descriptor_reuse_after_close() {
        let (ctx, _dir) = ctx_with_tempdir();
        let fd_a = ctx.table().insert(crate::ctx::Entry::File {
            file: Box::new(crate::fs::stdio::stdout()),
            rights_base: Rights::W,
            rights_inheriting: Rights::W,
        });
        let fd_b = ctx.table().insert(crate::ctx::Entry::File {
            file: Box::new(crate::fs::stdio::stdout()),
            rights_base: Rights::W,
            rights_inheriting: Rights::W,
        });
        assert!(fd_b > fd_a);
        ctx.table().delete(fd_a);
        let fd_c = ctx.table().insert(crate::ctx::Entry::File {
            file: Box::new(crate::fs::stdio::stdout()),
            rights_base: Rights::W,
            rights_inheriting: Rights::W,
        });
        assert_eq!(fd_c, fd_a);
    }

    // fd_close on a preopened directory must fail rather than silently
    // tearing down the mount.
    #[test]
    fn preopen_close_is_rejected() {
        let (ctx, _dir) = ctx_with_tempdir();
        let disp = Dispatcher::new(&ctx);
        assert_eq!(disp.fd_close(0), Errno::Perm.raw());
    }

    #[test]
    fn fd_read_rejects_missing_right() {
        let (ctx, _dir) = ctx_with_tempdir();
        let fd = ctx.table().insert(crate::ctx::Entry::File {
            file: Box::new(crate::fs::stdio::stdout()),
            rights_base: Rights::W,
            rights_inheriting: Rights::W,
        });
        let disp = Dispatcher::new(&ctx);
        let mut buf = vec![0u8; 32];
        let mut mem = GuestMemory::new(&mut buf);
        let rc = disp.fd_read(&mut mem, fd, 0, 0, 16);
        assert_eq!(rc, Errno::Notcapable.raw());
    }

    #[test]
    fn out_of_range_write_target_is_efault() {
        let (ctx, _dir) = ctx_with_tempdir();
        let disp = Dispatcher::new(&ctx);
        let mut buf = vec![0u8; 8];
        let mut mem = GuestMemory::new(&mut buf);
        let rc = disp.fd_fdstat_get(&mut mem, 0, 1000);
        assert_eq!(rc, Errno::Fault.raw());
    }

    #[test]
    fn fd_prestat_reports_the_mount_path() {
        let (ctx, _dir) = ctx_with_tempdir();
        let disp = Dispatcher::new(&ctx);
        let mut buf = vec![0u8; 32];
        let mut mem = GuestMemory::new(&mut buf);
        assert_eq!(disp.fd_prestat_get(&mut mem, 0, 0), Errno::Success.raw());
        let name_len = mem.read_u32(4).unwrap();
        assert_eq!(name_len, "/".len() as u32);
    }

    // A read-only preopen rejects a create|write path_open with EROFS.
    #[test]
    fn s2_read_only_mount_rejects_write_open() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = WasiCtx::builder()
            .preopen_dir(PreopenDir {
                host_path: PathBuf::from(dir.path()),
                guest_path: "/".to_string(),
                read_only: true,
            })
            .build()
            .unwrap();
        let disp = Dispatcher::new(&ctx);
        let mut buf = vec![0u8; 256];
        let path = b"x";
        buf[0..path.len()].copy_from_slice(path);
        let mut mem = GuestMemory::new(&mut buf);
        let rc = disp.path_open(
            &mut mem,
            0,
            Lookupflags::SYMLINK_FOLLOW.0,
            0,
            path.len() as u32,
            Oflags::CREAT.0 | Oflags::TRUNC.0,
            Rights::all().0,
            Rights::all().0,
            0,
            100,
        );
        assert_eq!(rc, Errno::Rofs.raw());
    }

    // Three directory entries paginate across two fd_readdir calls, with
    // the first call's final entry truncated to signal "more available".
    #[test]
    fn s3_readdir_paginates_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), b"").unwrap();
        std::fs::write(dir.path().join("b"), b"").unwrap();
        std::fs::write(dir.path().join("cc"), b"").unwrap();
        let ctx = WasiCtx::builder()
            .preopen_dir(PreopenDir {
                host_path: PathBuf::from(dir.path()),
                guest_path: "/".to_string(),
                read_only: false,
            })
            .build()
            .unwrap();
        let disp = Dispatcher::new(&ctx);

        let mut buf = vec![0u8; 256];
        let mut mem = GuestMemory::new(&mut buf);
        let dirent_buf = 100u32;
        let out_bufused = 4u32;
        let rc = disp.fd_readdir(&mut mem, 0, dirent_buf, 50, 0, out_bufused);
        assert_eq!(rc, Errno::Success.raw());
        let first_bufused = mem.read_u32(out_bufused).unwrap();
        assert_eq!(first_bufused, 50, "buf_len-sized bufused signals more entries remain");

        // Resume from whatever cookie the first call's cursor landed on;
        // the entries are host-ordered, not alphabetical, so read back the
        // cursor rather than hardcoding an entry count.
        let table = ctx.table();
        let cursor = match table.get(0).unwrap() {
            crate::ctx::Entry::Dir { readdir_cursor, .. } => *readdir_cursor.borrow(),
            _ => panic!("expected dir"),
        };
        drop(table);
        let rc = disp.fd_readdir(&mut mem, 0, dirent_buf, 200, cursor, out_bufused);
        assert_eq!(rc, Errno::Success.raw());
        let second_bufused = mem.read_u32(out_bufused).unwrap();
        assert!(
            second_bufused < 200,
            "a buf large enough for the remainder reports less than buf_len, signalling exhaustion"
        );
    }

    // A cookie strictly behind the descriptor's cursor is rejected.
    #[test]
    fn readdir_cookie_behind_cursor_is_nosys() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), b"").unwrap();
        let ctx = WasiCtx::builder()
            .preopen_dir(PreopenDir {
                host_path: PathBuf::from(dir.path()),
                guest_path: "/".to_string(),
                read_only: false,
            })
            .build()
            .unwrap();
        let disp = Dispatcher::new(&ctx);
        let mut buf = vec![0u8; 256];
        let mut mem = GuestMemory::new(&mut buf);
        assert_eq!(disp.fd_readdir(&mut mem, 0, 0, 200, 0, 4), Errno::Success.raw());
        assert_eq!(disp.fd_readdir(&mut mem, 0, 0, 200, 0, 4), Errno::Nosys.raw());
    }

    // A read with iovecs pointing past the end of guest memory faults
    // before any bytes are read, reporting EFAULT and never touching
    // `out_nread`.
    #[test]
    fn s5_out_of_bounds_iovec_is_efault_with_no_partial_read() {
        let (ctx, _dir) = ctx_with_tempdir();
        let disp = Dispatcher::new(&ctx);
        let mut buf = vec![0u8; 64];
        let mut mem = GuestMemory::new(&mut buf);
        let rc = disp.fd_read(&mut mem, 0, 60, 0xFFFF, 4);
        assert_eq!(rc, Errno::Fault.raw());
        assert_eq!(mem.read_u32(4).unwrap(), 0);
    }

    // A child opened under a directory whose inheriting-rights are
    // read-only gets write capability masked out even though the child
    // open request itself asked for RW.
    #[test]
    fn s6_rights_narrow_to_parent_inheriting_rights() {
        let (ctx, dir) = ctx_with_tempdir();
        let disp = Dispatcher::new(&ctx);

        // Re-open the preopen root itself, narrowed to read-only
        // inheriting rights, to stand in for "a directory opened with
        // rights_inherit = R".
        let narrow_dirfd = ctx.table().insert(crate::ctx::Entry::Dir {
            dir: Box::new(crate::fs::ReadOnly::new(
                crate::fs::HostDir::open_ambient(dir.path()).unwrap(),
            )),
            rights_base: Rights::R,
            rights_inheriting: Rights::R,
            preopen_path: None,
            readdir_cursor: std::cell::RefCell::new(0),
        });

        std::fs::write(dir.path().join("child"), b"data").unwrap();
        let mut buf = vec![0u8; 256];
        let path = b"child";
        buf[0..path.len()].copy_from_slice(path);
        let mut mem = GuestMemory::new(&mut buf);
        let rc = disp.path_open(
            &mut mem,
            narrow_dirfd,
            Lookupflags::SYMLINK_FOLLOW.0,
            0,
            path.len() as u32,
            0,
            Rights::RW.0,
            Rights::RW.0,
            0,
            100,
        );
        assert_eq!(rc, Errno::Success.raw());
        let child_fd = mem.read_u32(100).unwrap();
        assert_eq!(ctx.table().get(child_fd).unwrap().rights_base(), Rights::R);

        let rc = disp.fd_write(&mut mem, child_fd, 0, 0, 8);
        assert_eq!(rc, Errno::Notcapable.raw());
    }

    // A final entry whose header fits but whose name is clipped must not
    // advance the stored cursor past it: the next call, made with the
    // cookie the first call reports, has to re-emit that same entry in
    // full rather than skipping it.
    #[test]
    fn readdir_name_truncation_does_not_advance_cursor() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abcdefgh"), b"").unwrap();
        let ctx = WasiCtx::builder()
            .preopen_dir(PreopenDir {
                host_path: PathBuf::from(dir.path()),
                guest_path: "/".to_string(),
                read_only: false,
            })
            .build()
            .unwrap();
        let disp = Dispatcher::new(&ctx);

        let mut buf = vec![0u8; 256];
        let mut mem = GuestMemory::new(&mut buf);
        let dirent_buf = 100u32;
        let out_bufused = 4u32;

        // Header (24 bytes) fits but only 3 of the 8 name bytes do.
        let buf_len = DirentHeader::SIZE as u32 + 3;
        let rc = disp.fd_readdir(&mut mem, 0, dirent_buf, buf_len, 0, out_bufused);
        assert_eq!(rc, Errno::Success.raw());
        assert_eq!(mem.read_u32(out_bufused).unwrap(), buf_len, "clipped name reports bufused == buf_len");

        let table = ctx.table();
        let cursor = match table.get(0).unwrap() {
            crate::ctx::Entry::Dir { readdir_cursor, .. } => *readdir_cursor.borrow(),
            _ => panic!("expected dir"),
        };
        drop(table);
        assert_eq!(cursor, 0, "the clipped entry must not be counted as emitted");

        // Retrying with the same cookie and a large enough buffer must
        // reproduce the full entry rather than reporting it already gone.
        let rc = disp.fd_readdir(&mut mem, 0, dirent_buf, 200, cursor, out_bufused);
        assert_eq!(rc, Errno::Success.raw());
        let bufused = mem.read_u32(out_bufused).unwrap();
        assert_eq!(bufused as usize, DirentHeader::SIZE + "abcdefgh".len());
        assert_eq!(mem.read(dirent_buf + DirentHeader::SIZE as u32, 8).unwrap(), b"abcdefgh");
    }
}
