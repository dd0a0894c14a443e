//! `WasiFile` wrappers over the process's own stdio streams, used to
//! populate descriptors 0/1/2 when a context inherits them.

use super::WasiHandle;
use crate::wire::{Filestat, Filetype};
use crate::{Error, Result};
use std::io::{IoSlice, IoSliceMut, SeekFrom, Write};

fn char_device_stat() -> Filestat {
    Filestat {
        dev: 0,
        ino: 0,
        filetype: Filetype::CharacterDevice,
        nlink: 1,
        size: 0,
        atim_ns: 0,
        mtim_ns: 0,
        ctim_ns: 0,
    }
}

pub struct Stdin(std::io::Stdin);

pub fn stdin() -> Stdin {
    Stdin(std::io::stdin())
}

impl WasiHandle for Stdin {
    fn display_name(&self) -> String {
        "stdin".to_string()
    }
}

impl super::WasiFile for Stdin {
    fn filetype(&self) -> Result<Filetype> {
        Ok(Filetype::CharacterDevice)
    }
    fn filestat(&self) -> Result<Filestat> {
        Ok(char_device_stat())
    }
    fn read_vectored(&self, bufs: &mut [IoSliceMut<'_>]) -> Result<usize> {
        use std::io::Read;
        (&self.0).read_vectored(bufs).map_err(|e| Error::from(e.kind()))
    }
    fn read_vectored_at(&self, _bufs: &mut [IoSliceMut<'_>], _offset: u64) -> Result<usize> {
        Err(Error::Nosys)
    }
    fn write_vectored(&self, _bufs: &[IoSlice<'_>]) -> Result<usize> {
        Err(Error::Inval)
    }
    fn seek(&self, _pos: SeekFrom) -> Result<u64> {
        Err(Error::Inval)
    }
    fn datasync(&self) -> Result<()> {
        Ok(())
    }
    fn sync(&self) -> Result<()> {
        Ok(())
    }
}

pub struct Stdout(std::io::Stdout);

pub fn stdout() -> Stdout {
    Stdout(std::io::stdout())
}

impl WasiHandle for Stdout {
    fn display_name(&self) -> String {
        "stdout".to_string()
    }
}

impl super::WasiFile for Stdout {
    fn filetype(&self) -> Result<Filetype> {
        Ok(Filetype::CharacterDevice)
    }
    fn filestat(&self) -> Result<Filestat> {
        Ok(char_device_stat())
    }
    fn read_vectored(&self, _bufs: &mut [IoSliceMut<'_>]) -> Result<usize> {
        Err(Error::Inval)
    }
    fn read_vectored_at(&self, _bufs: &mut [IoSliceMut<'_>], _offset: u64) -> Result<usize> {
        Err(Error::Inval)
    }
    fn write_vectored(&self, bufs: &[IoSlice<'_>]) -> Result<usize> {
        self.0.lock().write_vectored(bufs).map_err(|e| Error::from(e.kind()))
    }
    fn seek(&self, _pos: SeekFrom) -> Result<u64> {
        Err(Error::Inval)
    }
    fn datasync(&self) -> Result<()> {
        Ok(())
    }
    fn sync(&self) -> Result<()> {
        Ok(())
    }
}

pub struct Stderr(std::io::Stderr);

pub fn stderr() -> Stderr {
    Stderr(std::io::stderr())
}

impl WasiHandle for Stderr {
    fn display_name(&self) -> String {
        "stderr".to_string()
    }
}

impl super::WasiFile for Stderr {
    fn filetype(&self) -> Result<Filetype> {
        Ok(Filetype::CharacterDevice)
    }
    fn filestat(&self) -> Result<Filestat> {
        Ok(char_device_stat())
    }
    fn read_vectored(&self, _bufs: &mut [IoSliceMut<'_>]) -> Result<usize> {
        Err(Error::Inval)
    }
    fn read_vectored_at(&self, _bufs: &mut [IoSliceMut<'_>], _offset: u64) -> Result<usize> {
        Err(Error::Inval)
    }
    fn write_vectored(&self, bufs: &[IoSlice<'_>]) -> Result<usize> {
        self.0.lock().write_vectored(bufs).map_err(|e| Error::from(e.kind()))
    }
    fn seek(&self, _pos: SeekFrom) -> Result<u64> {
        Err(Error::Inval)
    }
    fn datasync(&self) -> Result<()> {
        Ok(())
    }
    fn sync(&self) -> Result<()> {
        Ok(())
    }
}
