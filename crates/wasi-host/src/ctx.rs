//! The context: owns the descriptor table and the mounted file system,
//! and is the core's configuration surface (`WasiCtxBuilder`).

use crate::fs::{stdio, HostDir, Overlay, WasiDir, WasiFile};
use crate::table::DescriptorTable;
use crate::wire::Rights;
use crate::{Error, Result};
use std::cell::RefCell;
use std::path::{Path, PathBuf};

/// A single descriptor-table slot: either an open file or an open
/// directory, each carrying the narrowed rights it was opened with.
pub enum Entry {
    File {
        file: Box<dyn WasiFile>,
        rights_base: Rights,
        rights_inheriting: Rights,
    },
    Dir {
        dir: Box<dyn WasiDir>,
        rights_base: Rights,
        rights_inheriting: Rights,
        preopen_path: Option<PathBuf>,
        /// Stable index into the directory's entry stream consumed by the
        /// last `fd_readdir` call at this descriptor, used to translate
        /// WASI's opaque cookie into `WasiDir::read_dir_chunk`'s
        /// start-index argument.
        readdir_cursor: RefCell<u64>,
    },
}

impl Entry {
    pub fn rights_base(&self) -> Rights {
        match self {
            Entry::File { rights_base, .. } => *rights_base,
            Entry::Dir { rights_base, .. } => *rights_base,
        }
    }

    pub fn rights_inheriting(&self) -> Rights {
        match self {
            Entry::File {
                rights_inheriting, ..
            } => *rights_inheriting,
            Entry::Dir {
                rights_inheriting, ..
            } => *rights_inheriting,
        }
    }

    pub fn as_file(&self) -> Result<&dyn WasiFile> {
        match self {
            Entry::File { file, .. } => Ok(file.as_ref()),
            Entry::Dir { .. } => Err(Error::Badf),
        }
    }

    pub fn as_dir(&self) -> Result<&dyn WasiDir> {
        match self {
            Entry::Dir { dir, .. } => Ok(dir.as_ref()),
            Entry::File { .. } => Err(Error::Badf),
        }
    }

    pub fn is_preopen(&self) -> bool {
        matches!(
            self,
            Entry::Dir {
                preopen_path: Some(_),
                ..
            }
        )
    }

    pub fn preopen_path(&self) -> Option<&Path> {
        match self {
            Entry::Dir {
                preopen_path: Some(p),
                ..
            } => Some(p.as_path()),
            _ => None,
        }
    }
}

/// A single `--dir host[:guest[:ro]]`-style mount request, independent of
/// how it was parsed.
pub struct PreopenDir {
    pub host_path: PathBuf,
    pub guest_path: String,
    pub read_only: bool,
}

pub struct WasiCtx {
    args: Vec<String>,
    env: Vec<String>,
    table: RefCell<DescriptorTable<Entry>>,
    /// The composed namespace used to resolve `path_open`/`path_filestat_get`
    /// calls made with `dirfd = NONE` or an absolute path. Per-preopen
    /// descriptors below resolve relative paths against their own
    /// directory handle instead, without going back through this overlay.
    root: Box<dyn WasiDir>,
}

impl WasiCtx {
    pub fn builder() -> WasiCtxBuilder {
        WasiCtxBuilder {
            args: Vec::new(),
            env: Vec::new(),
            preopens: Vec::new(),
            inherit_stdio: false,
        }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn env(&self) -> &[String] {
        &self.env
    }

    pub fn table(&self) -> std::cell::RefMut<'_, DescriptorTable<Entry>> {
        self.table.borrow_mut()
    }

    pub fn root(&self) -> &dyn WasiDir {
        self.root.as_ref()
    }

    pub fn insert_file(&self, file: Box<dyn WasiFile>, rights_base: Rights, rights_inheriting: Rights) -> u32 {
        self.table().insert(Entry::File {
            file,
            rights_base,
            rights_inheriting,
        })
    }

    fn insert_at(&self, fd: u32, entry: Entry) {
        self.table().insert_at(fd, entry);
    }

    /// Closes every open handle, continuing past individual close failures,
    /// then clears the table entirely. Returns the last non-null error seen,
    /// if any.
    pub fn teardown(&self) -> Result<()> {
        let mut last_err = None;
        self.table.borrow().scan(|_fd, entry| {
            let result = match entry {
                Entry::File { file, .. } => file.close(),
                Entry::Dir { dir, .. } => dir.close(),
            };
            if let Err(e) = result {
                last_err = Some(e);
            }
            true
        });
        self.table.borrow_mut().reset();
        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

pub struct WasiCtxBuilder {
    args: Vec<String>,
    env: Vec<String>,
    preopens: Vec<PreopenDir>,
    inherit_stdio: bool,
}

impl WasiCtxBuilder {
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push(format!("{key}={value}"));
        self
    }

    pub fn inherit_stdio(mut self) -> Self {
        self.inherit_stdio = true;
        self
    }

    pub fn preopen_dir(mut self, preopen: PreopenDir) -> Self {
        self.preopens.push(preopen);
        self
    }

    /// Assembles the overlay from every registered preopen (base = the
    /// first preopen registered at guest path `.` or `/`, if any, else an
    /// overlay with no base entries reachable outside named mounts), opens
    /// each host directory, and returns the built context alongside the
    /// fd each preopen landed at (in registration order), matching
    /// `fd_prestat_get`'s expectation that preopens occupy a contiguous,
    /// known range of low descriptors.
    pub fn build(self) -> Result<WasiCtx> {
        let mut base: Option<Box<dyn WasiDir>> = None;
        let mut mounts: Vec<(String, Box<dyn WasiDir>, bool)> = Vec::new();
        for preopen in &self.preopens {
            let guest = preopen.guest_path.trim_start_matches('/');
            let dir = HostDir::open_ambient(&preopen.host_path)?;
            if guest.is_empty() || guest == "." {
                base = Some(if preopen.read_only {
                    Box::new(crate::fs::ReadOnly::new(dir))
                } else {
                    Box::new(dir)
                });
            } else {
                mounts.push((guest.to_string(), Box::new(dir), preopen.read_only));
            }
        }
        let base = base.unwrap_or_else(|| Box::new(EmptyRootDir) as Box<dyn WasiDir>);
        let mut overlay = Overlay::new(base);
        for (guest, dir, read_only) in mounts {
            overlay.mount(&guest, dir, read_only)?;
        }

        let ctx = WasiCtx {
            args: self.args,
            env: self.env,
            table: RefCell::new(DescriptorTable::new()),
            root: Box::new(overlay),
        };

        if self.inherit_stdio {
            ctx.insert_at(
                0,
                Entry::File {
                    file: Box::new(stdio::stdin()),
                    rights_base: Rights::R,
                    rights_inheriting: Rights::R,
                },
            );
            ctx.insert_at(
                1,
                Entry::File {
                    file: Box::new(stdio::stdout()),
                    rights_base: Rights::W,
                    rights_inheriting: Rights::W,
                },
            );
            ctx.insert_at(
                2,
                Entry::File {
                    file: Box::new(stdio::stderr()),
                    rights_base: Rights::W,
                    rights_inheriting: Rights::W,
                },
            );
        }

        // Every preopen gets its own fresh directory handle (independent of
        // whatever went into the overlay above) so that path resolution
        // through the preopen's own fd never re-enters the overlay's mount
        // matching — it is already rooted exactly where the preopen says.
        for preopen in &self.preopens {
            let dir = HostDir::open_ambient(&preopen.host_path)?;
            let dir: Box<dyn WasiDir> = if preopen.read_only {
                Box::new(crate::fs::ReadOnly::new(dir))
            } else {
                Box::new(dir)
            };
            let rights_base = if preopen.read_only {
                Rights::BASE | Rights::R
            } else {
                Rights::BASE | Rights::RW
            };
            let fd = ctx.table().insert(Entry::Dir {
                dir,
                rights_base,
                rights_inheriting: rights_base,
                preopen_path: Some(PathBuf::from(&preopen.guest_path)),
                readdir_cursor: RefCell::new(0),
            });
            tracing::debug!(fd, path = %preopen.guest_path, "registered preopen");
        }

        Ok(ctx)
    }
}

/// Placeholder root used only until an actual base/mount directory is
/// registered; every operation fails with `ENOTDIR` rather than panicking.
struct EmptyRootDir;

impl crate::fs::WasiHandle for EmptyRootDir {
    fn display_name(&self) -> String {
        "empty-root".to_string()
    }
}

impl WasiDir for EmptyRootDir {
    fn filestat(&self) -> Result<crate::wire::Filestat> {
        Err(Error::Notdir)
    }
    fn open_relative(
        &self,
        _path: &str,
        _create: bool,
        _excl: bool,
        _truncate: bool,
        _directory: bool,
        _write: bool,
    ) -> Result<crate::fs::OpenedRelative> {
        Err(Error::Noent)
    }
    fn stat_relative(&self, _path: &str, _follow: bool) -> Result<crate::wire::Filestat> {
        Err(Error::Noent)
    }
    fn make_dir(&self, _path: &str) -> Result<()> {
        Err(Error::Notdir)
    }
    fn read_dir_chunk(
        &self,
        _start_index: u64,
        _max_entries: usize,
    ) -> Result<Vec<crate::fs::DirChunkEntry>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn inherit_stdio_registers_fixed_descriptors() {
        let ctx = WasiCtx::builder().inherit_stdio().build().unwrap();
        let table = ctx.table();
        assert!(table.contains_key(0));
        assert!(table.contains_key(1));
        assert!(table.contains_key(2));
    }

    #[test]
    fn args_and_env_are_preserved() {
        let ctx = WasiCtx::builder()
            .arg("prog")
            .arg("--flag")
            .env("KEY", "value")
            .build()
            .unwrap();
        assert_eq!(ctx.args(), &["prog", "--flag"]);
        assert_eq!(ctx.env(), &["KEY=value"]);
    }

    #[test]
    fn teardown_closes_every_handle_and_clears_the_table() {
        let ctx = WasiCtx::builder().inherit_stdio().build().unwrap();
        assert_eq!(ctx.table().len(), 3);
        assert!(ctx.teardown().is_ok());
        assert_eq!(ctx.table().len(), 0);
        assert!(!ctx.table().contains_key(0));
    }

    #[test]
    fn teardown_reports_last_close_error_but_still_clears_state() {
        use crate::fs::{WasiFile, WasiHandle};
        use crate::wire::Filestat;

        struct FailOnClose;
        impl WasiHandle for FailOnClose {
            fn display_name(&self) -> String {
                "fail-on-close".to_string()
            }
            fn close(&self) -> Result<()> {
                Err(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom")))
            }
        }
        impl WasiFile for FailOnClose {
            fn filetype(&self) -> Result<crate::wire::Filetype> {
                Ok(crate::wire::Filetype::RegularFile)
            }
            fn filestat(&self) -> Result<Filestat> {
                Err(Error::Nosys)
            }
            fn read_vectored(&self, _bufs: &mut [std::io::IoSliceMut<'_>]) -> Result<usize> {
                Ok(0)
            }
            fn read_vectored_at(&self, _bufs: &mut [std::io::IoSliceMut<'_>], _offset: u64) -> Result<usize> {
                Ok(0)
            }
            fn write_vectored(&self, _bufs: &[std::io::IoSlice<'_>]) -> Result<usize> {
                Ok(0)
            }
            fn seek(&self, _pos: std::io::SeekFrom) -> Result<u64> {
                Ok(0)
            }
        }

        let ctx = WasiCtx::builder().build().unwrap();
        ctx.table().insert(Entry::File {
            file: Box::new(FailOnClose),
            rights_base: Rights::RW,
            rights_inheriting: Rights::RW,
        });
        assert!(matches!(ctx.teardown(), Err(Error::Io(_))));
        assert_eq!(ctx.table().len(), 0);
    }
}
