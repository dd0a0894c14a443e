//! Composes a read-only-or-not base directory plus zero or more named
//! mounts into one rooted namespace, resolving paths by longest-prefix
//! mount match.

use super::{DirChunkEntry, OpenedRelative, ReadOnly, WasiDir, WasiHandle};
use crate::wire::Filestat;
use crate::{Error, Result};

struct Mount {
    /// Cleaned path components the mount was registered under; empty for a
    /// mount at `.`, which replaces the base entirely.
    components: Vec<String>,
    fs: Box<dyn WasiDir>,
}

/// A single rooted namespace assembled from a base directory and any
/// number of named mounts.
pub struct Overlay {
    base: Box<dyn WasiDir>,
    mounts: Vec<Mount>,
}

/// Splits a guest path into cleaned components, collapsing `.` segments
/// and rejecting any `..` that would climb above the overlay root.
fn clean(path: &str) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                if out.pop().is_none() {
                    return Err(Error::Inval);
                }
            }
            s => out.push(s.to_string()),
        }
    }
    Ok(out)
}

impl Overlay {
    pub fn new(base: Box<dyn WasiDir>) -> Self {
        Overlay {
            base,
            mounts: Vec::new(),
        }
    }

    /// Registers `fs` under `guest_path`. A `guest_path` of `.` or `/`
    /// replaces the base directory entirely rather than nesting under it.
    pub fn mount(&mut self, guest_path: &str, fs: Box<dyn WasiDir>, read_only: bool) -> Result<()> {
        let components = clean(guest_path)?;
        let fs: Box<dyn WasiDir> = if read_only {
            Box::new(ReadOnly::new(fs))
        } else {
            fs
        };
        if components.is_empty() {
            self.base = fs;
            return Ok(());
        }
        self.mounts.push(Mount { components, fs });
        Ok(())
    }

    /// Finds the mount whose registered path is the longest proper prefix
    /// of `components`, returning it plus the residual path under it. Falls
    /// back to the base directory and the full cleaned path when no mount
    /// matches.
    fn resolve<'a>(&'a self, components: &'a [String]) -> (&'a dyn WasiDir, String) {
        let mut best: Option<&Mount> = None;
        for mount in &self.mounts {
            if mount.components.len() <= components.len()
                && components[..mount.components.len()] == mount.components[..]
            {
                if best.map_or(true, |b| mount.components.len() > b.components.len()) {
                    best = Some(mount);
                }
            }
        }
        match best {
            Some(mount) => {
                let residual = components[mount.components.len()..].join("/");
                (mount.fs.as_ref(), residual)
            }
            None => (self.base.as_ref(), components.join("/")),
        }
    }
}

impl WasiHandle for Overlay {
    fn display_name(&self) -> String {
        "overlay-root".to_string()
    }
}

impl WasiDir for Overlay {
    fn filestat(&self) -> Result<Filestat> {
        self.base.filestat()
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
        let components = clean(path)?;
        let (target, residual) = self.resolve(&components);
        target.open_relative(&residual, create, excl, truncate, directory, write)
    }

    fn stat_relative(&self, path: &str, follow: bool) -> Result<Filestat> {
        let components = clean(path)?;
        let (target, residual) = self.resolve(&components);
        target.stat_relative(&residual, follow)
    }

    fn make_dir(&self, path: &str) -> Result<()> {
        let components = clean(path)?;
        let (target, residual) = self.resolve(&components);
        target.make_dir(&residual)
    }

    fn read_dir_chunk(&self, start_index: u64, max_entries: usize) -> Result<Vec<DirChunkEntry>> {
        self.base.read_dir_chunk(start_index, max_entries)
    }

    fn unlink_file(&self, path: &str) -> Result<()> {
        let components = clean(path)?;
        let (target, residual) = self.resolve(&components);
        target.unlink_file(&residual)
    }

    fn remove_dir(&self, path: &str) -> Result<()> {
        let components = clean(path)?;
        let (target, residual) = self.resolve(&components);
        target.remove_dir(&residual)
    }

    fn rename(&self, old_path: &str, new_path: &str) -> Result<()> {
        let old_components = clean(old_path)?;
        let new_components = clean(new_path)?;
        let (old_target, old_residual) = self.resolve(&old_components);
        let (new_target, new_residual) = self.resolve(&new_components);
        if !std::ptr::eq(old_target, new_target) {
            return Err(Error::Nosys);
        }
        old_target.rename(&old_residual, &new_residual)
    }

    fn symlink(&self, old_path: &str, new_path: &str) -> Result<()> {
        let components = clean(new_path)?;
        let (target, residual) = self.resolve(&components);
        target.symlink(old_path, &residual)
    }

    fn readlink(&self, path: &str) -> Result<String> {
        let components = clean(path)?;
        let (target, residual) = self.resolve(&components);
        target.readlink(&residual)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wire::Filetype;

    struct StubDir {
        name: &'static str,
    }
    impl WasiHandle for StubDir {
        fn display_name(&self) -> String {
            self.name.to_string()
        }
    }
    impl WasiDir for StubDir {
        fn filestat(&self) -> Result<Filestat> {
            Err(Error::Nosys)
        }
        fn open_relative(
            &self,
            _path: &str,
            _create: bool,
            _excl: bool,
            _truncate: bool,
            _directory: bool,
            _write: bool,
        ) -> Result<OpenedRelative> {
            Err(Error::Noent)
        }
        fn stat_relative(&self, path: &str, _follow: bool) -> Result<Filestat> {
            if path == "marker" {
                Ok(Filestat {
                    dev: 0,
                    ino: 0,
                    filetype: Filetype::RegularFile,
                    nlink: 1,
                    size: 0,
                    atim_ns: 0,
                    mtim_ns: 0,
                    ctim_ns: 0,
                })
            } else {
                Err(Error::Noent)
            }
        }
        fn make_dir(&self, _path: &str) -> Result<()> {
            Ok(())
        }
        fn read_dir_chunk(&self, _start_index: u64, _max_entries: usize) -> Result<Vec<DirChunkEntry>> {
            Ok(Vec::new())
        }
    }

    fn overlay_with_mount() -> Overlay {
        let mut ov = Overlay::new(Box::new(StubDir { name: "base" }));
        ov.mount("data", Box::new(StubDir { name: "data-mount" }), false)
            .unwrap();
        ov
    }

    #[test]
    fn resolves_to_mount_for_matching_prefix() {
        let ov = overlay_with_mount();
        assert!(ov.stat_relative("data/marker", true).is_ok());
    }

    #[test]
    fn resolves_to_base_for_unrelated_path() {
        let ov = overlay_with_mount();
        assert!(ov.stat_relative("marker", true).is_ok());
        assert!(ov.stat_relative("other/marker", true).is_err());
    }

    #[test]
    fn dotdot_above_root_is_einval() {
        assert!(matches!(clean("../escape"), Err(Error::Inval)));
    }

    #[test]
    fn repeated_separators_collapse() {
        assert_eq!(clean("a//b///c").unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn absolute_and_relative_paths_normalize_identically() {
        assert_eq!(clean("/a/b").unwrap(), clean("a/b").unwrap());
    }

    #[test]
    fn dot_mount_replaces_base() {
        let mut ov = Overlay::new(Box::new(StubDir { name: "base" }));
        ov.mount(".", Box::new(StubDir { name: "replacement" }), false)
            .unwrap();
        assert_eq!(ov.base.display_name(), "replacement");
    }

    #[test]
    fn longest_prefix_wins_over_shorter_mount() {
        let mut ov = Overlay::new(Box::new(StubDir { name: "base" }));
        ov.mount("a", Box::new(StubDir { name: "shallow" }), false)
            .unwrap();
        ov.mount("a/b", Box::new(StubDir { name: "deep" }), false)
            .unwrap();
        let components = clean("a/b/marker").unwrap();
        let (target, residual) = ov.resolve(&components);
        assert_eq!(target.display_name(), "deep");
        assert_eq!(residual, "marker");
    }
}
