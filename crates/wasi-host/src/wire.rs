//! Bit-exact wire structures and enumerations for the WASI `snapshot_preview1`
//! ABI. Every multi-byte field here is little-endian on the wire; the host's
//! native endianness is irrelevant because all encoding/decoding goes through
//! explicit `to_le_bytes`/`from_le_bytes`.

/// Numeric error codes returned from every dispatcher call. Discriminants are
/// pinned explicitly rather than left to enum ordinal counting, because a
/// handful of them (`nosys`, `notsup`) are swapped relative to the upstream
/// CloudABI/WASI numbering in order to match the fixed assignments this
/// implementation is required to produce.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Errno {
    Success = 0,
    Toobig = 1,
    Acces = 2,
    Addrinuse = 3,
    Addrnotavail = 4,
    Afnosupport = 5,
    Again = 6,
    Already = 7,
    Badf = 8,
    Badmsg = 9,
    Busy = 10,
    Canceled = 11,
    Child = 12,
    Connaborted = 13,
    Connrefused = 14,
    Connreset = 15,
    Deadlk = 16,
    Destaddrreq = 17,
    Dom = 18,
    Dquot = 19,
    Exist = 20,
    Fault = 21,
    Fbig = 22,
    Hostunreach = 23,
    Idrm = 24,
    Ilseq = 25,
    Inprogress = 26,
    Intr = 27,
    Inval = 28,
    Io = 29,
    Isconn = 30,
    Isdir = 31,
    Loop = 32,
    Mfile = 33,
    Mlink = 34,
    Msgsize = 35,
    Multihop = 36,
    Nametoolong = 37,
    Netdown = 38,
    Netreset = 39,
    Netunreach = 40,
    Nfile = 41,
    Nobufs = 42,
    Nodev = 43,
    Noent = 44,
    Noexec = 45,
    Nolck = 46,
    Nolink = 47,
    Nomem = 48,
    Nomsg = 49,
    Noprotoopt = 50,
    Nospc = 51,
    Notsup = 52,
    Notconn = 53,
    Notdir = 54,
    Notempty = 55,
    Notrecoverable = 56,
    Notsock = 57,
    Nosys = 58,
    Notty = 59,
    Nxio = 60,
    Overflow = 61,
    Ownerdead = 62,
    Perm = 63,
    Pipe = 64,
    Proto = 65,
    Protonosupport = 66,
    Prototype = 67,
    Range = 68,
    Rofs = 69,
    Spipe = 70,
    Srch = 71,
    Stale = 72,
    Timedout = 73,
    Txtbsy = 74,
    Xdev = 75,
    Notcapable = 76,
}

impl Errno {
    pub fn raw(self) -> u16 {
        self as u16
    }
}

/// WASI filetype tag, shared by `Filestat`, `Fdstat` and `Dirent`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filetype {
    Unknown = 0,
    BlockDevice = 1,
    CharacterDevice = 2,
    Directory = 3,
    RegularFile = 4,
    SocketDgram = 5,
    SocketStream = 6,
    SymbolicLink = 7,
}

impl Filetype {
    pub fn from_std(ft: std::fs::FileType) -> Self {
        if ft.is_dir() {
            Filetype::Directory
        } else if ft.is_symlink() {
            Filetype::SymbolicLink
        } else if ft.is_file() {
            Filetype::RegularFile
        } else {
            Filetype::Unknown
        }
    }
}

/// `fd_seek` whence values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

impl TryFrom<u8> for Whence {
    type Error = crate::Error;
    fn try_from(v: u8) -> crate::Result<Self> {
        match v {
            0 => Ok(Whence::Start),
            1 => Ok(Whence::Current),
            2 => Ok(Whence::End),
            _ => Err(crate::Error::Inval),
        }
    }
}

macro_rules! flag_set {
    ($name:ident : $repr:ty) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name(pub $repr);

        impl $name {
            pub const fn empty() -> Self {
                $name(0)
            }
            pub fn contains(&self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }
            pub fn intersect(&self, other: Self) -> Self {
                $name(self.0 & other.0)
            }
            pub fn is_empty(&self) -> bool {
                self.0 == 0
            }
        }

        impl std::ops::BitOr for $name {
            type Output = $name;
            fn bitor(self, rhs: $name) -> $name {
                $name(self.0 | rhs.0)
            }
        }

        impl std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: $name) {
                self.0 |= rhs.0;
            }
        }
    };
}

flag_set!(Oflags: u16);
impl Oflags {
    pub const CREAT: Oflags = Oflags(1 << 0);
    pub const DIRECTORY: Oflags = Oflags(1 << 1);
    pub const EXCL: Oflags = Oflags(1 << 2);
    pub const TRUNC: Oflags = Oflags(1 << 3);
}

flag_set!(Fdflags: u16);
impl Fdflags {
    pub const APPEND: Fdflags = Fdflags(1 << 0);
    pub const DSYNC: Fdflags = Fdflags(1 << 1);
    pub const NONBLOCK: Fdflags = Fdflags(1 << 2);
    pub const RSYNC: Fdflags = Fdflags(1 << 3);
    pub const SYNC: Fdflags = Fdflags(1 << 4);
}

flag_set!(Lookupflags: u32);
impl Lookupflags {
    pub const SYMLINK_FOLLOW: Lookupflags = Lookupflags(1 << 0);
}

flag_set!(Fstflags: u8);
impl Fstflags {
    pub const ATIM: Fstflags = Fstflags(1 << 0);
    pub const ATIM_NOW: Fstflags = Fstflags(1 << 1);
    pub const MTIM: Fstflags = Fstflags(1 << 2);
    pub const MTIM_NOW: Fstflags = Fstflags(1 << 3);
}

flag_set!(Rights: u64);
impl Rights {
    pub const FD_DATASYNC: Rights = Rights(1 << 0);
    pub const FD_READ: Rights = Rights(1 << 1);
    pub const FD_SEEK: Rights = Rights(1 << 2);
    pub const FD_FDSTAT_SET_FLAGS: Rights = Rights(1 << 3);
    pub const FD_SYNC: Rights = Rights(1 << 4);
    pub const FD_TELL: Rights = Rights(1 << 5);
    pub const FD_WRITE: Rights = Rights(1 << 6);
    pub const FD_ADVISE: Rights = Rights(1 << 7);
    pub const FD_ALLOCATE: Rights = Rights(1 << 8);
    pub const PATH_CREATE_DIRECTORY: Rights = Rights(1 << 9);
    pub const PATH_CREATE_FILE: Rights = Rights(1 << 10);
    pub const PATH_LINK_SOURCE: Rights = Rights(1 << 11);
    pub const PATH_LINK_TARGET: Rights = Rights(1 << 12);
    pub const PATH_OPEN: Rights = Rights(1 << 13);
    pub const FD_READDIR: Rights = Rights(1 << 14);
    pub const PATH_READLINK: Rights = Rights(1 << 15);
    pub const PATH_RENAME_SOURCE: Rights = Rights(1 << 16);
    pub const PATH_RENAME_TARGET: Rights = Rights(1 << 17);
    pub const PATH_FILESTAT_GET: Rights = Rights(1 << 18);
    pub const PATH_FILESTAT_SET_SIZE: Rights = Rights(1 << 19);
    pub const PATH_FILESTAT_SET_TIMES: Rights = Rights(1 << 20);
    pub const FD_FILESTAT_GET: Rights = Rights(1 << 21);
    pub const FD_FILESTAT_SET_SIZE: Rights = Rights(1 << 22);
    pub const FD_FILESTAT_SET_TIMES: Rights = Rights(1 << 23);
    pub const PATH_SYMLINK: Rights = Rights(1 << 24);
    pub const PATH_REMOVE_DIRECTORY: Rights = Rights(1 << 25);
    pub const PATH_UNLINK_FILE: Rights = Rights(1 << 26);
    pub const POLL_FD_READWRITE: Rights = Rights(1 << 27);
    pub const SOCK_SHUTDOWN: Rights = Rights(1 << 28);

    /// Rights held by every open descriptor regardless of kind.
    pub const BASE: Rights = Rights(
        Self::FD_SEEK.0
            | Self::FD_TELL.0
            | Self::FD_FDSTAT_SET_FLAGS.0
            | Self::PATH_OPEN.0
            | Self::PATH_CREATE_DIRECTORY.0
            | Self::PATH_FILESTAT_GET.0
            | Self::PATH_FILESTAT_SET_SIZE.0
            | Self::PATH_FILESTAT_SET_TIMES.0
            | Self::FD_FILESTAT_GET.0,
    );
    /// `BASE` plus read capability.
    pub const R: Rights = Rights(Self::BASE.0 | Self::FD_READ.0 | Self::FD_READDIR.0);
    /// `BASE` plus write capability.
    pub const W: Rights = Rights(
        Self::BASE.0 | Self::FD_WRITE.0 | Self::FD_FILESTAT_SET_SIZE.0 | Self::FD_FILESTAT_SET_TIMES.0,
    );
    /// Union of `R` and `W`.
    pub const RW: Rights = Rights(Self::R.0 | Self::W.0);

    pub fn all() -> Rights {
        Self::RW
            | Self::FD_DATASYNC
            | Self::FD_SYNC
            | Self::FD_ADVISE
            | Self::FD_ALLOCATE
            | Self::PATH_CREATE_FILE
            | Self::PATH_LINK_SOURCE
            | Self::PATH_LINK_TARGET
            | Self::PATH_READLINK
            | Self::PATH_RENAME_SOURCE
            | Self::PATH_RENAME_TARGET
            | Self::PATH_SYMLINK
            | Self::PATH_REMOVE_DIRECTORY
            | Self::PATH_UNLINK_FILE
            | Self::POLL_FD_READWRITE
            | Self::SOCK_SHUTDOWN
    }
}

/// Scatter/gather entry: 8 bytes, `offset(u32) ∥ length(u32)`.
#[derive(Debug, Clone, Copy)]
pub struct Iovec {
    pub offset: u32,
    pub length: u32,
}

impl Iovec {
    pub const SIZE: usize = 8;

    pub fn decode(bytes: &[u8]) -> Self {
        debug_assert_eq!(bytes.len(), Self::SIZE);
        Iovec {
            offset: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            length: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
        }
    }
}

/// File-descriptor statistics: 24 bytes.
#[derive(Debug, Clone, Copy)]
pub struct Fdstat {
    pub filetype: Filetype,
    pub flags: Fdflags,
    pub rights_base: Rights,
    pub rights_inheriting: Rights,
}

impl Fdstat {
    pub const SIZE: usize = 24;

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0] = self.filetype as u8;
        out[1] = 0;
        out[2..4].copy_from_slice(&self.flags.0.to_le_bytes());
        out[4..8].copy_from_slice(&[0u8; 4]);
        out[8..16].copy_from_slice(&self.rights_base.0.to_le_bytes());
        out[16..24].copy_from_slice(&self.rights_inheriting.0.to_le_bytes());
        out
    }
}

/// File statistics: 64 bytes.
#[derive(Debug, Clone, Copy)]
pub struct Filestat {
    pub dev: u64,
    pub ino: u64,
    pub filetype: Filetype,
    pub nlink: u64,
    pub size: u64,
    pub atim_ns: u64,
    pub mtim_ns: u64,
    pub ctim_ns: u64,
}

impl Filestat {
    pub const SIZE: usize = 64;

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..8].copy_from_slice(&self.dev.to_le_bytes());
        out[8..16].copy_from_slice(&self.ino.to_le_bytes());
        out[16] = self.filetype as u8;
        // out[17..24] padding, left zero.
        out[24..32].copy_from_slice(&self.nlink.to_le_bytes());
        out[32..40].copy_from_slice(&self.size.to_le_bytes());
        out[40..48].copy_from_slice(&self.atim_ns.to_le_bytes());
        out[48..56].copy_from_slice(&self.mtim_ns.to_le_bytes());
        out[56..64].copy_from_slice(&self.ctim_ns.to_le_bytes());
        out
    }
}

/// Directory-entry header: 24 bytes, followed by `name_len` raw name bytes.
#[derive(Debug, Clone, Copy)]
pub struct DirentHeader {
    pub next_cookie: u64,
    pub ino: u64,
    pub name_len: u32,
    pub filetype: Filetype,
}

impl DirentHeader {
    pub const SIZE: usize = 24;

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..8].copy_from_slice(&self.next_cookie.to_le_bytes());
        out[8..16].copy_from_slice(&self.ino.to_le_bytes());
        out[16..20].copy_from_slice(&self.name_len.to_le_bytes());
        out[20] = self.filetype as u8;
        out
    }
}

/// Pre-open descriptor metadata: 8 bytes.
#[derive(Debug, Clone, Copy)]
pub struct Prestat {
    pub name_len: u32,
}

impl Prestat {
    pub const SIZE: usize = 8;

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0] = 0; // tag: __WASI_PREOPENTYPE_DIR
        out[4..8].copy_from_slice(&self.name_len.to_le_bytes());
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn errno_pinned_values() {
        assert_eq!(Errno::Success.raw(), 0);
        assert_eq!(Errno::Badf.raw(), 8);
        assert_eq!(Errno::Inval.raw(), 28);
        assert_eq!(Errno::Io.raw(), 29);
        assert_eq!(Errno::Noent.raw(), 44);
        assert_eq!(Errno::Notdir.raw(), 54);
        assert_eq!(Errno::Notempty.raw(), 55);
        assert_eq!(Errno::Nosys.raw(), 58);
        assert_eq!(Errno::Perm.raw(), 63);
        assert_eq!(Errno::Rofs.raw(), 69);
        assert_eq!(Errno::Notcapable.raw(), 76);
    }

    #[test]
    fn record_sizes() {
        assert_eq!(Fdstat::SIZE, 24);
        assert_eq!(Filestat::SIZE, 64);
        assert_eq!(DirentHeader::SIZE, 24);
        assert_eq!(Prestat::SIZE, 8);
        assert_eq!(Iovec::SIZE, 8);
    }

    #[test]
    fn fdstat_field_offsets() {
        let stat = Fdstat {
            filetype: Filetype::RegularFile,
            flags: Fdflags::APPEND,
            rights_base: Rights::R,
            rights_inheriting: Rights::RW,
        };
        let bytes = stat.encode();
        assert_eq!(bytes[0], Filetype::RegularFile as u8);
        assert_eq!(u16::from_le_bytes(bytes[2..4].try_into().unwrap()), 1);
        assert_eq!(
            u64::from_le_bytes(bytes[8..16].try_into().unwrap()),
            Rights::R.0
        );
        assert_eq!(
            u64::from_le_bytes(bytes[16..24].try_into().unwrap()),
            Rights::RW.0
        );
    }

    #[test]
    fn rights_lattice() {
        assert!(Rights::RW.contains(Rights::R));
        assert!(Rights::RW.contains(Rights::W));
        assert!(Rights::R.contains(Rights::BASE));
        assert_eq!(Rights::R.intersect(Rights::W), Rights::BASE);
    }
}
