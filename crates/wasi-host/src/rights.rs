//! Pure, stateless conversion between host open-mode flags and the WASI
//! rights/flags bitsets. Nothing in this module touches a table, a file
//! handle, or guest memory; it is plain data transformation and is exercised
//! with property tests (see the bottom of this file) rather than scenario
//! tests.

use crate::wire::{Fdflags, Lookupflags, Oflags, Rights};

/// The host's notion of an open-mode request, independent of WASI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostOpenFlags {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub create: bool,
    pub excl: bool,
    pub truncate: bool,
    pub sync: bool,
    pub nofollow: bool,
}

/// The subset of a host permission-mode bitmask this codec cares about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostPerm {
    pub owner_read: bool,
    pub owner_write: bool,
}

const R_ONLY: Rights = Rights(Rights::R.0 & !Rights::BASE.0);
const W_ONLY: Rights = Rights(Rights::W.0 & !Rights::BASE.0);

/// `open-to-wasi`: host open flags + permission bits -> WASI lookupflags,
/// oflags, base/inheriting rights, and fdflags.
///
/// Inheriting rights are returned as the full set; narrowing by a parent
/// descriptor's inheriting-rights (the other half of the monotone-subset
/// invariant) happens once, at `path_open` time, in the dispatcher.
pub fn open_to_wasi(
    host: HostOpenFlags,
    perm: HostPerm,
) -> (Lookupflags, Oflags, Rights, Rights, Fdflags) {
    let mut base = Rights::BASE;
    if host.read {
        base |= R_ONLY;
    }
    if host.write {
        base |= W_ONLY;
    }
    if !perm.owner_read {
        base = Rights(base.0 & !R_ONLY.0);
    }
    if !perm.owner_write {
        base = Rights(base.0 & !W_ONLY.0);
    }

    let mut oflags = Oflags::empty();
    if host.create {
        oflags |= Oflags::CREAT;
    }
    if host.excl {
        oflags |= Oflags::EXCL;
    }
    if host.truncate {
        oflags |= Oflags::TRUNC;
    }

    let mut fdflags = Fdflags::empty();
    if host.append {
        fdflags |= Fdflags::APPEND;
    }
    if host.sync {
        fdflags |= Fdflags::SYNC;
    }

    let lookupflags = if host.nofollow {
        Lookupflags::empty()
    } else {
        Lookupflags::SYMLINK_FOLLOW
    };

    (lookupflags, oflags, base, Rights::all(), fdflags)
}

/// `wasi-to-open`: the inverse direction, used when a dispatcher call needs
/// to actually invoke a host `open` given WASI-level parameters.
pub fn wasi_to_open(
    lookupflags: Lookupflags,
    oflags: Oflags,
    rights_base: Rights,
    _rights_inherit: Rights,
    fdflags: Fdflags,
) -> (HostOpenFlags, HostPerm) {
    let owner_read = rights_base.contains(R_ONLY);
    let owner_write = rights_base.contains(W_ONLY);
    let host = HostOpenFlags {
        read: owner_read || !owner_write,
        write: owner_write,
        append: fdflags.contains(Fdflags::APPEND),
        create: oflags.contains(Oflags::CREAT),
        excl: oflags.contains(Oflags::EXCL),
        truncate: oflags.contains(Oflags::TRUNC),
        sync: fdflags.contains(Fdflags::SYNC)
            || fdflags.contains(Fdflags::DSYNC)
            || fdflags.contains(Fdflags::RSYNC),
        nofollow: !lookupflags.contains(Lookupflags::SYMLINK_FOLLOW),
    };
    let perm = HostPerm {
        owner_read,
        owner_write,
    };
    (host, perm)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn read_write_perm_round_trip() {
        let host = HostOpenFlags {
            read: true,
            write: true,
            append: true,
            create: true,
            excl: false,
            truncate: true,
            sync: true,
            nofollow: true,
        };
        let perm = HostPerm {
            owner_read: true,
            owner_write: true,
        };
        let (lookup, oflags, base, _inherit, fdflags) = open_to_wasi(host, perm);
        let (back, _perm) = wasi_to_open(lookup, oflags, base, Rights::all(), fdflags);
        assert_eq!(back.write, host.write);
        assert_eq!(back.append, host.append);
        assert_eq!(back.create, host.create);
        assert_eq!(back.excl, host.excl);
        assert_eq!(back.truncate, host.truncate);
        assert_eq!(back.sync, host.sync);
        assert_eq!(back.nofollow, host.nofollow);
    }

    #[test]
    fn absent_owner_read_masks_read_rights() {
        let host = HostOpenFlags {
            read: true,
            ..Default::default()
        };
        let perm = HostPerm {
            owner_read: false,
            owner_write: true,
        };
        let (_, _, base, _, _) = open_to_wasi(host, perm);
        assert!(!base.contains(R_ONLY));
        assert!(base.contains(Rights::BASE));
    }

    #[test]
    fn nofollow_clears_symlink_follow() {
        let host = HostOpenFlags {
            nofollow: true,
            ..Default::default()
        };
        let (lookup, ..) = open_to_wasi(host, HostPerm::default());
        assert!(!lookup.contains(Lookupflags::SYMLINK_FOLLOW));
    }

    proptest::proptest! {
        #[test]
        fn prop_round_trip_preserves_mode_bits(
            write in proptest::bool::ANY,
            append in proptest::bool::ANY,
            create in proptest::bool::ANY,
            excl in proptest::bool::ANY,
            truncate in proptest::bool::ANY,
            sync in proptest::bool::ANY,
        ) {
            let host = HostOpenFlags { read: true, write, append, create, excl, truncate, sync, nofollow: false };
            let perm = HostPerm { owner_read: true, owner_write: true };
            let (lookup, oflags, base, inherit, fdflags) = open_to_wasi(host, perm);
            let (back, _) = wasi_to_open(lookup, oflags, base, inherit, fdflags);
            proptest::prop_assert_eq!(back.write, write);
            proptest::prop_assert_eq!(back.append, append);
            proptest::prop_assert_eq!(back.create, create);
            proptest::prop_assert_eq!(back.excl, excl);
            proptest::prop_assert_eq!(back.truncate, truncate);
            proptest::prop_assert_eq!(back.sync, sync);
        }
    }
}
