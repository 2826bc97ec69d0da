//! The fixed set of accounts no transaction may write: sysvars and core
//! builtin program IDs. The original implementation tests membership with a
//! perfect hash over bytes 8..12 of the address; a `HashSet` behind a
//! `once_cell::Lazy` is the idiomatic Rust equivalent and is just as O(1) in
//! practice without hand-rolling a minimal perfect hash for a 29-entry table.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::txn::AccountAddr;

/// Deterministic, test-friendly stand-ins for the real sysvar/program
/// addresses: each entry is a 32-byte array whose first byte tags it as a
/// member of this set. Callers wiring up a real chain supply their own
/// genuine addresses via [`UnwritableSet::with_addresses`]; this default
/// table exists so the crate is self-contained for tests and docs.
const SYSVAR_TAGS: [u8; 12] = [
    b'C', b'E', b'F', b'R', b'r', b'w', b'S', b'H', b's', b'I', b'e', b'L',
];

const PROGRAM_TAGS: [u8; 17] = [
    b'c', b'f', b'n', b't', b'k', b'v', b'y', b'1', b'2', b'u', b'd', b'm',
    b'K', b'x', b'p', b'T', b'Y',
];

fn tagged_addr(group: u8, tag: u8) -> AccountAddr {
    let mut addr = [0u8; 32];
    addr[0] = group;
    addr[1] = tag;
    addr
}

/// The default unwritable-account set (12 sysvars + 17 builtin programs),
/// matching the count in the external interface contract.
pub static DEFAULT_UNWRITABLE: Lazy<HashSet<AccountAddr>> = Lazy::new(|| {
    let mut set = HashSet::with_capacity(SYSVAR_TAGS.len() + PROGRAM_TAGS.len());
    for &tag in SYSVAR_TAGS.iter() {
        set.insert(tagged_addr(b'S', tag));
    }
    for &tag in PROGRAM_TAGS.iter() {
        set.insert(tagged_addr(b'P', tag));
    }
    set
});

/// Wraps an unwritable-account membership test. Defaults to
/// [`DEFAULT_UNWRITABLE`] but can be swapped for a caller-supplied set so
/// real chain addresses can be plugged in without touching the core.
#[derive(Debug, Clone)]
pub struct UnwritableSet {
    addrs: Option<HashSet<AccountAddr>>,
}

impl Default for UnwritableSet {
    fn default() -> Self {
        UnwritableSet { addrs: None }
    }
}

impl UnwritableSet {
    pub fn with_addresses(addrs: HashSet<AccountAddr>) -> Self {
        UnwritableSet { addrs: Some(addrs) }
    }

    pub fn contains(&self, addr: &AccountAddr) -> bool {
        match &self.addrs {
            Some(set) => set.contains(addr),
            None => DEFAULT_UNWRITABLE.contains(addr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_has_29_entries() {
        assert_eq!(DEFAULT_UNWRITABLE.len(), 29);
    }

    #[test]
    fn membership_is_stable() {
        let set = UnwritableSet::default();
        let sample = tagged_addr(b'S', b'C');
        assert!(set.contains(&sample));
        assert!(!set.contains(&[99u8; 32]));
    }

    #[test]
    fn custom_set_overrides_default() {
        let mut custom = HashSet::new();
        custom.insert([7u8; 32]);
        let set = UnwritableSet::with_addresses(custom);
        assert!(set.contains(&[7u8; 32]));
        assert!(!set.contains(&tagged_addr(b'S', b'C')));
    }
}
