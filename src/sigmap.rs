//! Signature (signature 0) → arena index map: the dedup check on admission
//! and the lookup used by `delete_transaction(sig)`.

use std::collections::HashMap;

use crate::txn::Signature;

#[derive(Debug, Default)]
pub struct SigMap {
    map: HashMap<Signature, u32>,
}

impl SigMap {
    pub fn new() -> Self {
        SigMap { map: HashMap::new() }
    }

    pub fn contains(&self, sig: &Signature) -> bool {
        self.map.contains_key(sig)
    }

    pub fn get(&self, sig: &Signature) -> Option<u32> {
        self.map.get(sig).copied()
    }

    pub fn insert(&mut self, sig: Signature, idx: u32) {
        self.map.insert(sig, idx);
    }

    pub fn remove(&mut self, sig: &Signature) -> Option<u32> {
        self.map.remove(sig)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_dedup_check() {
        let mut m = SigMap::new();
        let sig = [9u8; 64];
        assert!(!m.contains(&sig));
        m.insert(sig, 3);
        assert!(m.contains(&sig));
        assert_eq!(m.get(&sig), Some(3));
    }

    #[test]
    fn remove_by_signature() {
        let mut m = SigMap::new();
        let sig = [1u8; 64];
        m.insert(sig, 5);
        assert_eq!(m.remove(&sig), Some(5));
        assert!(!m.contains(&sig));
    }
}
